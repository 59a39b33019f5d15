use super::{types::Config, ConfigError};

/// Validate configuration
/// Currently validates:
/// - Server port is not 0
/// - Upstream URLs and queue names are not empty
/// - Timeouts, prefetch and delivery limits are positive
/// - Redelivery delay bounds are ordered
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    if config.server.port == 0 {
        return Err(invalid("server.port cannot be 0"));
    }

    if config.upstream.inventory_url.trim().is_empty() {
        return Err(invalid("upstream.inventory_url cannot be empty"));
    }
    if config.upstream.billing_url.trim().is_empty() {
        return Err(invalid("upstream.billing_url cannot be empty"));
    }
    if config.upstream.timeout_secs == 0 {
        return Err(invalid("upstream.timeout_secs must be greater than 0"));
    }

    let queue = &config.queue;
    for (name, value) in [
        ("queue.url", &queue.url),
        ("queue.stream", &queue.stream),
        ("queue.subject", &queue.subject),
        ("queue.dead_letter_subject", &queue.dead_letter_subject),
        ("queue.consumer_name", &queue.consumer_name),
    ] {
        if value.trim().is_empty() {
            return Err(invalid(&format!("{} cannot be empty", name)));
        }
    }
    if queue.subject == queue.dead_letter_subject {
        return Err(invalid(
            "queue.dead_letter_subject must differ from queue.subject",
        ));
    }
    if queue.prefetch == 0 {
        return Err(invalid("queue.prefetch must be at least 1"));
    }
    if queue.publish_timeout_secs == 0 {
        return Err(invalid("queue.publish_timeout_secs must be greater than 0"));
    }

    let consumer = &config.consumer;
    if consumer.max_deliveries == 0 {
        return Err(invalid("consumer.max_deliveries must be at least 1"));
    }
    if consumer.redelivery_delay_max_ms < consumer.redelivery_delay_ms {
        return Err(invalid(
            "consumer.redelivery_delay_max_ms cannot be lower than consumer.redelivery_delay_ms",
        ));
    }
    if consumer.reconnect_initial_ms == 0 {
        return Err(invalid("consumer.reconnect_initial_ms must be greater than 0"));
    }
    if consumer.reconnect_max_ms < consumer.reconnect_initial_ms {
        return Err(invalid(
            "consumer.reconnect_max_ms cannot be lower than consumer.reconnect_initial_ms",
        ));
    }

    Ok(())
}

fn invalid(message: &str) -> ConfigError {
    ConfigError::ValidationError(message.to_string())
}
