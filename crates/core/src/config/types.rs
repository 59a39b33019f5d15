use serde::{Deserialize, Serialize};
use std::net::IpAddr;
use std::path::PathBuf;

/// Root configuration
///
/// Every service binary loads the same shape and reads the sections it needs.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub queue: QueueConfig,
    #[serde(default)]
    pub upstream: UpstreamConfig,
    #[serde(default)]
    pub orchestrator: OrchestratorConfig,
    #[serde(default)]
    pub consumer: ConsumerConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Server configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: IpAddr,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

fn default_host() -> IpAddr {
    IpAddr::from([0, 0, 0, 0])
}

fn default_port() -> u16 {
    8080
}

/// Database configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_db_path")]
    pub path: PathBuf,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
        }
    }
}

fn default_db_path() -> PathBuf {
    PathBuf::from("boxoffice.db")
}

/// Queue transport (NATS JetStream) configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct QueueConfig {
    /// NATS server URL (e.g., "nats://rabbit-queue:4222")
    #[serde(default = "default_queue_url")]
    pub url: String,
    /// Optional credentials
    #[serde(default)]
    pub user: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    /// JetStream stream holding purchase and dead-letter subjects
    #[serde(default = "default_stream")]
    pub stream: String,
    /// Subject purchase messages are published to
    #[serde(default = "default_subject")]
    pub subject: String,
    /// Subject quarantined deliveries are published to
    #[serde(default = "default_dead_letter_subject")]
    pub dead_letter_subject: String,
    /// Durable consumer name used by the billing service
    #[serde(default = "default_consumer_name")]
    pub consumer_name: String,
    /// Maximum unacknowledged deliveries outstanding to one consumer
    #[serde(default = "default_prefetch")]
    pub prefetch: u32,
    /// Publish timeout in seconds (default: 5)
    #[serde(default = "default_timeout")]
    pub publish_timeout_secs: u64,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            url: default_queue_url(),
            user: None,
            password: None,
            stream: default_stream(),
            subject: default_subject(),
            dead_letter_subject: default_dead_letter_subject(),
            consumer_name: default_consumer_name(),
            prefetch: default_prefetch(),
            publish_timeout_secs: default_timeout(),
        }
    }
}

fn default_queue_url() -> String {
    "nats://rabbit-queue:4222".to_string()
}

fn default_stream() -> String {
    "PAYMENTS".to_string()
}

fn default_subject() -> String {
    "payment_queue".to_string()
}

fn default_dead_letter_subject() -> String {
    "payment_queue.dead".to_string()
}

fn default_consumer_name() -> String {
    "billing".to_string()
}

fn default_prefetch() -> u32 {
    1
}

fn default_timeout() -> u64 {
    5
}

/// Remote services the gateway talks to
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct UpstreamConfig {
    #[serde(default = "default_inventory_url")]
    pub inventory_url: String,
    #[serde(default = "default_billing_url")]
    pub billing_url: String,
    /// Per-request timeout in seconds (default: 5)
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            inventory_url: default_inventory_url(),
            billing_url: default_billing_url(),
            timeout_secs: default_timeout(),
        }
    }
}

fn default_inventory_url() -> String {
    "http://inventory-app:8080".to_string()
}

fn default_billing_url() -> String {
    "http://billing-app:8080".to_string()
}

/// Order orchestration settings
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct OrchestratorConfig {
    /// Restore stock when the purchase message cannot be published.
    /// Off by default: a failed publish leaves stock decremented.
    #[serde(default)]
    pub compensate_on_publish_failure: bool,
}

/// Order consumer settings
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ConsumerConfig {
    /// Run the consumer inside the billing service
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Deliveries after which a failing message is dead-lettered
    #[serde(default = "default_max_deliveries")]
    pub max_deliveries: u32,
    /// First redelivery delay (milliseconds), doubled per attempt
    #[serde(default = "default_redelivery_delay")]
    pub redelivery_delay_ms: u64,
    /// Upper bound for the redelivery delay (milliseconds)
    #[serde(default = "default_redelivery_delay_max")]
    pub redelivery_delay_max_ms: u64,
    /// First reconnect delay after losing the subscription (milliseconds)
    #[serde(default = "default_reconnect_initial")]
    pub reconnect_initial_ms: u64,
    /// Upper bound for the reconnect delay (milliseconds)
    #[serde(default = "default_reconnect_max")]
    pub reconnect_max_ms: u64,
}

impl Default for ConsumerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_deliveries: default_max_deliveries(),
            redelivery_delay_ms: default_redelivery_delay(),
            redelivery_delay_max_ms: default_redelivery_delay_max(),
            reconnect_initial_ms: default_reconnect_initial(),
            reconnect_max_ms: default_reconnect_max(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_max_deliveries() -> u32 {
    5
}

fn default_redelivery_delay() -> u64 {
    500
}

fn default_redelivery_delay_max() -> u64 {
    30_000
}

fn default_reconnect_initial() -> u64 {
    500
}

fn default_reconnect_max() -> u64 {
    30_000
}

/// Log output settings
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct LoggingConfig {
    #[serde(default)]
    pub format: LogFormat,
    /// JSON-lines request log (gateway only, disabled when unset)
    #[serde(default)]
    pub request_log: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

/// Sanitized config for logs (queue credentials redacted)
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub queue: SanitizedQueueConfig,
    pub upstream: UpstreamConfig,
    pub orchestrator: OrchestratorConfig,
    pub consumer: ConsumerConfig,
}

/// Queue config with credentials hidden
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedQueueConfig {
    pub url: String,
    pub credentials_configured: bool,
    pub stream: String,
    pub subject: String,
    pub dead_letter_subject: String,
    pub consumer_name: String,
    pub prefetch: u32,
}

impl From<&Config> for SanitizedConfig {
    fn from(config: &Config) -> Self {
        Self {
            server: config.server.clone(),
            database: config.database.clone(),
            queue: SanitizedQueueConfig {
                url: config.queue.url.clone(),
                credentials_configured: config.queue.user.is_some(),
                stream: config.queue.stream.clone(),
                subject: config.queue.subject.clone(),
                dead_letter_subject: config.queue.dead_letter_subject.clone(),
                consumer_name: config.queue.consumer_name.clone(),
                prefetch: config.queue.prefetch,
            },
            upstream: config.upstream.clone(),
            orchestrator: config.orchestrator.clone(),
            consumer: config.consumer.clone(),
        }
    }
}
