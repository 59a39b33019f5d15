pub mod billing;
pub mod config;
pub mod consumer;
pub mod inventory;
pub mod metrics;
pub mod orchestrator;
pub mod purchase;
pub mod queue;
pub mod request_log;
pub mod testing;

pub use billing::{NewOrder, Order, OrderError, OrderFilter, OrderStatus, OrderStore, SqliteOrderStore};
pub use config::{
    load_config, load_config_from_str, validate_config, Config, ConfigError, ConsumerConfig,
    LogFormat, OrchestratorConfig, QueueConfig, SanitizedConfig,
};
pub use consumer::{ConsumerStatus, Disposition, OrderConsumer, PurchaseHandler};
pub use inventory::{
    HttpInventoryClient, InventoryClient, InventoryClientError, InventoryError, Movie, MovieStore,
    MovieUpdate, NewMovie, SqliteMovieStore,
};
pub use orchestrator::{OrderOrchestrator, PlaceOrderError, PlaceOrderRequest};
pub use purchase::{DeadLetter, PurchaseMessage};
pub use queue::{Delivery, JetStreamQueue, MessageQueue, QueueError, Subscription};
pub use request_log::{
    create_request_log, FileRequestLog, RequestLogEntry, RequestLogHandle, RequestLogSink,
    RequestLogWriter,
};
