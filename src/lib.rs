pub mod audit;
pub mod config;
pub mod error;
pub mod kafka;
pub mod server;

pub use audit::{ApiDetails, AuditEntry};
pub use config::{ProducerConfig, Settings};
pub use error::{Error, Result};
pub use kafka::{build_producer, KafkaProducer, MessageSink};
