//! Error types and result handling for audit-kafka-bridge.
//!
//! This module defines the main error type [`Error`] and a convenience
//! [`Result`] type alias used throughout the crate.
//!
//! Errors fall into two classes. Configuration and connection errors are
//! fatal at startup; serialization and delivery errors are contained to the
//! request that produced them.
//!
//! # Example
//!
//! ```rust
//! use audit_kafka_bridge::{Error, Result};
//!
//! fn check_enabled(flag: &str) -> Result<()> {
//!     if flag != "on" {
//!         return Err(Error::Disabled);
//!     }
//!     Ok(())
//! }
//!
//! match check_enabled("off") {
//!     Ok(()) => println!("Enabled"),
//!     Err(Error::Disabled) => eprintln!("Kafka audit target is disabled"),
//!     Err(e) => eprintln!("Other error: {}", e),
//! }
//! ```

use thiserror::Error;

/// The main error type for audit-kafka-bridge operations.
#[derive(Error, Debug)]
pub enum Error {
    /// The Kafka audit target is turned off.
    #[error("kafka not enabled")]
    Disabled,

    /// The configured broker protocol version could not be parsed.
    #[error("Invalid Kafka version: {0}")]
    InvalidVersion(String),

    /// Malformed or inconsistent configuration.
    #[error("Configuration error: {0}")]
    InvalidConfig(String),

    /// The broker list could not be reached when the client was created.
    #[error("Connection error: {0}")]
    Connection(String),

    /// Kafka client or producer error.
    #[error("Kafka error: {0}")]
    Kafka(#[from] rdkafka::error::KafkaError),

    /// JSON encoding or decoding of an audit entry failed.
    #[error("{0}")]
    Serialization(#[from] serde_json::Error),

    /// I/O error, typically from reading TLS material or binding the listener.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Returns `true` if the error must stop the process before it serves
    /// any request.
    pub fn is_startup_fatal(&self) -> bool {
        matches!(
            self,
            Error::Disabled
                | Error::InvalidVersion(_)
                | Error::InvalidConfig(_)
                | Error::Connection(_)
        )
    }
}

/// A convenient Result type alias for audit-kafka-bridge operations.
///
/// This is equivalent to `std::result::Result<T, audit_kafka_bridge::Error>`.
pub type Result<T> = std::result::Result<T, Error>;
