//! Producer configuration.
//!
//! [`Settings`] holds the raw, string-valued options exactly as an operator
//! supplies them (environment variables or command line flags).
//! [`ProducerConfig::from_settings`] is the single validating constructor
//! that turns them into a typed configuration; a Kafka client is only ever
//! built from its output.

use crate::{Error, Result};
use clap::Args;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::warn;

/// Value an on/off option must hold to count as enabled.
pub const ON: &str = "on";

/// Acknowledgement mode requested from the broker for every message.
pub const REQUIRED_ACKS: &str = "all";

/// Retries librdkafka performs per message before reporting failure.
pub const MAX_RETRIES: u32 = 10;

/// Raw producer settings.
#[derive(Debug, Clone, Args)]
pub struct Settings {
    /// Enables the Kafka audit target ("on" or "off")
    #[arg(long, env = "MINIO_AUDIT_KAFKA_ENABLE", default_value = "on")]
    pub enable: String,

    /// Enables verbose librdkafka protocol logging ("on" or "off")
    #[arg(long, env = "DEBUG", default_value = "off")]
    pub debug: String,

    /// Broker protocol version, e.g. 0.10.2.0 or 2.8.0
    #[arg(id = "kafka_version", long = "kafka-version", env = "MINIO_AUDIT_KAFKA_VERSION")]
    pub version: Option<String>,

    /// Comma-separated list of broker addresses
    #[arg(long, env = "MINIO_AUDIT_KAFKA_BROKERS", default_value = "")]
    pub brokers: String,

    /// Topic audit entries are published to
    #[arg(long, env = "MINIO_AUDIT_KAFKA_TOPIC", default_value = "")]
    pub topic: String,

    /// Enables TLS towards the brokers ("on" or "off")
    #[arg(long, env = "MINIO_AUDIT_KAFKA_TLS", default_value = "off")]
    pub tls: String,

    /// Path to the PEM encoded client certificate
    #[arg(long, env = "MINIO_AUDIT_KAFKA_CLIENT_TLS_CERT")]
    pub tls_cert: Option<String>,

    /// Path to the PEM encoded client private key
    #[arg(long, env = "MINIO_AUDIT_KAFKA_CLIENT_TLS_KEY")]
    pub tls_key: Option<String>,

    /// TLS client authentication policy, as an integer code
    #[arg(long, env = "MINIO_AUDIT_KAFKA_TLS_CLIENT_AUTH")]
    pub tls_client_auth: Option<String>,

    /// Skips verification of the broker certificate ("on" or "off")
    #[arg(long, env = "MINIO_AUDIT_KAFKA_TLS_SKIP_VERIFY", default_value = "off")]
    pub tls_skip_verify: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            enable: ON.to_string(),
            debug: "off".to_string(),
            version: None,
            brokers: String::new(),
            topic: String::new(),
            tls: "off".to_string(),
            tls_cert: None,
            tls_key: None,
            tls_client_auth: None,
            tls_skip_verify: "off".to_string(),
        }
    }
}

/// Validated producer configuration.
///
/// A value of this type always describes an enabled target; a disabled one
/// never gets past [`ProducerConfig::from_settings`].
#[derive(Debug, Clone)]
pub struct ProducerConfig {
    pub debug: bool,
    pub version: KafkaVersion,
    pub brokers: Vec<String>,
    pub topic: String,
    pub tls: TlsConfig,
    pub delivery: DeliveryPolicy,
}

impl ProducerConfig {
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        if settings.enable != ON {
            return Err(Error::Disabled);
        }

        let version = match non_empty(&settings.version) {
            Some(v) => v.parse()?,
            None => KafkaVersion::DEFAULT,
        };

        let tls = TlsConfig::from_settings(settings)?;

        Ok(Self {
            debug: settings.debug == ON,
            version,
            brokers: split_brokers(&settings.brokers),
            topic: settings.topic.clone(),
            tls,
            delivery: DeliveryPolicy::default(),
        })
    }
}

/// Delivery guarantees. Fixed policy, not operator configurable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeliveryPolicy {
    pub required_acks: &'static str,
    pub max_retries: u32,
}

impl Default for DeliveryPolicy {
    fn default() -> Self {
        Self {
            required_acks: REQUIRED_ACKS,
            max_retries: MAX_RETRIES,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct TlsConfig {
    pub enabled: bool,
    pub client_cert: Option<ClientCertificate>,
    pub client_auth: Option<ClientAuth>,
    pub skip_verify: bool,
}

impl TlsConfig {
    fn from_settings(settings: &Settings) -> Result<Self> {
        let enabled = settings.tls == ON;

        let pair = match (non_empty(&settings.tls_cert), non_empty(&settings.tls_key)) {
            (Some(cert), Some(key)) => Some((cert, key)),
            (None, None) => None,
            (Some(_), None) => {
                return Err(Error::InvalidConfig(
                    "client TLS certificate given without a private key".to_string(),
                ))
            }
            (None, Some(_)) => {
                return Err(Error::InvalidConfig(
                    "client TLS private key given without a certificate".to_string(),
                ))
            }
        };

        let client_auth = non_empty(&settings.tls_client_auth)
            .map(str::parse::<ClientAuth>)
            .transpose()?;

        let client_cert = match pair {
            Some((cert, key)) if enabled => Some(ClientCertificate::load(cert, key)?),
            _ => None,
        };

        if let Some(policy) = client_auth {
            if enabled && client_cert.is_none() && policy.requires_certificate() {
                warn!(
                    policy = policy.code(),
                    "TLS client auth policy expects a client certificate, none configured"
                );
            }
        }

        Ok(Self {
            enabled,
            client_cert,
            client_auth,
            skip_verify: settings.tls_skip_verify == ON,
        })
    }
}

/// A client certificate and private key read from disk.
#[derive(Clone)]
pub struct ClientCertificate {
    pub cert_path: PathBuf,
    pub key_path: PathBuf,
    pub cert_pem: String,
    pub key_pem: String,
}

impl ClientCertificate {
    pub fn load(cert_path: impl AsRef<Path>, key_path: impl AsRef<Path>) -> Result<Self> {
        let cert_path = cert_path.as_ref().to_path_buf();
        let key_path = key_path.as_ref().to_path_buf();

        let cert_pem = read_pem(&cert_path)?;
        let key_pem = read_pem(&key_path)?;

        Ok(Self {
            cert_path,
            key_path,
            cert_pem,
            key_pem,
        })
    }
}

// Keeps key material out of logs.
impl fmt::Debug for ClientCertificate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientCertificate")
            .field("cert_path", &self.cert_path)
            .field("key_path", &self.key_path)
            .finish_non_exhaustive()
    }
}

fn read_pem(path: &Path) -> Result<String> {
    let pem = fs::read_to_string(path)
        .map_err(|e| Error::InvalidConfig(format!("failed to read {:?}: {}", path, e)))?;

    if !pem.contains("-----BEGIN") {
        return Err(Error::InvalidConfig(format!("{:?} is not PEM encoded", path)));
    }

    Ok(pem)
}

/// TLS client authentication policy, by its integer code.
///
/// Codes outside the known range are kept as [`ClientAuth::Other`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientAuth {
    NoClientCert,
    RequestClientCert,
    RequireAnyClientCert,
    VerifyClientCertIfGiven,
    RequireAndVerifyClientCert,
    Other(i64),
}

impl ClientAuth {
    pub fn code(self) -> i64 {
        match self {
            ClientAuth::NoClientCert => 0,
            ClientAuth::RequestClientCert => 1,
            ClientAuth::RequireAnyClientCert => 2,
            ClientAuth::VerifyClientCertIfGiven => 3,
            ClientAuth::RequireAndVerifyClientCert => 4,
            ClientAuth::Other(code) => code,
        }
    }

    pub fn requires_certificate(self) -> bool {
        matches!(
            self,
            ClientAuth::RequireAnyClientCert | ClientAuth::RequireAndVerifyClientCert
        )
    }
}

impl FromStr for ClientAuth {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let code: i64 = s
            .parse()
            .map_err(|e| Error::InvalidConfig(format!("TLS client auth `{}`: {}", s, e)))?;

        match code {
            0 => Ok(ClientAuth::NoClientCert),
            1 => Ok(ClientAuth::RequestClientCert),
            2 => Ok(ClientAuth::RequireAnyClientCert),
            3 => Ok(ClientAuth::VerifyClientCertIfGiven),
            4 => Ok(ClientAuth::RequireAndVerifyClientCert),
            other => Ok(ClientAuth::Other(other)),
        }
    }
}

/// Kafka broker protocol version.
///
/// Versions before 1.0 carry four components (`0.10.2.0`), later ones three
/// (`2.8.0`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct KafkaVersion([u32; 4]);

impl KafkaVersion {
    pub const V0_8_2_0: KafkaVersion = KafkaVersion([0, 8, 2, 0]);
    pub const V0_10_0_0: KafkaVersion = KafkaVersion([0, 10, 0, 0]);

    pub const DEFAULT: KafkaVersion = Self::V0_10_0_0;

    /// Brokers from 0.10.0 on answer ApiVersionRequest.
    pub fn supports_api_version_request(&self) -> bool {
        *self >= Self::V0_10_0_0
    }
}

impl Default for KafkaVersion {
    fn default() -> Self {
        Self::DEFAULT
    }
}

impl FromStr for KafkaVersion {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let invalid = || Error::InvalidVersion(format!("invalid version `{}`", s));

        let parts: Vec<&str> = s.split('.').collect();
        let expected = if parts.first() == Some(&"0") { 4 } else { 3 };
        if parts.len() != expected {
            return Err(invalid());
        }

        let mut components = [0u32; 4];
        for (slot, part) in components.iter_mut().zip(&parts) {
            if part.is_empty() || !part.bytes().all(|b| b.is_ascii_digit()) {
                return Err(invalid());
            }
            *slot = part.parse().map_err(|_| invalid())?;
        }

        let version = KafkaVersion(components);
        if expected == 3 && components[0] == 0 {
            return Err(invalid());
        }

        Ok(version)
    }
}

impl fmt::Display for KafkaVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [major, minor, patch, build] = self.0;
        if major == 0 {
            write!(f, "{}.{}.{}.{}", major, minor, patch, build)
        } else {
            write!(f, "{}.{}.{}", major, minor, patch)
        }
    }
}

fn split_brokers(brokers: &str) -> Vec<String> {
    brokers
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.is_empty())
}
