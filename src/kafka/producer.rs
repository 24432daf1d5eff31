use crate::audit::AuditEntry;
use crate::config::{ProducerConfig, Settings};
use crate::kafka::{key::partition_key, serializer::JsonSerializer};
use crate::{Error, Result};
use async_trait::async_trait;
use rdkafka::config::RDKafkaLogLevel;
use rdkafka::producer::{FutureProducer, FutureRecord, Producer};
use rdkafka::util::Timeout;
use rdkafka::ClientConfig;
use std::time::Duration;
use tracing::{debug, info, instrument, warn};

pub const CLIENT_ID: &str = "audit-kafka-bridge";

/// How long startup waits for the brokers to answer a metadata request.
pub const METADATA_TIMEOUT: Duration = Duration::from_secs(10);

/// TLS cipher list for the broker connection. AEAD suites only exist from
/// TLS 1.2 on, so older protocol versions cannot complete a handshake.
pub const TLS12_CIPHER_SUITES: &str = "ECDHE+AESGCM:ECDHE+CHACHA20:AESGCM:!aNULL:!eNULL";

/// Destination for keyed audit messages.
///
/// Implementations must be safe to share between concurrently running
/// request handlers without external locking.
#[async_trait]
pub trait MessageSink: Send + Sync {
    /// Publishes one message and waits until the broker acknowledges it or
    /// delivery is given up on.
    async fn send(&self, key: &str, payload: &[u8]) -> Result<()>;

    /// Publishes `entry` keyed by its bucket and object.
    async fn send_entry(&self, entry: &AuditEntry) -> Result<()> {
        let key = partition_key(entry);
        let payload = JsonSerializer::serialize(entry)?;
        self.send(&key, &payload).await
    }
}

/// Validates `settings` and opens a producer from them.
///
/// Nothing touches the network unless the settings are valid; a disabled
/// target fails with [`Error::Disabled`] straight away. Blocks while the
/// brokers are contacted.
pub fn build_producer(settings: &Settings) -> Result<KafkaProducer> {
    let config = ProducerConfig::from_settings(settings)?;
    KafkaProducer::connect(config)
}

/// Long-lived handle publishing to one topic.
pub struct KafkaProducer {
    producer: FutureProducer,
    topic: String,
}

impl KafkaProducer {
    /// Creates the client and checks that the brokers are reachable.
    pub fn connect(config: ProducerConfig) -> Result<Self> {
        if config.brokers.is_empty() {
            return Err(Error::Connection("no broker addresses configured".to_string()));
        }

        let producer: FutureProducer = client_config(&config)
            .create()
            .map_err(|e| Error::Connection(format!("failed to create producer: {}", e)))?;

        let metadata = producer
            .client()
            .fetch_metadata(None, METADATA_TIMEOUT)
            .map_err(|e| {
                Error::Connection(format!(
                    "brokers {} unreachable: {}",
                    config.brokers.join(","),
                    e
                ))
            })?;

        if config.topic.is_empty() {
            warn!("No topic configured, every publish will fail");
        }

        info!(
            brokers = ?config.brokers,
            cluster_brokers = metadata.brokers().len(),
            topic = %config.topic,
            version = %config.version,
            tls = config.tls.enabled,
            client_auth = ?config.tls.client_auth,
            "Kafka producer connected"
        );

        Ok(Self {
            producer,
            topic: config.topic,
        })
    }

    pub fn topic(&self) -> &str {
        &self.topic
    }

    /// Waits for in-flight messages to be delivered. Blocks.
    pub fn flush(&self, timeout: Duration) -> Result<()> {
        info!(in_flight = self.producer.in_flight_count(), "Flushing Kafka producer");
        self.producer.flush(timeout).map_err(Error::Kafka)
    }
}

#[async_trait]
impl MessageSink for KafkaProducer {
    #[instrument(skip(self, payload), fields(topic = %self.topic, bytes = payload.len()))]
    async fn send(&self, key: &str, payload: &[u8]) -> Result<()> {
        let record = FutureRecord::to(&self.topic).key(key).payload(payload);

        let (partition, offset) = self
            .producer
            .send(record, Timeout::Never)
            .await
            .map_err(|(e, _)| Error::Kafka(e))?;

        debug!(partition, offset, "Audit entry delivered");
        Ok(())
    }
}

/// librdkafka settings for `config`.
pub fn client_config(config: &ProducerConfig) -> ClientConfig {
    let mut client_config = ClientConfig::new();
    client_config
        .set("bootstrap.servers", config.brokers.join(","))
        .set("client.id", CLIENT_ID)
        .set("acks", config.delivery.required_acks)
        .set("message.send.max.retries", config.delivery.max_retries.to_string())
        .set(
            "api.version.request",
            config.version.supports_api_version_request().to_string(),
        )
        .set("broker.version.fallback", config.version.to_string());

    let tls = &config.tls;
    if tls.enabled {
        client_config.set("security.protocol", "ssl");

        if let Some(pair) = &tls.client_cert {
            client_config
                .set("ssl.certificate.pem", pair.cert_pem.as_str())
                .set("ssl.key.pem", pair.key_pem.as_str());
        }

        client_config.set("ssl.cipher.suites", TLS12_CIPHER_SUITES);

        if tls.skip_verify {
            client_config
                .set("enable.ssl.certificate.verification", "false")
                .set("ssl.endpoint.identification.algorithm", "none");
        }
    } else {
        client_config.set("security.protocol", "plaintext");
    }

    if config.debug {
        client_config
            .set("debug", "broker,topic,msg")
            .set_log_level(RDKafkaLogLevel::Debug);
    }

    client_config
}
