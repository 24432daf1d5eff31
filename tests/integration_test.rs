mod common;

use audit_kafka_bridge::{build_producer, AuditEntry, KafkaProducer, Settings};
use axum::http::{Method, StatusCode};
use common::{app, call, entry_json, request};
use rdkafka::config::ClientConfig;
use rdkafka::consumer::{Consumer, StreamConsumer};
use rdkafka::Message;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;

fn test_settings() -> Settings {
    Settings {
        brokers: std::env::var("TEST_KAFKA_BROKERS").unwrap_or_else(|_| "localhost:9092".to_string()),
        topic: format!("test_audit_{}", std::process::id()),
        ..Settings::default()
    }
}

async fn connect(settings: Settings) -> KafkaProducer {
    tokio::task::spawn_blocking(move || build_producer(&settings))
        .await
        .unwrap()
        .expect("Kafka must be reachable for this test")
}

fn create_test_consumer(settings: &Settings) -> StreamConsumer {
    let consumer: StreamConsumer = ClientConfig::new()
        .set("bootstrap.servers", &settings.brokers)
        .set("group.id", format!("test_group_{}", std::process::id()))
        .set("auto.offset.reset", "earliest")
        .set("enable.auto.commit", "false")
        .create()
        .expect("Failed to create consumer");

    consumer
        .subscribe(&[settings.topic.as_str()])
        .expect("Failed to subscribe");
    consumer
}

#[tokio::test]
#[ignore] // Requires running Kafka. Run with: cargo test --test integration_test -- --ignored
async fn test_end_to_end_delivery() {
    tracing_subscriber::fmt()
        .with_env_filter("audit_kafka_bridge=debug,rdkafka=info")
        .try_init()
        .ok();

    let settings = test_settings();
    let producer = Arc::new(connect(settings.clone()).await);
    let app = app(producer.clone());

    let mut expected = HashMap::new();
    for (bucket, object) in [("photos", "beach.jpg"), ("photos", "2021/city.jpg"), ("logs", "")] {
        let body = entry_json(bucket, object);
        let (status, text) = call(&app, request(Method::POST, body.clone())).await;
        assert_eq!(status, StatusCode::OK, "unexpected body: {}", text);

        let entry: AuditEntry = serde_json::from_str(&body).unwrap();
        expected.insert(format!("{}/{}", bucket, object), entry);
    }

    let consumer = create_test_consumer(&settings);
    let mut received = HashMap::new();

    let start = tokio::time::Instant::now();
    while received.len() < expected.len() && start.elapsed() < Duration::from_secs(20) {
        if let Ok(Ok(message)) = timeout(Duration::from_secs(1), consumer.recv()).await {
            let key = String::from_utf8(message.key().unwrap_or_default().to_vec()).unwrap();
            let entry: AuditEntry = serde_json::from_slice(message.payload().unwrap()).unwrap();
            received.insert(key, entry);
        }
    }

    assert_eq!(received, expected);
    producer.flush(Duration::from_secs(5)).unwrap();
}

#[tokio::test]
#[ignore] // Requires running Kafka
async fn test_empty_topic_fails_every_publish() {
    let settings = Settings {
        topic: String::new(),
        ..test_settings()
    };
    let producer = Arc::new(connect(settings).await);
    let app = app(producer);

    let (status, text) = call(&app, request(Method::POST, entry_json("photos", "a.jpg"))).await;

    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert!(!text.is_empty());
}
