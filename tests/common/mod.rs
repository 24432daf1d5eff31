#![allow(dead_code)]

use async_trait::async_trait;
use audit_kafka_bridge::config::MAX_RETRIES;
use audit_kafka_bridge::server::{self, AppState};
use audit_kafka_bridge::{Error, MessageSink, Result};
use axum::body::{to_bytes, Body};
use axum::http::{Method, Request, StatusCode};
use axum::Router;
use rdkafka::error::{KafkaError, RDKafkaErrorCode};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tower::ServiceExt;

/// Records every message it is given.
#[derive(Default)]
pub struct RecordingSink {
    messages: Mutex<Vec<(String, Vec<u8>)>>,
}

impl RecordingSink {
    pub fn messages(&self) -> Vec<(String, Vec<u8>)> {
        self.messages.lock().unwrap().clone()
    }
}

#[async_trait]
impl MessageSink for RecordingSink {
    async fn send(&self, key: &str, payload: &[u8]) -> Result<()> {
        self.messages
            .lock()
            .unwrap()
            .push((key.to_string(), payload.to_vec()));
        Ok(())
    }
}

/// Behaves like a producer whose brokers are all down: every attempt fails,
/// and the message is given up on once the retry budget is spent.
#[derive(Default)]
pub struct UnavailableSink {
    attempts: AtomicUsize,
    sends: AtomicUsize,
}

impl UnavailableSink {
    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }

    pub fn sends(&self) -> usize {
        self.sends.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MessageSink for UnavailableSink {
    async fn send(&self, _key: &str, _payload: &[u8]) -> Result<()> {
        self.sends.fetch_add(1, Ordering::SeqCst);
        for _ in 0..=MAX_RETRIES {
            self.attempts.fetch_add(1, Ordering::SeqCst);
            tokio::task::yield_now().await;
        }
        Err(Error::Kafka(KafkaError::MessageProduction(
            RDKafkaErrorCode::AllBrokersDown,
        )))
    }
}

/// Fails for keys starting with `fail`, records everything else.
#[derive(Default)]
pub struct SelectiveSink {
    delivered: RecordingSink,
}

impl SelectiveSink {
    pub fn messages(&self) -> Vec<(String, Vec<u8>)> {
        self.delivered.messages()
    }
}

#[async_trait]
impl MessageSink for SelectiveSink {
    async fn send(&self, key: &str, payload: &[u8]) -> Result<()> {
        tokio::task::yield_now().await;
        if key.starts_with("fail") {
            return Err(Error::Kafka(KafkaError::MessageProduction(
                RDKafkaErrorCode::MessageTimedOut,
            )));
        }
        self.delivered.send(key, payload).await
    }
}

pub fn app(sink: Arc<dyn MessageSink>) -> Router {
    server::router(AppState::new(sink))
}

pub fn strict_app(sink: Arc<dyn MessageSink>) -> Router {
    server::router(AppState::new(sink).with_strict_methods(true))
}

pub fn request(method: Method, body: impl Into<Body>) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(server::AUDIT_PATH)
        .header("content-type", "application/json")
        .body(body.into())
        .unwrap()
}

/// Sends one request and returns its status and body text.
pub async fn call(app: &Router, req: Request<Body>) -> (StatusCode, String) {
    let resp = app.clone().oneshot(req).await.unwrap();
    let status = resp.status();
    let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    (status, String::from_utf8(bytes.to_vec()).unwrap())
}

pub fn entry_json(bucket: &str, object: &str) -> String {
    serde_json::json!({
        "version": "1",
        "deploymentid": "a3b1c2d4-0000-4000-8000-000000000001",
        "time": "2021-03-04T05:06:07.123456789Z",
        "trigger": "incoming",
        "api": {
            "name": "PutObject",
            "bucket": bucket,
            "object": object,
            "status": "OK",
            "statusCode": 200,
            "timeToFirstByte": "1.2ms",
            "timeToResponse": "3.4ms"
        },
        "remotehost": "10.0.0.7",
        "requestID": "16696F9C5A43C5B8",
        "userAgent": "MinIO (linux; amd64) minio-go/v7.0.10",
        "requestClaims": {"accessKey": "minio", "groups": ["admins"]},
        "requestHeader": {"Content-Type": "image/jpeg"},
        "tags": {"objectErasureMap": {"poolId": 1}}
    })
    .to_string()
}
