//! HTTP ingestion endpoint.
//!
//! Every request is handled on its own: the body is decoded into one
//! [`AuditEntry`](crate::audit::AuditEntry) and published through the shared
//! [`MessageSink`]. Delivery outcome maps onto the response status:
//!
//! | Outcome                | Status | Body                 |
//! |------------------------|--------|----------------------|
//! | delivered              | 200    | empty                |
//! | body is not an entry   | 400    | decode error text    |
//! | delivery failed        | 502    | delivery error text  |
//! | method other than POST | 200    | informational notice |
//!
//! The last row is kept for compatibility with existing audit webhook
//! clients; [`AppState::with_strict_methods`] switches it to `405`.

use crate::kafka::{JsonSerializer, MessageSink};
use crate::Result;
use axum::{
    extract::State,
    http::{header, Method, StatusCode},
    response::{IntoResponse, Response},
    routing::any,
    Router,
};
use bytes::Bytes;
use std::future::Future;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{debug, error, warn};

pub const LISTEN_ADDR: &str = "0.0.0.0:4222";
pub const AUDIT_PATH: &str = "/rest/kafka";
pub const POST_ONLY: &str = "Sorry, only POST method is supported.";

#[derive(Clone)]
pub struct AppState {
    sink: Arc<dyn MessageSink>,
    strict_methods: bool,
}

impl AppState {
    pub fn new(sink: Arc<dyn MessageSink>) -> Self {
        Self {
            sink,
            strict_methods: false,
        }
    }

    /// Answer non-POST requests with `405 Method Not Allowed`.
    pub fn with_strict_methods(mut self, strict: bool) -> Self {
        self.strict_methods = strict;
        self
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route(AUDIT_PATH, any(ingest))
        .with_state(state)
}

/// Serves the router on `listener` until `shutdown` resolves.
pub async fn serve<F>(listener: TcpListener, state: AppState, shutdown: F) -> Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown)
        .await?;
    Ok(())
}

async fn ingest(State(state): State<AppState>, method: Method, body: Bytes) -> Response {
    if method != Method::POST {
        debug!(%method, "Rejecting non-POST request");
        if state.strict_methods {
            return (
                StatusCode::METHOD_NOT_ALLOWED,
                [(header::ALLOW, "POST")],
                POST_ONLY,
            )
                .into_response();
        }
        return (StatusCode::OK, POST_ONLY).into_response();
    }

    let entry = match JsonSerializer::deserialize(&body) {
        Ok(entry) => entry,
        Err(e) => {
            warn!(error = %e, bytes = body.len(), "Failed to decode audit entry");
            return (StatusCode::BAD_REQUEST, e.to_string()).into_response();
        }
    };

    if let Err(e) = state.sink.send_entry(&entry).await {
        error!(
            error = %e,
            bucket = entry.bucket(),
            object = entry.object(),
            request_id = entry.request_id.as_deref().unwrap_or_default(),
            "Failed to publish audit entry"
        );
        return (StatusCode::BAD_GATEWAY, e.to_string()).into_response();
    }

    StatusCode::OK.into_response()
}
