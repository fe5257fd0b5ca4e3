//! SSE transport — long-lived push channel with a companion submit endpoint.
//!
//! `GET {path}` opens the event stream: one `initialized` notification,
//! then a 30-second keep-alive heartbeat until the client disconnects.
//! `POST {path}` submits one JSON-RPC message and returns its response.
//! Connections are independent; each stream is single-threaded with
//! respect to its own messages.

use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::State,
    http::StatusCode,
    response::sse::{Event, KeepAlive, Sse},
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use futures::Stream;
use tower_http::cors::CorsLayer;

use crate::protocol::ProtocolHandler;
use crate::types::{JsonRpcError, JsonRpcNotification, McpError, McpResult, RequestId};

const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(30);

pub struct SseTransport {
    handler: Arc<ProtocolHandler>,
    path: String,
}

impl SseTransport {
    pub fn new(handler: Arc<ProtocolHandler>, path: impl Into<String>) -> Self {
        Self {
            handler,
            path: path.into(),
        }
    }

    /// Bind and serve until the process is terminated. Bind failures are
    /// fatal and propagate to the caller.
    pub async fn run(&self, addr: &str) -> McpResult<()> {
        let app = self.router();

        let listener = tokio::net::TcpListener::bind(addr)
            .await
            .map_err(McpError::Io)?;

        tracing::info!("SSE transport listening on {addr}{}", self.path);

        axum::serve(listener, app)
            .await
            .map_err(|e| McpError::Transport(e.to_string()))?;

        Ok(())
    }

    /// Router shared with tests. CORS preflight is answered by the layer
    /// and never reaches the dispatcher.
    pub fn router(&self) -> Router {
        Router::new()
            .route(&self.path, get(handle_subscribe))
            .route(&self.path, post(handle_submit))
            .layer(CorsLayer::permissive())
            .with_state(self.handler.clone())
    }
}

/// Subscribe: open the push channel for this connection.
async fn handle_subscribe(
    State(_handler): State<Arc<ProtocolHandler>>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    tracing::debug!("SSE connection opened");

    let stream = async_stream::stream! {
        let hello = JsonRpcNotification::new("initialized".to_string(), None);
        match serde_json::to_string(&hello) {
            Ok(json) => yield Ok(Event::default().data(json)),
            Err(e) => tracing::error!("Failed to serialize hello event: {e}"),
        }

        // Protocol events would be pushed here; until the server emits
        // any, the stream stays open and the keep-alive covers liveness.
        futures::future::pending::<()>().await;
    };

    Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(HEARTBEAT_INTERVAL)
            .text("keepalive"),
    )
}

/// Submit: dispatch one protocol message and answer it on this request.
async fn handle_submit(
    State(handler): State<Arc<ProtocolHandler>>,
    body: String,
) -> Response {
    let msg = match crate::transport::framing::parse_message(&body) {
        Ok(msg) => msg,
        Err(e) => {
            tracing::warn!("SSE submit parse error: {e}");
            let error = JsonRpcError::new(RequestId::Null, e.code(), e.to_string());
            return (StatusCode::BAD_REQUEST, Json(error)).into_response();
        }
    };

    match handler.handle_message(msg).await {
        Some(response) => Json(response).into_response(),
        None => StatusCode::ACCEPTED.into_response(),
    }
}
