//! Streamable HTTP transport — plain request/response JSON-RPC.
//!
//! `POST {path}` carries one protocol message and returns one JSON
//! response. `GET /` is a static liveness payload. Everything else is 404.
//! Requests are handled independently; the only shared state is the
//! read-only protocol handler.

use std::sync::Arc;

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use tower_http::cors::CorsLayer;

use crate::protocol::ProtocolHandler;
use crate::types::{JsonRpcError, McpError, McpResult, RequestId};

pub struct StreamableHttpTransport {
    handler: Arc<ProtocolHandler>,
    path: String,
}

impl StreamableHttpTransport {
    pub fn new(handler: Arc<ProtocolHandler>, path: impl Into<String>) -> Self {
        Self {
            handler,
            path: path.into(),
        }
    }

    pub async fn run(&self, addr: &str) -> McpResult<()> {
        let app = self.router();

        let listener = tokio::net::TcpListener::bind(addr)
            .await
            .map_err(McpError::Io)?;

        tracing::info!("Streamable HTTP transport listening on {addr}{}", self.path);

        axum::serve(listener, app)
            .await
            .map_err(|e| McpError::Transport(e.to_string()))?;

        Ok(())
    }

    /// Router shared with tests.
    pub fn router(&self) -> Router {
        Router::new()
            .route(&self.path, post(handle_message))
            .route("/", get(handle_liveness))
            .fallback(handle_not_found)
            .layer(CorsLayer::permissive())
            .with_state(self.handler.clone())
    }
}

/// Dispatch one protocol message. Malformed bodies get a 400 with a
/// structured parse-error envelope, never a dropped connection.
async fn handle_message(State(handler): State<Arc<ProtocolHandler>>, body: String) -> Response {
    let msg = match crate::transport::framing::parse_message(&body) {
        Ok(msg) => msg,
        Err(e) => {
            tracing::warn!("HTTP transport parse error: {e}");
            let error = JsonRpcError::new(RequestId::Null, e.code(), e.to_string());
            return (StatusCode::BAD_REQUEST, Json(error)).into_response();
        }
    };

    match handler.handle_message(msg).await {
        Some(response) => Json(response).into_response(),
        None => StatusCode::ACCEPTED.into_response(),
    }
}

async fn handle_liveness() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "healthy",
        "transport": "streamable-http",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

async fn handle_not_found() -> Response {
    (StatusCode::NOT_FOUND, "Not Found").into_response()
}
