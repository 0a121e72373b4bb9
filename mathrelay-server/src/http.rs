// Copyright 2025 Mathrelay Contributors
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program. If not, see <https://www.gnu.org/licenses/>.

//! HTTP surface for the relay.
//!
//! One resource path carries the whole protocol: `POST /mcp` dispatches
//! envelopes, `DELETE /mcp` terminates the session named in the header,
//! and `GET /mcp/health` reports liveness. Session errors, routing errors,
//! and upstream errors all travel as well-formed envelopes over 200; only
//! a body that fails to parse at all takes the 400 path, still with a
//! best-effort parse-error envelope.

use crate::handlers::RelayHandler;
use crate::session::SessionStore;
use axum::{
    extract::rejection::JsonRejection,
    extract::State,
    http::{HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use mathrelay_core::protocol::{
    JsonRpcError, JsonRpcId, JsonRpcRequest, JsonRpcResponse, PROTOCOL_VERSION, SESSION_HEADER,
    TOOL_SEARCH,
};
use std::sync::Arc;
use tracing::warn;

/// Shared relay state
#[derive(Clone)]
pub struct RelayState {
    pub handler: Arc<RelayHandler>,
    pub sessions: Arc<SessionStore>,
}

/// Build the relay router.
pub fn relay_router(state: RelayState) -> Router {
    Router::new()
        .route("/mcp", post(handle_dispatch).delete(handle_terminate))
        .route("/mcp/health", get(handle_health))
        .with_state(state)
}

fn session_token(headers: &HeaderMap) -> Option<&str> {
    headers.get(SESSION_HEADER).and_then(|v| v.to_str().ok())
}

/// Handle JSON-RPC dispatch over HTTP POST.
async fn handle_dispatch(
    State(state): State<RelayState>,
    headers: HeaderMap,
    payload: Result<Json<JsonRpcRequest>, JsonRejection>,
) -> Response {
    let request = match payload {
        Ok(Json(request)) => request,
        Err(rejection) => {
            warn!(error = %rejection, "Malformed request body");
            let envelope = JsonRpcResponse::error(
                JsonRpcId::Null,
                JsonRpcError::parse_error(format!("Invalid request body: {}", rejection)),
            );
            return (StatusCode::BAD_REQUEST, Json(envelope)).into_response();
        }
    };

    let outcome = state
        .handler
        .handle_request(session_token(&headers), request)
        .await;

    let mut response = Json(outcome.response).into_response();
    if let Some(token) = outcome.session_token {
        if let Ok(value) = HeaderValue::from_str(&token) {
            response.headers_mut().insert(SESSION_HEADER, value);
        }
    }
    response
}

/// Handle session termination over HTTP DELETE.
async fn handle_terminate(
    State(state): State<RelayState>,
    headers: HeaderMap,
) -> Json<JsonRpcResponse> {
    Json(state.handler.handle_terminate(session_token(&headers)))
}

/// Handle relay health check (GET /mcp/health).
async fn handle_health(State(state): State<RelayState>) -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "ok",
        "protocol_version": PROTOCOL_VERSION,
        "server_name": "mathrelay",
        "server_version": env!("CARGO_PKG_VERSION"),
        "active_sessions": state.sessions.len(),
        "capabilities": {
            "tools": [TOOL_SEARCH],
        },
    }))
}
