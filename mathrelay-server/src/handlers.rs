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

//! Relay request dispatch.
//!
//! Routes each envelope through the session state machine: a handshake
//! with no session header establishes a session; every other call must
//! carry a live token, which is touched as a side effect. The only
//! suspension point is the gateway dispatch inside the search tool branch,
//! which runs under a bounded wait.

use crate::gateway::SearchProvider;
use crate::session::SessionStore;
use mathrelay_core::protocol::*;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

/// Dispatch result: the response envelope plus the session token to echo
/// in the `mcp-session-id` response header, when one applies.
pub struct DispatchOutcome {
    pub response: JsonRpcResponse,
    pub session_token: Option<String>,
}

impl DispatchOutcome {
    fn without_session(response: JsonRpcResponse) -> Self {
        Self {
            response,
            session_token: None,
        }
    }
}

/// Relay request handler
pub struct RelayHandler {
    sessions: Arc<SessionStore>,
    gateway: Arc<dyn SearchProvider>,
    search_timeout: Duration,
}

impl RelayHandler {
    pub fn new(
        sessions: Arc<SessionStore>,
        gateway: Arc<dyn SearchProvider>,
        search_timeout: Duration,
    ) -> Self {
        Self {
            sessions,
            gateway,
            search_timeout,
        }
    }

    /// Handle a JSON-RPC request, with the session token from the request
    /// header if one was present.
    pub async fn handle_request(
        &self,
        session: Option<&str>,
        request: JsonRpcRequest,
    ) -> DispatchOutcome {
        info!(method = %request.method, "Relay request received");

        match session {
            // A call bearing a header must reference a live session; touch
            // is the validation side effect.
            Some(token) => {
                if !self.sessions.touch(token) {
                    warn!(token = %token, "Unknown session token");
                    return DispatchOutcome::without_session(JsonRpcResponse::error(
                        request.id,
                        JsonRpcError::invalid_session(),
                    ));
                }

                let response = match request.method.as_str() {
                    // Re-initialize on a live session: return the descriptor
                    // again without minting a new token.
                    METHOD_INITIALIZE => self.handle_initialize(request.id),
                    METHOD_TOOL_INVOKE => self.handle_tool_invoke(request.id, request.params).await,
                    other => {
                        warn!(method = %other, "Unknown relay method");
                        JsonRpcResponse::error(request.id, JsonRpcError::method_not_found(other))
                    }
                };

                DispatchOutcome {
                    response,
                    session_token: Some(token.to_string()),
                }
            }

            // No header: only the handshake is reachable.
            None => match request.method.as_str() {
                METHOD_INITIALIZE => {
                    let token = self.sessions.create();
                    info!(token = %token, "Session established");
                    DispatchOutcome {
                        response: self.handle_initialize(request.id),
                        session_token: Some(token),
                    }
                }
                _ => DispatchOutcome::without_session(JsonRpcResponse::error(
                    request.id,
                    JsonRpcError::invalid_session(),
                )),
            },
        }
    }

    /// Handle an explicit termination request (HTTP DELETE).
    pub fn handle_terminate(&self, session: Option<&str>) -> JsonRpcResponse {
        match session {
            Some(token) if self.sessions.delete(token) => {
                info!(token = %token, "Session terminated");
                JsonRpcResponse::success(JsonRpcId::Null, json!({}))
            }
            _ => JsonRpcResponse::error(JsonRpcId::Null, JsonRpcError::invalid_session()),
        }
    }

    /// Handshake response: the fixed capability descriptor.
    fn handle_initialize(&self, id: JsonRpcId) -> JsonRpcResponse {
        let result = InitializeResult::current();
        JsonRpcResponse::success(id, serde_json::to_value(result).unwrap())
    }

    /// Tool invocation: route to the search gateway under a bounded wait.
    async fn handle_tool_invoke(
        &self,
        id: JsonRpcId,
        params: Option<serde_json::Value>,
    ) -> JsonRpcResponse {
        let call_params: ToolInvokeParams = match params {
            Some(p) => match serde_json::from_value(p) {
                Ok(params) => params,
                Err(e) => {
                    return JsonRpcResponse::error(
                        id,
                        JsonRpcError::invalid_params(format!("Invalid tool call params: {}", e)),
                    )
                }
            },
            None => {
                return JsonRpcResponse::error(
                    id,
                    JsonRpcError::invalid_params("Missing tool call params"),
                )
            }
        };

        if call_params.name != TOOL_SEARCH {
            warn!(tool = %call_params.name, "Unknown tool");
            return JsonRpcResponse::error(id, JsonRpcError::tool_not_found(&call_params.name));
        }

        let args: SearchToolArgs = match serde_json::from_value(serde_json::Value::Object(
            call_params
                .arguments
                .into_iter()
                .collect::<serde_json::Map<String, serde_json::Value>>(),
        )) {
            Ok(args) => args,
            Err(e) => {
                return JsonRpcResponse::error(
                    id,
                    JsonRpcError::invalid_params(format!("Invalid search arguments: {}", e)),
                )
            }
        };

        // The limit is a positive integer; zero would dispatch upstream
        // only to discard every hit.
        if args.limit == 0 {
            return JsonRpcResponse::error(
                id,
                JsonRpcError::invalid_params("Search limit must be positive"),
            );
        }

        info!(query = %args.query, limit = args.limit, "Executing search tool");

        let search = self.gateway.search(&args.query, args.limit, &args.engines);
        match tokio::time::timeout(self.search_timeout, search).await {
            Ok(Ok(results)) => JsonRpcResponse::success(id, serde_json::to_value(results).unwrap()),
            Ok(Err(e)) => {
                error!(error = %e, "Upstream search failed");
                JsonRpcResponse::error(
                    id,
                    JsonRpcError::internal_error(format!("Search failed: {}", e)),
                )
            }
            Err(_) => {
                error!(timeout_secs = self.search_timeout.as_secs(), "Upstream search timed out");
                JsonRpcResponse::error(
                    id,
                    JsonRpcError::internal_error(format!(
                        "Search timed out after {}s",
                        self.search_timeout.as_secs()
                    )),
                )
            }
        }
    }
}
