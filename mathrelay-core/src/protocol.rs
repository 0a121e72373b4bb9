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

//! Relay Protocol Types
//!
//! JSON-RPC 2.0 message types for the web-search relay. The relay speaks a
//! single capability handshake (`mcp.initialize`) and a single tool
//! invocation shape (`mcp.tool.invoke`); session scoping travels in the
//! `mcp-session-id` HTTP header, never in the envelope.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// JSON-RPC 2.0 protocol version
pub const JSONRPC_VERSION: &str = "2.0";

/// Relay protocol version advertised in the capability descriptor
pub const PROTOCOL_VERSION: &str = "1.0";

/// HTTP header carrying the session token
pub const SESSION_HEADER: &str = "mcp-session-id";

/// Capability handshake method
pub const METHOD_INITIALIZE: &str = "mcp.initialize";

/// Tool invocation method
pub const METHOD_TOOL_INVOKE: &str = "mcp.tool.invoke";

/// The single tool the relay exposes
pub const TOOL_SEARCH: &str = "search";

// =============================================================================
// Core JSON-RPC 2.0 Types
// =============================================================================

/// JSON-RPC 2.0 Request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcRequest {
    pub jsonrpc: String,
    pub method: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub params: Option<serde_json::Value>,
    #[serde(default)]
    pub id: JsonRpcId,
}

/// JSON-RPC 2.0 Response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcResponse {
    pub jsonrpc: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<JsonRpcError>,
    pub id: JsonRpcId,
}

/// JSON-RPC 2.0 ID (string, number, or null)
///
/// Echoed verbatim from request to response; an absent id echoes null.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(untagged)]
pub enum JsonRpcId {
    String(String),
    Number(i64),
    #[default]
    Null,
}

/// JSON-RPC 2.0 Error
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcError {
    pub code: i32,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

impl JsonRpcError {
    /// Parse error (-32700): request body was not a valid envelope
    pub fn parse_error(message: impl Into<String>) -> Self {
        Self {
            code: -32700,
            message: message.into(),
            data: None,
        }
    }

    /// Bad request (-32600): missing, unknown, or stale session token
    pub fn invalid_session() -> Self {
        Self {
            code: -32600,
            message: "Bad request: missing or invalid session".to_string(),
            data: None,
        }
    }

    /// Method not found (-32601)
    pub fn method_not_found(method: &str) -> Self {
        Self {
            code: -32601,
            message: format!("Method not found: {}", method),
            data: None,
        }
    }

    /// Tool not found (-32601): same routing-error code as an unknown method
    pub fn tool_not_found(name: &str) -> Self {
        Self {
            code: -32601,
            message: format!("Tool not found: {}", name),
            data: None,
        }
    }

    /// Invalid params (-32602)
    pub fn invalid_params(message: impl Into<String>) -> Self {
        Self {
            code: -32602,
            message: message.into(),
            data: None,
        }
    }

    /// Internal error (-32603): upstream search failure or timeout
    pub fn internal_error(message: impl Into<String>) -> Self {
        Self {
            code: -32603,
            message: message.into(),
            data: None,
        }
    }
}

impl JsonRpcResponse {
    /// Create a success response
    pub fn success(id: JsonRpcId, result: serde_json::Value) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            result: Some(result),
            error: None,
            id,
        }
    }

    /// Create an error response
    pub fn error(id: JsonRpcId, error: JsonRpcError) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            result: None,
            error: Some(error),
            id,
        }
    }
}

// =============================================================================
// Relay Protocol Types
// =============================================================================

/// Capability descriptor returned by the handshake
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InitializeResult {
    pub version: String,
    pub capabilities: Capabilities,
}

/// Advertised capabilities: the relay exposes tools only
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Capabilities {
    pub tools: Vec<String>,
}

impl InitializeResult {
    /// The fixed descriptor: protocol version plus the single search tool.
    pub fn current() -> Self {
        Self {
            version: PROTOCOL_VERSION.to_string(),
            capabilities: Capabilities {
                tools: vec![TOOL_SEARCH.to_string()],
            },
        }
    }
}

/// Tool invocation params: `{ name, arguments }`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolInvokeParams {
    pub name: String,
    #[serde(default)]
    pub arguments: HashMap<String, serde_json::Value>,
}

/// Arguments for the search tool
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchToolArgs {
    /// Natural language query
    pub query: String,
    /// Maximum results to return
    #[serde(default = "default_limit")]
    pub limit: usize,
    /// Backing engines to query, in preference order
    #[serde(default = "default_engines")]
    pub engines: Vec<String>,
}

/// Authoritative default result limit.
///
/// The observed clients disagreed (3 at one call site, 5 at the gateway
/// boundary); 5 is the single default applied here at the protocol edge.
pub fn default_limit() -> usize {
    5
}

fn default_engines() -> Vec<String> {
    vec!["bing".to_string()]
}
