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

// End-to-end relay scenarios over the HTTP surface: handshake, tool
// invocation, routing and session errors, termination, and the
// malformed-body path.

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use mathrelay_core::protocol::SESSION_HEADER;
use mathrelay_core::search::SearchResult;
use mathrelay_server::gateway::{GatewayError, SearchProvider};
use mathrelay_server::handlers::RelayHandler;
use mathrelay_server::http::{relay_router, RelayState};
use mathrelay_server::session::SessionStore;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceExt;

struct StubSearch {
    results: Vec<SearchResult>,
}

#[async_trait]
impl SearchProvider for StubSearch {
    async fn search(
        &self,
        _query: &str,
        limit: usize,
        _engines: &[String],
    ) -> Result<Vec<SearchResult>, GatewayError> {
        Ok(self.results.iter().take(limit).cloned().collect())
    }
}

fn test_router() -> (Router, Arc<SessionStore>) {
    let results = vec![
        SearchResult {
            title: "Sphere volume".to_string(),
            url: "https://example.com/sphere".to_string(),
            description: "V = 4/3 pi r^3".to_string(),
            engine: "bing".to_string(),
        },
        SearchResult {
            title: "Sphere surface area".to_string(),
            url: "https://example.com/surface".to_string(),
            description: "A = 4 pi r^2".to_string(),
            engine: "bing".to_string(),
        },
        SearchResult {
            title: "Sphere properties".to_string(),
            url: "https://example.com/props".to_string(),
            description: "Basic facts".to_string(),
            engine: "bing".to_string(),
        },
    ];

    let sessions = Arc::new(SessionStore::new());
    let handler = Arc::new(RelayHandler::new(
        sessions.clone(),
        Arc::new(StubSearch { results }),
        Duration::from_secs(5),
    ));
    let state = RelayState {
        handler,
        sessions: sessions.clone(),
    };
    (relay_router(state), sessions)
}

fn post_body(body: Value, session: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri("/mcp")
        .header("content-type", "application/json");
    if let Some(token) = session {
        builder = builder.header(SESSION_HEADER, token);
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

fn delete_request(session: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method("DELETE").uri("/mcp");
    if let Some(token) = session {
        builder = builder.header(SESSION_HEADER, token);
    }
    builder.body(Body::empty()).unwrap()
}

async fn send(router: &Router, request: Request<Body>) -> (StatusCode, Option<String>, Value) {
    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let session = response
        .headers()
        .get(SESSION_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(String::from);
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let body = serde_json::from_slice(&bytes).unwrap();
    (status, session, body)
}

fn initialize(id: Value) -> Value {
    json!({"jsonrpc": "2.0", "method": "mcp.initialize", "params": {"version": "1.0"}, "id": id})
}

fn invoke_search(query: &str, limit: u64, id: Value) -> Value {
    json!({
        "jsonrpc": "2.0",
        "method": "mcp.tool.invoke",
        "params": {"name": "search", "arguments": {"query": query, "limit": limit}},
        "id": id,
    })
}

async fn handshake(router: &Router) -> String {
    let (status, session, body) = send(router, post_body(initialize(json!("init-1")), None)).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["error"].is_null());
    session.expect("handshake sets the session header")
}

#[tokio::test]
async fn test_handshake_returns_token_and_capability_descriptor() {
    let (router, sessions) = test_router();

    let (status, session, body) = send(&router, post_body(initialize(json!("req-1")), None)).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["id"], json!("req-1"));
    assert_eq!(body["result"]["version"], "1.0");
    assert_eq!(body["result"]["capabilities"]["tools"], json!(["search"]));
    assert!(body.get("error").is_none());

    let token = session.expect("session header present");
    assert!(sessions.exists(&token));
}

#[tokio::test]
async fn test_handshake_tokens_are_unique_across_calls() {
    let (router, _) = test_router();
    let mut tokens = std::collections::HashSet::new();
    for _ in 0..10 {
        assert!(tokens.insert(handshake(&router).await));
    }
}

#[tokio::test]
async fn test_search_invocation_returns_bounded_result_list() {
    let (router, _) = test_router();
    let token = handshake(&router).await;

    let (status, _, body) = send(
        &router,
        post_body(
            invoke_search("volume of a sphere", 2, json!("req-2")),
            Some(&token),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["id"], json!("req-2"));
    let results = body["result"].as_array().expect("result is a list");
    assert!(results.len() <= 2);
    for record in results {
        assert!(record["url"].as_str().is_some());
        // Consumers read the body text under `description`.
        assert!(record["description"].as_str().is_some());
    }
}

#[tokio::test]
async fn test_unknown_tool_yields_routing_error() {
    let (router, _) = test_router();
    let token = handshake(&router).await;

    let request = json!({
        "jsonrpc": "2.0",
        "method": "mcp.tool.invoke",
        "params": {"name": "integrate", "arguments": {}},
        "id": "req-3",
    });
    let (status, _, body) = send(&router, post_body(request, Some(&token))).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["error"]["code"], -32601);
    assert!(body.get("result").is_none());
}

#[tokio::test]
async fn test_unknown_method_yields_routing_error() {
    let (router, _) = test_router();
    let token = handshake(&router).await;

    let request = json!({"jsonrpc": "2.0", "method": "mcp.prompts.list", "id": 4});
    let (_, _, body) = send(&router, post_body(request, Some(&token))).await;
    assert_eq!(body["error"]["code"], -32601);
}

#[tokio::test]
async fn test_stale_token_is_rejected_and_store_unchanged() {
    let (router, sessions) = test_router();
    let _live = handshake(&router).await;
    let live_count = sessions.len();

    let (status, _, body) = send(
        &router,
        post_body(
            invoke_search("anything", 1, json!("req-5")),
            Some("never-issued-token"),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["error"]["code"], -32600);
    assert_eq!(body["id"], json!("req-5"));
    assert_eq!(sessions.len(), live_count);
}

#[tokio::test]
async fn test_terminate_then_reuse_yields_session_error() {
    let (router, sessions) = test_router();
    let token = handshake(&router).await;

    let (status, _, body) = send(&router, delete_request(Some(&token))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["result"], json!({}));
    assert!(!sessions.exists(&token));

    let (_, _, body) = send(
        &router,
        post_body(invoke_search("anything", 1, json!(6)), Some(&token)),
    )
    .await;
    assert_eq!(body["error"]["code"], -32600);

    // Terminating again fails the same way.
    let (_, _, body) = send(&router, delete_request(Some(&token))).await;
    assert_eq!(body["error"]["code"], -32600);
}

#[tokio::test]
async fn test_terminate_without_session_header_is_rejected() {
    let (router, _) = test_router();
    let (status, _, body) = send(&router, delete_request(None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["error"]["code"], -32600);
}

#[tokio::test]
async fn test_null_id_echoes_null() {
    let (router, _) = test_router();

    let request = json!({"jsonrpc": "2.0", "method": "mcp.initialize", "id": null});
    let (_, _, body) = send(&router, post_body(request, None)).await;

    assert!(body["id"].is_null());
    assert!(body["result"].is_object());
}

#[tokio::test]
async fn test_malformed_body_yields_parse_error_envelope() {
    let (router, _) = test_router();

    let request = Request::builder()
        .method("POST")
        .uri("/mcp")
        .header("content-type", "application/json")
        .body(Body::from("{not json"))
        .unwrap();

    let response = router.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let body: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(body["error"]["code"], -32700);
    assert!(body["id"].is_null());
}

#[tokio::test]
async fn test_health_reports_live_session_count() {
    let (router, _) = test_router();
    let _token = handshake(&router).await;

    let request = Request::builder()
        .method("GET")
        .uri("/mcp/health")
        .body(Body::empty())
        .unwrap();
    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let body: Value = serde_json::from_slice(&bytes).unwrap();

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["active_sessions"], 1);
    assert_eq!(body["capabilities"]["tools"], json!(["search"]));
}
