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

//! Mathrelay server: an MCP-style relay between a mathematics-tutoring
//! agent and a backing web-search service.
//!
//! The relay accepts JSON-RPC envelopes over HTTP, scopes callers with
//! opaque session tokens carried in the `mcp-session-id` header, and
//! forwards the single `search` tool to the upstream search service.

pub mod config;
pub mod gateway;
pub mod handlers;
pub mod http;
pub mod session;

use anyhow::Result;
use config::ServerConfig;
use gateway::HttpSearchGateway;
use handlers::RelayHandler;
use http::{relay_router, RelayState};
use session::SessionStore;
use std::sync::Arc;
use std::time::Duration;
use tower_http::{
    cors::{AllowOrigin, Any, CorsLayer},
    trace::TraceLayer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

fn cors_layer(origins: &[String]) -> CorsLayer {
    if origins.is_empty() {
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any)
    } else {
        let parsed: Vec<axum::http::HeaderValue> = origins
            .iter()
            .filter_map(|origin| origin.parse().ok())
            .collect();
        CorsLayer::new()
            .allow_origin(AllowOrigin::list(parsed))
            .allow_methods(Any)
            .allow_headers(Any)
    }
}

pub async fn run_server(config: ServerConfig) -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "mathrelay_server=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Mathrelay Server");
    tracing::info!("Configuration: {:#?}", config);

    config.validate()?;

    let sessions = Arc::new(SessionStore::new());
    let gateway = Arc::new(HttpSearchGateway::new(&config.search));
    let handler = Arc::new(RelayHandler::new(
        sessions.clone(),
        gateway,
        Duration::from_secs(config.search.request_timeout_secs),
    ));
    let state = RelayState {
        handler,
        sessions: sessions.clone(),
    };

    // Optional idle-expiry sweeper
    if let Some(idle_secs) = config.session.idle_timeout_secs {
        let sweep_interval = Duration::from_secs(config.session.sweep_interval_secs);
        let max_idle = Duration::from_secs(idle_secs);
        let sweep_store = sessions.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(sweep_interval);
            loop {
                ticker.tick().await;
                let swept = sweep_store.sweep_expired(max_idle);
                if swept > 0 {
                    tracing::info!(swept, "Expired idle sessions");
                }
            }
        });
        tracing::info!(idle_secs, "Session idle expiry enabled");
    }

    let mut router = relay_router(state).layer(TraceLayer::new_for_http());
    if config.server.enable_cors {
        router = router.layer(cors_layer(&config.server.cors_origins));
    }

    let addr = config.socket_addr()?;
    tracing::info!("Relay listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, router).await?;

    Ok(())
}
