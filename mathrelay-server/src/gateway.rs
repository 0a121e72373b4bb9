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

//! Search gateway.
//!
//! Performs the single external query-and-fetch operation and normalizes
//! upstream hits into [`SearchResult`] records. Failures are surfaced as
//! explicit [`GatewayError`] values for the dispatcher's error path; this
//! gateway never swallows an upstream failure into an empty success.

use crate::config::SearchConfig;
use async_trait::async_trait;
use mathrelay_core::search::{RawSearchHit, SearchResult};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

/// Fixed keyword phrase marking a query as already domain-steered.
pub const DOMAIN_PHRASE: &str = "math problem solution";

/// Gateway-level errors, all reported to callers through the dispatcher's
/// internal-error path.
#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("search request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("search service returned status {0}")]
    UpstreamStatus(u16),
    #[error("malformed search response: {0}")]
    Malformed(String),
}

/// Seam between the dispatcher and the backing search capability.
#[async_trait]
pub trait SearchProvider: Send + Sync {
    async fn search(
        &self,
        query: &str,
        limit: usize,
        engines: &[String],
    ) -> Result<Vec<SearchResult>, GatewayError>;
}

/// Prefix the query with the domain-steering phrase unless it already
/// references the problem-solving domain.
pub fn steer_query(query: &str) -> String {
    if query.to_lowercase().contains(DOMAIN_PHRASE) {
        query.to_string()
    } else {
        format!("{}: {}", DOMAIN_PHRASE, query)
    }
}

/// Body POSTed to the upstream search service.
#[derive(Debug, Serialize)]
struct UpstreamQuery<'a> {
    query: &'a str,
    limit: usize,
    engines: &'a [String],
}

/// Hit list as the upstream search service reports it.
#[derive(Debug, Deserialize)]
struct UpstreamResponse {
    #[serde(default)]
    results: Vec<RawSearchHit>,
}

/// Normalize upstream hits, dropping URL-less entries and capping at
/// `limit`. Order is preserved.
fn normalize_hits(hits: Vec<RawSearchHit>, limit: usize, default_engine: &str) -> Vec<SearchResult> {
    hits.into_iter()
        .filter_map(|hit| {
            let normalized = SearchResult::from_raw(hit, default_engine);
            if normalized.is_none() {
                warn!("Dropping search hit without a URL");
            }
            normalized
        })
        .take(limit)
        .collect()
}

/// HTTP gateway to the backing web-search service.
pub struct HttpSearchGateway {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpSearchGateway {
    pub fn new(config: &SearchConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint: config.endpoint.clone(),
        }
    }
}

#[async_trait]
impl SearchProvider for HttpSearchGateway {
    async fn search(
        &self,
        query: &str,
        limit: usize,
        engines: &[String],
    ) -> Result<Vec<SearchResult>, GatewayError> {
        let steered = steer_query(query);
        debug!(query = %steered, limit, "Dispatching upstream search");

        let response = self
            .client
            .post(&self.endpoint)
            .json(&UpstreamQuery {
                query: &steered,
                limit,
                engines,
            })
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(GatewayError::UpstreamStatus(status.as_u16()));
        }

        let body: UpstreamResponse = response
            .json()
            .await
            .map_err(|e| GatewayError::Malformed(e.to_string()))?;

        let default_engine = engines.first().map(String::as_str).unwrap_or("web");
        Ok(normalize_hits(body.results, limit, default_engine))
    }
}
