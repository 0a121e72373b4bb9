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

//! Normalized search records.
//!
//! Upstream engines return loosely-shaped hits; the relay hands callers a
//! uniform record with provenance. Normalization lives here so the gateway
//! and its tests share one definition of the fallback rules.

use serde::{Deserialize, Serialize};

/// Placeholder body text for hits the upstream returned without one.
pub const NO_DESCRIPTION_PLACEHOLDER: &str = "No description available";

/// A single normalized search hit.
///
/// Field names are wire-stable: consumers read `title`, `url`, and
/// `description` from each record.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SearchResult {
    pub title: String,
    pub url: String,
    pub description: String,
    /// Provenance tag naming the backing engine.
    pub engine: String,
}

/// A raw hit as the upstream search service reports it.
///
/// Only `url` is load-bearing; everything else is optional and normalized
/// by [`SearchResult::from_raw`]. Some engines report body text under
/// `snippet`, others under `text`.
#[derive(Debug, Clone, Deserialize)]
pub struct RawSearchHit {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub snippet: Option<String>,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub engine: Option<String>,
}

impl SearchResult {
    /// Normalize a raw upstream hit.
    ///
    /// Returns `None` when the hit has no URL; a missing title falls back
    /// to the URL, missing body text to [`NO_DESCRIPTION_PLACEHOLDER`],
    /// and a missing provenance tag to `default_engine`.
    pub fn from_raw(raw: RawSearchHit, default_engine: &str) -> Option<Self> {
        let url = raw.url.filter(|u| !u.is_empty())?;
        let title = raw
            .title
            .filter(|t| !t.is_empty())
            .unwrap_or_else(|| url.clone());
        let description = raw
            .snippet
            .or(raw.text)
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| NO_DESCRIPTION_PLACEHOLDER.to_string());
        let engine = raw
            .engine
            .filter(|e| !e.is_empty())
            .unwrap_or_else(|| default_engine.to_string());

        Some(Self {
            title,
            url,
            description,
            engine,
        })
    }
}
