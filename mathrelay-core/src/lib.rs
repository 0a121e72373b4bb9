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

//! Wire-level types for the Mathrelay MCP relay.
//!
//! This crate holds the JSON-RPC 2.0 envelope, the MCP method and header
//! names the relay speaks, and the normalized [`search::SearchResult`]
//! record handed back to callers. It performs no I/O; everything stateful
//! lives in `mathrelay-server`.

pub mod protocol;
pub mod search;

pub use protocol::*;
pub use search::{RawSearchHit, SearchResult};
