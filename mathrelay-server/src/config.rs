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

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::Path;

/// Mathrelay Server Configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default)]
    pub server: HttpServerConfig,
    #[serde(default)]
    pub search: SearchConfig,
    #[serde(default)]
    pub session: SessionConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct HttpServerConfig {
    /// HTTP listen address (e.g., "127.0.0.1:3000")
    #[serde(default = "default_http_addr")]
    pub listen_addr: String,

    /// Enable CORS
    #[serde(default = "default_enable_cors")]
    pub enable_cors: bool,

    /// Allowed CORS origins (empty = allow all, use specific origins in production)
    #[serde(default)]
    pub cors_origins: Vec<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SearchConfig {
    /// Upstream search service endpoint
    #[serde(default = "default_search_endpoint")]
    pub endpoint: String,

    /// Bounded wait on the upstream dispatch, in seconds; a timeout is
    /// reported to the caller as an internal error
    #[serde(default = "default_search_timeout")]
    pub request_timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SessionConfig {
    /// Idle expiry for sessions, in seconds. Absent = sessions never
    /// expire and the sweeper is not started.
    #[serde(default)]
    pub idle_timeout_secs: Option<u64>,

    /// How often the sweeper runs when idle expiry is configured
    #[serde(default = "default_sweep_interval")]
    pub sweep_interval_secs: u64,
}

// Default values
fn default_http_addr() -> String {
    "127.0.0.1:3000".to_string()
}

fn default_enable_cors() -> bool {
    true
}

fn default_search_endpoint() -> String {
    "http://localhost:8080/search".to_string()
}

fn default_search_timeout() -> u64 {
    30
}

fn default_sweep_interval() -> u64 {
    60
}

impl Default for HttpServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: default_http_addr(),
            enable_cors: default_enable_cors(),
            cors_origins: vec![],
        }
    }
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            endpoint: default_search_endpoint(),
            request_timeout_secs: default_search_timeout(),
        }
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            idle_timeout_secs: None,
            sweep_interval_secs: default_sweep_interval(),
        }
    }
}

impl ServerConfig {
    /// Load configuration from TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;
        Ok(config)
    }

    /// Load configuration from environment variables
    ///
    /// Supported environment variables:
    /// - MATHRELAY_HTTP_ADDR: HTTP listen address (default: 127.0.0.1:3000)
    /// - MATHRELAY_ENABLE_CORS: Enable CORS (default: true)
    /// - MATHRELAY_SEARCH_ENDPOINT: Upstream search service URL
    /// - MATHRELAY_SEARCH_TIMEOUT: Upstream request timeout in seconds
    /// - MATHRELAY_SESSION_IDLE_TIMEOUT: Session idle expiry in seconds
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(addr) = std::env::var("MATHRELAY_HTTP_ADDR") {
            config.server.listen_addr = addr;
        }

        if let Ok(cors) = std::env::var("MATHRELAY_ENABLE_CORS") {
            config.server.enable_cors = cors.parse().unwrap_or(true);
        }

        if let Ok(endpoint) = std::env::var("MATHRELAY_SEARCH_ENDPOINT") {
            config.search.endpoint = endpoint;
        }

        if let Ok(timeout) = std::env::var("MATHRELAY_SEARCH_TIMEOUT") {
            if let Ok(val) = timeout.parse() {
                config.search.request_timeout_secs = val;
            }
        }

        if let Ok(idle) = std::env::var("MATHRELAY_SESSION_IDLE_TIMEOUT") {
            if let Ok(val) = idle.parse() {
                config.session.idle_timeout_secs = Some(val);
            }
        }

        config
    }

    /// Load configuration with priority: file > env > defaults
    pub fn load(config_file: Option<std::path::PathBuf>) -> Result<Self> {
        let mut config = if let Some(path) = config_file {
            if path.exists() {
                tracing::info!("Loading configuration from file: {:?}", path);
                Self::from_file(&path)?
            } else {
                tracing::warn!("Config file not found: {:?}, using defaults", path);
                Self::default()
            }
        } else {
            Self::default()
        };

        config = Self::merge_with_env(config);

        Ok(config)
    }

    /// Merge config with environment variables (env takes priority)
    fn merge_with_env(mut config: Self) -> Self {
        let env_config = Self::from_env();

        // Only override if env var was explicitly set
        if std::env::var("MATHRELAY_HTTP_ADDR").is_ok() {
            config.server.listen_addr = env_config.server.listen_addr;
        }
        if std::env::var("MATHRELAY_ENABLE_CORS").is_ok() {
            config.server.enable_cors = env_config.server.enable_cors;
        }
        if std::env::var("MATHRELAY_SEARCH_ENDPOINT").is_ok() {
            config.search.endpoint = env_config.search.endpoint;
        }
        if std::env::var("MATHRELAY_SEARCH_TIMEOUT").is_ok() {
            config.search.request_timeout_secs = env_config.search.request_timeout_secs;
        }
        if std::env::var("MATHRELAY_SESSION_IDLE_TIMEOUT").is_ok() {
            config.session.idle_timeout_secs = env_config.session.idle_timeout_secs;
        }

        config
    }

    /// Parse listen address as SocketAddr
    pub fn socket_addr(&self) -> Result<SocketAddr> {
        Ok(self.server.listen_addr.parse()?)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        self.socket_addr()?;

        if !self.search.endpoint.starts_with("http://")
            && !self.search.endpoint.starts_with("https://")
        {
            anyhow::bail!(
                "Search endpoint must be an http(s) URL: {}",
                self.search.endpoint
            );
        }

        if self.search.request_timeout_secs == 0 {
            anyhow::bail!("Search request timeout must be positive");
        }

        if self.session.idle_timeout_secs == Some(0) {
            anyhow::bail!("Session idle timeout must be positive when set");
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;

    // Env vars are process-global and the harness runs tests in parallel;
    // any test that touches MATHRELAY_* must hold this lock.
    static ENV_LOCK: Mutex<()> = Mutex::new(());

    #[test]
    fn test_default_config() {
        let config = ServerConfig::default();
        assert_eq!(config.server.listen_addr, "127.0.0.1:3000");
        assert_eq!(config.search.request_timeout_secs, 30);
        assert!(config.session.idle_timeout_secs.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_from_env() {
        let _guard = ENV_LOCK.lock();
        std::env::set_var("MATHRELAY_HTTP_ADDR", "0.0.0.0:8081");
        std::env::set_var("MATHRELAY_SESSION_IDLE_TIMEOUT", "300");

        let config = ServerConfig::from_env();
        assert_eq!(config.server.listen_addr, "0.0.0.0:8081");
        assert_eq!(config.session.idle_timeout_secs, Some(300));

        std::env::remove_var("MATHRELAY_HTTP_ADDR");
        std::env::remove_var("MATHRELAY_SESSION_IDLE_TIMEOUT");
    }

    #[test]
    fn test_toml_sections_are_optional() {
        let config: ServerConfig = toml::from_str(
            r#"
            [search]
            endpoint = "http://search.internal:9200/query"
            "#,
        )
        .unwrap();
        assert_eq!(config.search.endpoint, "http://search.internal:9200/query");
        assert_eq!(config.server.listen_addr, "127.0.0.1:3000");
    }

    #[test]
    fn test_validate_rejects_bad_endpoint() {
        let mut config = ServerConfig::default();
        config.search.endpoint = "localhost:9200".to_string();
        assert!(config.validate().is_err());
    }
}
