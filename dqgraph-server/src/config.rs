// Copyright 2025 DQGraph Contributors
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
use std::path::{Path, PathBuf};

/// DQGraph server configuration. Constructed once at startup and
/// passed into each component; no component reads the environment
/// directly.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default)]
    pub server: HttpServerConfig,
    #[serde(default)]
    pub pipeline: PipelineConfig,
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub llm: LlmConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct HttpServerConfig {
    /// HTTP API listen address (e.g., "127.0.0.1:7444")
    #[serde(default = "default_http_addr")]
    pub listen_addr: String,

    /// Enable CORS on /api routes
    #[serde(default = "default_enable_cors")]
    pub enable_cors: bool,

    /// Maximum upload size in bytes
    #[serde(default = "default_max_upload_bytes")]
    pub max_upload_bytes: usize,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PipelineConfig {
    /// Directory holding the pipeline artifacts (data.json,
    /// rules.yml, rules.rml.ttl, output.ttl). Mounted as /data inside
    /// the converter containers.
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// YARRRML-to-RML converter image
    #[serde(default = "default_yarrrml_image")]
    pub yarrrml_image: String,

    /// RML-to-RDF mapper image
    #[serde(default = "default_rmlmapper_image")]
    pub rmlmapper_image: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StoreConfig {
    /// Triple store base URL (e.g., "http://localhost:7200")
    #[serde(default = "default_store_base")]
    pub base_url: String,

    /// Repository identifier
    #[serde(default = "default_repository")]
    pub repository: String,

    /// Request timeout for store calls, in seconds
    #[serde(default = "default_store_timeout")]
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LlmConfig {
    /// Completion provider API key
    pub api_key: Option<String>,

    /// Completion provider base URL (OpenAI-compatible)
    #[serde(default = "default_llm_base")]
    pub api_base: String,

    /// Model name
    #[serde(default = "default_llm_model")]
    pub model: String,
}

// Default values
fn default_http_addr() -> String {
    "127.0.0.1:7444".to_string()
}

fn default_enable_cors() -> bool {
    true
}

fn default_max_upload_bytes() -> usize {
    10 * 1024 * 1024
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("./data")
}

fn default_yarrrml_image() -> String {
    "rmlio/yarrrml-parser:1.10.0".to_string()
}

fn default_rmlmapper_image() -> String {
    "rmlio/rmlmapper-java:v7.3.3".to_string()
}

fn default_store_base() -> String {
    "http://localhost:7200".to_string()
}

fn default_repository() -> String {
    "bachelor2025".to_string()
}

fn default_store_timeout() -> u64 {
    60
}

fn default_llm_base() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_llm_model() -> String {
    "gpt-4o-mini".to_string()
}

impl Default for HttpServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: default_http_addr(),
            enable_cors: default_enable_cors(),
            max_upload_bytes: default_max_upload_bytes(),
        }
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            yarrrml_image: default_yarrrml_image(),
            rmlmapper_image: default_rmlmapper_image(),
        }
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            base_url: default_store_base(),
            repository: default_repository(),
            timeout_secs: default_store_timeout(),
        }
    }
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            api_base: default_llm_base(),
            model: default_llm_model(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            server: HttpServerConfig::default(),
            pipeline: PipelineConfig::default(),
            store: StoreConfig::default(),
            llm: LlmConfig::default(),
        }
    }
}

impl StoreConfig {
    /// Repository endpoint URL, trailing slashes on the base trimmed.
    pub fn repository_url(&self) -> String {
        format!(
            "{}/repositories/{}",
            self.base_url.trim_end_matches('/'),
            self.repository
        )
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
    /// - DQGRAPH_HTTP_ADDR: HTTP listen address (default: 127.0.0.1:7444)
    /// - DQGRAPH_ENABLE_CORS: Enable CORS (default: true)
    /// - DQGRAPH_DATA_DIR: Pipeline artifact directory (default: ./data)
    /// - DQGRAPH_YARRRML_IMAGE / DQGRAPH_RMLMAPPER_IMAGE: converter images
    /// - GRAPHDB_BASE: Triple store base URL (default: http://localhost:7200)
    /// - GRAPHDB_REPO: Repository identifier (default: bachelor2025)
    /// - OPENAI_API_KEY / OPENAI_API_BASE / OPENAI_MODEL: completion provider
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(addr) = std::env::var("DQGRAPH_HTTP_ADDR") {
            config.server.listen_addr = addr;
        }
        if let Ok(cors) = std::env::var("DQGRAPH_ENABLE_CORS") {
            config.server.enable_cors = cors.parse().unwrap_or(true);
        }
        if let Ok(data_dir) = std::env::var("DQGRAPH_DATA_DIR") {
            config.pipeline.data_dir = PathBuf::from(data_dir);
        }
        if let Ok(image) = std::env::var("DQGRAPH_YARRRML_IMAGE") {
            config.pipeline.yarrrml_image = image;
        }
        if let Ok(image) = std::env::var("DQGRAPH_RMLMAPPER_IMAGE") {
            config.pipeline.rmlmapper_image = image;
        }
        if let Ok(base) = std::env::var("GRAPHDB_BASE") {
            config.store.base_url = base;
        }
        if let Ok(repo) = std::env::var("GRAPHDB_REPO") {
            config.store.repository = repo;
        }
        if let Ok(key) = std::env::var("OPENAI_API_KEY") {
            config.llm.api_key = Some(key);
        }
        if let Ok(base) = std::env::var("OPENAI_API_BASE") {
            config.llm.api_base = base;
        }
        if let Ok(model) = std::env::var("OPENAI_MODEL") {
            config.llm.model = model;
        }

        config
    }

    /// Load configuration with priority: file > env > defaults
    pub fn load(config_file: Option<PathBuf>) -> Result<Self> {
        let mut config = if let Some(path) = config_file {
            if path.exists() {
                tracing::info!("Loading configuration from file: {:?}", path);
                Self::from_file(&path)?
            } else {
                tracing::warn!("Config file not found: {:?}, using defaults", path);
                Self::from_env()
            }
        } else {
            Self::from_env()
        };

        // Env always supplies the provider key when the file omits it.
        if config.llm.api_key.is_none() {
            if let Ok(key) = std::env::var("OPENAI_API_KEY") {
                config.llm.api_key = Some(key);
            }
        }

        Ok(config)
    }

    /// Parse listen address as SocketAddr
    pub fn socket_addr(&self) -> Result<SocketAddr> {
        Ok(self.server.listen_addr.parse()?)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        self.socket_addr()?;

        if self.store.base_url.is_empty() {
            anyhow::bail!("store.base_url must not be empty");
        }
        if self.store.repository.is_empty() {
            anyhow::bail!("store.repository must not be empty");
        }

        // The artifact directory must exist before the first upload.
        if !self.pipeline.data_dir.exists() {
            std::fs::create_dir_all(&self.pipeline.data_dir)?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ServerConfig::default();
        assert_eq!(config.server.listen_addr, "127.0.0.1:7444");
        assert_eq!(config.store.repository, "bachelor2025");
        assert_eq!(config.store.timeout_secs, 60);
        assert_eq!(config.llm.model, "gpt-4o-mini");
    }

    #[test]
    fn test_repository_url_trims_trailing_slash() {
        let store = StoreConfig {
            base_url: "http://localhost:7200/".to_string(),
            repository: "dq".to_string(),
            timeout_secs: 60,
        };
        assert_eq!(store.repository_url(), "http://localhost:7200/repositories/dq");
    }

    #[test]
    fn test_from_toml() {
        let config: ServerConfig = toml::from_str(
            r#"
            [store]
            base_url = "http://graphdb:7200"
            repository = "scores"

            [pipeline]
            data_dir = "/srv/data"
            "#,
        )
        .unwrap();
        assert_eq!(config.store.base_url, "http://graphdb:7200");
        assert_eq!(config.store.repository, "scores");
        assert_eq!(config.pipeline.data_dir, PathBuf::from("/srv/data"));
        // Unspecified sections fall back to defaults.
        assert_eq!(config.llm.model, "gpt-4o-mini");
    }
}
