//! Configuration schema definitions.
//!
//! All types derive Serde traits for deserialization from TOML or JSON
//! config files; every section has defaults so an `api` table alone is a
//! valid config.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::routing::compiler::{compile, ConfigError};
use crate::routing::descriptor::ResponseDescriptor;
use crate::routing::table::MatchTable;

/// Root configuration for the mock server.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct MockConfig {
    /// Directory file descriptors are resolved against.
    #[serde(alias = "dataFile")]
    pub data_dir: PathBuf,

    /// Directory served for requests no rule answers.
    #[serde(alias = "staticFile")]
    pub static_dir: Option<PathBuf>,

    /// Reload the rule set when the config file changes.
    pub watch: bool,

    pub server: ServerConfig,

    pub observability: ObservabilityConfig,

    /// Rule key → response, in document order.
    pub api: IndexMap<String, RawDescriptor>,
}

impl Default for MockConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("./data"),
            static_dir: None,
            watch: false,
            server: ServerConfig::default(),
            observability: ObservabilityConfig::default(),
            api: IndexMap::new(),
        }
    }
}

impl MockConfig {
    /// Rules in declaration order.
    pub fn rules(&self) -> impl Iterator<Item = (&str, ResponseDescriptor)> + '_ {
        self.api
            .iter()
            .map(|(key, raw)| (key.as_str(), raw.to_descriptor()))
    }

    /// Whether any rule reads from `data_dir`.
    pub fn uses_data_files(&self) -> bool {
        self.rules()
            .any(|(_, d)| matches!(d, ResponseDescriptor::File(_)))
    }

    /// Compile only the configured rules.
    pub fn compile(&self) -> Result<MatchTable, ConfigError> {
        compile(self.rules())
    }

    /// Settings that only take effect at startup.
    pub fn needs_restart(&self, other: &MockConfig) -> bool {
        self.server != other.server
            || self.data_dir != other.data_dir
            || self.static_dir != other.static_dir
            || self.observability != other.observability
    }
}

/// A response as written in the config file.
///
/// A string is classified (inline JSON or file name); any other JSON
/// value is an inline body.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(untagged)]
pub enum RawDescriptor {
    Text(String),
    Json(serde_json::Value),
}

impl RawDescriptor {
    pub fn to_descriptor(&self) -> ResponseDescriptor {
        match self {
            RawDescriptor::Text(text) => ResponseDescriptor::classify(text),
            RawDescriptor::Json(value) => ResponseDescriptor::json(value.to_string()),
        }
    }
}

impl From<&str> for RawDescriptor {
    fn from(text: &str) -> Self {
        RawDescriptor::Text(text.to_string())
    }
}

impl From<serde_json::Value> for RawDescriptor {
    fn from(value: serde_json::Value) -> Self {
        RawDescriptor::Json(value)
    }
}

/// Listener and request handling settings.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct ServerConfig {
    /// Bind address (e.g., "127.0.0.1:8008").
    pub bind_address: String,

    pub request_timeout_secs: u64,

    /// Largest request body buffered for handler rules.
    pub max_body_size: usize,

    /// Answer with permissive CORS headers.
    pub cors: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: "127.0.0.1:8008".to_string(),
            request_timeout_secs: 30,
            max_body_size: 2 * 1024 * 1024,
            cors: true,
        }
    }
}

impl ServerConfig {
    /// Replace the port of `bind_address`.
    pub fn set_port(&mut self, port: u16) {
        let host = self
            .bind_address
            .rsplit_once(':')
            .map(|(host, _)| host)
            .unwrap_or(self.bind_address.as_str());
        self.bind_address = format!("{}:{}", host, port);
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error) or a full filter.
    pub log_level: String,

    /// Enable the Prometheus endpoint.
    pub metrics_enabled: bool,

    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: false,
            metrics_address: "127.0.0.1:9090".to_string(),
        }
    }
}
