//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (timeouts > 0, ports valid)
//! - Check that referenced directories exist
//! - Check that every rule key compiles
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: MockConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::net::SocketAddr;
use std::path::PathBuf;
use thiserror::Error;
use tracing_subscriber::EnvFilter;

use crate::config::schema::MockConfig;
use crate::routing::compiler::{ConfigError, RuleKey};

/// Lowest port a mock server may bind besides 0 (ephemeral).
pub const MIN_PORT: u16 = 1024;

/// A single semantic problem with a config.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("invalid bind address `{0}`, expect host:port")]
    InvalidBindAddress(String),

    #[error("port {0} is reserved, use 0 or a port >= 1024")]
    ReservedPort(u16),

    #[error("request_timeout_secs must be greater than zero")]
    ZeroTimeout,

    #[error("max_body_size must be greater than zero")]
    ZeroBodyLimit,

    #[error("invalid log level `{0}`")]
    InvalidLogLevel(String),

    #[error("invalid metrics address `{0}`")]
    InvalidMetricsAddress(String),

    #[error("data directory does not exist: {}", .0.display())]
    MissingDataDir(PathBuf),

    #[error("static directory does not exist: {}", .0.display())]
    MissingStaticDir(PathBuf),

    #[error(transparent)]
    Rule(#[from] ConfigError),
}

/// Check `config` and report every problem found.
pub fn validate_config(config: &MockConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    match split_port(&config.server.bind_address) {
        Some(port) if port != 0 && port < MIN_PORT => {
            errors.push(ValidationError::ReservedPort(port));
        }
        Some(_) => {}
        None => errors.push(ValidationError::InvalidBindAddress(
            config.server.bind_address.clone(),
        )),
    }

    if config.server.request_timeout_secs == 0 {
        errors.push(ValidationError::ZeroTimeout);
    }
    if config.server.max_body_size == 0 {
        errors.push(ValidationError::ZeroBodyLimit);
    }

    if EnvFilter::try_new(&config.observability.log_level).is_err() {
        errors.push(ValidationError::InvalidLogLevel(
            config.observability.log_level.clone(),
        ));
    }
    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::InvalidMetricsAddress(
            config.observability.metrics_address.clone(),
        ));
    }

    if config.uses_data_files() && !config.data_dir.is_dir() {
        errors.push(ValidationError::MissingDataDir(config.data_dir.clone()));
    }
    if let Some(dir) = &config.static_dir {
        if !dir.is_dir() {
            errors.push(ValidationError::MissingStaticDir(dir.clone()));
        }
    }

    for key in config.api.keys() {
        if let Err(e) = RuleKey::parse(key) {
            errors.push(e.into());
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// Port of a `host:port` address; the host may be a name.
fn split_port(address: &str) -> Option<u16> {
    let (host, port) = address.rsplit_once(':')?;
    if host.is_empty() {
        return None;
    }
    port.parse().ok()
}
