//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML/JSON)
//!     → loader.rs (locate, parse & deserialize, anchor directories)
//!     → validation.rs (semantic checks, rule keys)
//!     → MockConfig (validated, immutable)
//!
//! On file change (watch enabled):
//!     watcher.rs detects change
//!     → loader.rs loads new config
//!     → validation.rs validates
//!     → channel → reload task recompiles and publishes the rule table
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; changes require full reload
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks
//! - Only the rule set is hot reloaded; listener settings need a restart

pub mod loader;
pub mod schema;
pub mod validation;
pub mod watcher;

pub use loader::{load_config, resolve_config_path, LoadError};
pub use schema::{MockConfig, ObservabilityConfig, RawDescriptor, ServerConfig};
pub use validation::{validate_config, ValidationError};
pub use watcher::ConfigWatcher;
