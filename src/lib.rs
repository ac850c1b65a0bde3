//! Configurable mock API server.
//!
//! Rules map `"{METHOD} {PATH}[?QUERY]"` keys to responses: inline JSON, a
//! file under the data directory, or a programmatic handler. Requests are
//! matched against an immutable compiled table that a config reload swaps
//! atomically.

pub mod config;
pub mod data;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod routing;

pub use config::{load_config, MockConfig};
pub use http::{MockServer, MockServerBuilder};
pub use lifecycle::Shutdown;
pub use routing::{compile, MatchTable, MockRequest, MockResponse, ResponseDescriptor};
