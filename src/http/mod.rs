//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → request ID, tracing, CORS, timeout, access_log.rs
//!     → server.rs catch-all handler
//!     → request.rs (decode path, parse query)
//!     → routing snapshot lookup
//!     → render: inline JSON | data file | handler
//!       or fall through: static directory | 404 (response.rs)
//!     → Send to client
//! ```

pub mod access_log;
pub mod request;
pub mod response;
pub mod server;

pub use request::{RequestTarget, X_REQUEST_ID};
pub use server::{AppState, MockServer, MockServerBuilder, RuleSet};
