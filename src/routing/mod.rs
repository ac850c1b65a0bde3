//! Routing subsystem: rule compilation and request matching.
//!
//! # Data Flow
//! ```text
//! Rule Compilation (at load and on every reload):
//!     ordered "{METHOD} {PATH}[?QUERY]" → descriptor map
//!     → compiler.rs (parse keys, bucket by method/path/signature)
//!     → MatchTable (immutable)
//!     → store.rs (atomic publish)
//!
//! Incoming Request (method, decoded path, query params)
//!     → resolver.rs (exact path, else first matching wildcard path)
//!     → path.rs (wildcard segment matching)
//!     → query.rs (signature bucket, then value matching)
//!     → Return: matched descriptor or no-match
//! ```
//!
//! # Design Decisions
//! - Tables are compiled once and only ever replaced, never mutated
//! - Deterministic: first registered rule wins, exact path before wildcard
//! - No-match is an ordinary outcome; the HTTP layer falls through

pub mod compiler;
pub mod descriptor;
pub mod path;
pub mod query;
pub mod resolver;
pub mod store;
pub mod table;

pub use compiler::{compile, ConfigError, RuleKey};
pub use descriptor::{MockRequest, MockResponse, ResponseDescriptor, ResponseHandler};
pub use path::match_path;
pub use query::{match_query, match_value, QueryParams, QueryPattern, QueryValue};
pub use resolver::{lookup, resolve, Matched};
pub use store::{RouteStore, TableSnapshot};
pub use table::{HttpMethod, MatchTable};
