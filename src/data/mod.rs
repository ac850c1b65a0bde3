//! Response data files.
//!
//! # Data Flow
//! ```text
//! File descriptor ("users/tom")
//!     → reader.rs (locate under data_dir, complete extension / index file)
//!     → render by extension (.json, .txt with header block, anything else raw)
//!     → MockResponse
//! ```
//!
//! # Design Decisions
//! - Files are read per request so edits show up without a reload
//! - Paths never leave the data directory

pub mod reader;

pub use reader::{read_response, DataError};
