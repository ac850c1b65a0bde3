//! Per-request rule lookup.
//!
//! # Responsibilities
//! - Pick the path bucket (exact path first, then wildcards in order)
//! - Pick the rule inside the bucket from the query parameters
//! - Return the matched rule or an explicit no-match
//!
//! # Design Decisions
//! - Pure and lock-free over one table snapshot
//! - An exact path is never overridden by a wildcard path
//! - No match is `None`, not an error: the caller falls through

use indexmap::IndexMap;

use crate::routing::descriptor::ResponseDescriptor;
use crate::routing::path::{match_path, split_segments};
use crate::routing::query::QueryParams;
use crate::routing::table::{HttpMethod, MatchTable, PathBucket, WildcardPath};

/// A resolved rule.
#[derive(Debug, Clone, PartialEq)]
pub struct Matched<'t> {
    pub method: HttpMethod,
    /// Path pattern as written in the rule key.
    pub path: &'t str,
    /// Literal query of the rule; `None` for the path default.
    pub query: Option<&'t str>,
    pub descriptor: &'t ResponseDescriptor,
}

/// Find the rule answering `method path?query`.
pub fn lookup<'t>(
    table: &'t MatchTable,
    method: &str,
    path: &str,
    query: &QueryParams,
) -> Option<Matched<'t>> {
    let method: HttpMethod = method.parse().ok()?;
    let methods = table.method(method)?;

    let (pattern, bucket) = match methods.paths.get_key_value(path) {
        Some((pattern, bucket)) => (pattern.as_str(), bucket),
        None => wildcard_bucket(methods.wildcards(), &methods.paths, path)?,
    };

    let (rule_query, descriptor) = bucket.select(query)?;
    Some(Matched {
        method,
        path: pattern,
        query: rule_query,
        descriptor,
    })
}

/// Find the descriptor answering `method path?query`.
pub fn resolve<'t>(
    table: &'t MatchTable,
    method: &str,
    path: &str,
    query: &QueryParams,
) -> Option<&'t ResponseDescriptor> {
    lookup(table, method, path, query).map(|m| m.descriptor)
}

fn wildcard_bucket<'t>(
    wildcards: &'t [WildcardPath],
    paths: &'t IndexMap<String, PathBucket>,
    path: &str,
) -> Option<(&'t str, &'t PathBucket)> {
    let segments = split_segments(path);
    wildcards
        .iter()
        .find(|w| match_path(&w.segments, &segments))
        .and_then(|w| paths.get(&w.pattern).map(|b| (w.pattern.as_str(), b)))
}

impl MatchTable {
    /// See [`resolve`].
    pub fn resolve(&self, method: &str, path: &str, query: &QueryParams) -> Option<&ResponseDescriptor> {
        resolve(self, method, path, query)
    }

    /// See [`lookup`].
    pub fn lookup(&self, method: &str, path: &str, query: &QueryParams) -> Option<Matched<'_>> {
        lookup(self, method, path, query)
    }
}
