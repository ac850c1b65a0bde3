//! Compiled match table.
//!
//! # Layout
//! ```text
//! MatchTable
//!   └─ method (GET, PUT, POST, PATCH, DELETE)
//!        ├─ paths: exact path → PathBucket
//!        │     ├─ default: descriptor for requests without a query
//!        │     └─ signature {age, name} → literal query → QueryRule
//!        └─ wildcards: registration-ordered, de-duplicated `*`/`**` paths
//! ```
//!
//! # Design Decisions
//! - Built once per (re)load by the compiler, never mutated afterwards
//! - Insertion-ordered maps keep tie-breaking deterministic

use indexmap::IndexMap;
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use crate::routing::descriptor::ResponseDescriptor;
use crate::routing::query::{QueryParams, QueryPattern, Signature};

/// Methods a rule may use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum HttpMethod {
    Get,
    Put,
    Post,
    Patch,
    Delete,
}

impl HttpMethod {
    pub const ALL: [HttpMethod; 5] = [
        HttpMethod::Get,
        HttpMethod::Put,
        HttpMethod::Post,
        HttpMethod::Patch,
        HttpMethod::Delete,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Put => "PUT",
            HttpMethod::Post => "POST",
            HttpMethod::Patch => "PATCH",
            HttpMethod::Delete => "DELETE",
        }
    }
}

impl FromStr for HttpMethod {
    type Err = ();

    /// Case-insensitive.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        HttpMethod::ALL
            .into_iter()
            .find(|m| m.as_str().eq_ignore_ascii_case(s))
            .ok_or(())
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One query-bearing rule inside a signature bucket.
#[derive(Debug, Clone)]
pub struct QueryRule {
    pub pattern: QueryPattern,
    pub descriptor: ResponseDescriptor,
}

/// All rules sharing one method and one path pattern.
#[derive(Debug, Clone, Default)]
pub struct PathBucket {
    pub(crate) default: Option<ResponseDescriptor>,
    pub(crate) signatures: IndexMap<Signature, IndexMap<String, QueryRule>>,
}

impl PathBucket {
    pub fn default_descriptor(&self) -> Option<&ResponseDescriptor> {
        self.default.as_ref()
    }

    /// Literal query string → rule, for one signature.
    pub fn signature(&self, names: &[&str]) -> Option<&IndexMap<String, QueryRule>> {
        self.signatures.get(&names.iter().copied().collect::<Signature>())
    }

    /// Pick the descriptor for `query`.
    ///
    /// Returns the literal query string of the chosen rule (`None` for the
    /// default) together with its descriptor.
    pub fn select(&self, query: &QueryParams) -> Option<(Option<&str>, &ResponseDescriptor)> {
        if query.is_empty() {
            return self.default.as_ref().map(|d| (None, d));
        }

        let signature = query.signature();
        if let Some(entries) = self.signatures.get(&signature) {
            return first_match(entries, query);
        }

        let names: Vec<&str> = query.keys().collect();
        self.signatures
            .iter()
            .filter(|(sig, _)| sig.is_subset_of(&names))
            .find_map(|(_, entries)| first_match(entries, query))
    }
}

fn first_match<'a>(
    entries: &'a IndexMap<String, QueryRule>,
    query: &QueryParams,
) -> Option<(Option<&'a str>, &'a ResponseDescriptor)> {
    entries
        .iter()
        .find(|(_, rule)| rule.pattern.matches(query))
        .map(|(raw, rule)| (Some(raw.as_str()), &rule.descriptor))
}

/// A registered wildcard path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WildcardPath {
    pub pattern: String,
    pub segments: Vec<String>,
}

/// Rules of one method.
#[derive(Debug, Clone, Default)]
pub struct MethodTable {
    pub(crate) paths: IndexMap<String, PathBucket>,
    pub(crate) wildcards: Vec<WildcardPath>,
}

impl MethodTable {
    pub fn bucket(&self, path: &str) -> Option<&PathBucket> {
        self.paths.get(path)
    }

    pub fn wildcards(&self) -> &[WildcardPath] {
        &self.wildcards
    }

    pub fn paths(&self) -> impl Iterator<Item = (&str, &PathBucket)> {
        self.paths.iter().map(|(p, b)| (p.as_str(), b))
    }
}

/// Flattened view of one compiled rule.
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledRule<'a> {
    pub method: HttpMethod,
    pub path: &'a str,
    pub query: Option<&'a str>,
    pub descriptor: &'a ResponseDescriptor,
}

/// Immutable result of one compilation pass.
#[derive(Debug, Clone)]
pub struct MatchTable {
    pub(crate) methods: HashMap<HttpMethod, MethodTable>,
}

impl Default for MatchTable {
    fn default() -> Self {
        Self::empty()
    }
}

impl MatchTable {
    /// A table with an empty bucket for every allowed method.
    pub fn empty() -> Self {
        Self {
            methods: HttpMethod::ALL
                .into_iter()
                .map(|m| (m, MethodTable::default()))
                .collect(),
        }
    }

    pub fn method(&self, method: HttpMethod) -> Option<&MethodTable> {
        self.methods.get(&method)
    }

    /// Every rule, method by method in registration order.
    pub fn rules(&self) -> Vec<CompiledRule<'_>> {
        let mut rules = Vec::new();
        for method in HttpMethod::ALL {
            let Some(table) = self.methods.get(&method) else {
                continue;
            };
            for (path, bucket) in table.paths() {
                if let Some(descriptor) = &bucket.default {
                    rules.push(CompiledRule {
                        method,
                        path,
                        query: None,
                        descriptor,
                    });
                }
                for entries in bucket.signatures.values() {
                    for (raw, rule) in entries {
                        rules.push(CompiledRule {
                            method,
                            path,
                            query: Some(raw.as_str()),
                            descriptor: &rule.descriptor,
                        });
                    }
                }
            }
        }
        rules
    }

    pub fn rule_count(&self) -> usize {
        self.methods
            .values()
            .flat_map(|t| t.paths.values())
            .map(|b| {
                usize::from(b.default.is_some())
                    + b.signatures.values().map(IndexMap::len).sum::<usize>()
            })
            .sum()
    }

    pub fn is_empty(&self) -> bool {
        self.rule_count() == 0
    }
}
