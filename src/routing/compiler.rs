//! Rule compilation.
//!
//! # Responsibilities
//! - Parse `{METHOD} {PATH}[?QUERY][#HASH]` rule keys
//! - Reject malformed keys and unsupported methods
//! - Percent-decode rule paths so they compare with decoded request paths
//! - Build a fresh [`MatchTable`] from an ordered rule set
//!
//! # Design Decisions
//! - A failed pass returns only the error; no partially built table escapes
//! - Rule order is significant: it is the tie-breaking order at match time
//! - Repeated keys overwrite the earlier descriptor in place

use thiserror::Error;

use crate::routing::descriptor::ResponseDescriptor;
use crate::routing::path::{is_wildcard, split_segments};
use crate::routing::query::{percent_decode, QueryPattern};
use crate::routing::table::{HttpMethod, MatchTable, QueryRule, WildcardPath};

/// Errors raised while compiling rule keys.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// Key is not `{METHOD} {PATH}`.
    #[error("wrong format: `{key}`, expect '{{METHOD}} {{PATH}}'")]
    WrongFormat { key: String },

    /// Method outside GET, PUT, POST, PATCH, DELETE.
    #[error("not supported method `{method}` in `{key}`")]
    UnsupportedMethod { method: String, key: String },
}

/// A parsed rule key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleKey {
    pub method: HttpMethod,
    pub path: String,
    /// Query string without the leading `?`; `None` when absent or empty.
    pub query: Option<String>,
}

impl RuleKey {
    pub fn parse(key: &str) -> Result<Self, ConfigError> {
        let wrong_format = || ConfigError::WrongFormat {
            key: key.to_string(),
        };

        let (method, url) = key.trim().split_once(' ').ok_or_else(wrong_format)?;
        let url = url.trim();
        if method.is_empty() || url.is_empty() {
            return Err(wrong_format());
        }

        let method = method.to_uppercase();
        let method: HttpMethod = method
            .parse()
            .map_err(|_| ConfigError::UnsupportedMethod {
                method: method.clone(),
                key: key.to_string(),
            })?;

        // `#hash` never reaches the server.
        let url = url.split('#').next().unwrap_or_default();
        let (path, query) = match url.split_once('?') {
            Some((path, query)) => (path, Some(query)),
            None => (url, None),
        };
        if path.is_empty() {
            return Err(wrong_format());
        }

        let path = percent_decode(path);
        let path = if path.starts_with('/') {
            path.into_owned()
        } else {
            format!("/{}", path)
        };

        Ok(Self {
            method,
            path,
            query: query.filter(|q| !q.is_empty()).map(str::to_string),
        })
    }
}

/// Compile an ordered rule set into a new [`MatchTable`].
pub fn compile<K, D, I>(rules: I) -> Result<MatchTable, ConfigError>
where
    I: IntoIterator<Item = (K, D)>,
    K: AsRef<str>,
    D: Into<ResponseDescriptor>,
{
    let mut table = MatchTable::empty();

    for (key, descriptor) in rules {
        let rule = RuleKey::parse(key.as_ref())?;
        let descriptor = descriptor.into();
        let methods = table.methods.entry(rule.method).or_default();

        if is_wildcard(&rule.path) && !methods.wildcards.iter().any(|w| w.pattern == rule.path) {
            methods.wildcards.push(WildcardPath {
                segments: split_segments(&rule.path)
                    .into_iter()
                    .map(str::to_string)
                    .collect(),
                pattern: rule.path.clone(),
            });
        }

        let bucket = methods.paths.entry(rule.path).or_default();

        let pattern = rule.query.as_deref().map(QueryPattern::parse);
        match (rule.query, pattern) {
            (Some(raw), Some(pattern)) if !pattern.is_empty() => {
                bucket
                    .signatures
                    .entry(pattern.signature())
                    .or_default()
                    .insert(raw, QueryRule { pattern, descriptor });
            }
            _ => bucket.default = Some(descriptor),
        }
    }

    tracing::debug!(rules = table.rule_count(), "Match table compiled");
    Ok(table)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_rule_key() {
        let key = RuleKey::parse("get /api/users?name=tom#top").unwrap();
        assert_eq!(key.method, HttpMethod::Get);
        assert_eq!(key.path, "/api/users");
        assert_eq!(key.query.as_deref(), Some("name=tom"));

        let key = RuleKey::parse("  DELETE   /api/users/1#frag ").unwrap();
        assert_eq!(key.method, HttpMethod::Delete);
        assert_eq!(key.path, "/api/users/1");
        assert_eq!(key.query, None);

        let key = RuleKey::parse("POST api/users?").unwrap();
        assert_eq!(key.path, "/api/users");
        assert_eq!(key.query, None);
    }

    #[test]
    fn test_rule_path_is_percent_decoded() {
        let key = RuleKey::parse("GET /a%20b/%E4%B8%AD?q=%20x").unwrap();
        assert_eq!(key.path, "/a b/中");
        assert_eq!(key.query.as_deref(), Some("q=%20x"));

        // Not UTF-8 once decoded: kept as written.
        let key = RuleKey::parse("GET /bad%FF").unwrap();
        assert_eq!(key.path, "/bad%FF");
    }

    #[test]
    fn test_wrong_format() {
        for key in ["GET", "/api/users", "", "GET ?a=1"] {
            let err = RuleKey::parse(key).unwrap_err();
            assert!(matches!(err, ConfigError::WrongFormat { .. }), "{key}: {err}");
        }
        let err = RuleKey::parse("GET").unwrap_err();
        assert!(err.to_string().contains("expect '{METHOD} {PATH}'"));
    }

    #[test]
    fn test_unsupported_method() {
        let err = compile([("OPTIONS /a", "x")]).unwrap_err();
        assert_eq!(
            err,
            ConfigError::UnsupportedMethod {
                method: "OPTIONS".into(),
                key: "OPTIONS /a".into(),
            }
        );
        assert!(err.to_string().starts_with("not supported method"));

        assert!(compile([("GGGET /test/", "x")]).is_err());
    }

    #[test]
    fn test_error_aborts_whole_pass() {
        let result = compile([("GET /ok", "a"), ("OPTIONS /a", "x"), ("GET /later", "b")]);
        assert!(result.is_err());
    }

    #[test]
    fn test_default_and_query_buckets() {
        let table = compile([
            ("GET /test/query/?name=tom&age=18", "tom-all"),
            ("GET /test/query/?name=tom", "tom-name"),
            ("GET /test/query/", "no-query"),
        ])
        .unwrap();

        let bucket = table
            .method(HttpMethod::Get)
            .and_then(|m| m.bucket("/test/query/"))
            .unwrap();
        assert_eq!(bucket.default_descriptor(), Some(&ResponseDescriptor::file("no-query")));
        assert_eq!(bucket.signature(&["name", "age"]).map(|s| s.len()), Some(1));
        assert!(bucket.signature(&["age", "name"]).unwrap().contains_key("name=tom&age=18"));
        assert!(bucket.signature(&["name"]).unwrap().contains_key("name=tom"));
        assert_eq!(table.rule_count(), 3);
    }

    #[test]
    fn test_last_default_wins() {
        let table = compile([("GET /x", "d1"), ("get /x", "d2")]).unwrap();
        let bucket = table.method(HttpMethod::Get).and_then(|m| m.bucket("/x")).unwrap();
        assert_eq!(bucket.default_descriptor(), Some(&ResponseDescriptor::file("d2")));
        assert_eq!(table.rule_count(), 1);
    }

    #[test]
    fn test_wildcards_deduplicated_per_method() {
        let table = compile([
            ("GET /u/*", "a"),
            ("GET /u/**/tom", "b"),
            ("GET /u/*?x=1", "c"),
            ("POST /u/*", "d"),
        ])
        .unwrap();

        let get = table.method(HttpMethod::Get).unwrap();
        let patterns: Vec<&str> = get.wildcards().iter().map(|w| w.pattern.as_str()).collect();
        assert_eq!(patterns, vec!["/u/*", "/u/**/tom"]);
        assert_eq!(get.wildcards()[1].segments, vec!["u", "**", "tom"]);

        let post = table.method(HttpMethod::Post).unwrap();
        assert_eq!(post.wildcards().len(), 1);
        assert!(table.method(HttpMethod::Put).unwrap().wildcards().is_empty());
    }

    #[test]
    fn test_inline_json_descriptor() {
        let table = compile([("GET /test/json/", r#"{"type":"json"}"#)]).unwrap();
        let rules = table.rules();
        assert_eq!(rules.len(), 1);
        assert_eq!(rules[0].descriptor, &ResponseDescriptor::json(r#"{"type":"json"}"#));
    }
}
