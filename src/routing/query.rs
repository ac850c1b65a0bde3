//! Query parameter parsing and matching.
//!
//! # Responsibilities
//! - Parse query strings into ordered parameter maps
//!   (repeated names → arrays, `a[b]=c` → nested objects, `a[]=c` → arrays)
//! - Compile rule query strings into [`QueryPattern`]s
//! - Decide whether request parameters satisfy a pattern
//!
//! # Design Decisions
//! - A pattern is a required subset: extra request parameters are allowed
//! - Regex literals (`/.../`) are compiled once, when the rule is compiled
//! - An invalid regex never matches; it is reported once at compile time
//! - Rule query strings are percent-decoded but `+` is kept literally, so
//!   regex quantifiers survive; request query strings use form decoding

use indexmap::IndexMap;
use regex::Regex;
use std::borrow::Cow;
use std::fmt;

/// Value that matches anything present.
pub const ANY_VALUE: &str = "*";

/// A single query parameter value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryValue {
    /// `name=value`
    Single(String),
    /// `name=a&name=b` or `name[]=a`
    Multi(Vec<String>),
    /// `name[key]=value`
    Nested(QueryParams),
}

impl QueryValue {
    /// Scalar view of the value: one entry for `Single`, all entries for
    /// `Multi`, `None` for nested objects.
    pub fn scalars(&self) -> Option<Vec<&str>> {
        match self {
            QueryValue::Single(v) => Some(vec![v.as_str()]),
            QueryValue::Multi(vs) => Some(vs.iter().map(String::as_str).collect()),
            QueryValue::Nested(_) => None,
        }
    }
}

impl From<&str> for QueryValue {
    fn from(value: &str) -> Self {
        QueryValue::Single(value.to_string())
    }
}

impl From<String> for QueryValue {
    fn from(value: String) -> Self {
        QueryValue::Single(value)
    }
}

impl From<Vec<&str>> for QueryValue {
    fn from(values: Vec<&str>) -> Self {
        QueryValue::Multi(values.into_iter().map(str::to_string).collect())
    }
}

/// Ordered map of query parameter name → value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryParams(IndexMap<String, QueryValue>);

impl QueryParams {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a request query string (form-urlencoded, `+` is a space).
    pub fn parse(raw: &str) -> Self {
        let raw = raw.strip_prefix('?').unwrap_or(raw);
        let mut params = Self::new();
        for (key, value) in url::form_urlencoded::parse(raw.as_bytes()) {
            if key.is_empty() {
                continue;
            }
            params.append(&key, value.into_owned());
        }
        params
    }

    /// Parse the query part of a rule key. Only `%XX` escapes are decoded.
    pub fn parse_pattern(raw: &str) -> Self {
        let raw = raw.strip_prefix('?').unwrap_or(raw);
        let mut params = Self::new();
        for pair in raw.split('&').filter(|p| !p.is_empty()) {
            let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
            if key.is_empty() {
                continue;
            }
            params.append(&percent_decode(key), percent_decode(value).into_owned());
        }
        params
    }

    /// Add a value under `key`, honouring bracket notation and collapsing
    /// repeated names into arrays.
    pub fn append(&mut self, key: &str, value: String) {
        let segments = split_key(key);
        let path: Vec<&str> = segments.iter().map(|s| &**s).collect();
        insert_path(&mut self.0, &path, value);
    }

    /// Insert a fully formed value, replacing any previous one.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<QueryValue>) {
        self.0.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&QueryValue> {
        self.0.get(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &QueryValue)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn signature(&self) -> Signature {
        self.keys().collect()
    }
}

impl<K, V> FromIterator<(K, V)> for QueryParams
where
    K: AsRef<str>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut params = Self::new();
        for (key, value) in iter {
            params.append(key.as_ref(), value.into());
        }
        params
    }
}

/// The set of parameter names a query carries, sorted and de-duplicated.
///
/// Names are compared as a set, never through their joined form: a decoded
/// name may itself contain `&`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Signature(Vec<String>);

impl Signature {
    pub fn names(&self) -> &[String] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Returns true if every name of `self` appears in `names`.
    pub fn is_subset_of(&self, names: &[&str]) -> bool {
        self.0.iter().all(|name| names.contains(&name.as_str()))
    }
}

impl<'a> FromIterator<&'a str> for Signature {
    fn from_iter<I: IntoIterator<Item = &'a str>>(iter: I) -> Self {
        let mut names: Vec<String> = iter.into_iter().map(str::to_string).collect();
        names.sort_unstable();
        names.dedup();
        Signature(names)
    }
}

/// Names joined with `&`, for logs and listings only.
impl fmt::Display for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0.join("&"))
    }
}

/// Percent-decode `raw`, keeping it as written when it is not UTF-8.
/// `+` stays literal.
pub fn percent_decode(raw: &str) -> Cow<'_, str> {
    urlencoding::decode(raw).unwrap_or(Cow::Borrowed(raw))
}

/// `a[b][]` → `["a", "b", ""]`. Malformed brackets keep the key literal.
fn split_key(key: &str) -> Vec<Cow<'_, str>> {
    let Some(open) = key.find('[') else {
        return vec![Cow::Borrowed(key)];
    };
    if open == 0 {
        return vec![Cow::Borrowed(key)];
    }

    let mut path = vec![Cow::Borrowed(&key[..open])];
    let mut rest = &key[open..];
    while let Some(inner) = rest.strip_prefix('[') {
        let Some(close) = inner.find(']') else {
            return vec![Cow::Borrowed(key)];
        };
        path.push(Cow::Borrowed(&inner[..close]));
        rest = &inner[close + 1..];
    }
    if !rest.is_empty() {
        return vec![Cow::Borrowed(key)];
    }
    path
}

fn insert_path(map: &mut IndexMap<String, QueryValue>, path: &[&str], value: String) {
    let (head, tail) = match path.split_first() {
        Some(split) => split,
        None => return,
    };

    match tail.first() {
        None => push_value(map, head, value, false),
        Some(&"") => push_value(map, head, value, true),
        Some(_) => {
            let entry = map
                .entry(head.to_string())
                .or_insert_with(|| QueryValue::Nested(QueryParams::new()));
            // A scalar already bound to this name wins over nested keys.
            if let QueryValue::Nested(nested) = entry {
                insert_path(&mut nested.0, tail, value);
            }
        }
    }
}

fn push_value(map: &mut IndexMap<String, QueryValue>, key: &str, value: String, as_array: bool) {
    match map.get_mut(key) {
        None => {
            let new = if as_array {
                QueryValue::Multi(vec![value])
            } else {
                QueryValue::Single(value)
            };
            map.insert(key.to_string(), new);
        }
        Some(existing) => match existing {
            QueryValue::Single(first) => {
                let first = std::mem::take(first);
                *existing = QueryValue::Multi(vec![first, value]);
            }
            QueryValue::Multi(values) => values.push(value),
            QueryValue::Nested(_) => {}
        },
    }
}

/// Compiled matcher for one parameter value.
#[derive(Debug, Clone)]
pub enum ValuePattern {
    /// `*`: any present value.
    Any,
    /// `/.../` literal.
    Regex(Regex),
    /// A `/.../` literal that failed to compile. Never matches.
    InvalidRegex { source: String, error: String },
    /// Nested object, matched key by key.
    Object(QueryPattern),
    /// Array of allowed values; `any` is set when the array contains `*`.
    OneOf { values: Vec<String>, any: bool },
    /// Plain string equality.
    Literal(String),
}

impl ValuePattern {
    pub fn compile(value: &QueryValue) -> Self {
        match value {
            QueryValue::Single(v) if v == ANY_VALUE => ValuePattern::Any,
            QueryValue::Single(v) if is_regex_literal(v) => {
                let source = &v[1..v.len() - 1];
                match Regex::new(source) {
                    Ok(re) => ValuePattern::Regex(re),
                    Err(e) => {
                        tracing::warn!(
                            pattern = %v,
                            error = %e,
                            "Invalid regex in query rule; candidate will never match"
                        );
                        ValuePattern::InvalidRegex {
                            source: v.clone(),
                            error: e.to_string(),
                        }
                    }
                }
            }
            QueryValue::Single(v) => ValuePattern::Literal(v.clone()),
            QueryValue::Nested(params) => ValuePattern::Object(QueryPattern::compile(params)),
            QueryValue::Multi(values) => ValuePattern::OneOf {
                any: values.iter().any(|v| v == ANY_VALUE),
                values: values.clone(),
            },
        }
    }
}

fn is_regex_literal(value: &str) -> bool {
    value.len() >= 2 && value.starts_with('/') && value.ends_with('/')
}

/// Compiled query pattern of one rule.
#[derive(Debug, Clone, Default)]
pub struct QueryPattern {
    fields: IndexMap<String, ValuePattern>,
}

impl QueryPattern {
    /// Parse and compile the query part of a rule key.
    pub fn parse(raw: &str) -> Self {
        Self::compile(&QueryParams::parse_pattern(raw))
    }

    pub fn compile(params: &QueryParams) -> Self {
        let fields = params
            .iter()
            .map(|(k, v)| (k.to_string(), ValuePattern::compile(v)))
            .collect();
        Self { fields }
    }

    pub fn signature(&self) -> Signature {
        self.fields.keys().map(String::as_str).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn fields(&self) -> impl Iterator<Item = (&str, &ValuePattern)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Convenience for [`match_query`].
    pub fn matches(&self, request: &QueryParams) -> bool {
        match_query(self, request)
    }
}

/// Every pattern key must be present in `request` with a matching value.
/// Extra request keys are ignored.
pub fn match_query(pattern: &QueryPattern, request: &QueryParams) -> bool {
    pattern.fields.iter().all(|(key, value_pattern)| {
        request
            .get(key)
            .is_some_and(|value| match_value(value_pattern, value))
    })
}

/// Compare one request value against its compiled pattern.
pub fn match_value(pattern: &ValuePattern, value: &QueryValue) -> bool {
    match pattern {
        ValuePattern::Any => true,
        ValuePattern::InvalidRegex { .. } => false,
        ValuePattern::Regex(re) => all_scalars(value, |v| re.is_match(v)),
        ValuePattern::Object(nested) => match value {
            QueryValue::Nested(params) => match_query(nested, params),
            _ => false,
        },
        ValuePattern::OneOf { any: true, .. } => value.scalars().is_some(),
        ValuePattern::OneOf { values, any: false } => {
            all_scalars(value, |v| values.iter().any(|allowed| allowed == v))
        }
        ValuePattern::Literal(expected) => all_scalars(value, |v| v == expected),
    }
}

fn all_scalars(value: &QueryValue, pred: impl Fn(&str) -> bool) -> bool {
    match value.scalars() {
        Some(values) => !values.is_empty() && values.into_iter().all(pred),
        None => false,
    }
}
