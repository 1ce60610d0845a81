//! Handler signatures and argument binding
//!
//! A handler declares its formal parameters in a [`Signature`]. Binding
//! builds an insertion-ordered [`Params`] map: placeholders for required
//! parameters first, then request data, then forwarded parameters, each
//! layer overriding values of the previous one in place.

use std::collections::HashMap;
use std::str::FromStr;

use crate::error::{Error, Result};

/// Insertion-ordered parameter map; `None` marks a null value
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Params {
    entries: Vec<(String, Option<String>)>,
    positions: HashMap<String, usize>,
}

impl Params {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or overwrite; an existing key keeps its position
    pub fn insert(&mut self, key: impl Into<String>, value: Option<String>) {
        let key = key.into();
        if let Some(&index) = self.positions.get(&key) {
            self.entries[index].1 = value;
        } else {
            self.positions.insert(key.clone(), self.entries.len());
            self.entries.push((key, value));
        }
    }

    /// Builder-style insert of a concrete value
    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.insert(key, Some(value.into()));
        self
    }

    /// Overlay `other` onto `self` (array_merge semantics for string keys)
    pub fn merge(&mut self, other: &Self) {
        for (key, value) in &other.entries {
            self.insert(key.clone(), value.clone());
        }
    }

    /// Value for `key`; `None` when absent or null
    pub fn get(&self, key: &str) -> Option<&str> {
        self.positions
            .get(key)
            .and_then(|&index| self.entries[index].1.as_deref())
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.positions.contains_key(key)
    }

    /// Remove a key; later keys shift down one position
    pub fn remove(&mut self, key: &str) -> Option<Option<String>> {
        let index = self.positions.remove(key)?;
        let (_, value) = self.entries.remove(index);
        for position in self.positions.values_mut() {
            if *position > index {
                *position -= 1;
            }
        }
        Some(value)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, Option<&str>)> {
        self.entries
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_deref()))
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }

    pub fn values(&self) -> impl Iterator<Item = Option<&str>> {
        self.entries.iter().map(|(_, v)| v.as_deref())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Params {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut params = Self::new();
        for (k, v) in iter {
            params.insert(k, Some(v.into()));
        }
        params
    }
}

/// One declared formal parameter
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Param {
    pub name: String,
    /// Optional parameters never get a placeholder
    pub optional: bool,
    pub default: Option<String>,
}

impl Param {
    pub fn required(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            optional: false,
            default: None,
        }
    }

    pub fn optional(name: impl Into<String>, default: Option<String>) -> Self {
        Self {
            name: name.into(),
            optional: true,
            default,
        }
    }
}

/// Declared formal parameters of a handler, in declaration order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Signature {
    params: Vec<Param>,
}

impl Signature {
    pub const fn new() -> Self {
        Self { params: Vec::new() }
    }

    /// Parse a compact declaration list
    ///
    /// `"id"` is required, `"page=1"` is optional with default `1`,
    /// `"tag?"` is optional without a default.
    pub fn parse(decl: &[&str]) -> Self {
        let params = decl
            .iter()
            .map(|d| {
                if let Some((name, default)) = d.split_once('=') {
                    Param::optional(name.trim(), Some(default.trim().to_string()))
                } else if let Some(name) = d.strip_suffix('?') {
                    Param::optional(name.trim(), None)
                } else {
                    Param::required(d.trim())
                }
            })
            .collect();
        Self { params }
    }

    #[must_use]
    pub fn param(mut self, param: Param) -> Self {
        self.params.push(param);
        self
    }

    pub fn params(&self) -> &[Param] {
        &self.params
    }

    pub fn find(&self, name: &str) -> Option<&Param> {
        self.params.iter().find(|p| p.name == name)
    }

    /// Null placeholders for every required parameter
    pub fn placeholders(&self) -> Params {
        let mut placeholders = Params::new();
        for p in self.params.iter().filter(|p| !p.optional) {
            placeholders.insert(p.name.clone(), None);
        }
        placeholders
    }
}

/// Merge placeholders, request data and forwarded parameters
///
/// A signature without required parameters skips request data entirely and
/// only sees forwarded parameters.
pub fn bind(signature: &Signature, request_data: &Params, forwarded: &Params) -> Params {
    let mut merged = signature.placeholders();
    if merged.is_empty() {
        return forwarded.clone();
    }
    merged.merge(request_data);
    merged.merge(forwarded);
    merged
}

/// Bound call arguments handed to a handler
#[derive(Debug, Clone)]
pub struct Args {
    values: Params,
    signature: Signature,
}

impl Args {
    pub const fn new(values: Params, signature: Signature) -> Self {
        Self { values, signature }
    }

    /// Values in binding order, as a positional call would receive them
    pub fn positional(&self) -> impl Iterator<Item = Option<&str>> {
        self.values.values()
    }

    /// Positional value at `index`; `None` when missing or null
    pub fn at(&self, index: usize) -> Option<&str> {
        self.positional().nth(index).flatten()
    }

    /// Named value, falling back to the declared default
    pub fn get(&self, name: &str) -> Option<&str> {
        self.values.get(name).or_else(|| {
            self.signature
                .find(name)
                .and_then(|p| p.default.as_deref())
        })
    }

    pub fn require(&self, name: &str) -> Result<&str> {
        self.get(name)
            .ok_or_else(|| Error::MissingParameter(name.to_string()))
    }

    /// Parse a required argument
    pub fn parse<T: FromStr>(&self, name: &str) -> Result<T> {
        let raw = self.require(name)?;
        raw.parse().map_err(|_| Error::InvalidParameter {
            name: name.to_string(),
            value: raw.to_string(),
        })
    }

    pub const fn values(&self) -> &Params {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_keeps_position() {
        let mut params = Params::new();
        params.insert("a", None);
        params.insert("b", Some("2".to_string()));
        params.insert("a", Some("1".to_string()));
        assert_eq!(params.keys().collect::<Vec<_>>(), vec!["a", "b"]);
        assert_eq!(params.get("a"), Some("1"));
    }

    #[test]
    fn test_remove_keeps_lookup_consistent() {
        let mut params: Params = [("a", "1"), ("b", "2"), ("c", "3")].into_iter().collect();
        assert_eq!(params.remove("a"), Some(Some("1".to_string())));
        assert_eq!(params.remove("a"), None);
        assert_eq!(params.get("c"), Some("3"));
        params.insert("b", Some("20".to_string()));
        assert_eq!(params.iter().collect::<Vec<_>>(), vec![("b", Some("20")), ("c", Some("3"))]);
    }

    #[test]
    fn test_many_distinct_keys_insert_quickly() {
        let started = std::time::Instant::now();
        let mut params = Params::new();
        for i in 0..100_000 {
            params.insert(format!("k{i}"), None);
        }
        params.insert("k0", Some("first".to_string()));
        assert_eq!(params.len(), 100_000);
        assert_eq!(params.get("k0"), Some("first"));
        assert!(started.elapsed() < std::time::Duration::from_secs(5));
    }

    #[test]
    fn test_signature_parse() {
        let sig = Signature::parse(&["id", "page=1", "tag?"]);
        assert_eq!(sig.params()[0], Param::required("id"));
        assert_eq!(sig.params()[1], Param::optional("page", Some("1".to_string())));
        assert_eq!(sig.params()[2], Param::optional("tag", None));
        assert_eq!(sig.placeholders().keys().collect::<Vec<_>>(), vec!["id"]);
    }

    #[test]
    fn test_bind_precedence() {
        let sig = Signature::parse(&["name", "id"]);
        let request: Params = [("id", "7"), ("extra", "x"), ("name", "req")]
            .into_iter()
            .collect();
        let forwarded = Params::new().with("name", "fwd");

        let merged = bind(&sig, &request, &forwarded);
        // Declared order first, extra request keys after
        assert_eq!(merged.keys().collect::<Vec<_>>(), vec!["name", "id", "extra"]);
        assert_eq!(
            merged.values().collect::<Vec<_>>(),
            vec![Some("fwd"), Some("7"), Some("x")]
        );
    }

    #[test]
    fn test_bind_missing_stays_null() {
        let sig = Signature::parse(&["id"]);
        let merged = bind(&sig, &Params::new(), &Params::new());
        assert!(merged.contains_key("id"));
        assert_eq!(merged.get("id"), None);
    }

    #[test]
    fn test_bind_without_required_params_skips_request() {
        let sig = Signature::parse(&["page=1"]);
        let request = Params::new().with("page", "5");
        let merged = bind(&sig, &request, &Params::new());
        assert!(merged.is_empty());

        let args = Args::new(merged, sig.clone());
        assert_eq!(args.get("page"), Some("1"));

        let forwarded = Params::new().with("page", "9");
        let args = Args::new(bind(&sig, &request, &forwarded), sig);
        assert_eq!(args.get("page"), Some("9"));
    }

    #[test]
    fn test_args_accessors() {
        let sig = Signature::parse(&["id", "limit=10"]);
        let args = Args::new(Params::new().with("id", "42"), sig);
        assert_eq!(args.at(0), Some("42"));
        assert_eq!(args.parse::<u32>("id").unwrap(), 42);
        assert_eq!(args.parse::<u32>("limit").unwrap(), 10);
        assert!(matches!(
            args.require("missing"),
            Err(Error::MissingParameter(name)) if name == "missing"
        ));

        let bad = Args::new(Params::new().with("id", "abc"), Signature::parse(&["id"]));
        assert!(matches!(bad.parse::<u32>("id"), Err(Error::InvalidParameter { .. })));
    }
}
