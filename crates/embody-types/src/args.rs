//! [`Arguments`] – string-keyed construction arguments for plugins and
//! sensors.
//!
//! Configuration files may write values as strings, numbers, or booleans;
//! they are normalised to strings on load and parsed on demand by the
//! component that owns them.  Keys a component does not recognise are
//! reported with a `warn!` and otherwise ignored.

use std::collections::BTreeMap;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::EmbodyError;

/// A scalar as written in a configuration file.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum ArgValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
}

impl From<ArgValue> for String {
    fn from(v: ArgValue) -> Self {
        match v {
            ArgValue::Bool(b) => b.to_string(),
            ArgValue::Int(i) => i.to_string(),
            ArgValue::Float(f) => f.to_string(),
            ArgValue::Str(s) => s,
        }
    }
}

/// Ordered key/value construction arguments.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "BTreeMap<String, ArgValue>")]
pub struct Arguments(BTreeMap<String, String>);

impl From<BTreeMap<String, ArgValue>> for Arguments {
    fn from(raw: BTreeMap<String, ArgValue>) -> Self {
        Self(raw.into_iter().map(|(k, v)| (k, v.into())).collect())
    }
}

impl Arguments {
    /// Create an empty argument map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    pub fn with(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.insert(key, value);
        self
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl ToString) {
        self.0.insert(key.into(), value.to_string());
    }

    /// Raw string value for `key`.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Parse the value for `key`, if present.
    ///
    /// # Errors
    ///
    /// Returns [`EmbodyError::InvalidArgument`] when the value is present but
    /// does not parse as `T`.
    pub fn parse<T: FromStr>(&self, key: &str) -> Result<Option<T>, EmbodyError> {
        match self.get(key) {
            None => Ok(None),
            Some(raw) => raw
                .trim()
                .parse::<T>()
                .map(Some)
                .map_err(|_| EmbodyError::InvalidArgument {
                    key: key.to_string(),
                    value: raw.to_string(),
                }),
        }
    }

    /// Parse the value for `key`, falling back to `default` when absent.
    ///
    /// # Errors
    ///
    /// See [`Arguments::parse`].
    pub fn parse_or<T: FromStr>(&self, key: &str, default: T) -> Result<T, EmbodyError> {
        Ok(self.parse(key)?.unwrap_or(default))
    }

    /// Keys that are not in `known`.
    pub fn unknown_keys<'a>(&'a self, known: &'a [&str]) -> impl Iterator<Item = &'a str> + 'a {
        self.0
            .keys()
            .map(String::as_str)
            .filter(move |k| !known.iter().any(|kn| *kn == *k))
    }

    /// Log a warning for every key that `component` does not understand.
    pub fn warn_unknown(&self, component: &str, known: &[&str]) {
        for key in self.unknown_keys(known) {
            warn!(component, key, "unknown argument; it will be ignored");
        }
    }
}

impl<K: Into<String>, V: ToString> FromIterator<(K, V)> for Arguments {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut args = Self::new();
        for (k, v) in iter {
            args.insert(k, v);
        }
        args
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_reads_typed_values() {
        let args = Arguments::new().with("alpha", 0.25).with("enabled", true);
        assert_eq!(args.parse::<f64>("alpha").unwrap(), Some(0.25));
        assert_eq!(args.parse::<bool>("enabled").unwrap(), Some(true));
        assert_eq!(args.parse::<f64>("missing").unwrap(), None);
        assert_eq!(args.parse_or("missing", 0.75).unwrap(), 0.75);
    }

    #[test]
    fn parse_reports_bad_values() {
        let args = Arguments::new().with("alpha", "fast");
        let err = args.parse::<f64>("alpha").unwrap_err();
        assert!(err.to_string().contains("alpha"));
    }

    #[test]
    fn unknown_keys_are_listed() {
        let args: Arguments = [("alpha", "0.5"), ("beta", "1")].into_iter().collect();
        let unknown: Vec<&str> = args.unknown_keys(&["alpha", "gamma"]).collect();
        assert_eq!(unknown, vec!["beta"]);
    }

    #[test]
    fn deserializes_mixed_scalars() {
        let args: Arguments =
            serde_json::from_str(r#"{"alpha": 0.5, "count": 3, "on": false, "name": "x"}"#).unwrap();
        assert_eq!(args.get("alpha"), Some("0.5"));
        assert_eq!(args.get("count"), Some("3"));
        assert_eq!(args.get("on"), Some("false"));
        assert_eq!(args.get("name"), Some("x"));
    }
}
