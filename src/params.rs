//! Request parameters and the default/override merge.
//!
//! A facade owns one set of default parameters for its whole lifetime. Each
//! call brings transient overrides; [`merge`] combines the two into a fresh
//! map where every override key wins and every other default survives.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use crate::error::Result;

/// A single request option value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
    Bool(bool),
    Integer(i64),
    Float(f64),
    String(String),
}

impl ParamValue {
    /// String value, if this is a string.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    /// Integer value. Floats with no fractional part also qualify.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Integer(i) => Some(*i),
            Self::Float(f) if f.fract() == 0.0 => Some(*f as i64),
            _ => None,
        }
    }

    /// Numeric value as a float.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Integer(i) => Some(*i as f64),
            Self::Float(f) => Some(*f),
            _ => None,
        }
    }

    /// Boolean value, if this is a bool.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }
}

impl From<bool> for ParamValue {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<i64> for ParamValue {
    fn from(v: i64) -> Self {
        Self::Integer(v)
    }
}

impl From<i32> for ParamValue {
    fn from(v: i32) -> Self {
        Self::Integer(v.into())
    }
}

impl From<u32> for ParamValue {
    fn from(v: u32) -> Self {
        Self::Integer(v.into())
    }
}

impl From<usize> for ParamValue {
    fn from(v: usize) -> Self {
        Self::Integer(i64::try_from(v).unwrap_or(i64::MAX))
    }
}

impl From<f64> for ParamValue {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

impl From<f32> for ParamValue {
    fn from(v: f32) -> Self {
        Self::Float(v.into())
    }
}

impl From<&str> for ParamValue {
    fn from(v: &str) -> Self {
        Self::String(v.to_string())
    }
}

impl From<String> for ParamValue {
    fn from(v: String) -> Self {
        Self::String(v)
    }
}

/// Mapping from option name to value, serialized as a flat JSON object.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RequestParameters(BTreeMap<String, ParamValue>);

impl RequestParameters {
    /// Create an empty parameter set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    ///
    /// ```
    /// use llm_preflight::RequestParameters;
    ///
    /// let params = RequestParameters::new()
    ///     .with("temperature", 0.7)
    ///     .with("model", "j2-mid");
    /// assert_eq!(params.get_str("model"), Some("j2-mid"));
    /// ```
    pub fn with(mut self, key: impl Into<String>, value: impl Into<ParamValue>) -> Self {
        self.insert(key, value);
        self
    }

    /// Insert a value, returning the previous one.
    pub fn insert(
        &mut self,
        key: impl Into<String>,
        value: impl Into<ParamValue>,
    ) -> Option<ParamValue> {
        self.0.insert(key.into(), value.into())
    }

    /// Get a value.
    pub fn get(&self, key: &str) -> Option<&ParamValue> {
        self.0.get(key)
    }

    /// Get a string value.
    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(ParamValue::as_str)
    }

    /// Get an integer value.
    pub fn get_i64(&self, key: &str) -> Option<i64> {
        self.get(key).and_then(ParamValue::as_i64)
    }

    /// Whether `key` is present.
    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    /// Copy of these parameters without `key`.
    pub fn without(&self, key: &str) -> Self {
        Self(
            self.0
                .iter()
                .filter(|(k, _)| k.as_str() != key)
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
        )
    }

    /// Iterate in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &ParamValue)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Number of parameters.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether no parameter is set.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Merge `overrides` over these parameters. See [`merge`].
    pub fn merged_with(&self, overrides: &RequestParameters) -> Self {
        merge(self, overrides)
    }

    /// Parameters as a JSON object. Non-finite floats become `null`.
    pub fn to_json_object(&self) -> Result<serde_json::Map<String, JsonValue>> {
        self.0
            .iter()
            .map(|(k, v)| Ok((k.clone(), serde_json::to_value(v)?)))
            .collect()
    }
}

impl<K: Into<String>, V: Into<ParamValue>> FromIterator<(K, V)> for RequestParameters {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

impl<K: Into<String>, V: Into<ParamValue>> Extend<(K, V)> for RequestParameters {
    fn extend<I: IntoIterator<Item = (K, V)>>(&mut self, iter: I) {
        self.0
            .extend(iter.into_iter().map(|(k, v)| (k.into(), v.into())));
    }
}

/// Combine defaults with per-call overrides.
///
/// Every key in `overrides` takes the override's value; every key only in
/// `defaults` keeps the default. Neither input is modified.
pub fn merge(defaults: &RequestParameters, overrides: &RequestParameters) -> RequestParameters {
    let mut merged = defaults.clone();
    merged
        .0
        .extend(overrides.0.iter().map(|(k, v)| (k.clone(), v.clone())));
    merged
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn ai21_defaults() -> RequestParameters {
        RequestParameters::new()
            .with("temperature", 0.0)
            .with("model", "j2-ultra")
    }

    #[test]
    fn test_merge_override_wins() {
        let overrides = RequestParameters::new().with("temperature", 0.7);
        let merged = merge(&ai21_defaults(), &overrides);

        let expected = RequestParameters::new()
            .with("temperature", 0.7)
            .with("model", "j2-ultra");
        assert_eq!(merged, expected);
    }

    #[test]
    fn test_merge_empty_overrides_is_identity() {
        let defaults = ai21_defaults();
        assert_eq!(merge(&defaults, &RequestParameters::new()), defaults);
    }

    #[test]
    fn test_merge_empty_defaults() {
        let overrides = RequestParameters::new().with("maxTokens", 16);
        assert_eq!(merge(&RequestParameters::new(), &overrides), overrides);
    }

    #[test]
    fn test_merge_keeps_every_key() {
        let defaults = ai21_defaults().with("topP", 1.0);
        let overrides = RequestParameters::new()
            .with("model", "j2-mid")
            .with("numResults", 1);
        let merged = merge(&defaults, &overrides);

        assert_eq!(merged.len(), 4);
        for (k, v) in overrides.iter() {
            assert_eq!(merged.get(k), Some(v));
        }
        assert_eq!(merged.get("topP"), Some(&ParamValue::Float(1.0)));
        assert_eq!(merged.get("temperature"), Some(&ParamValue::Float(0.0)));
    }

    #[test]
    fn test_merge_does_not_mutate_defaults() {
        let defaults = ai21_defaults();
        let snapshot = defaults.clone();
        let _ = defaults.merged_with(&RequestParameters::new().with("model", "j2-light"));
        assert_eq!(defaults, snapshot);
    }

    #[test]
    fn test_merge_override_can_change_type() {
        let defaults = RequestParameters::new().with("stop", "\n");
        let overrides = RequestParameters::new().with("stop", false);
        let merged = merge(&defaults, &overrides);
        assert_eq!(merged.get("stop"), Some(&ParamValue::Bool(false)));
    }

    #[test]
    fn test_accessors() {
        let params = RequestParameters::new()
            .with("model", "j2-ultra")
            .with("maxTokens", 64)
            .with("temperature", 0.5)
            .with("echo", true);

        assert_eq!(params.get_str("model"), Some("j2-ultra"));
        assert_eq!(params.get_i64("maxTokens"), Some(64));
        assert_eq!(params.get("temperature").and_then(ParamValue::as_f64), Some(0.5));
        assert_eq!(params.get("echo").and_then(ParamValue::as_bool), Some(true));
        assert_eq!(params.get_str("maxTokens"), None);
        assert!(params.contains_key("echo"));
        assert!(!params.contains_key("topP"));
    }

    #[test]
    fn test_float_as_i64() {
        assert_eq!(ParamValue::Float(32.0).as_i64(), Some(32));
        assert_eq!(ParamValue::Float(32.5).as_i64(), None);
    }

    #[test]
    fn test_without() {
        let params = ai21_defaults();
        let stripped = params.without("model");
        assert!(!stripped.contains_key("model"));
        assert!(stripped.contains_key("temperature"));
        assert!(params.contains_key("model"));
    }

    #[test]
    fn test_to_json_object() {
        let params = ai21_defaults().with("maxTokens", 70).with("echo", false);
        let obj = JsonValue::Object(params.to_json_object().unwrap());
        assert_eq!(
            obj,
            json!({"temperature": 0.0, "model": "j2-ultra", "maxTokens": 70, "echo": false})
        );
    }

    #[test]
    fn test_to_json_object_non_finite_float() {
        let params = RequestParameters::new().with("topP", f64::NAN);
        let obj = params.to_json_object().unwrap();
        assert_eq!(obj.get("topP"), Some(&JsonValue::Null));
    }

    #[test]
    fn test_deserialize_from_json() {
        let params: RequestParameters =
            serde_json::from_value(json!({"temperature": 0.7, "maxTokens": 10, "model": "j2-mid", "echo": true}))
                .unwrap();
        assert_eq!(params.get("temperature"), Some(&ParamValue::Float(0.7)));
        assert_eq!(params.get("maxTokens"), Some(&ParamValue::Integer(10)));
        assert_eq!(params.get_str("model"), Some("j2-mid"));
        assert_eq!(params.get("echo"), Some(&ParamValue::Bool(true)));
    }

    #[test]
    fn test_from_iterator_and_extend() {
        let mut params: RequestParameters = [("a", 1), ("b", 2)].into_iter().collect();
        params.extend([("b", 3)]);
        assert_eq!(params.get_i64("a"), Some(1));
        assert_eq!(params.get_i64("b"), Some(3));
    }
}
