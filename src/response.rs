//! Projection of a single string out of a provider response.

use std::fmt;

use serde_json::Value as JsonValue;

use crate::error::{LlmError, Result};

/// One step of a [`FieldPath`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathSegment {
    /// Object member.
    Key(String),
    /// Array element.
    Index(usize),
}

/// Fixed path into a JSON response, written with dots: `completions.0.data.text`.
///
/// Numeric segments index arrays; everything else names an object member.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldPath {
    segments: Vec<PathSegment>,
}

impl FieldPath {
    /// Parse a dotted path. Empty segments are ignored.
    pub fn parse(path: &str) -> Self {
        let segments = path
            .split('.')
            .filter(|s| !s.is_empty())
            .map(|s| match s.parse::<usize>() {
                Ok(i) => PathSegment::Index(i),
                Err(_) => PathSegment::Key(s.to_string()),
            })
            .collect();
        Self { segments }
    }

    /// Path segments in order.
    pub fn segments(&self) -> &[PathSegment] {
        &self.segments
    }

    /// Walk the path. `None` when any step is missing.
    pub fn lookup<'a>(&self, value: &'a JsonValue) -> Option<&'a JsonValue> {
        self.segments
            .iter()
            .try_fold(value, |current, segment| match segment {
                PathSegment::Key(key) => current.get(key.as_str()),
                PathSegment::Index(i) => current.get(*i),
            })
    }

    /// Extract the string at this path, or [`LlmError::MalformedResponse`].
    pub fn extract_text(&self, response: &JsonValue) -> Result<String> {
        self.lookup(response)
            .and_then(JsonValue::as_str)
            .map(str::to_string)
            .ok_or_else(|| LlmError::MalformedResponse {
                path: self.to_string(),
            })
    }
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, segment) in self.segments.iter().enumerate() {
            if i > 0 {
                f.write_str(".")?;
            }
            match segment {
                PathSegment::Key(key) => f.write_str(key)?,
                PathSegment::Index(idx) => write!(f, "{}", idx)?,
            }
        }
        Ok(())
    }
}

impl From<&str> for FieldPath {
    fn from(path: &str) -> Self {
        Self::parse(path)
    }
}
