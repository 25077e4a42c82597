//! Flat indicator map produced by the output aggregator.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::luck::Direction;

/// A single output cell: a number, a string tag, or "not computable".
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OutputValue {
    Number(f64),
    Tag(String),
    #[default]
    Unavailable,
}

impl OutputValue {
    /// Numbers that are not finite are stored as unavailable.
    #[must_use]
    pub fn from_number(value: Option<f64>) -> Self {
        match value {
            Some(v) if v.is_finite() => Self::Number(v),
            _ => Self::Unavailable,
        }
    }

    #[must_use]
    pub const fn as_number(&self) -> Option<f64> {
        match self {
            Self::Number(v) => Some(*v),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_tag(&self) -> Option<&str> {
        match self {
            Self::Tag(tag) => Some(tag),
            _ => None,
        }
    }

    #[must_use]
    pub const fn is_unavailable(&self) -> bool {
        matches!(self, Self::Unavailable)
    }
}

impl From<f64> for OutputValue {
    fn from(value: f64) -> Self {
        Self::from_number(Some(value))
    }
}

impl From<Option<f64>> for OutputValue {
    fn from(value: Option<f64>) -> Self {
        Self::from_number(value)
    }
}

impl From<Direction> for OutputValue {
    fn from(value: Direction) -> Self {
        Self::Tag(value.as_str().to_string())
    }
}

impl From<&str> for OutputValue {
    fn from(value: &str) -> Self {
        Self::Tag(value.to_string())
    }
}

/// Ordered map from indicator name to value.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OutputMap {
    entries: BTreeMap<String, OutputValue>,
}

impl OutputMap {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<OutputValue>) {
        self.entries.insert(key.into(), value.into());
    }

    /// Insert only when the key has not been produced yet.
    pub fn insert_missing(&mut self, key: &str, value: impl Into<OutputValue>) {
        if !self.entries.contains_key(key) {
            self.entries.insert(key.to_string(), value.into());
        }
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<&OutputValue> {
        self.entries.get(key)
    }

    #[must_use]
    pub fn number(&self, key: &str) -> Option<f64> {
        self.get(key).and_then(OutputValue::as_number)
    }

    #[must_use]
    pub fn tag(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(OutputValue::as_tag)
    }

    #[must_use]
    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// True when the key is absent or explicitly unavailable.
    #[must_use]
    pub fn is_unavailable(&self, key: &str) -> bool {
        self.get(key).is_none_or(OutputValue::is_unavailable)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &OutputValue)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
