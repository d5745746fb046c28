//! Dynamic item properties
//!
//! Properties are persisted as opaque key/value text: every value is stored
//! as its JSON text form. The world database never interprets them.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

/// A single property. Stored as JSON text, so the variant is recovered
/// from the shape of the text on restore: `12` is an integer, `12.5` a
/// float, `"12"` a string.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PropertyValue {
    Int(i64),
    Float(f64),
    Bool(bool),
    String(String),
    /// Ordered list, e.g. per-slot flags
    Array(Vec<PropertyValue>),
}

impl PropertyValue {
    /// Numeric view; floats truncate toward zero
    pub fn to_i64(&self) -> Option<i64> {
        match *self {
            Self::Int(v) => Some(v),
            Self::Float(v) => Some(v.trunc() as i64),
            _ => None,
        }
    }

    /// Numeric view widened to a float
    pub fn to_f64(&self) -> Option<f64> {
        match *self {
            Self::Int(v) => Some(v as f64),
            Self::Float(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        if let Self::Bool(v) = *self {
            Some(v)
        } else {
            None
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        if let Self::String(v) = self {
            Some(v.as_str())
        } else {
            None
        }
    }

    /// Elements of a list property
    pub fn as_slice(&self) -> Option<&[PropertyValue]> {
        if let Self::Array(items) = self {
            Some(items.as_slice())
        } else {
            None
        }
    }

    /// Short type name for log and error messages
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Int(_) => "int",
            Self::Float(_) => "float",
            Self::Bool(_) => "bool",
            Self::String(_) => "string",
            Self::Array(_) => "array",
        }
    }
}

impl From<i64> for PropertyValue {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<f64> for PropertyValue {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

impl From<bool> for PropertyValue {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<&str> for PropertyValue {
    fn from(v: &str) -> Self {
        Self::String(v.to_string())
    }
}

impl From<String> for PropertyValue {
    fn from(v: String) -> Self {
        Self::String(v)
    }
}

/// Property text errors
#[derive(Debug, Error)]
pub enum PropertyError {
    #[error("Invalid value for property '{key}': {source}")]
    InvalidValue {
        key: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Invalid property '{key}': {reason}")]
    InvalidField { key: String, reason: String },
}

/// Parse one persisted property text into a typed value
pub fn parse_text<T: DeserializeOwned>(key: &str, text: &str) -> Result<T, PropertyError> {
    serde_json::from_str(text).map_err(|source| PropertyError::InvalidValue {
        key: key.to_string(),
        source,
    })
}

/// Render a typed value as persisted property text
pub fn to_text<T: Serialize>(value: &T) -> String {
    // Plain numbers, strings and arrays of them cannot fail to serialize
    serde_json::to_string(value).unwrap_or_default()
}

/// Property bag
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Properties {
    values: BTreeMap<String, PropertyValue>,
}

impl Properties {
    /// Create an empty bag
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a property, builder style
    pub fn with(mut self, key: impl Into<String>, value: impl Into<PropertyValue>) -> Self {
        self.set(key, value);
        self
    }

    /// Set a property
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<PropertyValue>) {
        self.values.insert(key.into(), value.into());
    }

    /// Get a property
    pub fn get(&self, key: &str) -> Option<&PropertyValue> {
        self.values.get(key)
    }

    /// Remove a property
    pub fn remove(&mut self, key: &str) -> Option<PropertyValue> {
        self.values.remove(key)
    }

    /// Check if a property is set
    pub fn contains(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Iterate properties in key order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &PropertyValue)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Overlay another bag on top of this one
    pub fn merge(&mut self, other: &Properties) {
        for (key, value) in &other.values {
            self.values.insert(key.clone(), value.clone());
        }
    }

    /// Parse a bag from persisted text
    pub fn load_from_text<'a, I>(entries: I) -> Result<Self, PropertyError>
    where
        I: IntoIterator<Item = (&'a String, &'a String)>,
    {
        let mut props = Self::new();
        for (key, text) in entries {
            let value: PropertyValue = parse_text(key, text)?;
            props.values.insert(key.clone(), value);
        }
        Ok(props)
    }

    /// Render the bag as persisted text
    pub fn save_to_text(&self) -> BTreeMap<String, String> {
        self.values
            .iter()
            .map(|(key, value)| (key.clone(), to_text(value)))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_numeric_views() {
        assert_eq!(PropertyValue::Int(3).to_f64(), Some(3.0));
        assert_eq!(PropertyValue::Float(2.9).to_i64(), Some(2));
        assert_eq!(PropertyValue::Float(-2.9).to_i64(), Some(-2));
        assert_eq!(PropertyValue::Bool(true).to_i64(), None);
    }

    #[test]
    fn test_typed_views() {
        assert_eq!(PropertyValue::from("ammo").as_str(), Some("ammo"));
        assert_eq!(PropertyValue::from(false).as_bool(), Some(false));
        assert_eq!(PropertyValue::Int(1).as_str(), None);

        let flags = PropertyValue::Array(vec![PropertyValue::Int(1), PropertyValue::Bool(true)]);
        assert_eq!(flags.as_slice().map(<[PropertyValue]>::len), Some(2));
        assert_eq!(flags.kind(), "array");
    }

    #[test]
    fn test_load_from_text() {
        let mut text = HashMap::new();
        text.insert("Durability".to_string(), "80".to_string());
        text.insert("Weight".to_string(), "1.5".to_string());
        text.insert("Lexems".to_string(), "\"$name Bob\"".to_string());
        text.insert("Flags".to_string(), "[1, 2]".to_string());

        let props = Properties::load_from_text(&text).unwrap();
        assert_eq!(props.get("Durability"), Some(&PropertyValue::Int(80)));
        assert_eq!(props.get("Weight"), Some(&PropertyValue::Float(1.5)));
        assert_eq!(props.get("Lexems").and_then(|v| v.as_str()), Some("$name Bob"));
        assert_eq!(props.get("Flags").and_then(PropertyValue::as_slice).map(<[PropertyValue]>::len), Some(2));
    }

    #[test]
    fn test_load_rejects_bad_text() {
        let mut text = HashMap::new();
        text.insert("Broken".to_string(), "not json".to_string());

        let err = Properties::load_from_text(&text).unwrap_err();
        assert!(matches!(err, PropertyError::InvalidValue { ref key, .. } if key == "Broken"));
    }

    #[test]
    fn test_save_then_load_keeps_values() {
        let props = Properties::new()
            .with("Charges", 4i64)
            .with("Owner", "vault13")
            .with("Broken", false);

        let text = props.save_to_text();
        assert_eq!(text.get("Owner").map(String::as_str), Some("\"vault13\""));

        let loaded = Properties::load_from_text(&text).unwrap();
        assert_eq!(loaded, props);
    }

    #[test]
    fn test_merge_overrides() {
        let mut base = Properties::new().with("Charges", 1i64).with("Color", "red");
        base.merge(&Properties::new().with("Charges", 9i64));

        assert_eq!(base.get("Charges"), Some(&PropertyValue::Int(9)));
        assert_eq!(base.len(), 2);
    }
}
