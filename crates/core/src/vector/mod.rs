//! Generic vector layers: features with geometry and loosely-typed attributes.
//!
//! This is the shape data has right after loading, before the harmonizer
//! projects it onto typed records.

use crate::crs::CRS;
use geo_types::Geometry;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use std::fmt;

/// Attribute value types
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum AttributeValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
}

impl AttributeValue {
    /// Parse a text cell: empty → Null, numeric → Int/Float, otherwise String.
    pub fn infer(cell: &str) -> Self {
        let t = cell.trim();
        if t.is_empty() {
            return AttributeValue::Null;
        }
        if let Ok(i) = t.parse::<i64>() {
            return AttributeValue::Int(i);
        }
        match t.parse::<f64>() {
            Ok(f) if f.is_nan() => AttributeValue::Null,
            Ok(f) => AttributeValue::Float(f),
            Err(_) => AttributeValue::String(cell.to_string()),
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, AttributeValue::Null)
    }

    /// Numeric view; text and booleans are not numbers.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            AttributeValue::Int(i) => Some(*i as f64),
            AttributeValue::Float(f) if !f.is_nan() => Some(*f),
            _ => None,
        }
    }

    /// Integer view accepting integral floats and numeric text (`"2019"`, `2019.0`).
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            AttributeValue::Int(i) => Some(*i),
            AttributeValue::Float(f) if f.is_finite() && f.fract() == 0.0 => Some(*f as i64),
            AttributeValue::String(s) => match AttributeValue::infer(s) {
                AttributeValue::String(_) => None,
                other => other.as_i64(),
            },
            _ => None,
        }
    }

    /// Opaque key view. Integral floats are printed without a fractional part
    /// so `1500107.0` and `1500107` name the same municipality.
    pub fn as_key(&self) -> Option<String> {
        match self {
            AttributeValue::Null => None,
            AttributeValue::Bool(b) => Some(b.to_string()),
            AttributeValue::Int(i) => Some(i.to_string()),
            AttributeValue::Float(f) if f.is_finite() && f.fract() == 0.0 => {
                Some(format!("{}", *f as i64))
            }
            AttributeValue::Float(f) if f.is_nan() => None,
            AttributeValue::Float(f) => Some(f.to_string()),
            AttributeValue::String(s) => {
                let t = s.trim();
                (!t.is_empty()).then(|| t.to_string())
            }
        }
    }
}

impl fmt::Display for AttributeValue {
    /// Text cell encoding; null is the empty string.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttributeValue::Null => Ok(()),
            AttributeValue::Bool(b) => write!(f, "{}", b),
            AttributeValue::Int(i) => write!(f, "{}", i),
            AttributeValue::Float(v) if v.is_nan() => Ok(()),
            AttributeValue::Float(v) => write!(f, "{}", v),
            AttributeValue::String(s) => f.write_str(s),
        }
    }
}

impl From<serde_json::Value> for AttributeValue {
    fn from(value: serde_json::Value) -> Self {
        use serde_json::Value;
        match value {
            Value::Null => AttributeValue::Null,
            Value::Bool(b) => AttributeValue::Bool(b),
            Value::Number(n) => match n.as_i64() {
                Some(i) => AttributeValue::Int(i),
                None => n.as_f64().map_or(AttributeValue::Null, AttributeValue::Float),
            },
            Value::String(s) => AttributeValue::String(s),
            other => AttributeValue::String(other.to_string()),
        }
    }
}

/// A geographic feature with geometry and attributes
#[derive(Debug, Clone)]
pub struct Feature {
    /// Feature geometry
    pub geometry: Option<Geometry<f64>>,
    /// Feature attributes
    pub properties: HashMap<String, AttributeValue>,
    /// Optional feature ID
    pub id: Option<String>,
}

impl Feature {
    /// Create a new feature with geometry
    pub fn new(geometry: Geometry<f64>) -> Self {
        Self {
            geometry: Some(geometry),
            properties: HashMap::new(),
            id: None,
        }
    }

    /// Create a feature with no geometry
    pub fn empty() -> Self {
        Self {
            geometry: None,
            properties: HashMap::new(),
            id: None,
        }
    }

    /// Builder-style attribute setter
    pub fn with_property(mut self, key: impl Into<String>, value: AttributeValue) -> Self {
        self.set_property(key, value);
        self
    }

    /// Set an attribute
    pub fn set_property(&mut self, key: impl Into<String>, value: AttributeValue) {
        self.properties.insert(key.into(), value);
    }

    /// Get an attribute
    pub fn get_property(&self, key: &str) -> Option<&AttributeValue> {
        self.properties.get(key)
    }
}

/// A collection of features sharing one CRS
#[derive(Debug, Clone, Default)]
pub struct VectorLayer {
    /// Layer CRS; `None` when the source did not declare one
    pub crs: Option<CRS>,
    pub features: Vec<Feature>,
}

impl VectorLayer {
    pub fn new(crs: Option<CRS>) -> Self {
        Self {
            crs,
            features: Vec::new(),
        }
    }

    /// The empty layer substituted for an unreadable source
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn push(&mut self, feature: Feature) {
        self.features.push(feature);
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Feature> {
        self.features.iter()
    }

    /// Attribute names present on any feature, sorted
    pub fn columns(&self) -> BTreeSet<&str> {
        self.features
            .iter()
            .flat_map(|f| f.properties.keys().map(String::as_str))
            .collect()
    }

    /// Whether any feature carries the attribute
    pub fn has_column(&self, name: &str) -> bool {
        self.features.iter().any(|f| f.properties.contains_key(name))
    }

    /// Rename an attribute on every feature
    pub fn rename_column(mut self, from: &str, to: &str) -> Self {
        for feature in &mut self.features {
            if let Some(v) = feature.properties.remove(from) {
                feature.properties.insert(to.to_string(), v);
            }
        }
        self
    }
}

impl IntoIterator for VectorLayer {
    type Item = Feature;
    type IntoIter = std::vec::IntoIter<Feature>;

    fn into_iter(self) -> Self::IntoIter {
        self.features.into_iter()
    }
}
