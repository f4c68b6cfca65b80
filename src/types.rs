//! Core value types for user-props
//!
//! This module contains the small value types shared by the tree, the
//! scripting layer and the pipeline.
//!
//! # Main Types
//!
//! - [`NodeType`] - The five node kinds (`object`, `array`, `string`, `number`, `boolean`)
//! - [`PropValue`] - The value held by a primitive node
//!
//! # Coercion
//!
//! Values written into a node always take the node's fixed primitive type.
//! [`PropValue::coerce_to`] implements the conversion rules:
//!
//! - to `number`: booleans become `1`/`0`, blank strings become `0`, other
//!   strings are parsed and fail when they are not numeric
//! - to `string`: numbers use the shortest round-trip form (`5`, not `5.0`)
//! - to `boolean`: numbers are true unless `0`/`NaN`, strings unless empty

use serde::{Deserialize, Serialize};

/// The kind of a tree node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum NodeType {
    /// Keyed container
    #[default]
    Object,
    /// Ordered container
    Array,
    /// Text primitive
    String,
    /// Floating point primitive
    Number,
    /// Boolean primitive
    Boolean,
}

impl NodeType {
    /// Returns true for `string`, `number` and `boolean`
    pub fn is_primitive(&self) -> bool {
        matches!(self, NodeType::String | NodeType::Number | NodeType::Boolean)
    }

    /// Returns true for `object` and `array`
    pub fn is_container(&self) -> bool {
        !self.is_primitive()
    }

    /// Default value for a primitive type (`None` for containers)
    pub fn default_value(&self) -> Option<PropValue> {
        match self {
            NodeType::String => Some(PropValue::String(String::new())),
            NodeType::Number => Some(PropValue::Number(0.0)),
            NodeType::Boolean => Some(PropValue::Boolean(false)),
            NodeType::Object | NodeType::Array => None,
        }
    }
}

impl std::fmt::Display for NodeType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            NodeType::Object => write!(f, "object"),
            NodeType::Array => write!(f, "array"),
            NodeType::String => write!(f, "string"),
            NodeType::Number => write!(f, "number"),
            NodeType::Boolean => write!(f, "boolean"),
        }
    }
}

/// The value held by a primitive node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PropValue {
    Boolean(bool),
    Number(f64),
    String(String),
}

impl PropValue {
    /// The primitive node type matching this value
    pub fn node_type(&self) -> NodeType {
        match self {
            PropValue::String(_) => NodeType::String,
            PropValue::Number(_) => NodeType::Number,
            PropValue::Boolean(_) => NodeType::Boolean,
        }
    }

    /// Value equality used for change detection.
    ///
    /// Unlike `==`, `NaN` is equal to itself so a node holding `NaN` does not
    /// register as changed on every run.
    pub fn same_value(&self, other: &PropValue) -> bool {
        match (self, other) {
            (PropValue::Number(a), PropValue::Number(b)) => {
                (a.is_nan() && b.is_nan()) || a == b
            }
            _ => self == other,
        }
    }

    /// Convert into the given primitive type.
    ///
    /// Returns `None` when the target is a container or when a string cannot
    /// be read as a number.
    pub fn coerce_to(&self, target: NodeType) -> Option<PropValue> {
        match target {
            NodeType::Number => match self {
                PropValue::Number(n) => Some(PropValue::Number(*n)),
                PropValue::Boolean(b) => Some(PropValue::Number(if *b { 1.0 } else { 0.0 })),
                PropValue::String(s) => parse_number(s).map(PropValue::Number),
            },
            NodeType::String => Some(PropValue::String(self.to_string())),
            NodeType::Boolean => Some(PropValue::Boolean(self.is_truthy())),
            NodeType::Object | NodeType::Array => None,
        }
    }

    /// Truthiness as used by boolean coercion
    pub fn is_truthy(&self) -> bool {
        match self {
            PropValue::Boolean(b) => *b,
            PropValue::Number(n) => *n != 0.0 && !n.is_nan(),
            PropValue::String(s) => !s.is_empty(),
        }
    }

    /// Numeric view, if this is a number
    pub fn as_number(&self) -> Option<f64> {
        match self {
            PropValue::Number(n) => Some(*n),
            _ => None,
        }
    }

    /// String view, if this is a string
    pub fn as_str(&self) -> Option<&str> {
        match self {
            PropValue::String(s) => Some(s),
            _ => None,
        }
    }

    /// JSON representation; non-finite numbers become `null`
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            PropValue::String(s) => serde_json::Value::String(s.clone()),
            PropValue::Boolean(b) => serde_json::Value::Bool(*b),
            PropValue::Number(n) => json_number(*n),
        }
    }

    /// Read a JSON scalar. Containers and `null` yield `None`.
    pub fn from_json(value: &serde_json::Value) -> Option<PropValue> {
        match value {
            serde_json::Value::String(s) => Some(PropValue::String(s.clone())),
            serde_json::Value::Bool(b) => Some(PropValue::Boolean(*b)),
            serde_json::Value::Number(n) => n.as_f64().map(PropValue::Number),
            _ => None,
        }
    }
}

/// Whole values in `i64` range are written as JSON integers, like
/// `JSON.stringify`. Non-finite values become `null`.
fn json_number(n: f64) -> serde_json::Value {
    // 2^63 is exact as f64; i64::MAX is not
    const LIMIT: f64 = 9_223_372_036_854_775_808.0;
    if n.fract() == 0.0 && (-LIMIT..LIMIT).contains(&n) {
        return serde_json::Value::from(n as i64);
    }
    serde_json::Number::from_f64(n)
        .map(serde_json::Value::Number)
        .unwrap_or(serde_json::Value::Null)
}

impl std::fmt::Display for PropValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PropValue::String(s) => write!(f, "{}", s),
            PropValue::Number(n) => write!(f, "{}", format_number(*n)),
            PropValue::Boolean(b) => write!(f, "{}", b),
        }
    }
}

impl From<f64> for PropValue {
    fn from(value: f64) -> Self {
        PropValue::Number(value)
    }
}

impl From<bool> for PropValue {
    fn from(value: bool) -> Self {
        PropValue::Boolean(value)
    }
}

impl From<&str> for PropValue {
    fn from(value: &str) -> Self {
        PropValue::String(value.to_string())
    }
}

impl From<String> for PropValue {
    fn from(value: String) -> Self {
        PropValue::String(value)
    }
}

/// Format a number the way the editor displays it (`5`, `2.5`, `NaN`, `Infinity`)
pub fn format_number(n: f64) -> String {
    if n.is_nan() {
        "NaN".to_string()
    } else if n.is_infinite() {
        if n > 0.0 { "Infinity" } else { "-Infinity" }.to_string()
    } else if n == 0.0 {
        "0".to_string()
    } else {
        format!("{}", n)
    }
}

/// Parse user text as a number. Blank text reads as `0`.
pub fn parse_number(text: &str) -> Option<f64> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Some(0.0);
    }
    match trimmed {
        "Infinity" | "+Infinity" => Some(f64::INFINITY),
        "-Infinity" => Some(f64::NEG_INFINITY),
        "NaN" => Some(f64::NAN),
        _ => trimmed.parse::<f64>().ok().filter(|n| n.is_finite()),
    }
}
