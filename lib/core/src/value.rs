use serde::{Deserialize, Deserializer, Serialize};
use std::hash::{Hash, Hasher};

/// A single cell value as fetched from the source table.
///
/// Empty strings never survive construction through [`Value::text`] or the
/// `From` conversions: they become [`Value::Null`], so "missing" has exactly
/// one representation by the time anything is scored.
#[derive(Debug, Clone, Serialize, Default)]
#[serde(untagged)]
pub enum Value {
    #[default]
    Null,
    Integer(i64),
    Float(f64),
    Text(String),
}

impl Value {
    /// Build a text value, mapping `""` to `Null`
    #[inline]
    pub fn text(s: impl Into<String>) -> Self {
        let s = s.into();
        if s.is_empty() {
            Value::Null
        } else {
            Value::Text(s)
        }
    }

    /// Normalize an already-built value (empty text becomes `Null`)
    #[must_use]
    pub fn normalized(self) -> Self {
        match self {
            Value::Text(s) if s.is_empty() => Value::Null,
            other => other,
        }
    }

    #[inline]
    pub fn is_missing(&self) -> bool {
        match self {
            Value::Null => true,
            Value::Text(s) => s.is_empty(),
            _ => false,
        }
    }

    #[inline]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Text(s) if !s.is_empty() => Some(s),
            _ => None,
        }
    }

    /// Textual form used for length and pattern comparisons.
    ///
    /// Numbers are rendered in decimal; missing values have no text.
    pub fn as_text(&self) -> Option<std::borrow::Cow<'_, str>> {
        match self {
            Value::Null => None,
            Value::Text(s) if s.is_empty() => None,
            Value::Text(s) => Some(std::borrow::Cow::Borrowed(s.as_str())),
            Value::Integer(i) => Some(std::borrow::Cow::Owned(i.to_string())),
            Value::Float(f) => Some(std::borrow::Cow::Owned(f.to_string())),
        }
    }

    /// Length in characters of the textual form, `None` when missing
    pub fn text_len(&self) -> Option<usize> {
        match self {
            Value::Text(s) if !s.is_empty() => Some(s.chars().count()),
            Value::Integer(i) => Some(i.to_string().len()),
            Value::Float(f) => Some(f.to_string().len()),
            _ => None,
        }
    }

    /// Convert a JSON scalar into a value. Arrays and objects are rejected.
    pub fn from_json(json: &serde_json::Value) -> Option<Self> {
        match json {
            serde_json::Value::Null => Some(Value::Null),
            serde_json::Value::String(s) => Some(Value::text(s.as_str())),
            serde_json::Value::Bool(b) => Some(Value::Integer(i64::from(*b))),
            serde_json::Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Some(Value::Integer(i))
                } else {
                    n.as_f64().map(Value::Float)
                }
            }
            serde_json::Value::Array(_) | serde_json::Value::Object(_) => None,
        }
    }
}

/// Wire shape accepted when deserializing; booleans become 0/1 and empty
/// text becomes `Null`, matching [`Value::from_json`].
#[derive(Deserialize)]
#[serde(untagged)]
enum RawValue {
    Null,
    Bool(bool),
    Integer(i64),
    Float(f64),
    Text(String),
}

impl From<RawValue> for Value {
    fn from(raw: RawValue) -> Self {
        match raw {
            RawValue::Null => Value::Null,
            RawValue::Bool(b) => Value::Integer(i64::from(b)),
            RawValue::Integer(i) => Value::Integer(i),
            RawValue::Float(f) => Value::Float(f),
            RawValue::Text(s) => Value::text(s),
        }
    }
}

impl<'de> Deserialize<'de> for Value {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        RawValue::deserialize(deserializer).map(Value::from)
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Integer(a), Value::Integer(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a.to_bits() == b.to_bits(),
            (Value::Text(a), Value::Text(b)) => a == b,
            _ => false,
        }
    }
}

impl Eq for Value {}

impl Hash for Value {
    fn hash<H: Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        match self {
            Value::Null => {}
            Value::Integer(i) => i.hash(state),
            Value::Float(f) => f.to_bits().hash(state),
            Value::Text(s) => s.hash(state),
        }
    }
}

impl std::fmt::Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::Null => write!(f, "NULL"),
            Value::Integer(i) => write!(f, "{}", i),
            Value::Float(x) => write!(f, "{}", x),
            Value::Text(s) => write!(f, "{}", s),
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::text(s)
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::text(s)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Integer(i)
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Value::Float(f)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(Value::Null)
    }
}
