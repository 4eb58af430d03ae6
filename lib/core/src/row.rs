use crate::error::{Error, Result};
use crate::value::Value;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Column holding the precomputed duplicate-group identifier
pub const GROUP_KEY_COLUMN: &str = "dedupe_id";

/// One candidate record: an ordered mapping from column name to value
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Row {
    fields: IndexMap<String, Value>,
}

impl Row {
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a row from `(column, value)` pairs, normalizing empty strings
    pub fn from_pairs<K, V, I>(pairs: I) -> Self
    where
        K: Into<String>,
        V: Into<Value>,
        I: IntoIterator<Item = (K, V)>,
    {
        let fields = pairs
            .into_iter()
            .map(|(k, v)| (k.into(), v.into().normalized()))
            .collect();
        Self { fields }
    }

    /// Build a row from a flat JSON object
    pub fn from_json(json: &serde_json::Value) -> Result<Self> {
        let obj = json.as_object().ok_or_else(|| {
            Error::Serialization("row must be a JSON object".to_string())
        })?;
        let mut row = Row::new();
        for (name, v) in obj {
            let value = Value::from_json(v).ok_or_else(|| {
                Error::Serialization(format!("column '{}' is not a scalar", name))
            })?;
            row.insert(name.clone(), value);
        }
        Ok(row)
    }

    #[must_use]
    pub fn with(mut self, column: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(column, value);
        self
    }

    pub fn insert(&mut self, column: impl Into<String>, value: impl Into<Value>) {
        self.fields.insert(column.into(), value.into().normalized());
    }

    #[inline]
    pub fn get(&self, column: &str) -> Option<&Value> {
        self.fields.get(column)
    }

    /// Look up a column that the caller contract says must be present.
    ///
    /// A missing column is a data error; `Null` is a present-but-missing value
    /// and is returned normally.
    pub fn require(&self, column: &str) -> Result<&Value> {
        self.fields.get(column).ok_or_else(|| Error::MissingColumn {
            group_key: self
                .fields
                .get(GROUP_KEY_COLUMN)
                .map(|k| k.to_string())
                .unwrap_or_else(|| "?".to_string()),
            column: column.to_string(),
        })
    }

    /// The row's duplicate-group key. `Null` or absent keys are data errors.
    pub fn group_key(&self) -> Result<&Value> {
        match self.fields.get(GROUP_KEY_COLUMN) {
            Some(v) if !v.is_missing() => Ok(v),
            _ => Err(Error::MissingGroupKey {
                column: GROUP_KEY_COLUMN.to_string(),
            }),
        }
    }

    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}
