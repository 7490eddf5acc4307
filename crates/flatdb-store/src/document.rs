use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{StoreError, StoreResult};

/// A stored record: a JSON object with arbitrary values.
///
/// The store never interprets the contents. On disk a document is a single
/// compact JSON text; in memory it is a `serde_json` map, so handlers can
/// work with it untyped or convert to and from their own types with
/// [`Document::from_serialize`] and [`Document::deserialize_into`].
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Document(Map<String, Value>);

impl Document {
    /// Create an empty document.
    pub fn new() -> Self {
        Self(Map::new())
    }

    /// Convert a JSON value into a document. Only objects are accepted.
    pub fn from_value(value: Value) -> StoreResult<Self> {
        match value {
            Value::Object(map) => Ok(Self(map)),
            other => Err(StoreError::Serialization(format!(
                "document must be a JSON object, got {}",
                json_type(&other)
            ))),
        }
    }

    /// Serialize any value whose JSON form is an object.
    pub fn from_serialize<T: Serialize>(value: &T) -> StoreResult<Self> {
        let value =
            serde_json::to_value(value).map_err(|e| StoreError::Serialization(e.to_string()))?;
        Self::from_value(value)
    }

    /// Deserialize the document into a caller type.
    pub fn deserialize_into<T: DeserializeOwned>(&self) -> StoreResult<T> {
        serde_json::from_value(Value::Object(self.0.clone()))
            .map_err(|e| StoreError::Serialization(e.to_string()))
    }

    /// Parse stored text. Fails if the text is not a JSON object.
    pub fn parse(text: &str) -> StoreResult<Self> {
        let value: Value =
            serde_json::from_str(text).map_err(|e| StoreError::Serialization(e.to_string()))?;
        Self::from_value(value)
    }

    /// Render as compact JSON text, the on-disk form.
    pub fn to_json(&self) -> StoreResult<String> {
        serde_json::to_string(&self.0).map_err(|e| StoreError::Serialization(e.to_string()))
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.0.get(field)
    }

    /// Insert a field, returning the previous value if any.
    pub fn insert(&mut self, field: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.0.insert(field.into(), value.into())
    }

    pub fn remove(&mut self, field: &str) -> Option<Value> {
        self.0.remove(field)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    pub fn into_value(self) -> Value {
        Value::Object(self.0)
    }
}

impl From<Map<String, Value>> for Document {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

impl TryFrom<Value> for Document {
    type Error = StoreError;

    fn try_from(value: Value) -> StoreResult<Self> {
        Self::from_value(value)
    }
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
