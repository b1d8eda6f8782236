//! Result rows with named columns.

use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use crate::error::{DatabaseError, Result};

/// One result row, keyed by column name.
///
/// Values are carried as text (`None` for SQL `NULL`) and decoded into typed
/// structs by column name with [`SqlRow::decode`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SqlRow {
    columns: Map<String, Value>,
}

impl SqlRow {
    /// Creates an empty row.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a column value.
    pub fn with(mut self, column: impl Into<String>, value: Option<impl Into<String>>) -> Self {
        self.insert(column, value);
        self
    }

    /// Sets a column value.
    pub fn insert(&mut self, column: impl Into<String>, value: Option<impl Into<String>>) {
        let value = value.map_or(Value::Null, |v| Value::String(v.into()));
        self.columns.insert(column.into(), value);
    }

    /// Returns the text of a column, or `None` if absent or NULL.
    pub fn get(&self, column: &str) -> Option<&str> {
        self.columns.get(column).and_then(Value::as_str)
    }

    /// Returns true if the row has a column with this name.
    pub fn has_column(&self, column: &str) -> bool {
        self.columns.contains_key(column)
    }

    /// Returns the number of columns.
    pub fn len(&self) -> usize {
        self.columns.len()
    }

    /// Returns true if the row has no columns.
    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Decodes the row into `T`, matching struct fields to column names.
    ///
    /// A required column that is missing or NULL is a decode error.
    pub fn decode<T: DeserializeOwned>(&self) -> Result<T> {
        serde_json::from_value(Value::Object(self.columns.clone())).map_err(DatabaseError::decode)
    }
}

/// Decodes every row into `T`.
pub fn decode_rows<T: DeserializeOwned>(rows: &[SqlRow]) -> Result<Vec<T>> {
    rows.iter().map(SqlRow::decode).collect()
}
