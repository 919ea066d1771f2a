/// Result Rows
///
/// Fully materialized query results. Rows keep the column order reported by
/// the database and share one copy of the column names.
use super::value::Value;
use serde::ser::{Serialize, SerializeMap, Serializer};
use std::ops::Index;
use std::sync::Arc;

/// A single result row: a mapping from column name to value.
///
/// When a query returns several columns with the same name (`SELECT a.id,
/// b.id ...`), lookups by name and the serialized object see only the last
/// of them. Every column stays reachable through [`Row::get_index`] and
/// [`Row::values`].
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    columns: Arc<[String]>,
    values: Vec<Value>,
}

impl Row {
    pub fn new(columns: Arc<[String]>, values: Vec<Value>) -> Self {
        debug_assert_eq!(columns.len(), values.len());
        Row { columns, values }
    }

    /// Looks up a value by column name. With duplicate names the last
    /// column wins.
    pub fn get(&self, column: &str) -> Option<&Value> {
        self.columns
            .iter()
            .rposition(|c| c == column)
            .map(|i| &self.values[i])
    }

    /// Looks up a value by zero-based column position.
    pub fn get_index(&self, index: usize) -> Option<&Value> {
        self.values.get(index)
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn values(&self) -> &[Value] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Iterates `(column, value)` pairs in column order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.columns.iter().map(String::as_str).zip(self.values.iter())
    }
}

impl Index<&str> for Row {
    type Output = Value;

    fn index(&self, column: &str) -> &Value {
        match self.get(column) {
            Some(value) => value,
            None => panic!("no column named {:?} in row", column),
        }
    }
}

impl Serialize for Row {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        // Emit each name once, at the position of its last occurrence.
        let is_last = |i: usize| !self.columns[i + 1..].contains(&self.columns[i]);
        let unique = (0..self.len()).filter(|&i| is_last(i)).count();

        let mut map = serializer.serialize_map(Some(unique))?;
        for (i, (column, value)) in self.iter().enumerate() {
            if is_last(i) {
                map.serialize_entry(column, value)?;
            }
        }
        map.end()
    }
}

/// The outcome of one executed statement.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResultSet {
    /// Column names from the statement (empty for data-modifying statements)
    pub columns: Vec<String>,
    /// Rows in the order the database returned them
    pub rows: Vec<Row>,
    /// Rows changed by this statement (RETURNING included), 0 for queries and DDL
    pub rows_affected: usize,
}

impl ResultSet {
    pub fn new(columns: Vec<String>, rows: Vec<Row>, rows_affected: usize) -> Self {
        ResultSet {
            columns,
            rows,
            rows_affected,
        }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn first(&self) -> Option<&Row> {
        self.rows.first()
    }

    pub fn into_rows(self) -> Vec<Row> {
        self.rows
    }
}
