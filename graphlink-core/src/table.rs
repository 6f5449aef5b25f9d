//! Tabular procedure results
//!
//! Every procedure invocation, whether it travels over Bolt or Arrow Flight,
//! resolves to a [`ResultTable`]: ordered column names plus rows of JSON
//! values. Bulk transfers keep their `RecordBatch` form; summaries and
//! catalog listings are small enough that a row-oriented view is the more
//! convenient shape for callers.

use arrow::json::ArrayWriter;
use arrow::record_batch::RecordBatch;
use serde_json::{Map, Value};

use crate::error::{ClientError, Result};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResultTable {
    columns: Vec<String>,
    rows: Vec<Map<String, Value>>,
}

impl ResultTable {
    pub fn new(columns: Vec<String>, rows: Vec<Map<String, Value>>) -> Self {
        Self { columns, rows }
    }

    /// Builds a table from rows of JSON objects, deriving the column order
    /// from the first row.
    pub fn from_rows(rows: Vec<Map<String, Value>>) -> Self {
        let columns = rows
            .first()
            .map(|row| row.keys().cloned().collect())
            .unwrap_or_default();
        Self { columns, rows }
    }

    /// Converts Arrow record batches to a row-oriented table.
    pub fn from_batches(batches: &[RecordBatch]) -> Result<Self> {
        let Some(first) = batches.first() else {
            return Ok(Self::default());
        };
        let columns = first
            .schema()
            .fields()
            .iter()
            .map(|f| f.name().clone())
            .collect();

        let mut writer = ArrayWriter::new(Vec::new());
        for batch in batches {
            writer.write(batch)?;
        }
        writer.finish()?;
        let rows: Vec<Map<String, Value>> = serde_json::from_slice(&writer.into_inner())?;

        Ok(Self { columns, rows })
    }

    /// Renames a column in place, keeping its position in both the column
    /// list and the rows. A missing column is a no-op.
    pub fn rename_column(&mut self, from: &str, to: &str) {
        for name in &mut self.columns {
            if name == from {
                *name = to.to_string();
            }
        }
        for row in &mut self.rows {
            if row.contains_key(from) {
                *row = row
                    .iter()
                    .map(|(key, value)| {
                        let key = if key == from { to } else { key.as_str() };
                        (key.to_string(), value.clone())
                    })
                    .collect();
            }
        }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Map<String, Value>] {
        &self.rows
    }

    pub fn into_rows(self) -> Vec<Map<String, Value>> {
        self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// The single row of a one-row result, such as a procedure summary.
    pub fn single_row(&self) -> Result<&Map<String, Value>> {
        match self.rows.len() {
            1 => Ok(&self.rows[0]),
            n => Err(ClientError::Query(format!(
                "expected exactly one result row, got {n}"
            ))),
        }
    }

    /// The single value of a one-row, one-column result.
    pub fn single_value(&self) -> Result<&Value> {
        let row = self.single_row()?;
        match self.columns.first() {
            Some(col) if row.len() == 1 => row
                .get(col)
                .ok_or_else(|| ClientError::MissingField(col.clone())),
            _ => Err(ClientError::Query(format!(
                "expected exactly one result column, got {}",
                self.columns.len()
            ))),
        }
    }

    pub fn value(&self, row: usize, column: &str) -> Result<&Value> {
        self.rows
            .get(row)
            .and_then(|r| r.get(column))
            .ok_or_else(|| ClientError::MissingField(column.to_string()))
    }

    pub fn column(&self, column: &str) -> Vec<&Value> {
        self.rows.iter().filter_map(|r| r.get(column)).collect()
    }

    pub fn get_str(&self, row: usize, column: &str) -> Result<&str> {
        self.value(row, column)?
            .as_str()
            .ok_or_else(|| type_error(column, "string"))
    }

    pub fn get_i64(&self, row: usize, column: &str) -> Result<i64> {
        self.value(row, column)?
            .as_i64()
            .ok_or_else(|| type_error(column, "integer"))
    }

    pub fn get_f64(&self, row: usize, column: &str) -> Result<f64> {
        self.value(row, column)?
            .as_f64()
            .ok_or_else(|| type_error(column, "float"))
    }

    pub fn get_bool(&self, row: usize, column: &str) -> Result<bool> {
        self.value(row, column)?
            .as_bool()
            .ok_or_else(|| type_error(column, "boolean"))
    }

    pub fn get_object(&self, row: usize, column: &str) -> Result<&Map<String, Value>> {
        self.value(row, column)?
            .as_object()
            .ok_or_else(|| type_error(column, "map"))
    }
}

fn type_error(column: &str, expected: &str) -> ClientError {
    ClientError::Query(format!("column `{column}` is not a {expected}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use arrow::array::{Float64Array, Int64Array, StringArray};
    use arrow::datatypes::{DataType, Field, Schema};
    use std::sync::Arc;

    fn sample_rows() -> Vec<Map<String, Value>> {
        let mut row = Map::new();
        row.insert("name".to_string(), Value::from("persons"));
        row.insert("nodeCount".to_string(), Value::from(42));
        vec![row]
    }

    #[test]
    fn test_from_rows_derives_columns() {
        let table = ResultTable::from_rows(sample_rows());
        assert_eq!(table.columns(), &["name", "nodeCount"]);
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn test_single_value() {
        let mut row = Map::new();
        row.insert("version".to_string(), Value::from("2.6.0"));
        let table = ResultTable::from_rows(vec![row]);

        assert_eq!(table.single_value().unwrap(), &Value::from("2.6.0"));
    }

    #[test]
    fn test_single_row_rejects_multiple() {
        let mut rows = sample_rows();
        rows.extend(sample_rows());
        let table = ResultTable::from_rows(rows);

        assert!(table.single_row().is_err());
    }

    #[test]
    fn test_typed_getters() {
        let table = ResultTable::from_rows(sample_rows());
        assert_eq!(table.get_str(0, "name").unwrap(), "persons");
        assert_eq!(table.get_i64(0, "nodeCount").unwrap(), 42);
        assert!(table.get_f64(0, "name").is_err());
        assert!(table.value(0, "missing").is_err());
    }

    #[test]
    fn test_rename_column_keeps_position() {
        let mut row = Map::new();
        row.insert("nodeId".to_string(), Value::from(0));
        row.insert("labels".to_string(), Value::from("Person"));
        row.insert("score".to_string(), Value::from(0.5));
        let mut table = ResultTable::from_rows(vec![row]);

        table.rename_column("labels", "nodeLabels");

        assert_eq!(table.columns(), &["nodeId", "nodeLabels", "score"]);
        assert_eq!(table.get_str(0, "nodeLabels").unwrap(), "Person");
        assert!(table.value(0, "labels").is_err());
        let keys: Vec<&String> = table.rows()[0].keys().collect();
        assert_eq!(keys, ["nodeId", "nodeLabels", "score"]);
    }

    #[test]
    fn test_rename_missing_column_is_a_no_op() {
        let mut table = ResultTable::from_rows(sample_rows());
        table.rename_column("labels", "nodeLabels");
        assert_eq!(table.columns(), &["name", "nodeCount"]);
    }

    #[test]
    fn test_from_batches() {
        let schema = Arc::new(Schema::new(vec![
            Field::new("nodeId", DataType::Int64, false),
            Field::new("score", DataType::Float64, false),
            Field::new("label", DataType::Utf8, false),
        ]));
        let batch = RecordBatch::try_new(
            schema,
            vec![
                Arc::new(Int64Array::from(vec![0, 1])),
                Arc::new(Float64Array::from(vec![0.15, 0.85])),
                Arc::new(StringArray::from(vec!["A", "B"])),
            ],
        )
        .unwrap();

        let table = ResultTable::from_batches(&[batch]).unwrap();
        assert_eq!(table.columns(), &["nodeId", "score", "label"]);
        assert_eq!(table.len(), 2);
        assert_eq!(table.get_i64(1, "nodeId").unwrap(), 1);
        assert_eq!(table.get_f64(0, "score").unwrap(), 0.15);
        assert_eq!(table.get_str(1, "label").unwrap(), "B");
    }

    #[test]
    fn test_from_empty_batches() {
        let table = ResultTable::from_batches(&[]).unwrap();
        assert!(table.is_empty());
        assert!(table.columns().is_empty());
    }
}
