//! Raw tabular results shared by all query backends

use serde::Deserialize;
use serde_json::{Map, Value as JsonValue};

use super::error::DataError;

/// One result row keyed by column name
pub type RawRow = Map<String, JsonValue>;

/// Columnar query result: named columns plus positional row arrays
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawTable {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<JsonValue>>,
}

/// `{"tables": [{"columns": [{"name": ..}], "rows": [[..]]}]}`
#[derive(Deserialize)]
struct QueryEnvelope {
    tables: Vec<EnvelopeTable>,
}

#[derive(Deserialize)]
struct EnvelopeTable {
    #[serde(default)]
    columns: Vec<EnvelopeColumn>,
    #[serde(default)]
    rows: Vec<Vec<JsonValue>>,
}

#[derive(Deserialize)]
struct EnvelopeColumn {
    name: String,
}

impl RawTable {
    /// Decode a query response envelope.
    ///
    /// Only the first (primary) table is used. An envelope with no tables is
    /// an empty result; a body without a `tables` array is a transport error.
    pub fn from_envelope(backend: &'static str, body: JsonValue) -> Result<Self, DataError> {
        let envelope: QueryEnvelope = serde_json::from_value(body).map_err(|e| {
            DataError::transport(backend, format!("malformed query response: {}", e))
        })?;

        Ok(envelope
            .tables
            .into_iter()
            .next()
            .map(|table| Self {
                columns: table.columns.into_iter().map(|c| c.name).collect(),
                rows: table.rows,
            })
            .unwrap_or_default())
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Zip every row with the column names.
    ///
    /// Rows shorter than the header simply lack the trailing columns; extra
    /// cells beyond the header are ignored.
    pub fn into_rows(self) -> Vec<RawRow> {
        let Self { columns, rows } = self;
        rows.into_iter()
            .map(|row| columns.iter().cloned().zip(row).collect())
            .collect()
    }
}
