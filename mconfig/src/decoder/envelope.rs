use serde::Deserialize;
use serde::de::DeserializeOwned;

use crate::bail;
use crate::error::{ErrorKind, MconfigResult};
use crate::types::Operation;

/// Debezium change event. The `schema` block, when present, is ignored.
#[derive(Debug, Deserialize)]
struct Envelope {
    #[serde(default)]
    payload: Option<Payload>,
}

#[derive(Debug, Deserialize)]
struct Payload {
    #[serde(default)]
    before: Option<serde_json::Value>,
    #[serde(default)]
    after: Option<serde_json::Value>,
    op: String,
}

/// Row image and operation extracted from a change event.
#[derive(Debug)]
pub(crate) struct RowChange {
    pub(crate) operation: Operation,
    /// `after` for creates, reads and updates, `before` for deletes.
    row: serde_json::Value,
}

impl RowChange {
    /// Parses an envelope, returning `None` when it carries no payload.
    pub(crate) fn parse(raw: &[u8]) -> MconfigResult<Option<RowChange>> {
        let envelope: Envelope = match serde_json::from_slice(raw) {
            Ok(envelope) => envelope,
            Err(err) => bail!(
                ErrorKind::InvalidEnvelope,
                "CDC message is not a valid change envelope",
                source: err
            ),
        };

        let Some(payload) = envelope.payload else {
            return Ok(None);
        };

        let operation = Operation::from_code(&payload.op)?;
        let row = if operation.is_delete() {
            payload.before
        } else {
            payload.after
        };

        match row {
            Some(row) if !row.is_null() => Ok(Some(RowChange { operation, row })),
            _ => bail!(
                ErrorKind::InvalidEnvelope,
                "CDC envelope is missing its row image",
                format!(
                    "Operation '{}' requires the '{}' row",
                    operation.code(),
                    if operation.is_delete() {
                        "before"
                    } else {
                        "after"
                    }
                )
            ),
        }
    }

    /// Decodes the row image into a table specific row type.
    pub(crate) fn row<T: DeserializeOwned>(&self) -> MconfigResult<T> {
        match serde_json::from_value(self.row.clone()) {
            Ok(row) => Ok(row),
            Err(err) => bail!(
                ErrorKind::InvalidEnvelope,
                "CDC row does not match its table",
                err.to_string(),
                source: err
            ),
        }
    }
}

/// Row of a `configurations` table.
#[derive(Debug, Deserialize)]
pub(crate) struct ConfigRow {
    #[serde(rename = "type")]
    pub(crate) config_type: String,
    pub(crate) key: String,
    /// Base64 encoded bytea column.
    #[serde(default)]
    pub(crate) value: Option<String>,
}

/// Row of a `gatewayrecords` table. Only the key matters to the pipeline.
#[derive(Debug, Deserialize)]
pub(crate) struct GatewayRow {
    pub(crate) key: String,
}

/// Row of a `tierversions` table.
#[derive(Debug, Deserialize)]
pub(crate) struct TierRow {
    pub(crate) key: String,
    #[serde(default)]
    pub(crate) value: Option<String>,
}
