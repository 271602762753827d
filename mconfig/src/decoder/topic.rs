use std::fmt;

use crate::bail;
use crate::error::{ErrorKind, MconfigResult};

/// Source tables whose changes feed the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SourceTable {
    Configurations,
    GatewayRecords,
    TierVersions,
}

impl SourceTable {
    pub const ALL: [SourceTable; 3] = [
        SourceTable::Configurations,
        SourceTable::GatewayRecords,
        SourceTable::TierVersions,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SourceTable::Configurations => "configurations",
            SourceTable::GatewayRecords => "gatewayrecords",
            SourceTable::TierVersions => "tierversions",
        }
    }
}

impl fmt::Display for SourceTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Network and table a CDC topic belongs to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TopicName {
    pub network_id: String,
    pub table: SourceTable,
}

impl TopicName {
    /// Parses `<prefix>.<network>_<table>`.
    ///
    /// The network is everything between the last `.` and the table suffix, so network ids may
    /// themselves contain underscores and table names.
    pub fn parse(topic: &str) -> MconfigResult<TopicName> {
        let Some((_, relation)) = topic.rsplit_once('.') else {
            return malformed(topic);
        };

        for table in SourceTable::ALL {
            let Some(network_id) = relation
                .strip_suffix(table.as_str())
                .and_then(|rest| rest.strip_suffix('_'))
            else {
                continue;
            };

            if network_id.is_empty() {
                return malformed(topic);
            }

            return Ok(TopicName {
                network_id: network_id.to_string(),
                table,
            });
        }

        malformed(topic)
    }
}

fn malformed(topic: &str) -> MconfigResult<TopicName> {
    bail!(
        ErrorKind::MalformedTopic,
        "Malformed CDC topic name",
        format!("Could not parse network and table name from topic name {topic}")
    )
}

/// Regex subscription matching every table topic under `prefix`.
pub fn subscription_pattern(prefix: &str) -> String {
    let tables = SourceTable::ALL
        .iter()
        .map(SourceTable::as_str)
        .collect::<Vec<_>>()
        .join("|");

    format!(r"^{}\..+_({tables})$", escape_regex(prefix))
}

fn escape_regex(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        if "\\.+*?()|[]{}^$".contains(c) {
            escaped.push('\\');
        }
        escaped.push(c);
    }

    escaped
}
