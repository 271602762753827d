//! Debezium change events as produced for the `configurations`, `gatewayrecords` and
//! `tierversions` tables. Bytea columns are base64 encoded.

use serde_json::{Value, json};

/// Config row created with type `test_config`, key `key` and value `value`.
///
/// Full capture including the connector schema block.
pub const CONFIG_CREATED_FIXTURE: &str = r#"
{
  "schema": {
    "type": "struct",
    "fields": [
      {
        "type": "struct",
        "fields": [
          {"type": "string", "optional": false, "field": "type"},
          {"type": "string", "optional": false, "field": "key"},
          {"type": "bytes", "optional": true, "field": "value"},
          {"type": "int32", "optional": false, "field": "version"}
        ],
        "optional": true,
        "name": "magma.public.n1_configurations.Value",
        "field": "before"
      },
      {
        "type": "struct",
        "fields": [
          {"type": "string", "optional": false, "field": "type"},
          {"type": "string", "optional": false, "field": "key"},
          {"type": "bytes", "optional": true, "field": "value"},
          {"type": "int32", "optional": false, "field": "version"}
        ],
        "optional": true,
        "name": "magma.public.n1_configurations.Value",
        "field": "after"
      },
      {
        "type": "struct",
        "fields": [
          {"type": "string", "optional": true, "field": "version"},
          {"type": "string", "optional": false, "field": "name"},
          {"type": "int64", "optional": true, "field": "ts_usec"},
          {"type": "int32", "optional": true, "field": "txId"},
          {"type": "int64", "optional": true, "field": "lsn"},
          {"type": "boolean", "optional": true, "default": false, "field": "snapshot"},
          {"type": "boolean", "optional": true, "field": "last_snapshot_record"}
        ],
        "optional": false,
        "name": "io.debezium.connector.postgresql.Source",
        "field": "source"
      },
      {"type": "string", "optional": false, "field": "op"},
      {"type": "int64", "optional": true, "field": "ts_ms"}
    ],
    "optional": false,
    "name": "magma.public.n1_configurations.Envelope"
  },
  "payload": {
    "before": null,
    "after": {
      "type": "test_config",
      "key": "key",
      "value": "dmFsdWU=",
      "version": 0
    },
    "source": {
      "version": "0.7.5",
      "name": "magma",
      "ts_usec": 1528753424430907000,
      "txId": 601,
      "lsn": 22496127,
      "snapshot": false,
      "last_snapshot_record": null
    },
    "op": "c",
    "ts_ms": 1528831778308
  }
}"#;

/// Config row of type `wifi_network` with key `n1` deleted.
pub const CONFIG_DELETED_FIXTURE: &str = r#"
{
  "payload": {
    "before": {
      "type": "wifi_network",
      "key": "n1",
      "value": null,
      "version": 0
    },
    "after": null,
    "source": {"version": "0.7.5", "name": "magma", "txId": 603, "snapshot": false},
    "op": "d",
    "ts_ms": 1528832038417
  }
}"#;

/// Gateway record `vm1` created.
pub const GATEWAY_CREATED_FIXTURE: &str = r#"
{
  "payload": {
    "before": null,
    "after": {
      "key": "vm1",
      "value": "ewogImh3SWQiOiB7CiAgImlkIjogImY3Y2JhN2M1LTViMzctNDM3OC05YmJiLWJjYWY3OTBjY2IyNiIKIH0sCiAibmFtZSI6ICJTb3V0aCBQYXJrJ3MgQ3RQYSBUb3duIFRvd2VyIiwKICJrZXkiOiB7CiAgImtleVR5cGUiOiAiRUNITyIsCiAgImtleSI6IG51bGwKIH0sCiAiaXAiOiAiIiwKICJwb3J0IjogMAp9",
      "generation_number": 0,
      "deleted": false
    },
    "source": {"version": "0.7.5", "name": "magma", "txId": 610, "snapshot": false},
    "op": "c",
    "ts_ms": 1528836007441
  }
}"#;

/// Gateway record `deleteme` deleted.
pub const GATEWAY_DELETED_FIXTURE: &str = r#"
{
  "payload": {
    "before": {
      "key": "deleteme",
      "value": null,
      "generation_number": 0,
      "deleted": false
    },
    "after": null,
    "source": {"version": "0.7.5", "name": "magma", "txId": 612, "snapshot": false},
    "op": "d",
    "ts_ms": 1528836112004
  }
}"#;

/// Tier `default` created at version `1.2.3-4` with image `img1` (order encoded as a string).
pub const TIER_CREATED_FIXTURE: &str = r#"
{
  "payload": {
    "before": null,
    "after": {
      "key": "default",
      "value": "ewogIm5hbWUiOiAiZGVmYXVsdCIsCiAidmVyc2lvbiI6ICIxLjIuMy00IiwKICJpbWFnZXMiOiBbCiAgewogICAibmFtZSI6ICJpbWcxIiwKICAgIm9yZGVyIjogIjEiCiAgfQogXQp9",
      "generation_number": 0,
      "deleted": false
    },
    "source": {"version": "0.7.5", "name": "magma", "txId": 620, "snapshot": false},
    "op": "c",
    "ts_ms": 1528836290114
  }
}"#;

/// Tier `deleteme` deleted.
pub const TIER_DELETED_FIXTURE: &str = r#"
{
  "payload": {
    "before": {
      "key": "deleteme",
      "value": null,
      "generation_number": 0,
      "deleted": false
    },
    "after": null,
    "source": {"version": "0.7.5", "name": "magma", "txId": 621, "snapshot": false},
    "op": "d",
    "ts_ms": 1528836301873
  }
}"#;

/// Builds a change event without schema block.
pub fn envelope(op: &str, before: Option<Value>, after: Option<Value>) -> String {
    json!({
        "payload": {
            "before": before,
            "after": after,
            "source": {"name": "magma", "snapshot": false},
            "op": op,
            "ts_ms": 0
        }
    })
    .to_string()
}

/// Change event of a `configurations` row holding `value`.
///
/// A `None` value produces a delete carrying the previous row.
pub fn config_change(config_type: &str, key: &str, value: Option<&str>) -> Vec<u8> {
    use base64::Engine;

    match value {
        Some(value) => {
            let encoded = base64::engine::general_purpose::STANDARD.encode(value);
            envelope(
                "u",
                None,
                Some(json!({"type": config_type, "key": key, "value": encoded, "version": 1})),
            )
        }
        None => envelope(
            "d",
            Some(json!({"type": config_type, "key": key, "value": null, "version": 1})),
            None,
        ),
    }
    .into_bytes()
}

/// Change event of a `gatewayrecords` row.
pub fn gateway_change(op: &str, gateway_id: &str) -> Vec<u8> {
    let row = json!({"key": gateway_id, "value": null, "generation_number": 0, "deleted": false});
    let payload = if op == "d" {
        envelope(op, Some(row), None)
    } else {
        envelope(op, None, Some(row))
    };

    payload.into_bytes()
}

/// Change event of a `tierversions` row at `version` with the given images.
///
/// A `None` version produces a delete.
pub fn tier_change(tier_id: &str, version: Option<&str>, images: &[(&str, i64)]) -> Vec<u8> {
    use base64::Engine;

    let payload = match version {
        Some(version) => {
            let info = json!({
                "id": tier_id,
                "name": tier_id,
                "version": version,
                "images": images
                    .iter()
                    .map(|(name, order)| json!({"name": name, "order": order.to_string()}))
                    .collect::<Vec<_>>(),
            });
            let encoded = base64::engine::general_purpose::STANDARD.encode(info.to_string());
            envelope(
                "u",
                None,
                Some(json!({"key": tier_id, "value": encoded, "generation_number": 0, "deleted": false})),
            )
        }
        None => envelope(
            "d",
            Some(json!({"key": tier_id, "value": null, "generation_number": 0, "deleted": false})),
            None,
        ),
    };

    payload.into_bytes()
}
