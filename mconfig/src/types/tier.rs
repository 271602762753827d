use std::fmt;

use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize};

/// Container image pinned by a tier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageSpec {
    pub name: String,
    #[serde(deserialize_with = "deserialize_order")]
    pub order: i64,
}

/// Tier version row decoded from a `tierversions` change.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct TierInfo {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub version: String,
    #[serde(default)]
    pub images: Vec<ImageSpec>,
}

/// Accepts `order` both as a JSON number and as a string holding an integer.
///
/// Protobuf JSON encodes 64 bit integers as strings.
fn deserialize_order<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    struct OrderVisitor;

    impl Visitor<'_> for OrderVisitor {
        type Value = i64;

        fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
            formatter.write_str("an integer or a string containing an integer")
        }

        fn visit_i64<E: de::Error>(self, value: i64) -> Result<i64, E> {
            Ok(value)
        }

        fn visit_u64<E: de::Error>(self, value: u64) -> Result<i64, E> {
            i64::try_from(value).map_err(|_| E::custom(format!("order {value} out of range")))
        }

        fn visit_str<E: de::Error>(self, value: &str) -> Result<i64, E> {
            value
                .trim()
                .parse()
                .map_err(|_| E::custom(format!("invalid order '{value}'")))
        }
    }

    deserializer.deserialize_any(OrderVisitor)
}
