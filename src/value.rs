//! Field records and the serde helpers used to decode them.
//!
//! A component value is held as a JSON object. The indexer serialises large
//! integers as strings (`"0x1a"` or `"26"`) and small ones as numbers, so the
//! numeric helpers here accept every form.

use std::fmt;

use serde::de::{self, Visitor};
use serde::{Deserializer, Serializer};
use serde_json::Value;

/// A component field record: field name to JSON value.
pub type Record = serde_json::Map<String, Value>;

/// Builds a record from `(field, value)` pairs.
///
/// # Examples
///
/// ```
/// use realmsync::value::record;
/// use serde_json::json;
///
/// let partial = record([("balance", json!(12))]);
/// assert_eq!(partial["balance"], json!(12));
/// ```
pub fn record<'a, I>(fields: I) -> Record
where
    I: IntoIterator<Item = (&'a str, Value)>,
{
    fields
        .into_iter()
        .map(|(k, v)| (k.to_string(), v))
        .collect()
}

/// Overwrites `target` field-by-field with `partial`.
pub fn merge_into(target: &mut Record, partial: &Record) {
    for (field, value) in partial {
        target.insert(field.clone(), value.clone());
    }
}

/// Keeps only the listed fields of `raw`.
#[must_use]
pub fn project(raw: &Record, fields: &[String]) -> Record {
    fields
        .iter()
        .filter_map(|f| raw.get(f).map(|v| (f.clone(), v.clone())))
        .collect()
}

/// Serde adapter for unsigned integer fields that may arrive as strings.
///
/// Use with `#[serde(with = "crate::value::felt")]`.
pub mod felt {
    use super::{de, fmt, Deserializer, Serializer, Visitor};

    /// Serialises the value as a JSON number.
    pub fn serialize<S, T>(value: &T, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
        T: Copy + Into<u64>,
    {
        serializer.serialize_u64((*value).into())
    }

    /// Accepts a number, a `0x` hex string or a decimal string.
    pub fn deserialize<'de, D, T>(deserializer: D) -> Result<T, D::Error>
    where
        D: Deserializer<'de>,
        T: TryFrom<u64>,
    {
        let raw = deserializer.deserialize_any(U64Visitor)?;
        T::try_from(raw).map_err(|_| de::Error::custom(format!("value {raw} out of range")))
    }

    struct U64Visitor;

    impl<'de> Visitor<'de> for U64Visitor {
        type Value = u64;

        fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("an unsigned integer or a hex/decimal string")
        }

        fn visit_u64<E: de::Error>(self, v: u64) -> Result<u64, E> {
            Ok(v)
        }

        fn visit_i64<E: de::Error>(self, v: i64) -> Result<u64, E> {
            u64::try_from(v).map_err(|_| E::custom(format!("negative value: {v}")))
        }

        fn visit_str<E: de::Error>(self, v: &str) -> Result<u64, E> {
            let trimmed = v.trim();
            let parsed = match trimmed.strip_prefix("0x") {
                Some(digits) => u64::from_str_radix(digits, 16),
                None => trimmed.parse::<u64>(),
            };
            parsed.map_err(|e| E::custom(format!("invalid integer '{v}': {e}")))
        }
    }
}

/// Serde adapter for boolean fields that may arrive as `0`/`1`.
pub mod flag {
    use super::{de, fmt, Deserializer, Serializer, Visitor};

    /// Serialises the value as a JSON boolean.
    #[allow(clippy::trivially_copy_pass_by_ref)]
    pub fn serialize<S: Serializer>(value: &bool, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_bool(*value)
    }

    /// Accepts a boolean, `0`/`1`, or `"true"`/`"false"`.
    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<bool, D::Error> {
        deserializer.deserialize_any(FlagVisitor)
    }

    struct FlagVisitor;

    impl<'de> Visitor<'de> for FlagVisitor {
        type Value = bool;

        fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("a boolean or 0/1")
        }

        fn visit_bool<E: de::Error>(self, v: bool) -> Result<bool, E> {
            Ok(v)
        }

        fn visit_u64<E: de::Error>(self, v: u64) -> Result<bool, E> {
            match v {
                0 => Ok(false),
                1 => Ok(true),
                other => Err(E::custom(format!("invalid flag: {other}"))),
            }
        }

        fn visit_i64<E: de::Error>(self, v: i64) -> Result<bool, E> {
            u64::try_from(v)
                .map_err(|_| E::custom(format!("invalid flag: {v}")))
                .and_then(|u| self.visit_u64(u))
        }

        fn visit_str<E: de::Error>(self, v: &str) -> Result<bool, E> {
            match v {
                "true" | "1" | "0x1" => Ok(true),
                "false" | "0" | "0x0" => Ok(false),
                other => Err(E::custom(format!("invalid flag: {other}"))),
            }
        }
    }
}
