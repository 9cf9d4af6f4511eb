//! Entity keys and identity derivation.
//!
//! On chain, every entity is addressed by an ordered sequence of field
//! elements (its keys). The mirror collapses a key sequence into a single
//! canonical [`EntityId`] that the component store uses as its lookup key.

use std::fmt;
use std::str::FromStr;

use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::ValidationError;

const ENTITY_ID_DOMAIN: &[u8] = b"realmsync.entity.v1";

/// A 252-bit field element, stored as 32 big-endian bytes.
///
/// Parsed from `0x`-prefixed hex or decimal strings and displayed as minimal
/// `0x` hex.
///
/// # Examples
///
/// ```
/// use realmsync::Felt;
///
/// let felt: Felt = "0x2a".parse().unwrap();
/// assert_eq!(felt, Felt::from(42u64));
/// assert_eq!(felt.to_string(), "0x2a");
/// ```
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Felt([u8; 32]);

/// A single entity key.
pub type EntityKey = Felt;

impl Felt {
    /// The zero element.
    pub const ZERO: Self = Self([0u8; 32]);

    /// Wraps raw big-endian bytes.
    #[must_use]
    pub const fn from_bytes_be(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Returns the big-endian bytes.
    #[must_use]
    pub const fn to_bytes_be(&self) -> [u8; 32] {
        self.0
    }

    /// Returns the value as `u64` if it fits.
    #[must_use]
    pub fn to_u64(&self) -> Option<u64> {
        if self.0[..24].iter().any(|b| *b != 0) {
            return None;
        }
        let mut tail = [0u8; 8];
        tail.copy_from_slice(&self.0[24..]);
        Some(u64::from_be_bytes(tail))
    }

    fn parse_hex(digits: &str, original: &str) -> Result<Self, ValidationError> {
        if digits.is_empty() {
            return Err(invalid_key(original, "no hex digits"));
        }
        if digits.len() > 64 {
            return Err(invalid_key(original, "more than 64 hex digits"));
        }

        let padded = if digits.len() % 2 == 1 {
            format!("0{digits}")
        } else {
            digits.to_string()
        };
        let decoded = hex::decode(&padded).map_err(|e| invalid_key(original, &e.to_string()))?;

        let mut bytes = [0u8; 32];
        bytes[32 - decoded.len()..].copy_from_slice(&decoded);
        Ok(Self(bytes))
    }

    fn parse_decimal(digits: &str) -> Result<Self, ValidationError> {
        if digits.is_empty() {
            return Err(invalid_key(digits, "empty key"));
        }

        let mut bytes = [0u8; 32];
        for ch in digits.chars() {
            let Some(digit) = ch.to_digit(10) else {
                return Err(invalid_key(digits, "not a decimal or 0x-prefixed hex number"));
            };

            let mut carry = digit;
            for byte in bytes.iter_mut().rev() {
                let v = u32::from(*byte) * 10 + carry;
                *byte = (v & 0xff) as u8;
                carry = v >> 8;
            }
            if carry != 0 {
                return Err(invalid_key(digits, "value exceeds 256 bits"));
            }
        }
        Ok(Self(bytes))
    }
}

fn invalid_key(value: &str, reason: &str) -> ValidationError {
    ValidationError::InvalidKey {
        value: value.to_string(),
        reason: reason.to_string(),
    }
}

impl From<u64> for Felt {
    fn from(value: u64) -> Self {
        let mut bytes = [0u8; 32];
        bytes[24..].copy_from_slice(&value.to_be_bytes());
        Self(bytes)
    }
}

impl From<u128> for Felt {
    fn from(value: u128) -> Self {
        let mut bytes = [0u8; 32];
        bytes[16..].copy_from_slice(&value.to_be_bytes());
        Self(bytes)
    }
}

impl From<u8> for Felt {
    fn from(value: u8) -> Self {
        Self::from(u64::from(value))
    }
}

impl FromStr for Felt {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        match trimmed
            .strip_prefix("0x")
            .or_else(|| trimmed.strip_prefix("0X"))
        {
            Some(digits) => Self::parse_hex(digits, s),
            None => Self::parse_decimal(trimmed),
        }
    }
}

impl fmt::Display for Felt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let encoded = hex::encode(self.0);
        let trimmed = encoded.trim_start_matches('0');
        if trimmed.is_empty() {
            write!(f, "0x0")
        } else {
            write!(f, "0x{trimmed}")
        }
    }
}

impl fmt::Debug for Felt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Felt({self})")
    }
}

impl Serialize for Felt {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

struct FeltVisitor;

impl<'de> Visitor<'de> for FeltVisitor {
    type Value = Felt;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a felt as a non-negative integer or a hex/decimal string")
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<Felt, E> {
        Ok(Felt::from(v))
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<Felt, E> {
        u64::try_from(v)
            .map(Felt::from)
            .map_err(|_| E::custom(format!("negative felt: {v}")))
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<Felt, E> {
        v.parse().map_err(E::custom)
    }
}

impl<'de> Deserialize<'de> for Felt {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(FeltVisitor)
    }
}

/// Canonical entity identifier derived from an ordered key sequence.
///
/// The derivation hashes a domain tag, the key count and every fixed-width key
/// with blake3, so two different key sequences never map to the same id.
///
/// # Examples
///
/// ```
/// use realmsync::EntityId;
///
/// let a = EntityId::from_ids(&[1, 2]);
/// let b = EntityId::from_ids(&[2, 1]);
/// assert_ne!(a, b);
/// assert_eq!(a, EntityId::from_ids(&[1, 2]));
/// ```
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct EntityId([u8; 32]);

impl EntityId {
    /// Derives the id of the entity addressed by `keys`.
    #[must_use]
    pub fn from_keys(keys: &[EntityKey]) -> Self {
        let mut hasher = blake3::Hasher::new();
        hasher.update(ENTITY_ID_DOMAIN);
        hasher.update(&(keys.len() as u64).to_be_bytes());
        for key in keys {
            hasher.update(&key.to_bytes_be());
        }
        Self(*hasher.finalize().as_bytes())
    }

    /// Derives the id of an entity whose keys all fit in `u64`.
    #[must_use]
    pub fn from_ids(ids: &[u64]) -> Self {
        let keys: Vec<EntityKey> = ids.iter().copied().map(Felt::from).collect();
        Self::from_keys(&keys)
    }

    /// Returns the raw id bytes.
    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl fmt::Debug for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Short form keeps store dumps readable.
        write!(f, "EntityId(0x{}..)", hex::encode(&self.0[..6]))
    }
}

impl FromStr for EntityId {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let digits = s
            .strip_prefix("0x")
            .ok_or_else(|| invalid_key(s, "entity ids are 0x-prefixed"))?;
        if digits.len() != 64 {
            return Err(invalid_key(s, "entity ids have 64 hex digits"));
        }
        let mut bytes = [0u8; 32];
        hex::decode_to_slice(digits, &mut bytes).map_err(|e| invalid_key(s, &e.to_string()))?;
        Ok(Self(bytes))
    }
}

impl Serialize for EntityId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for EntityId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(de::Error::custom)
    }
}

/// Parses wire-format keys (`0x` hex or decimal strings).
pub fn parse_keys<S: AsRef<str>>(raw: &[S]) -> Result<Vec<EntityKey>, ValidationError> {
    raw.iter().map(|k| k.as_ref().parse()).collect()
}
