//! Identifiers shared across crates.

use core::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize};
use thiserror::Error;

/// Identifier of an actor (authenticated admin user).
///
/// The backend assigns these and clients never interpret them, so the value is
/// kept as an opaque string. Identity payloads may carry it either as a JSON
/// string or as a JSON number; both normalize to the same textual form.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct ActorId(String);

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("invalid actor id: {0}")]
pub struct InvalidActorId(String);

impl ActorId {
    pub fn new(raw: impl Into<String>) -> Result<Self, InvalidActorId> {
        let raw = raw.into();
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(InvalidActorId("identifier is empty".to_string()));
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl core::fmt::Display for ActorId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for ActorId {
    type Err = InvalidActorId;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawActorId {
    Text(String),
    Signed(i64),
    Unsigned(u64),
}

impl<'de> Deserialize<'de> for ActorId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let text = match RawActorId::deserialize(deserializer)? {
            RawActorId::Text(s) => s,
            RawActorId::Signed(n) => n.to_string(),
            RawActorId::Unsigned(n) => n.to_string(),
        };
        ActorId::new(text).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numeric_and_string_ids_normalize_to_text() {
        let from_number: ActorId = serde_json::from_str("42").unwrap();
        let from_string: ActorId = serde_json::from_str("\"42\"").unwrap();
        assert_eq!(from_number, from_string);
        assert_eq!(from_number.as_str(), "42");
    }

    #[test]
    fn blank_id_is_rejected() {
        assert!(ActorId::new("   ").is_err());
        assert!(serde_json::from_str::<ActorId>("\"\"").is_err());
    }

    #[test]
    fn serializes_as_plain_string() {
        let id: ActorId = "usr_01".parse().unwrap();
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"usr_01\"");
    }
}
