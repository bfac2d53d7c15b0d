#![forbid(unsafe_code)]

//! Stable entity identifiers.

use core::fmt;
use core::str::FromStr;

use uuid::Uuid;

use crate::error::Error;

/// Unique identifier assigned to an entity once, at creation.
///
/// Identifiers are random (v4) UUIDs, so they stay unique across registries
/// for the lifetime of the process and survive a round trip through
/// [`EntityRecord`](crate::record::EntityRecord).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
pub struct EntityId(Uuid);

impl EntityId {
    /// Generate a fresh identifier.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Wrap an existing UUID.
    #[inline]
    #[must_use]
    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// The underlying UUID.
    #[inline]
    #[must_use]
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for EntityId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0.hyphenated(), f)
    }
}

impl FromStr for EntityId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s.trim())
            .map(Self)
            .map_err(|_| Error::InvalidIdentifier(s.to_owned()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_ids_are_distinct() {
        assert_ne!(EntityId::new(), EntityId::new());
    }

    #[test]
    fn display_parses_back() {
        let id = EntityId::new();
        let parsed: EntityId = id.to_string().parse().unwrap();
        assert_eq!(parsed, id);
    }

    #[test]
    fn garbage_is_rejected() {
        let err = "not-an-id".parse::<EntityId>().unwrap_err();
        assert_eq!(err, Error::InvalidIdentifier("not-an-id".into()));
    }
}
