#![forbid(unsafe_code)]

//! Change-event vocabulary shared by registries, collections and bindings.

use web_time::SystemTime;

use crate::entity::EntityRef;
use crate::id::EntityId;

/// What happened to an entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChangeKind {
    Insert,
    Update,
    Delete,
}

impl ChangeKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Insert => "insert",
            Self::Update => "update",
            Self::Delete => "delete",
        }
    }
}

impl core::fmt::Display for ChangeKind {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single registry notification.
#[derive(Debug, Clone)]
pub struct ChangeEvent {
    pub kind: ChangeKind,
    pub entity: EntityRef,
    /// The changed property, for updates.
    pub property: Option<String>,
    /// Position of the entity in the registry container: after insertion for
    /// inserts and updates, before removal for deletes.
    pub index: Option<usize>,
    pub timestamp: SystemTime,
}

impl ChangeEvent {
    #[must_use]
    pub fn insert(entity: EntityRef, index: usize) -> Self {
        Self::new(ChangeKind::Insert, entity, None, Some(index))
    }

    /// Stamped with the entity's own update time.
    #[must_use]
    pub fn update(entity: EntityRef, property: impl Into<String>, index: usize) -> Self {
        let updated = entity.updated_at();
        Self {
            timestamp: updated,
            ..Self::new(
                ChangeKind::Update,
                entity,
                Some(property.into()),
                Some(index),
            )
        }
    }

    #[must_use]
    pub fn delete(entity: EntityRef, index: usize) -> Self {
        Self::new(ChangeKind::Delete, entity, None, Some(index))
    }

    fn new(
        kind: ChangeKind,
        entity: EntityRef,
        property: Option<String>,
        index: Option<usize>,
    ) -> Self {
        Self {
            kind,
            entity,
            property,
            index,
            timestamp: SystemTime::now(),
        }
    }

    #[must_use]
    pub fn entity_id(&self) -> EntityId {
        self.entity.id()
    }

    #[must_use]
    pub fn entity_type(&self) -> &'static str {
        self.entity.entity_type()
    }

    /// Whether this is an update of `property` on the entity `id`.
    #[must_use]
    pub fn is_update_of(&self, id: EntityId, property: &str) -> bool {
        self.kind == ChangeKind::Update
            && self.entity_id() == id
            && self.property.as_deref() == Some(property)
    }
}
