#![forbid(unsafe_code)]

//! Serialization boundary.
//!
//! tether does not marshal JSON itself. It hands a serialization collaborator
//! an [`EntityRecord`] (type, identifier, timestamps and the schema's
//! properties as [`Value`]s) and rebuilds entities from one with
//! [`instantiate`]. With the `serde` feature the record derives
//! `Serialize`/`Deserialize`.

use std::collections::BTreeMap;
use std::time::Duration;

use web_time::{SystemTime, UNIX_EPOCH};

use crate::entity::Entity;
use crate::error::{Error, Result};
use crate::id::EntityId;
use crate::schema::Model;
use crate::value::Value;

/// Structured snapshot of one entity.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct EntityRecord {
    pub entity_type: String,
    pub id: EntityId,
    /// Creation time, milliseconds since the Unix epoch.
    pub created_ms: u64,
    /// Last update time, milliseconds since the Unix epoch.
    pub updated_ms: u64,
    pub properties: BTreeMap<String, Value>,
}

impl EntityRecord {
    /// A record for a brand-new entity of `entity_type`.
    #[must_use]
    pub fn new(entity_type: impl Into<String>) -> Self {
        Self {
            entity_type: entity_type.into(),
            id: EntityId::new(),
            created_ms: 0,
            updated_ms: 0,
            properties: BTreeMap::new(),
        }
    }

    /// Builder-style property insertion.
    #[must_use]
    pub fn with(mut self, property: impl Into<String>, value: impl Into<Value>) -> Self {
        self.properties.insert(property.into(), value.into());
        self
    }
}

fn from_millis(ms: u64) -> SystemTime {
    if ms == 0 {
        SystemTime::now()
    } else {
        UNIX_EPOCH + Duration::from_millis(ms)
    }
}

/// Rebuild a typed entity from a record.
///
/// The model value comes from the schema factory; each recorded property is
/// written through its setter (with coercion). Properties the schema does not
/// know, and read-only ones, are skipped. A zero timestamp means "now".
pub fn instantiate<T: Model>(record: &EntityRecord) -> Result<Entity<T>> {
    let schema = T::schema();
    if record.entity_type != schema.type_name() {
        return Err(Error::WrongType {
            expected: schema.type_name(),
            found: record.entity_type.clone(),
        });
    }
    let mut value = schema
        .instantiate()
        .ok_or(Error::MissingFactory(schema.type_name()))?;
    for (name, v) in &record.properties {
        match schema.property_named(name) {
            Some(p) if p.is_writable() => schema.set(&mut value, name, v.clone())?,
            _ => {}
        }
    }
    Ok(Entity::restore(
        record.id,
        from_millis(record.created_ms),
        from_millis(record.updated_ms),
        value,
    ))
}
