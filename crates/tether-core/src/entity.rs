#![forbid(unsafe_code)]

//! Managed entity handles.
//!
//! An [`Entity<T>`] is a shared, single-threaded handle to a model value plus
//! its metadata (identifier, creation and update timestamps). [`EntityRef`]
//! is the type-erased form held by registries, collections and bindings.
//!
//! # Architecture
//!
//! Handles wrap `Rc<EntityCell<T>>`. The cell keeps a weak, non-owning link to
//! the [`Registrar`] that currently manages it; the link is set on
//! registration and cleared on deregistration. Writes go through the schema
//! setter, refresh the update timestamp and then, if the link is alive,
//! report the change to the registrar. Unregistered entities mutate silently.
//!
//! # Invariants
//!
//! 1. The identifier and creation timestamp never change.
//! 2. No `RefCell` borrow of the model value is held while the registrar is
//!    notified, so observers may read the entity from inside their handler.
//! 3. `set` with a value equal to the current one is a no-op: no timestamp
//!    refresh, no notification.

use core::fmt;
use std::any::Any;
use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

use web_time::{SystemTime, UNIX_EPOCH};

use crate::error::{Error, Result};
use crate::id::EntityId;
use crate::record::EntityRecord;
use crate::schema::{Model, SchemaDescription};
use crate::value::Value;

/// The owner an entity reports its property changes to.
///
/// Implemented by the runtime's registry; entities hold it weakly.
pub trait Registrar {
    /// Called after a tracked property of the entity `id` changed.
    fn notify_property_changed(&self, id: EntityId, property: &str) -> Result<()>;
}

/// Milliseconds since the Unix epoch; times before the epoch clamp to zero.
#[must_use]
pub fn unix_millis(time: SystemTime) -> u64 {
    time.duration_since(UNIX_EPOCH)
        .map(|d| u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
        .unwrap_or_default()
}

struct Metadata {
    id: EntityId,
    created: SystemTime,
    updated: Cell<SystemTime>,
}

struct EntityCell<T> {
    meta: Metadata,
    data: RefCell<T>,
    registrar: RefCell<Option<Weak<dyn Registrar>>>,
}

impl<T: Model> EntityCell<T> {
    fn metadata_value(&self, property: &str) -> Option<Value> {
        match property {
            "id" => Some(Value::Ref(self.meta.id)),
            "created_at" => Some(Value::Int(millis_value(self.meta.created))),
            "updated_at" => Some(Value::Int(millis_value(self.meta.updated.get()))),
            _ => None,
        }
    }

    fn refresh_updated(&self) {
        let now = SystemTime::now();
        // Keep the timestamp monotonic even if the wall clock steps back.
        if now > self.meta.updated.get() {
            self.meta.updated.set(now);
        }
    }

    fn live_registrar(&self) -> Option<Rc<dyn Registrar>> {
        self.registrar.borrow().as_ref().and_then(Weak::upgrade)
    }

    fn report(&self, property: &str) -> Result<()> {
        self.refresh_updated();
        match self.live_registrar() {
            Some(registrar) => registrar.notify_property_changed(self.meta.id, property),
            None => Ok(()),
        }
    }
}

fn millis_value(time: SystemTime) -> i64 {
    i64::try_from(unix_millis(time)).unwrap_or(i64::MAX)
}

/// Object-safe view of an entity of any model type.
///
/// Registries and collections only ever see this trait; use
/// [`EntityRef::downcast`] to get the typed handle back.
pub trait AnyEntity {
    fn id(&self) -> EntityId;
    fn entity_type(&self) -> &'static str;
    fn created_at(&self) -> SystemTime;
    fn updated_at(&self) -> SystemTime;
    fn describe(&self) -> SchemaDescription;
    /// Read a schema or metadata property.
    fn get(&self, property: &str) -> Result<Value>;
    /// Write a schema property and report the change.
    fn set(&self, property: &str, value: Value) -> Result<()>;
    /// Refresh the update timestamp without writing anything.
    fn touch(&self);
    /// The registrar currently managing the entity, if it is still alive.
    fn registrar(&self) -> Option<Rc<dyn Registrar>>;
    /// Link the entity to its managing registrar. Registry plumbing.
    fn attach(&self, registrar: Weak<dyn Registrar>);
    /// Clear the registrar link. Registry plumbing.
    fn detach(&self);
    fn to_record(&self) -> EntityRecord;
    fn into_any(self: Rc<Self>) -> Rc<dyn Any>;
}

impl<T: Model> AnyEntity for EntityCell<T> {
    fn id(&self) -> EntityId {
        self.meta.id
    }

    fn entity_type(&self) -> &'static str {
        T::schema().type_name()
    }

    fn created_at(&self) -> SystemTime {
        self.meta.created
    }

    fn updated_at(&self) -> SystemTime {
        self.meta.updated.get()
    }

    fn describe(&self) -> SchemaDescription {
        T::schema().describe()
    }

    fn get(&self, property: &str) -> Result<Value> {
        if let Some(value) = self.metadata_value(property) {
            return Ok(value);
        }
        T::schema().get(&self.data.borrow(), property)
    }

    fn set(&self, property: &str, value: Value) -> Result<()> {
        let schema = T::schema();
        {
            let mut data = self.data.borrow_mut();
            let current = schema.get(&data, property)?;
            let value = match schema.property_named(property) {
                Some(p) => value.coerce(p.semantic_type())?,
                None => value,
            };
            if current == value {
                return Ok(());
            }
            schema.set(&mut data, property, value)?;
        }
        self.report(property)
    }

    fn touch(&self) {
        self.refresh_updated();
    }

    fn registrar(&self) -> Option<Rc<dyn Registrar>> {
        self.live_registrar()
    }

    fn attach(&self, registrar: Weak<dyn Registrar>) {
        *self.registrar.borrow_mut() = Some(registrar);
    }

    fn detach(&self) {
        self.registrar.borrow_mut().take();
    }

    fn to_record(&self) -> EntityRecord {
        let schema = T::schema();
        let data = self.data.borrow();
        EntityRecord {
            entity_type: schema.type_name().to_owned(),
            id: self.meta.id,
            created_ms: unix_millis(self.meta.created),
            updated_ms: unix_millis(self.meta.updated.get()),
            properties: schema
                .properties()
                .iter()
                .filter_map(|p| {
                    schema
                        .get(&data, p.name())
                        .ok()
                        .map(|v| (p.name().to_owned(), v))
                })
                .collect(),
        }
    }

    fn into_any(self: Rc<Self>) -> Rc<dyn Any> {
        self
    }
}

/// Typed handle to a managed entity.
///
/// Cloning a handle shares the same entity.
pub struct Entity<T: Model> {
    cell: Rc<EntityCell<T>>,
}

impl<T: Model> Clone for Entity<T> {
    fn clone(&self) -> Self {
        Self {
            cell: Rc::clone(&self.cell),
        }
    }
}

impl<T: Model> Entity<T> {
    /// Wrap a model value with a fresh identifier.
    pub fn new(value: T) -> Self {
        Self::with_id(EntityId::new(), value)
    }

    /// Wrap a model value with a caller-supplied identifier.
    pub fn with_id(id: EntityId, value: T) -> Self {
        let now = SystemTime::now();
        Self::restore(id, now, now, value)
    }

    pub(crate) fn restore(id: EntityId, created: SystemTime, updated: SystemTime, value: T) -> Self {
        Self {
            cell: Rc::new(EntityCell {
                meta: Metadata {
                    id,
                    created,
                    updated: Cell::new(updated.max(created)),
                },
                data: RefCell::new(value),
                registrar: RefCell::new(None),
            }),
        }
    }

    #[must_use]
    pub fn id(&self) -> EntityId {
        self.cell.meta.id
    }

    #[must_use]
    pub fn created_at(&self) -> SystemTime {
        self.cell.meta.created
    }

    #[must_use]
    pub fn updated_at(&self) -> SystemTime {
        self.cell.meta.updated.get()
    }

    /// Borrow the model value.
    ///
    /// # Panics
    ///
    /// Panics if called from inside [`Entity::mutate`] on the same entity.
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        f(&self.cell.data.borrow())
    }

    /// Read a schema or metadata property.
    pub fn get(&self, property: &str) -> Result<Value> {
        AnyEntity::get(&*self.cell, property)
    }

    /// Write a property through the schema setter (with coercion).
    pub fn set(&self, property: &str, value: impl Into<Value>) -> Result<()> {
        AnyEntity::set(&*self.cell, property, value.into())
    }

    /// Mutate the model value directly and report `property` as changed.
    ///
    /// Unlike [`Entity::set`] the change is always reported, since the
    /// closure's effect is opaque.
    pub fn mutate<R>(&self, property: &str, f: impl FnOnce(&mut T) -> R) -> Result<R> {
        if T::schema().property_named(property).is_none() {
            return Err(Error::InvalidPropertyPath {
                entity_type: T::schema().type_name(),
                path: property.to_owned(),
            });
        }
        let out = f(&mut self.cell.data.borrow_mut());
        self.cell.report(property)?;
        Ok(out)
    }

    /// Whether a live registry currently manages the entity.
    #[must_use]
    pub fn is_registered(&self) -> bool {
        self.cell.live_registrar().is_some()
    }

    /// Type-erased handle to the same entity.
    #[must_use]
    pub fn erase(&self) -> EntityRef {
        EntityRef(Rc::clone(&self.cell) as Rc<dyn AnyEntity>)
    }

    /// Snapshot for a serialization collaborator.
    #[must_use]
    pub fn to_record(&self) -> EntityRecord {
        self.cell.to_record()
    }
}

impl<T: Model> fmt::Debug for Entity<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Entity")
            .field("type", &T::schema().type_name())
            .field("id", &self.cell.meta.id)
            .finish()
    }
}

impl<T: Model> PartialEq for Entity<T> {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.cell, &other.cell)
    }
}

impl<T: Model> From<Entity<T>> for EntityRef {
    fn from(entity: Entity<T>) -> Self {
        entity.erase()
    }
}

impl<T: Model> From<&Entity<T>> for EntityRef {
    fn from(entity: &Entity<T>) -> Self {
        entity.erase()
    }
}

impl<T: Model> From<&Entity<T>> for Value {
    fn from(entity: &Entity<T>) -> Self {
        Value::Ref(entity.id())
    }
}

/// Type-erased shared handle to an entity.
///
/// Equality is instance identity, not identifier equality.
#[derive(Clone)]
pub struct EntityRef(Rc<dyn AnyEntity>);

impl EntityRef {
    #[must_use]
    pub fn id(&self) -> EntityId {
        self.0.id()
    }

    #[must_use]
    pub fn entity_type(&self) -> &'static str {
        self.0.entity_type()
    }

    #[must_use]
    pub fn created_at(&self) -> SystemTime {
        self.0.created_at()
    }

    #[must_use]
    pub fn updated_at(&self) -> SystemTime {
        self.0.updated_at()
    }

    #[must_use]
    pub fn describe(&self) -> SchemaDescription {
        self.0.describe()
    }

    pub fn get(&self, property: &str) -> Result<Value> {
        self.0.get(property)
    }

    pub fn set(&self, property: &str, value: impl Into<Value>) -> Result<()> {
        self.0.set(property, value.into())
    }

    pub fn touch(&self) {
        self.0.touch();
    }

    #[must_use]
    pub fn is_registered(&self) -> bool {
        self.0.registrar().is_some()
    }

    #[must_use]
    pub fn registrar(&self) -> Option<Rc<dyn Registrar>> {
        self.0.registrar()
    }

    pub fn attach(&self, registrar: Weak<dyn Registrar>) {
        self.0.attach(registrar);
    }

    pub fn detach(&self) {
        self.0.detach();
    }

    #[must_use]
    pub fn to_record(&self) -> EntityRecord {
        self.0.to_record()
    }

    /// Whether both handles point at the same instance.
    #[must_use]
    pub fn same_instance(&self, other: &EntityRef) -> bool {
        self.addr() == other.addr()
    }

    /// Address of the shared instance, usable as an identity key.
    #[must_use]
    pub fn addr(&self) -> usize {
        Rc::as_ptr(&self.0).cast::<()>() as usize
    }

    /// Recover the typed handle.
    #[must_use]
    pub fn downcast<T: Model>(&self) -> Option<Entity<T>> {
        Rc::clone(&self.0)
            .into_any()
            .downcast::<EntityCell<T>>()
            .ok()
            .map(|cell| Entity { cell })
    }

    /// Like [`EntityRef::downcast`], failing with [`Error::WrongType`].
    pub fn try_downcast<T: Model>(&self) -> Result<Entity<T>> {
        self.downcast().ok_or_else(|| Error::WrongType {
            expected: T::schema().type_name(),
            found: self.entity_type().to_owned(),
        })
    }
}

impl PartialEq for EntityRef {
    fn eq(&self, other: &Self) -> bool {
        self.same_instance(other)
    }
}

impl Eq for EntityRef {}

impl fmt::Debug for EntityRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EntityRef")
            .field("type", &self.entity_type())
            .field("id", &self.id())
            .finish()
    }
}

impl From<&EntityRef> for Value {
    fn from(entity: &EntityRef) -> Self {
        Value::Ref(entity.id())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::LazyLock;

    use super::*;
    use crate::schema::Schema;
    use crate::value::SemanticType;

    #[derive(Debug, Default)]
    struct Counter {
        label: String,
        count: i64,
    }

    static COUNTER: LazyLock<Schema<Counter>> = LazyLock::new(|| {
        Schema::<Counter>::new("Counter")
            .property(
                "label",
                SemanticType::Text,
                |c| c.label.clone().into(),
                |c, v| {
                    c.label = v.try_text()?;
                    Ok(())
                },
            )
            .property(
                "count",
                SemanticType::Int,
                |c| c.count.into(),
                |c, v| {
                    c.count = v.try_int()?;
                    Ok(())
                },
            )
    });

    impl Model for Counter {
        fn schema() -> &'static Schema<Self> {
            &COUNTER
        }
    }

    #[derive(Default)]
    struct Probe {
        calls: RefCell<Vec<(EntityId, String)>>,
    }

    impl Registrar for Probe {
        fn notify_property_changed(&self, id: EntityId, property: &str) -> Result<()> {
            self.calls.borrow_mut().push((id, property.to_owned()));
            Ok(())
        }
    }

    fn attach_probe(entity: &Entity<Counter>) -> Rc<Probe> {
        let probe = Rc::new(Probe::default());
        let weak: Weak<dyn Registrar> = Rc::downgrade(&probe) as Weak<Probe>;
        entity.erase().attach(weak);
        probe
    }

    #[test]
    fn set_coerces_and_reports() {
        let e = Entity::new(Counter::default());
        let probe = attach_probe(&e);
        e.set("count", "7").unwrap();
        assert_eq!(e.with(|c| c.count), 7);
        assert_eq!(*probe.calls.borrow(), vec![(e.id(), "count".to_string())]);
    }

    #[test]
    fn equal_set_is_silent() {
        let e = Entity::new(Counter::default());
        let probe = attach_probe(&e);
        e.set("count", 0).unwrap();
        assert!(probe.calls.borrow().is_empty());
    }

    #[test]
    fn unregistered_entities_mutate_silently() {
        let e = Entity::new(Counter::default());
        assert!(!e.is_registered());
        e.set("label", "x").unwrap();
        assert_eq!(e.get("label").unwrap(), Value::from("x"));
    }

    #[test]
    fn dropped_registrar_detaches() {
        let e = Entity::new(Counter::default());
        let probe = attach_probe(&e);
        assert!(e.is_registered());
        drop(probe);
        assert!(!e.is_registered());
        e.set("count", 3).unwrap();
    }

    #[test]
    fn mutate_always_reports() {
        let e = Entity::new(Counter::default());
        let probe = attach_probe(&e);
        let before = e.updated_at();
        let out = e.mutate("count", |c| {
            c.count += 2;
            c.count
        });
        assert_eq!(out.unwrap(), 2);
        assert_eq!(probe.calls.borrow().len(), 1);
        assert!(e.updated_at() >= before);
    }

    #[test]
    fn mutate_rejects_unknown_property() {
        let e = Entity::new(Counter::default());
        assert!(matches!(
            e.mutate("nope", |_| ()),
            Err(Error::InvalidPropertyPath { .. })
        ));
    }

    #[test]
    fn metadata_is_readable() {
        let e = Entity::new(Counter::default());
        assert_eq!(e.get("id").unwrap(), Value::Ref(e.id()));
        assert!(e.get("created_at").unwrap().as_int().is_some());
    }

    #[test]
    fn downcast_round_trips_identity() {
        let e = Entity::new(Counter::default());
        let erased = e.erase();
        assert_eq!(erased.entity_type(), "Counter");
        let back: Entity<Counter> = erased.downcast().unwrap();
        assert_eq!(back, e);
        assert!(erased.same_instance(&e.erase()));
    }

    #[test]
    fn identity_differs_from_identifier() {
        let id = EntityId::new();
        let a = Entity::with_id(id, Counter::default()).erase();
        let b = Entity::with_id(id, Counter::default()).erase();
        assert_eq!(a.id(), b.id());
        assert_ne!(a, b);
    }

    #[test]
    fn record_lists_schema_properties() {
        let e = Entity::new(Counter {
            label: "a".into(),
            count: 4,
        });
        let record = e.to_record();
        assert_eq!(record.entity_type, "Counter");
        assert_eq!(record.properties.get("count"), Some(&Value::Int(4)));
        assert_eq!(record.properties.len(), 2);
    }
}
