#![forbid(unsafe_code)]

//! Per-type object registries.
//!
//! A [`Registry`] owns the authoritative, insertion-ordered list of live
//! entities of one model type and fans out a [`ChangeEvent`] to its observers
//! on every insert, update and delete.
//!
//! # Architecture
//!
//! Entries live in an `IndexMap` keyed by identifier, so lookups are O(1) and
//! enumeration follows registration order. Observers are held as `Weak`
//! trait objects and pruned lazily during fanout, the same scheme
//! [`Observable`](crate::reactive::Observable) uses for callbacks. Each
//! registered entity keeps a weak link back to the registry (as its
//! [`Registrar`]) so its own writes are reported here.
//!
//! # Invariants
//!
//! 1. Every entry is of the registry's type; identifiers are unique.
//! 2. Events are emitted strictly after the container reaches its new state.
//! 3. Observers are notified in subscription order; subscribing twice is a
//!    no-op.
//! 4. Sequence numbers increase monotonically and are never reused.
//!
//! # Failure Modes
//!
//! | Condition | Result |
//! |-----------|--------|
//! | Same id, different instance | `DuplicateRegistration`, registry unchanged |
//! | Entity managed by another live registry | `AlreadyManaged` |
//! | Observer returns `Err` | Remaining fanout aborted, error returned to the mutating caller |

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};

use indexmap::IndexMap;
use tether_core::{
    ChangeEvent, Entity, EntityId, EntityRef, Error, Model, Registrar, Result, SchemaDescription,
};
use tracing::{debug, trace, warn};

use crate::reactive::Subscription;

/// Receives every change a registry emits.
pub trait RegistryObserver {
    fn on_change(&self, registry: &Registry, event: &ChangeEvent) -> Result<()>;
}

struct FnObserver<F>(F);

impl<F> RegistryObserver for FnObserver<F>
where
    F: Fn(&Registry, &ChangeEvent) -> Result<()>,
{
    fn on_change(&self, registry: &Registry, event: &ChangeEvent) -> Result<()> {
        (self.0)(registry, event)
    }
}

struct Slot {
    seq: u64,
    entity: EntityRef,
}

struct RegistryShared {
    description: SchemaDescription,
    entries: RefCell<IndexMap<EntityId, Slot, ahash::RandomState>>,
    observers: RefCell<Vec<Weak<dyn RegistryObserver>>>,
    next_seq: Cell<u64>,
    this: Weak<RegistryShared>,
}

impl Registrar for RegistryShared {
    fn notify_property_changed(&self, id: EntityId, property: &str) -> Result<()> {
        let Some(shared) = self.this.upgrade() else {
            return Ok(());
        };
        let registry = Registry { shared };
        match registry.get(id) {
            // The entity already refreshed its own timestamp.
            Some(entity) => registry.emit_update(&entity, property),
            None => Ok(()),
        }
    }
}

/// Handle to the store of one model type. Clones share the same registry.
#[derive(Clone)]
pub struct Registry {
    shared: Rc<RegistryShared>,
}

impl Registry {
    /// Empty registry for entities described by `description`.
    #[must_use]
    pub fn new(description: SchemaDescription) -> Self {
        let shared = Rc::new_cyclic(|this| RegistryShared {
            description,
            entries: RefCell::new(IndexMap::default()),
            observers: RefCell::new(Vec::new()),
            next_seq: Cell::new(0),
            this: this.clone(),
        });
        Self { shared }
    }

    /// Empty registry for the model type `T`.
    #[must_use]
    pub fn for_type<T: Model>() -> Self {
        Self::new(T::schema().describe())
    }

    #[must_use]
    pub fn entity_type(&self) -> &'static str {
        self.shared.description.type_name()
    }

    #[must_use]
    pub fn description(&self) -> &SchemaDescription {
        &self.shared.description
    }

    // -----------------------------------------------------------------------
    // Mutation
    // -----------------------------------------------------------------------

    /// Add an entity and emit `insert`.
    ///
    /// Registering the same instance again is a silent no-op.
    pub fn register(&self, entity: impl Into<EntityRef>) -> Result<()> {
        let entity = entity.into();
        let entity_type = self.entity_type();
        if entity.entity_type() != entity_type {
            return Err(Error::WrongType {
                expected: entity_type,
                found: entity.entity_type().to_owned(),
            });
        }
        let id = entity.id();
        let index = {
            let mut entries = self.shared.entries.borrow_mut();
            if let Some(slot) = entries.get(&id) {
                if slot.entity.same_instance(&entity) {
                    return Ok(());
                }
                return Err(Error::DuplicateRegistration { entity_type, id });
            }
            if let Some(owner) = entity.registrar()
                && !self.is_registrar(&owner)
            {
                return Err(Error::AlreadyManaged { entity_type, id });
            }
            let seq = self.shared.next_seq.get();
            self.shared.next_seq.set(seq + 1);
            entries.insert(
                id,
                Slot {
                    seq,
                    entity: entity.clone(),
                },
            );
            entries.len() - 1
        };
        let registrar: Weak<dyn Registrar> = self.shared.this.clone();
        entity.attach(registrar);
        debug!(target: "tether::registry", entity_type, %id, index, "registered");
        self.emit(ChangeEvent::insert(entity, index))
    }

    /// Remove an entity by identifier and emit `delete`. Absent entities are
    /// ignored.
    pub fn deregister(&self, entity: impl Into<EntityRef>) -> Result<()> {
        self.deregister_id(entity.into().id())
    }

    /// [`Registry::deregister`] by identifier.
    pub fn deregister_id(&self, id: EntityId) -> Result<()> {
        let removed = self.shared.entries.borrow_mut().shift_remove_full(&id);
        let Some((index, _, slot)) = removed else {
            return Ok(());
        };
        slot.entity.detach();
        debug!(target: "tether::registry", entity_type = self.entity_type(), %id, index, "deregistered");
        self.emit(ChangeEvent::delete(slot.entity, index))
    }

    /// Deregister everything, last entry first.
    pub fn clear(&self) -> Result<()> {
        let ids: Vec<EntityId> = self.shared.entries.borrow().keys().copied().collect();
        for id in ids.into_iter().rev() {
            self.deregister_id(id)?;
        }
        Ok(())
    }

    /// Refresh the entity's update timestamp and emit `update` for
    /// `property`. Entities this registry does not manage change silently.
    pub fn notify_property_changed(&self, entity: &EntityRef, property: &str) -> Result<()> {
        entity.touch();
        self.emit_update(entity, property)
    }

    fn emit_update(&self, entity: &EntityRef, property: &str) -> Result<()> {
        let index = {
            let entries = self.shared.entries.borrow();
            match entries.get_full(&entity.id()) {
                Some((index, _, slot)) if slot.entity.same_instance(entity) => index,
                _ => return Ok(()),
            }
        };
        self.emit(ChangeEvent::update(entity.clone(), property, index))
    }

    // -----------------------------------------------------------------------
    // Observers
    // -----------------------------------------------------------------------

    /// Subscribe an observer. The registry holds it weakly; keep the `Rc`
    /// alive for as long as notifications are wanted.
    pub fn subscribe<O: RegistryObserver + 'static>(&self, observer: &Rc<O>) {
        let key = Rc::as_ptr(observer).cast::<()>();
        let mut observers = self.shared.observers.borrow_mut();
        if observers.iter().any(|w| w.as_ptr().cast::<()>() == key) {
            return;
        }
        let weak: Weak<dyn RegistryObserver> = Rc::downgrade(observer) as Weak<O>;
        observers.push(weak);
    }

    /// Remove an observer. Unknown observers are ignored.
    pub fn unsubscribe<O: RegistryObserver + 'static>(&self, observer: &Rc<O>) {
        let key = Rc::as_ptr(observer).cast::<()>();
        self.shared
            .observers
            .borrow_mut()
            .retain(|w| w.as_ptr().cast::<()>() != key);
    }

    /// Observe with a closure for as long as the returned guard lives.
    pub fn observe(
        &self,
        f: impl Fn(&Registry, &ChangeEvent) -> Result<()> + 'static,
    ) -> Subscription {
        let observer = Rc::new(FnObserver(f));
        self.subscribe(&observer);
        Subscription::new(observer)
    }

    /// Number of live observers.
    #[must_use]
    pub fn observer_count(&self) -> usize {
        self.shared
            .observers
            .borrow()
            .iter()
            .filter(|w| w.strong_count() > 0)
            .count()
    }

    fn emit(&self, event: ChangeEvent) -> Result<()> {
        let observers: Vec<Rc<dyn RegistryObserver>> = {
            let mut list = self.shared.observers.borrow_mut();
            list.retain(|w| w.strong_count() > 0);
            list.iter().filter_map(Weak::upgrade).collect()
        };
        trace!(
            target: "tether::registry",
            entity_type = self.entity_type(),
            kind = %event.kind,
            property = event.property.as_deref(),
            index = event.index,
            observers = observers.len(),
            "fanout"
        );
        for (delivered, observer) in observers.iter().enumerate() {
            if let Err(err) = observer.on_change(self, &event) {
                warn!(
                    target: "tether::registry",
                    entity_type = self.entity_type(),
                    delivered,
                    error = %err,
                    "observer aborted change fanout"
                );
                return Err(err);
            }
        }
        Ok(())
    }

    fn is_registrar(&self, owner: &Rc<dyn Registrar>) -> bool {
        Rc::as_ptr(owner).cast::<()>() == Rc::as_ptr(&self.shared).cast::<()>()
    }

    // -----------------------------------------------------------------------
    // Queries
    // -----------------------------------------------------------------------

    /// Snapshot of the registered entities in insertion order.
    #[must_use]
    pub fn objects(&self) -> Vec<EntityRef> {
        self.shared
            .entries
            .borrow()
            .values()
            .map(|slot| slot.entity.clone())
            .collect()
    }

    /// Snapshot of `(sequence number, entity)` pairs in insertion order.
    #[must_use]
    pub fn entries(&self) -> Vec<(u64, EntityRef)> {
        self.shared
            .entries
            .borrow()
            .values()
            .map(|slot| (slot.seq, slot.entity.clone()))
            .collect()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.shared.entries.borrow().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.shared.entries.borrow().is_empty()
    }

    #[must_use]
    pub fn contains(&self, id: EntityId) -> bool {
        self.shared.entries.borrow().contains_key(&id)
    }

    #[must_use]
    pub fn get(&self, id: EntityId) -> Option<EntityRef> {
        self.shared
            .entries
            .borrow()
            .get(&id)
            .map(|slot| slot.entity.clone())
    }

    /// Like [`Registry::get`], failing with [`Error::NotFound`].
    pub fn find_by_identifier(&self, id: EntityId) -> Result<EntityRef> {
        self.get(id).ok_or(Error::NotFound {
            entity_type: self.entity_type(),
            id,
        })
    }

    /// Typed lookup.
    pub fn find<T: Model>(&self, id: EntityId) -> Result<Entity<T>> {
        self.find_by_identifier(id)?.try_downcast()
    }

    /// Position in insertion order.
    #[must_use]
    pub fn position_of(&self, id: EntityId) -> Option<usize> {
        self.shared.entries.borrow().get_index_of(&id)
    }

    #[must_use]
    pub fn sequence_of(&self, id: EntityId) -> Option<u64> {
        self.shared.entries.borrow().get(&id).map(|slot| slot.seq)
    }

    /// Whether both handles refer to the same registry.
    #[must_use]
    pub fn same(&self, other: &Registry) -> bool {
        Rc::ptr_eq(&self.shared, &other.shared)
    }
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registry")
            .field("entity_type", &self.entity_type())
            .field("len", &self.len())
            .field("observers", &self.observer_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::LazyLock;

    use tether_core::{ChangeKind, Schema, SemanticType, Value};

    use super::*;

    #[derive(Default)]
    struct Item {
        name: String,
    }

    static ITEM: LazyLock<Schema<Item>> = LazyLock::new(|| {
        Schema::<Item>::new("Item").property(
            "name",
            SemanticType::Text,
            |i| i.name.clone().into(),
            |i, v| {
                i.name = v.try_text()?;
                Ok(())
            },
        )
    });

    impl Model for Item {
        fn schema() -> &'static Schema<Self> {
            &ITEM
        }
    }

    fn item(name: &str) -> Entity<Item> {
        Entity::new(Item { name: name.into() })
    }

    #[derive(Default)]
    struct Recorder {
        events: RefCell<Vec<(ChangeKind, Option<String>, Option<usize>, usize)>>,
    }

    impl RegistryObserver for Recorder {
        fn on_change(&self, registry: &Registry, event: &ChangeEvent) -> Result<()> {
            self.events.borrow_mut().push((
                event.kind,
                event.property.clone(),
                event.index,
                registry.len(),
            ));
            Ok(())
        }
    }

    #[test]
    fn register_emits_insert_after_container_update() {
        let registry = Registry::for_type::<Item>();
        let recorder = Rc::new(Recorder::default());
        registry.subscribe(&recorder);
        registry.register(&item("a")).unwrap();
        assert_eq!(
            *recorder.events.borrow(),
            vec![(ChangeKind::Insert, None, Some(0), 1)]
        );
    }

    #[test]
    fn register_is_idempotent_per_instance() {
        let registry = Registry::for_type::<Item>();
        let recorder = Rc::new(Recorder::default());
        registry.subscribe(&recorder);
        let a = item("a");
        registry.register(&a).unwrap();
        registry.register(&a).unwrap();
        assert_eq!(registry.len(), 1);
        assert_eq!(recorder.events.borrow().len(), 1);
    }

    #[test]
    fn same_identifier_other_instance_is_duplicate() {
        let registry = Registry::for_type::<Item>();
        let a = item("a");
        registry.register(&a).unwrap();
        let twin = Entity::with_id(a.id(), Item::default());
        let err = registry.register(&twin).unwrap_err();
        assert_eq!(
            err,
            Error::DuplicateRegistration {
                entity_type: "Item",
                id: a.id()
            }
        );
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn deregister_absent_is_noop() {
        let registry = Registry::for_type::<Item>();
        let recorder = Rc::new(Recorder::default());
        registry.subscribe(&recorder);
        registry.deregister(&item("ghost")).unwrap();
        assert!(recorder.events.borrow().is_empty());
    }

    #[test]
    fn deregister_reports_old_index() {
        let registry = Registry::for_type::<Item>();
        let a = item("a");
        let b = item("b");
        registry.register(&a).unwrap();
        registry.register(&b).unwrap();
        let recorder = Rc::new(Recorder::default());
        registry.subscribe(&recorder);
        registry.deregister(&a).unwrap();
        assert_eq!(
            *recorder.events.borrow(),
            vec![(ChangeKind::Delete, None, Some(0), 1)]
        );
        assert!(!a.is_registered());
        assert_eq!(registry.position_of(b.id()), Some(0));
    }

    #[test]
    fn entity_writes_route_through_registry() {
        let registry = Registry::for_type::<Item>();
        let a = item("a");
        registry.register(&a).unwrap();
        let recorder = Rc::new(Recorder::default());
        registry.subscribe(&recorder);
        a.set("name", "renamed").unwrap();
        assert_eq!(
            *recorder.events.borrow(),
            vec![(ChangeKind::Update, Some("name".into()), Some(0), 1)]
        );
    }

    #[test]
    fn unregistered_entity_changes_silently() {
        let registry = Registry::for_type::<Item>();
        let recorder = Rc::new(Recorder::default());
        registry.subscribe(&recorder);
        let a = item("a");
        registry.notify_property_changed(&a.erase(), "name").unwrap();
        a.set("name", "b").unwrap();
        assert!(recorder.events.borrow().is_empty());
    }

    #[derive(Default)]
    struct Stamps {
        seen: RefCell<Vec<ChangeEvent>>,
    }

    impl RegistryObserver for Stamps {
        fn on_change(&self, _registry: &Registry, event: &ChangeEvent) -> Result<()> {
            assert_eq!(event.timestamp, event.entity.updated_at());
            self.seen.borrow_mut().push(event.clone());
            Ok(())
        }
    }

    #[test]
    fn update_carries_the_entity_write_time() {
        let registry = Registry::for_type::<Item>();
        let a = item("a");
        registry.register(&a).unwrap();
        let stamps = Rc::new(Stamps::default());
        registry.subscribe(&stamps);

        let before = a.updated_at();
        a.set("name", "renamed").unwrap();
        let written = a.updated_at();
        assert!(written >= before);
        // The event carries the timestamp of the write itself.
        assert_eq!(stamps.seen.borrow().len(), 1);
        assert_eq!(stamps.seen.borrow()[0].timestamp, written);

        registry.notify_property_changed(&a.erase(), "name").unwrap();
        assert!(a.updated_at() >= written);
        assert_eq!(stamps.seen.borrow()[1].timestamp, a.updated_at());
    }

    #[test]
    fn subscribe_twice_delivers_once() {
        let registry = Registry::for_type::<Item>();
        let recorder = Rc::new(Recorder::default());
        registry.subscribe(&recorder);
        registry.subscribe(&recorder);
        registry.register(&item("a")).unwrap();
        assert_eq!(recorder.events.borrow().len(), 1);
        registry.unsubscribe(&recorder);
        registry.unsubscribe(&recorder);
        registry.register(&item("b")).unwrap();
        assert_eq!(recorder.events.borrow().len(), 1);
    }

    #[test]
    fn failing_observer_aborts_remaining_fanout() {
        let registry = Registry::for_type::<Item>();
        let first = Rc::new(Recorder::default());
        registry.subscribe(&first);
        let _failing = registry.observe(|_, _| Err(Error::callback("nope")));
        let last = Rc::new(Recorder::default());
        registry.subscribe(&last);
        let err = registry.register(&item("a")).unwrap_err();
        assert_eq!(err, Error::callback("nope"));
        assert_eq!(first.events.borrow().len(), 1);
        assert!(last.events.borrow().is_empty());
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn dropped_observers_are_pruned() {
        let registry = Registry::for_type::<Item>();
        let sub = registry.observe(|_, _| Ok(()));
        assert_eq!(registry.observer_count(), 1);
        drop(sub);
        assert_eq!(registry.observer_count(), 0);
    }

    #[test]
    fn entity_belongs_to_one_registry() {
        let first = Registry::for_type::<Item>();
        let second = Registry::for_type::<Item>();
        let a = item("a");
        first.register(&a).unwrap();
        assert!(matches!(
            second.register(&a),
            Err(Error::AlreadyManaged { .. })
        ));
        first.deregister(&a).unwrap();
        second.register(&a).unwrap();
    }

    #[test]
    fn lookups() {
        let registry = Registry::for_type::<Item>();
        let a = item("a");
        registry.register(&a).unwrap();
        assert!(registry.contains(a.id()));
        let found: Entity<Item> = registry.find(a.id()).unwrap();
        assert_eq!(found, a);
        let missing = EntityId::new();
        assert_eq!(
            registry.find_by_identifier(missing).unwrap_err(),
            Error::NotFound {
                entity_type: "Item",
                id: missing
            }
        );
        assert_eq!(
            registry.get(a.id()).unwrap().get("name").unwrap(),
            Value::from("a")
        );
    }

    #[test]
    fn sequence_numbers_are_not_reused() {
        let registry = Registry::for_type::<Item>();
        let a = item("a");
        let b = item("b");
        registry.register(&a).unwrap();
        registry.deregister(&a).unwrap();
        registry.register(&b).unwrap();
        assert_eq!(registry.sequence_of(b.id()), Some(1));
    }

    #[test]
    fn observer_sees_consistent_container() {
        let registry = Registry::for_type::<Item>();
        let seen = Rc::new(Cell::new(usize::MAX));
        let s = Rc::clone(&seen);
        let _sub = registry.observe(move |registry, event| {
            assert!(registry.contains(event.entity_id()) == (event.kind != ChangeKind::Delete));
            s.set(registry.len());
            Ok(())
        });
        let a = item("a");
        registry.register(&a).unwrap();
        assert_eq!(seen.get(), 1);
        registry.deregister(&a).unwrap();
        assert_eq!(seen.get(), 0);
    }
}
