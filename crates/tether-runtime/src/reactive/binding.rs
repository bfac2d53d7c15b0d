#![forbid(unsafe_code)]

//! Bindings between entity properties, controls and callbacks.
//!
//! A [`Binding`] links up to three parties: an entity property (reached by a
//! possibly dotted path), a [`Control`], and a change handler. The
//! [`BindingEngine`] creates them; a [`BindingScope`] owns a set of them the
//! way a screen owns its widgets.
//!
//! # Two-Way Bindings
//!
//! ```ignore
//! let engine = BindingEngine::new(&ctx);
//! let prep = Control::new(Value::from("0"));
//! let binding = engine.bind_control_to_entity_property(&prep, &recipe.erase(), "prep", None)?;
//! assert_eq!(prep.get(), Value::from("5")); // initial sync
//!
//! prep.set(Value::from("10"))?;
//! assert_eq!(recipe.get("prep")?, Value::Float(10.0));
//! ```
//!
//! # Invariants
//!
//! 1. The control is synchronized from the model once, at bind time.
//! 2. Each direction has its own in-flight flag. A model event that arrives
//!    while the binding is writing the model, or a control event that
//!    arrives while it is writing the control, is dropped: not queued, not
//!    re-entered.
//! 3. A transformer sees exactly one side per call ([`Change`]); returning
//!    `Ok(None)` suppresses propagation for that event.
//! 4. `unbind()` is idempotent. Dropping the last handle unbinds.
//!
//! # Failure Modes
//!
//! - Transformer or handler error: propagates to whoever triggered the
//!   change (the entity write or `Control::set`); the opposite side is left
//!   untouched.
//! - Dangling reference in the middle of the path: the model reads as
//!   `Null`; control writes fail with `DanglingReference`.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};

use indexmap::IndexMap;
use tether_core::{ChangeEvent, ChangeKind, EntityId, EntityRef, Error, Result, Value};
use tracing::trace;

use super::observable::{Control, Subscription};
use crate::context::{Context, PropertyPath};

// ---------------------------------------------------------------------------
// Change / Transformer
// ---------------------------------------------------------------------------

/// A value crossing a binding, tagged with the side it came from.
#[derive(Debug, Clone, PartialEq)]
pub enum Change {
    FromModel(Value),
    FromControl(Value),
}

impl Change {
    #[must_use]
    pub fn value(&self) -> &Value {
        match self {
            Self::FromModel(v) | Self::FromControl(v) => v,
        }
    }

    #[must_use]
    pub fn into_value(self) -> Value {
        match self {
            Self::FromModel(v) | Self::FromControl(v) => v,
        }
    }

    #[must_use]
    pub fn is_from_model(&self) -> bool {
        matches!(self, Self::FromModel(_))
    }
}

/// Converts a value on its way to the opposite side. `Ok(None)` drops it.
pub type Transformer = Rc<dyn Fn(Change) -> Result<Option<Value>>>;

/// Called after a change crossed (or arrived at) the binding.
pub type ChangeHandler = Rc<dyn Fn(&Change) -> Result<()>>;

/// Wrap a closure as a [`Transformer`].
pub fn transformer(f: impl Fn(Change) -> Result<Option<Value>> + 'static) -> Transformer {
    Rc::new(f)
}

// ---------------------------------------------------------------------------
// Binding state
// ---------------------------------------------------------------------------

/// Sets a flag for the duration of one apply.
struct InFlight<'a> {
    flag: &'a Cell<bool>,
    previous: bool,
}

impl<'a> InFlight<'a> {
    fn enter(flag: &'a Cell<bool>) -> Self {
        let previous = flag.replace(true);
        Self { flag, previous }
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.flag.set(self.previous);
    }
}

struct ModelSide {
    entity: EntityRef,
    path: PropertyPath,
    /// `(entity, property)` pairs whose update can change the resolved value.
    watched: RefCell<Vec<(EntityId, &'static str)>>,
}

struct BindingState {
    context: Context,
    model: Option<ModelSide>,
    control: Option<Control>,
    transformer: Option<Transformer>,
    handler: RefCell<Option<ChangeHandler>>,
    to_model: Cell<bool>,
    to_control: Cell<bool>,
    subscriptions: RefCell<Vec<Subscription>>,
    bound: Cell<bool>,
}

impl BindingState {
    fn refresh_watch(&self, model: &ModelSide) -> Result<()> {
        let chain = self.context.resolve_chain(&model.entity, &model.path)?;
        *model.watched.borrow_mut() = chain
            .iter()
            .zip(model.path.segments())
            .map(|(entity, segment)| (entity.id(), segment.name))
            .collect();
        Ok(())
    }

    fn concerns(&self, model: &ModelSide, event: &ChangeEvent) -> bool {
        let watched = model.watched.borrow();
        match event.kind {
            ChangeKind::Update => watched
                .iter()
                .any(|(id, property)| event.is_update_of(*id, property)),
            // A hop appearing or disappearing changes what the path resolves to.
            ChangeKind::Insert | ChangeKind::Delete if model.path.is_nested() => {
                let dangling = watched.len() < model.path.depth();
                dangling
                    || watched
                        .iter()
                        .skip(1)
                        .any(|(id, _)| *id == event.entity_id())
            }
            ChangeKind::Insert | ChangeKind::Delete => false,
        }
    }

    fn on_model_event(&self, event: &ChangeEvent) -> Result<()> {
        let Some(model) = &self.model else {
            return Ok(());
        };
        if !self.bound.get() || !self.concerns(model, event) {
            return Ok(());
        }
        self.refresh_watch(model)?;
        if self.to_model.get() {
            trace!(target: "tether::binding", path = %model.path, "model echo dropped");
            return Ok(());
        }
        self.model_changed()
    }

    /// Push the current model value to the control and the handler.
    fn model_changed(&self) -> Result<()> {
        let Some(model) = &self.model else {
            return Ok(());
        };
        let value = self.context.resolve_path(&model.entity, &model.path)?;
        let change = Change::FromModel(value);
        if let Some(control) = &self.control {
            let outgoing = match &self.transformer {
                Some(transform) => transform(change.clone())?,
                None => Some(display_for(control, change.value().clone())),
            };
            if let Some(outgoing) = outgoing {
                trace!(target: "tether::binding", path = %model.path, value = ?outgoing, "model -> control");
                let _in_flight = InFlight::enter(&self.to_control);
                control.set(outgoing)?;
            }
        }
        self.notify(&change)
    }

    fn on_control_change(&self, value: &Value) -> Result<()> {
        if !self.bound.get() {
            return Ok(());
        }
        if self.to_control.get() {
            trace!(target: "tether::binding", "control echo dropped");
            return Ok(());
        }
        let change = Change::FromControl(value.clone());
        if let Some(model) = &self.model {
            let incoming = match &self.transformer {
                Some(transform) => transform(change.clone())?,
                None => Some(change.value().clone()),
            };
            if let Some(incoming) = incoming {
                let incoming = self.prepare_for_model(&model.path, incoming)?;
                trace!(target: "tether::binding", path = %model.path, value = ?incoming, "control -> model");
                let _in_flight = InFlight::enter(&self.to_model);
                self.context
                    .assign_path(&model.entity, &model.path, incoming)?;
            }
        }
        self.notify(&change)
    }

    fn prepare_for_model(&self, path: &PropertyPath, value: Value) -> Result<Value> {
        let expected = path.leaf_type();
        if self.context.config().coerce_control_values {
            value.coerce(expected)
        } else if value.conforms_to(expected) {
            Ok(value)
        } else {
            Err(Error::TypeMismatch {
                expected: expected.clone(),
                found: value,
            })
        }
    }

    fn notify(&self, change: &Change) -> Result<()> {
        let handler = self.handler.borrow().clone();
        match handler {
            Some(handler) => handler(change),
            None => Ok(()),
        }
    }
}

/// Without a transformer, a control that shows text gets the value's text.
fn display_for(control: &Control, value: Value) -> Value {
    let shows_text = control.with(|current| matches!(current, Value::Text(_)));
    if shows_text && !matches!(value, Value::Text(_)) {
        Value::Text(value.to_string())
    } else {
        value
    }
}

// ---------------------------------------------------------------------------
// Binding
// ---------------------------------------------------------------------------

/// Handle to one binding. Clones share it; the binding is released by
/// [`Binding::unbind`] or when the last handle drops.
#[derive(Clone)]
pub struct Binding {
    state: Rc<BindingState>,
}

impl Binding {
    /// Remove both observation hooks. Safe to call repeatedly.
    pub fn unbind(&self) {
        if self.state.bound.replace(false) {
            self.state.subscriptions.borrow_mut().clear();
            trace!(target: "tether::binding", "unbound");
        }
    }

    #[must_use]
    pub fn is_bound(&self) -> bool {
        self.state.bound.get()
    }

    #[must_use]
    pub fn entity(&self) -> Option<EntityRef> {
        self.state.model.as_ref().map(|m| m.entity.clone())
    }

    #[must_use]
    pub fn path(&self) -> Option<&str> {
        self.state.model.as_ref().map(|m| m.path.as_str())
    }

    #[must_use]
    pub fn control(&self) -> Option<Control> {
        self.state.control.clone()
    }

    /// Install (or replace) the change handler.
    pub fn set_change_handler(&self, handler: impl Fn(&Change) -> Result<()> + 'static) {
        *self.state.handler.borrow_mut() = Some(Rc::new(handler));
    }

    /// Re-run the model-to-control synchronization.
    pub fn sync_from_model(&self) -> Result<()> {
        if !self.is_bound() {
            return Ok(());
        }
        self.state.model_changed()
    }

    fn touches(&self, id: EntityId) -> bool {
        self.state.model.as_ref().is_some_and(|m| {
            m.entity.id() == id || m.watched.borrow().iter().any(|(w, _)| *w == id)
        })
    }
}

impl fmt::Debug for Binding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Binding")
            .field("path", &self.path())
            .field("has_control", &self.state.control.is_some())
            .field("has_transformer", &self.state.transformer.is_some())
            .field("bound", &self.is_bound())
            .finish()
    }
}

// ---------------------------------------------------------------------------
// BindingEngine
// ---------------------------------------------------------------------------

/// Creates bindings against the registries of one [`Context`].
#[derive(Debug, Clone)]
pub struct BindingEngine {
    context: Context,
}

impl BindingEngine {
    #[must_use]
    pub fn new(context: &Context) -> Self {
        Self {
            context: context.clone(),
        }
    }

    #[must_use]
    pub fn context(&self) -> &Context {
        &self.context
    }

    /// Call `handler` with every new control value.
    pub fn bind_control_to_callback(
        &self,
        control: &Control,
        handler: impl Fn(&Change) -> Result<()> + 'static,
    ) -> Binding {
        let state = self.state(None, Some(control.clone()), None, Some(Rc::new(handler)));
        self.observe_control(&state);
        Binding { state }
    }

    /// Call `handler` whenever the value at `path` on `entity` changes.
    pub fn bind_entity_property_to_callback(
        &self,
        entity: &EntityRef,
        path: &str,
        handler: impl Fn(&Change) -> Result<()> + 'static,
    ) -> Result<Binding> {
        let model = self.model_side(entity, path)?;
        let state = self.state(Some(model), None, None, Some(Rc::new(handler)));
        self.observe_model(&state)?;
        Ok(Binding { state })
    }

    /// Keep `control` and the property at `path` on `entity` in sync.
    ///
    /// The control takes the model's value immediately.
    pub fn bind_control_to_entity_property(
        &self,
        control: &Control,
        entity: &EntityRef,
        path: &str,
        transformer: Option<Transformer>,
    ) -> Result<Binding> {
        let model = self.model_side(entity, path)?;
        let state = self.state(Some(model), Some(control.clone()), transformer, None);
        self.observe_model(&state)?;
        self.observe_control(&state);
        state.model_changed()?;
        trace!(target: "tether::binding", path, "two-way binding created");
        Ok(Binding { state })
    }

    fn model_side(&self, entity: &EntityRef, path: &str) -> Result<ModelSide> {
        let path = self.context.validate_path(entity.entity_type(), path)?;
        Ok(ModelSide {
            entity: entity.clone(),
            path,
            watched: RefCell::new(Vec::new()),
        })
    }

    fn state(
        &self,
        model: Option<ModelSide>,
        control: Option<Control>,
        transformer: Option<Transformer>,
        handler: Option<ChangeHandler>,
    ) -> Rc<BindingState> {
        Rc::new(BindingState {
            context: self.context.clone(),
            model,
            control,
            transformer,
            handler: RefCell::new(handler),
            to_model: Cell::new(false),
            to_control: Cell::new(false),
            subscriptions: RefCell::new(Vec::new()),
            bound: Cell::new(true),
        })
    }

    fn observe_control(&self, state: &Rc<BindingState>) {
        let Some(control) = &state.control else {
            return;
        };
        let weak: Weak<BindingState> = Rc::downgrade(state);
        let subscription = control.subscribe(move |value| match weak.upgrade() {
            Some(state) => state.on_control_change(value),
            None => Ok(()),
        });
        state.subscriptions.borrow_mut().push(subscription);
    }

    /// Observe the registry of every type along the path.
    fn observe_model(&self, state: &Rc<BindingState>) -> Result<()> {
        let Some(model) = &state.model else {
            return Ok(());
        };
        state.refresh_watch(model)?;
        let mut types: Vec<&'static str> = Vec::new();
        for segment in model.path.segments() {
            if !types.contains(&segment.owner) {
                types.push(segment.owner);
            }
        }
        for ty in types {
            let registry = self.context.registry_named(ty)?;
            let weak: Weak<BindingState> = Rc::downgrade(state);
            let subscription = registry.observe(move |_, event| match weak.upgrade() {
                Some(state) => state.on_model_event(event),
                None => Ok(()),
            });
            state.subscriptions.borrow_mut().push(subscription);
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// BindingScope
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum ScopeKey {
    Property(EntityId, String),
    Control(usize),
}

/// Owns the bindings of one logical screen.
///
/// At most one binding exists per (entity, property path) and per
/// callback-bound control; binding the same key again replaces the previous
/// binding.
///
/// # Invariants
///
/// 1. Bindings are released in reverse registration order on drop.
/// 2. After `clear()` or drop, no callback from this scope fires.
/// 3. `binding_count()` counts live bindings only.
pub struct BindingScope {
    engine: BindingEngine,
    bindings: IndexMap<ScopeKey, Binding, ahash::RandomState>,
}

impl BindingScope {
    #[must_use]
    pub fn new(context: &Context) -> Self {
        Self {
            engine: BindingEngine::new(context),
            bindings: IndexMap::default(),
        }
    }

    #[must_use]
    pub fn engine(&self) -> &BindingEngine {
        &self.engine
    }

    /// Two-way bind a control to an entity property, replacing any binding
    /// of the same property.
    pub fn register_control(
        &mut self,
        control: &Control,
        entity: &EntityRef,
        path: &str,
        transformer: Option<Transformer>,
    ) -> Result<&Binding> {
        self.engine.context.validate_path(entity.entity_type(), path)?;
        let key = ScopeKey::Property(entity.id(), path.to_owned());
        self.release_key(&key);
        let binding = self
            .engine
            .bind_control_to_entity_property(control, entity, path, transformer)?;
        Ok(self.insert(key, binding))
    }

    /// Call `handler` when an entity property changes, replacing any binding
    /// of the same property.
    pub fn observe_property(
        &mut self,
        entity: &EntityRef,
        path: &str,
        handler: impl Fn(&Change) -> Result<()> + 'static,
    ) -> Result<&Binding> {
        self.engine.context.validate_path(entity.entity_type(), path)?;
        let key = ScopeKey::Property(entity.id(), path.to_owned());
        self.release_key(&key);
        let binding = self
            .engine
            .bind_entity_property_to_callback(entity, path, handler)?;
        Ok(self.insert(key, binding))
    }

    /// Call `handler` when a control changes, replacing any callback on the
    /// same control.
    pub fn observe_control(
        &mut self,
        control: &Control,
        handler: impl Fn(&Change) -> Result<()> + 'static,
    ) -> &Binding {
        let key = ScopeKey::Control(control.addr());
        self.release_key(&key);
        let binding = self.engine.bind_control_to_callback(control, handler);
        self.insert(key, binding)
    }

    /// Release one property binding. Returns whether one existed.
    pub fn release(&mut self, entity: &EntityRef, path: &str) -> bool {
        self.release_key(&ScopeKey::Property(entity.id(), path.to_owned()))
    }

    /// Release every binding that reads through the entity. Returns how many
    /// were released.
    pub fn release_entity(&mut self, id: EntityId) -> usize {
        let before = self.bindings.len();
        self.bindings.retain(|key, binding| {
            let hit = matches!(key, ScopeKey::Property(bound, _) if *bound == id)
                || binding.touches(id);
            if hit {
                binding.unbind();
            }
            !hit
        });
        before - self.bindings.len()
    }

    #[must_use]
    pub fn binding_count(&self) -> usize {
        self.bindings.values().filter(|b| b.is_bound()).count()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.binding_count() == 0
    }

    /// Release everything, newest first. The scope stays usable.
    pub fn clear(&mut self) {
        while let Some((_, binding)) = self.bindings.pop() {
            binding.unbind();
        }
    }

    fn release_key(&mut self, key: &ScopeKey) -> bool {
        match self.bindings.shift_remove(key) {
            Some(binding) => {
                binding.unbind();
                true
            }
            None => false,
        }
    }

    fn insert(&mut self, key: ScopeKey, binding: Binding) -> &Binding {
        let (index, _) = self.bindings.insert_full(key, binding);
        &self.bindings[index]
    }
}

impl Drop for BindingScope {
    fn drop(&mut self) {
        self.clear();
    }
}

impl fmt::Debug for BindingScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BindingScope")
            .field("binding_count", &self.binding_count())
            .finish()
    }
}
