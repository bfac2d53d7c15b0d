#![forbid(unsafe_code)]

//! The owning context.
//!
//! A [`Context`] owns one [`Registry`] per model type and is the single place
//! registries are looked up: there is no ambient global. It also resolves
//! dotted property paths across `Reference` properties, answers reverse
//! relationship queries and rebuilds entities from [`EntityRecord`]s.
//!
//! # Example
//!
//! ```ignore
//! let ctx = Context::default();
//! let people = ctx.registry::<Person>();
//! ctx.save(&alice)?;
//! let posts = ctx.relationship_of::<Post>("author", &alice.erase())?;
//! ```

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use indexmap::IndexMap;
use tether_core::{
    Entity, EntityId, EntityRecord, EntityRef, Error, Model, Result, SchemaDescription,
    SemanticType, Value,
};
use tracing::debug;

use crate::config::ContextConfig;
use crate::registry::Registry;

type Instantiate = fn(&EntityRecord) -> Result<EntityRef>;

fn instantiate_erased<T: Model>(record: &EntityRecord) -> Result<EntityRef> {
    tether_core::instantiate::<T>(record).map(EntityRef::from)
}

struct TypeEntry {
    registry: Registry,
    instantiate: Instantiate,
}

struct ContextShared {
    config: ContextConfig,
    registries: RefCell<IndexMap<&'static str, TypeEntry, ahash::RandomState>>,
}

/// Owner of every registry. Clones share the same context.
#[derive(Clone)]
pub struct Context {
    shared: Rc<ContextShared>,
}

impl Default for Context {
    fn default() -> Self {
        Self {
            shared: Rc::new(ContextShared {
                config: ContextConfig::default(),
                registries: RefCell::new(IndexMap::default()),
            }),
        }
    }
}

impl Context {
    /// Context with a validated configuration.
    pub fn new(config: ContextConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            shared: Rc::new(ContextShared {
                config,
                registries: RefCell::new(IndexMap::default()),
            }),
        })
    }

    #[must_use]
    pub fn config(&self) -> &ContextConfig {
        &self.shared.config
    }

    // -----------------------------------------------------------------------
    // Registries
    // -----------------------------------------------------------------------

    /// Make `T` known to the context. Returns its registry.
    pub fn register_type<T: Model>(&self) -> Registry {
        self.registry::<T>()
    }

    /// The registry of `T`, created on first use.
    pub fn registry<T: Model>(&self) -> Registry {
        let name = T::schema().type_name();
        let mut registries = self.shared.registries.borrow_mut();
        registries
            .entry(name)
            .or_insert_with(|| {
                debug!(target: "tether::context", entity_type = name, "registry created");
                TypeEntry {
                    registry: Registry::for_type::<T>(),
                    instantiate: instantiate_erased::<T>,
                }
            })
            .registry
            .clone()
    }

    /// The registry of a type by name.
    pub fn registry_named(&self, name: &str) -> Result<Registry> {
        self.shared
            .registries
            .borrow()
            .get(name)
            .map(|entry| entry.registry.clone())
            .ok_or_else(|| Error::UnknownType(name.to_owned()))
    }

    /// Names of every known type, in the order they became known.
    #[must_use]
    pub fn type_names(&self) -> Vec<&'static str> {
        self.shared.registries.borrow().keys().copied().collect()
    }

    /// Schema description of a known type.
    pub fn description(&self, name: &str) -> Result<SchemaDescription> {
        self.registry_named(name).map(|r| r.description().clone())
    }

    /// Register an entity into its type's registry.
    pub fn save<T: Model>(&self, entity: &Entity<T>) -> Result<()> {
        self.registry::<T>().register(entity)
    }

    /// Deregister an entity from its type's registry.
    pub fn remove<T: Model>(&self, entity: &Entity<T>) -> Result<()> {
        self.registry::<T>().deregister(entity)
    }

    /// Typed lookup by identifier.
    pub fn find<T: Model>(&self, id: EntityId) -> Result<Entity<T>> {
        self.registry::<T>().find(id)
    }

    /// Deregister every entity of every registry, then forget the registries.
    ///
    /// All registries are emptied even if an observer fails; the first error
    /// is returned.
    pub fn clear(&self) -> Result<()> {
        let registries: Vec<Registry> = std::mem::take(&mut *self.shared.registries.borrow_mut())
            .into_values()
            .map(|entry| entry.registry)
            .collect();
        let mut first_error = None;
        for registry in registries.iter().rev() {
            if let Err(err) = registry.clear() {
                first_error.get_or_insert(err);
            }
        }
        debug!(target: "tether::context", registries = registries.len(), "context cleared");
        first_error.map_or(Ok(()), Err)
    }

    // -----------------------------------------------------------------------
    // Property paths
    // -----------------------------------------------------------------------

    /// Check a dotted property path against the schemas of `entity_type` and
    /// every type it traverses.
    pub fn validate_path(&self, entity_type: &str, path: &str) -> Result<PropertyPath> {
        let mut description = self.description(entity_type)?;
        let root = description.type_name();
        let invalid = || Error::InvalidPropertyPath {
            entity_type: root,
            path: path.to_owned(),
        };
        let parts: Vec<&str> = path.split('.').collect();
        if parts.iter().any(|p| p.is_empty()) || parts.len() > self.config().max_path_depth {
            return Err(invalid());
        }
        let mut segments = Vec::with_capacity(parts.len());
        for (i, part) in parts.iter().enumerate() {
            let name = description.canonical_name(part).ok_or_else(invalid)?;
            let ty = description.property_type(part).cloned().ok_or_else(invalid)?;
            let owner = description.type_name();
            if i + 1 < parts.len() {
                let target = ty.referenced_type().ok_or_else(invalid)?;
                description = self.description(target)?;
            }
            segments.push(Segment { owner, name, ty });
        }
        Ok(PropertyPath {
            raw: path.to_owned(),
            segments,
        })
    }

    /// The entities visited while walking `path` from `entity`: the root
    /// first, then one per reference hop. Stops early at a dangling or null
    /// reference.
    pub fn resolve_chain(&self, entity: &EntityRef, path: &PropertyPath) -> Result<Vec<EntityRef>> {
        if entity.entity_type() != path.root_type() {
            return Err(Error::WrongType {
                expected: path.root_type(),
                found: entity.entity_type().to_owned(),
            });
        }
        let mut chain = vec![entity.clone()];
        for segment in &path.segments[..path.segments.len() - 1] {
            let Some(current) = chain.last() else { break };
            let Some(id) = current.get(segment.name)?.as_reference() else {
                break;
            };
            let Some(target) = segment.ty.referenced_type() else {
                break;
            };
            match self.registry_named(target).ok().and_then(|r| r.get(id)) {
                Some(next) => chain.push(next),
                None => break,
            }
        }
        Ok(chain)
    }

    /// Value at the end of a validated path; `Null` across a dangling
    /// reference.
    pub fn resolve_path(&self, entity: &EntityRef, path: &PropertyPath) -> Result<Value> {
        let chain = self.resolve_chain(entity, path)?;
        match chain.get(path.depth() - 1) {
            Some(owner) => owner.get(path.leaf()),
            None => Ok(Value::Null),
        }
    }

    /// Validate and resolve a dotted path in one step.
    pub fn resolve(&self, entity: &EntityRef, path: &str) -> Result<Value> {
        let path = self.validate_path(entity.entity_type(), path)?;
        self.resolve_path(entity, &path)
    }

    /// Write through a dotted path to the entity owning its last segment.
    pub fn assign(&self, entity: &EntityRef, path: &str, value: impl Into<Value>) -> Result<()> {
        let path = self.validate_path(entity.entity_type(), path)?;
        self.assign_path(entity, &path, value.into())
    }

    /// [`Context::assign`] with a validated path.
    pub fn assign_path(&self, entity: &EntityRef, path: &PropertyPath, value: Value) -> Result<()> {
        let chain = self.resolve_chain(entity, path)?;
        match chain.get(path.depth() - 1) {
            Some(owner) => owner.set(path.leaf(), value),
            None => Err(Error::DanglingReference {
                path: path.as_str().to_owned(),
            }),
        }
    }

    // -----------------------------------------------------------------------
    // Relationships
    // -----------------------------------------------------------------------

    /// Every registered `target_type` entity whose `property` currently
    /// refers to `referring_to`, in registry insertion order.
    ///
    /// Reference properties match by identifier; text properties match the
    /// identifier's string form.
    pub fn relationship(
        &self,
        property: &str,
        target_type: &str,
        referring_to: &EntityRef,
    ) -> Result<Vec<EntityRef>> {
        let registry = self.registry_named(target_type)?;
        let invalid = || Error::InvalidPropertyPath {
            entity_type: registry.entity_type(),
            path: property.to_owned(),
        };
        let expected = match registry.description().property_type(property) {
            Some(SemanticType::Reference(referenced)) => {
                if *referenced != referring_to.entity_type() {
                    return Err(Error::WrongType {
                        expected: *referenced,
                        found: referring_to.entity_type().to_owned(),
                    });
                }
                Value::Ref(referring_to.id())
            }
            Some(SemanticType::Text) => Value::Text(referring_to.id().to_string()),
            _ => return Err(invalid()),
        };
        Ok(registry
            .objects()
            .into_iter()
            .filter(|candidate| matches!(candidate.get(property), Ok(v) if v == expected))
            .collect())
    }

    /// Typed [`Context::relationship`].
    pub fn relationship_of<T: Model>(
        &self,
        property: &str,
        referring_to: &EntityRef,
    ) -> Result<Vec<Entity<T>>> {
        let registry = self.registry::<T>();
        self.relationship(property, registry.entity_type(), referring_to)?
            .iter()
            .map(|entity| entity.try_downcast::<T>())
            .collect()
    }

    // -----------------------------------------------------------------------
    // Serialization boundary
    // -----------------------------------------------------------------------

    /// Rebuild an entity from a record, registering it when
    /// `auto_register_instantiated` is set.
    pub fn instantiate(&self, record: &EntityRecord) -> Result<EntityRef> {
        let (registry, instantiate) = {
            let registries = self.shared.registries.borrow();
            let entry = registries
                .get(record.entity_type.as_str())
                .ok_or_else(|| Error::UnknownType(record.entity_type.clone()))?;
            (entry.registry.clone(), entry.instantiate)
        };
        let entity = instantiate(record)?;
        if self.config().auto_register_instantiated {
            registry.register(entity.clone())?;
        }
        debug!(
            target: "tether::context",
            entity_type = entity.entity_type(),
            id = %entity.id(),
            "instantiated"
        );
        Ok(entity)
    }
}

impl fmt::Debug for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Context")
            .field("config", &self.shared.config)
            .field("types", &self.type_names())
            .finish()
    }
}

// ---------------------------------------------------------------------------
// PropertyPath
// ---------------------------------------------------------------------------

/// One validated path segment: the owning type, the property and its type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segment {
    pub owner: &'static str,
    pub name: &'static str,
    pub ty: SemanticType,
}

/// A dotted property path checked against the schemas it crosses.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PropertyPath {
    raw: String,
    segments: Vec<Segment>,
}

impl PropertyPath {
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    #[must_use]
    pub fn root_type(&self) -> &'static str {
        self.segments[0].owner
    }

    #[must_use]
    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// Number of segments; at least one.
    #[must_use]
    pub fn depth(&self) -> usize {
        self.segments.len()
    }

    /// Name of the last segment.
    #[must_use]
    pub fn leaf(&self) -> &'static str {
        self.last().name
    }

    /// Semantic type of the value the path resolves to.
    #[must_use]
    pub fn leaf_type(&self) -> &SemanticType {
        &self.last().ty
    }

    /// Whether the path crosses at least one reference.
    #[must_use]
    pub fn is_nested(&self) -> bool {
        self.segments.len() > 1
    }

    /// Types reached through reference hops, excluding the root.
    pub fn traversed_types(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.segments[1..].iter().map(|s| s.owner)
    }

    fn last(&self) -> &Segment {
        &self.segments[self.segments.len() - 1]
    }
}

impl fmt::Display for PropertyPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}
