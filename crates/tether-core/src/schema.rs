#![forbid(unsafe_code)]

//! Explicit per-type schemas.
//!
//! A [`Schema<T>`] lists every tracked property of a model type as a typed
//! accessor pair (getter, optional setter) plus its [`SemanticType`]. The
//! untyped [`SchemaDescription`] is what registries, collections and bindings
//! use to validate property paths at construction time.
//!
//! # Example
//!
//! ```
//! use std::sync::LazyLock;
//! use tether_core::{Model, Schema, SemanticType, Value};
//!
//! #[derive(Default)]
//! struct Person {
//!     name: String,
//!     age: i64,
//! }
//!
//! static PERSON: LazyLock<Schema<Person>> = LazyLock::new(|| {
//!     Schema::<Person>::new("Person")
//!         .property("name", SemanticType::Text, |p| p.name.clone().into(), |p, v| {
//!             p.name = v.try_text()?;
//!             Ok(())
//!         })
//!         .property("age", SemanticType::Int, |p| p.age.into(), |p, v| {
//!             p.age = v.try_int()?;
//!             Ok(())
//!         })
//!         .with_factory(Person::default)
//! });
//!
//! impl Model for Person {
//!     fn schema() -> &'static Schema<Self> {
//!         &PERSON
//!     }
//! }
//!
//! let desc = Person::schema().describe();
//! assert_eq!(desc.property_type("age"), Some(&SemanticType::Int));
//! ```

use crate::error::{Error, Result};
use crate::value::{SemanticType, Value};

/// Reads a property out of a model value.
pub type Getter<T> = fn(&T) -> Value;

/// Writes an already-coerced value into a model value.
pub type Setter<T> = fn(&mut T, Value) -> Result<()>;

/// Built-in metadata pseudo-properties available on every entity.
///
/// `id` is a reference to the entity itself; the timestamps are milliseconds
/// since the Unix epoch.
pub const METADATA_PROPERTIES: [&str; 3] = ["id", "created_at", "updated_at"];

/// A type whose instances can be managed by a registry.
pub trait Model: Sized + 'static {
    /// The static schema of the type.
    fn schema() -> &'static Schema<Self>;
}

/// One tracked property: name, semantic type and accessor pair.
pub struct Property<T> {
    name: &'static str,
    ty: SemanticType,
    get: Getter<T>,
    set: Option<Setter<T>>,
}

impl<T> Property<T> {
    #[must_use]
    pub fn name(&self) -> &'static str {
        self.name
    }

    #[must_use]
    pub fn semantic_type(&self) -> &SemanticType {
        &self.ty
    }

    #[must_use]
    pub fn is_writable(&self) -> bool {
        self.set.is_some()
    }
}

impl<T> std::fmt::Debug for Property<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Property")
            .field("name", &self.name)
            .field("ty", &self.ty)
            .field("writable", &self.set.is_some())
            .finish()
    }
}

/// Typed schema of a model type.
pub struct Schema<T> {
    type_name: &'static str,
    properties: Vec<Property<T>>,
    factory: Option<fn() -> T>,
}

impl<T> Schema<T> {
    /// Start a schema for the named type.
    #[must_use]
    pub fn new(type_name: &'static str) -> Self {
        Self {
            type_name,
            properties: Vec::new(),
            factory: None,
        }
    }

    /// Add a read/write property.
    ///
    /// # Panics
    ///
    /// Panics if the name is already used or is a metadata property name.
    #[must_use]
    pub fn property(
        self,
        name: &'static str,
        ty: SemanticType,
        get: Getter<T>,
        set: Setter<T>,
    ) -> Self {
        self.push(name, ty, get, Some(set))
    }

    /// Add a property without a setter.
    ///
    /// # Panics
    ///
    /// Panics if the name is already used or is a metadata property name.
    #[must_use]
    pub fn read_only(self, name: &'static str, ty: SemanticType, get: Getter<T>) -> Self {
        self.push(name, ty, get, None)
    }

    fn push(
        mut self,
        name: &'static str,
        ty: SemanticType,
        get: Getter<T>,
        set: Option<Setter<T>>,
    ) -> Self {
        assert!(
            !METADATA_PROPERTIES.contains(&name),
            "'{name}' is reserved for entity metadata"
        );
        assert!(
            self.property_named(name).is_none(),
            "duplicate property '{name}' in schema {}",
            self.type_name
        );
        self.properties.push(Property { name, ty, get, set });
        self
    }

    /// Supply a constructor used by reverse instantiation.
    #[must_use]
    pub fn with_factory(mut self, factory: fn() -> T) -> Self {
        self.factory = Some(factory);
        self
    }

    #[must_use]
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    #[must_use]
    pub fn properties(&self) -> &[Property<T>] {
        &self.properties
    }

    #[must_use]
    pub fn property_named(&self, name: &str) -> Option<&Property<T>> {
        self.properties.iter().find(|p| p.name == name)
    }

    /// Build a fresh instance through the factory, if one was supplied.
    #[must_use]
    pub fn instantiate(&self) -> Option<T> {
        self.factory.map(|make| make())
    }

    /// Read a property.
    pub fn get(&self, target: &T, name: &str) -> Result<Value> {
        let property = self.lookup(name)?;
        Ok((property.get)(target))
    }

    /// Coerce `value` to the property's type and write it.
    pub fn set(&self, target: &mut T, name: &str, value: Value) -> Result<()> {
        let property = self.lookup(name)?;
        let setter = property.set.ok_or_else(|| Error::ReadOnlyProperty {
            entity_type: self.type_name,
            property: name.to_owned(),
        })?;
        let value = value.coerce(&property.ty)?;
        setter(target, value)
    }

    fn lookup(&self, name: &str) -> Result<&Property<T>> {
        self.property_named(name)
            .ok_or_else(|| Error::InvalidPropertyPath {
                entity_type: self.type_name,
                path: name.to_owned(),
            })
    }

    /// Untyped `{propertyName → semanticType}` description.
    #[must_use]
    pub fn describe(&self) -> SchemaDescription {
        SchemaDescription {
            type_name: self.type_name,
            identity: SemanticType::Reference(self.type_name),
            properties: self
                .properties
                .iter()
                .map(|p| (p.name, p.ty.clone()))
                .collect(),
        }
    }
}

impl<T> std::fmt::Debug for Schema<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Schema")
            .field("type_name", &self.type_name)
            .field("properties", &self.properties)
            .field("has_factory", &self.factory.is_some())
            .finish()
    }
}

/// Untyped view of a schema, shared by registries and validation code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaDescription {
    type_name: &'static str,
    identity: SemanticType,
    properties: Vec<(&'static str, SemanticType)>,
}

static TIMESTAMP_TYPE: SemanticType = SemanticType::Int;

impl SchemaDescription {
    #[must_use]
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// Semantic type of a schema or metadata property.
    #[must_use]
    pub fn property_type(&self, name: &str) -> Option<&SemanticType> {
        match name {
            "id" => Some(&self.identity),
            "created_at" | "updated_at" => Some(&TIMESTAMP_TYPE),
            _ => self
                .properties
                .iter()
                .find(|(n, _)| *n == name)
                .map(|(_, ty)| ty),
        }
    }

    /// Canonical `'static` name of a property, metadata included.
    #[must_use]
    pub fn canonical_name(&self, name: &str) -> Option<&'static str> {
        METADATA_PROPERTIES
            .iter()
            .copied()
            .chain(self.properties.iter().map(|(n, _)| *n))
            .find(|n| *n == name)
    }

    /// Schema properties in declaration order (metadata excluded).
    pub fn properties(&self) -> impl Iterator<Item = (&'static str, &SemanticType)> + '_ {
        self.properties.iter().map(|(n, ty)| (*n, ty))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.properties.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.properties.is_empty()
    }
}
