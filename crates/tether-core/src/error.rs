#![forbid(unsafe_code)]

//! Error taxonomy shared by every tether crate.
//!
//! # Failure Modes
//!
//! | Error | Raised by | Recovery |
//! |-------|-----------|----------|
//! | `DuplicateRegistration` | `Registry::register` | Registry unchanged; caller resolves identity |
//! | `NotFound` | identifier lookups | Caller picks a fallback |
//! | `EmptySources` / `InvalidOrdering` / `InvalidPropertyPath` | construction / bind time | Fix configuration |
//! | `TypeMismatch` | value coercion | Apply is not committed |
//! | `Callback` | observers, delegates, transformers | Remaining fanout is aborted |

use core::fmt;

use crate::id::EntityId;
use crate::value::{SemanticType, Value};

/// Convenience alias used throughout tether.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors produced by registries, collections, bindings and the context.
#[derive(Debug, Clone, PartialEq)]
pub enum Error {
    /// An entity with the same identifier but a different instance is registered.
    DuplicateRegistration { entity_type: &'static str, id: EntityId },
    /// Identifier lookup miss.
    NotFound { entity_type: &'static str, id: EntityId },
    /// The entity is already managed by another live registry.
    AlreadyManaged { entity_type: &'static str, id: EntityId },
    /// An entity was handed to a registry (or downcast) of another type.
    WrongType { expected: &'static str, found: String },
    /// No registry exists for the named type.
    UnknownType(String),
    /// A collection was built without any source type.
    EmptySources,
    /// A sort key references a property the source type does not have.
    InvalidOrdering { entity_type: &'static str, path: String },
    /// A property path does not resolve against the type's schema.
    InvalidPropertyPath { entity_type: &'static str, path: String },
    /// A reference in the middle of a path points at no live entity.
    DanglingReference { path: String },
    /// A value could not be coerced to the property's semantic type.
    TypeMismatch { expected: SemanticType, found: Value },
    /// The property has no setter.
    ReadOnlyProperty { entity_type: &'static str, property: String },
    /// Reverse instantiation needs a schema factory.
    MissingFactory(&'static str),
    /// A string could not be parsed as an [`EntityId`].
    InvalidIdentifier(String),
    /// Raised by an observer, delegate, handler or transformer.
    Callback(String),
    /// Rejected configuration.
    Config(String),
}

impl Error {
    /// Build a [`Error::Callback`] from any displayable message.
    #[must_use]
    pub fn callback(message: impl fmt::Display) -> Self {
        Self::Callback(message.to_string())
    }

    /// Whether the error is a configuration error raised at construction or bind time.
    #[must_use]
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            Self::EmptySources
                | Self::InvalidOrdering { .. }
                | Self::InvalidPropertyPath { .. }
                | Self::UnknownType(_)
                | Self::Config(_)
        )
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DuplicateRegistration { entity_type, id } => {
                write!(f, "another {entity_type} instance is registered as {id}")
            }
            Self::NotFound { entity_type, id } => write!(f, "{entity_type} {id} not found"),
            Self::AlreadyManaged { entity_type, id } => {
                write!(f, "{entity_type} {id} is managed by another registry")
            }
            Self::WrongType { expected, found } => {
                write!(f, "expected entity type {expected}, found {found}")
            }
            Self::UnknownType(name) => write!(f, "no registry for type '{name}'"),
            Self::EmptySources => write!(f, "collection requires at least one source type"),
            Self::InvalidOrdering { entity_type, path } => {
                write!(f, "cannot order {entity_type} by unknown property '{path}'")
            }
            Self::InvalidPropertyPath { entity_type, path } => {
                write!(f, "'{path}' is not a valid property path on {entity_type}")
            }
            Self::DanglingReference { path } => {
                write!(f, "property path '{path}' crosses a dangling reference")
            }
            Self::TypeMismatch { expected, found } => {
                write!(f, "expected {expected}, found {} {found:?}", found.kind_name())
            }
            Self::ReadOnlyProperty {
                entity_type,
                property,
            } => write!(f, "{entity_type}.{property} is read-only"),
            Self::MissingFactory(entity_type) => {
                write!(f, "schema for {entity_type} has no factory")
            }
            Self::InvalidIdentifier(raw) => write!(f, "invalid entity identifier: {raw}"),
            Self::Callback(msg) => write!(f, "callback failed: {msg}"),
            Self::Config(msg) => write!(f, "invalid configuration: {msg}"),
        }
    }
}

impl std::error::Error for Error {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_names_the_property() {
        let err = Error::InvalidPropertyPath {
            entity_type: "Person",
            path: "agee".into(),
        };
        assert_eq!(
            err.to_string(),
            "'agee' is not a valid property path on Person"
        );
    }

    #[test]
    fn configuration_errors_are_classified() {
        assert!(Error::EmptySources.is_configuration());
        assert!(
            Error::InvalidOrdering {
                entity_type: "Person",
                path: "x".into()
            }
            .is_configuration()
        );
        assert!(!Error::callback("boom").is_configuration());
    }

    #[test]
    fn type_mismatch_mentions_found_kind() {
        let err = Error::TypeMismatch {
            expected: SemanticType::Int,
            found: Value::Text("abc".into()),
        };
        assert!(err.to_string().contains("text"));
    }
}
