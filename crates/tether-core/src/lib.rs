#![forbid(unsafe_code)]

//! Core vocabulary of the tether reactive data layer.
//!
//! - [`Value`] / [`SemanticType`]: dynamic property values and their types.
//! - [`Schema`] / [`Model`]: explicit per-type property schemas with typed
//!   accessor pairs, replacing runtime reflection.
//! - [`Entity`] / [`EntityRef`]: shared handles to managed model values.
//! - [`ChangeEvent`] / [`ChangeKind`]: insert/update/delete notifications.
//! - [`EntityRecord`]: the structured snapshot handed to serialization
//!   collaborators.
//! - [`Error`]: the error taxonomy used by every tether crate.
//!
//! Everything here is single-threaded (`Rc`-based):
//! it lives next to UI state on one logical thread of control.

pub mod change;
pub mod entity;
pub mod error;
pub mod id;
pub mod record;
pub mod schema;
pub mod value;

pub use change::{ChangeEvent, ChangeKind};
pub use entity::{AnyEntity, Entity, EntityRef, Registrar, unix_millis};
pub use error::{Error, Result};
pub use id::EntityId;
pub use record::{EntityRecord, instantiate};
pub use schema::{Getter, METADATA_PROPERTIES, Model, Property, Schema, SchemaDescription, Setter};
pub use value::{SemanticType, Value};
