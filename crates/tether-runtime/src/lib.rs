#![forbid(unsafe_code)]

//! Runtime of the tether reactive data layer.
//!
//! - [`Registry`]: the per-type store of managed entities. Every insert,
//!   property update and delete is broadcast to its observers.
//! - [`Context`]: owns one registry per model type and resolves dotted
//!   property paths across references.
//! - [`LiveCollection`]: a filtered, sorted, sectioned view over one or more
//!   registries that reports minimal positional diffs to a delegate.
//! - [`BindingEngine`]: two-way property⇄control synchronization with an
//!   optional transformer and loop suppression.
//!
//! # Example
//!
//! ```ignore
//! let ctx = Context::default();
//! let people = LiveCollection::builder(&ctx)
//!     .source::<Person>()
//!     .predicate(Predicate::gt("age", 26))
//!     .sort_by(SortKey::ascending("name"))
//!     .build()?;
//!
//! ctx.save(&Entity::new(Person::new("Alice", 30)))?;
//! assert_eq!(people.len(), 1);
//! ```

pub mod collection;
pub mod config;
pub mod context;
pub mod reactive;
pub mod registry;

pub use collection::{
    CollectionDelegate, Comparison, EditScript, IndexPath, LiveCollection, LiveCollectionBuilder,
    ObjectChange, Predicate, Section, SectionChange, Sectioning, SortKey,
};
pub use config::{ContextConfig, DEFAULT_MAX_PATH_DEPTH};
pub use context::{Context, PropertyPath, Segment};
pub use reactive::{
    Binding, BindingEngine, BindingScope, Change, ChangeHandler, Control, Observable,
    Subscription, Transformer, transformer,
};
pub use registry::{Registry, RegistryObserver};

pub use tether_core;
