#![forbid(unsafe_code)]

//! Public facade of the tether reactive data layer.
//!
//! [`tether_core`] carries the entity model (schemas, values, change events);
//! [`tether_runtime`] carries registries, live collections and bindings. Most
//! applications only need the [`prelude`].
//!
//! ```ignore
//! use tether::prelude::*;
//!
//! let ctx = Context::default();
//! let recipes = LiveCollection::builder(&ctx)
//!     .source::<Recipe>()
//!     .sort_by(SortKey::ascending("title"))
//!     .build()?;
//! ```

pub use tether_core;
pub use tether_core::{
    ChangeEvent, ChangeKind, Entity, EntityId, EntityRecord, EntityRef, Error, Model, Result,
    Schema, SemanticType, Value,
};

#[cfg(feature = "runtime")]
pub use tether_runtime;
#[cfg(feature = "runtime")]
pub use tether_runtime::{
    Binding, BindingEngine, BindingScope, Change, CollectionDelegate, Context, ContextConfig,
    Control, IndexPath, LiveCollection, ObjectChange, Observable, Predicate, Registry,
    RegistryObserver, SectionChange, Sectioning, SortKey, Subscription, Transformer,
};

/// Everything a typical screen needs.
pub mod prelude {
    pub use tether_core::{
        ChangeEvent, ChangeKind, Entity, EntityId, EntityRef, Error, Model, Result, Schema,
        SemanticType, Value,
    };

    #[cfg(feature = "runtime")]
    pub use tether_runtime::{
        BindingEngine, BindingScope, Change, CollectionDelegate, Context, Control, IndexPath,
        LiveCollection, ObjectChange, Predicate, SectionChange, SortKey, transformer,
    };
}
