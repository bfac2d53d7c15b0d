#![forbid(unsafe_code)]

//! Controls and bindings.
//!
//! - [`Observable`]: a shared, version-tracked value with fallible change
//!   notification. [`Control`] is the `Observable<Value>` a UI widget
//!   exposes.
//! - [`Subscription`]: RAII guard that unsubscribes on drop.
//! - [`BindingEngine`] / [`Binding`]: property⇄control, property→callback and
//!   control→callback links with an optional [`Transformer`].
//! - [`BindingScope`]: owns the bindings of one screen and releases them
//!   together.
//!
//! # Architecture
//!
//! Controls keep their subscribers as `Weak` callbacks; registries keep their
//! observers the same way. A binding owns the strong side of every hook it
//! installs, so releasing the binding is enough to disconnect it.
//!
//! # Invariants
//!
//! 1. Version increments exactly once per control write that changes the
//!    value.
//! 2. A binding never re-enters itself: each direction is guarded by its own
//!    in-flight flag.
//! 3. Dropping a [`Subscription`] or the last [`Binding`] handle removes its
//!    callbacks before the next notification.

pub mod binding;
pub mod observable;

pub use binding::{
    Binding, BindingEngine, BindingScope, Change, ChangeHandler, Transformer, transformer,
};
pub use observable::{Control, Observable, Subscription};
