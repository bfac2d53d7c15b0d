#![forbid(unsafe_code)]

//! Version-tracked shared values with fallible change notification.
//!
//! [`Observable<T>`] is the control side of a binding: a text field, a
//! toggle, a slider. [`Control`] is the dynamic-value alias the binding
//! engine works with.
//!
//! # Invariants
//!
//! 1. Version increments exactly once per `set` that changes the value.
//! 2. Subscribers are notified in registration order, with no borrow of the
//!    observable held, so a subscriber may read or write it.
//! 3. Setting a value equal to the current one is a no-op.
//! 4. Dropping a [`Subscription`] removes the callback before the next
//!    notification.
//!
//! # Failure Modes
//!
//! - A subscriber returning `Err` aborts the remaining fanout and the error is
//!   returned from [`Observable::set`]. The new value stays committed.

use std::any::Any;
use std::cell::RefCell;
use std::rc::{Rc, Weak};

use tether_core::{Result, Value};

type Callback<T> = dyn Fn(&T) -> Result<()>;

struct ObservableInner<T> {
    value: T,
    version: u64,
    subscribers: Vec<Weak<Callback<T>>>,
}

/// Shared, version-tracked value. Clones share state.
pub struct Observable<T> {
    inner: Rc<RefCell<ObservableInner<T>>>,
}

/// A UI-control value as seen by the binding engine.
pub type Control = Observable<Value>;

impl<T> Clone for Observable<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<T: std::fmt::Debug> std::fmt::Debug for Observable<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.inner.borrow();
        f.debug_struct("Observable")
            .field("value", &inner.value)
            .field("version", &inner.version)
            .finish()
    }
}

impl<T: Default + Clone + PartialEq + 'static> Default for Observable<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

impl<T: Clone + PartialEq + 'static> Observable<T> {
    #[must_use]
    pub fn new(value: T) -> Self {
        Self {
            inner: Rc::new(RefCell::new(ObservableInner {
                value,
                version: 0,
                subscribers: Vec::new(),
            })),
        }
    }

    /// Clone of the current value.
    #[must_use]
    pub fn get(&self) -> T {
        self.inner.borrow().value.clone()
    }

    /// Borrow the current value.
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        f(&self.inner.borrow().value)
    }

    #[must_use]
    pub fn version(&self) -> u64 {
        self.inner.borrow().version
    }

    /// Replace the value and notify subscribers if it changed.
    pub fn set(&self, value: T) -> Result<()> {
        let (current, subscribers) = {
            let mut inner = self.inner.borrow_mut();
            if inner.value == value {
                return Ok(());
            }
            inner.value = value;
            inner.version += 1;
            inner.subscribers.retain(|w| w.strong_count() > 0);
            let live: Vec<Rc<Callback<T>>> =
                inner.subscribers.iter().filter_map(Weak::upgrade).collect();
            (inner.value.clone(), live)
        };
        for callback in subscribers {
            callback(&current)?;
        }
        Ok(())
    }

    /// Modify the value in place, notifying if the result differs.
    pub fn update(&self, f: impl FnOnce(&mut T)) -> Result<()> {
        let mut next = self.get();
        f(&mut next);
        self.set(next)
    }

    /// Register a callback invoked after every change.
    ///
    /// The callback lives as long as the returned [`Subscription`].
    pub fn subscribe(&self, callback: impl Fn(&T) -> Result<()> + 'static) -> Subscription {
        let strong: Rc<Callback<T>> = Rc::new(callback);
        self.inner
            .borrow_mut()
            .subscribers
            .push(Rc::downgrade(&strong));
        Subscription::new(strong)
    }

    /// Number of live subscribers.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.inner
            .borrow()
            .subscribers
            .iter()
            .filter(|w| w.strong_count() > 0)
            .count()
    }

    /// Whether both handles share the same state.
    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    /// Address of the shared state, usable as an identity key.
    #[must_use]
    pub fn addr(&self) -> usize {
        Rc::as_ptr(&self.inner).cast::<()>() as usize
    }
}

// ---------------------------------------------------------------------------
// Subscription
// ---------------------------------------------------------------------------

/// RAII guard keeping a callback or observer registered.
///
/// Dropping the guard (or calling [`Subscription::unsubscribe`]) detaches it;
/// the owner prunes the dead entry lazily.
#[must_use = "dropping a Subscription unsubscribes immediately"]
pub struct Subscription {
    guard: Option<Box<dyn Any>>,
}

impl Subscription {
    /// Wrap the strong half of a weakly-held callback.
    pub fn new(guard: impl Any) -> Self {
        Self {
            guard: Some(Box::new(guard)),
        }
    }

    /// Whether the subscription is still held.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.guard.is_some()
    }

    /// Detach now. Same as dropping.
    pub fn unsubscribe(mut self) {
        self.guard.take();
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("active", &self.is_active())
            .finish()
    }
}
