#![forbid(unsafe_code)]

//! Live collections: derived, filtered, sorted and sectioned views over one
//! or more registries.
//!
//! - [`LiveCollection`]: the materialized view plus its data-source queries.
//! - [`Predicate`] / [`SortKey`] / [`Sectioning`]: what the view shows and in
//!   which order.
//! - [`CollectionDelegate`]: the batched positional change protocol.
//! - [`diff`](diff::diff): the minimal edit script used on full re-derivation.
//!
//! # Invariants
//!
//! 1. `current_objects()` equals `sort(filter(union(sources)))` as of the
//!    last processed registry event.
//! 2. A single registry event produces at most one batch; a batch with no
//!    changes is not delivered.
//! 3. Ties in the ordering are broken by source order, then by registry
//!    insertion order.

pub mod delegate;
pub mod diff;
mod live;
pub mod predicate;
pub mod section;
pub mod sort;

pub use delegate::{CollectionDelegate, ObjectChange, SectionChange};
pub use diff::{EditScript, diff};
pub use live::{LiveCollection, LiveCollectionBuilder};
pub use predicate::{Comparison, Predicate};
pub use section::{IndexPath, Section, Sectioning};
pub use sort::SortKey;
