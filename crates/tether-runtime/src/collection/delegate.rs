#![forbid(unsafe_code)]

//! Change records and the delegate protocol of a live collection.

use tether_core::{ChangeKind, EntityRef};

use super::LiveCollection;
use super::section::IndexPath;

/// A positional change to one row.
///
/// `index` and `path` refer to the sequence before the batch for deletes and
/// after the batch for inserts and updates.
#[derive(Debug, Clone)]
pub struct ObjectChange {
    pub kind: ChangeKind,
    pub index: usize,
    pub path: IndexPath,
    pub entity: EntityRef,
}

/// A section appearing or disappearing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SectionChange {
    pub kind: ChangeKind,
    pub index: usize,
    pub name: String,
}

/// Receives a collection's change batches.
///
/// Each batch is `will_change_content`, section changes (deletes highest
/// first, then inserts lowest first), object changes (deletes highest first,
/// inserts lowest first, then updates) and `did_change_content`. The
/// collection's state is already final when the batch starts. Returning `Err`
/// aborts the rest of the batch; the error reaches whoever mutated the
/// registry.
pub trait CollectionDelegate {
    fn will_change_content(&self, _collection: &LiveCollection) -> tether_core::Result<()> {
        Ok(())
    }

    fn did_change_section(
        &self,
        _collection: &LiveCollection,
        _change: &SectionChange,
    ) -> tether_core::Result<()> {
        Ok(())
    }

    fn did_change_object(
        &self,
        _collection: &LiveCollection,
        _change: &ObjectChange,
    ) -> tether_core::Result<()> {
        Ok(())
    }

    fn did_change_content(&self, _collection: &LiveCollection) -> tether_core::Result<()> {
        Ok(())
    }
}

/// One batch, in delivery order.
#[derive(Debug, Default)]
pub(crate) struct Batch {
    pub(crate) sections: Vec<SectionChange>,
    pub(crate) objects: Vec<ObjectChange>,
}

impl Batch {
    pub(crate) fn is_empty(&self) -> bool {
        self.sections.is_empty() && self.objects.is_empty()
    }
}
