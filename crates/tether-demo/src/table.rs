#![forbid(unsafe_code)]

//! A text "table view" kept current purely from collection callbacks.

use std::cell::{Cell, RefCell};

use tether::prelude::*;
use tracing::trace;

/// One line per row, e.g. `Pancakes (20 min)`.
pub fn render(entity: &EntityRef) -> Result<String> {
    let title = entity.get("title")?;
    let prep = entity.get("prep")?;
    Ok(format!("{title} ({prep} min)"))
}

/// Mirrors a collection's rows by replaying its change batches.
#[derive(Debug, Default)]
pub struct TableView {
    rows: RefCell<Vec<String>>,
    batches: Cell<usize>,
}

impl TableView {
    /// Start from the collection's current contents.
    pub fn load(collection: &LiveCollection) -> Result<Self> {
        let rows = collection
            .current_objects()
            .iter()
            .map(render)
            .collect::<Result<Vec<_>>>()?;
        Ok(Self {
            rows: RefCell::new(rows),
            batches: Cell::new(0),
        })
    }

    #[must_use]
    pub fn rows(&self) -> Vec<String> {
        self.rows.borrow().clone()
    }

    /// Number of change batches applied so far.
    #[must_use]
    pub fn batches(&self) -> usize {
        self.batches.get()
    }
}

impl CollectionDelegate for TableView {
    fn did_change_object(&self, _collection: &LiveCollection, change: &ObjectChange) -> Result<()> {
        let mut rows = self.rows.borrow_mut();
        match change.kind {
            ChangeKind::Delete if change.index < rows.len() => {
                rows.remove(change.index);
            }
            ChangeKind::Insert if change.index <= rows.len() => {
                rows.insert(change.index, render(&change.entity)?);
            }
            ChangeKind::Update => {
                if let Some(row) = rows.get_mut(change.index) {
                    *row = render(&change.entity)?;
                }
            }
            _ => {
                return Err(Error::callback(format!(
                    "{} at {} is out of range for {} rows",
                    change.kind,
                    change.index,
                    rows.len()
                )));
            }
        }
        Ok(())
    }

    fn did_change_content(&self, collection: &LiveCollection) -> Result<()> {
        self.batches.set(self.batches.get() + 1);
        trace!(target: "tether_demo::table", rows = collection.len(), "table updated");
        Ok(())
    }
}
