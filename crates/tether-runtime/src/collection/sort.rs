#![forbid(unsafe_code)]

//! Sort keys.

use std::cmp::Ordering;

use tether_core::Value;

/// One key of a stable multi-key ordering.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SortKey {
    path: String,
    ascending: bool,
}

impl SortKey {
    pub fn ascending(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            ascending: true,
        }
    }

    pub fn descending(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            ascending: false,
        }
    }

    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    #[must_use]
    pub fn is_ascending(&self) -> bool {
        self.ascending
    }
}

/// Compare two key tuples under per-key directions.
pub(crate) fn compare_keys(a: &[Value], b: &[Value], ascending: &[bool]) -> Ordering {
    a.iter()
        .zip(b)
        .zip(ascending)
        .map(|((x, y), asc)| {
            let ord = x.total_cmp(y);
            if *asc { ord } else { ord.reverse() }
        })
        .find(|ord| ord.is_ne())
        .unwrap_or(Ordering::Equal)
}
