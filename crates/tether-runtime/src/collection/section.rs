#![forbid(unsafe_code)]

//! Sectioning of a collection's materialized sequence.

use std::fmt;
use std::ops::Range;
use std::rc::Rc;

use tether_core::EntityRef;

/// How a collection partitions its rows.
#[derive(Clone, Default)]
pub enum Sectioning {
    /// One section holding everything, always present even when empty.
    #[default]
    Single,
    /// One section per distinct value of a property path. Sections are
    /// ordered by that value, ascending.
    Property(String),
    /// One section per distinct name returned by the closure, ordered by name.
    Func(Rc<dyn Fn(&EntityRef) -> String>),
}

impl Sectioning {
    #[must_use]
    pub fn is_single(&self) -> bool {
        matches!(self, Self::Single)
    }
}

impl fmt::Debug for Sectioning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Single => f.write_str("Single"),
            Self::Property(path) => f.debug_tuple("Property").field(path).finish(),
            Self::Func(_) => f.write_str("Func(..)"),
        }
    }
}

/// A contiguous run of rows sharing a section name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Section {
    name: String,
    start: usize,
    len: usize,
}

impl Section {
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Flat index of the first row.
    #[must_use]
    pub fn start(&self) -> usize {
        self.start
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.len
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Flat index range of the section's rows.
    #[must_use]
    pub fn range(&self) -> Range<usize> {
        self.start..self.start + self.len
    }
}

/// Position of a row as (section, item within section).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct IndexPath {
    pub section: usize,
    pub item: usize,
}

impl IndexPath {
    #[must_use]
    pub const fn new(section: usize, item: usize) -> Self {
        Self { section, item }
    }
}

impl fmt::Display for IndexPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {}]", self.section, self.item)
    }
}

/// Group consecutive equal names into sections.
///
/// With `single` set the result is exactly one unnamed section covering
/// `len` rows.
pub(crate) fn collate<'a>(
    names: impl IntoIterator<Item = &'a str>,
    len: usize,
    single: bool,
) -> Vec<Section> {
    if single {
        return vec![Section {
            name: String::new(),
            start: 0,
            len,
        }];
    }
    let mut sections: Vec<Section> = Vec::new();
    for (index, name) in names.into_iter().enumerate() {
        match sections.last_mut() {
            Some(last) if last.name == name => last.len += 1,
            _ => sections.push(Section {
                name: name.to_owned(),
                start: index,
                len: 1,
            }),
        }
    }
    sections
}

/// Map a flat index to its index path.
pub(crate) fn locate(sections: &[Section], index: usize) -> Option<IndexPath> {
    let section = sections.partition_point(|s| s.start + s.len <= index);
    let found = sections.get(section)?;
    found.range().contains(&index).then(|| IndexPath {
        section,
        item: index - found.start,
    })
}

/// Keys identifying sections across two collations: the name plus how many
/// earlier sections share it.
pub(crate) fn section_keys(sections: &[Section]) -> Vec<(String, usize)> {
    let mut seen: ahash::AHashMap<&str, usize> = ahash::AHashMap::new();
    sections
        .iter()
        .map(|s| {
            let count = seen.entry(s.name.as_str()).or_insert(0);
            let key = (s.name.clone(), *count);
            *count += 1;
            key
        })
        .collect()
}
