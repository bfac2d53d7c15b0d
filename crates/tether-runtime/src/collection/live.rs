#![forbid(unsafe_code)]

//! The live collection itself.
//!
//! # Architecture
//!
//! A [`LiveCollection`] keeps its rows (entity, source, registry sequence
//! number and cached sort/section keys) in final order and observes every
//! source registry through one weakly-held observer. A registry event is
//! applied incrementally: the affected row is removed and, if it still
//! passes the filter, reinserted by binary search. Replacing the predicate,
//! ordering or sectioning, or any change in a registry reached only through
//! a reference path, re-derives the whole view and diffs old against new.
//!
//! State is committed before the delegate hears about it, and no `RefCell`
//! borrow is held while the delegate, a predicate closure or a registry runs.

use std::cell::RefCell;
use std::cmp::Ordering;
use std::fmt;
use std::rc::{Rc, Weak};

use tether_core::{ChangeEvent, ChangeKind, EntityRef, Error, Model, Result, Value};
use tracing::{debug, debug_span, trace};

use super::delegate::{Batch, CollectionDelegate, ObjectChange, SectionChange};
use super::diff::diff;
use super::predicate::{CompiledPredicate, Predicate};
use super::section::{IndexPath, Section, Sectioning, collate, locate, section_keys};
use super::sort::{SortKey, compare_keys};
use crate::context::{Context, PropertyPath};
use crate::registry::{Registry, RegistryObserver};

// ---------------------------------------------------------------------------
// Plan: validated configuration
// ---------------------------------------------------------------------------

struct Plan {
    predicate: Option<Predicate>,
    sort: Vec<SortKey>,
    sectioning: Sectioning,
    filters: Vec<Option<CompiledPredicate>>,
    sort_paths: Vec<Vec<PropertyPath>>,
    ascending: Vec<bool>,
    section_paths: Vec<Option<PropertyPath>>,
    /// Types reached through reference hops by any path.
    related: Vec<&'static str>,
    /// A source type is itself reached through a reference hop, so an update
    /// to one row can move others.
    self_referential: bool,
}

impl Plan {
    fn compile(
        context: &Context,
        sources: &[Registry],
        predicate: Option<Predicate>,
        sort: Vec<SortKey>,
        sectioning: Sectioning,
    ) -> Result<Self> {
        let mut plan = Self {
            ascending: sort.iter().map(SortKey::is_ascending).collect(),
            predicate,
            sort,
            sectioning,
            filters: Vec::with_capacity(sources.len()),
            sort_paths: Vec::with_capacity(sources.len()),
            section_paths: Vec::with_capacity(sources.len()),
            related: Vec::new(),
            self_referential: false,
        };
        for registry in sources {
            let entity_type = registry.entity_type();
            let filter = plan
                .predicate
                .as_ref()
                .map(|p| p.compile(context, entity_type))
                .transpose()?;
            let keys = plan
                .sort
                .iter()
                .map(|key| {
                    context
                        .validate_path(entity_type, key.path())
                        .map_err(|_| Error::InvalidOrdering {
                            entity_type,
                            path: key.path().to_owned(),
                        })
                })
                .collect::<Result<Vec<_>>>()?;
            let section = match &plan.sectioning {
                Sectioning::Property(path) => Some(context.validate_path(entity_type, path)?),
                _ => None,
            };

            let mut paths: Vec<&PropertyPath> = Vec::new();
            if let Some(filter) = &filter {
                filter.paths(&mut paths);
            }
            paths.extend(keys.iter());
            paths.extend(section.iter());
            for ty in paths.iter().flat_map(|p| p.traversed_types()) {
                if !plan.related.contains(&ty) {
                    plan.related.push(ty);
                }
            }

            plan.filters.push(filter);
            plan.sort_paths.push(keys);
            plan.section_paths.push(section);
        }
        plan.self_referential = sources
            .iter()
            .any(|r| plan.related.contains(&r.entity_type()));
        Ok(plan)
    }

    /// The row for `entity`, or `None` if the filter rejects it.
    fn row(
        &self,
        context: &Context,
        source: usize,
        seq: u64,
        entity: &EntityRef,
    ) -> Result<Option<Row>> {
        if let Some(filter) = &self.filters[source]
            && !filter.evaluate(context, entity)?
        {
            return Ok(None);
        }
        let keys = self.sort_paths[source]
            .iter()
            .map(|path| context.resolve_path(entity, path))
            .collect::<Result<Vec<_>>>()?;
        let (section_key, section) = match &self.sectioning {
            Sectioning::Single => (Value::Null, String::new()),
            Sectioning::Property(_) => {
                let value = match &self.section_paths[source] {
                    Some(path) => context.resolve_path(entity, path)?,
                    None => Value::Null,
                };
                let name = value.to_string();
                (value, name)
            }
            Sectioning::Func(f) => {
                let name = f(entity);
                (Value::Text(name.clone()), name)
            }
        };
        Ok(Some(Row {
            entity: entity.clone(),
            source,
            seq,
            section_key,
            section,
            keys,
        }))
    }

    fn order(&self, a: &Row, b: &Row) -> Ordering {
        a.section_key
            .total_cmp(&b.section_key)
            .then_with(|| compare_keys(&a.keys, &b.keys, &self.ascending))
            .then(a.source.cmp(&b.source))
            .then(a.seq.cmp(&b.seq))
    }

    fn derive(&self, context: &Context, sources: &[Registry]) -> Result<Vec<Row>> {
        let mut rows = Vec::new();
        for (source, registry) in sources.iter().enumerate() {
            for (seq, entity) in registry.entries() {
                if let Some(row) = self.row(context, source, seq, &entity)? {
                    rows.push(row);
                }
            }
        }
        rows.sort_by(|a, b| self.order(a, b));
        Ok(rows)
    }
}

struct Row {
    entity: EntityRef,
    source: usize,
    seq: u64,
    section_key: Value,
    section: String,
    keys: Vec<Value>,
}

impl Row {
    fn diff_key(&self) -> (usize, String) {
        (self.entity.addr(), self.section.clone())
    }

    fn same_keys(&self, other: &Row) -> bool {
        self.keys.len() == other.keys.len()
            && self
                .keys
                .iter()
                .zip(&other.keys)
                .all(|(a, b)| a.total_cmp(b) == Ordering::Equal)
    }
}

// ---------------------------------------------------------------------------
// Shared state
// ---------------------------------------------------------------------------

struct State {
    plan: Rc<Plan>,
    rows: Vec<Row>,
    snapshot: Rc<[EntityRef]>,
    sections: Vec<Section>,
}

impl State {
    fn new(plan: Rc<Plan>, rows: Vec<Row>) -> Self {
        let mut state = Self {
            plan,
            rows,
            snapshot: Rc::from(Vec::new()),
            sections: Vec::new(),
        };
        state.refresh();
        state
    }

    fn refresh(&mut self) {
        self.snapshot = self.rows.iter().map(|r| r.entity.clone()).collect();
        self.sections = collate(
            self.rows.iter().map(|r| r.section.as_str()),
            self.rows.len(),
            self.plan.sectioning.is_single(),
        );
    }

    fn position_of(&self, source: usize, entity: &EntityRef) -> Option<usize> {
        let id = entity.id();
        self.rows
            .iter()
            .position(|r| r.source == source && r.entity.id() == id)
    }

    fn insertion_point(&self, row: &Row) -> usize {
        self.rows
            .partition_point(|r| self.plan.order(r, row) == Ordering::Less)
    }

    fn path_of(&self, index: usize) -> IndexPath {
        locate(&self.sections, index).unwrap_or(IndexPath::new(0, index))
    }
}

fn section_changes(old: &[Section], new: &[Section], single: bool) -> Vec<SectionChange> {
    if single {
        return Vec::new();
    }
    let script = diff(&section_keys(old), &section_keys(new));
    let deletes = script.deletes.iter().map(|&i| SectionChange {
        kind: ChangeKind::Delete,
        index: i,
        name: old[i].name().to_owned(),
    });
    let inserts = script.inserts.iter().map(|&j| SectionChange {
        kind: ChangeKind::Insert,
        index: j,
        name: new[j].name().to_owned(),
    });
    deletes.chain(inserts).collect()
}

struct SourceObserver {
    collection: Weak<CollectionShared>,
}

impl RegistryObserver for SourceObserver {
    fn on_change(&self, registry: &Registry, event: &ChangeEvent) -> Result<()> {
        match self.collection.upgrade() {
            Some(shared) => LiveCollection { shared }.handle(registry, event),
            None => Ok(()),
        }
    }
}

struct CollectionShared {
    context: Context,
    sources: Vec<Registry>,
    related: RefCell<Vec<Registry>>,
    state: RefCell<State>,
    delegate: RefCell<Option<Weak<dyn CollectionDelegate>>>,
    observer: Rc<SourceObserver>,
}

impl Drop for CollectionShared {
    fn drop(&mut self) {
        for registry in self.sources.iter().chain(self.related.get_mut().iter()) {
            registry.unsubscribe(&self.observer);
        }
    }
}

// ---------------------------------------------------------------------------
// LiveCollection
// ---------------------------------------------------------------------------

/// A derived, always-current view over one or more registries.
///
/// Clones share the same view. The view stops observing its registries when
/// the last handle is dropped.
#[derive(Clone)]
pub struct LiveCollection {
    shared: Rc<CollectionShared>,
}

impl LiveCollection {
    /// Start configuring a collection over registries of `context`.
    #[must_use]
    pub fn builder(context: &Context) -> LiveCollectionBuilder {
        LiveCollectionBuilder {
            context: context.clone(),
            sources: Vec::new(),
            error: None,
            predicates: Vec::new(),
            sort: Vec::new(),
            sectioning: Sectioning::Single,
        }
    }

    // -----------------------------------------------------------------------
    // Contents
    // -----------------------------------------------------------------------

    /// The materialized sequence. Cheap: the snapshot is maintained on every
    /// change, not on read.
    #[must_use]
    pub fn current_objects(&self) -> Rc<[EntityRef]> {
        Rc::clone(&self.shared.state.borrow().snapshot)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.shared.state.borrow().rows.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.shared.state.borrow().rows.is_empty()
    }

    /// Entity at a flat index.
    #[must_use]
    pub fn get(&self, index: usize) -> Option<EntityRef> {
        self.shared.state.borrow().snapshot.get(index).cloned()
    }

    /// Flat index of an entity instance.
    #[must_use]
    pub fn index_of(&self, entity: &EntityRef) -> Option<usize> {
        self.shared
            .state
            .borrow()
            .snapshot
            .iter()
            .position(|e| e.same_instance(entity))
    }

    /// Typed copy of the contents, skipping rows of other types.
    #[must_use]
    pub fn objects_of<T: Model>(&self) -> Vec<tether_core::Entity<T>> {
        self.current_objects()
            .iter()
            .filter_map(|entity| entity.downcast::<T>())
            .collect()
    }

    /// Type names of the sources, in source order.
    #[must_use]
    pub fn source_types(&self) -> Vec<&'static str> {
        self.shared.sources.iter().map(Registry::entity_type).collect()
    }

    #[must_use]
    pub fn context(&self) -> &Context {
        &self.shared.context
    }

    // -----------------------------------------------------------------------
    // Data source
    // -----------------------------------------------------------------------

    /// One for unsectioned collections, even when empty.
    #[must_use]
    pub fn number_of_sections(&self) -> usize {
        self.shared.state.borrow().sections.len()
    }

    /// Zero for an out-of-range section.
    #[must_use]
    pub fn number_of_objects_in_section(&self, section: usize) -> usize {
        self.shared
            .state
            .borrow()
            .sections
            .get(section)
            .map_or(0, Section::len)
    }

    #[must_use]
    pub fn sections(&self) -> Vec<Section> {
        self.shared.state.borrow().sections.clone()
    }

    #[must_use]
    pub fn index_path_of(&self, entity: &EntityRef) -> Option<IndexPath> {
        let index = self.index_of(entity)?;
        locate(&self.shared.state.borrow().sections, index)
    }

    #[must_use]
    pub fn object_at(&self, path: IndexPath) -> Option<EntityRef> {
        let state = self.shared.state.borrow();
        let section = state.sections.get(path.section)?;
        if path.item >= section.len() {
            return None;
        }
        state.snapshot.get(section.start() + path.item).cloned()
    }

    // -----------------------------------------------------------------------
    // Configuration
    // -----------------------------------------------------------------------

    #[must_use]
    pub fn predicate(&self) -> Option<Predicate> {
        self.plan().predicate.clone()
    }

    #[must_use]
    pub fn sort_keys(&self) -> Vec<SortKey> {
        self.plan().sort.clone()
    }

    #[must_use]
    pub fn sectioning(&self) -> Sectioning {
        self.plan().sectioning.clone()
    }

    /// Replace the filter and re-derive, delivering a minimal diff.
    pub fn set_predicate(&self, predicate: Option<Predicate>) -> Result<()> {
        let current = self.plan();
        let plan = Plan::compile(
            &self.shared.context,
            &self.shared.sources,
            predicate,
            current.sort.clone(),
            current.sectioning.clone(),
        )?;
        self.rederive(Some(plan), None)
    }

    /// Replace the ordering and re-derive, delivering a minimal diff.
    pub fn set_sort(&self, sort: Vec<SortKey>) -> Result<()> {
        let current = self.plan();
        let plan = Plan::compile(
            &self.shared.context,
            &self.shared.sources,
            current.predicate.clone(),
            sort,
            current.sectioning.clone(),
        )?;
        self.rederive(Some(plan), None)
    }

    /// Replace the sectioning and re-derive.
    pub fn set_sectioning(&self, sectioning: Sectioning) -> Result<()> {
        let current = self.plan();
        let plan = Plan::compile(
            &self.shared.context,
            &self.shared.sources,
            current.predicate.clone(),
            current.sort.clone(),
            sectioning,
        )?;
        self.rederive(Some(plan), None)
    }

    /// Re-derive from the registries with the current configuration.
    ///
    /// Needed only after changes the collection cannot observe, such as a
    /// predicate closure whose captured state changed.
    pub fn collate(&self) -> Result<()> {
        self.rederive(None, None)
    }

    /// Attach the delegate. It is held weakly.
    pub fn set_delegate<D: CollectionDelegate + 'static>(&self, delegate: &Rc<D>) {
        let weak: Weak<dyn CollectionDelegate> = Rc::downgrade(delegate) as Weak<D>;
        *self.shared.delegate.borrow_mut() = Some(weak);
    }

    pub fn clear_delegate(&self) {
        self.shared.delegate.borrow_mut().take();
    }

    fn plan(&self) -> Rc<Plan> {
        Rc::clone(&self.shared.state.borrow().plan)
    }

    // -----------------------------------------------------------------------
    // Change processing
    // -----------------------------------------------------------------------

    fn handle(&self, registry: &Registry, event: &ChangeEvent) -> Result<()> {
        let plan = self.plan();
        let source = self.shared.sources.iter().position(|s| s.same(registry));
        match source {
            Some(source) if !plan.self_referential => self.apply(&plan, source, registry, event),
            Some(_) if event.kind == ChangeKind::Update => {
                self.rederive(None, Some(&event.entity))
            }
            _ => self.rederive(None, None),
        }
    }

    /// Incremental path for one event from a source registry.
    fn apply(
        &self,
        plan: &Plan,
        source: usize,
        registry: &Registry,
        event: &ChangeEvent,
    ) -> Result<()> {
        let entity = &event.entity;
        let candidate = match (event.kind, registry.sequence_of(entity.id())) {
            (ChangeKind::Delete, _) | (_, None) => None,
            (_, Some(seq)) => plan.row(&self.shared.context, source, seq, entity)?,
        };

        let batch = {
            let mut state = self.shared.state.borrow_mut();
            let old_sections = state.sections.clone();
            let old_position = state.position_of(source, entity);
            let mut deleted = None;
            let mut inserted = None;
            let mut updated = None;
            match (old_position, candidate) {
                (None, None) => return Ok(()),
                (Some(p), None) => {
                    let old = state.rows.remove(p);
                    deleted = Some((p, old.entity));
                }
                (None, Some(row)) => {
                    let q = state.insertion_point(&row);
                    state.rows.insert(q, row);
                    inserted = Some(q);
                }
                (Some(p), Some(row)) => {
                    let old = state.rows.remove(p);
                    let q = state.insertion_point(&row);
                    let same_section = old.section == row.section;
                    state.rows.insert(q, row);
                    if q == p && same_section {
                        updated = Some(q);
                    } else {
                        deleted = Some((p, old.entity));
                        inserted = Some(q);
                    }
                }
            }
            state.refresh();

            let mut batch = Batch {
                sections: section_changes(
                    &old_sections,
                    &state.sections,
                    plan.sectioning.is_single(),
                ),
                objects: Vec::with_capacity(2),
            };
            if let Some((index, entity)) = deleted {
                let path = locate(&old_sections, index).unwrap_or(IndexPath::new(0, index));
                batch.objects.push(ObjectChange {
                    kind: ChangeKind::Delete,
                    index,
                    path,
                    entity,
                });
            }
            for (kind, index) in [(ChangeKind::Insert, inserted), (ChangeKind::Update, updated)] {
                if let Some(index) = index {
                    batch.objects.push(ObjectChange {
                        kind,
                        index,
                        path: state.path_of(index),
                        entity: entity.clone(),
                    });
                }
            }
            batch
        };
        self.deliver(&batch)
    }

    /// Full re-derivation with a minimal diff, optionally under a new plan.
    ///
    /// `touched` is a source row whose own properties changed; if it stays in
    /// place it is reported as updated even when its keys did not move.
    fn rederive(&self, replacement: Option<Plan>, touched: Option<&EntityRef>) -> Result<()> {
        let _span = debug_span!(target: "tether::collection", "rederive").entered();
        let replanned = replacement.is_some();
        let plan = match replacement {
            Some(plan) => Rc::new(plan),
            None => self.plan(),
        };
        let rows = plan.derive(&self.shared.context, &self.shared.sources)?;

        let batch = {
            let mut state = self.shared.state.borrow_mut();
            let old_keys: Vec<(usize, String)> = state.rows.iter().map(Row::diff_key).collect();
            let new_keys: Vec<(usize, String)> = rows.iter().map(Row::diff_key).collect();
            let script = diff(&old_keys, &new_keys);

            let mut objects = Vec::with_capacity(script.deletes.len() + script.inserts.len());
            for &i in &script.deletes {
                objects.push(ObjectChange {
                    kind: ChangeKind::Delete,
                    index: i,
                    path: state.path_of(i),
                    entity: state.rows[i].entity.clone(),
                });
            }
            let changed: Vec<usize> = script
                .kept
                .iter()
                .filter(|&&(i, j)| {
                    !state.rows[i].same_keys(&rows[j])
                        || touched.is_some_and(|t| t.addr() == rows[j].entity.addr())
                })
                .map(|&(_, j)| j)
                .collect();

            let old_sections = std::mem::take(&mut state.sections);
            let was_single = state.plan.sectioning.is_single();
            state.plan = Rc::clone(&plan);
            state.rows = rows;
            state.refresh();

            for &j in &script.inserts {
                objects.push(ObjectChange {
                    kind: ChangeKind::Insert,
                    index: j,
                    path: state.path_of(j),
                    entity: state.rows[j].entity.clone(),
                });
            }
            for j in changed {
                objects.push(ObjectChange {
                    kind: ChangeKind::Update,
                    index: j,
                    path: state.path_of(j),
                    entity: state.rows[j].entity.clone(),
                });
            }
            let sections = if was_single && plan.sectioning.is_single() {
                Vec::new()
            } else {
                section_changes(&old_sections, &state.sections, false)
            };
            debug!(
                target: "tether::collection",
                rows = state.rows.len(),
                deletes = script.deletes.len(),
                inserts = script.inserts.len(),
                "re-derived"
            );
            Batch { sections, objects }
        };
        if replanned {
            self.resubscribe_related();
        }
        self.deliver(&batch)
    }

    fn resubscribe_related(&self) {
        let plan = self.plan();
        let sources = &self.shared.sources;
        let wanted: Vec<Registry> = plan
            .related
            .iter()
            .filter_map(|ty| self.shared.context.registry_named(ty).ok())
            .filter(|r| !sources.iter().any(|s| s.same(r)))
            .collect();
        let previous = std::mem::replace(&mut *self.shared.related.borrow_mut(), wanted.clone());
        for registry in previous {
            registry.unsubscribe(&self.shared.observer);
        }
        for registry in wanted {
            registry.subscribe(&self.shared.observer);
        }
    }

    fn delegate(&self) -> Option<Rc<dyn CollectionDelegate>> {
        self.shared.delegate.borrow().as_ref().and_then(Weak::upgrade)
    }

    fn deliver(&self, batch: &Batch) -> Result<()> {
        if batch.is_empty() {
            return Ok(());
        }
        let Some(delegate) = self.delegate() else {
            return Ok(());
        };
        trace!(
            target: "tether::collection",
            sections = batch.sections.len(),
            objects = batch.objects.len(),
            "delivering batch"
        );
        delegate.will_change_content(self)?;
        for change in &batch.sections {
            delegate.did_change_section(self, change)?;
        }
        for change in &batch.objects {
            delegate.did_change_object(self, change)?;
        }
        delegate.did_change_content(self)
    }
}

impl fmt::Debug for LiveCollection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let plan = self.plan();
        f.debug_struct("LiveCollection")
            .field("sources", &self.source_types())
            .field("predicate", &plan.predicate)
            .field("sort", &plan.sort)
            .field("sectioning", &plan.sectioning)
            .field("len", &self.len())
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Builder
// ---------------------------------------------------------------------------

/// Configures and builds a [`LiveCollection`].
///
/// Every problem (unknown source type, bad path, bad sort key) is reported by
/// [`LiveCollectionBuilder::build`].
#[must_use = "a builder does nothing until build() is called"]
pub struct LiveCollectionBuilder {
    context: Context,
    sources: Vec<Registry>,
    error: Option<Error>,
    predicates: Vec<Predicate>,
    sort: Vec<SortKey>,
    sectioning: Sectioning,
}

impl LiveCollectionBuilder {
    /// Add the registry of `T` as a source.
    pub fn source<T: Model>(self) -> Self {
        let registry = self.context.registry::<T>();
        self.add_source(registry)
    }

    /// Add a source by type name.
    pub fn source_named(mut self, name: &str) -> Self {
        match self.context.registry_named(name) {
            Ok(registry) => self.add_source(registry),
            Err(err) => {
                self.error.get_or_insert(err);
                self
            }
        }
    }

    fn add_source(mut self, registry: Registry) -> Self {
        if !self.sources.iter().any(|s| s.same(&registry)) {
            self.sources.push(registry);
        }
        self
    }

    /// Add a filter. Several filters must all pass.
    pub fn predicate(mut self, predicate: Predicate) -> Self {
        self.predicates.push(predicate);
        self
    }

    /// Append a sort key.
    pub fn sort_by(mut self, key: SortKey) -> Self {
        self.sort.push(key);
        self
    }

    /// Section by the value of a property path.
    pub fn section_by_property(mut self, path: impl Into<String>) -> Self {
        self.sectioning = Sectioning::Property(path.into());
        self
    }

    /// Section by a computed name.
    pub fn section_by(mut self, f: impl Fn(&EntityRef) -> String + 'static) -> Self {
        self.sectioning = Sectioning::Func(Rc::new(f));
        self
    }

    /// Validate, materialize and start observing.
    pub fn build(mut self) -> Result<LiveCollection> {
        if let Some(err) = self.error {
            return Err(err);
        }
        if self.sources.is_empty() {
            return Err(Error::EmptySources);
        }
        let predicate = match self.predicates.len() {
            0 => None,
            1 => self.predicates.pop(),
            _ => Some(Predicate::And(self.predicates)),
        };
        let plan = Plan::compile(
            &self.context,
            &self.sources,
            predicate,
            self.sort,
            self.sectioning,
        )?;
        let rows = plan.derive(&self.context, &self.sources)?;
        let state = State::new(Rc::new(plan), rows);

        let shared = Rc::new_cyclic(|weak| CollectionShared {
            context: self.context,
            sources: self.sources,
            related: RefCell::new(Vec::new()),
            state: RefCell::new(state),
            delegate: RefCell::new(None),
            observer: Rc::new(SourceObserver {
                collection: weak.clone(),
            }),
        });
        for registry in &shared.sources {
            registry.subscribe(&shared.observer);
        }
        let collection = LiveCollection { shared };
        collection.resubscribe_related();
        debug!(
            target: "tether::collection",
            sources = ?collection.source_types(),
            len = collection.len(),
            "collection built"
        );
        Ok(collection)
    }
}

impl fmt::Debug for LiveCollectionBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LiveCollectionBuilder")
            .field(
                "sources",
                &self.sources.iter().map(Registry::entity_type).collect::<Vec<_>>(),
            )
            .field("predicates", &self.predicates)
            .field("sort", &self.sort)
            .field("sectioning", &self.sectioning)
            .finish()
    }
}
