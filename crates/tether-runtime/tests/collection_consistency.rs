//! Property test: after every registry mutation the collection equals the
//! filtered, sorted registry contents, and replaying the delegate's events on
//! a mirror of the previous contents reproduces it.

mod common;

use std::cell::RefCell;
use std::cmp::Ordering;
use std::rc::Rc;

use common::{Person, context, person};
use proptest::prelude::*;
use tether_runtime::tether_core::{ChangeKind, EntityRef, Result, Value};
use tether_runtime::{CollectionDelegate, LiveCollection, ObjectChange, Predicate, SortKey};

const NAMES: [&str; 6] = ["ann", "bob", "cy", "dee", "eve", "fay"];

#[derive(Debug, Clone)]
enum Op {
    Add(usize, i64),
    Remove(usize),
    Age(usize, i64),
    Rename(usize, usize),
    Threshold(i64),
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        3 => (0..NAMES.len(), 0i64..60).prop_map(|(n, a)| Op::Add(n, a)),
        1 => any::<usize>().prop_map(Op::Remove),
        3 => (any::<usize>(), 0i64..60).prop_map(|(i, a)| Op::Age(i, a)),
        2 => (any::<usize>(), 0..NAMES.len()).prop_map(|(i, n)| Op::Rename(i, n)),
        1 => (0i64..60).prop_map(Op::Threshold),
    ]
}

/// Replays object events on a copy of the contents.
#[derive(Default)]
struct Mirror {
    rows: RefCell<Vec<EntityRef>>,
}

impl CollectionDelegate for Mirror {
    fn did_change_object(&self, _collection: &LiveCollection, change: &ObjectChange) -> Result<()> {
        let mut rows = self.rows.borrow_mut();
        match change.kind {
            ChangeKind::Delete => {
                rows.remove(change.index);
            }
            ChangeKind::Insert => rows.insert(change.index, change.entity.clone()),
            ChangeKind::Update => {}
        }
        Ok(())
    }
}

fn text(entity: &EntityRef, property: &str) -> String {
    entity.get(property).unwrap().to_string()
}

fn age(entity: &EntityRef) -> i64 {
    entity.get("age").unwrap().try_int().unwrap()
}

/// age ascending, name descending, registration order.
fn expected(ctx: &tether_runtime::Context, threshold: i64) -> Vec<usize> {
    let mut rows: Vec<EntityRef> = ctx
        .registry::<Person>()
        .objects()
        .into_iter()
        .filter(|e| age(e) >= threshold)
        .collect();
    rows.sort_by(|a, b| {
        age(a)
            .cmp(&age(b))
            .then_with(|| match text(a, "name").cmp(&text(b, "name")) {
                Ordering::Less => Ordering::Greater,
                Ordering::Greater => Ordering::Less,
                Ordering::Equal => Ordering::Equal,
            })
    });
    rows.iter().map(EntityRef::addr).collect()
}

fn addrs(rows: &[EntityRef]) -> Vec<usize> {
    rows.iter().map(EntityRef::addr).collect()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(96))]

    #[test]
    fn collection_matches_filtered_sorted_registry(ops in prop::collection::vec(op(), 1..40)) {
        let ctx = context();
        let mut threshold = 20;
        let people = LiveCollection::builder(&ctx)
            .source::<Person>()
            .predicate(Predicate::ge("age", threshold))
            .sort_by(SortKey::ascending("age"))
            .sort_by(SortKey::descending("name"))
            .build()
            .unwrap();
        let mirror = Rc::new(Mirror::default());
        people.set_delegate(&mirror);
        let registry = ctx.registry::<Person>();

        for op in ops {
            let existing = registry.objects();
            let pick = |i: usize| (!existing.is_empty()).then(|| existing[i % existing.len()].clone());
            match op {
                Op::Add(n, a) => ctx.save(&person(NAMES[n], a)).unwrap(),
                Op::Remove(i) => {
                    if let Some(e) = pick(i) {
                        registry.deregister(e).unwrap();
                    }
                }
                Op::Age(i, a) => {
                    if let Some(e) = pick(i) {
                        e.set("age", a).unwrap();
                    }
                }
                Op::Rename(i, n) => {
                    if let Some(e) = pick(i) {
                        e.set("name", Value::from(NAMES[n])).unwrap();
                    }
                }
                Op::Threshold(t) => {
                    threshold = t;
                    people.set_predicate(Some(Predicate::ge("age", t))).unwrap();
                }
            }

            let current = addrs(&people.current_objects());
            prop_assert_eq!(&current, &expected(&ctx, threshold));
            prop_assert_eq!(&addrs(&mirror.rows.borrow()), &current);
            prop_assert_eq!(people.number_of_sections(), 1);
            prop_assert_eq!(people.number_of_objects_in_section(0), current.len());
        }
    }
}
