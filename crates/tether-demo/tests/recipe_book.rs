use proptest::prelude::*;
use tether::Value;
use tether_demo::table::render;
use tether_demo::{RecipeBook, RecipeDetail, context, seed};

fn seeded() -> (tether::Context, RecipeBook) {
    let ctx = context();
    let book = RecipeBook::new(&ctx).unwrap();
    seed(&book).unwrap();
    (ctx, book)
}

fn expected_rows(book: &RecipeBook) -> Vec<String> {
    book.recipes()
        .current_objects()
        .iter()
        .map(|r| render(r).unwrap())
        .collect()
}

#[test]
fn list_is_sorted_by_title() {
    let (_ctx, book) = seeded();
    assert_eq!(
        book.rows(),
        [
            "Beef stew (150 min)",
            "Greek salad (10 min)",
            "Miso soup (15 min)",
            "Pancakes (20 min)",
            "Tomato soup (35 min)",
        ]
    );
}

#[test]
fn search_and_quick_toggle_combine() {
    let (_ctx, book) = seeded();
    book.search("SOUP").unwrap();
    assert_eq!(book.rows(), ["Miso soup (15 min)", "Tomato soup (35 min)"]);

    book.toggle_quick().unwrap();
    assert!(book.is_quick());
    assert_eq!(book.rows(), ["Miso soup (15 min)"]);

    book.search("").unwrap();
    assert_eq!(
        book.rows(),
        ["Greek salad (10 min)", "Miso soup (15 min)", "Pancakes (20 min)"]
    );

    book.toggle_quick().unwrap();
    assert_eq!(book.rows().len(), 5);
}

#[test]
fn filter_changes_are_diffs_not_reloads() {
    let (_ctx, book) = seeded();
    let before = book.table().batches();
    book.search("soup").unwrap();
    book.search("miso").unwrap();
    assert_eq!(book.table().batches(), before + 2);
    assert_eq!(book.rows(), ["Miso soup (15 min)"]);
}

#[test]
fn new_recipes_respect_active_filters() {
    let (_ctx, book) = seeded();
    book.toggle_quick().unwrap();
    book.add_recipe("Lentil dal", 45.0).unwrap();
    book.add_recipe("Avocado toast", 5.0).unwrap();
    assert_eq!(book.rows()[0], "Avocado toast (5 min)");
    assert!(!book.rows().iter().any(|r| r.starts_with("Lentil")));
}

#[test]
fn detail_edits_reach_the_list() {
    let (ctx, book) = seeded();
    let stew = book.recipe_at(0).unwrap();
    let detail = RecipeDetail::open(&ctx, &stew).unwrap();
    assert_eq!(detail.title.get(), Value::from("Beef stew"));
    assert_eq!(detail.prep.get(), Value::Float(150.0));
    assert_eq!(detail.prep_label.get(), Value::from("150 min"));

    detail.title.set(Value::from("Irish stew")).unwrap();
    assert_eq!(book.rows()[1], "Irish stew (150 min)");

    detail.prep.set(Value::Float(119.6)).unwrap();
    assert_eq!(stew.with(|r| r.prep), 120.0);
    assert_eq!(detail.prep_label.get(), Value::from("120 min"));
    assert_eq!(book.rows()[1], "Irish stew (120 min)");
    assert_eq!(book.rows(), expected_rows(&book));
}

#[test]
fn model_edits_reach_the_detail_controls() {
    let (ctx, book) = seeded();
    let salad = book.recipe_at(1).unwrap();
    let detail = RecipeDetail::open(&ctx, &salad).unwrap();
    salad.set("instructions", "Chop, toss, serve.").unwrap();
    assert_eq!(detail.instructions.get(), Value::from("Chop, toss, serve."));
    salad.set("prep", 12.0).unwrap();
    assert_eq!(detail.prep.get(), Value::Float(12.0));
    assert_eq!(detail.prep_label.get(), Value::from("12 min"));
}

#[test]
fn closing_detail_releases_bindings() {
    let (ctx, book) = seeded();
    let pancakes = book.recipe_at(3).unwrap();
    let mut detail = RecipeDetail::open(&ctx, &pancakes).unwrap();
    assert!(detail.is_open());
    detail.close();
    detail.close();
    assert!(!detail.is_open());

    detail.title.set(Value::from("Crepes")).unwrap();
    assert_eq!(pancakes.with(|r| r.title.clone()), "Pancakes");
}

#[test]
fn removing_rows_updates_the_table() {
    let (_ctx, book) = seeded();
    assert!(book.remove_at(0).unwrap());
    assert!(!book.remove_at(99).unwrap());
    assert_eq!(book.rows().len(), 4);
    assert_eq!(book.rows()[0], "Greek salad (10 min)");
}

#[derive(Debug, Clone)]
enum Action {
    Add(u8, u8),
    Search(&'static str),
    ToggleQuick,
    SetPrep(usize, u8),
    Remove(usize),
}

fn action() -> impl Strategy<Value = Action> {
    prop_oneof![
        (any::<u8>(), 0u8..120).prop_map(|(t, p)| Action::Add(t, p)),
        prop::sample::select(vec!["", "soup", "s", "a", "stew"]).prop_map(Action::Search),
        Just(Action::ToggleQuick),
        (any::<usize>(), 0u8..120).prop_map(|(i, p)| Action::SetPrep(i, p)),
        any::<usize>().prop_map(Action::Remove),
    ]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn table_always_matches_collection(actions in prop::collection::vec(action(), 1..30)) {
        let (_ctx, book) = seeded();
        for action in actions {
            match action {
                Action::Add(t, p) => {
                    book.add_recipe(&format!("Dish {t:03}"), f64::from(p)).unwrap();
                }
                Action::Search(q) => book.search(q).unwrap(),
                Action::ToggleQuick => book.toggle_quick().unwrap(),
                Action::SetPrep(i, p) => {
                    let len = book.recipes().len();
                    if len > 0 {
                        let recipe = book.recipe_at(i % len).unwrap();
                        recipe.set("prep", f64::from(p)).unwrap();
                    }
                }
                Action::Remove(i) => {
                    let len = book.recipes().len();
                    if len > 0 {
                        book.remove_at(i % len).unwrap();
                    }
                }
            }
            prop_assert_eq!(book.rows(), expected_rows(&book));
        }
    }
}
