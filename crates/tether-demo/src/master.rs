#![forbid(unsafe_code)]

//! The recipe list: search field, "quick recipes" toggle and table.

use std::rc::Rc;

use tether::prelude::*;
use tracing::debug;

use crate::recipe::{QUICK_MINUTES, Recipe};
use crate::table::TableView;

/// Master screen of the recipe book.
pub struct RecipeBook {
    context: Context,
    recipes: LiveCollection,
    table: Rc<TableView>,
    search: Control,
    quick: Control,
    scope: BindingScope,
}

impl RecipeBook {
    pub fn new(context: &Context) -> Result<Self> {
        let recipes = LiveCollection::builder(context)
            .source::<Recipe>()
            .sort_by(SortKey::ascending("title"))
            .build()?;
        let table = Rc::new(TableView::load(&recipes)?);
        recipes.set_delegate(&table);

        let search = Control::new(Value::from(""));
        let quick = Control::new(Value::Bool(false));
        let mut scope = BindingScope::new(context);
        for control in [&search, &quick] {
            let (recipes, search, quick) = (recipes.clone(), search.clone(), quick.clone());
            scope.observe_control(control, move |_| refilter(&recipes, &search, &quick));
        }

        Ok(Self {
            context: context.clone(),
            recipes,
            table,
            search,
            quick,
            scope,
        })
    }

    /// Create and register a recipe.
    pub fn add_recipe(&self, title: &str, prep: f64) -> Result<Entity<Recipe>> {
        let recipe = Entity::new(Recipe::new(title, prep));
        self.context.save(&recipe)?;
        debug!(target: "tether_demo", title, prep, "recipe added");
        Ok(recipe)
    }

    /// Remove the recipe shown at `index`. Returns whether a row existed.
    pub fn remove_at(&self, index: usize) -> Result<bool> {
        match self.recipe_at(index) {
            Some(recipe) => self.context.remove(&recipe).map(|()| true),
            None => Ok(false),
        }
    }

    pub fn search(&self, text: &str) -> Result<()> {
        self.search.set(Value::from(text))
    }

    pub fn toggle_quick(&self) -> Result<()> {
        let next = !self.is_quick();
        self.quick.set(Value::Bool(next))
    }

    #[must_use]
    pub fn is_quick(&self) -> bool {
        self.quick.with(|v| matches!(v, Value::Bool(true)))
    }

    #[must_use]
    pub fn recipe_at(&self, index: usize) -> Option<Entity<Recipe>> {
        self.recipes.get(index)?.downcast::<Recipe>()
    }

    #[must_use]
    pub fn rows(&self) -> Vec<String> {
        self.table.rows()
    }

    #[must_use]
    pub fn recipes(&self) -> &LiveCollection {
        &self.recipes
    }

    #[must_use]
    pub fn table(&self) -> &TableView {
        &self.table
    }

    #[must_use]
    pub fn search_control(&self) -> &Control {
        &self.search
    }

    #[must_use]
    pub fn binding_count(&self) -> usize {
        self.scope.binding_count()
    }
}

fn refilter(recipes: &LiveCollection, search: &Control, quick: &Control) -> Result<()> {
    let query = search.with(Value::to_string);
    let query = query.trim();
    let mut parts = Vec::new();
    if !query.is_empty() {
        parts.push(Predicate::contains_ignore_case("title", query));
    }
    if quick.with(|v| matches!(v, Value::Bool(true))) {
        parts.push(Predicate::lt("prep", QUICK_MINUTES));
    }
    let predicate = match parts.len() {
        0 => None,
        1 => parts.pop(),
        _ => Some(Predicate::all(parts)),
    };
    debug!(target: "tether_demo", ?predicate, "refilter");
    recipes.set_predicate(predicate)
}
