#![forbid(unsafe_code)]

//! Headless recipe book built on tether.
//!
//! - [`RecipeBook`]: the master list, sorted by title, filtered by a search
//!   field and a "quick recipes" toggle.
//! - [`RecipeDetail`]: text fields and a prep-time slider bound two-way to one
//!   recipe.
//! - [`TableView`]: a row list maintained only from collection callbacks.

pub mod detail;
pub mod master;
pub mod recipe;
pub mod table;

pub use detail::RecipeDetail;
pub use master::RecipeBook;
pub use recipe::{QUICK_MINUTES, Recipe};
pub use table::TableView;

use tether::{Context, Result};

/// A context with the demo's types registered.
pub fn context() -> Context {
    let ctx = Context::default();
    ctx.register_type::<Recipe>();
    ctx
}

/// Fill the book with a few recipes.
pub fn seed(book: &RecipeBook) -> Result<()> {
    for (title, prep) in [
        ("Pancakes", 20.0),
        ("Beef stew", 150.0),
        ("Tomato soup", 35.0),
        ("Greek salad", 10.0),
        ("Miso soup", 15.0),
    ] {
        book.add_recipe(title, prep)?;
    }
    Ok(())
}
