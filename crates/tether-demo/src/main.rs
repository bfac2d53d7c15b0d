#![forbid(unsafe_code)]

//! Scripted session through the recipe book. Set `RUST_LOG=tether=debug` to
//! watch registries and collections at work.

use tether::Value;
use tether_demo::{Recipe, RecipeBook, RecipeDetail, context, seed};
use tracing::info;
use tracing_subscriber::EnvFilter;

fn print_rows(heading: &str, book: &RecipeBook) {
    println!("-- {heading}");
    for row in book.rows() {
        println!("   {row}");
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let ctx = context();
    let book = RecipeBook::new(&ctx)?;
    seed(&book)?;
    print_rows("all recipes", &book);

    book.search("soup")?;
    print_rows("search: soup", &book);

    book.toggle_quick()?;
    print_rows("search: soup, quick only", &book);

    book.search("")?;
    print_rows("quick only", &book);
    book.toggle_quick()?;

    let Some(stew) = book
        .recipes()
        .current_objects()
        .iter()
        .find(|r| matches!(r.get("title"), Ok(Value::Text(t)) if t == "Beef stew"))
        .and_then(|r| r.downcast::<Recipe>())
    else {
        return Err("seeded recipe missing".into());
    };

    let mut detail = RecipeDetail::open(&ctx, &stew)?;
    info!(title = %detail.title.get(), label = %detail.prep_label.get(), "detail opened");
    detail.title.set(Value::from("Irish stew"))?;
    detail.prep.set(Value::Float(119.6))?;
    info!(label = %detail.prep_label.get(), "slider moved");
    print_rows("after editing the stew", &book);

    let record = stew.to_record();
    println!("{}", serde_json::to_string_pretty(&record)?);

    detail.close();
    book.remove_at(0)?;
    print_rows("after removing the first row", &book);
    Ok(())
}
