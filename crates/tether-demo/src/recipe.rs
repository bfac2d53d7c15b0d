#![forbid(unsafe_code)]

//! The demo's only model.

use std::sync::LazyLock;

use tether::{Model, Schema, SemanticType};

/// Recipes with at most this many minutes of preparation are "quick".
pub const QUICK_MINUTES: f64 = 30.0;

#[derive(Debug, Default, Clone, PartialEq)]
pub struct Recipe {
    pub title: String,
    pub instructions: String,
    /// Preparation time in minutes.
    pub prep: f64,
}

impl Recipe {
    #[must_use]
    pub fn new(title: impl Into<String>, prep: f64) -> Self {
        Self {
            title: title.into(),
            instructions: String::new(),
            prep,
        }
    }

    #[must_use]
    pub fn is_quick(&self) -> bool {
        self.prep < QUICK_MINUTES
    }
}

static RECIPE: LazyLock<Schema<Recipe>> = LazyLock::new(|| {
    Schema::<Recipe>::new("Recipe")
        .property(
            "title",
            SemanticType::Text,
            |r| r.title.clone().into(),
            |r, v| {
                r.title = v.try_text()?;
                Ok(())
            },
        )
        .property(
            "instructions",
            SemanticType::Text,
            |r| r.instructions.clone().into(),
            |r, v| {
                r.instructions = v.try_text()?;
                Ok(())
            },
        )
        .property(
            "prep",
            SemanticType::Float,
            |r| r.prep.into(),
            |r, v| {
                r.prep = v.try_float()?;
                Ok(())
            },
        )
        .with_factory(Recipe::default)
});

impl Model for Recipe {
    fn schema() -> &'static Schema<Self> {
        &RECIPE
    }
}
