#![forbid(unsafe_code)]

//! The recipe detail screen: text fields, a prep-time slider and its label.

use tether::prelude::*;
use tether::{Binding, Transformer};

use crate::recipe::Recipe;

/// Controls of the detail screen, bound to one recipe.
pub struct RecipeDetail {
    recipe: Entity<Recipe>,
    pub title: Control,
    pub instructions: Control,
    /// Slider position in minutes.
    pub prep: Control,
    /// Read-only label under the slider.
    pub prep_label: Control,
    label: Binding,
    scope: BindingScope,
}

impl RecipeDetail {
    pub fn open(context: &Context, recipe: &Entity<Recipe>) -> Result<Self> {
        let entity = recipe.erase();
        let title = Control::new(Value::from(""));
        let instructions = Control::new(Value::from(""));
        let prep = Control::new(Value::Float(0.0));
        let prep_label = Control::new(Value::from(""));

        let mut scope = BindingScope::new(context);
        scope.register_control(&title, &entity, "title", None)?;
        scope.register_control(&instructions, &entity, "instructions", None)?;
        scope.register_control(&prep, &entity, "prep", Some(whole_minutes()))?;
        let label = scope.engine().bind_control_to_entity_property(
            &prep_label,
            &entity,
            "prep",
            Some(minutes_label()),
        )?;

        Ok(Self {
            recipe: recipe.clone(),
            title,
            instructions,
            prep,
            prep_label,
            label,
            scope,
        })
    }

    #[must_use]
    pub fn recipe(&self) -> &Entity<Recipe> {
        &self.recipe
    }

    #[must_use]
    pub fn is_open(&self) -> bool {
        self.label.is_bound() && !self.scope.is_empty()
    }

    /// Release every binding of the screen.
    pub fn close(&mut self) {
        self.label.unbind();
        self.scope.release_entity(self.recipe.id());
    }
}

/// The slider snaps to whole minutes on its way into the model.
fn whole_minutes() -> Transformer {
    transformer(|change| match change {
        Change::FromModel(value) => Ok(Some(value)),
        Change::FromControl(value) => {
            let minutes = value.coerce(&SemanticType::Float)?;
            Ok(Some(Value::Float(minutes.as_float().unwrap_or_default().round())))
        }
    })
}

/// Model to label only; the label never writes back.
fn minutes_label() -> Transformer {
    transformer(|change| match change {
        Change::FromModel(value) => Ok(Some(Value::Text(format!("{value} min")))),
        Change::FromControl(_) => Ok(None),
    })
}
