//! Builds the structured context blob pushed to the dialogue backend.

use serde::{Deserialize, Serialize};

use crate::types::Recipe;

/// Derived per session, never persisted. Rebuilt by the owning screen on
/// every step or scale change and forwarded out-of-band to the live session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecipeVoiceContext {
    pub recipe_id: String,
    pub title: String,
    pub ingredients: Vec<ScaledIngredient>,
    pub instructions: Vec<String>,
    /// Zero-based index into `instructions`.
    pub current_step: usize,
    pub scale: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScaledIngredient {
    pub name: String,
    pub quantity: Option<f64>,
    pub unit: Option<String>,
}

impl RecipeVoiceContext {
    /// Instruction text for the current step, if the recipe has any steps.
    pub fn current_instruction(&self) -> Option<&str> {
        self.instructions.get(self.current_step).map(String::as_str)
    }
}

/// Pure assembly: `(recipe, step, scale) -> context`.
///
/// Quantities are base × scale, kept to 2 decimal places so fractional
/// scaling ("1.5x") matches the quantity display elsewhere in the app. A step
/// index past the end is clamped to the last instruction.
pub fn build_voice_context(recipe: &Recipe, current_step: usize, scale: f64) -> RecipeVoiceContext {
    let scale = if scale > 0.0 { scale } else { 1.0 };
    let last_step = recipe.instructions.len().saturating_sub(1);

    RecipeVoiceContext {
        recipe_id: recipe.id.clone(),
        title: recipe.title.clone(),
        ingredients: recipe
            .ingredients
            .iter()
            .map(|ing| ScaledIngredient {
                name: ing.name.clone(),
                quantity: ing.quantity.map(|q| round2(q * scale)),
                unit: ing.unit.clone(),
            })
            .collect(),
        instructions: recipe.instructions.clone(),
        current_step: current_step.min(last_step),
        scale,
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Ingredient;

    fn sample_recipe() -> Recipe {
        Recipe {
            id: "r-42".into(),
            title: "Weeknight Dal".into(),
            ingredients: vec![
                Ingredient::new("red lentils", 1.5, "cups"),
                Ingredient::new("turmeric", 0.5, "tsp"),
                Ingredient::unmeasured("salt"),
            ],
            instructions: vec![
                "Rinse the lentils.".into(),
                "Simmer with turmeric for 20 minutes.".into(),
                "Season and serve.".into(),
            ],
            base_servings: Some(4),
        }
    }

    #[test]
    fn quantities_scale_and_round_to_two_places() {
        let ctx = build_voice_context(&sample_recipe(), 0, 1.5);
        assert_eq!(ctx.ingredients[0].quantity, Some(2.25));
        assert_eq!(ctx.ingredients[1].quantity, Some(0.75));
        assert_eq!(ctx.ingredients[2].quantity, None);
    }

    #[test]
    fn doubling_doubles_every_quantity() {
        let recipe = sample_recipe();
        let base = build_voice_context(&recipe, 0, 1.0);
        let doubled = build_voice_context(&recipe, 0, 2.0);

        for (b, d) in base.ingredients.iter().zip(&doubled.ingredients) {
            match (b.quantity, d.quantity) {
                (Some(bq), Some(dq)) => assert!((dq - bq * 2.0).abs() < 1e-9),
                (None, None) => {}
                other => panic!("mismatched quantities: {:?}", other),
            }
        }
    }

    #[test]
    fn rebuild_at_unit_scale_then_rescale_round_trips() {
        let recipe = sample_recipe();
        let direct = build_voice_context(&recipe, 1, 3.0);

        let unit = build_voice_context(&recipe, 1, 1.0);
        let rescaled: Vec<Option<f64>> = unit
            .ingredients
            .iter()
            .map(|i| i.quantity.map(|q| (q * 3.0 * 100.0).round() / 100.0))
            .collect();

        let direct_q: Vec<Option<f64>> =
            direct.ingredients.iter().map(|i| i.quantity).collect();
        assert_eq!(rescaled, direct_q);
    }

    #[test]
    fn step_index_is_clamped_to_last_instruction() {
        let ctx = build_voice_context(&sample_recipe(), 99, 1.0);
        assert_eq!(ctx.current_step, 2);
        assert_eq!(ctx.current_instruction(), Some("Season and serve."));
    }

    #[test]
    fn non_positive_scale_defaults_to_one() {
        let ctx = build_voice_context(&sample_recipe(), 0, 0.0);
        assert_eq!(ctx.scale, 1.0);
        assert_eq!(ctx.ingredients[0].quantity, Some(1.5));
    }
}
