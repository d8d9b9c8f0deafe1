//! Recipe value types as loaded by the hosting cook-mode screen.
//!
//! The voice subsystem never fetches recipes itself; the screen hands over an
//! already-loaded [`Recipe`] and the subsystem derives its context from it.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recipe {
    pub id: String,
    pub title: String,
    pub ingredients: Vec<Ingredient>,
    pub instructions: Vec<String>,
    /// Serving count the base quantities were written for, when known.
    pub base_servings: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ingredient {
    pub name: String,
    /// Base quantity before any scaling. Unitless items (e.g. "a pinch of
    /// salt") carry no quantity.
    pub quantity: Option<f64>,
    pub unit: Option<String>,
}

impl Ingredient {
    pub fn new(name: impl Into<String>, quantity: f64, unit: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            quantity: Some(quantity),
            unit: Some(unit.into()),
        }
    }

    pub fn unmeasured(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            quantity: None,
            unit: None,
        }
    }
}
