use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Recipe {
    pub id: i64,
    pub name: String,
    pub amount_g: f64,
    pub calories: f64,
    pub protein_g: f64,
    pub carbs_g: f64,
    pub fat_g: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecipeInput {
    pub name: String,
    pub amount_g: f64,
    pub calories: f64,
    pub protein_g: f64,
    pub carbs_g: f64,
    pub fat_g: f64,
}

impl RecipeInput {
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            bail!("recipe name must not be empty");
        }
        if !self.amount_g.is_finite() || self.amount_g <= 0.0 {
            bail!("recipe amount must be positive");
        }
        for value in [self.calories, self.protein_g, self.carbs_g, self.fat_g] {
            if !value.is_finite() || value < 0.0 {
                bail!("recipe nutrients must be non-negative numbers");
            }
        }
        Ok(())
    }
}
