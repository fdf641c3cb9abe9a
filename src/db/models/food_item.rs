//! Food item data models.
//!
//! A food item is either resolved from a scanned barcode or entered by hand
//! ("quick add"). Nutrient values are per serving.

use std::ops::AddAssign;

use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FoodItem {
    pub id: i64,
    pub barcode: Option<String>,
    pub name: String,
    pub brand: Option<String>,
    pub image_url: Option<String>,
    pub amount_g: Option<f64>,
    pub calories: f64,
    pub protein_g: f64,
    pub carbs_g: f64,
    pub fat_g: f64,
    pub fiber_g: Option<f64>,
    pub sodium_g: Option<f64>,
    pub is_quick_add: bool,
    pub serving_quantity: Option<f64>,
    pub serving_unit: Option<String>,
}

impl FoodItem {
    /// Per-serving nutrients with absent values read as zero.
    pub fn nutrients(&self) -> Nutrients {
        Nutrients {
            calories: self.calories,
            protein_g: self.protein_g,
            carbs_g: self.carbs_g,
            fat_g: self.fat_g,
            fiber_g: self.fiber_g.unwrap_or(0.0),
            sodium_g: self.sodium_g.unwrap_or(0.0),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Nutrients {
    pub calories: f64,
    pub protein_g: f64,
    pub carbs_g: f64,
    pub fat_g: f64,
    pub fiber_g: f64,
    pub sodium_g: f64,
}

impl Nutrients {
    pub fn scaled(&self, factor: f64) -> Self {
        Self {
            calories: self.calories * factor,
            protein_g: self.protein_g * factor,
            carbs_g: self.carbs_g * factor,
            fat_g: self.fat_g * factor,
            fiber_g: self.fiber_g * factor,
            sodium_g: self.sodium_g * factor,
        }
    }
}

impl AddAssign for Nutrients {
    fn add_assign(&mut self, rhs: Self) {
        self.calories += rhs.calories;
        self.protein_g += rhs.protein_g;
        self.carbs_g += rhs.carbs_g;
        self.fat_g += rhs.fat_g;
        self.fiber_g += rhs.fiber_g;
        self.sodium_g += rhs.sodium_g;
    }
}

/// Fields written by the quick-add and edit paths.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FoodItemInput {
    pub name: String,
    pub brand: Option<String>,
    pub calories: f64,
    pub protein_g: f64,
    pub carbs_g: f64,
    pub fat_g: f64,
    pub fiber_g: Option<f64>,
    pub sodium_g: Option<f64>,
    pub serving_quantity: Option<f64>,
    pub serving_unit: Option<String>,
}

impl FoodItemInput {
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            bail!("name must not be empty");
        }

        let required = [
            ("calories", self.calories),
            ("protein", self.protein_g),
            ("carbs", self.carbs_g),
            ("fat", self.fat_g),
        ];
        let optional = [
            ("fiber", self.fiber_g),
            ("sodium", self.sodium_g),
            ("serving quantity", self.serving_quantity),
        ];
        for (field, value) in required
            .into_iter()
            .chain(optional.into_iter().filter_map(|(f, v)| v.map(|v| (f, v))))
        {
            if !value.is_finite() || value < 0.0 {
                bail!("{field} must be a non-negative number, got {value}");
            }
        }

        Ok(())
    }
}

/// A product resolved by the remote lookup, ready to be cached under its barcode.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NewScannedFood {
    pub barcode: String,
    pub name: String,
    pub brand: Option<String>,
    pub image_url: Option<String>,
    pub calories: Option<f64>,
    pub protein_g: Option<f64>,
    pub carbs_g: Option<f64>,
    pub fat_g: Option<f64>,
    pub fiber_g: Option<f64>,
    pub sodium_g: Option<f64>,
}
