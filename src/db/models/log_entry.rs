use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::FoodItem;

/// One consumption event. `serving_multiplier` is a count of servings of the
/// referenced item.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct LogEntry {
    pub id: i64,
    pub food_item_id: i64,
    pub serving_multiplier: f64,
    pub logged_at: DateTime<Utc>,
}

/// A log entry joined with the food item it references.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SummaryRow {
    pub entry_id: i64,
    pub logged_at: DateTime<Utc>,
    pub serving_multiplier: f64,
    pub food: FoodItem,
}

/// How the user expressed the quantity consumed.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", tag = "kind", content = "value")]
pub enum ServingInput {
    /// Number of servings.
    Servings(f64),
    /// Mass or volume in the item's own serving unit.
    Amount(f64),
}

impl Default for ServingInput {
    fn default() -> Self {
        ServingInput::Servings(1.0)
    }
}

impl ServingInput {
    /// Converts to the unitless serving multiplier stored on a log entry.
    pub fn to_multiplier(&self, food: &FoodItem) -> anyhow::Result<f64> {
        let multiplier = match *self {
            ServingInput::Servings(count) => count,
            ServingInput::Amount(amount) => {
                let per_serving = food
                    .serving_quantity
                    .filter(|q| q.is_finite() && *q > 0.0)
                    .ok_or_else(|| {
                        anyhow::anyhow!("'{}' has no serving quantity to convert from", food.name)
                    })?;
                amount / per_serving
            }
        };

        if !multiplier.is_finite() || multiplier <= 0.0 {
            anyhow::bail!("serving multiplier must be a positive number, got {multiplier}");
        }
        Ok(multiplier)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn food(serving_quantity: Option<f64>) -> FoodItem {
        FoodItem {
            id: 7,
            barcode: Some("5000112637922".into()),
            name: "Cola".into(),
            brand: None,
            image_url: None,
            amount_g: None,
            calories: 139.0,
            protein_g: 0.0,
            carbs_g: 35.0,
            fat_g: 0.0,
            fiber_g: None,
            sodium_g: None,
            is_quick_add: false,
            serving_quantity,
            serving_unit: Some("ml".into()),
        }
    }

    #[test]
    fn servings_are_stored_as_is() {
        let m = ServingInput::Servings(2.0).to_multiplier(&food(None)).unwrap();
        assert_eq!(m, 2.0);
    }

    #[test]
    fn amounts_are_normalized_by_serving_quantity() {
        let m = ServingInput::Amount(500.0)
            .to_multiplier(&food(Some(330.0)))
            .unwrap();
        assert!((m - 500.0 / 330.0).abs() < 1e-9);
    }

    #[test]
    fn amount_without_serving_quantity_is_rejected() {
        assert!(ServingInput::Amount(100.0).to_multiplier(&food(None)).is_err());
        assert!(ServingInput::Amount(100.0)
            .to_multiplier(&food(Some(0.0)))
            .is_err());
    }

    #[test]
    fn non_positive_multipliers_are_rejected() {
        assert!(ServingInput::Servings(0.0).to_multiplier(&food(None)).is_err());
        assert!(ServingInput::Servings(-1.0).to_multiplier(&food(None)).is_err());
        assert!(ServingInput::Servings(f64::INFINITY)
            .to_multiplier(&food(None))
            .is_err());
    }
}
