//! Recording what the user ate.

use chrono::{DateTime, Utc};
use log::info;

use crate::{
    db::{BarcodeLogOutcome, Database, LogEntry, ServingInput},
    error::{AppError, AppResult},
};

/// Inserts log entries stamped with the time of the call.
#[derive(Clone)]
pub struct FoodJournal {
    db: Database,
}

impl FoodJournal {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    pub async fn log_food(&self, food_item_id: i64, serving: ServingInput) -> AppResult<LogEntry> {
        self.log_food_at(food_item_id, serving, Utc::now()).await
    }

    /// Logs against the barcode the detail view was opened with.
    pub async fn log_food_by_barcode(
        &self,
        barcode: &str,
        serving: ServingInput,
    ) -> AppResult<LogEntry> {
        self.log_food_by_barcode_at(barcode, serving, Utc::now())
            .await
    }

    pub(crate) async fn log_food_at(
        &self,
        food_item_id: i64,
        serving: ServingInput,
        now: DateTime<Utc>,
    ) -> AppResult<LogEntry> {
        let food = self
            .db
            .get_food_item(food_item_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("food item {food_item_id}")))?;

        let multiplier = serving
            .to_multiplier(&food)
            .map_err(|err| AppError::InvalidInput(err.to_string()))?;

        let entry = self
            .db
            .insert_log_entry(food.id, multiplier, now)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("food item {food_item_id}")))?;

        info!(
            "Logged {:.2} serving(s) of '{}' as entry {}",
            multiplier, food.name, entry.id
        );
        Ok(entry)
    }

    pub(crate) async fn log_food_by_barcode_at(
        &self,
        barcode: &str,
        serving: ServingInput,
        now: DateTime<Utc>,
    ) -> AppResult<LogEntry> {
        match self
            .db
            .insert_log_entry_for_barcode(barcode, serving, now)
            .await?
        {
            BarcodeLogOutcome::Logged { food, entry } => {
                info!(
                    "Logged {:.2} serving(s) of '{}' ({barcode}) as entry {}",
                    entry.serving_multiplier, food.name, entry.id
                );
                Ok(entry)
            }
            BarcodeLogOutcome::UnknownBarcode => {
                Err(AppError::NotFound(format!("no food item with barcode {barcode}")))
            }
            BarcodeLogOutcome::InvalidServing(reason) => Err(AppError::InvalidInput(reason)),
        }
    }
}
