//! Entry points for the UI bridge. Failures come back as a [`CommandError`]
//! carrying the display message and whether a retry makes sense.

use chrono::NaiveDate;

use crate::{
    db::{FoodItem, FoodItemInput, LogEntry, Recipe, RecipeInput, ServingInput},
    error::{AppError, AppResult, CommandError},
    scanner::ScanOutcome,
    settings::{AppSettings, ScannerSettings, SummarySettings},
    summary::{DailySummary, TotalsPolicy},
    AppState,
};

fn invalid(err: anyhow::Error) -> AppError {
    AppError::InvalidInput(err.to_string())
}

pub async fn scan_barcode(state: &AppState, barcode: String) -> Result<ScanOutcome, CommandError> {
    state
        .scanner
        .on_barcode_scanned(barcode.trim())
        .await
        .map_err(CommandError::from)
}

pub fn scanner_focused(state: &AppState) -> Result<(), CommandError> {
    state.scanner.on_screen_focused();
    Ok(())
}

pub fn scanner_blurred(state: &AppState) -> Result<(), CommandError> {
    state.scanner.on_screen_blurred();
    Ok(())
}

/// Detail view lookup, keyed by the barcode the scan resolved to.
pub async fn get_food_item(state: &AppState, barcode: String) -> Result<FoodItem, CommandError> {
    food_by_barcode(state, &barcode).await.map_err(CommandError::from)
}

pub async fn update_food_item(
    state: &AppState,
    id: i64,
    input: FoodItemInput,
) -> Result<FoodItem, CommandError> {
    edit_food(state, id, input).await.map_err(CommandError::from)
}

pub async fn quick_add_food(state: &AppState, input: FoodItemInput) -> Result<FoodItem, CommandError> {
    add_quick_food(state, input).await.map_err(CommandError::from)
}

pub async fn log_food(
    state: &AppState,
    barcode: String,
    serving: Option<ServingInput>,
) -> Result<LogEntry, CommandError> {
    state
        .journal
        .log_food_by_barcode(&barcode, serving.unwrap_or_default())
        .await
        .map_err(CommandError::from)
}

/// Logging path for items without a barcode (quick adds).
pub async fn log_food_item(
    state: &AppState,
    food_item_id: i64,
    serving: Option<ServingInput>,
) -> Result<LogEntry, CommandError> {
    state
        .journal
        .log_food(food_item_id, serving.unwrap_or_default())
        .await
        .map_err(CommandError::from)
}

/// Today (UTC) unless a day is given.
pub async fn get_daily_summary(
    state: &AppState,
    day: Option<NaiveDate>,
) -> Result<DailySummary, CommandError> {
    let result = match day {
        Some(day) => state.summary.load_day(day).await,
        None => state.summary.load_today().await,
    };
    result.map_err(CommandError::from)
}

pub async fn delete_log_entry(state: &AppState, entry_id: i64) -> Result<(), CommandError> {
    state
        .summary
        .delete_entry(entry_id)
        .await
        .map_err(CommandError::from)
}

pub async fn set_weighted_totals(state: &AppState, weighted: bool) -> Result<(), CommandError> {
    state
        .settings
        .update_summary(SummarySettings {
            weighted_totals: weighted,
        })
        .map_err(CommandError::from)?;
    state
        .summary
        .set_policy(TotalsPolicy::from_weighted(weighted))
        .await;
    Ok(())
}

pub fn get_settings(state: &AppState) -> Result<AppSettings, CommandError> {
    Ok(state.settings.get())
}

/// Persists the debounce window and applies it to the live scanner.
pub fn set_scan_debounce(state: &AppState, debounce_ms: u64) -> Result<(), CommandError> {
    let settings = ScannerSettings { debounce_ms };
    state.settings.update_scanner(settings.clone())?;
    state.scanner.set_debounce(settings.debounce());
    Ok(())
}

pub async fn create_recipe(state: &AppState, input: RecipeInput) -> Result<Recipe, CommandError> {
    add_recipe(state, input).await.map_err(CommandError::from)
}

pub async fn list_recipes(state: &AppState) -> Result<Vec<Recipe>, CommandError> {
    state.db.list_recipes().await.map_err(CommandError::from)
}

async fn food_by_barcode(state: &AppState, barcode: &str) -> AppResult<FoodItem> {
    state
        .db
        .get_food_item_by_barcode(barcode)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("no food item with barcode {barcode}")))
}

async fn edit_food(state: &AppState, id: i64, input: FoodItemInput) -> AppResult<FoodItem> {
    input.validate().map_err(invalid)?;
    state
        .db
        .update_food_item(id, input)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("food item {id}")))
}

async fn add_quick_food(state: &AppState, input: FoodItemInput) -> AppResult<FoodItem> {
    input.validate().map_err(invalid)?;
    Ok(state.db.create_quick_add_food(input).await?)
}

async fn add_recipe(state: &AppState, input: RecipeInput) -> AppResult<Recipe> {
    input.validate().map_err(invalid)?;
    Ok(state.db.create_recipe(input).await?)
}
