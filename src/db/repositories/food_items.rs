use anyhow::{anyhow, Context, Result};
use rusqlite::{params, Connection, OptionalExtension, Row};

use crate::db::{
    models::{FoodItem, FoodItemInput, NewScannedFood},
    Database,
};

const FOOD_ITEM_COLUMNS: &str = "id, ean_id, name, brand, image_url, g_amount, calories, g_protein,
     g_carbs, g_fats, g_fiber, g_sodium, is_quick_add, serving_quantity, serving_unit";

fn row_to_food_item(row: &Row) -> rusqlite::Result<FoodItem> {
    Ok(FoodItem {
        id: row.get("id")?,
        barcode: row.get("ean_id")?,
        name: row.get("name")?,
        brand: row.get("brand")?,
        image_url: row.get("image_url")?,
        amount_g: row.get("g_amount")?,
        calories: row.get("calories")?,
        protein_g: row.get("g_protein")?,
        carbs_g: row.get("g_carbs")?,
        fat_g: row.get("g_fats")?,
        fiber_g: row.get("g_fiber")?,
        sodium_g: row.get("g_sodium")?,
        is_quick_add: row.get::<_, Option<bool>>("is_quick_add")?.unwrap_or(false),
        serving_quantity: row.get("serving_quantity")?,
        serving_unit: row.get("serving_unit")?,
    })
}

/// Synchronous access to `food_items`, usable inside a larger transaction.
pub struct FoodItemRepository<'a> {
    conn: &'a Connection,
}

impl<'a> FoodItemRepository<'a> {
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    /// Exact, case-sensitive barcode match.
    pub fn find_by_barcode(&self, barcode: &str) -> Result<Option<FoodItem>> {
        self.conn
            .query_row(
                &format!("SELECT {FOOD_ITEM_COLUMNS} FROM food_items WHERE ean_id = ?1"),
                params![barcode],
                row_to_food_item,
            )
            .optional()
            .map_err(Into::into)
    }

    pub fn find_by_id(&self, id: i64) -> Result<Option<FoodItem>> {
        self.conn
            .query_row(
                &format!("SELECT {FOOD_ITEM_COLUMNS} FROM food_items WHERE id = ?1"),
                params![id],
                row_to_food_item,
            )
            .optional()
            .map_err(Into::into)
    }
}

impl Database {
    pub async fn get_food_item_by_barcode(&self, barcode: &str) -> Result<Option<FoodItem>> {
        let barcode = barcode.to_string();
        self.execute(move |conn| FoodItemRepository::new(conn).find_by_barcode(&barcode))
            .await
    }

    pub async fn get_food_item(&self, id: i64) -> Result<Option<FoodItem>> {
        self.execute(move |conn| FoodItemRepository::new(conn).find_by_id(id))
            .await
    }

    /// Cache a remotely resolved product under its barcode.
    ///
    /// Runs as one transaction: if the barcode was cached in the meantime the
    /// existing row wins. The returned row is re-read by barcode.
    pub async fn insert_scanned_food_item(&self, food: NewScannedFood) -> Result<FoodItem> {
        self.execute(move |conn| {
            let tx = conn.transaction()?;

            if FoodItemRepository::new(&tx)
                .find_by_barcode(&food.barcode)?
                .is_none()
            {
                tx.execute(
                    "INSERT INTO food_items (
                        ean_id, name, brand, image_url, calories,
                        g_protein, g_carbs, g_fats, g_fiber, g_sodium, is_quick_add
                    ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, 0)",
                    params![
                        food.barcode,
                        food.name,
                        food.brand,
                        food.image_url,
                        food.calories.unwrap_or(0.0),
                        food.protein_g.unwrap_or(0.0),
                        food.carbs_g.unwrap_or(0.0),
                        food.fat_g.unwrap_or(0.0),
                        food.fiber_g,
                        food.sodium_g,
                    ],
                )
                .with_context(|| format!("failed to insert food item {}", food.barcode))?;
            }

            let item = FoodItemRepository::new(&tx)
                .find_by_barcode(&food.barcode)?
                .ok_or_else(|| anyhow!("food item {} not found after insert", food.barcode))?;

            tx.commit()?;
            Ok(item)
        })
        .await
    }

    /// Manual entry without a barcode.
    pub async fn create_quick_add_food(&self, input: FoodItemInput) -> Result<FoodItem> {
        self.execute(move |conn| {
            conn.execute(
                "INSERT INTO food_items (
                    ean_id, name, brand, calories, g_protein, g_carbs, g_fats,
                    g_fiber, g_sodium, is_quick_add, serving_quantity, serving_unit
                ) VALUES (NULL, ?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, 1, ?9, ?10)",
                params![
                    input.name.trim(),
                    input.brand,
                    input.calories,
                    input.protein_g,
                    input.carbs_g,
                    input.fat_g,
                    input.fiber_g,
                    input.sodium_g,
                    input.serving_quantity,
                    input.serving_unit,
                ],
            )
            .context("failed to insert quick-add food item")?;

            let id = conn.last_insert_rowid();
            FoodItemRepository::new(conn)
                .find_by_id(id)?
                .ok_or_else(|| anyhow!("food item {id} not found after insert"))
        })
        .await
    }

    /// Overwrites the editable fields. Returns `None` when no row has `id`.
    pub async fn update_food_item(
        &self,
        id: i64,
        input: FoodItemInput,
    ) -> Result<Option<FoodItem>> {
        self.execute(move |conn| {
            let rows_affected = conn
                .execute(
                    "UPDATE food_items
                     SET name = ?1,
                         brand = ?2,
                         calories = ?3,
                         g_protein = ?4,
                         g_carbs = ?5,
                         g_fats = ?6,
                         g_fiber = ?7,
                         g_sodium = ?8,
                         serving_quantity = ?9,
                         serving_unit = ?10
                     WHERE id = ?11",
                    params![
                        input.name.trim(),
                        input.brand,
                        input.calories,
                        input.protein_g,
                        input.carbs_g,
                        input.fat_g,
                        input.fiber_g,
                        input.sodium_g,
                        input.serving_quantity,
                        input.serving_unit,
                        id,
                    ],
                )
                .with_context(|| format!("failed to update food item {id}"))?;

            if rows_affected == 0 {
                return Ok(None);
            }

            FoodItemRepository::new(conn).find_by_id(id)
        })
        .await
    }
}
