use anyhow::{Context, Result};
use chrono::{DateTime, SubsecRound, Utc};
use rusqlite::{params, Connection, Row};

use crate::db::{
    helpers::{format_timestamp, parse_datetime},
    models::{FoodItem, LogEntry, ServingInput, SummaryRow},
    repositories::food_items::FoodItemRepository,
    Database,
};

fn row_to_log_entry(row: &Row) -> Result<LogEntry> {
    let date: String = row.get("date")?;

    Ok(LogEntry {
        id: row.get("id")?,
        food_item_id: row.get("food_item_id")?,
        serving_multiplier: row.get("log_serving")?,
        logged_at: parse_datetime(&date, "date")?,
    })
}

fn insert_entry(
    conn: &Connection,
    food_item_id: i64,
    serving_multiplier: f64,
    logged_at: DateTime<Utc>,
) -> Result<LogEntry> {
    let logged_at = logged_at.trunc_subsecs(3);
    conn.execute(
        "INSERT INTO log_entries (food_item_id, log_serving, date) VALUES (?1, ?2, ?3)",
        params![food_item_id, serving_multiplier, format_timestamp(logged_at)],
    )
    .with_context(|| format!("failed to insert log entry for food item {food_item_id}"))?;

    Ok(LogEntry {
        id: conn.last_insert_rowid(),
        food_item_id,
        serving_multiplier,
        logged_at,
    })
}

/// Result of logging against a barcode inside a single store task.
#[derive(Debug)]
pub enum BarcodeLogOutcome {
    Logged { food: FoodItem, entry: LogEntry },
    UnknownBarcode,
    InvalidServing(String),
}

impl Database {
    /// Inserts one entry. Returns `None` if `food_item_id` does not exist.
    pub async fn insert_log_entry(
        &self,
        food_item_id: i64,
        serving_multiplier: f64,
        logged_at: DateTime<Utc>,
    ) -> Result<Option<LogEntry>> {
        self.execute(move |conn| {
            let tx = conn.transaction()?;
            if FoodItemRepository::new(&tx).find_by_id(food_item_id)?.is_none() {
                return Ok(None);
            }
            let entry = insert_entry(&tx, food_item_id, serving_multiplier, logged_at)?;
            tx.commit()?;
            Ok(Some(entry))
        })
        .await
    }

    /// Resolves the barcode and inserts the entry in one transaction, so the
    /// referenced food item exists when the entry is written.
    pub async fn insert_log_entry_for_barcode(
        &self,
        barcode: &str,
        serving: ServingInput,
        logged_at: DateTime<Utc>,
    ) -> Result<BarcodeLogOutcome> {
        let barcode = barcode.to_string();
        self.execute(move |conn| {
            let tx = conn.transaction()?;
            let Some(food) = FoodItemRepository::new(&tx).find_by_barcode(&barcode)? else {
                return Ok(BarcodeLogOutcome::UnknownBarcode);
            };

            let multiplier = match serving.to_multiplier(&food) {
                Ok(multiplier) => multiplier,
                Err(err) => return Ok(BarcodeLogOutcome::InvalidServing(err.to_string())),
            };

            let entry = insert_entry(&tx, food.id, multiplier, logged_at)?;
            tx.commit()?;
            Ok(BarcodeLogOutcome::Logged { food, entry })
        })
        .await
    }

    pub async fn get_log_entry(&self, entry_id: i64) -> Result<Option<LogEntry>> {
        self.execute(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT id, food_item_id, log_serving, date FROM log_entries WHERE id = ?1",
            )?;
            let mut rows = stmt.query(params![entry_id])?;
            match rows.next()? {
                Some(row) => Ok(Some(row_to_log_entry(row)?)),
                None => Ok(None),
            }
        })
        .await
    }

    /// Entries with `start <= date < end`, newest first, joined to their food item.
    pub async fn get_summary_rows(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<SummaryRow>> {
        self.execute(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT id, food_item_id, log_serving, date
                 FROM log_entries
                 WHERE date >= ?1 AND date < ?2
                 ORDER BY date DESC, id DESC",
            )?;

            let mut rows = stmt.query(params![format_timestamp(start), format_timestamp(end)])?;
            let foods = FoodItemRepository::new(conn);
            let mut summary = Vec::new();
            while let Some(row) = rows.next()? {
                let entry = row_to_log_entry(row)?;
                let food = foods.find_by_id(entry.food_item_id)?.with_context(|| {
                    format!(
                        "log entry {} references missing food item {}",
                        entry.id, entry.food_item_id
                    )
                })?;
                summary.push(SummaryRow {
                    entry_id: entry.id,
                    logged_at: entry.logged_at,
                    serving_multiplier: entry.serving_multiplier,
                    food,
                });
            }

            Ok(summary)
        })
        .await
    }

    /// Returns whether a row was removed.
    pub async fn delete_log_entry(&self, entry_id: i64) -> Result<bool> {
        self.execute(move |conn| {
            let rows_affected = conn
                .execute("DELETE FROM log_entries WHERE id = ?1", params![entry_id])
                .with_context(|| format!("failed to delete log entry {entry_id}"))?;
            Ok(rows_affected > 0)
        })
        .await
    }

    pub async fn count_log_entries(&self) -> Result<i64> {
        self.execute(|conn| {
            Ok(conn.query_row("SELECT COUNT(*) FROM log_entries", [], |row| row.get(0))?)
        })
        .await
    }
}
