use anyhow::Result;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::db::{helpers::utc_day_bounds, Database, Nutrients, SummaryRow};

/// Whether an entry's serving multiplier scales its food item's nutrients
/// when summing a day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TotalsPolicy {
    #[default]
    Weighted,
    /// Raw per-serving values, one per entry regardless of quantity.
    Unweighted,
}

impl TotalsPolicy {
    pub fn from_weighted(weighted: bool) -> Self {
        if weighted {
            TotalsPolicy::Weighted
        } else {
            TotalsPolicy::Unweighted
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DailySummary {
    pub day: NaiveDate,
    pub policy: TotalsPolicy,
    /// Newest first.
    pub entries: Vec<SummaryRow>,
    pub totals: Nutrients,
}

impl DailySummary {
    pub fn new(day: NaiveDate, policy: TotalsPolicy, entries: Vec<SummaryRow>) -> Self {
        let totals = compute_totals(&entries, policy);
        Self {
            day,
            policy,
            entries,
            totals,
        }
    }

    pub(crate) fn remove_entry(&mut self, entry_id: i64) -> Option<(usize, SummaryRow)> {
        let index = self.entries.iter().position(|row| row.entry_id == entry_id)?;
        let row = self.entries.remove(index);
        self.totals = compute_totals(&self.entries, self.policy);
        Some((index, row))
    }

    pub(crate) fn restore_entry(&mut self, index: usize, row: SummaryRow) {
        let index = index.min(self.entries.len());
        self.entries.insert(index, row);
        self.totals = compute_totals(&self.entries, self.policy);
    }
}

pub fn compute_totals(entries: &[SummaryRow], policy: TotalsPolicy) -> Nutrients {
    let mut totals = Nutrients::default();
    for row in entries {
        let nutrients = row.food.nutrients();
        totals += match policy {
            TotalsPolicy::Weighted => nutrients.scaled(row.serving_multiplier),
            TotalsPolicy::Unweighted => nutrients,
        };
    }
    totals
}

/// Loads every entry logged on `day` (UTC) joined with its food item.
pub async fn daily_summary(
    db: &Database,
    day: NaiveDate,
    policy: TotalsPolicy,
) -> Result<DailySummary> {
    let (start, end) = utc_day_bounds(day)?;
    let entries = db.get_summary_rows(start, end).await?;
    Ok(DailySummary::new(day, policy, entries))
}
