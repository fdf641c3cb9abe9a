//! Daily nutrient totals over the log store.

pub mod aggregator;
pub mod controller;

pub use aggregator::{compute_totals, daily_summary, DailySummary, TotalsPolicy};
pub use controller::SummaryController;
