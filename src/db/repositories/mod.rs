pub mod food_items;
pub mod log_entries;
pub mod recipes;

pub use log_entries::BarcodeLogOutcome;
