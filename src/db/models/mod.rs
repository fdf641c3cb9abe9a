pub mod food_item;
pub mod log_entry;
pub mod recipe;

pub use food_item::{FoodItem, FoodItemInput, NewScannedFood, Nutrients};
pub use log_entry::{LogEntry, ServingInput, SummaryRow};
pub use recipe::{Recipe, RecipeInput};
