//! Remote nutrition lookup.
//!
//! The scan pipeline only sees [`NutritionLookup`]; the Open Food Facts
//! adapter is the production implementation.

use std::future::Future;

use thiserror::Error;

pub mod open_food_facts;

pub use open_food_facts::OpenFoodFactsClient;

/// Product data mapped into the local record shape. Absent nutrients stay
/// `None` and read as zero downstream.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NormalizedProduct {
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

#[derive(Error, Debug)]
pub enum LookupError {
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("upstream returned HTTP {0}")]
    Status(u16),

    #[error("product not found")]
    NotFound,

    #[error("unexpected response: {0}")]
    Malformed(String),

    #[error("invalid lookup URL: {0}")]
    InvalidUrl(String),
}

pub trait NutritionLookup: Send + Sync {
    fn lookup(
        &self,
        barcode: &str,
    ) -> impl Future<Output = Result<NormalizedProduct, LookupError>> + Send;
}
