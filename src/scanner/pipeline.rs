use serde::Serialize;
use tokio::time::{self, Duration};
use tokio_util::sync::CancellationToken;

use crate::{
    db::{Database, FoodItem, NewScannedFood},
    error::{AppError, AppResult},
    lookup::{NormalizedProduct, NutritionLookup},
};

// Set to true to enable verbose logging in this module
const ENABLE_LOGS: bool = true;

use crate::{log_info, log_warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ResolutionSource {
    Cache,
    Remote,
}

/// A barcode mapped to a cached food item. `barcode` is the navigation key
/// for the detail view in both branches.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Resolution {
    pub barcode: String,
    pub source: ResolutionSource,
    pub food: FoodItem,
}

fn to_new_food(barcode: &str, product: NormalizedProduct) -> NewScannedFood {
    NewScannedFood {
        barcode: barcode.to_string(),
        name: product.name,
        brand: product.brand,
        image_url: product.image_url,
        calories: product.calories,
        protein_g: product.protein_g,
        carbs_g: product.carbs_g,
        fat_g: product.fat_g,
        fiber_g: product.fiber_g,
        sodium_g: product.sodium_g,
    }
}

/// Cache check, then remote fallback, then insert. Steps run strictly in order.
pub struct ScanPipeline<L> {
    db: Database,
    lookup: L,
    lookup_timeout: Duration,
}

impl<L: NutritionLookup> ScanPipeline<L> {
    pub fn new(db: Database, lookup: L, lookup_timeout: Duration) -> Self {
        Self {
            db,
            lookup,
            lookup_timeout,
        }
    }

    pub fn lookup(&self) -> &L {
        &self.lookup
    }

    pub async fn resolve(
        &self,
        barcode: &str,
        cancel: &CancellationToken,
    ) -> AppResult<Resolution> {
        if barcode.is_empty() {
            return Err(AppError::InvalidInput("barcode must not be empty".into()));
        }

        if let Some(food) = self
            .db
            .get_food_item_by_barcode(barcode)
            .await
            .map_err(AppError::Persistence)?
        {
            log_info!("Barcode {barcode} resolved from cache (food item {})", food.id);
            return Ok(Resolution {
                barcode: barcode.to_string(),
                source: ResolutionSource::Cache,
                food,
            });
        }

        let product = tokio::select! {
            _ = cancel.cancelled() => {
                log_warn!("Lookup for {barcode} cancelled");
                return Err(AppError::Cancelled { barcode: barcode.to_string() });
            }
            result = time::timeout(self.lookup_timeout, self.lookup.lookup(barcode)) => {
                match result {
                    Ok(Ok(product)) => product,
                    Ok(Err(err)) => {
                        log_warn!("Lookup for {barcode} failed: {err}");
                        return Err(AppError::lookup_failed(barcode, err.to_string()));
                    }
                    Err(_) => {
                        log_warn!("Lookup for {barcode} timed out after {:?}", self.lookup_timeout);
                        return Err(AppError::lookup_failed(
                            barcode,
                            format!("timed out after {}s", self.lookup_timeout.as_secs_f32()),
                        ));
                    }
                }
            }
        };

        let food = self
            .db
            .insert_scanned_food_item(to_new_food(barcode, product))
            .await
            .map_err(AppError::Persistence)?;
        log_info!("Cached {barcode} as food item {}", food.id);

        Ok(Resolution {
            barcode: food.barcode.clone().unwrap_or_else(|| barcode.to_string()),
            source: ResolutionSource::Remote,
            food,
        })
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::lookup::LookupError;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tempfile::TempDir;

    pub(crate) enum FakeResponse {
        Found(NormalizedProduct),
        NotFound,
        Hang,
    }

    pub(crate) struct FakeLookup {
        pub calls: AtomicUsize,
        pub delay: Duration,
        pub response: FakeResponse,
    }

    impl FakeLookup {
        pub fn found(product: NormalizedProduct) -> Self {
            Self {
                calls: AtomicUsize::new(0),
                delay: Duration::ZERO,
                response: FakeResponse::Found(product),
            }
        }

        pub fn not_found() -> Self {
            Self {
                calls: AtomicUsize::new(0),
                delay: Duration::ZERO,
                response: FakeResponse::NotFound,
            }
        }

        pub fn hanging() -> Self {
            Self {
                calls: AtomicUsize::new(0),
                delay: Duration::ZERO,
                response: FakeResponse::Hang,
            }
        }

        pub fn with_delay(mut self, delay: Duration) -> Self {
            self.delay = delay;
            self
        }

        pub fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    impl NutritionLookup for FakeLookup {
        async fn lookup(&self, _barcode: &str) -> Result<NormalizedProduct, LookupError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if !self.delay.is_zero() {
                time::sleep(self.delay).await;
            }
            match &self.response {
                FakeResponse::Found(product) => Ok(product.clone()),
                FakeResponse::NotFound => Err(LookupError::NotFound),
                FakeResponse::Hang => std::future::pending().await,
            }
        }
    }

    pub(crate) fn test_bar() -> NormalizedProduct {
        NormalizedProduct {
            name: "Test Bar".into(),
            brand: Some("Acme".into()),
            image_url: None,
            calories: Some(200.0),
            protein_g: Some(10.0),
            carbs_g: Some(20.0),
            fat_g: Some(5.0),
            fiber_g: Some(2.0),
            sodium_g: Some(0.1),
        }
    }

    pub(crate) fn open_db() -> (Database, TempDir) {
        let temp = TempDir::new().unwrap();
        let db = Database::new(temp.path().join("food.sqlite3")).unwrap();
        (db, temp)
    }

    #[tokio::test]
    async fn remote_result_is_cached_and_keyed_by_barcode() {
        let (db, _temp) = open_db();
        let pipeline = ScanPipeline::new(
            db.clone(),
            FakeLookup::found(test_bar()),
            Duration::from_secs(5),
        );
        let cancel = CancellationToken::new();

        let first = pipeline.resolve("012345", &cancel).await.unwrap();
        assert_eq!(first.barcode, "012345");
        assert_eq!(first.source, ResolutionSource::Remote);
        assert_eq!(first.food.calories, 200.0);
        assert_eq!(first.food.protein_g, 10.0);
        assert_eq!(first.food.brand.as_deref(), Some("Acme"));

        let second = pipeline.resolve("012345", &cancel).await.unwrap();
        assert_eq!(second.source, ResolutionSource::Cache);
        assert_eq!(second.food.id, first.food.id);
        assert_eq!(pipeline.lookup().calls(), 1);

        let rows: i64 = db
            .execute(|conn| {
                Ok(conn.query_row("SELECT COUNT(*) FROM food_items", [], |row| row.get(0))?)
            })
            .await
            .unwrap();
        assert_eq!(rows, 1);
    }

    #[tokio::test]
    async fn cached_barcode_never_calls_remote() {
        let (db, _temp) = open_db();
        db.insert_scanned_food_item(NewScannedFood {
            barcode: "4006381333931".into(),
            name: "Pen".into(),
            ..Default::default()
        })
        .await
        .unwrap();

        let pipeline = ScanPipeline::new(db, FakeLookup::not_found(), Duration::from_secs(5));
        let resolution = pipeline
            .resolve("4006381333931", &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(resolution.source, ResolutionSource::Cache);
        assert_eq!(pipeline.lookup().calls(), 0);
    }

    #[tokio::test]
    async fn upstream_not_found_is_lookup_failure() {
        let (db, _temp) = open_db();
        let pipeline = ScanPipeline::new(db.clone(), FakeLookup::not_found(), Duration::from_secs(5));

        let err = pipeline
            .resolve("000", &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::LookupFailed { ref barcode, .. } if barcode == "000"));
        assert!(db.get_food_item_by_barcode("000").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn slow_lookup_times_out() {
        let (db, _temp) = open_db();
        let pipeline = ScanPipeline::new(db, FakeLookup::hanging(), Duration::from_millis(50));

        let err = pipeline
            .resolve("123", &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::LookupFailed { .. }));
    }

    #[tokio::test]
    async fn cancellation_interrupts_lookup() {
        let (db, _temp) = open_db();
        let pipeline = ScanPipeline::new(db, FakeLookup::hanging(), Duration::from_secs(30));
        let cancel = CancellationToken::new();

        let trigger = cancel.clone();
        tokio::spawn(async move {
            time::sleep(Duration::from_millis(20)).await;
            trigger.cancel();
        });

        let err = pipeline.resolve("123", &cancel).await.unwrap_err();
        assert!(matches!(err, AppError::Cancelled { .. }));
    }

    #[tokio::test]
    async fn empty_barcode_is_rejected() {
        let (db, _temp) = open_db();
        let pipeline = ScanPipeline::new(db, FakeLookup::not_found(), Duration::from_secs(5));
        let err = pipeline
            .resolve("", &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::InvalidInput(_)));
        assert_eq!(pipeline.lookup().calls(), 0);
    }
}
