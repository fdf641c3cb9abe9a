use std::sync::{Arc, Mutex, MutexGuard};

use serde::Serialize;
use tokio::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;

use crate::{
    error::{AppError, AppResult},
    lookup::NutritionLookup,
};

use super::{Resolution, ScanDebouncer, ScanDecision, ScanPipeline};

// Set to true to enable verbose logging in this module
const ENABLE_LOGS: bool = true;

use crate::{log_debug, log_info};

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase", tag = "kind")]
pub enum ScanOutcome {
    /// Dropped by the debouncer; nothing happened.
    Ignored { reason: ScanDecision },
    /// Open the detail view keyed by `resolution.barcode`.
    Resolved { resolution: Resolution },
}

/// Releases the busy flag however the resolution ends, including when the
/// caller drops the future mid-flight.
struct InFlight<'a> {
    debouncer: &'a Mutex<ScanDebouncer>,
    succeeded: bool,
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        let mut guard = lock(self.debouncer);
        if self.succeeded {
            guard.finish();
        } else {
            guard.fail();
        }
    }
}

fn lock(debouncer: &Mutex<ScanDebouncer>) -> MutexGuard<'_, ScanDebouncer> {
    match debouncer.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

/// Scanner-screen controller: owns the debounce state and the cancellation
/// scope of the screen's visible lifetime.
pub struct ScanController<L> {
    debouncer: Arc<Mutex<ScanDebouncer>>,
    pipeline: Arc<ScanPipeline<L>>,
    visibility: Arc<Mutex<CancellationToken>>,
}

impl<L> Clone for ScanController<L> {
    fn clone(&self) -> Self {
        Self {
            debouncer: self.debouncer.clone(),
            pipeline: self.pipeline.clone(),
            visibility: self.visibility.clone(),
        }
    }
}

impl<L: NutritionLookup> ScanController<L> {
    pub fn new(pipeline: ScanPipeline<L>, debounce: Duration) -> Self {
        Self {
            debouncer: Arc::new(Mutex::new(ScanDebouncer::new(debounce))),
            pipeline: Arc::new(pipeline),
            visibility: Arc::new(Mutex::new(CancellationToken::new())),
        }
    }

    pub fn pipeline(&self) -> &ScanPipeline<L> {
        &self.pipeline
    }

    /// Camera callback. Errors leave the controller ready for an identical
    /// rescan.
    pub async fn on_barcode_scanned(&self, barcode: &str) -> AppResult<ScanOutcome> {
        if barcode.is_empty() {
            return Err(AppError::InvalidInput("barcode must not be empty".into()));
        }

        let decision = lock(&self.debouncer).try_accept(barcode, Instant::now());
        if decision != ScanDecision::Accepted {
            log_debug!("Ignoring scan of {barcode}: {decision:?}");
            return Ok(ScanOutcome::Ignored { reason: decision });
        }

        log_info!("Barcode scanned: {barcode}");
        let cancel = self.current_scope();
        let mut in_flight = InFlight {
            debouncer: &self.debouncer,
            succeeded: false,
        };

        let result = self.pipeline.resolve(barcode, &cancel).await;
        in_flight.succeeded = result.is_ok();
        drop(in_flight);

        result.map(|resolution| ScanOutcome::Resolved { resolution })
    }

    /// The scanner screen became visible again.
    pub fn on_screen_focused(&self) {
        lock(&self.debouncer).reset_last_barcode();

        let mut scope = self
            .visibility
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if scope.is_cancelled() {
            *scope = CancellationToken::new();
        }
    }

    /// The scanner screen was hidden; in-flight lookups are abandoned.
    pub fn on_screen_blurred(&self) {
        self.current_scope().cancel();
    }

    pub fn set_debounce(&self, debounce: Duration) {
        lock(&self.debouncer).set_threshold(debounce);
    }

    pub fn is_busy(&self) -> bool {
        lock(&self.debouncer).is_busy()
    }

    fn current_scope(&self) -> CancellationToken {
        self.visibility
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }
}
