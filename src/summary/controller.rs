use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use log::{error, info};
use tokio::sync::Mutex;

use crate::{
    db::Database,
    error::{AppError, AppResult},
};

use super::{daily_summary, DailySummary, TotalsPolicy};

struct SummaryState {
    policy: TotalsPolicy,
    current: Option<DailySummary>,
    /// Bumped each time `current` is replaced by a fresh read.
    generation: u64,
    /// Bumped by every delete that reached the store.
    store_revision: u64,
}

/// Holds the summary set the UI is showing and keeps it in step with the
/// log store.
#[derive(Clone)]
pub struct SummaryController {
    db: Database,
    state: Arc<Mutex<SummaryState>>,
}

impl SummaryController {
    pub fn new(db: Database, policy: TotalsPolicy) -> Self {
        Self {
            db,
            state: Arc::new(Mutex::new(SummaryState {
                policy,
                current: None,
                generation: 0,
                store_revision: 0,
            })),
        }
    }

    pub async fn load_today(&self) -> AppResult<DailySummary> {
        self.load_day(Utc::now().date_naive()).await
    }

    /// Replaces the cached summary set with a fresh read of `day`.
    pub async fn load_day(&self, day: NaiveDate) -> AppResult<DailySummary> {
        loop {
            let (policy, revision) = {
                let state = self.state.lock().await;
                (state.policy, state.store_revision)
            };
            let summary = daily_summary(&self.db, day, policy).await?;

            let mut state = self.state.lock().await;
            if state.store_revision != revision {
                // A delete landed while reading; the rows may include it.
                continue;
            }
            state.current = Some(summary.clone());
            state.generation += 1;
            return Ok(summary);
        }
    }

    pub async fn current(&self) -> Option<DailySummary> {
        self.state.lock().await.current.clone()
    }

    pub async fn set_policy(&self, policy: TotalsPolicy) {
        let mut state = self.state.lock().await;
        state.policy = policy;
        if let Some(current) = state.current.take() {
            state.current = Some(DailySummary::new(current.day, policy, current.entries));
        }
    }

    /// Drops the entry from the cached set before the store delete runs. If
    /// the delete fails the entry goes back where it was, unless the set was
    /// reloaded in the meantime.
    pub async fn delete_entry(&self, entry_id: i64) -> AppResult<()> {
        let (removed, generation) = {
            let mut state = self.state.lock().await;
            let generation = state.generation;
            let removed = state
                .current
                .as_mut()
                .and_then(|summary| summary.remove_entry(entry_id));
            (removed, generation)
        };

        match self.db.delete_log_entry(entry_id).await {
            Ok(deleted) => {
                let mut state = self.state.lock().await;
                state.store_revision += 1;
                if let Some(summary) = state.current.as_mut() {
                    summary.remove_entry(entry_id);
                }

                if deleted {
                    info!("Deleted log entry {entry_id}");
                    Ok(())
                } else if removed.is_some() {
                    // Already gone from the store; the cached set now agrees.
                    Ok(())
                } else {
                    Err(AppError::NotFound(format!("log entry {entry_id}")))
                }
            }
            Err(err) => {
                error!("Failed to delete log entry {entry_id}: {err:#}");
                if let Some((index, row)) = removed {
                    let mut state = self.state.lock().await;
                    if state.generation == generation {
                        if let Some(summary) = state.current.as_mut() {
                            summary.restore_entry(index, row);
                        }
                    }
                }
                Err(AppError::Persistence(err))
            }
        }
    }
}
