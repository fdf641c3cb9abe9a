pub mod commands;
pub mod db;
pub mod error;
pub mod journal;
pub mod lookup;
pub mod scanner;
pub mod settings;
pub mod summary;
pub mod utils;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use db::Database;
use journal::FoodJournal;
use lookup::OpenFoodFactsClient;
use scanner::{ScanController, ScanPipeline};
use settings::SettingsStore;
use summary::{SummaryController, TotalsPolicy};

pub use utils::logging::init_logging;

pub const DATA_DIR_ENV: &str = "GRAMSCALE_DATA_DIR";
const DATABASE_FILE: &str = "gramscale.sqlite3";
const SETTINGS_FILE: &str = "settings.json";

/// Everything the UI bridge needs, wired against one data directory.
pub struct AppState {
    pub db: Database,
    pub scanner: ScanController<OpenFoodFactsClient>,
    pub journal: FoodJournal,
    pub summary: SummaryController,
    pub settings: SettingsStore,
}

impl AppState {
    pub fn open(data_dir: &Path) -> Result<Self> {
        std::fs::create_dir_all(data_dir)
            .with_context(|| format!("failed to create data dir {}", data_dir.display()))?;

        let settings = SettingsStore::new(data_dir.join(SETTINGS_FILE))?;
        let db = Database::new(data_dir.join(DATABASE_FILE))?;

        let lookup_settings = settings.lookup();
        let client = OpenFoodFactsClient::new(&lookup_settings)?;
        let pipeline = ScanPipeline::new(db.clone(), client, lookup_settings.timeout());
        let scanner = ScanController::new(pipeline, settings.scanner().debounce());

        let policy = TotalsPolicy::from_weighted(settings.summary().weighted_totals);
        let summary = SummaryController::new(db.clone(), policy);

        log::info!("GramScale data directory: {}", data_dir.display());

        Ok(Self {
            journal: FoodJournal::new(db.clone()),
            db,
            scanner,
            summary,
            settings,
        })
    }
}

/// `$XDG_DATA_HOME/gramscale` or the platform equivalent.
pub fn default_data_dir() -> Option<PathBuf> {
    dirs::data_dir().map(|dir| dir.join("gramscale"))
}
