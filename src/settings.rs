use anyhow::{Context, Result};
use log::warn;
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::PathBuf,
    sync::{RwLock, RwLockReadGuard, RwLockWriteGuard},
    time::Duration,
};

pub const LOOKUP_URL_ENV: &str = "GRAMSCALE_LOOKUP_URL";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LookupSettings {
    pub base_url: String,
    pub user_agent: String,
    pub username: Option<String>,
    pub password: Option<String>,
    pub timeout_secs: u64,
}

impl Default for LookupSettings {
    fn default() -> Self {
        Self {
            base_url: "https://world.openfoodfacts.net".into(),
            user_agent: "GramScaleApp/0.1".into(),
            username: Some("off".into()),
            password: Some("off".into()),
            timeout_secs: 10,
        }
    }
}

impl LookupSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs.max(1))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ScannerSettings {
    pub debounce_ms: u64,
}

impl Default for ScannerSettings {
    fn default() -> Self {
        Self { debounce_ms: 500 }
    }
}

impl ScannerSettings {
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SummarySettings {
    /// Scale each entry's nutrients by its serving multiplier.
    pub weighted_totals: bool,
}

impl Default for SummarySettings {
    fn default() -> Self {
        Self {
            weighted_totals: true,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AppSettings {
    pub lookup: LookupSettings,
    pub scanner: ScannerSettings,
    pub summary: SummarySettings,
}

pub struct SettingsStore {
    path: PathBuf,
    data: RwLock<AppSettings>,
}

impl SettingsStore {
    pub fn new(path: PathBuf) -> Result<Self> {
        let mut data = if path.exists() {
            let contents = fs::read_to_string(&path)
                .with_context(|| format!("Failed to read settings from {}", path.display()))?;
            serde_json::from_str(&contents).unwrap_or_else(|err| {
                warn!("Ignoring malformed settings at {}: {err}", path.display());
                AppSettings::default()
            })
        } else {
            AppSettings::default()
        };

        if let Ok(url) = std::env::var(LOOKUP_URL_ENV) {
            if !url.trim().is_empty() {
                data.lookup.base_url = url.trim().to_string();
            }
        }

        Ok(Self {
            path,
            data: RwLock::new(data),
        })
    }

    pub fn get(&self) -> AppSettings {
        self.read().clone()
    }

    pub fn lookup(&self) -> LookupSettings {
        self.read().lookup.clone()
    }

    pub fn scanner(&self) -> ScannerSettings {
        self.read().scanner.clone()
    }

    pub fn summary(&self) -> SummarySettings {
        self.read().summary.clone()
    }

    pub fn update_summary(&self, settings: SummarySettings) -> Result<()> {
        let mut guard = self.write();
        guard.summary = settings;
        self.persist(&guard)
    }

    pub fn update_scanner(&self, settings: ScannerSettings) -> Result<()> {
        let mut guard = self.write();
        guard.scanner = settings;
        self.persist(&guard)
    }

    fn read(&self) -> RwLockReadGuard<'_, AppSettings> {
        self.data.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, AppSettings> {
        self.data
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn persist(&self, data: &AppSettings) -> Result<()> {
        let serialized = serde_json::to_string_pretty(data)?;
        fs::write(&self.path, serialized)
            .with_context(|| format!("Failed to write settings to {}", self.path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn defaults_when_file_missing() {
        let temp = TempDir::new().unwrap();
        let store = SettingsStore::new(temp.path().join("settings.json")).unwrap();
        let settings = store.get();
        assert_eq!(settings.scanner.debounce_ms, 500);
        assert!(settings.summary.weighted_totals);
        assert_eq!(settings.lookup.timeout(), Duration::from_secs(10));
    }

    #[test]
    fn partial_file_fills_in_defaults() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("settings.json");
        fs::write(&path, r#"{ "scanner": { "debounce_ms": 750 } }"#).unwrap();

        let store = SettingsStore::new(path).unwrap();
        assert_eq!(store.scanner().debounce(), Duration::from_millis(750));
        assert_eq!(store.summary(), SummarySettings::default());
    }

    #[test]
    fn malformed_file_falls_back_to_defaults() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("settings.json");
        fs::write(&path, "not json").unwrap();

        let store = SettingsStore::new(path).unwrap();
        assert_eq!(store.scanner(), ScannerSettings::default());
    }

    #[test]
    fn updates_are_persisted() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("settings.json");

        let store = SettingsStore::new(path.clone()).unwrap();
        store
            .update_summary(SummarySettings {
                weighted_totals: false,
            })
            .unwrap();

        let reopened = SettingsStore::new(path).unwrap();
        assert!(!reopened.summary().weighted_totals);
    }
}
