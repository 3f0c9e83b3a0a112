use crate::constants::{
    CONFIG_DIR_NAME, DEFAULT_TIME_WINDOW_SECS, MAX_TIME_WINDOW_SECS, MIN_TIME_WINDOW_SECS,
    SETTINGS_FILE_NAME,
};
use crate::{debug, warning};
use serde::{Deserialize, Serialize};
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("time window must be between {min} and {max} seconds (got {secs})")]
    TimeWindowOutOfRange { secs: u64, min: u32, max: u32 },

    #[error("failed to read settings from {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse settings in {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to encode settings: {0}")]
    Encode(#[source] serde_json::Error),

    #[error("failed to write settings to {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// how long (in seconds) a batch stays open and undoable
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeWindow(u32);

impl TimeWindow {
    pub fn new(secs: u64) -> Result<Self, SettingsError> {
        match u32::try_from(secs) {
            Ok(secs) if (MIN_TIME_WINDOW_SECS..=MAX_TIME_WINDOW_SECS).contains(&secs) => {
                Ok(Self(secs))
            }
            _ => Err(SettingsError::TimeWindowOutOfRange {
                secs,
                min: MIN_TIME_WINDOW_SECS,
                max: MAX_TIME_WINDOW_SECS,
            }),
        }
    }

    /// force a value into range
    pub fn clamped(secs: u64) -> Self {
        let secs = secs.clamp(
            u64::from(MIN_TIME_WINDOW_SECS),
            u64::from(MAX_TIME_WINDOW_SECS),
        );
        Self(u32::try_from(secs).unwrap_or(MAX_TIME_WINDOW_SECS))
    }

    pub fn secs(self) -> u32 {
        self.0
    }

    pub fn millis(self) -> u64 {
        u64::from(self.0) * 1000
    }
}

impl Default for TimeWindow {
    fn default() -> Self {
        Self(DEFAULT_TIME_WINDOW_SECS)
    }
}

/// persisted options
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Settings {
    pub time_window: TimeWindow,
}

/// on-disk shape, unknown keys are ignored and missing keys fall back to defaults
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct SettingsFile {
    time_window: u64,
}

impl Default for SettingsFile {
    fn default() -> Self {
        Self {
            time_window: u64::from(DEFAULT_TIME_WINDOW_SECS),
        }
    }
}

/// loads settings at startup and saves them whenever they change
#[derive(Debug, Clone)]
pub struct SettingsStore {
    path: PathBuf,
}

impl SettingsStore {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    /// store in the per-user config directory
    pub fn default_location() -> anyhow::Result<Self> {
        let dir = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("unable to determine config directory"))?;
        Ok(Self::new(dir.join(CONFIG_DIR_NAME).join(SETTINGS_FILE_NAME)))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn load(&self) -> Result<Settings, SettingsError> {
        let content = match std::fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("no settings at {}, using defaults", self.path.display());
                return Ok(Settings::default());
            }
            Err(source) => {
                return Err(SettingsError::Read {
                    path: self.path.clone(),
                    source,
                });
            }
        };

        // an empty file is treated like a missing one
        if content.trim().is_empty() {
            return Ok(Settings::default());
        }

        let file: SettingsFile =
            serde_json::from_str(&content).map_err(|source| SettingsError::Parse {
                path: self.path.clone(),
                source,
            })?;

        let time_window = match TimeWindow::new(file.time_window) {
            Ok(window) => window,
            Err(e) => {
                let window = TimeWindow::clamped(file.time_window);
                warning!("{}, using {} seconds", e, window.secs());
                window
            }
        };

        Ok(Settings { time_window })
    }

    /// write atomically: a temp file in the same directory is persisted over the target
    pub fn save(&self, settings: &Settings) -> Result<(), SettingsError> {
        let write_error = |source| SettingsError::Write {
            path: self.path.clone(),
            source,
        };

        let dir = match self.path.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir.to_path_buf(),
            _ => PathBuf::from("."),
        };
        std::fs::create_dir_all(&dir).map_err(write_error)?;

        let file = SettingsFile {
            time_window: u64::from(settings.time_window.secs()),
        };
        let json = serde_json::to_string_pretty(&file).map_err(SettingsError::Encode)?;

        let mut temp = NamedTempFile::new_in(&dir).map_err(write_error)?;
        temp.write_all(json.as_bytes()).map_err(write_error)?;
        temp.write_all(b"\n").map_err(write_error)?;
        temp.flush().map_err(write_error)?;
        temp.persist(&self.path).map_err(|e| write_error(e.error))?;

        debug!("saved settings to {}", self.path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn store_in(dir: &TempDir) -> SettingsStore {
        SettingsStore::new(dir.path().join("nested").join(SETTINGS_FILE_NAME))
    }

    #[test]
    fn test_time_window_bounds() {
        assert!(TimeWindow::new(3).is_ok());
        assert!(TimeWindow::new(60).is_ok());
        assert!(matches!(
            TimeWindow::new(2),
            Err(SettingsError::TimeWindowOutOfRange { secs: 2, .. })
        ));
        assert!(TimeWindow::new(61).is_err());
        assert!(TimeWindow::new(u64::MAX).is_err());
        assert_eq!(TimeWindow::default().secs(), 10);
        assert_eq!(TimeWindow::default().millis(), 10_000);
    }

    #[test]
    fn test_clamped() {
        assert_eq!(TimeWindow::clamped(0).secs(), 3);
        assert_eq!(TimeWindow::clamped(45).secs(), 45);
        assert_eq!(TimeWindow::clamped(3600).secs(), 60);
    }

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = TempDir::new().unwrap();
        let settings = store_in(&dir).load().unwrap();
        assert_eq!(settings, Settings::default());
    }

    #[test]
    fn test_save_then_load() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);

        let settings = Settings {
            time_window: TimeWindow::new(25).unwrap(),
        };
        store.save(&settings).unwrap();

        let written = std::fs::read_to_string(store.path()).unwrap();
        assert!(written.contains("\"timeWindow\": 25"), "got: {written}");
        assert_eq!(store.load().unwrap(), settings);
    }

    #[test]
    fn test_unknown_and_missing_keys() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(SETTINGS_FILE_NAME);
        std::fs::write(&path, r#"{"somethingElse": true}"#).unwrap();

        let settings = SettingsStore::new(path).load().unwrap();
        assert_eq!(settings.time_window.secs(), 10);
    }

    #[test]
    fn test_out_of_range_value_is_clamped() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(SETTINGS_FILE_NAME);
        std::fs::write(&path, r#"{"timeWindow": 600}"#).unwrap();

        let settings = SettingsStore::new(path).load().unwrap();
        assert_eq!(settings.time_window.secs(), 60);
    }

    #[test]
    fn test_malformed_file_is_an_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(SETTINGS_FILE_NAME);
        std::fs::write(&path, "{ not json").unwrap();

        let result = SettingsStore::new(path).load();
        assert!(matches!(result, Err(SettingsError::Parse { .. })));
    }
}
