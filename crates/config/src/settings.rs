// Grid settings
// Loaded from ~/.config/livegrid/settings.json

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Default FIFO ledger compaction threshold.
pub const DEFAULT_FIFO_MAX_HOLES: usize = 100;
/// Default hot phase duration of a visual update.
pub const DEFAULT_HOT_TIME_MS: u64 = 1200;
/// Default fader step interval.
pub const DEFAULT_FADE_INTERVAL_MS: u64 = 50;

#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("error reading {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("error parsing {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("invalid setting {name}: {reason}")]
    Invalid { name: &'static str, reason: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GridSettings {
    // Model
    #[serde(rename = "fifo.maxHoles")]
    pub fifo_max_holes: usize,

    #[serde(rename = "model.cleanOnFirstSubscribe")]
    pub clean_on_first_subscribe: bool,

    #[serde(rename = "model.cleanOnLastUnsubscribe")]
    pub clean_on_last_unsubscribe: bool,

    // Visual
    #[serde(rename = "visual.hotTimeMs")]
    pub hot_time_ms: u64,

    #[serde(rename = "visual.coldToHotTimeMs")]
    pub cold_to_hot_time_ms: u64,

    #[serde(rename = "visual.hotToColdTimeMs")]
    pub hot_to_cold_time_ms: u64,

    #[serde(rename = "visual.fadeIntervalMs")]
    pub fade_interval_ms: u64,
}

impl Default for GridSettings {
    fn default() -> Self {
        Self {
            fifo_max_holes: DEFAULT_FIFO_MAX_HOLES,
            clean_on_first_subscribe: false,
            clean_on_last_unsubscribe: false,
            hot_time_ms: DEFAULT_HOT_TIME_MS,
            cold_to_hot_time_ms: 0,
            hot_to_cold_time_ms: 0,
            fade_interval_ms: DEFAULT_FADE_INTERVAL_MS,
        }
    }
}

impl GridSettings {
    /// Get the settings file path
    pub fn config_path() -> PathBuf {
        let config_dir = dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("livegrid");
        config_dir.join("settings.json")
    }

    /// Load settings from the user config dir, falling back to defaults
    pub fn load() -> Self {
        let path = Self::config_path();
        if !path.exists() {
            return Self::default();
        }

        match Self::load_from(&path) {
            Ok(settings) => settings,
            Err(e) => {
                log::warn!("{}; using default settings", e);
                Self::default()
            }
        }
    }

    /// Load and validate settings from an explicit path
    pub fn load_from(path: &Path) -> Result<Self, SettingsError> {
        let contents = fs::read_to_string(path).map_err(|source| SettingsError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        // Strip comments (lines starting with //)
        let cleaned: String = contents
            .lines()
            .filter(|line| !line.trim().starts_with("//"))
            .collect::<Vec<_>>()
            .join("\n");

        let settings: Self = serde_json::from_str(&cleaned).map_err(|source| SettingsError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<(), SettingsError> {
        if self.fifo_max_holes == 0 {
            return Err(SettingsError::Invalid {
                name: "fifo.maxHoles",
                reason: "must be at least 1".to_string(),
            });
        }
        if self.fade_interval_ms == 0 {
            return Err(SettingsError::Invalid {
                name: "visual.fadeIntervalMs",
                reason: "must be at least 1".to_string(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults_match_documented_values() {
        let s = GridSettings::default();
        assert_eq!(s.fifo_max_holes, 100);
        assert_eq!(s.hot_time_ms, 1200);
        assert_eq!(s.fade_interval_ms, 50);
        assert_eq!(s.cold_to_hot_time_ms, 0);
        assert!(s.validate().is_ok());
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "{{").unwrap();
        writeln!(file, "    // shorter flashes").unwrap();
        writeln!(file, "    \"visual.hotTimeMs\": 300").unwrap();
        writeln!(file, "}}").unwrap();

        let s = GridSettings::load_from(file.path()).unwrap();
        assert_eq!(s.hot_time_ms, 300);
        assert_eq!(s.fifo_max_holes, 100);
    }

    #[test]
    fn test_invalid_values_rejected() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "{{\"visual.fadeIntervalMs\": 0}}").unwrap();

        let err = GridSettings::load_from(file.path()).unwrap_err();
        assert!(matches!(err, SettingsError::Invalid { name: "visual.fadeIntervalMs", .. }));
    }

    #[test]
    fn test_parse_error_reported() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "not json").unwrap();

        let err = GridSettings::load_from(file.path()).unwrap_err();
        assert!(matches!(err, SettingsError::Parse { .. }));
    }

    #[test]
    fn test_round_trip_uses_dotted_names() {
        let json = serde_json::to_string(&GridSettings::default()).unwrap();
        assert!(json.contains("\"fifo.maxHoles\":100"));
        assert!(json.contains("\"visual.hotTimeMs\":1200"));
    }
}
