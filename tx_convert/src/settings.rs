//! Persisted user settings
//!
//! A small JSON document merged over hard defaults: missing keys (or a
//! missing file) fall back to the built-in values.

use crate::color_space::ColorSpace;
use crate::error::{Result, TxError};
use crate::options::{ConversionOptions, EnvBindings, SuffixTokens, DEFAULT_CONCURRENCY};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info};

const APP_DIR: &str = "tx_convert";
const FILE_NAME: &str = "settings.json";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub batch_size: usize,
    pub suffixes: SuffixTokens,
    pub custom_patterns: BTreeMap<ColorSpace, Vec<String>>,
    pub env_bindings: EnvBindings,
    /// Per-texture compiler timeout in seconds
    pub timeout_secs: Option<u64>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_CONCURRENCY,
            suffixes: SuffixTokens::default(),
            custom_patterns: BTreeMap::new(),
            env_bindings: EnvBindings::default(),
            timeout_secs: None,
        }
    }
}

impl Settings {
    /// `<config dir>/tx_convert/settings.json`, when the platform has one.
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join(APP_DIR).join(FILE_NAME))
    }

    /// Load from `path`; a missing file yields the defaults.
    pub fn load(path: &Path) -> Result<Self> {
        let text = match fs::read_to_string(path) {
            Ok(text) => text,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!(path = %path.display(), "No settings file, using defaults");
                return Ok(Self::default());
            }
            Err(source) => {
                return Err(TxError::SettingsIo {
                    path: path.to_path_buf(),
                    source,
                })
            }
        };

        serde_json::from_str(&text).map_err(|source| TxError::SettingsFormat {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let io_err = |source| TxError::SettingsIo {
            path: path.to_path_buf(),
            source,
        };

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(io_err)?;
        }
        let json = serde_json::to_string_pretty(self).map_err(|source| TxError::SettingsFormat {
            path: path.to_path_buf(),
            source,
        })?;
        fs::write(path, json).map_err(io_err)?;

        info!(path = %path.display(), "Settings saved");
        Ok(())
    }

    /// Copy the persisted fields into a run's options.
    pub fn apply(&self, options: &mut ConversionOptions) {
        options.concurrency = self.batch_size;
        options.suffixes = self.suffixes.clone();
        options.custom_patterns = self.custom_patterns.clone();
        options.env_bindings = self.env_bindings.clone();
        options.timeout = self.timeout_secs.filter(|s| *s > 0).map(Duration::from_secs);
    }

    /// Capture the persisted fields from the options in effect.
    pub fn from_options(options: &ConversionOptions) -> Self {
        Self {
            batch_size: options.concurrency,
            suffixes: options.suffixes.clone(),
            custom_patterns: options.custom_patterns.clone(),
            env_bindings: options.env_bindings.clone(),
            timeout_secs: options.timeout.map(|t| t.as_secs()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = TempDir::new().unwrap();
        let settings = Settings::load(&dir.path().join("settings.json")).unwrap();
        assert_eq!(settings, Settings::default());
        assert_eq!(settings.batch_size, 6);
        assert_eq!(settings.env_bindings.renderman, "RMANTREE");
    }

    #[test]
    fn test_partial_document_merges_over_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("settings.json");
        fs::write(
            &path,
            r#"{
                "batch_size": 3,
                "suffixes": { "raw": "_data" },
                "custom_patterns": { "lin_srgb": ["_hdr"] },
                "env_bindings": { "arnold": "STUDIO_MAKETX" }
            }"#,
        )
        .unwrap();

        let settings = Settings::load(&path).unwrap();
        assert_eq!(settings.batch_size, 3);
        assert_eq!(settings.suffixes.raw, "_data");
        assert_eq!(settings.suffixes.acescg, "_acescg");
        assert_eq!(settings.custom_patterns[&ColorSpace::LinSrgb], vec!["_hdr"]);
        assert_eq!(settings.env_bindings.arnold, "STUDIO_MAKETX");
        assert_eq!(settings.env_bindings.ocio, "OCIO");
        assert_eq!(settings.timeout_secs, None);
    }

    #[test]
    fn test_save_then_load() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("settings.json");
        let mut settings = Settings::default();
        settings.timeout_secs = Some(900);
        settings
            .custom_patterns
            .insert(ColorSpace::Raw, vec!["_id".to_string()]);

        settings.save(&path).unwrap();
        assert_eq!(Settings::load(&path).unwrap(), settings);
    }

    #[test]
    fn test_malformed_file_is_an_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("settings.json");
        fs::write(&path, "{ not json").unwrap();
        assert!(matches!(Settings::load(&path), Err(TxError::SettingsFormat { .. })));
    }

    #[test]
    fn test_apply_to_options() {
        let settings = Settings {
            batch_size: 2,
            timeout_secs: Some(30),
            ..Settings::default()
        };
        let mut options = ConversionOptions::default();
        settings.apply(&mut options);
        assert_eq!(options.concurrency, 2);
        assert_eq!(options.timeout, Some(Duration::from_secs(30)));
        assert_eq!(Settings::from_options(&options), settings);
    }
}
