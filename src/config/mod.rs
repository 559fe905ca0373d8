//! Application configuration
//!
//! TOML-based configuration with built-in defaults, loaded once at
//! startup. Analysis settings are served to the pipeline through
//! `SwapSettingsProvider`, which hands out an immutable snapshot per call
//! and supports atomic hot replacement (e.g. when the user saves a new
//! API key) without restarting the engine.
//!
//! ## Loading Order
//!
//! 1. `GLUCOLENS_CONFIG` environment variable (path to TOML file)
//! 2. `glucolens.toml` in the current working directory
//! 3. Built-in defaults

use std::path::{Path, PathBuf};
use std::sync::Arc;

use arc_swap::ArcSwap;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::analysis::SettingsProvider;
use crate::types::AnalysisSettings;

/// Configuration load errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read {0}: {1}")]
    Io(PathBuf, #[source] std::io::Error),
    #[error("Failed to parse {0}: {1}")]
    Parse(PathBuf, #[source] toml::de::Error),
}

// ============================================================================
// Top-Level Config
// ============================================================================

/// Root configuration for a deployment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Directory holding the sled database
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// AI analysis settings
    #[serde(default)]
    pub analysis: AnalysisConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            analysis: AnalysisConfig::default(),
        }
    }
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("./data/glucolens")
}

/// AI analysis configuration section.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// API key for the completion service. Left unset, the analysis
    /// pipeline is a silent no-op. `GLUCOLENS_API_KEY` overrides.
    pub api_key: Option<String>,
    /// Model submitted with each call
    pub model: String,
    /// Token budget per completion
    pub token_budget: u32,
    /// IANA time zone for user-facing formatting
    pub time_zone: String,
    /// Clinical target band (mg/dL)
    pub target_low: f64,
    pub target_high: f64,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        let defaults = AnalysisSettings::default();
        Self {
            api_key: None,
            model: defaults.model,
            token_budget: defaults.token_budget,
            time_zone: defaults.time_zone,
            target_low: defaults.target_low,
            target_high: defaults.target_high,
        }
    }
}

impl AppConfig {
    /// Load configuration using the documented search order. Parse or read
    /// failures log a warning and fall through to the next source.
    pub fn load() -> Self {
        // 1. Check env var
        if let Ok(path) = std::env::var("GLUCOLENS_CONFIG") {
            let p = PathBuf::from(&path);
            if p.exists() {
                match Self::load_from_file(&p) {
                    Ok(config) => {
                        info!(path = %p.display(), "Loaded config from GLUCOLENS_CONFIG");
                        return config;
                    }
                    Err(e) => {
                        warn!(path = %p.display(), error = %e, "Failed to load config from GLUCOLENS_CONFIG, falling back");
                    }
                }
            } else {
                warn!(path = %path, "GLUCOLENS_CONFIG points to non-existent file, falling back");
            }
        }

        // 2. Check ./glucolens.toml
        let local = PathBuf::from("glucolens.toml");
        if local.exists() {
            match Self::load_from_file(&local) {
                Ok(config) => {
                    info!("Loaded config from ./glucolens.toml");
                    return config;
                }
                Err(e) => {
                    warn!(error = %e, "Failed to load ./glucolens.toml, using defaults");
                }
            }
        }

        // 3. Defaults
        info!("No glucolens.toml found — using built-in defaults");
        Self::default()
    }

    /// Load from a specific TOML file path.
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents =
            std::fs::read_to_string(path).map_err(|e| ConfigError::Io(path.to_path_buf(), e))?;
        toml::from_str(&contents).map_err(|e| ConfigError::Parse(path.to_path_buf(), e))
    }

    /// Analysis settings snapshot derived from this config. The API key
    /// honors the `GLUCOLENS_API_KEY` environment override.
    pub fn analysis_settings(&self) -> AnalysisSettings {
        let api_key = std::env::var("GLUCOLENS_API_KEY")
            .ok()
            .filter(|k| !k.trim().is_empty())
            .or_else(|| self.analysis.api_key.clone());

        AnalysisSettings {
            api_key,
            model: self.analysis.model.clone(),
            token_budget: self.analysis.token_budget,
            time_zone: self.analysis.time_zone.clone(),
            target_low: self.analysis.target_low,
            target_high: self.analysis.target_high,
        }
    }
}

// ============================================================================
// Settings Provider
// ============================================================================

/// Settings provider backed by an atomic swap cell.
///
/// Every call to `current_analysis_settings` loads the snapshot stored at
/// that moment; `replace` installs a new snapshot for subsequent calls
/// without blocking in-flight analysis runs.
pub struct SwapSettingsProvider {
    inner: ArcSwap<AnalysisSettings>,
}

impl SwapSettingsProvider {
    pub fn new(settings: AnalysisSettings) -> Self {
        Self {
            inner: ArcSwap::from_pointee(settings),
        }
    }

    /// Install a new snapshot; the next analysis run sees it.
    pub fn replace(&self, settings: AnalysisSettings) {
        self.inner.store(Arc::new(settings));
    }
}

impl SettingsProvider for SwapSettingsProvider {
    fn current_analysis_settings(&self) -> Arc<AnalysisSettings> {
        self.inner.load_full()
    }
}
