//! Runtime configuration.
//!
//! Server settings come from `MATCHMAP_*` environment variables, with CLI
//! flags layered on top by `main`. Map tuning lives in [`PresenterConfig`].

use crate::cluster::SPREAD_RADIUS;
use crate::location::{GeoPoint, WORLD_CENTER};
use serde::{Deserialize, Serialize};
use std::fmt::Display;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info};

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid {key} value '{value}': {reason}")]
    InvalidValue {
        key: String,
        value: String,
        reason: String,
    },

    #[error("Cannot read presenter config {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed presenter config {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Map tuning values. These were hand-tuned for the member map and are
/// kept as-is.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PresenterConfig {
    /// Below this zoom, co-located members collapse into count markers.
    pub zoom_threshold: f64,
    /// Zoom a cluster marker jumps to when activated.
    pub drill_zoom: f64,
    /// Spread circle radius in degrees.
    pub spread_radius: f64,
    pub fit_padding_px: [u32; 2],
    pub fit_max_zoom: f64,
    pub fit_debounce_ms: u64,
    pub initial_center: GeoPoint,
    pub initial_zoom: f64,
}

impl Default for PresenterConfig {
    fn default() -> Self {
        Self {
            zoom_threshold: 5.0,
            drill_zoom: 6.0,
            spread_radius: SPREAD_RADIUS,
            fit_padding_px: [50, 50],
            fit_max_zoom: 4.0,
            fit_debounce_ms: 100,
            initial_center: WORLD_CENTER,
            initial_zoom: 2.0,
        }
    }
}

impl PresenterConfig {
    pub fn fit_debounce(&self) -> Duration {
        Duration::from_millis(self.fit_debounce_ms)
    }

    /// Load overrides from a JSON file; absent fields keep their defaults.
    pub fn load_file(path: &Path) -> Result<Self, ConfigError> {
        let data = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        serde_json::from_str(&data).map_err(|source| ConfigError::Parse {
            path: path.display().to_string(),
            source,
        })
    }
}

pub struct Config {
    /// Base URL of the profile API, e.g. `https://api.example.com/api`.
    pub api_url: Option<String>,
    pub api_token: Option<String>,
    pub host: String,
    pub port: u16,
    pub presenter: PresenterConfig,
}

impl Config {
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_with(|key| std::env::var(key).ok())
    }

    /// Load from an arbitrary variable lookup (tests pass a map).
    pub fn load_with<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        Ok(Self {
            api_url: optional(&lookup, "MATCHMAP_API_URL"),
            api_token: optional(&lookup, "MATCHMAP_API_TOKEN"),
            host: try_load(&lookup, "MATCHMAP_HOST", "127.0.0.1")?,
            port: try_load(&lookup, "MATCHMAP_PORT", "3030")?,
            presenter: PresenterConfig::default(),
        })
    }
}

fn optional<F>(lookup: &F, key: &str) -> Option<String>
where
    F: Fn(&str) -> Option<String>,
{
    let value = lookup(key).filter(|v| !v.trim().is_empty());
    if value.is_none() {
        debug!("{key} not set");
    }
    value
}

fn try_load<F, T>(lookup: &F, key: &str, default: &str) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: Display,
{
    let raw = lookup(key).unwrap_or_else(|| {
        info!("{key} not set, using default: {default}");
        default.to_string()
    });
    raw.parse().map_err(|e: T::Err| ConfigError::InvalidValue {
        key: key.to_string(),
        value: raw.clone(),
        reason: e.to_string(),
    })
}
