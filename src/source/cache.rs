//! File-based map data cache at ~/.matchmap/map_cache.json.
//!
//! Holds the last located member list per source, keyed case-insensitively
//! by the source URL. TTL: 5 minutes, after which the list is stale and
//! only served when the network is unavailable.

use super::SourceError;
use crate::location::LocatableEntity;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::warn;

pub const CACHE_TTL_MS: i64 = 5 * 60 * 1000;

#[derive(Serialize, Deserialize, Clone)]
struct CacheEntry {
    timestamp: i64,
    entities: Vec<LocatableEntity>,
}

/// Whether a cache hit is within its TTL.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Freshness {
    Fresh,
    Stale,
}

pub struct MapDataCache {
    path: PathBuf,
    entries: HashMap<String, CacheEntry>,
}

impl MapDataCache {
    /// Load cache from the default location (~/.matchmap/map_cache.json).
    pub fn load() -> Self {
        Self::load_from(Self::default_path())
    }

    /// Load cache from a specific path (for testing).
    pub fn load_from(path: PathBuf) -> Self {
        let entries = Self::read_file(&path).unwrap_or_default();
        Self { path, entries }
    }

    fn default_path() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".matchmap")
            .join("map_cache.json")
    }

    fn read_file(path: &Path) -> Option<HashMap<String, CacheEntry>> {
        let data = fs::read_to_string(path).ok()?;
        match serde_json::from_str(&data) {
            Ok(entries) => Some(entries),
            Err(e) => {
                warn!("Ignoring unreadable map cache {}: {}", path.display(), e);
                None
            }
        }
    }

    /// Fresh entry for `source`, or None if missing or expired.
    pub fn get(&self, source: &str) -> Option<Vec<LocatableEntity>> {
        match self.get_any(source)? {
            (entities, Freshness::Fresh) => Some(entities),
            (_, Freshness::Stale) => None,
        }
    }

    /// Entry for `source` regardless of age.
    pub fn get_any(&self, source: &str) -> Option<(Vec<LocatableEntity>, Freshness)> {
        let entry = self.entries.get(&source.to_lowercase())?;
        let now = chrono::Utc::now().timestamp_millis();
        let freshness = if now - entry.timestamp > CACHE_TTL_MS {
            Freshness::Stale
        } else {
            Freshness::Fresh
        };
        Some((entry.entities.clone(), freshness))
    }

    /// Store a list and persist to disk.
    pub fn put(&mut self, source: &str, entities: &[LocatableEntity]) -> Result<(), SourceError> {
        self.entries.insert(
            source.to_lowercase(),
            CacheEntry {
                timestamp: chrono::Utc::now().timestamp_millis(),
                entities: entities.to_vec(),
            },
        );
        self.persist()
    }

    fn persist(&self) -> Result<(), SourceError> {
        let io_err = |source| SourceError::Io {
            path: self.path.display().to_string(),
            source,
        };
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(io_err)?;
        }
        let json = serde_json::to_string_pretty(&self.entries)
            .map_err(|e| SourceError::InvalidResponse(e.to_string()))?;
        fs::write(&self.path, json).map_err(io_err)
    }

    /// Number of entries (for testing).
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
