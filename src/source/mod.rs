//! Member data source for the map.
//!
//! Flow: fresh cache → profile API → stale cache → error.
//! Offline: fresh cache → stale cache → error.

pub mod cache;
pub mod client;

pub use cache::{Freshness, MapDataCache};
pub use client::{load_file, parse_profiles, with_location, ProfileClient};

use crate::location::LocatableEntity;
use thiserror::Error;
use tracing::{info, warn};

#[derive(Error, Debug)]
pub enum SourceError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Invalid API response: {0}")]
    InvalidResponse(String),

    #[error("The member map is only available to signed-in members")]
    Forbidden,

    #[error("I/O error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("No cached member list available")]
    CacheMiss,
}

pub struct ProfileSource {
    client: Option<ProfileClient>,
    cache: MapDataCache,
    offline: bool,
}

impl ProfileSource {
    pub fn new(client: Option<ProfileClient>) -> Self {
        Self::with_cache(client, MapDataCache::load())
    }

    /// Create a source with a specific cache (for testing).
    pub fn with_cache(client: Option<ProfileClient>, cache: MapDataCache) -> Self {
        Self {
            client,
            cache,
            offline: false,
        }
    }

    /// Offline mode skips network calls.
    pub fn set_offline(&mut self, offline: bool) {
        self.offline = offline;
    }

    fn cache_key(&self) -> String {
        self.client
            .as_ref()
            .map(ProfileClient::map_url)
            .unwrap_or_else(|| "default".to_string())
    }

    /// Load the located member list.
    pub fn load(&mut self) -> Result<Vec<LocatableEntity>, SourceError> {
        let key = self.cache_key();

        // 1. Fresh cache
        if let Some(entities) = self.cache.get(&key) {
            info!(count = entities.len(), "Using cached member list");
            return Ok(entities);
        }

        // 2. Network
        let mut last_error = None;
        if let (false, Some(client)) = (self.offline, &self.client) {
            match client.fetch() {
                Ok(entities) => {
                    let located = with_location(entities);
                    if let Err(e) = self.cache.put(&key, &located) {
                        warn!("Could not write map cache: {}", e);
                    }
                    return Ok(located);
                }
                // Guests get the locked map, not yesterday's data.
                Err(SourceError::Forbidden) => return Err(SourceError::Forbidden),
                Err(e) => {
                    warn!("Profile fetch failed: {}", e);
                    last_error = Some(e);
                }
            }
        }

        // 3. Stale cache
        if let Some((entities, _)) = self.cache.get_any(&key) {
            warn!(count = entities.len(), "Serving stale member list");
            return Ok(entities);
        }

        Err(last_error.unwrap_or(SourceError::CacheMiss))
    }
}
