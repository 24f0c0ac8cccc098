//! Profile API client and file loader.

use super::SourceError;
use crate::location::LocatableEntity;
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;
use tracing::debug;

const USER_AGENT: &str = "matchmap/0.3 (member-map)";

/// Either a paginated page or a bare list; the API returns both depending
/// on whether pagination is enabled.
#[derive(Deserialize)]
#[serde(untagged)]
enum ProfilesBody {
    Paginated { results: Vec<LocatableEntity> },
    Bare(Vec<LocatableEntity>),
}

impl From<ProfilesBody> for Vec<LocatableEntity> {
    fn from(body: ProfilesBody) -> Self {
        match body {
            ProfilesBody::Paginated { results } => results,
            ProfilesBody::Bare(list) => list,
        }
    }
}

/// Parse a profiles response body.
pub fn parse_profiles(body: &str) -> Result<Vec<LocatableEntity>, SourceError> {
    serde_json::from_str::<ProfilesBody>(body)
        .map(Into::into)
        .map_err(|e| SourceError::InvalidResponse(e.to_string()))
}

/// Read profiles from a JSON file in either response shape.
pub fn load_file(path: &Path) -> Result<Vec<LocatableEntity>, SourceError> {
    let data = std::fs::read_to_string(path).map_err(|source| SourceError::Io {
        path: path.display().to_string(),
        source,
    })?;
    parse_profiles(&data)
}

/// Keep only members that have a city or a country.
pub fn with_location(entities: Vec<LocatableEntity>) -> Vec<LocatableEntity> {
    entities.into_iter().filter(LocatableEntity::has_location).collect()
}

#[derive(Debug, Clone)]
pub struct ProfileClient {
    base_url: String,
    token: Option<String>,
    timeout: Duration,
}

impl ProfileClient {
    pub fn new(base_url: impl Into<String>, token: Option<String>) -> Self {
        Self {
            base_url: base_url.into(),
            token,
            timeout: Duration::from_secs(10),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// The endpoint listing members who opted into the map.
    pub fn map_url(&self) -> String {
        format!("{}/profiles/?show_on_map=true", self.base_url.trim_end_matches('/'))
    }

    pub fn fetch(&self) -> Result<Vec<LocatableEntity>, SourceError> {
        let url = self.map_url();
        let mut request = ureq::get(&url)
            .set("User-Agent", USER_AGENT)
            .timeout(self.timeout);
        if let Some(token) = &self.token {
            request = request.set("Authorization", &format!("Bearer {}", token));
        }

        let response = request.call().map_err(|e| match e {
            ureq::Error::Status(403, _) => SourceError::Forbidden,
            ureq::Error::Status(code, _) => SourceError::Network(format!("HTTP {} from {}", code, url)),
            other => SourceError::Network(other.to_string()),
        })?;

        let body = response
            .into_string()
            .map_err(|e| SourceError::InvalidResponse(e.to_string()))?;
        let entities = parse_profiles(&body)?;
        debug!(count = entities.len(), %url, "Fetched profiles");
        Ok(entities)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::location;
    use tempfile::TempDir;

    #[test]
    fn test_parse_paginated() {
        let body = r#"{"count": 2, "next": null, "results": [
            {"id": 1, "current_city": "Dhaka", "current_country": "BD"},
            {"id": 2, "current_city": null, "current_country": "GB"}
        ]}"#;
        let entities = parse_profiles(body).unwrap();
        assert_eq!(entities.len(), 2);
        assert_eq!(entities[0].id, "1");
        assert!(entities[1].city.is_none());
    }

    #[test]
    fn test_parse_bare_list() {
        let entities = parse_profiles(r#"[{"id": "a", "city": "Lima"}]"#).unwrap();
        assert_eq!(entities[0].city.as_deref(), Some("Lima"));
    }

    #[test]
    fn test_parse_garbage() {
        assert!(matches!(parse_profiles(r#"{"detail": "nope"}"#), Err(SourceError::InvalidResponse(_))));
    }

    #[test]
    fn test_with_location_drops_unlocated() {
        let kept = with_location(vec![
            LocatableEntity::new("1", Some("Dhaka"), None),
            LocatableEntity::new("2", None, None),
            LocatableEntity::new("3", Some(""), Some("")),
            LocatableEntity::new("4", None, Some("BD")),
            LocatableEntity::new("5", Some(" "), None),
        ]);
        let ids: Vec<_> = kept.iter().map(|e| e.id.as_str()).collect();
        assert_eq!(ids, ["1", "4", "5"]);
        assert_eq!(location::resolve(kept[2].city.as_deref(), None), location::WORLD_CENTER);
    }

    #[test]
    fn test_load_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("members.json");
        std::fs::write(&path, r#"[{"id": 5, "current_city": "Cairo"}]"#).unwrap();
        let entities = load_file(&path).unwrap();
        assert_eq!(entities[0].id, "5");
        assert!(matches!(load_file(&dir.path().join("missing.json")), Err(SourceError::Io { .. })));
    }

    #[test]
    fn test_map_url() {
        let client = ProfileClient::new("http://localhost:8000/api/", None);
        assert_eq!(client.map_url(), "http://localhost:8000/api/profiles/?show_on_map=true");
    }
}
