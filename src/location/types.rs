//! Core types for the location subsystem.

use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

/// A geographic point in degrees.
///
/// Serialized as a `[lat, lng]` pair, the order map front-ends expect.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "[f64; 2]", into = "[f64; 2]")]
pub struct GeoPoint {
    pub lat: f64,
    pub lng: f64,
}

impl GeoPoint {
    pub const fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }

    /// Euclidean distance in degree space (not great-circle).
    pub fn planar_distance(&self, other: &GeoPoint) -> f64 {
        ((self.lat - other.lat).powi(2) + (self.lng - other.lng).powi(2)).sqrt()
    }

    pub fn is_finite(&self) -> bool {
        self.lat.is_finite() && self.lng.is_finite()
    }
}

impl From<[f64; 2]> for GeoPoint {
    fn from(p: [f64; 2]) -> Self {
        Self::new(p[0], p[1])
    }
}

impl From<GeoPoint> for [f64; 2] {
    fn from(p: GeoPoint) -> Self {
        [p.lat, p.lng]
    }
}

impl fmt::Display for GeoPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", super::providers::format_coords(self.lat, self.lng))
    }
}

/// A member record that can be placed on the map.
///
/// Only `id`, `city` and `country` drive placement; the rest is carried
/// through for marker popups. The REST source names the location fields
/// `current_city` / `current_country`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocatableEntity {
    #[serde(deserialize_with = "id_from_scalar")]
    pub id: String,
    #[serde(default, alias = "current_city")]
    pub city: Option<String>,
    #[serde(default, alias = "current_country")]
    pub country: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub age: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profile_image: Option<String>,
}

impl LocatableEntity {
    pub fn new(id: impl Into<String>, city: Option<&str>, country: Option<&str>) -> Self {
        Self {
            id: id.into(),
            city: city.map(str::to_string),
            country: country.map(str::to_string),
            name: None,
            age: None,
            profile_image: None,
        }
    }

    /// True when at least one location field is non-empty. A whitespace-only
    /// value still counts; it resolves to the world centre.
    pub fn has_location(&self) -> bool {
        let filled = |s: &Option<String>| s.as_deref().is_some_and(|v| !v.is_empty());
        filled(&self.city) || filled(&self.country)
    }

    /// "City, Country" line for a marker popup.
    pub fn location_line(&self) -> String {
        let city = self.city.as_deref().unwrap_or("");
        let country = self
            .country
            .as_deref()
            .map(super::providers::country_display_name)
            .unwrap_or("");
        format!("{}, {}", city, country)
    }
}

// Profile ids arrive as numbers from the REST API and as strings from files.
fn id_from_scalar<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match serde_json::Value::deserialize(deserializer)? {
        serde_json::Value::String(s) => Ok(s),
        serde_json::Value::Number(n) => Ok(n.to_string()),
        other => Err(serde::de::Error::custom(format!(
            "expected string or number id, got {}",
            other
        ))),
    }
}

/// Which step of the fallback chain produced a point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResolveSource {
    City,
    Country,
    Default,
}

impl fmt::Display for ResolveSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::City => write!(f, "City table"),
            Self::Country => write!(f, "Country centroid"),
            Self::Default => write!(f, "World centre"),
        }
    }
}

/// A resolved point together with its provenance.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Resolution {
    pub point: GeoPoint,
    pub source: ResolveSource,
    /// The normalized table key that matched, if any.
    pub matched: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_point_serializes_as_pair() {
        let json = serde_json::to_string(&GeoPoint::new(23.8103, 90.4125)).unwrap();
        assert_eq!(json, "[23.8103,90.4125]");
        let back: GeoPoint = serde_json::from_str(&json).unwrap();
        assert_eq!(back, GeoPoint::new(23.8103, 90.4125));
    }

    #[test]
    fn test_entity_rest_field_names() {
        let e: LocatableEntity = serde_json::from_str(
            r#"{"id": 7, "current_city": "Dhaka", "current_country": "BD", "name": "Amina"}"#,
        )
        .unwrap();
        assert_eq!(e.id, "7");
        assert_eq!(e.city.as_deref(), Some("Dhaka"));
        assert_eq!(e.country.as_deref(), Some("BD"));
        assert_eq!(e.name.as_deref(), Some("Amina"));
    }

    #[test]
    fn test_entity_missing_location_fields() {
        let e: LocatableEntity = serde_json::from_str(r#"{"id": "abc"}"#).unwrap();
        assert!(e.city.is_none());
        assert!(e.country.is_none());
        assert!(!e.has_location());
    }

    #[test]
    fn test_entity_rejects_object_id() {
        let r: Result<LocatableEntity, _> = serde_json::from_str(r#"{"id": {"x": 1}}"#);
        assert!(r.is_err());
    }

    #[test]
    fn test_has_location_needs_non_empty_field() {
        assert!(!LocatableEntity::new("1", Some(""), Some("")).has_location());
        assert!(LocatableEntity::new("1", Some("   "), Some("")).has_location());
        assert!(LocatableEntity::new("1", None, Some("BD")).has_location());
    }

    #[test]
    fn test_location_line_shows_uk_for_gb() {
        let e = LocatableEntity::new("1", Some("London"), Some("GB"));
        assert_eq!(e.location_line(), "London, UK");
        let e = LocatableEntity::new("2", Some("Dhaka"), Some("BD"));
        assert_eq!(e.location_line(), "Dhaka, BD");
    }

    #[test]
    fn test_planar_distance() {
        let a = GeoPoint::new(0.0, 0.0);
        let b = GeoPoint::new(3.0, 4.0);
        assert!((a.planar_distance(&b) - 5.0).abs() < 1e-12);
    }
}
