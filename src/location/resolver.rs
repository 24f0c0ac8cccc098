//! Coordinate resolver: the fallback chain.
//!
//! Flow: city table → country centroid → world centre.
//!
//! Resolution is total. Member-entered locations are free text and are
//! often partial or misspelled, so an unrecognized input is not an error:
//! it degrades to the next step and ultimately to [`WORLD_CENTER`].

use super::providers::{self, WORLD_CENTER};
use super::types::{GeoPoint, Resolution, ResolveSource};

/// Resolve a (city, country) pair to a map point.
pub fn resolve(city: Option<&str>, country: Option<&str>) -> GeoPoint {
    resolve_with_source(city, country).point
}

/// Resolve and report which step of the chain matched.
pub fn resolve_with_source(city: Option<&str>, country: Option<&str>) -> Resolution {
    let city_key = normalize(city);
    if let Some((point, name)) = providers::city_lookup(&city_key) {
        return Resolution {
            point,
            source: ResolveSource::City,
            matched: Some(name.to_string()),
        };
    }

    let country_key = normalize(country);
    if let Some((point, name)) = providers::country_lookup(&country_key) {
        return Resolution {
            point,
            source: ResolveSource::Country,
            matched: Some(name.to_string()),
        };
    }

    Resolution {
        point: WORLD_CENTER,
        source: ResolveSource::Default,
        matched: None,
    }
}

/// Lower-case and trim; a missing value normalizes to the empty string.
pub fn normalize(value: Option<&str>) -> String {
    value.unwrap_or("").trim().to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_city() {
        assert_eq!(resolve(Some("Dhaka"), Some("BD")), GeoPoint::new(23.8103, 90.4125));
    }

    #[test]
    fn test_resolve_deterministic() {
        let a = resolve(Some("Dhaka"), Some("BD"));
        let b = resolve(Some("Dhaka"), Some("BD"));
        assert_eq!(a.lat.to_bits(), b.lat.to_bits());
        assert_eq!(a.lng.to_bits(), b.lng.to_bits());
    }

    #[test]
    fn test_resolve_country_fallback() {
        let expected = GeoPoint::new(23.6850, 90.3563);
        assert_eq!(resolve(Some("Nowhereville"), Some("BD")), expected);
        assert_eq!(resolve(Some(""), Some("BD")), expected);
        assert_eq!(resolve(None, Some("bd")), expected);
    }

    #[test]
    fn test_resolve_world_center() {
        assert_eq!(resolve(Some("Nowhereville"), Some("Atlantis")), GeoPoint::new(20.0, 0.0));
        assert_eq!(resolve(None, None), WORLD_CENTER);
    }

    #[test]
    fn test_resolve_case_and_whitespace() {
        assert_eq!(resolve(Some(" LONDON "), Some("")), resolve(Some("london"), Some("gb")));
        assert_eq!(resolve(Some("london"), None), GeoPoint::new(51.5074, -0.1278));
    }

    #[test]
    fn test_city_wins_over_country() {
        // A recognized city ignores a contradictory country.
        assert_eq!(resolve(Some("Paris"), Some("BD")), GeoPoint::new(48.8566, 2.3522));
    }

    #[test]
    fn test_resolve_with_source() {
        let r = resolve_with_source(Some("Tokyo"), None);
        assert_eq!(r.source, ResolveSource::City);
        assert_eq!(r.matched.as_deref(), Some("tokyo"));

        let r = resolve_with_source(Some("Osaka"), Some(" Japan "));
        assert_eq!(r.source, ResolveSource::Country);
        assert_eq!(r.matched.as_deref(), Some("japan"));

        let r = resolve_with_source(Some("Osaka"), Some("Narnia"));
        assert_eq!(r.source, ResolveSource::Default);
        assert!(r.matched.is_none());
    }

    #[test]
    fn test_normalize() {
        assert_eq!(normalize(Some("  São Paulo ")), "são paulo");
        assert_eq!(normalize(None), "");
    }
}
