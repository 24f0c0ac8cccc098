//! Built-in coordinate tables: major cities and country centroids.
//!
//! Both tables are immutable statics. Keys are stored already normalized
//! (lower-case, trimmed), so a lookup is a plain equality scan.

use super::types::GeoPoint;
use serde::Serialize;

// ─── City table ─────────────────────────────────────────────────

struct BuiltinCity {
    name: &'static str,
    lat: f64,
    lng: f64,
}

const fn city(name: &'static str, lat: f64, lng: f64) -> BuiltinCity {
    BuiltinCity { name, lat, lng }
}

const BUILTIN_CITIES: &[BuiltinCity] = &[
    // North America
    city("new york", 40.7128, -74.0060),
    city("los angeles", 34.0522, -118.2437),
    city("chicago", 41.8781, -87.6298),
    city("toronto", 43.6532, -79.3832),
    city("vancouver", 49.2827, -123.1207),
    city("mexico city", 19.4326, -99.1332),
    // Europe
    city("london", 51.5074, -0.1278),
    city("paris", 48.8566, 2.3522),
    city("berlin", 52.5200, 13.4050),
    city("madrid", 40.4168, -3.7038),
    city("rome", 41.9028, 12.4964),
    city("amsterdam", 52.3676, 4.9041),
    city("barcelona", 41.3851, 2.1734),
    city("istanbul", 41.0082, 28.9784),
    city("moscow", 55.7558, 37.6173),
    // Asia
    city("tokyo", 35.6762, 139.6503),
    city("beijing", 39.9042, 116.4074),
    city("shanghai", 31.2304, 121.4737),
    city("hong kong", 22.3193, 114.1694),
    city("singapore", 1.3521, 103.8198),
    city("dubai", 25.2048, 55.2708),
    city("mumbai", 19.0760, 72.8777),
    city("delhi", 28.7041, 77.1025),
    city("bangkok", 13.7563, 100.5018),
    city("seoul", 37.5665, 126.9780),
    city("manila", 14.5995, 120.9842),
    city("jakarta", -6.2088, 106.8456),
    city("karachi", 24.8607, 67.0011),
    city("dhaka", 23.8103, 90.4125),
    // Middle East
    city("riyadh", 24.7136, 46.6753),
    city("cairo", 30.0444, 31.2357),
    city("tehran", 35.6892, 51.3890),
    city("baghdad", 33.3152, 44.3661),
    // Africa
    city("lagos", 6.5244, 3.3792),
    city("johannesburg", -26.2041, 28.0473),
    city("nairobi", -1.2864, 36.8172),
    city("cape town", -33.9249, 18.4241),
    // South America
    city("são paulo", -23.5505, -46.6333),
    city("rio de janeiro", -22.9068, -43.1729),
    city("buenos aires", -34.6037, -58.3816),
    city("bogotá", 4.7110, -74.0721),
    city("lima", -12.0464, -77.0428),
    // Oceania
    city("sydney", -33.8688, 151.2093),
    city("melbourne", -37.8136, 144.9631),
    city("auckland", -36.8485, 174.7633),
];

// ─── Country table ──────────────────────────────────────────────

struct BuiltinCountry {
    names: &'static [&'static str], // full name + 2/3-letter aliases
    code: &'static str,
    lat: f64,
    lng: f64,
}

const BUILTIN_COUNTRIES: &[BuiltinCountry] = &[
    BuiltinCountry {
        names: &["united states", "usa", "us"],
        code: "US", lat: 37.0902, lng: -95.7129,
    },
    BuiltinCountry {
        names: &["canada", "ca", "can"],
        code: "CA", lat: 56.1304, lng: -106.3468,
    },
    BuiltinCountry {
        names: &["united kingdom", "uk", "gb", "gbr"],
        code: "GB", lat: 55.3781, lng: -3.4360,
    },
    BuiltinCountry {
        names: &["germany", "de", "deu"],
        code: "DE", lat: 51.1657, lng: 10.4515,
    },
    BuiltinCountry {
        names: &["france", "fr", "fra"],
        code: "FR", lat: 46.2276, lng: 2.2137,
    },
    BuiltinCountry {
        names: &["spain", "es", "esp"],
        code: "ES", lat: 40.4637, lng: -3.7492,
    },
    BuiltinCountry {
        names: &["italy", "it", "ita"],
        code: "IT", lat: 41.8719, lng: 12.5674,
    },
    BuiltinCountry {
        names: &["japan", "jp", "jpn"],
        code: "JP", lat: 36.2048, lng: 138.2529,
    },
    BuiltinCountry {
        names: &["china", "cn", "chn"],
        code: "CN", lat: 35.8617, lng: 104.1954,
    },
    BuiltinCountry {
        names: &["india", "in", "ind"],
        code: "IN", lat: 20.5937, lng: 78.9629,
    },
    BuiltinCountry {
        names: &["australia", "au", "aus"],
        code: "AU", lat: -25.2744, lng: 133.7751,
    },
    BuiltinCountry {
        names: &["brazil", "br", "bra"],
        code: "BR", lat: -14.2350, lng: -51.9253,
    },
    BuiltinCountry {
        names: &["mexico", "mx", "mex"],
        code: "MX", lat: 23.6345, lng: -102.5528,
    },
    BuiltinCountry {
        names: &["pakistan", "pk", "pak"],
        code: "PK", lat: 30.3753, lng: 69.3451,
    },
    BuiltinCountry {
        names: &["bangladesh", "bd", "bgd"],
        code: "BD", lat: 23.6850, lng: 90.3563,
    },
];

/// Point used when neither city nor country is recognized.
pub const WORLD_CENTER: GeoPoint = GeoPoint::new(20.0, 0.0);

/// Exact lookup in the city table. `key` must already be normalized.
pub(super) fn city_lookup(key: &str) -> Option<(GeoPoint, &'static str)> {
    BUILTIN_CITIES
        .iter()
        .find(|c| c.name == key)
        .map(|c| (GeoPoint::new(c.lat, c.lng), c.name))
}

/// Exact lookup in the country table, matching the name or any alias.
pub(super) fn country_lookup(key: &str) -> Option<(GeoPoint, &'static str)> {
    BUILTIN_COUNTRIES
        .iter()
        .find_map(|c| {
            c.names
                .iter()
                .find(|n| **n == key)
                .map(|n| (GeoPoint::new(c.lat, c.lng), *n))
        })
}

/// A city entry for the public city list API.
#[derive(Debug, Clone, Serialize)]
pub struct CityInfo {
    pub name: String,
    pub position: GeoPoint,
}

/// A country entry for the public country list API.
#[derive(Debug, Clone, Serialize)]
pub struct CountryInfo {
    pub code: String,
    pub names: Vec<String>,
    pub position: GeoPoint,
}

/// Return the full built-in city list (for autocomplete / API).
pub fn builtin_city_list() -> Vec<CityInfo> {
    BUILTIN_CITIES
        .iter()
        .map(|c| CityInfo {
            name: c.name.to_string(),
            position: GeoPoint::new(c.lat, c.lng),
        })
        .collect()
}

pub fn builtin_country_list() -> Vec<CountryInfo> {
    BUILTIN_COUNTRIES
        .iter()
        .map(|c| CountryInfo {
            code: c.code.to_string(),
            names: c.names.iter().map(|n| n.to_string()).collect(),
            position: GeoPoint::new(c.lat, c.lng),
        })
        .collect()
}

/// Popup label for a stored country value. Members store the ISO code,
/// and the UK is shown by its common name rather than "GB".
pub fn country_display_name(country: &str) -> &str {
    match country {
        "GB" => "UK",
        other => other,
    }
}

/// Format coordinates with hemisphere letters, e.g. `23.8103°N, 90.4125°E`.
pub fn format_coords(lat: f64, lng: f64) -> String {
    let ns = if lat >= 0.0 { 'N' } else { 'S' };
    let ew = if lng >= 0.0 { 'E' } else { 'W' };
    format!("{:.4}\u{00B0}{}, {:.4}\u{00B0}{}", lat.abs(), ns, lng.abs(), ew)
}
