//! Location subsystem: turns a member's free-text city/country into a map point.
//!
//! Backed entirely by built-in tables, with no network and no state.

pub mod providers;
pub mod resolver;
pub mod types;

pub use providers::{
    builtin_city_list, builtin_country_list, country_display_name, format_coords, CityInfo,
    CountryInfo, WORLD_CENTER,
};
pub use resolver::{resolve, resolve_with_source};
pub use types::{GeoPoint, LocatableEntity, Resolution, ResolveSource};
