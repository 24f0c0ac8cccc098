//! matchmap places members on the global map.
//!
//! Free-text locations resolve against built-in tables ([`location`]),
//! co-located members are grouped and spread on a small circle
//! ([`cluster`]), and the [`viewport`] presenter picks count badges or
//! individual markers by zoom while keeping the map framed on the data.

pub mod cluster;
pub mod config;
pub mod location;
pub mod server;
pub mod source;
pub mod viewport;
