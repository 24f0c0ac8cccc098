//! Zoom-gated marker selection.
//!
//! Below the zoom threshold a location with several members is drawn as a
//! single count badge; at or above it every member gets its own marker at
//! its spread position.

use super::surface::{FitRequest, ViewChange};
use crate::cluster::{group_by_location, LocationGroup, PlacedEntity};
use crate::config::PresenterConfig;
use crate::location::GeoPoint;
use serde::Serialize;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RenderMode {
    Clustered,
    Individual,
}

impl RenderMode {
    /// No hysteresis: the mode is a pure function of the current zoom.
    pub fn for_zoom(zoom: f64, threshold: f64) -> Self {
        if zoom < threshold {
            Self::Clustered
        } else {
            Self::Individual
        }
    }
}

impl fmt::Display for RenderMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Clustered => write!(f, "Clustered"),
            Self::Individual => write!(f, "Individual"),
        }
    }
}

/// One thing to draw on the map.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Marker {
    Individual {
        position: GeoPoint,
        entity: PlacedEntity,
    },
    Cluster {
        position: GeoPoint,
        key: String,
        count: usize,
        label: String,
        entities: Vec<PlacedEntity>,
    },
}

impl Marker {
    pub fn position(&self) -> GeoPoint {
        match self {
            Self::Individual { position, .. } | Self::Cluster { position, .. } => *position,
        }
    }

    pub fn is_cluster(&self) -> bool {
        matches!(self, Self::Cluster { .. })
    }
}

/// Everything the map needs for one zoom level.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RenderFrame {
    pub mode: RenderMode,
    pub zoom: f64,
    pub markers: Vec<Marker>,
}

impl RenderFrame {
    pub fn cluster_count(&self) -> usize {
        self.markers.iter().filter(|m| m.is_cluster()).count()
    }
}

/// Badge text for a cluster marker.
pub fn cluster_label(count: usize) -> String {
    format!("{}+", count)
}

pub fn render(placed: &[PlacedEntity], zoom: f64, config: &PresenterConfig) -> RenderFrame {
    let mode = RenderMode::for_zoom(zoom, config.zoom_threshold);
    let markers = match mode {
        RenderMode::Clustered => group_by_location(placed)
            .into_iter()
            .map(group_marker)
            .collect(),
        RenderMode::Individual => placed
            .iter()
            .map(|p| Marker::Individual {
                position: p.display_position,
                entity: p.clone(),
            })
            .collect(),
    };
    RenderFrame { mode, zoom, markers }
}

fn group_marker(mut group: LocationGroup) -> Marker {
    if group.entities.len() == 1 {
        if let Some(entity) = group.entities.pop() {
            return Marker::Individual {
                position: group.position,
                entity,
            };
        }
    }
    Marker::Cluster {
        position: group.position,
        count: group.entities.len(),
        label: cluster_label(group.entities.len()),
        key: group.key,
        entities: group.entities,
    }
}

/// Where activating a cluster takes the map.
pub fn drill_in(group: &LocationGroup, config: &PresenterConfig) -> ViewChange {
    ViewChange {
        center: group.position,
        zoom: config.drill_zoom,
    }
}

/// Framing request covering every display position; `None` when there is
/// nothing to frame.
pub fn fit_request(placed: &[PlacedEntity], config: &PresenterConfig) -> Option<FitRequest> {
    if placed.is_empty() {
        return None;
    }
    Some(FitRequest {
        points: placed.iter().map(|p| p.display_position).collect(),
        padding_px: config.fit_padding_px,
        max_zoom: config.fit_max_zoom,
    })
}
