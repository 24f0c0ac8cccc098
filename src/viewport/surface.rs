//! The map surface the presenter drives, and an in-process implementation.
//!
//! [`MapViewport`] models a slippy map: Web Mercator, 256 px tiles, integer
//! zoom snapping. It refuses to fit until it has been given a pixel size,
//! which is how an unmounted map behaves.

use crate::location::GeoPoint;
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;
use std::sync::{Arc, Mutex};
use thiserror::Error;

pub const TILE_SIZE: f64 = 256.0;
pub const MAX_LATITUDE: f64 = 85.051_128_779_8;
pub const MIN_ZOOM: f64 = 0.0;
pub const MAX_ZOOM: f64 = 18.0;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum SurfaceError {
    #[error("map surface is not ready (no pixel size)")]
    NotReady,

    #[error("cannot fit empty bounds")]
    EmptyBounds,

    #[error("invalid point {0:?}")]
    InvalidPoint(GeoPoint),

    #[error("padding {padding:?} leaves no room in a {width}x{height} map")]
    PaddingTooLarge {
        padding: [u32; 2],
        width: u32,
        height: u32,
    },
}

/// A request to frame a set of points.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FitRequest {
    pub points: Vec<GeoPoint>,
    pub padding_px: [u32; 2],
    pub max_zoom: f64,
}

/// A request to jump to a centre and zoom.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ViewChange {
    pub center: GeoPoint,
    pub zoom: f64,
}

/// What a surface is currently showing.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ViewState {
    pub center: GeoPoint,
    pub zoom: f64,
    pub width: u32,
    pub height: u32,
}

/// Capabilities the presenter needs from a map.
pub trait MapSurface: Send + Sync {
    fn fit_bounds(&self, request: &FitRequest) -> Result<(), SurfaceError>;
    fn set_view(&self, change: ViewChange) -> Result<(), SurfaceError>;
    fn view(&self) -> Option<ViewState>;
}

/// Bounding box of a point set, in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct GeoBounds {
    pub south: f64,
    pub west: f64,
    pub north: f64,
    pub east: f64,
}

impl GeoBounds {
    pub fn from_points(points: &[GeoPoint]) -> Option<Self> {
        let first = points.first()?;
        let init = Self {
            south: first.lat,
            west: first.lng,
            north: first.lat,
            east: first.lng,
        };
        Some(points[1..].iter().fold(init, |b, p| Self {
            south: b.south.min(p.lat),
            west: b.west.min(p.lng),
            north: b.north.max(p.lat),
            east: b.east.max(p.lng),
        }))
    }

    pub fn contains(&self, p: &GeoPoint) -> bool {
        (self.south..=self.north).contains(&p.lat) && (self.west..=self.east).contains(&p.lng)
    }
}

// Web Mercator, normalized to [0, 1] across the world.
fn mercator_x(lng: f64) -> f64 {
    (lng + 180.0) / 360.0
}

fn mercator_y(lat: f64) -> f64 {
    let lat_rad = lat.clamp(-MAX_LATITUDE, MAX_LATITUDE) * PI / 180.0;
    (1.0 - (lat_rad.tan() + 1.0 / lat_rad.cos()).ln() / PI) / 2.0
}

fn inverse_mercator_y(y: f64) -> f64 {
    (PI * (1.0 - 2.0 * y)).sinh().atan() * 180.0 / PI
}

/// An in-process map viewport.
#[derive(Debug, Clone)]
pub struct MapViewport {
    pub center: GeoPoint,
    pub zoom: f64,
    pub width: u32,
    pub height: u32,
}

impl MapViewport {
    /// A viewport with no pixel size yet.
    pub fn new(center: GeoPoint, zoom: f64) -> Self {
        Self {
            center,
            zoom,
            width: 0,
            height: 0,
        }
    }

    pub fn resize(&mut self, width: u32, height: u32) {
        self.width = width;
        self.height = height;
    }

    pub fn is_ready(&self) -> bool {
        self.width > 0 && self.height > 0
    }

    pub fn state(&self) -> ViewState {
        ViewState {
            center: self.center,
            zoom: self.zoom,
            width: self.width,
            height: self.height,
        }
    }

    /// Compute the view that frames `request`, without applying it.
    pub fn fit_view(&self, request: &FitRequest) -> Result<ViewChange, SurfaceError> {
        if !self.is_ready() {
            return Err(SurfaceError::NotReady);
        }
        if let Some(bad) = request.points.iter().find(|p| !p.is_finite()) {
            return Err(SurfaceError::InvalidPoint(*bad));
        }
        let bounds = GeoBounds::from_points(&request.points).ok_or(SurfaceError::EmptyBounds)?;

        let [pad_x, pad_y] = request.padding_px;
        let avail_w = self.width as f64 - 2.0 * pad_x as f64;
        let avail_h = self.height as f64 - 2.0 * pad_y as f64;
        if avail_w <= 0.0 || avail_h <= 0.0 {
            return Err(SurfaceError::PaddingTooLarge {
                padding: request.padding_px,
                width: self.width,
                height: self.height,
            });
        }

        let x0 = mercator_x(bounds.west);
        let x1 = mercator_x(bounds.east);
        let y0 = mercator_y(bounds.north);
        let y1 = mercator_y(bounds.south);

        // Largest zoom at which the span still fits; a zero span fits at any zoom.
        let zoom_for = |span: f64, avail: f64| {
            if span > 0.0 {
                (avail / (span * TILE_SIZE)).log2()
            } else {
                f64::INFINITY
            }
        };
        let zoom = zoom_for(x1 - x0, avail_w)
            .min(zoom_for(y1 - y0, avail_h))
            .floor()
            .min(request.max_zoom)
            .clamp(MIN_ZOOM, MAX_ZOOM);

        let center = GeoPoint::new(
            inverse_mercator_y((y0 + y1) / 2.0),
            (x0 + x1) / 2.0 * 360.0 - 180.0,
        );
        Ok(ViewChange { center, zoom })
    }

    /// Frame `request`; on error the current view is left untouched.
    pub fn fit(&mut self, request: &FitRequest) -> Result<ViewChange, SurfaceError> {
        let change = self.fit_view(request)?;
        self.apply(change)?;
        Ok(change)
    }

    pub fn apply(&mut self, change: ViewChange) -> Result<(), SurfaceError> {
        if !change.center.is_finite() || !change.zoom.is_finite() {
            return Err(SurfaceError::InvalidPoint(change.center));
        }
        self.center = GeoPoint::new(
            change.center.lat.clamp(-MAX_LATITUDE, MAX_LATITUDE),
            change.center.lng,
        );
        self.zoom = change.zoom.clamp(MIN_ZOOM, MAX_ZOOM);
        Ok(())
    }
}

/// A [`MapViewport`] shared between the presenter's deferred fits and readers.
#[derive(Debug, Clone)]
pub struct SharedViewport(Arc<Mutex<MapViewport>>);

impl SharedViewport {
    pub fn new(viewport: MapViewport) -> Self {
        Self(Arc::new(Mutex::new(viewport)))
    }

    pub fn resize(&self, width: u32, height: u32) {
        self.with(|vp| vp.resize(width, height))
    }

    pub fn snapshot(&self) -> MapViewport {
        self.with(|vp| vp.clone())
    }

    fn with<R>(&self, f: impl FnOnce(&mut MapViewport) -> R) -> R {
        // Mutations validate before assigning, so a poisoned lock is still consistent.
        let mut guard = self.0.lock().unwrap_or_else(|e| e.into_inner());
        f(&mut guard)
    }
}

impl MapSurface for SharedViewport {
    fn fit_bounds(&self, request: &FitRequest) -> Result<(), SurfaceError> {
        self.with(|vp| vp.fit(request)).map(|_| ())
    }

    fn set_view(&self, change: ViewChange) -> Result<(), SurfaceError> {
        self.with(|vp| vp.apply(change))
    }

    fn view(&self) -> Option<ViewState> {
        Some(self.with(|vp| vp.state()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn mounted() -> MapViewport {
        let mut vp = MapViewport::new(GeoPoint::new(20.0, 0.0), 2.0);
        vp.resize(800, 500);
        vp
    }

    fn request(points: Vec<GeoPoint>) -> FitRequest {
        FitRequest {
            points,
            padding_px: [50, 50],
            max_zoom: 4.0,
        }
    }

    #[test]
    fn test_unmounted_not_ready() {
        let mut vp = MapViewport::new(GeoPoint::new(20.0, 0.0), 2.0);
        let err = vp.fit(&request(vec![GeoPoint::new(1.0, 1.0)])).unwrap_err();
        assert_eq!(err, SurfaceError::NotReady);
        assert_eq!(vp.zoom, 2.0);
    }

    #[test]
    fn test_empty_bounds() {
        let vp = mounted();
        assert_eq!(vp.fit_view(&request(vec![])).unwrap_err(), SurfaceError::EmptyBounds);
    }

    #[test]
    fn test_invalid_point_keeps_view() {
        let mut vp = mounted();
        let err = vp.fit(&request(vec![GeoPoint::new(f64::NAN, 0.0)])).unwrap_err();
        assert!(matches!(err, SurfaceError::InvalidPoint(_)));
        assert_eq!(vp.center, GeoPoint::new(20.0, 0.0));
    }

    #[test]
    fn test_padding_too_large() {
        let mut vp = MapViewport::new(GeoPoint::new(0.0, 0.0), 2.0);
        vp.resize(80, 80);
        let err = vp.fit_view(&request(vec![GeoPoint::new(0.0, 0.0)])).unwrap_err();
        assert!(matches!(err, SurfaceError::PaddingTooLarge { .. }));
    }

    #[test]
    fn test_single_point_capped_at_max_zoom() {
        let mut vp = mounted();
        let change = vp.fit(&request(vec![GeoPoint::new(51.5074, -0.1278)])).unwrap();
        assert_eq!(change.zoom, 4.0);
        assert_relative_eq!(change.center.lat, 51.5074, epsilon = 1e-9);
        assert_relative_eq!(change.center.lng, -0.1278, epsilon = 1e-9);
        assert_eq!(vp.zoom, 4.0);
    }

    #[test]
    fn test_wide_bounds_zoom_out() {
        let vp = mounted();
        let change = vp
            .fit_view(&request(vec![GeoPoint::new(51.5074, -0.1278), GeoPoint::new(-33.8688, 151.2093)]))
            .unwrap();
        // 151.3° of longitude into 700 px: 700 / (0.42 * 256) ≈ 6.5 → zoom 2.
        assert_eq!(change.zoom, 2.0);
        assert!(change.zoom < 4.0);
    }

    #[test]
    fn test_fit_center_is_mercator_midpoint() {
        let vp = mounted();
        let change = vp
            .fit_view(&request(vec![GeoPoint::new(-10.0, -20.0), GeoPoint::new(10.0, 20.0)]))
            .unwrap();
        assert_relative_eq!(change.center.lat, 0.0, epsilon = 1e-9);
        assert_relative_eq!(change.center.lng, 0.0, epsilon = 1e-9);
    }

    #[test]
    fn test_bounds_from_points() {
        let b = GeoBounds::from_points(&[
            GeoPoint::new(1.0, 5.0),
            GeoPoint::new(-2.0, 7.0),
            GeoPoint::new(3.0, -1.0),
        ])
        .unwrap();
        assert_eq!(b, GeoBounds { south: -2.0, west: -1.0, north: 3.0, east: 7.0 });
        assert!(b.contains(&GeoPoint::new(0.0, 0.0)));
        assert!(GeoBounds::from_points(&[]).is_none());
    }

    #[test]
    fn test_mercator_roundtrip() {
        for lat in [-60.0, -10.0, 0.0, 23.8103, 70.0] {
            assert_relative_eq!(inverse_mercator_y(mercator_y(lat)), lat, epsilon = 1e-9);
        }
    }

    #[test]
    fn test_shared_viewport_surface() {
        let shared = SharedViewport::new(MapViewport::new(GeoPoint::new(20.0, 0.0), 2.0));
        assert_eq!(shared.fit_bounds(&request(vec![GeoPoint::new(0.0, 0.0)])), Err(SurfaceError::NotReady));
        shared.resize(400, 300);
        shared.fit_bounds(&request(vec![GeoPoint::new(0.0, 0.0)])).unwrap();
        assert_eq!(shared.view().unwrap().zoom, 4.0);

        shared
            .set_view(ViewChange { center: GeoPoint::new(23.8103, 90.4125), zoom: 6.0 })
            .unwrap();
        let state = shared.view().unwrap();
        assert_eq!(state.zoom, 6.0);
        assert_eq!(state.center, GeoPoint::new(23.8103, 90.4125));
    }
}
