//! Stateful presenter: owns the current member list and zoom, memoizes the
//! render frame, and keeps the map framed on the data.
//!
//! The frame is recomputed only when the member list or the zoom actually
//! changes. A bounds fit is scheduled on member-list changes only; zooming
//! never refits.

use super::fit::FitScheduler;
use super::render::{self, RenderFrame, RenderMode};
use super::surface::{MapSurface, SurfaceError, ViewChange};
use crate::cluster::{self, LocationGroup, PlacedEntity};
use crate::config::PresenterConfig;
use crate::location::LocatableEntity;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info};

#[derive(Error, Debug)]
pub enum PresenterError {
    #[error("No location group with key '{0}'")]
    UnknownGroup(String),

    #[error(transparent)]
    Surface(#[from] SurfaceError),
}

pub struct ViewportPresenter<S: MapSurface + 'static> {
    config: PresenterConfig,
    surface: Arc<S>,
    scheduler: FitScheduler,
    entities: Vec<LocatableEntity>,
    placed: Vec<PlacedEntity>,
    groups: Vec<LocationGroup>,
    zoom: f64,
    frame: Option<RenderFrame>,
    recomputes: u64,
}

impl<S: MapSurface + 'static> ViewportPresenter<S> {
    pub fn new(surface: Arc<S>, config: PresenterConfig) -> Self {
        Self {
            scheduler: FitScheduler::new(config.fit_debounce()),
            zoom: config.initial_zoom,
            config,
            surface,
            entities: Vec::new(),
            placed: Vec::new(),
            groups: Vec::new(),
            frame: None,
            recomputes: 0,
        }
    }

    /// Replace the member list. Returns `false` (and does nothing) when the
    /// list is unchanged.
    pub fn set_entities(&mut self, entities: Vec<LocatableEntity>) -> bool {
        if entities == self.entities {
            return false;
        }
        self.placed = cluster::build_with_radius(&entities, self.config.spread_radius);
        self.groups = cluster::group_by_location(&self.placed);
        self.entities = entities;
        self.frame = None;

        info!(
            entities = self.placed.len(),
            groups = self.groups.len(),
            "Member list changed"
        );
        self.refit();
        true
    }

    /// Update the zoom. Returns `false` when the value is unchanged.
    pub fn set_zoom(&mut self, zoom: f64) -> bool {
        if zoom == self.zoom {
            return false;
        }
        let before = self.mode();
        self.zoom = zoom;
        self.frame = None;
        if self.mode() != before {
            debug!(zoom, mode = %self.mode(), "Render mode switched");
        }
        true
    }

    /// Zoom the surface in place and follow it. A surface that reports no
    /// view only updates the presenter.
    pub fn zoom_to(&mut self, zoom: f64) -> Result<bool, PresenterError> {
        if let Some(view) = self.surface.view() {
            self.surface.set_view(ViewChange { center: view.center, zoom })?;
            return Ok(self.sync_zoom());
        }
        Ok(self.set_zoom(zoom))
    }

    /// Frame the current member list again, e.g. once the surface has been
    /// mounted and can accept a fit.
    pub fn remount(&mut self) {
        debug!(entities = self.placed.len(), "Surface mounted, refitting");
        self.refit();
    }

    /// Pick up the zoom the surface ended on (after a fit or a user zoom).
    pub fn sync_zoom(&mut self) -> bool {
        match self.surface.view() {
            Some(view) => self.set_zoom(view.zoom),
            None => false,
        }
    }

    /// The current frame, computed on first access after a change.
    pub fn frame(&mut self) -> &RenderFrame {
        let recomputes = &mut self.recomputes;
        let (placed, zoom, config) = (&self.placed, self.zoom, &self.config);
        self.frame.get_or_insert_with(|| {
            *recomputes += 1;
            render::render(placed, zoom, config)
        })
    }

    /// Activate a location group: centre on it at the drill-in zoom.
    pub fn activate(&mut self, key: &str) -> Result<ViewChange, PresenterError> {
        let group = self
            .groups
            .iter()
            .find(|g| g.key == key)
            .ok_or_else(|| PresenterError::UnknownGroup(key.to_string()))?;
        let change = render::drill_in(group, &self.config);
        self.surface.set_view(change)?;
        self.set_zoom(change.zoom);
        Ok(change)
    }

    /// Cancel any pending fit. Call when the map goes away.
    pub fn teardown(&mut self) {
        self.scheduler.cancel();
    }

    pub fn mode(&self) -> RenderMode {
        RenderMode::for_zoom(self.zoom, self.config.zoom_threshold)
    }

    pub fn zoom(&self) -> f64 {
        self.zoom
    }

    pub fn placed(&self) -> &[PlacedEntity] {
        &self.placed
    }

    pub fn groups(&self) -> &[LocationGroup] {
        &self.groups
    }

    pub fn config(&self) -> &PresenterConfig {
        &self.config
    }

    pub fn surface(&self) -> &Arc<S> {
        &self.surface
    }

    /// How many times the frame has been computed.
    pub fn recompute_count(&self) -> u64 {
        self.recomputes
    }

    pub fn fit_pending(&self) -> bool {
        self.scheduler.is_pending()
    }

    fn refit(&mut self) {
        match render::fit_request(&self.placed, &self.config) {
            Some(request) => {
                self.scheduler.schedule(Arc::clone(&self.surface), request);
            }
            // Nothing to frame; a fit queued for the previous list is stale.
            None => self.scheduler.cancel(),
        }
    }
}
