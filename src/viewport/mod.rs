//! Viewport presenter: decides what the map draws at the current zoom and
//! keeps the map framed on the member set.

pub mod fit;
pub mod presenter;
pub mod render;
pub mod surface;

pub use fit::{FitScheduler, FitToken};
pub use presenter::{PresenterError, ViewportPresenter};
pub use render::{cluster_label, drill_in, fit_request, render, Marker, RenderFrame, RenderMode};
pub use surface::{
    FitRequest, GeoBounds, MapSurface, MapViewport, SharedViewport, SurfaceError, ViewChange,
    ViewState,
};
