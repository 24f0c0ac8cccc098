use crate::config::PresenterConfig;
use crate::source::ProfileSource;
use crate::viewport::{MapViewport, SharedViewport, ViewportPresenter};
use std::sync::{Arc, Mutex};

pub struct AppState {
    pub presenter: Mutex<ViewportPresenter<SharedViewport>>,
    pub viewport: SharedViewport,
    pub source: Mutex<ProfileSource>,
}

impl AppState {
    pub fn new(source: ProfileSource, config: PresenterConfig) -> Self {
        let viewport = SharedViewport::new(MapViewport::new(config.initial_center, config.initial_zoom));
        let presenter = ViewportPresenter::new(Arc::new(viewport.clone()), config);
        Self {
            presenter: Mutex::new(presenter),
            viewport,
            source: Mutex::new(source),
        }
    }
}
