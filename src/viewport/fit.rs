//! Deferred, cancellable bounds fitting.
//!
//! A fit runs a short delay after the data changes so the surface can finish
//! laying out first. Scheduling again supersedes the pending fit, and
//! dropping the scheduler cancels it. Fit failures are logged and
//! swallowed: the map simply keeps its previous view.

use super::surface::{FitRequest, MapSurface};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// Identifies one scheduled fit. Only the most recent token is live.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FitToken(u64);

pub struct FitScheduler {
    delay: Duration,
    generation: Arc<AtomicU64>,
    pending: Option<JoinHandle<()>>,
}

impl FitScheduler {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            generation: Arc::new(AtomicU64::new(0)),
            pending: None,
        }
    }

    /// Schedule `request` against `surface`, cancelling any pending fit.
    ///
    /// Outside a tokio runtime there is nothing to defer onto, so the fit is
    /// applied immediately.
    pub fn schedule<S>(&mut self, surface: Arc<S>, request: FitRequest) -> FitToken
    where
        S: MapSurface + ?Sized + 'static,
    {
        self.abort_pending();
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;

        match Handle::try_current() {
            Ok(handle) => {
                let delay = self.delay;
                let live = Arc::clone(&self.generation);
                self.pending = Some(handle.spawn(async move {
                    tokio::time::sleep(delay).await;
                    if live.load(Ordering::SeqCst) == generation {
                        apply_fit(&*surface, &request);
                    }
                }));
            }
            Err(_) => {
                debug!("No async runtime, fitting bounds immediately");
                apply_fit(&*surface, &request);
            }
        }
        FitToken(generation)
    }

    /// Cancel the pending fit, if any.
    pub fn cancel(&mut self) {
        self.generation.fetch_add(1, Ordering::SeqCst);
        self.abort_pending();
    }

    pub fn is_pending(&self) -> bool {
        self.pending.as_ref().is_some_and(|h| !h.is_finished())
    }

    pub fn is_live(&self, token: FitToken) -> bool {
        self.generation.load(Ordering::SeqCst) == token.0
    }

    fn abort_pending(&mut self) {
        if let Some(handle) = self.pending.take() {
            if !handle.is_finished() {
                debug!("Superseding pending bounds fit");
            }
            handle.abort();
        }
    }
}

impl Drop for FitScheduler {
    fn drop(&mut self) {
        self.cancel();
    }
}

/// Run one fit. Returns whether the surface accepted it.
pub fn apply_fit<S>(surface: &S, request: &FitRequest) -> bool
where
    S: MapSurface + ?Sized,
{
    match surface.fit_bounds(request) {
        Ok(()) => {
            debug!(points = request.points.len(), "Fitted map bounds");
            true
        }
        Err(e) => {
            warn!("Map fitBounds error: {}", e);
            false
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::location::GeoPoint;
    use crate::viewport::surface::{SurfaceError, ViewChange, ViewState};
    use std::sync::Mutex;

    /// Records every fit it receives; can be told to fail.
    #[derive(Default)]
    pub(crate) struct RecordingSurface {
        pub fits: Mutex<Vec<FitRequest>>,
        pub views: Mutex<Vec<ViewChange>>,
        pub fail: std::sync::atomic::AtomicBool,
    }

    impl RecordingSurface {
        pub fn fit_count(&self) -> usize {
            self.fits.lock().unwrap().len()
        }

        pub fn set_failing(&self, fail: bool) {
            self.fail.store(fail, Ordering::SeqCst);
        }
    }

    impl MapSurface for RecordingSurface {
        fn fit_bounds(&self, request: &FitRequest) -> Result<(), SurfaceError> {
            if self.fail.load(Ordering::SeqCst) {
                return Err(SurfaceError::NotReady);
            }
            self.fits.lock().unwrap().push(request.clone());
            Ok(())
        }

        fn set_view(&self, change: ViewChange) -> Result<(), SurfaceError> {
            self.views.lock().unwrap().push(change);
            Ok(())
        }

        fn view(&self) -> Option<ViewState> {
            None
        }
    }

    fn request(lat: f64) -> FitRequest {
        FitRequest {
            points: vec![GeoPoint::new(lat, 0.0)],
            padding_px: [50, 50],
            max_zoom: 4.0,
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_fit_is_deferred() {
        let surface = Arc::new(RecordingSurface::default());
        let mut scheduler = FitScheduler::new(Duration::from_millis(100));
        let token = scheduler.schedule(surface.clone(), request(1.0));

        assert!(scheduler.is_live(token));
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(surface.fit_count(), 0);

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(surface.fit_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_reschedule_supersedes_pending() {
        let surface = Arc::new(RecordingSurface::default());
        let mut scheduler = FitScheduler::new(Duration::from_millis(100));
        let first = scheduler.schedule(surface.clone(), request(1.0));
        tokio::time::sleep(Duration::from_millis(60)).await;
        let second = scheduler.schedule(surface.clone(), request(2.0));

        assert!(!scheduler.is_live(first));
        assert!(scheduler.is_live(second));

        tokio::time::sleep(Duration::from_millis(300)).await;
        let fits = surface.fits.lock().unwrap();
        assert_eq!(fits.len(), 1);
        assert_eq!(fits[0].points[0].lat, 2.0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_drop_cancels_pending() {
        let surface = Arc::new(RecordingSurface::default());
        {
            let mut scheduler = FitScheduler::new(Duration::from_millis(100));
            scheduler.schedule(surface.clone(), request(1.0));
            assert!(scheduler.is_pending());
        }
        tokio::time::sleep(Duration::from_millis(300)).await;
        assert_eq!(surface.fit_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failure_is_swallowed() {
        let surface = Arc::new(RecordingSurface::default());
        surface.set_failing(true);
        let mut scheduler = FitScheduler::new(Duration::from_millis(100));
        scheduler.schedule(surface.clone(), request(1.0));
        tokio::time::sleep(Duration::from_millis(200)).await;
        assert_eq!(surface.fit_count(), 0);

        // The scheduler keeps working after a failed fit.
        surface.set_failing(false);
        scheduler.schedule(surface.clone(), request(2.0));
        tokio::time::sleep(Duration::from_millis(200)).await;
        assert_eq!(surface.fit_count(), 1);
    }

    #[test]
    fn test_without_runtime_applies_immediately() {
        let surface = Arc::new(RecordingSurface::default());
        let mut scheduler = FitScheduler::new(Duration::from_millis(100));
        scheduler.schedule(surface.clone(), request(1.0));
        assert_eq!(surface.fit_count(), 1);
        assert!(!scheduler.is_pending());
    }

    #[test]
    fn test_apply_fit_reports_failure() {
        let surface = RecordingSurface::default();
        surface.set_failing(true);
        assert!(!apply_fit(&surface, &request(0.0)));
    }
}
