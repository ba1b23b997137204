//! Embedded card and fullscreen view of the same route
//!
//! Both surfaces hold handles to one [`RouteDisplay`] session and render from
//! its published snapshots. Loading a different route ends the old session and
//! starts a fresh one in `Direct` state.

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use tokio::sync::watch;

use crate::core::cache::RouteGeometryCache;
use crate::core::display::{DisplayState, RouteDisplay, RouteSnapshot, Step, Transition};
use crate::core::geometry::{sanitize, CleanRoute, RawRouteGeometry, RouteId, RouteRecord};
use crate::core::mode::TransportMode;
use crate::core::router::StreetRouter;

/// Where a route is being rendered
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Surface {
    Embedded,
    Fullscreen,
}

impl fmt::Display for Surface {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Surface::Embedded => f.write_str("embedded"),
            Surface::Fullscreen => f.write_str("fullscreen"),
        }
    }
}

/// A rendering surface's subscription to the shared display session
#[derive(Clone)]
pub struct ViewHandle {
    surface: Surface,
    display: RouteDisplay,
    rx: watch::Receiver<RouteSnapshot>,
}

impl ViewHandle {
    fn new(surface: Surface, display: &RouteDisplay) -> Self {
        Self {
            surface,
            display: display.clone(),
            rx: display.subscribe(),
        }
    }

    pub fn surface(&self) -> Surface {
        self.surface
    }

    pub fn display(&self) -> &RouteDisplay {
        &self.display
    }

    /// Latest snapshot, marking it as seen
    pub fn current(&mut self) -> RouteSnapshot {
        self.rx.borrow_and_update().clone()
    }

    /// Whether the session changed since this view last looked
    pub fn needs_render(&self) -> bool {
        self.rx.has_changed().unwrap_or(false)
    }

    /// Wait for the next state change; `false` if the publisher is gone
    pub async fn changed(&mut self) -> bool {
        self.rx.changed().await.is_ok()
    }

    pub async fn toggle_street(&self, mode: TransportMode) -> Transition {
        self.display.toggle_street(mode).await
    }

    pub async fn change_mode(&self, mode: TransportMode) -> Transition {
        self.display.change_mode(mode).await
    }
}

/// Keeps the embedded and fullscreen views of the active route in step
pub struct DualViewSync {
    router: Arc<dyn StreetRouter>,
    cache: Arc<RouteGeometryCache>,
    display: Option<RouteDisplay>,
    fullscreen_open: bool,
    auto_mode: TransportMode,
}

impl DualViewSync {
    pub fn new(router: Arc<dyn StreetRouter>, cache: Arc<RouteGeometryCache>) -> Self {
        Self {
            router,
            cache,
            display: None,
            fullscreen_open: false,
            auto_mode: TransportMode::default(),
        }
    }

    /// Mode used when opening fullscreen auto-enables street routing
    pub fn with_auto_mode(mut self, mode: TransportMode) -> Self {
        self.auto_mode = mode;
        self
    }

    /// Show a route, reusing the session if neither identity nor data changed
    pub fn load_route(&mut self, route_id: RouteId, raw: &RawRouteGeometry) -> RouteDisplay {
        let route = sanitize(raw);

        if let Some(current) = &self.display {
            if current.route_id() == route_id && current.route() == &route {
                return current.clone();
            }
        }

        self.replace_session(route_id, route)
    }

    pub fn load_record(&mut self, record: &RouteRecord) -> RouteDisplay {
        self.load_route(record.id, &record.raw_geometry())
    }

    fn replace_session(&mut self, route_id: RouteId, route: CleanRoute) -> RouteDisplay {
        if let Some(previous) = self.display.take() {
            previous.close();
            self.cache.invalidate(previous.route_id());
            if previous.route_id() != route_id {
                self.fullscreen_open = false;
            }
        }
        // Same id may come back with edited geometry
        self.cache.invalidate(route_id);

        log::debug!("Loaded route {route_id} with {} points", route.len());
        let display = RouteDisplay::new(
            route_id,
            route,
            Arc::clone(&self.router),
            Arc::clone(&self.cache),
        );
        self.display = Some(display.clone());
        display
    }

    /// Navigate away: the session ends and its pending results are ignored
    pub fn unload(&mut self) {
        if let Some(previous) = self.display.take() {
            previous.close();
            self.cache.invalidate(previous.route_id());
        }
        self.fullscreen_open = false;
    }

    pub fn display(&self) -> Option<&RouteDisplay> {
        self.display.as_ref()
    }

    pub fn embedded(&self) -> Option<ViewHandle> {
        self.display
            .as_ref()
            .map(|display| ViewHandle::new(Surface::Embedded, display))
    }

    /// Fullscreen view, only while it is open
    pub fn fullscreen(&self) -> Option<ViewHandle> {
        if !self.fullscreen_open {
            return None;
        }
        self.display
            .as_ref()
            .map(|display| ViewHandle::new(Surface::Fullscreen, display))
    }

    pub fn is_fullscreen_open(&self) -> bool {
        self.fullscreen_open
    }

    /// Open the fullscreen view
    ///
    /// From `Direct`, a routable route is switched to street routing in the
    /// auto mode so the fullscreen map opens with street detail. Any other
    /// state is shown as it is, without recomputing.
    ///
    /// The computation starts right away and does not borrow `self`; dropping
    /// the returned future still lets the session settle.
    pub fn open_fullscreen(
        &mut self,
    ) -> impl Future<Output = Option<(ViewHandle, Transition)>> + Send + 'static {
        let opened = match self.display.clone() {
            Some(display) => {
                self.fullscreen_open = true;
                let view = ViewHandle::new(Surface::Fullscreen, &display);
                let step = if display.state() == DisplayState::Direct && display.route().is_routable() {
                    log::debug!(
                        "Fullscreen opened for route {}, enabling {} routing",
                        display.route_id(),
                        self.auto_mode
                    );
                    display.begin_toggle(self.auto_mode)
                } else {
                    Step::Done(Transition::Unchanged)
                };
                Some((view, step))
            }
            None => None,
        };

        async move {
            let (view, step) = opened?;
            Some((view, step.finish().await))
        }
    }

    /// Close the fullscreen view; the shared state is kept as is
    pub fn close_fullscreen(&mut self) {
        self.fullscreen_open = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::display::tests::{paris, pt, wait_for_pending, CountingRouter, GatedRouter};
    use serde_json::json;
    use std::sync::atomic::Ordering;
    use std::time::Duration;

    fn paris_raw() -> RawRouteGeometry {
        RawRouteGeometry::Json(json!([[48.8566, 2.3522], [48.8584, 2.2945]]))
    }

    fn sync_with(router: Arc<dyn StreetRouter>) -> DualViewSync {
        DualViewSync::new(router, Arc::new(RouteGeometryCache::new()))
    }

    #[tokio::test]
    async fn test_both_views_share_one_state() {
        let mut sync = sync_with(Arc::new(CountingRouter::default()));
        sync.load_route(RouteId(1), &paris_raw());

        let mut embedded = sync.embedded().unwrap();
        let (mut fullscreen, _) = sync.open_fullscreen().await.unwrap();

        // Fullscreen auto-enabled driving; the embedded card sees it too
        assert!(embedded.needs_render());
        assert_eq!(embedded.current().state, fullscreen.current().state);

        fullscreen.change_mode(TransportMode::Bike).await;
        let seen = embedded.current();
        assert_eq!(
            seen.state,
            DisplayState::Street {
                transport: TransportMode::Bike,
                computing: false
            }
        );
        assert_eq!(seen.geometry, fullscreen.current().geometry);
    }

    #[tokio::test]
    async fn test_open_fullscreen_from_direct_routes_driving() {
        let router = Arc::new(CountingRouter::default());
        let mut sync = sync_with(router.clone());
        sync.load_route(RouteId(1), &paris_raw());

        let (_, transition) = sync.open_fullscreen().await.unwrap();

        assert!(matches!(transition, Transition::Applied(_)));
        assert_eq!(
            sync.display().unwrap().state(),
            DisplayState::Street {
                transport: TransportMode::Driving,
                computing: false
            }
        );
        assert_eq!(router.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_reopen_fullscreen_does_not_recompute() {
        let router = Arc::new(CountingRouter::default());
        let mut sync = sync_with(router.clone());
        sync.load_route(RouteId(1), &paris_raw());

        sync.embedded()
            .unwrap()
            .toggle_street(TransportMode::Bike)
            .await;
        assert_eq!(router.calls.load(Ordering::SeqCst), 1);

        let (_, first) = sync.open_fullscreen().await.unwrap();
        assert!(matches!(first, Transition::Unchanged));
        sync.close_fullscreen();
        assert!(sync.fullscreen().is_none());

        let (mut view, second) = sync.open_fullscreen().await.unwrap();
        assert!(matches!(second, Transition::Unchanged));
        assert_eq!(view.current().geometry_mode, Some(TransportMode::Bike));
        assert_eq!(router.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_single_point_route_opens_fullscreen_direct() {
        let router = Arc::new(CountingRouter::default());
        let mut sync = sync_with(router.clone());
        sync.load_route(RouteId(4), &RawRouteGeometry::from("[[1, 2]]"));

        let (_, transition) = sync.open_fullscreen().await.unwrap();

        assert!(matches!(transition, Transition::Unchanged));
        assert_eq!(sync.display().unwrap().state(), DisplayState::Direct);
        assert_eq!(router.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_new_route_gets_fresh_direct_state_and_cache() {
        let router = Arc::new(CountingRouter::default());
        let mut sync = sync_with(router.clone());
        let first = sync.load_route(RouteId(1), &paris_raw());
        first.toggle_street(TransportMode::Foot).await;
        sync.open_fullscreen().await;

        let second = sync.load_route(
            RouteId(2),
            &RawRouteGeometry::Json(json!([[40.4168, -3.7038], [40.4153, -3.6845]])),
        );

        assert!(first.is_closed());
        assert!(!second.same_session(&first));
        assert_eq!(second.state(), DisplayState::Direct);
        assert!(!sync.is_fullscreen_open());
        for mode in TransportMode::ALL {
            assert!(!sync.cache.contains(RouteId(1), mode));
        }
        assert_eq!(second.snapshot().geometry[0], pt(40.4168, -3.7038));
    }

    #[tokio::test]
    async fn test_reloading_same_route_keeps_session() {
        let router = Arc::new(CountingRouter::default());
        let mut sync = sync_with(router.clone());
        let first = sync.load_route(RouteId(1), &paris_raw());
        first.toggle_street(TransportMode::Driving).await;

        let again = sync.load_route(
            RouteId(1),
            &RawRouteGeometry::from("[[48.8566, 2.3522], [48.8584, 2.2945]]"),
        );

        assert!(again.same_session(&first));
        assert!(matches!(again.state(), DisplayState::Street { .. }));
    }

    #[tokio::test]
    async fn test_edited_geometry_invalidates_cache() {
        let router = Arc::new(CountingRouter::default());
        let mut sync = sync_with(router.clone());
        let first = sync.load_route(RouteId(1), &paris_raw());
        first.toggle_street(TransportMode::Driving).await;

        let edited = sync.load_route(
            RouteId(1),
            &RawRouteGeometry::Json(json!([[48.8566, 2.3522], [48.86, 2.33], [48.8584, 2.2945]])),
        );
        assert!(!edited.same_session(&first));
        assert_eq!(edited.state(), DisplayState::Direct);

        edited.toggle_street(TransportMode::Driving).await;
        assert_eq!(router.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_navigating_away_ignores_pending_result() {
        let router = Arc::new(GatedRouter::default());
        let mut sync = sync_with(router.clone());
        let display = sync.load_route(RouteId(1), &paris_raw());

        let pending = tokio::spawn({
            let display = display.clone();
            async move { display.toggle_street(TransportMode::Driving).await }
        });
        wait_for_pending(&router, TransportMode::Driving).await;

        sync.load_route(RouteId(2), &paris_raw());
        router.release(TransportMode::Driving);

        assert!(matches!(pending.await.unwrap(), Transition::Superseded));
        assert_eq!(sync.display().unwrap().state(), DisplayState::Direct);
        assert!(!sync.cache.contains(RouteId(1), TransportMode::Driving));
        assert_eq!(display.route(), &paris());
    }

    #[tokio::test]
    async fn test_closing_fullscreen_mid_computation_still_settles() {
        let router = Arc::new(GatedRouter::default());
        let mut sync = sync_with(router.clone());
        let display = sync.load_route(RouteId(1), &paris_raw());

        let opening = sync.open_fullscreen();
        wait_for_pending(&router, TransportMode::Driving).await;
        drop(opening);
        sync.close_fullscreen();
        router.release(TransportMode::Driving);

        let mut embedded = sync.embedded().unwrap();
        tokio::time::timeout(Duration::from_secs(5), async {
            while embedded.current().is_computing() {
                assert!(embedded.changed().await);
            }
        })
        .await
        .expect("session stayed in computing state");

        assert_eq!(
            display.state(),
            DisplayState::Street {
                transport: TransportMode::Driving,
                computing: false
            }
        );
        assert!(matches!(
            display.change_mode(TransportMode::Driving).await,
            Transition::Unchanged
        ));

        let (_, reopened) = sync.open_fullscreen().await.unwrap();
        assert!(matches!(reopened, Transition::Unchanged));
    }

    #[tokio::test]
    async fn test_unload_closes_session() {
        let mut sync = sync_with(Arc::new(CountingRouter::default()));
        let display = sync.load_route(RouteId(1), &paris_raw());
        sync.unload();

        assert!(display.is_closed());
        assert!(sync.display().is_none());
        assert!(sync.embedded().is_none());
        assert!(sync.open_fullscreen().await.is_none());
    }

    #[tokio::test]
    async fn test_view_changed_wakes_on_transition() {
        let mut sync = sync_with(Arc::new(CountingRouter::default()));
        sync.load_route(RouteId(1), &paris_raw());
        let mut embedded = sync.embedded().unwrap();
        embedded.current();
        assert!(!embedded.needs_render());

        let display = sync.display().unwrap().clone();
        let (woke, _) = tokio::join!(embedded.changed(), display.toggle_street(TransportMode::Foot));
        assert!(woke);
        assert_eq!(embedded.surface(), Surface::Embedded);
    }
}
