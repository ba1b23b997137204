//! Display state machine for one route
//!
//! A display session shows a route either as drawn (`Direct`) or street-routed in
//! one transport mode. Street computations run through the shared cache; every
//! computation carries a generation number and only the latest one may settle
//! the state. Observers follow the session through a `watch` channel.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde::Serialize;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::core::cache::RouteGeometryCache;
use crate::core::geometry::{CleanRoute, GeoPoint, RouteId};
use crate::core::mode::TransportMode;
use crate::core::router::{RoutingOutcome, StreetRouter};

/// What the session is showing, as seen by the views
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "mode", rename_all = "lowercase")]
pub enum DisplayState {
    Direct,
    Street { transport: TransportMode, computing: bool },
}

/// Everything a view needs to render the route
#[derive(Debug, Clone, Serialize)]
pub struct RouteSnapshot {
    pub route_id: RouteId,
    pub state: DisplayState,
    /// Geometry to draw right now
    pub geometry: Arc<[GeoPoint]>,
    /// Mode the drawn geometry was computed for; `None` while showing the raw route
    pub geometry_mode: Option<TransportMode>,
    pub duration_seconds: Option<f64>,
    pub distance_meters: Option<f64>,
    /// Street routing was requested but the straight line is shown instead
    pub street_unavailable: bool,
}

impl RouteSnapshot {
    pub fn is_computing(&self) -> bool {
        matches!(self.state, DisplayState::Street { computing: true, .. })
    }
}

/// Result of a user-driven transition
#[derive(Debug, Clone)]
pub enum Transition {
    /// Back to showing the route as drawn
    Direct,
    /// A street computation finished and its result is now displayed
    Applied(RoutingOutcome),
    /// A newer transition or the end of the session made this result stale
    Superseded,
    /// Nothing to do
    Unchanged,
}

/// A transition that was started, possibly still computing in the background
pub(crate) enum Step {
    Done(Transition),
    Running(JoinHandle<Transition>),
}

impl Step {
    /// Wait for the outcome; the computation keeps going if this is dropped
    pub(crate) async fn finish(self) -> Transition {
        match self {
            Step::Done(transition) => transition,
            Step::Running(handle) => match handle.await {
                Ok(transition) => transition,
                Err(e) => {
                    log::warn!("Street routing task ended abnormally: {e}");
                    Transition::Superseded
                }
            },
        }
    }
}

enum Phase {
    Direct,
    Computing {
        mode: TransportMode,
        generation: u64,
        /// Street geometry kept on screen until the new one arrives
        shown: Option<(TransportMode, RoutingOutcome)>,
    },
    Street {
        mode: TransportMode,
        outcome: RoutingOutcome,
    },
}

struct Session {
    phase: Phase,
    generation: u64,
    closed: bool,
}

struct DisplayShared {
    route_id: RouteId,
    route: CleanRoute,
    router: Arc<dyn StreetRouter>,
    cache: Arc<RouteGeometryCache>,
    session: Mutex<Session>,
    tx: watch::Sender<RouteSnapshot>,
}

/// Handle to one route's display session; clones share the same state
#[derive(Clone)]
pub struct RouteDisplay {
    shared: Arc<DisplayShared>,
}

impl RouteDisplay {
    /// Start a session in `Direct` state
    pub fn new(
        route_id: RouteId,
        route: CleanRoute,
        router: Arc<dyn StreetRouter>,
        cache: Arc<RouteGeometryCache>,
    ) -> Self {
        let session = Session {
            phase: Phase::Direct,
            generation: 0,
            closed: false,
        };
        let initial = build_snapshot(route_id, &route, &session.phase);
        let (tx, _rx) = watch::channel(initial);

        Self {
            shared: Arc::new(DisplayShared {
                route_id,
                route,
                router,
                cache,
                session: Mutex::new(session),
                tx,
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Session> {
        self.shared.session.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn publish(&self, session: &Session) {
        let snapshot = build_snapshot(self.shared.route_id, &self.shared.route, &session.phase);
        self.shared.tx.send_replace(snapshot);
    }

    pub fn route_id(&self) -> RouteId {
        self.shared.route_id
    }

    pub fn route(&self) -> &CleanRoute {
        &self.shared.route
    }

    pub fn cache(&self) -> &Arc<RouteGeometryCache> {
        &self.shared.cache
    }

    pub fn subscribe(&self) -> watch::Receiver<RouteSnapshot> {
        self.shared.tx.subscribe()
    }

    pub fn snapshot(&self) -> RouteSnapshot {
        self.shared.tx.borrow().clone()
    }

    pub fn state(&self) -> DisplayState {
        self.shared.tx.borrow().state
    }

    pub fn is_closed(&self) -> bool {
        self.lock().closed
    }

    /// Whether two handles refer to the same session
    pub fn same_session(&self, other: &RouteDisplay) -> bool {
        Arc::ptr_eq(&self.shared, &other.shared)
    }

    /// Toggle street routing for `mode`
    ///
    /// From `Direct` this starts a computation. Toggling the mode that is already
    /// shown (or being computed) returns to `Direct`. Toggling another mode
    /// behaves like [`RouteDisplay::change_mode`].
    ///
    /// The computation runs on its own Tokio task: dropping the returned future
    /// does not stop the session from settling.
    pub async fn toggle_street(&self, mode: TransportMode) -> Transition {
        self.begin_toggle(mode).finish().await
    }

    /// Switch the transport mode of the street display
    ///
    /// The current street geometry stays visible until the new result arrives.
    /// Asking for the mode already shown or in flight does nothing. From
    /// `Direct` this enables street routing in `mode`.
    pub async fn change_mode(&self, mode: TransportMode) -> Transition {
        self.begin_change(mode).finish().await
    }

    pub(crate) fn begin_toggle(&self, mode: TransportMode) -> Step {
        let mut session = self.lock();
        if session.closed {
            return Step::Done(Transition::Unchanged);
        }

        let active = match &session.phase {
            Phase::Direct => None,
            Phase::Computing { mode, .. } | Phase::Street { mode, .. } => Some(*mode),
        };

        if active == Some(mode) {
            self.deactivate_locked(&mut session);
            return Step::Done(Transition::Direct);
        }
        let generation = self.begin_locked(&mut session, mode);
        drop(session);

        Step::Running(self.spawn_run(mode, generation))
    }

    pub(crate) fn begin_change(&self, mode: TransportMode) -> Step {
        let mut session = self.lock();
        if session.closed {
            return Step::Done(Transition::Unchanged);
        }

        let already_active = matches!(
            &session.phase,
            Phase::Computing { mode: active, .. } | Phase::Street { mode: active, .. }
                if *active == mode
        );
        if already_active {
            return Step::Done(Transition::Unchanged);
        }
        let generation = self.begin_locked(&mut session, mode);
        drop(session);

        Step::Running(self.spawn_run(mode, generation))
    }

    /// Return to `Direct` immediately, discarding any in-flight computation
    pub fn deactivate(&self) -> Transition {
        let mut session = self.lock();
        if session.closed || matches!(session.phase, Phase::Direct) {
            return Transition::Unchanged;
        }
        self.deactivate_locked(&mut session);
        Transition::Direct
    }

    /// End the session; outstanding computations resolve into no-ops
    pub fn close(&self) {
        let mut session = self.lock();
        if session.closed {
            return;
        }
        session.closed = true;
        session.generation += 1;
        session.phase = Phase::Direct;
        self.publish(&session);
        log::debug!("Closed display session for route {}", self.shared.route_id);
    }

    fn deactivate_locked(&self, session: &mut Session) {
        session.generation += 1;
        session.phase = Phase::Direct;
        self.publish(session);
    }

    fn begin_locked(&self, session: &mut Session, mode: TransportMode) -> u64 {
        session.generation += 1;
        let generation = session.generation;

        let previous = std::mem::replace(&mut session.phase, Phase::Direct);
        let shown = match previous {
            Phase::Direct => None,
            Phase::Computing { shown, .. } => shown,
            Phase::Street { mode, outcome } => Some((mode, outcome)),
        };
        session.phase = Phase::Computing {
            mode,
            generation,
            shown,
        };
        self.publish(session);
        generation
    }

    fn spawn_run(&self, mode: TransportMode, generation: u64) -> JoinHandle<Transition> {
        let display = self.clone();
        tokio::spawn(async move { display.run(mode, generation).await })
    }

    async fn run(&self, mode: TransportMode, generation: u64) -> Transition {
        let shared = &self.shared;
        let outcome = shared
            .cache
            .get_or_compute(shared.route_id, mode, &shared.route, |points, mode| {
                shared.router.compute(points, mode)
            })
            .await;

        let mut session = self.lock();
        let is_latest = !session.closed
            && session.generation == generation
            && matches!(session.phase, Phase::Computing { generation: g, .. } if g == generation);
        if !is_latest {
            log::debug!(
                "Discarding stale {mode} result for route {} (generation {generation}, now {})",
                shared.route_id,
                session.generation
            );
            return Transition::Superseded;
        }

        if let Some(reason) = outcome.failure_reason() {
            log::warn!("Showing straight line for route {} ({mode}): {reason}", shared.route_id);
        }
        session.phase = Phase::Street {
            mode,
            outcome: outcome.clone(),
        };
        self.publish(&session);
        Transition::Applied(outcome)
    }
}

fn build_snapshot(route_id: RouteId, route: &CleanRoute, phase: &Phase) -> RouteSnapshot {
    let direct = |state| RouteSnapshot {
        route_id,
        state,
        geometry: route.shared(),
        geometry_mode: None,
        duration_seconds: None,
        distance_meters: None,
        street_unavailable: false,
    };
    let street = |state, mode: TransportMode, outcome: &RoutingOutcome| RouteSnapshot {
        route_id,
        state,
        geometry: Arc::clone(outcome.points()),
        geometry_mode: Some(mode),
        duration_seconds: outcome.duration_seconds(),
        distance_meters: outcome.distance_meters(),
        street_unavailable: outcome.is_fallback(),
    };

    match phase {
        Phase::Direct => direct(DisplayState::Direct),
        Phase::Computing { mode, shown, .. } => {
            let state = DisplayState::Street {
                transport: *mode,
                computing: true,
            };
            match shown {
                Some((shown_mode, outcome)) => street(state, *shown_mode, outcome),
                None => direct(state),
            }
        }
        Phase::Street { mode, outcome } => street(
            DisplayState::Street {
                transport: *mode,
                computing: false,
            },
            *mode,
            outcome,
        ),
    }
}
