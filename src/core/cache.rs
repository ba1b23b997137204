//! Per-route, per-mode memoization of street routes
//!
//! Only genuine street routes are stored. A fallback is handed back to the caller
//! but leaves no entry behind, so the next toggle asks the service again.
//! Concurrent requests for the same key share one in-flight computation.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use futures::future::{BoxFuture, Shared};
use futures::FutureExt;

use crate::core::geometry::{CleanRoute, RouteId};
use crate::core::mode::TransportMode;
use crate::core::router::{RoutingOutcome, StreetRoute};

type CacheKey = (RouteId, TransportMode);
type SharedOutcome = Shared<BoxFuture<'static, RoutingOutcome>>;

enum Slot {
    Ready(StreetRoute),
    /// `ticket` identifies the computation so a stale one cannot settle a newer slot
    Pending { ticket: u64, future: SharedOutcome },
}

enum Lookup {
    Hit(StreetRoute),
    Join(u64, SharedOutcome),
    Lead(u64, SharedOutcome),
}

/// Shared store of computed street routes
#[derive(Default)]
pub struct RouteGeometryCache {
    slots: Mutex<HashMap<CacheKey, Slot>>,
    next_ticket: AtomicU64,
}

impl RouteGeometryCache {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<CacheKey, Slot>> {
        self.slots.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Return the cached street route or run `compute_fn` to produce one
    ///
    /// `compute_fn` is only invoked when there is neither a stored route nor an
    /// in-flight computation for `(route_id, mode)`.
    pub async fn get_or_compute<F>(
        &self,
        route_id: RouteId,
        mode: TransportMode,
        points: &CleanRoute,
        compute_fn: F,
    ) -> RoutingOutcome
    where
        F: FnOnce(CleanRoute, TransportMode) -> BoxFuture<'static, RoutingOutcome>,
    {
        let key = (route_id, mode);

        let lookup = {
            let mut slots = self.lock();
            match slots.get(&key) {
                Some(Slot::Ready(route)) => Lookup::Hit(route.clone()),
                Some(Slot::Pending { ticket, future }) => Lookup::Join(*ticket, future.clone()),
                None => {
                    let ticket = self.next_ticket.fetch_add(1, Ordering::Relaxed);
                    let future = compute_fn(points.clone(), mode).shared();
                    slots.insert(
                        key,
                        Slot::Pending {
                            ticket,
                            future: future.clone(),
                        },
                    );
                    Lookup::Lead(ticket, future)
                }
            }
        };

        let (ticket, future) = match lookup {
            Lookup::Hit(route) => {
                log::debug!("Cache hit for route {route_id} ({mode})");
                return RoutingOutcome::Routed(route);
            }
            Lookup::Join(ticket, future) => {
                log::debug!("Joining in-flight computation for route {route_id} ({mode})");
                (ticket, future)
            }
            Lookup::Lead(ticket, future) => (ticket, future),
        };

        let outcome = future.await;
        self.settle(key, ticket, &outcome);
        outcome
    }

    /// Record the result of computation `ticket`, unless its slot was invalidated
    fn settle(&self, key: CacheKey, ticket: u64, outcome: &RoutingOutcome) {
        let mut slots = self.lock();
        let is_current = matches!(
            slots.get(&key),
            Some(Slot::Pending { ticket: current, .. }) if *current == ticket
        );
        if !is_current {
            return;
        }

        match outcome {
            RoutingOutcome::Routed(route) => {
                slots.insert(key, Slot::Ready(route.clone()));
            }
            RoutingOutcome::Fallback(_) => {
                slots.remove(&key);
            }
        }
    }

    /// Stored street route for the key, if any
    pub fn get(&self, route_id: RouteId, mode: TransportMode) -> Option<StreetRoute> {
        match self.lock().get(&(route_id, mode)) {
            Some(Slot::Ready(route)) => Some(route.clone()),
            _ => None,
        }
    }

    pub fn contains(&self, route_id: RouteId, mode: TransportMode) -> bool {
        matches!(self.lock().get(&(route_id, mode)), Some(Slot::Ready(_)))
    }

    pub fn is_in_flight(&self, route_id: RouteId, mode: TransportMode) -> bool {
        matches!(self.lock().get(&(route_id, mode)), Some(Slot::Pending { .. }))
    }

    /// Drop every entry of a route, across all modes
    ///
    /// In-flight computations for the route still resolve for their callers but
    /// are no longer stored.
    pub fn invalidate(&self, route_id: RouteId) {
        let mut slots = self.lock();
        let before = slots.len();
        slots.retain(|(id, _), _| *id != route_id);
        if slots.len() != before {
            log::debug!("Invalidated {} cache entries for route {route_id}", before - slots.len());
        }
    }

    pub fn clear(&self) {
        self.lock().clear();
    }

    /// Number of stored street routes
    pub fn len(&self) -> usize {
        self.lock()
            .values()
            .filter(|slot| matches!(slot, Slot::Ready(_)))
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// How many computations this cache has started
    pub fn computations_started(&self) -> u64 {
        self.next_ticket.load(Ordering::Relaxed)
    }
}
