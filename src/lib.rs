//! # Waypoint route engine
//!
//! Turns user-drawn travel routes into something a map can show: sanitized
//! point lists, street-following paths from an OSRM-compatible service, and a
//! display state shared by every view of the route.
//!
//! ## Features
//!
//! - **Forgiving input**: malformed coordinate entries are dropped, not fatal
//! - **Always renderable**: failed street routing falls back to the straight line
//! - **Per-mode caching**: driving, foot and bike results are cached per route
//! - **Shared state**: embedded and fullscreen views follow one display session
//!
//! ## Basic Usage
//!
//! ```rust,no_run
//! use waypoint_route::TransportMode;
//!
//! #[tokio::main]
//! async fn main() {
//!     let outcome = waypoint_route::route(
//!         &"[[48.8566, 2.3522], [48.8584, 2.2945]]".into(),
//!         TransportMode::Foot,
//!     )
//!     .await;
//!
//!     match outcome.duration_seconds() {
//!         Some(seconds) => println!("{} points, {seconds:.0} s", outcome.points().len()),
//!         None => println!("street routing unavailable, showing straight line"),
//!     }
//! }
//! ```
//!
//! ## Display Sessions
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use waypoint_route::{DualViewSync, RouteGeometryCache, RouteId, RoutingClient, RoutingConfig, TransportMode};
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let router = Arc::new(RoutingClient::new(RoutingConfig::default())?);
//! let mut views = DualViewSync::new(router, Arc::new(RouteGeometryCache::new()));
//!
//! views.load_route(RouteId(42), &"[[40.4168, -3.7038], [40.4153, -3.6845]]".into());
//! let mut card = views.embedded().expect("route loaded");
//! card.toggle_street(TransportMode::Bike).await;
//! println!("{:?}", card.current().state);
//! # Ok(())
//! # }
//! ```

// Re-export core types that users might need
pub use crate::core::error::{Error, Result};
pub use crate::core::{
    sanitize, CleanRoute, DisplayState, DualViewSync, Endpoint, GeoPoint, RawRouteGeometry,
    RouteDisplay, RouteGeometryCache, RouteId, RouteRecord, RouteSnapshot, RoutingClient,
    RoutingConfig, RoutingFailure, RoutingOutcome, StreetRoute, StreetRouter, Surface,
    Transition, TransportMode, ViewHandle,
};

// Internal modules
mod core;

/// Sanitize raw geometry and compute one street route with the default service
///
/// Never fails: if the HTTP client cannot even be built, the straight line is
/// returned as a fallback.
pub async fn route(raw: &RawRouteGeometry, mode: TransportMode) -> RoutingOutcome {
    let points = sanitize(raw);
    match RoutingClient::new(RoutingConfig::default()) {
        Ok(client) => client.compute_street_route(&points, mode).await,
        Err(e) => RoutingOutcome::fallback(&points, e),
    }
}

/// Sanitize raw geometry and compute one street route with a custom configuration
///
/// # Errors
/// Returns an error only if the configuration is invalid or the HTTP client
/// cannot be constructed. Routing failures are reported as a fallback outcome.
pub async fn route_with_config(
    raw: &RawRouteGeometry,
    mode: TransportMode,
    config: RoutingConfig,
) -> Result<RoutingOutcome> {
    let client = RoutingClient::new(config)?;
    Ok(client.compute_street_route(&sanitize(raw), mode).await)
}
