//! Core library modules for waypoint-route
//!
//! This module contains the internal implementation details of the route engine.

pub mod cache;
pub mod display;
pub mod error;
pub mod geometry;
pub mod mode;
pub mod router;
pub mod sync;

// Re-export main types for internal use
pub use cache::RouteGeometryCache;
pub use display::{DisplayState, RouteDisplay, RouteSnapshot, Transition};
pub use geometry::{sanitize, CleanRoute, GeoPoint, RawRouteGeometry, RouteId, RouteRecord};
pub use mode::{Endpoint, RoutingConfig, TransportMode};
pub use router::{RoutingClient, RoutingFailure, RoutingOutcome, StreetRoute, StreetRouter};
pub use sync::{DualViewSync, Surface, ViewHandle};
