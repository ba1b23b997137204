//! CLI-specific utilities for waypoint-route
//!
//! This module contains code specific to the command-line interface,
//! separate from the core library functionality.

pub mod progress;
pub mod summary;

pub use progress::ComputingIndicator;
pub use summary::TripReport;
