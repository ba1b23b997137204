//! Street-routing client for OSRM-compatible services
//!
//! One computation is one `GET {base}/{path}/{profile}/{lon,lat;...}` request.
//! Whatever goes wrong, the caller gets something renderable back: either the
//! street route or the original straight-line points marked as a fallback.

use std::sync::Arc;

use futures::future::BoxFuture;
use futures::FutureExt;
use reqwest::{Client, ClientBuilder};
use serde::{Deserialize, Serialize};

use crate::core::error::{Error, Result};
use crate::core::geometry::{CleanRoute, GeoPoint};
use crate::core::mode::{RoutingConfig, TransportMode};

/// A street-following path with trip totals
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StreetRoute {
    pub points: Arc<[GeoPoint]>,
    pub duration_seconds: f64,
    pub distance_meters: f64,
}

/// Straight-line fallback produced when street routing is unavailable
#[derive(Debug, Clone)]
pub struct RoutingFailure {
    /// The original points, renderable as-is
    pub points: Arc<[GeoPoint]>,
    pub reason: Arc<Error>,
}

/// Result of one street-routing computation
#[derive(Debug, Clone)]
pub enum RoutingOutcome {
    Routed(StreetRoute),
    Fallback(RoutingFailure),
}

impl RoutingOutcome {
    pub fn fallback(points: &CleanRoute, reason: Error) -> Self {
        RoutingOutcome::Fallback(RoutingFailure {
            points: points.shared(),
            reason: Arc::new(reason),
        })
    }

    /// Geometry to draw, street-following or not
    pub fn points(&self) -> &Arc<[GeoPoint]> {
        match self {
            RoutingOutcome::Routed(route) => &route.points,
            RoutingOutcome::Fallback(failure) => &failure.points,
        }
    }

    /// `None` for fallbacks
    pub fn duration_seconds(&self) -> Option<f64> {
        self.street_route().map(|route| route.duration_seconds)
    }

    /// `None` for fallbacks
    pub fn distance_meters(&self) -> Option<f64> {
        self.street_route().map(|route| route.distance_meters)
    }

    pub fn street_route(&self) -> Option<&StreetRoute> {
        match self {
            RoutingOutcome::Routed(route) => Some(route),
            RoutingOutcome::Fallback(_) => None,
        }
    }

    pub fn is_fallback(&self) -> bool {
        matches!(self, RoutingOutcome::Fallback(_))
    }

    pub fn failure_reason(&self) -> Option<&Error> {
        match self {
            RoutingOutcome::Routed(_) => None,
            RoutingOutcome::Fallback(failure) => Some(&failure.reason),
        }
    }
}

/// Anything that can turn points into a street route
///
/// Implementations never fail: problems are reported as [`RoutingOutcome::Fallback`].
pub trait StreetRouter: Send + Sync {
    fn compute(&self, points: CleanRoute, mode: TransportMode) -> BoxFuture<'static, RoutingOutcome>;
}

#[derive(Deserialize)]
struct OsrmResponse {
    code: String,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    routes: Vec<OsrmRoute>,
}

#[derive(Deserialize)]
struct OsrmRoute {
    geometry: OsrmGeometry,
    duration: f64,
    distance: f64,
}

#[derive(Deserialize)]
struct OsrmGeometry {
    /// `[lon, lat]` pairs
    coordinates: Vec<[f64; 2]>,
}

/// HTTP routing client
#[derive(Clone)]
pub struct RoutingClient {
    client: Client,
    config: Arc<RoutingConfig>,
}

impl RoutingClient {
    /// Create a client with its own connection pool
    pub fn new(config: RoutingConfig) -> Result<Self> {
        config.validate()?;

        let client = ClientBuilder::new()
            .timeout(config.timeout)
            .connect_timeout(config.connect_timeout)
            .user_agent(config.user_agent.clone())
            .build()?;

        Ok(Self::with_client(config, client))
    }

    /// Reuse an existing reqwest client; its timeouts apply as configured
    pub fn with_client(config: RoutingConfig, client: Client) -> Self {
        Self {
            client,
            config: Arc::new(config),
        }
    }

    pub fn config(&self) -> &RoutingConfig {
        &self.config
    }

    /// Full request URL (without query string) for the given points
    pub fn request_url(&self, points: &CleanRoute, mode: TransportMode) -> String {
        format!("{}/{}", self.config.route_url(mode), coordinate_segment(points))
    }

    /// Compute a street route, falling back to the straight line on any failure
    pub async fn compute_street_route(&self, points: &CleanRoute, mode: TransportMode) -> RoutingOutcome {
        if !points.is_routable() {
            return RoutingOutcome::fallback(
                points,
                Error::InvalidInput(format!(
                    "Street routing needs at least 2 points, got {}",
                    points.len()
                )),
            );
        }

        let url = self.request_url(points, mode);
        log::debug!("Requesting {mode} route: {url}");

        match fetch_route(&self.client, &url).await {
            Ok(route) => {
                log::info!(
                    "Computed {mode} route with {} points ({:.0} m, {:.0} s)",
                    route.points.len(),
                    route.distance_meters,
                    route.duration_seconds
                );
                RoutingOutcome::Routed(route)
            }
            Err(e) => {
                log::warn!("Street routing ({mode}) unavailable, using straight line: {e}");
                RoutingOutcome::fallback(points, e)
            }
        }
    }
}

impl StreetRouter for RoutingClient {
    fn compute(&self, points: CleanRoute, mode: TransportMode) -> BoxFuture<'static, RoutingOutcome> {
        let client = self.clone();
        async move { client.compute_street_route(&points, mode).await }.boxed()
    }
}

/// `lon,lat;lon,lat;...` as the service expects
fn coordinate_segment(points: &CleanRoute) -> String {
    points
        .points()
        .iter()
        .map(|p| format!("{},{}", p.lon(), p.lat()))
        .collect::<Vec<_>>()
        .join(";")
}

async fn fetch_route(client: &Client, url: &str) -> Result<StreetRoute> {
    let response = client
        .get(url)
        .query(&[("overview", "full"), ("geometries", "geojson")])
        .send()
        .await?;

    let status = response.status();
    let body = response.text().await?;

    if !status.is_success() {
        // OSRM reports NoRoute/InvalidQuery as 4xx with a JSON body
        if let Ok(parsed) = serde_json::from_str::<OsrmResponse>(&body) {
            if parsed.code != "Ok" {
                return Err(Error::NoRoute {
                    code: parsed.code,
                    message: parsed.message,
                });
            }
        }
        return Err(Error::HttpError(format!("Routing service returned {status}")));
    }

    parse_route_response(&body)
}

fn parse_route_response(body: &str) -> Result<StreetRoute> {
    let parsed: OsrmResponse =
        serde_json::from_str(body).map_err(|e| Error::MalformedResponse(e.to_string()))?;

    if parsed.code != "Ok" {
        return Err(Error::NoRoute {
            code: parsed.code,
            message: parsed.message,
        });
    }

    let route = parsed.routes.into_iter().next().ok_or_else(|| Error::NoRoute {
        code: parsed.code.clone(),
        message: Some("response contained no routes".to_string()),
    })?;

    if !(route.duration.is_finite() && route.duration >= 0.0) {
        return Err(Error::MalformedResponse(format!("invalid duration {}", route.duration)));
    }
    if !(route.distance.is_finite() && route.distance >= 0.0) {
        return Err(Error::MalformedResponse(format!("invalid distance {}", route.distance)));
    }
    if route.geometry.coordinates.is_empty() {
        return Err(Error::MalformedResponse("route geometry is empty".to_string()));
    }

    let points = route
        .geometry
        .coordinates
        .iter()
        .map(|&[lon, lat]| {
            GeoPoint::new(lat, lon)
                .ok_or_else(|| Error::MalformedResponse(format!("invalid coordinate [{lon}, {lat}]")))
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(StreetRoute {
        points: points.into(),
        duration_seconds: route.duration,
        distance_meters: route.distance,
    })
}
