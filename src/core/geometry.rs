//! Route geometry types and coordinate sanitizing
//!
//! Route data arrives from the persistence service as untrusted JSON: sometimes a
//! serialized string, sometimes an already-decoded array, occasionally with broken
//! entries. Everything here turns that into an ordered list of finite points.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::value::RawValue;
use serde_json::Value;

/// Identity of a persisted route
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RouteId(pub u64);

impl From<u64> for RouteId {
    fn from(id: u64) -> Self {
        RouteId(id)
    }
}

impl fmt::Display for RouteId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A geographic point in the internal latitude/longitude order
///
/// Serialized as a `[lat, lon]` pair, the same layout stored routes use.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(into = "[f64; 2]", try_from = "[f64; 2]")]
pub struct GeoPoint {
    lat: f64,
    lon: f64,
}

impl GeoPoint {
    /// Create a point, returning `None` if either component is NaN or infinite
    ///
    /// Out-of-range values (|lat| > 90, |lon| > 180) are accepted; stored routes
    /// have never been range-checked. Use [`GeoPoint::is_in_range`] to test.
    pub fn new(lat: f64, lon: f64) -> Option<Self> {
        if lat.is_finite() && lon.is_finite() {
            Some(Self { lat, lon })
        } else {
            None
        }
    }

    pub fn lat(&self) -> f64 {
        self.lat
    }

    pub fn lon(&self) -> f64 {
        self.lon
    }

    /// Whether the point lies within WGS84 latitude/longitude bounds
    pub fn is_in_range(&self) -> bool {
        (-90.0..=90.0).contains(&self.lat) && (-180.0..=180.0).contains(&self.lon)
    }
}

impl From<GeoPoint> for [f64; 2] {
    fn from(point: GeoPoint) -> Self {
        [point.lat, point.lon]
    }
}

impl TryFrom<[f64; 2]> for GeoPoint {
    type Error = String;

    fn try_from([lat, lon]: [f64; 2]) -> Result<Self, Self::Error> {
        GeoPoint::new(lat, lon).ok_or_else(|| format!("non-finite coordinate [{lat}, {lon}]"))
    }
}

/// Untrusted route geometry as received from storage or a client
#[derive(Debug, Clone, PartialEq)]
pub enum RawRouteGeometry {
    /// JSON text that still needs decoding
    Serialized(String),

    /// Already-decoded JSON value
    Json(Value),

    /// Native coordinate rows, e.g. from a drawing surface
    Pairs(Vec<Vec<f64>>),
}

impl From<&str> for RawRouteGeometry {
    fn from(text: &str) -> Self {
        RawRouteGeometry::Serialized(text.to_string())
    }
}

impl From<String> for RawRouteGeometry {
    fn from(text: String) -> Self {
        RawRouteGeometry::Serialized(text)
    }
}

impl From<Value> for RawRouteGeometry {
    fn from(value: Value) -> Self {
        RawRouteGeometry::Json(value)
    }
}

impl From<Vec<Vec<f64>>> for RawRouteGeometry {
    fn from(rows: Vec<Vec<f64>>) -> Self {
        RawRouteGeometry::Pairs(rows)
    }
}

/// Ordered, sanitized route points; cheap to clone
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CleanRoute(Arc<[GeoPoint]>);

impl CleanRoute {
    pub fn new(points: Vec<GeoPoint>) -> Self {
        CleanRoute(points.into())
    }

    pub fn empty() -> Self {
        CleanRoute(Arc::from(Vec::new()))
    }

    pub fn points(&self) -> &[GeoPoint] {
        &self.0
    }

    /// Shared handle to the points, for building fallback geometry without copying
    pub fn shared(&self) -> Arc<[GeoPoint]> {
        Arc::clone(&self.0)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// At least two points are needed to ask for a street route
    pub fn is_routable(&self) -> bool {
        self.0.len() >= 2
    }

    /// Arithmetic mean of all points, used to center the embedded map
    pub fn center(&self) -> Option<GeoPoint> {
        if self.0.is_empty() {
            return None;
        }
        let n = self.0.len() as f64;
        let lat = self.0.iter().map(GeoPoint::lat).sum::<f64>() / n;
        let lon = self.0.iter().map(GeoPoint::lon).sum::<f64>() / n;
        GeoPoint::new(lat, lon)
    }

    /// Bounding box as `(south_west, north_east)`
    pub fn bounds(&self) -> Option<(GeoPoint, GeoPoint)> {
        let first = self.0.first()?;
        let (mut south, mut west, mut north, mut east) =
            (first.lat, first.lon, first.lat, first.lon);
        for point in self.0.iter().skip(1) {
            south = south.min(point.lat);
            north = north.max(point.lat);
            west = west.min(point.lon);
            east = east.max(point.lon);
        }
        Some((GeoPoint { lat: south, lon: west }, GeoPoint { lat: north, lon: east }))
    }
}

impl Default for CleanRoute {
    fn default() -> Self {
        Self::empty()
    }
}

impl From<Vec<GeoPoint>> for CleanRoute {
    fn from(points: Vec<GeoPoint>) -> Self {
        CleanRoute::new(points)
    }
}

/// Turn untrusted geometry into a clean route
///
/// Undecodable text gives an empty route. Entries that are not exactly two finite
/// JSON numbers are dropped; the remaining ones keep their relative order.
pub fn sanitize(raw: &RawRouteGeometry) -> CleanRoute {
    let points = match raw {
        RawRouteGeometry::Serialized(text) => sanitize_text(text),
        RawRouteGeometry::Json(Value::String(text)) => sanitize_text(text),
        RawRouteGeometry::Json(value) => sanitize_value(value),
        RawRouteGeometry::Pairs(rows) => rows
            .iter()
            .filter_map(|row| match row.as_slice() {
                [lat, lon] => GeoPoint::new(*lat, *lon),
                _ => None,
            })
            .collect(),
    };

    CleanRoute::new(points)
}

fn sanitize_text(text: &str) -> Vec<GeoPoint> {
    // Entries stay raw so an out-of-range number like 1e400 only costs its own entry
    let entries: Vec<&RawValue> = match serde_json::from_str(text) {
        Ok(entries) => entries,
        Err(e) => {
            log::debug!("Discarding undecodable route geometry: {e}");
            return Vec::new();
        }
    };

    let points: Vec<GeoPoint> = entries
        .iter()
        .filter_map(|entry| serde_json::from_str::<Value>(entry.get()).ok())
        .filter_map(|entry| sanitize_entry(&entry))
        .collect();
    log_dropped(entries.len(), points.len());
    points
}

fn sanitize_value(value: &Value) -> Vec<GeoPoint> {
    let Some(entries) = value.as_array() else {
        return Vec::new();
    };

    let points: Vec<GeoPoint> = entries.iter().filter_map(sanitize_entry).collect();
    log_dropped(entries.len(), points.len());
    points
}

fn log_dropped(total: usize, kept: usize) {
    if kept < total {
        log::debug!("Dropped {} malformed coordinate entries out of {total}", total - kept);
    }
}

fn sanitize_entry(entry: &Value) -> Option<GeoPoint> {
    match entry.as_array()?.as_slice() {
        // Only genuine JSON numbers count; "40.1" as a string is rejected
        [Value::Number(lat), Value::Number(lon)] => GeoPoint::new(lat.as_f64()?, lon.as_f64()?),
        _ => None,
    }
}

/// A route as served by the persistence API
///
/// Only `id` and `coordinates` matter for display; the rest is carried along for
/// callers that print or log the route.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouteRecord {
    pub id: RouteId,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub country: Option<String>,
    #[serde(default)]
    pub locality: Option<String>,
    #[serde(default)]
    pub points_of_interest: Option<Value>,
    /// Either a JSON-encoded string or a decoded array
    #[serde(default)]
    pub coordinates: Option<Value>,
}

impl RouteRecord {
    /// Parse a record from its JSON representation
    pub fn from_json(text: &str) -> crate::core::error::Result<Self> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn raw_geometry(&self) -> RawRouteGeometry {
        RawRouteGeometry::Json(self.coordinates.clone().unwrap_or(Value::Null))
    }

    pub fn clean_route(&self) -> CleanRoute {
        sanitize(&self.raw_geometry())
    }

    /// "locality, city, country" with whatever parts are present
    pub fn place_label(&self) -> Option<String> {
        let parts: Vec<&str> = [&self.locality, &self.city, &self.country]
            .into_iter()
            .filter_map(|part| part.as_deref())
            .filter(|part| !part.is_empty())
            .collect();
        if parts.is_empty() {
            None
        } else {
            Some(parts.join(", "))
        }
    }
}
