//! Human and JSON rendering of route snapshots for the CLI

use std::sync::Arc;

use serde::Serialize;

use waypoint_route::{DisplayState, GeoPoint, RouteId, RouteSnapshot, TransportMode};

/// `"45 s"`, `"12 min"` or `"1 h 05 min"`
pub fn format_duration(seconds: f64) -> String {
    let seconds = seconds.round();
    if seconds < 60.0 {
        return format!("{seconds:.0} s");
    }
    let minutes = (seconds / 60.0).round() as u64;
    if minutes < 60 {
        format!("{minutes} min")
    } else {
        format!("{} h {:02} min", minutes / 60, minutes % 60)
    }
}

/// `"850 m"` or `"5.0 km"`
pub fn format_distance(meters: f64) -> String {
    if meters < 1000.0 {
        format!("{meters:.0} m")
    } else {
        format!("{:.1} km", meters / 1000.0)
    }
}

/// What the CLI prints for one displayed route
#[derive(Debug, Clone, Serialize)]
pub struct TripReport {
    pub route_id: RouteId,
    /// Requested transport mode; `None` when showing the route as drawn
    pub mode: Option<TransportMode>,
    pub street_routed: bool,
    pub duration_seconds: Option<f64>,
    pub distance_meters: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notice: Option<String>,
    pub points: Arc<[GeoPoint]>,
}

impl TripReport {
    pub fn from_snapshot(snapshot: &RouteSnapshot) -> Self {
        let mode = match snapshot.state {
            DisplayState::Direct => None,
            DisplayState::Street { transport, .. } => Some(transport),
        };
        let notice = snapshot
            .street_unavailable
            .then(|| "street routing unavailable, showing straight line".to_string());

        Self {
            route_id: snapshot.route_id,
            mode,
            street_routed: mode.is_some() && !snapshot.street_unavailable,
            duration_seconds: snapshot.duration_seconds,
            distance_meters: snapshot.distance_meters,
            notice,
            points: Arc::clone(&snapshot.geometry),
        }
    }

    /// One-line description, e.g. `"bike: 3 points, 5.0 km, 10 min"`
    pub fn summary_line(&self) -> String {
        let label = self.mode.map_or("direct", |mode| mode.as_str());
        let mut line = format!("{label}: {} points", self.points.len());
        if let (Some(distance), Some(duration)) = (self.distance_meters, self.duration_seconds) {
            line.push_str(&format!(", {}, {}", format_distance(distance), format_duration(duration)));
        }
        if let Some(notice) = &self.notice {
            line.push_str(&format!(" ({notice})"));
        }
        line
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot(state: DisplayState, unavailable: bool) -> RouteSnapshot {
        let points: Vec<GeoPoint> = vec![
            GeoPoint::new(48.8566, 2.3522).unwrap(),
            GeoPoint::new(48.857, 2.34).unwrap(),
            GeoPoint::new(48.8584, 2.2945).unwrap(),
        ];
        let routed = !unavailable && state != DisplayState::Direct;
        RouteSnapshot {
            route_id: RouteId(5),
            state,
            geometry: points.into(),
            geometry_mode: None,
            duration_seconds: routed.then_some(600.0),
            distance_meters: routed.then_some(5000.0),
            street_unavailable: unavailable,
        }
    }

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(45.0), "45 s");
        assert_eq!(format_duration(59.4), "59 s");
        assert_eq!(format_duration(59.6), "1 min");
        assert_eq!(format_duration(600.0), "10 min");
        assert_eq!(format_duration(3900.0), "1 h 05 min");
    }

    #[test]
    fn test_format_distance() {
        assert_eq!(format_distance(850.0), "850 m");
        assert_eq!(format_distance(5000.0), "5.0 km");
    }

    #[test]
    fn test_summary_for_street_route() {
        let street = DisplayState::Street {
            transport: TransportMode::Bike,
            computing: false,
        };
        let report = TripReport::from_snapshot(&snapshot(street, false));
        assert!(report.street_routed);
        assert_eq!(report.summary_line(), "bike: 3 points, 5.0 km, 10 min");
    }

    #[test]
    fn test_summary_for_fallback() {
        let street = DisplayState::Street {
            transport: TransportMode::Driving,
            computing: false,
        };
        let report = TripReport::from_snapshot(&snapshot(street, true));
        assert!(!report.street_routed);
        assert_eq!(
            report.summary_line(),
            "driving: 3 points (street routing unavailable, showing straight line)"
        );
    }

    #[test]
    fn test_direct_report_json_omits_notice() {
        let report = TripReport::from_snapshot(&snapshot(DisplayState::Direct, false));
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["mode"], serde_json::Value::Null);
        assert!(json.get("notice").is_none());
        assert_eq!(json["points"][0], serde_json::json!([48.8566, 2.3522]));
    }
}
