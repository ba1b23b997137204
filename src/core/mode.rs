//! Transport modes and routing service configuration
//!
//! Every mode maps to exactly one service endpoint. The mapping is an exhaustive
//! `match`, so adding a mode without an endpoint does not compile.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::core::error::{suggest_mode, Error, Result};

/// Travel profile used for street routing
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransportMode {
    #[default]
    Driving,
    Foot,
    Bike,
}

impl TransportMode {
    /// All modes, in display order
    pub const ALL: [TransportMode; 3] = [TransportMode::Driving, TransportMode::Foot, TransportMode::Bike];

    pub fn as_str(&self) -> &'static str {
        match self {
            TransportMode::Driving => "driving",
            TransportMode::Foot => "foot",
            TransportMode::Bike => "bike",
        }
    }
}

impl fmt::Display for TransportMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TransportMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "driving" | "car" => Ok(TransportMode::Driving),
            "foot" | "walking" => Ok(TransportMode::Foot),
            "bike" | "cycling" => Ok(TransportMode::Bike),
            other => {
                let message = match suggest_mode(other) {
                    Some(suggestion) => {
                        format!("Unknown transport mode '{s}'. Did you mean '{suggestion}'?")
                    }
                    None => format!("Unknown transport mode '{s}'. Use driving, foot or bike"),
                };
                Err(Error::InvalidInput(message))
            }
        }
    }
}

/// Location of one profile on the routing service
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    /// Path between the service base and the profile, e.g. `route/v1`
    pub path: String,

    /// Profile segment understood by the service, e.g. `foot-walking`
    pub profile: String,
}

impl Endpoint {
    pub fn new(path: &str, profile: &str) -> Self {
        Self {
            path: path.trim_matches('/').to_string(),
            profile: profile.trim_matches('/').to_string(),
        }
    }
}

/// Configuration for the street-routing service
#[derive(Debug, Clone, PartialEq)]
pub struct RoutingConfig {
    /// Base URL of the routing service
    pub service_base: String,

    pub driving: Endpoint,
    pub foot: Endpoint,
    pub bike: Endpoint,

    /// Overall request timeout; a hung request falls back to the straight line
    pub timeout: Duration,

    /// Connection establishment timeout
    pub connect_timeout: Duration,

    /// User-Agent sent with every request
    pub user_agent: String,
}

impl Default for RoutingConfig {
    fn default() -> Self {
        Self {
            service_base: "https://router.project-osrm.org".to_string(),
            driving: Endpoint::new("route/v1", "driving"),
            foot: Endpoint::new("route/v1", "foot-walking"),
            bike: Endpoint::new("route/v1", "bike"),
            timeout: Duration::from_secs(10),
            connect_timeout: Duration::from_secs(5),
            user_agent: format!("waypoint-route/{}", env!("WAYPOINT_VERSION")),
        }
    }
}

impl RoutingConfig {
    /// FOSSGIS deployment with one OSRM instance per profile
    pub fn openstreetmap_de() -> Self {
        Self {
            service_base: "https://routing.openstreetmap.de".to_string(),
            driving: Endpoint::new("routed-car/route/v1", "driving"),
            foot: Endpoint::new("routed-foot/route/v1", "foot"),
            bike: Endpoint::new("routed-bike/route/v1", "bike"),
            ..Default::default()
        }
    }

    /// Same endpoints, different service base (mirrors, local OSRM, test servers)
    pub fn with_service_base(mut self, service_base: &str) -> Self {
        self.service_base = service_base.to_string();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn endpoint(&self, mode: TransportMode) -> &Endpoint {
        match mode {
            TransportMode::Driving => &self.driving,
            TransportMode::Foot => &self.foot,
            TransportMode::Bike => &self.bike,
        }
    }

    /// URL prefix for a mode, without the coordinate segment
    pub fn route_url(&self, mode: TransportMode) -> String {
        let endpoint = self.endpoint(mode);
        format!(
            "{}/{}/{}",
            self.service_base.trim_end_matches('/'),
            endpoint.path,
            endpoint.profile
        )
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.service_base.starts_with("http://") || self.service_base.starts_with("https://")) {
            return Err(Error::InvalidInput(format!(
                "Routing service URL must start with http:// or https://, got '{}'",
                self.service_base
            )));
        }
        if self.timeout.is_zero() {
            return Err(Error::InvalidInput("Routing timeout must be greater than zero".to_string()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_modes_and_aliases() {
        assert_eq!("driving".parse::<TransportMode>().unwrap(), TransportMode::Driving);
        assert_eq!("Car".parse::<TransportMode>().unwrap(), TransportMode::Driving);
        assert_eq!("walking".parse::<TransportMode>().unwrap(), TransportMode::Foot);
        assert_eq!(" bike ".parse::<TransportMode>().unwrap(), TransportMode::Bike);
        assert_eq!("CYCLING".parse::<TransportMode>().unwrap(), TransportMode::Bike);
        assert_eq!(TransportMode::default(), TransportMode::Driving);
    }

    #[test]
    fn test_parse_unknown_mode_suggests() {
        let err = "bke".parse::<TransportMode>().unwrap_err();
        assert!(err.to_string().contains("Did you mean 'bike'?"), "got: {err}");

        let err = "teleport".parse::<TransportMode>().unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)));
    }

    #[test]
    fn test_default_route_urls() {
        let config = RoutingConfig::default();
        assert_eq!(
            config.route_url(TransportMode::Driving),
            "https://router.project-osrm.org/route/v1/driving"
        );
        assert_eq!(
            config.route_url(TransportMode::Foot),
            "https://router.project-osrm.org/route/v1/foot-walking"
        );
        assert_eq!(
            config.route_url(TransportMode::Bike),
            "https://router.project-osrm.org/route/v1/bike"
        );
    }

    #[test]
    fn test_openstreetmap_de_urls() {
        let config = RoutingConfig::openstreetmap_de().with_service_base("https://mirror.example/");
        assert_eq!(
            config.route_url(TransportMode::Foot),
            "https://mirror.example/routed-foot/route/v1/foot"
        );
    }

    #[test]
    fn test_validate() {
        assert!(RoutingConfig::default().validate().is_ok());
        assert!(RoutingConfig::default().with_service_base("ftp://x").validate().is_err());
        assert!(RoutingConfig::default()
            .with_timeout(Duration::ZERO)
            .validate()
            .is_err());
    }

    #[test]
    fn test_mode_serde_lowercase() {
        assert_eq!(serde_json::to_string(&TransportMode::Foot).unwrap(), "\"foot\"");
        let mode: TransportMode = serde_json::from_str("\"bike\"").unwrap();
        assert_eq!(mode, TransportMode::Bike);
    }
}
