//! # Waypoint-route CLI
//!
//! Command-line interface for the waypoint-route library.
//! Sanitizes a drawn route and shows it as drawn or street-routed.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context};
use clap::Parser;
use log::error;
use waypoint_route::{
    DisplayState, DualViewSync, RawRouteGeometry, RouteGeometryCache, RouteId, RouteRecord,
    RoutingClient, RoutingConfig, TransportMode,
};

mod cli;

use cli::{ComputingIndicator, TripReport};

/// Command-line interface for waypoint-route
#[derive(Parser)]
#[command(name = "waypoint-route")]
#[command(about = "Street routing for drawn travel routes")]
#[command(long_about = "Computes street-following paths for a drawn route:
  waypoint-route '[[48.8566,2.3522],[48.8584,2.2945]]'          # Driving route
  waypoint-route --file route.json --mode foot                  # Walking route from a file
  waypoint-route --record saved-route.json --all-modes          # Every mode for a stored route
  waypoint-route --file route.json --direct                     # Sanitized points only

When street routing is unavailable the straight line is shown instead
and a notice is printed; this is not an error.")]
#[command(version = env!("WAYPOINT_VERSION"))]
struct Cli {
    /// Route geometry as JSON, e.g. "[[lat,lon],[lat,lon]]"
    geometry: Option<String>,

    /// Read route geometry JSON from a file
    #[arg(long, conflicts_with_all = ["geometry", "record"])]
    file: Option<PathBuf>,

    /// Read a stored route record (JSON with "id" and "coordinates")
    #[arg(long, conflicts_with = "geometry")]
    record: Option<PathBuf>,

    /// Transport mode: driving, foot or bike
    #[arg(short, long, default_value = "driving")]
    mode: String,

    /// Compute the route for every transport mode
    #[arg(long, conflicts_with = "direct")]
    all_modes: bool,

    /// Show the sanitized route without street routing
    #[arg(long)]
    direct: bool,

    /// Base URL of the OSRM-compatible routing service
    #[arg(long)]
    service_url: Option<String>,

    /// Request timeout in seconds
    #[arg(long, default_value_t = 10)]
    timeout: u64,

    /// Print machine-readable JSON
    #[arg(long)]
    json: bool,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

/// A route ready to display
#[derive(Debug)]
struct RouteInput {
    id: RouteId,
    raw: RawRouteGeometry,
    label: Option<String>,
}

/// Resolve the route source from CLI arguments
fn load_input(
    geometry: Option<&str>,
    file: Option<&Path>,
    record: Option<&Path>,
) -> anyhow::Result<RouteInput> {
    if let Some(path) = record {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read route record {}", path.display()))?;
        let record = RouteRecord::from_json(&text)
            .with_context(|| format!("Invalid route record {}", path.display()))?;
        return Ok(RouteInput {
            id: record.id,
            raw: record.raw_geometry(),
            label: record.place_label(),
        });
    }

    if let Some(path) = file {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read geometry file {}", path.display()))?;
        return Ok(RouteInput {
            id: RouteId(0),
            raw: RawRouteGeometry::Serialized(text),
            label: None,
        });
    }

    match geometry {
        Some(text) => Ok(RouteInput {
            id: RouteId(0),
            raw: RawRouteGeometry::from(text),
            label: None,
        }),
        None => bail!("Provide route geometry as an argument, with --file or with --record"),
    }
}

/// Build the routing configuration from CLI flags
fn build_config(service_url: Option<&str>, timeout_secs: u64) -> RoutingConfig {
    let config = RoutingConfig::default().with_timeout(Duration::from_secs(timeout_secs));
    match service_url {
        Some(url) => config.with_service_base(url),
        None => config,
    }
}

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        error!("❌ Error: {e:#}");
        std::process::exit(1);
    }
}

async fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging to stderr
    let mut logger = env_logger::Builder::new();
    logger
        .filter_level(if cli.verbose {
            log::LevelFilter::Debug
        } else {
            log::LevelFilter::Error
        })
        .parse_default_env()
        .target(env_logger::Target::Stderr)
        .init();

    if cli.verbose {
        eprintln!("🗺️  Waypoint-route v{} starting...", env!("WAYPOINT_VERSION"));
    }

    let mode: TransportMode = cli.mode.parse()?;
    let input = load_input(cli.geometry.as_deref(), cli.file.as_deref(), cli.record.as_deref())?;
    let config = build_config(cli.service_url.as_deref(), cli.timeout);
    let router = Arc::new(RoutingClient::new(config).context("Invalid routing configuration")?);

    let mut views = DualViewSync::new(router, Arc::new(RouteGeometryCache::new()));
    let display = views.load_route(input.id, &input.raw);
    if display.route().is_empty() {
        eprintln!("⚠️  No usable coordinates in route geometry");
    }

    let Some(mut view) = views.embedded() else {
        bail!("No route loaded");
    };

    let modes: Vec<TransportMode> = if cli.direct {
        Vec::new()
    } else if cli.all_modes {
        TransportMode::ALL.to_vec()
    } else {
        vec![mode]
    };

    let mut reports = Vec::new();
    if modes.is_empty() {
        reports.push(TripReport::from_snapshot(&view.current()));
    }
    for mode in modes {
        let indicator = ComputingIndicator::start(&format!("Computing {mode} route..."), !cli.json);
        if view.display().state() == DisplayState::Direct {
            view.toggle_street(mode).await;
        } else {
            view.change_mode(mode).await;
        }
        indicator.clear();

        let report = TripReport::from_snapshot(&view.current());
        if report.notice.is_some() && !cli.json {
            eprintln!("⚠️  Street routing unavailable for {mode}, showing straight line");
        }
        reports.push(report);
    }

    if cli.json {
        let output = match reports.as_slice() {
            [single] => serde_json::to_string_pretty(single)?,
            many => serde_json::to_string_pretty(many)?,
        };
        println!("{output}");
    } else {
        if let Some(label) = &input.label {
            println!("📍 {label}");
        }
        for report in &reports {
            println!("{}", report.summary_line());
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_load_input_from_argument() {
        let input = load_input(Some("[[1, 2], [3, 4]]"), None, None).unwrap();
        assert_eq!(input.id, RouteId(0));
        assert_eq!(input.raw, RawRouteGeometry::Serialized("[[1, 2], [3, 4]]".to_string()));
    }

    #[test]
    fn test_load_input_from_record_file() {
        let mut file = NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"id": 12, "city": "Paris", "country": "France", "coordinates": [[48.8566, 2.3522], [48.8584, 2.2945]]}}"#
        )
        .unwrap();

        let input = load_input(None, None, Some(file.path())).unwrap();
        assert_eq!(input.id, RouteId(12));
        assert_eq!(input.label.as_deref(), Some("Paris, France"));
        assert_eq!(waypoint_route::sanitize(&input.raw).len(), 2);
    }

    #[test]
    fn test_load_input_missing_source() {
        let err = load_input(None, None, None).unwrap_err();
        assert!(err.to_string().contains("--record"));
    }

    #[test]
    fn test_load_input_unreadable_file() {
        let err = load_input(None, Some(Path::new("/nonexistent/route.json")), None).unwrap_err();
        assert!(err.to_string().contains("Failed to read geometry file"));
    }

    #[test]
    fn test_build_config_overrides() {
        let config = build_config(Some("http://localhost:5000"), 3);
        assert_eq!(config.service_base, "http://localhost:5000");
        assert_eq!(config.timeout, Duration::from_secs(3));

        let default = build_config(None, 10);
        assert_eq!(default.service_base, RoutingConfig::default().service_base);
    }
}
