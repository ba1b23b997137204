//! Error types for waypoint-route
//!
//! Provides the error taxonomy shared by the routing client, the CLI and the
//! configuration layer. Routing failures never escape as `Err` from a street
//! computation; they travel inside a `RoutingFailure` next to the fallback geometry.

use std::fmt;

use strsim::{jaro_winkler, normalized_levenshtein};

/// Names accepted for transport modes, used for "did you mean" suggestions
const KNOWN_MODE_NAMES: &[&str] = &["driving", "car", "foot", "walking", "bike", "cycling"];

/// Suggest a correction for a potentially misspelled transport mode
///
/// Scores candidates with 70% Jaro-Winkler + 30% normalized Levenshtein and
/// accepts the best one above 0.7 similarity.
pub fn suggest_mode(input: &str) -> Option<&'static str> {
    let input_lower = input.to_lowercase();
    if KNOWN_MODE_NAMES.contains(&input_lower.as_str()) {
        return None;
    }

    let mut best: Option<(&'static str, f64)> = None;
    for &candidate in KNOWN_MODE_NAMES {
        let score = jaro_winkler(&input_lower, candidate) * 0.7
            + normalized_levenshtein(&input_lower, candidate) * 0.3;
        if score >= 0.7 && best.map_or(true, |(_, s)| score > s) {
            best = Some((candidate, score));
        }
    }

    best.map(|(name, _)| name)
}

/// Main error type for waypoint-route operations
#[derive(Debug)]
pub enum Error {
    /// Invalid configuration, parameters or geometry
    InvalidInput(String),

    /// Non-success HTTP status from the routing service
    HttpError(String),

    /// Network connectivity issues (connect failure, timeout)
    NetworkError(String),

    /// The routing service answered but could not compute a route
    NoRoute { code: String, message: Option<String> },

    /// The routing service answered with a payload we could not understand
    MalformedResponse(String),

    /// File I/O error
    IoError(std::io::Error),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::InvalidInput(msg) => {
                write!(f, "Invalid input: {msg}")
            }
            Error::HttpError(msg) => {
                write!(f, "HTTP error: {msg}")
            }
            Error::NetworkError(msg) => {
                write!(f, "Network error: {msg}")
            }
            Error::NoRoute { code, message } => match message {
                Some(message) => write!(f, "No route found ({code}): {message}"),
                None => write!(f, "No route found ({code})"),
            },
            Error::MalformedResponse(msg) => {
                write!(f, "Malformed routing response: {msg}")
            }
            Error::IoError(err) => {
                write!(f, "I/O error: {err}")
            }
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::IoError(err) => Some(err),
            _ => None,
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::IoError(err)
    }
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        if err.is_connect() || err.is_timeout() {
            Error::NetworkError(err.to_string())
        } else if err.is_decode() {
            Error::MalformedResponse(err.to_string())
        } else {
            Error::HttpError(err.to_string())
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::InvalidInput(err.to_string())
    }
}

/// Convenience result type for waypoint-route operations
pub type Result<T> = std::result::Result<T, Error>;
