//! CLI-specific "computing" indicator for waypoint-route
//!
//! Shows a spinner on stderr while a street route is being computed.

use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};

/// Creates a spinner for an in-flight routing request
pub fn create_spinner(message: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} [{elapsed_precise}] {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏ "),
    );
    pb.set_message(message.to_string());
    pb
}

/// Spinner shown while a display session is in its computing state
pub struct ComputingIndicator {
    pub pb: ProgressBar,
}

impl ComputingIndicator {
    /// Start spinning; hidden entirely when `enabled` is false (e.g. `--json`)
    pub fn start(message: &str, enabled: bool) -> Self {
        let pb = if enabled {
            let pb = create_spinner(message);
            pb.enable_steady_tick(Duration::from_millis(100));
            pb
        } else {
            ProgressBar::hidden()
        };

        Self { pb }
    }

    /// Remove the spinner line without leaving a message
    pub fn clear(&self) {
        self.pb.finish_and_clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_spinner_message() {
        let pb = create_spinner("Routing");
        assert_eq!(pb.message(), "Routing");
        pb.finish();
    }

    #[test]
    fn test_hidden_indicator() {
        let indicator = ComputingIndicator::start("Routing", false);
        assert!(indicator.pb.is_hidden());
        indicator.clear();
        assert!(indicator.pb.is_finished());
    }
}
