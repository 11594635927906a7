//! Structured run logging and subscriber setup.

use tracing::{error, info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use silencecut_models::{RunId, RunKind};

/// Run logger for structured logging with consistent formatting.
///
/// Every line carries the run ID and the kind of run, so the interleaved
/// output of a detection and a materialization can be told apart.
#[derive(Debug, Clone)]
pub struct RunLogger {
    run_id: String,
    operation: RunKind,
}

impl RunLogger {
    pub fn new(run_id: &RunId, operation: RunKind) -> Self {
        Self {
            run_id: run_id.to_string(),
            operation,
        }
    }

    pub fn log_start(&self, message: &str) {
        info!(
            run_id = %self.run_id,
            operation = %self.operation,
            "Run started: {}", message
        );
    }

    pub fn log_progress(&self, message: &str) {
        info!(
            run_id = %self.run_id,
            operation = %self.operation,
            "Run progress: {}", message
        );
    }

    pub fn log_warning(&self, message: &str) {
        warn!(
            run_id = %self.run_id,
            operation = %self.operation,
            "Run warning: {}", message
        );
    }

    pub fn log_error(&self, message: &str) {
        error!(
            run_id = %self.run_id,
            operation = %self.operation,
            "Run error: {}", message
        );
    }

    pub fn log_completion(&self, message: &str) {
        info!(
            run_id = %self.run_id,
            operation = %self.operation,
            "Run completed: {}", message
        );
    }

    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    pub fn operation(&self) -> RunKind {
        self.operation
    }
}

/// Install the global subscriber: colored text by default, JSON when
/// `LOG_FORMAT=json`. `RUST_LOG` directives are added on top of
/// `silencecut=info`.
pub fn init_tracing() {
    let use_json = std::env::var("LOG_FORMAT")
        .map(|v| v.to_lowercase() == "json")
        .unwrap_or(false);

    let mut env_filter = EnvFilter::from_default_env();
    for directive in ["silencecut=info", "silencecut_media=info", "silencecut_worker=info"] {
        if let Ok(directive) = directive.parse() {
            env_filter = env_filter.add_directive(directive);
        }
    }

    if use_json {
        tracing_subscriber::registry()
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .with(env_filter)
            .init();
    } else {
        tracing_subscriber::registry()
            .with(
                fmt::layer()
                    .with_writer(std::io::stderr)
                    .with_ansi(true)
                    .with_target(true)
                    .with_thread_ids(false)
                    .with_file(false)
                    .with_line_number(false),
            )
            .with(env_filter)
            .init();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_logger_creation() {
        let run_id = RunId::new();
        let logger = RunLogger::new(&run_id, RunKind::Detection);

        assert_eq!(logger.run_id(), run_id.to_string());
        assert_eq!(logger.operation(), RunKind::Detection);
    }

    #[test]
    fn test_run_logger_without_subscriber() {
        let logger = RunLogger::new(&RunId::from_string("run-1"), RunKind::Materialization);
        logger.log_start("no subscriber installed");
        logger.log_progress("segment 0 (0.00s - 1.00s)");
        logger.log_completion("still fine");
    }
}
