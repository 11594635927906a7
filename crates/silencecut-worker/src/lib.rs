//! Session layer and CLI support for SilenceCut.
//!
//! This crate provides:
//! - A session that loads a source once and runs detection and
//!   materialization as background tasks with busy flags
//! - Ordered session events for progress and completion
//! - Environment configuration and FFmpeg collaborator wiring
//! - Structured run logging
//! - Detection reports for the CLI

pub mod config;
pub mod error;
pub mod logging;
pub mod report;
pub mod session;

pub use config::WorkerConfig;
pub use error::{WorkerError, WorkerResult};
pub use logging::{init_tracing, RunLogger};
pub use report::DetectionReport;
pub use session::{BusyGuard, Session, SessionEvent, SessionEvents};
