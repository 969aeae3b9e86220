#![forbid(unsafe_code)]

//! Scenario harness for the overlay engine.
//!
//! # Role in FrankenTUI
//! `ftui-harness` scripts the overlay engine end to end. A [`Scenario`] names
//! a screen, a view tree, and a list of steps; [`run_scenario`] replays it on
//! the in-memory host with a deterministic clock and returns a [`Trace`] of
//! lifecycle events, step results, and frames that renders to JSONL.
//!
//! The `ftui-harness` binary does the same for a scenario file on disk.

pub mod runner;
pub mod scenario;
pub mod trace;

use thiserror::Error;

pub use runner::{ScenarioRunner, run_scenario};
pub use scenario::{Scenario, Step, ViewSpec};
pub use trace::{StepResult, Trace, TraceRecord};

/// Failures that stop a scenario before or while it runs.
///
/// Engine refusals are not errors here; they are recorded as
/// [`StepResult::Rejected`].
#[derive(Debug, Error)]
pub enum ScenarioError {
    #[error("failed to read scenario: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse scenario: {0}")]
    Json(#[from] serde_json::Error),

    #[error("unknown view {0:?}")]
    UnknownView(String),

    #[error("view {0:?} declared twice")]
    DuplicateView(String),
}
