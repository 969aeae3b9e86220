#![forbid(unsafe_code)]

//! JSONL trace records produced by a scenario run.
//!
//! Every record carries the step index and the scenario clock at the time it
//! was produced. Sessions are numbered from 1 in order of first appearance,
//! so two runs of the same scenario yield byte-identical traces.
//! [`Trace::digest`] hashes that output for golden comparisons.

use std::io::{self, Write};

use ftui_core::event::DragPhase;
use ftui_core::geometry::Rect;
use ftui_overlay::{OverlayEvent, SessionState};
use serde::Serialize;

/// Result of one scripted step.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum StepResult {
    Ok,
    /// A session was presented (or already was).
    Session { session: u64 },
    /// Whether input was consumed.
    Handled { handled: bool },
    /// The request was absorbed by work already in flight.
    Ignored,
    Count { count: usize },
    /// `settle` ran out of frames before the stack went quiet.
    Unsettled { frames: usize },
    /// The engine refused the request.
    Rejected { error: String },
}

/// One line of a trace.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "record", rename_all = "snake_case")]
pub enum TraceRecord {
    Step {
        step: usize,
        elapsed_ms: u64,
        op: &'static str,
        #[serde(flatten)]
        result: StepResult,
    },
    Event {
        step: usize,
        elapsed_ms: u64,
        session: u64,
        event: &'static str,
        #[serde(skip_serializing_if = "Option::is_none")]
        phase: Option<DragPhase>,
        #[serde(skip_serializing_if = "Option::is_none")]
        translation: Option<f64>,
    },
    Completion {
        step: usize,
        elapsed_ms: u64,
        label: String,
    },
    Frame {
        step: usize,
        elapsed_ms: u64,
        session: u64,
        state: &'static str,
        frame: Rect,
        scale: f64,
        alpha: f64,
        keyboard_inset: f64,
    },
    Summary {
        steps: usize,
        elapsed_ms: u64,
        sessions: usize,
        retiring: usize,
        windows: usize,
        live_images: usize,
        nodes: usize,
    },
}

impl TraceRecord {
    pub(crate) fn event(step: usize, elapsed_ms: u64, session: u64, event: &OverlayEvent) -> Self {
        let (phase, translation) = match *event {
            OverlayEvent::DragPhaseChanged {
                phase, translation, ..
            } => (Some(phase), Some(translation)),
            _ => (None, None),
        };
        Self::Event {
            step,
            elapsed_ms,
            session,
            event: event.name(),
            phase,
            translation,
        }
    }

    /// Step index this record belongs to (`None` for the summary).
    pub fn step(&self) -> Option<usize> {
        match self {
            Self::Step { step, .. }
            | Self::Event { step, .. }
            | Self::Completion { step, .. }
            | Self::Frame { step, .. } => Some(*step),
            Self::Summary { .. } => None,
        }
    }
}

pub(crate) fn state_name(state: SessionState) -> &'static str {
    match state {
        SessionState::Idle => "idle",
        SessionState::Presenting => "presenting",
        SessionState::Presented => "presented",
        SessionState::Dismissing => "dismissing",
        SessionState::Disposed => "disposed",
    }
}

/// Records of one scenario run, in production order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Trace {
    pub scenario: String,
    pub records: Vec<TraceRecord>,
}

impl Trace {
    /// Event names in delivery order, optionally for one session.
    pub fn event_names(&self, session: Option<u64>) -> Vec<&'static str> {
        self.records
            .iter()
            .filter_map(|record| match record {
                TraceRecord::Event {
                    session: s, event, ..
                } if session.is_none_or(|wanted| wanted == *s) => Some(*event),
                _ => None,
            })
            .collect()
    }

    /// Results of every step, in order.
    pub fn step_results(&self) -> Vec<&StepResult> {
        self.records
            .iter()
            .filter_map(|record| match record {
                TraceRecord::Step { result, .. } => Some(result),
                _ => None,
            })
            .collect()
    }

    /// Completion labels in the order they ran.
    pub fn completions(&self) -> Vec<&str> {
        self.records
            .iter()
            .filter_map(|record| match record {
                TraceRecord::Completion { label, .. } => Some(label.as_str()),
                _ => None,
            })
            .collect()
    }

    /// The last frame record for `session`.
    pub fn last_frame(&self, session: u64) -> Option<&TraceRecord> {
        self.records.iter().rev().find(
            |record| matches!(record, TraceRecord::Frame { session: s, .. } if *s == session),
        )
    }

    pub fn summary(&self) -> Option<&TraceRecord> {
        self.records
            .iter()
            .rev()
            .find(|record| matches!(record, TraceRecord::Summary { .. }))
    }

    pub fn write_jsonl<W: Write>(&self, mut out: W) -> io::Result<()> {
        for record in &self.records {
            serde_json::to_writer(&mut out, record)?;
            out.write_all(b"\n")?;
        }
        out.flush()
    }

    pub fn to_jsonl(&self) -> String {
        let mut buf = Vec::new();
        // Writing into a Vec cannot fail.
        let _ = self.write_jsonl(&mut buf);
        String::from_utf8_lossy(&buf).into_owned()
    }

    /// blake3 of the JSONL rendering, hex encoded.
    pub fn digest(&self) -> String {
        blake3::hash(self.to_jsonl().as_bytes()).to_hex().to_string()
    }
}
