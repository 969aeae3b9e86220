#![forbid(unsafe_code)]

//! Scenario files: a screen, a view tree, and a script of steps.
//!
//! Scenarios are JSON documents. Views are referred to by name; the runner
//! maps names to host nodes when it builds the view tree.
//!
//! ```json
//! {
//!   "name": "center_card",
//!   "viewport": { "width": 400, "height": 800 },
//!   "views": [
//!     { "name": "card", "detached": true,
//!       "frame": { "x": 0, "y": 0, "width": 300, "height": 300 } }
//!   ],
//!   "steps": [
//!     { "op": "present", "content": "card" },
//!     { "op": "settle" },
//!     { "op": "frames" }
//!   ]
//! }
//! ```

use std::collections::BTreeMap;
use std::path::Path;

use ftui_core::animation::Easing;
use ftui_core::event::{DragPhase, KeyboardEvent};
use ftui_core::geometry::{Rect, Size};
use ftui_overlay::OverlayConfig;
use ftui_overlay::planner::{DismissAnimation, PresentAnimation};
use ftui_overlay::resolver::Position;
use serde::{Deserialize, Serialize};

use crate::ScenarioError;

/// Default frame interval for `settle`.
pub const DEFAULT_FRAME_MS: u64 = 16;

fn default_true() -> bool {
    true
}

fn default_count() -> u32 {
    1
}

fn default_frame_ms() -> u64 {
    DEFAULT_FRAME_MS
}

/// A named node in the initial view tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ViewSpec {
    pub name: String,
    /// Parent view name; the key window root when absent.
    #[serde(default)]
    pub parent: Option<String>,
    /// Keep the view out of the tree. Presented content that has no parent
    /// enters from offscreen instead of morphing out of its current frame.
    #[serde(default)]
    pub detached: bool,
    pub frame: Rect,
    /// Size the view reports as preferred; its frame size when absent.
    #[serde(default)]
    pub preferred_size: Option<Size>,
    #[serde(default)]
    pub alpha: Option<f64>,
    #[serde(default)]
    pub corner_radius: Option<f64>,
}

/// One scripted action.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Step {
    /// Present a view on the overlay stack.
    Present {
        content: String,
        #[serde(default)]
        animation: PresentAnimation,
        #[serde(default)]
        dismiss_animation: DismissAnimation,
        /// Fly out of (and back into) this view.
        #[serde(default)]
        anchor: Option<String>,
        #[serde(default)]
        position: Option<Position>,
        #[serde(default)]
        duration_ms: Option<u64>,
        #[serde(default)]
        easing: Option<Easing>,
        /// Inline configuration, overriding the registry.
        #[serde(default)]
        config: Option<OverlayConfig>,
        /// Present into this view instead of a new window.
        #[serde(default)]
        host_surface: Option<String>,
        /// Snapshot this view instead of the content during flights.
        #[serde(default)]
        transition_element: Option<String>,
    },
    /// Advance the clock `count` times by `ms`.
    Tick {
        ms: u64,
        #[serde(default = "default_count")]
        count: u32,
    },
    /// Tick until nothing is animating or waiting to relayout.
    Settle {
        #[serde(default = "default_frame_ms")]
        frame_ms: u64,
    },
    /// Route a drag sample to the top overlay.
    Drag { phase: DragPhase, x: f64, y: f64 },
    /// Deliver a keyboard notification to every overlay.
    Keyboard { event: KeyboardEvent },
    /// Tap the backdrop of the top overlay.
    Tap { x: f64, y: f64 },
    Dismiss {
        content: String,
        #[serde(default = "default_true")]
        animated: bool,
        /// Record a completion record with this label when it runs.
        #[serde(default)]
        label: Option<String>,
    },
    DismissTop {
        #[serde(default = "default_true")]
        animated: bool,
        #[serde(default)]
        label: Option<String>,
    },
    DismissAll {
        #[serde(default = "default_true")]
        animated: bool,
        #[serde(default)]
        label: Option<String>,
    },
    UpdatePosition {
        content: String,
        position: Position,
        #[serde(default)]
        duration_ms: Option<u64>,
    },
    UpdateLayout {
        content: String,
        #[serde(default)]
        duration_ms: Option<u64>,
    },
    /// Change the size a view reports as preferred.
    SetPreferredSize { view: String, size: Size },
    /// Resize the screen and notify every overlay.
    Resize { width: f64, height: f64 },
    /// Destroy a view out from under the engine.
    Kill { view: String },
    /// Make snapshot capture fail (or succeed again).
    FailSnapshots { fail: bool },
    /// Record the current visual state of every overlay.
    Frames,
}

impl Step {
    /// Stable operation name used in trace records.
    pub fn op(&self) -> &'static str {
        match self {
            Self::Present { .. } => "present",
            Self::Tick { .. } => "tick",
            Self::Settle { .. } => "settle",
            Self::Drag { .. } => "drag",
            Self::Keyboard { .. } => "keyboard",
            Self::Tap { .. } => "tap",
            Self::Dismiss { .. } => "dismiss",
            Self::DismissTop { .. } => "dismiss_top",
            Self::DismissAll { .. } => "dismiss_all",
            Self::UpdatePosition { .. } => "update_position",
            Self::UpdateLayout { .. } => "update_layout",
            Self::SetPreferredSize { .. } => "set_preferred_size",
            Self::Resize { .. } => "resize",
            Self::Kill { .. } => "kill",
            Self::FailSnapshots { .. } => "fail_snapshots",
            Self::Frames => "frames",
        }
    }
}

/// A complete scripted run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scenario {
    #[serde(default)]
    pub name: String,
    pub viewport: Size,
    #[serde(default)]
    pub views: Vec<ViewSpec>,
    /// Registry entries keyed by content view name.
    #[serde(default)]
    pub configs: BTreeMap<String, OverlayConfig>,
    pub steps: Vec<Step>,
}

impl Scenario {
    pub fn new(name: impl Into<String>, viewport: Size) -> Self {
        Self {
            name: name.into(),
            viewport,
            views: Vec::new(),
            configs: BTreeMap::new(),
            steps: Vec::new(),
        }
    }

    /// Add a view under the key window root.
    #[must_use]
    pub fn view(mut self, name: impl Into<String>, frame: Rect) -> Self {
        self.views.push(ViewSpec {
            name: name.into(),
            parent: None,
            detached: false,
            frame,
            preferred_size: None,
            alpha: None,
            corner_radius: None,
        });
        self
    }

    /// Add a view that is not in the tree, sized `size`.
    #[must_use]
    pub fn detached_view(mut self, name: impl Into<String>, size: Size) -> Self {
        self.views.push(ViewSpec {
            name: name.into(),
            parent: None,
            detached: true,
            frame: Rect::from_size(size),
            preferred_size: None,
            alpha: None,
            corner_radius: None,
        });
        self
    }

    #[must_use]
    pub fn config(mut self, content: impl Into<String>, config: OverlayConfig) -> Self {
        self.configs.insert(content.into(), config);
        self
    }

    #[must_use]
    pub fn step(mut self, step: Step) -> Self {
        self.steps.push(step);
        self
    }

    pub fn from_json_str(input: &str) -> Result<Self, ScenarioError> {
        Ok(serde_json::from_str(input)?)
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ScenarioError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_json_str(&contents)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_minimal_scenario() {
        let scenario = Scenario::from_json_str(
            r#"{
                "viewport": { "width": 400, "height": 800 },
                "views": [
                    { "name": "card", "frame": { "x": 0, "y": 0, "width": 300, "height": 300 } }
                ],
                "steps": [
                    { "op": "present", "content": "card", "animation": "from_bottom" },
                    { "op": "tick", "ms": 16 },
                    { "op": "settle" },
                    { "op": "dismiss", "content": "card", "label": "closed" }
                ]
            }"#,
        )
        .expect("scenario parses");

        assert_eq!(scenario.viewport, Size::new(400.0, 800.0));
        assert_eq!(scenario.views.len(), 1);
        assert!(matches!(
            &scenario.steps[0],
            Step::Present { animation: PresentAnimation::FromBottom, anchor: None, .. }
        ));
        assert_eq!(scenario.steps[1], Step::Tick { ms: 16, count: 1 });
        assert_eq!(scenario.steps[2], Step::Settle { frame_ms: DEFAULT_FRAME_MS });
        assert!(matches!(
            &scenario.steps[3],
            Step::Dismiss { animated: true, label: Some(label), .. } if label == "closed"
        ));
    }

    #[test]
    fn parses_input_steps() {
        let scenario = Scenario::from_json_str(
            r#"{
                "viewport": { "width": 400, "height": 800 },
                "steps": [
                    { "op": "drag", "phase": "began", "x": 200, "y": 500 },
                    { "op": "keyboard", "event": { "kind": "will_show",
                        "end_frame": { "x": 0, "y": 500, "width": 400, "height": 300 } } },
                    { "op": "keyboard", "event": { "kind": "will_hide" } },
                    { "op": "update_position", "content": "card", "position": { "custom": { "x": 1, "y": 2, "width": 3, "height": 4 } } },
                    { "op": "frames" }
                ]
            }"#,
        )
        .expect("scenario parses");

        assert_eq!(scenario.steps[0].op(), "drag");
        assert!(matches!(
            scenario.steps[1],
            Step::Keyboard { event: KeyboardEvent::WillShow { end_frame: Some(_) } }
        ));
        assert_eq!(
            scenario.steps[2],
            Step::Keyboard { event: KeyboardEvent::WillHide }
        );
        assert!(matches!(
            scenario.steps[3],
            Step::UpdatePosition { position: Position::Custom(rect), duration_ms: None, .. }
                if rect == Rect::new(1.0, 2.0, 3.0, 4.0)
        ));
        assert_eq!(scenario.steps[4], Step::Frames);
    }

    #[test]
    fn unknown_op_is_rejected() {
        let err = Scenario::from_json_str(
            r#"{ "viewport": { "width": 1, "height": 1 }, "steps": [ { "op": "explode" } ] }"#,
        )
        .unwrap_err();
        assert!(matches!(err, ScenarioError::Json(_)));
    }
}
