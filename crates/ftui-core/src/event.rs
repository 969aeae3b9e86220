#![forbid(unsafe_code)]

//! Input notifications consumed by the overlay engine.
//!
//! Gesture recognition and keyboard tracking live in the host; the engine
//! only needs the normalized results defined here.

use crate::geometry::Rect;

/// Phase of a drag gesture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum DragPhase {
    /// Touch went down and the recognizer committed to a drag.
    Began,
    /// The touch moved.
    Changed,
    /// The touch was released.
    Ended,
    /// The system cancelled the gesture (treated like a short release).
    Cancelled,
}

impl DragPhase {
    /// Whether this phase terminates the gesture.
    #[inline]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Ended | Self::Cancelled)
    }
}

/// Software-keyboard notification.
///
/// Geometry is optional because hosts may deliver notifications without it;
/// such events carry no usable height.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(tag = "kind", rename_all = "snake_case"))]
pub enum KeyboardEvent {
    /// The keyboard is about to appear with the given final frame.
    WillShow { end_frame: Option<Rect> },
    /// The keyboard frame is about to change (e.g. a different input mode).
    WillChangeFrame { end_frame: Option<Rect> },
    /// The keyboard is about to disappear.
    WillHide,
}

impl KeyboardEvent {
    /// Keyboard height carried by this notification.
    ///
    /// Returns `None` when a show/change notification lacks its end frame.
    pub fn height(&self) -> Option<f64> {
        match self {
            Self::WillShow { end_frame } | Self::WillChangeFrame { end_frame } => {
                end_frame.map(|frame| frame.height.max(0.0))
            }
            Self::WillHide => Some(0.0),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keyboard_height_from_end_frame() {
        let event = KeyboardEvent::WillShow {
            end_frame: Some(Rect::new(0.0, 500.0, 400.0, 300.0)),
        };
        assert_eq!(event.height(), Some(300.0));
        assert_eq!(KeyboardEvent::WillHide.height(), Some(0.0));
    }

    #[test]
    fn keyboard_without_geometry_has_no_height() {
        assert_eq!(KeyboardEvent::WillShow { end_frame: None }.height(), None);
        assert_eq!(
            KeyboardEvent::WillChangeFrame { end_frame: None }.height(),
            None
        );
    }

    #[test]
    fn terminal_drag_phases() {
        assert!(!DragPhase::Began.is_terminal());
        assert!(!DragPhase::Changed.is_terminal());
        assert!(DragPhase::Ended.is_terminal());
        assert!(DragPhase::Cancelled.is_terminal());
    }
}
