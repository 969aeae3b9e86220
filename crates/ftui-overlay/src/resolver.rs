#![forbid(unsafe_code)]

//! Geometry resolver: resting and offscreen frames.
//!
//! Pure functions only. Given a [`Position`], a content size, the viewport,
//! and a keyboard inset, compute where an overlay rests and where it enters
//! from or exits to.
//!
//! # Invariants
//!
//! - For `Top`, `Left`, `Bottom`, `Right`, and `Center`, the resting frame lies
//!   inside the viewport (content larger than the available area is clamped).
//! - `Fullscreen` always equals the viewport; `Custom` is returned verbatim.
//! - The keyboard inset only shrinks the height used for vertical math.

use ftui_core::geometry::{Rect, Size};

/// Where an overlay rests relative to its viewport.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "config-file", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "config-file", serde(rename_all = "snake_case"))]
pub enum Position {
    /// Horizontally centered, pinned to the top edge.
    Top,
    /// Vertically centered, pinned to the left edge.
    Left,
    /// Horizontally centered, pinned to the bottom edge (above the keyboard).
    Bottom,
    /// Vertically centered, pinned to the right edge.
    Right,
    /// Centered on both axes.
    #[default]
    Center,
    /// Covers the whole viewport.
    Fullscreen,
    /// An explicit frame, used verbatim.
    Custom(Rect),
}

/// Direction an overlay travels when entering or leaving.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Direction {
    Top,
    Left,
    Bottom,
    Right,
    /// Scale about the resting frame's center (no translation).
    Scale(f64),
    /// Morph from/to an anchor element (no translation).
    Anchor,
}

/// Axis along which a direction translates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    Horizontal,
    Vertical,
}

impl Direction {
    /// Translation axis, or `None` for scale and anchor directions.
    pub fn axis(self) -> Option<Axis> {
        match self {
            Self::Top | Self::Bottom => Some(Axis::Vertical),
            Self::Left | Self::Right => Some(Axis::Horizontal),
            Self::Scale(_) | Self::Anchor => None,
        }
    }

    /// Sign of travel along the axis when leaving (+1 toward right/bottom).
    pub fn sign(self) -> f64 {
        match self {
            Self::Top | Self::Left => -1.0,
            _ => 1.0,
        }
    }
}

/// Size the session lays the content out at.
///
/// A degenerate report (either dimension zero or negative) falls back to the
/// whole viewport; otherwise each dimension is floored to 1.
pub fn effective_content_size(reported: Size, viewport: Size) -> Size {
    if reported.is_degenerate() {
        return viewport;
    }
    Size::new(reported.width.max(1.0), reported.height.max(1.0))
}

/// Area left for the overlay once the keyboard inset is removed.
pub fn available_area(viewport: Size, keyboard_inset: f64) -> Size {
    Size::new(
        viewport.width.max(0.0),
        (viewport.height - keyboard_inset.max(0.0)).max(0.0),
    )
}

/// The overlay's stable, on-screen rectangle.
pub fn resting_frame(position: Position, content: Size, viewport: Size, keyboard_inset: f64) -> Rect {
    let available = available_area(viewport, keyboard_inset);
    let size = content.clamp_to(available);
    let centered_x = (available.width - size.width) / 2.0;
    let centered_y = (available.height - size.height) / 2.0;

    let (x, y) = match position {
        Position::Fullscreen => return Rect::from_size(viewport),
        Position::Custom(rect) => return rect,
        Position::Top => (centered_x, 0.0),
        Position::Left => (0.0, centered_y),
        Position::Bottom => (centered_x, available.height - size.height),
        Position::Right => (available.width - size.width, centered_y),
        Position::Center => (centered_x, centered_y),
    };
    Rect::new(x, y, size.width, size.height)
}

/// Move a resting frame fully outside the viewport in `direction`.
///
/// Scale and anchor directions leave the frame unchanged; their effect is a
/// transform or a morph applied separately.
pub fn offscreen_frame(resting: Rect, direction: Direction, viewport: Size) -> Rect {
    match direction {
        Direction::Top => Rect {
            y: resting.y.min(0.0) - resting.height,
            ..resting
        },
        Direction::Left => Rect {
            x: resting.x.min(0.0) - resting.width,
            ..resting
        },
        Direction::Bottom => Rect {
            y: viewport.height,
            ..resting
        },
        Direction::Right => Rect {
            x: viewport.width,
            ..resting
        },
        Direction::Scale(_) | Direction::Anchor => resting,
    }
}
