#![forbid(unsafe_code)]

//! Transition planner: which entrance, which exit, how long.
//!
//! Every resolver follows the same precedence: an explicit per-call request,
//! then the per-content configuration, then a default derived from the
//! overlay's [`Position`]. `Auto` at any level means "ask the next one".
//!
//! The derived exit always mirrors the entrance actually used, so an overlay
//! leaves the screen the way it arrived.

use std::time::Duration;

use ftui_core::animation::Easing;
use ftui_core::geometry::Size;

use crate::host::NodeId;
use crate::resolver::{Direction, Position};

/// Scale an overlay grows from when it appears in place.
pub const DEFAULT_CENTER_SCALE: f64 = 0.8;

/// Transition duration when nothing else is configured.
pub const DEFAULT_DURATION: Duration = Duration::from_millis(450);

/// Requested entrance animation.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "config-file", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "config-file", serde(rename_all = "snake_case"))]
pub enum PresentAnimation {
    /// Defer to the next level of configuration.
    #[default]
    Auto,
    FromTop,
    FromLeft,
    FromBottom,
    FromRight,
    /// Grow from the given scale while fading in.
    FromCenter(f64),
    /// Fly out of an anchor element.
    #[cfg_attr(feature = "config-file", serde(skip))]
    FromView(NodeId),
}

/// Requested exit animation.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "config-file", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "config-file", serde(rename_all = "snake_case"))]
pub enum DismissAnimation {
    /// Defer to the next level of configuration.
    #[default]
    Auto,
    ToTop,
    ToLeft,
    ToBottom,
    ToRight,
    /// Shrink to the given scale while fading out.
    ToCenter(f64),
    /// Fly back into an anchor element.
    #[cfg_attr(feature = "config-file", serde(skip))]
    ToView(NodeId),
}

/// A resolved entrance.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Entrance {
    FromTop,
    FromLeft,
    FromBottom,
    FromRight,
    FromCenter(f64),
    FromView(NodeId),
}

/// A resolved exit.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Exit {
    ToTop,
    ToLeft,
    ToBottom,
    ToRight,
    ToCenter(f64),
    ToView(NodeId),
}

impl PresentAnimation {
    /// The concrete entrance, or `None` for `Auto`.
    pub fn concrete(self) -> Option<Entrance> {
        Some(match self {
            Self::Auto => return None,
            Self::FromTop => Entrance::FromTop,
            Self::FromLeft => Entrance::FromLeft,
            Self::FromBottom => Entrance::FromBottom,
            Self::FromRight => Entrance::FromRight,
            Self::FromCenter(scale) => Entrance::FromCenter(scale),
            Self::FromView(anchor) => Entrance::FromView(anchor),
        })
    }
}

impl DismissAnimation {
    /// The concrete exit, or `None` for `Auto`.
    pub fn concrete(self) -> Option<Exit> {
        Some(match self {
            Self::Auto => return None,
            Self::ToTop => Exit::ToTop,
            Self::ToLeft => Exit::ToLeft,
            Self::ToBottom => Exit::ToBottom,
            Self::ToRight => Exit::ToRight,
            Self::ToCenter(scale) => Exit::ToCenter(scale),
            Self::ToView(anchor) => Exit::ToView(anchor),
        })
    }
}

impl Entrance {
    pub fn direction(self) -> Direction {
        match self {
            Self::FromTop => Direction::Top,
            Self::FromLeft => Direction::Left,
            Self::FromBottom => Direction::Bottom,
            Self::FromRight => Direction::Right,
            Self::FromCenter(scale) => Direction::Scale(scale),
            Self::FromView(_) => Direction::Anchor,
        }
    }

    pub fn anchor(self) -> Option<NodeId> {
        match self {
            Self::FromView(anchor) => Some(anchor),
            _ => None,
        }
    }

    /// The exit that leaves the way this entrance arrived.
    pub fn mirror(self) -> Exit {
        match self {
            Self::FromTop => Exit::ToTop,
            Self::FromLeft => Exit::ToLeft,
            Self::FromBottom => Exit::ToBottom,
            Self::FromRight => Exit::ToRight,
            Self::FromCenter(scale) => Exit::ToCenter(scale),
            Self::FromView(anchor) => Exit::ToView(anchor),
        }
    }
}

impl Exit {
    pub fn direction(self) -> Direction {
        match self {
            Self::ToTop => Direction::Top,
            Self::ToLeft => Direction::Left,
            Self::ToBottom => Direction::Bottom,
            Self::ToRight => Direction::Right,
            Self::ToCenter(scale) => Direction::Scale(scale),
            Self::ToView(_) => Direction::Anchor,
        }
    }

    pub fn anchor(self) -> Option<NodeId> {
        match self {
            Self::ToView(anchor) => Some(anchor),
            _ => None,
        }
    }
}

/// Entrance implied by a position alone.
pub fn position_entrance(position: Position, viewport: Size) -> Entrance {
    match position {
        Position::Top => Entrance::FromTop,
        Position::Left => Entrance::FromLeft,
        Position::Bottom | Position::Fullscreen => Entrance::FromBottom,
        Position::Right => Entrance::FromRight,
        Position::Center => Entrance::FromCenter(DEFAULT_CENTER_SCALE),
        Position::Custom(rect) => {
            if rect.x == 0.0 {
                Entrance::FromLeft
            } else if rect.y == 0.0 {
                Entrance::FromBottom
            } else if rect.x > viewport.width / 2.0 {
                Entrance::FromRight
            } else if rect.y > viewport.height / 2.0 {
                Entrance::FromBottom
            } else {
                Entrance::FromCenter(DEFAULT_CENTER_SCALE)
            }
        }
    }
}

/// Resolve the entrance: explicit, then configured, then position-derived.
pub fn resolve_present_animation(
    explicit: PresentAnimation,
    configured: PresentAnimation,
    position: Position,
    viewport: Size,
) -> Entrance {
    explicit
        .concrete()
        .or_else(|| configured.concrete())
        .unwrap_or_else(|| position_entrance(position, viewport))
}

/// Exit for an overlay that entered with `entrance_used`.
///
/// Without a recorded entrance the position mapping is mirrored instead.
pub fn derive_dismiss_animation(
    entrance_used: Option<Entrance>,
    position: Position,
    viewport: Size,
) -> Exit {
    entrance_used
        .unwrap_or_else(|| position_entrance(position, viewport))
        .mirror()
}

/// Resolve the exit: explicit, then configured, then derived.
pub fn resolve_dismiss_animation(
    explicit: DismissAnimation,
    configured: DismissAnimation,
    entrance_used: Option<Entrance>,
    position: Position,
    viewport: Size,
) -> Exit {
    explicit
        .concrete()
        .or_else(|| configured.concrete())
        .unwrap_or_else(|| derive_dismiss_animation(entrance_used, position, viewport))
}

/// Duration and easing of one transition.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Timing {
    pub duration: Duration,
    pub easing: Easing,
}

impl Default for Timing {
    fn default() -> Self {
        Self {
            duration: DEFAULT_DURATION,
            easing: Easing::EaseInOut,
        }
    }
}

/// Resolve duration and easing independently, explicit over configured.
pub fn resolve_timing(
    explicit_duration: Option<Duration>,
    explicit_easing: Option<Easing>,
    configured_duration: Option<Duration>,
    configured_easing: Option<Easing>,
) -> Timing {
    let fallback = Timing::default();
    Timing {
        duration: explicit_duration
            .or(configured_duration)
            .unwrap_or(fallback.duration),
        easing: explicit_easing
            .or(configured_easing)
            .unwrap_or(fallback.easing),
    }
}
