#![forbid(unsafe_code)]

//! Per-overlay configuration.
//!
//! [`OverlayConfig`] is what a content unit would otherwise answer through a
//! delegate: whether taps outside or drags dismiss it, where it rests, how it
//! animates. Supply it inline with each `present`, or register it once per
//! content in an [`OverlayConfigRegistry`].
//!
//! # Loading
//!
//! With the `config-file` feature the serializable part of the config can be
//! read from TOML or JSON:
//!
//! ```toml
//! drag_to_dismiss = true
//! position = "bottom"
//! present_animation = "from_bottom"
//! duration = 0.3
//! easing = "ease_out"
//! background = 0x000000CC
//! ```
//!
//! ```rust,ignore
//! let config = OverlayConfig::from_toml_file("sheet.toml")?;
//! ```
//!
//! Host handles (`host_surface`, `transition_element`, anchor-based
//! animations) only exist at runtime and are never serialized.

#[cfg(feature = "config-file")]
use std::path::Path;
use std::time::Duration;

use ahash::AHashMap;
use ftui_core::animation::Easing;
use ftui_core::color::PackedRgba;
use thiserror::Error;

use crate::host::NodeId;
use crate::planner::{DismissAnimation, PresentAnimation};
use crate::resolver::Position;

/// Default backdrop: black at roughly 80% opacity.
pub const DEFAULT_BACKGROUND: PackedRgba = PackedRgba::rgba(0, 0, 0, 204);

/// Default corner radius of the overlay container.
pub const DEFAULT_CORNER_RADIUS: f64 = 8.0;

/// Configuration consulted by a session for one content unit.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "config-file", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "config-file", serde(default))]
pub struct OverlayConfig {
    /// Dismiss when the backdrop outside the resting frame is tapped.
    pub tap_outside_to_dismiss: bool,
    /// Let a drag along the exit axis dismiss the overlay.
    pub drag_to_dismiss: bool,
    /// Shrink the available area by the keyboard height.
    pub avoid_keyboard: bool,
    /// Present into this node instead of a new top-level window.
    #[cfg_attr(feature = "config-file", serde(skip))]
    pub host_surface: Option<NodeId>,
    /// Resting position; `None` means [`Position::Center`].
    pub position: Option<Position>,
    pub present_animation: PresentAnimation,
    pub dismiss_animation: DismissAnimation,
    pub easing: Option<Easing>,
    #[cfg_attr(
        feature = "config-file",
        serde(
            serialize_with = "serialize_secs",
            deserialize_with = "deserialize_secs"
        )
    )]
    pub duration: Option<Duration>,
    /// Container background once presented.
    pub background: PackedRgba,
    pub corner_radius: f64,
    /// Node snapshotted in place of the content during flight transitions.
    #[cfg_attr(feature = "config-file", serde(skip))]
    pub transition_element: Option<NodeId>,
}

impl Default for OverlayConfig {
    fn default() -> Self {
        Self {
            tap_outside_to_dismiss: false,
            drag_to_dismiss: false,
            avoid_keyboard: false,
            host_surface: None,
            position: None,
            present_animation: PresentAnimation::Auto,
            dismiss_animation: DismissAnimation::Auto,
            easing: None,
            duration: None,
            background: DEFAULT_BACKGROUND,
            corner_radius: DEFAULT_CORNER_RADIUS,
            transition_element: None,
        }
    }
}

impl OverlayConfig {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn tap_outside_to_dismiss(mut self, enabled: bool) -> Self {
        self.tap_outside_to_dismiss = enabled;
        self
    }

    #[must_use]
    pub fn drag_to_dismiss(mut self, enabled: bool) -> Self {
        self.drag_to_dismiss = enabled;
        self
    }

    #[must_use]
    pub fn avoid_keyboard(mut self, enabled: bool) -> Self {
        self.avoid_keyboard = enabled;
        self
    }

    #[must_use]
    pub fn host_surface(mut self, node: NodeId) -> Self {
        self.host_surface = Some(node);
        self
    }

    #[must_use]
    pub fn position(mut self, position: Position) -> Self {
        self.position = Some(position);
        self
    }

    #[must_use]
    pub fn present_animation(mut self, animation: PresentAnimation) -> Self {
        self.present_animation = animation;
        self
    }

    #[must_use]
    pub fn dismiss_animation(mut self, animation: DismissAnimation) -> Self {
        self.dismiss_animation = animation;
        self
    }

    #[must_use]
    pub fn easing(mut self, easing: Easing) -> Self {
        self.easing = Some(easing);
        self
    }

    #[must_use]
    pub fn duration(mut self, duration: Duration) -> Self {
        self.duration = Some(duration);
        self
    }

    #[must_use]
    pub fn background(mut self, color: PackedRgba) -> Self {
        self.background = color;
        self
    }

    #[must_use]
    pub fn corner_radius(mut self, radius: f64) -> Self {
        self.corner_radius = radius;
        self
    }

    #[must_use]
    pub fn transition_element(mut self, node: NodeId) -> Self {
        self.transition_element = Some(node);
        self
    }

    /// Resting position with the default applied.
    pub fn resolved_position(&self) -> Position {
        self.position.unwrap_or_default()
    }

    /// Load from a TOML string.
    #[cfg(feature = "config-file")]
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        toml::from_str(s).map_err(ConfigError::Toml)
    }

    /// Load from a TOML file on disk.
    #[cfg(feature = "config-file")]
    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::from_toml_str(&content)
    }

    /// Load from a JSON string.
    #[cfg(feature = "config-file")]
    pub fn from_json_str(s: &str) -> Result<Self, ConfigError> {
        serde_json::from_str(s).map_err(ConfigError::Json)
    }

    /// Load from a JSON file on disk.
    #[cfg(feature = "config-file")]
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::from_json_str(&content)
    }

    /// Check value ranges. An empty list means the config is usable.
    #[must_use]
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        if !(self.corner_radius >= 0.0 && self.corner_radius.is_finite()) {
            errors.push(format!(
                "corner_radius must be finite and >= 0, got {}",
                self.corner_radius
            ));
        }

        match self.present_animation {
            PresentAnimation::FromCenter(scale) if !(scale > 0.0 && scale.is_finite()) => {
                errors.push(format!(
                    "present_animation scale must be finite and > 0, got {scale}"
                ));
            }
            _ => {}
        }
        match self.dismiss_animation {
            DismissAnimation::ToCenter(scale) if !(scale > 0.0 && scale.is_finite()) => {
                errors.push(format!(
                    "dismiss_animation scale must be finite and > 0, got {scale}"
                ));
            }
            _ => {}
        }

        if let Some(Position::Custom(rect)) = self.position {
            if rect.width < 0.0 || rect.height < 0.0 {
                errors.push(format!(
                    "custom position must have a non-negative size, got {}x{}",
                    rect.width, rect.height
                ));
            }
        }

        errors
    }

    /// [`validate`](Self::validate), as a `Result`.
    pub fn validated(self) -> Result<Self, ConfigError> {
        let errors = self.validate();
        if errors.is_empty() {
            Ok(self)
        } else {
            Err(ConfigError::Validation(errors))
        }
    }
}

/// Errors that can occur when loading an overlay configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[cfg(feature = "config-file")]
    #[error("TOML parse error: {0}")]
    Toml(#[source] toml::de::Error),

    #[cfg(feature = "config-file")]
    #[error("JSON parse error: {0}")]
    Json(#[source] serde_json::Error),

    #[error("validation errors: {}", .0.join("; "))]
    Validation(Vec<String>),
}

#[cfg(feature = "config-file")]
fn serialize_secs<S>(duration: &Option<Duration>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    match duration {
        Some(d) => serializer.serialize_some(&d.as_secs_f64()),
        None => serializer.serialize_none(),
    }
}

#[cfg(feature = "config-file")]
fn deserialize_secs<'de, D>(deserializer: D) -> Result<Option<Duration>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    use serde::Deserialize;

    let secs = Option::<f64>::deserialize(deserializer)?;
    secs.map(|s| {
        Duration::try_from_secs_f64(s)
            .map_err(|_| serde::de::Error::custom(format!("invalid duration: {s}")))
    })
    .transpose()
}

/// Configuration looked up by content identity.
#[derive(Debug, Default)]
pub struct OverlayConfigRegistry {
    configs: AHashMap<NodeId, OverlayConfig>,
}

impl OverlayConfigRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register (or replace) the configuration for `content`.
    pub fn register(&mut self, content: NodeId, config: OverlayConfig) -> Option<OverlayConfig> {
        self.configs.insert(content, config)
    }

    pub fn get(&self, content: NodeId) -> Option<&OverlayConfig> {
        self.configs.get(&content)
    }

    pub fn remove(&mut self, content: NodeId) -> Option<OverlayConfig> {
        self.configs.remove(&content)
    }

    pub fn len(&self) -> usize {
        self.configs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.configs.is_empty()
    }
}
