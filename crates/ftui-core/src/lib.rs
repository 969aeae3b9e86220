#![forbid(unsafe_code)]

//! Core: geometry, color, animation primitives, and input notifications.
//!
//! # Role in FrankenTUI
//! `ftui-core` is the leaf layer of the overlay engine. It owns the value types
//! every other crate speaks in and knows nothing about hosts or sessions.
//!
//! # Primary responsibilities
//! - **Geometry**: [`geometry::Rect`], [`geometry::Size`], [`geometry::Point`].
//! - **Color**: [`color::PackedRgba`] for backdrop colors.
//! - **Animation**: [`animation::Easing`], [`animation::Tween`], [`animation::Lerp`].
//! - **Events**: normalized drag phases and keyboard notifications.

pub mod animation;
pub mod color;
pub mod event;
pub mod geometry;
