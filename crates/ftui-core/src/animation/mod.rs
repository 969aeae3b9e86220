#![forbid(unsafe_code)]

//! Animation primitives: easing curves, tweens, and interpolation.
//!
//! The overlay engine is tick-driven: the host's frame clock advances a
//! [`Tween`], and the engine interpolates visual properties with [`Lerp`].

mod easing;
mod tween;

pub use easing::Easing;
pub use tween::Tween;

use crate::color::PackedRgba;
use crate::geometry::{Point, Rect, Size};

/// Linear interpolation between two values.
///
/// `t` is expected in [0.0, 1.0]; `lerp(a, b, 0.0) == a`.
pub trait Lerp: Sized {
    fn lerp(&self, to: &Self, t: f64) -> Self;
}

impl Lerp for f64 {
    #[inline]
    fn lerp(&self, to: &Self, t: f64) -> Self {
        self + (to - self) * t
    }
}

impl Lerp for Point {
    fn lerp(&self, to: &Self, t: f64) -> Self {
        Point::new(self.x.lerp(&to.x, t), self.y.lerp(&to.y, t))
    }
}

impl Lerp for Size {
    fn lerp(&self, to: &Self, t: f64) -> Self {
        Size::new(self.width.lerp(&to.width, t), self.height.lerp(&to.height, t))
    }
}

impl Lerp for Rect {
    fn lerp(&self, to: &Self, t: f64) -> Self {
        Rect::from_origin_size(
            self.origin().lerp(&to.origin(), t),
            self.size().lerp(&to.size(), t),
        )
    }
}

impl Lerp for PackedRgba {
    fn lerp(&self, to: &Self, t: f64) -> Self {
        let channel = |a: u8, b: u8| -> u8 {
            (a as f64).lerp(&(b as f64), t).round().clamp(0.0, 255.0) as u8
        };
        PackedRgba::rgba(
            channel(self.r(), to.r()),
            channel(self.g(), to.g()),
            channel(self.b(), to.b()),
            channel(self.a(), to.a()),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rect_lerp_midpoint() {
        let a = Rect::new(0.0, 0.0, 100.0, 100.0);
        let b = Rect::new(100.0, 200.0, 200.0, 300.0);
        assert_eq!(a.lerp(&b, 0.5), Rect::new(50.0, 100.0, 150.0, 200.0));
        assert_eq!(a.lerp(&b, 0.0), a);
    }

    #[test]
    fn color_lerp_fades_alpha() {
        let from = PackedRgba::TRANSPARENT;
        let to = PackedRgba::rgba(0, 0, 0, 204);
        assert_eq!(from.lerp(&to, 0.5).a(), 102);
        assert_eq!(from.lerp(&to, 1.0), to);
    }
}
