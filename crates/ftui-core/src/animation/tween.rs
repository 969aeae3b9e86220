#![forbid(unsafe_code)]

//! Time-driven progress tracking for a single transition.
//!
//! # Invariants
//!
//! - `progress()` is always in [0.0, 1.0].
//! - Zero-duration tweens are complete from construction.
//! - Once complete, further ticks are no-ops.

use std::time::Duration;

use super::Easing;

/// Progress of one timed transition.
#[derive(Debug, Clone, PartialEq)]
pub struct Tween {
    duration: Duration,
    easing: Easing,
    elapsed: Duration,
}

impl Tween {
    /// Create a tween that has not advanced yet.
    pub fn new(duration: Duration, easing: Easing) -> Self {
        Self {
            duration,
            easing,
            elapsed: Duration::ZERO,
        }
    }

    /// Total duration.
    #[inline]
    pub fn duration(&self) -> Duration {
        self.duration
    }

    /// Easing applied by [`Tween::value`].
    #[inline]
    pub fn easing(&self) -> Easing {
        self.easing
    }

    /// Time advanced so far (never exceeds the duration).
    #[inline]
    pub fn elapsed(&self) -> Duration {
        self.elapsed
    }

    /// Linear progress in [0.0, 1.0].
    pub fn progress(&self) -> f64 {
        if self.duration.is_zero() {
            return 1.0;
        }
        (self.elapsed.as_secs_f64() / self.duration.as_secs_f64()).clamp(0.0, 1.0)
    }

    /// Eased progress.
    #[inline]
    pub fn value(&self) -> f64 {
        self.easing.apply(self.progress())
    }

    /// Whether the tween reached its end.
    #[inline]
    pub fn is_complete(&self) -> bool {
        self.elapsed >= self.duration
    }

    /// Advance by `delta`.
    ///
    /// Returns `true` only on the tick that completes the tween.
    pub fn tick(&mut self, delta: Duration) -> bool {
        if self.is_complete() {
            return false;
        }
        self.elapsed = (self.elapsed + delta).min(self.duration);
        self.is_complete()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tick_advances_and_completes_once() {
        let mut tween = Tween::new(Duration::from_millis(200), Easing::Linear);
        assert!(!tween.tick(Duration::from_millis(100)));
        assert!((tween.progress() - 0.5).abs() < 1e-9);
        assert!(tween.tick(Duration::from_millis(150)));
        assert!(tween.is_complete());
        assert_eq!(tween.elapsed(), Duration::from_millis(200));
        assert!(!tween.tick(Duration::from_millis(10)));
    }

    #[test]
    fn zero_duration_is_complete_immediately() {
        let tween = Tween::new(Duration::ZERO, Easing::EaseInOut);
        assert!(tween.is_complete());
        assert_eq!(tween.progress(), 1.0);
        assert_eq!(tween.value(), 1.0);
    }

    #[test]
    fn value_applies_easing() {
        let mut tween = Tween::new(Duration::from_millis(100), Easing::EaseIn);
        tween.tick(Duration::from_millis(50));
        assert!((tween.value() - 0.125).abs() < 1e-9);
    }
}
