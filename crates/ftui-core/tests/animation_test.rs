//! Integration tests for the animation module.

use ftui_core::animation::{Easing, Lerp, Tween};
use ftui_core::geometry::Rect;
use proptest::prelude::*;
use std::time::Duration;

const MS_100: Duration = Duration::from_millis(100);

#[test]
fn many_small_ticks_complete_tween() {
    let mut tween = Tween::new(Duration::from_secs(1), Easing::EaseInOut);
    let mut completions = 0;
    for _ in 0..1000 {
        if tween.tick(Duration::from_millis(1)) {
            completions += 1;
        }
    }
    assert!(tween.is_complete(), "1000x1ms should complete 1s tween");
    assert_eq!(completions, 1, "completion is reported exactly once");
}

#[test]
fn overshooting_tick_clamps_progress() {
    let mut tween = Tween::new(MS_100, Easing::Linear);
    tween.tick(Duration::from_secs(5));
    assert_eq!(tween.progress(), 1.0);
    assert_eq!(tween.elapsed(), MS_100);
}

#[test]
fn tween_drives_rect_interpolation() {
    let from = Rect::new(50.0, 800.0, 300.0, 300.0);
    let to = Rect::new(50.0, 250.0, 300.0, 300.0);
    let mut tween = Tween::new(MS_100, Easing::Linear);
    tween.tick(Duration::from_millis(50));
    let mid = from.lerp(&to, tween.value());
    assert_eq!(mid, Rect::new(50.0, 525.0, 300.0, 300.0));
}

proptest! {
    #[test]
    fn eased_value_stays_in_unit_interval(
        total_ms in 1u64..5_000,
        ticks in proptest::collection::vec(0u64..500, 0..50),
    ) {
        for easing in [Easing::EaseIn, Easing::EaseOut, Easing::EaseInOut, Easing::Linear] {
            let mut tween = Tween::new(Duration::from_millis(total_ms), easing);
            for dt in &ticks {
                tween.tick(Duration::from_millis(*dt));
                let v = tween.value();
                prop_assert!((0.0..=1.0).contains(&v), "{easing:?} produced {v}");
                prop_assert!((0.0..=1.0).contains(&tween.progress()));
            }
        }
    }
}
