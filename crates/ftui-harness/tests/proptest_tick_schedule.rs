//! Property tests over frame-clock schedules.
//!
//! However the host slices time into ticks, a full present/dismiss round trip
//! produces the same lifecycle, lands on the same resting frame, and leaves
//! nothing behind on the host.

use ftui_core::geometry::{Rect, Size};
use ftui_harness::{Scenario, Step, TraceRecord, run_scenario};
use ftui_overlay::resolver::Position;
use proptest::prelude::*;

fn position() -> impl Strategy<Value = Position> {
    prop_oneof![
        Just(Position::Top),
        Just(Position::Left),
        Just(Position::Bottom),
        Just(Position::Right),
        Just(Position::Center),
        Just(Position::Fullscreen),
    ]
}

fn ticks(steps: &[u64]) -> Vec<Step> {
    steps.iter().map(|&ms| Step::Tick { ms, count: 1 }).collect()
}

fn round_trip(position: Position, schedule: &[u64]) -> Scenario {
    let mut scenario = Scenario::new("round_trip", Size::new(400.0, 800.0))
        .detached_view("card", Size::new(240.0, 320.0))
        .step(Step::Present {
            content: "card".into(),
            animation: Default::default(),
            dismiss_animation: Default::default(),
            anchor: None,
            position: Some(position),
            duration_ms: Some(300),
            easing: None,
            config: None,
            host_surface: None,
            transition_element: None,
        });
    scenario.steps.extend(ticks(schedule));
    scenario.steps.push(Step::Settle { frame_ms: 16 });
    scenario.steps.push(Step::Frames);
    scenario.steps.push(Step::Dismiss {
        content: "card".into(),
        animated: true,
        label: Some("done".into()),
    });
    scenario.steps.extend(ticks(schedule));
    scenario.steps.push(Step::Settle { frame_ms: 16 });
    scenario
}

proptest! {
    #[test]
    fn schedule_does_not_change_outcome(
        position in position(),
        schedule in prop::collection::vec(1u64..120, 0..12),
    ) {
        let trace = run_scenario(&round_trip(position, &schedule)).expect("runs");
        let reference = run_scenario(&round_trip(position, &[])).expect("runs");

        prop_assert_eq!(
            trace.event_names(None),
            vec!["will_present", "did_present", "will_dismiss", "did_dismiss"]
        );
        prop_assert_eq!(trace.completions(), vec!["done"]);

        let resting = |t: &ftui_harness::Trace| match t.last_frame(1) {
            Some(TraceRecord::Frame { frame, scale, alpha, .. }) => Some((*frame, *scale, *alpha)),
            _ => None,
        };
        prop_assert_eq!(resting(&trace), resting(&reference));
        let (frame, scale, alpha) = resting(&trace).expect("frame recorded");
        prop_assert!(frame.width > 0.0 && frame.height > 0.0);
        prop_assert!(frame.x >= 0.0 && frame.y >= 0.0);
        prop_assert!(frame.right() <= 400.0 && frame.bottom() <= 800.0);
        prop_assert_eq!((scale, alpha), (1.0, 1.0));
        prop_assert_ne!(frame, Rect::default());

        match trace.summary() {
            Some(TraceRecord::Summary { sessions, retiring, windows, live_images, .. }) => {
                prop_assert_eq!((*sessions, *retiring, *windows, *live_images), (0, 0, 1, 0));
            }
            other => prop_assert!(false, "missing summary: {:?}", other),
        }
    }
}
