//! End-to-end overlay scenarios run through the JSON harness.
//!
//! Each test scripts one behavior of the engine on the headless host and
//! asserts on the resulting trace: lifecycle event order, step results,
//! recorded frames, and what is left on the host afterwards.

use ftui_core::geometry::Rect;
use ftui_harness::{Scenario, ScenarioRunner, Step, StepResult, Trace, TraceRecord, run_scenario};
use ftui_overlay::host::SurfaceTree;

fn scenario(json: &str) -> Scenario {
    Scenario::from_json_str(json).expect("scenario parses")
}

fn run(json: &str) -> Trace {
    run_scenario(&scenario(json)).expect("scenario runs")
}

/// Frame, scale, alpha, and state of every frame record for `session`.
fn frames(trace: &Trace, session: u64) -> Vec<(Rect, f64, f64, &'static str)> {
    trace
        .records
        .iter()
        .filter_map(|record| match record {
            TraceRecord::Frame {
                session: s,
                frame,
                scale,
                alpha,
                state,
                ..
            } if *s == session => Some((*frame, *scale, *alpha, *state)),
            _ => None,
        })
        .collect()
}

fn summary(trace: &Trace) -> (usize, usize, usize, usize) {
    match trace.summary() {
        Some(TraceRecord::Summary {
            sessions,
            retiring,
            windows,
            live_images,
            ..
        }) => (*sessions, *retiring, *windows, *live_images),
        other => panic!("missing summary: {other:?}"),
    }
}

fn event_times(trace: &Trace, name: &str) -> Vec<u64> {
    trace
        .records
        .iter()
        .filter_map(|record| match record {
            TraceRecord::Event {
                event, elapsed_ms, ..
            } if *event == name => Some(*elapsed_ms),
            _ => None,
        })
        .collect()
}

#[test]
fn center_card_starts_scaled_down_and_settles() {
    let trace = run(
        r#"{
            "name": "center_card",
            "viewport": { "width": 400, "height": 800 },
            "views": [
                { "name": "card", "detached": true,
                  "frame": { "x": 0, "y": 0, "width": 300, "height": 300 } }
            ],
            "steps": [
                { "op": "present", "content": "card" },
                { "op": "frames" },
                { "op": "settle" },
                { "op": "frames" }
            ]
        }"#,
    );

    let resting = Rect::new(50.0, 250.0, 300.0, 300.0);
    let recorded = frames(&trace, 1);
    assert_eq!(recorded.len(), 2);
    assert_eq!(recorded[0], (resting, 0.8, 0.0, "presenting"));
    assert_eq!(recorded[1], (resting, 1.0, 1.0, "presented"));
    assert_eq!(trace.event_names(Some(1)), ["will_present", "did_present"]);
    // 450 ms rounded up to whole 16 ms frames.
    assert_eq!(event_times(&trace, "did_present"), [464]);
}

#[test]
fn presenting_twice_yields_one_lifecycle() {
    let trace = run(
        r#"{
            "viewport": { "width": 400, "height": 800 },
            "views": [
                { "name": "card", "detached": true,
                  "frame": { "x": 0, "y": 0, "width": 300, "height": 300 } }
            ],
            "steps": [
                { "op": "present", "content": "card" },
                { "op": "tick", "ms": 100 },
                { "op": "present", "content": "card" },
                { "op": "settle" }
            ]
        }"#,
    );

    let results = trace.step_results();
    assert_eq!(results[0], &StepResult::Session { session: 1 });
    assert_eq!(results[2], &StepResult::Session { session: 1 });
    assert_eq!(trace.event_names(None), ["will_present", "did_present"]);
}

#[test]
fn dismiss_during_present_is_rejected_without_shifting_timing() {
    let trace = run(
        r#"{
            "viewport": { "width": 400, "height": 800 },
            "views": [
                { "name": "card", "detached": true,
                  "frame": { "x": 0, "y": 0, "width": 300, "height": 300 } }
            ],
            "steps": [
                { "op": "present", "content": "card" },
                { "op": "tick", "ms": 100 },
                { "op": "dismiss", "content": "card" },
                { "op": "tick", "ms": 349 },
                { "op": "frames" },
                { "op": "tick", "ms": 1 },
                { "op": "frames" }
            ]
        }"#,
    );

    assert!(matches!(
        trace.step_results()[2],
        StepResult::Rejected { error } if error.contains("Presenting")
    ));
    let states: Vec<&str> = frames(&trace, 1).iter().map(|f| f.3).collect();
    assert_eq!(states, ["presenting", "presented"]);
    assert_eq!(event_times(&trace, "did_present"), [450]);
    assert!(event_times(&trace, "will_dismiss").is_empty());
}

const DRAG_SCENARIO: &str = r#"{
    "viewport": { "width": 400, "height": 800 },
    "views": [
        { "name": "sheet", "detached": true,
          "frame": { "x": 0, "y": 0, "width": 300, "height": 300 } }
    ],
    "configs": {
        "sheet": { "drag_to_dismiss": true, "position": "bottom" }
    },
    "steps": [
        { "op": "present", "content": "sheet" },
        { "op": "settle" },
        { "op": "drag", "phase": "began", "x": 200, "y": 600 }
    ]
}"#;

#[test]
fn short_drag_returns_to_the_exact_origin() {
    let mut scenario = scenario(DRAG_SCENARIO);
    scenario.steps.extend(
        scenario_steps(
            r#"[
                { "op": "drag", "phase": "changed", "x": 200, "y": 640 },
                { "op": "frames" },
                { "op": "drag", "phase": "ended", "x": 200, "y": 640 },
                { "op": "settle" },
                { "op": "frames" }
            ]"#,
        ),
    );
    let trace = run_scenario(&scenario).expect("runs");

    let recorded = frames(&trace, 1);
    assert_eq!(recorded[0].0, Rect::new(50.0, 540.0, 300.0, 300.0));
    assert_eq!(recorded[1].0, Rect::new(50.0, 500.0, 300.0, 300.0));
    assert_eq!(recorded[1].3, "presented");

    let translations: Vec<f64> = trace
        .records
        .iter()
        .filter_map(|r| match r {
            TraceRecord::Event {
                translation: Some(t),
                ..
            } => Some(*t),
            _ => None,
        })
        .collect();
    assert_eq!(translations, [0.0, 40.0, 40.0]);
    assert!(event_times(&trace, "will_dismiss").is_empty());
}

#[test]
fn long_drag_dismisses() {
    let mut scenario = scenario(DRAG_SCENARIO);
    scenario.steps.extend(
        scenario_steps(
            r#"[
                { "op": "drag", "phase": "changed", "x": 200, "y": 700 },
                { "op": "drag", "phase": "ended", "x": 200, "y": 700 },
                { "op": "settle" }
            ]"#,
        ),
    );
    let trace = run_scenario(&scenario).expect("runs");

    assert_eq!(
        trace.event_names(Some(1)),
        [
            "will_present",
            "did_present",
            "drag_phase_changed",
            "drag_phase_changed",
            "drag_phase_changed",
            "will_dismiss",
            "did_dismiss"
        ]
    );
    let (sessions, retiring, windows, images) = summary(&trace);
    assert_eq!((sessions, retiring, windows, images), (0, 0, 1, 0));
}

#[test]
fn dismiss_all_fires_one_completion_after_the_last_session() {
    let trace = run(
        r#"{
            "viewport": { "width": 400, "height": 800 },
            "views": [
                { "name": "a", "detached": true, "frame": { "x": 0, "y": 0, "width": 100, "height": 100 } },
                { "name": "b", "detached": true, "frame": { "x": 0, "y": 0, "width": 200, "height": 200 } },
                { "name": "c", "detached": true, "frame": { "x": 0, "y": 0, "width": 300, "height": 300 } }
            ],
            "steps": [
                { "op": "present", "content": "a" },
                { "op": "present", "content": "b" },
                { "op": "present", "content": "c" },
                { "op": "settle" },
                { "op": "dismiss_all", "label": "all_gone" },
                { "op": "frames" },
                { "op": "settle" }
            ]
        }"#,
    );

    let results = trace.step_results();
    assert_eq!(results[4], &StepResult::Count { count: 3 });
    // Membership is empty as soon as the call returns.
    assert_eq!(results[5], &StepResult::Count { count: 0 });
    assert_eq!(trace.completions(), ["all_gone"]);

    let completion = trace
        .records
        .iter()
        .position(|r| matches!(r, TraceRecord::Completion { .. }))
        .expect("completion recorded");
    let dismissals: Vec<(usize, u64)> = trace
        .records
        .iter()
        .enumerate()
        .filter_map(|(i, r)| match r {
            TraceRecord::Event {
                event: "did_dismiss",
                session,
                ..
            } => Some((i, *session)),
            _ => None,
        })
        .collect();
    assert_eq!(dismissals.len(), 3);
    let last = dismissals.iter().max_by_key(|(i, _)| *i).expect("last");
    assert_eq!(last.1, 3);
    assert!(last.0 < completion);

    let (sessions, retiring, windows, images) = summary(&trace);
    assert_eq!((sessions, retiring, windows, images), (0, 0, 1, 0));
}

#[test]
fn dismiss_all_on_empty_stack_completes_immediately() {
    let trace = run(
        r#"{
            "viewport": { "width": 400, "height": 800 },
            "steps": [ { "op": "dismiss_all", "label": "nothing" } ]
        }"#,
    );
    assert_eq!(trace.step_results()[0], &StepResult::Count { count: 0 });
    assert_eq!(trace.completions(), ["nothing"]);
}

#[test]
fn keyboard_shifts_and_restores_the_frame() {
    let trace = run(
        r#"{
            "viewport": { "width": 400, "height": 800 },
            "views": [
                { "name": "form", "detached": true,
                  "frame": { "x": 0, "y": 0, "width": 300, "height": 300 } }
            ],
            "configs": { "form": { "avoid_keyboard": true } },
            "steps": [
                { "op": "present", "content": "form" },
                { "op": "settle" },
                { "op": "keyboard", "event": { "kind": "will_show",
                    "end_frame": { "x": 0, "y": 500, "width": 400, "height": 300 } } },
                { "op": "settle", "frame_ms": 50 },
                { "op": "frames" },
                { "op": "keyboard", "event": { "kind": "will_hide" } },
                { "op": "settle", "frame_ms": 50 },
                { "op": "frames" }
            ]
        }"#,
    );

    let results = trace.step_results();
    // 0.5 s relayout at 50 ms per frame.
    assert_eq!(results[3], &StepResult::Count { count: 10 });
    assert_eq!(results[6], &StepResult::Count { count: 10 });

    let recorded = frames(&trace, 1);
    assert_eq!(recorded[0].0, Rect::new(50.0, 100.0, 300.0, 300.0));
    assert_eq!(recorded[1].0, Rect::new(50.0, 250.0, 300.0, 300.0));
}

#[test]
fn keyboard_without_geometry_is_rejected() {
    let trace = run(
        r#"{
            "viewport": { "width": 400, "height": 800 },
            "views": [
                { "name": "form", "detached": true,
                  "frame": { "x": 0, "y": 0, "width": 300, "height": 300 } }
            ],
            "configs": { "form": { "avoid_keyboard": true } },
            "steps": [
                { "op": "present", "content": "form" },
                { "op": "settle" },
                { "op": "keyboard", "event": { "kind": "will_show", "end_frame": null } },
                { "op": "frames" }
            ]
        }"#,
    );
    assert!(matches!(trace.step_results()[2], StepResult::Rejected { .. }));
    assert_eq!(frames(&trace, 1)[0].0, Rect::new(50.0, 250.0, 300.0, 300.0));
}

#[test]
fn backdrop_tap_outside_dismisses() {
    let trace = run(
        r#"{
            "viewport": { "width": 400, "height": 800 },
            "views": [
                { "name": "card", "detached": true,
                  "frame": { "x": 0, "y": 0, "width": 300, "height": 300 } }
            ],
            "configs": { "card": { "tap_outside_to_dismiss": true } },
            "steps": [
                { "op": "present", "content": "card" },
                { "op": "settle" },
                { "op": "tap", "x": 200, "y": 400 },
                { "op": "tap", "x": 10, "y": 10 },
                { "op": "settle" }
            ]
        }"#,
    );
    let results = trace.step_results();
    assert_eq!(results[2], &StepResult::Handled { handled: false });
    assert_eq!(results[3], &StepResult::Handled { handled: true });
    assert_eq!(event_times(&trace, "did_dismiss").len(), 1);
}

#[test]
fn update_position_moves_to_new_resting_frame() {
    let trace = run(
        r#"{
            "viewport": { "width": 400, "height": 800 },
            "views": [
                { "name": "card", "detached": true,
                  "frame": { "x": 0, "y": 0, "width": 300, "height": 300 } }
            ],
            "steps": [
                { "op": "present", "content": "card" },
                { "op": "settle" },
                { "op": "update_position", "content": "card", "position": "top", "duration_ms": 200 },
                { "op": "settle", "frame_ms": 20 },
                { "op": "frames" }
            ]
        }"#,
    );
    assert_eq!(trace.step_results()[3], &StepResult::Count { count: 10 });
    assert_eq!(frames(&trace, 1)[0].0, Rect::new(50.0, 0.0, 300.0, 300.0));
}

#[test]
fn layout_requested_while_presenting_applies_after_presentation() {
    let trace = run(
        r#"{
            "viewport": { "width": 400, "height": 800 },
            "views": [
                { "name": "card", "detached": true,
                  "frame": { "x": 0, "y": 0, "width": 300, "height": 300 } }
            ],
            "steps": [
                { "op": "present", "content": "card" },
                { "op": "tick", "ms": 100 },
                { "op": "update_position", "content": "card", "position": "bottom" },
                { "op": "frames" },
                { "op": "settle" },
                { "op": "frames" }
            ]
        }"#,
    );
    assert_eq!(trace.step_results()[2], &StepResult::Ok);
    let recorded = frames(&trace, 1);
    assert_eq!(recorded[0].3, "presenting");
    assert_eq!(recorded[1].0, Rect::new(50.0, 500.0, 300.0, 300.0));
}

#[test]
fn viewport_resize_relayouts_instantly() {
    let trace = run(
        r#"{
            "viewport": { "width": 400, "height": 800 },
            "views": [
                { "name": "card", "detached": true,
                  "frame": { "x": 0, "y": 0, "width": 300, "height": 300 } }
            ],
            "steps": [
                { "op": "present", "content": "card" },
                { "op": "settle" },
                { "op": "resize", "width": 800, "height": 400 },
                { "op": "frames" }
            ]
        }"#,
    );
    assert_eq!(frames(&trace, 1)[0].0, Rect::new(250.0, 50.0, 300.0, 300.0));
}

#[test]
fn dismiss_top_while_presenting_keeps_the_session() {
    let trace = run(
        r#"{
            "viewport": { "width": 400, "height": 800 },
            "views": [
                { "name": "card", "detached": true,
                  "frame": { "x": 0, "y": 0, "width": 300, "height": 300 } }
            ],
            "steps": [
                { "op": "present", "content": "card" },
                { "op": "dismiss_top" },
                { "op": "frames" },
                { "op": "settle" },
                { "op": "dismiss_top", "label": "closed" },
                { "op": "settle" }
            ]
        }"#,
    );
    let results = trace.step_results();
    assert!(matches!(results[1], StepResult::Rejected { .. }));
    assert_eq!(results[2], &StepResult::Count { count: 1 });
    assert_eq!(results[4], &StepResult::Session { session: 1 });
    assert_eq!(trace.completions(), ["closed"]);
    assert_eq!(summary(&trace).0, 0);
}

#[test]
fn flight_hides_anchor_then_restores_it() {
    let json = r#"{
        "viewport": { "width": 400, "height": 800 },
        "views": [
            { "name": "thumb", "frame": { "x": 20, "y": 40, "width": 60, "height": 60 }, "alpha": 0.7 },
            { "name": "card", "detached": true,
              "frame": { "x": 0, "y": 0, "width": 300, "height": 300 } }
        ],
        "steps": []
    }"#;
    let scenario = scenario(json);
    let mut runner = ScenarioRunner::new(&scenario).expect("runner");
    let thumb = runner.view("thumb").expect("thumb");

    runner
        .execute(&Step::Present {
            content: "card".into(),
            animation: Default::default(),
            dismiss_animation: Default::default(),
            anchor: Some("thumb".into()),
            position: None,
            duration_ms: None,
            easing: None,
            config: None,
            host_surface: None,
            transition_element: None,
        })
        .expect("present");
    assert_eq!(runner.host().alpha(thumb), Some(0.0));
    assert!(runner.host().live_images() >= 2);

    runner.execute(&Step::Frames).expect("frames");
    runner.execute(&Step::Settle { frame_ms: 16 }).expect("settle");
    assert_eq!(runner.host().alpha(thumb), Some(0.7));
    assert_eq!(runner.host().live_images(), 0);

    runner
        .execute(&Step::Dismiss {
            content: "card".into(),
            animated: true,
            label: Some("closed".into()),
        })
        .expect("dismiss");
    assert_eq!(runner.host().alpha(thumb), Some(0.0));
    runner.execute(&Step::Settle { frame_ms: 16 }).expect("settle");
    assert_eq!(runner.host().alpha(thumb), Some(0.7));

    let trace = runner.finish();
    assert_eq!(
        frames(&trace, 1)[0].0,
        Rect::new(20.0, 40.0, 60.0, 60.0),
        "flight starts on the anchor"
    );
    assert_eq!(trace.completions(), ["closed"]);
    let (sessions, retiring, windows, images) = summary(&trace);
    assert_eq!((sessions, retiring, windows, images), (0, 0, 1, 0));
}

#[test]
fn failed_snapshots_still_present() {
    let trace = run(
        r#"{
            "viewport": { "width": 400, "height": 800 },
            "views": [
                { "name": "thumb", "frame": { "x": 20, "y": 40, "width": 60, "height": 60 } },
                { "name": "card", "detached": true,
                  "frame": { "x": 0, "y": 0, "width": 300, "height": 300 } }
            ],
            "steps": [
                { "op": "fail_snapshots", "fail": true },
                { "op": "present", "content": "card", "anchor": "thumb" },
                { "op": "settle" },
                { "op": "frames" }
            ]
        }"#,
    );
    assert_eq!(trace.event_names(Some(1)), ["will_present", "did_present"]);
    assert_eq!(frames(&trace, 1)[0].0, Rect::new(50.0, 250.0, 300.0, 300.0));
}

#[test]
fn same_scenario_same_digest() {
    let first = run(DRAG_SCENARIO);
    let second = run(DRAG_SCENARIO);
    assert_eq!(first.to_jsonl(), second.to_jsonl());
    assert_eq!(first.digest(), second.digest());
}

fn scenario_steps(json: &str) -> Vec<Step> {
    serde_json::from_str(json).expect("steps parse")
}
