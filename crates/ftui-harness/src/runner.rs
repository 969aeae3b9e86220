#![forbid(unsafe_code)]

//! Drive an [`OverlayStack`] on a [`HeadlessHost`] from a [`Scenario`].

use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;
use std::rc::Rc;
use std::time::Duration;

use ftui_core::geometry::{Point, Size};
use ftui_overlay::host::SurfaceTree;
use ftui_overlay::planner::{DismissAnimation, PresentAnimation};
use ftui_overlay::testing::HeadlessHost;
use ftui_overlay::{
    Completion, NodeId, OverlayError, OverlayStack, Outcome, PresentOptions, Session, SessionId,
};
use tracing::{debug, info_span, warn};

use crate::ScenarioError;
use crate::scenario::{Scenario, Step, ViewSpec};
use crate::trace::{StepResult, Trace, TraceRecord, state_name};

/// Frames `settle` will tick before giving up.
pub const SETTLE_FRAME_LIMIT: usize = 10_000;

#[derive(Debug, Clone, Copy, Default)]
struct Cursor {
    step: usize,
    elapsed_ms: u64,
}

type Records = Rc<RefCell<Vec<TraceRecord>>>;

/// Run-local session numbers, assigned in order of first appearance.
#[derive(Debug, Clone, Default)]
struct Ordinals(Rc<RefCell<Vec<SessionId>>>);

impl Ordinals {
    fn of(&self, id: SessionId) -> u64 {
        let mut seen = self.0.borrow_mut();
        let index = match seen.iter().position(|&s| s == id) {
            Some(index) => index,
            None => {
                seen.push(id);
                seen.len() - 1
            }
        };
        index as u64 + 1
    }
}

/// Executes scenario steps against a headless host.
pub struct ScenarioRunner {
    name: String,
    host: HeadlessHost,
    stack: OverlayStack,
    views: BTreeMap<String, NodeId>,
    cursor: Rc<Cell<Cursor>>,
    records: Records,
    ordinals: Ordinals,
    elapsed: Duration,
    steps_run: usize,
}

impl std::fmt::Debug for ScenarioRunner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScenarioRunner")
            .field("name", &self.name)
            .field("views", &self.views)
            .field("elapsed", &self.elapsed)
            .field("steps_run", &self.steps_run)
            .finish_non_exhaustive()
    }
}

impl ScenarioRunner {
    /// Build the host, the view tree, and the config registry.
    pub fn new(scenario: &Scenario) -> Result<Self, ScenarioError> {
        let mut runner = Self {
            name: scenario.name.clone(),
            host: HeadlessHost::new(scenario.viewport),
            stack: OverlayStack::new(),
            views: BTreeMap::new(),
            cursor: Rc::new(Cell::new(Cursor::default())),
            records: Rc::new(RefCell::new(Vec::new())),
            ordinals: Ordinals::default(),
            elapsed: Duration::ZERO,
            steps_run: 0,
        };

        for spec in &scenario.views {
            runner.add_view(spec)?;
        }
        for (content, config) in &scenario.configs {
            let node = runner.view(content)?;
            runner.stack.registry_mut().register(node, config.clone());
        }

        let cursor = Rc::clone(&runner.cursor);
        let records = Rc::clone(&runner.records);
        let ordinals = runner.ordinals.clone();
        runner.stack.subscribe(move |event| {
            let at = cursor.get();
            let session = ordinals.of(event.session());
            records
                .borrow_mut()
                .push(TraceRecord::event(at.step, at.elapsed_ms, session, event));
        });
        Ok(runner)
    }

    fn add_view(&mut self, spec: &ViewSpec) -> Result<(), ScenarioError> {
        if self.views.contains_key(&spec.name) {
            return Err(ScenarioError::DuplicateView(spec.name.clone()));
        }
        let node = if spec.detached {
            let node = self.host.create_node();
            self.host.set_frame(node, spec.frame);
            node
        } else {
            let parent = match &spec.parent {
                Some(parent) => self.view(parent)?,
                None => self.host.key_root(),
            };
            self.host.add_view(parent, spec.frame)
        };
        let preferred = spec.preferred_size.unwrap_or_else(|| spec.frame.size());
        self.host.set_preferred_size(node, preferred);
        if let Some(alpha) = spec.alpha {
            self.host.set_alpha(node, alpha);
        }
        if let Some(radius) = spec.corner_radius {
            self.host.set_corner_radius(node, radius);
        }
        self.views.insert(spec.name.clone(), node);
        Ok(())
    }

    /// Host node for a named view.
    pub fn view(&self, name: &str) -> Result<NodeId, ScenarioError> {
        self.views
            .get(name)
            .copied()
            .ok_or_else(|| ScenarioError::UnknownView(name.to_owned()))
    }

    pub fn host(&self) -> &HeadlessHost {
        &self.host
    }

    pub fn stack(&self) -> &OverlayStack {
        &self.stack
    }

    pub fn elapsed(&self) -> Duration {
        self.elapsed
    }

    /// Session currently presenting the named view.
    pub fn session_for(&self, content: &str) -> Option<SessionId> {
        let node = self.views.get(content)?;
        self.stack.find_by_content(*node)
    }

    /// The number trace records use for `id`.
    pub fn ordinal(&self, id: SessionId) -> u64 {
        self.ordinals.of(id)
    }

    /// Run every step of `scenario` and append a summary.
    pub fn run(mut self, scenario: &Scenario) -> Result<Trace, ScenarioError> {
        let _span = info_span!("harness.scenario", name = %self.name, steps = scenario.steps.len())
            .entered();
        for step in &scenario.steps {
            self.execute(step)?;
        }
        Ok(self.finish())
    }

    /// Execute one step and record its result.
    pub fn execute(&mut self, step: &Step) -> Result<StepResult, ScenarioError> {
        let index = self.steps_run;
        self.steps_run += 1;
        self.sync_cursor(index);
        debug!(step = index, op = step.op(), "scenario step");

        let result = self.apply(step)?;
        if let StepResult::Rejected { error } = &result {
            warn!(step = index, op = step.op(), %error, "step rejected");
        }
        // Step records land after the events the step produced.
        self.records.borrow_mut().push(TraceRecord::Step {
            step: index,
            elapsed_ms: self.elapsed_ms(),
            op: step.op(),
            result: result.clone(),
        });
        Ok(result)
    }

    fn apply(&mut self, step: &Step) -> Result<StepResult, ScenarioError> {
        let result = match step {
            Step::Present {
                content,
                animation,
                dismiss_animation,
                anchor,
                position,
                duration_ms,
                easing,
                config,
                host_surface,
                transition_element,
            } => {
                let node = self.view(content)?;
                let mut options = PresentOptions::default()
                    .animation(*animation)
                    .dismiss_animation(*dismiss_animation);
                if let Some(anchor) = anchor {
                    let anchor = self.view(anchor)?;
                    options = options.animation(PresentAnimation::FromView(anchor));
                    if options.dismiss_animation == DismissAnimation::Auto {
                        options = options.dismiss_animation(DismissAnimation::ToView(anchor));
                    }
                }
                if let Some(position) = position {
                    options = options.position(*position);
                }
                if let Some(ms) = duration_ms {
                    options = options.duration(Duration::from_millis(*ms));
                }
                if let Some(easing) = easing {
                    options = options.easing(*easing);
                }

                let mut config = config.clone();
                if host_surface.is_some() || transition_element.is_some() {
                    let mut base = config
                        .or_else(|| self.stack.registry().get(node).cloned())
                        .unwrap_or_default();
                    if let Some(surface) = host_surface {
                        base.host_surface = Some(self.view(surface)?);
                    }
                    if let Some(element) = transition_element {
                        base.transition_element = Some(self.view(element)?);
                    }
                    config = Some(base);
                }

                match self.stack.present(&mut self.host, node, options, config) {
                    Ok(id) => StepResult::Session {
                        session: self.ordinals.of(id),
                    },
                    Err(err) => rejected(&err),
                }
            }
            Step::Tick { ms, count } => {
                let dt = Duration::from_millis(*ms);
                for _ in 0..*count {
                    self.tick(dt);
                }
                StepResult::Ok
            }
            Step::Settle { frame_ms } => {
                let dt = Duration::from_millis((*frame_ms).max(1));
                let mut frames = 0;
                while self.busy() {
                    if frames == SETTLE_FRAME_LIMIT {
                        return Ok(StepResult::Unsettled { frames });
                    }
                    self.tick(dt);
                    frames += 1;
                }
                StepResult::Count { count: frames }
            }
            Step::Drag { phase, x, y } => {
                let handled = self
                    .stack
                    .handle_drag(&mut self.host, *phase, Point::new(*x, *y));
                StepResult::Handled { handled }
            }
            Step::Keyboard { event } => match self.stack.handle_keyboard(&mut self.host, event) {
                Ok(()) => StepResult::Ok,
                Err(err) => rejected(&err),
            },
            Step::Tap { x, y } => {
                let handled = self
                    .stack
                    .handle_backdrop_tap(&mut self.host, Point::new(*x, *y));
                StepResult::Handled { handled }
            }
            Step::Dismiss {
                content,
                animated,
                label,
            } => {
                let node = self.view(content)?;
                let Some(id) = self.stack.find_by_content(node) else {
                    return Ok(rejected(&OverlayError::MissingContent));
                };
                let completion = self.completion(label.as_deref());
                match self.stack.dismiss(&mut self.host, id, *animated, completion) {
                    Ok(Outcome::Started) => StepResult::Ok,
                    Ok(Outcome::Ignored) => StepResult::Ignored,
                    Err(err) => rejected(&err),
                }
            }
            Step::DismissTop { animated, label } => {
                let completion = self.completion(label.as_deref());
                match self.stack.dismiss_top(&mut self.host, *animated, completion) {
                    Ok(Some(id)) => StepResult::Session {
                        session: self.ordinals.of(id),
                    },
                    Ok(None) => StepResult::Ignored,
                    Err(err) => rejected(&err),
                }
            }
            Step::DismissAll { animated, label } => {
                let completion = self.completion(label.as_deref());
                let count = self.stack.dismiss_all(&mut self.host, *animated, completion);
                StepResult::Count { count }
            }
            Step::UpdatePosition {
                content,
                position,
                duration_ms,
            } => {
                let id = self.member(content)?;
                let duration = duration_ms.map(Duration::from_millis);
                match id {
                    Some(id) => ok_or_rejected(self.stack.update_position(
                        &mut self.host,
                        id,
                        *position,
                        duration,
                    )),
                    None => rejected(&OverlayError::MissingContent),
                }
            }
            Step::UpdateLayout {
                content,
                duration_ms,
            } => {
                let id = self.member(content)?;
                let duration = duration_ms.map(Duration::from_millis);
                match id {
                    Some(id) => {
                        ok_or_rejected(self.stack.update_layout(&mut self.host, id, duration))
                    }
                    None => rejected(&OverlayError::MissingContent),
                }
            }
            Step::SetPreferredSize { view, size } => {
                let node = self.view(view)?;
                self.host.set_preferred_size(node, *size);
                StepResult::Ok
            }
            Step::Resize { width, height } => {
                self.host.resize(Size::new(*width, *height));
                self.stack.handle_viewport_resized(&mut self.host);
                StepResult::Ok
            }
            Step::Kill { view } => {
                let node = self.view(view)?;
                self.host.kill(node);
                StepResult::Ok
            }
            Step::FailSnapshots { fail } => {
                self.host.fail_snapshots(*fail);
                StepResult::Ok
            }
            Step::Frames => {
                self.record_frames();
                StepResult::Count {
                    count: self.stack.depth(),
                }
            }
        };
        Ok(result)
    }

    fn member(&self, content: &str) -> Result<Option<SessionId>, ScenarioError> {
        let node = self.view(content)?;
        Ok(self.stack.find_by_content(node))
    }

    fn tick(&mut self, dt: Duration) {
        self.elapsed += dt;
        self.sync_cursor(self.cursor.get().step);
        self.stack.tick(&mut self.host, dt);
    }

    fn busy(&self) -> bool {
        self.stack.is_animating()
            || self.stack.ids().into_iter().any(|id| {
                self.stack
                    .session(id)
                    .is_some_and(Session::has_deferred_layout)
            })
    }

    fn completion(&self, label: Option<&str>) -> Option<Completion> {
        let label = label?.to_owned();
        let cursor = Rc::clone(&self.cursor);
        let records = Rc::clone(&self.records);
        Some(Box::new(move || {
            let at = cursor.get();
            records.borrow_mut().push(TraceRecord::Completion {
                step: at.step,
                elapsed_ms: at.elapsed_ms,
                label,
            });
        }))
    }

    fn record_frames(&mut self) {
        let step = self.cursor.get().step;
        let elapsed_ms = self.elapsed_ms();
        let mut records = self.records.borrow_mut();
        for id in self.stack.ids() {
            let Some(session) = self.stack.session(id) else {
                continue;
            };
            let visual = session.visual();
            records.push(TraceRecord::Frame {
                step,
                elapsed_ms,
                session: self.ordinals.of(id),
                state: state_name(session.state()),
                frame: visual.frame,
                scale: visual.scale,
                alpha: visual.alpha,
                keyboard_inset: session.keyboard_inset(),
            });
        }
    }

    fn elapsed_ms(&self) -> u64 {
        u64::try_from(self.elapsed.as_millis()).unwrap_or(u64::MAX)
    }

    fn sync_cursor(&self, step: usize) {
        self.cursor.set(Cursor {
            step,
            elapsed_ms: self.elapsed_ms(),
        });
    }

    /// Append the summary and hand back the trace.
    pub fn finish(self) -> Trace {
        let summary = TraceRecord::Summary {
            steps: self.steps_run,
            elapsed_ms: self.elapsed_ms(),
            sessions: self.stack.depth(),
            retiring: self.stack.retiring_count(),
            windows: self.host.window_count(),
            live_images: self.host.live_images(),
            nodes: self.host.node_count(),
        };
        let mut records = self.records.take();
        records.push(summary);
        Trace {
            scenario: self.name,
            records,
        }
    }
}

fn rejected(err: &OverlayError) -> StepResult {
    StepResult::Rejected {
        error: err.to_string(),
    }
}

fn ok_or_rejected(result: ftui_overlay::Result<()>) -> StepResult {
    match result {
        Ok(()) => StepResult::Ok,
        Err(err) => rejected(&err),
    }
}

/// Build a runner for `scenario` and run it to completion.
pub fn run_scenario(scenario: &Scenario) -> Result<Trace, ScenarioError> {
    ScenarioRunner::new(scenario)?.run(scenario)
}
