#![forbid(unsafe_code)]

//! One overlay's lifecycle.
//!
//! A [`Session`] owns the container it creates, borrows the caller's content,
//! and walks a strict state machine:
//!
//! ```text
//! Idle ──present──▶ Presenting ──settle──▶ Presented ──dismiss──▶ Dismissing ──settle──▶ Disposed
//! ```
//!
//! # Invariants
//!
//! 1. A second `present` while Presenting is a no-op ([`Outcome::Ignored`]).
//! 2. `dismiss` while Presenting is rejected, never queued.
//! 3. `dismiss` while Dismissing attaches its completion to the running
//!    dismissal.
//! 4. Layout requests that arrive while a transition is in flight are
//!    deferred through a re-check poll until the blocker settles, one slot,
//!    latest request wins. Only dismissal drops a deferred request.
//! 5. Dismissal restores the content to its saved origin (parent, frame,
//!    alpha) before the session becomes Disposed.
//! 6. Once Disposed the session holds no content and cannot be reused.
//!
//! # Timing
//!
//! Sessions never sleep or spawn. The host drives every transition with
//! [`Session::tick`]; continuations (ghost teardown, state changes, events,
//! completion callbacks) run inside the tick that finishes a transition, or
//! synchronously when the transition has zero duration.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use ftui_core::animation::{Easing, Lerp, Tween};
use ftui_core::color::PackedRgba;
use ftui_core::event::{DragPhase, KeyboardEvent};
use ftui_core::geometry::{Point, Rect, Size};
use tracing::{debug, debug_span, trace, warn};

use crate::capture::{FlightLeg, GhostPair};
use crate::config::OverlayConfig;
use crate::error::{Operation, OverlayError, Result};
use crate::events::{EventBus, EventEmitter, OverlayEvent, SubscriberKind, SubscriptionId};
use crate::host::{NodeId, OverlayHost, WindowId};
use crate::planner::{
    DismissAnimation, Entrance, Exit, PresentAnimation, Timing, resolve_dismiss_animation,
    resolve_present_animation, resolve_timing,
};
use crate::resolver::{Axis, Direction, Position, effective_content_size, offscreen_frame, resting_frame};

/// Translation past which a released drag dismisses the overlay.
pub const DRAG_DISMISS_THRESHOLD: f64 = 60.0;

/// Duration of the snap-back after a short drag.
pub const DRAG_RETURN_DURATION: Duration = Duration::from_millis(300);

/// Duration of the re-layout triggered by a keyboard change.
pub const KEYBOARD_RELAYOUT_DURATION: Duration = Duration::from_millis(500);

/// Interval between checks for a deferred layout request.
pub const LAYOUT_POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Callback run once a dismissal has fully completed.
pub type Completion = Box<dyn FnOnce()>;

static NEXT_SESSION_ID: AtomicU64 = AtomicU64::new(1);

/// Unique identifier for a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SessionId(u64);

impl SessionId {
    fn next() -> Self {
        Self(NEXT_SESSION_ID.fetch_add(1, Ordering::Relaxed))
    }

    #[cfg(test)]
    pub(crate) fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    /// Raw numeric value.
    pub fn get(self) -> u64 {
        self.0
    }
}

/// Lifecycle state of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SessionState {
    Idle,
    Presenting,
    Presented,
    Dismissing,
    Disposed,
}

/// Whether a request started work or was absorbed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Started,
    Ignored,
}

/// Per-call presentation overrides. Unset fields fall back to the session's
/// [`OverlayConfig`].
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct PresentOptions {
    pub animation: PresentAnimation,
    pub dismiss_animation: DismissAnimation,
    pub position: Option<Position>,
    pub duration: Option<Duration>,
    pub easing: Option<Easing>,
}

impl PresentOptions {
    #[must_use]
    pub fn animation(mut self, animation: PresentAnimation) -> Self {
        self.animation = animation;
        self
    }

    #[must_use]
    pub fn dismiss_animation(mut self, animation: DismissAnimation) -> Self {
        self.dismiss_animation = animation;
        self
    }

    #[must_use]
    pub fn position(mut self, position: Position) -> Self {
        self.position = Some(position);
        self
    }

    #[must_use]
    pub fn duration(mut self, duration: Duration) -> Self {
        self.duration = Some(duration);
        self
    }

    #[must_use]
    pub fn easing(mut self, easing: Easing) -> Self {
        self.easing = Some(easing);
        self
    }
}

/// Where the content lived before presentation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SavedOrigin {
    pub parent: NodeId,
    pub frame: Rect,
    pub alpha: f64,
    /// Frame in window coordinates, used as the flight start/end.
    pub screen_frame: Rect,
}

#[derive(Debug, Clone, Copy)]
struct OwnedWindow {
    window: WindowId,
    previous_key: Option<WindowId>,
}

/// Animatable state of the container.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Visual {
    pub frame: Rect,
    pub scale: f64,
    pub alpha: f64,
    pub background: PackedRgba,
}

impl Visual {
    fn settled(frame: Rect, background: PackedRgba) -> Self {
        Self {
            frame,
            scale: 1.0,
            alpha: 1.0,
            background,
        }
    }
}

impl Default for Visual {
    fn default() -> Self {
        Self::settled(Rect::default(), PackedRgba::TRANSPARENT)
    }
}

impl Lerp for Visual {
    fn lerp(&self, to: &Self, t: f64) -> Self {
        Self {
            frame: self.frame.lerp(&to.frame, t),
            scale: self.scale.lerp(&to.scale, t),
            alpha: self.alpha.lerp(&to.alpha, t),
            background: self.background.lerp(&to.background, t),
        }
    }
}

/// What an in-flight transition is for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionKind {
    Present,
    Dismiss,
    Relayout,
    DragReturn,
}

#[derive(Debug)]
struct ActiveTransition {
    kind: TransitionKind,
    tween: Tween,
    from: Visual,
    to: Visual,
    ghosts: Option<GhostPair>,
}

#[derive(Debug, Clone, Copy)]
struct DragTrack {
    touch: Point,
    origin: Point,
    translation: f64,
}

#[derive(Debug, Clone, Copy)]
struct DeferredLayout {
    position: Option<Position>,
    duration: Option<Duration>,
    attempts: u32,
    waited: Duration,
}

#[derive(Default)]
struct PendingDismiss {
    animated: bool,
    completions: Vec<Completion>,
}

/// A single overlay presentation.
pub struct Session {
    id: SessionId,
    state: SessionState,
    content: Option<NodeId>,
    container: Option<NodeId>,
    surface: Option<NodeId>,
    window: Option<OwnedWindow>,
    config: OverlayConfig,
    options: PresentOptions,
    position: Position,
    entrance: Option<Entrance>,
    exit: Option<Exit>,
    saved_origin: Option<SavedOrigin>,
    content_size: Size,
    keyboard_inset: f64,
    resting: Rect,
    visual: Visual,
    drag: Option<DragTrack>,
    transition: Option<ActiveTransition>,
    deferred: Option<DeferredLayout>,
    dismiss_after_present: Option<PendingDismiss>,
    completions: Vec<Completion>,
    callbacks: EventEmitter,
    bus: Option<EventBus>,
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("id", &self.id)
            .field("state", &self.state)
            .field("content", &self.content)
            .field("container", &self.container)
            .field("position", &self.position)
            .field("resting", &self.resting)
            .field("transition", &self.transition.as_ref().map(|t| t.kind))
            .finish_non_exhaustive()
    }
}

impl Session {
    /// A new, idle session for `content`.
    pub fn new(content: NodeId, config: OverlayConfig) -> Self {
        let position = config.resolved_position();
        Self {
            id: SessionId::next(),
            state: SessionState::Idle,
            content: Some(content),
            container: None,
            surface: None,
            window: None,
            config,
            options: PresentOptions::default(),
            position,
            entrance: None,
            exit: None,
            saved_origin: None,
            content_size: Size::ZERO,
            keyboard_inset: 0.0,
            resting: Rect::default(),
            visual: Visual::default(),
            drag: None,
            transition: None,
            deferred: None,
            dismiss_after_present: None,
            completions: Vec::new(),
            callbacks: EventEmitter::new(SubscriberKind::Callback),
            bus: None,
        }
    }

    /// Also deliver this session's events to a shared broadcast bus.
    #[must_use]
    pub fn with_event_bus(mut self, bus: EventBus) -> Self {
        self.bus = Some(bus);
        self
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// The caller's content, until the session is Disposed.
    pub fn content(&self) -> Option<NodeId> {
        self.content
    }

    /// The container node created by this session.
    pub fn container(&self) -> Option<NodeId> {
        self.container
    }

    /// Node the container was attached to (host surface or window root).
    pub fn surface(&self) -> Option<NodeId> {
        self.surface
    }

    /// Top-level window owned by this session, if it created one.
    pub fn window(&self) -> Option<WindowId> {
        self.window.map(|w| w.window)
    }

    pub fn config(&self) -> &OverlayConfig {
        &self.config
    }

    pub fn position(&self) -> Position {
        self.position
    }

    pub fn entrance(&self) -> Option<Entrance> {
        self.entrance
    }

    pub fn exit(&self) -> Option<Exit> {
        self.exit
    }

    pub fn saved_origin(&self) -> Option<SavedOrigin> {
        self.saved_origin
    }

    pub fn resting_frame(&self) -> Rect {
        self.resting
    }

    pub fn keyboard_inset(&self) -> f64 {
        self.keyboard_inset
    }

    /// Last visual state applied to the container.
    pub fn visual(&self) -> Visual {
        self.visual
    }

    pub fn transition_kind(&self) -> Option<TransitionKind> {
        self.transition.as_ref().map(|t| t.kind)
    }

    pub fn is_animating(&self) -> bool {
        self.transition.is_some()
    }

    pub fn has_deferred_layout(&self) -> bool {
        self.deferred.is_some()
    }

    /// Whether `node` is this session's container or surface.
    pub fn renders_into(&self, node: NodeId) -> bool {
        self.container == Some(node) || self.surface == Some(node)
    }

    /// Subscribe to this session's events.
    pub fn subscribe(&mut self, handler: impl FnMut(&OverlayEvent) + 'static) -> SubscriptionId {
        self.callbacks.subscribe(handler)
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.callbacks.unsubscribe(id)
    }

    // --- Presentation -------------------------------------------------------

    /// Begin presenting the content.
    pub fn present<H: OverlayHost + ?Sized>(
        &mut self,
        host: &mut H,
        options: PresentOptions,
    ) -> Result<Outcome> {
        match self.state {
            SessionState::Presenting => {
                debug!(session = self.id.0, "present ignored: already presenting");
                return Ok(Outcome::Ignored);
            }
            SessionState::Presented | SessionState::Dismissing => {
                debug!(session = self.id.0, state = ?self.state, "present rejected");
                return Err(OverlayError::invalid(Operation::Present, self.state));
            }
            SessionState::Disposed => return Err(OverlayError::MissingContent),
            SessionState::Idle => {}
        }
        let content = self.content.ok_or(OverlayError::MissingContent)?;
        let _span = debug_span!("overlay.present", session = self.id.0).entered();

        self.state = SessionState::Presenting;
        self.options = options;
        self.position = options
            .position
            .unwrap_or_else(|| self.config.resolved_position());
        self.emit(OverlayEvent::WillPresent { session: self.id });

        if let Some(parent) = host.parent(content) {
            self.saved_origin = Some(SavedOrigin {
                parent,
                frame: host.frame(content).unwrap_or_default(),
                alpha: host.alpha(content).unwrap_or(1.0),
                screen_frame: host.frame_in_window(content).unwrap_or_default(),
            });
        }

        let surface = match self.acquire_surface(host) {
            Some(surface) => surface,
            None => {
                warn!(session = self.id.0, "no surface available; present abandoned");
                self.saved_origin = None;
                self.state = SessionState::Idle;
                return Err(OverlayError::NoSurface);
            }
        };

        let container = host.create_node();
        host.add_child(surface, container);
        host.set_corner_radius(container, self.config.corner_radius);
        host.add_child(container, content);
        self.surface = Some(surface);
        self.container = Some(container);

        let viewport = self.viewport(host);
        self.content_size = effective_content_size(
            host.preferred_size(content).unwrap_or_default(),
            viewport,
        );
        self.resting = self.compute_resting(viewport);
        host.set_frame(content, Rect::from_size(self.resting.size()));

        let entrance = resolve_present_animation(
            options.animation,
            self.config.present_animation,
            self.position,
            viewport,
        );
        self.entrance = Some(entrance);
        let anchor = entrance.anchor().filter(|&a| host.is_alive(a));

        let start = if let Some(origin) = self.saved_origin {
            Visual::settled(self.to_surface(host, origin.screen_frame), PackedRgba::TRANSPARENT)
        } else if let Some(frame) = anchor.and_then(|a| host.frame_in_window(a)) {
            Visual::settled(self.to_surface(host, frame), PackedRgba::TRANSPARENT)
        } else {
            self.offscreen_visual(entrance.direction(), viewport)
        };
        let end = Visual::settled(self.resting, self.config.background);
        debug!(
            session = self.id.0,
            ?entrance,
            position = ?self.position,
            resting = ?self.resting,
            "overlay presenting"
        );

        self.apply_visual(host, start);
        let ghosts = anchor.and_then(|anchor| {
            let source = self.config.transition_element.unwrap_or(content);
            GhostPair::try_build(host, FlightLeg::Present, anchor, content, source, container)
        });
        let timing = self.timing();
        self.begin(host, TransitionKind::Present, end, timing, ghosts);
        Ok(Outcome::Started)
    }

    fn acquire_surface<H: OverlayHost + ?Sized>(&mut self, host: &mut H) -> Option<NodeId> {
        if let Some(surface) = self.config.host_surface.filter(|&s| host.is_alive(s)) {
            return Some(surface);
        }
        let previous_key = host.key_window();
        let window = host.create_window();
        match host.window_root(window) {
            Some(root) => {
                host.make_key(window);
                self.window = Some(OwnedWindow {
                    window,
                    previous_key,
                });
                Some(root)
            }
            None => {
                host.destroy_window(window);
                None
            }
        }
    }

    // --- Dismissal ----------------------------------------------------------

    /// Begin dismissing. With `animated == false` the dismissal settles
    /// before this returns.
    pub fn dismiss<H: OverlayHost + ?Sized>(
        &mut self,
        host: &mut H,
        animated: bool,
        on_complete: Option<Completion>,
    ) -> Result<Outcome> {
        match self.state {
            SessionState::Presenting => {
                warn!(session = self.id.0, "dismiss rejected while presenting");
                return Err(OverlayError::invalid(Operation::Dismiss, self.state));
            }
            SessionState::Dismissing => {
                debug!(session = self.id.0, "dismiss ignored: already dismissing");
                self.completions.extend(on_complete);
                return Ok(Outcome::Ignored);
            }
            SessionState::Idle => {
                return Err(OverlayError::invalid(Operation::Dismiss, self.state));
            }
            SessionState::Disposed => return Err(OverlayError::MissingContent),
            SessionState::Presented => {}
        }
        let content = self.content.ok_or(OverlayError::MissingContent)?;
        let Some(container) = self.container else {
            return Err(OverlayError::MissingContent);
        };
        let _span = debug_span!("overlay.dismiss", session = self.id.0, animated).entered();

        self.state = SessionState::Dismissing;
        self.completions.extend(on_complete);
        self.emit(OverlayEvent::WillDismiss { session: self.id });
        self.drag = None;
        if self.deferred.take().is_some() {
            debug!(session = self.id.0, "deferred layout dropped by dismissal");
        }

        let viewport = self.viewport(host);
        let exit = resolve_dismiss_animation(
            self.options.dismiss_animation,
            self.config.dismiss_animation,
            self.entrance,
            self.position,
            viewport,
        );
        self.exit = Some(exit);
        let anchor = exit.anchor().filter(|&a| host.is_alive(a));

        let target = if let Some(origin) = self.saved_origin {
            Visual::settled(self.to_surface(host, origin.screen_frame), PackedRgba::TRANSPARENT)
        } else if let Some(frame) = anchor.and_then(|a| host.frame_in_window(a)) {
            Visual::settled(self.to_surface(host, frame), PackedRgba::TRANSPARENT)
        } else {
            self.offscreen_visual(exit.direction(), viewport)
        };
        debug!(session = self.id.0, ?exit, "overlay dismissing");

        // Interrupt any relayout or drag return before building new ghosts.
        self.cancel_transition(host);
        let ghosts = anchor.and_then(|anchor| {
            let source = self.config.transition_element.unwrap_or(content);
            GhostPair::try_build(host, FlightLeg::Dismiss, anchor, content, source, container)
        });
        let mut timing = self.timing();
        if !animated {
            timing.duration = Duration::ZERO;
        }
        self.begin(host, TransitionKind::Dismiss, target, timing, ghosts);
        Ok(Outcome::Started)
    }

    /// Dismiss now, or as soon as presentation settles.
    ///
    /// Used by bulk dismissal, which must not leave a presenting overlay
    /// behind.
    pub fn dismiss_when_settled<H: OverlayHost + ?Sized>(
        &mut self,
        host: &mut H,
        animated: bool,
        on_complete: Option<Completion>,
    ) -> Result<Outcome> {
        if self.state != SessionState::Presenting {
            return self.dismiss(host, animated, on_complete);
        }
        let pending = self.dismiss_after_present.get_or_insert_with(PendingDismiss::default);
        pending.animated |= animated;
        pending.completions.extend(on_complete);
        debug!(session = self.id.0, "dismiss scheduled after presentation");
        Ok(Outcome::Started)
    }

    fn finish_dismiss<H: OverlayHost + ?Sized>(&mut self, host: &mut H) {
        if let Some(content) = self.content {
            match self.saved_origin {
                Some(origin) if host.is_alive(origin.parent) => {
                    host.add_child(origin.parent, content);
                    host.set_frame(content, origin.frame);
                    host.set_alpha(content, origin.alpha);
                }
                _ => {
                    host.remove_from_parent(content);
                }
            }
        }
        if let Some(container) = self.container.take() {
            host.remove_from_parent(container);
            host.destroy_node(container);
        }
        if let Some(owned) = self.window.take() {
            host.destroy_window(owned.window);
            if let Some(previous) = owned.previous_key {
                host.make_key(previous);
            }
        }
        self.surface = None;

        self.emit(OverlayEvent::DidDismiss { session: self.id });
        self.state = SessionState::Disposed;
        self.content = None;
        debug!(session = self.id.0, "overlay disposed");

        for completion in std::mem::take(&mut self.completions) {
            completion();
        }
    }

    // --- Layout -------------------------------------------------------------

    /// Move the overlay to a new resting position.
    ///
    /// `None` re-lays out instantly; otherwise the move animates over
    /// `duration`.
    pub fn update_position<H: OverlayHost + ?Sized>(
        &mut self,
        host: &mut H,
        position: Position,
        duration: Option<Duration>,
    ) -> Result<()> {
        self.request_layout(host, Operation::UpdatePosition, Some(position), duration)
    }

    /// Recompute the resting frame from the content's current size.
    pub fn update_layout<H: OverlayHost + ?Sized>(
        &mut self,
        host: &mut H,
        duration: Option<Duration>,
    ) -> Result<()> {
        self.request_layout(host, Operation::UpdateLayout, None, duration)
    }

    /// The viewport changed size (rotation, window resize).
    pub fn on_viewport_resized<H: OverlayHost + ?Sized>(&mut self, host: &mut H) {
        if matches!(self.state, SessionState::Presenting | SessionState::Presented) {
            let _ = self.request_layout(host, Operation::UpdateLayout, None, None);
        }
    }

    fn request_layout<H: OverlayHost + ?Sized>(
        &mut self,
        host: &mut H,
        operation: Operation,
        position: Option<Position>,
        duration: Option<Duration>,
    ) -> Result<()> {
        match self.state {
            SessionState::Disposed => Err(OverlayError::MissingContent),
            SessionState::Idle | SessionState::Dismissing => {
                Err(OverlayError::invalid(operation, self.state))
            }
            SessionState::Presenting => {
                self.defer_layout(position, duration);
                Ok(())
            }
            SessionState::Presented if !self.can_layout() => {
                self.defer_layout(position, duration);
                Ok(())
            }
            SessionState::Presented => {
                if let Some(position) = position {
                    self.position = position;
                }
                self.relayout(host, duration);
                Ok(())
            }
        }
    }

    fn can_layout(&self) -> bool {
        self.state == SessionState::Presented && self.transition.is_none() && self.drag.is_none()
    }

    fn defer_layout(&mut self, position: Option<Position>, duration: Option<Duration>) {
        match self.deferred.as_mut() {
            Some(deferred) => {
                deferred.position = position.or(deferred.position);
                deferred.duration = duration;
            }
            None => {
                self.deferred = Some(DeferredLayout {
                    position,
                    duration,
                    attempts: 0,
                    waited: Duration::ZERO,
                });
            }
        }
        trace!(session = self.id.0, "layout deferred");
    }

    fn poll_deferred<H: OverlayHost + ?Sized>(&mut self, host: &mut H, dt: Duration) {
        let Some(deferred) = self.deferred.as_mut() else {
            return;
        };
        deferred.waited += dt;
        while deferred.waited >= LAYOUT_POLL_INTERVAL {
            deferred.waited -= LAYOUT_POLL_INTERVAL;
            deferred.attempts = deferred.attempts.saturating_add(1);
            // Presenting, a transition and a drag all end on their own, so
            // the request waits for as long as they last.
            if self.state == SessionState::Presented && self.transition.is_none() && self.drag.is_none() {
                let request = *deferred;
                self.deferred = None;
                if let Some(position) = request.position {
                    self.position = position;
                }
                debug!(session = self.id.0, attempts = request.attempts, "deferred layout applied");
                self.relayout(host, request.duration);
                return;
            }
        }
    }

    fn relayout<H: OverlayHost + ?Sized>(&mut self, host: &mut H, duration: Option<Duration>) {
        let Some(content) = self.content else {
            return;
        };
        let viewport = self.viewport(host);
        self.content_size = effective_content_size(
            host.preferred_size(content).unwrap_or_default(),
            viewport,
        );
        self.resting = self.compute_resting(viewport);
        host.set_frame(content, Rect::from_size(self.resting.size()));
        let target = Visual::settled(self.resting, self.config.background);
        debug!(session = self.id.0, resting = ?self.resting, ?duration, "overlay relayout");

        match duration.filter(|d| !d.is_zero()) {
            Some(duration) => {
                let timing = Timing {
                    duration,
                    easing: self.timing().easing,
                };
                self.begin(host, TransitionKind::Relayout, target, timing, None);
            }
            None => self.apply_visual(host, target),
        }
    }

    // --- Input --------------------------------------------------------------

    /// Feed a drag gesture. Returns `true` when the session consumed it.
    pub fn on_drag<H: OverlayHost + ?Sized>(
        &mut self,
        host: &mut H,
        phase: DragPhase,
        point: Point,
    ) -> bool {
        if !self.config.drag_to_dismiss {
            return false;
        }
        if phase == DragPhase::Began {
            if self.state != SessionState::Presented || self.transition.is_some() {
                return false;
            }
            self.drag = Some(DragTrack {
                touch: point,
                origin: self.visual.frame.origin(),
                translation: 0.0,
            });
            self.emit_drag(phase, 0.0);
            return true;
        }
        if self.state != SessionState::Presented {
            return false;
        }
        let Some(mut track) = self.drag else {
            return false;
        };

        let viewport = self.viewport(host);
        let (axis, sign) = self.drag_axis(viewport);
        let raw = match axis {
            Axis::Vertical => point.y - track.touch.y,
            Axis::Horizontal => point.x - track.touch.x,
        };
        track.translation = (raw * sign).max(0.0);
        let offset = track.translation * sign;
        let origin = match axis {
            Axis::Vertical => track.origin.offset(0.0, offset),
            Axis::Horizontal => track.origin.offset(offset, 0.0),
        };

        match phase {
            DragPhase::Began | DragPhase::Changed => {
                self.drag = Some(track);
                let visual = Visual {
                    frame: self.visual.frame.with_origin(origin),
                    ..self.visual
                };
                self.apply_visual(host, visual);
                self.emit_drag(phase, track.translation);
            }
            DragPhase::Ended | DragPhase::Cancelled => {
                self.drag = None;
                self.emit_drag(phase, track.translation);
                if phase == DragPhase::Ended && track.translation > DRAG_DISMISS_THRESHOLD {
                    debug!(session = self.id.0, translation = track.translation, "drag dismiss");
                    let _ = self.dismiss(host, true, None);
                } else {
                    let target = Visual {
                        frame: self.visual.frame.with_origin(track.origin),
                        ..self.visual
                    };
                    let timing = Timing {
                        duration: DRAG_RETURN_DURATION,
                        easing: Easing::EaseOut,
                    };
                    self.begin(host, TransitionKind::DragReturn, target, timing, None);
                }
            }
        }
        true
    }

    fn drag_axis(&self, viewport: Size) -> (Axis, f64) {
        let exit = resolve_dismiss_animation(
            self.options.dismiss_animation,
            self.config.dismiss_animation,
            self.entrance,
            self.position,
            viewport,
        );
        let direction = exit.direction();
        match direction.axis() {
            Some(axis) => (axis, direction.sign()),
            None => (Axis::Vertical, 1.0),
        }
    }

    fn emit_drag(&mut self, phase: DragPhase, translation: f64) {
        self.emit(OverlayEvent::DragPhaseChanged {
            session: self.id,
            phase,
            translation,
        });
    }

    /// Feed a keyboard notification.
    ///
    /// Ignored unless keyboard avoidance is enabled. A notification without
    /// geometry is rejected and the previous inset is kept.
    pub fn on_keyboard_change<H: OverlayHost + ?Sized>(
        &mut self,
        host: &mut H,
        event: &KeyboardEvent,
    ) -> Result<()> {
        if !self.config.avoid_keyboard {
            return Ok(());
        }
        if self.state == SessionState::Disposed {
            return Err(OverlayError::MissingContent);
        }
        let Some(height) = event.height() else {
            debug!(session = self.id.0, ?event, "keyboard notification without end frame");
            return Err(OverlayError::KeyboardEventMismatch { field: "end_frame" });
        };
        let height = height.max(0.0);
        if height == self.keyboard_inset {
            return Ok(());
        }
        debug!(session = self.id.0, from = self.keyboard_inset, to = height, "keyboard inset changed");
        self.keyboard_inset = height;
        if matches!(self.state, SessionState::Presenting | SessionState::Presented) {
            self.request_layout(host, Operation::UpdateLayout, None, Some(KEYBOARD_RELAYOUT_DURATION))?;
        }
        Ok(())
    }

    /// A tap on the backdrop. Returns `true` if it started a dismissal.
    pub fn on_backdrop_tap<H: OverlayHost + ?Sized>(&mut self, host: &mut H, point: Point) -> bool {
        if !self.config.tap_outside_to_dismiss
            || self.state != SessionState::Presented
            || self.resting.contains(point)
        {
            return false;
        }
        matches!(self.dismiss(host, true, None), Ok(Outcome::Started))
    }

    // --- Frame clock --------------------------------------------------------

    /// Advance animations and deferred work by `dt`.
    pub fn tick<H: OverlayHost + ?Sized>(&mut self, host: &mut H, dt: Duration) {
        if let Some(transition) = self.transition.as_mut() {
            transition.tween.tick(dt);
            let t = transition.tween.value();
            let visual = transition.from.lerp(&transition.to, t);
            let complete = transition.tween.is_complete();
            if let Some(ghosts) = &transition.ghosts {
                ghosts.apply(host, t, visual.frame.size());
            }
            trace!(session = self.id.0, kind = ?transition.kind, t, "transition tick");
            if complete {
                self.finish_transition(host);
            } else {
                self.apply_visual(host, visual);
            }
        }
        self.poll_deferred(host, dt);
    }

    fn begin<H: OverlayHost + ?Sized>(
        &mut self,
        host: &mut H,
        kind: TransitionKind,
        to: Visual,
        timing: Timing,
        ghosts: Option<GhostPair>,
    ) {
        self.cancel_transition(host);
        self.transition = Some(ActiveTransition {
            kind,
            tween: Tween::new(timing.duration, timing.easing),
            from: self.visual,
            to,
            ghosts,
        });
        if timing.duration.is_zero() {
            self.finish_transition(host);
        }
    }

    /// Drop the in-flight transition where it stands.
    fn cancel_transition<H: OverlayHost + ?Sized>(&mut self, host: &mut H) {
        if let Some(mut previous) = self.transition.take() {
            trace!(session = self.id.0, kind = ?previous.kind, "transition replaced");
            if let Some(ghosts) = previous.ghosts.as_mut() {
                ghosts.teardown(host);
            }
        }
    }

    fn finish_transition<H: OverlayHost + ?Sized>(&mut self, host: &mut H) {
        let Some(mut transition) = self.transition.take() else {
            return;
        };
        self.apply_visual(host, transition.to);
        if let Some(ghosts) = transition.ghosts.as_mut() {
            ghosts.teardown(host);
        }

        match transition.kind {
            TransitionKind::Present => {
                self.state = SessionState::Presented;
                debug!(session = self.id.0, "overlay presented");
                self.emit(OverlayEvent::DidPresent { session: self.id });
                if let Some(pending) = self.dismiss_after_present.take() {
                    let PendingDismiss {
                        animated,
                        completions,
                    } = pending;
                    self.completions.extend(completions);
                    let _ = self.dismiss(host, animated, None);
                }
            }
            TransitionKind::Dismiss => self.finish_dismiss(host),
            TransitionKind::Relayout | TransitionKind::DragReturn => {}
        }
    }

    // --- Helpers ------------------------------------------------------------

    fn apply_visual<H: OverlayHost + ?Sized>(&mut self, host: &mut H, visual: Visual) {
        if let Some(container) = self.container {
            host.set_frame(container, visual.frame);
            host.set_scale(container, visual.scale);
            host.set_alpha(container, visual.alpha);
            host.set_background(container, visual.background);
        }
        self.visual = visual;
    }

    fn viewport<H: OverlayHost + ?Sized>(&self, host: &H) -> Size {
        self.surface
            .and_then(|s| host.frame(s))
            .map(|f| f.size())
            .unwrap_or(Size::ZERO)
    }

    fn compute_resting(&self, viewport: Size) -> Rect {
        let inset = if self.config.avoid_keyboard {
            self.keyboard_inset
        } else {
            0.0
        };
        resting_frame(self.position, self.content_size, viewport, inset)
    }

    /// Start or end visual for a non-anchored transition.
    fn offscreen_visual(&self, direction: Direction, viewport: Size) -> Visual {
        let transparent = PackedRgba::TRANSPARENT;
        match direction {
            Direction::Scale(scale) => Visual {
                frame: self.resting,
                scale,
                alpha: 0.0,
                background: transparent,
            },
            // Anchor gone: fade in place.
            Direction::Anchor => Visual {
                alpha: 0.0,
                ..Visual::settled(self.resting, transparent)
            },
            _ => Visual::settled(offscreen_frame(self.resting, direction, viewport), transparent),
        }
    }

    /// Convert a window-space frame into the surface's coordinate space.
    fn to_surface<H: OverlayHost + ?Sized>(&self, host: &H, frame: Rect) -> Rect {
        let origin = self
            .surface
            .and_then(|s| host.frame_in_window(s))
            .map(|f| f.origin())
            .unwrap_or(Point::ZERO);
        frame.translate(-origin.x, -origin.y)
    }

    fn timing(&self) -> Timing {
        resolve_timing(
            self.options.duration,
            self.options.easing,
            self.config.duration,
            self.config.easing,
        )
    }

    fn emit(&mut self, event: OverlayEvent) {
        self.callbacks.emit(&event);
        if let Some(bus) = &self.bus {
            bus.emit(&event);
        }
    }
}
