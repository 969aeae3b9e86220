#![forbid(unsafe_code)]

//! Stack of concurrently presented overlays.
//!
//! The `OverlayStack` keeps sessions in presentation order; the last one is
//! on top and is the only one that sees drags and backdrop taps. Keyboard and
//! viewport changes fan out to every member.
//!
//! # Invariants
//!
//! - Insertion order is presentation order; the top is the last member.
//! - A content node appears in at most one member.
//! - Members are removed automatically once Disposed, except while a bulk
//!   dismissal holds auto-removal off.
//! - `dismiss_top` and `dismiss_all` remove sessions from membership
//!   immediately. Their exit animations keep running in a retiring set that
//!   [`OverlayStack::tick`] drives until each session is Disposed.
//!
//! # Failure Modes
//!
//! - `dismiss_top()` on an empty stack returns `Ok(None)` (no panic).
//! - Operations naming an unknown session return
//!   [`OverlayError::UnknownSession`].
//!
//! # Example
//!
//! ```ignore
//! let mut stack = OverlayStack::new();
//! let sheet = stack.present(&mut host, content, PresentOptions::default(), None)?;
//!
//! // Every frame:
//! stack.tick(&mut host, dt);
//!
//! // Tear everything down; `done` runs once the last overlay is gone.
//! stack.dismiss_all(&mut host, true, Some(Box::new(done)));
//! ```

use std::time::Duration;

use ftui_core::event::{DragPhase, KeyboardEvent};
use ftui_core::geometry::Point;
use tracing::debug;

use crate::config::{OverlayConfig, OverlayConfigRegistry};
use crate::error::{OverlayError, Result};
use crate::events::{EventBus, OverlayEvent, SubscriptionId};
use crate::host::{NodeId, OverlayHost};
use crate::resolver::Position;
use crate::session::{Completion, Outcome, PresentOptions, Session, SessionId, SessionState};

/// Ordered set of active overlay sessions.
#[derive(Debug)]
pub struct OverlayStack {
    sessions: Vec<Session>,
    /// Removed from membership but still animating out.
    retiring: Vec<Session>,
    registry: OverlayConfigRegistry,
    bus: EventBus,
}

impl Default for OverlayStack {
    fn default() -> Self {
        Self::new()
    }
}

impl OverlayStack {
    pub fn new() -> Self {
        Self {
            sessions: Vec::new(),
            retiring: Vec::new(),
            registry: OverlayConfigRegistry::new(),
            bus: EventBus::new(),
        }
    }

    // --- Membership ---------------------------------------------------------

    /// Present `content` on top of the stack.
    ///
    /// The configuration is `config` if given, else the registry entry for
    /// `content`, else the defaults. Presenting content that is already on
    /// the stack returns the existing session.
    pub fn present<H: OverlayHost + ?Sized>(
        &mut self,
        host: &mut H,
        content: NodeId,
        options: PresentOptions,
        config: Option<OverlayConfig>,
    ) -> Result<SessionId> {
        if let Some(existing) = self.find_by_content(content) {
            debug!(session = existing.get(), "content already presented");
            return Ok(existing);
        }
        let config = config
            .or_else(|| self.registry.get(content).cloned())
            .unwrap_or_default();
        let mut session = Session::new(content, config).with_event_bus(self.bus.clone());
        session.present(host, options)?;
        let id = session.id();
        debug!(session = id.get(), depth = self.sessions.len() + 1, "overlay pushed");
        self.sessions.push(session);
        self.reap();
        Ok(id)
    }

    /// Dismiss one session.
    pub fn dismiss<H: OverlayHost + ?Sized>(
        &mut self,
        host: &mut H,
        id: SessionId,
        animated: bool,
        on_complete: Option<Completion>,
    ) -> Result<Outcome> {
        let session = self
            .sessions
            .iter_mut()
            .find(|s| s.id() == id)
            .ok_or(OverlayError::UnknownSession(id))?;
        let outcome = session.dismiss(host, animated, on_complete)?;
        self.reap();
        Ok(outcome)
    }

    /// Dismiss the top session and drop it from membership.
    ///
    /// Returns the dismissed session's id, or `None` on an empty stack. A
    /// top session that refuses dismissal (still presenting) stays on the
    /// stack and the error is returned.
    pub fn dismiss_top<H: OverlayHost + ?Sized>(
        &mut self,
        host: &mut H,
        animated: bool,
        on_complete: Option<Completion>,
    ) -> Result<Option<SessionId>> {
        let Some(top) = self.sessions.last_mut() else {
            return Ok(None);
        };
        top.dismiss(host, animated, on_complete)?;
        let Some(session) = self.sessions.pop() else {
            return Ok(None);
        };
        let id = session.id();
        self.retire(session);
        Ok(Some(id))
    }

    /// Dismiss every session in presentation order.
    ///
    /// `on_complete` is attached to the last session that still accepts a
    /// dismissal, so it runs once, after that session's `DidDismiss`. With no
    /// such session (empty stack, or members already disposed but not yet
    /// reaped) it runs before this returns. Membership is cleared before
    /// this returns. Sessions still presenting dismiss as soon as they settle.
    pub fn dismiss_all<H: OverlayHost + ?Sized>(
        &mut self,
        host: &mut H,
        animated: bool,
        on_complete: Option<Completion>,
    ) -> usize {
        let sessions = std::mem::take(&mut self.sessions);
        let count = sessions.len();
        debug!(count, animated, "dismissing all overlays");

        let carrier = sessions.iter().rposition(|s| {
            matches!(
                s.state(),
                SessionState::Presenting | SessionState::Presented | SessionState::Dismissing
            )
        });
        let mut on_complete = on_complete;
        for (index, mut session) in sessions.into_iter().enumerate() {
            let completion = if Some(index) == carrier {
                on_complete.take()
            } else {
                None
            };
            if let Err(err) = session.dismiss_when_settled(host, animated, completion) {
                debug!(session = session.id().get(), error = %err, "bulk dismissal skipped session");
            }
            self.retire(session);
        }

        if let Some(completion) = on_complete {
            completion();
        }
        count
    }

    /// Dismiss whichever session presents `content`.
    pub fn dismiss_content<H: OverlayHost + ?Sized>(
        &mut self,
        host: &mut H,
        content: NodeId,
        animated: bool,
    ) -> Result<Outcome> {
        let id = self
            .find_by_content(content)
            .ok_or(OverlayError::MissingContent)?;
        self.dismiss(host, id, animated, None)
    }

    fn retire(&mut self, session: Session) {
        if session.state() != SessionState::Disposed {
            self.retiring.push(session);
        }
    }

    /// Drop Disposed sessions.
    fn reap(&mut self) {
        self.sessions.retain(|s| s.state() != SessionState::Disposed);
        self.retiring.retain(|s| s.state() != SessionState::Disposed);
    }

    // --- Lookup -------------------------------------------------------------

    pub fn find_by_content(&self, content: NodeId) -> Option<SessionId> {
        self.sessions
            .iter()
            .find(|s| s.content() == Some(content))
            .map(Session::id)
    }

    /// Session whose container or surface is `node`.
    pub fn find_by_surface(&self, node: NodeId) -> Option<SessionId> {
        self.sessions
            .iter()
            .find(|s| s.renders_into(node))
            .map(Session::id)
    }

    pub fn session(&self, id: SessionId) -> Option<&Session> {
        self.sessions
            .iter()
            .chain(self.retiring.iter())
            .find(|s| s.id() == id)
    }

    pub fn session_mut(&mut self, id: SessionId) -> Option<&mut Session> {
        self.sessions
            .iter_mut()
            .chain(self.retiring.iter_mut())
            .find(|s| s.id() == id)
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    #[inline]
    pub fn depth(&self) -> usize {
        self.sessions.len()
    }

    pub fn contains(&self, id: SessionId) -> bool {
        self.sessions.iter().any(|s| s.id() == id)
    }

    pub fn top_id(&self) -> Option<SessionId> {
        self.sessions.last().map(Session::id)
    }

    /// Member ids, bottom to top.
    pub fn ids(&self) -> Vec<SessionId> {
        self.sessions.iter().map(Session::id).collect()
    }

    /// Sessions removed from membership that are still animating out.
    pub fn retiring_count(&self) -> usize {
        self.retiring.len()
    }

    // --- Updates and input --------------------------------------------------

    pub fn update_position<H: OverlayHost + ?Sized>(
        &mut self,
        host: &mut H,
        id: SessionId,
        position: Position,
        duration: Option<Duration>,
    ) -> Result<()> {
        self.member_mut(id)?.update_position(host, position, duration)
    }

    pub fn update_layout<H: OverlayHost + ?Sized>(
        &mut self,
        host: &mut H,
        id: SessionId,
        duration: Option<Duration>,
    ) -> Result<()> {
        self.member_mut(id)?.update_layout(host, duration)
    }

    /// Route a drag to the top session.
    pub fn handle_drag<H: OverlayHost + ?Sized>(
        &mut self,
        host: &mut H,
        phase: DragPhase,
        point: Point,
    ) -> bool {
        let handled = match self.sessions.last_mut() {
            Some(top) => top.on_drag(host, phase, point),
            None => false,
        };
        self.reap();
        handled
    }

    /// Fan a keyboard notification out to every member.
    ///
    /// Every member sees the event; the first error is returned.
    pub fn handle_keyboard<H: OverlayHost + ?Sized>(
        &mut self,
        host: &mut H,
        event: &KeyboardEvent,
    ) -> Result<()> {
        let mut first_error = None;
        for session in &mut self.sessions {
            if let Err(err) = session.on_keyboard_change(host, event) {
                first_error.get_or_insert(err);
            }
        }
        first_error.map_or(Ok(()), Err)
    }

    pub fn handle_viewport_resized<H: OverlayHost + ?Sized>(&mut self, host: &mut H) {
        for session in &mut self.sessions {
            session.on_viewport_resized(host);
        }
    }

    /// Route a backdrop tap to the top session.
    pub fn handle_backdrop_tap<H: OverlayHost + ?Sized>(&mut self, host: &mut H, point: Point) -> bool {
        let dismissed = match self.sessions.last_mut() {
            Some(top) => top.on_backdrop_tap(host, point),
            None => false,
        };
        self.reap();
        dismissed
    }

    /// Advance every member and retiring session.
    pub fn tick<H: OverlayHost + ?Sized>(&mut self, host: &mut H, dt: Duration) {
        for session in &mut self.sessions {
            session.tick(host, dt);
        }
        for session in &mut self.retiring {
            session.tick(host, dt);
        }
        self.reap();
    }

    /// Whether any session still has a transition running.
    pub fn is_animating(&self) -> bool {
        self.sessions
            .iter()
            .chain(self.retiring.iter())
            .any(Session::is_animating)
    }

    fn member_mut(&mut self, id: SessionId) -> Result<&mut Session> {
        self.sessions
            .iter_mut()
            .find(|s| s.id() == id)
            .ok_or(OverlayError::UnknownSession(id))
    }

    // --- Events and configuration -------------------------------------------

    /// Receive every session's events.
    pub fn subscribe(&self, handler: impl FnMut(&OverlayEvent) + 'static) -> SubscriptionId {
        self.bus.subscribe(handler)
    }

    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.bus.unsubscribe(id)
    }

    pub fn registry(&self) -> &OverlayConfigRegistry {
        &self.registry
    }

    pub fn registry_mut(&mut self) -> &mut OverlayConfigRegistry {
        &mut self.registry
    }
}
