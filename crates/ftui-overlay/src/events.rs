#![forbid(unsafe_code)]

//! Lifecycle events and their delivery.
//!
//! A single [`EventEmitter`] type serves both subscriber kinds: each session
//! owns one for its callback subscribers, and the stack shares one
//! ([`EventBus`]) with every session for broadcast subscribers.
//!
//! Delivery is synchronous and ordered. The subscriber list is detached while
//! handlers run, so a handler may subscribe or unsubscribe without observing
//! a half-updated list; changes made during delivery apply to the next event.

use std::cell::RefCell;
use std::rc::Rc;

use ftui_core::event::DragPhase;
use tracing::trace;

use crate::session::SessionId;

/// Lifecycle notification for one session.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum OverlayEvent {
    WillPresent { session: SessionId },
    DidPresent { session: SessionId },
    WillDismiss { session: SessionId },
    DidDismiss { session: SessionId },
    /// A drag moved the container `translation` units toward its exit.
    DragPhaseChanged {
        session: SessionId,
        phase: DragPhase,
        translation: f64,
    },
}

impl OverlayEvent {
    pub fn session(&self) -> SessionId {
        match *self {
            Self::WillPresent { session }
            | Self::DidPresent { session }
            | Self::WillDismiss { session }
            | Self::DidDismiss { session }
            | Self::DragPhaseChanged { session, .. } => session,
        }
    }

    /// Stable name for traces and logs.
    pub fn name(&self) -> &'static str {
        match self {
            Self::WillPresent { .. } => "will_present",
            Self::DidPresent { .. } => "did_present",
            Self::WillDismiss { .. } => "will_dismiss",
            Self::DidDismiss { .. } => "did_dismiss",
            Self::DragPhaseChanged { .. } => "drag_phase_changed",
        }
    }
}

/// How a subscriber was attached.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubscriberKind {
    /// Attached to one session.
    Callback,
    /// Attached to the stack; sees every session's events.
    Broadcast,
}

/// Token returned by `subscribe`, used to unsubscribe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

type Handler = Box<dyn FnMut(&OverlayEvent)>;

struct Subscriber {
    id: SubscriptionId,
    handler: Handler,
}

/// Ordered, synchronous event delivery.
pub struct EventEmitter {
    kind: SubscriberKind,
    subscribers: Vec<Subscriber>,
    /// Unsubscribed while detached for delivery.
    pending_removals: Vec<SubscriptionId>,
    delivering: bool,
    next_id: u64,
}

impl std::fmt::Debug for EventEmitter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventEmitter")
            .field("kind", &self.kind)
            .field("subscribers", &self.subscribers.len())
            .finish()
    }
}

impl EventEmitter {
    pub fn new(kind: SubscriberKind) -> Self {
        Self {
            kind,
            subscribers: Vec::new(),
            pending_removals: Vec::new(),
            delivering: false,
            next_id: 1,
        }
    }

    pub fn kind(&self) -> SubscriberKind {
        self.kind
    }

    pub fn subscribe(&mut self, handler: impl FnMut(&OverlayEvent) + 'static) -> SubscriptionId {
        let id = SubscriptionId(self.next_id);
        self.next_id += 1;
        self.subscribers.push(Subscriber {
            id,
            handler: Box::new(handler),
        });
        id
    }

    /// Returns `true` if the subscription existed.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        if let Some(index) = self.subscribers.iter().position(|s| s.id == id) {
            self.subscribers.remove(index);
            return true;
        }
        if self.delivering && id.0 < self.next_id && !self.pending_removals.contains(&id) {
            self.pending_removals.push(id);
            return true;
        }
        false
    }

    pub fn len(&self) -> usize {
        self.subscribers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.subscribers.is_empty()
    }

    /// Deliver `event` to every subscriber in subscription order.
    pub fn emit(&mut self, event: &OverlayEvent) {
        let mut detached = self.detach();
        deliver(self.kind, &mut detached, event);
        self.reattach(detached);
    }

    fn detach(&mut self) -> Vec<Subscriber> {
        self.delivering = true;
        std::mem::take(&mut self.subscribers)
    }

    fn reattach(&mut self, mut detached: Vec<Subscriber>) {
        self.delivering = false;
        let removals = std::mem::take(&mut self.pending_removals);
        detached.retain(|s| !removals.contains(&s.id));
        let added = std::mem::replace(&mut self.subscribers, detached);
        self.subscribers.extend(added);
    }
}

fn deliver(kind: SubscriberKind, subscribers: &mut [Subscriber], event: &OverlayEvent) {
    trace!(
        event = event.name(),
        session = event.session().get(),
        ?kind,
        count = subscribers.len(),
        "overlay event"
    );
    for subscriber in subscribers {
        (subscriber.handler)(event);
    }
}

/// Broadcast emitter shared between the stack and its sessions.
#[derive(Debug, Clone)]
pub struct EventBus(Rc<RefCell<EventEmitter>>);

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl EventBus {
    pub fn new() -> Self {
        Self(Rc::new(RefCell::new(EventEmitter::new(SubscriberKind::Broadcast))))
    }

    pub fn subscribe(&self, handler: impl FnMut(&OverlayEvent) + 'static) -> SubscriptionId {
        self.0.borrow_mut().subscribe(handler)
    }

    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.0.borrow_mut().unsubscribe(id)
    }

    pub fn len(&self) -> usize {
        self.0.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.borrow().is_empty()
    }

    /// Deliver without holding the borrow, so handlers may use the bus.
    pub fn emit(&self, event: &OverlayEvent) {
        let mut detached = self.0.borrow_mut().detach();
        deliver(SubscriberKind::Broadcast, &mut detached, event);
        self.0.borrow_mut().reattach(detached);
    }
}
