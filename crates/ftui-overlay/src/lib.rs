#![forbid(unsafe_code)]

//! Modal overlay presentation engine.
//!
//! # Role in FrankenTUI
//! `ftui-overlay` presents an arbitrary content node above the current screen
//! and takes it away again. It owns the geometry and timing of that round
//! trip; rendering, windows, and gesture recognition stay in the host, which
//! it reaches through the traits in [`host`].
//!
//! # Layers
//! - [`resolver`]: pure resting/offscreen frame math.
//! - [`planner`]: which entrance, which exit, how long.
//! - [`capture`]: snapshots and the flight ghosts built from them.
//! - [`session`]: one overlay's state machine.
//! - [`stack`]: every overlay on screen, in presentation order.
//!
//! # Driving it
//! Nothing here runs on its own. Call [`OverlayStack::tick`] from the host's
//! frame clock; transitions advance, and their continuations (events,
//! restoration, completion callbacks) run inside that call.
//!
//! ```ignore
//! let mut stack = OverlayStack::new();
//! stack.present(&mut host, content, PresentOptions::default(), None)?;
//! loop {
//!     stack.tick(&mut host, frame_dt);
//! }
//! ```

pub mod capture;
pub mod config;
pub mod error;
pub mod events;
pub mod host;
pub mod planner;
pub mod resolver;
pub mod session;
pub mod stack;

#[cfg(any(test, feature = "test-helpers"))]
pub mod testing;

pub use config::{ConfigError, OverlayConfig, OverlayConfigRegistry};
pub use error::{OverlayError, Result};
pub use events::{OverlayEvent, SubscriptionId};
pub use host::{ImageId, NodeId, OverlayHost, WindowId};
pub use planner::{DismissAnimation, PresentAnimation};
pub use resolver::Position;
pub use session::{Completion, Outcome, PresentOptions, Session, SessionId, SessionState};
pub use stack::OverlayStack;
