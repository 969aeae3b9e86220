#![forbid(unsafe_code)]

//! Host collaborator interfaces.
//!
//! The overlay engine never renders, rasterizes, or owns windows itself. It
//! drives a host through three narrow traits:
//!
//! - [`SurfaceTree`]: the retained node tree (frames, opacity, scale, parents).
//! - [`Rasterizer`]: still-image capture of a node for flight transitions.
//! - [`WindowSystem`]: top-level windows and the key (foreground) window.
//!
//! # Handles are relations, never ownership
//!
//! [`NodeId`] and [`WindowId`] are opaque tokens. A node may die at any time
//! (the caller removed the anchor button, say); every query returns `None`
//! and every mutation returns `false` for a dead node, and the engine treats
//! that as "skip this embellishment", never as a fatal error.

use ftui_core::color::PackedRgba;
use ftui_core::geometry::{Rect, Size};

/// Opaque handle to a node in the host's surface tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub u64);

/// Opaque handle to a host top-level window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct WindowId(pub u64);

/// Opaque handle to a rasterized image owned by the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ImageId(pub u64);

/// Retained surface tree operations.
pub trait SurfaceTree {
    /// Whether the node still exists.
    fn is_alive(&self, node: NodeId) -> bool;

    /// Parent of the node, if attached.
    fn parent(&self, node: NodeId) -> Option<NodeId>;

    /// Frame in the parent's coordinate space.
    fn frame(&self, node: NodeId) -> Option<Rect>;

    /// Frame in the coordinate space of the node's top-level window.
    fn frame_in_window(&self, node: NodeId) -> Option<Rect>;

    /// Size the content would like to occupy (zero when it has no opinion).
    fn preferred_size(&self, node: NodeId) -> Option<Size>;

    /// Current opacity.
    fn alpha(&self, node: NodeId) -> Option<f64>;

    /// Corner radius used when rendering (and when rasterizing).
    fn corner_radius(&self, node: NodeId) -> Option<f64>;

    fn set_frame(&mut self, node: NodeId, frame: Rect) -> bool;

    fn set_alpha(&mut self, node: NodeId, alpha: f64) -> bool;

    /// Uniform scale transform about the node's center (1.0 = identity).
    fn set_scale(&mut self, node: NodeId, scale: f64) -> bool;

    fn set_background(&mut self, node: NodeId, color: PackedRgba) -> bool;

    fn set_corner_radius(&mut self, node: NodeId, radius: f64) -> bool;

    /// Attach `child` as the topmost child of `parent`, detaching it from any
    /// previous parent first.
    fn add_child(&mut self, parent: NodeId, child: NodeId) -> bool;

    /// Detach the node from its parent (the node stays alive).
    fn remove_from_parent(&mut self, node: NodeId) -> bool;

    /// Create a plain, detached container node.
    fn create_node(&mut self) -> NodeId;

    /// Destroy a node created with [`SurfaceTree::create_node`].
    fn destroy_node(&mut self, node: NodeId);
}

/// Still-image capture.
pub trait Rasterizer {
    /// Rasterize the current visual state of a node.
    ///
    /// Returns `None` when the host cannot produce an image.
    fn rasterize(&mut self, node: NodeId) -> Option<ImageId>;

    /// Create a detached node that displays `image`.
    fn create_image_node(&mut self, image: ImageId, corner_radius: f64) -> NodeId;

    /// Release an image created by [`Rasterizer::rasterize`].
    fn release_image(&mut self, image: ImageId);
}

/// Top-level window management.
pub trait WindowSystem {
    /// The window currently receiving input, if any.
    fn key_window(&self) -> Option<WindowId>;

    /// Create a new top-level window covering the screen.
    fn create_window(&mut self) -> WindowId;

    /// Root node of a window; its frame is the window bounds.
    fn window_root(&self, window: WindowId) -> Option<NodeId>;

    /// Bring a window to the foreground.
    fn make_key(&mut self, window: WindowId);

    /// Tear a window down.
    fn destroy_window(&mut self, window: WindowId);
}

/// Everything the engine needs from its host.
pub trait OverlayHost: SurfaceTree + Rasterizer + WindowSystem {}

impl<T: SurfaceTree + Rasterizer + WindowSystem> OverlayHost for T {}
