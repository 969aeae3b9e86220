#![forbid(unsafe_code)]

//! In-memory host for tests and scenario runs.
//!
//! [`HeadlessHost`] implements every host trait over a plain node map. It
//! starts with one key window covering the screen and records each mutation
//! in an operation log so tests can assert on exactly what the engine did.

use ahash::AHashMap;
use ftui_core::color::PackedRgba;
use ftui_core::geometry::{Rect, Size};

use crate::host::{ImageId, NodeId, Rasterizer, SurfaceTree, WindowId, WindowSystem};

/// One recorded host mutation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum HostOp {
    CreateNode(NodeId),
    DestroyNode(NodeId),
    AddChild { parent: NodeId, child: NodeId },
    RemoveFromParent(NodeId),
    SetFrame(NodeId, Rect),
    SetAlpha(NodeId, f64),
    SetScale(NodeId, f64),
    SetBackground(NodeId, PackedRgba),
    SetCornerRadius(NodeId, f64),
    Rasterize(NodeId, ImageId),
    ReleaseImage(ImageId),
    CreateWindow(WindowId),
    DestroyWindow(WindowId),
    MakeKey(WindowId),
}

#[derive(Debug, Clone)]
struct HeadlessNode {
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    frame: Rect,
    alpha: f64,
    scale: f64,
    background: PackedRgba,
    corner_radius: f64,
    preferred: Size,
    image: Option<ImageId>,
}

impl Default for HeadlessNode {
    fn default() -> Self {
        Self {
            parent: None,
            children: Vec::new(),
            frame: Rect::default(),
            alpha: 1.0,
            scale: 1.0,
            background: PackedRgba::TRANSPARENT,
            corner_radius: 0.0,
            preferred: Size::ZERO,
            image: None,
        }
    }
}

/// A host with no rendering.
#[derive(Debug)]
pub struct HeadlessHost {
    screen: Size,
    nodes: AHashMap<NodeId, HeadlessNode>,
    windows: Vec<(WindowId, NodeId)>,
    key: Option<WindowId>,
    main_root: NodeId,
    images: AHashMap<ImageId, NodeId>,
    fail_snapshots: bool,
    next_node: u64,
    next_window: u64,
    next_image: u64,
    ops: Vec<HostOp>,
}

impl HeadlessHost {
    /// A host with one key window covering `screen`.
    pub fn new(screen: Size) -> Self {
        let mut host = Self {
            screen,
            nodes: AHashMap::new(),
            windows: Vec::new(),
            key: None,
            main_root: NodeId(0),
            images: AHashMap::new(),
            fail_snapshots: false,
            next_node: 1,
            next_window: 1,
            next_image: 1,
            ops: Vec::new(),
        };
        let window = host.create_window();
        host.make_key(window);
        host.main_root = host.window_root(window).unwrap_or(NodeId(0));
        host.ops.clear();
        host
    }

    pub fn screen(&self) -> Size {
        self.screen
    }

    /// Root node of the key window (or of the first window if none is key).
    pub fn key_root(&self) -> NodeId {
        self.key
            .and_then(|w| self.window_root(w))
            .unwrap_or(self.main_root)
    }

    /// Create a node with `frame` under `parent`.
    pub fn add_view(&mut self, parent: NodeId, frame: Rect) -> NodeId {
        let node = self.create_node();
        self.set_frame(node, frame);
        self.add_child(parent, node);
        node
    }

    pub fn set_preferred_size(&mut self, node: NodeId, size: Size) {
        if let Some(n) = self.nodes.get_mut(&node) {
            n.preferred = size;
        }
    }

    /// Destroy a node out from under the engine.
    pub fn kill(&mut self, node: NodeId) {
        self.destroy_node(node);
    }

    /// Make every subsequent `rasterize` call fail.
    pub fn fail_snapshots(&mut self, fail: bool) {
        self.fail_snapshots = fail;
    }

    /// Resize the screen and every window with it.
    pub fn resize(&mut self, screen: Size) {
        self.screen = screen;
        let roots: Vec<NodeId> = self.windows.iter().map(|&(_, root)| root).collect();
        for root in roots {
            self.set_frame(root, Rect::from_size(screen));
        }
    }

    pub fn scale(&self, node: NodeId) -> Option<f64> {
        self.nodes.get(&node).map(|n| n.scale)
    }

    pub fn background(&self, node: NodeId) -> Option<PackedRgba> {
        self.nodes.get(&node).map(|n| n.background)
    }

    pub fn children(&self, node: NodeId) -> Vec<NodeId> {
        self.nodes
            .get(&node)
            .map(|n| n.children.clone())
            .unwrap_or_default()
    }

    /// Image displayed by an image node.
    pub fn image_of(&self, node: NodeId) -> Option<ImageId> {
        self.nodes.get(&node).and_then(|n| n.image)
    }

    /// Images rasterized and not yet released.
    pub fn live_images(&self) -> usize {
        self.images.len()
    }

    pub fn window_count(&self) -> usize {
        self.windows.len()
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn ops(&self) -> &[HostOp] {
        &self.ops
    }

    pub fn clear_ops(&mut self) {
        self.ops.clear();
    }

    fn detach(&mut self, node: NodeId) -> bool {
        let Some(parent) = self.nodes.get_mut(&node).and_then(|n| n.parent.take()) else {
            return false;
        };
        if let Some(p) = self.nodes.get_mut(&parent) {
            p.children.retain(|&c| c != node);
        }
        true
    }

    fn with_node(&mut self, node: NodeId, op: HostOp, f: impl FnOnce(&mut HeadlessNode)) -> bool {
        match self.nodes.get_mut(&node) {
            Some(n) => {
                f(n);
                self.ops.push(op);
                true
            }
            None => false,
        }
    }
}

impl SurfaceTree for HeadlessHost {
    fn is_alive(&self, node: NodeId) -> bool {
        self.nodes.contains_key(&node)
    }

    fn parent(&self, node: NodeId) -> Option<NodeId> {
        self.nodes.get(&node).and_then(|n| n.parent)
    }

    fn frame(&self, node: NodeId) -> Option<Rect> {
        self.nodes.get(&node).map(|n| n.frame)
    }

    fn frame_in_window(&self, node: NodeId) -> Option<Rect> {
        let mut frame = self.nodes.get(&node)?.frame;
        let mut cursor = self.parent(node);
        while let Some(ancestor) = cursor {
            let Some(n) = self.nodes.get(&ancestor) else {
                break;
            };
            frame = frame.translate(n.frame.x, n.frame.y);
            cursor = n.parent;
        }
        Some(frame)
    }

    fn preferred_size(&self, node: NodeId) -> Option<Size> {
        self.nodes.get(&node).map(|n| n.preferred)
    }

    fn alpha(&self, node: NodeId) -> Option<f64> {
        self.nodes.get(&node).map(|n| n.alpha)
    }

    fn corner_radius(&self, node: NodeId) -> Option<f64> {
        self.nodes.get(&node).map(|n| n.corner_radius)
    }

    fn set_frame(&mut self, node: NodeId, frame: Rect) -> bool {
        self.with_node(node, HostOp::SetFrame(node, frame), |n| n.frame = frame)
    }

    fn set_alpha(&mut self, node: NodeId, alpha: f64) -> bool {
        self.with_node(node, HostOp::SetAlpha(node, alpha), |n| n.alpha = alpha)
    }

    fn set_scale(&mut self, node: NodeId, scale: f64) -> bool {
        self.with_node(node, HostOp::SetScale(node, scale), |n| n.scale = scale)
    }

    fn set_background(&mut self, node: NodeId, color: PackedRgba) -> bool {
        self.with_node(node, HostOp::SetBackground(node, color), |n| n.background = color)
    }

    fn set_corner_radius(&mut self, node: NodeId, radius: f64) -> bool {
        self.with_node(node, HostOp::SetCornerRadius(node, radius), |n| {
            n.corner_radius = radius;
        })
    }

    fn add_child(&mut self, parent: NodeId, child: NodeId) -> bool {
        if parent == child || !self.is_alive(parent) || !self.is_alive(child) {
            return false;
        }
        self.detach(child);
        if let Some(p) = self.nodes.get_mut(&parent) {
            p.children.push(child);
        }
        if let Some(c) = self.nodes.get_mut(&child) {
            c.parent = Some(parent);
        }
        self.ops.push(HostOp::AddChild { parent, child });
        true
    }

    fn remove_from_parent(&mut self, node: NodeId) -> bool {
        let detached = self.detach(node);
        if detached {
            self.ops.push(HostOp::RemoveFromParent(node));
        }
        detached
    }

    fn create_node(&mut self) -> NodeId {
        let node = NodeId(self.next_node);
        self.next_node += 1;
        self.nodes.insert(node, HeadlessNode::default());
        self.ops.push(HostOp::CreateNode(node));
        node
    }

    fn destroy_node(&mut self, node: NodeId) {
        if !self.is_alive(node) {
            return;
        }
        self.detach(node);
        if let Some(removed) = self.nodes.remove(&node) {
            for child in removed.children {
                if let Some(c) = self.nodes.get_mut(&child) {
                    c.parent = None;
                }
            }
        }
        self.ops.push(HostOp::DestroyNode(node));
    }
}

impl Rasterizer for HeadlessHost {
    fn rasterize(&mut self, node: NodeId) -> Option<ImageId> {
        if self.fail_snapshots || !self.is_alive(node) {
            return None;
        }
        let image = ImageId(self.next_image);
        self.next_image += 1;
        self.images.insert(image, node);
        self.ops.push(HostOp::Rasterize(node, image));
        Some(image)
    }

    fn create_image_node(&mut self, image: ImageId, corner_radius: f64) -> NodeId {
        let node = self.create_node();
        if let Some(n) = self.nodes.get_mut(&node) {
            n.image = Some(image);
            n.corner_radius = corner_radius;
        }
        node
    }

    fn release_image(&mut self, image: ImageId) {
        if self.images.remove(&image).is_some() {
            self.ops.push(HostOp::ReleaseImage(image));
        }
    }
}

impl WindowSystem for HeadlessHost {
    fn key_window(&self) -> Option<WindowId> {
        self.key
    }

    fn create_window(&mut self) -> WindowId {
        let window = WindowId(self.next_window);
        self.next_window += 1;
        let root = self.create_node();
        self.set_frame(root, Rect::from_size(self.screen));
        self.windows.push((window, root));
        self.ops.push(HostOp::CreateWindow(window));
        window
    }

    fn window_root(&self, window: WindowId) -> Option<NodeId> {
        self.windows
            .iter()
            .find(|&&(w, _)| w == window)
            .map(|&(_, root)| root)
    }

    fn make_key(&mut self, window: WindowId) {
        if self.window_root(window).is_some() {
            self.key = Some(window);
            self.ops.push(HostOp::MakeKey(window));
        }
    }

    fn destroy_window(&mut self, window: WindowId) {
        let Some(index) = self.windows.iter().position(|&(w, _)| w == window) else {
            return;
        };
        let (_, root) = self.windows.remove(index);
        self.destroy_node(root);
        if self.key == Some(window) {
            self.key = None;
        }
        self.ops.push(HostOp::DestroyWindow(window));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_with_a_key_window() {
        let host = HeadlessHost::new(Size::new(320.0, 480.0));
        assert_eq!(host.window_count(), 1);
        assert!(host.key_window().is_some());
        assert_eq!(host.frame(host.key_root()), Some(Rect::new(0.0, 0.0, 320.0, 480.0)));
        assert!(host.ops().is_empty());
    }

    #[test]
    fn frame_in_window_accumulates_ancestors() {
        let mut host = HeadlessHost::new(Size::new(320.0, 480.0));
        let root = host.key_root();
        let outer = host.add_view(root, Rect::new(10.0, 20.0, 100.0, 100.0));
        let inner = host.add_view(outer, Rect::new(5.0, 5.0, 10.0, 10.0));
        assert_eq!(host.frame_in_window(inner), Some(Rect::new(15.0, 25.0, 10.0, 10.0)));
    }

    #[test]
    fn dead_nodes_ignore_mutation() {
        let mut host = HeadlessHost::new(Size::new(320.0, 480.0));
        let root = host.key_root();
        let node = host.add_view(root, Rect::new(0.0, 0.0, 10.0, 10.0));
        host.kill(node);
        assert!(!host.set_alpha(node, 0.5));
        assert!(host.frame(node).is_none());
        assert!(host.children(root).is_empty());
    }

    #[test]
    fn add_child_reparents() {
        let mut host = HeadlessHost::new(Size::new(320.0, 480.0));
        let root = host.key_root();
        let a = host.add_view(root, Rect::default());
        let b = host.add_view(root, Rect::default());
        let child = host.add_view(a, Rect::default());
        host.add_child(b, child);
        assert_eq!(host.parent(child), Some(b));
        assert!(host.children(a).is_empty());
    }
}
