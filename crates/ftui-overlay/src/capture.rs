#![forbid(unsafe_code)]

//! Snapshot capture and flight ghosts.
//!
//! A flight transition morphs an anchor element into the overlay (and back).
//! The live content cannot be stretched between two unrelated sizes, so the
//! session animates still images instead:
//!
//! - the anchor is hidden and an image of it rides the container,
//! - the live content is hidden and an image of it (or of the configured
//!   transition element) rides the container too,
//! - the two images cross-fade as the container moves.
//!
//! [`GhostPair::teardown`] puts everything back. It is idempotent and restores
//! the alphas observed at build time, not hard-coded values.

use ftui_core::geometry::{Rect, Size};
use tracing::warn;

use crate::error::{OverlayError, Result, SnapshotFailureReason};
use crate::host::{ImageId, NodeId, OverlayHost};

/// An immutable still image of a node.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ImageSnapshot {
    pub image: ImageId,
    pub size: Size,
    pub corner_radius: f64,
}

/// Rasterize `node` at its current bounds.
pub fn capture<H: OverlayHost + ?Sized>(host: &mut H, node: NodeId) -> Result<ImageSnapshot> {
    let failure = |reason| OverlayError::SnapshotFailure { node, reason };

    if !host.is_alive(node) {
        return Err(failure(SnapshotFailureReason::DeadSource));
    }
    let frame = host
        .frame(node)
        .ok_or(failure(SnapshotFailureReason::DeadSource))?;
    if frame.is_empty() {
        return Err(failure(SnapshotFailureReason::EmptyBounds));
    }
    let corner_radius = host.corner_radius(node).unwrap_or(0.0);
    let image = host
        .rasterize(node)
        .ok_or(failure(SnapshotFailureReason::RasterizerDeclined))?;

    Ok(ImageSnapshot {
        image,
        size: frame.size(),
        corner_radius,
    })
}

/// A snapshot displayed by a host node.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ghost {
    pub node: NodeId,
    pub snapshot: ImageSnapshot,
}

impl Ghost {
    fn spawn<H: OverlayHost + ?Sized>(host: &mut H, snapshot: ImageSnapshot, parent: NodeId) -> Self {
        let node = host.create_image_node(snapshot.image, snapshot.corner_radius);
        host.add_child(parent, node);
        Self { node, snapshot }
    }

    fn destroy<H: OverlayHost + ?Sized>(self, host: &mut H) {
        host.remove_from_parent(self.node);
        host.destroy_node(self.node);
        host.release_image(self.snapshot.image);
    }
}

/// Which way the flight goes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlightLeg {
    /// Anchor morphs into the overlay.
    Present,
    /// Overlay morphs back into the anchor.
    Dismiss,
}

/// Anchor and content ghosts for one flight leg.
#[derive(Debug)]
pub struct GhostPair {
    leg: FlightLeg,
    anchor: NodeId,
    anchor_alpha: f64,
    anchor_ghost: Ghost,
    content: NodeId,
    content_alpha: f64,
    content_ghost: Ghost,
    torn_down: bool,
}

impl GhostPair {
    /// Capture both sides and hide the live nodes.
    ///
    /// `content_source` is the node imaged for the overlay side (the content
    /// itself or a configured transition element). Ghosts are attached to
    /// `container` and follow its frame. On any capture failure nothing is
    /// hidden, partial images are released, and the error is returned so the
    /// caller can fall back to animating the container directly.
    pub fn build<H: OverlayHost + ?Sized>(
        host: &mut H,
        leg: FlightLeg,
        anchor: NodeId,
        content: NodeId,
        content_source: NodeId,
        container: NodeId,
    ) -> Result<Self> {
        let anchor_snapshot = capture(host, anchor)?;
        let content_snapshot = match capture(host, content_source) {
            Ok(snapshot) => snapshot,
            Err(err) => {
                host.release_image(anchor_snapshot.image);
                return Err(err);
            }
        };

        let anchor_alpha = host.alpha(anchor).unwrap_or(1.0);
        let content_alpha = host.alpha(content).unwrap_or(1.0);
        host.set_alpha(anchor, 0.0);
        host.set_alpha(content, 0.0);

        let anchor_ghost = Ghost::spawn(host, anchor_snapshot, container);
        let content_ghost = Ghost::spawn(host, content_snapshot, container);

        let container_size = host.frame(container).unwrap_or_default().size();
        let pair = Self {
            leg,
            anchor,
            anchor_alpha,
            anchor_ghost,
            content,
            content_alpha,
            content_ghost,
            torn_down: false,
        };
        pair.apply(host, 0.0, container_size);
        Ok(pair)
    }

    /// Like [`build`](Self::build), but log and return `None` on failure.
    pub fn try_build<H: OverlayHost + ?Sized>(
        host: &mut H,
        leg: FlightLeg,
        anchor: NodeId,
        content: NodeId,
        content_source: NodeId,
        container: NodeId,
    ) -> Option<Self> {
        match Self::build(host, leg, anchor, content, content_source, container) {
            Ok(pair) => Some(pair),
            Err(err) => {
                warn!(error = %err, ?leg, "flight snapshot failed; animating container directly");
                None
            }
        }
    }

    pub fn leg(&self) -> FlightLeg {
        self.leg
    }

    pub fn anchor(&self) -> NodeId {
        self.anchor
    }

    pub fn anchor_ghost(&self) -> Ghost {
        self.anchor_ghost
    }

    pub fn content_ghost(&self) -> Ghost {
        self.content_ghost
    }

    /// Fit both ghosts to the container and cross-fade at eased progress `t`.
    pub fn apply<H: OverlayHost + ?Sized>(&self, host: &mut H, t: f64, container_size: Size) {
        if self.torn_down {
            return;
        }
        let t = t.clamp(0.0, 1.0);
        let (anchor_alpha, content_alpha) = match self.leg {
            FlightLeg::Present => (1.0 - t, t),
            FlightLeg::Dismiss => (t, 1.0 - t),
        };
        let bounds = Rect::from_size(container_size);
        host.set_frame(self.anchor_ghost.node, bounds);
        host.set_frame(self.content_ghost.node, bounds);
        host.set_alpha(self.anchor_ghost.node, anchor_alpha);
        host.set_alpha(self.content_ghost.node, content_alpha);
    }

    /// Release images, remove ghost nodes, restore saved alphas.
    pub fn teardown<H: OverlayHost + ?Sized>(&mut self, host: &mut H) {
        if self.torn_down {
            return;
        }
        self.torn_down = true;
        self.anchor_ghost.destroy(host);
        self.content_ghost.destroy(host);
        // Either node may be gone by now; the host ignores dead handles.
        host.set_alpha(self.anchor, self.anchor_alpha);
        host.set_alpha(self.content, self.content_alpha);
    }

    pub fn is_torn_down(&self) -> bool {
        self.torn_down
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::SurfaceTree;
    use crate::testing::HeadlessHost;
    use ftui_core::geometry::Rect;

    fn host_with_nodes() -> (HeadlessHost, NodeId, NodeId, NodeId) {
        let mut host = HeadlessHost::new(Size::new(400.0, 800.0));
        let root = host.key_root();
        let anchor = host.add_view(root, Rect::new(10.0, 10.0, 40.0, 40.0));
        let content = host.add_view(root, Rect::new(0.0, 0.0, 300.0, 300.0));
        let container = host.add_view(root, Rect::new(10.0, 10.0, 40.0, 40.0));
        (host, anchor, content, container)
    }

    #[test]
    fn capture_reports_failure_reasons() {
        let (mut host, anchor, _, _) = host_with_nodes();
        let root = host.key_root();
        let empty = host.add_view(root, Rect::new(0.0, 0.0, 0.0, 20.0));
        assert!(matches!(
            capture(&mut host, empty),
            Err(OverlayError::SnapshotFailure { reason: SnapshotFailureReason::EmptyBounds, .. })
        ));

        host.kill(anchor);
        assert!(matches!(
            capture(&mut host, anchor),
            Err(OverlayError::SnapshotFailure { reason: SnapshotFailureReason::DeadSource, .. })
        ));
    }

    #[test]
    fn capture_keeps_size_and_radius() {
        let (mut host, anchor, _, _) = host_with_nodes();
        host.set_corner_radius(anchor, 6.0);
        let snapshot = capture(&mut host, anchor).expect("snapshot");
        assert_eq!(snapshot.size, Size::new(40.0, 40.0));
        assert_eq!(snapshot.corner_radius, 6.0);
    }

    #[test]
    fn declined_rasterizer_fails_capture() {
        let (mut host, anchor, _, _) = host_with_nodes();
        host.fail_snapshots(true);
        assert!(matches!(
            capture(&mut host, anchor),
            Err(OverlayError::SnapshotFailure { reason: SnapshotFailureReason::RasterizerDeclined, .. })
        ));
    }

    #[test]
    fn pair_hides_then_restores_saved_alpha() {
        let (mut host, anchor, content, container) = host_with_nodes();
        host.set_alpha(anchor, 0.6);

        let mut pair = GhostPair::build(&mut host, FlightLeg::Present, anchor, content, content, container)
            .expect("ghosts");
        assert_eq!(host.alpha(anchor), Some(0.0));
        assert_eq!(host.alpha(content), Some(0.0));
        assert_eq!(host.alpha(pair.anchor_ghost().node), Some(1.0));
        assert_eq!(host.alpha(pair.content_ghost().node), Some(0.0));

        pair.apply(&mut host, 0.25, Size::new(100.0, 100.0));
        assert_eq!(host.alpha(pair.anchor_ghost().node), Some(0.75));
        assert_eq!(host.frame(pair.content_ghost().node), Some(Rect::new(0.0, 0.0, 100.0, 100.0)));

        let ghost = pair.anchor_ghost().node;
        pair.teardown(&mut host);
        pair.teardown(&mut host);
        assert!(!host.is_alive(ghost));
        assert_eq!(host.alpha(anchor), Some(0.6));
        assert_eq!(host.alpha(content), Some(1.0));
        assert_eq!(host.live_images(), 0);
    }

    #[test]
    fn failed_content_capture_releases_anchor_image() {
        let (mut host, anchor, _, container) = host_with_nodes();
        let root = host.key_root();
        let empty = host.add_view(root, Rect::new(0.0, 0.0, 0.0, 0.0));
        assert!(GhostPair::try_build(&mut host, FlightLeg::Dismiss, anchor, empty, empty, container).is_none());
        assert_eq!(host.live_images(), 0);
        assert_eq!(host.alpha(anchor), Some(1.0));
    }
}
