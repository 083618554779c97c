//! External view embedding
//!
//! Platform widgets (video players, maps, text fields) are drawn by the
//! platform, interleaved with GPU content. An [`ExternalViewEmbedder`] collects
//! the overlays of a frame and must acknowledge them before the GPU frame is
//! presented, otherwise overlay and GPU content tear relative to each other.
//!
//! The surface manager owns the embedder and lends it out by reference; it only
//! signals use and waits for the finalize acknowledgment.

use std::sync::Arc;

use thiserror::Error;

use crate::render::{FramebufferId, SurfaceSize};

pub mod overlay;

pub use overlay::OverlayCompositor;

/// Compositor errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CompositorError {
    /// Overlay content for the frame could not be committed
    #[error("Overlay finalize failed: {0}")]
    FinalizeFailed(String),

    /// A view id was prepared twice within one frame
    #[error("Embedded view {0} prepared twice in one frame")]
    DuplicateView(u64),
}

/// Result type for compositor operations
pub type CompositorResult<T> = Result<T, CompositorError>;

/// Placement of one platform view within a frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EmbeddedViewParams {
    /// Top-left corner in physical pixels
    pub origin: (i32, i32),
    /// Size in physical pixels
    pub size: SurfaceSize,
}

impl EmbeddedViewParams {
    /// Create view placement parameters
    pub const fn new(origin: (i32, i32), size: SurfaceSize) -> Self {
        Self { origin, size }
    }
}

/// Acknowledgment that a frame's overlays were committed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameAck {
    /// Sequence number of the finalized frame, starting at 1
    pub frame: u64,
    /// Number of platform views composited in the frame
    pub overlays: usize,
}

/// Overlay compositor consulted on the render path
pub trait ExternalViewEmbedder: Send + Sync {
    /// Start collecting overlays for a frame of the given size
    fn begin_frame(&self, size: SurfaceSize);

    /// Place a platform view in the current frame
    fn prepare_view(&self, view_id: u64, params: EmbeddedViewParams) -> CompositorResult<()>;

    /// Signal that platform content takes part in composition
    fn mark_used(&self);

    /// True once platform content takes part in composition
    fn is_used(&self) -> bool;

    /// Framebuffer the GPU content must render into while overlays are active
    fn intermediate_framebuffer(&self) -> Option<FramebufferId>;

    /// Commit the current frame's overlays
    fn finalize_frame(&self) -> CompositorResult<FrameAck>;

    /// Drop all per-frame overlay state
    fn reset(&self);
}

impl<T: ExternalViewEmbedder + ?Sized> ExternalViewEmbedder for Arc<T> {
    fn begin_frame(&self, size: SurfaceSize) {
        (**self).begin_frame(size);
    }

    fn prepare_view(&self, view_id: u64, params: EmbeddedViewParams) -> CompositorResult<()> {
        (**self).prepare_view(view_id, params)
    }

    fn mark_used(&self) {
        (**self).mark_used();
    }

    fn is_used(&self) -> bool {
        (**self).is_used()
    }

    fn intermediate_framebuffer(&self) -> Option<FramebufferId> {
        (**self).intermediate_framebuffer()
    }

    fn finalize_frame(&self) -> CompositorResult<FrameAck> {
        (**self).finalize_frame()
    }

    fn reset(&self) {
        (**self).reset();
    }
}
