//! Renderer-delegate contract
//!
//! The rendering backend calls these once per frame on the render thread.

use crate::render::compositor::ExternalViewEmbedder;
use crate::render::context::{SurfaceError, SurfaceKind};
use crate::render::FramebufferId;

/// Outcome of making the render context current
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GlContextResult {
    /// A surface is current on the calling thread
    Current {
        /// Surface the context was bound to
        target: SurfaceKind,
        /// The binding was already in place and nothing was rebound
        already_current: bool,
    },
    /// Nothing usable is current; the frame must be aborted
    Failed(SurfaceError),
}

impl GlContextResult {
    /// True when drawing may proceed
    pub const fn succeeded(&self) -> bool {
        matches!(self, Self::Current { .. })
    }

    /// Failure reason, if any
    pub const fn error(&self) -> Option<&SurfaceError> {
        match self {
            Self::Failed(err) => Some(err),
            Self::Current { .. } => None,
        }
    }
}

/// Context and present operations consumed by the rendering backend
pub trait GlSurfaceDelegate: Send + Sync {
    /// Make the on-screen surface current, or the off-screen one without a window
    fn gl_context_make_current(&self) -> GlContextResult;

    /// Detach the render context from the calling thread
    fn gl_context_clear_current(&self) -> bool;

    /// Present the completed frame
    ///
    /// When platform views are composited, their overlays are finalized first
    /// and a finalize failure drops the frame.
    fn gl_context_present(&self) -> bool;

    /// Framebuffer the backend must render into
    fn gl_context_fbo(&self) -> FramebufferId;

    /// Overlay compositor, if platform views are enabled
    fn external_view_embedder(&self) -> Option<&dyn ExternalViewEmbedder>;
}
