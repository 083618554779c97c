//! Bookkeeping overlay compositor
//!
//! Tracks the platform views placed in each frame and acknowledges them on
//! finalize. No pixels are composited.

use parking_lot::Mutex;

use crate::core::config::CompositorConfig;
use crate::render::compositor::{
    CompositorError, CompositorResult, EmbeddedViewParams, ExternalViewEmbedder, FrameAck,
};
use crate::render::{FramebufferId, SurfaceSize};

#[derive(Default)]
struct OverlayState {
    frame_size: SurfaceSize,
    views: Vec<(u64, EmbeddedViewParams)>,
    used: bool,
    finalized: u64,
    pending_failures: u32,
}

/// Overlay compositor that records views without drawing them
pub struct OverlayCompositor {
    intermediate: Option<FramebufferId>,
    state: Mutex<OverlayState>,
}

impl OverlayCompositor {
    /// Create a compositor, optionally rendering GPU content into an intermediate target
    pub fn new(intermediate: Option<FramebufferId>) -> Self {
        Self {
            intermediate,
            state: Mutex::new(OverlayState::default()),
        }
    }

    /// Create a compositor from configuration
    pub fn from_config(config: &CompositorConfig) -> Self {
        Self::new(config.intermediate_framebuffer.map(FramebufferId))
    }

    /// Make the next finalize fail
    pub fn fail_next_finalize(&self) {
        self.state.lock().pending_failures += 1;
    }

    /// Number of frames finalized successfully
    pub fn finalized_frames(&self) -> u64 {
        self.state.lock().finalized
    }

    /// Views placed in the frame being collected
    pub fn pending_views(&self) -> usize {
        self.state.lock().views.len()
    }

    /// Size passed to the last `begin_frame`
    pub fn frame_size(&self) -> SurfaceSize {
        self.state.lock().frame_size
    }
}

impl ExternalViewEmbedder for OverlayCompositor {
    fn begin_frame(&self, size: SurfaceSize) {
        let mut state = self.state.lock();
        state.frame_size = size;
        state.views.clear();
    }

    fn prepare_view(&self, view_id: u64, params: EmbeddedViewParams) -> CompositorResult<()> {
        let mut state = self.state.lock();
        if state.views.iter().any(|(id, _)| *id == view_id) {
            return Err(CompositorError::DuplicateView(view_id));
        }
        state.views.push((view_id, params));
        state.used = true;
        Ok(())
    }

    fn mark_used(&self) {
        self.state.lock().used = true;
    }

    fn is_used(&self) -> bool {
        self.state.lock().used
    }

    fn intermediate_framebuffer(&self) -> Option<FramebufferId> {
        self.intermediate
    }

    fn finalize_frame(&self) -> CompositorResult<FrameAck> {
        let mut state = self.state.lock();
        let overlays = state.views.len();
        state.views.clear();

        if state.pending_failures > 0 {
            state.pending_failures -= 1;
            log::warn!("Overlay finalize failed with {} views pending", overlays);
            return Err(CompositorError::FinalizeFailed("injected finalize failure".to_string()));
        }

        state.finalized += 1;
        log::trace!("Finalized overlay frame {} ({} views)", state.finalized, overlays);
        Ok(FrameAck {
            frame: state.finalized,
            overlays,
        })
    }

    fn reset(&self) {
        let mut state = self.state.lock();
        state.views.clear();
        state.used = false;
        state.pending_failures = 0;
    }
}
