//! GPU surface handed to the rendering backend
//!
//! [`GpuSurfaceGl`] turns the delegate contract into frames: it makes the
//! context current, picks the framebuffer to draw into and presents the result.
//! The backend's cached GL bindings are reset whenever the render target changes.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::render::compositor::ExternalViewEmbedder;
use crate::render::surface::{GlContextResult, GlSurfaceDelegate};
use crate::render::{FramebufferId, SurfaceSize};

/// Rendering backend state tied to the GL context
pub trait BackendContext: Send + Sync {
    /// Name of the backend, for diagnostics
    fn name(&self) -> &str;

    /// Forget cached GL bindings; the render target changed under the backend
    fn reset_context(&self);

    /// Submit all recorded GPU work
    fn flush(&self);
}

/// Backend that performs no rendering and counts calls
#[derive(Debug, Default)]
pub struct NullBackendContext {
    resets: AtomicU64,
    flushes: AtomicU64,
}

impl NullBackendContext {
    /// Create a new null backend
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of context resets
    pub fn resets(&self) -> u64 {
        self.resets.load(Ordering::Relaxed)
    }

    /// Number of flushes
    pub fn flushes(&self) -> u64 {
        self.flushes.load(Ordering::Relaxed)
    }
}

impl BackendContext for NullBackendContext {
    fn name(&self) -> &str {
        "NullBackend"
    }

    fn reset_context(&self) {
        self.resets.fetch_add(1, Ordering::Relaxed);
    }

    fn flush(&self) {
        self.flushes.fetch_add(1, Ordering::Relaxed);
    }
}

/// Framebuffer and size the backend is currently set up for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenderTarget {
    /// Framebuffer being rendered into
    pub framebuffer: FramebufferId,
    /// Drawable size
    pub size: SurfaceSize,
}

/// Render target object consumed by the rendering backend
pub struct GpuSurfaceGl {
    delegate: Arc<dyn GlSurfaceDelegate>,
    backend: Arc<dyn BackendContext>,
    render_target: Option<RenderTarget>,
}

impl GpuSurfaceGl {
    /// Create a GPU surface over a delegate
    pub fn new(delegate: Arc<dyn GlSurfaceDelegate>, backend: Arc<dyn BackendContext>) -> Self {
        log::debug!("Created GPU surface for backend {}", backend.name());
        Self {
            delegate,
            backend,
            render_target: None,
        }
    }

    /// Prepare a frame of the given size
    ///
    /// Returns `None` when the context cannot be made current or the size is
    /// empty. The frame must not be drawn in that case.
    pub fn acquire_frame(&mut self, size: SurfaceSize) -> Option<SurfaceFrame<'_>> {
        if size.is_empty() {
            log::error!("Cannot acquire a frame of empty size {}", size);
            return None;
        }

        let result = self.delegate.gl_context_make_current();
        if let GlContextResult::Failed(err) = result {
            log::error!("Could not make the context current to acquire the frame: {}", err);
            return None;
        }

        let target = RenderTarget {
            framebuffer: self.delegate.gl_context_fbo(),
            size,
        };
        if self.render_target != Some(target) {
            log::debug!("Render target changed to {} at {}", target.framebuffer, target.size);
            self.backend.reset_context();
            self.render_target = Some(target);
        }

        Some(SurfaceFrame {
            surface: self,
            target,
            submitted: false,
        })
    }

    /// Render target of the last acquired frame
    pub const fn render_target(&self) -> Option<RenderTarget> {
        self.render_target
    }

    /// Make the render context current outside of a frame
    pub fn make_render_context_current(&self) -> GlContextResult {
        self.delegate.gl_context_make_current()
    }

    /// Detach the render context from the calling thread
    pub fn clear_render_context(&self) -> bool {
        self.delegate.gl_context_clear_current()
    }

    /// Overlay compositor, if platform views are enabled
    pub fn external_view_embedder(&self) -> Option<&dyn ExternalViewEmbedder> {
        self.delegate.external_view_embedder()
    }

    /// Backend this surface renders with
    pub fn backend(&self) -> &Arc<dyn BackendContext> {
        &self.backend
    }
}

/// A frame being drawn
///
/// Dropping the frame without submitting it discards it.
pub struct SurfaceFrame<'a> {
    surface: &'a GpuSurfaceGl,
    target: RenderTarget,
    submitted: bool,
}

impl SurfaceFrame<'_> {
    /// Framebuffer and size to draw into
    pub const fn target(&self) -> RenderTarget {
        self.target
    }

    /// Overlay compositor for placing platform views in this frame
    pub fn external_view_embedder(&self) -> Option<&dyn ExternalViewEmbedder> {
        self.surface.external_view_embedder()
    }

    /// Flush the backend and present. Returns false if the frame was dropped.
    pub fn submit(mut self) -> bool {
        self.submitted = true;
        self.surface.backend.flush();
        let presented = self.surface.delegate.gl_context_present();
        if !presented {
            log::warn!("Frame at {} was not presented", self.target.size);
        }
        presented
    }
}

impl Drop for SurfaceFrame<'_> {
    fn drop(&mut self) {
        if !self.submitted {
            log::trace!("Discarded unsubmitted frame at {}", self.target.size);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::context::{SurfaceError, SurfaceKind};
    use parking_lot::Mutex;

    struct ScriptedDelegate {
        fbo: Mutex<FramebufferId>,
        fail_make_current: Mutex<bool>,
        presents: AtomicU64,
    }

    impl ScriptedDelegate {
        fn new() -> Self {
            Self {
                fbo: Mutex::new(FramebufferId::DEFAULT),
                fail_make_current: Mutex::new(false),
                presents: AtomicU64::new(0),
            }
        }
    }

    impl GlSurfaceDelegate for ScriptedDelegate {
        fn gl_context_make_current(&self) -> GlContextResult {
            if *self.fail_make_current.lock() {
                GlContextResult::Failed(SurfaceError::InvalidContext)
            } else {
                GlContextResult::Current {
                    target: SurfaceKind::OnScreen,
                    already_current: false,
                }
            }
        }

        fn gl_context_clear_current(&self) -> bool {
            true
        }

        fn gl_context_present(&self) -> bool {
            self.presents.fetch_add(1, Ordering::Relaxed);
            true
        }

        fn gl_context_fbo(&self) -> FramebufferId {
            *self.fbo.lock()
        }

        fn external_view_embedder(&self) -> Option<&dyn ExternalViewEmbedder> {
            None
        }
    }

    #[test]
    fn test_frame_submit_flushes_and_presents() {
        let delegate = Arc::new(ScriptedDelegate::new());
        let backend = Arc::new(NullBackendContext::new());
        let mut surface = GpuSurfaceGl::new(delegate.clone(), backend.clone());

        let frame = surface.acquire_frame(SurfaceSize::new(64, 64)).unwrap();
        assert!(frame.submit());
        assert_eq!(backend.flushes(), 1);
        assert_eq!(delegate.presents.load(Ordering::Relaxed), 1);
    }

    #[test]
    fn test_dropped_frame_is_not_presented() {
        let delegate = Arc::new(ScriptedDelegate::new());
        let backend = Arc::new(NullBackendContext::new());
        let mut surface = GpuSurfaceGl::new(delegate.clone(), backend.clone());

        drop(surface.acquire_frame(SurfaceSize::new(64, 64)));
        assert_eq!(backend.flushes(), 0);
        assert_eq!(delegate.presents.load(Ordering::Relaxed), 0);
    }

    #[test]
    fn test_backend_reset_only_on_target_change() {
        let delegate = Arc::new(ScriptedDelegate::new());
        let backend = Arc::new(NullBackendContext::new());
        let mut surface = GpuSurfaceGl::new(delegate.clone(), backend.clone());

        let size = SurfaceSize::new(800, 600);
        surface.acquire_frame(size).unwrap().submit();
        surface.acquire_frame(size).unwrap().submit();
        assert_eq!(backend.resets(), 1);

        *delegate.fbo.lock() = FramebufferId(4);
        surface.acquire_frame(size).unwrap().submit();
        assert_eq!(backend.resets(), 2);
        assert_eq!(
            surface.render_target(),
            Some(RenderTarget {
                framebuffer: FramebufferId(4),
                size
            })
        );

        surface.acquire_frame(SurfaceSize::new(600, 800)).unwrap().submit();
        assert_eq!(backend.resets(), 3);
    }

    #[test]
    fn test_acquire_aborts_when_context_unavailable() {
        let delegate = Arc::new(ScriptedDelegate::new());
        *delegate.fail_make_current.lock() = true;
        let mut surface = GpuSurfaceGl::new(delegate, Arc::new(NullBackendContext::new()));

        assert!(surface.acquire_frame(SurfaceSize::new(10, 10)).is_none());
        assert!(surface.render_target().is_none());
    }

    #[test]
    fn test_empty_size_rejected() {
        let mut surface = GpuSurfaceGl::new(Arc::new(ScriptedDelegate::new()), Arc::new(NullBackendContext::new()));
        assert!(surface.acquire_frame(SurfaceSize::new(0, 10)).is_none());
    }
}
