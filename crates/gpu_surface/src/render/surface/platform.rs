//! Platform-surface contract
//!
//! Operations the platform side drives in response to native window lifecycle
//! events. All on-screen mutations are serialized on the render thread; the
//! resource pair may be switched from the resource thread at the same time.

use std::sync::Arc;

use crate::render::surface::{BackendContext, GpuSurfaceGl};
use crate::render::window::NativeWindow;
use crate::render::SurfaceSize;

/// Surface lifecycle operations driven by the platform
pub trait PlatformSurface {
    /// True if the graphics context was constructed successfully
    fn is_valid(&self) -> bool;

    /// Bind a fresh on-screen surface to `window`, tearing down any previous one
    ///
    /// On failure no on-screen surface exists and no window is retained. The
    /// failure is recoverable; a later call may succeed.
    fn set_native_window(&mut self, window: NativeWindow) -> bool;

    /// Follow a geometry change of the bound window
    ///
    /// Returns false without touching anything when no on-screen surface exists.
    fn on_screen_surface_resize(&mut self, size: SurfaceSize) -> bool;

    /// Create the render target object handed to the rendering backend
    fn create_gpu_surface(&self, backend: Arc<dyn BackendContext>) -> Option<GpuSurfaceGl>;

    /// Release the on-screen surface and the window. Safe to call repeatedly.
    fn teardown_on_screen_context(&mut self);

    /// Make the resource context current on the calling thread
    fn resource_context_make_current(&self) -> bool;

    /// Detach the resource context from the calling thread
    fn resource_context_clear_current(&self) -> bool;
}
