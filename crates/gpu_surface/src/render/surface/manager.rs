//! Surface lifecycle manager
//!
//! Owns the on-screen and off-screen surfaces of one graphics context and
//! implements both the platform-surface and the renderer-delegate contracts.
//!
//! # State machine
//!
//! ```text
//! NoWindow ──set_native_window ok──▶ Bound ──resize──▶ Bound
//!    ▲                                 │
//!    └──────── teardown / failure ─────┘
//! ```
//!
//! `set_native_window` always tears the previous surface down first, so a
//! failed rebind ends in `NoWindow`. When the context cannot resize window
//! surfaces in place, a resize recreates the surface; if recreation fails the
//! manager also ends in `NoWindow`, because the old surface had to be destroyed
//! before the window could accept a new one.

use std::sync::{Arc, OnceLock, Weak};

use parking_lot::Mutex;

use crate::core::config::CompositorConfig;
use crate::render::compositor::{ExternalViewEmbedder, OverlayCompositor};
use crate::render::context::{
    ContextCapabilities, DrawableSurface, GraphicsContext, SurfaceError, SurfaceKind,
};
use crate::render::surface::{BackendContext, GlContextResult, GlSurfaceDelegate, GpuSurfaceGl, PlatformSurface};
use crate::render::window::{NativeWindow, WindowMessage};
use crate::render::{FramebufferId, SurfaceSize};

/// Builds the external view embedder on first use
pub type EmbedderFactory = Box<dyn Fn(&CompositorConfig) -> Box<dyn ExternalViewEmbedder> + Send + Sync>;

/// Where the on-screen path currently is
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SurfaceState {
    /// No window and no on-screen surface
    NoWindow,
    /// An on-screen surface is bound to a window
    Bound,
}

#[derive(Default)]
struct OnscreenSlot {
    window: Option<NativeWindow>,
    surface: Option<Box<dyn DrawableSurface>>,
}

struct SurfaceCore {
    context: Arc<dyn GraphicsContext>,
    onscreen: Mutex<OnscreenSlot>,
    offscreen: Option<Box<dyn DrawableSurface>>,
    compositor: CompositorConfig,
    embedder_factory: EmbedderFactory,
    embedder: OnceLock<Box<dyn ExternalViewEmbedder>>,
}

impl SurfaceCore {
    fn new(context: Arc<dyn GraphicsContext>, compositor: CompositorConfig, embedder_factory: EmbedderFactory) -> Self {
        let offscreen = if context.is_valid() && context.capabilities().contains(ContextCapabilities::OFFSCREEN) {
            match context.create_offscreen_surface() {
                Ok(surface) => Some(surface),
                Err(err) => {
                    log::warn!("Running without an off-screen surface: {}", err);
                    None
                }
            }
        } else {
            None
        };

        let compositor = match compositor.validate() {
            Ok(()) => compositor,
            Err(reason) => {
                log::error!("Disabling embedded views: {}", reason);
                CompositorConfig::disabled()
            }
        };

        Self {
            context,
            onscreen: Mutex::new(OnscreenSlot::default()),
            offscreen,
            compositor,
            embedder_factory,
            embedder: OnceLock::new(),
        }
    }

    fn is_valid(&self) -> bool {
        self.context.is_valid()
    }

    fn state(&self) -> SurfaceState {
        if self.onscreen.lock().surface.is_some() {
            SurfaceState::Bound
        } else {
            SurfaceState::NoWindow
        }
    }

    fn teardown(&self, slot: &mut OnscreenSlot) {
        if let Some(surface) = slot.surface.take() {
            if surface.is_current() {
                if let Err(err) = self.context.clear_current() {
                    log::warn!("Could not clear the on-screen context: {}", err);
                }
            }
            drop(surface);
            log::debug!("On-screen surface destroyed");
        }
        slot.window = None;

        if let Some(embedder) = self.embedder.get() {
            embedder.reset();
        }
    }

    fn set_native_window(&self, window: NativeWindow) -> bool {
        if !self.is_valid() {
            log::warn!("Ignoring native window {}: graphics context is not valid", window.id());
            return false;
        }

        let mut slot = self.onscreen.lock();
        self.teardown(&mut slot);

        match self.context.create_onscreen_surface(&window) {
            Ok(surface) => {
                log::debug!("Bound on-screen surface to window {} at {}", window.id(), surface.size());
                slot.surface = Some(surface);
                slot.window = Some(window);
                true
            }
            Err(err) => {
                log::warn!("Could not create on-screen surface for window {}: {}", window.id(), err);
                false
            }
        }
    }

    fn resize(&self, size: SurfaceSize) -> bool {
        let mut guard = self.onscreen.lock();
        let slot = &mut *guard;
        let Some(surface) = slot.surface.as_mut() else {
            log::debug!("Ignoring resize to {} without an on-screen surface", size);
            return false;
        };

        if surface.size() == size {
            return true;
        }

        if self.context.capabilities().contains(ContextCapabilities::RESIZE_IN_PLACE) {
            return match surface.resize(size) {
                Ok(()) => {
                    if let Some(window) = &slot.window {
                        window.set_size(size);
                    }
                    true
                }
                Err(err) => {
                    log::warn!("Could not resize on-screen surface to {}: {}", size, err);
                    false
                }
            };
        }

        let Some(window) = slot.window.clone() else {
            return false;
        };

        if surface.is_current() {
            if let Err(err) = self.context.clear_current() {
                log::warn!("Could not clear the on-screen context before resize: {}", err);
            }
        }
        slot.surface = None;
        window.set_size(size);

        match self.context.create_onscreen_surface(&window) {
            Ok(surface) => {
                let current = surface.make_current();
                slot.surface = Some(surface);
                log::debug!("Recreated on-screen surface at {}", size);
                match current {
                    Ok(()) => true,
                    Err(err) => {
                        log::warn!("Resized surface could not be made current: {}", err);
                        false
                    }
                }
            }
            Err(err) => {
                log::warn!("Could not recreate on-screen surface at {}: {}", size, err);
                slot.window = None;
                false
            }
        }
    }

    fn resource_surface(&self) -> Option<&dyn DrawableSurface> {
        if !self.context.capabilities().contains(ContextCapabilities::RESOURCE_CONTEXT) {
            return None;
        }
        self.offscreen.as_deref()
    }

    fn resource_make_current(&self) -> bool {
        let Some(offscreen) = self.resource_surface() else {
            return false;
        };
        match offscreen.resource_make_current() {
            Ok(()) => true,
            Err(err) => {
                log::warn!("Could not make the resource context current: {}", err);
                false
            }
        }
    }

    fn resource_clear_current(&self) -> bool {
        if self.resource_surface().is_none() {
            return false;
        }
        match self.context.clear_resource_current() {
            Ok(()) => true,
            Err(err) => {
                log::warn!("Could not clear the resource context: {}", err);
                false
            }
        }
    }

    fn active_embedder(&self) -> Option<&dyn ExternalViewEmbedder> {
        self.embedder.get().map(|embedder| &**embedder).filter(|embedder| embedder.is_used())
    }
}

impl GlSurfaceDelegate for SurfaceCore {
    fn gl_context_make_current(&self) -> GlContextResult {
        if !self.is_valid() {
            return GlContextResult::Failed(SurfaceError::InvalidContext);
        }

        let slot = self.onscreen.lock();
        let surface = match (slot.surface.as_deref(), self.offscreen.as_deref()) {
            (Some(onscreen), _) => onscreen,
            (None, Some(offscreen)) => offscreen,
            (None, None) => return GlContextResult::Failed(SurfaceError::NoSurface(SurfaceKind::OffScreen)),
        };
        let target = surface.kind();

        if !surface.is_valid() {
            return GlContextResult::Failed(SurfaceError::SurfaceLost(format!("{target:?} surface is no longer valid")));
        }
        if surface.is_current() {
            return GlContextResult::Current {
                target,
                already_current: true,
            };
        }

        match surface.make_current() {
            Ok(()) => GlContextResult::Current {
                target,
                already_current: false,
            },
            Err(err) => {
                log::warn!("Could not make the {:?} surface current: {}", target, err);
                GlContextResult::Failed(err)
            }
        }
    }

    fn gl_context_clear_current(&self) -> bool {
        match self.context.clear_current() {
            Ok(()) => true,
            Err(err) => {
                log::warn!("Could not clear the render context: {}", err);
                false
            }
        }
    }

    fn gl_context_present(&self) -> bool {
        let slot = self.onscreen.lock();
        let Some(surface) = slot.surface.as_deref() else {
            log::debug!("Present without an on-screen surface");
            return false;
        };

        if let Some(embedder) = self.active_embedder() {
            match embedder.finalize_frame() {
                Ok(ack) => log::trace!("Overlays finalized for frame {} ({} views)", ack.frame, ack.overlays),
                Err(err) => {
                    log::warn!("Dropping frame: {}", err);
                    return false;
                }
            }
        }

        match surface.swap_buffers() {
            Ok(()) => true,
            Err(err) => {
                log::warn!("Present failed: {}", err);
                false
            }
        }
    }

    fn gl_context_fbo(&self) -> FramebufferId {
        if let Some(framebuffer) = self.active_embedder().and_then(|e| e.intermediate_framebuffer()) {
            return framebuffer;
        }

        let slot = self.onscreen.lock();
        slot.surface
            .as_deref()
            .or(self.offscreen.as_deref())
            .map_or(FramebufferId::DEFAULT, |surface| surface.framebuffer())
    }

    fn external_view_embedder(&self) -> Option<&dyn ExternalViewEmbedder> {
        if !self.compositor.embedded_views {
            return None;
        }
        let embedder = self.embedder.get_or_init(|| {
            log::debug!("Creating external view embedder");
            (self.embedder_factory)(&self.compositor)
        });
        Some(&**embedder)
    }
}

impl Drop for SurfaceCore {
    fn drop(&mut self) {
        let slot = self.onscreen.get_mut();
        let holds_current = slot.surface.as_ref().is_some_and(|s| s.is_current())
            || self.offscreen.as_ref().is_some_and(|s| s.is_current());
        if holds_current {
            if let Err(err) = self.context.clear_current() {
                log::warn!("Could not clear the context during shutdown: {}", err);
            }
        }
        slot.surface = None;
        slot.window = None;
        self.offscreen = None;
        log::debug!("Surface manager released");
    }
}

/// Resource-context switching usable from the resource thread
///
/// Does not keep the manager alive; once the manager is gone every call
/// returns false.
#[derive(Clone)]
pub struct ResourceContextHandle {
    core: Weak<SurfaceCore>,
}

impl ResourceContextHandle {
    /// Make the resource context current on the calling thread
    pub fn make_current(&self) -> bool {
        self.core.upgrade().is_some_and(|core| core.resource_make_current())
    }

    /// Detach the resource context from the calling thread
    pub fn clear_current(&self) -> bool {
        self.core.upgrade().is_some_and(|core| core.resource_clear_current())
    }
}

/// Manages the surfaces of one graphics context across window lifecycle events
pub struct SurfaceLifecycleManager {
    core: Arc<SurfaceCore>,
}

impl SurfaceLifecycleManager {
    /// Create a manager whose embedder, when enabled, is an [`OverlayCompositor`]
    pub fn new(context: Arc<dyn GraphicsContext>, compositor: CompositorConfig) -> Self {
        Self::with_embedder_factory(context, compositor, |config| {
            Box::new(OverlayCompositor::from_config(config)) as Box<dyn ExternalViewEmbedder>
        })
    }

    /// Create a manager with a custom external view embedder
    pub fn with_embedder_factory<F>(context: Arc<dyn GraphicsContext>, compositor: CompositorConfig, factory: F) -> Self
    where
        F: Fn(&CompositorConfig) -> Box<dyn ExternalViewEmbedder> + Send + Sync + 'static,
    {
        let core = SurfaceCore::new(context, compositor, Box::new(factory));
        log::debug!(
            "Surface manager created (valid: {}, off-screen: {})",
            core.is_valid(),
            core.offscreen.is_some()
        );
        Self { core: Arc::new(core) }
    }

    /// Apply a window lifecycle message from the UI thread
    pub fn apply(&mut self, message: WindowMessage) -> bool {
        match message {
            WindowMessage::Attach(window) => self.set_native_window(window),
            WindowMessage::Resize(size) => self.on_screen_surface_resize(size),
            WindowMessage::Teardown => {
                self.teardown_on_screen_context();
                true
            }
        }
    }

    /// Where the on-screen path currently is
    pub fn state(&self) -> SurfaceState {
        self.core.state()
    }

    /// Window the on-screen surface is bound to
    pub fn native_window(&self) -> Option<NativeWindow> {
        self.core.onscreen.lock().window.clone()
    }

    /// Size of the on-screen surface
    pub fn on_screen_size(&self) -> Option<SurfaceSize> {
        self.core.onscreen.lock().surface.as_ref().map(|surface| surface.size())
    }

    /// True if an off-screen surface exists
    pub fn has_offscreen_surface(&self) -> bool {
        self.core.offscreen.is_some()
    }

    /// Graphics context this manager was built with
    pub fn context(&self) -> &Arc<dyn GraphicsContext> {
        &self.core.context
    }

    /// Handle for switching the resource context from another thread
    pub fn resource_context(&self) -> ResourceContextHandle {
        ResourceContextHandle {
            core: Arc::downgrade(&self.core),
        }
    }
}

impl PlatformSurface for SurfaceLifecycleManager {
    fn is_valid(&self) -> bool {
        self.core.is_valid()
    }

    fn set_native_window(&mut self, window: NativeWindow) -> bool {
        self.core.set_native_window(window)
    }

    fn on_screen_surface_resize(&mut self, size: SurfaceSize) -> bool {
        self.core.resize(size)
    }

    fn create_gpu_surface(&self, backend: Arc<dyn BackendContext>) -> Option<GpuSurfaceGl> {
        if !self.core.is_valid() {
            log::warn!("Cannot create a GPU surface without a valid graphics context");
            return None;
        }
        let delegate: Arc<dyn GlSurfaceDelegate> = self.core.clone();
        Some(GpuSurfaceGl::new(delegate, backend))
    }

    fn teardown_on_screen_context(&mut self) {
        let mut slot = self.core.onscreen.lock();
        self.core.teardown(&mut slot);
    }

    fn resource_context_make_current(&self) -> bool {
        self.core.resource_make_current()
    }

    fn resource_context_clear_current(&self) -> bool {
        self.core.resource_clear_current()
    }
}

impl GlSurfaceDelegate for SurfaceLifecycleManager {
    fn gl_context_make_current(&self) -> GlContextResult {
        self.core.gl_context_make_current()
    }

    fn gl_context_clear_current(&self) -> bool {
        self.core.gl_context_clear_current()
    }

    fn gl_context_present(&self) -> bool {
        self.core.gl_context_present()
    }

    fn gl_context_fbo(&self) -> FramebufferId {
        self.core.gl_context_fbo()
    }

    fn external_view_embedder(&self) -> Option<&dyn ExternalViewEmbedder> {
        self.core.external_view_embedder()
    }
}
