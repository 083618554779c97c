//! Headless graphics context
//!
//! An in-process [`GraphicsContext`] that follows EGL's binding rules without a
//! GPU. It tracks which surface each thread has current, refuses to make a
//! context current on two threads at once, refuses a second surface on the same
//! window, and notices when a window was destroyed underneath a surface.
//!
//! Tests use the counters and fault injection hooks to observe the surface
//! manager. The demo application uses it as its context provider.

use std::collections::HashMap;
use std::sync::Arc;
use std::thread::{self, ThreadId};

use parking_lot::Mutex;
use slotmap::{new_key_type, SlotMap};

use crate::core::config::ContextConfig;
use crate::render::context::{
    ContextCapabilities, ContextRole, DrawableSurface, GraphicsContext, SurfaceError, SurfaceKind,
    SurfaceResult,
};
use crate::render::window::NativeWindow;
use crate::render::{FramebufferId, SurfaceSize};

new_key_type! {
    /// Registry key of a headless surface
    pub struct SurfaceKey;
}

/// What a thread currently has bound
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Binding {
    /// Context bound on the thread
    pub role: ContextRole,
    /// Surface bound on the thread
    pub surface: SurfaceKey,
    /// Kind of the bound surface
    pub kind: SurfaceKind,
}

/// Size of the pixel buffer backing off-screen surfaces
const OFFSCREEN_SIZE: SurfaceSize = SurfaceSize::new(1, 1);

struct SurfaceRecord {
    kind: SurfaceKind,
    size: SurfaceSize,
    window: Option<NativeWindow>,
}

#[derive(Default)]
struct FaultPlan {
    onscreen_creation: u32,
    make_current: u32,
    swap: u32,
    resize: u32,
}

struct HeadlessState {
    surfaces: SlotMap<SurfaceKey, SurfaceRecord>,
    bindings: HashMap<ThreadId, Binding>,
    faults: FaultPlan,
    bind_count: u64,
    swap_count: u64,
    next_framebuffer: u32,
}

struct HeadlessShared {
    config: ContextConfig,
    capabilities: ContextCapabilities,
    valid: bool,
    state: Mutex<HeadlessState>,
}

/// In-process graphics context following EGL binding rules
pub struct HeadlessContext {
    shared: Arc<HeadlessShared>,
}

impl HeadlessContext {
    /// Create a context with the capabilities implied by `config`
    ///
    /// An off-screen surface is always supported. A resource context exists
    /// when the configuration asks for shared resources.
    pub fn new(config: ContextConfig) -> Self {
        let mut capabilities = ContextCapabilities::OFFSCREEN;
        if config.wants_resource_context() {
            capabilities |= ContextCapabilities::RESOURCE_CONTEXT;
        }
        Self::with_capabilities(config, capabilities)
    }

    /// Create a context, failing instead of producing an invalid one
    pub fn try_new(config: ContextConfig) -> SurfaceResult<Self> {
        config.validate().map_err(SurfaceError::InvalidConfig)?;
        Ok(Self::new(config))
    }

    /// Create a context with explicit capabilities
    pub fn with_capabilities(config: ContextConfig, capabilities: ContextCapabilities) -> Self {
        let valid = match config.validate() {
            Ok(()) => true,
            Err(reason) => {
                log::error!("Could not create graphics context: {}", reason);
                false
            }
        };

        Self {
            shared: Arc::new(HeadlessShared {
                config,
                capabilities,
                valid,
                state: Mutex::new(HeadlessState {
                    surfaces: SlotMap::with_key(),
                    bindings: HashMap::new(),
                    faults: FaultPlan::default(),
                    bind_count: 0,
                    swap_count: 0,
                    next_framebuffer: 1,
                }),
            }),
        }
    }

    /// Number of live surfaces of a kind
    pub fn live_surfaces(&self, kind: SurfaceKind) -> usize {
        self.shared
            .state
            .lock()
            .surfaces
            .values()
            .filter(|record| record.kind == kind)
            .count()
    }

    /// What the calling thread has current, if anything
    pub fn current_binding(&self) -> Option<Binding> {
        self.shared.state.lock().bindings.get(&thread::current().id()).copied()
    }

    /// Number of threads with something current
    pub fn bound_thread_count(&self) -> usize {
        self.shared.state.lock().bindings.len()
    }

    /// Number of times a thread's binding actually changed
    pub fn bind_count(&self) -> u64 {
        self.shared.state.lock().bind_count
    }

    /// Number of successful swaps
    pub fn swap_count(&self) -> u64 {
        self.shared.state.lock().swap_count
    }

    /// Make the next on-screen surface creation fail
    pub fn fail_next_onscreen_surface(&self) {
        self.shared.state.lock().faults.onscreen_creation += 1;
    }

    /// Make the next make-current fail
    pub fn fail_next_make_current(&self) {
        self.shared.state.lock().faults.make_current += 1;
    }

    /// Make the next swap fail
    pub fn fail_next_swap(&self) {
        self.shared.state.lock().faults.swap += 1;
    }

    /// Make the next in-place resize fail
    pub fn fail_next_resize(&self) {
        self.shared.state.lock().faults.resize += 1;
    }

    fn register(&self, kind: SurfaceKind, size: SurfaceSize, window: Option<NativeWindow>) -> HeadlessSurface {
        let mut state = self.shared.state.lock();
        let framebuffer = match kind {
            SurfaceKind::OnScreen => FramebufferId::DEFAULT,
            SurfaceKind::OffScreen => {
                let id = state.next_framebuffer;
                state.next_framebuffer += 1;
                FramebufferId(id)
            }
        };
        let key = state.surfaces.insert(SurfaceRecord { kind, size, window });
        drop(state);

        log::debug!("Created {:?} surface {:?} ({}, {})", kind, key, size, framebuffer);
        HeadlessSurface {
            shared: Arc::clone(&self.shared),
            key,
            kind,
            framebuffer,
        }
    }
}

impl GraphicsContext for HeadlessContext {
    fn is_valid(&self) -> bool {
        self.shared.valid
    }

    fn config(&self) -> &ContextConfig {
        &self.shared.config
    }

    fn capabilities(&self) -> ContextCapabilities {
        self.shared.capabilities
    }

    fn create_onscreen_surface(&self, window: &NativeWindow) -> SurfaceResult<Box<dyn DrawableSurface>> {
        if !self.shared.valid {
            return Err(SurfaceError::InvalidContext);
        }
        if !window.is_valid() {
            return Err(SurfaceError::InvalidWindow { id: window.id() });
        }

        {
            let mut state = self.shared.state.lock();
            if state.faults.onscreen_creation > 0 {
                state.faults.onscreen_creation -= 1;
                return Err(SurfaceError::CreationFailed("injected window surface failure".to_string()));
            }
            let in_use = state
                .surfaces
                .values()
                .any(|record| record.window.as_ref().is_some_and(|w| w.id() == window.id()));
            if in_use {
                return Err(SurfaceError::WindowInUse { id: window.id() });
            }
        }

        Ok(Box::new(self.register(SurfaceKind::OnScreen, window.size(), Some(window.clone()))))
    }

    fn create_offscreen_surface(&self) -> SurfaceResult<Box<dyn DrawableSurface>> {
        if !self.shared.valid {
            return Err(SurfaceError::InvalidContext);
        }
        if !self.shared.capabilities.contains(ContextCapabilities::OFFSCREEN) {
            return Err(SurfaceError::Unsupported("off-screen surfaces"));
        }

        Ok(Box::new(self.register(SurfaceKind::OffScreen, OFFSCREEN_SIZE, None)))
    }

    fn clear_current(&self) -> SurfaceResult<()> {
        if !self.shared.valid {
            return Err(SurfaceError::InvalidContext);
        }
        if let Some(binding) = self.shared.state.lock().bindings.remove(&thread::current().id()) {
            log::trace!("Cleared {:?} context from {:?}", binding.role, thread::current().id());
        }
        Ok(())
    }

    fn clear_resource_current(&self) -> SurfaceResult<()> {
        if !self.shared.valid {
            return Err(SurfaceError::InvalidContext);
        }
        if !self.shared.capabilities.contains(ContextCapabilities::RESOURCE_CONTEXT) {
            return Err(SurfaceError::Unsupported("resource context"));
        }

        let me = thread::current().id();
        let mut state = self.shared.state.lock();
        if state.bindings.get(&me).is_some_and(|b| b.role == ContextRole::Resource) {
            state.bindings.remove(&me);
            log::trace!("Cleared resource context from {:?}", me);
        }
        Ok(())
    }
}

/// Surface created by [`HeadlessContext`]
pub struct HeadlessSurface {
    shared: Arc<HeadlessShared>,
    key: SurfaceKey,
    kind: SurfaceKind,
    framebuffer: FramebufferId,
}

impl HeadlessSurface {
    /// Registry key of this surface
    pub fn key(&self) -> SurfaceKey {
        self.key
    }

    fn check_alive(&self, state: &HeadlessState) -> SurfaceResult<()> {
        let record = state
            .surfaces
            .get(self.key)
            .ok_or_else(|| SurfaceError::SurfaceLost(format!("surface {:?} destroyed", self.key)))?;
        match &record.window {
            Some(window) if !window.is_valid() => Err(SurfaceError::SurfaceLost(format!(
                "native window {} destroyed",
                window.id()
            ))),
            _ => Ok(()),
        }
    }

    fn bind(&self, role: ContextRole) -> SurfaceResult<()> {
        if role == ContextRole::Resource
            && !self.shared.capabilities.contains(ContextCapabilities::RESOURCE_CONTEXT)
        {
            return Err(SurfaceError::Unsupported("resource context"));
        }

        let mut state = self.shared.state.lock();
        self.check_alive(&state)?;

        if state.faults.make_current > 0 {
            state.faults.make_current -= 1;
            return Err(SurfaceError::SurfaceLost("injected make-current failure".to_string()));
        }

        let me = thread::current().id();
        let busy = state
            .bindings
            .iter()
            .any(|(thread, binding)| *thread != me && binding.role == role);
        if busy {
            return Err(SurfaceError::ContextBusy { role });
        }

        let binding = Binding {
            role,
            surface: self.key,
            kind: self.kind,
        };
        if state.bindings.get(&me) != Some(&binding) {
            state.bindings.insert(me, binding);
            state.bind_count += 1;
        }
        Ok(())
    }
}

impl DrawableSurface for HeadlessSurface {
    fn kind(&self) -> SurfaceKind {
        self.kind
    }

    fn is_valid(&self) -> bool {
        self.check_alive(&self.shared.state.lock()).is_ok()
    }

    fn size(&self) -> SurfaceSize {
        self.shared
            .state
            .lock()
            .surfaces
            .get(self.key)
            .map_or_else(SurfaceSize::default, |record| record.size)
    }

    fn framebuffer(&self) -> FramebufferId {
        self.framebuffer
    }

    fn make_current(&self) -> SurfaceResult<()> {
        self.bind(ContextRole::Render)
    }

    fn resource_make_current(&self) -> SurfaceResult<()> {
        self.bind(ContextRole::Resource)
    }

    fn is_current(&self) -> bool {
        self.shared
            .state
            .lock()
            .bindings
            .get(&thread::current().id())
            .is_some_and(|binding| binding.surface == self.key)
    }

    fn swap_buffers(&self) -> SurfaceResult<()> {
        let mut state = self.shared.state.lock();
        self.check_alive(&state)
            .map_err(|e| SurfaceError::SwapFailed(e.to_string()))?;

        let current = state.bindings.get(&thread::current().id()).map(|b| b.surface);
        if current != Some(self.key) {
            return Err(SurfaceError::SwapFailed("surface is not current on this thread".to_string()));
        }

        if state.faults.swap > 0 {
            state.faults.swap -= 1;
            return Err(SurfaceError::SwapFailed("injected swap failure".to_string()));
        }

        state.swap_count += 1;
        Ok(())
    }

    fn resize(&mut self, size: SurfaceSize) -> SurfaceResult<()> {
        if !self.shared.capabilities.contains(ContextCapabilities::RESIZE_IN_PLACE) {
            return Err(SurfaceError::Unsupported("resize in place"));
        }

        let mut state = self.shared.state.lock();
        self.check_alive(&state)?;
        if state.faults.resize > 0 {
            state.faults.resize -= 1;
            return Err(SurfaceError::CreationFailed("injected resize failure".to_string()));
        }

        if let Some(record) = state.surfaces.get_mut(self.key) {
            record.size = size;
        }
        Ok(())
    }
}

impl Drop for HeadlessSurface {
    fn drop(&mut self) {
        let mut state = self.shared.state.lock();
        state.surfaces.remove(self.key);
        // EGL defers destruction of a current surface; treat it as unbound instead
        let key = self.key;
        state.bindings.retain(|_, binding| binding.surface != key);
        log::debug!("Destroyed {:?} surface {:?}", self.kind, key);
    }
}
