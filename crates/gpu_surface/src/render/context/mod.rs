//! Graphics context collaborators
//!
//! The surface manager does not talk to EGL (or any other windowing API)
//! directly. It consumes a [`GraphicsContext`] supplied at construction, which
//! owns the render context, the optional resource context, and knows how to
//! create surfaces compatible with both.
//!
//! Current-ness is per thread, as with EGL: `make_current` binds a context and
//! a surface to the calling thread, `clear_current` unbinds whatever the
//! context has current on the calling thread, and a context can be current on
//! at most one thread at a time.

use bitflags::bitflags;
use thiserror::Error;

use crate::core::config::ContextConfig;
use crate::render::window::NativeWindow;
use crate::render::{FramebufferId, SurfaceSize};

pub mod headless;

pub use headless::{Binding, HeadlessContext};

/// Surface and context errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SurfaceError {
    /// The graphics context failed to initialize and can never be used
    #[error("Graphics context is not valid")]
    InvalidContext,

    /// The context configuration cannot produce a usable context
    #[error("Invalid context configuration: {0}")]
    InvalidConfig(String),

    /// The native window is null or was destroyed by the platform
    #[error("Native window {id} is not valid")]
    InvalidWindow {
        /// Id of the rejected window
        id: u64,
    },

    /// Another surface is already bound to the native window
    #[error("Native window {id} already has a surface")]
    WindowInUse {
        /// Id of the contested window
        id: u64,
    },

    /// Surface creation failed for a platform reason
    #[error("Surface creation failed: {0}")]
    CreationFailed(String),

    /// The context is current on a different thread
    #[error("{role:?} context is current on another thread")]
    ContextBusy {
        /// Which context was contended
        role: ContextRole,
    },

    /// The surface was destroyed or its window went away
    #[error("Surface lost: {0}")]
    SurfaceLost(String),

    /// Presenting the back buffer failed
    #[error("Swap failed: {0}")]
    SwapFailed(String),

    /// The operation needs a surface that does not exist
    #[error("No {0:?} surface")]
    NoSurface(SurfaceKind),

    /// The context does not support the operation
    #[error("Unsupported operation: {0}")]
    Unsupported(&'static str),

    /// The raw window handle belongs to an unsupported platform
    #[error("Unsupported window handle: {0}")]
    UnsupportedWindowHandle(String),
}

/// Result type for surface operations
pub type SurfaceResult<T> = Result<T, SurfaceError>;

/// Whether a surface targets a window or lives off screen
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SurfaceKind {
    /// Window surface presented to the display
    OnScreen,
    /// Pixel buffer surface with no window
    OffScreen,
}

/// Which of the two graphics contexts an operation targets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContextRole {
    /// Context used by the render thread
    Render,
    /// Context shared with the render context, used by the resource thread
    Resource,
}

bitflags! {
    /// Optional features of a graphics context
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct ContextCapabilities: u32 {
        /// The context can operate without a window via an off-screen surface
        const OFFSCREEN = 1 << 0;
        /// A resource context sharing the render context's objects exists
        const RESOURCE_CONTEXT = 1 << 1;
        /// Window surfaces can be resized without being recreated
        const RESIZE_IN_PLACE = 1 << 2;
    }
}

/// Owner of the render and resource contexts
///
/// Supplied once to the surface manager and fixed for its lifetime.
pub trait GraphicsContext: Send + Sync {
    /// True if the contexts were created successfully
    fn is_valid(&self) -> bool;

    /// Configuration the contexts were created with
    fn config(&self) -> &ContextConfig;

    /// Optional features this context supports
    fn capabilities(&self) -> ContextCapabilities;

    /// Create a window surface compatible with the render context
    fn create_onscreen_surface(&self, window: &NativeWindow) -> SurfaceResult<Box<dyn DrawableSurface>>;

    /// Create a pixel buffer surface for use without a window
    fn create_offscreen_surface(&self) -> SurfaceResult<Box<dyn DrawableSurface>>;

    /// Unbind whatever this context has current on the calling thread
    fn clear_current(&self) -> SurfaceResult<()>;

    /// Unbind the resource context from the calling thread
    ///
    /// A render context bound on the calling thread stays bound.
    fn clear_resource_current(&self) -> SurfaceResult<()>;
}

/// A drawable surface bound to a graphics context
///
/// Dropping the surface destroys it.
pub trait DrawableSurface: Send + Sync {
    /// Window or pixel buffer surface
    fn kind(&self) -> SurfaceKind;

    /// False once the surface can no longer be drawn to
    fn is_valid(&self) -> bool;

    /// Drawable size in pixels
    fn size(&self) -> SurfaceSize;

    /// Framebuffer that renders into this surface
    fn framebuffer(&self) -> FramebufferId;

    /// Bind the render context and this surface to the calling thread
    fn make_current(&self) -> SurfaceResult<()>;

    /// Bind the resource context and this surface to the calling thread
    fn resource_make_current(&self) -> SurfaceResult<()>;

    /// True if this surface is current on the calling thread
    fn is_current(&self) -> bool;

    /// Present the back buffer
    fn swap_buffers(&self) -> SurfaceResult<()>;

    /// Resize without recreating. Only called when the context reports
    /// [`ContextCapabilities::RESIZE_IN_PLACE`].
    fn resize(&mut self, size: SurfaceSize) -> SurfaceResult<()> {
        let _ = size;
        Err(SurfaceError::Unsupported("resize in place"))
    }
}
