//! Rendering surface subsystem
//!
//! # Architecture Overview
//!
//! ```text
//! ┌──────────────────────┐        ┌────────────────────────┐
//! │ UI thread            │        │ Rendering backend      │
//! │ (window callbacks)   │        │ (render thread)        │
//! └──────────┬───────────┘        └───────────┬────────────┘
//!            │ WindowMailbox                  │ GlSurfaceDelegate
//!      ┌─────▼────────────────────────────────▼─────┐
//!      │ SurfaceLifecycleManager                     │ ← surface/manager.rs
//!      └─────┬──────────────────────────────┬───────┘
//!            │ GraphicsContext              │ ExternalViewEmbedder
//!      ┌─────▼─────────────┐          ┌─────▼─────────────┐
//!      │ context/          │          │ compositor/       │
//!      └───────────────────┘          └───────────────────┘
//! ```
//!
//! # Module Organization
//!
//! - **`context`**: Graphics context and drawable surface collaborators
//! - **`window`**: Native window handles and the lifecycle mailbox
//! - **`compositor`**: External view embedder for platform overlays
//! - **`surface`**: Platform and renderer contracts, lifecycle manager, GPU surface glue

use serde::{Deserialize, Serialize};

pub mod compositor;
pub mod context;
pub mod surface;
pub mod window;

/// Size of a drawable area in pixels
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SurfaceSize {
    /// Width in pixels
    pub width: u32,
    /// Height in pixels
    pub height: u32,
}

impl SurfaceSize {
    /// Create a new size
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// True when either dimension is zero
    pub const fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Pixel count
    pub const fn area(&self) -> u64 {
        self.width as u64 * self.height as u64
    }
}

impl std::fmt::Display for SurfaceSize {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

impl From<(u32, u32)> for SurfaceSize {
    fn from((width, height): (u32, u32)) -> Self {
        Self::new(width, height)
    }
}

/// Frame-buffer object the backend renders into
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FramebufferId(pub u32);

impl FramebufferId {
    /// The window system's default framebuffer
    pub const DEFAULT: Self = Self(0);

    /// True for the window system's default framebuffer
    pub const fn is_default(self) -> bool {
        self.0 == 0
    }
}

impl std::fmt::Display for FramebufferId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "fbo#{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_surface_size() {
        assert!(SurfaceSize::new(0, 600).is_empty());
        assert!(!SurfaceSize::new(800, 600).is_empty());
        assert_eq!(SurfaceSize::new(800, 600).area(), 480_000);
        assert_eq!(SurfaceSize::from((3, 4)).to_string(), "3x4");
    }

    #[test]
    fn test_default_framebuffer() {
        assert!(FramebufferId::DEFAULT.is_default());
        assert!(!FramebufferId(5).is_default());
    }
}
