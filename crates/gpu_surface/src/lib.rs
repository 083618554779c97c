//! # GPU Surface
//!
//! Surface and graphics-context lifecycle management for hardware-accelerated
//! rendering on mobile platforms.
//!
//! ## Features
//!
//! - **Surface Lifecycle**: On-screen surfaces follow native window creation, resize and destruction
//! - **Context Switching**: Render and resource contexts made current on their own threads
//! - **Frame Presentation**: Frame-buffer and present protocol consumed by the rendering backend
//! - **Overlay Compositing**: Optional external view embedder for platform content
//! - **Headless Context**: In-process context implementation for tests and tooling
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use gpu_surface::prelude::*;
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ApplicationConfig::default();
//!     let context = Arc::new(HeadlessContext::new(config.context.clone()));
//!     let mut manager = SurfaceLifecycleManager::new(context, config.compositor.clone());
//!
//!     let window = NativeWindow::android(0x7f00_1000, SurfaceSize::new(1080, 1920));
//!     if manager.set_native_window(window) {
//!         let backend = Arc::new(NullBackendContext::new());
//!         if let Some(mut surface) = manager.create_gpu_surface(backend) {
//!             if let Some(frame) = surface.acquire_frame(SurfaceSize::new(1080, 1920)) {
//!                 frame.submit();
//!             }
//!         }
//!     }
//!     manager.teardown_on_screen_context();
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions, clippy::similar_names, clippy::too_many_arguments)]

// Core modules
pub mod core;

pub mod config;
pub mod foundation;
pub mod render;

/// Common imports for surface users
pub mod prelude {
    pub use crate::{
        core::config::{ApplicationConfig, CompositorConfig, ContextConfig, LoggingConfig},
        config::{Config, ConfigError, ConfigFormat},
        render::{
            compositor::{EmbeddedViewParams, ExternalViewEmbedder, OverlayCompositor},
            context::{
                ContextCapabilities, DrawableSurface, GraphicsContext, HeadlessContext, SurfaceError,
                SurfaceKind, SurfaceResult,
            },
            surface::{
                BackendContext, GlContextResult, GlSurfaceDelegate, GpuSurfaceGl, NullBackendContext,
                PlatformSurface, ResourceContextHandle, SurfaceFrame, SurfaceLifecycleManager,
            },
            window::{MailboxSender, NativeWindow, WindowMailbox, WindowMessage},
            FramebufferId, SurfaceSize,
        },
    };
}
