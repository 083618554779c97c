//! Surface lifecycle subsystem
//!
//! - **`platform`**: Operations the platform drives on window lifecycle events
//! - **`delegate`**: Operations the rendering backend calls every frame
//! - **`manager`**: [`SurfaceLifecycleManager`], which implements both
//! - **`gpu_surface`**: Frame acquisition and presentation for the backend

pub mod delegate;
pub mod gpu_surface;
pub mod manager;
pub mod platform;

#[cfg(test)]
mod lifecycle_tests;

pub use delegate::{GlContextResult, GlSurfaceDelegate};
pub use gpu_surface::{BackendContext, GpuSurfaceGl, NullBackendContext, RenderTarget, SurfaceFrame};
pub use manager::{EmbedderFactory, ResourceContextHandle, SurfaceLifecycleManager, SurfaceState};
pub use platform::PlatformSurface;
