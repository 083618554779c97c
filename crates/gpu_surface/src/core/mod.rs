//! # Core Module
//!
//! Shared abstractions used by every subsystem of the crate.
//!
//! ## Organization
//!
//! - **Config**: Unified configuration for context, compositor and logging
//! - **Foundation**: Low-level utilities (time, logging)

pub mod config;

// Re-export foundation modules for convenience
pub use crate::foundation;

// Re-export commonly used config types
pub use config::{
    ApplicationConfig,
    CompositorConfig,
    ContextConfig,
    LoggingConfig,
    PixelFormat,
    SharingMode,
};
pub use crate::config::{Config, ConfigError, ConfigFormat};
