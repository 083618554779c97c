//! # Unified Configuration System
//!
//! All configuration structures for the surface core live here: the graphics
//! context configuration handed to the context factory, the overlay compositor
//! switches, and logging.
//!
//! The context configuration is fixed for the lifetime of a manager. Nothing
//! in the core re-derives it after construction.

use serde::{Deserialize, Serialize};

use crate::config::{Config, ConfigError};

/// Color buffer layout of window and off-screen surfaces
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PixelFormat {
    /// 8 bits per channel with alpha
    Rgba8888,
    /// 16-bit packed, no alpha
    Rgb565,
}

impl PixelFormat {
    /// Bytes per pixel of the color buffer
    pub const fn bytes_per_pixel(self) -> u32 {
        match self {
            Self::Rgba8888 => 4,
            Self::Rgb565 => 2,
        }
    }
}

/// How the resource context relates to the render context
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SharingMode {
    /// A resource context exists and shares object namespace with the render context
    Shared,
    /// No resource context; uploads must happen on the render thread
    Isolated,
}

/// # Graphics Context Configuration
///
/// Attributes used to create the render context, the resource context and
/// every surface made compatible with them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContextConfig {
    /// Color buffer layout
    pub pixel_format: PixelFormat,
    /// Depth buffer size in bits
    pub depth_bits: u8,
    /// Stencil buffer size in bits
    pub stencil_bits: u8,
    /// Multisample count, 1 disables multisampling
    pub msaa_samples: u8,
    /// Resource context sharing
    pub sharing: SharingMode,
    /// Vertical blanks to wait per swap
    pub swap_interval: u32,
}

impl ContextConfig {
    /// Create the default configuration
    pub const fn new() -> Self {
        Self {
            pixel_format: PixelFormat::Rgba8888,
            depth_bits: 0,
            stencil_bits: 8,
            msaa_samples: 1,
            sharing: SharingMode::Shared,
            swap_interval: 1,
        }
    }

    /// Set the color buffer layout
    pub const fn with_pixel_format(mut self, format: PixelFormat) -> Self {
        self.pixel_format = format;
        self
    }

    /// Set depth and stencil sizes
    pub const fn with_depth_stencil(mut self, depth_bits: u8, stencil_bits: u8) -> Self {
        self.depth_bits = depth_bits;
        self.stencil_bits = stencil_bits;
        self
    }

    /// Set the multisample count
    pub const fn with_msaa(mut self, samples: u8) -> Self {
        self.msaa_samples = samples;
        self
    }

    /// Set the resource context sharing mode
    pub const fn with_sharing(mut self, sharing: SharingMode) -> Self {
        self.sharing = sharing;
        self
    }

    /// Whether a resource context should be created
    pub fn wants_resource_context(&self) -> bool {
        self.sharing == SharingMode::Shared
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), String> {
        if !matches!(self.depth_bits, 0 | 16 | 24 | 32) {
            return Err(format!("Unsupported depth size: {} bits", self.depth_bits));
        }

        if !matches!(self.stencil_bits, 0 | 8) {
            return Err(format!("Unsupported stencil size: {} bits", self.stencil_bits));
        }

        if self.msaa_samples == 0 || !self.msaa_samples.is_power_of_two() || self.msaa_samples > 16 {
            return Err(format!("Unsupported sample count: {}", self.msaa_samples));
        }

        if self.pixel_format == PixelFormat::Rgb565 && self.msaa_samples > 4 {
            return Err("RGB565 surfaces support at most 4 samples".to_string());
        }

        Ok(())
    }
}

impl Default for ContextConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// # Overlay Compositor Configuration
///
/// Controls whether platform views are composited together with GPU content.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompositorConfig {
    /// Create an external view embedder on demand
    pub embedded_views: bool,
    /// Framebuffer the backend renders into while overlays are active.
    /// `None` keeps rendering into the surface's own framebuffer.
    pub intermediate_framebuffer: Option<u32>,
}

impl CompositorConfig {
    /// Compositing disabled
    pub const fn disabled() -> Self {
        Self {
            embedded_views: false,
            intermediate_framebuffer: None,
        }
    }

    /// Compositing enabled, rendering directly into the surface
    pub const fn enabled() -> Self {
        Self {
            embedded_views: true,
            intermediate_framebuffer: None,
        }
    }

    /// Render into an intermediate target while overlays are active
    pub const fn with_intermediate_framebuffer(mut self, framebuffer: u32) -> Self {
        self.intermediate_framebuffer = Some(framebuffer);
        self
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.intermediate_framebuffer == Some(0) {
            return Err("Intermediate framebuffer cannot be the default framebuffer".to_string());
        }
        if self.intermediate_framebuffer.is_some() && !self.embedded_views {
            return Err("Intermediate framebuffer requires embedded views".to_string());
        }
        Ok(())
    }
}

/// # Logging Configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default log filter, overridden by `RUST_LOG`
    pub level: String,
    /// Prefix each line with the emitting thread's name
    pub show_thread_names: bool,
}

impl LoggingConfig {
    /// Create a new logging configuration
    pub fn new(level: impl Into<String>) -> Self {
        Self {
            level: level.into(),
            show_thread_names: true,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self::new("info")
    }
}

/// # Complete Application Configuration
///
/// Top-level configuration that encompasses all subsystems.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApplicationConfig {
    /// Logging configuration
    pub logging: LoggingConfig,
    /// Graphics context configuration
    pub context: ContextConfig,
    /// Overlay compositor configuration
    pub compositor: CompositorConfig,
}

impl ApplicationConfig {
    /// Validate the entire configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.context.validate().map_err(ConfigError::Invalid)?;
        self.compositor.validate().map_err(ConfigError::Invalid)?;
        Ok(())
    }
}

impl Config for ApplicationConfig {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ConfigFormat;
    use std::path::Path;

    #[test]
    fn test_default_config_is_valid() {
        assert!(ApplicationConfig::default().validate().is_ok());
    }

    #[test]
    fn test_context_validation() {
        assert!(ContextConfig::new().with_msaa(3).validate().is_err());
        assert!(ContextConfig::new().with_msaa(0).validate().is_err());
        assert!(ContextConfig::new().with_depth_stencil(12, 8).validate().is_err());
        assert!(ContextConfig::new().with_depth_stencil(24, 4).validate().is_err());
        assert!(ContextConfig::new()
            .with_pixel_format(PixelFormat::Rgb565)
            .with_msaa(8)
            .validate()
            .is_err());
        assert!(ContextConfig::new().with_depth_stencil(24, 8).with_msaa(4).validate().is_ok());
    }

    #[test]
    fn test_compositor_validation() {
        assert!(CompositorConfig::enabled().with_intermediate_framebuffer(0).validate().is_err());
        assert!(CompositorConfig::disabled().with_intermediate_framebuffer(3).validate().is_err());
        assert!(CompositorConfig::enabled().with_intermediate_framebuffer(3).validate().is_ok());
    }

    #[test]
    fn test_partial_toml() {
        let config = ApplicationConfig::parse(
            ConfigFormat::Toml,
            r#"
            [context]
            msaa_samples = 4
            sharing = "Isolated"

            [compositor]
            embedded_views = true
            "#,
        )
        .unwrap();

        assert_eq!(config.context.msaa_samples, 4);
        assert_eq!(config.context.sharing, SharingMode::Isolated);
        assert_eq!(config.context.pixel_format, PixelFormat::Rgba8888);
        assert!(config.compositor.embedded_views);
        assert_eq!(config.logging, LoggingConfig::default());
    }

    #[test]
    fn test_ron_config() {
        let config = ApplicationConfig::parse(
            ConfigFormat::Ron,
            "(context: (pixel_format: Rgb565, depth_bits: 16), compositor: (embedded_views: false))",
        )
        .unwrap();

        assert_eq!(config.context.pixel_format, PixelFormat::Rgb565);
        assert_eq!(config.context.depth_bits, 16);
        assert!(!config.compositor.embedded_views);
    }

    #[test]
    fn test_save_and_load() {
        let dir = std::env::temp_dir();
        let path = dir.join(format!("gpu_surface_config_{}.toml", std::process::id()));

        let config = ApplicationConfig {
            compositor: CompositorConfig::enabled().with_intermediate_framebuffer(7),
            ..ApplicationConfig::default()
        };
        config.save_to_file(&path).unwrap();
        let loaded = ApplicationConfig::load_from_file(&path).unwrap();
        let _ = std::fs::remove_file(&path);

        assert_eq!(loaded, config);
    }

    #[test]
    fn test_ron_text_round_trip() {
        let config = ApplicationConfig {
            logging: LoggingConfig::new("debug"),
            ..ApplicationConfig::default()
        };
        let text = config.render(ConfigFormat::Ron).unwrap();
        assert_eq!(ApplicationConfig::parse(ConfigFormat::Ron, &text).unwrap(), config);
    }

    #[test]
    fn test_format_from_extension() {
        assert_eq!(ConfigFormat::from_path(Path::new("surface.toml")).unwrap(), ConfigFormat::Toml);
        assert_eq!(ConfigFormat::from_path(Path::new("conf/surface.ron")).unwrap(), ConfigFormat::Ron);
        assert!(matches!(
            ConfigFormat::from_path(Path::new("surface")),
            Err(ConfigError::UnsupportedFormat(_))
        ));
    }

    #[test]
    fn test_unsupported_extension() {
        let result = ApplicationConfig::default().save_to_file("surface.json");
        assert!(matches!(result, Err(ConfigError::UnsupportedFormat(_))));
    }
}
