//! # Startup Configuration
//!
//! Everything the negotiation pipeline reads before it touches the driver:
//! application metadata for the instance, validation settings, required device
//! extensions, presentation preferences and the window to open.

use ash::vk;
use serde::{Deserialize, Serialize};

use super::{Config, ConfigError};

/// Surface formats the presentation chain can prefer.
///
/// The colour space is always `SRGB_NONLINEAR`, the only one every
/// presentation engine is required to report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PreferredFormat {
    /// `B8G8R8A8_SRGB`
    Bgra8Srgb,
    /// `R8G8B8A8_SRGB`
    Rgba8Srgb,
    /// `B8G8R8A8_UNORM`
    Bgra8Unorm,
    /// `R8G8B8A8_UNORM`
    Rgba8Unorm,
}

impl PreferredFormat {
    /// The (format, colour space) pair searched for in the surface format list
    #[must_use]
    pub const fn to_vk(self) -> vk::SurfaceFormatKHR {
        let format = match self {
            Self::Bgra8Srgb => vk::Format::B8G8R8A8_SRGB,
            Self::Rgba8Srgb => vk::Format::R8G8B8A8_SRGB,
            Self::Bgra8Unorm => vk::Format::B8G8R8A8_UNORM,
            Self::Rgba8Unorm => vk::Format::R8G8B8A8_UNORM,
        };
        vk::SurfaceFormatKHR {
            format,
            color_space: vk::ColorSpaceKHR::SRGB_NONLINEAR,
        }
    }
}

/// Present modes the presentation chain can prefer.
///
/// When the preferred mode is not reported the chain falls back to FIFO.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PreferredPresentMode {
    /// No vertical sync, may tear
    Immediate,
    /// Triple buffering, newest frame replaces the queued one
    Mailbox,
    /// Vertical sync, always available
    Fifo,
    /// Vertical sync unless the frame is late
    FifoRelaxed,
}

impl PreferredPresentMode {
    /// The Vulkan present mode this preference names
    #[must_use]
    pub const fn to_vk(self) -> vk::PresentModeKHR {
        match self {
            Self::Immediate => vk::PresentModeKHR::IMMEDIATE,
            Self::Mailbox => vk::PresentModeKHR::MAILBOX,
            Self::Fifo => vk::PresentModeKHR::FIFO,
            Self::FifoRelaxed => vk::PresentModeKHR::FIFO_RELAXED,
        }
    }
}

/// Window opened by the application before startup
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WindowConfig {
    /// Title bar text
    pub title: String,
    /// Initial client width in screen coordinates
    pub width: u32,
    /// Initial client height in screen coordinates
    pub height: u32,
    /// Whether the user may resize the window
    pub resizable: bool,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            title: "Vulkan".to_string(),
            width: 800,
            height: 600,
            resizable: true,
        }
    }
}

/// # Bootstrap Configuration
///
/// Drives instance creation, adapter selection and presentation chain
/// negotiation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BootstrapConfig {
    /// Application name for Vulkan instance creation
    pub application_name: String,
    /// Application version (major, minor, patch)
    pub application_version: (u32, u32, u32),
    /// Whether to enable Vulkan validation layers; `None` follows the build type
    pub enable_validation: Option<bool>,
    /// Layers that must be present when validation is enabled
    pub validation_layers: Vec<String>,
    /// Device extensions every candidate adapter must support
    pub device_extensions: Vec<String>,
    /// Surface format searched for first
    pub preferred_format: PreferredFormat,
    /// Present mode searched for first
    pub preferred_present_mode: PreferredPresentMode,
    /// Log level used when `RUST_LOG` is not set
    pub log_level: String,
    /// Window settings
    pub window: WindowConfig,
}

impl BootstrapConfig {
    /// Create a new configuration with defaults for everything but the name
    pub fn new(app_name: impl Into<String>) -> Self {
        Self {
            application_name: app_name.into(),
            application_version: (1, 0, 0),
            enable_validation: None,
            validation_layers: vec!["VK_LAYER_KHRONOS_validation".to_string()],
            device_extensions: vec!["VK_KHR_swapchain".to_string()],
            preferred_format: PreferredFormat::Bgra8Srgb,
            preferred_present_mode: PreferredPresentMode::Mailbox,
            log_level: "info".to_string(),
            window: WindowConfig::default(),
        }
    }

    /// Set application version
    #[must_use]
    pub const fn with_version(mut self, major: u32, minor: u32, patch: u32) -> Self {
        self.application_version = (major, minor, patch);
        self
    }

    /// Enable or disable validation layers
    #[must_use]
    pub const fn with_validation(mut self, enabled: bool) -> Self {
        self.enable_validation = Some(enabled);
        self
    }

    /// Add a device extension the adapter must support
    #[must_use]
    pub fn with_device_extension(mut self, name: impl Into<String>) -> Self {
        let name = name.into();
        if !self.device_extensions.contains(&name) {
            self.device_extensions.push(name);
        }
        self
    }

    /// Set the preferred surface format
    #[must_use]
    pub const fn with_format(mut self, format: PreferredFormat) -> Self {
        self.preferred_format = format;
        self
    }

    /// Set the preferred present mode
    #[must_use]
    pub const fn with_present_mode(mut self, mode: PreferredPresentMode) -> Self {
        self.preferred_present_mode = mode;
        self
    }

    /// Set the window settings
    #[must_use]
    pub fn with_window(mut self, window: WindowConfig) -> Self {
        self.window = window;
        self
    }

    /// Whether validation is on, resolving `None` by build type
    #[must_use]
    pub fn validation_enabled(&self) -> bool {
        self.enable_validation.unwrap_or(cfg!(debug_assertions))
    }

    /// Packed Vulkan application version
    #[must_use]
    pub const fn packed_version(&self) -> u32 {
        let (major, minor, patch) = self.application_version;
        vk::make_api_version(0, major, minor, patch)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.application_name.is_empty() {
            return Err(ConfigError::Invalid("Application name cannot be empty".to_string()));
        }

        if self.application_name.contains('\0') {
            return Err(ConfigError::Invalid("Application name cannot contain NUL".to_string()));
        }

        if self.validation_enabled() && self.validation_layers.is_empty() {
            return Err(ConfigError::Invalid(
                "Validation enabled but no validation layers listed".to_string(),
            ));
        }

        let names = self.validation_layers.iter().chain(&self.device_extensions);
        if let Some(bad) = names.into_iter().find(|name| name.is_empty() || name.contains('\0')) {
            return Err(ConfigError::Invalid(format!("Invalid layer or extension name: {bad:?}")));
        }

        if self.window.width == 0 || self.window.height == 0 {
            return Err(ConfigError::Invalid("Window size must be non-zero".to_string()));
        }

        Ok(())
    }
}

impl Default for BootstrapConfig {
    fn default() -> Self {
        Self::new("Hello Triangle")
    }
}

impl Config for BootstrapConfig {}
