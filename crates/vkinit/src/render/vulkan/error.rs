//! Vulkan startup errors
//!
//! Every variant is fatal to startup. None of them are retried.

use ash::vk;
use thiserror::Error;

/// Vulkan-specific error types
#[derive(Error, Debug)]
pub enum VulkanError {
    /// The Vulkan loader library could not be loaded
    #[error("Vulkan loader unavailable: {0}")]
    LoaderUnavailable(String),

    /// Validation was requested but some layers are not installed
    #[error("Validation layers requested but not available: {}", missing.join(", "))]
    ValidationUnavailable {
        /// Layer names the loader does not report
        missing: Vec<String>,
    },

    /// A capability query returned an error code
    #[error("Query for {what} failed: {result:?}")]
    QueryFailed {
        /// What was being queried
        what: &'static str,
        /// Result code returned by the driver
        result: vk::Result,
    },

    /// Instance creation failed
    #[error("Failed to create Vulkan instance: {0}")]
    ContextCreationFailed(String),

    /// Debug messenger registration failed
    #[error("Failed to register debug messenger: {0:?}")]
    DebugMessengerFailed(vk::Result),

    /// Window surface creation failed
    #[error("Failed to create window surface: {0}")]
    SurfaceCreationFailed(String),

    /// No physical devices were enumerated
    #[error("Could not find GPUs with Vulkan support")]
    NoAdapterFound,

    /// Every physical device failed the suitability checks
    #[error("Failed to find a suitable GPU")]
    NoSuitableAdapter,

    /// Logical device creation failed
    #[error("Failed to create logical device: {0:?}")]
    DeviceCreationFailed(vk::Result),

    /// Swapchain creation failed
    #[error("Failed to create swapchain: {0:?}")]
    ChainCreationFailed(vk::Result),

    /// An image view for a swapchain image failed
    #[error("Failed to create image view {index}: {result:?}")]
    ViewCreationFailed {
        /// Index of the swapchain image whose view failed
        index: usize,
        /// Result code returned by the driver
        result: vk::Result,
    },

    /// Operation attempted in the wrong lifecycle state
    #[error("Invalid operation: {reason}")]
    InvalidOperation {
        /// Description of why the operation is invalid
        reason: String,
    },
}

impl VulkanError {
    /// Wrap a failed query result
    #[must_use]
    pub const fn query(what: &'static str, result: vk::Result) -> Self {
        Self::QueryFailed { what, result }
    }
}

/// Result type for Vulkan operations
pub type VulkanResult<T> = Result<T, VulkanError>;
