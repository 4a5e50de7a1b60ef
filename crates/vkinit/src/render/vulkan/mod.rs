//! Vulkan bootstrap
//!
//! Instance, validation messenger, surface, adapter selection, logical device
//! and presentation chain, all driven through the [`Driver`] seam.

pub mod adapter;
pub mod ash_driver;
pub mod context;
pub mod debug;
pub mod driver;
pub mod error;
pub mod query;
pub mod queue_family;
pub mod swapchain;

#[cfg(test)]
pub(crate) mod tests;

pub use adapter::{select_adapter, Adapter, Suitability, SurfaceSupport};
pub use ash_driver::AshDriver;
pub use context::{ContextState, DeviceContext, Queues};
pub use driver::{
    ChainDescriptor, DeviceDescriptor, Driver, InstanceDescriptor, MessengerDescriptor, QueueRequest,
    ViewDescriptor,
};
pub use error::{VulkanError, VulkanResult};
pub use query::enumerate;
pub use queue_family::QueueFamilyIndices;
pub use swapchain::{
    PresentationChain, PresentationChainBuilder, PresentationChainConfig, PresentationPreferences, SharingMode,
};
