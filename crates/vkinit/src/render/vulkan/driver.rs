//! Driver seam
//!
//! Every call the negotiation pipeline makes into Vulkan goes through
//! [`Driver`]. Handles crossing the seam are raw `vk` handles: plain identifiers
//! for objects the driver owns. List queries keep the two-call shape of the C
//! API and are only ever run through [`enumerate`](super::query::enumerate).
//!
//! [`AshDriver`](super::AshDriver) is the production implementation; tests use
//! a scripted mock.

use std::ffi::CString;

use ash::vk;

use super::swapchain::PresentationChainConfig;

/// Instance creation request
#[derive(Debug, Clone)]
pub struct InstanceDescriptor {
    /// Application name reported to the driver
    pub application_name: CString,
    /// Packed application version
    pub application_version: u32,
    /// Engine name reported to the driver
    pub engine_name: CString,
    /// Packed engine version
    pub engine_version: u32,
    /// Highest Vulkan API version the application targets
    pub api_version: u32,
    /// Instance extensions to enable
    pub extensions: Vec<CString>,
    /// Instance layers to enable
    pub layers: Vec<CString>,
    /// Messenger chained into instance creation so creation itself is covered
    pub debug: Option<MessengerDescriptor>,
}

/// Debug messenger registration request
#[derive(Debug, Clone, Copy)]
pub struct MessengerDescriptor {
    /// Severities forwarded to the sink
    pub severity: vk::DebugUtilsMessageSeverityFlagsEXT,
    /// Message categories forwarded to the sink
    pub message_type: vk::DebugUtilsMessageTypeFlagsEXT,
    /// Callback receiving the messages
    pub sink: vk::PFN_vkDebugUtilsMessengerCallbackEXT,
}

/// One queue-creation request for a single family
#[derive(Debug, Clone, PartialEq)]
pub struct QueueRequest {
    /// Queue family index
    pub family_index: u32,
    /// One priority per queue requested from the family
    pub priorities: Vec<f32>,
}

/// Logical device creation request
#[derive(Debug, Clone)]
pub struct DeviceDescriptor {
    /// Queue requests, at most one per family
    pub queues: Vec<QueueRequest>,
    /// Device extensions to enable
    pub extensions: Vec<CString>,
    /// Device layers, only honoured by older loaders
    pub layers: Vec<CString>,
}

/// Swapchain creation request
#[derive(Debug, Clone)]
pub struct ChainDescriptor {
    /// Surface the chain presents to
    pub surface: vk::SurfaceKHR,
    /// Negotiated format, mode, extent, image count and sharing
    pub config: PresentationChainConfig,
    /// Transform applied before presentation
    pub pre_transform: vk::SurfaceTransformFlagsKHR,
    /// Chain being replaced, or null
    pub old_chain: vk::SwapchainKHR,
}

/// Image view creation request
#[derive(Debug, Clone, Copy)]
pub struct ViewDescriptor {
    /// Image the view reads
    pub image: vk::Image,
    /// View dimensionality
    pub view_type: vk::ImageViewType,
    /// Format the image is interpreted as
    pub format: vk::Format,
    /// Channel swizzle
    pub components: vk::ComponentMapping,
    /// Mip levels, layers and aspect covered by the view
    pub subresource_range: vk::ImageSubresourceRange,
}

/// Synchronous access to a Vulkan implementation
///
/// Creation methods take `&mut self`, queries take `&self`. List queries fill
/// `count` when `out` is `None`; when `out` is `Some`, they write at most
/// `out.len()` elements and set `count` to the number written.
pub trait Driver {
    /// Instance layers installed on the system
    fn enumerate_layers(&self, count: &mut u32, out: Option<&mut [vk::LayerProperties]>) -> vk::Result;

    /// Create the instance
    fn create_instance(&mut self, desc: &InstanceDescriptor) -> Result<vk::Instance, vk::Result>;

    /// Destroy the instance
    fn destroy_instance(&mut self, instance: vk::Instance);

    /// Register a debug messenger
    fn create_debug_messenger(
        &mut self,
        instance: vk::Instance,
        desc: &MessengerDescriptor,
    ) -> Result<vk::DebugUtilsMessengerEXT, vk::Result>;

    /// Unregister a debug messenger
    fn destroy_debug_messenger(&mut self, instance: vk::Instance, messenger: vk::DebugUtilsMessengerEXT);

    /// Destroy a surface created by the window collaborator
    fn destroy_surface(&mut self, instance: vk::Instance, surface: vk::SurfaceKHR);

    /// Physical devices visible to the instance
    fn enumerate_adapters(
        &self,
        instance: vk::Instance,
        count: &mut u32,
        out: Option<&mut [vk::PhysicalDevice]>,
    ) -> vk::Result;

    /// Name, type and limits of a physical device
    fn adapter_properties(&self, adapter: vk::PhysicalDevice) -> vk::PhysicalDeviceProperties;

    /// Device extensions a physical device supports
    fn enumerate_device_extensions(
        &self,
        adapter: vk::PhysicalDevice,
        count: &mut u32,
        out: Option<&mut [vk::ExtensionProperties]>,
    ) -> vk::Result;

    /// Queue families of a physical device, in index order
    fn enumerate_queue_families(
        &self,
        adapter: vk::PhysicalDevice,
        count: &mut u32,
        out: Option<&mut [vk::QueueFamilyProperties]>,
    ) -> vk::Result;

    /// Whether a queue family can present to `surface`
    fn surface_support(
        &self,
        adapter: vk::PhysicalDevice,
        family_index: u32,
        surface: vk::SurfaceKHR,
    ) -> Result<bool, vk::Result>;

    /// Surface capabilities for an (adapter, surface) pair
    fn surface_capabilities(
        &self,
        adapter: vk::PhysicalDevice,
        surface: vk::SurfaceKHR,
    ) -> Result<vk::SurfaceCapabilitiesKHR, vk::Result>;

    /// Surface formats for an (adapter, surface) pair
    fn enumerate_surface_formats(
        &self,
        adapter: vk::PhysicalDevice,
        surface: vk::SurfaceKHR,
        count: &mut u32,
        out: Option<&mut [vk::SurfaceFormatKHR]>,
    ) -> vk::Result;

    /// Present modes for an (adapter, surface) pair
    fn enumerate_present_modes(
        &self,
        adapter: vk::PhysicalDevice,
        surface: vk::SurfaceKHR,
        count: &mut u32,
        out: Option<&mut [vk::PresentModeKHR]>,
    ) -> vk::Result;

    /// Create the logical device
    fn create_device(
        &mut self,
        adapter: vk::PhysicalDevice,
        desc: &DeviceDescriptor,
    ) -> Result<vk::Device, vk::Result>;

    /// Destroy the logical device
    fn destroy_device(&mut self, device: vk::Device);

    /// Block until the device has no work in flight
    fn device_wait_idle(&self, device: vk::Device) -> Result<(), vk::Result>;

    /// Queue handle for a family created with the device
    fn device_queue(&self, device: vk::Device, family_index: u32, queue_index: u32) -> vk::Queue;

    /// Create a swapchain
    fn create_swapchain(
        &mut self,
        device: vk::Device,
        desc: &ChainDescriptor,
    ) -> Result<vk::SwapchainKHR, vk::Result>;

    /// Destroy a swapchain
    fn destroy_swapchain(&mut self, device: vk::Device, chain: vk::SwapchainKHR);

    /// Images owned by a swapchain
    fn enumerate_swapchain_images(
        &self,
        device: vk::Device,
        chain: vk::SwapchainKHR,
        count: &mut u32,
        out: Option<&mut [vk::Image]>,
    ) -> vk::Result;

    /// Create an image view
    fn create_image_view(
        &mut self,
        device: vk::Device,
        desc: &ViewDescriptor,
    ) -> Result<vk::ImageView, vk::Result>;

    /// Destroy an image view
    fn destroy_image_view(&mut self, device: vk::Device, view: vk::ImageView);
}
