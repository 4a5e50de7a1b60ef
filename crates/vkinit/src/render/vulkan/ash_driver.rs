//! [`Driver`] on top of `ash`
//!
//! Keeps the loaded function tables for the single instance and device it
//! creates. List queries call the raw entry points directly so the two-call
//! protocol stays in [`enumerate`](super::query::enumerate).

use std::os::raw::c_char;

use ash::extensions::ext::DebugUtils;
use ash::extensions::khr::{Surface, Swapchain};
use ash::{vk, Device, Entry, Instance};

use super::driver::{ChainDescriptor, DeviceDescriptor, Driver, InstanceDescriptor, MessengerDescriptor, ViewDescriptor};
use super::error::{VulkanError, VulkanResult};

const NOT_LOADED: vk::Result = vk::Result::ERROR_INITIALIZATION_FAILED;

/// Vulkan loader plus the instance and device function tables
pub struct AshDriver {
    entry: Entry,
    instance: Option<Instance>,
    surface_loader: Option<Surface>,
    debug_utils: Option<DebugUtils>,
    device: Option<Device>,
    swapchain_loader: Option<Swapchain>,
}

impl AshDriver {
    /// Load the system Vulkan library
    pub fn load() -> VulkanResult<Self> {
        let entry = unsafe { Entry::load() }
            .map_err(|e| VulkanError::LoaderUnavailable(e.to_string()))?;
        Ok(Self::with_entry(entry))
    }

    /// Wrap an already loaded entry point
    #[must_use]
    pub const fn with_entry(entry: Entry) -> Self {
        Self {
            entry,
            instance: None,
            surface_loader: None,
            debug_utils: None,
            device: None,
            swapchain_loader: None,
        }
    }

    /// The loaded entry point
    #[must_use]
    pub const fn entry(&self) -> &Entry {
        &self.entry
    }

    /// The loaded instance, once created
    #[must_use]
    pub const fn ash_instance(&self) -> Option<&Instance> {
        self.instance.as_ref()
    }

    /// The loaded device, once created
    #[must_use]
    pub const fn ash_device(&self) -> Option<&Device> {
        self.device.as_ref()
    }

    /// Swapchain extension functions, once the device exists
    #[must_use]
    pub const fn swapchain_loader(&self) -> Option<&Swapchain> {
        self.swapchain_loader.as_ref()
    }

    fn loaded_instance(&self, handle: vk::Instance) -> Result<&Instance, vk::Result> {
        self.instance
            .as_ref()
            .filter(|instance| instance.handle() == handle)
            .ok_or(NOT_LOADED)
    }

    fn loaded_device(&self, handle: vk::Device) -> Result<&Device, vk::Result> {
        self.device
            .as_ref()
            .filter(|device| device.handle() == handle)
            .ok_or(NOT_LOADED)
    }

    fn loaded_surface(&self) -> Result<&Surface, vk::Result> {
        self.surface_loader.as_ref().ok_or(NOT_LOADED)
    }
}

fn messenger_create_info(desc: &MessengerDescriptor) -> vk::DebugUtilsMessengerCreateInfoEXT {
    vk::DebugUtilsMessengerCreateInfoEXT::builder()
        .message_severity(desc.severity)
        .message_type(desc.message_type)
        .pfn_user_callback(desc.sink)
        .build()
}

/// Output pointer for a raw list call, clamping `count` to the buffer
fn raw_out<T>(count: &mut u32, out: Option<&mut [T]>) -> *mut T {
    match out {
        Some(buffer) => {
            *count = (*count).min(u32::try_from(buffer.len()).unwrap_or(u32::MAX));
            buffer.as_mut_ptr()
        }
        None => std::ptr::null_mut(),
    }
}

fn name_ptrs(names: &[std::ffi::CString]) -> Vec<*const c_char> {
    names.iter().map(|name| name.as_ptr()).collect()
}

impl Driver for AshDriver {
    fn enumerate_layers(&self, count: &mut u32, out: Option<&mut [vk::LayerProperties]>) -> vk::Result {
        let ptr = raw_out(count, out);
        unsafe { (self.entry.fp_v1_0().enumerate_instance_layer_properties)(count, ptr) }
    }

    fn create_instance(&mut self, desc: &InstanceDescriptor) -> Result<vk::Instance, vk::Result> {
        let app_info = vk::ApplicationInfo::builder()
            .application_name(&desc.application_name)
            .application_version(desc.application_version)
            .engine_name(&desc.engine_name)
            .engine_version(desc.engine_version)
            .api_version(desc.api_version);

        let extensions = name_ptrs(&desc.extensions);
        let layers = name_ptrs(&desc.layers);
        let mut debug_info = desc.debug.as_ref().map(messenger_create_info);

        let mut create_info = vk::InstanceCreateInfo::builder()
            .application_info(&app_info)
            .enabled_extension_names(&extensions)
            .enabled_layer_names(&layers);
        if let Some(info) = debug_info.as_mut() {
            create_info = create_info.push_next(info);
        }

        let instance = unsafe { self.entry.create_instance(&create_info, None)? };
        let handle = instance.handle();

        self.surface_loader = Some(Surface::new(&self.entry, &instance));
        self.instance = Some(instance);
        Ok(handle)
    }

    fn destroy_instance(&mut self, instance: vk::Instance) {
        if self.loaded_instance(instance).is_err() {
            log::warn!("Ignoring destroy of unknown instance {:?}", instance);
            return;
        }
        self.debug_utils = None;
        self.surface_loader = None;
        if let Some(instance) = self.instance.take() {
            unsafe { instance.destroy_instance(None) };
        }
    }

    fn create_debug_messenger(
        &mut self,
        instance: vk::Instance,
        desc: &MessengerDescriptor,
    ) -> Result<vk::DebugUtilsMessengerEXT, vk::Result> {
        let debug_utils = DebugUtils::new(&self.entry, self.loaded_instance(instance)?);
        let messenger = unsafe { debug_utils.create_debug_utils_messenger(&messenger_create_info(desc), None)? };
        self.debug_utils = Some(debug_utils);
        Ok(messenger)
    }

    fn destroy_debug_messenger(&mut self, _instance: vk::Instance, messenger: vk::DebugUtilsMessengerEXT) {
        if let Some(debug_utils) = &self.debug_utils {
            unsafe { debug_utils.destroy_debug_utils_messenger(messenger, None) };
        }
    }

    fn destroy_surface(&mut self, _instance: vk::Instance, surface: vk::SurfaceKHR) {
        if let Ok(loader) = self.loaded_surface() {
            unsafe { loader.destroy_surface(surface, None) };
        }
    }

    fn enumerate_adapters(
        &self,
        instance: vk::Instance,
        count: &mut u32,
        out: Option<&mut [vk::PhysicalDevice]>,
    ) -> vk::Result {
        let Ok(loaded) = self.loaded_instance(instance) else {
            return NOT_LOADED;
        };
        let ptr = raw_out(count, out);
        unsafe { (loaded.fp_v1_0().enumerate_physical_devices)(instance, count, ptr) }
    }

    fn adapter_properties(&self, adapter: vk::PhysicalDevice) -> vk::PhysicalDeviceProperties {
        self.instance
            .as_ref()
            .map(|instance| unsafe { instance.get_physical_device_properties(adapter) })
            .unwrap_or_default()
    }

    fn enumerate_device_extensions(
        &self,
        adapter: vk::PhysicalDevice,
        count: &mut u32,
        out: Option<&mut [vk::ExtensionProperties]>,
    ) -> vk::Result {
        let Some(instance) = self.instance.as_ref() else {
            return NOT_LOADED;
        };
        let ptr = raw_out(count, out);
        unsafe { (instance.fp_v1_0().enumerate_device_extension_properties)(adapter, std::ptr::null(), count, ptr) }
    }

    fn enumerate_queue_families(
        &self,
        adapter: vk::PhysicalDevice,
        count: &mut u32,
        out: Option<&mut [vk::QueueFamilyProperties]>,
    ) -> vk::Result {
        let Some(instance) = self.instance.as_ref() else {
            return NOT_LOADED;
        };
        let ptr = raw_out(count, out);
        unsafe { (instance.fp_v1_0().get_physical_device_queue_family_properties)(adapter, count, ptr) };
        vk::Result::SUCCESS
    }

    fn surface_support(
        &self,
        adapter: vk::PhysicalDevice,
        family_index: u32,
        surface: vk::SurfaceKHR,
    ) -> Result<bool, vk::Result> {
        unsafe {
            self.loaded_surface()?
                .get_physical_device_surface_support(adapter, family_index, surface)
        }
    }

    fn surface_capabilities(
        &self,
        adapter: vk::PhysicalDevice,
        surface: vk::SurfaceKHR,
    ) -> Result<vk::SurfaceCapabilitiesKHR, vk::Result> {
        unsafe {
            self.loaded_surface()?
                .get_physical_device_surface_capabilities(adapter, surface)
        }
    }

    fn enumerate_surface_formats(
        &self,
        adapter: vk::PhysicalDevice,
        surface: vk::SurfaceKHR,
        count: &mut u32,
        out: Option<&mut [vk::SurfaceFormatKHR]>,
    ) -> vk::Result {
        let Ok(loader) = self.loaded_surface() else {
            return NOT_LOADED;
        };
        let ptr = raw_out(count, out);
        unsafe { (loader.fp().get_physical_device_surface_formats_khr)(adapter, surface, count, ptr) }
    }

    fn enumerate_present_modes(
        &self,
        adapter: vk::PhysicalDevice,
        surface: vk::SurfaceKHR,
        count: &mut u32,
        out: Option<&mut [vk::PresentModeKHR]>,
    ) -> vk::Result {
        let Ok(loader) = self.loaded_surface() else {
            return NOT_LOADED;
        };
        let ptr = raw_out(count, out);
        unsafe { (loader.fp().get_physical_device_surface_present_modes_khr)(adapter, surface, count, ptr) }
    }

    fn create_device(
        &mut self,
        adapter: vk::PhysicalDevice,
        desc: &DeviceDescriptor,
    ) -> Result<vk::Device, vk::Result> {
        let instance = self.instance.as_ref().ok_or(NOT_LOADED)?;

        let queue_infos: Vec<vk::DeviceQueueCreateInfo> = desc
            .queues
            .iter()
            .map(|request| {
                vk::DeviceQueueCreateInfo::builder()
                    .queue_family_index(request.family_index)
                    .queue_priorities(&request.priorities)
                    .build()
            })
            .collect();
        let extensions = name_ptrs(&desc.extensions);
        let layers = name_ptrs(&desc.layers);
        let features = vk::PhysicalDeviceFeatures::default();

        let create_info = vk::DeviceCreateInfo::builder()
            .queue_create_infos(&queue_infos)
            .enabled_extension_names(&extensions)
            .enabled_layer_names(&layers)
            .enabled_features(&features);

        let device = unsafe { instance.create_device(adapter, &create_info, None)? };
        let handle = device.handle();

        self.swapchain_loader = Some(Swapchain::new(instance, &device));
        self.device = Some(device);
        Ok(handle)
    }

    fn destroy_device(&mut self, device: vk::Device) {
        if self.loaded_device(device).is_err() {
            log::warn!("Ignoring destroy of unknown device {:?}", device);
            return;
        }
        self.swapchain_loader = None;
        if let Some(device) = self.device.take() {
            unsafe { device.destroy_device(None) };
        }
    }

    fn device_wait_idle(&self, device: vk::Device) -> Result<(), vk::Result> {
        unsafe { self.loaded_device(device)?.device_wait_idle() }
    }

    fn device_queue(&self, device: vk::Device, family_index: u32, queue_index: u32) -> vk::Queue {
        self.loaded_device(device)
            .map(|device| unsafe { device.get_device_queue(family_index, queue_index) })
            .unwrap_or_default()
    }

    fn create_swapchain(
        &mut self,
        device: vk::Device,
        desc: &ChainDescriptor,
    ) -> Result<vk::SwapchainKHR, vk::Result> {
        self.loaded_device(device)?;
        let loader = self.swapchain_loader.as_ref().ok_or(NOT_LOADED)?;
        let config = &desc.config;

        let create_info = vk::SwapchainCreateInfoKHR::builder()
            .surface(desc.surface)
            .min_image_count(config.image_count)
            .image_format(config.format)
            .image_color_space(config.color_space)
            .image_extent(config.extent)
            .image_array_layers(1)
            .image_usage(vk::ImageUsageFlags::COLOR_ATTACHMENT)
            .image_sharing_mode(config.sharing.vk_mode())
            .queue_family_indices(config.sharing.family_indices())
            .pre_transform(desc.pre_transform)
            .composite_alpha(vk::CompositeAlphaFlagsKHR::OPAQUE)
            .present_mode(config.present_mode)
            .clipped(true)
            .old_swapchain(desc.old_chain);

        unsafe { loader.create_swapchain(&create_info, None) }
    }

    fn destroy_swapchain(&mut self, _device: vk::Device, chain: vk::SwapchainKHR) {
        if let Some(loader) = &self.swapchain_loader {
            unsafe { loader.destroy_swapchain(chain, None) };
        }
    }

    fn enumerate_swapchain_images(
        &self,
        device: vk::Device,
        chain: vk::SwapchainKHR,
        count: &mut u32,
        out: Option<&mut [vk::Image]>,
    ) -> vk::Result {
        let Some(loader) = self.swapchain_loader.as_ref() else {
            return NOT_LOADED;
        };
        let ptr = raw_out(count, out);
        unsafe { (loader.fp().get_swapchain_images_khr)(device, chain, count, ptr) }
    }

    fn create_image_view(&mut self, device: vk::Device, desc: &ViewDescriptor) -> Result<vk::ImageView, vk::Result> {
        let create_info = vk::ImageViewCreateInfo::builder()
            .image(desc.image)
            .view_type(desc.view_type)
            .format(desc.format)
            .components(desc.components)
            .subresource_range(desc.subresource_range);

        unsafe { self.loaded_device(device)?.create_image_view(&create_info, None) }
    }

    fn destroy_image_view(&mut self, device: vk::Device, view: vk::ImageView) {
        if let Ok(device) = self.loaded_device(device) {
            unsafe { device.destroy_image_view(view, None) };
        }
    }
}
