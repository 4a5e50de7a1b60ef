//! Scripted driver and window for exercising the bootstrap without a GPU

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::os::raw::c_char;
use std::rc::Rc;

use ash::vk::{self, Handle};

use crate::render::vulkan::driver::{
    ChainDescriptor, DeviceDescriptor, Driver, InstanceDescriptor, MessengerDescriptor, ViewDescriptor,
};
use crate::render::window::{SurfaceProvider, WindowError, WindowResult};

pub fn mock_instance() -> vk::Instance {
    vk::Instance::from_raw(0x1000)
}

pub fn mock_surface() -> vk::SurfaceKHR {
    vk::SurfaceKHR::from_raw(0x2000)
}

pub fn mock_device() -> vk::Device {
    vk::Device::from_raw(0x3000)
}

pub fn mock_messenger() -> vk::DebugUtilsMessengerEXT {
    vk::DebugUtilsMessengerEXT::from_raw(0x4000)
}

/// Every create and destroy the mock saw, in order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Call {
    CreateInstance,
    DestroyInstance,
    CreateDebugMessenger,
    DestroyDebugMessenger,
    CreateSurface,
    DestroySurface,
    CreateDevice,
    DestroyDevice,
    WaitIdle,
    CreateSwapchain,
    DestroySwapchain,
    CreateImageView(vk::ImageView),
    DestroyImageView(vk::ImageView),
}

/// Shared between a [`MockDriver`] and its [`MockWindow`]
#[derive(Debug, Default)]
pub struct MockState {
    pub calls: Vec<Call>,
    pub instances: Vec<InstanceDescriptor>,
    pub devices: Vec<DeviceDescriptor>,
    pub chains: Vec<ChainDescriptor>,
    pub destroyed_chains: Vec<vk::SwapchainKHR>,
    pub views: Vec<ViewDescriptor>,
    view_attempts: usize,
    chain_images: HashMap<vk::SwapchainKHR, u32>,
}

impl MockState {
    pub fn count(&self, call: &Call) -> usize {
        self.calls.iter().filter(|c| *c == call).count()
    }

    pub fn position(&self, call: &Call) -> Option<usize> {
        self.calls.iter().position(|c| c == call)
    }
}

#[derive(Debug, Clone, Copy)]
pub struct MockFamily {
    pub flags: vk::QueueFlags,
    pub present: bool,
}

impl MockFamily {
    pub fn combined() -> Self {
        Self {
            flags: vk::QueueFlags::GRAPHICS | vk::QueueFlags::COMPUTE | vk::QueueFlags::TRANSFER,
            present: true,
        }
    }

    pub fn graphics_only() -> Self {
        Self {
            flags: vk::QueueFlags::GRAPHICS | vk::QueueFlags::TRANSFER,
            present: false,
        }
    }

    pub fn present_only() -> Self {
        Self {
            flags: vk::QueueFlags::COMPUTE,
            present: true,
        }
    }

    pub fn transfer_only() -> Self {
        Self {
            flags: vk::QueueFlags::TRANSFER,
            present: false,
        }
    }
}

#[derive(Debug, Clone)]
pub struct MockAdapter {
    pub name: String,
    pub device_type: vk::PhysicalDeviceType,
    pub families: Vec<MockFamily>,
    pub extensions: Vec<String>,
    pub capabilities: vk::SurfaceCapabilitiesKHR,
    pub formats: Vec<vk::SurfaceFormatKHR>,
    pub present_modes: Vec<vk::PresentModeKHR>,
}

impl MockAdapter {
    /// One combined family, swapchain support, sRGB format, FIFO and MAILBOX
    pub fn combined(name: &str) -> Self {
        Self {
            name: name.to_string(),
            device_type: vk::PhysicalDeviceType::INTEGRATED_GPU,
            families: vec![MockFamily::combined()],
            extensions: vec!["VK_KHR_swapchain".to_string()],
            capabilities: vk::SurfaceCapabilitiesKHR {
                min_image_count: 2,
                max_image_count: 8,
                current_extent: vk::Extent2D {
                    width: u32::MAX,
                    height: u32::MAX,
                },
                min_image_extent: vk::Extent2D { width: 1, height: 1 },
                max_image_extent: vk::Extent2D {
                    width: 4096,
                    height: 4096,
                },
                max_image_array_layers: 1,
                supported_transforms: vk::SurfaceTransformFlagsKHR::IDENTITY,
                current_transform: vk::SurfaceTransformFlagsKHR::IDENTITY,
                supported_composite_alpha: vk::CompositeAlphaFlagsKHR::OPAQUE,
                supported_usage_flags: vk::ImageUsageFlags::COLOR_ATTACHMENT,
            },
            formats: vec![vk::SurfaceFormatKHR {
                format: vk::Format::B8G8R8A8_SRGB,
                color_space: vk::ColorSpaceKHR::SRGB_NONLINEAR,
            }],
            present_modes: vec![vk::PresentModeKHR::FIFO, vk::PresentModeKHR::MAILBOX],
        }
    }

    pub fn with_device_type(mut self, device_type: vk::PhysicalDeviceType) -> Self {
        self.device_type = device_type;
        self
    }

    pub fn with_families(mut self, families: Vec<MockFamily>) -> Self {
        self.families = families;
        self
    }

    pub fn with_extensions(mut self, extensions: &[&str]) -> Self {
        self.extensions = extensions.iter().map(ToString::to_string).collect();
        self
    }

    pub fn with_capabilities(mut self, capabilities: vk::SurfaceCapabilitiesKHR) -> Self {
        self.capabilities = capabilities;
        self
    }

    pub fn with_formats(mut self, formats: Vec<vk::SurfaceFormatKHR>) -> Self {
        self.formats = formats;
        self
    }

    pub fn with_present_modes(mut self, present_modes: Vec<vk::PresentModeKHR>) -> Self {
        self.present_modes = present_modes;
        self
    }
}

pub struct MockDriver {
    adapters: Vec<MockAdapter>,
    layers: Vec<String>,
    swapchain_images: Option<u32>,
    fail_instance: Option<vk::Result>,
    fail_messenger: Option<vk::Result>,
    fail_device: Option<vk::Result>,
    fail_swapchain: Option<(vk::Result, usize)>,
    fail_adapter_enumeration: Option<vk::Result>,
    fail_view_at: Option<usize>,
    support_queries: Cell<usize>,
    format_queries: Cell<usize>,
    state: Rc<RefCell<MockState>>,
}

impl MockDriver {
    pub fn new(adapters: Vec<MockAdapter>) -> Self {
        Self {
            adapters,
            layers: vec!["VK_LAYER_KHRONOS_validation".to_string()],
            swapchain_images: None,
            fail_instance: None,
            fail_messenger: None,
            fail_device: None,
            fail_swapchain: None,
            fail_adapter_enumeration: None,
            fail_view_at: None,
            support_queries: Cell::new(0),
            format_queries: Cell::new(0),
            state: Rc::default(),
        }
    }

    pub fn adapter_handle(index: usize) -> vk::PhysicalDevice {
        vk::PhysicalDevice::from_raw(index as u64 + 1)
    }

    pub fn with_layers(mut self, layers: &[&str]) -> Self {
        self.layers = layers.iter().map(ToString::to_string).collect();
        self
    }

    /// Images returned per swapchain regardless of the requested count
    pub fn with_swapchain_images(mut self, count: u32) -> Self {
        self.swapchain_images = Some(count);
        self
    }

    pub fn failing_instance(mut self, result: vk::Result) -> Self {
        self.fail_instance = Some(result);
        self
    }

    pub fn failing_messenger(mut self, result: vk::Result) -> Self {
        self.fail_messenger = Some(result);
        self
    }

    pub fn failing_device(mut self, result: vk::Result) -> Self {
        self.fail_device = Some(result);
        self
    }

    pub fn failing_swapchain(self, result: vk::Result) -> Self {
        self.failing_swapchain_from(0, result)
    }

    /// Swapchain creation succeeds `created` times, then fails
    pub fn failing_swapchain_from(mut self, created: usize, result: vk::Result) -> Self {
        self.fail_swapchain = Some((result, created));
        self
    }

    pub fn failing_adapter_enumeration(mut self, result: vk::Result) -> Self {
        self.fail_adapter_enumeration = Some(result);
        self
    }

    /// The image view attempt with this zero-based index fails
    pub fn failing_view_at(mut self, attempt: usize) -> Self {
        self.fail_view_at = Some(attempt);
        self
    }

    pub fn state(&self) -> Rc<RefCell<MockState>> {
        Rc::clone(&self.state)
    }

    pub fn calls(&self) -> Vec<Call> {
        self.state.borrow().calls.clone()
    }

    pub fn surface_support_queries(&self) -> usize {
        self.support_queries.get()
    }

    pub fn surface_format_queries(&self) -> usize {
        self.format_queries.get()
    }

    fn adapter(&self, handle: vk::PhysicalDevice) -> Option<&MockAdapter> {
        let index = usize::try_from(handle.as_raw()).ok()?.checked_sub(1)?;
        self.adapters.get(index)
    }

    fn record(&self, call: Call) {
        self.state.borrow_mut().calls.push(call);
    }
}

fn name_array<const N: usize>(name: &str) -> [c_char; N] {
    let mut raw = [0 as c_char; N];
    for (slot, byte) in raw.iter_mut().zip(name.bytes().take(N - 1)) {
        *slot = byte as c_char;
    }
    raw
}

/// Two-call list semantics over a fixed slice
fn fill<T: Clone>(items: &[T], count: &mut u32, out: Option<&mut [T]>) -> vk::Result {
    match out {
        None => {
            *count = u32::try_from(items.len()).unwrap();
            vk::Result::SUCCESS
        }
        Some(buffer) => {
            let written = buffer.len().min(items.len());
            buffer[..written].clone_from_slice(&items[..written]);
            *count = u32::try_from(written).unwrap();
            if written < items.len() {
                vk::Result::INCOMPLETE
            } else {
                vk::Result::SUCCESS
            }
        }
    }
}

impl Driver for MockDriver {
    fn enumerate_layers(&self, count: &mut u32, out: Option<&mut [vk::LayerProperties]>) -> vk::Result {
        let layers: Vec<vk::LayerProperties> = self
            .layers
            .iter()
            .map(|name| vk::LayerProperties {
                layer_name: name_array(name),
                ..Default::default()
            })
            .collect();
        fill(&layers, count, out)
    }

    fn create_instance(&mut self, desc: &InstanceDescriptor) -> Result<vk::Instance, vk::Result> {
        if let Some(result) = self.fail_instance {
            return Err(result);
        }
        let mut state = self.state.borrow_mut();
        state.calls.push(Call::CreateInstance);
        state.instances.push(desc.clone());
        Ok(mock_instance())
    }

    fn destroy_instance(&mut self, _instance: vk::Instance) {
        self.record(Call::DestroyInstance);
    }

    fn create_debug_messenger(
        &mut self,
        _instance: vk::Instance,
        _desc: &MessengerDescriptor,
    ) -> Result<vk::DebugUtilsMessengerEXT, vk::Result> {
        if let Some(result) = self.fail_messenger {
            return Err(result);
        }
        self.record(Call::CreateDebugMessenger);
        Ok(mock_messenger())
    }

    fn destroy_debug_messenger(&mut self, _instance: vk::Instance, _messenger: vk::DebugUtilsMessengerEXT) {
        self.record(Call::DestroyDebugMessenger);
    }

    fn destroy_surface(&mut self, _instance: vk::Instance, _surface: vk::SurfaceKHR) {
        self.record(Call::DestroySurface);
    }

    fn enumerate_adapters(
        &self,
        _instance: vk::Instance,
        count: &mut u32,
        out: Option<&mut [vk::PhysicalDevice]>,
    ) -> vk::Result {
        if let Some(result) = self.fail_adapter_enumeration {
            return result;
        }
        let handles: Vec<vk::PhysicalDevice> = (0..self.adapters.len()).map(Self::adapter_handle).collect();
        fill(&handles, count, out)
    }

    fn adapter_properties(&self, adapter: vk::PhysicalDevice) -> vk::PhysicalDeviceProperties {
        self.adapter(adapter)
            .map(|mock| vk::PhysicalDeviceProperties {
                device_name: name_array(&mock.name),
                device_type: mock.device_type,
                api_version: vk::API_VERSION_1_0,
                ..Default::default()
            })
            .unwrap_or_default()
    }

    fn enumerate_device_extensions(
        &self,
        adapter: vk::PhysicalDevice,
        count: &mut u32,
        out: Option<&mut [vk::ExtensionProperties]>,
    ) -> vk::Result {
        let extensions: Vec<vk::ExtensionProperties> = self
            .adapter(adapter)
            .map(|mock| mock.extensions.as_slice())
            .unwrap_or_default()
            .iter()
            .map(|name| vk::ExtensionProperties {
                extension_name: name_array(name),
                spec_version: 1,
            })
            .collect();
        fill(&extensions, count, out)
    }

    fn enumerate_queue_families(
        &self,
        adapter: vk::PhysicalDevice,
        count: &mut u32,
        out: Option<&mut [vk::QueueFamilyProperties]>,
    ) -> vk::Result {
        let families: Vec<vk::QueueFamilyProperties> = self
            .adapter(adapter)
            .map(|mock| mock.families.as_slice())
            .unwrap_or_default()
            .iter()
            .map(|family| vk::QueueFamilyProperties {
                queue_flags: family.flags,
                queue_count: 1,
                ..Default::default()
            })
            .collect();
        fill(&families, count, out)
    }

    fn surface_support(
        &self,
        adapter: vk::PhysicalDevice,
        family_index: u32,
        _surface: vk::SurfaceKHR,
    ) -> Result<bool, vk::Result> {
        self.support_queries.set(self.support_queries.get() + 1);
        Ok(self
            .adapter(adapter)
            .and_then(|mock| mock.families.get(family_index as usize))
            .is_some_and(|family| family.present))
    }

    fn surface_capabilities(
        &self,
        adapter: vk::PhysicalDevice,
        _surface: vk::SurfaceKHR,
    ) -> Result<vk::SurfaceCapabilitiesKHR, vk::Result> {
        self.adapter(adapter)
            .map(|mock| mock.capabilities)
            .ok_or(vk::Result::ERROR_SURFACE_LOST_KHR)
    }

    fn enumerate_surface_formats(
        &self,
        adapter: vk::PhysicalDevice,
        _surface: vk::SurfaceKHR,
        count: &mut u32,
        out: Option<&mut [vk::SurfaceFormatKHR]>,
    ) -> vk::Result {
        self.format_queries.set(self.format_queries.get() + 1);
        let formats = self.adapter(adapter).map(|mock| mock.formats.as_slice()).unwrap_or_default();
        fill(formats, count, out)
    }

    fn enumerate_present_modes(
        &self,
        adapter: vk::PhysicalDevice,
        _surface: vk::SurfaceKHR,
        count: &mut u32,
        out: Option<&mut [vk::PresentModeKHR]>,
    ) -> vk::Result {
        let modes = self
            .adapter(adapter)
            .map(|mock| mock.present_modes.as_slice())
            .unwrap_or_default();
        fill(modes, count, out)
    }

    fn create_device(
        &mut self,
        _adapter: vk::PhysicalDevice,
        desc: &DeviceDescriptor,
    ) -> Result<vk::Device, vk::Result> {
        if let Some(result) = self.fail_device {
            return Err(result);
        }
        let mut state = self.state.borrow_mut();
        state.calls.push(Call::CreateDevice);
        state.devices.push(desc.clone());
        Ok(mock_device())
    }

    fn destroy_device(&mut self, _device: vk::Device) {
        self.record(Call::DestroyDevice);
    }

    fn device_wait_idle(&self, _device: vk::Device) -> Result<(), vk::Result> {
        self.record(Call::WaitIdle);
        Ok(())
    }

    fn device_queue(&self, _device: vk::Device, family_index: u32, queue_index: u32) -> vk::Queue {
        vk::Queue::from_raw(0x5000 + u64::from(family_index) * 16 + u64::from(queue_index))
    }

    fn create_swapchain(
        &mut self,
        _device: vk::Device,
        desc: &ChainDescriptor,
    ) -> Result<vk::SwapchainKHR, vk::Result> {
        let mut state = self.state.borrow_mut();
        if let Some((result, created)) = self.fail_swapchain {
            if state.chains.len() >= created {
                return Err(result);
            }
        }
        let handle = vk::SwapchainKHR::from_raw(0x6000 + state.chains.len() as u64);
        let images = self.swapchain_images.unwrap_or(desc.config.image_count);

        state.calls.push(Call::CreateSwapchain);
        state.chains.push(desc.clone());
        state.chain_images.insert(handle, images);
        Ok(handle)
    }

    fn destroy_swapchain(&mut self, _device: vk::Device, chain: vk::SwapchainKHR) {
        let mut state = self.state.borrow_mut();
        state.calls.push(Call::DestroySwapchain);
        state.destroyed_chains.push(chain);
    }

    fn enumerate_swapchain_images(
        &self,
        _device: vk::Device,
        chain: vk::SwapchainKHR,
        count: &mut u32,
        out: Option<&mut [vk::Image]>,
    ) -> vk::Result {
        let Some(&total) = self.state.borrow().chain_images.get(&chain) else {
            return vk::Result::ERROR_SURFACE_LOST_KHR;
        };
        let images: Vec<vk::Image> = (0..u64::from(total))
            .map(|i| vk::Image::from_raw((chain.as_raw() << 8) + i + 1))
            .collect();
        fill(&images, count, out)
    }

    fn create_image_view(&mut self, _device: vk::Device, desc: &ViewDescriptor) -> Result<vk::ImageView, vk::Result> {
        let mut state = self.state.borrow_mut();
        let attempt = state.view_attempts;
        state.view_attempts += 1;
        if self.fail_view_at == Some(attempt) {
            return Err(vk::Result::ERROR_OUT_OF_HOST_MEMORY);
        }

        let view = vk::ImageView::from_raw(0x9000 + attempt as u64);
        state.calls.push(Call::CreateImageView(view));
        state.views.push(*desc);
        Ok(view)
    }

    fn destroy_image_view(&mut self, _device: vk::Device, view: vk::ImageView) {
        self.record(Call::DestroyImageView(view));
    }
}

/// Window stand-in recording surface creation into the driver's call log
pub struct MockWindow {
    state: Rc<RefCell<MockState>>,
    extensions: Vec<String>,
    size: (u32, u32),
    surface_error: Option<vk::Result>,
}

impl MockWindow {
    pub fn new(driver: &MockDriver) -> Self {
        Self {
            state: driver.state(),
            extensions: vec!["VK_KHR_surface".to_string(), "VK_KHR_xcb_surface".to_string()],
            size: (800, 600),
            surface_error: None,
        }
    }

    pub fn with_size(mut self, width: u32, height: u32) -> Self {
        self.size = (width, height);
        self
    }

    pub fn failing_surface(mut self, result: vk::Result) -> Self {
        self.surface_error = Some(result);
        self
    }
}

impl SurfaceProvider for MockWindow {
    fn required_instance_extensions(&self) -> WindowResult<Vec<String>> {
        Ok(self.extensions.clone())
    }

    fn create_surface(&mut self, _instance: vk::Instance) -> WindowResult<vk::SurfaceKHR> {
        if let Some(result) = self.surface_error {
            return Err(WindowError::SurfaceCreation(result));
        }
        self.state.borrow_mut().calls.push(Call::CreateSurface);
        Ok(mock_surface())
    }

    fn framebuffer_size(&self) -> (u32, u32) {
        self.size
    }
}
