//! Vulkan context management
//!
//! [`DeviceContext`] acquires the long-lived Vulkan objects in a fixed order
//! and owns every one of them. Teardown is a single private routine run from
//! `Drop`, so the reverse order cannot be broken by callers, and a failure
//! halfway through startup releases exactly what was already acquired.

use std::ffi::CString;

use ash::extensions::ext::DebugUtils;
use ash::vk;

use crate::config::BootstrapConfig;
use crate::render::window::SurfaceProvider;

use super::adapter::{raw_name, select_adapter, Adapter};
use super::debug::messenger_descriptor;
use super::driver::{DeviceDescriptor, Driver, InstanceDescriptor, QueueRequest};
use super::error::{VulkanError, VulkanResult};
use super::query::enumerate;
use super::queue_family::QueueFamilyIndices;
use super::swapchain::{PresentationChain, PresentationChainBuilder, PresentationPreferences};

/// Engine name reported at instance creation
pub const ENGINE_NAME: &str = "vkinit";

/// Startup progress of a [`DeviceContext`].
///
/// Transitions are one-way and happen in declaration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ContextState {
    /// Nothing acquired
    Uninitialized,
    /// Instance created
    ContextCreated,
    /// Debug messenger registered, or skipped with validation off
    DebugBound,
    /// Window surface created
    SurfaceBound,
    /// Physical device selected
    AdapterChosen,
    /// Logical device created
    DeviceCreated,
    /// Queue handles retrieved
    QueuesResolved,
    /// Startup complete
    Ready,
}

impl ContextState {
    /// The only state reachable from this one
    #[must_use]
    pub const fn next(self) -> Option<Self> {
        match self {
            Self::Uninitialized => Some(Self::ContextCreated),
            Self::ContextCreated => Some(Self::DebugBound),
            Self::DebugBound => Some(Self::SurfaceBound),
            Self::SurfaceBound => Some(Self::AdapterChosen),
            Self::AdapterChosen => Some(Self::DeviceCreated),
            Self::DeviceCreated => Some(Self::QueuesResolved),
            Self::QueuesResolved => Some(Self::Ready),
            Self::Ready => None,
        }
    }
}

/// Graphics and present queue handles
#[derive(Debug, Clone, Copy, Default)]
pub struct Queues {
    /// Queue from the graphics family
    pub graphics: vk::Queue,
    /// Queue from the present family; equal to `graphics` for a combined family
    pub present: vk::Queue,
}

/// Owns the instance, messenger, surface, device, queues and presentation chain
pub struct DeviceContext<D: Driver> {
    driver: D,
    state: ContextState,
    validation: bool,
    preferences: PresentationPreferences,
    instance: vk::Instance,
    debug_messenger: Option<vk::DebugUtilsMessengerEXT>,
    surface: vk::SurfaceKHR,
    adapter: Option<Adapter>,
    device: vk::Device,
    queues: Queues,
    chain: Option<PresentationChain>,
}

impl<D: Driver> DeviceContext<D> {
    /// Run startup up to [`ContextState::Ready`] and build the presentation chain
    pub fn bootstrap<W: SurfaceProvider>(driver: D, window: &mut W, config: &BootstrapConfig) -> VulkanResult<Self> {
        let mut context = Self::new(driver, window, config)?;
        context.create_presentation_chain(window.framebuffer_size())?;
        Ok(context)
    }

    /// Run startup up to [`ContextState::Ready`]
    pub fn new<W: SurfaceProvider>(driver: D, window: &mut W, config: &BootstrapConfig) -> VulkanResult<Self> {
        config
            .validate()
            .map_err(|e| VulkanError::ContextCreationFailed(e.to_string()))?;

        let mut context = Self {
            driver,
            state: ContextState::Uninitialized,
            validation: config.validation_enabled(),
            preferences: PresentationPreferences::from(config),
            instance: vk::Instance::null(),
            debug_messenger: None,
            surface: vk::SurfaceKHR::null(),
            adapter: None,
            device: vk::Device::null(),
            queues: Queues::default(),
            chain: None,
        };

        // Dropping `context` on any early return tears down what exists so far
        context.create_instance(&*window, config)?;
        context.bind_debug_messenger()?;
        context.bind_surface(window)?;
        context.choose_adapter(&config.device_extensions)?;
        context.create_device(config)?;
        context.resolve_queues()?;
        context.advance(ContextState::Ready)?;

        log::info!("Vulkan context ready");
        Ok(context)
    }

    fn advance(&mut self, target: ContextState) -> VulkanResult<()> {
        if self.state.next() != Some(target) {
            return Err(VulkanError::InvalidOperation {
                reason: format!("cannot move from {:?} to {:?}", self.state, target),
            });
        }
        log::trace!("Context state {:?} -> {:?}", self.state, target);
        self.state = target;
        Ok(())
    }

    fn create_instance<W: SurfaceProvider + ?Sized>(&mut self, window: &W, config: &BootstrapConfig) -> VulkanResult<()> {
        let layers = if self.validation {
            self.check_validation_layers(&config.validation_layers)?
        } else {
            Vec::new()
        };

        let mut extensions = window
            .required_instance_extensions()
            .map_err(|e| VulkanError::ContextCreationFailed(e.to_string()))?
            .into_iter()
            .map(to_cstring)
            .collect::<VulkanResult<Vec<_>>>()?;
        if self.validation {
            extensions.push(DebugUtils::name().to_owned());
        }

        let desc = InstanceDescriptor {
            application_name: to_cstring(config.application_name.clone())?,
            application_version: config.packed_version(),
            engine_name: to_cstring(ENGINE_NAME.to_string())?,
            engine_version: vk::make_api_version(0, 1, 0, 0),
            api_version: vk::API_VERSION_1_0,
            extensions,
            layers,
            debug: self.validation.then(messenger_descriptor),
        };

        self.instance = self
            .driver
            .create_instance(&desc)
            .map_err(|result| VulkanError::ContextCreationFailed(format!("{result:?}")))?;
        self.advance(ContextState::ContextCreated)?;

        log::info!(
            "Vulkan instance created ({} extensions, validation {})",
            desc.extensions.len(),
            if self.validation { "on" } else { "off" }
        );
        Ok(())
    }

    /// Every requested layer must be installed before the instance exists,
    /// since a failed instance leaves no channel to report through
    fn check_validation_layers(&self, requested: &[String]) -> VulkanResult<Vec<CString>> {
        let available: Vec<String> = enumerate("instance layers", |count, out| {
            self.driver.enumerate_layers(count, out)
        })?
        .iter()
        .map(|layer| raw_name(&layer.layer_name))
        .collect();

        let missing: Vec<String> = requested
            .iter()
            .filter(|name| !available.contains(name))
            .cloned()
            .collect();
        if !missing.is_empty() {
            return Err(VulkanError::ValidationUnavailable { missing });
        }

        requested.iter().cloned().map(to_cstring).collect()
    }

    fn bind_debug_messenger(&mut self) -> VulkanResult<()> {
        if self.validation {
            let messenger = self
                .driver
                .create_debug_messenger(self.instance, &messenger_descriptor())
                .map_err(VulkanError::DebugMessengerFailed)?;
            self.debug_messenger = Some(messenger);
            log::debug!("Debug messenger registered");
        }
        self.advance(ContextState::DebugBound)
    }

    fn bind_surface<W: SurfaceProvider + ?Sized>(&mut self, window: &mut W) -> VulkanResult<()> {
        self.surface = window
            .create_surface(self.instance)
            .map_err(|e| VulkanError::SurfaceCreationFailed(e.to_string()))?;
        log::info!("Window surface created");
        self.advance(ContextState::SurfaceBound)
    }

    fn choose_adapter(&mut self, required_extensions: &[String]) -> VulkanResult<()> {
        let adapter = select_adapter(&self.driver, self.instance, self.surface, required_extensions)?;
        self.adapter = Some(adapter);
        self.advance(ContextState::AdapterChosen)
    }

    fn create_device(&mut self, config: &BootstrapConfig) -> VulkanResult<()> {
        let adapter = self.adapter.as_ref().ok_or_else(|| VulkanError::InvalidOperation {
            reason: "device requested before adapter selection".to_string(),
        })?;

        let queues = queue_requests(&adapter.queue_families());
        let extensions = config
            .device_extensions
            .iter()
            .cloned()
            .map(to_cstring)
            .collect::<VulkanResult<Vec<_>>>()?;
        let layers = if self.validation {
            config.validation_layers.iter().cloned().map(to_cstring).collect::<VulkanResult<Vec<_>>>()?
        } else {
            Vec::new()
        };

        let desc = DeviceDescriptor {
            queues,
            extensions,
            layers,
        };
        let handle = adapter.handle();

        self.device = self
            .driver
            .create_device(handle, &desc)
            .map_err(VulkanError::DeviceCreationFailed)?;
        log::info!("Logical device created with {} queue families", desc.queues.len());
        self.advance(ContextState::DeviceCreated)
    }

    fn resolve_queues(&mut self) -> VulkanResult<()> {
        let (graphics_family, present_family) = self
            .adapter
            .as_ref()
            .map(|adapter| (adapter.graphics_family(), adapter.present_family()))
            .ok_or_else(|| VulkanError::InvalidOperation {
                reason: "queues requested before adapter selection".to_string(),
            })?;

        self.queues = Queues {
            graphics: self.driver.device_queue(self.device, graphics_family, 0),
            present: self.driver.device_queue(self.device, present_family, 0),
        };
        self.advance(ContextState::QueuesResolved)
    }

    /// Build the presentation chain for the current framebuffer size
    pub fn create_presentation_chain(&mut self, framebuffer_size: (u32, u32)) -> VulkanResult<&PresentationChain> {
        if self.chain.is_some() {
            return Err(VulkanError::InvalidOperation {
                reason: "presentation chain already exists; recreate it instead".to_string(),
            });
        }

        let chain = self.chain_builder()?.build(&mut self.driver, framebuffer_size)?;
        Ok(self.chain.insert(chain))
    }

    /// Replace the presentation chain after a resize.
    ///
    /// The previous chain is handed to the driver as `old_swapchain` and is
    /// destroyed once its replacement exists. A rebuild rejected before the
    /// driver sees it (zero extent, failed surface query) leaves the previous
    /// chain in place. Once the swapchain call has been issued the previous
    /// chain is retired, so a later failure destroys it as well and leaves no
    /// chain; [`create_presentation_chain`](Self::create_presentation_chain)
    /// starts over from there.
    pub fn recreate_presentation_chain(&mut self, framebuffer_size: (u32, u32)) -> VulkanResult<&PresentationChain> {
        let old_handle = self
            .chain
            .as_ref()
            .map(PresentationChain::handle)
            .ok_or_else(|| VulkanError::InvalidOperation {
                reason: "no presentation chain to recreate".to_string(),
            })?;

        self.wait_idle()?;
        let chain = match self
            .chain_builder()?
            .with_old_chain(old_handle)
            .try_build(&mut self.driver, framebuffer_size)
        {
            Ok(chain) => chain,
            Err(failure) => {
                if failure.old_chain_retired {
                    if let Some(old) = self.chain.take() {
                        old.destroy(&mut self.driver, self.device);
                    }
                    log::warn!("Presentation chain rebuild failed after retiring the previous chain");
                }
                return Err(failure.error);
            }
        };

        if let Some(old) = self.chain.take() {
            old.destroy(&mut self.driver, self.device);
        }
        log::debug!("Presentation chain recreated");
        Ok(self.chain.insert(chain))
    }

    fn chain_builder(&self) -> VulkanResult<PresentationChainBuilder> {
        match (&self.adapter, self.state) {
            (Some(adapter), ContextState::Ready) => Ok(PresentationChainBuilder::new(adapter, self.device, self.surface)
                .with_preferences(self.preferences)),
            _ => Err(VulkanError::InvalidOperation {
                reason: format!("presentation chain needs a ready context, state is {:?}", self.state),
            }),
        }
    }

    /// Block until the device is idle
    pub fn wait_idle(&self) -> VulkanResult<()> {
        if self.device == vk::Device::null() {
            return Ok(());
        }
        self.driver
            .device_wait_idle(self.device)
            .map_err(|result| VulkanError::query("device idle", result))
    }

    /// Release everything in reverse acquisition order
    fn teardown(&mut self) {
        if self.state == ContextState::Uninitialized {
            return;
        }
        log::debug!("Tearing down Vulkan context from {:?}", self.state);

        if let Err(err) = self.wait_idle() {
            log::warn!("Device did not go idle before teardown: {}", err);
        }

        if let Some(chain) = self.chain.take() {
            chain.destroy(&mut self.driver, self.device);
        }

        if let Some(messenger) = self.debug_messenger.take() {
            self.driver.destroy_debug_messenger(self.instance, messenger);
            log::debug!("Debug messenger destroyed");
        }

        self.queues = Queues::default();
        if self.device != vk::Device::null() {
            self.driver.destroy_device(self.device);
            self.device = vk::Device::null();
            log::debug!("Logical device destroyed");
        }

        self.adapter = None;
        if self.surface != vk::SurfaceKHR::null() {
            self.driver.destroy_surface(self.instance, self.surface);
            self.surface = vk::SurfaceKHR::null();
            log::debug!("Surface destroyed");
        }

        if self.instance != vk::Instance::null() {
            self.driver.destroy_instance(self.instance);
            self.instance = vk::Instance::null();
            log::debug!("Instance destroyed");
        }

        self.state = ContextState::Uninitialized;
    }

    /// Current startup state
    pub const fn state(&self) -> ContextState {
        self.state
    }

    /// Whether validation layers and the messenger are active
    pub const fn validation_enabled(&self) -> bool {
        self.validation
    }

    /// The driver this context runs on
    pub const fn driver(&self) -> &D {
        &self.driver
    }

    /// Instance handle
    pub const fn instance(&self) -> vk::Instance {
        self.instance
    }

    /// Debug messenger, when validation is on
    pub const fn debug_messenger(&self) -> Option<vk::DebugUtilsMessengerEXT> {
        self.debug_messenger
    }

    /// Window surface handle
    pub const fn surface(&self) -> vk::SurfaceKHR {
        self.surface
    }

    /// Selected physical device
    pub const fn adapter(&self) -> Option<&Adapter> {
        self.adapter.as_ref()
    }

    /// Logical device handle
    pub const fn device(&self) -> vk::Device {
        self.device
    }

    /// Graphics and present queues
    pub const fn queues(&self) -> Queues {
        self.queues
    }

    /// Graphics queue handle
    pub const fn graphics_queue(&self) -> vk::Queue {
        self.queues.graphics
    }

    /// Present queue handle
    pub const fn present_queue(&self) -> vk::Queue {
        self.queues.present
    }

    /// Resolved queue family indices
    pub fn queue_families(&self) -> QueueFamilyIndices {
        self.adapter
            .as_ref()
            .map(Adapter::queue_families)
            .unwrap_or_default()
    }

    /// Current presentation chain
    pub const fn presentation_chain(&self) -> Option<&PresentationChain> {
        self.chain.as_ref()
    }
}

impl<D: Driver> Drop for DeviceContext<D> {
    fn drop(&mut self) {
        self.teardown();
    }
}

/// One request per distinct family, one queue each at priority 1.0
fn queue_requests(indices: &QueueFamilyIndices) -> Vec<QueueRequest> {
    indices
        .unique_families()
        .into_iter()
        .map(|family_index| QueueRequest {
            family_index,
            priorities: vec![1.0],
        })
        .collect()
}

fn to_cstring(name: String) -> VulkanResult<CString> {
    CString::new(name).map_err(|e| VulkanError::ContextCreationFailed(format!("invalid name: {e}")))
}
