//! Physical device selection
//!
//! Adapters are evaluated in the order the driver enumerates them and the
//! first suitable one is taken. There is no scoring: when several adapters
//! qualify, enumeration order decides.

use std::os::raw::c_char;

use ash::vk;

use super::driver::Driver;
use super::error::{VulkanError, VulkanResult};
use super::query::enumerate;
use super::queue_family::QueueFamilyIndices;

/// Surface capabilities, formats and present modes for an (adapter, surface) pair
#[derive(Debug, Clone)]
pub struct SurfaceSupport {
    /// Image count and extent limits
    pub capabilities: vk::SurfaceCapabilitiesKHR,
    /// Supported (format, colour space) pairs
    pub formats: Vec<vk::SurfaceFormatKHR>,
    /// Supported present modes
    pub present_modes: Vec<vk::PresentModeKHR>,
}

impl SurfaceSupport {
    /// Query the current surface support snapshot
    pub fn query<D: Driver + ?Sized>(
        driver: &D,
        adapter: vk::PhysicalDevice,
        surface: vk::SurfaceKHR,
    ) -> VulkanResult<Self> {
        let capabilities = driver
            .surface_capabilities(adapter, surface)
            .map_err(|result| VulkanError::query("surface capabilities", result))?;
        let formats = enumerate("surface formats", |count, out| {
            driver.enumerate_surface_formats(adapter, surface, count, out)
        })?;
        let present_modes = enumerate("present modes", |count, out| {
            driver.enumerate_present_modes(adapter, surface, count, out)
        })?;

        Ok(Self {
            capabilities,
            formats,
            present_modes,
        })
    }

    /// At least one format and one present mode are available
    #[must_use]
    pub fn is_adequate(&self) -> bool {
        !self.formats.is_empty() && !self.present_modes.is_empty()
    }
}

/// Why an adapter was accepted or passed over
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Suitability {
    /// Every check passed
    Suitable(QueueFamilyIndices),
    /// No graphics family, no present family, or neither
    IncompleteQueueFamilies(QueueFamilyIndices),
    /// Required device extensions the adapter lacks
    MissingExtensions(Vec<String>),
    /// The surface reports no formats or no present modes
    InadequateSurface,
}

/// The adapter chosen for rendering
#[derive(Debug, Clone)]
pub struct Adapter {
    handle: vk::PhysicalDevice,
    name: String,
    device_type: vk::PhysicalDeviceType,
    graphics_family: u32,
    present_family: u32,
}

impl Adapter {
    /// Raw physical device handle
    #[must_use]
    pub const fn handle(&self) -> vk::PhysicalDevice {
        self.handle
    }

    /// Device name reported by the driver
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Discrete, integrated, virtual, CPU or other
    #[must_use]
    pub const fn device_type(&self) -> vk::PhysicalDeviceType {
        self.device_type
    }

    /// Index of the graphics queue family
    #[must_use]
    pub const fn graphics_family(&self) -> u32 {
        self.graphics_family
    }

    /// Index of the presentation queue family
    #[must_use]
    pub const fn present_family(&self) -> u32 {
        self.present_family
    }

    /// Resolved families as indices
    #[must_use]
    pub const fn queue_families(&self) -> QueueFamilyIndices {
        QueueFamilyIndices {
            graphics_family: Some(self.graphics_family),
            present_family: Some(self.present_family),
        }
    }
}

/// Pick the first adapter able to render to `surface`.
///
/// Fails with [`VulkanError::NoAdapterFound`] when nothing is enumerated and
/// [`VulkanError::NoSuitableAdapter`] when every adapter fails [`evaluate`].
pub fn select_adapter<D: Driver + ?Sized>(
    driver: &D,
    instance: vk::Instance,
    surface: vk::SurfaceKHR,
    required_extensions: &[String],
) -> VulkanResult<Adapter> {
    let adapters = enumerate("physical devices", |count, out| {
        driver.enumerate_adapters(instance, count, out)
    })?;

    if adapters.is_empty() {
        return Err(VulkanError::NoAdapterFound);
    }

    for handle in adapters {
        let properties = driver.adapter_properties(handle);
        let name = raw_name(&properties.device_name);

        match evaluate(driver, handle, surface, required_extensions)? {
            Suitability::Suitable(indices) => {
                let Some((graphics_family, present_family)) = indices.pair() else {
                    continue;
                };
                log::info!("Selected GPU: {} ({:?})", name, properties.device_type);
                return Ok(Adapter {
                    handle,
                    name,
                    device_type: properties.device_type,
                    graphics_family,
                    present_family,
                });
            }
            rejected => log::debug!("Skipping GPU {}: {:?}", name, rejected),
        }
    }

    Err(VulkanError::NoSuitableAdapter)
}

/// Run the suitability checks for one adapter.
///
/// Queue families must resolve completely, every required extension must be
/// supported, and only then is the surface asked for formats and present modes.
pub fn evaluate<D: Driver + ?Sized>(
    driver: &D,
    adapter: vk::PhysicalDevice,
    surface: vk::SurfaceKHR,
    required_extensions: &[String],
) -> VulkanResult<Suitability> {
    let indices = QueueFamilyIndices::resolve(driver, adapter, surface)?;
    if !indices.is_complete() {
        return Ok(Suitability::IncompleteQueueFamilies(indices));
    }

    let missing = missing_extensions(driver, adapter, required_extensions)?;
    if !missing.is_empty() {
        return Ok(Suitability::MissingExtensions(missing));
    }

    if !SurfaceSupport::query(driver, adapter, surface)?.is_adequate() {
        return Ok(Suitability::InadequateSurface);
    }

    Ok(Suitability::Suitable(indices))
}

fn missing_extensions<D: Driver + ?Sized>(
    driver: &D,
    adapter: vk::PhysicalDevice,
    required: &[String],
) -> VulkanResult<Vec<String>> {
    let available: Vec<String> = enumerate("device extensions", |count, out| {
        driver.enumerate_device_extensions(adapter, count, out)
    })?
    .iter()
    .map(|extension| raw_name(&extension.extension_name))
    .collect();

    Ok(required
        .iter()
        .filter(|name| !available.contains(name))
        .cloned()
        .collect())
}

/// Read a NUL-terminated name out of a fixed-size driver array
#[allow(clippy::cast_sign_loss)]
pub(crate) fn raw_name(raw: &[c_char]) -> String {
    let bytes: Vec<u8> = raw.iter().take_while(|&&c| c != 0).map(|&c| c as u8).collect();
    String::from_utf8_lossy(&bytes).into_owned()
}
