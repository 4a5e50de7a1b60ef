//! Presentation chain negotiation
//!
//! Turns a surface support snapshot into a swapchain configuration, creates the
//! swapchain and one view per image.

use ash::vk;

use crate::config::BootstrapConfig;

use super::adapter::{Adapter, SurfaceSupport};
use super::driver::{ChainDescriptor, Driver, ViewDescriptor};
use super::error::{VulkanError, VulkanResult};
use super::query::enumerate;

/// Format and present mode searched for before falling back
#[derive(Debug, Clone, Copy)]
pub struct PresentationPreferences {
    /// Exact (format, colour space) pair to look for
    pub format: vk::SurfaceFormatKHR,
    /// Low-latency present mode to look for
    pub present_mode: vk::PresentModeKHR,
}

impl Default for PresentationPreferences {
    fn default() -> Self {
        Self {
            format: vk::SurfaceFormatKHR {
                format: vk::Format::B8G8R8A8_SRGB,
                color_space: vk::ColorSpaceKHR::SRGB_NONLINEAR,
            },
            present_mode: vk::PresentModeKHR::MAILBOX,
        }
    }
}

impl From<&BootstrapConfig> for PresentationPreferences {
    fn from(config: &BootstrapConfig) -> Self {
        Self {
            format: config.preferred_format.to_vk(),
            present_mode: config.preferred_present_mode.to_vk(),
        }
    }
}

/// How swapchain images are shared between queue families
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SharingMode {
    /// One family owns the images; no family list
    Exclusive,
    /// Graphics and present families share the images, graphics first
    Concurrent([u32; 2]),
}

impl SharingMode {
    /// Exclusive when both families are the same, concurrent otherwise
    #[must_use]
    pub const fn for_families(graphics_family: u32, present_family: u32) -> Self {
        if graphics_family == present_family {
            Self::Exclusive
        } else {
            Self::Concurrent([graphics_family, present_family])
        }
    }

    /// The Vulkan sharing mode
    #[must_use]
    pub const fn vk_mode(&self) -> vk::SharingMode {
        match self {
            Self::Exclusive => vk::SharingMode::EXCLUSIVE,
            Self::Concurrent(_) => vk::SharingMode::CONCURRENT,
        }
    }

    /// Families listed in the create info; empty for exclusive sharing
    #[must_use]
    pub fn family_indices(&self) -> &[u32] {
        match self {
            Self::Exclusive => &[],
            Self::Concurrent(families) => families,
        }
    }
}

/// Resolved swapchain parameters
#[derive(Debug, Clone, Copy)]
pub struct PresentationChainConfig {
    /// Image format
    pub format: vk::Format,
    /// Image colour space
    pub color_space: vk::ColorSpaceKHR,
    /// Present mode
    pub present_mode: vk::PresentModeKHR,
    /// Image size in pixels
    pub extent: vk::Extent2D,
    /// Minimum image count requested from the driver
    pub image_count: u32,
    /// Queue family sharing
    pub sharing: SharingMode,
}

impl PresentationChainConfig {
    /// Derive the configuration from a surface snapshot.
    ///
    /// Deterministic: the same snapshot, preferences, size and families always
    /// produce the same configuration.
    pub fn negotiate(
        support: &SurfaceSupport,
        preferences: &PresentationPreferences,
        framebuffer_size: (u32, u32),
        (graphics_family, present_family): (u32, u32),
    ) -> VulkanResult<Self> {
        let format = choose_surface_format(&support.formats, preferences.format)
            .ok_or(VulkanError::ChainCreationFailed(vk::Result::ERROR_FORMAT_NOT_SUPPORTED))?;

        Ok(Self {
            format: format.format,
            color_space: format.color_space,
            present_mode: choose_present_mode(&support.present_modes, preferences.present_mode),
            extent: choose_extent(&support.capabilities, framebuffer_size),
            image_count: choose_image_count(&support.capabilities),
            sharing: SharingMode::for_families(graphics_family, present_family),
        })
    }

    /// Format and colour space as a pair
    #[must_use]
    pub const fn surface_format(&self) -> vk::SurfaceFormatKHR {
        vk::SurfaceFormatKHR {
            format: self.format,
            color_space: self.color_space,
        }
    }
}

impl PartialEq for PresentationChainConfig {
    fn eq(&self, other: &Self) -> bool {
        self.format == other.format
            && self.color_space == other.color_space
            && self.present_mode == other.present_mode
            && self.extent.width == other.extent.width
            && self.extent.height == other.extent.height
            && self.image_count == other.image_count
            && self.sharing == other.sharing
    }
}

impl Eq for PresentationChainConfig {}

/// Exact match on the preferred pair, else the first reported format.
///
/// `None` only when the list is empty, which adapter selection rules out.
#[must_use]
pub fn choose_surface_format(
    available: &[vk::SurfaceFormatKHR],
    preferred: vk::SurfaceFormatKHR,
) -> Option<vk::SurfaceFormatKHR> {
    available
        .iter()
        .find(|sf| sf.format == preferred.format && sf.color_space == preferred.color_space)
        .or_else(|| available.first())
        .copied()
}

/// The preferred mode when reported, else FIFO which every driver supports
#[must_use]
pub fn choose_present_mode(available: &[vk::PresentModeKHR], preferred: vk::PresentModeKHR) -> vk::PresentModeKHR {
    if available.contains(&preferred) {
        preferred
    } else {
        vk::PresentModeKHR::FIFO
    }
}

/// The driver's fixed extent, or the framebuffer size clamped into the surface limits.
///
/// A current width of `u32::MAX` means the surface takes its size from the swapchain.
#[must_use]
pub fn choose_extent(capabilities: &vk::SurfaceCapabilitiesKHR, (width, height): (u32, u32)) -> vk::Extent2D {
    if capabilities.current_extent.width != u32::MAX {
        return capabilities.current_extent;
    }

    let min = capabilities.min_image_extent;
    let max = capabilities.max_image_extent;
    vk::Extent2D {
        width: width.max(min.width).min(max.width),
        height: height.max(min.height).min(max.height),
    }
}

/// One image above the minimum, capped by a non-zero maximum
#[must_use]
pub const fn choose_image_count(capabilities: &vk::SurfaceCapabilitiesKHR) -> u32 {
    let count = capabilities.min_image_count.saturating_add(1);
    if capabilities.max_image_count > 0 && count > capabilities.max_image_count {
        capabilities.max_image_count
    } else {
        count
    }
}

/// 2D colour view over a single mip level and layer
#[must_use]
pub const fn view_descriptor(image: vk::Image, format: vk::Format) -> ViewDescriptor {
    ViewDescriptor {
        image,
        view_type: vk::ImageViewType::TYPE_2D,
        format,
        components: vk::ComponentMapping {
            r: vk::ComponentSwizzle::IDENTITY,
            g: vk::ComponentSwizzle::IDENTITY,
            b: vk::ComponentSwizzle::IDENTITY,
            a: vk::ComponentSwizzle::IDENTITY,
        },
        subresource_range: vk::ImageSubresourceRange {
            aspect_mask: vk::ImageAspectFlags::COLOR,
            base_mip_level: 0,
            level_count: 1,
            base_array_layer: 0,
            layer_count: 1,
        },
    }
}

/// A created swapchain with one view per image.
///
/// The images belong to the swapchain; the views belong to this struct and are
/// released by [`DeviceContext`](super::DeviceContext) before the device.
#[derive(Debug)]
pub struct PresentationChain {
    handle: vk::SwapchainKHR,
    images: Vec<vk::Image>,
    image_views: Vec<vk::ImageView>,
    config: PresentationChainConfig,
}

impl PresentationChain {
    /// Swapchain handle
    #[must_use]
    pub const fn handle(&self) -> vk::SwapchainKHR {
        self.handle
    }

    /// Images as returned by the driver after creation
    #[must_use]
    pub fn images(&self) -> &[vk::Image] {
        &self.images
    }

    /// One view per image, in image order
    #[must_use]
    pub fn image_views(&self) -> &[vk::ImageView] {
        &self.image_views
    }

    /// Number of images the driver actually created
    #[must_use]
    pub fn image_count(&self) -> usize {
        self.images.len()
    }

    /// Parameters the chain was created with
    #[must_use]
    pub const fn config(&self) -> &PresentationChainConfig {
        &self.config
    }

    /// Image extent
    #[must_use]
    pub const fn extent(&self) -> vk::Extent2D {
        self.config.extent
    }

    /// Image format
    #[must_use]
    pub const fn format(&self) -> vk::Format {
        self.config.format
    }

    /// Release views, then the swapchain
    pub(crate) fn destroy<D: Driver + ?Sized>(self, driver: &mut D, device: vk::Device) {
        destroy_views(driver, device, self.image_views);
        driver.destroy_swapchain(device, self.handle);
        log::debug!("Swapchain destroyed");
    }
}

fn destroy_views<D: Driver + ?Sized>(driver: &mut D, device: vk::Device, views: Vec<vk::ImageView>) {
    for view in views.into_iter().rev() {
        driver.destroy_image_view(device, view);
    }
}

/// A failed build
#[derive(Debug)]
pub(crate) struct BuildFailure {
    pub(crate) error: VulkanError,
    /// The swapchain call was issued with a non-null old chain, which the
    /// driver retires whether or not the new chain survives
    pub(crate) old_chain_retired: bool,
}

impl BuildFailure {
    const fn before_creation(error: VulkanError) -> Self {
        Self {
            error,
            old_chain_retired: false,
        }
    }
}

/// Builds a [`PresentationChain`] for an adapter, device and surface
#[derive(Debug, Clone)]
pub struct PresentationChainBuilder {
    adapter: vk::PhysicalDevice,
    families: (u32, u32),
    device: vk::Device,
    surface: vk::SurfaceKHR,
    preferences: PresentationPreferences,
    old_chain: vk::SwapchainKHR,
}

impl PresentationChainBuilder {
    /// Builder with default preferences and no previous chain
    #[must_use]
    pub fn new(adapter: &Adapter, device: vk::Device, surface: vk::SurfaceKHR) -> Self {
        Self {
            adapter: adapter.handle(),
            families: (adapter.graphics_family(), adapter.present_family()),
            device,
            surface,
            preferences: PresentationPreferences::default(),
            old_chain: vk::SwapchainKHR::null(),
        }
    }

    /// Set format and present mode preferences
    #[must_use]
    pub const fn with_preferences(mut self, preferences: PresentationPreferences) -> Self {
        self.preferences = preferences;
        self
    }

    /// Chain being replaced
    #[must_use]
    pub const fn with_old_chain(mut self, old_chain: vk::SwapchainKHR) -> Self {
        self.old_chain = old_chain;
        self
    }

    /// Query the surface, negotiate, and create the swapchain and its views.
    ///
    /// Any failure releases what this call created before returning.
    pub fn build<D: Driver + ?Sized>(
        &self,
        driver: &mut D,
        framebuffer_size: (u32, u32),
    ) -> VulkanResult<PresentationChain> {
        self.try_build(driver, framebuffer_size).map_err(|failure| failure.error)
    }

    /// [`build`](Self::build), also reporting whether the old chain was retired
    pub(crate) fn try_build<D: Driver + ?Sized>(
        &self,
        driver: &mut D,
        framebuffer_size: (u32, u32),
    ) -> Result<PresentationChain, BuildFailure> {
        let support =
            SurfaceSupport::query(&*driver, self.adapter, self.surface).map_err(BuildFailure::before_creation)?;
        let config = PresentationChainConfig::negotiate(&support, &self.preferences, framebuffer_size, self.families)
            .map_err(BuildFailure::before_creation)?;

        if config.extent.width == 0 || config.extent.height == 0 {
            log::debug!("Surface has zero extent, not building a swapchain");
            return Err(BuildFailure::before_creation(VulkanError::ChainCreationFailed(
                vk::Result::ERROR_OUT_OF_DATE_KHR,
            )));
        }

        // From here on the old chain is retired, even if creation fails
        let retired = self.old_chain != vk::SwapchainKHR::null();
        let failed = |error| BuildFailure {
            error,
            old_chain_retired: retired,
        };

        let desc = ChainDescriptor {
            surface: self.surface,
            config,
            pre_transform: support.capabilities.current_transform,
            old_chain: self.old_chain,
        };
        let handle = driver
            .create_swapchain(self.device, &desc)
            .map_err(|result| failed(VulkanError::ChainCreationFailed(result)))?;

        let images = match enumerate("swapchain images", |count, out| {
            driver.enumerate_swapchain_images(self.device, handle, count, out)
        }) {
            Ok(images) => images,
            Err(err) => {
                driver.destroy_swapchain(self.device, handle);
                return Err(failed(err));
            }
        };

        let mut image_views = Vec::with_capacity(images.len());
        for (index, &image) in images.iter().enumerate() {
            match driver.create_image_view(self.device, &view_descriptor(image, config.format)) {
                Ok(view) => image_views.push(view),
                Err(result) => {
                    destroy_views(driver, self.device, image_views);
                    driver.destroy_swapchain(self.device, handle);
                    return Err(failed(VulkanError::ViewCreationFailed { index, result }));
                }
            }
        }

        log::info!(
            "Swapchain created: {} images ({} requested), {}x{}, {:?}/{:?}, {:?}, {:?}",
            images.len(),
            config.image_count,
            config.extent.width,
            config.extent.height,
            config.format,
            config.color_space,
            config.present_mode,
            config.sharing,
        );

        Ok(PresentationChain {
            handle,
            images,
            image_views,
            config,
        })
    }
}
