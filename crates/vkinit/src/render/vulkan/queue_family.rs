//! Queue family resolution
//!
//! Finds the families an adapter offers for graphics work and for presenting
//! to a surface. The two capabilities are independent: one family may have
//! both, or two different families may each supply one.

use std::collections::BTreeSet;

use ash::vk;

use super::driver::Driver;
use super::error::{VulkanError, VulkanResult};
use super::query::enumerate;

/// Graphics and present family indices for one adapter
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct QueueFamilyIndices {
    /// First family reporting graphics support
    pub graphics_family: Option<u32>,
    /// First family able to present to the surface
    pub present_family: Option<u32>,
}

impl QueueFamilyIndices {
    /// Resolve indices for `adapter` presenting to `surface`.
    ///
    /// Families are scanned in index order. Each slot takes the first family
    /// that qualifies and is never reassigned; the scan stops once both slots
    /// are filled, even if a later family would combine both capabilities.
    pub fn resolve<D: Driver + ?Sized>(
        driver: &D,
        adapter: vk::PhysicalDevice,
        surface: vk::SurfaceKHR,
    ) -> VulkanResult<Self> {
        let families = enumerate("queue families", |count, out| {
            driver.enumerate_queue_families(adapter, count, out)
        })?;

        let mut indices = Self::default();

        for (index, family) in (0u32..).zip(&families) {
            let present_support = driver
                .surface_support(adapter, index, surface)
                .map_err(|result| VulkanError::query("surface support", result))?;

            if indices.graphics_family.is_none() && family.queue_flags.contains(vk::QueueFlags::GRAPHICS) {
                indices.graphics_family = Some(index);
            }

            if indices.present_family.is_none() && present_support {
                indices.present_family = Some(index);
            }

            if indices.is_complete() {
                break;
            }
        }

        Ok(indices)
    }

    /// Both a graphics and a present family were found
    #[must_use]
    pub const fn is_complete(&self) -> bool {
        self.graphics_family.is_some() && self.present_family.is_some()
    }

    /// `(graphics, present)` when complete
    #[must_use]
    pub const fn pair(&self) -> Option<(u32, u32)> {
        match (self.graphics_family, self.present_family) {
            (Some(graphics), Some(present)) => Some((graphics, present)),
            _ => None,
        }
    }

    /// Distinct family indices, ascending
    #[must_use]
    pub fn unique_families(&self) -> Vec<u32> {
        [self.graphics_family, self.present_family]
            .into_iter()
            .flatten()
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }
}
