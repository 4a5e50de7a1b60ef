//! # vkinit
//!
//! Negotiates everything a Vulkan renderer needs before the first frame:
//! instance, optional validation messenger, window surface, physical device,
//! logical device with its queues, and a presentation chain matching the
//! window surface.
//!
//! ## Startup Order
//!
//! ```text
//! instance -> debug messenger -> surface -> adapter -> device -> queues -> chain
//! ```
//!
//! Teardown runs in the exact reverse order and is owned by [`DeviceContext`];
//! a failure at any step releases whatever was already acquired.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use vkinit::prelude::*;
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = BootstrapConfig::default();
//!     let mut window = Window::new(&config.window.title, config.window.width, config.window.height)?;
//!     let driver = AshDriver::load()?;
//!     let context = DeviceContext::bootstrap(driver, &mut window, &config)?;
//!     log::info!("Ready with {} swapchain images", context.presentation_chain().map_or(0, |c| c.image_count()));
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions, clippy::similar_names)]

pub mod config;
pub mod foundation;
pub mod render;

pub use render::vulkan::{DeviceContext, VulkanError, VulkanResult};

/// Common imports for users of the crate
pub mod prelude {
    pub use crate::{
        config::{BootstrapConfig, Config, ConfigError, WindowConfig},
        render::{
            vulkan::{
                AshDriver, ContextState, DeviceContext, Driver, PresentationChain,
                PresentationChainConfig, QueueFamilyIndices, VulkanError, VulkanResult,
            },
            window::{SurfaceProvider, Window, WindowError},
        },
    };
}
