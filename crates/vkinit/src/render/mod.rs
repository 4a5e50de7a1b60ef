//! Rendering setup
//!
//! The GLFW window collaborator and the Vulkan negotiation pipeline.

pub mod vulkan;
pub mod window;
