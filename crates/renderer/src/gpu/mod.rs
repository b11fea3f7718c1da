//! wgpu implementation of [`GpuDevice`](crate::device::GpuDevice).
//!
//! - `context` owns the wgpu instance, device and window surface and knows
//!   how to rebuild swapchain state when the window resizes.
//! - `pipeline` links a GLSL vertex/fragment pair into a render pipeline with
//!   a single uniform bind group.
//! - `uniforms` keeps each program's uniform block on the CPU so values
//!   persist between frames.
//! - `state` glues everything together as [`WgpuDevice`].

mod context;
mod pipeline;
mod state;
mod uniforms;

pub use state::WgpuDevice;
