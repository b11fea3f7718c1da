//! Renderer crate for the stadium viewer.
//!
//! A single full-screen quad is painted by one GLSL program whose uniforms
//! are fed from a live control panel. The overall flow is:
//!
//! ```text
//!   stadium CLI
//!          │ RendererConfig + ControlPanel
//!          ▼
//!   run_window ──▶ WgpuDevice ──▶ winit event loop ──▶ RenderLoop::tick()
//!                                                        │
//!                  ParameterStore::read ◀────────────────┤
//!                  ShaderProgram setters ◀───────────────┤
//!                  Renderer::render ─▶ GpuDevice ◀───────┘
//! ```
//!
//! Everything above the [`GpuDevice`] trait is backend-agnostic and is tested
//! against a recording double; [`WgpuDevice`] is the production backend.

mod camera;
mod compile;
mod device;
mod geometry;
mod gpu;
mod input;
mod params;
mod program;
mod render;
mod render_loop;
mod stats;
mod types;
mod window;

#[cfg(test)]
mod testing;

pub use camera::Camera;
pub use device::{
    FrameError, GeometryId, GpuDevice, ProgramId, UniformLocation, UniformValue, Viewport,
};
pub use geometry::{Drawable, Mesh, Scene, Square, Vertex};
pub use gpu::WgpuDevice;
pub use input::{KeyHandlers, KeyInput, KeyState};
pub use params::{
    parse_hex_color, ColorParseError, ControlPanel, PanelCommand, PanelHandle, ParameterSet,
    ParameterStore, ReloadRequest, Rgb, TimeOfDay, Trigger, MAX_CYCLE_SPEED,
};
pub use program::{ShaderProgram, Uniform};
pub use render::Renderer;
pub use render_loop::{FrameScheduler, LoopState, RenderLoop, TickOutcome};
pub use stats::{FrameStats, StatsReport};
pub use types::{
    CameraConfig, ProgramSources, ReloadPolicy, RendererConfig, ShaderSource, ShaderStage,
};
pub use window::run_window;
