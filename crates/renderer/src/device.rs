//! Capability interface between the render core and a graphics backend.
//!
//! The core never touches `wgpu` directly; it talks to a [`GpuDevice`] using
//! GL-flavoured operations (bind a program, upload a uniform, draw). The
//! production backend lives in [`crate::gpu`]; tests use a recording double.

use anyhow::Result;

use crate::geometry::Mesh;
use crate::types::ProgramSources;

/// Handle to a linked shader program.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ProgramId(pub u32);

/// Handle to uploaded vertex/index buffers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GeometryId(pub u32);

/// Byte range of a uniform inside its program's uniform block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct UniformLocation {
    pub offset: u32,
    pub size: u32,
}

/// Typed uniform payload.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum UniformValue {
    Int(i32),
    Float(f32),
    Vec2([f32; 2]),
    Vec3([f32; 3]),
    Vec4([f32; 4]),
    Mat4([f32; 16]),
}

impl UniformValue {
    /// Raw bytes in the order they appear in a std140 block.
    pub fn to_bytes(&self) -> Vec<u8> {
        match self {
            UniformValue::Int(value) => bytemuck::bytes_of(value).to_vec(),
            UniformValue::Float(value) => bytemuck::bytes_of(value).to_vec(),
            UniformValue::Vec2(value) => bytemuck::cast_slice(value).to_vec(),
            UniformValue::Vec3(value) => bytemuck::cast_slice(value).to_vec(),
            UniformValue::Vec4(value) => bytemuck::cast_slice(value).to_vec(),
            UniformValue::Mat4(value) => bytemuck::cast_slice(value).to_vec(),
        }
    }
}

/// Viewport rectangle in physical pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Viewport {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl Viewport {
    pub fn full(width: u32, height: u32) -> Self {
        Self {
            x: 0,
            y: 0,
            width,
            height,
        }
    }

    /// Shrinks the rectangle to fit a `width` x `height` surface. `None` when
    /// nothing of it remains visible.
    pub fn clamp_to(self, width: u32, height: u32) -> Option<Viewport> {
        let x = self.x.min(width);
        let y = self.y.min(height);
        let clamped = Viewport {
            x,
            y,
            width: self.width.min(width - x),
            height: self.height.min(height - y),
        };
        (clamped.width > 0 && clamped.height > 0).then_some(clamped)
    }
}

/// Per-frame presentation failures. None of these are fatal on their own;
/// the host decides whether to reconfigure, retry or exit.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FrameError {
    #[error("surface lost")]
    Lost,
    #[error("surface outdated")]
    Outdated,
    #[error("surface out of memory")]
    OutOfMemory,
    #[error("timed out acquiring the next frame")]
    Timeout,
    #[error("surface error: {0}")]
    Other(String),
}

/// Operations the render core needs from a graphics device.
pub trait GpuDevice {
    /// Compiles and links a vertex/fragment pair. Failure is fatal at startup.
    fn link_program(&mut self, sources: &ProgramSources) -> Result<ProgramId>;

    /// Makes `program` the active program for subsequent uploads and draws.
    fn use_program(&mut self, program: ProgramId);

    fn active_program(&self) -> Option<ProgramId>;

    /// Looks up a uniform by name. `None` means the program does not declare it.
    fn uniform_location(&self, program: ProgramId, name: &str) -> Option<UniformLocation>;

    /// Writes a value into the active program's uniform storage.
    fn upload_uniform(&mut self, location: UniformLocation, value: UniformValue);

    fn create_geometry(&mut self, mesh: &Mesh) -> Result<GeometryId>;

    fn destroy_geometry(&mut self, geometry: GeometryId);

    /// Draws the first `index_count` indices of `geometry` with the active
    /// program.
    fn draw_indexed(&mut self, geometry: GeometryId, index_count: u32);

    fn set_viewport(&mut self, viewport: Viewport);

    /// Resizes the drawing surface (and any size-dependent targets).
    fn resize_surface(&mut self, width: u32, height: u32);

    /// Acquires the next frame to draw into.
    fn begin_frame(&mut self) -> Result<(), FrameError>;

    /// Clears colour and depth of the current frame.
    fn clear(&mut self, color: [f32; 4]);

    /// Submits recorded work and presents the current frame.
    fn present(&mut self);
}
