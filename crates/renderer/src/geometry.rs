//! Static geometry: CPU meshes, the fixed square, and the drawable list.

use anyhow::{Context, Result};
use bytemuck::{Pod, Zeroable};
use glam::{Mat4, Vec3};

use crate::device::{GeometryId, GpuDevice};

/// Interleaved vertex layout consumed by the scene pipeline
/// (`vs_Pos`, `vs_Nor`, `vs_UV`).
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct Vertex {
    pub position: [f32; 4],
    pub normal: [f32; 4],
    pub uv: [f32; 2],
}

/// CPU-side mesh description, uploaded once per scene load.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Mesh {
    pub positions: Vec<[f32; 4]>,
    pub normals: Vec<[f32; 4]>,
    pub uvs: Vec<[f32; 2]>,
    pub indices: Vec<u32>,
}

impl Mesh {
    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    /// Interleaves the attribute streams. Missing normals or uvs are zeroed.
    pub fn interleaved(&self) -> Vec<Vertex> {
        self.positions
            .iter()
            .enumerate()
            .map(|(index, position)| Vertex {
                position: *position,
                normal: self.normals.get(index).copied().unwrap_or([0.0; 4]),
                uv: self.uvs.get(index).copied().unwrap_or([0.0; 2]),
            })
            .collect()
    }

    /// Checks that every index refers to an existing vertex.
    pub fn validate(&self) -> Result<()> {
        if self.indices.len() % 3 != 0 {
            anyhow::bail!(
                "mesh index count {} is not a multiple of 3",
                self.indices.len()
            );
        }
        let count = self.vertex_count() as u32;
        if let Some(index) = self.indices.iter().find(|&&index| index >= count) {
            anyhow::bail!("mesh index {index} out of range for {count} vertices");
        }
        Ok(())
    }
}

/// The full-screen quad the stadium is painted on.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Square {
    pub center: Vec3,
}

impl Square {
    pub fn new(center: Vec3) -> Self {
        Self { center }
    }

    pub fn mesh(&self) -> Mesh {
        let c = self.center;
        let corner = |x: f32, y: f32| [x + c.x, y + c.y, 0.999 + c.z, 1.0];
        Mesh {
            positions: vec![
                corner(-1.0, -1.0),
                corner(1.0, -1.0),
                corner(1.0, 1.0),
                corner(-1.0, 1.0),
            ],
            normals: vec![[0.0, 0.0, 1.0, 0.0]; 4],
            uvs: vec![[0.0, 0.0], [1.0, 0.0], [1.0, 1.0], [0.0, 1.0]],
            indices: vec![0, 1, 2, 0, 2, 3],
        }
    }
}

/// Uploaded geometry plus its placement.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Drawable {
    pub geometry: GeometryId,
    pub index_count: u32,
    pub transform: Mat4,
}

impl Drawable {
    pub fn upload<D: GpuDevice + ?Sized>(
        device: &mut D,
        mesh: &Mesh,
        transform: Mat4,
    ) -> Result<Self> {
        mesh.validate()?;
        let geometry = device
            .create_geometry(mesh)
            .context("failed to upload scene geometry")?;
        Ok(Self {
            geometry,
            index_count: mesh.indices.len() as u32,
            transform,
        })
    }
}

/// Ordered drawable list. Replaced wholesale on reload.
#[derive(Debug, Default)]
pub struct Scene {
    drawables: Vec<Drawable>,
}

impl Scene {
    pub fn load<D: GpuDevice + ?Sized>(device: &mut D) -> Result<Self> {
        let square = Square::new(Vec3::ZERO);
        let drawable = Drawable::upload(device, &square.mesh(), Mat4::IDENTITY)?;
        tracing::debug!(geometry = ?drawable.geometry, "scene loaded");
        Ok(Self {
            drawables: vec![drawable],
        })
    }

    /// Releases the current geometry and builds a fresh drawable list.
    pub fn reload<D: GpuDevice + ?Sized>(&mut self, device: &mut D) -> Result<()> {
        let fresh = Self::load(device)?;
        for drawable in std::mem::replace(&mut self.drawables, fresh.drawables) {
            device.destroy_geometry(drawable.geometry);
        }
        Ok(())
    }

    pub fn drawables(&self) -> &[Drawable] {
        &self.drawables
    }

    pub fn is_empty(&self) -> bool {
        self.drawables.is_empty()
    }
}
