use std::collections::HashMap;
use std::sync::Arc;

use anyhow::{Context, Result};
use wgpu::util::DeviceExt;
use winit::dpi::PhysicalSize;
use winit::window::Window;

use crate::device::{
    FrameError, GeometryId, GpuDevice, ProgramId, UniformLocation, UniformValue, Viewport,
};
use crate::geometry::Mesh;
use crate::types::ProgramSources;

use super::context::GpuContext;
use super::pipeline::{uniform_layout, ProgramPipeline};

struct GeometryBuffers {
    vertices: wgpu::Buffer,
    indices: wgpu::Buffer,
    index_count: u32,
}

/// Frame acquired by `begin_frame` and not yet presented.
struct FrameInProgress {
    surface: wgpu::SurfaceTexture,
    view: wgpu::TextureView,
    encoder: wgpu::CommandEncoder,
    pending_clear: Option<[f32; 4]>,
}

impl From<wgpu::SurfaceError> for FrameError {
    fn from(value: wgpu::SurfaceError) -> Self {
        match value {
            wgpu::SurfaceError::Lost => FrameError::Lost,
            wgpu::SurfaceError::Outdated => FrameError::Outdated,
            wgpu::SurfaceError::OutOfMemory => FrameError::OutOfMemory,
            wgpu::SurfaceError::Timeout => FrameError::Timeout,
            other => FrameError::Other(other.to_string()),
        }
    }
}

/// [`GpuDevice`] backed by wgpu and a winit window surface.
pub struct WgpuDevice {
    context: GpuContext,
    depth_view: wgpu::TextureView,
    uniform_layout: wgpu::BindGroupLayout,
    programs: HashMap<ProgramId, ProgramPipeline>,
    geometry: HashMap<GeometryId, GeometryBuffers>,
    active: Option<ProgramId>,
    next_program: u32,
    next_geometry: u32,
    viewport: Viewport,
    frame: Option<FrameInProgress>,
}

impl WgpuDevice {
    pub fn new(window: Arc<Window>) -> Result<Self> {
        let size = window.inner_size();
        let context = GpuContext::new(window, size).context("failed to initialise GPU")?;
        let depth_view = context.create_depth_view();
        let uniform_layout = uniform_layout(&context.device);
        let viewport = Viewport::full(context.size.width, context.size.height);
        Ok(Self {
            context,
            depth_view,
            uniform_layout,
            programs: HashMap::new(),
            geometry: HashMap::new(),
            active: None,
            next_program: 1,
            next_geometry: 1,
            viewport,
            frame: None,
        })
    }

    /// Recovers from a lost or outdated surface.
    pub fn reconfigure(&mut self) {
        self.frame = None;
        self.context.reconfigure();
        self.depth_view = self.context.create_depth_view();
        tracing::debug!(
            width = self.context.size.width,
            height = self.context.size.height,
            "surface reconfigured"
        );
    }

    fn clear_ops(pending: Option<[f32; 4]>) -> (wgpu::LoadOp<wgpu::Color>, wgpu::LoadOp<f32>) {
        match pending {
            Some([r, g, b, a]) => (
                wgpu::LoadOp::Clear(wgpu::Color {
                    r: r as f64,
                    g: g as f64,
                    b: b as f64,
                    a: a as f64,
                }),
                wgpu::LoadOp::Clear(1.0),
            ),
            None => (wgpu::LoadOp::Load, wgpu::LoadOp::Load),
        }
    }
}

impl GpuDevice for WgpuDevice {
    fn link_program(&mut self, sources: &ProgramSources) -> Result<ProgramId> {
        let pipeline = ProgramPipeline::new(
            &self.context.device,
            &self.uniform_layout,
            self.context.surface_format,
            sources,
        )?;
        let id = ProgramId(self.next_program);
        self.next_program += 1;
        tracing::info!(
            program = %pipeline.label,
            uniforms = pipeline.block.members.len(),
            "linked shader program"
        );
        self.programs.insert(id, pipeline);
        Ok(id)
    }

    fn use_program(&mut self, program: ProgramId) {
        if self.programs.contains_key(&program) {
            self.active = Some(program);
        } else {
            tracing::warn!(?program, "use of unknown program ignored");
        }
    }

    fn active_program(&self) -> Option<ProgramId> {
        self.active
    }

    fn uniform_location(&self, program: ProgramId, name: &str) -> Option<UniformLocation> {
        self.programs.get(&program)?.block.location(name)
    }

    fn upload_uniform(&mut self, location: UniformLocation, value: UniformValue) {
        let Some(program) = self.active.and_then(|id| self.programs.get_mut(&id)) else {
            return;
        };
        program.storage.write(location, value);
    }

    fn create_geometry(&mut self, mesh: &Mesh) -> Result<GeometryId> {
        let vertices = mesh.interleaved();
        let device = &self.context.device;
        let vertex_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("vertex buffer"),
            contents: bytemuck::cast_slice(&vertices),
            usage: wgpu::BufferUsages::VERTEX,
        });
        let index_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("index buffer"),
            contents: bytemuck::cast_slice(&mesh.indices),
            usage: wgpu::BufferUsages::INDEX,
        });
        let id = GeometryId(self.next_geometry);
        self.next_geometry += 1;
        self.geometry.insert(
            id,
            GeometryBuffers {
                vertices: vertex_buffer,
                indices: index_buffer,
                index_count: mesh.indices.len() as u32,
            },
        );
        tracing::trace!(?id, vertices = vertices.len(), "created geometry");
        Ok(id)
    }

    fn destroy_geometry(&mut self, geometry: GeometryId) {
        if let Some(buffers) = self.geometry.remove(&geometry) {
            buffers.vertices.destroy();
            buffers.indices.destroy();
        }
    }

    fn draw_indexed(&mut self, geometry: GeometryId, index_count: u32) {
        let viewport = self
            .viewport
            .clamp_to(self.context.config.width, self.context.config.height);
        let Some(frame) = self.frame.as_mut() else {
            tracing::trace!("draw outside of a frame ignored");
            return;
        };
        let Some(program) = self.active.and_then(|id| self.programs.get(&id)) else {
            return;
        };
        let Some(buffers) = self.geometry.get(&geometry) else {
            tracing::warn!(?geometry, "draw of unknown geometry ignored");
            return;
        };

        // Each draw gets its own copy of the uniform block.
        let staging = self
            .context
            .device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("uniform staging"),
                contents: program.storage.bytes(),
                usage: wgpu::BufferUsages::COPY_SRC,
            });
        frame.encoder.copy_buffer_to_buffer(
            &staging,
            0,
            &program.uniform_buffer,
            0,
            program.storage.len(),
        );

        let (color_load, depth_load) = Self::clear_ops(frame.pending_clear.take());
        let mut render_pass = frame.encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("scene pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: &frame.view,
                depth_slice: None,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: color_load,
                    store: wgpu::StoreOp::Store,
                },
            })],
            depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                view: &self.depth_view,
                depth_ops: Some(wgpu::Operations {
                    load: depth_load,
                    store: wgpu::StoreOp::Store,
                }),
                stencil_ops: None,
            }),
            occlusion_query_set: None,
            timestamp_writes: None,
        });
        let Some(viewport) = viewport else {
            return;
        };
        render_pass.set_viewport(
            viewport.x as f32,
            viewport.y as f32,
            viewport.width as f32,
            viewport.height as f32,
            0.0,
            1.0,
        );
        render_pass.set_pipeline(&program.pipeline);
        render_pass.set_bind_group(0, &program.bind_group, &[]);
        render_pass.set_vertex_buffer(0, buffers.vertices.slice(..));
        render_pass.set_index_buffer(buffers.indices.slice(..), wgpu::IndexFormat::Uint32);
        render_pass.draw_indexed(0..index_count.min(buffers.index_count), 0, 0..1);
    }

    fn set_viewport(&mut self, viewport: Viewport) {
        self.viewport = viewport;
    }

    fn resize_surface(&mut self, width: u32, height: u32) {
        if !self.context.resize(PhysicalSize::new(width, height)) {
            return;
        }
        self.frame = None;
        self.depth_view = self.context.create_depth_view();
    }

    fn begin_frame(&mut self) -> Result<(), FrameError> {
        if self.frame.take().is_some() {
            tracing::warn!("previous frame was never presented; dropping it");
        }
        let surface = self.context.surface.get_current_texture()?;
        let view = surface
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());
        let encoder = self
            .context
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("frame encoder"),
            });
        self.frame = Some(FrameInProgress {
            surface,
            view,
            encoder,
            pending_clear: None,
        });
        Ok(())
    }

    fn clear(&mut self, color: [f32; 4]) {
        if let Some(frame) = self.frame.as_mut() {
            frame.pending_clear = Some(color);
        }
    }

    fn present(&mut self) {
        let Some(mut frame) = self.frame.take() else {
            return;
        };
        if frame.pending_clear.is_some() {
            let (color_load, depth_load) = Self::clear_ops(frame.pending_clear.take());
            frame.encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("clear pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &frame.view,
                    depth_slice: None,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: color_load,
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &self.depth_view,
                    depth_ops: Some(wgpu::Operations {
                        load: depth_load,
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                occlusion_query_set: None,
                timestamp_writes: None,
            });
        }
        self.context
            .queue
            .submit(std::iter::once(frame.encoder.finish()));
        frame.surface.present();
    }
}
