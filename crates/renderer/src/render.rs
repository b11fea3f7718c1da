use crate::camera::Camera;
use crate::device::{FrameError, GpuDevice, Viewport};
use crate::geometry::Drawable;
use crate::program::ShaderProgram;

/// Frame-level drawing: clear colour, surface size, and the per-drawable
/// draw sequence.
#[derive(Debug, Clone)]
pub struct Renderer {
    clear_color: [f32; 4],
    width: u32,
    height: u32,
}

impl Renderer {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            clear_color: [0.0, 0.0, 0.0, 1.0],
            width,
            height,
        }
    }

    pub fn set_clear_color(&mut self, r: f32, g: f32, b: f32, a: f32) {
        self.clear_color = [r, g, b, a];
    }

    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Resizes the drawing surface.
    pub fn set_size<D: GpuDevice + ?Sized>(&mut self, device: &mut D, width: u32, height: u32) {
        self.width = width;
        self.height = height;
        device.resize_surface(width, height);
    }

    /// Sets the viewport to the full surface.
    pub fn apply_viewport<D: GpuDevice + ?Sized>(&self, device: &mut D) {
        device.set_viewport(Viewport::full(self.width, self.height));
    }

    /// Acquires the next frame and clears colour and depth.
    pub fn clear<D: GpuDevice + ?Sized>(&self, device: &mut D) -> Result<(), FrameError> {
        device.begin_frame()?;
        device.clear(self.clear_color);
        Ok(())
    }

    /// Draws `drawables` in the given order with the shared camera and time.
    pub fn render<D: GpuDevice + ?Sized>(
        &self,
        device: &mut D,
        camera: &Camera,
        program: &mut ShaderProgram,
        drawables: &[Drawable],
        time: u64,
    ) {
        program.bind(device);
        let view_proj = camera.view_projection();
        for drawable in drawables {
            program.set_model_matrix(device, drawable.transform);
            program.set_view_proj_matrix(device, view_proj);
            program.set_time(device, time);
            program.draw(device, drawable);
        }
    }
}
