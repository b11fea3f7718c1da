use glam::{Mat4, Vec3};

use crate::types::CameraConfig;

/// Look-at camera with a perspective lens.
///
/// The view matrix is recomputed by [`Camera::update`]; the projection is
/// recomputed only by [`Camera::update_projection_matrix`], so a resize can
/// set the aspect ratio first and rebuild the projection afterwards.
#[derive(Debug, Clone)]
pub struct Camera {
    position: Vec3,
    target: Vec3,
    up: Vec3,
    fov_y: f32,
    near: f32,
    far: f32,
    aspect_ratio: f32,
    view: Mat4,
    projection: Mat4,
    projection_valid: bool,
}

impl Camera {
    pub fn new(config: &CameraConfig) -> Self {
        let mut camera = Self {
            position: config.position,
            target: config.target,
            up: config.up,
            fov_y: config.fov_y_radians,
            near: config.near,
            far: config.far,
            aspect_ratio: 1.0,
            view: Mat4::IDENTITY,
            projection: Mat4::IDENTITY,
            projection_valid: false,
        };
        camera.update();
        camera
    }

    /// Recomputes the view matrix from position, target and up.
    pub fn update(&mut self) {
        self.view = Mat4::look_at_rh(self.position, self.target, self.up);
    }

    pub fn set_aspect_ratio(&mut self, aspect_ratio: f32) {
        if aspect_ratio.is_finite() && aspect_ratio > 0.0 {
            self.aspect_ratio = aspect_ratio;
        }
    }

    pub fn update_projection_matrix(&mut self) {
        self.projection = Mat4::perspective_rh(self.fov_y, self.aspect_ratio, self.near, self.far);
        self.projection_valid = true;
    }

    pub fn set_position(&mut self, position: Vec3) {
        self.position = position;
    }

    pub fn position(&self) -> Vec3 {
        self.position
    }

    pub fn aspect_ratio(&self) -> f32 {
        self.aspect_ratio
    }

    pub fn view_matrix(&self) -> Mat4 {
        self.view
    }

    /// `None` until the projection has been computed at least once.
    pub fn projection_matrix(&self) -> Option<Mat4> {
        self.projection_valid.then_some(self.projection)
    }

    /// Projection * view, falling back to the bare view before the first
    /// projection update.
    pub fn view_projection(&self) -> Mat4 {
        match self.projection_matrix() {
            Some(projection) => projection * self.view,
            None => self.view,
        }
    }
}
