use std::fmt;
use std::time::Duration;

use glam::Vec3;

use crate::params::ParameterSet;

/// Pipeline stage a shader source is compiled for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShaderStage {
    Vertex,
    Fragment,
}

impl fmt::Display for ShaderStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ShaderStage::Vertex => f.write_str("vertex"),
            ShaderStage::Fragment => f.write_str("fragment"),
        }
    }
}

/// GLSL text for one stage, keyed by stage and a human-readable identifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShaderSource {
    pub stage: ShaderStage,
    pub identifier: String,
    pub text: String,
}

impl ShaderSource {
    pub fn new(stage: ShaderStage, identifier: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            stage,
            identifier: identifier.into(),
            text: text.into(),
        }
    }
}

const FLAT_VERT: &str = include_str!("../shaders/flat-vert.glsl");
const FLAT_FRAG: &str = include_str!("../shaders/flat-frag.glsl");

/// Vertex + fragment sources linked into the single scene program.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgramSources {
    pub vertex: ShaderSource,
    pub fragment: ShaderSource,
}

impl ProgramSources {
    /// The bundled stadium shaders.
    pub fn flat() -> Self {
        Self {
            vertex: ShaderSource::new(ShaderStage::Vertex, "flat-vert", FLAT_VERT),
            fragment: ShaderSource::new(ShaderStage::Fragment, "flat-frag", FLAT_FRAG),
        }
    }
}

impl Default for ProgramSources {
    fn default() -> Self {
        Self::flat()
    }
}

/// What a scene reload does to the frame counter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ReloadPolicy {
    /// Reset `time` to 0 when the scene is reloaded.
    pub reset_time: bool,
}

/// Initial camera placement and lens.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraConfig {
    pub position: Vec3,
    pub target: Vec3,
    pub up: Vec3,
    pub fov_y_radians: f32,
    pub near: f32,
    pub far: f32,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            position: Vec3::new(0.0, 0.0, -10.0),
            target: Vec3::ZERO,
            up: Vec3::Y,
            fov_y_radians: 45.0_f32.to_radians(),
            near: 0.1,
            far: 1000.0,
        }
    }
}

/// Immutable configuration passed to the viewer at start-up.
#[derive(Debug, Clone)]
pub struct RendererConfig {
    /// Initial window size in physical pixels.
    pub surface_size: (u32, u32),
    /// Window title.
    pub title: String,
    /// RGBA clear colour in 0-1.
    pub clear_color: [f32; 4],
    pub camera: CameraConfig,
    /// Starting values of the control panel.
    pub parameters: ParameterSet,
    pub reload: ReloadPolicy,
    pub shaders: ProgramSources,
    /// How often frame statistics are logged.
    pub stats_interval: Duration,
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            surface_size: (1280, 720),
            title: "Stadium".to_string(),
            clear_color: [164.0 / 255.0, 233.0 / 255.0, 1.0, 1.0],
            camera: CameraConfig::default(),
            parameters: ParameterSet::default(),
            reload: ReloadPolicy::default(),
            shaders: ProgramSources::flat(),
            stats_interval: Duration::from_secs(1),
        }
    }
}
