use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use glam::Vec3;
use renderer::{
    parse_hex_color, CameraConfig, ParameterSet, ProgramSources, ReloadPolicy, RendererConfig,
    ShaderSource, ShaderStage, TimeOfDay,
};
use sceneconfig::{ConfigError, StadiumConfig, TimeOfDaySetting};

use crate::cli::RunArgs;
use crate::paths::ConfigLocation;

/// Reads the configuration at `location`. A missing default file means
/// built-in defaults; a missing explicit file is an error.
pub fn load_config(location: &ConfigLocation) -> Result<StadiumConfig> {
    if !location.path.exists() {
        if location.explicit {
            anyhow::bail!("config file {} does not exist", location.path.display());
        }
        tracing::debug!(path = %location.path.display(), "no config file; using defaults");
        return Ok(StadiumConfig::default());
    }
    let text = fs::read_to_string(&location.path)
        .with_context(|| format!("failed to read config file {}", location.path.display()))?;
    let config = StadiumConfig::from_toml_str(&text)
        .with_context(|| format!("failed to load config file {}", location.path.display()))?;
    tracing::debug!(path = %location.path.display(), "loaded config file");
    Ok(config)
}

/// Layers command-line flags over the file configuration.
pub fn apply_overrides(config: &mut StadiumConfig, args: &RunArgs) -> Result<(), ConfigError> {
    if let Some((width, height)) = args.size {
        config.window.width = width;
        config.window.height = height;
    }
    if let Some(path) = &args.vertex_shader {
        config.shaders.vertex = Some(path.clone());
    }
    if let Some(path) = &args.fragment_shader {
        config.shaders.fragment = Some(path.clone());
    }
    if let Some(mode) = args.time_of_day {
        config.controls.time_of_day = mode;
    }
    if let Some(speed) = args.cycle_speed {
        config.controls.cycle_speed = speed;
    }
    if let Some(color) = &args.platform_color {
        config.controls.platform_color = color.clone();
    }
    if args.no_animate {
        config.controls.animate_platforms = false;
    }
    if args.reset_time_on_reload {
        config.scene.reset_time_on_reload = true;
    }
    config.validate()
}

pub fn map_time_of_day(setting: TimeOfDaySetting) -> TimeOfDay {
    match setting {
        TimeOfDaySetting::Starry => TimeOfDay::Starry,
        TimeOfDaySetting::DayCycle => TimeOfDay::DayCycle,
    }
}

/// Builds the renderer configuration, reading any shader overrides from disk.
pub fn renderer_config(config: &StadiumConfig) -> Result<RendererConfig> {
    let clear = parse_hex_color(&config.renderer.clear_color)?.to_unit();
    let camera = &config.camera;
    let controls = &config.controls;

    Ok(RendererConfig {
        surface_size: (config.window.width, config.window.height),
        title: config.window.title.clone(),
        clear_color: [clear[0], clear[1], clear[2], 1.0],
        camera: CameraConfig {
            position: Vec3::from_array(camera.position),
            target: Vec3::from_array(camera.target),
            up: Vec3::from_array(camera.up),
            fov_y_radians: camera.fov_degrees.to_radians(),
            near: camera.near,
            far: camera.far,
        },
        parameters: ParameterSet {
            time_of_day: map_time_of_day(controls.time_of_day),
            cycle_speed: controls.cycle_speed,
            platform_color: controls.platform_color.clone(),
            platforms_animate: controls.animate_platforms,
        },
        reload: ReloadPolicy {
            reset_time: config.scene.reset_time_on_reload,
        },
        shaders: program_sources(config)?,
        stats_interval: config.renderer.stats_interval,
    })
}

fn program_sources(config: &StadiumConfig) -> Result<ProgramSources> {
    let mut sources = ProgramSources::flat();
    if let Some(path) = &config.shaders.vertex {
        sources.vertex = read_shader(ShaderStage::Vertex, path)?;
    }
    if let Some(path) = &config.shaders.fragment {
        sources.fragment = read_shader(ShaderStage::Fragment, path)?;
    }
    Ok(sources)
}

fn read_shader(stage: ShaderStage, path: &Path) -> Result<ShaderSource> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("failed to read {stage} shader at {}", path.display()))?;
    let identifier = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());
    tracing::info!(%stage, shader = %path.display(), "using shader override");
    Ok(ShaderSource::new(stage, identifier, text))
}
