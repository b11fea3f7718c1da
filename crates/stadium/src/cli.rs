use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use sceneconfig::{is_hex_color, TimeOfDaySetting};

#[derive(Parser, Debug)]
#[command(
    name = "stadium",
    author,
    version,
    about = "Animated stadium scene with a live control panel",
    arg_required_else_help = false
)]
pub struct Cli {
    #[command(flatten)]
    pub run: RunArgs,
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Args, Debug, Default)]
pub struct RunArgs {
    /// Configuration file; defaults to `stadium.toml` in the config directory.
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Initial window size (e.g. `1280x720`).
    #[arg(long, global = true, value_name = "WIDTHxHEIGHT", value_parser = parse_surface_size)]
    pub size: Option<(u32, u32)>,

    /// Replace the bundled vertex shader with a GLSL 450 file.
    #[arg(long, global = true, value_name = "FILE")]
    pub vertex_shader: Option<PathBuf>,

    /// Replace the bundled fragment shader with a GLSL 450 file.
    #[arg(long, global = true, value_name = "FILE")]
    pub fragment_shader: Option<PathBuf>,

    /// Starting sky: `starry` or `day-cycle`.
    #[arg(long, global = true, value_name = "MODE", value_parser = parse_time_of_day)]
    pub time_of_day: Option<TimeOfDaySetting>,

    /// Starting day/night cycle speed (0-100).
    #[arg(long, global = true, value_name = "SPEED", value_parser = parse_cycle_speed)]
    pub cycle_speed: Option<f32>,

    /// Starting platform colour as `#rrggbb`.
    #[arg(long, global = true, value_name = "HEX", value_parser = parse_color)]
    pub platform_color: Option<String>,

    /// Start with the platforms standing still.
    #[arg(long, global = true)]
    pub no_animate: bool,

    /// Reset the frame counter whenever the scene is reloaded.
    #[arg(long, global = true)]
    pub reset_time_on_reload: bool,

    /// Do not read control panel commands from stdin.
    #[arg(long, global = true)]
    pub no_stdin_panel: bool,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Inspect and validate the configuration file.
    Config(ConfigCommand),
}

#[derive(Args, Debug)]
pub struct ConfigCommand {
    #[command(subcommand)]
    pub action: ConfigAction,
}

#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigAction {
    /// Print the effective configuration as TOML.
    Show,
    /// Print the resolved configuration file path.
    Where,
    /// Validate the configuration and exit non-zero on error.
    Check,
}

pub fn parse() -> Cli {
    Cli::parse()
}

pub fn parse_surface_size(spec: &str) -> Result<(u32, u32), String> {
    let trimmed = spec.trim();
    let (width, height) = trimmed
        .split_once(['x', 'X', '×'])
        .ok_or_else(|| "expected WxH format, e.g. 1920x1080".to_string())?;

    let width: u32 = width
        .trim()
        .parse()
        .map_err(|_| format!("invalid width '{}' in size specification", width.trim()))?;
    let height: u32 = height
        .trim()
        .parse()
        .map_err(|_| format!("invalid height '{}' in size specification", height.trim()))?;

    if width == 0 || height == 0 {
        return Err("surface dimensions must be greater than zero".to_string());
    }

    Ok((width, height))
}

pub fn parse_time_of_day(value: &str) -> Result<TimeOfDaySetting, String> {
    let normalized = value.trim().to_ascii_lowercase();
    match normalized.as_str() {
        "starry" | "night" | "1" => Ok(TimeOfDaySetting::Starry),
        "day-cycle" | "day" | "cycle" | "2" => Ok(TimeOfDaySetting::DayCycle),
        other => Err(format!(
            "invalid time of day '{other}'; use starry or day-cycle"
        )),
    }
}

pub fn parse_cycle_speed(value: &str) -> Result<f32, String> {
    let speed: f32 = value
        .trim()
        .parse()
        .map_err(|_| format!("invalid cycle speed '{value}'"))?;
    if !(0.0..=100.0).contains(&speed) {
        return Err(format!("cycle speed must be within 0-100, got {speed}"));
    }
    Ok(speed)
}

pub fn parse_color(value: &str) -> Result<String, String> {
    let trimmed = value.trim();
    if !is_hex_color(trimmed) {
        return Err(format!("invalid colour '{trimmed}'; expected #rrggbb"));
    }
    if trimmed.starts_with('#') {
        Ok(trimmed.to_string())
    } else {
        Ok(format!("#{trimmed}"))
    }
}
