use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize, Serializer};

/// Name of the configuration file looked up in the config directory.
pub const CONFIG_FILE_NAME: &str = "stadium.toml";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to parse configuration: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("failed to serialise configuration: {0}")]
    Serialize(#[from] toml::ser::Error),
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum TimeOfDaySetting {
    #[default]
    Starry,
    DayCycle,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct StadiumConfig {
    #[serde(default)]
    pub window: WindowSection,
    #[serde(default)]
    pub renderer: RendererSection,
    #[serde(default)]
    pub camera: CameraSection,
    #[serde(default)]
    pub controls: ControlsSection,
    #[serde(default)]
    pub scene: SceneSection,
    #[serde(default)]
    pub shaders: ShaderSection,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct WindowSection {
    pub width: u32,
    pub height: u32,
    pub title: String,
}

impl Default for WindowSection {
    fn default() -> Self {
        Self {
            width: 1280,
            height: 720,
            title: "Stadium".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct RendererSection {
    pub clear_color: String,
    #[serde(
        deserialize_with = "deserialize_duration",
        serialize_with = "serialize_duration"
    )]
    pub stats_interval: Duration,
}

impl Default for RendererSection {
    fn default() -> Self {
        Self {
            clear_color: "#a4e9ff".to_string(),
            stats_interval: Duration::from_secs(1),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct CameraSection {
    pub position: [f32; 3],
    pub target: [f32; 3],
    pub up: [f32; 3],
    pub fov_degrees: f32,
    pub near: f32,
    pub far: f32,
}

impl Default for CameraSection {
    fn default() -> Self {
        Self {
            position: [0.0, 0.0, -10.0],
            target: [0.0, 0.0, 0.0],
            up: [0.0, 1.0, 0.0],
            fov_degrees: 45.0,
            near: 0.1,
            far: 1000.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct ControlsSection {
    pub time_of_day: TimeOfDaySetting,
    pub cycle_speed: f32,
    pub platform_color: String,
    pub animate_platforms: bool,
}

impl Default for ControlsSection {
    fn default() -> Self {
        Self {
            time_of_day: TimeOfDaySetting::Starry,
            cycle_speed: 50.0,
            platform_color: "#3ef04a".to_string(),
            animate_platforms: true,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct SceneSection {
    pub reset_time_on_reload: bool,
}

/// Optional replacements for the bundled GLSL stages.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct ShaderSection {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vertex: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fragment: Option<PathBuf>,
}

fn serialize_duration<S>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.serialize_str(&humantime::format_duration(*value).to_string())
}

fn deserialize_duration<'de, D>(deserializer: D) -> Result<Duration, D::Error>
where
    D: Deserializer<'de>,
{
    struct Visitor;
    impl<'de> de::Visitor<'de> for Visitor {
        type Value = Duration;

        fn expecting(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
            formatter.write_str("a duration as number of seconds or human-readable string")
        }

        fn visit_str<E>(self, v: &str) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            humantime::parse_duration(v)
                .map_err(|err| E::custom(format!("invalid duration '{v}': {err}")))
        }

        fn visit_u64<E>(self, v: u64) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            Ok(Duration::from_secs(v))
        }

        fn visit_i64<E>(self, v: i64) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            if v < 0 {
                return Err(E::custom("duration must be non-negative"));
            }
            Ok(Duration::from_secs(v as u64))
        }

        fn visit_f64<E>(self, v: f64) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            if !v.is_finite() || v.is_sign_negative() {
                return Err(E::custom("duration must be non-negative"));
            }
            Ok(Duration::from_secs_f64(v))
        }
    }

    deserializer.deserialize_any(Visitor)
}

/// `#rrggbb` or `rrggbb`, case-insensitive.
pub fn is_hex_color(value: &str) -> bool {
    let digits = value.strip_prefix('#').unwrap_or(value);
    digits.len() == 6 && digits.chars().all(|ch| ch.is_ascii_hexdigit())
}

impl StadiumConfig {
    pub fn from_toml_str(input: &str) -> Result<Self, ConfigError> {
        let raw: StadiumConfig = toml::from_str(input)?;
        raw.validate()?;
        Ok(raw)
    }

    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.window.width == 0 || self.window.height == 0 {
            return Err(ConfigError::Invalid(format!(
                "window size must be non-zero, got {}x{}",
                self.window.width, self.window.height
            )));
        }

        if !is_hex_color(&self.renderer.clear_color) {
            return Err(ConfigError::Invalid(format!(
                "renderer.clear_color '{}' is not a #rrggbb colour",
                self.renderer.clear_color
            )));
        }

        if self.renderer.stats_interval.is_zero() {
            return Err(ConfigError::Invalid(
                "renderer.stats_interval must be greater than zero".into(),
            ));
        }

        let camera = &self.camera;
        if !(camera.fov_degrees > 0.0 && camera.fov_degrees < 180.0) {
            return Err(ConfigError::Invalid(format!(
                "camera.fov_degrees must be between 0 and 180, got {}",
                camera.fov_degrees
            )));
        }
        if !(camera.near > 0.0 && camera.near < camera.far) {
            return Err(ConfigError::Invalid(format!(
                "camera planes must satisfy 0 < near < far, got near={} far={}",
                camera.near, camera.far
            )));
        }
        if camera.position == camera.target {
            return Err(ConfigError::Invalid(
                "camera.position and camera.target must differ".into(),
            ));
        }
        if camera.up == [0.0; 3] {
            return Err(ConfigError::Invalid("camera.up may not be zero".into()));
        }

        let speed = self.controls.cycle_speed;
        if !(0.0..=100.0).contains(&speed) {
            return Err(ConfigError::Invalid(format!(
                "controls.cycle_speed must be within [0, 100], got {speed}"
            )));
        }

        if !is_hex_color(&self.controls.platform_color) {
            return Err(ConfigError::Invalid(format!(
                "controls.platform_color '{}' is not a #rrggbb colour",
                self.controls.platform_color
            )));
        }

        for (stage, path) in [
            ("vertex", &self.shaders.vertex),
            ("fragment", &self.shaders.fragment),
        ] {
            if path.as_ref().is_some_and(|path| path.as_os_str().is_empty()) {
                return Err(ConfigError::Invalid(format!(
                    "shaders.{stage} may not be an empty path"
                )));
            }
        }

        Ok(())
    }
}
