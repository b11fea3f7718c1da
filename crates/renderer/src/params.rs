//! Live-tunable scene parameters and the in-process settings surface.
//!
//! The render loop only ever *reads* a [`ParameterStore`]. The store used by
//! the binary is a [`ControlPanel`], which receives edits as
//! [`PanelCommand`]s from any number of [`PanelHandle`]s and folds them in at
//! the start of each read.

use std::cell::Cell;
use std::fmt;
use std::rc::Rc;

use crossbeam_channel::{unbounded, Receiver, Sender};

/// Upper bound of the cycle speed slider.
pub const MAX_CYCLE_SPEED: f32 = 100.0;

/// Sky mode selected on the panel. The discriminant is the value the shader
/// receives in `u_TimeOfDay`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimeOfDay {
    Starry = 1,
    DayCycle = 2,
}

impl TimeOfDay {
    pub fn shader_value(self) -> i32 {
        self as i32
    }
}

impl Default for TimeOfDay {
    fn default() -> Self {
        Self::Starry
    }
}

impl fmt::Display for TimeOfDay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TimeOfDay::Starry => f.write_str("starry"),
            TimeOfDay::DayCycle => f.write_str("day-cycle"),
        }
    }
}

/// 8-bit RGB triple decoded from the panel's colour widget.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rgb(pub u8, pub u8, pub u8);

impl Rgb {
    /// Channels as floats in the 0-255 range, which is what `u_StadiumColor`
    /// expects.
    pub fn to_uniform(self) -> [f32; 3] {
        [self.0 as f32, self.1 as f32, self.2 as f32]
    }

    /// Channels normalised to 0-1.
    pub fn to_unit(self) -> [f32; 3] {
        [
            self.0 as f32 / 255.0,
            self.1 as f32 / 255.0,
            self.2 as f32 / 255.0,
        ]
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid hex colour '{value}'; expected #rrggbb")]
pub struct ColorParseError {
    pub value: String,
}

/// Decodes `#rrggbb` (the leading `#` is optional, digits are
/// case-insensitive).
pub fn parse_hex_color(value: &str) -> Result<Rgb, ColorParseError> {
    let err = || ColorParseError {
        value: value.to_string(),
    };
    let digits = value.strip_prefix('#').unwrap_or(value);
    if digits.len() != 6 || !digits.chars().all(|ch| ch.is_ascii_hexdigit()) {
        return Err(err());
    }
    let channel = |range: std::ops::Range<usize>| {
        u8::from_str_radix(&digits[range], 16).map_err(|_| err())
    };
    Ok(Rgb(channel(0..2)?, channel(2..4)?, channel(4..6)?))
}

/// Snapshot of the panel widgets.
///
/// `platform_color` keeps the widget's hex string; decoding happens in the
/// render loop so a malformed value can be rejected per tick.
#[derive(Debug, Clone, PartialEq)]
pub struct ParameterSet {
    pub time_of_day: TimeOfDay,
    pub cycle_speed: f32,
    pub platform_color: String,
    pub platforms_animate: bool,
}

impl Default for ParameterSet {
    fn default() -> Self {
        Self {
            time_of_day: TimeOfDay::Starry,
            cycle_speed: 50.0,
            platform_color: "#3ef04a".to_string(),
            platforms_animate: true,
        }
    }
}

/// Read side of the settings surface, polled once per tick.
pub trait ParameterStore {
    /// Returns the current live values. Must not block.
    fn read(&mut self) -> ParameterSet;
}

impl ParameterStore for ParameterSet {
    fn read(&mut self) -> ParameterSet {
        self.clone()
    }
}

/// Button-style capability invoked by the settings surface.
pub trait Trigger {
    fn trigger(&self);
}

/// Shared "load scene" flag. The panel triggers it; the render loop takes it
/// at the start of the next tick.
#[derive(Debug, Clone, Default)]
pub struct ReloadRequest {
    requested: Rc<Cell<bool>>,
}

impl ReloadRequest {
    pub fn new() -> Self {
        Self::default()
    }

    /// Consumes a pending request.
    pub fn take(&self) -> bool {
        self.requested.replace(false)
    }
}

impl Trigger for ReloadRequest {
    fn trigger(&self) {
        self.requested.set(true);
    }
}

/// Edits accepted by the [`ControlPanel`].
#[derive(Debug, Clone, PartialEq)]
pub enum PanelCommand {
    SetTimeOfDay(TimeOfDay),
    SetCycleSpeed(f32),
    SetPlatformColor(String),
    SetAnimatePlatforms(bool),
    LoadScene,
}

/// Cloneable sender used by input sources (stdin, tests) to drive the panel.
#[derive(Debug, Clone)]
pub struct PanelHandle {
    sender: Sender<PanelCommand>,
}

impl PanelHandle {
    /// Queues a command. Returns `false` once the panel has been dropped.
    pub fn send(&self, command: PanelCommand) -> bool {
        self.sender.send(command).is_ok()
    }
}

/// Widget-backed parameter store.
pub struct ControlPanel {
    values: ParameterSet,
    commands: Receiver<PanelCommand>,
    sender: Sender<PanelCommand>,
    load_scene: Box<dyn Trigger>,
}

impl ControlPanel {
    pub fn new(initial: ParameterSet, load_scene: impl Trigger + 'static) -> Self {
        let (sender, commands) = unbounded();
        let mut values = initial;
        values.cycle_speed = clamp_cycle_speed(values.cycle_speed);
        Self {
            values,
            commands,
            sender,
            load_scene: Box::new(load_scene),
        }
    }

    pub fn handle(&self) -> PanelHandle {
        PanelHandle {
            sender: self.sender.clone(),
        }
    }

    pub fn values(&self) -> &ParameterSet {
        &self.values
    }

    /// Applies one command immediately.
    pub fn apply(&mut self, command: PanelCommand) {
        match command {
            PanelCommand::SetTimeOfDay(mode) => self.values.time_of_day = mode,
            PanelCommand::SetCycleSpeed(speed) => {
                self.values.cycle_speed = clamp_cycle_speed(speed)
            }
            PanelCommand::SetPlatformColor(color) => self.values.platform_color = color,
            PanelCommand::SetAnimatePlatforms(flag) => self.values.platforms_animate = flag,
            PanelCommand::LoadScene => {
                tracing::debug!("load scene requested from control panel");
                self.load_scene.trigger();
            }
        }
    }
}

impl ParameterStore for ControlPanel {
    fn read(&mut self) -> ParameterSet {
        while let Ok(command) = self.commands.try_recv() {
            self.apply(command);
        }
        self.values.clone()
    }
}

fn clamp_cycle_speed(speed: f32) -> f32 {
    if speed.is_nan() {
        0.0
    } else {
        speed.clamp(0.0, MAX_CYCLE_SPEED)
    }
}

/// Shadow copy of the values last pushed to the shader, used only for
/// change detection.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct LastSeenParameters {
    pub time_of_day: Option<TimeOfDay>,
    pub cycle_speed: Option<f32>,
    pub platforms_animate: bool,
    pub platform_color: Option<Rgb>,
    pub rejected_color: Option<String>,
}

impl LastSeenParameters {
    /// The animate flag starts as the negation of the initial widget value so
    /// the first tick always pushes it.
    pub fn seeded_from(initial: &ParameterSet) -> Self {
        Self {
            time_of_day: None,
            cycle_speed: None,
            platforms_animate: !initial.platforms_animate,
            platform_color: None,
            rejected_color: None,
        }
    }
}
