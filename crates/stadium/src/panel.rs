//! Line-oriented control panel on stdin.
//!
//! Each line is one command; results are fed to the render loop through a
//! [`PanelHandle`] and picked up on its next tick.

use std::io::{self, BufRead};
use std::thread::{self, JoinHandle};

use anyhow::{Context, Result};
use renderer::{PanelCommand, PanelHandle, TimeOfDay};

use crate::cli::{parse_color, parse_cycle_speed};

pub const HELP: &str = "\
commands:
  mode starry|day     switch the sky
  speed <0-100>       day/night cycle speed
  color <#rrggbb>     platform colour
  animate on|off      bob the platforms
  load                reload the scene
  help                show this message";

#[derive(Debug, Clone, PartialEq)]
pub enum PanelLine {
    Command(PanelCommand),
    Help,
    Blank,
}

pub fn parse_line(line: &str) -> Result<PanelLine, String> {
    let mut words = line.split_whitespace();
    let Some(verb) = words.next() else {
        return Ok(PanelLine::Blank);
    };
    let argument = words.next();
    if let Some(extra) = words.next() {
        return Err(format!("unexpected argument '{extra}'"));
    }
    let require = |name: &str| argument.ok_or_else(|| format!("'{name}' needs an argument"));
    let bare = |line: PanelLine| match argument {
        Some(extra) => Err(format!("unexpected argument '{extra}'")),
        None => Ok(line),
    };

    let command = match verb.to_ascii_lowercase().as_str() {
        "help" | "?" => return bare(PanelLine::Help),
        "load" | "reload" => return bare(PanelLine::Command(PanelCommand::LoadScene)),
        "mode" => match require("mode")?.to_ascii_lowercase().as_str() {
            "starry" | "night" | "1" => PanelCommand::SetTimeOfDay(TimeOfDay::Starry),
            "day" | "day-cycle" | "2" => PanelCommand::SetTimeOfDay(TimeOfDay::DayCycle),
            other => return Err(format!("unknown mode '{other}'; use starry or day")),
        },
        "speed" => PanelCommand::SetCycleSpeed(parse_cycle_speed(require("speed")?)?),
        "color" | "colour" => PanelCommand::SetPlatformColor(parse_color(require("color")?)?),
        "animate" => match require("animate")?.to_ascii_lowercase().as_str() {
            "on" | "true" | "yes" | "1" => PanelCommand::SetAnimatePlatforms(true),
            "off" | "false" | "no" | "0" => PanelCommand::SetAnimatePlatforms(false),
            other => return Err(format!("expected on or off, got '{other}'")),
        },
        other => return Err(format!("unknown command '{other}'; type 'help'")),
    };
    Ok(PanelLine::Command(command))
}

/// Reads commands from stdin on a background thread until stdin closes or
/// the panel goes away.
pub fn spawn_stdin_panel(handle: PanelHandle) -> Result<JoinHandle<()>> {
    thread::Builder::new()
        .name("stdin-panel".into())
        .spawn(move || {
            let stdin = io::stdin();
            for line in stdin.lock().lines() {
                let line = match line {
                    Ok(line) => line,
                    Err(err) => {
                        tracing::warn!(error = %err, "stopped reading control panel input");
                        return;
                    }
                };
                match parse_line(&line) {
                    Ok(PanelLine::Command(command)) => {
                        tracing::debug!(?command, "control panel command");
                        if !handle.send(command) {
                            return;
                        }
                    }
                    Ok(PanelLine::Help) => eprintln!("{HELP}"),
                    Ok(PanelLine::Blank) => {}
                    Err(err) => tracing::warn!(input = %line.trim(), "{err}"),
                }
            }
            tracing::debug!("stdin closed; control panel input finished");
        })
        .context("failed to spawn stdin control panel thread")
}
