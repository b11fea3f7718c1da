use anyhow::{Context, Result};
use renderer::{ControlPanel, ReloadRequest};
use sceneconfig::StadiumConfig;
use tracing_subscriber::EnvFilter;

use crate::bindings::{apply_overrides, load_config, renderer_config};
use crate::cli::{Cli, Command, ConfigAction, RunArgs};
use crate::panel::{spawn_stdin_panel, HELP};
use crate::paths::ConfigLocation;

pub fn run(cli: Cli) -> Result<()> {
    initialise_tracing();

    let location = ConfigLocation::resolve(cli.run.config.as_deref())?;
    match cli.command {
        Some(Command::Config(command)) => run_config_action(command.action, &location, &cli.run),
        None => run_viewer(&location, &cli.run),
    }
}

fn initialise_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn effective_config(location: &ConfigLocation, args: &RunArgs) -> Result<StadiumConfig> {
    let mut config = load_config(location)?;
    apply_overrides(&mut config, args).context("command-line overrides are invalid")?;
    Ok(config)
}

fn run_config_action(
    action: ConfigAction,
    location: &ConfigLocation,
    args: &RunArgs,
) -> Result<()> {
    match action {
        ConfigAction::Where => {
            println!("{}", location.path.display());
        }
        ConfigAction::Show => {
            let config = effective_config(location, args)?;
            print!("{}", config.to_toml_string()?);
        }
        ConfigAction::Check => {
            let config = effective_config(location, args)?;
            renderer_config(&config)?;
            if location.path.exists() {
                println!("{}: ok", location.path.display());
            } else {
                println!("{}: not found, built-in defaults are valid", location.path.display());
            }
        }
    }
    Ok(())
}

fn run_viewer(location: &ConfigLocation, args: &RunArgs) -> Result<()> {
    let config = effective_config(location, args)?;
    let renderer_config = renderer_config(&config)?;

    let reload = ReloadRequest::new();
    let panel = ControlPanel::new(renderer_config.parameters.clone(), reload.clone());
    if args.no_stdin_panel {
        tracing::debug!("stdin control panel disabled");
    } else {
        spawn_stdin_panel(panel.handle())?;
        tracing::info!("control panel reading commands from stdin; type 'help' for a list");
        tracing::debug!("{HELP}");
    }

    tracing::info!(
        width = renderer_config.surface_size.0,
        height = renderer_config.surface_size.1,
        mode = %renderer_config.parameters.time_of_day,
        speed = renderer_config.parameters.cycle_speed,
        "starting stadium viewer"
    );
    renderer::run_window(renderer_config, panel, reload)
}
