use std::sync::Arc;

use anyhow::{anyhow, Result};
use winit::dpi::PhysicalSize;
use winit::event::{ElementState, Event, KeyEvent, WindowEvent};
use winit::event_loop::{ControlFlow, EventLoopBuilder};
use winit::keyboard::{Key, NamedKey};
use winit::window::{Window, WindowBuilder};

use crate::device::FrameError;
use crate::gpu::WgpuDevice;
use crate::input::{KeyInput, KeyState};
use crate::params::{ControlPanel, ReloadRequest};
use crate::render_loop::{FrameScheduler, RenderLoop};
use crate::types::RendererConfig;

/// Schedules the next tick by asking the window for a redraw.
struct WindowScheduler {
    window: Arc<Window>,
}

impl FrameScheduler for WindowScheduler {
    fn request_frame(&self) {
        self.window.request_redraw();
    }
}

/// Opens the stadium window and drives the render loop until the window is
/// closed or Escape is pressed. Blocks the calling thread.
pub fn run_window(
    config: RendererConfig,
    panel: ControlPanel,
    reload: ReloadRequest,
) -> Result<()> {
    let event_loop = EventLoopBuilder::new()
        .build()
        .map_err(|err| anyhow!("failed to create event loop: {err}"))?;

    let (width, height) = config.surface_size;
    let window = WindowBuilder::new()
        .with_title(config.title.as_str())
        .with_inner_size(PhysicalSize::new(width, height))
        .build(&event_loop)
        .map_err(|err| anyhow!("failed to create window: {err}"))?;
    let window = Arc::new(window);

    let device = WgpuDevice::new(window.clone())?;
    let mut render_loop = RenderLoop::new(device, panel, reload, &config)?;
    let size = window.inner_size();
    render_loop.start(size.width.max(1), size.height.max(1))?;

    let scheduler = WindowScheduler {
        window: window.clone(),
    };
    scheduler.request_frame();

    let mut fatal: Option<anyhow::Error> = None;
    let run_result = event_loop.run(|event, elwt| {
        elwt.set_control_flow(ControlFlow::Wait);
        let Event::WindowEvent { window_id, event } = event else {
            return;
        };
        if window_id != window.id() {
            return;
        }
        match event {
            WindowEvent::CloseRequested | WindowEvent::Destroyed => {
                tracing::info!("window closed");
                elwt.exit();
            }
            WindowEvent::KeyboardInput { event, .. } => {
                if event.state == ElementState::Pressed
                    && matches!(event.logical_key, Key::Named(NamedKey::Escape))
                {
                    tracing::info!("escape pressed; closing window");
                    elwt.exit();
                    return;
                }
                if let Some(input) = key_input(&event) {
                    render_loop.key_event(input);
                }
            }
            WindowEvent::Resized(new_size) => {
                render_loop.resize(new_size.width, new_size.height);
            }
            WindowEvent::RedrawRequested => match render_loop.tick(&scheduler) {
                Ok(_) => {}
                Err(FrameError::Lost | FrameError::Outdated) => {
                    render_loop.device_mut().reconfigure();
                }
                Err(FrameError::OutOfMemory) => {
                    tracing::error!("surface out of memory; exiting");
                    fatal = Some(anyhow!("GPU surface ran out of memory"));
                    elwt.exit();
                }
                Err(err) => {
                    tracing::warn!(error = %err, "frame skipped; retrying next frame");
                }
            },
            _ => {}
        }
    });

    run_result.map_err(|err| anyhow!("window event loop error: {err}"))?;
    match fatal {
        Some(err) => Err(err),
        None => Ok(()),
    }
}

fn key_input(event: &KeyEvent) -> Option<KeyInput> {
    if event.repeat {
        return None;
    }
    let key = match &event.logical_key {
        Key::Character(text) => text.to_string(),
        Key::Named(named) => format!("{named:?}"),
        _ => return None,
    };
    let state = match event.state {
        ElementState::Pressed => KeyState::Pressed,
        ElementState::Released => KeyState::Released,
    };
    Some(KeyInput { key, state })
}
