//! The per-frame driver.
//!
//! ```text
//!   ParameterStore::read ─▶ diff vs LastSeenParameters ─▶ ShaderProgram setters
//!            │
//!            ▼
//!   Camera::update ─▶ viewport ─▶ clear ─▶ keys ─▶ Renderer::render ─▶ present
//!            │
//!            ▼
//!   time += 1 ─▶ FrameScheduler::request_frame
//! ```
//!
//! Resize events go straight to the renderer, camera and program and may
//! arrive between any two ticks.

use anyhow::{Context, Result};

use crate::camera::Camera;
use crate::device::{FrameError, GpuDevice};
use crate::geometry::Scene;
use crate::input::{KeyHandlers, KeyInput};
use crate::params::{
    parse_hex_color, LastSeenParameters, ParameterSet, ParameterStore, ReloadRequest,
};
use crate::program::ShaderProgram;
use crate::render::Renderer;
use crate::stats::FrameStats;
use crate::types::{ReloadPolicy, RendererConfig};

/// Host capability that runs the next tick before the next display refresh.
pub trait FrameScheduler {
    fn request_frame(&self);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
    /// Program and camera exist but no scene has been loaded.
    Uninitialized,
    /// Scene loaded and sized; no tick has run yet.
    Ready,
    /// At least one tick has run.
    Ticking,
}

/// Result of a tick that did not fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    Rendered,
    NotReady,
}

pub struct RenderLoop<D, S> {
    state: LoopState,
    device: D,
    store: S,
    camera: Camera,
    renderer: Renderer,
    program: ShaderProgram,
    scene: Scene,
    last_seen: LastSeenParameters,
    time: u64,
    reload: ReloadRequest,
    reload_policy: ReloadPolicy,
    keys: KeyHandlers,
    stats: FrameStats,
}

impl<D, S> RenderLoop<D, S>
where
    D: GpuDevice,
    S: ParameterStore,
{
    /// Links the program and builds the camera and renderer. The loop stays
    /// `Uninitialized` until [`RenderLoop::start`].
    pub fn new(
        mut device: D,
        store: S,
        reload: ReloadRequest,
        config: &RendererConfig,
    ) -> Result<Self> {
        let program = ShaderProgram::link(&mut device, &config.shaders)
            .context("failed to build the scene shader program")?;
        let camera = Camera::new(&config.camera);
        let (width, height) = config.surface_size;
        let mut renderer = Renderer::new(width, height);
        let [r, g, b, a] = config.clear_color;
        renderer.set_clear_color(r, g, b, a);

        Ok(Self {
            state: LoopState::Uninitialized,
            device,
            store,
            camera,
            renderer,
            program,
            scene: Scene::default(),
            last_seen: LastSeenParameters::seeded_from(&config.parameters),
            time: 0,
            reload,
            reload_policy: config.reload,
            keys: KeyHandlers::new(),
            stats: FrameStats::new(config.stats_interval),
        })
    }

    /// Loads the scene and applies the initial surface size. Starting again
    /// releases the previous scene's geometry first.
    pub fn start(&mut self, width: u32, height: u32) -> Result<()> {
        self.scene.reload(&mut self.device)?;
        self.time = 0;
        self.resize(width, height);
        self.state = LoopState::Ready;
        tracing::info!(
            width,
            height,
            program = %self.program.label(),
            drawables = self.scene.drawables().len(),
            "render loop ready"
        );
        Ok(())
    }

    /// Runs one frame and asks `scheduler` for the next one.
    ///
    /// A frame acquisition failure skips drawing and leaves `time` untouched;
    /// the next frame is still scheduled.
    pub fn tick(&mut self, scheduler: &dyn FrameScheduler) -> Result<TickOutcome, FrameError> {
        if self.state == LoopState::Uninitialized {
            return Ok(TickOutcome::NotReady);
        }
        self.state = LoopState::Ticking;

        let params = self.store.read();
        if self.reload.take() {
            self.reload_scene();
        }
        self.sync_parameters(&params);

        self.camera.update();
        self.stats.begin();
        self.renderer.apply_viewport(&mut self.device);

        let drawn = self.draw_frame();
        if drawn.is_ok() {
            self.time += 1;
        }

        self.stats.end(self.time);
        scheduler.request_frame();
        drawn.map(|()| TickOutcome::Rendered)
    }

    fn draw_frame(&mut self) -> Result<(), FrameError> {
        let cleared = self.renderer.clear(&mut self.device);
        // Input is drained even when no frame could be acquired.
        self.process_key_presses();
        cleared?;
        self.renderer.render(
            &mut self.device,
            &self.camera,
            &mut self.program,
            self.scene.drawables(),
            self.time,
        );
        self.device.present();
        Ok(())
    }

    /// Pushes changed parameters into the program. Colour is decoded and
    /// pushed every tick.
    fn sync_parameters(&mut self, params: &ParameterSet) {
        self.program.bind(&mut self.device);

        if self.last_seen.time_of_day != Some(params.time_of_day) {
            self.last_seen.time_of_day = Some(params.time_of_day);
            self.program.set_time_of_day(&mut self.device, params.time_of_day);
        }

        if self.last_seen.cycle_speed != Some(params.cycle_speed) {
            self.last_seen.cycle_speed = Some(params.cycle_speed);
            self.program.set_speed_of_cycle(&mut self.device, params.cycle_speed);
        }

        match parse_hex_color(&params.platform_color) {
            Ok(color) => {
                self.last_seen.platform_color = Some(color);
                self.last_seen.rejected_color = None;
                self.program.set_stadium_color(&mut self.device, color);
            }
            Err(err) => {
                let rejected = Some(params.platform_color.as_str());
                if self.last_seen.rejected_color.as_deref() != rejected {
                    tracing::warn!(error = %err, "keeping previous platform colour");
                    self.last_seen.rejected_color = Some(params.platform_color.clone());
                }
                if let Some(previous) = self.last_seen.platform_color {
                    self.program.set_stadium_color(&mut self.device, previous);
                }
            }
        }

        if self.last_seen.platforms_animate != params.platforms_animate {
            self.last_seen.platforms_animate = params.platforms_animate;
            self.program
                .set_animate_platforms(&mut self.device, params.platforms_animate);
        }
    }

    fn reload_scene(&mut self) {
        match self.scene.reload(&mut self.device) {
            Ok(()) => {
                if self.reload_policy.reset_time {
                    self.time = 0;
                }
                tracing::info!(
                    reset_time = self.reload_policy.reset_time,
                    time = self.time,
                    "scene reloaded"
                );
            }
            Err(err) => tracing::error!(error = %err, "scene reload failed; keeping current scene"),
        }
    }

    fn process_key_presses(&mut self) {
        self.keys.process();
    }

    /// Propagates a new window size to renderer, camera and program.
    /// Zero-sized (minimised) windows are ignored.
    pub fn resize(&mut self, width: u32, height: u32) {
        if width == 0 || height == 0 {
            tracing::debug!(width, height, "ignoring zero-sized resize");
            return;
        }
        self.renderer.set_size(&mut self.device, width, height);
        self.camera.set_aspect_ratio(width as f32 / height as f32);
        self.camera.update_projection_matrix();
        self.program.bind(&mut self.device);
        self.program.set_dimensions(&mut self.device, width, height);
        tracing::debug!(width, height, "surface resized");
    }

    /// Queues a key event for the next tick.
    pub fn key_event(&mut self, input: KeyInput) {
        self.keys.queue(input);
    }

    pub fn key_handlers_mut(&mut self) -> &mut KeyHandlers {
        &mut self.keys
    }

    pub fn state(&self) -> LoopState {
        self.state
    }

    /// Number of frames rendered since the scene was (re)loaded.
    pub fn time(&self) -> u64 {
        self.time
    }

    pub fn camera(&self) -> &Camera {
        &self.camera
    }

    pub fn renderer(&self) -> &Renderer {
        &self.renderer
    }

    pub fn program(&self) -> &ShaderProgram {
        &self.program
    }

    pub fn scene(&self) -> &Scene {
        &self.scene
    }

    pub fn device(&self) -> &D {
        &self.device
    }

    pub fn device_mut(&mut self) -> &mut D {
        &mut self.device
    }

    pub fn store(&self) -> &S {
        &self.store
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;

    use super::*;
    use crate::device::UniformValue;
    use crate::input::KeyInput;
    use crate::params::{ControlPanel, PanelCommand, Rgb, TimeOfDay, Trigger};
    use crate::program::Uniform;
    use crate::testing::{DeviceCall, RecordingDevice};

    #[derive(Default)]
    struct CountingScheduler {
        requests: Cell<u32>,
    }

    impl FrameScheduler for CountingScheduler {
        fn request_frame(&self) {
            self.requests.set(self.requests.get() + 1);
        }
    }

    fn ready_loop(
        device: RecordingDevice,
        config: &RendererConfig,
    ) -> (RenderLoop<RecordingDevice, ControlPanel>, ReloadRequest) {
        let reload = ReloadRequest::new();
        let panel = ControlPanel::new(config.parameters.clone(), reload.clone());
        let mut render_loop =
            RenderLoop::new(device, panel, reload.clone(), config).expect("render loop");
        let (width, height) = config.surface_size;
        render_loop.start(width, height).expect("start");
        (render_loop, reload)
    }

    fn default_loop() -> RenderLoop<RecordingDevice, ControlPanel> {
        ready_loop(RecordingDevice::new(), &RendererConfig::default()).0
    }

    fn send(render_loop: &RenderLoop<RecordingDevice, ControlPanel>, command: PanelCommand) {
        assert!(render_loop.store().handle().send(command));
    }

    #[test]
    fn startup_reaches_ready_with_window_aspect() {
        let config = RendererConfig {
            surface_size: (1600, 900),
            ..RendererConfig::default()
        };
        let reload = ReloadRequest::new();
        let panel = ControlPanel::new(config.parameters.clone(), reload.clone());
        let mut render_loop =
            RenderLoop::new(RecordingDevice::new(), panel, reload, &config).unwrap();
        assert_eq!(render_loop.state(), LoopState::Uninitialized);
        assert_eq!(
            render_loop.tick(&CountingScheduler::default()),
            Ok(TickOutcome::NotReady)
        );

        render_loop.start(1600, 900).unwrap();
        assert_eq!(render_loop.state(), LoopState::Ready);
        assert_eq!(render_loop.time(), 0);
        assert_eq!(render_loop.camera().aspect_ratio(), 1600.0 / 900.0);
        assert_eq!(
            render_loop.program().value(Uniform::Dimensions),
            Some(UniformValue::Vec2([1600.0, 900.0]))
        );
        assert!(!render_loop.scene().is_empty());
    }

    #[test]
    fn time_advances_once_per_tick() {
        let mut render_loop = default_loop();
        let scheduler = CountingScheduler::default();
        let before = render_loop.time();
        for _ in 0..25 {
            render_loop.tick(&scheduler).unwrap();
        }
        assert_eq!(render_loop.time(), before + 25);
        assert_eq!(scheduler.requests.get(), 25);
        assert_eq!(render_loop.state(), LoopState::Ticking);
        assert_eq!(
            render_loop.device().uploads("u_Time").last(),
            Some(&UniformValue::Float(24.0))
        );
    }

    #[test]
    fn unchanged_parameters_are_not_pushed_again() {
        let mut render_loop = default_loop();
        let scheduler = CountingScheduler::default();
        render_loop.tick(&scheduler).unwrap();
        let device = render_loop.device();
        assert_eq!(device.uploads("u_TimeOfDay").len(), 1);
        assert_eq!(device.uploads("u_SpeedOfCycle").len(), 1);
        assert_eq!(device.uploads("u_AnimatePlatforms").len(), 1);

        render_loop.device_mut().clear_calls();
        render_loop.tick(&scheduler).unwrap();
        let device = render_loop.device();
        assert!(device.uploads("u_TimeOfDay").is_empty());
        assert!(device.uploads("u_SpeedOfCycle").is_empty());
        assert!(device.uploads("u_AnimatePlatforms").is_empty());
        assert_eq!(device.uploads("u_StadiumColor").len(), 1);
    }

    #[test]
    fn changed_field_is_pushed_alone() {
        let mut render_loop = default_loop();
        let scheduler = CountingScheduler::default();
        render_loop.tick(&scheduler).unwrap();
        render_loop.device_mut().clear_calls();

        send(&render_loop, PanelCommand::SetCycleSpeed(12.0));
        send(&render_loop, PanelCommand::SetTimeOfDay(TimeOfDay::DayCycle));
        render_loop.tick(&scheduler).unwrap();

        let device = render_loop.device();
        assert_eq!(device.uploads("u_SpeedOfCycle"), vec![UniformValue::Float(12.0)]);
        assert_eq!(device.uploads("u_TimeOfDay"), vec![UniformValue::Int(2)]);
        assert!(device.uploads("u_AnimatePlatforms").is_empty());
    }

    #[test]
    fn decodes_widget_colour() {
        let mut render_loop = default_loop();
        render_loop.tick(&CountingScheduler::default()).unwrap();
        assert_eq!(
            render_loop.device().uploads("u_StadiumColor"),
            vec![UniformValue::Vec3([62.0, 240.0, 74.0])]
        );
    }

    #[test]
    fn malformed_colour_keeps_previous_value() {
        let mut render_loop = default_loop();
        let scheduler = CountingScheduler::default();
        render_loop.tick(&scheduler).unwrap();
        render_loop.device_mut().clear_calls();

        send(&render_loop, PanelCommand::SetPlatformColor("#zz0000".into()));
        render_loop.tick(&scheduler).unwrap();
        render_loop.tick(&scheduler).unwrap();
        assert_eq!(
            render_loop.device().uploads("u_StadiumColor"),
            vec![UniformValue::Vec3([62.0, 240.0, 74.0]); 2]
        );
        assert_eq!(render_loop.time(), 3);
    }

    #[test]
    fn rejected_colour_is_remembered_until_a_valid_one_arrives() {
        let mut render_loop = default_loop();
        let scheduler = CountingScheduler::default();
        render_loop.tick(&scheduler).unwrap();
        assert_eq!(render_loop.last_seen.rejected_color, None);

        send(&render_loop, PanelCommand::SetPlatformColor("#zz0000".into()));
        render_loop.tick(&scheduler).unwrap();
        render_loop.tick(&scheduler).unwrap();
        assert_eq!(render_loop.last_seen.rejected_color.as_deref(), Some("#zz0000"));

        send(&render_loop, PanelCommand::SetPlatformColor("blue".into()));
        render_loop.tick(&scheduler).unwrap();
        assert_eq!(render_loop.last_seen.rejected_color.as_deref(), Some("blue"));

        send(&render_loop, PanelCommand::SetPlatformColor("#0000ff".into()));
        render_loop.tick(&scheduler).unwrap();
        assert_eq!(render_loop.last_seen.rejected_color, None);
        assert_eq!(render_loop.last_seen.platform_color, Some(Rgb(0, 0, 255)));
    }

    #[test]
    fn malformed_colour_without_history_skips_push() {
        let mut config = RendererConfig::default();
        config.parameters.platform_color = "green".into();
        let (mut render_loop, _) = ready_loop(RecordingDevice::new(), &config);
        render_loop.tick(&CountingScheduler::default()).unwrap();
        assert!(render_loop.device().uploads("u_StadiumColor").is_empty());
        assert_eq!(render_loop.time(), 1);
    }

    #[test]
    fn first_tick_pushes_starting_animate_flag() {
        for flag in [true, false] {
            let mut config = RendererConfig::default();
            config.parameters.platforms_animate = flag;
            let (mut render_loop, _) = ready_loop(RecordingDevice::new(), &config);
            render_loop.tick(&CountingScheduler::default()).unwrap();
            assert_eq!(
                render_loop.device().uploads("u_AnimatePlatforms"),
                vec![UniformValue::Int(i32::from(flag))]
            );
        }
    }

    #[test]
    fn resize_twice_matches_resize_once() {
        let mut render_loop = default_loop();
        render_loop.resize(1024, 512);
        let aspect = render_loop.camera().aspect_ratio();
        let projection = render_loop.camera().projection_matrix();
        render_loop.resize(1024, 512);
        assert_eq!(render_loop.camera().aspect_ratio(), aspect);
        assert_eq!(render_loop.camera().projection_matrix(), projection);
        assert_eq!(aspect, 2.0);
        assert_eq!(render_loop.renderer().size(), (1024, 512));
    }

    #[test]
    fn zero_sized_resize_is_ignored() {
        let mut render_loop = default_loop();
        render_loop.device_mut().clear_calls();
        render_loop.resize(0, 720);
        assert!(render_loop.device().calls().is_empty());
        assert_eq!(render_loop.renderer().size(), (1280, 720));
    }

    #[test]
    fn frame_failure_does_not_advance_time() {
        let mut render_loop = default_loop();
        let scheduler = CountingScheduler::default();
        render_loop.device_mut().fail_next_frame(FrameError::Outdated);
        assert_eq!(render_loop.tick(&scheduler), Err(FrameError::Outdated));
        assert_eq!(render_loop.time(), 0);
        assert_eq!(scheduler.requests.get(), 1);
        assert!(render_loop.device().draws().is_empty());

        render_loop.tick(&scheduler).unwrap();
        assert_eq!(render_loop.time(), 1);
    }

    #[test]
    fn failed_frames_still_drain_key_input() {
        let mut render_loop = default_loop();
        let scheduler = CountingScheduler::default();
        let pressed = std::rc::Rc::new(Cell::new(0));
        let counter = pressed.clone();
        render_loop
            .key_handlers_mut()
            .on_press(move |_| counter.set(counter.get() + 1));

        for _ in 0..5 {
            render_loop.key_event(KeyInput::pressed("space"));
            render_loop.device_mut().fail_next_frame(FrameError::Timeout);
            assert_eq!(render_loop.tick(&scheduler), Err(FrameError::Timeout));
            assert_eq!(render_loop.key_handlers_mut().pending(), 0);
        }
        assert_eq!(pressed.get(), 5);
        assert_eq!(render_loop.time(), 0);
    }

    #[test]
    fn restarting_releases_previous_geometry() {
        let mut render_loop = default_loop();
        let first = render_loop.scene().drawables()[0].geometry;
        render_loop.start(1280, 720).unwrap();
        let second = render_loop.scene().drawables()[0].geometry;
        assert_ne!(first, second);
        assert_eq!(render_loop.device().destroyed_geometry(), &[first]);
        assert_eq!(render_loop.scene().drawables().len(), 1);
        assert_eq!(render_loop.state(), LoopState::Ready);
        assert_eq!(render_loop.time(), 0);
    }

    #[test]
    fn reload_keeps_time_by_default() {
        let (mut render_loop, reload) =
            ready_loop(RecordingDevice::new(), &RendererConfig::default());
        let scheduler = CountingScheduler::default();
        for _ in 0..3 {
            render_loop.tick(&scheduler).unwrap();
        }
        let before = render_loop.scene().drawables()[0].geometry;
        reload.trigger();
        render_loop.tick(&scheduler).unwrap();
        assert_ne!(render_loop.scene().drawables()[0].geometry, before);
        assert_eq!(render_loop.time(), 4);
    }

    #[test]
    fn reload_can_reset_time() {
        let config = RendererConfig {
            reload: ReloadPolicy { reset_time: true },
            ..RendererConfig::default()
        };
        let (mut render_loop, _) = ready_loop(RecordingDevice::new(), &config);
        let scheduler = CountingScheduler::default();
        for _ in 0..3 {
            render_loop.tick(&scheduler).unwrap();
        }
        send(&render_loop, PanelCommand::LoadScene);
        render_loop.tick(&scheduler).unwrap();
        assert_eq!(render_loop.time(), 1);
        assert_eq!(
            render_loop.device().uploads("u_Time").last(),
            Some(&UniformValue::Float(0.0))
        );
    }

    #[test]
    fn tick_follows_frame_order() {
        let mut render_loop = default_loop();
        render_loop.device_mut().clear_calls();
        render_loop.tick(&CountingScheduler::default()).unwrap();

        let calls = render_loop.device().calls();
        let position = |wanted: fn(&DeviceCall) -> bool| {
            calls.iter().position(wanted).expect("call recorded")
        };
        let viewport = position(|c| matches!(c, DeviceCall::Viewport(_)));
        let begin = position(|c| matches!(c, DeviceCall::BeginFrame));
        let clear = position(|c| matches!(c, DeviceCall::Clear(_)));
        let draw = position(|c| matches!(c, DeviceCall::Draw { .. }));
        let present = position(|c| matches!(c, DeviceCall::Present));
        assert!(viewport < begin && begin < clear && clear < draw && draw < present);
        assert!(calls
            .iter()
            .all(|c| !matches!(c, DeviceCall::Draw { program: None, .. })));
        assert!(calls
            .iter()
            .any(|c| matches!(c, DeviceCall::Draw { index_count: 6, .. })));
    }

    #[test]
    fn queued_keys_are_dispatched_during_tick() {
        let mut render_loop = default_loop();
        let pressed = std::rc::Rc::new(Cell::new(0));
        let counter = pressed.clone();
        render_loop
            .key_handlers_mut()
            .on_press(move |_| counter.set(counter.get() + 1));
        render_loop.key_event(KeyInput::pressed("a"));
        render_loop.key_event(KeyInput::released("a"));
        assert_eq!(pressed.get(), 0);
        render_loop.tick(&CountingScheduler::default()).unwrap();
        assert_eq!(pressed.get(), 1);
        assert_eq!(render_loop.key_handlers_mut().pending(), 0);
    }
}
