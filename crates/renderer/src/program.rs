use anyhow::{Context, Result};
use glam::Mat4;

use crate::device::{GpuDevice, ProgramId, UniformLocation, UniformValue};
use crate::geometry::Drawable;
use crate::params::{Rgb, TimeOfDay};
use crate::types::ProgramSources;

/// Uniforms the scene program may declare.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Uniform {
    Model,
    ViewProj,
    Dimensions,
    Time,
    TimeOfDay,
    SpeedOfCycle,
    StadiumColor,
    AnimatePlatforms,
}

impl Uniform {
    pub const ALL: [Uniform; 8] = [
        Uniform::Model,
        Uniform::ViewProj,
        Uniform::Dimensions,
        Uniform::Time,
        Uniform::TimeOfDay,
        Uniform::SpeedOfCycle,
        Uniform::StadiumColor,
        Uniform::AnimatePlatforms,
    ];

    /// Name of the block member in GLSL.
    pub fn name(self) -> &'static str {
        match self {
            Uniform::Model => "u_Model",
            Uniform::ViewProj => "u_ViewProj",
            Uniform::Dimensions => "u_Dimensions",
            Uniform::Time => "u_Time",
            Uniform::TimeOfDay => "u_TimeOfDay",
            Uniform::SpeedOfCycle => "u_SpeedOfCycle",
            Uniform::StadiumColor => "u_StadiumColor",
            Uniform::AnimatePlatforms => "u_AnimatePlatforms",
        }
    }

    fn index(self) -> usize {
        self as usize
    }
}

const UNIFORM_COUNT: usize = Uniform::ALL.len();

/// A linked program plus its resolved uniform locations.
///
/// Locations are looked up once at link time. Setters silently skip
/// uniforms the program does not declare, and do nothing unless this program
/// is the device's active program.
#[derive(Debug)]
pub struct ShaderProgram {
    id: ProgramId,
    label: String,
    locations: [Option<UniformLocation>; UNIFORM_COUNT],
    values: [Option<UniformValue>; UNIFORM_COUNT],
}

impl ShaderProgram {
    pub fn link<D: GpuDevice + ?Sized>(device: &mut D, sources: &ProgramSources) -> Result<Self> {
        let label = format!("{}+{}", sources.vertex.identifier, sources.fragment.identifier);
        let id = device
            .link_program(sources)
            .with_context(|| format!("failed to link shader program {label}"))?;

        let locations = Uniform::ALL.map(|uniform| device.uniform_location(id, uniform.name()));
        let missing: Vec<&str> = Uniform::ALL
            .iter()
            .filter(|uniform| locations[uniform.index()].is_none())
            .map(|uniform| uniform.name())
            .collect();
        if missing.is_empty() {
            tracing::debug!(program = %label, "linked shader program");
        } else {
            tracing::debug!(
                program = %label,
                ?missing,
                "linked shader program; absent uniforms will be ignored"
            );
        }

        Ok(Self {
            id,
            label,
            locations,
            values: [None; UNIFORM_COUNT],
        })
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn bind<D: GpuDevice + ?Sized>(&self, device: &mut D) {
        device.use_program(self.id);
    }

    pub fn is_bound<D: GpuDevice + ?Sized>(&self, device: &D) -> bool {
        device.active_program() == Some(self.id)
    }

    pub fn has_uniform(&self, uniform: Uniform) -> bool {
        self.locations[uniform.index()].is_some()
    }

    /// Last value successfully pushed for `uniform`.
    pub fn value(&self, uniform: Uniform) -> Option<UniformValue> {
        self.values[uniform.index()]
    }

    pub fn set_time_of_day<D: GpuDevice + ?Sized>(&mut self, device: &mut D, mode: TimeOfDay) {
        self.push(device, Uniform::TimeOfDay, UniformValue::Int(mode.shader_value()));
    }

    pub fn set_speed_of_cycle<D: GpuDevice + ?Sized>(&mut self, device: &mut D, speed: f32) {
        self.push(device, Uniform::SpeedOfCycle, UniformValue::Float(speed));
    }

    pub fn set_stadium_color<D: GpuDevice + ?Sized>(&mut self, device: &mut D, color: Rgb) {
        self.push(device, Uniform::StadiumColor, UniformValue::Vec3(color.to_uniform()));
    }

    /// Pushes 1 for `true`, 0 for `false`.
    pub fn set_animate_platforms<D: GpuDevice + ?Sized>(&mut self, device: &mut D, animate: bool) {
        self.push(
            device,
            Uniform::AnimatePlatforms,
            UniformValue::Int(i32::from(animate)),
        );
    }

    pub fn set_dimensions<D: GpuDevice + ?Sized>(
        &mut self,
        device: &mut D,
        width: u32,
        height: u32,
    ) {
        self.push(
            device,
            Uniform::Dimensions,
            UniformValue::Vec2([width as f32, height as f32]),
        );
    }

    pub fn set_time<D: GpuDevice + ?Sized>(&mut self, device: &mut D, time: u64) {
        self.push(device, Uniform::Time, UniformValue::Float(time as f32));
    }

    pub fn set_model_matrix<D: GpuDevice + ?Sized>(&mut self, device: &mut D, model: Mat4) {
        self.push(device, Uniform::Model, UniformValue::Mat4(model.to_cols_array()));
    }

    pub fn set_view_proj_matrix<D: GpuDevice + ?Sized>(&mut self, device: &mut D, view_proj: Mat4) {
        self.push(
            device,
            Uniform::ViewProj,
            UniformValue::Mat4(view_proj.to_cols_array()),
        );
    }

    /// Draws `drawable`. The program must already be bound.
    pub fn draw<D: GpuDevice + ?Sized>(&self, device: &mut D, drawable: &Drawable) {
        if !self.is_bound(device) {
            tracing::warn!(program = %self.label, "draw skipped: program is not bound");
            return;
        }
        device.draw_indexed(drawable.geometry, drawable.index_count);
    }

    fn push<D: GpuDevice + ?Sized>(
        &mut self,
        device: &mut D,
        uniform: Uniform,
        value: UniformValue,
    ) -> bool {
        if !self.is_bound(device) {
            tracing::trace!(uniform = uniform.name(), "program not bound; uniform ignored");
            return false;
        }
        let Some(location) = self.locations[uniform.index()] else {
            return false;
        };
        device.upload_uniform(location, value);
        self.values[uniform.index()] = Some(value);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{DeviceCall, RecordingDevice};

    fn linked(device: &mut RecordingDevice) -> ShaderProgram {
        ShaderProgram::link(device, &ProgramSources::flat()).expect("link")
    }

    #[test]
    fn resolves_every_uniform_when_present() {
        let mut device = RecordingDevice::new();
        let program = linked(&mut device);
        assert!(Uniform::ALL.iter().all(|u| program.has_uniform(*u)));
    }

    #[test]
    fn setters_are_noops_until_bound() {
        let mut device = RecordingDevice::new();
        let mut program = linked(&mut device);
        program.set_speed_of_cycle(&mut device, 10.0);
        assert!(device.uploads("u_SpeedOfCycle").is_empty());
        assert_eq!(program.value(Uniform::SpeedOfCycle), None);

        program.bind(&mut device);
        program.set_speed_of_cycle(&mut device, 10.0);
        assert_eq!(
            device.uploads("u_SpeedOfCycle"),
            vec![UniformValue::Float(10.0)]
        );
    }

    #[test]
    fn absent_uniform_is_ignored_without_touching_others() {
        let mut device =
            RecordingDevice::with_uniforms(["u_Time", "u_Dimensions", "u_StadiumColor"]);
        let mut program = linked(&mut device);
        program.bind(&mut device);
        program.set_dimensions(&mut device, 800, 600);
        program.set_stadium_color(&mut device, Rgb(1, 2, 3));

        program.set_animate_platforms(&mut device, true);
        program.set_time_of_day(&mut device, TimeOfDay::DayCycle);

        assert!(!program.has_uniform(Uniform::AnimatePlatforms));
        assert_eq!(program.value(Uniform::AnimatePlatforms), None);
        assert_eq!(
            program.value(Uniform::Dimensions),
            Some(UniformValue::Vec2([800.0, 600.0]))
        );
        assert_eq!(
            program.value(Uniform::StadiumColor),
            Some(UniformValue::Vec3([1.0, 2.0, 3.0]))
        );
        assert_eq!(
            device.count(|call| matches!(call, DeviceCall::Upload { .. })),
            2
        );
    }

    #[test]
    fn animate_flag_maps_to_int() {
        let mut device = RecordingDevice::new();
        let mut program = linked(&mut device);
        program.bind(&mut device);
        program.set_animate_platforms(&mut device, true);
        program.set_animate_platforms(&mut device, false);
        assert_eq!(
            device.uploads("u_AnimatePlatforms"),
            vec![UniformValue::Int(1), UniformValue::Int(0)]
        );
    }

    #[test]
    fn draw_requires_bound_program() {
        let mut device = RecordingDevice::new();
        let program = linked(&mut device);
        let drawable = crate::geometry::Scene::load(&mut device).unwrap().drawables()[0];
        program.draw(&mut device, &drawable);
        assert!(device.draws().is_empty());
        program.bind(&mut device);
        program.draw(&mut device, &drawable);
        assert_eq!(device.draws(), vec![drawable.geometry]);
    }

    #[test]
    fn link_failure_carries_program_label() {
        let mut device = RecordingDevice::failing_link();
        let err = ShaderProgram::link(&mut device, &ProgramSources::flat()).unwrap_err();
        assert!(format!("{err:#}").contains("flat-vert+flat-frag"));
    }
}
