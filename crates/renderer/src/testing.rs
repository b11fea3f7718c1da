//! Recording [`GpuDevice`] double used by the unit tests.

use std::collections::HashMap;

use anyhow::Result;

use crate::device::{
    FrameError, GeometryId, GpuDevice, ProgramId, UniformLocation, UniformValue, Viewport,
};
use crate::geometry::Mesh;
use crate::program::Uniform;
use crate::types::ProgramSources;

const SLOT_STRIDE: u32 = 64;

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum DeviceCall {
    LinkProgram(ProgramId),
    UseProgram(ProgramId),
    Upload {
        program: Option<ProgramId>,
        name: String,
        value: UniformValue,
    },
    CreateGeometry(GeometryId),
    DestroyGeometry(GeometryId),
    Draw {
        program: Option<ProgramId>,
        geometry: GeometryId,
        index_count: u32,
    },
    Viewport(Viewport),
    Resize(u32, u32),
    BeginFrame,
    Clear([f32; 4]),
    Present,
}

/// Device that records every call and exposes a configurable uniform set.
pub(crate) struct RecordingDevice {
    uniform_names: Vec<String>,
    calls: Vec<DeviceCall>,
    active: Option<ProgramId>,
    next_program: u32,
    next_geometry: u32,
    live_geometry: HashMap<GeometryId, usize>,
    destroyed: Vec<GeometryId>,
    pending_frame_error: Option<FrameError>,
    fail_link: bool,
}

impl RecordingDevice {
    /// Device whose programs expose every uniform the scene uses.
    pub fn new() -> Self {
        Self::with_uniforms(Uniform::ALL.iter().map(|uniform| uniform.name()))
    }

    pub fn with_uniforms<'a>(names: impl IntoIterator<Item = &'a str>) -> Self {
        Self {
            uniform_names: names.into_iter().map(str::to_string).collect(),
            calls: Vec::new(),
            active: None,
            next_program: 1,
            next_geometry: 1,
            live_geometry: HashMap::new(),
            destroyed: Vec::new(),
            pending_frame_error: None,
            fail_link: false,
        }
    }

    pub fn failing_link() -> Self {
        let mut device = Self::new();
        device.fail_link = true;
        device
    }

    pub fn fail_next_frame(&mut self, error: FrameError) {
        self.pending_frame_error = Some(error);
    }

    pub fn calls(&self) -> &[DeviceCall] {
        &self.calls
    }

    pub fn clear_calls(&mut self) {
        self.calls.clear();
    }

    pub fn destroyed_geometry(&self) -> &[GeometryId] {
        &self.destroyed
    }

    /// Values uploaded to `name`, in call order.
    pub fn uploads(&self, name: &str) -> Vec<UniformValue> {
        self.calls
            .iter()
            .filter_map(|call| match call {
                DeviceCall::Upload {
                    name: uploaded,
                    value,
                    ..
                } if uploaded == name => Some(*value),
                _ => None,
            })
            .collect()
    }

    pub fn draws(&self) -> Vec<GeometryId> {
        self.calls
            .iter()
            .filter_map(|call| match call {
                DeviceCall::Draw { geometry, .. } => Some(*geometry),
                _ => None,
            })
            .collect()
    }

    pub fn count(&self, predicate: impl Fn(&DeviceCall) -> bool) -> usize {
        self.calls.iter().filter(|call| predicate(call)).count()
    }

    fn name_for(&self, location: UniformLocation) -> String {
        let index = (location.offset / SLOT_STRIDE) as usize;
        self.uniform_names
            .get(index)
            .cloned()
            .unwrap_or_else(|| format!("<offset {}>", location.offset))
    }
}

impl GpuDevice for RecordingDevice {
    fn link_program(&mut self, _sources: &ProgramSources) -> Result<ProgramId> {
        if self.fail_link {
            anyhow::bail!("fragment shader 'flat-frag' failed to compile");
        }
        let id = ProgramId(self.next_program);
        self.next_program += 1;
        self.calls.push(DeviceCall::LinkProgram(id));
        Ok(id)
    }

    fn use_program(&mut self, program: ProgramId) {
        self.active = Some(program);
        self.calls.push(DeviceCall::UseProgram(program));
    }

    fn active_program(&self) -> Option<ProgramId> {
        self.active
    }

    fn uniform_location(&self, _program: ProgramId, name: &str) -> Option<UniformLocation> {
        self.uniform_names
            .iter()
            .position(|candidate| candidate == name)
            .map(|index| UniformLocation {
                offset: index as u32 * SLOT_STRIDE,
                size: SLOT_STRIDE,
            })
    }

    fn upload_uniform(&mut self, location: UniformLocation, value: UniformValue) {
        let name = self.name_for(location);
        self.calls.push(DeviceCall::Upload {
            program: self.active,
            name,
            value,
        });
    }

    fn create_geometry(&mut self, mesh: &Mesh) -> Result<GeometryId> {
        let id = GeometryId(self.next_geometry);
        self.next_geometry += 1;
        self.live_geometry.insert(id, mesh.indices.len());
        self.calls.push(DeviceCall::CreateGeometry(id));
        Ok(id)
    }

    fn destroy_geometry(&mut self, geometry: GeometryId) {
        self.live_geometry.remove(&geometry);
        self.destroyed.push(geometry);
        self.calls.push(DeviceCall::DestroyGeometry(geometry));
    }

    fn draw_indexed(&mut self, geometry: GeometryId, index_count: u32) {
        let uploaded = self.live_geometry.get(&geometry).copied();
        assert!(uploaded.is_some(), "draw of destroyed geometry {geometry:?}");
        assert!(
            uploaded.is_some_and(|count| index_count as usize <= count),
            "draw past the end of {geometry:?}"
        );
        self.calls.push(DeviceCall::Draw {
            program: self.active,
            geometry,
            index_count,
        });
    }

    fn set_viewport(&mut self, viewport: Viewport) {
        self.calls.push(DeviceCall::Viewport(viewport));
    }

    fn resize_surface(&mut self, width: u32, height: u32) {
        self.calls.push(DeviceCall::Resize(width, height));
    }

    fn begin_frame(&mut self) -> Result<(), FrameError> {
        self.calls.push(DeviceCall::BeginFrame);
        match self.pending_frame_error.take() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    fn clear(&mut self, color: [f32; 4]) {
        self.calls.push(DeviceCall::Clear(color));
    }

    fn present(&mut self) {
        self.calls.push(DeviceCall::Present);
    }
}
