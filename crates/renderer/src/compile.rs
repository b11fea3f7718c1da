use std::borrow::Cow;
use std::collections::BTreeMap;

use anyhow::{anyhow, bail, Result};
use wgpu::naga;

use crate::device::UniformLocation;
use crate::types::{ShaderSource, ShaderStage};

/// Bind group and binding that hold the program's uniform block.
pub(crate) const UNIFORM_GROUP: u32 = 0;
pub(crate) const UNIFORM_BINDING: u32 = 0;

/// Layout of a program's std140 uniform block as reflected from GLSL.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct UniformBlock {
    pub size: u32,
    pub members: BTreeMap<String, UniformLocation>,
}

impl UniformBlock {
    pub fn location(&self, name: &str) -> Option<UniformLocation> {
        self.members.get(name).copied()
    }

    /// Combines the vertex and fragment views of the block. Members declared
    /// by both stages must sit at the same offset.
    pub fn link(vertex: &UniformBlock, fragment: &UniformBlock) -> Result<UniformBlock> {
        let mut linked = vertex.clone();
        for (name, location) in &fragment.members {
            match linked.members.get(name) {
                Some(existing) if existing != location => bail!(
                    "uniform '{name}' is at offset {} in the vertex stage but {} in the fragment stage",
                    existing.offset,
                    location.offset
                ),
                Some(_) => {}
                None => {
                    linked.members.insert(name.clone(), *location);
                }
            }
        }
        linked.size = vertex.size.max(fragment.size);
        Ok(linked)
    }
}

fn naga_stage(stage: ShaderStage) -> naga::ShaderStage {
    match stage {
        ShaderStage::Vertex => naga::ShaderStage::Vertex,
        ShaderStage::Fragment => naga::ShaderStage::Fragment,
    }
}

/// Parses a GLSL stage with naga, reporting errors against the stage and
/// identifier.
pub(crate) fn parse_stage(source: &ShaderSource) -> Result<naga::Module> {
    let mut frontend = naga::front::glsl::Frontend::default();
    let options = naga::front::glsl::Options::from(naga_stage(source.stage));
    frontend.parse(&options, &source.text).map_err(|errors| {
        anyhow!(
            "{} shader '{}' failed to compile:\n{}",
            source.stage,
            source.identifier,
            errors.emit_to_string(&source.text)
        )
    })
}

/// Extracts the members of the uniform block at set 0, binding 0. A stage
/// without such a block yields an empty layout.
pub(crate) fn reflect_uniform_block(module: &naga::Module) -> UniformBlock {
    let mut block = UniformBlock::default();
    for (_, global) in module.global_variables.iter() {
        if global.space != naga::AddressSpace::Uniform {
            continue;
        }
        let Some(binding) = &global.binding else {
            continue;
        };
        if binding.group != UNIFORM_GROUP || binding.binding != UNIFORM_BINDING {
            continue;
        }
        let naga::TypeInner::Struct { members, span } = &module.types[global.ty].inner else {
            continue;
        };
        block.size = *span;
        for member in members {
            let Some(name) = &member.name else {
                continue;
            };
            let size = module.types[member.ty].inner.size(module.to_ctx());
            block.members.insert(
                name.clone(),
                UniformLocation {
                    offset: member.offset,
                    size,
                },
            );
        }
    }
    block
}

/// Compiles one stage for `device` and returns its reflected uniform block.
pub(crate) fn compile_stage(
    device: &wgpu::Device,
    source: &ShaderSource,
) -> Result<(wgpu::ShaderModule, UniformBlock)> {
    let module = parse_stage(source)?;
    let block = reflect_uniform_block(&module);
    tracing::debug!(
        stage = %source.stage,
        shader = %source.identifier,
        members = block.members.len(),
        size = block.size,
        "reflected uniform block"
    );

    device.push_error_scope(wgpu::ErrorFilter::Validation);
    let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
        label: Some(source.identifier.as_str()),
        source: wgpu::ShaderSource::Glsl {
            shader: Cow::Borrowed(&source.text),
            stage: naga_stage(source.stage),
            defines: &[],
        },
    });
    if let Some(err) = pollster::block_on(device.pop_error_scope()) {
        bail!(
            "{} shader '{}' was rejected by the device: {err}",
            source.stage,
            source.identifier
        );
    }
    Ok((shader, block))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::program::Uniform;
    use crate::types::ProgramSources;

    fn reflect(source: &ShaderSource) -> UniformBlock {
        reflect_uniform_block(&parse_stage(source).expect("bundled shader parses"))
    }

    #[test]
    fn bundled_shaders_declare_every_uniform() {
        let sources = ProgramSources::flat();
        let vertex = reflect(&sources.vertex);
        let fragment = reflect(&sources.fragment);
        let linked = UniformBlock::link(&vertex, &fragment).unwrap();
        for uniform in Uniform::ALL {
            assert!(
                linked.location(uniform.name()).is_some(),
                "missing {}",
                uniform.name()
            );
        }
    }

    #[test]
    fn reflects_std140_offsets() {
        let block = reflect(&ProgramSources::flat().fragment);
        let at = |name: &str| block.location(name).unwrap();
        assert_eq!(at("u_Model"), UniformLocation { offset: 0, size: 64 });
        assert_eq!(at("u_ViewProj").offset, 64);
        assert_eq!(at("u_Dimensions"), UniformLocation { offset: 128, size: 8 });
        assert_eq!(at("u_Time").offset, 136);
        assert_eq!(at("u_StadiumColor"), UniformLocation { offset: 144, size: 12 });
        assert!(at("u_TimeOfDay").offset >= 156);
        assert!(block.size >= at("u_AnimatePlatforms").offset + 4);
    }

    #[test]
    fn parse_errors_name_the_stage() {
        let broken = ShaderSource::new(
            ShaderStage::Fragment,
            "broken-frag",
            "#version 450\nvoid main() { undefined_call(); }\n",
        );
        let err = parse_stage(&broken).unwrap_err().to_string();
        assert!(err.contains("fragment shader 'broken-frag'"));
    }

    #[test]
    fn link_rejects_disagreeing_offsets() {
        let mut vertex = UniformBlock::default();
        vertex
            .members
            .insert("u_Time".into(), UniformLocation { offset: 0, size: 4 });
        let mut fragment = UniformBlock::default();
        fragment
            .members
            .insert("u_Time".into(), UniformLocation { offset: 16, size: 4 });
        assert!(UniformBlock::link(&vertex, &fragment).is_err());
    }

    #[test]
    fn stage_without_block_reflects_empty() {
        let plain = ShaderSource::new(
            ShaderStage::Fragment,
            "plain",
            "#version 450\nlayout(location = 0) out vec4 color;\nvoid main() { color = vec4(1.0); }\n",
        );
        assert!(reflect(&plain).members.is_empty());
    }
}
