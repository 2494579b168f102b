//! Ties fixed-function shader synthesis (`dx8gl_shader::fixedfunction`) to
//! the shader-module and pipeline caches (`dx8gl_cache`), as spec §4.8
//! describes: a `FixedFunctionConfig` synthesizes a `ShaderPair`, each half
//! is "compiled" through the module cache, and the resulting module pair
//! plus a packed pipeline-state hash is looked up in the pipeline cache.
//!
//! `dx8gl-backend` has no single GPU-handle type shared across its three
//! `RenderBackend` implementations, so the "pipeline" this module produces
//! is the matched, content-addressed source pair itself; a concrete
//! backend is expected to feed `Pipeline::vertex_source`/`fragment_source`
//! into whatever compile call its own API exposes.

use std::hash::{Hash, Hasher};

use dx8gl_cache::{CacheResult, CacheShaderKind, PipelineCache, ShaderModuleCache, SynthesisCache};
use dx8gl_shader::fixedfunction::{synthesize_glsl, synthesize_wgsl, FixedFunctionConfig, ShaderPair};
use dx8gl_types::PipelineStateDescriptor;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShaderTarget {
    Glsl,
    Wgsl,
}

/// A matched vertex/fragment source pair ready to hand to a backend's own
/// compile call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pipeline {
    pub vertex_source: String,
    pub fragment_source: String,
}

/// Same FNV-1a fold `dx8gl_types::PipelineStateDescriptor::state_hash`
/// uses, applied to shader source text to produce the module id the
/// pipeline cache keys on. Deterministic across runs, unlike `std`'s
/// `DefaultHasher`.
fn source_id(source: &str) -> u64 {
    const FNV_OFFSET: u64 = 0xcbf29ce484222325;
    const FNV_PRIME: u64 = 0x100000001b3;
    let mut hash = FNV_OFFSET;
    for &b in source.as_bytes() {
        hash ^= b as u64;
        hash = hash.wrapping_mul(FNV_PRIME);
    }
    hash
}

/// Owns the three caches a fixed-function draw call needs: synthesized
/// source text, compiled modules, and assembled pipelines.
pub struct PipelineManager<M> {
    target: ShaderTarget,
    synthesis: SynthesisCache<FixedFunctionConfig, ShaderPair>,
    modules: ShaderModuleCache<M>,
    pipelines: PipelineCache<u64, Pipeline>,
}

impl<M> PipelineManager<M> {
    pub fn new(target: ShaderTarget, module_cache_capacity: usize) -> Self {
        PipelineManager {
            target,
            synthesis: SynthesisCache::new(),
            modules: ShaderModuleCache::new(module_cache_capacity),
            pipelines: PipelineCache::new(),
        }
    }

    pub fn module_cache_stats(&self) -> dx8gl_cache::CacheStats {
        self.modules.stats()
    }

    pub fn pipeline_count(&self) -> usize {
        self.pipelines.len()
    }

    /// Synthesizes (or reuses) the shader pair for `config`, compiles each
    /// half through the module cache via `compile`, and returns the
    /// resulting pipeline for `state`, constructing it on a cache miss.
    pub fn get_or_build<F>(
        &mut self,
        config: FixedFunctionConfig,
        state: &PipelineStateDescriptor,
        mut compile: F,
    ) -> CacheResult<&Pipeline>
    where
        F: FnMut(CacheShaderKind, &str) -> CacheResult<M>,
    {
        let target = self.target;
        let pair = self.synthesis.get_or_synthesize(config, |cfg| match target {
            ShaderTarget::Glsl => synthesize_glsl(cfg),
            ShaderTarget::Wgsl => synthesize_wgsl(cfg),
        });

        let state_hash = state.state_hash();
        let vertex_id = source_id(&pair.vertex);
        let fragment_id = source_id(&pair.fragment);

        self.modules
            .get_or_compile(CacheShaderKind::Vertex, &pair.vertex, state_hash as u32, |src| {
                compile(CacheShaderKind::Vertex, src)
            })?;
        self.modules
            .get_or_compile(CacheShaderKind::Fragment, &pair.fragment, state_hash as u32, |src| {
                compile(CacheShaderKind::Fragment, src)
            })?;

        self.pipelines.get_or_construct(vertex_id, fragment_id, state_hash, || {
            Ok(Pipeline {
                vertex_source: pair.vertex.clone(),
                fragment_source: pair.fragment.clone(),
            })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state() -> PipelineStateDescriptor {
        PipelineStateDescriptor {
            blend_enabled: false,
            blend_src_factor: 0,
            blend_dst_factor: 0,
            depth_test_enabled: true,
            depth_write_enabled: true,
            depth_compare: 0,
            depth_bias: 0,
            stencil_enabled: false,
            stencil_ref: 0,
            stencil_read_mask: 0xff,
            stencil_write_mask: 0xff,
            cull_mode: 0,
            fill_mode: 0,
            vertex_stride: 32,
            vertex_attrib_formats: vec![0, 1],
            topology: dx8gl_types::PrimitiveTopology::TriangleList,
        }
    }

    #[test]
    fn repeated_config_reuses_synthesis_and_pipeline() {
        let mut manager: PipelineManager<String> = PipelineManager::new(ShaderTarget::Glsl, 8);
        let config = FixedFunctionConfig {
            lighting_enabled: true,
            fog_enabled: false,
            texture_stage_bitmask: 0b1,
            vertex_has_color: false,
            transform_texcoords: true,
        };
        let state = state();

        let mut compiles = 0;
        manager.get_or_build(config, &state, |_, src| {
            compiles += 1;
            Ok(src.to_string())
        }).unwrap();
        manager.get_or_build(config, &state, |_, src| {
            compiles += 1;
            Ok(src.to_string())
        }).unwrap();

        assert_eq!(compiles, 2, "second call must hit both the synthesis and module cache");
        assert_eq!(manager.pipeline_count(), 1);
    }

    #[test]
    fn distinct_configs_yield_distinct_pipelines() {
        let mut manager: PipelineManager<String> = PipelineManager::new(ShaderTarget::Wgsl, 8);
        let state = state();
        let lit = FixedFunctionConfig {
            lighting_enabled: true,
            fog_enabled: false,
            texture_stage_bitmask: 0,
            vertex_has_color: false,
            transform_texcoords: false,
        };
        let unlit = FixedFunctionConfig {
            lighting_enabled: false,
            ..lit
        };

        manager.get_or_build(lit, &state, |_, src| Ok(src.to_string())).unwrap();
        manager.get_or_build(unlit, &state, |_, src| Ok(src.to_string())).unwrap();

        assert_eq!(manager.pipeline_count(), 2);
    }
}
