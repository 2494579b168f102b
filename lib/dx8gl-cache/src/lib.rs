//! Content-addressed caching for compiled shader modules, pipelines, and
//! fixed-function shader synthesis (spec §4.7/§4.8).

pub mod error;
pub mod pipeline_cache;
pub mod shader_cache;
pub mod synthesis_cache;

pub use error::{CacheError, CacheResult};
pub use pipeline_cache::PipelineCache;
pub use shader_cache::{CacheShaderKind, CacheStats, ShaderModuleCache};
pub use synthesis_cache::SynthesisCache;
