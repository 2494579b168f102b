//! User-facing configuration (SPEC_FULL.md §B "Configuration"): a small,
//! serializable struct carrying the backend-selection override and cache
//! limits, in the shape of the teacher's `config` crate's `ConfigGfx` but
//! without its `config-macro`/`hiarc` derive machinery (dropped per
//! DESIGN.md — this crate has no equivalent reload/diff use case).

use serde::{Deserialize, Serialize};

use crate::backend::BackendKind;
use crate::config::BackendSelection;

fn default_module_cache_capacity() -> usize {
    256
}

fn default_pipeline_cache_capacity() -> usize {
    1024
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackendConfig {
    /// `None` leaves backend selection to the environment/CLI (spec §6);
    /// `Some` always wins over both (spec §6 "Configuration-struct
    /// override takes final precedence").
    #[serde(default)]
    pub backend_override: Option<String>,
    #[serde(default = "default_module_cache_capacity")]
    pub shader_module_cache_capacity: usize,
    #[serde(default = "default_pipeline_cache_capacity")]
    pub pipeline_cache_capacity: usize,
}

impl Default for BackendConfig {
    fn default() -> Self {
        BackendConfig {
            backend_override: None,
            shader_module_cache_capacity: default_module_cache_capacity(),
            pipeline_cache_capacity: default_pipeline_cache_capacity(),
        }
    }
}

impl BackendConfig {
    /// Resolves this configuration's override, if any, into a
    /// [`BackendSelection`] for [`crate::config::resolve_selection`].
    pub fn selection_override(&self) -> Option<BackendSelection> {
        let name = self.backend_override.as_deref()?;
        Some(crate::config::parse_backend_name(name))
    }

    pub fn parse(json: &str) -> anyhow::Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

impl From<BackendKind> for BackendConfig {
    fn from(kind: BackendKind) -> Self {
        BackendConfig {
            backend_override: Some(kind.env_name().to_string()),
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_has_no_override() {
        assert_eq!(BackendConfig::default().selection_override(), None);
    }

    #[test]
    fn parses_explicit_override_from_json() {
        let config = BackendConfig::parse(r#"{"backend_override": "webgpu"}"#).unwrap();
        assert_eq!(
            config.selection_override(),
            Some(BackendSelection::Explicit(BackendKind::WebGpu))
        );
    }

    #[test]
    fn missing_fields_fall_back_to_defaults() {
        let config = BackendConfig::parse("{}").unwrap();
        assert_eq!(config.shader_module_cache_capacity, 256);
        assert_eq!(config.pipeline_cache_capacity, 1024);
    }
}
