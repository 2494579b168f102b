//! Backend selection (spec §4.5 "Backend selection", §6 "Backend
//! selection"): explicit kind or the `auto` sentinel, sourced from the
//! environment, a command line, or a configuration override, in that
//! increasing order of precedence.

use crate::backend::{BackendKind, RenderBackend};
use crate::backends::{HardwareGlBackend, SoftwareBackend, WebGpuBackend};

pub const ENV_VAR: &str = "DX8GL_BACKEND";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendSelection {
    Auto,
    Explicit(BackendKind),
}

/// Parses one of `osmesa`, `egl`, `webgpu`, `auto`. Unknown spellings fall
/// back to `auto` with a logged warning (spec §6).
pub fn parse_backend_name(name: &str) -> BackendSelection {
    match name {
        "osmesa" => BackendSelection::Explicit(BackendKind::SoftwareRaster),
        "egl" => BackendSelection::Explicit(BackendKind::HardwareGl),
        "webgpu" => BackendSelection::Explicit(BackendKind::WebGpu),
        "auto" => BackendSelection::Auto,
        other => {
            log::warn!("unknown DX8GL_BACKEND value '{other}', falling back to auto");
            BackendSelection::Auto
        }
    }
}

/// Parses `--backend=<name>` out of a process-argument string (spec §6).
pub fn parse_cli_flag(args: &[String]) -> Option<BackendSelection> {
    args.iter()
        .find_map(|arg| arg.strip_prefix("--backend="))
        .map(parse_backend_name)
}

/// Resolves the final selection from, in increasing precedence: the
/// environment variable, the command line, then an explicit
/// configuration-struct override (spec §6 "Configuration-struct override
/// takes final precedence").
pub fn resolve_selection(
    env_value: Option<&str>,
    args: &[String],
    config_override: Option<BackendSelection>,
) -> BackendSelection {
    let mut selection = BackendSelection::Auto;
    if let Some(value) = env_value {
        selection = parse_backend_name(value);
    }
    if let Some(from_cli) = parse_cli_flag(args) {
        selection = from_cli;
    }
    if let Some(from_config) = config_override {
        selection = from_config;
    }
    selection
}

fn new_backend(kind: BackendKind) -> Box<dyn RenderBackend> {
    match kind {
        BackendKind::SoftwareRaster => Box::new(SoftwareBackend::new()),
        BackendKind::HardwareGl => Box::new(HardwareGlBackend::new()),
        BackendKind::WebGpu => Box::new(WebGpuBackend::new()),
    }
}

/// Builds and initializes a backend per `selection`. An explicit selection
/// that fails to initialize is a clean failure, never a silent fallback
/// (spec §4.5 "Backend selection"). `Auto` tries web GPU, then hardware
/// GL, then software raster, returning the first that initializes.
pub fn create_backend(selection: BackendSelection, width: u32, height: u32) -> Result<Box<dyn RenderBackend>, String> {
    match selection {
        BackendSelection::Explicit(kind) => {
            let mut backend = new_backend(kind);
            if backend.initialize(width, height) {
                Ok(backend)
            } else {
                Err(backend
                    .last_error()
                    .map(str::to_string)
                    .unwrap_or_else(|| format!("{kind:?} failed to initialize")))
            }
        }
        BackendSelection::Auto => {
            let mut last_error = String::new();
            for kind in [BackendKind::WebGpu, BackendKind::HardwareGl, BackendKind::SoftwareRaster] {
                let mut backend = new_backend(kind);
                if backend.initialize(width, height) {
                    return Ok(backend);
                }
                last_error = backend.last_error().map(str::to_string).unwrap_or_default();
                log::warn!("auto backend selection: {kind:?} failed ({last_error})");
            }
            Err(format!("no backend could be initialized; last error: {last_error}"))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_env_value_falls_back_to_auto() {
        assert_eq!(parse_backend_name("nonsense"), BackendSelection::Auto);
    }

    #[test]
    fn config_override_beats_cli_and_env() {
        let args = vec!["--backend=egl".to_string()];
        let resolved = resolve_selection(
            Some("osmesa"),
            &args,
            Some(BackendSelection::Explicit(BackendKind::WebGpu)),
        );
        assert_eq!(resolved, BackendSelection::Explicit(BackendKind::WebGpu));
    }

    #[test]
    fn cli_beats_env_when_no_config_override() {
        let args = vec!["--backend=egl".to_string()];
        let resolved = resolve_selection(Some("osmesa"), &args, None);
        assert_eq!(resolved, BackendSelection::Explicit(BackendKind::HardwareGl));
    }

    #[test]
    fn env_alone_resolves_to_explicit_kind() {
        let resolved = resolve_selection(Some("webgpu"), &[], None);
        assert_eq!(resolved, BackendSelection::Explicit(BackendKind::WebGpu));
    }

    #[test]
    fn auto_selection_succeeds_via_software_fallback() {
        // Web GPU and hardware GL are unavailable in this headless test
        // environment; auto selection must still land on software raster
        // (spec §8 end-to-end scenario 6).
        let backend = create_backend(BackendSelection::Auto, 4, 4);
        assert!(backend.is_ok());
        assert_eq!(backend.unwrap().backend_kind(), BackendKind::SoftwareRaster);
    }
}
