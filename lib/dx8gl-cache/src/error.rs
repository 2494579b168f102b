use thiserror::Error;

/// Failures from cache compilation, construction, or persistence (spec §7:
/// "the caches never panic; a failed compile on load skips the entry").
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("compilation failed: {0}")]
    CompileFailed(String),
    #[error("pipeline construction failed: {0}")]
    ConstructFailed(String),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("corrupt cache file: {0}")]
    Corrupt(&'static str),
}

pub type CacheResult<T> = Result<T, CacheError>;
