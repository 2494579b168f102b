use thiserror::Error;

/// A parse failure, tagged with the 1-based source line that caused it
/// (spec §4.1: "a human-readable diagnostic identifying the offending
/// line").
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("line {line}: {message}")]
pub struct ParseError {
    pub line: usize,
    pub message: String,
}

impl ParseError {
    pub fn new(line: usize, message: impl Into<String>) -> Self {
        ParseError {
            line,
            message: message.into(),
        }
    }
}

pub type ParseResult<T> = Result<T, ParseError>;
