use std::fmt;
use std::io;
use std::str::Utf8Error;

use thiserror::Error;

/// Why a single payload could not be turned into a message. Never fatal.
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("payload is not valid utf-8: {0}")]
    Encoding(#[from] Utf8Error),
    #[error("payload is not valid json: {0}")]
    Json(#[from] serde_json::Error),
    #[error("payload is a json {0}, expected an object")]
    NotAnObject(&'static str),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceErrorKind {
    /// worth retrying after a pause
    Transient,
    /// the source will never deliver again
    Fatal,
}

impl fmt::Display for SourceErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceErrorKind::Transient => write!(f, "transient"),
            SourceErrorKind::Fatal => write!(f, "fatal"),
        }
    }
}

/// Failure to pull the next payload from a message source.
#[derive(Debug, Clone, Error)]
#[error("{kind} source error: {reason}")]
pub struct SourceError {
    pub kind:   SourceErrorKind,
    pub reason: String,
}

impl SourceError {
    pub fn transient(reason: impl Into<String>) -> SourceError {
        SourceError { kind: SourceErrorKind::Transient, reason: reason.into() }
    }

    pub fn fatal(reason: impl Into<String>) -> SourceError {
        SourceError { kind: SourceErrorKind::Fatal, reason: reason.into() }
    }

    pub fn is_fatal(&self) -> bool { self.kind == SourceErrorKind::Fatal }
}

/// Terminal failure of the ingestion loop.
#[derive(Debug, Error)]
pub enum IngestError {
    #[error("message source failed after {attempts} attempt(s): {source}")]
    Source { attempts: u32, source: SourceError },
    #[error("ingestion thread died without reporting an outcome")]
    Vanished,
}

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("failed to draw chart: {0}")]
    Io(#[from] io::Error),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error(transparent)]
    Load(#[from] config::ConfigError),
    #[error("invalid setting `{key}`: {reason}")]
    Invalid { key: &'static str, reason: String },
}

/// Error ending a pipeline run.
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Ingest(#[from] IngestError),
    #[error(transparent)]
    Io(#[from] io::Error),
}
