use std::fmt;
use std::path::PathBuf;

/// Captions produced by one successful extractor invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Extraction {
    pub content: String,
    pub path: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{kind}: {message}")]
pub struct ExtractError {
    pub kind: FailureKind,
    /// Reported verbatim as the job's failure message once retries run out.
    pub message: String,
}

impl ExtractError {
    pub fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    NoCaptions,
    EmptyContent,
    MissingPath,
    Timeout,
    Process,
    Io,
    Panicked,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureKind::NoCaptions => write!(f, "no captions"),
            FailureKind::EmptyContent => write!(f, "empty content"),
            FailureKind::MissingPath => write!(f, "missing artifact path"),
            FailureKind::Timeout => write!(f, "timeout"),
            FailureKind::Process => write!(f, "extractor process error"),
            FailureKind::Io => write!(f, "io error"),
            FailureKind::Panicked => write!(f, "extractor panicked"),
        }
    }
}
