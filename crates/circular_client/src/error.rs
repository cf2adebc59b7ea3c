use std::fmt;

use thiserror::Error;

use crate::JobId;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportKind {
    HttpStatus(u16),
    Timeout,
    Connect,
    Network,
}

impl fmt::Display for TransportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransportKind::HttpStatus(code) => write!(f, "http status {code}"),
            TransportKind::Timeout => write!(f, "timeout"),
            TransportKind::Connect => write!(f, "connection failed"),
            TransportKind::Network => write!(f, "network error"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{kind}: {message}")]
pub struct TransportError {
    pub kind: TransportKind,
    pub message: String,
}

impl TransportError {
    pub(crate) fn new(kind: TransportKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ChatError {
    #[error("query submission rejected with http status {status}")]
    Submission { status: u16 },
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),
    #[error("job {job_id} not found")]
    NotFound { job_id: JobId },
    #[error("job failed: {message}")]
    JobFailed { message: String },
    #[error("job polling timed out after {attempts} attempts")]
    Timeout { attempts: u32 },
    #[error("job {job_id} completed but no result available")]
    MalformedResult { job_id: JobId },
    #[error("invalid url: {0}")]
    InvalidUrl(String),
    #[error("invalid response body: {0}")]
    Decode(String),
    #[error("client runtime unavailable: {0}")]
    Runtime(String),
}

impl ChatError {
    /// Whether a status check failing this way is worth repeating.
    ///
    /// Only the submit-and-wait path consults this; the polling engine never
    /// retries.
    pub fn is_transient(&self) -> bool {
        matches!(self, ChatError::Transport(_) | ChatError::Decode(_))
    }
}
