//! Error taxonomy of the job lifecycle and its user-facing rendering.

use std::time::Duration;

use thiserror::Error;

/// Rejected locally: no network call, job state untouched.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Please upload a valid video or audio file")]
    UnsupportedMedia { file_name: String },
    #[error(
        "Error: The uploaded file exceeds the maximum duration of {} seconds. Please upload a smaller duration file.",
        limit.as_secs()
    )]
    DurationExceeded { actual: Duration, limit: Duration },
    #[error("Please enter a valid email address")]
    InvalidEmail,
    #[error("Source and Target languages cannot be the same")]
    IdenticalLanguages,
    #[error("unknown {side} language: {label}")]
    UnknownLanguage { side: &'static str, label: String },
    #[error("Email can only be attached to a submitted job")]
    NoActiveJob,
}

/// Failure of one call against the remote service.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RemoteError {
    /// Connection refused, DNS, timeout: the service was never reached.
    #[error("service unreachable: {0}")]
    Unreachable(String),
    #[error("{body}")]
    Rejected { status: u16, body: String },
    #[error("malformed response: {0}")]
    Malformed(String),
}

impl RemoteError {
    pub fn is_transient(&self) -> bool {
        matches!(self, RemoteError::Unreachable(_))
    }
}

impl From<reqwest::Error> for RemoteError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() || err.is_connect() {
            RemoteError::Unreachable(err.to_string())
        } else if err.is_decode() || err.is_body() {
            RemoteError::Malformed(err.to_string())
        } else if let Some(status) = err.status() {
            RemoteError::Rejected {
                status: status.as_u16(),
                body: err.to_string(),
            }
        } else {
            RemoteError::Unreachable(err.to_string())
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SubmissionError {
    #[error("Free translation limit reached. Sign Up for Free to Murf Studio.")]
    QuotaExceeded,
    #[error("No job ID received")]
    MissingJobId,
    #[error("Upload failed: {0}")]
    Remote(RemoteError),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StatusError {
    #[error("status check failed: {0}")]
    Remote(RemoteError),
    #[error("job reported completion without a download URL")]
    MissingDownloadUrl,
    #[error("translated media download failed: {0}")]
    Download(RemoteError),
}

impl StatusError {
    pub fn is_transient(&self) -> bool {
        match self {
            StatusError::Remote(err) | StatusError::Download(err) => err.is_transient(),
            StatusError::MissingDownloadUrl => false,
        }
    }
}

/// The service reported `FAILED` for the job.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{reason}")]
pub struct JobFailure {
    pub code: Option<String>,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum JobError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Submission(#[from] SubmissionError),
    #[error(transparent)]
    Status(#[from] StatusError),
    #[error(transparent)]
    Failure(#[from] JobFailure),
}
