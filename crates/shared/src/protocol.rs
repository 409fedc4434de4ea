use serde::{Deserialize, Serialize};

use crate::domain::JobId;

/// Substring the service puts in a create-job rejection when the free quota is used up.
pub const QUOTA_LIMIT_MARKER: &str = "submitted max free dubs";

/// `failure_code` reported when the clip's spoken language differs from the declared source.
pub const SOURCE_LANGUAGE_MISMATCH: &str = "SOURCE_LANGUAGE_MISMATCH";

pub mod form_fields {
    pub const FILE_NAME: &str = "file_name";
    pub const FILE: &str = "file";
    pub const SOURCE_LOCALE: &str = "source_locale";
    pub const TARGET_LOCALE: &str = "target_locale";
    pub const EMAIL: &str = "email";
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateJobResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub job_id: Option<JobId>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RemoteJobStatus {
    Submitted,
    Queued,
    Processing,
    Completed,
    PartialSuccess,
    Failed,
    #[serde(other)]
    Unknown,
}

impl RemoteJobStatus {
    /// Cosmetic progress checkpoint for in-flight statuses.
    pub fn progress_checkpoint(self) -> Option<u8> {
        match self {
            RemoteJobStatus::Submitted => Some(40),
            RemoteJobStatus::Queued => Some(60),
            RemoteJobStatus::Processing => Some(80),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DownloadDetail {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub download_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobStatusResponse {
    pub status: RemoteJobStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub download_details: Option<Vec<DownloadDetail>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure_reason: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure_code: Option<String>,
}

impl JobStatusResponse {
    pub fn new(status: RemoteJobStatus) -> Self {
        Self {
            status,
            download_details: None,
            failure_reason: None,
            failure_code: None,
        }
    }

    pub fn completed(download_url: impl Into<String>) -> Self {
        Self {
            download_details: Some(vec![DownloadDetail {
                download_url: Some(download_url.into()),
            }]),
            ..Self::new(RemoteJobStatus::Completed)
        }
    }

    pub fn failed(failure_code: Option<&str>, failure_reason: Option<&str>) -> Self {
        Self {
            failure_code: failure_code.map(str::to_string),
            failure_reason: failure_reason.map(str::to_string),
            ..Self::new(RemoteJobStatus::Failed)
        }
    }

    /// First download URL, ignoring empty strings.
    pub fn download_url(&self) -> Option<&str> {
        self.download_details
            .as_ref()?
            .first()?
            .download_url
            .as_deref()
            .filter(|url| !url.is_empty())
    }
}
