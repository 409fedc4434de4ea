use shared::{
    domain::{JobId, MediaKind},
    languages::{DEFAULT_SOURCE_LANGUAGE, DEFAULT_TARGET_LANGUAGE},
};

use crate::{handles::ObjectHandle, media::MediaFile};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum JobPhase {
    #[default]
    Idle,
    Uploading,
    Processing,
    Completed,
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationSeverity {
    Error,
    Success,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub id: u64,
    pub message: String,
    pub severity: NotificationSeverity,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackTrack {
    Video,
    Source,
    Target,
}

/// Positions and durations in seconds, as reported by the player.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PlaybackState {
    pub playing: Option<PlaybackTrack>,
    pub current_time: f64,
    pub duration: f64,
    pub source_current_time: f64,
    pub source_duration: f64,
    pub target_current_time: f64,
    pub target_duration: f64,
}

impl PlaybackState {
    pub fn is_zeroed(&self) -> bool {
        *self == Self::default()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct EmailState {
    pub address: String,
    pub submitted: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct JobState {
    pub phase: JobPhase,
    pub source_language: String,
    pub target_language: String,
    pub file: Option<MediaFile>,
    pub job_id: Option<JobId>,
    pub progress: u8,
    pub source_handle: Option<ObjectHandle>,
    pub result_handle: Option<ObjectHandle>,
    pub email: EmailState,
    pub cancelled: bool,
    pub playback: PlaybackState,
    pub notification: Option<Notification>,
}

impl Default for JobState {
    fn default() -> Self {
        Self {
            phase: JobPhase::Idle,
            source_language: DEFAULT_SOURCE_LANGUAGE.to_string(),
            target_language: DEFAULT_TARGET_LANGUAGE.to_string(),
            file: None,
            job_id: None,
            progress: 0,
            source_handle: None,
            result_handle: None,
            email: EmailState::default(),
            cancelled: false,
            playback: PlaybackState::default(),
            notification: None,
        }
    }
}

impl JobState {
    pub fn is_active(&self) -> bool {
        matches!(self.phase, JobPhase::Uploading | JobPhase::Processing)
    }

    pub fn media_kind(&self) -> Option<MediaKind> {
        self.file.as_ref().map(MediaFile::kind)
    }

    /// Handles currently owned by the job, in release order.
    pub fn handles(&self) -> impl Iterator<Item = ObjectHandle> {
        self.source_handle.into_iter().chain(self.result_handle)
    }
}
