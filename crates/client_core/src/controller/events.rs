//! Inputs to the job controller: user actions and completions of issued commands.

use std::{sync::Arc, time::Duration};

use shared::{
    domain::LanguageSide,
    protocol::{CreateJobResponse, JobStatusResponse, QUOTA_LIMIT_MARKER},
};

use crate::{controller::state::PlaybackTrack, error::RemoteError, media::MediaFile};

/// Identifies the job a completion belongs to; bumped whenever a job starts or is discarded.
pub type Epoch = u64;

#[derive(Debug, Clone)]
pub enum ControllerEvent {
    SelectLanguage {
        side: LanguageSide,
        label: String,
    },
    EmailEdited(String),
    FileSelected(MediaFile),
    /// `duration` is `None` when probing failed.
    DurationProbed {
        probe: u64,
        duration: Option<Duration>,
    },
    ProgressTick {
        epoch: Epoch,
    },
    SubmitResolved {
        epoch: Epoch,
        result: Result<CreateJobResponse, SubmitFailure>,
    },
    PollDue {
        epoch: Epoch,
    },
    StatusResolved {
        epoch: Epoch,
        result: Result<JobStatusResponse, RemoteError>,
    },
    ResultDownloaded {
        epoch: Epoch,
        result: Result<Arc<[u8]>, RemoteError>,
    },
    SubmitEmail,
    EmailResolved {
        epoch: Epoch,
        email: String,
        result: Result<(), RemoteError>,
    },
    PlaybackToggled(PlaybackTrack),
    PlaybackProgress {
        track: PlaybackTrack,
        position: f64,
        duration: f64,
    },
    PlaybackFinished(PlaybackTrack),
    Cancel,
    StartOver,
    DismissNotification {
        id: u64,
    },
}

/// Outcome of a create-job call that did not produce a usable response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitFailure {
    QuotaExceeded,
    Remote(RemoteError),
}

impl From<RemoteError> for SubmitFailure {
    fn from(err: RemoteError) -> Self {
        match &err {
            RemoteError::Rejected { body, .. } if body.contains(QUOTA_LIMIT_MARKER) => {
                SubmitFailure::QuotaExceeded
            }
            _ => SubmitFailure::Remote(err),
        }
    }
}

impl ControllerEvent {
    pub fn name(&self) -> &'static str {
        match self {
            ControllerEvent::SelectLanguage { .. } => "select_language",
            ControllerEvent::EmailEdited(_) => "email_edited",
            ControllerEvent::FileSelected(_) => "file_selected",
            ControllerEvent::DurationProbed { .. } => "duration_probed",
            ControllerEvent::ProgressTick { .. } => "progress_tick",
            ControllerEvent::SubmitResolved { .. } => "submit_resolved",
            ControllerEvent::PollDue { .. } => "poll_due",
            ControllerEvent::StatusResolved { .. } => "status_resolved",
            ControllerEvent::ResultDownloaded { .. } => "result_downloaded",
            ControllerEvent::SubmitEmail => "submit_email",
            ControllerEvent::EmailResolved { .. } => "email_resolved",
            ControllerEvent::PlaybackToggled(_) => "playback_toggled",
            ControllerEvent::PlaybackProgress { .. } => "playback_progress",
            ControllerEvent::PlaybackFinished(_) => "playback_finished",
            ControllerEvent::Cancel => "cancel",
            ControllerEvent::StartOver => "start_over",
            ControllerEvent::DismissNotification { .. } => "dismiss_notification",
        }
    }
}
