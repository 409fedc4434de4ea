use std::{sync::Arc, time::Duration};

use shared::domain::JobId;

use crate::{
    controller::{events::Epoch, state::Notification},
    handles::ObjectHandle,
    media::MediaFile,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmitRequest {
    pub file: MediaFile,
    pub source_locale: String,
    pub target_locale: String,
    pub email: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    ProbeDuration {
        probe: u64,
        file: MediaFile,
    },
    SubmitJob {
        epoch: Epoch,
        request: SubmitRequest,
    },
    StartProgressTicker {
        epoch: Epoch,
        interval: Duration,
    },
    StopProgressTicker,
    FetchStatus {
        epoch: Epoch,
        job_id: JobId,
    },
    SchedulePoll {
        epoch: Epoch,
        delay: Duration,
    },
    CancelPoll,
    DownloadResult {
        epoch: Epoch,
        url: String,
    },
    CreateHandle {
        handle: ObjectHandle,
        data: Arc<[u8]>,
    },
    ReleaseHandle(ObjectHandle),
    UpdateEmail {
        epoch: Epoch,
        job_id: JobId,
        email: String,
    },
    PausePlayback,
    Notify(Notification),
}

impl Command {
    pub fn name(&self) -> &'static str {
        match self {
            Command::ProbeDuration { .. } => "probe_duration",
            Command::SubmitJob { .. } => "submit_job",
            Command::StartProgressTicker { .. } => "start_progress_ticker",
            Command::StopProgressTicker => "stop_progress_ticker",
            Command::FetchStatus { .. } => "fetch_status",
            Command::SchedulePoll { .. } => "schedule_poll",
            Command::CancelPoll => "cancel_poll",
            Command::DownloadResult { .. } => "download_result",
            Command::CreateHandle { .. } => "create_handle",
            Command::ReleaseHandle(_) => "release_handle",
            Command::UpdateEmail { .. } => "update_email",
            Command::PausePlayback => "pause_playback",
            Command::Notify(_) => "notify",
        }
    }

    /// True for commands that reach the remote service.
    pub fn is_network(&self) -> bool {
        matches!(
            self,
            Command::SubmitJob { .. }
                | Command::FetchStatus { .. }
                | Command::DownloadResult { .. }
                | Command::UpdateEmail { .. }
        )
    }
}
