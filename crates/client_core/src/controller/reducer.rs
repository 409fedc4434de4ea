use std::{mem, sync::Arc, time::Duration};

use shared::{
    domain::LanguageSide,
    languages::{find_language, first_distinct, locale_for},
    protocol::{CreateJobResponse, JobStatusResponse, RemoteJobStatus, SOURCE_LANGUAGE_MISMATCH},
};
use tracing::{debug, info, warn};

use crate::{
    controller::{
        commands::{Command, SubmitRequest},
        events::{ControllerEvent, Epoch, SubmitFailure},
        state::{
            JobPhase, JobState, Notification, NotificationSeverity, PlaybackState, PlaybackTrack,
        },
    },
    error::{JobError, JobFailure, StatusError, SubmissionError, ValidationError},
    handles::ObjectHandle,
    media::{download_file_name, is_valid_email, validate_media, MediaFile},
    policy::{ControllerPolicy, LanguageCollision, StatusErrorPolicy},
};

pub const STATUS_CHECK_FAILED_MESSAGE: &str = "Error checking status";
pub const LANGUAGE_MISMATCH_MESSAGE: &str = "Source language doesn't match the provided language.";
pub const TRANSLATION_FAILED_MESSAGE: &str = "Translation failed";

pub struct JobController {
    policy: ControllerPolicy,
    state: JobState,
    epoch: Epoch,
    next_handle: u64,
    next_notification: u64,
    probe_seq: u64,
    pending_probe: Option<MediaFile>,
}

impl JobController {
    pub fn new(policy: ControllerPolicy) -> Self {
        Self {
            policy,
            state: JobState::default(),
            epoch: 0,
            next_handle: 0,
            next_notification: 0,
            probe_seq: 0,
            pending_probe: None,
        }
    }

    /// Starts from a preset language pair instead of the catalog defaults.
    ///
    /// The pair is taken as given; an identical or unknown pair is dealt with when a file is submitted.
    pub fn with_languages(
        policy: ControllerPolicy,
        source_language: impl Into<String>,
        target_language: impl Into<String>,
    ) -> Self {
        let mut controller = Self::new(policy);
        controller.state.source_language = source_language.into();
        controller.state.target_language = target_language.into();
        controller
    }

    pub fn state(&self) -> &JobState {
        &self.state
    }

    pub fn policy(&self) -> &ControllerPolicy {
        &self.policy
    }

    pub fn epoch(&self) -> Epoch {
        self.epoch
    }

    /// No job in flight and no selection waiting on its duration probe.
    pub fn is_settled(&self) -> bool {
        !self.state.is_active() && self.pending_probe.is_none()
    }

    /// Handle of the translated media and the file name to save it under.
    pub fn download_target(&self) -> Option<(ObjectHandle, String)> {
        if self.state.phase != JobPhase::Completed {
            return None;
        }
        let handle = self.state.result_handle?;
        let file = self.state.file.as_ref()?;
        Some((
            handle,
            download_file_name(&file.name, &self.state.target_language, file.kind()),
        ))
    }

    pub fn handle(&mut self, event: ControllerEvent) -> Vec<Command> {
        let mut cmds = Vec::new();
        let event_name = event.name();
        match event {
            ControllerEvent::SelectLanguage { side, label } => {
                self.select_language(side, label, &mut cmds)
            }
            ControllerEvent::EmailEdited(address) => {
                self.state.email.address = address;
                self.state.email.submitted = false;
            }
            ControllerEvent::FileSelected(file) => self.file_selected(file, &mut cmds),
            ControllerEvent::DurationProbed { probe, duration } => {
                self.duration_probed(probe, duration, &mut cmds)
            }
            ControllerEvent::ProgressTick { epoch } => {
                if self.is_current(epoch) && self.state.phase == JobPhase::Uploading {
                    self.state.progress = self
                        .state
                        .progress
                        .saturating_add(self.policy.tick_step)
                        .min(self.policy.tick_cap);
                }
            }
            ControllerEvent::SubmitResolved { epoch, result } => {
                if self.accepts_completion(epoch, JobPhase::Uploading, event_name) {
                    self.submit_resolved(result, &mut cmds);
                }
            }
            ControllerEvent::PollDue { epoch } => {
                if self.accepts_completion(epoch, JobPhase::Processing, event_name) {
                    if let Some(job_id) = self.state.job_id.clone() {
                        cmds.push(Command::FetchStatus { epoch, job_id });
                    }
                }
            }
            ControllerEvent::StatusResolved { epoch, result } => {
                if self.accepts_completion(epoch, JobPhase::Processing, event_name) {
                    match result {
                        Ok(status) => self.status_received(status, &mut cmds),
                        Err(err) => self.status_failed(StatusError::Remote(err), &mut cmds),
                    }
                }
            }
            ControllerEvent::ResultDownloaded { epoch, result } => {
                if self.accepts_completion(epoch, JobPhase::Processing, event_name) {
                    match result {
                        Ok(data) => self.complete(data, &mut cmds),
                        Err(err) => self.status_failed(StatusError::Download(err), &mut cmds),
                    }
                }
            }
            ControllerEvent::SubmitEmail => self.submit_email(&mut cmds),
            ControllerEvent::EmailResolved {
                epoch,
                email,
                result,
            } => {
                if epoch != self.epoch {
                    debug!(epoch, current = self.epoch, "dropping stale email update");
                } else {
                    match result {
                        Ok(()) => {
                            self.state.email.submitted = true;
                            cmds.push(self.notify_success(format!("Email updated to {email}")));
                        }
                        Err(err) => {
                            cmds.push(self.notify_error(format!("Failed to update email: {err}")))
                        }
                    }
                }
            }
            ControllerEvent::PlaybackToggled(track) => {
                if self.state.phase == JobPhase::Completed {
                    let playback = &mut self.state.playback;
                    playback.playing = if playback.playing == Some(track) {
                        None
                    } else {
                        Some(track)
                    };
                }
            }
            ControllerEvent::PlaybackProgress {
                track,
                position,
                duration,
            } => {
                if self.state.phase == JobPhase::Completed {
                    let (current, total) = track_fields(&mut self.state.playback, track);
                    *current = position;
                    *total = duration;
                }
            }
            ControllerEvent::PlaybackFinished(track) => {
                if self.state.phase == JobPhase::Completed {
                    let playback = &mut self.state.playback;
                    if playback.playing == Some(track) {
                        playback.playing = None;
                    }
                    *track_fields(playback, track).0 = 0.0;
                }
            }
            ControllerEvent::Cancel => self.cancel(&mut cmds),
            ControllerEvent::StartOver => self.start_over(&mut cmds),
            ControllerEvent::DismissNotification { id } => {
                if self.state.notification.as_ref().is_some_and(|n| n.id == id) {
                    self.state.notification = None;
                }
            }
        }
        cmds
    }

    fn is_current(&self, epoch: Epoch) -> bool {
        epoch == self.epoch && !self.state.cancelled
    }

    fn accepts_completion(&self, epoch: Epoch, phase: JobPhase, event: &'static str) -> bool {
        let accepted = self.is_current(epoch) && self.state.phase == phase;
        if !accepted {
            debug!(
                event,
                epoch,
                current = self.epoch,
                cancelled = self.state.cancelled,
                phase = ?self.state.phase,
                "dropping stale completion"
            );
        }
        accepted
    }

    fn select_language(&mut self, side: LanguageSide, label: String, cmds: &mut Vec<Command>) {
        if find_language(side, &label).is_none() {
            cmds.push(self.notify_job_error(ValidationError::UnknownLanguage {
                side: side_name(side),
                label,
            }));
            return;
        }

        if self.policy.language_collision == LanguageCollision::AutoAdvance
            && label == *self.language(side.opposite())
        {
            let opposite = side.opposite();
            if let Some(next) = first_distinct(opposite, &label) {
                info!(side = side_name(opposite), from = %label, to = next.label, "language auto-advanced");
                *self.language_mut(opposite) = next.label.to_string();
            }
        }
        *self.language_mut(side) = label;
    }

    fn language(&self, side: LanguageSide) -> &String {
        match side {
            LanguageSide::Source => &self.state.source_language,
            LanguageSide::Target => &self.state.target_language,
        }
    }

    fn language_mut(&mut self, side: LanguageSide) -> &mut String {
        match side {
            LanguageSide::Source => &mut self.state.source_language,
            LanguageSide::Target => &mut self.state.target_language,
        }
    }

    fn file_selected(&mut self, file: MediaFile, cmds: &mut Vec<Command>) {
        if let Err(err) = validate_media(&file) {
            info!(file = %file.name, mime = ?file.mime_type, "rejected unsupported media");
            cmds.push(self.notify_job_error(err));
            return;
        }

        if self.policy.max_duration.is_some() {
            self.probe_seq += 1;
            self.pending_probe = Some(file.clone());
            cmds.push(Command::ProbeDuration {
                probe: self.probe_seq,
                file,
            });
        } else {
            self.accept(file, cmds);
        }
    }

    fn duration_probed(&mut self, probe: u64, duration: Option<Duration>, cmds: &mut Vec<Command>) {
        if probe != self.probe_seq {
            debug!(probe, current = self.probe_seq, "dropping stale duration probe");
            return;
        }
        let Some(file) = self.pending_probe.take() else {
            return;
        };
        // A failed probe counts as a zero-length clip.
        let actual = duration.unwrap_or(Duration::ZERO);
        if let Some(limit) = self.policy.max_duration {
            if actual > limit {
                info!(file = %file.name, ?actual, ?limit, "rejected clip over duration limit");
                cmds.push(self.notify_job_error(ValidationError::DurationExceeded { actual, limit }));
                return;
            }
        }
        self.accept(file, cmds);
    }

    fn accept(&mut self, file: MediaFile, cmds: &mut Vec<Command>) {
        if self.state.source_language == self.state.target_language {
            match self.policy.language_collision {
                LanguageCollision::Reject => {
                    cmds.push(self.notify_job_error(ValidationError::IdenticalLanguages));
                    return;
                }
                LanguageCollision::AutoAdvance => {
                    let current = self.state.target_language.clone();
                    if let Some(next) =
                        first_distinct(LanguageSide::Target, &self.state.source_language)
                    {
                        info!(from = %current, to = next.label, "target language auto-advanced");
                        self.state.target_language = next.label.to_string();
                    }
                }
            }
        }

        let Some(source_locale) = locale_for(LanguageSide::Source, &self.state.source_language)
        else {
            let label = self.state.source_language.clone();
            cmds.push(self.notify_job_error(ValidationError::UnknownLanguage {
                side: "source",
                label,
            }));
            return;
        };
        let Some(target_locale) = locale_for(LanguageSide::Target, &self.state.target_language)
        else {
            let label = self.state.target_language.clone();
            cmds.push(self.notify_job_error(ValidationError::UnknownLanguage {
                side: "target",
                label,
            }));
            return;
        };

        // A new upload supersedes whatever the previous job still holds.
        self.release_job_resources(cmds);
        self.epoch += 1;

        let source_handle = self.allocate_handle();
        cmds.push(Command::CreateHandle {
            handle: source_handle,
            data: file.data.clone(),
        });

        let email = Some(self.state.email.address.clone()).filter(|e| is_valid_email(e));
        info!(
            epoch = self.epoch,
            file = %file.name,
            bytes = file.size(),
            source_locale,
            target_locale,
            "submitting dubbing job"
        );

        self.state = JobState {
            phase: JobPhase::Uploading,
            source_language: mem::take(&mut self.state.source_language),
            target_language: mem::take(&mut self.state.target_language),
            file: Some(file.clone()),
            source_handle: Some(source_handle),
            email: mem::take(&mut self.state.email),
            notification: self.state.notification.take(),
            ..JobState::default()
        };

        cmds.push(Command::StartProgressTicker {
            epoch: self.epoch,
            interval: self.policy.tick_interval,
        });
        cmds.push(Command::SubmitJob {
            epoch: self.epoch,
            request: SubmitRequest {
                file,
                source_locale: source_locale.to_string(),
                target_locale: target_locale.to_string(),
                email,
            },
        });
    }

    fn submit_resolved(
        &mut self,
        result: Result<CreateJobResponse, SubmitFailure>,
        cmds: &mut Vec<Command>,
    ) {
        cmds.push(Command::StopProgressTicker);
        let error = match result {
            Ok(CreateJobResponse {
                job_id: Some(job_id),
            }) if !job_id.as_str().is_empty() => {
                info!(epoch = self.epoch, %job_id, "job accepted; polling status");
                self.state.phase = JobPhase::Processing;
                self.state.progress = self.policy.accepted_progress;
                self.state.job_id = Some(job_id.clone());
                cmds.push(Command::FetchStatus {
                    epoch: self.epoch,
                    job_id,
                });
                return;
            }
            Ok(CreateJobResponse { .. }) => SubmissionError::MissingJobId,
            Err(SubmitFailure::QuotaExceeded) => SubmissionError::QuotaExceeded,
            Err(SubmitFailure::Remote(err)) => SubmissionError::Remote(err),
        };
        warn!(epoch = self.epoch, error = %error, "job submission failed");
        self.revert_to_idle(false, cmds);
        cmds.push(self.notify_job_error(error));
    }

    fn status_received(&mut self, status: JobStatusResponse, cmds: &mut Vec<Command>) {
        debug!(epoch = self.epoch, status = ?status.status, "job status");
        match status.status {
            RemoteJobStatus::Submitted | RemoteJobStatus::Queued | RemoteJobStatus::Processing => {
                if let Some(progress) = status.status.progress_checkpoint() {
                    self.state.progress = progress;
                }
                self.schedule_poll(cmds);
            }
            RemoteJobStatus::Unknown => self.schedule_poll(cmds),
            RemoteJobStatus::Completed | RemoteJobStatus::PartialSuccess => {
                match status.download_url() {
                    Some(url) => cmds.push(Command::DownloadResult {
                        epoch: self.epoch,
                        url: url.to_string(),
                    }),
                    None => self.status_failed(StatusError::MissingDownloadUrl, cmds),
                }
            }
            RemoteJobStatus::Failed => {
                if status.failure_code.as_deref() == Some(SOURCE_LANGUAGE_MISMATCH) {
                    warn!(epoch = self.epoch, "service reported source language mismatch");
                    self.revert_to_idle(true, cmds);
                    cmds.push(self.notify_error(LANGUAGE_MISMATCH_MESSAGE.to_string()));
                    return;
                }
                let failure = JobFailure {
                    code: status.failure_code,
                    reason: status
                        .failure_reason
                        .filter(|r| !r.is_empty())
                        .unwrap_or_else(|| TRANSLATION_FAILED_MESSAGE.to_string()),
                };
                warn!(epoch = self.epoch, code = ?failure.code, reason = %failure.reason, "job failed");
                self.state.phase = JobPhase::Failed;
                cmds.push(Command::CancelPoll);
                cmds.push(self.notify_job_error(failure));
            }
        }
    }

    fn status_failed(&mut self, error: StatusError, cmds: &mut Vec<Command>) {
        if error.is_transient() {
            debug!(epoch = self.epoch, error = %error, "transient status failure; retrying quietly");
            self.schedule_poll(cmds);
            return;
        }

        warn!(epoch = self.epoch, error = %error, policy = ?self.policy.status_errors, "status check failed");
        match self.policy.status_errors {
            StatusErrorPolicy::HardReset => {
                self.revert_to_idle(true, cmds);
                cmds.push(self.notify_error(STATUS_CHECK_FAILED_MESSAGE.to_string()));
            }
            StatusErrorPolicy::SurfaceOnly => {
                cmds.push(self.notify_error(STATUS_CHECK_FAILED_MESSAGE.to_string()));
                self.schedule_poll(cmds);
            }
        }
    }

    fn complete(&mut self, data: Arc<[u8]>, cmds: &mut Vec<Command>) {
        let handle = self.allocate_handle();
        cmds.push(Command::CreateHandle {
            handle,
            data: data.clone(),
        });
        if let Some(previous) = self.state.result_handle.replace(handle) {
            cmds.push(Command::ReleaseHandle(previous));
        }
        cmds.push(Command::CancelPoll);

        self.state.phase = JobPhase::Completed;
        self.state.progress = 100;
        self.state.playback = PlaybackState::default();
        info!(epoch = self.epoch, %handle, bytes = data.len(), "translation completed");
    }

    fn submit_email(&mut self, cmds: &mut Vec<Command>) {
        let email = self.state.email.address.clone();
        if !is_valid_email(&email) {
            cmds.push(self.notify_job_error(ValidationError::InvalidEmail));
            return;
        }
        let Some(job_id) = self.state.job_id.clone() else {
            cmds.push(self.notify_job_error(ValidationError::NoActiveJob));
            return;
        };
        cmds.push(Command::UpdateEmail {
            epoch: self.epoch,
            job_id,
            email,
        });
    }

    fn cancel(&mut self, cmds: &mut Vec<Command>) {
        if !self.state.is_active() {
            if self.pending_probe.take().is_some() {
                info!("selection dropped while its duration probe was running");
            } else {
                debug!(phase = ?self.state.phase, "cancel ignored outside an active job");
            }
            return;
        }
        info!(epoch = self.epoch, job_id = ?self.state.job_id, "job cancelled");
        self.release_job_resources(cmds);
        self.epoch += 1;

        let email = if self.policy.preserve_email_on_cancel {
            self.state.email.address.clone()
        } else {
            String::new()
        };
        self.state = JobState {
            cancelled: true,
            ..JobState::default()
        };
        self.state.email.address = email;
    }

    fn start_over(&mut self, cmds: &mut Vec<Command>) {
        if !matches!(self.state.phase, JobPhase::Completed | JobPhase::Failed) {
            debug!(phase = ?self.state.phase, "start over ignored before the job settled");
            return;
        }
        cmds.push(Command::PausePlayback);
        self.release_job_resources(cmds);
        self.epoch += 1;
        self.state = JobState::default();
    }

    /// Back to `Idle`, dropping the file and its handles but keeping language and email choices.
    fn revert_to_idle(&mut self, mark_cancelled: bool, cmds: &mut Vec<Command>) {
        self.release_job_resources(cmds);
        self.epoch += 1;
        self.state = JobState {
            source_language: mem::take(&mut self.state.source_language),
            target_language: mem::take(&mut self.state.target_language),
            email: mem::take(&mut self.state.email),
            cancelled: mark_cancelled,
            ..JobState::default()
        };
    }

    fn release_job_resources(&mut self, cmds: &mut Vec<Command>) {
        self.pending_probe = None;
        if self.state.is_active() {
            cmds.push(Command::StopProgressTicker);
            cmds.push(Command::CancelPoll);
        }
        for handle in self.state.handles() {
            cmds.push(Command::ReleaseHandle(handle));
        }
        self.state.source_handle = None;
        self.state.result_handle = None;
    }

    fn schedule_poll(&self, cmds: &mut Vec<Command>) {
        cmds.push(Command::SchedulePoll {
            epoch: self.epoch,
            delay: self.policy.poll_interval,
        });
    }

    fn allocate_handle(&mut self) -> ObjectHandle {
        self.next_handle += 1;
        ObjectHandle(self.next_handle)
    }

    fn notify_job_error(&mut self, error: impl Into<JobError>) -> Command {
        self.notify_error(error.into().to_string())
    }

    fn notify_error(&mut self, message: String) -> Command {
        self.notify(NotificationSeverity::Error, message)
    }

    fn notify_success(&mut self, message: String) -> Command {
        self.notify(NotificationSeverity::Success, message)
    }

    /// Replaces whatever notification is showing.
    fn notify(&mut self, severity: NotificationSeverity, message: String) -> Command {
        self.next_notification += 1;
        let notification = Notification {
            id: self.next_notification,
            message,
            severity,
        };
        self.state.notification = Some(notification.clone());
        Command::Notify(notification)
    }
}

fn side_name(side: LanguageSide) -> &'static str {
    match side {
        LanguageSide::Source => "source",
        LanguageSide::Target => "target",
    }
}

fn track_fields(playback: &mut PlaybackState, track: PlaybackTrack) -> (&mut f64, &mut f64) {
    match track {
        PlaybackTrack::Video => (&mut playback.current_time, &mut playback.duration),
        PlaybackTrack::Source => (
            &mut playback.source_current_time,
            &mut playback.source_duration,
        ),
        PlaybackTrack::Target => (
            &mut playback.target_current_time,
            &mut playback.target_duration,
        ),
    }
}

#[cfg(test)]
#[path = "../tests/reducer_tests.rs"]
mod tests;
