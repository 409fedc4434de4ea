//! Executes controller commands on the tokio runtime and feeds their completions back.
//!
//! The driver is the single writer of job state: network calls, probes and timers run as
//! tasks that only send events into the driver's queue.

use std::{sync::Arc, time::Duration};

use tokio::{
    sync::{mpsc, watch},
    task::JoinHandle,
    time::{interval_at, sleep, Instant},
};
use tracing::{debug, error, info, warn};

use crate::{
    api::DubbingApi,
    controller::{
        commands::Command,
        events::{ControllerEvent, SubmitFailure},
        reducer::JobController,
        state::{JobPhase, JobState, NotificationSeverity},
    },
    handles::HandleRegistry,
    policy::ControllerPolicy,
    probe::DurationProbe,
};

/// Whatever renders the player; the driver only ever asks it to stop.
pub trait PlaybackControl: Send + Sync {
    fn pause_all(&self);
}

pub struct NoPlayback;

impl PlaybackControl for NoPlayback {
    fn pause_all(&self) {}
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobOutcome {
    Completed { file_name: String, data: Arc<[u8]> },
    Failed(String),
    /// Dropped back to `Idle` with an error shown (validation, submission or status failure).
    Rejected(String),
    Cancelled,
    Idle,
}

pub struct JobDriver {
    controller: JobController,
    api: Arc<dyn DubbingApi>,
    probe: Arc<dyn DurationProbe>,
    player: Arc<dyn PlaybackControl>,
    handles: HandleRegistry,
    events_tx: mpsc::UnboundedSender<ControllerEvent>,
    events_rx: mpsc::UnboundedReceiver<ControllerEvent>,
    snapshots: watch::Sender<JobState>,
    poll_timer: Option<JoinHandle<()>>,
    ticker: Option<JoinHandle<()>>,
    dismiss_timer: Option<JoinHandle<()>>,
    in_flight: Vec<JoinHandle<()>>,
}

impl JobDriver {
    pub fn new(
        policy: ControllerPolicy,
        api: Arc<dyn DubbingApi>,
        probe: Arc<dyn DurationProbe>,
    ) -> Self {
        Self::from_controller(JobController::new(policy), api, probe, Arc::new(NoPlayback))
    }

    pub fn from_controller(
        controller: JobController,
        api: Arc<dyn DubbingApi>,
        probe: Arc<dyn DurationProbe>,
        player: Arc<dyn PlaybackControl>,
    ) -> Self {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let (snapshots, _) = watch::channel(controller.state().clone());
        Self {
            controller,
            api,
            probe,
            player,
            handles: HandleRegistry::new(),
            events_tx,
            events_rx,
            snapshots,
            poll_timer: None,
            ticker: None,
            dismiss_timer: None,
            in_flight: Vec::new(),
        }
    }

    pub fn state(&self) -> &JobState {
        self.controller.state()
    }

    pub fn controller(&self) -> &JobController {
        &self.controller
    }

    pub fn handles(&self) -> &HandleRegistry {
        &self.handles
    }

    /// Latest state after every processed event; a new value replaces the previous one.
    pub fn subscribe(&self) -> watch::Receiver<JobState> {
        self.snapshots.subscribe()
    }

    /// Queue for user actions coming from outside the driver loop (UI, signal handlers).
    pub fn event_sender(&self) -> mpsc::UnboundedSender<ControllerEvent> {
        self.events_tx.clone()
    }

    /// Bytes and file name of the translated result, once completed.
    pub fn download_target(&self) -> Option<(Arc<[u8]>, String)> {
        let (handle, file_name) = self.controller.download_target()?;
        Some((self.handles.get(handle)?, file_name))
    }

    pub fn dispatch(&mut self, event: ControllerEvent) {
        debug!(event = event.name(), "controller event");
        let commands = self.controller.handle(event);
        for command in commands {
            self.execute(command);
        }
        self.snapshots.send_replace(self.controller.state().clone());
    }

    /// Waits for the next queued event and processes it. Returns false once the queue is closed.
    pub async fn step(&mut self) -> bool {
        match self.events_rx.recv().await {
            Some(event) => {
                self.dispatch(event);
                true
            }
            None => false,
        }
    }

    /// Processes queued events until no job is in flight.
    pub async fn run_until_settled(&mut self) -> JobOutcome {
        while !self.controller.is_settled() {
            if !self.step().await {
                break;
            }
        }
        self.outcome()
    }

    pub fn outcome(&self) -> JobOutcome {
        let state = self.controller.state();
        let error_message = state
            .notification
            .as_ref()
            .filter(|n| n.severity == NotificationSeverity::Error)
            .map(|n| n.message.clone());
        match state.phase {
            JobPhase::Completed => match self.download_target() {
                Some((data, file_name)) => JobOutcome::Completed { file_name, data },
                None => JobOutcome::Failed("completed job lost its result handle".to_string()),
            },
            JobPhase::Failed => JobOutcome::Failed(error_message.unwrap_or_default()),
            JobPhase::Idle => match error_message {
                Some(message) => JobOutcome::Rejected(message),
                None if state.cancelled => JobOutcome::Cancelled,
                None => JobOutcome::Idle,
            },
            JobPhase::Uploading | JobPhase::Processing => JobOutcome::Idle,
        }
    }

    fn execute(&mut self, command: Command) {
        debug!(command = command.name(), "executing command");
        match command {
            Command::ProbeDuration { probe, file } => {
                let prober = Arc::clone(&self.probe);
                self.spawn_task(move |tx| async move {
                    let name = file.name.clone();
                    let duration = match tokio::task::spawn_blocking(move || prober.probe(&file)).await {
                        Ok(Ok(duration)) => Some(duration),
                        Ok(Err(err)) => {
                            warn!(file = %name, error = %err, "duration probe failed; treating clip as zero length");
                            None
                        }
                        Err(err) => {
                            error!(file = %name, error = %err, "duration probe task panicked");
                            None
                        }
                    };
                    let _ = tx.send(ControllerEvent::DurationProbed { probe, duration });
                });
            }
            Command::SubmitJob { epoch, request } => {
                let api = Arc::clone(&self.api);
                self.spawn_task(move |tx| async move {
                    let result = api
                        .create_job(&request)
                        .await
                        .map_err(SubmitFailure::from);
                    let _ = tx.send(ControllerEvent::SubmitResolved { epoch, result });
                });
            }
            Command::StartProgressTicker { epoch, interval } => {
                abort(self.ticker.take());
                let tx = self.events_tx.clone();
                self.ticker = Some(tokio::spawn(async move {
                    let mut ticks = interval_at(Instant::now() + interval, interval);
                    loop {
                        ticks.tick().await;
                        if tx.send(ControllerEvent::ProgressTick { epoch }).is_err() {
                            break;
                        }
                    }
                }));
            }
            Command::StopProgressTicker => abort(self.ticker.take()),
            Command::FetchStatus { epoch, job_id } => {
                let api = Arc::clone(&self.api);
                self.spawn_task(move |tx| async move {
                    let result = api.job_status(&job_id).await;
                    let _ = tx.send(ControllerEvent::StatusResolved { epoch, result });
                });
            }
            Command::SchedulePoll { epoch, delay } => {
                abort(self.poll_timer.take());
                self.poll_timer = Some(self.after(delay, ControllerEvent::PollDue { epoch }));
            }
            Command::CancelPoll => abort(self.poll_timer.take()),
            Command::DownloadResult { epoch, url } => {
                let api = Arc::clone(&self.api);
                self.spawn_task(move |tx| async move {
                    let result = api.download(&url).await;
                    let _ = tx.send(ControllerEvent::ResultDownloaded { epoch, result });
                });
            }
            Command::CreateHandle { handle, data } => self.handles.insert(handle, data),
            Command::ReleaseHandle(handle) => {
                self.handles.release(handle);
            }
            Command::UpdateEmail {
                epoch,
                job_id,
                email,
            } => {
                let api = Arc::clone(&self.api);
                self.spawn_task(move |tx| async move {
                    let result = api.update_email(&job_id, &email).await;
                    let _ = tx.send(ControllerEvent::EmailResolved {
                        epoch,
                        email,
                        result,
                    });
                });
            }
            Command::PausePlayback => self.player.pause_all(),
            Command::Notify(notification) => {
                match notification.severity {
                    NotificationSeverity::Error => {
                        warn!(id = notification.id, message = %notification.message, "notification")
                    }
                    NotificationSeverity::Success => {
                        info!(id = notification.id, message = %notification.message, "notification")
                    }
                }
                abort(self.dismiss_timer.take());
                let ttl = self.controller.policy().notification_ttl;
                self.dismiss_timer = Some(self.after(
                    ttl,
                    ControllerEvent::DismissNotification {
                        id: notification.id,
                    },
                ));
            }
        }
    }

    fn spawn_task<F, Fut>(&mut self, task: F)
    where
        F: FnOnce(mpsc::UnboundedSender<ControllerEvent>) -> Fut,
        Fut: std::future::Future<Output = ()> + Send + 'static,
    {
        self.in_flight.retain(|handle| !handle.is_finished());
        self.in_flight.push(tokio::spawn(task(self.events_tx.clone())));
    }

    fn after(&self, delay: Duration, event: ControllerEvent) -> JoinHandle<()> {
        let tx = self.events_tx.clone();
        tokio::spawn(async move {
            sleep(delay).await;
            let _ = tx.send(event);
        })
    }
}

impl Drop for JobDriver {
    fn drop(&mut self) {
        abort(self.poll_timer.take());
        abort(self.ticker.take());
        abort(self.dismiss_timer.take());
        for task in self.in_flight.drain(..) {
            task.abort();
        }
    }
}

fn abort(handle: Option<JoinHandle<()>>) {
    if let Some(handle) = handle {
        handle.abort();
    }
}

#[cfg(test)]
#[path = "tests/driver_tests.rs"]
mod tests;
