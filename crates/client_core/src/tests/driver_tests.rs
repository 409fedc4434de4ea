use super::*;
use std::{
    collections::VecDeque,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Mutex,
    },
};

use async_trait::async_trait;
use shared::{
    domain::JobId,
    protocol::{CreateJobResponse, JobStatusResponse, RemoteJobStatus},
};
use tokio::time::timeout;

use crate::{
    controller::commands::SubmitRequest, error::RemoteError, media::MediaFile,
    probe::FixedDurationProbe,
};

/// Replays scripted answers; an exhausted status script keeps answering `QUEUED`.
struct ScriptedApi {
    create: Mutex<VecDeque<Result<CreateJobResponse, RemoteError>>>,
    create_delay: Duration,
    statuses: Mutex<VecDeque<Result<JobStatusResponse, RemoteError>>>,
    result: Vec<u8>,
    status_calls: AtomicUsize,
    emails: Mutex<Vec<(JobId, String)>>,
}

impl ScriptedApi {
    fn accepting(statuses: Vec<JobStatusResponse>) -> Self {
        Self {
            create: Mutex::new(VecDeque::from([Ok(CreateJobResponse {
                job_id: Some(JobId::from("job-1")),
            })])),
            create_delay: Duration::ZERO,
            statuses: Mutex::new(statuses.into_iter().map(Ok).collect()),
            result: b"dubbed".to_vec(),
            status_calls: AtomicUsize::new(0),
            emails: Mutex::new(Vec::new()),
        }
    }

    fn rejecting(err: RemoteError) -> Self {
        let api = Self::accepting(Vec::new());
        *api.create.lock().expect("lock") = VecDeque::from([Err(err)]);
        api
    }

    fn status_calls(&self) -> usize {
        self.status_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl DubbingApi for ScriptedApi {
    async fn create_job(&self, _request: &SubmitRequest) -> Result<CreateJobResponse, RemoteError> {
        if !self.create_delay.is_zero() {
            sleep(self.create_delay).await;
        }
        let next = self.create.lock().expect("lock").pop_front();
        next.unwrap_or_else(|| Err(RemoteError::Unreachable("no scripted reply".into())))
    }

    async fn job_status(&self, _job_id: &JobId) -> Result<JobStatusResponse, RemoteError> {
        self.status_calls.fetch_add(1, Ordering::SeqCst);
        let next = self.statuses.lock().expect("lock").pop_front();
        next.unwrap_or_else(|| Ok(JobStatusResponse::new(RemoteJobStatus::Queued)))
    }

    async fn update_email(&self, job_id: &JobId, email: &str) -> Result<(), RemoteError> {
        self.emails
            .lock()
            .expect("lock")
            .push((job_id.clone(), email.to_string()));
        Ok(())
    }

    async fn download(&self, url: &str) -> Result<Arc<[u8]>, RemoteError> {
        assert_eq!(url, "https://cdn.test/out.mp3");
        Ok(Arc::from(self.result.clone()))
    }
}

#[derive(Default)]
struct CountingPlayer {
    pauses: AtomicUsize,
}

impl PlaybackControl for CountingPlayer {
    fn pause_all(&self) {
        self.pauses.fetch_add(1, Ordering::SeqCst);
    }
}

fn mp3() -> MediaFile {
    MediaFile::new("interview.mp3", Some("audio/mp3"), vec![7u8; 64])
}

fn driver(api: Arc<ScriptedApi>, clip: Duration) -> JobDriver {
    JobDriver::new(
        ControllerPolicy::default(),
        api,
        Arc::new(FixedDurationProbe(clip)),
    )
}

async fn step_until(driver: &mut JobDriver, done: impl Fn(&JobState) -> bool) {
    timeout(Duration::from_secs(3600), async {
        while !done(driver.state()) {
            assert!(driver.step().await, "event queue closed");
        }
    })
    .await
    .expect("condition reached");
}

#[tokio::test(start_paused = true)]
async fn job_completes_after_polling() {
    let api = Arc::new(ScriptedApi::accepting(vec![
        JobStatusResponse::new(RemoteJobStatus::Queued),
        JobStatusResponse::new(RemoteJobStatus::Processing),
        JobStatusResponse::completed("https://cdn.test/out.mp3"),
    ]));
    let mut driver = driver(api.clone(), Duration::from_secs(30));
    let snapshots = driver.subscribe();

    driver.dispatch(ControllerEvent::FileSelected(mp3()));
    let outcome = driver.run_until_settled().await;

    assert_eq!(
        outcome,
        JobOutcome::Completed {
            file_name: "interview_Spanish - Spain.mp3".into(),
            data: Arc::from(b"dubbed".to_vec()),
        }
    );
    assert_eq!(api.status_calls(), 3);
    assert_eq!(driver.handles().live_count(), 2);
    assert_eq!(snapshots.borrow().phase, JobPhase::Completed);
    assert_eq!(snapshots.borrow().progress, 100);
}

#[tokio::test(start_paused = true)]
async fn long_clip_is_rejected_before_any_request() {
    let api = Arc::new(ScriptedApi::accepting(Vec::new()));
    let mut driver = driver(api.clone(), Duration::from_secs(150));

    driver.dispatch(ControllerEvent::FileSelected(mp3()));
    match driver.run_until_settled().await {
        JobOutcome::Rejected(message) => assert!(message.contains("120 seconds"), "{message}"),
        other => panic!("unexpected outcome: {other:?}"),
    }
    assert_eq!(api.create.lock().expect("lock").len(), 1);
    assert_eq!(driver.handles().live_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn quota_rejection_releases_the_source_handle() {
    let api = Arc::new(ScriptedApi::rejecting(RemoteError::Rejected {
        status: 429,
        body: "user has submitted max free dubs".into(),
    }));
    let mut driver = driver(api, Duration::from_secs(10));

    driver.dispatch(ControllerEvent::FileSelected(mp3()));
    assert_eq!(
        driver.run_until_settled().await,
        JobOutcome::Rejected(
            "Free translation limit reached. Sign Up for Free to Murf Studio.".into()
        )
    );
    assert_eq!(driver.handles().live_count(), 0);
    assert_eq!(driver.handles().released_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn progress_ticks_while_the_upload_is_pending() {
    let mut api = ScriptedApi::accepting(vec![JobStatusResponse::completed(
        "https://cdn.test/out.mp3",
    )]);
    api.create_delay = Duration::from_secs(1);
    let mut driver = driver(Arc::new(api), Duration::from_secs(10));

    driver.dispatch(ControllerEvent::FileSelected(mp3()));
    step_until(&mut driver, |s| s.phase == JobPhase::Uploading).await;
    let mut uploading_progress = 0;
    while driver.state().phase == JobPhase::Uploading {
        uploading_progress = driver.state().progress;
        assert!(driver.step().await);
    }

    assert!(uploading_progress > 0 && uploading_progress < 30, "{uploading_progress}");
    assert_eq!(uploading_progress % 5, 0);
    assert!(matches!(
        driver.run_until_settled().await,
        JobOutcome::Completed { .. }
    ));
}

#[tokio::test(start_paused = true)]
async fn cancel_stops_polling_and_releases_handles() {
    let api = Arc::new(ScriptedApi::accepting(Vec::new()));
    let mut driver = driver(api.clone(), Duration::from_secs(10));
    let events = driver.event_sender();

    driver.dispatch(ControllerEvent::FileSelected(mp3()));
    step_until(&mut driver, |s| s.progress == 60).await;
    assert_eq!(api.status_calls(), 1);

    events.send(ControllerEvent::Cancel).expect("send cancel");
    assert_eq!(driver.run_until_settled().await, JobOutcome::Cancelled);
    assert_eq!(driver.handles().live_count(), 0);
    assert_eq!(driver.handles().released_count(), 1);

    sleep(Duration::from_secs(600)).await;
    assert_eq!(api.status_calls(), 1);
}

#[tokio::test(start_paused = true)]
async fn dropping_the_driver_aborts_pending_polls() {
    let api = Arc::new(ScriptedApi::accepting(Vec::new()));
    let mut driver = driver(api.clone(), Duration::from_secs(10));

    driver.dispatch(ControllerEvent::FileSelected(mp3()));
    step_until(&mut driver, |s| s.progress == 60).await;
    drop(driver);

    sleep(Duration::from_secs(600)).await;
    assert_eq!(api.status_calls(), 1);
}

#[tokio::test(start_paused = true)]
async fn notifications_dismiss_themselves() {
    let api = Arc::new(ScriptedApi::accepting(Vec::new()));
    let mut driver = driver(api, Duration::from_secs(10));

    driver.dispatch(ControllerEvent::FileSelected(MediaFile::new(
        "notes.txt",
        Some("text/plain"),
        vec![1u8],
    )));
    assert!(driver.state().notification.is_some());

    let started = Instant::now();
    step_until(&mut driver, |s| s.notification.is_none()).await;
    assert!(started.elapsed() >= Duration::from_secs(5));
}

#[tokio::test(start_paused = true)]
async fn email_and_start_over_after_completion() {
    let api = Arc::new(ScriptedApi::accepting(vec![JobStatusResponse::completed(
        "https://cdn.test/out.mp3",
    )]));
    let player = Arc::new(CountingPlayer::default());
    let mut driver = JobDriver::from_controller(
        JobController::new(ControllerPolicy::default()),
        api.clone(),
        Arc::new(FixedDurationProbe(Duration::from_secs(5))),
        player.clone(),
    );

    driver.dispatch(ControllerEvent::FileSelected(mp3()));
    assert!(matches!(
        driver.run_until_settled().await,
        JobOutcome::Completed { .. }
    ));

    driver.dispatch(ControllerEvent::EmailEdited("fan@example.com".into()));
    driver.dispatch(ControllerEvent::SubmitEmail);
    step_until(&mut driver, |s| s.email.submitted).await;
    assert_eq!(
        *api.emails.lock().expect("lock"),
        vec![(JobId::from("job-1"), "fan@example.com".to_string())]
    );

    driver.dispatch(ControllerEvent::StartOver);
    assert_eq!(player.pauses.load(Ordering::SeqCst), 1);
    assert_eq!(driver.handles().live_count(), 0);
    assert_eq!(driver.handles().released_count(), 2);
    assert_eq!(driver.state(), &JobState::default());
    assert!(driver.download_target().is_none());
}
