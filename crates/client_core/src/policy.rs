use std::time::Duration;

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(60);
pub const DEFAULT_MAX_DURATION: Duration = Duration::from_secs(120);
pub const DEFAULT_TICK_INTERVAL: Duration = Duration::from_millis(300);
pub const DEFAULT_NOTIFICATION_TTL: Duration = Duration::from_secs(5);

/// What an explicit (non-transient) status-check failure does to the job.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusErrorPolicy {
    /// Notify, drop the job and set the cancellation flag.
    HardReset,
    /// Notify and keep polling.
    SurfaceOnly,
}

/// How an identical source/target pair is prevented.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LanguageCollision {
    AutoAdvance,
    Reject,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ControllerPolicy {
    pub status_errors: StatusErrorPolicy,
    pub language_collision: LanguageCollision,
    pub preserve_email_on_cancel: bool,
    /// `None` disables duration probing.
    pub max_duration: Option<Duration>,
    pub poll_interval: Duration,
    pub tick_interval: Duration,
    pub tick_step: u8,
    pub tick_cap: u8,
    pub accepted_progress: u8,
    pub notification_ttl: Duration,
}

impl Default for ControllerPolicy {
    fn default() -> Self {
        Self {
            status_errors: StatusErrorPolicy::HardReset,
            language_collision: LanguageCollision::AutoAdvance,
            preserve_email_on_cancel: true,
            max_duration: Some(DEFAULT_MAX_DURATION),
            poll_interval: DEFAULT_POLL_INTERVAL,
            tick_interval: DEFAULT_TICK_INTERVAL,
            tick_step: 5,
            tick_cap: 95,
            accepted_progress: 30,
            notification_ttl: DEFAULT_NOTIFICATION_TTL,
        }
    }
}

impl ControllerPolicy {
    /// The lighter widget flavour: no duration probe, soft status errors, explicit collision rejection.
    pub fn lenient() -> Self {
        Self {
            status_errors: StatusErrorPolicy::SurfaceOnly,
            language_collision: LanguageCollision::Reject,
            preserve_email_on_cancel: false,
            max_duration: None,
            ..Self::default()
        }
    }
}
