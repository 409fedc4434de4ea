pub mod api;
pub mod controller;
pub mod driver;
pub mod error;
pub mod handles;
pub mod media;
pub mod policy;
pub mod probe;

pub use api::{DubbingApi, HttpDubbingApi};
pub use controller::{
    commands::{Command, SubmitRequest},
    events::{ControllerEvent, Epoch, SubmitFailure},
    reducer::JobController,
    state::{JobPhase, JobState, Notification, NotificationSeverity, PlaybackTrack},
};
pub use driver::{JobDriver, JobOutcome, NoPlayback, PlaybackControl};
pub use error::{JobError, RemoteError, ValidationError};
pub use handles::{HandleRegistry, ObjectHandle};
pub use media::MediaFile;
pub use policy::{ControllerPolicy, LanguageCollision, StatusErrorPolicy};
pub use probe::{DurationProbe, FixedDurationProbe, SymphoniaProbe};
