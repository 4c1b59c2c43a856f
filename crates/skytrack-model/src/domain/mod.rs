mod identity;
pub use identity::{JobIdentity, JobLaunchType, escape_component};

mod metadata;
pub use metadata::RemoteJobMetadata;

mod job_spec;
pub use job_spec::JobSpec;

mod task_status;
pub use task_status::TaskStatus;

mod phase;
pub use phase::NormalizedPhase;

mod record;
pub use record::{StatusRecord, TrackerHeartbeat};

mod resource;
pub use resource::JobResource;

pub(crate) mod time_serde;

/// Provisioner-assigned job id.
///
/// Managed launches report `-1`; the managed controller owns the real id.
pub type JobId = i64;

/// Interval or threshold value in milliseconds.
pub type DurationMs = u64;
