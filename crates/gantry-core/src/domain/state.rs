//! Job lifecycle states.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Lifecycle state of a job, as reported by (or inferred from) the remote
/// scheduler.
///
/// The enumeration is closed: every state a backend can report maps onto one
/// of these variants, and the canonical names below are the on-disk and
/// on-wire representation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JobState {
    Init,
    Submitted,
    Disabled,
    Ready,
    Waiting,
    Queued,
    Aborted,
    Running,
    /// Cancellation has been requested but not yet confirmed by the backend.
    Cancel,
    Unknown,
    Cancelled,
    /// The backend reports the job finished; the output has not been
    /// retrieved and judged yet.
    Done,
    Failed,
    Success,
}

impl JobState {
    /// All states, in ordinal order.
    pub const ALL: [JobState; 14] = [
        JobState::Init,
        JobState::Submitted,
        JobState::Disabled,
        JobState::Ready,
        JobState::Waiting,
        JobState::Queued,
        JobState::Aborted,
        JobState::Running,
        JobState::Cancel,
        JobState::Unknown,
        JobState::Cancelled,
        JobState::Done,
        JobState::Failed,
        JobState::Success,
    ];

    /// Canonical upper-case name, used in job records and reports.
    pub fn name(self) -> &'static str {
        match self {
            JobState::Init => "INIT",
            JobState::Submitted => "SUBMITTED",
            JobState::Disabled => "DISABLED",
            JobState::Ready => "READY",
            JobState::Waiting => "WAITING",
            JobState::Queued => "QUEUED",
            JobState::Aborted => "ABORTED",
            JobState::Running => "RUNNING",
            JobState::Cancel => "CANCEL",
            JobState::Unknown => "UNKNOWN",
            JobState::Cancelled => "CANCELLED",
            JobState::Done => "DONE",
            JobState::Failed => "FAILED",
            JobState::Success => "SUCCESS",
        }
    }

    /// Reverse lookup of [`JobState::name`].
    pub fn from_name(name: &str) -> Option<JobState> {
        match name {
            "INIT" => Some(JobState::Init),
            "SUBMITTED" => Some(JobState::Submitted),
            "DISABLED" => Some(JobState::Disabled),
            "READY" => Some(JobState::Ready),
            "WAITING" => Some(JobState::Waiting),
            "QUEUED" => Some(JobState::Queued),
            "ABORTED" => Some(JobState::Aborted),
            "RUNNING" => Some(JobState::Running),
            "CANCEL" => Some(JobState::Cancel),
            "UNKNOWN" => Some(JobState::Unknown),
            "CANCELLED" => Some(JobState::Cancelled),
            "DONE" => Some(JobState::Done),
            "FAILED" => Some(JobState::Failed),
            "SUCCESS" => Some(JobState::Success),
            _ => None,
        }
    }

    /// Position in [`JobState::ALL`]; also the bit used by
    /// [`JobClass`](super::JobClass).
    pub const fn ordinal(self) -> usize {
        self as usize
    }
}

impl fmt::Display for JobState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
