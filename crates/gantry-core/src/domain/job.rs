//! Job entity: identity, state, timestamps and free-form metadata.

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

use super::state::JobState;

/// Well-known metadata keys.
///
/// The metadata bag is deliberately open: backends and workflows store
/// whatever they need, and unknown keys pass through load/save unchanged.
/// The keys below are the ones the core itself reads or writes.
pub mod meta {
    /// Destination/site the job was sent to; recorded per attempt.
    pub const DEST: &str = "dest";
    /// Original external id of a record written in the pre-`WMSID` format.
    pub const LEGACY: &str = "legacy";
    /// Seconds between submission and the last load of the record.
    pub const RUNTIME: &str = "runtime";
}

/// One job's in-memory state.
///
/// A job is identified externally by its integer job number (its index in
/// the store); the number is not stored inside the entity. The entity is
/// mutated in place via [`Job::update`] and [`Job::assign_id`] and persisted
/// only through the owning store's `commit`.
#[derive(Debug, Clone, PartialEq)]
pub struct Job {
    /// Current lifecycle stage.
    pub state: JobState,

    /// Number of (re)submissions; incremented only by [`Job::assign_id`].
    pub attempt: u32,

    /// Scheduler-assigned identifier in canonical `WMSID.<backend>.<rawId>`
    /// form; `None` until first submission.
    pub external_id: Option<String>,

    /// Epoch seconds of the last (re)submission.
    pub submitted: i64,

    /// Epoch seconds of the last state change.
    pub changed: i64,

    /// Destination recorded per attempt, written whenever the state changes
    /// while that attempt is current.
    pub history: BTreeMap<u32, String>,

    /// Open string-to-string attribute bag, see [`meta`].
    pub metadata: HashMap<String, String>,
}

impl Job {
    pub fn new() -> Self {
        Self {
            state: JobState::Init,
            attempt: 0,
            external_id: None,
            submitted: 0,
            changed: 0,
            history: BTreeMap::new(),
            metadata: HashMap::new(),
        }
    }

    /// Enter `state`, stamping the change time and recording the current
    /// destination for the running attempt.
    ///
    /// No transition table is enforced here; callers gate legality with
    /// [`JobClass`](super::JobClass) membership before calling.
    pub fn update(&mut self, state: JobState) {
        self.state = state;
        self.changed = now();
        let dest = self.get_or(meta::DEST, "N/A").to_string();
        self.history.insert(self.attempt, dest);
    }

    /// Record a (re)submission: bump the attempt counter, stamp the
    /// submission time and adopt the scheduler-assigned identifier.
    ///
    /// Any pending legacy-format marker is cleared; from here on the job
    /// persists its identity in canonical form.
    pub fn assign_id(&mut self, external_id: impl Into<String>) {
        self.metadata.remove(meta::LEGACY);
        self.external_id = Some(external_id.into());
        self.attempt += 1;
        self.submitted = now();
    }

    /// Set a metadata attribute.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.metadata.insert(key.into(), value.into());
    }

    /// Look up a metadata attribute.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.metadata.get(key).map(String::as_str)
    }

    /// Look up a metadata attribute, falling back to `default`.
    pub fn get_or<'a>(&'a self, key: &str, default: &'a str) -> &'a str {
        self.get(key).unwrap_or(default)
    }

    /// Condensed view for external reporting.
    pub fn summary(&self) -> JobSummary {
        JobSummary {
            id: self.external_id.clone(),
            status: self.state.name().to_string(),
            attempt: self.attempt,
            submitted: self.submitted,
            changed: self.changed,
        }
    }
}

impl Default for Job {
    fn default() -> Self {
        Self::new()
    }
}

/// Serializable summary of one job, with the status rendered as its
/// canonical name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobSummary {
    pub id: Option<String>,
    pub status: String,
    pub attempt: u32,
    pub submitted: i64,
    pub changed: i64,
}

/// Current time in epoch seconds.
pub(crate) fn now() -> i64 {
    chrono::Utc::now().timestamp()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_job_is_blank() {
        let job = Job::new();
        assert_eq!(job.state, JobState::Init);
        assert_eq!(job.attempt, 0);
        assert_eq!(job.external_id, None);
        assert!(job.history.is_empty());
    }

    #[test]
    fn update_stamps_change_and_history() {
        let mut job = Job::new();
        job.set(meta::DEST, "site-a.example.org/cream-queue");
        job.update(JobState::Running);

        assert_eq!(job.state, JobState::Running);
        assert!(job.changed > 0);
        assert_eq!(
            job.history.get(&0).map(String::as_str),
            Some("site-a.example.org/cream-queue")
        );
    }

    #[test]
    fn update_without_dest_records_placeholder() {
        let mut job = Job::new();
        job.update(JobState::Queued);
        assert_eq!(job.history.get(&0).map(String::as_str), Some("N/A"));
    }

    #[test]
    fn assign_id_bumps_attempt_and_clears_legacy_marker() {
        let mut job = Job::new();
        job.set(meta::LEGACY, "https://old.example/id");

        job.assign_id("WMSID.condor.1234");
        assert_eq!(job.attempt, 1);
        assert_eq!(job.external_id.as_deref(), Some("WMSID.condor.1234"));
        assert!(job.submitted > 0);
        assert_eq!(job.get(meta::LEGACY), None);

        job.assign_id("WMSID.condor.5678");
        assert_eq!(job.attempt, 2);
    }

    #[test]
    fn history_is_kept_per_attempt() {
        let mut job = Job::new();
        job.set(meta::DEST, "first");
        job.update(JobState::Queued);
        job.assign_id("WMSID.condor.1");
        job.set(meta::DEST, "second");
        job.update(JobState::Running);

        assert_eq!(job.history.get(&0).map(String::as_str), Some("first"));
        assert_eq!(job.history.get(&1).map(String::as_str), Some("second"));
    }

    #[test]
    fn summary_renders_status_name() {
        let mut job = Job::new();
        job.update(JobState::Success);
        let summary = job.summary();
        assert_eq!(summary.status, "SUCCESS");
        assert_eq!(summary.attempt, 0);
        assert_eq!(summary.id, None);

        let value = serde_json::to_value(&summary).unwrap();
        assert_eq!(value["status"], "SUCCESS");
    }
}
