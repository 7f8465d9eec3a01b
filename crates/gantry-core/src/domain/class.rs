//! Named, reusable sets of job states.
//!
//! Selection logic (resubmission, cancellation, reporting) never matches on
//! individual states; it asks whether a job's state belongs to one of the
//! constant classes below. Classes are plain bitmasks over state ordinals,
//! built once at compile time and composable by union.

use super::state::JobState;
use super::Job;

/// An immutable set of [`JobState`] values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JobClass {
    mask: u16,
}

impl JobClass {
    /// Jobs the remote scheduler knows about but has not started running.
    pub const AT_SCHEDULER: JobClass = JobClass::of(&[
        JobState::Submitted,
        JobState::Waiting,
        JobState::Ready,
        JobState::Queued,
        JobState::Unknown,
    ]);

    /// Jobs the remote side is still working on.
    pub const PROCESSING: JobClass =
        JobClass::AT_SCHEDULER.union(JobClass::of(&[JobState::Running]));

    /// Jobs with an outstanding cancellation request.
    pub const CANCEL_REQUESTED: JobClass = JobClass::of(&[JobState::Cancel]);

    /// Jobs whose output is ready for retrieval.
    pub const DONE: JobClass = JobClass::of(&[JobState::Done]);

    /// Jobs excluded from further processing by the operator.
    pub const DISABLED: JobClass = JobClass::of(&[JobState::Disabled]);

    /// Jobs for which nothing further will ever happen.
    pub const END_STATE: JobClass = JobClass::SUCCESS.union(JobClass::DISABLED);

    /// Jobs that reached a terminal state, successful or not.
    pub const PROCESSED: JobClass = JobClass::of(&[
        JobState::Success,
        JobState::Failed,
        JobState::Cancelled,
        JobState::Aborted,
    ]);

    /// Jobs eligible for (re)submission.
    pub const RESUBMIT_READY: JobClass = JobClass::of(&[
        JobState::Init,
        JobState::Failed,
        JobState::Aborted,
        JobState::Cancelled,
    ]);

    /// Successfully finished jobs.
    pub const SUCCESS: JobClass = JobClass::of(&[JobState::Success]);

    /// Build a class from a slice of states.
    pub const fn of(states: &[JobState]) -> JobClass {
        let mut mask = 0u16;
        let mut i = 0;
        while i < states.len() {
            mask |= 1 << states[i].ordinal();
            i += 1;
        }
        JobClass { mask }
    }

    /// Combine two classes.
    pub const fn union(self, other: JobClass) -> JobClass {
        JobClass {
            mask: self.mask | other.mask,
        }
    }

    /// Membership test.
    pub const fn contains(self, state: JobState) -> bool {
        self.mask & (1 << state.ordinal()) != 0
    }

    /// Whether the given job's current state belongs to this class.
    pub fn matches(self, job: &Job) -> bool {
        self.contains(job.state)
    }

    /// The member states, in ordinal order.
    pub fn states(self) -> impl Iterator<Item = JobState> {
        JobState::ALL.into_iter().filter(move |s| self.contains(*s))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case::submitted(JobState::Submitted, true)]
    #[case::queued(JobState::Queued, true)]
    #[case::unknown(JobState::Unknown, true)]
    #[case::running(JobState::Running, false)]
    #[case::init(JobState::Init, false)]
    fn at_scheduler_membership(#[case] state: JobState, #[case] expected: bool) {
        assert_eq!(JobClass::AT_SCHEDULER.contains(state), expected);
    }

    #[test]
    fn processing_is_at_scheduler_plus_running() {
        assert!(JobClass::PROCESSING.contains(JobState::Running));
        for state in JobClass::AT_SCHEDULER.states() {
            assert!(JobClass::PROCESSING.contains(state));
        }
        assert!(!JobClass::PROCESSING.contains(JobState::Done));
    }

    #[test]
    fn end_state_is_success_or_disabled() {
        let members: Vec<_> = JobClass::END_STATE.states().collect();
        assert_eq!(members, vec![JobState::Disabled, JobState::Success]);
    }

    #[test]
    fn resubmit_ready_covers_terminal_failures() {
        for state in [
            JobState::Init,
            JobState::Failed,
            JobState::Aborted,
            JobState::Cancelled,
        ] {
            assert!(JobClass::RESUBMIT_READY.contains(state));
        }
        assert!(!JobClass::RESUBMIT_READY.contains(JobState::Success));
    }

    #[test]
    fn matches_tests_the_job_state() {
        let mut job = Job::new();
        assert!(JobClass::RESUBMIT_READY.matches(&job));
        job.update(JobState::Queued);
        assert!(JobClass::AT_SCHEDULER.matches(&job));
        assert!(!JobClass::RESUBMIT_READY.matches(&job));
    }
}
