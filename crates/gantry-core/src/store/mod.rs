//! Job stores: the ownership and persistence contract for job entities.
//!
//! A store owns every [`Job`] of a run, addressed by integer job number in
//! `[0, limit)`. Selection is predicate-based: callers pass a selector (and
//! the store may carry an always-applied one from construction), and the
//! store yields matching job numbers without handing out the entities
//! themselves. Mutation follows a read-modify-commit cycle: take an owned
//! entity via [`JobStore::get_persistent`], change it, hand it back through
//! [`JobStore::commit`].

pub mod format;
pub mod memory;
pub mod text;

pub use memory::InMemoryJobStore;
pub use text::TextFileJobStore;

use crate::domain::{Job, JobClass};
use crate::error::StoreError;

/// Borrowed selection predicate over `(job number, entity)`.
pub type Selector<'a> = &'a dyn Fn(usize, &Job) -> bool;

/// Owned selection predicate, as stored by a store at construction.
pub type SelectorFn = dyn Fn(usize, &Job) -> bool;

/// Selector matching jobs whose state belongs to `class`.
pub fn class_selector(class: JobClass) -> impl Fn(usize, &Job) -> bool {
    move |_, job| class.matches(job)
}

/// Indexed collection of job entities with a commit contract.
pub trait JobStore {
    /// Upper bound (exclusive) on job numbers; `None` while unknown.
    fn limit(&self) -> Option<usize>;

    fn set_limit(&mut self, limit: Option<usize>);

    /// Store-wide predicate ANDed into every selection, if configured.
    fn always_selector(&self) -> Option<Selector<'_>>;

    /// The stored entity, or `None` if nothing was ever committed for
    /// `job_num`.
    fn get_raw(&self, job_num: usize) -> Option<&Job>;

    /// The stored entity, or a shared read-only placeholder. Callers must
    /// not treat the placeholder as this job's state to mutate or persist.
    fn get_transient(&self, job_num: usize) -> &Job;

    /// The stored entity as an independently owned value, or a freshly
    /// constructed blank one, suitable for mutation and a later commit.
    fn get_persistent(&self, job_num: usize) -> Job;

    /// Persist `job` as the durable state for `job_num`. After return, all
    /// getters observe the committed entity.
    fn commit(&mut self, job_num: usize, job: Job) -> Result<(), StoreError>;

    /// Lazily yield the job numbers from `subset` (default: all numbers
    /// below the limit) accepted by both the per-call selector and the
    /// store-wide one.
    fn iter_jobs<'a>(
        &'a self,
        selector: Option<Selector<'a>>,
        subset: Option<&'a [usize]>,
    ) -> Box<dyn Iterator<Item = usize> + 'a> {
        let numbers: Box<dyn Iterator<Item = usize> + 'a> = match subset {
            Some(subset) => Box::new(subset.iter().copied()),
            None => Box::new(0..self.limit().unwrap_or(0)),
        };
        if selector.is_none() && self.always_selector().is_none() {
            return numbers;
        }
        Box::new(numbers.filter(move |&job_num| {
            let job = self.get_transient(job_num);
            selector.is_none_or(|select| select(job_num, job))
                && self
                    .always_selector()
                    .is_none_or(|select| select(job_num, job))
        }))
    }

    /// Materialised variant of [`JobStore::iter_jobs`].
    fn get_jobs(&self, selector: Option<Selector<'_>>, subset: Option<&[usize]>) -> Vec<usize> {
        self.iter_jobs(selector, subset).collect()
    }

    /// Count matching job numbers. Without any predicate this is O(1).
    fn count_jobs(&self, selector: Option<Selector<'_>>, subset: Option<&[usize]>) -> usize {
        if selector.is_none() && self.always_selector().is_none() {
            return match subset {
                Some(subset) => subset.len(),
                None => self.limit().unwrap_or(0),
            };
        }
        self.iter_jobs(selector, subset).count()
    }

    /// The current limit, with unknown rendered as 0.
    fn len(&self) -> usize {
        self.limit().unwrap_or(0)
    }

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
