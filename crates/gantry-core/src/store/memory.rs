//! In-memory job store.
//!
//! Nothing survives the process; useful for development, dry runs and for
//! exercising selection logic in tests without touching the filesystem.

use std::collections::HashMap;

use crate::domain::Job;
use crate::error::StoreError;
use crate::store::{JobStore, Selector, SelectorFn};

pub struct InMemoryJobStore {
    limit: Option<usize>,
    always_selector: Option<Box<SelectorFn>>,
    jobs: HashMap<usize, Job>,
    placeholder: Job,
}

impl InMemoryJobStore {
    pub fn new(limit: Option<usize>) -> Self {
        Self::with_selector(limit, None)
    }

    pub fn with_selector(limit: Option<usize>, always_selector: Option<Box<SelectorFn>>) -> Self {
        Self {
            limit,
            always_selector,
            jobs: HashMap::new(),
            placeholder: Job::new(),
        }
    }
}

impl JobStore for InMemoryJobStore {
    fn limit(&self) -> Option<usize> {
        self.limit
    }

    fn set_limit(&mut self, limit: Option<usize>) {
        self.limit = limit;
    }

    fn always_selector(&self) -> Option<Selector<'_>> {
        self.always_selector.as_deref()
    }

    fn get_raw(&self, job_num: usize) -> Option<&Job> {
        self.jobs.get(&job_num)
    }

    fn get_transient(&self, job_num: usize) -> &Job {
        self.jobs.get(&job_num).unwrap_or(&self.placeholder)
    }

    fn get_persistent(&self, job_num: usize) -> Job {
        self.jobs.get(&job_num).cloned().unwrap_or_default()
    }

    fn commit(&mut self, job_num: usize, job: Job) -> Result<(), StoreError> {
        self.jobs.insert(job_num, job);
        Ok(())
    }
}
