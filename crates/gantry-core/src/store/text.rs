//! Durable text-file job store: one flat record file per job number.
//!
//! The on-disk layout is `<work dir>/jobs/job_<N>.txt`, each file holding one
//! escaped key/value record (see [`format`]). Keeping every job in its own
//! small file is the store's main robustness property: a crash mid-commit can
//! only affect the single file being replaced, and the replace itself is
//! atomic. Records written by much older versions of the system (pre-`WMSID`
//! identifiers) are migrated transparently on load and round-trip back to
//! their original external representation on save.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use crate::domain::job::now;
use crate::domain::{meta, Job, JobState};
use crate::error::StoreError;
use crate::store::{format, JobStore, Selector, SelectorFn};

const JOB_DIR: &str = "jobs";
const FILE_PREFIX: &str = "job_";
const FILE_SUFFIX: &str = ".txt";

pub struct TextFileJobStore {
    work_path: PathBuf,
    db_path: PathBuf,
    limit: Option<usize>,
    always_selector: Option<Box<SelectorFn>>,
    jobs: HashMap<usize, Job>,
    placeholder: Job,
}

impl std::fmt::Debug for TextFileJobStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TextFileJobStore")
            .field("work_path", &self.work_path)
            .field("db_path", &self.db_path)
            .field("limit", &self.limit)
            .field(
                "always_selector",
                &self.always_selector.as_ref().map(|_| "<selector>"),
            )
            .field("jobs", &self.jobs)
            .field("placeholder", &self.placeholder)
            .finish()
    }
}

impl TextFileJobStore {
    /// Open (creating if necessary) the job database under
    /// `<work_path>/jobs` and load every record up to `limit`.
    ///
    /// With `limit == None` the limit is derived from the highest job number
    /// on disk (+ 1), or stays unknown for an empty directory.
    pub fn open(work_path: impl AsRef<Path>, limit: Option<usize>) -> Result<Self, StoreError> {
        Self::open_with_selector(work_path, limit, None)
    }

    /// Like [`TextFileJobStore::open`], with a store-wide selector that is
    /// ANDed into every selection.
    pub fn open_with_selector(
        work_path: impl AsRef<Path>,
        limit: Option<usize>,
        always_selector: Option<Box<SelectorFn>>,
    ) -> Result<Self, StoreError> {
        let work_path = work_path.as_ref().to_path_buf();
        let db_path = work_path.join(JOB_DIR);
        if !db_path.exists() {
            fs::create_dir_all(&db_path).map_err(|source| StoreError::Workdir {
                path: db_path.clone(),
                source,
            })?;
        }
        let jobs = read_jobs(&db_path, limit)?;
        let limit = limit.or_else(|| jobs.keys().max().map(|max| max + 1));
        Ok(Self {
            work_path,
            db_path,
            limit,
            always_selector,
            jobs,
            placeholder: Job::new(),
        })
    }

    /// The work directory this store lives under.
    pub fn work_path(&self) -> &Path {
        &self.work_path
    }

    fn job_path(&self, job_num: usize) -> PathBuf {
        self.db_path.join(format!("{FILE_PREFIX}{job_num}{FILE_SUFFIX}"))
    }
}

impl JobStore for TextFileJobStore {
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
        let path = self.job_path(job_num);
        let tmp_path = path.with_extension("txt.tmp");
        let record = serialize_job(&job);
        let content = format::format_escaped(record.iter().map(|(k, v)| (k.as_str(), v.as_str())));
        fs::write(&tmp_path, content).map_err(|source| StoreError::Write {
            path: tmp_path.clone(),
            source,
        })?;
        // Replace, never truncate-and-rewrite: a concurrent reader observes
        // either the old record or the new one, nothing in between.
        fs::rename(&tmp_path, &path).map_err(|source| StoreError::Write { path, source })?;
        self.jobs.insert(job_num, job);
        Ok(())
    }
}

fn read_jobs(db_path: &Path, limit: Option<usize>) -> Result<HashMap<usize, Job>, StoreError> {
    let workdir_error = |source| StoreError::Workdir {
        path: db_path.to_path_buf(),
        source,
    };
    let mut candidates: Vec<(usize, PathBuf)> = Vec::new();
    for entry in fs::read_dir(db_path).map_err(workdir_error)? {
        let entry = entry.map_err(workdir_error)?;
        let name = entry.file_name();
        let Some(name) = name.to_str() else { continue };
        let parsed = name
            .strip_prefix(FILE_PREFIX)
            .and_then(|rest| rest.strip_suffix(FILE_SUFFIX))
            .and_then(|num| num.parse::<usize>().ok());
        if let Some(job_num) = parsed {
            candidates.push((job_num, entry.path()));
        }
    }
    candidates.sort();

    let total = candidates.len();
    let mut jobs = HashMap::new();
    for (idx, (job_num, path)) in candidates.into_iter().enumerate() {
        if let Some(limit) = limit
            && job_num >= limit
        {
            log::info!(
                "stopped reading job records at job #{job_num} out of {total} available job files"
            );
            break;
        }
        jobs.insert(job_num, load_job(&path)?);
        if (idx + 1) % 100 == 0 {
            log::info!("reading job records ... {} [{}%]", idx + 1, (idx + 1) * 100 / total);
        }
    }
    Ok(jobs)
}

fn load_job(path: &Path) -> Result<Job, StoreError> {
    let content = fs::read_to_string(path).map_err(|source| StoreError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let pairs = format::parse_escaped(&content).map_err(|err| StoreError::Format {
        path: path.to_path_buf(),
        reason: err.to_string(),
    })?;
    reconstruct_job(path, pairs)
}

fn parse_error(path: &Path, reason: impl Into<String>) -> StoreError {
    StoreError::Parse {
        path: path.to_path_buf(),
        reason: reason.into(),
    }
}

/// Rebuild a [`Job`] from a parsed record.
///
/// Structural keys (`status`, `id`, `attempt`, `submitted`, `changed`,
/// `history_<n>`) move into the entity's own fields; whatever remains is the
/// metadata bag, passed through verbatim.
fn reconstruct_job(path: &Path, pairs: Vec<(String, String)>) -> Result<Job, StoreError> {
    let mut data: HashMap<String, String> = pairs.into_iter().collect();
    let mut job = Job::new();

    // Records with an unrecognized (or missing) status are treated as
    // failed so the orchestration loop resubmits rather than stalls.
    job.state = data
        .remove("status")
        .and_then(|name| JobState::from_name(name.trim()))
        .unwrap_or(JobState::Failed);

    if let Some(id) = data.remove("id") {
        let id = if id.starts_with("WMSID") {
            id
        } else {
            // Pre-WMSID record: remember the original spelling and rewrite
            // the identifier into canonical form.
            data.insert(meta::LEGACY.to_string(), id.clone());
            if id.starts_with("https") {
                format!("WMSID.GLITEWMS.{id}")
            } else {
                let (raw_id, backend) = id.split_once('.').ok_or_else(|| {
                    parse_error(path, format!("unrecognized job identifier {id:?}"))
                })?;
                format!("WMSID.{backend}.{raw_id}")
            }
        };
        job.external_id = Some(id);
    }

    if let Some(value) = data.remove("attempt") {
        job.attempt = value
            .trim()
            .parse()
            .map_err(|_| parse_error(path, format!("invalid attempt count {value:?}")))?;
    }
    let mut had_submitted = false;
    if let Some(value) = data.remove("submitted") {
        had_submitted = true;
        job.submitted = parse_timestamp(&value)
            .ok_or_else(|| parse_error(path, format!("invalid submission time {value:?}")))?;
    }
    if let Some(value) = data.remove("changed") {
        job.changed = parse_timestamp(&value)
            .ok_or_else(|| parse_error(path, format!("invalid change time {value:?}")))?;
    }

    if !data.contains_key(meta::RUNTIME) {
        let runtime = if had_submitted { now() - job.submitted } else { 0 };
        data.insert(meta::RUNTIME.to_string(), runtime.to_string());
    }

    let history_keys: Vec<String> = data
        .keys()
        .filter(|key| key.starts_with("history_"))
        .cloned()
        .collect();
    for key in history_keys {
        // Keys with a non-numeric suffix stay in the metadata bag.
        if let Ok(attempt) = key["history_".len()..].parse::<u32>()
            && let Some(dest) = data.remove(&key)
        {
            job.history.insert(attempt, dest);
        }
    }

    job.metadata = data;
    Ok(job)
}

/// Flatten a [`Job`] into record pairs.
///
/// A job that still carries a legacy identity marker writes the original
/// (unmigrated) identifier back out, so old records round-trip to their
/// original external representation; the marker itself never reaches disk.
fn serialize_job(job: &Job) -> Vec<(String, String)> {
    let mut record: Vec<(String, String)> = vec![
        ("status".to_string(), job.state.name().to_string()),
        ("attempt".to_string(), job.attempt.to_string()),
        ("submitted".to_string(), job.submitted.to_string()),
        ("changed".to_string(), job.changed.to_string()),
    ];
    for (attempt, dest) in &job.history {
        record.push((format!("history_{attempt}"), dest.clone()));
    }
    if let Some(external_id) = &job.external_id {
        let id = job.get(meta::LEGACY).unwrap_or(external_id);
        record.push(("id".to_string(), id.to_string()));
    }
    let mut metadata: Vec<_> = job
        .metadata
        .iter()
        .filter(|(key, _)| key.as_str() != meta::LEGACY)
        .collect();
    metadata.sort();
    for (key, value) in metadata {
        record.push((key.clone(), value.clone()));
    }
    record
}

fn parse_timestamp(value: &str) -> Option<i64> {
    let value = value.trim();
    value
        .parse::<i64>()
        .ok()
        .or_else(|| value.parse::<f64>().ok().map(|seconds| seconds as i64))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::JobClass;
    use crate::store::class_selector;
    use tempfile::tempdir;

    fn write_record(work: &Path, job_num: usize, lines: &str) {
        let dir = work.join(JOB_DIR);
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join(format!("job_{job_num}.txt")), lines).unwrap();
    }

    fn record_map(work: &Path, job_num: usize) -> HashMap<String, String> {
        let content =
            fs::read_to_string(work.join(JOB_DIR).join(format!("job_{job_num}.txt"))).unwrap();
        format::parse_escaped(&content).unwrap().into_iter().collect()
    }

    #[test]
    fn open_creates_the_job_directory() {
        let work = tempdir().unwrap();
        let store = TextFileJobStore::open(work.path(), None).unwrap();
        assert!(work.path().join(JOB_DIR).is_dir());
        assert_eq!(store.limit(), None);
        assert_eq!(store.work_path(), work.path());
    }

    #[test]
    fn commit_then_reopen_round_trips() {
        let work = tempdir().unwrap();
        let mut store = TextFileJobStore::open(work.path(), None).unwrap();

        let mut job = store.get_persistent(7);
        job.assign_id("WMSID.condor.4242");
        job.set(meta::DEST, "site-a/long queue");
        job.set(meta::RUNTIME, "17");
        job.set("vo", "cms");
        job.set("note", "quoted \"value\"\nsecond line");
        job.update(JobState::Running);
        store.commit(7, job.clone()).unwrap();

        let reopened = TextFileJobStore::open(work.path(), None).unwrap();
        assert_eq!(reopened.limit(), Some(8));
        assert_eq!(reopened.get_raw(7), Some(&job));
    }

    #[test]
    fn legacy_https_identifier_is_migrated_and_round_trips_verbatim() {
        let work = tempdir().unwrap();
        write_record(
            work.path(),
            0,
            "status = RUNNING\nattempt = 1\nid = https://x/y\n",
        );

        let mut store = TextFileJobStore::open(work.path(), None).unwrap();
        let job = store.get_persistent(0);
        assert_eq!(job.external_id.as_deref(), Some("WMSID.GLITEWMS.https://x/y"));
        assert_eq!(job.get(meta::LEGACY), Some("https://x/y"));

        store.commit(0, job).unwrap();
        let record = record_map(work.path(), 0);
        assert_eq!(record.get("id").map(String::as_str), Some("https://x/y"));
        assert!(!record.contains_key("legacy"));
    }

    #[test]
    fn legacy_dotted_identifier_is_migrated() {
        let work = tempdir().unwrap();
        write_record(work.path(), 0, "status = QUEUED\nid = 1234.condor\n");

        let store = TextFileJobStore::open(work.path(), None).unwrap();
        let job = store.get_raw(0).unwrap();
        assert_eq!(job.external_id.as_deref(), Some("WMSID.condor.1234"));
        assert_eq!(job.get(meta::LEGACY), Some("1234.condor"));
    }

    #[test]
    fn canonical_identifier_passes_through() {
        let work = tempdir().unwrap();
        write_record(work.path(), 3, "status = DONE\nid = WMSID.condor.123\n");

        let mut store = TextFileJobStore::open(work.path(), None).unwrap();
        let job = store.get_persistent(3);
        assert_eq!(job.external_id.as_deref(), Some("WMSID.condor.123"));
        assert_eq!(job.get(meta::LEGACY), None);

        store.commit(3, job).unwrap();
        let record = record_map(work.path(), 3);
        assert_eq!(
            record.get("id").map(String::as_str),
            Some("WMSID.condor.123")
        );
    }

    #[test]
    fn malformed_legacy_identifier_fails_the_load() {
        let work = tempdir().unwrap();
        write_record(work.path(), 0, "status = DONE\nid = no-separator\n");

        let err = TextFileJobStore::open(work.path(), None).unwrap_err();
        assert!(matches!(err, StoreError::Parse { .. }));
    }

    #[test]
    fn unknown_status_reconstructs_as_failed() {
        let work = tempdir().unwrap();
        write_record(work.path(), 0, "status = EVAPORATED\n");

        let store = TextFileJobStore::open(work.path(), None).unwrap();
        assert_eq!(store.get_raw(0).unwrap().state, JobState::Failed);
    }

    #[test]
    fn runtime_is_derived_when_absent() {
        let work = tempdir().unwrap();
        let submitted = now() - 100;
        write_record(
            work.path(),
            0,
            &format!("status = RUNNING\nsubmitted = {submitted}\n"),
        );
        let store = TextFileJobStore::open(work.path(), None).unwrap();
        let runtime: i64 = store.get_raw(0).unwrap().get(meta::RUNTIME).unwrap().parse().unwrap();
        assert!((100..105).contains(&runtime));

        let work = tempdir().unwrap();
        write_record(work.path(), 0, "status = INIT\n");
        let store = TextFileJobStore::open(work.path(), None).unwrap();
        assert_eq!(store.get_raw(0).unwrap().get(meta::RUNTIME), Some("0"));
    }

    #[test]
    fn float_timestamps_from_old_records_are_accepted() {
        let work = tempdir().unwrap();
        write_record(
            work.path(),
            0,
            "status = DONE\nsubmitted = 1469801234.567\nchanged = 1469801240.1\nruntime = 6\n",
        );
        let store = TextFileJobStore::open(work.path(), None).unwrap();
        let job = store.get_raw(0).unwrap();
        assert_eq!(job.submitted, 1469801234);
        assert_eq!(job.changed, 1469801240);
    }

    #[test]
    fn load_stops_at_the_configured_limit() {
        let work = tempdir().unwrap();
        for job_num in [0usize, 1, 5] {
            write_record(work.path(), job_num, "status = SUCCESS\n");
        }

        let store = TextFileJobStore::open(work.path(), Some(2)).unwrap();
        assert_eq!(store.limit(), Some(2));
        assert!(store.get_raw(0).is_some());
        assert!(store.get_raw(1).is_some());
        assert!(store.get_raw(5).is_none());
    }

    #[test]
    fn limit_is_derived_from_the_highest_job_number() {
        let work = tempdir().unwrap();
        for job_num in [2usize, 9] {
            write_record(work.path(), job_num, "status = SUCCESS\n");
        }
        let store = TextFileJobStore::open(work.path(), None).unwrap();
        assert_eq!(store.limit(), Some(10));
        assert_eq!(store.len(), 10);
    }

    #[test]
    fn unrelated_files_in_the_job_directory_are_ignored() {
        let work = tempdir().unwrap();
        write_record(work.path(), 0, "status = SUCCESS\n");
        let dir = work.path().join(JOB_DIR);
        fs::write(dir.join("README"), "not a job").unwrap();
        fs::write(dir.join("job_x.txt"), "status = DONE\n").unwrap();

        let store = TextFileJobStore::open(work.path(), None).unwrap();
        assert_eq!(store.limit(), Some(1));
    }

    #[test]
    fn corrupt_record_aborts_the_whole_load() {
        let work = tempdir().unwrap();
        write_record(work.path(), 0, "status = SUCCESS\n");
        write_record(work.path(), 1, "this line has no separator\n");

        let err = TextFileJobStore::open(work.path(), None).unwrap_err();
        match err {
            StoreError::Format { path, .. } => {
                assert!(path.to_string_lossy().ends_with("job_1.txt"));
            }
            other => panic!("expected format error, got {other:?}"),
        }
    }

    #[test]
    fn commit_leaves_no_temporary_file_behind() {
        let work = tempdir().unwrap();
        let mut store = TextFileJobStore::open(work.path(), None).unwrap();
        store.commit(4, Job::new()).unwrap();

        let dir = work.path().join(JOB_DIR);
        assert!(dir.join("job_4.txt").is_file());
        assert!(!dir.join("job_4.txt.tmp").exists());
    }

    #[test]
    fn selection_works_over_loaded_records() {
        let work = tempdir().unwrap();
        write_record(work.path(), 0, "status = SUCCESS\n");
        write_record(work.path(), 1, "status = RUNNING\n");
        write_record(work.path(), 2, "status = FAILED\n");

        let store = TextFileJobStore::open(work.path(), None).unwrap();
        let success = class_selector(JobClass::SUCCESS);
        assert_eq!(store.get_jobs(Some(&success), None), vec![0]);
        let resubmit = class_selector(JobClass::RESUBMIT_READY);
        assert_eq!(store.count_jobs(Some(&resubmit), None), 1);
    }
}
