//! Parsing of per-job completion reports.
//!
//! A finished job leaves a fixed-name report file in its output directory;
//! [`parse_job_report`] turns it into a [`JobReport`]. [`DiagnosticReader`]
//! is the troubleshooting variant: same parse, but on a non-zero exit code
//! it echoes the job's captured log files into the error log.

use std::collections::HashMap;
use std::fs;
use std::io::{self, Read};
use std::path::Path;

use flate2::read::GzDecoder;

use crate::error::ReportError;
use crate::store::format;

/// Fixed name of the report file inside a job's output directory.
pub const REPORT_FILE_NAME: &str = "job.info";

const JOB_NUM_KEY: &str = "JOBID";
const EXIT_CODE_KEY: &str = "EXITCODE";

/// Decoded completion record of one job.
#[derive(Debug, Clone, PartialEq)]
pub struct JobReport {
    pub job_num: usize,
    pub exit_code: i32,
    /// Every report field apart from job number and exit code, verbatim.
    pub raw: HashMap<String, String>,
}

/// Parse the report file inside `output_dir`.
///
/// Fails with a [`ReportError`] naming the file when it is missing,
/// unreadable, empty, or lacks the job number / exit code keys.
pub fn parse_job_report(output_dir: &Path) -> Result<JobReport, ReportError> {
    let path = output_dir.join(REPORT_FILE_NAME);
    if !path.exists() {
        return Err(ReportError::Missing(path));
    }
    let content = fs::read_to_string(&path).map_err(|source| ReportError::Unreadable {
        path: path.clone(),
        source,
    })?;
    if content.is_empty() {
        return Err(ReportError::Empty(path));
    }
    let mut raw: HashMap<String, String> = format::parse_plain(&content).into_iter().collect();
    let job_num = take_numeric(&mut raw, JOB_NUM_KEY)
        .ok_or_else(|| ReportError::Incomplete(path.clone()))?;
    let exit_code =
        take_numeric(&mut raw, EXIT_CODE_KEY).ok_or(ReportError::Incomplete(path))?;
    Ok(JobReport {
        job_num,
        exit_code,
        raw,
    })
}

fn take_numeric<T: std::str::FromStr>(raw: &mut HashMap<String, String>, key: &str) -> Option<T> {
    raw.remove(key)?.trim().trim_matches('"').parse().ok()
}

/// Report parser that echoes log tails for failed jobs.
pub struct DiagnosticReader {
    display_files: Vec<String>,
}

impl Default for DiagnosticReader {
    fn default() -> Self {
        Self::new(vec!["job.stdout".to_string(), "job.stderr".to_string()])
    }
}

impl DiagnosticReader {
    pub fn new(display_files: Vec<String>) -> Self {
        Self { display_files }
    }

    /// Parse the report; when the job exited non-zero, additionally echo
    /// each configured diagnostic file to the error log, gunzipping `*.gz`
    /// captures transparently. Diagnostic read failures are logged and never
    /// alter the returned report.
    pub fn parse(&self, output_dir: &Path) -> Result<JobReport, ReportError> {
        let report = parse_job_report(output_dir)?;
        if report.exit_code != 0 {
            for file_name in &self.display_files {
                display_log(output_dir, file_name);
            }
        }
        Ok(report)
    }
}

fn display_log(output_dir: &Path, file_name: &str) {
    let path = output_dir.join(file_name);
    if !path.exists() {
        log::error!("log file does not exist: {file_name}");
        return;
    }
    match read_maybe_compressed(&path, file_name) {
        Ok(content) => log::error!("{file_name}\n{content}{}", "-".repeat(50)),
        Err(err) => log::error!("unable to display {file_name}: {err}"),
    }
}

fn read_maybe_compressed(path: &Path, file_name: &str) -> io::Result<String> {
    if file_name.ends_with(".gz") {
        let file = fs::File::open(path)?;
        let mut content = String::new();
        GzDecoder::new(file).read_to_string(&mut content)?;
        Ok(content)
    } else {
        fs::read_to_string(path)
    }
}
