//! Output-file manifests derived from job reports.
//!
//! Two generations of report producers encode file lists differently: the
//! legacy `FILE<n>` key holds a quoted, double-space-separated 4-tuple,
//! while the current format spreads each file over individual
//! `OUTPUT_FILE_<n>_<Property>` keys. The manifest builder merges both,
//! with the current format winning per index/property.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::output::report::{parse_job_report, JobReport};

/// Properties recorded per output file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum FileKey {
    Hash,
    NameLocal,
    NameDest,
    Path,
    Size,
}

impl FileKey {
    pub fn name(self) -> &'static str {
        match self {
            FileKey::Hash => "Hash",
            FileKey::NameLocal => "NameLocal",
            FileKey::NameDest => "NameDest",
            FileKey::Path => "Path",
            FileKey::Size => "Size",
        }
    }

    pub fn from_name(name: &str) -> Option<FileKey> {
        match name {
            "Hash" => Some(FileKey::Hash),
            "NameLocal" => Some(FileKey::NameLocal),
            "NameDest" => Some(FileKey::NameDest),
            "Path" => Some(FileKey::Path),
            "Size" => Some(FileKey::Size),
            _ => None,
        }
    }
}

/// One output file's recorded properties.
pub type FileDescriptor = BTreeMap<FileKey, String>;

const LEGACY_PREFIX: &str = "FILE";
const CURRENT_PREFIX: &str = "OUTPUT_FILE_";

/// Field order of the legacy quoted 4-tuple.
const LEGACY_FIELDS: [FileKey; 4] = [
    FileKey::Hash,
    FileKey::NameLocal,
    FileKey::NameDest,
    FileKey::Path,
];

/// Parse the report in `output_dir` and derive its file manifest.
///
/// Unlike [`parse_job_report`], a missing or malformed report is not an
/// error here: one job without a usable manifest must not abort the
/// processing of all others, so failures are downgraded to a logged warning
/// and `None`.
pub fn parse_file_manifest(output_dir: &Path) -> Option<Vec<FileDescriptor>> {
    let report = match parse_job_report(output_dir) {
        Ok(report) => report,
        Err(err) => {
            log::warn!("unable to process job information: {err}");
            return None;
        }
    };
    Some(build_manifest(&report))
}

/// Derive the file manifest from an already-parsed report, ordered by
/// ascending file index.
pub fn build_manifest(report: &JobReport) -> Vec<FileDescriptor> {
    let mut by_index: BTreeMap<usize, FileDescriptor> = BTreeMap::new();

    // Legacy entries first; current-format fields override them below.
    for (key, value) in &report.raw {
        let Some(rest) = key.strip_prefix(LEGACY_PREFIX) else {
            continue;
        };
        // A bare `FILE` key counts as index 0.
        let file_idx = if rest.is_empty() {
            0
        } else {
            match rest.parse::<usize>() {
                Ok(idx) => idx,
                Err(_) => {
                    log::warn!("ignoring malformed manifest key {key:?}");
                    continue;
                }
            }
        };
        let fields = value.trim().trim_matches('"').split("  ");
        let descriptor = by_index.entry(file_idx).or_default();
        for (file_key, field) in LEGACY_FIELDS.iter().zip(fields) {
            descriptor.insert(*file_key, field.to_string());
        }
    }

    for (key, value) in &report.raw {
        let Some(rest) = key.strip_prefix(CURRENT_PREFIX) else {
            continue;
        };
        let Some((idx, prop)) = rest.split_once('_') else {
            log::warn!("ignoring malformed manifest key {key:?}");
            continue;
        };
        let (Ok(file_idx), Some(file_key)) = (idx.parse::<usize>(), FileKey::from_name(prop))
        else {
            log::warn!("ignoring malformed manifest key {key:?}");
            continue;
        };
        by_index
            .entry(file_idx)
            .or_default()
            .insert(file_key, value.trim().trim_matches('"').to_string());
    }

    by_index.into_values().collect()
}
