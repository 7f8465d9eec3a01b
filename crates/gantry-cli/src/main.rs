//! Operations helper around a gantry work directory.
//!
//! `gantry <work dir> status` prints per-class job counts as JSON;
//! `gantry <work dir> files` lists hash and destination of every output
//! file of the successfully finished jobs, one line per file.

use std::path::Path;
use std::process::ExitCode;

use gantry_core::domain::JobClass;
use gantry_core::output::{build_manifest, parse_job_report, FileKey};
use gantry_core::store::{class_selector, JobStore, TextFileJobStore};

const CLASSES: [(&str, JobClass); 6] = [
    ("AT_SCHEDULER", JobClass::AT_SCHEDULER),
    ("PROCESSING", JobClass::PROCESSING),
    ("CANCEL_REQUESTED", JobClass::CANCEL_REQUESTED),
    ("DONE", JobClass::DONE),
    ("SUCCESS", JobClass::SUCCESS),
    ("RESUBMIT_READY", JobClass::RESUBMIT_READY),
];

fn main() -> ExitCode {
    env_logger::init();
    let args: Vec<String> = std::env::args().skip(1).collect();
    let (work_dir, command) = match args.as_slice() {
        [work_dir, command] => (Path::new(work_dir), command.as_str()),
        _ => {
            eprintln!("usage: gantry <work dir> (status | files)");
            return ExitCode::from(2);
        }
    };

    let store = match TextFileJobStore::open(work_dir, None) {
        Ok(store) => store,
        Err(err) => {
            eprintln!("gantry: {err}");
            return ExitCode::FAILURE;
        }
    };

    match command {
        "status" => status(&store),
        "files" => files(&store, work_dir),
        other => {
            eprintln!("gantry: unknown command '{other}'");
            ExitCode::from(2)
        }
    }
}

fn status(store: &TextFileJobStore) -> ExitCode {
    let mut counts = serde_json::Map::new();
    counts.insert("TOTAL".to_string(), store.len().into());
    for (name, class) in CLASSES {
        let selector = class_selector(class);
        let count = store.count_jobs(Some(&selector), None);
        counts.insert(name.to_string(), count.into());
    }
    println!("{}", serde_json::Value::Object(counts));
    ExitCode::SUCCESS
}

/// Per-job output directory under the conventional work-directory layout.
fn output_dir(work_dir: &Path, job_num: usize) -> std::path::PathBuf {
    work_dir.join("output").join(format!("job_{job_num}"))
}

fn files(store: &TextFileJobStore, work_dir: &Path) -> ExitCode {
    let success = class_selector(JobClass::SUCCESS);
    for job_num in store.iter_jobs(Some(&success), None) {
        let dir = output_dir(work_dir, job_num);
        let report = match parse_job_report(&dir) {
            Ok(report) => report,
            Err(err) => {
                log::warn!("job {job_num}: {err}");
                continue;
            }
        };
        if report.exit_code != 0 {
            continue;
        }
        for descriptor in build_manifest(&report) {
            let hash = descriptor.get(&FileKey::Hash).map(String::as_str).unwrap_or("?");
            let dest = descriptor
                .get(&FileKey::NameDest)
                .map(String::as_str)
                .unwrap_or("?");
            let path = descriptor
                .get(&FileKey::Path)
                .map(String::as_str)
                .unwrap_or("")
                .replace("file://", "")
                .replace("dir://", "");
            println!("{hash}  {path}/{dest}");
        }
    }
    ExitCode::SUCCESS
}
