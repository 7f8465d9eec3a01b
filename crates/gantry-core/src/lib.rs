//! gantry-core
//!
//! Core building blocks for tracking the lifecycle of compute jobs at
//! remote batch/grid schedulers.
//!
//! - **domain**: the job entity, its lifecycle states and the named state
//!   classes used for selection
//! - **store**: the job store contract plus the in-memory and durable
//!   text-file implementations
//! - **output**: parsing of per-job output directories into reports and
//!   file manifests
//! - **backend**: polling utilities shared by scheduler-specific backends
//! - **error**: the store and report error types

pub mod backend;
pub mod domain;
pub mod error;
pub mod output;
pub mod store;
