//! High-level operations.
//!
//! This module contains the implementation of crossdock commands.

pub mod doctor;
pub mod jobs;
pub mod release;

pub use doctor::{doctor, format_report, DoctorOptions, DoctorReport};
pub use jobs::{format_jobs, Job, JOBS};
pub use release::{package_name, release, release_profile, ReleaseOptions, DEFAULT_TAG};
pub use test::{run_tests, TestOptions};
