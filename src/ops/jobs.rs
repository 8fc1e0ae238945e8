//! The jobs crossdock can run.

use serde::Serialize;

/// A runnable job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Job {
    pub name: &'static str,
    pub description: &'static str,
}

/// All jobs, in the order they are listed.
pub const JOBS: &[Job] = &[
    Job {
        name: "test",
        description: "Run tests",
    },
    Job {
        name: "release",
        description: "Build the project and package it for distribution",
    },
];

/// Find a job by name.
pub fn find(name: &str) -> Option<&'static Job> {
    JOBS.iter().find(|job| job.name == name)
}

/// Format the job list as an aligned table.
pub fn format_jobs() -> String {
    let width = JOBS.iter().map(|job| job.name.len()).max().unwrap_or(0);

    JOBS.iter()
        .map(|job| format!("{:<width$}  {}\n", job.name, job.description, width = width))
        .collect()
}
