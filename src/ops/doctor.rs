//! Host toolchain checks for a target.
//!
//! The `doctor` command verifies that the tools a release for a given
//! triple needs are installed on the build host.
//!
//! ## Usage
//!
//! ```bash
//! crossdock doctor                                   # native target
//! crossdock doctor --target aarch64-unknown-linux-gnu
//! ```
//!
//! ## Checks Performed
//!
//! - cargo availability
//! - rustup availability and whether the target's standard library is installed
//! - the cross linker named by the target profile
//! - pkg-config (optional, consulted by `-sys` crates)

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use anyhow::Result;

use crate::core::{resolve, TargetProfile, TargetTriple};
use crate::util::process::{find_executable, tool_version, ProcessBuilder};

/// Result of a single health check.
#[derive(Debug, Clone)]
pub struct CheckResult {
    /// Name of the check
    pub name: String,

    /// Whether the check passed
    pub passed: bool,

    /// Human-readable status message
    pub message: String,

    /// Path to the tool (if applicable)
    pub path: Option<PathBuf>,

    /// Version string (if applicable)
    pub version: Option<String>,

    /// How long the check took
    pub duration: Duration,

    /// Whether this check is required or optional
    pub required: bool,
}

impl CheckResult {
    /// Create a passing check result.
    pub fn pass(name: impl Into<String>, message: impl Into<String>) -> Self {
        CheckResult {
            name: name.into(),
            passed: true,
            message: message.into(),
            path: None,
            version: None,
            duration: Duration::ZERO,
            required: true,
        }
    }

    /// Create a failing check result.
    pub fn fail(name: impl Into<String>, message: impl Into<String>) -> Self {
        CheckResult {
            name: name.into(),
            passed: false,
            message: message.into(),
            path: None,
            version: None,
            duration: Duration::ZERO,
            required: true,
        }
    }

    /// Mark this check as optional.
    pub fn optional(mut self) -> Self {
        self.required = false;
        self
    }

    /// Set the tool path.
    pub fn with_path(mut self, path: PathBuf) -> Self {
        self.path = Some(path);
        self
    }

    /// Set the version.
    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }

    /// Set the duration.
    pub fn with_duration(mut self, duration: Duration) -> Self {
        self.duration = duration;
        self
    }
}

/// Summary of all health checks.
#[derive(Debug, Clone, Default)]
pub struct DoctorReport {
    /// The triple that was checked
    pub target: TargetTriple,

    /// Individual check results
    pub checks: Vec<CheckResult>,

    /// Total time taken
    pub total_duration: Duration,

    /// Environment information
    pub environment: BTreeMap<String, String>,
}

impl DoctorReport {
    /// Create a new empty report for a triple.
    pub fn new(target: TargetTriple) -> Self {
        DoctorReport {
            target,
            ..Default::default()
        }
    }

    /// Add a check result.
    pub fn add(&mut self, check: CheckResult) {
        self.checks.push(check);
    }

    /// Check if all required checks passed.
    pub fn all_required_passed(&self) -> bool {
        self.checks.iter().filter(|c| c.required).all(|c| c.passed)
    }

    /// Get the count of passed checks.
    pub fn passed_count(&self) -> usize {
        self.checks.iter().filter(|c| c.passed).count()
    }

    /// Get the count of failed checks.
    pub fn failed_count(&self) -> usize {
        self.checks.iter().filter(|c| !c.passed).count()
    }

    /// Get the count of required failed checks.
    pub fn required_failed_count(&self) -> usize {
        self.checks
            .iter()
            .filter(|c| c.required && !c.passed)
            .count()
    }
}

/// Options for the doctor command.
#[derive(Debug, Clone, Default)]
pub struct DoctorOptions {
    /// Triple to check the host for
    pub target: TargetTriple,

    /// Include verbose output
    pub verbose: bool,
}

/// Run the doctor command.
pub fn doctor(options: DoctorOptions) -> Result<DoctorReport> {
    Ok(doctor_with(&options, &find_executable))
}

/// Run the checks, locating tools with `find`.
pub fn doctor_with(options: &DoctorOptions, find: &dyn Fn(&str) -> Option<PathBuf>) -> DoctorReport {
    let start = Instant::now();
    let profile = resolve(&options.target);
    let mut report = DoctorReport::new(profile.triple.clone());

    report
        .environment
        .insert("os".to_string(), std::env::consts::OS.to_string());
    report
        .environment
        .insert("arch".to_string(), std::env::consts::ARCH.to_string());
    report
        .environment
        .insert("target".to_string(), profile.triple.to_string());
    for (key, value) in [
        ("target_arch", profile.triple.arch()),
        ("target_vendor", profile.triple.vendor()),
        ("target_os", profile.triple.os()),
        ("target_abi", profile.triple.abi()),
    ] {
        if let Some(value) = value {
            report.environment.insert(key.to_string(), value.to_string());
        }
    }

    report.add(check_tool("cargo", "cargo", find));

    let rustup = check_tool("rustup", "rustup", find).optional();
    let rustup_path = rustup.path.clone();
    report.add(rustup);

    if let Some(rustup) = rustup_path {
        report.add(check_rust_target(&rustup, &profile.triple));
    }

    report.add(check_linker(&profile, find));
    report.add(check_tool("pkg-config", "pkg-config", find).optional());

    report.total_duration = start.elapsed();
    report
}

/// Check that a tool is on PATH.
fn check_tool(name: &str, program: &str, find: &dyn Fn(&str) -> Option<PathBuf>) -> CheckResult {
    let start = Instant::now();

    match find(program) {
        Some(path) => {
            let mut result = CheckResult::pass(name, format!("{} is available", program));
            if let Some(version) = tool_version(&path) {
                result = result.with_version(version);
            }
            result.with_path(path).with_duration(start.elapsed())
        }
        None => CheckResult::fail(name, format!("{} not found in PATH", program))
            .with_duration(start.elapsed()),
    }
}

/// Check that rustup has the target's standard library.
fn check_rust_target(rustup: &Path, triple: &TargetTriple) -> CheckResult {
    let start = Instant::now();
    let name = "Rust target";

    let installed = ProcessBuilder::new(rustup)
        .args(["target", "list", "--installed"])
        .exec_and_check()
        .map(|output| {
            String::from_utf8_lossy(&output.stdout)
                .lines()
                .any(|l| l.trim() == triple.as_str())
        });

    let result = match installed {
        Ok(true) => CheckResult::pass(name, format!("{} is installed", triple)),
        Ok(false) => CheckResult::fail(
            name,
            format!(
                "{} is not installed (it is added automatically on release)",
                triple
            ),
        ),
        Err(e) => CheckResult::fail(name, format!("failed to query rustup: {:#}", e)),
    };

    result.optional().with_duration(start.elapsed())
}

/// Check for the profile's cross linker.
fn check_linker(profile: &TargetProfile, find: &dyn Fn(&str) -> Option<PathBuf>) -> CheckResult {
    let Some(linker) = &profile.linker else {
        return CheckResult::pass("Linker", "native target, no cross linker needed");
    };

    let mut result = check_tool("Linker", linker, find);
    if !result.passed {
        result.message = format!(
            "{} not found (install the cross gcc for {})",
            linker, profile.triple
        );
    }
    result
}

/// Format the doctor report for display.
pub fn format_report(report: &DoctorReport, verbose: bool) -> String {
    use std::fmt::Write;

    let mut output = String::new();

    writeln!(output, "crossdock doctor ({})", report.target).unwrap();
    writeln!(output, "================\n").unwrap();

    if verbose {
        writeln!(output, "Environment:").unwrap();
        for (key, value) in &report.environment {
            writeln!(output, "  {}: {}", key, value).unwrap();
        }
        writeln!(output).unwrap();
    }

    writeln!(output, "Checks:").unwrap();
    for check in &report.checks {
        let status = if check.passed { "[OK]" } else { "[!!]" };
        let required = if check.required { "" } else { " (optional)" };

        writeln!(output, "  {} {}{}", status, check.name, required).unwrap();

        if verbose || !check.passed {
            writeln!(output, "      {}", check.message).unwrap();
        }
        if verbose {
            if let Some(path) = &check.path {
                writeln!(output, "      Path: {}", path.display()).unwrap();
            }
            if let Some(version) = &check.version {
                writeln!(output, "      Version: {}", version).unwrap();
            }
        }
    }

    writeln!(output).unwrap();

    let passed = report.passed_count();
    let failed = report.failed_count();
    let required_failed = report.required_failed_count();

    writeln!(output, "Summary: {} passed, {} failed", passed, failed).unwrap();

    if required_failed > 0 {
        writeln!(
            output,
            "\nWarning: {} required check(s) failed. Releases for {} will fail.",
            required_failed, report.target
        )
        .unwrap();
    } else if failed > 0 {
        writeln!(
            output,
            "\nAll required checks passed. {} optional check(s) failed.",
            failed
        )
        .unwrap();
    } else {
        writeln!(output, "\nAll checks passed. Ready to release {}.", report.target).unwrap();
    }

    output
}

#[cfg(test)]
mod tests {
    use super::*;

    fn only(tools: &'static [&'static str]) -> impl Fn(&str) -> Option<PathBuf> {
        move |name: &str| {
            tools
                .contains(&name)
                .then(|| PathBuf::from("/nonexistent/bin").join(name))
        }
    }

    #[test]
    fn test_check_result_optional() {
        let result = CheckResult::pass("test", "passed").optional();
        assert!(result.passed);
        assert!(!result.required);
    }

    #[test]
    fn test_doctor_report_required_failed() {
        let mut report = DoctorReport::new(TargetTriple::native());
        report.add(CheckResult::pass("check1", "ok"));
        report.add(CheckResult::fail("check2", "missing"));
        report.add(CheckResult::fail("check3", "missing").optional());

        assert!(!report.all_required_passed());
        assert_eq!(report.passed_count(), 1);
        assert_eq!(report.required_failed_count(), 1);
    }

    #[test]
    fn test_native_needs_no_linker() {
        let options = DoctorOptions::default();
        let report = doctor_with(&options, &only(&["cargo"]));

        assert!(report.all_required_passed());
        let linker = report.checks.iter().find(|c| c.name == "Linker").unwrap();
        assert!(linker.passed);
    }

    #[test]
    fn test_missing_cross_linker_fails() {
        let options = DoctorOptions {
            target: TargetTriple::new("armv7-unknown-linux-gnueabihf"),
            verbose: false,
        };
        let report = doctor_with(&options, &only(&["cargo"]));

        assert!(!report.all_required_passed());
        let linker = report.checks.iter().find(|c| c.name == "Linker").unwrap();
        assert!(linker.message.contains("arm-linux-gnueabihf-gcc"));

        let text = format_report(&report, false);
        assert!(text.contains("[!!] Linker"));
        assert!(text.contains("armv7-unknown-linux-gnueabihf"));
    }

    #[test]
    fn test_cross_linker_found() {
        let options = DoctorOptions {
            target: TargetTriple::new("aarch64-unknown-linux-gnu"),
            verbose: true,
        };
        let report = doctor_with(&options, &only(&["cargo", "aarch64-linux-gnu-gcc"]));

        assert!(report.all_required_passed());
        assert_eq!(report.environment["target"], "aarch64-unknown-linux-gnu");
        assert_eq!(report.environment["target_arch"], "aarch64");
        assert_eq!(report.environment["target_abi"], "gnu");
    }
}
