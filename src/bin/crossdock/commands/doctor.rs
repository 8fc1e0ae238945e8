//! `crossdock doctor` command

use anyhow::Result;

use crate::cli::DoctorArgs;
use crossdock::ops::{doctor, format_report, DoctorOptions};

use super::target_triple;

pub fn execute(args: DoctorArgs, verbose: bool) -> Result<()> {
    let options = DoctorOptions {
        target: target_triple(args.target),
        verbose,
    };

    let report = doctor(options)?;
    print!("{}", format_report(&report, verbose));

    // Exit with error code if required checks failed
    if !report.all_required_passed() {
        std::process::exit(1);
    }

    Ok(())
}
