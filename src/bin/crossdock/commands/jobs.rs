//! `crossdock jobs` command

use anyhow::Result;

use crossdock::ops::format_jobs;

pub fn execute() -> Result<()> {
    print!("{}", format_jobs());
    Ok(())
}
