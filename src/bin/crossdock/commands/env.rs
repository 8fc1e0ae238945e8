//! `crossdock env` command
//!
//! Prints the environment a release would hand to the toolchain, without
//! staging anything.

use anyhow::{Context, Result};

use crate::cli::EnvArgs;
use crossdock::builder::BuildEnvironment;
use crossdock::core::resolve;
use crossdock::ops::release::sysroot_dir;
use crossdock::util::GlobalContext;

use super::target_triple;

pub fn execute(args: EnvArgs) -> Result<()> {
    let ctx = GlobalContext::new()?;
    let profile = resolve(&target_triple(args.target));

    let sysroot = match args.sysroot {
        Some(dir) => ctx.cwd().join(dir),
        None => sysroot_dir(&ctx.work_dir(), &profile.triple)?,
    };
    let env = BuildEnvironment::build(&profile, &sysroot);

    if args.json {
        let json = serde_json::to_string_pretty(&env).context("failed to serialize environment")?;
        println!("{}", json);
    } else {
        print!("{}", env.to_env_lines());
    }

    Ok(())
}
