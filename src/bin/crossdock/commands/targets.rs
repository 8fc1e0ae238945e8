//! `crossdock targets` command

use anyhow::{Context, Result};

use crate::cli::TargetsArgs;
use crossdock::core::{lookup, supported_triples, TargetProfile};

pub fn execute(args: TargetsArgs) -> Result<()> {
    let profiles: Vec<TargetProfile> = supported_triples().filter_map(|t| lookup(&t)).collect();

    if args.json {
        let json =
            serde_json::to_string_pretty(&profiles).context("failed to serialize profiles")?;
        println!("{}", json);
        return Ok(());
    }

    let width = profiles
        .iter()
        .map(|p| p.triple.as_str().len())
        .max()
        .unwrap_or(0);

    for profile in &profiles {
        let linker = match &profile.linker {
            Some(linker) => linker.as_str(),
            None if profile.triple.is_native() => "(native)",
            None => "(host)",
        };
        println!(
            "{:<width$}  {:<24}  {} package(s)",
            profile.triple.as_str(),
            linker,
            profile.packages.len(),
            width = width
        );
    }

    Ok(())
}
