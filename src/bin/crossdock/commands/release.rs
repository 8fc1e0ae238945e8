//! `crossdock release` command

use anyhow::{anyhow, Result};

use crate::cli::ReleaseArgs;
use crossdock::builder::CargoExecutor;
use crossdock::ops::{package_name, release, ReleaseOptions};
use crossdock::release::TarGzPackager;
use crossdock::sysroot::{CachedFetcher, HttpFetcher, DEFAULT_MIRROR};
use crossdock::util::GlobalContext;

use super::target_triple;

pub fn execute(args: ReleaseArgs) -> Result<()> {
    let mut ctx = match args.source {
        Some(source) => GlobalContext::with_cwd(source)?,
        None => GlobalContext::new()?,
    };
    let config = ctx.load_config();

    let name = match args.name.or_else(|| config.release.name.clone()) {
        Some(name) => name,
        None => package_name(ctx.cwd())?,
    };
    let output = args
        .output
        .or_else(|| config.release.output_dir.clone())
        .map(|dir| ctx.cwd().join(dir))
        .unwrap_or_else(|| ctx.cwd().join("dist"));
    let mirror = args
        .mirror
        .or_else(|| config.fetch.mirror.clone())
        .unwrap_or_else(|| DEFAULT_MIRROR.to_string());

    let fetcher = CachedFetcher::new(ctx.package_cache_dir(), HttpFetcher::new(&mirror)?)
        .offline(args.offline || config.fetch.offline);
    let executor = CargoExecutor::new(ctx.target_root());
    let mut packager = TarGzPackager::new(ctx.work_dir().join("package"));
    if let Some(include) = config.release.include.clone() {
        packager = packager.with_include(include);
    }

    let triple = target_triple(args.target);
    let options = ReleaseOptions::new(name, ctx.cwd())
        .with_target(triple.clone())
        .with_tag(args.tag)
        .with_output_dir(output)
        .with_work_dir(ctx.work_dir());

    let artifact = release(&options, &fetcher, &executor, &packager).map_err(|e| {
        let stage = e.stage();
        anyhow!(e).context(format!("release for {} failed at the {} step", triple, stage))
    })?;

    eprintln!("    Finished {}", artifact.archive_path.display());
    eprintln!("    Checksum {}", artifact.checksum_path.display());

    Ok(())
}
