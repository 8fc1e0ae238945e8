//! `crossdock clean` command

use anyhow::Result;

use crate::cli::CleanArgs;
use crossdock::util::fs::{dir_size, remove_dir_all_if_exists};
use crossdock::util::GlobalContext;

pub fn execute(args: CleanArgs) -> Result<()> {
    let mut ctx = GlobalContext::new()?;
    ctx.load_config();

    let mut dirs = vec![ctx.work_dir()];
    if args.cache {
        dirs.push(ctx.package_cache_dir());
        dirs.push(ctx.target_root());
    }

    for dir in dirs {
        if !dir.exists() {
            continue;
        }
        let size = dir_size(&dir);
        remove_dir_all_if_exists(&dir)?;
        eprintln!(
            "     Removed {} ({:.1} MiB)",
            dir.display(),
            size as f64 / (1024.0 * 1024.0)
        );
    }

    Ok(())
}
