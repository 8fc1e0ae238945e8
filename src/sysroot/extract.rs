//! Extraction of package data into a shared sysroot.
//!
//! Behaves like `dpkg -x`: the archive's internal layout is preserved, so
//! libraries land under `usr/lib/<multiarch>` and headers under
//! `usr/include`. Several packages share one root; when two of them ship
//! the same file, the one extracted last wins.
//!
//! Entries that would leave the root (absolute paths, `..`, writes through a
//! symlink pointing outside) are rejected. Absolute symlink targets are
//! rewritten to relative ones so they resolve inside the sysroot instead of
//! on the build host.

use std::fs::{self, File};
use std::io::{self, Read};
use std::path::{Component, Path, PathBuf};

use anyhow::{bail, Context, Result};
use tar::{Archive, EntryType};

/// Extract a tar stream into `root`.
///
/// Returns the root-relative paths of the files, symlinks and hard links
/// written, in archive order.
pub fn extract_into<R: Read>(reader: R, root: &Path) -> Result<Vec<PathBuf>> {
    fs::create_dir_all(root)
        .with_context(|| format!("failed to create sysroot: {}", root.display()))?;
    let canonical_root = root
        .canonicalize()
        .with_context(|| format!("failed to resolve sysroot: {}", root.display()))?;

    let mut archive = Archive::new(reader);
    let mut written = Vec::new();

    for entry in archive.entries().context("failed to read data entries")? {
        let mut entry = entry.context("failed to read data entry")?;
        let raw_path = entry.path().context("invalid entry path")?.into_owned();

        let Some(rel) = normalize_entry_path(&raw_path)? else {
            continue;
        };
        let dest = canonical_root.join(&rel);

        ensure_parent_inside(&dest, &canonical_root)?;

        let entry_type = entry.header().entry_type();
        match entry_type {
            EntryType::Directory => {
                if is_non_directory(&dest) {
                    bail!(
                        "directory `{}` collides with an existing file",
                        rel.display()
                    );
                }
                fs::create_dir_all(&dest)
                    .with_context(|| format!("failed to create directory: {}", dest.display()))?;
            }
            EntryType::Regular | EntryType::Continuous => {
                let mode = entry.header().mode().unwrap_or(0o644);
                replace_existing(&dest, &rel)?;
                write_file(&mut entry, &dest, mode)?;
                written.push(rel);
            }
            EntryType::Symlink => {
                let target = entry
                    .link_name()
                    .context("invalid symlink target")?
                    .with_context(|| format!("symlink `{}` has no target", rel.display()))?
                    .into_owned();
                let target = rewrite_link_target(&target, &rel);
                replace_existing(&dest, &rel)?;
                make_symlink(&target, &dest)?;
                written.push(rel);
            }
            EntryType::Link => {
                let target = entry
                    .link_name()
                    .context("invalid hard link target")?
                    .with_context(|| format!("hard link `{}` has no target", rel.display()))?
                    .into_owned();
                let target_rel = normalize_entry_path(&target)?.with_context(|| {
                    format!("hard link `{}` points at the root", rel.display())
                })?;
                let source = resolve_inside(&canonical_root.join(&target_rel), &canonical_root)
                    .with_context(|| format!("hard link `{}` is unsafe", rel.display()))?;
                replace_existing(&dest, &rel)?;
                fs::copy(&source, &dest).with_context(|| {
                    format!(
                        "failed to materialize hard link {} -> {}",
                        rel.display(),
                        target_rel.display()
                    )
                })?;
                written.push(rel);
            }
            other => {
                tracing::debug!("skipping {:?} entry: {}", other, rel.display());
            }
        }
    }

    Ok(written)
}

/// Turn an archive path into a safe root-relative path.
///
/// `./usr/lib` becomes `usr/lib`; the bare `./` entry yields `None`.
/// Absolute paths and `..` components are errors.
pub fn normalize_entry_path(path: &Path) -> Result<Option<PathBuf>> {
    let mut out = PathBuf::new();

    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::Normal(part) => out.push(part),
            Component::ParentDir => {
                bail!("entry `{}` escapes the sysroot", path.display())
            }
            Component::RootDir | Component::Prefix(_) => {
                bail!("entry `{}` has an absolute path", path.display())
            }
        }
    }

    if out.as_os_str().is_empty() {
        Ok(None)
    } else {
        Ok(Some(out))
    }
}

/// Rewrite an absolute symlink target to a path relative to the link.
///
/// `usr/lib/aarch64-linux-gnu/libcap.so -> /lib/aarch64-linux-gnu/libcap.so.2`
/// becomes `../../../lib/aarch64-linux-gnu/libcap.so.2`.
pub fn rewrite_link_target(target: &Path, link_rel: &Path) -> PathBuf {
    let Ok(inside) = target.strip_prefix("/") else {
        return target.to_path_buf();
    };

    let link_dir = link_rel.parent().unwrap_or_else(|| Path::new(""));
    pathdiff::diff_paths(inside, link_dir).unwrap_or_else(|| inside.to_path_buf())
}

/// Fail if the nearest existing ancestor of `dest` resolves outside `root`.
fn ensure_parent_inside(dest: &Path, root: &Path) -> Result<()> {
    let mut ancestor = dest.parent();

    while let Some(dir) = ancestor {
        if dir.symlink_metadata().is_ok() {
            let resolved = dir
                .canonicalize()
                .with_context(|| format!("failed to resolve {}", dir.display()))?;
            if !resolved.starts_with(root) {
                bail!(
                    "`{}` would be written outside the sysroot (via {})",
                    dest.display(),
                    resolved.display()
                );
            }
            return Ok(());
        }
        ancestor = dir.parent();
    }

    Ok(())
}

/// Resolve `path` through any symlinks, failing unless it stays inside `root`.
fn resolve_inside(path: &Path, root: &Path) -> Result<PathBuf> {
    let resolved = path
        .canonicalize()
        .with_context(|| format!("failed to resolve {}", path.display()))?;
    if !resolved.starts_with(root) {
        bail!(
            "`{}` resolves outside the sysroot ({})",
            path.display(),
            resolved.display()
        );
    }
    Ok(resolved)
}

/// Check if something other than a directory (or a link to one) sits at `path`.
fn is_non_directory(path: &Path) -> bool {
    match fs::symlink_metadata(path) {
        Ok(meta) if meta.file_type().is_symlink() => !path.is_dir(),
        Ok(meta) => !meta.is_dir(),
        Err(_) => false,
    }
}

/// Remove a file or symlink previously extracted at `dest`.
fn replace_existing(dest: &Path, rel: &Path) -> Result<()> {
    let Ok(meta) = fs::symlink_metadata(dest) else {
        return Ok(());
    };

    if meta.is_dir() {
        bail!("file `{}` collides with an existing directory", rel.display());
    }

    tracing::debug!("overwriting {}", rel.display());
    fs::remove_file(dest).with_context(|| format!("failed to replace {}", dest.display()))
}

fn write_file(reader: &mut impl Read, dest: &Path, mode: u32) -> Result<()> {
    if let Some(parent) = dest.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create directory: {}", parent.display()))?;
    }

    let mut file =
        File::create(dest).with_context(|| format!("failed to create {}", dest.display()))?;
    io::copy(reader, &mut file).with_context(|| format!("failed to write {}", dest.display()))?;

    set_mode(dest, mode)
}

#[cfg(unix)]
fn set_mode(path: &Path, mode: u32) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;

    fs::set_permissions(path, fs::Permissions::from_mode(mode & 0o7777))
        .with_context(|| format!("failed to set permissions on {}", path.display()))
}

#[cfg(not(unix))]
fn set_mode(_path: &Path, _mode: u32) -> Result<()> {
    Ok(())
}

fn make_symlink(target: &Path, dest: &Path) -> Result<()> {
    if let Some(parent) = dest.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create directory: {}", parent.display()))?;
    }

    crate::util::fs::symlink(target, dest).with_context(|| {
        format!(
            "failed to create symlink {} -> {}",
            dest.display(),
            target.display()
        )
    })
}
