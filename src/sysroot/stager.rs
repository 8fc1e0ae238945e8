//! Sysroot staging.
//!
//! Fetches every foreign package a profile requires and unpacks it into a
//! single root. Staging always starts from an empty root, and packages are
//! pinned, so staging the same profile twice gives byte-identical trees.
//!
//! Any fetch or extraction failure is fatal: a missing library would only
//! surface much later as an opaque linker error.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use crate::core::{ForeignPackage, TargetProfile};
use crate::errors::PipelineError;
use crate::sysroot::deb::DebPackage;
use crate::sysroot::extract::extract_into;
use crate::sysroot::fetch::PackageFetcher;
use crate::util::fs::remove_dir_all_if_exists;

/// One package unpacked into a sysroot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StagedPackage {
    /// The package that was extracted
    pub package: ForeignPackage,
    /// Root-relative paths it wrote, in archive order
    pub files: Vec<PathBuf>,
}

/// A fully staged sysroot.
///
/// Only [`stage`] creates one, and only after every package has been
/// extracted, so holding a `StagedSysroot` means the tree is complete.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StagedSysroot {
    root: PathBuf,
    contents: Vec<StagedPackage>,
}

impl StagedSysroot {
    /// Get the sysroot root directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Get the staged packages in extraction order.
    pub fn packages(&self) -> &[StagedPackage] {
        &self.contents
    }

    /// All root-relative paths written by any package.
    pub fn files(&self) -> BTreeSet<&Path> {
        self.contents
            .iter()
            .flat_map(|p| p.files.iter().map(PathBuf::as_path))
            .collect()
    }

    /// Check if no packages were staged.
    pub fn is_empty(&self) -> bool {
        self.contents.is_empty()
    }
}

/// Stage all packages required by `profile` into `root`.
///
/// Any existing content under `root` is removed first. On failure the
/// partially populated root is removed as well.
pub fn stage(
    profile: &TargetProfile,
    root: &Path,
    fetcher: &dyn PackageFetcher,
) -> Result<StagedSysroot, PipelineError> {
    let result = stage_packages(profile, root, fetcher);

    if result.is_err() {
        if let Err(e) = remove_dir_all_if_exists(root) {
            tracing::warn!("failed to clean up partial sysroot: {:#}", e);
        }
    }

    result
}

fn stage_packages(
    profile: &TargetProfile,
    root: &Path,
    fetcher: &dyn PackageFetcher,
) -> Result<StagedSysroot, PipelineError> {
    let prepare = |e: anyhow::Error| PipelineError::Extraction {
        package: profile.triple.to_string(),
        reason: format!("failed to prepare sysroot {}: {:#}", root.display(), e),
    };
    remove_dir_all_if_exists(root).map_err(prepare)?;
    crate::util::fs::ensure_dir(root).map_err(prepare)?;

    if profile.needs_sysroot() {
        tracing::info!(
            "Staging {} package(s) for {} into {}",
            profile.packages.len(),
            profile.triple,
            root.display()
        );
    } else {
        tracing::debug!("{} needs no foreign packages", profile.triple);
    }

    let mut contents = Vec::with_capacity(profile.packages.len());

    for package in &profile.packages {
        let bytes = fetcher
            .fetch(package)
            .map_err(|source| PipelineError::Fetch {
                package: package.id(),
                source,
            })?;

        let files = extract_package(&bytes, root)
            .map_err(|e| PipelineError::extraction(package.id(), &e))?;

        tracing::debug!("Extracted {} ({} files)", package, files.len());
        contents.push(StagedPackage {
            package: package.clone(),
            files,
        });
    }

    Ok(StagedSysroot {
        root: root.to_path_buf(),
        contents,
    })
}

fn extract_package(bytes: &[u8], root: &Path) -> anyhow::Result<Vec<PathBuf>> {
    let deb = DebPackage::parse(bytes)?;
    if let Some(version) = deb.format_version().filter(|v| !v.starts_with("2.")) {
        tracing::warn!("unexpected .deb format version {}", version);
    }
    extract_into(deb.data_reader()?, root)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::TargetTriple;
    use crate::test_support::{DebBuilder, ScriptedFetcher};
    use std::fs;
    use tempfile::TempDir;
    use walkdir::WalkDir;

    fn two_package_profile() -> TargetProfile {
        let mut profile = crate::core::resolve(&TargetTriple::new("aarch64-unknown-linux-gnu"));
        profile.packages.truncate(2);
        profile
    }

    fn fetcher() -> ScriptedFetcher {
        ScriptedFetcher::new()
            .with(
                "libasound2",
                DebBuilder::new()
                    .file("usr/lib/aarch64-linux-gnu/libasound.so.2.0.0", b"\x7fELF alsa")
                    .symlink("usr/lib/aarch64-linux-gnu/libasound.so.2", "libasound.so.2.0.0")
                    .build(),
            )
            .with(
                "libasound2-dev",
                DebBuilder::new()
                    .file("usr/include/alsa/asoundlib.h", b"#include <alsa/pcm.h>\n")
                    .symlink(
                        "usr/lib/aarch64-linux-gnu/libasound.so",
                        "/usr/lib/aarch64-linux-gnu/libasound.so.2",
                    )
                    .build(),
            )
    }

    fn snapshot(root: &Path) -> Vec<(PathBuf, Vec<u8>)> {
        WalkDir::new(root)
            .sort_by_file_name()
            .into_iter()
            .map(|e| e.unwrap())
            .filter(|e| !e.file_type().is_dir())
            .map(|e| {
                let rel = e.path().strip_prefix(root).unwrap().to_path_buf();
                let bytes = if e.path_is_symlink() {
                    fs::read_link(e.path())
                        .unwrap()
                        .to_string_lossy()
                        .into_owned()
                        .into_bytes()
                } else {
                    fs::read(e.path()).unwrap()
                };
                (rel, bytes)
            })
            .collect()
    }

    #[test]
    fn test_stage_extracts_all_packages() {
        let tmp = TempDir::new().unwrap();
        let root = tmp.path().join("sysroot");

        let sysroot = stage(&two_package_profile(), &root, &fetcher()).unwrap();

        assert_eq!(sysroot.packages().len(), 2);
        assert_eq!(sysroot.packages()[0].package.name, "libasound2");
        assert!(sysroot
            .files()
            .contains(Path::new("usr/include/alsa/asoundlib.h")));
        assert!(root.join("usr/lib/aarch64-linux-gnu/libasound.so.2.0.0").exists());
    }

    #[test]
    fn test_stage_is_idempotent() {
        let tmp = TempDir::new().unwrap();
        let first = tmp.path().join("a");
        let second = tmp.path().join("b");
        let profile = two_package_profile();
        let fetcher = fetcher();

        let a = stage(&profile, &first, &fetcher).unwrap();
        let b = stage(&profile, &second, &fetcher).unwrap();

        assert_eq!(a.files(), b.files());
        assert_eq!(snapshot(&first), snapshot(&second));
    }

    #[test]
    fn test_stage_clears_stale_content() {
        let tmp = TempDir::new().unwrap();
        let root = tmp.path().join("sysroot");
        fs::create_dir_all(&root).unwrap();
        fs::write(root.join("stale.txt"), "left over").unwrap();

        stage(&two_package_profile(), &root, &fetcher()).unwrap();
        assert!(!root.join("stale.txt").exists());
    }

    #[test]
    fn test_stage_fetch_failure_names_package() {
        let tmp = TempDir::new().unwrap();
        let root = tmp.path().join("sysroot");
        let fetcher = fetcher().failing("libasound2-dev");

        let err = stage(&two_package_profile(), &root, &fetcher).unwrap_err();

        match &err {
            PipelineError::Fetch { package, .. } => assert_eq!(package, "libasound2-dev:arm64"),
            other => panic!("expected fetch failure, got {:?}", other),
        }
        assert!(!root.exists());
    }

    #[test]
    fn test_stage_corrupt_archive_is_extraction_failure() {
        let tmp = TempDir::new().unwrap();
        let root = tmp.path().join("sysroot");
        let fetcher = fetcher().with("libasound2", b"garbage".to_vec());

        let err = stage(&two_package_profile(), &root, &fetcher).unwrap_err();

        match &err {
            PipelineError::Extraction { package, .. } => assert_eq!(package, "libasound2:arm64"),
            other => panic!("expected extraction failure, got {:?}", other),
        }
    }

    #[test]
    fn test_stage_native_profile_is_empty() {
        let tmp = TempDir::new().unwrap();
        let root = tmp.path().join("sysroot");
        let no_network = |_: &ForeignPackage| -> anyhow::Result<Vec<u8>> {
            anyhow::bail!("native builds must not fetch")
        };

        let sysroot = stage(&TargetProfile::native(), &root, &no_network).unwrap();
        assert!(sysroot.is_empty());
        assert_eq!(sysroot.root(), root.as_path());
    }
}
