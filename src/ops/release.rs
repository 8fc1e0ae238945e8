//! The release pipeline.
//!
//! One invocation builds one triple:
//!
//! ```text
//! resolve -> stage sysroot -> build environment -> execute -> package -> verify
//! ```
//!
//! Steps run strictly in order and any failure aborts the invocation. The
//! fetcher, executor and packager are injected so the pipeline can run
//! against fakes in tests. Invocations for different triples share nothing
//! but the package cache, so they can run in parallel.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::builder::{BuildEnvironment, BuildExecutor, BuildRequest};
use crate::core::{resolve, TargetProfile, TargetTriple};
use crate::errors::PipelineError;
use crate::release::checksum;
use crate::release::{Artifact, PackageRequest, Packager};
use crate::sysroot::{stage, PackageFetcher};

/// Tag used when none is given.
pub const DEFAULT_TAG: &str = "latest";

/// Inputs of one release invocation.
#[derive(Debug, Clone)]
pub struct ReleaseOptions {
    /// Triple to build for
    pub target: TargetTriple,

    /// Release tag
    pub tag: String,

    /// Binary and archive name
    pub name: String,

    /// Source tree to build
    pub source_dir: PathBuf,

    /// Where the archive and checksum are exported
    pub output_dir: PathBuf,

    /// Holds one sysroot per resolved triple under `sysroot/`
    pub work_dir: PathBuf,
}

impl ReleaseOptions {
    /// Options for a native build tagged [`DEFAULT_TAG`].
    ///
    /// Sysroots are staged under `<source>/.crossdock/work` and output goes
    /// to `<source>/dist`.
    pub fn new(name: impl Into<String>, source_dir: impl Into<PathBuf>) -> Self {
        let source_dir = source_dir.into();
        ReleaseOptions {
            work_dir: source_dir.join(".crossdock/work"),
            output_dir: source_dir.join("dist"),
            name: name.into(),
            tag: DEFAULT_TAG.to_string(),
            target: TargetTriple::native(),
            source_dir,
        }
    }

    /// Set the target triple.
    pub fn with_target(mut self, target: TargetTriple) -> Self {
        self.target = target;
        self
    }

    /// Set the release tag.
    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tag = tag.into();
        self
    }

    /// Set the output directory.
    pub fn with_output_dir(mut self, output_dir: impl Into<PathBuf>) -> Self {
        self.output_dir = output_dir.into();
        self
    }

    /// Stage sysroots under `work_dir`.
    pub fn with_work_dir(mut self, work_dir: impl Into<PathBuf>) -> Self {
        self.work_dir = work_dir.into();
        self
    }
}

/// The sysroot directory for a triple under a work directory.
///
/// Only triples that name a single directory are accepted; anything else
/// could alias another triple's sysroot or point outside `work_dir`, and the
/// sysroot is deleted before staging.
pub fn sysroot_dir(work_dir: &Path, triple: &TargetTriple) -> Result<PathBuf, PipelineError> {
    if !triple.is_path_safe() {
        return Err(PipelineError::InvalidTarget {
            triple: triple.to_string(),
        });
    }
    Ok(work_dir.join("sysroot").join(triple.as_str()))
}

/// Run the whole pipeline for `options.target`.
pub fn release(
    options: &ReleaseOptions,
    fetcher: &dyn PackageFetcher,
    executor: &dyn BuildExecutor,
    packager: &dyn Packager,
) -> Result<Artifact, PipelineError> {
    let profile = resolve(&options.target);
    release_profile(&profile, options, fetcher, executor, packager)
}

/// Run the pipeline for an already resolved profile.
///
/// Every path derived from the triple uses `profile.triple`, never the
/// requested one, which may have fallen back to native.
pub fn release_profile(
    profile: &TargetProfile,
    options: &ReleaseOptions,
    fetcher: &dyn PackageFetcher,
    executor: &dyn BuildExecutor,
    packager: &dyn Packager,
) -> Result<Artifact, PipelineError> {
    tracing::info!(
        "Releasing {} {} for {}",
        options.name,
        options.tag,
        profile.triple
    );

    let root = sysroot_dir(&options.work_dir, &profile.triple)?;
    let sysroot = stage(profile, &root, fetcher)?;
    let env = BuildEnvironment::build(profile, sysroot.root());

    let request = BuildRequest {
        source_dir: &options.source_dir,
        triple: &profile.triple,
        bin_name: &options.name,
    };
    let binary = executor.execute(&request, env)?;

    let artifact = packager.package(&PackageRequest {
        binary: &binary,
        name: &options.name,
        tag: &options.tag,
        triple: &profile.triple,
        source_dir: &options.source_dir,
        output_dir: &options.output_dir,
    })?;

    if let Err(e) = checksum::verify(&artifact.archive_path, &artifact.checksum_path) {
        artifact.discard();
        return Err(e);
    }

    tracing::info!(
        "Released {} ({})",
        artifact.archive_path.display(),
        artifact.checksum_path.display()
    );
    Ok(artifact)
}

#[derive(Deserialize)]
struct CargoManifest {
    package: Option<CargoPackage>,
}

#[derive(Deserialize)]
struct CargoPackage {
    name: String,
}

/// The `[package].name` of the crate in `source_dir`.
pub fn package_name(source_dir: &Path) -> Result<String> {
    let path = source_dir.join("Cargo.toml");
    let contents = std::fs::read_to_string(&path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    let manifest: CargoManifest =
        toml::from_str(&contents).with_context(|| format!("failed to parse {}", path.display()))?;

    manifest
        .package
        .map(|p| p.name)
        .with_context(|| format!("{} has no [package] section", path.display()))
}
