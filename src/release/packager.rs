//! Release packaging.
//!
//! A [`Packager`] turns a built binary into a distributable archive plus a
//! checksum file and exports both to the caller's output directory.

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use flate2::write::GzEncoder;
use flate2::Compression;
use serde::Serialize;
use tar::{EntryType, Header};

use crate::core::TargetTriple;
use crate::errors::PipelineError;
use crate::release::checksum;
use crate::util::fs::{ensure_dir, glob_files, is_glob, remove_dir_all_if_exists};

/// The outputs of one release invocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Artifact {
    /// The binary that was packaged
    pub binary_path: PathBuf,
    /// The exported archive
    pub archive_path: PathBuf,
    /// The exported checksum file
    pub checksum_path: PathBuf,
}

impl Artifact {
    /// Remove the exported archive and checksum.
    ///
    /// Used when a later step rejects the artifact, so the output directory
    /// never holds a half-finished release.
    pub fn discard(&self) {
        remove_exported(&self.archive_path);
        remove_exported(&self.checksum_path);
    }
}

/// Files packed next to the binary unless configured otherwise. Missing
/// ones are skipped.
pub const DEFAULT_INCLUDE: &[&str] = &["README.md", "LICENSE"];

/// Archive filename for a release: `<name>_<tag>_<triple>.tar.gz`.
pub fn archive_name(name: &str, tag: &str, triple: &TargetTriple) -> String {
    format!("{}_{}_{}.tar.gz", name, tag, triple)
}

/// What to package.
#[derive(Debug, Clone, Copy)]
pub struct PackageRequest<'a> {
    /// The built binary
    pub binary: &'a Path,
    /// Release name, used for the archive name and the binary's entry
    pub name: &'a str,
    /// Release tag
    pub tag: &'a str,
    /// Target triple the binary was built for
    pub triple: &'a TargetTriple,
    /// Directory auxiliary files are looked up in
    pub source_dir: &'a Path,
    /// Directory the archive and checksum are exported to
    pub output_dir: &'a Path,
}

/// Archives a binary and exports it with a checksum.
pub trait Packager {
    fn package(&self, request: &PackageRequest<'_>) -> Result<Artifact, PipelineError>;
}

/// Packages into a reproducible `.tar.gz`.
#[derive(Debug, Clone)]
pub struct TarGzPackager {
    staging_dir: PathBuf,
    include: Vec<String>,
    require_include: bool,
}

impl TarGzPackager {
    /// Create a packager staging archives under `staging_dir`.
    pub fn new(staging_dir: impl Into<PathBuf>) -> Self {
        TarGzPackager {
            staging_dir: staging_dir.into(),
            include: DEFAULT_INCLUDE.iter().map(|s| s.to_string()).collect(),
            require_include: false,
        }
    }

    /// Set the auxiliary files packed next to the binary.
    ///
    /// Unlike the defaults, every literal name given here must exist.
    pub fn with_include(mut self, include: Vec<String>) -> Self {
        self.include = include;
        self.require_include = true;
        self
    }

    /// Resolve the include list to `(entry name, file)` pairs.
    ///
    /// Configured literal names must exist; glob patterns may match nothing.
    fn resolve_includes(&self, source_dir: &Path) -> Result<Vec<(PathBuf, PathBuf)>> {
        let mut files = Vec::new();

        for pattern in &self.include {
            if is_glob(pattern) {
                for path in glob_files(source_dir, std::slice::from_ref(pattern))? {
                    let rel = path.strip_prefix(source_dir).unwrap_or(&path).to_path_buf();
                    files.push((rel, path));
                }
            } else {
                let path = source_dir.join(pattern);
                if !path.is_file() {
                    if self.require_include {
                        bail!(
                            "release file `{}` not found in {}",
                            pattern,
                            source_dir.display()
                        );
                    }
                    tracing::debug!("skipping missing {}", path.display());
                    continue;
                }
                files.push((PathBuf::from(pattern), path));
            }
        }

        let mut seen = std::collections::HashSet::new();
        files.retain(|(rel, _)| seen.insert(rel.clone()));
        Ok(files)
    }

    fn stage(&self, request: &PackageRequest<'_>) -> Result<(PathBuf, PathBuf)> {
        let staging = self.staging_dir.join(request.triple.as_str());
        remove_dir_all_if_exists(&staging)?;
        ensure_dir(&staging)?;

        let mut entries = vec![(PathBuf::from(request.name), request.binary.to_path_buf(), 0o755)];
        entries.extend(
            self.resolve_includes(request.source_dir)?
                .into_iter()
                .filter(|(rel, _)| rel != Path::new(request.name))
                .map(|(rel, path)| (rel, path, 0o644)),
        );

        let archive = staging.join(archive_name(request.name, request.tag, request.triple));
        write_archive(&archive, &entries)?;
        let sum = checksum::write(&archive)?;

        Ok((archive, sum))
    }
}

impl Packager for TarGzPackager {
    fn package(&self, request: &PackageRequest<'_>) -> Result<Artifact, PipelineError> {
        let (archive, sum) = self
            .stage(request)
            .map_err(|e| PipelineError::packaging(request.binary, &e))?;

        let archive_path = export(&archive, request.output_dir)
            .map_err(|e| PipelineError::packaging(&archive, &e))?;
        let checksum_path = match export(&sum, request.output_dir) {
            Ok(path) => path,
            Err(e) => {
                remove_exported(&archive_path);
                remove_exported(&checksum::checksum_path(&archive_path));
                return Err(PipelineError::packaging(&sum, &e));
            }
        };

        tracing::info!("Packaged {}", archive_path.display());

        Ok(Artifact {
            binary_path: request.binary.to_path_buf(),
            archive_path,
            checksum_path,
        })
    }
}

/// Write a gzip-compressed tar with normalized headers.
///
/// Entries are written in the given order with mtime 0, uid/gid 0 and the
/// given mode, so the same inputs always produce the same bytes.
pub fn write_archive(dest: &Path, entries: &[(PathBuf, PathBuf, u32)]) -> Result<()> {
    let file =
        File::create(dest).with_context(|| format!("failed to create {}", dest.display()))?;
    let encoder = GzEncoder::new(BufWriter::new(file), Compression::default());
    let mut builder = tar::Builder::new(encoder);

    for (name, path, mode) in entries {
        let data = fs::read(path).with_context(|| format!("failed to read {}", path.display()))?;

        let mut header = Header::new_gnu();
        header.set_entry_type(EntryType::Regular);
        header.set_size(data.len() as u64);
        header.set_mode(*mode);
        header.set_mtime(0);
        header.set_uid(0);
        header.set_gid(0);
        builder
            .append_data(&mut header, name, data.as_slice())
            .with_context(|| format!("failed to add {} to archive", name.display()))?;
    }

    let mut writer = builder
        .into_inner()
        .context("failed to finish tar stream")?
        .finish()
        .context("failed to finish gzip stream")?;
    writer
        .flush()
        .with_context(|| format!("failed to write {}", dest.display()))?;

    Ok(())
}

/// Copy `file` into `output_dir`, replacing any previous export atomically.
fn export(file: &Path, output_dir: &Path) -> Result<PathBuf> {
    ensure_dir(output_dir)?;
    let name = file
        .file_name()
        .with_context(|| format!("no file name: {}", file.display()))?;
    let dest = output_dir.join(name);

    let tmp = tempfile::NamedTempFile::new_in(output_dir)
        .with_context(|| format!("failed to create temp file in {}", output_dir.display()))?;
    fs::copy(file, tmp.path())
        .with_context(|| format!("failed to copy {}", file.display()))?;
    tmp.persist(&dest)
        .with_context(|| format!("failed to export {}", dest.display()))?;

    Ok(dest)
}

fn remove_exported(path: &Path) {
    match fs::remove_file(path) {
        Ok(()) => tracing::debug!("Removed {}", path.display()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => tracing::warn!("failed to remove {}: {}", path.display(), e),
    }
}
