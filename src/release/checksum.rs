//! Checksum files.
//!
//! Uses the two-column format understood by `sha256sum -c`:
//!
//! ```text
//! 9f86d081884c7d659a2feaa0c55ad015a3bf4f1b2b0b822cd15d6c15b0f00a08  tunein_v1.2.0_aarch64-unknown-linux-gnu.tar.gz
//! ```
//!
//! The digest is always SHA-256 over the archive bytes.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};

use crate::errors::PipelineError;
use crate::util::fs::{read_to_string, write_string};
use crate::util::hash::sha256_file;

/// Extension appended to the archive filename.
pub const CHECKSUM_EXTENSION: &str = "sha256";

/// One parsed checksum line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChecksumEntry {
    /// Lowercase hex digest
    pub digest: String,
    /// Filename the digest applies to
    pub filename: String,
}

impl ChecksumEntry {
    /// Render as a checksum file line, including the trailing newline.
    pub fn render(&self) -> String {
        format!("{}  {}\n", self.digest, self.filename)
    }
}

/// The checksum file path for an archive (`<archive>.sha256`).
pub fn checksum_path(archive: &Path) -> PathBuf {
    let mut name = archive.as_os_str().to_owned();
    name.push(".");
    name.push(CHECKSUM_EXTENSION);
    PathBuf::from(name)
}

/// Parse the first line of a checksum file.
///
/// Accepts the binary-mode marker (`<hex> *<file>`) as well.
pub fn parse(contents: &str) -> Result<ChecksumEntry> {
    let line = contents
        .lines()
        .find(|l| !l.trim().is_empty())
        .context("checksum file is empty")?;

    let Some((digest, rest)) = line.split_once(' ') else {
        bail!("malformed checksum line: `{}`", line);
    };
    let filename = rest.trim_start_matches(' ').trim_start_matches('*').trim_end();

    if digest.len() != 64 || !digest.chars().all(|c| c.is_ascii_hexdigit()) {
        bail!("malformed SHA-256 digest: `{}`", digest);
    }
    if filename.is_empty() {
        bail!("checksum line has no filename: `{}`", line);
    }

    Ok(ChecksumEntry {
        digest: digest.to_ascii_lowercase(),
        filename: filename.to_string(),
    })
}

/// Hash `archive` and write `<archive>.sha256` next to it.
pub fn write(archive: &Path) -> Result<PathBuf> {
    let filename = archive
        .file_name()
        .with_context(|| format!("archive has no file name: {}", archive.display()))?
        .to_string_lossy()
        .into_owned();

    let entry = ChecksumEntry {
        digest: sha256_file(archive)?,
        filename,
    };

    let path = checksum_path(archive);
    write_string(&path, &entry.render())?;
    Ok(path)
}

/// Check that `checksum_file` names `archive` and matches its bytes.
pub fn verify(archive: &Path, checksum_file: &Path) -> Result<(), PipelineError> {
    let entry = read_to_string(checksum_file)
        .and_then(|contents| parse(&contents))
        .map_err(|e| PipelineError::packaging(checksum_file, &e))?;

    let expected_name = archive
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    if entry.filename != expected_name {
        return Err(PipelineError::Packaging {
            path: checksum_file.to_path_buf(),
            reason: format!(
                "checksum names `{}`, expected `{}`",
                entry.filename, expected_name
            ),
        });
    }

    let actual = sha256_file(archive).map_err(|e| PipelineError::packaging(archive, &e))?;
    if actual != entry.digest {
        return Err(PipelineError::ChecksumMismatch {
            archive: archive.to_path_buf(),
            expected: entry.digest,
            actual,
        });
    }

    tracing::debug!("Verified {} against {}", archive.display(), checksum_file.display());
    Ok(())
}
