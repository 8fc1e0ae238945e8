//! Foreign-architecture packages.
//!
//! A `ForeignPackage` names one version-pinned Debian binary package for a
//! specific architecture. Pinning the version (and optionally the SHA-256)
//! makes staging reproducible: the same package always yields the same bytes.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A version-pinned Debian binary package for one architecture.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ForeignPackage {
    /// Binary package name (e.g. "libasound2-dev")
    pub name: String,

    /// Full Debian version, including any epoch (e.g. "1:2.44-1+deb11u1")
    pub version: String,

    /// Debian architecture (e.g. "arm64", "armhf")
    pub arch: String,

    /// Source package the binary is built from, used for the pool path
    pub source: String,

    /// Expected SHA-256 of the `.deb`, if pinned
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sha256: Option<String>,
}

impl ForeignPackage {
    /// Create a new package reference.
    pub fn new(
        name: impl Into<String>,
        version: impl Into<String>,
        arch: impl Into<String>,
        source: impl Into<String>,
    ) -> Self {
        ForeignPackage {
            name: name.into(),
            version: version.into(),
            arch: arch.into(),
            source: source.into(),
            sha256: None,
        }
    }

    /// Pin the expected SHA-256 of the package archive.
    pub fn with_sha256(mut self, sha256: impl Into<String>) -> Self {
        self.sha256 = Some(sha256.into());
        self
    }

    /// The `name:arch` identifier used in logs and errors.
    pub fn id(&self) -> String {
        format!("{}:{}", self.name, self.arch)
    }

    /// The version without its epoch, as used in archive filenames.
    pub fn upstream_version(&self) -> &str {
        match self.version.split_once(':') {
            Some((_, rest)) => rest,
            None => &self.version,
        }
    }

    /// The `.deb` filename in the archive pool.
    pub fn filename(&self) -> String {
        format!("{}_{}_{}.deb", self.name, self.upstream_version(), self.arch)
    }

    /// Path of the `.deb` relative to the mirror root.
    ///
    /// `pool/main/<prefix>/<source>/<filename>`
    pub fn pool_path(&self) -> String {
        format!(
            "pool/main/{}/{}/{}",
            pool_prefix(&self.source),
            self.source,
            self.filename()
        )
    }
}

impl fmt::Display for ForeignPackage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.id(), self.version)
    }
}

/// The pool directory for a source package.
///
/// Sources starting with `lib` are split further by their fourth letter.
pub fn pool_prefix(source: &str) -> String {
    if let Some(rest) = source.strip_prefix("lib") {
        if let Some(c) = rest.chars().next() {
            return format!("lib{}", c);
        }
    }
    source.chars().next().map(String::from).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filename_drops_epoch() {
        let pkg = ForeignPackage::new("libcap2", "1:2.44-1+deb11u1", "arm64", "libcap2");
        assert_eq!(pkg.filename(), "libcap2_2.44-1+deb11u1_arm64.deb");
        assert_eq!(pkg.id(), "libcap2:arm64");
    }

    #[test]
    fn test_pool_path() {
        let alsa = ForeignPackage::new("libasound2", "1.2.4-1.1", "armhf", "alsa-lib");
        assert_eq!(
            alsa.pool_path(),
            "pool/main/a/alsa-lib/libasound2_1.2.4-1.1_armhf.deb"
        );

        let zstd = ForeignPackage::new("libzstd-dev", "1.4.8+dfsg-2.1", "arm64", "libzstd");
        assert_eq!(
            zstd.pool_path(),
            "pool/main/libz/libzstd/libzstd-dev_1.4.8+dfsg-2.1_arm64.deb"
        );
    }

    #[test]
    fn test_pool_prefix() {
        assert_eq!(pool_prefix("systemd"), "s");
        assert_eq!(pool_prefix("libgcrypt20"), "libg");
        assert_eq!(pool_prefix("lib"), "l");
        assert_eq!(pool_prefix(""), "");
    }
}
