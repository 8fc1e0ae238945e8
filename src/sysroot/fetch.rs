//! Package fetching.
//!
//! The stager never downloads anything itself: it is handed a
//! [`PackageFetcher`]. Any closure `Fn(&ForeignPackage) -> Result<Vec<u8>>`
//! is a fetcher, which keeps tests free of network access.
//!
//! Two real fetchers are provided:
//! - [`HttpFetcher`] downloads from a Debian mirror's pool.
//! - [`CachedFetcher`] wraps another fetcher with an on-disk cache store.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{bail, Context, Result};
use url::Url;

use crate::core::ForeignPackage;
use crate::util::hash::sha256_bytes;

/// Default Debian mirror.
pub const DEFAULT_MIRROR: &str = "https://deb.debian.org/debian/";

/// Something that can produce the bytes of a package archive.
pub trait PackageFetcher {
    /// Fetch the `.deb` for `package`.
    fn fetch(&self, package: &ForeignPackage) -> Result<Vec<u8>>;
}

impl<F> PackageFetcher for F
where
    F: Fn(&ForeignPackage) -> Result<Vec<u8>>,
{
    fn fetch(&self, package: &ForeignPackage) -> Result<Vec<u8>> {
        self(package)
    }
}

/// Check a fetched archive against the package's pinned SHA-256, if any.
pub fn verify_pin(package: &ForeignPackage, bytes: &[u8]) -> Result<()> {
    let Some(expected) = &package.sha256 else {
        return Ok(());
    };

    let actual = sha256_bytes(bytes);
    if !actual.eq_ignore_ascii_case(expected) {
        bail!(
            "hash mismatch for {}:\n  expected: {}\n  actual:   {}",
            package.filename(),
            expected,
            actual
        );
    }

    Ok(())
}

/// Downloads packages from a Debian mirror pool.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    mirror: Url,
    client: reqwest::blocking::Client,
}

impl HttpFetcher {
    /// Create a fetcher for the given mirror root.
    pub fn new(mirror: &str) -> Result<Self> {
        // Url::join drops the last segment unless the base ends in '/'
        let mirror = if mirror.ends_with('/') {
            mirror.to_string()
        } else {
            format!("{}/", mirror)
        };
        let mirror =
            Url::parse(&mirror).with_context(|| format!("invalid mirror URL: {}", mirror))?;

        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(300))
            .build()
            .context("failed to create HTTP client")?;

        Ok(HttpFetcher { mirror, client })
    }

    /// The download URL for a package.
    pub fn package_url(&self, package: &ForeignPackage) -> Result<Url> {
        self.mirror
            .join(&package.pool_path())
            .with_context(|| format!("invalid pool path for {}", package.id()))
    }
}

impl PackageFetcher for HttpFetcher {
    fn fetch(&self, package: &ForeignPackage) -> Result<Vec<u8>> {
        let url = self.package_url(package)?;
        tracing::info!("Downloading {} from {}", package.id(), url);

        let response = self
            .client
            .get(url.clone())
            .send()
            .with_context(|| format!("failed to download {}", url))?;

        if !response.status().is_success() {
            bail!("failed to download {}: HTTP {}", url, response.status());
        }

        let bytes = response
            .bytes()
            .with_context(|| format!("failed to read response body from {}", url))?;

        verify_pin(package, &bytes)?;
        Ok(bytes.to_vec())
    }
}

/// A directory-backed package cache in front of another fetcher.
///
/// Archives are stored as `<dir>/<arch>/<filename>`. Filenames carry the
/// pinned version, so a cached file never goes stale. New entries are
/// written to a temporary file and renamed into place, so concurrent
/// invocations sharing the cache only ever observe complete archives.
pub struct CachedFetcher<F> {
    dir: PathBuf,
    inner: F,
    offline: bool,
}

impl<F: PackageFetcher> CachedFetcher<F> {
    /// Create a cache at `dir` backed by `inner`.
    pub fn new(dir: impl Into<PathBuf>, inner: F) -> Self {
        CachedFetcher {
            dir: dir.into(),
            inner,
            offline: false,
        }
    }

    /// Fail on cache misses instead of calling the inner fetcher.
    pub fn offline(mut self, offline: bool) -> Self {
        self.offline = offline;
        self
    }

    /// Get the cache directory.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Where a package is (or would be) cached.
    pub fn cache_path(&self, package: &ForeignPackage) -> PathBuf {
        self.dir.join(&package.arch).join(package.filename())
    }

    fn store(&self, path: &Path, bytes: &[u8]) -> Result<()> {
        let parent = path
            .parent()
            .with_context(|| format!("cache path has no parent: {}", path.display()))?;
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create cache directory: {}", parent.display()))?;

        let mut tmp = tempfile::NamedTempFile::new_in(parent)
            .with_context(|| format!("failed to create temp file in {}", parent.display()))?;
        tmp.write_all(bytes)
            .with_context(|| format!("failed to write {}", tmp.path().display()))?;
        tmp.persist(path)
            .with_context(|| format!("failed to store {}", path.display()))?;

        Ok(())
    }
}

impl<F: PackageFetcher> PackageFetcher for CachedFetcher<F> {
    fn fetch(&self, package: &ForeignPackage) -> Result<Vec<u8>> {
        let path = self.cache_path(package);

        if path.exists() {
            let bytes =
                fs::read(&path).with_context(|| format!("failed to read {}", path.display()))?;
            if verify_pin(package, &bytes).is_ok() {
                tracing::debug!("Using cached {}", path.display());
                return Ok(bytes);
            }
            tracing::warn!("Discarding corrupt cache entry {}", path.display());
        }

        if self.offline {
            bail!(
                "{} is not cached and offline mode is enabled",
                package.filename()
            );
        }

        let bytes = self.inner.fetch(package)?;
        verify_pin(package, &bytes)?;
        self.store(&path, &bytes)?;

        Ok(bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use tempfile::TempDir;

    fn pkg() -> ForeignPackage {
        ForeignPackage::new("libasound2", "1.2.4-1.1", "arm64", "alsa-lib")
    }

    #[test]
    fn test_closure_is_fetcher() {
        let fetcher = |p: &ForeignPackage| -> Result<Vec<u8>> { Ok(p.name.as_bytes().to_vec()) };
        assert_eq!(fetcher.fetch(&pkg()).unwrap(), b"libasound2");
    }

    #[test]
    fn test_package_url() {
        let fetcher = HttpFetcher::new("https://mirror.example.org/debian").unwrap();
        assert_eq!(
            fetcher.package_url(&pkg()).unwrap().as_str(),
            "https://mirror.example.org/debian/pool/main/a/alsa-lib/libasound2_1.2.4-1.1_arm64.deb"
        );
    }

    #[test]
    fn test_verify_pin() {
        let data = b"hello";
        let pinned = pkg().with_sha256(
            "2cf24dba5fb0a30e26e83b2ac5b9e29e1b161e5c1fa7425e73043362938b9824",
        );
        assert!(verify_pin(&pinned, data).is_ok());
        assert!(verify_pin(&pinned, b"tampered").is_err());
        assert!(verify_pin(&pkg(), b"anything").is_ok());
    }

    #[test]
    fn test_cached_fetcher_hits_cache() {
        let tmp = TempDir::new().unwrap();
        let calls = Cell::new(0);
        let inner = |_: &ForeignPackage| -> Result<Vec<u8>> {
            calls.set(calls.get() + 1);
            Ok(b"deb bytes".to_vec())
        };

        let cache = CachedFetcher::new(tmp.path(), inner);
        assert_eq!(cache.fetch(&pkg()).unwrap(), b"deb bytes");
        assert_eq!(cache.fetch(&pkg()).unwrap(), b"deb bytes");
        assert_eq!(calls.get(), 1);
        assert!(tmp
            .path()
            .join("arm64")
            .join("libasound2_1.2.4-1.1_arm64.deb")
            .exists());
    }

    #[test]
    fn test_cached_fetcher_offline_miss() {
        let tmp = TempDir::new().unwrap();
        let inner = |_: &ForeignPackage| -> Result<Vec<u8>> { Ok(Vec::new()) };

        let cache = CachedFetcher::new(tmp.path(), inner).offline(true);
        let err = cache.fetch(&pkg()).unwrap_err();
        assert!(err.to_string().contains("offline"));
    }

    #[test]
    fn test_cached_fetcher_propagates_failure() {
        let tmp = TempDir::new().unwrap();
        let inner = |_: &ForeignPackage| -> Result<Vec<u8>> { bail!("HTTP 404") };

        let cache = CachedFetcher::new(tmp.path(), inner);
        assert!(cache.fetch(&pkg()).is_err());
        assert!(!cache.cache_path(&pkg()).exists());
    }
}
