//! Global context for crossdock operations.
//!
//! Provides centralized access to configuration and paths.
//!
//! ## Layout
//!
//! ```text
//! ~/.crossdock/config.toml           global config
//! <cache>/debs/<arch>/<file>.deb     package cache, shared by all triples
//! <cache>/target/<triple>/           per-triple CARGO_TARGET_DIR
//! <project>/.crossdock/config.toml   project config
//! <project>/.crossdock/work/         sysroots and packaging staging
//! ```

use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use anyhow::{Context, Result};
use directories::ProjectDirs;

use crate::util::config::{self, Config};

/// Project directories for crossdock
static PROJECT_DIRS: LazyLock<Option<ProjectDirs>> =
    LazyLock::new(|| ProjectDirs::from("com", "crossdock", "crossdock"));

/// Global context containing configuration and paths.
#[derive(Debug, Clone)]
pub struct GlobalContext {
    /// Current working directory
    cwd: PathBuf,

    /// Home directory for global crossdock settings (~/.crossdock/)
    home: PathBuf,

    /// Cache root for packages and build artifacts
    cache: PathBuf,
}

impl GlobalContext {
    /// Create a new GlobalContext with defaults.
    pub fn new() -> Result<Self> {
        let cwd = std::env::current_dir().context("failed to get current directory")?;
        Ok(Self::at(cwd))
    }

    /// Create a GlobalContext with a specific working directory.
    pub fn with_cwd(cwd: PathBuf) -> Result<Self> {
        let cwd = if cwd.is_absolute() {
            cwd
        } else {
            std::env::current_dir()
                .context("failed to get current directory")?
                .join(cwd)
        };
        Ok(Self::at(cwd))
    }

    fn at(cwd: PathBuf) -> Self {
        let home = config::global_config_dir().unwrap_or_else(|| cwd.join(".crossdock"));

        let cache = match PROJECT_DIRS.as_ref() {
            Some(dirs) => dirs.cache_dir().to_path_buf(),
            None => home.join("cache"),
        };

        GlobalContext {
            cwd,
            home,
            cache,
        }
    }

    /// Override the cache root.
    pub fn with_cache_dir(mut self, cache: impl Into<PathBuf>) -> Self {
        self.cache = cache.into();
        self
    }

    /// Get the current working directory.
    pub fn cwd(&self) -> &Path {
        &self.cwd
    }

    /// Get the global configuration file path.
    pub fn config_path(&self) -> PathBuf {
        self.home.join("config.toml")
    }

    /// Get the project configuration file path.
    pub fn project_config_path(&self) -> PathBuf {
        config::project_config_path(&self.cwd)
    }

    /// Load the merged global and project configuration.
    ///
    /// A `[build] cache_dir` setting relocates the cache root.
    pub fn load_config(&mut self) -> Config {
        let config = config::load_config(&self.config_path(), &self.project_config_path());
        if let Some(cache) = &config.build.cache_dir {
            self.cache = self.cwd.join(cache);
        }
        config
    }

    /// Get the cache root.
    pub fn cache_dir(&self) -> &Path {
        &self.cache
    }

    /// Get the downloaded package cache directory.
    pub fn package_cache_dir(&self) -> PathBuf {
        self.cache.join("debs")
    }

    /// Get the root of the per-triple cargo target directories.
    pub fn target_root(&self) -> PathBuf {
        self.cache.join("target")
    }

    /// Get the project-local crossdock directory.
    pub fn project_dir(&self) -> PathBuf {
        self.cwd.join(".crossdock")
    }

    /// Get the project-local work directory.
    pub fn work_dir(&self) -> PathBuf {
        self.project_dir().join("work")
    }
}
