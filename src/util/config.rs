//! Configuration file support for crossdock.
//!
//! crossdock reads two configuration file locations:
//! - Global: `~/.crossdock/config.toml` - User-wide defaults
//! - Project: `.crossdock/config.toml` - Project-specific overrides
//!
//! Project config takes precedence over global config. The target triple and
//! release tag are not file settings; they come from `--target`/`TARGET` and
//! `--tag`/`TAG`.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// crossdock configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Release packaging settings
    pub release: ReleaseConfig,

    /// Package fetching settings
    pub fetch: FetchConfig,

    /// Build settings
    pub build: BuildConfig,
}

/// Release packaging configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReleaseConfig {
    /// Binary (and archive) name; defaults to `[package].name` of the source
    pub name: Option<String>,

    /// Auxiliary files to pack next to the binary (glob patterns allowed).
    /// When unset, `README.md` and `LICENSE` are packed if present.
    pub include: Option<Vec<String>>,

    /// Directory the archive and checksum are exported to
    pub output_dir: Option<PathBuf>,
}

/// Package fetching configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FetchConfig {
    /// Debian mirror root
    pub mirror: Option<String>,

    /// Offline mode (only use cached packages)
    #[serde(default)]
    pub offline: bool,
}

/// Build configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BuildConfig {
    /// Root of the package cache and per-triple target directories
    pub cache_dir: Option<PathBuf>,
}

impl Config {
    /// Load configuration from a file.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file: {}", path.display()))?;

        toml::from_str(&contents)
            .with_context(|| format!("failed to parse config file: {}", path.display()))
    }

    /// Load configuration with fallback to defaults if file doesn't exist.
    pub fn load_or_default(path: &Path) -> Self {
        if path.exists() {
            Self::load(path).unwrap_or_else(|e| {
                tracing::warn!("Failed to load config from {}: {:#}", path.display(), e);
                Self::default()
            })
        } else {
            Self::default()
        }
    }

    /// Merge another config into this one (other takes precedence).
    pub fn merge(&mut self, other: Config) {
        if other.release.name.is_some() {
            self.release.name = other.release.name;
        }
        if other.release.include.is_some() {
            self.release.include = other.release.include;
        }
        if other.release.output_dir.is_some() {
            self.release.output_dir = other.release.output_dir;
        }

        if other.fetch.mirror.is_some() {
            self.fetch.mirror = other.fetch.mirror;
        }
        if other.fetch.offline {
            self.fetch.offline = true;
        }

        if other.build.cache_dir.is_some() {
            self.build.cache_dir = other.build.cache_dir;
        }
    }
}

/// Load merged configuration from global and project locations.
///
/// Order of precedence (highest to lowest):
/// 1. Project config (.crossdock/config.toml)
/// 2. Global config (~/.crossdock/config.toml)
/// 3. Defaults
pub fn load_config(global_path: &Path, project_path: &Path) -> Config {
    let mut config = Config::default();

    if global_path.exists() {
        config.merge(Config::load_or_default(global_path));
    }

    if project_path.exists() {
        config.merge(Config::load_or_default(project_path));
    }

    config
}

/// Get the global crossdock config directory (~/.crossdock).
pub fn global_config_dir() -> Option<PathBuf> {
    directories::BaseDirs::new().map(|b| b.home_dir().join(".crossdock"))
}

/// Get the project config path (.crossdock/config.toml).
pub fn project_config_path(project_root: &Path) -> PathBuf {
    project_root.join(".crossdock").join("config.toml")
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_config_default() {
        let config = Config::default();
        assert!(config.release.name.is_none());
        assert!(!config.fetch.offline);
        assert!(config.release.include.is_none());
    }

    #[test]
    fn test_config_load() {
        let tmp = TempDir::new().unwrap();
        let config_path = tmp.path().join("config.toml");

        std::fs::write(
            &config_path,
            r#"
[release]
name = "tunein"
include = ["README.md", "LICENSE", "docs/*.md"]
output_dir = "dist"

[fetch]
mirror = "https://mirror.example.org/debian"
offline = true

[build]
cache_dir = "/var/cache/crossdock"
"#,
        )
        .unwrap();

        let config = Config::load(&config_path).unwrap();
        assert_eq!(config.release.name.as_deref(), Some("tunein"));
        assert_eq!(config.release.include.as_ref().map(Vec::len), Some(3));
        assert_eq!(config.release.output_dir, Some(PathBuf::from("dist")));
        assert_eq!(
            config.fetch.mirror.as_deref(),
            Some("https://mirror.example.org/debian")
        );
        assert!(config.fetch.offline);
        assert_eq!(
            config.build.cache_dir,
            Some(PathBuf::from("/var/cache/crossdock"))
        );
    }

    #[test]
    fn test_config_merge() {
        let mut base = Config::default();
        base.release.name = Some("tunein".to_string());
        base.fetch.mirror = Some("https://a.example".to_string());

        let mut override_cfg = Config::default();
        override_cfg.fetch.mirror = Some("https://b.example".to_string());

        base.merge(override_cfg);

        assert_eq!(base.fetch.mirror.as_deref(), Some("https://b.example"));
        assert_eq!(base.release.name.as_deref(), Some("tunein")); // Not overridden
    }

    #[test]
    fn test_load_config_precedence() {
        let tmp = TempDir::new().unwrap();
        let global_path = tmp.path().join("global.toml");
        let project_path = tmp.path().join("project.toml");

        std::fs::write(
            &global_path,
            "[release]\nname = \"global\"\ninclude = [\"README.md\"]\n",
        )
        .unwrap();
        std::fs::write(&project_path, "[release]\nname = \"project\"\n").unwrap();

        let config = load_config(&global_path, &project_path);
        assert_eq!(config.release.name.as_deref(), Some("project"));
        assert_eq!(config.release.include, Some(vec!["README.md".to_string()]));
    }

    #[test]
    fn test_invalid_config_falls_back_to_default() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("config.toml");
        std::fs::write(&path, "[release\nname = ").unwrap();

        assert_eq!(Config::load_or_default(&path), Config::default());
    }
}
