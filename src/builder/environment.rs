//! Build environment assembly.
//!
//! Turns a [`TargetProfile`] and a sysroot path into the exact flags and
//! variables handed to the toolchain. The output depends only on its
//! inputs: variables live in a `BTreeMap`, flags keep profile order.

use std::collections::BTreeMap;
use std::path::Path;

use serde::Serialize;

use crate::core::TargetProfile;

/// Variable holding the joined compiler flags.
pub const RUSTFLAGS: &str = "RUSTFLAGS";
/// Variable allowing pkg-config to answer for a foreign target.
pub const PKG_CONFIG_ALLOW_CROSS: &str = "PKG_CONFIG_ALLOW_CROSS";
/// Variable with the C header search path.
pub const C_INCLUDE_PATH: &str = "C_INCLUDE_PATH";
/// Variable with the target triple.
pub const TARGET: &str = "TARGET";

/// Flags and variables for one toolchain invocation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BuildEnvironment {
    /// Compiler flags, in order
    pub flags: Vec<String>,

    /// Environment variables
    pub vars: BTreeMap<String, String>,
}

impl BuildEnvironment {
    /// Build the environment for `profile` against the sysroot at `sysroot`.
    pub fn build(profile: &TargetProfile, sysroot: &Path) -> Self {
        let mut flags = Vec::new();

        if let Some(linker) = &profile.linker {
            flags.extend(
                profile
                    .link_libs
                    .iter()
                    .map(|lib| format!("-Clink-arg=-l{}", lib)),
            );
            flags.push(format!("-Clinker={}", linker));
            flags.extend(
                profile
                    .search_paths
                    .iter()
                    .map(|p| format!("-L{}", p.resolve(sysroot).display())),
            );
        }

        let include_path = if profile.cross_compile {
            sysroot.join(&profile.include_path)
        } else {
            profile.include_path.clone()
        };

        let mut vars = BTreeMap::new();
        vars.insert(RUSTFLAGS.to_string(), flags.join(" "));
        vars.insert(
            PKG_CONFIG_ALLOW_CROSS.to_string(),
            if profile.cross_compile { "1" } else { "0" }.to_string(),
        );
        vars.insert(
            C_INCLUDE_PATH.to_string(),
            include_path.display().to_string(),
        );
        vars.insert(TARGET.to_string(), profile.triple.to_string());

        BuildEnvironment { flags, vars }
    }

    /// Get a variable by name.
    pub fn var(&self, name: &str) -> Option<&str> {
        self.vars.get(name).map(String::as_str)
    }

    /// Iterate over variables in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.vars.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Render as `NAME=value` lines, suitable for a shell `env` file.
    pub fn to_env_lines(&self) -> String {
        let mut out = String::new();
        for (key, value) in self.iter() {
            out.push_str(key);
            out.push('=');
            out.push_str(value);
            out.push('\n');
        }
        out
    }
}

/// Build the environment for `profile` against the sysroot at `sysroot`.
pub fn build(profile: &TargetProfile, sysroot: &Path) -> BuildEnvironment {
    BuildEnvironment::build(profile, sysroot)
}
