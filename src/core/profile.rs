//! Target profiles and the static target table.
//!
//! All target-specific knowledge lives in [`TARGETS`]: which cross linker to
//! use, where it should look for libraries, which extra libraries to link and
//! which foreign packages must be staged into the sysroot. Adding a target is
//! a table edit.
//!
//! [`resolve`] is total: every triple maps to a profile. Triples missing from
//! the table fall back to the native profile rather than being rejected.

use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::core::package::ForeignPackage;
use crate::core::triple::{TargetTriple, NATIVE_TRIPLE};

/// A linker library search path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "path", rename_all = "lowercase")]
pub enum SearchPath {
    /// An absolute path on the build host (e.g. the cross libc)
    Host(PathBuf),

    /// A path inside the staged sysroot, relative to its root
    Sysroot(PathBuf),
}

impl SearchPath {
    /// Resolve to a concrete path, joining sysroot-relative entries onto `sysroot`.
    pub fn resolve(&self, sysroot: &Path) -> PathBuf {
        match self {
            SearchPath::Host(path) => path.clone(),
            SearchPath::Sysroot(path) => sysroot.join(path),
        }
    }
}

/// Resolved, target-specific build configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TargetProfile {
    /// The triple this profile builds for
    pub triple: TargetTriple,

    /// Cross linker binary (None = native linker)
    pub linker: Option<String>,

    /// Linker library search paths, in order
    pub search_paths: Vec<SearchPath>,

    /// Extra libraries passed to the linker as `-l<name>`
    pub link_libs: Vec<String>,

    /// Include directory inside the sysroot
    pub include_path: PathBuf,

    /// Whether pkg-config may resolve libraries for a foreign target
    pub cross_compile: bool,

    /// Foreign packages to stage, in table order
    pub packages: Vec<ForeignPackage>,
}

impl TargetProfile {
    /// The native profile: no linker override, no foreign packages.
    pub fn native() -> Self {
        TargetProfile {
            triple: TargetTriple::native(),
            linker: None,
            search_paths: Vec::new(),
            link_libs: Vec::new(),
            include_path: PathBuf::from(DEFAULT_INCLUDE_PATH),
            cross_compile: false,
            packages: Vec::new(),
        }
    }

    /// Check if this profile needs a staged sysroot.
    pub fn needs_sysroot(&self) -> bool {
        !self.packages.is_empty()
    }

    fn from_spec(spec: &TargetSpec) -> Self {
        let Some(linker) = spec.linker else {
            return TargetProfile {
                triple: TargetTriple::new(spec.triple),
                ..TargetProfile::native()
            };
        };

        let search_paths = vec![
            SearchPath::Host(PathBuf::from(format!("/usr/{}/lib", spec.multiarch))),
            SearchPath::Sysroot(PathBuf::from(format!("usr/lib/{}", spec.multiarch))),
            SearchPath::Sysroot(PathBuf::from(format!("lib/{}", spec.multiarch))),
        ];

        let packages = BULLSEYE_PACKAGES
            .iter()
            .map(|(name, version, source)| {
                ForeignPackage::new(*name, *version, spec.deb_arch, *source)
            })
            .collect();

        TargetProfile {
            triple: TargetTriple::new(spec.triple),
            linker: Some(linker.to_string()),
            search_paths,
            link_libs: LINK_LIBS.iter().map(|s| s.to_string()).collect(),
            include_path: PathBuf::from("usr/include"),
            cross_compile: true,
            packages,
        }
    }
}

/// Include directory used when not cross-compiling.
pub const DEFAULT_INCLUDE_PATH: &str = "/usr/include";

/// One row of the target table.
#[derive(Debug, Clone, Copy)]
pub struct TargetSpec {
    /// Rust target triple
    pub triple: &'static str,
    /// Cross linker, None for the native target
    pub linker: Option<&'static str>,
    /// Debian architecture of the foreign packages
    pub deb_arch: &'static str,
    /// Debian multiarch tuple (library directory name)
    pub multiarch: &'static str,
}

/// Supported targets.
pub const TARGETS: &[TargetSpec] = &[
    TargetSpec {
        triple: NATIVE_TRIPLE,
        linker: None,
        deb_arch: "amd64",
        multiarch: "x86_64-linux-gnu",
    },
    TargetSpec {
        triple: "aarch64-unknown-linux-gnu",
        linker: Some("aarch64-linux-gnu-gcc"),
        deb_arch: "arm64",
        multiarch: "aarch64-linux-gnu",
    },
    TargetSpec {
        triple: "armv7-unknown-linux-gnueabihf",
        linker: Some("arm-linux-gnueabihf-gcc"),
        deb_arch: "armhf",
        multiarch: "arm-linux-gnueabihf",
    },
];

/// Libraries the systemd/journal stack pulls in at link time.
const LINK_LIBS: &[&str] = &[
    "systemd", "cap", "gcrypt", "gpg-error", "lz4", "lzma", "psx", "xxhash", "zstd",
];

/// Debian bullseye packages staged for every foreign target:
/// (binary package, version, source package).
///
/// The exact Debian version is the reproducibility guarantee: a pool file
/// for a given name, version and architecture never changes once
/// published. No SHA-256 pins are carried here, so the mirror is trusted
/// for integrity; [`ForeignPackage::with_sha256`] adds a pin where a
/// stronger check is wanted.
const BULLSEYE_PACKAGES: &[(&str, &str, &str)] = &[
    ("libasound2", "1.2.4-1.1", "alsa-lib"),
    ("libasound2-dev", "1.2.4-1.1", "alsa-lib"),
    ("libdbus-1-dev", "1.12.28-0+deb11u1", "dbus"),
    ("libdbus-1-3", "1.12.28-0+deb11u1", "dbus"),
    ("libsystemd-dev", "247.3-7+deb11u7", "systemd"),
    ("libsystemd0", "247.3-7+deb11u7", "systemd"),
    ("libcap2", "1:2.44-1+deb11u1", "libcap2"),
    ("libcap-dev", "1:2.44-1+deb11u1", "libcap2"),
    ("libgcrypt20", "1.8.7-6", "libgcrypt20"),
    ("libgcrypt20-dev", "1.8.7-6", "libgcrypt20"),
    ("libgpg-error0", "1.38-2", "libgpg-error"),
    ("libgpg-error-dev", "1.38-2", "libgpg-error"),
    ("liblz4-1", "1.9.3-2", "lz4"),
    ("liblz4-dev", "1.9.3-2", "lz4"),
    ("libxxhash0", "0.8.0-2", "xxhash"),
    ("libxxhash-dev", "0.8.0-2", "xxhash"),
    ("liblzma5", "5.2.5-2.1~deb11u1", "xz-utils"),
    ("liblzma-dev", "5.2.5-2.1~deb11u1", "xz-utils"),
    ("libzstd1", "1.4.8+dfsg-2.1", "libzstd"),
    ("libzstd-dev", "1.4.8+dfsg-2.1", "libzstd"),
];

/// Look up a triple in the target table.
///
/// Returns `None` for triples the table does not list.
pub fn lookup(triple: &TargetTriple) -> Option<TargetProfile> {
    TARGETS
        .iter()
        .find(|spec| spec.triple == triple.as_str())
        .map(TargetProfile::from_spec)
}

/// Resolve a triple to its profile.
///
/// Never fails: empty and unknown triples resolve to the native profile.
/// Performs no I/O.
pub fn resolve(triple: &TargetTriple) -> TargetProfile {
    if triple.is_empty() {
        return TargetProfile::native();
    }

    match lookup(triple) {
        Some(profile) => profile,
        None => {
            tracing::warn!(
                "no profile for target `{}`, falling back to native `{}`",
                triple,
                NATIVE_TRIPLE
            );
            TargetProfile::native()
        }
    }
}

/// All triples in the target table.
pub fn supported_triples() -> impl Iterator<Item = TargetTriple> {
    TARGETS.iter().map(|spec| TargetTriple::new(spec.triple))
}
