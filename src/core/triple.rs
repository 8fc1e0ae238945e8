//! Target triple identifiers.
//!
//! A triple names the machine, vendor, OS and ABI a binary is compiled for
//! (e.g. `aarch64-unknown-linux-gnu`). Triples are plain lookup keys: parsing
//! never fails, and the components are only split out for display and for
//! deriving Debian architecture names.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// The triple of the build host. Unknown triples resolve to this one.
pub const NATIVE_TRIPLE: &str = "x86_64-unknown-linux-gnu";

/// A target triple string (e.g. "armv7-unknown-linux-gnueabihf").
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TargetTriple(String);

impl TargetTriple {
    /// Create a new target triple. Surrounding whitespace is dropped.
    pub fn new(triple: impl Into<String>) -> Self {
        let triple = triple.into();
        TargetTriple(triple.trim().to_string())
    }

    /// The triple of the build host.
    pub fn native() -> Self {
        TargetTriple(NATIVE_TRIPLE.to_string())
    }

    /// Get the triple as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Check if the triple is empty.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Check if the triple can name a directory of its own.
    ///
    /// Empty triples, `.`/`..` and anything with a path separator would
    /// alias or escape the per-triple directories.
    pub fn is_path_safe(&self) -> bool {
        !self.0.is_empty()
            && self.0 != "."
            && self.0 != ".."
            && !self.0.contains(['/', '\\'])
    }

    /// Check if this is the native triple.
    pub fn is_native(&self) -> bool {
        self.0 == NATIVE_TRIPLE
    }

    /// Get the architecture component.
    pub fn arch(&self) -> Option<&str> {
        self.component(0)
    }

    /// Get the vendor component.
    pub fn vendor(&self) -> Option<&str> {
        self.component(1)
    }

    /// Get the OS component.
    pub fn os(&self) -> Option<&str> {
        self.component(2)
    }

    /// Get the ABI/environment component, if present.
    pub fn abi(&self) -> Option<&str> {
        self.component(3)
    }

    fn component(&self, index: usize) -> Option<&str> {
        self.0.split('-').nth(index).filter(|s| !s.is_empty())
    }
}

impl Default for TargetTriple {
    fn default() -> Self {
        TargetTriple::native()
    }
}

impl FromStr for TargetTriple {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(TargetTriple::new(s))
    }
}

impl From<&str> for TargetTriple {
    fn from(s: &str) -> Self {
        TargetTriple::new(s)
    }
}

impl fmt::Display for TargetTriple {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
