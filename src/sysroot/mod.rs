//! Foreign-architecture sysroot assembly.
//!
//! Packages are fetched through an injected [`PackageFetcher`], read as
//! Debian archives and unpacked into one shared root per build.

pub mod deb;
pub mod extract;
pub mod fetch;
pub mod stager;

pub use fetch::{CachedFetcher, HttpFetcher, PackageFetcher, DEFAULT_MIRROR};
pub use stager::{stage, StagedPackage, StagedSysroot};
