//! crossdock - cross-target build and release orchestration
//!
//! This crate resolves a target triple to its cross-compilation profile,
//! stages the foreign-architecture libraries the target needs into a
//! sysroot, derives the toolchain environment, and packages the built
//! binary with a verifiable checksum.

pub mod builder;
pub mod core;
pub mod errors;
pub mod ops;
pub mod release;
pub mod sysroot;
pub mod util;

/// Test fixtures for crossdock unit tests.
///
/// This module is only available when compiling with `--cfg test`. It
/// provides in-memory archive builders and scripted fetcher and executor
/// implementations.
#[cfg(test)]
pub mod test_support;

pub use builder::{BuildEnvironment, BuildExecutor, CargoExecutor};
pub use core::{resolve, TargetProfile, TargetTriple};
pub use errors::{PipelineError, Stage};
pub use release::{Artifact, Packager, TarGzPackager};
pub use sysroot::{stage, PackageFetcher, StagedSysroot};
pub use util::context::GlobalContext;
