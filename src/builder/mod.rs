//! Build environment and toolchain invocation.
//!
//! [`environment`] derives the exact flags and variables for a target;
//! [`executor`] hands them to the toolchain.

pub mod environment;
pub mod executor;

pub use environment::BuildEnvironment;
pub use executor::{BuildExecutor, BuildRequest, CargoExecutor};
