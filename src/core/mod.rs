//! Core data structures for crossdock.
//!
//! This module contains the pure, I/O-free part of the pipeline:
//! - Target triples
//! - Foreign package references
//! - Target profiles and the resolver table

pub mod package;
pub mod profile;
pub mod triple;

pub use package::ForeignPackage;
pub use profile::{lookup, resolve, supported_triples, SearchPath, TargetProfile};
pub use triple::{TargetTriple, NATIVE_TRIPLE};
