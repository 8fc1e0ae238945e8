//! Command implementations

pub mod clean;
pub mod completions;
pub mod doctor;
pub mod env;
pub mod jobs;
pub mod release;
pub mod targets;

use crossdock::core::TargetTriple;

/// The triple from `--target`/`TARGET`, or the native triple.
pub fn target_triple(target: Option<String>) -> TargetTriple {
    target.map(TargetTriple::new).unwrap_or_default()
}
