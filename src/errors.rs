//! Pipeline error types.
//!
//! Every fatal error names the stage that failed and the offending
//! identifier (package, command or path). There is no partial success:
//! any of these aborts the whole invocation.

use std::fmt;
use std::path::PathBuf;

use miette::Diagnostic;
use thiserror::Error;

/// A step of the release pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Resolve,
    Stage,
    Build,
    Package,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stage::Resolve => write!(f, "resolve"),
            Stage::Stage => write!(f, "stage"),
            Stage::Build => write!(f, "build"),
            Stage::Package => write!(f, "package"),
        }
    }
}

/// Fatal error during a release invocation.
#[derive(Debug, Error, Diagnostic)]
pub enum PipelineError {
    #[error("target `{triple}` cannot be used as a directory name")]
    #[diagnostic(code(crossdock::resolve::invalid_target))]
    InvalidTarget { triple: String },

    #[error("failed to fetch package `{package}`")]
    #[diagnostic(
        code(crossdock::stage::fetch),
        help("Check the mirror URL and your network connection, then rerun the release")
    )]
    Fetch {
        package: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("failed to extract package `{package}`: {reason}")]
    #[diagnostic(code(crossdock::stage::extract))]
    Extraction { package: String, reason: String },

    #[error("build command failed: `{command}`\n{output}")]
    #[diagnostic(
        code(crossdock::build::failed),
        help("Run `crossdock doctor --target <triple>` to check the cross toolchain")
    )]
    Build { command: String, output: String },

    #[error("failed to package `{}`: {reason}", path.display())]
    #[diagnostic(code(crossdock::package::failed))]
    Packaging { path: PathBuf, reason: String },

    #[error(
        "checksum mismatch for `{}`:\n  expected: {expected}\n  actual:   {actual}",
        archive.display()
    )]
    #[diagnostic(code(crossdock::package::checksum))]
    ChecksumMismatch {
        archive: PathBuf,
        expected: String,
        actual: String,
    },
}

impl PipelineError {
    /// The stage this error aborted.
    pub fn stage(&self) -> Stage {
        match self {
            PipelineError::InvalidTarget { .. } => Stage::Resolve,
            PipelineError::Fetch { .. } | PipelineError::Extraction { .. } => Stage::Stage,
            PipelineError::Build { .. } => Stage::Build,
            PipelineError::Packaging { .. } | PipelineError::ChecksumMismatch { .. } => {
                Stage::Package
            }
        }
    }

    /// Build an extraction error from any error chain.
    pub fn extraction(package: impl Into<String>, err: &anyhow::Error) -> Self {
        PipelineError::Extraction {
            package: package.into(),
            reason: format!("{:#}", err),
        }
    }

    /// Build a packaging error from any error chain.
    pub fn packaging(path: impl Into<PathBuf>, err: &anyhow::Error) -> Self {
        PipelineError::Packaging {
            path: path.into(),
            reason: format!("{:#}", err),
        }
    }
}
