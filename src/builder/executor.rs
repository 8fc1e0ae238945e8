//! Build execution.
//!
//! The pipeline only knows the [`BuildExecutor`] interface: given a source
//! tree, a triple and a [`BuildEnvironment`], produce a binary. The
//! environment is moved into the executor and must be applied verbatim;
//! an executor never falls back to native flags.
//!
//! [`CargoExecutor`] is the local implementation: `rustup target add`
//! followed by `cargo build --release --target <triple>`.

use std::path::{Path, PathBuf};

use crate::builder::environment::{BuildEnvironment, RUSTFLAGS};
use crate::core::TargetTriple;
use crate::errors::PipelineError;
use crate::util::process::{find_executable, ProcessBuilder};

/// What to build.
#[derive(Debug, Clone, Copy)]
pub struct BuildRequest<'a> {
    /// Root of the source tree (contains `Cargo.toml`)
    pub source_dir: &'a Path,
    /// Triple to build for
    pub triple: &'a TargetTriple,
    /// Name of the binary to produce
    pub bin_name: &'a str,
}

/// Runs the toolchain build for one request.
pub trait BuildExecutor {
    /// Build `request` with `env` applied, returning the path of the binary.
    fn execute(
        &self,
        request: &BuildRequest<'_>,
        env: BuildEnvironment,
    ) -> Result<PathBuf, PipelineError>;
}

/// Builds with the local `cargo` and `rustup`.
#[derive(Debug, Clone)]
pub struct CargoExecutor {
    cargo: PathBuf,
    rustup: Option<PathBuf>,
    target_root: PathBuf,
}

impl CargoExecutor {
    /// Create an executor whose per-triple target directories live under `target_root`.
    pub fn new(target_root: impl Into<PathBuf>) -> Self {
        CargoExecutor {
            cargo: find_executable("cargo").unwrap_or_else(|| PathBuf::from("cargo")),
            rustup: find_executable("rustup"),
            target_root: target_root.into(),
        }
    }

    /// Override the cargo binary.
    pub fn with_cargo(mut self, cargo: impl Into<PathBuf>) -> Self {
        self.cargo = cargo.into();
        self
    }

    /// Override (or disable) the rustup binary.
    pub fn with_rustup(mut self, rustup: Option<PathBuf>) -> Self {
        self.rustup = rustup;
        self
    }

    /// The target directory for a triple.
    ///
    /// Each triple gets its own directory so concurrent builds for different
    /// architectures never share (or lock) build artifacts.
    pub fn target_dir(&self, triple: &TargetTriple) -> PathBuf {
        self.target_root.join(triple.as_str())
    }

    /// The cargo invocation for a request, without running it.
    pub fn build_command(
        &self,
        request: &BuildRequest<'_>,
        env: &BuildEnvironment,
    ) -> ProcessBuilder {
        ProcessBuilder::new(&self.cargo)
            .args(["build", "--release", "--target", request.triple.as_str()])
            .cwd(request.source_dir)
            .envs(env.iter())
            .env(
                "CARGO_TARGET_DIR",
                self.target_dir(request.triple).display().to_string(),
            )
    }

    fn add_target(&self, triple: &TargetTriple) -> Result<(), PipelineError> {
        let Some(rustup) = &self.rustup else {
            tracing::debug!("rustup not found, assuming `{}` is installed", triple);
            return Ok(());
        };

        run(&ProcessBuilder::new(rustup).args(["target", "add", triple.as_str()]))
    }
}

impl BuildExecutor for CargoExecutor {
    fn execute(
        &self,
        request: &BuildRequest<'_>,
        env: BuildEnvironment,
    ) -> Result<PathBuf, PipelineError> {
        self.add_target(request.triple)?;

        let cmd = self.build_command(request, &env);
        tracing::info!("Building {} for {}", request.bin_name, request.triple);
        tracing::debug!("RUSTFLAGS={}", env.var(RUSTFLAGS).unwrap_or_default());
        run(&cmd)?;

        let binary = self
            .target_dir(request.triple)
            .join(request.triple.as_str())
            .join("release")
            .join(request.bin_name);

        if !binary.is_file() {
            return Err(PipelineError::Build {
                command: cmd.display_command(),
                output: format!("expected binary not found at {}", binary.display()),
            });
        }

        Ok(binary)
    }
}

fn run(cmd: &ProcessBuilder) -> Result<(), PipelineError> {
    let output = cmd.exec().map_err(|e| PipelineError::Build {
        command: cmd.display_command(),
        output: format!("{:#}", e),
    })?;

    if !output.status.success() {
        return Err(PipelineError::Build {
            command: cmd.display_command(),
            output: String::from_utf8_lossy(&output.stderr).into_owned(),
        });
    }

    Ok(())
}
