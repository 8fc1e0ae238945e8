//! CLI definitions using clap.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use clap_complete::Shell;

use crossdock::ops::DEFAULT_TAG;

/// crossdock - build and package a Rust binary for several Linux targets
#[derive(Parser)]
#[command(name = "crossdock")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Build the project for a target and package it with a checksum
    Release(ReleaseArgs),

    /// Run the project's tests
    Test(TestArgs),

    /// List supported target triples
    Targets(TargetsArgs),

    /// Print the build environment for a target
    Env(EnvArgs),

    /// Check the host toolchain for a target
    Doctor(DoctorArgs),

    /// List runnable jobs
    Jobs,

    /// Remove staged sysroots and packaging leftovers
    Clean(CleanArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

#[derive(Args)]
pub struct ReleaseArgs {
    /// Target triple (defaults to the native triple)
    #[arg(long, env = "TARGET")]
    pub target: Option<String>,

    /// Release tag
    #[arg(long, env = "TAG", default_value = DEFAULT_TAG)]
    pub tag: String,

    /// Source directory (defaults to the current directory)
    #[arg(long)]
    pub source: Option<PathBuf>,

    /// Output directory for the archive and checksum
    #[arg(long)]
    pub output: Option<PathBuf>,

    /// Binary name (defaults to the package name in Cargo.toml)
    #[arg(long)]
    pub name: Option<String>,

    /// Debian mirror to download packages from
    #[arg(long)]
    pub mirror: Option<String>,

    /// Only use cached packages
    #[arg(long)]
    pub offline: bool,
}

#[derive(Args)]
pub struct TestArgs {
    /// Source directory (defaults to the current directory)
    #[arg(long)]
    pub source: Option<PathBuf>,

    /// Options passed to `cargo test`
    #[arg(last = true)]
    pub args: Vec<String>,
}

#[derive(Args)]
pub struct TargetsArgs {
    /// Print full profiles as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Args)]
pub struct EnvArgs {
    /// Target triple (defaults to the native triple)
    #[arg(long, env = "TARGET")]
    pub target: Option<String>,

    /// Sysroot path (defaults to the project's staging directory)
    #[arg(long)]
    pub sysroot: Option<PathBuf>,

    /// Print as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Args)]
pub struct DoctorArgs {
    /// Target triple to check the host for
    #[arg(long, env = "TARGET")]
    pub target: Option<String>,
}

#[derive(Args)]
pub struct CleanArgs {
    /// Also remove the package cache and build artifacts
    #[arg(long)]
    pub cache: bool,
}

#[derive(Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    #[arg(value_enum)]
    pub shell: Shell,
}
