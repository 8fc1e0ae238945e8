//! Test fixtures for crossdock unit tests.
//!
//! Builds the archives the sysroot code consumes (`ar`, `tar`, `.deb`)
//! entirely in memory, and provides scripted stand-ins for the fetcher and
//! executor seams so pipeline tests never touch the network or a toolchain.
//!
//! # Example
//!
//! ```rust,ignore
//! use crossdock::test_support::{DebBuilder, ScriptedFetcher};
//!
//! let fetcher = ScriptedFetcher::new().with(
//!     "libasound2",
//!     DebBuilder::new().file("usr/lib/libasound.so.2", b"ELF").build(),
//! );
//! ```

use std::collections::{HashMap, HashSet};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use anyhow::{bail, Result};
use tar::{EntryType, Header};

use crate::builder::{BuildEnvironment, BuildExecutor, BuildRequest};
use crate::core::{ForeignPackage, TargetTriple};
use crate::errors::PipelineError;
use crate::sysroot::deb::DataCompression;
use crate::sysroot::PackageFetcher;

/// Build a Unix `ar` archive from `(name, data)` members.
pub fn build_ar(members: &[(&str, &[u8])]) -> Vec<u8> {
    let mut out = b"!<arch>\n".to_vec();

    for (name, data) in members {
        let header = format!(
            "{:<16}{:<12}{:<6}{:<6}{:<8}{:<10}`\n",
            name,
            0,
            0,
            0,
            "100644",
            data.len()
        );
        assert_eq!(header.len(), 60, "ar member name too long: {}", name);
        out.extend_from_slice(header.as_bytes());
        out.extend_from_slice(data);
        if data.len() % 2 == 1 {
            out.push(b'\n');
        }
    }

    out
}

#[derive(Debug, Clone)]
enum TarEntry {
    Dir(String),
    File(String, Vec<u8>),
    Symlink(String, String),
    Link(String, String),
    Raw(String, Vec<u8>),
}

/// Builds an uncompressed tar stream with fixed metadata.
#[derive(Debug, Clone, Default)]
pub struct TarBuilder {
    entries: Vec<TarEntry>,
}

impl TarBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn dir(mut self, path: &str) -> Self {
        self.entries.push(TarEntry::Dir(path.to_string()));
        self
    }

    pub fn file(mut self, path: &str, data: &[u8]) -> Self {
        self.entries
            .push(TarEntry::File(path.to_string(), data.to_vec()));
        self
    }

    pub fn symlink(mut self, path: &str, target: &str) -> Self {
        self.entries
            .push(TarEntry::Symlink(path.to_string(), target.to_string()));
        self
    }

    pub fn link(mut self, path: &str, target: &str) -> Self {
        self.entries
            .push(TarEntry::Link(path.to_string(), target.to_string()));
        self
    }

    /// A regular file whose name is written into the header unchecked.
    ///
    /// `tar::Header::set_path` refuses `..` and absolute paths, which are
    /// exactly what extraction tests need to feed in.
    pub fn raw_file(mut self, path: &str, data: &[u8]) -> Self {
        self.entries
            .push(TarEntry::Raw(path.to_string(), data.to_vec()));
        self
    }

    pub fn build(self) -> Vec<u8> {
        let mut builder = tar::Builder::new(Vec::new());

        for entry in self.entries {
            match entry {
                TarEntry::Dir(path) => {
                    let mut header = header(EntryType::Directory, 0o755, 0);
                    builder
                        .append_data(&mut header, path, std::io::empty())
                        .unwrap();
                }
                TarEntry::File(path, data) => {
                    let mut header = header(EntryType::Regular, 0o644, data.len() as u64);
                    builder
                        .append_data(&mut header, path, data.as_slice())
                        .unwrap();
                }
                TarEntry::Symlink(path, target) => {
                    let mut header = header(EntryType::Symlink, 0o777, 0);
                    header.set_link_name(&target).unwrap();
                    builder
                        .append_data(&mut header, path, std::io::empty())
                        .unwrap();
                }
                TarEntry::Link(path, target) => {
                    let mut header = header(EntryType::Link, 0o644, 0);
                    header.set_link_name(&target).unwrap();
                    builder
                        .append_data(&mut header, path, std::io::empty())
                        .unwrap();
                }
                TarEntry::Raw(path, data) => {
                    let mut header = header(EntryType::Regular, 0o644, data.len() as u64);
                    let name = &mut header.as_old_mut().name;
                    name[..path.len()].copy_from_slice(path.as_bytes());
                    header.set_cksum();
                    builder.append(&header, data.as_slice()).unwrap();
                }
            }
        }

        builder.into_inner().unwrap()
    }
}

fn header(entry_type: EntryType, mode: u32, size: u64) -> Header {
    let mut header = Header::new_gnu();
    header.set_entry_type(entry_type);
    header.set_mode(mode);
    header.set_size(size);
    header.set_mtime(0);
    header.set_uid(0);
    header.set_gid(0);
    header
}

/// Builds a minimal `.deb` in memory.
#[derive(Debug, Clone)]
pub struct DebBuilder {
    compression: DataCompression,
    data: TarBuilder,
}

impl Default for DebBuilder {
    fn default() -> Self {
        DebBuilder {
            compression: DataCompression::Gzip,
            data: TarBuilder::new(),
        }
    }
}

impl DebBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn compression(mut self, compression: DataCompression) -> Self {
        self.compression = compression;
        self
    }

    pub fn file(mut self, path: &str, data: &[u8]) -> Self {
        self.data = self.data.file(path, data);
        self
    }

    pub fn symlink(mut self, path: &str, target: &str) -> Self {
        self.data = self.data.symlink(path, target);
        self
    }

    pub fn build(self) -> Vec<u8> {
        let control = gzip(
            &TarBuilder::new()
                .file("./control", b"Package: fixture\nVersion: 1.0\n")
                .build(),
        );

        let data = self.data.build();
        let (name, data) = match self.compression {
            DataCompression::None => ("data.tar", data),
            DataCompression::Gzip => ("data.tar.gz", gzip(&data)),
            DataCompression::Xz => {
                let mut encoder = xz2::write::XzEncoder::new(Vec::new(), 6);
                encoder.write_all(&data).unwrap();
                ("data.tar.xz", encoder.finish().unwrap())
            }
            DataCompression::Zstd => ("data.tar.zst", zstd::encode_all(data.as_slice(), 3).unwrap()),
        };

        build_ar(&[
            ("debian-binary", b"2.0\n"),
            ("control.tar.gz", &control),
            (name, &data),
        ])
    }
}

fn gzip(data: &[u8]) -> Vec<u8> {
    let mut encoder = flate2::write::GzEncoder::new(Vec::new(), flate2::Compression::default());
    encoder.write_all(data).unwrap();
    encoder.finish().unwrap()
}

/// A fetcher that serves canned archives by package name.
#[derive(Debug, Default)]
pub struct ScriptedFetcher {
    archives: HashMap<String, Vec<u8>>,
    failing: HashSet<String>,
    requests: Mutex<Vec<String>>,
}

impl ScriptedFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve `bytes` for every architecture of package `name`.
    pub fn with(mut self, name: &str, bytes: Vec<u8>) -> Self {
        self.archives.insert(name.to_string(), bytes);
        self
    }

    /// Make fetching `name` fail as a network error would.
    pub fn failing(mut self, name: &str) -> Self {
        self.failing.insert(name.to_string());
        self
    }

    /// Package ids requested so far, in order.
    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().unwrap().clone()
    }
}

impl PackageFetcher for ScriptedFetcher {
    fn fetch(&self, package: &ForeignPackage) -> Result<Vec<u8>> {
        self.requests.lock().unwrap().push(package.id());

        if self.failing.contains(&package.name) {
            bail!("HTTP 503 while downloading {}", package.filename());
        }
        match self.archives.get(&package.name) {
            Some(bytes) => Ok(bytes.clone()),
            None => bail!("HTTP 404: {} not found", package.filename()),
        }
    }
}

/// One call seen by a [`RecordingExecutor`].
#[derive(Debug, Clone)]
pub struct RecordedBuild {
    pub triple: TargetTriple,
    pub source_dir: PathBuf,
    pub env: BuildEnvironment,
}

/// An executor that writes a fake binary instead of compiling.
#[derive(Debug)]
pub struct RecordingExecutor {
    out_dir: PathBuf,
    calls: Mutex<Vec<RecordedBuild>>,
}

impl RecordingExecutor {
    /// Fake binaries are written to `<out_dir>/<triple>/<bin_name>`.
    pub fn new(out_dir: impl Into<PathBuf>) -> Self {
        RecordingExecutor {
            out_dir: out_dir.into(),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> Vec<RecordedBuild> {
        self.calls.lock().unwrap().clone()
    }
}

impl BuildExecutor for RecordingExecutor {
    fn execute(
        &self,
        request: &BuildRequest<'_>,
        env: BuildEnvironment,
    ) -> Result<PathBuf, PipelineError> {
        let dir = self.out_dir.join(request.triple.as_str());
        fs::create_dir_all(&dir).unwrap();
        let binary = dir.join(request.bin_name);
        fs::write(&binary, format!("binary for {}", request.triple)).unwrap();

        self.calls.lock().unwrap().push(RecordedBuild {
            triple: request.triple.clone(),
            source_dir: request.source_dir.to_path_buf(),
            env,
        });

        Ok(binary)
    }
}

/// Create a minimal crate source tree with a README and LICENSE.
pub fn create_source_tree(root: &Path, name: &str) {
    fs::create_dir_all(root.join("src")).unwrap();
    fs::write(
        root.join("Cargo.toml"),
        format!(
            "[package]\nname = \"{}\"\nversion = \"0.1.0\"\nedition = \"2021\"\n",
            name
        ),
    )
    .unwrap();
    fs::write(root.join("src/main.rs"), "fn main() {}\n").unwrap();
    fs::write(root.join("README.md"), format!("# {}\n", name)).unwrap();
    fs::write(root.join("LICENSE"), "MIT\n").unwrap();
}
