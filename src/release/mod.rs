//! Release packaging and checksums.

pub mod checksum;
pub mod packager;

pub use packager::{
    archive_name, Artifact, PackageRequest, Packager, TarGzPackager, DEFAULT_INCLUDE,
};
