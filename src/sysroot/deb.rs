//! Debian binary package reader.
//!
//! A `.deb` is a Unix `ar` archive with three members: `debian-binary`,
//! `control.tar.*` and `data.tar.*`. Only the data member matters for a
//! sysroot; it holds the files `dpkg -x` would unpack.
//!
//! # Layout
//!
//! ```text
//! !<arch>\n
//! [60-byte header][member bytes][pad to even offset]
//! [60-byte header][member bytes][pad to even offset]
//! ...
//! ```

use std::io::{Cursor, Read};

use anyhow::{bail, Context, Result};

const AR_MAGIC: &[u8] = b"!<arch>\n";
const HEADER_LEN: usize = 60;
const HEADER_END: &[u8] = b"`\n";

/// A member of an `ar` archive.
#[derive(Debug, Clone, Copy)]
pub struct ArMember<'a> {
    /// Member name, with any GNU trailing `/` removed
    pub name: &'a str,
    /// Member contents
    pub data: &'a [u8],
}

/// Compression used by a `data.tar` member.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataCompression {
    None,
    Gzip,
    Xz,
    Zstd,
}

impl DataCompression {
    /// Detect compression from a member name such as `data.tar.xz`.
    pub fn from_member_name(name: &str) -> Option<Self> {
        match name {
            "data.tar" => Some(DataCompression::None),
            "data.tar.gz" => Some(DataCompression::Gzip),
            "data.tar.xz" => Some(DataCompression::Xz),
            "data.tar.zst" => Some(DataCompression::Zstd),
            _ => None,
        }
    }
}

/// A parsed `.deb` package held in memory.
#[derive(Debug)]
pub struct DebPackage<'a> {
    members: Vec<ArMember<'a>>,
}

impl<'a> DebPackage<'a> {
    /// Parse the `ar` container of a `.deb`.
    pub fn parse(bytes: &'a [u8]) -> Result<Self> {
        let members = parse_ar(bytes)?;

        match members.first() {
            Some(first) if first.name == "debian-binary" => {}
            _ => bail!("not a Debian package: missing `debian-binary` member"),
        }

        Ok(DebPackage { members })
    }

    /// The format version from `debian-binary` (e.g. "2.0").
    pub fn format_version(&self) -> Option<&str> {
        self.members
            .iter()
            .find(|m| m.name == "debian-binary")
            .and_then(|m| std::str::from_utf8(m.data).ok())
            .map(str::trim)
    }

    /// Find the data member and its compression.
    pub fn data_member(&self) -> Result<(DataCompression, &'a [u8])> {
        for member in &self.members {
            if let Some(compression) = DataCompression::from_member_name(member.name) {
                return Ok((compression, member.data));
            }
        }

        let names: Vec<&str> = self.members.iter().map(|m| m.name).collect();
        if names.iter().any(|n| n.starts_with("data.tar")) {
            bail!("unsupported data member compression: {}", names.join(", "));
        }
        bail!("package has no data member (members: {})", names.join(", "))
    }

    /// A decompressing reader over the data tarball.
    pub fn data_reader(&self) -> Result<Box<dyn Read + 'a>> {
        let (compression, data) = self.data_member()?;
        let cursor = Cursor::new(data);

        let reader: Box<dyn Read + 'a> = match compression {
            DataCompression::None => Box::new(cursor),
            DataCompression::Gzip => Box::new(flate2::read::GzDecoder::new(cursor)),
            DataCompression::Xz => Box::new(xz2::read::XzDecoder::new(cursor)),
            DataCompression::Zstd => Box::new(
                zstd::stream::read::Decoder::new(cursor)
                    .context("failed to initialize zstd decoder")?,
            ),
        };

        Ok(reader)
    }
}

/// Split an `ar` archive into its members.
pub fn parse_ar(bytes: &[u8]) -> Result<Vec<ArMember<'_>>> {
    if !bytes.starts_with(AR_MAGIC) {
        bail!("not an ar archive: bad magic");
    }

    let mut members = Vec::new();
    let mut offset = AR_MAGIC.len();

    while offset < bytes.len() {
        // A lone padding byte may trail the last member
        if bytes.len() - offset == 1 && bytes[offset] == b'\n' {
            break;
        }

        let header = bytes
            .get(offset..offset + HEADER_LEN)
            .with_context(|| format!("truncated ar header at offset {}", offset))?;

        if &header[58..60] != HEADER_END {
            bail!("corrupt ar header at offset {}", offset);
        }

        let name = std::str::from_utf8(&header[0..16])
            .context("ar member name is not UTF-8")?
            .trim_end()
            .trim_end_matches('/');

        let size_field = std::str::from_utf8(&header[48..58])
            .context("ar member size is not UTF-8")?
            .trim();
        let size: usize = size_field
            .parse()
            .with_context(|| format!("invalid ar member size `{}` for `{}`", size_field, name))?;

        let start = offset + HEADER_LEN;
        let data = bytes
            .get(start..start + size)
            .with_context(|| format!("ar member `{}` is truncated", name))?;

        members.push(ArMember { name, data });

        offset = start + size + (size % 2);
    }

    Ok(members)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{build_ar, DebBuilder};

    #[test]
    fn test_parse_ar_members() {
        let bytes = build_ar(&[("debian-binary", b"2.0\n"), ("odd", b"abc")]);
        let members = parse_ar(&bytes).unwrap();

        assert_eq!(members.len(), 2);
        assert_eq!(members[0].name, "debian-binary");
        assert_eq!(members[1].name, "odd");
        assert_eq!(members[1].data, b"abc");
    }

    #[test]
    fn test_parse_ar_rejects_bad_magic() {
        let err = parse_ar(b"PK\x03\x04 definitely a zip").unwrap_err();
        assert!(err.to_string().contains("bad magic"));
    }

    #[test]
    fn test_parse_ar_truncated() {
        let mut bytes = build_ar(&[("debian-binary", b"2.0\n"), ("data.tar", b"0123456789")]);
        bytes.truncate(bytes.len() - 4);
        assert!(parse_ar(&bytes).is_err());
    }

    #[test]
    fn test_deb_data_member_gzip() {
        let deb = DebBuilder::new().file("usr/include/alsa/asoundlib.h", b"#pragma once\n").build();
        let pkg = DebPackage::parse(&deb).unwrap();

        assert_eq!(pkg.format_version(), Some("2.0"));
        let (compression, _) = pkg.data_member().unwrap();
        assert_eq!(compression, DataCompression::Gzip);

        let mut archive = tar::Archive::new(pkg.data_reader().unwrap());
        let paths: Vec<String> = archive
            .entries()
            .unwrap()
            .map(|e| e.unwrap().path().unwrap().to_string_lossy().into_owned())
            .collect();
        assert!(paths.iter().any(|p| p.ends_with("asoundlib.h")));
    }

    #[test]
    fn test_deb_data_member_xz_and_zstd() {
        for compression in [DataCompression::Xz, DataCompression::Zstd] {
            let deb = DebBuilder::new()
                .compression(compression)
                .file("usr/lib/libx.so.1", b"ELF")
                .build();
            let pkg = DebPackage::parse(&deb).unwrap();

            let mut data = Vec::new();
            pkg.data_reader().unwrap().read_to_end(&mut data).unwrap();
            assert!(!data.is_empty());
            assert_eq!(pkg.data_member().unwrap().0, compression);
        }
    }

    #[test]
    fn test_deb_requires_debian_binary() {
        let bytes = build_ar(&[("data.tar", b"")]);
        let err = DebPackage::parse(&bytes).unwrap_err();
        assert!(err.to_string().contains("debian-binary"));
    }

    #[test]
    fn test_deb_unsupported_compression() {
        let bytes = build_ar(&[("debian-binary", b"2.0\n"), ("data.tar.lzma", b"")]);
        let pkg = DebPackage::parse(&bytes).unwrap();
        let err = pkg.data_member().unwrap_err();
        assert!(err.to_string().contains("unsupported"));
    }
}
