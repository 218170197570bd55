//! Archive codec
//!
//! Reads tar (plain, gzip, xz) and zip byte streams into a flat list of
//! entries, and writes xz-compressed tar streams. Everything is buffered in
//! memory; callers decide what an entry path is allowed to be.

use std::io::{Cursor, Read, Write};
use std::path::{Path, PathBuf};

use flate2::read::GzDecoder;
use xz2::read::XzDecoder;
use xz2::write::XzEncoder;

use crate::error::{Error, Result};

/// Compression level used for bundles.
const XZ_LEVEL: u32 = 6;

/// Archive container and compression combinations understood by the reader.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveFormat {
    Tar,
    TarGz,
    TarXz,
    Zip,
}

impl ArchiveFormat {
    /// Detect the format from a URL or file name suffix.
    ///
    /// Returns `None` for anything that does not look like an archive.
    pub fn from_name(name: &str) -> Option<Self> {
        let name = name.to_lowercase();
        let name = name.split(['?', '#']).next().unwrap_or_default();
        if name.ends_with(".tar.gz") || name.ends_with(".tgz") {
            Some(Self::TarGz)
        } else if name.ends_with(".tar.xz") || name.ends_with(".txz") {
            Some(Self::TarXz)
        } else if name.ends_with(".zip") {
            Some(Self::Zip)
        } else if name.ends_with(".tar") {
            Some(Self::Tar)
        } else {
            None
        }
    }

    /// Detect the format from the first bytes of the stream.
    ///
    /// Magic bytes:
    /// - Gzip: `1f 8b`
    /// - XZ: `fd 37 7a 58 5a 00`
    /// - Zip: `50 4b 03 04`
    /// - Tar: `ustar` at offset 257
    pub fn from_magic_bytes(data: &[u8]) -> Option<Self> {
        if data.starts_with(&[0x1f, 0x8b]) {
            Some(Self::TarGz)
        } else if data.starts_with(&[0xfd, 0x37, 0x7a, 0x58, 0x5a, 0x00]) {
            Some(Self::TarXz)
        } else if data.starts_with(&[0x50, 0x4b, 0x03, 0x04]) {
            Some(Self::Zip)
        } else if data.len() > 262 && &data[257..262] == b"ustar" {
            Some(Self::Tar)
        } else {
            None
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Tar => "tar",
            Self::TarGz => "tar.gz",
            Self::TarXz => "tar.xz",
            Self::Zip => "zip",
        }
    }
}

impl std::fmt::Display for ArchiveFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// One file read out of an archive.
#[derive(Debug, Clone)]
pub struct ArchiveEntry {
    /// Path exactly as stored in the archive.
    pub path: PathBuf,
    /// Size recorded in the entry header.
    pub declared_size: u64,
    /// Bytes actually read.
    pub data: Vec<u8>,
    /// Unix permission bits, when recorded.
    pub mode: Option<u32>,
}

fn archive_error(context: &str, err: impl std::fmt::Display) -> Error {
    Error::Archive {
        message: format!("{}: {}", context, err),
    }
}

/// Read every regular file entry of an archive. Directory entries are
/// skipped.
pub fn read_archive(format: ArchiveFormat, bytes: &[u8]) -> Result<Vec<ArchiveEntry>> {
    match format {
        ArchiveFormat::Tar => read_tar(bytes),
        ArchiveFormat::TarGz => read_tar(GzDecoder::new(bytes)),
        ArchiveFormat::TarXz => read_tar(XzDecoder::new(bytes)),
        ArchiveFormat::Zip => read_zip(bytes),
    }
}

fn read_tar<R: Read>(reader: R) -> Result<Vec<ArchiveEntry>> {
    let mut archive = tar::Archive::new(reader);
    let mut entries = Vec::new();

    for entry in archive
        .entries()
        .map_err(|e| archive_error("failed to read archive", e))?
    {
        let mut entry = entry.map_err(|e| archive_error("failed to read archive entry", e))?;
        let entry_type = entry.header().entry_type();
        if entry_type.is_dir() || !(entry_type.is_file() || entry_type.is_contiguous()) {
            continue;
        }

        let path = entry
            .path()
            .map_err(|e| archive_error("invalid entry path", e))?
            .into_owned();
        let declared_size = entry
            .header()
            .size()
            .map_err(|e| archive_error("invalid entry size", e))?;
        let mode = entry.header().mode().ok();

        let mut data = Vec::with_capacity(declared_size.min(64 * 1024 * 1024) as usize);
        entry
            .read_to_end(&mut data)
            .map_err(|e| archive_error(&format!("failed to read {}", path.display()), e))?;

        entries.push(ArchiveEntry {
            path,
            declared_size,
            data,
            mode,
        });
    }

    Ok(entries)
}

fn read_zip(bytes: &[u8]) -> Result<Vec<ArchiveEntry>> {
    let mut archive =
        zip::ZipArchive::new(Cursor::new(bytes)).map_err(|e| archive_error("invalid zip", e))?;
    let mut entries = Vec::new();

    for i in 0..archive.len() {
        let mut file = archive
            .by_index(i)
            .map_err(|e| archive_error("failed to read zip entry", e))?;
        if file.is_dir() {
            continue;
        }

        let path = PathBuf::from(file.name());
        let declared_size = file.size();
        let mode = file.unix_mode();
        let mut data = Vec::with_capacity(declared_size.min(64 * 1024 * 1024) as usize);
        file.read_to_end(&mut data)
            .map_err(|e| archive_error(&format!("failed to read {}", path.display()), e))?;

        entries.push(ArchiveEntry {
            path,
            declared_size,
            data,
            mode,
        });
    }

    Ok(entries)
}

/// Writes an xz-compressed tar stream.
pub struct ArchiveWriter<W: Write> {
    builder: tar::Builder<XzEncoder<W>>,
}

impl<W: Write> ArchiveWriter<W> {
    pub fn new(writer: W) -> Self {
        let mut builder = tar::Builder::new(XzEncoder::new(writer, XZ_LEVEL));
        builder.mode(tar::HeaderMode::Deterministic);
        Self { builder }
    }

    /// Append one file entry.
    pub fn add_entry(&mut self, path: &Path, data: &[u8], mode: u32) -> Result<()> {
        let mut header = tar::Header::new_gnu();
        header.set_size(data.len() as u64);
        header.set_mode(mode);
        header.set_mtime(0);
        header.set_entry_type(tar::EntryType::Regular);
        header.set_cksum();
        self.builder
            .append_data(&mut header, path, data)
            .map_err(|e| archive_error(&format!("failed to add {}", path.display()), e))
    }

    /// Finish the tar stream and the compression stream, returning the
    /// underlying writer.
    pub fn finish(self) -> Result<W> {
        let encoder = self
            .builder
            .into_inner()
            .map_err(|e| archive_error("failed to finish archive", e))?;
        encoder
            .finish()
            .map_err(|e| archive_error("failed to finish compression", e))
    }
}
