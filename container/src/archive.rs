// SPDX-FileCopyrightText: 2025 All contributors
//
// SPDX-License-Identifier: GPL-2.0-or-later

//! Optional single-entry zip wrapping for a LapViz payload.

use std::io::{self, Cursor, Read, Write};
use zip::write::{ExtendedFileOptions, FileOptions};
use zip::{CompressionMethod, ZipArchive, ZipWriter};

const ZIP_MAGIC: [u8; 4] = *b"PK\x03\x04";

/// Does the byte stream start with the zip local-file-header magic?
pub fn is_zip(bytes: &[u8]) -> bool {
    bytes.len() >= ZIP_MAGIC.len() && bytes[..ZIP_MAGIC.len()] == ZIP_MAGIC
}

/// Recognizes either extension used for a zip-wrapped session in the wild:
/// `.lz` (named in the archive-wrapping rule) and `.lvz` (named in the
/// compatibility-sniffing rule). Both are accepted on read; `.lvz` is what
/// this crate writes.
pub fn has_zip_extension(name: &str) -> bool {
    let lower = name.to_ascii_lowercase();
    lower.ends_with(".lz") || lower.ends_with(".lvz")
}

pub fn wrap(entry_name: &str, contents: &str) -> io::Result<Vec<u8>> {
    let mut buf = Vec::new();
    {
        let mut writer = ZipWriter::new(Cursor::new(&mut buf));
        let options: FileOptions<'_, ExtendedFileOptions> =
            FileOptions::default().compression_method(CompressionMethod::Deflated);
        writer.start_file(entry_name, options)?;
        writer.write_all(contents.as_bytes())?;
        writer.finish()?;
    }
    Ok(buf)
}

pub fn unwrap(bytes: &[u8]) -> io::Result<String> {
    let mut archive =
        ZipArchive::new(Cursor::new(bytes)).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e.to_string()))?;
    if archive.is_empty() {
        return Err(io::Error::new(io::ErrorKind::InvalidData, "empty zip archive"));
    }
    let mut file = archive
        .by_index(0)
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e.to_string()))?;
    let mut contents = String::new();
    file.read_to_string(&mut contents)?;
    Ok(contents)
}
