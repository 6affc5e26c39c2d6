//! Part 10 signature check: 128-byte preamble followed by `DICM`.

use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::Path;

/// Offset of the magic value, right after the preamble
pub const SIGNATURE_OFFSET: u64 = 128;

/// Magic value of a DICOM Part 10 file
pub const SIGNATURE: &[u8; 4] = b"DICM";

/// Whether `path` is a DICOM container file.
///
/// Only the four bytes at offset 128 are consulted, never the name or
/// extension. Any I/O problem (missing, too short, unreadable, directory)
/// yields `false`.
pub fn is_valid_container(path: &Path) -> bool {
    read_signature(path)
        .map(|magic| &magic == SIGNATURE)
        .unwrap_or(false)
}

fn read_signature(path: &Path) -> std::io::Result<[u8; 4]> {
    let mut file = File::open(path)?;
    file.seek(SeekFrom::Start(SIGNATURE_OFFSET))?;
    let mut magic = [0u8; 4];
    file.read_exact(&mut magic)?;
    Ok(magic)
}
