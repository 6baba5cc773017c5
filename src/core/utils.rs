use std::io::{self, Read, Seek, SeekFrom};

use byteorder::{LittleEndian, ReadBytesExt};

use crate::error::Result;

/// Upper bound on speculative preallocation driven by counts read from a file
const MAX_PREALLOC: usize = 1 << 20;

/// Field widths and layouts that depend on the format version
///
/// Resolved once from the header version and threaded through every decoder, so no
/// call site has to branch on the raw version number.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FormatProfile {
    /// Raw format version
    pub version: i32,
    /// Counts, sizes and lengths are stored as `i64` instead of `i32`
    pub wide_counts: bool,
    /// Expected and normalization values are stored as `f32` instead of `f64`
    pub single_values: bool,
    /// The header carries the position and length of the normalization-vector index
    pub has_norm_vector_index: bool,
    /// Blocks carry per-axis flags selecting `i16` or `i32` bin deltas
    pub compact_block_widths: bool,
    /// Blocks hold plain `(i32, i32, f32)` triples without offsets
    pub legacy_block_layout: bool,
    /// Intra-chromosomal blocks are numbered by distance from the diagonal
    pub diagonal_block_layout: bool,
}
impl FormatProfile {
    #[must_use]
    pub fn from_version(version: i32) -> Self {
        Self {
            version,
            wide_counts: version > 8,
            single_values: version > 8,
            has_norm_vector_index: version > 8,
            compact_block_widths: version > 8,
            legacy_block_layout: version < 7,
            diagonal_block_layout: version > 8,
        }
    }
}

/// Typed little-endian reads shared by every section of the format
pub trait HicReadExt: Read {
    /// Reads a NUL-terminated UTF-8 string (the terminator is consumed, not returned)
    fn read_cstring(&mut self) -> Result<String> {
        let mut bytes = Vec::new();
        loop {
            let byte = self.read_u8()?;
            if byte == 0 {
                break;
            }
            bytes.push(byte);
        }
        let string = String::from_utf8(bytes).map_err(|e| e.utf8_error())?;
        Ok(string)
    }

    /// Reads a count, size or length field (`i64` or `i32` by version)
    fn read_count(&mut self, profile: FormatProfile) -> Result<i64> {
        if profile.wide_counts {
            Ok(self.read_i64::<LittleEndian>()?)
        } else {
            Ok(i64::from(self.read_i32::<LittleEndian>()?))
        }
    }

    /// Reads a count field that must be non-negative
    fn read_len(&mut self, profile: FormatProfile) -> Result<usize> {
        let count = self.read_count(profile)?;
        usize::try_from(count).map_err(|_| negative_count(count).into())
    }

    /// Reads an expected or normalization value (`f32` or `f64` by version)
    fn read_value(&mut self, profile: FormatProfile) -> Result<f64> {
        if profile.single_values {
            Ok(f64::from(self.read_f32::<LittleEndian>()?))
        } else {
            Ok(self.read_f64::<LittleEndian>()?)
        }
    }

    /// Reads `n` consecutive values
    fn read_values(&mut self, profile: FormatProfile, n: usize) -> Result<Vec<f64>> {
        let mut values = Vec::with_capacity(n.min(MAX_PREALLOC));
        for _ in 0..n {
            values.push(self.read_value(profile)?);
        }
        Ok(values)
    }
}
impl<R: Read + ?Sized> HicReadExt for R {}

/// Relative seeking used to step over sections that are not needed
pub trait HicSeekExt: Seek {
    fn skip(&mut self, n: i64) -> io::Result<u64> {
        self.seek(SeekFrom::Current(n))
    }
}
impl<S: Seek + ?Sized> HicSeekExt for S {}

/// Converts a count read as `i32` into a length, rejecting negative values
pub(crate) fn checked_len(count: i32) -> Result<usize> {
    usize::try_from(count).map_err(|_| negative_count(i64::from(count)).into())
}

fn negative_count(count: i64) -> io::Error {
    io::Error::new(
        io::ErrorKind::InvalidData,
        format!("negative count {count} in file"),
    )
}
