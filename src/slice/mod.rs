//! The `HICSLICE` companion format
//!
//! A slice file is one gzip stream holding a genome-wide dump at a single
//! resolution:
//!
//! * `HICSLICE` magic
//! * `i32` resolution and `i32` chromosome count
//! * per chromosome: `i32` name length, name bytes, `i16` key
//! * a flat run of 20-byte [`SliceRecord`]s until the end of the stream
//!
//! Values are stored after whatever transform and normalization were applied when
//! the file was written; the format carries no metadata about them.

mod read;
mod write;

use std::collections::BTreeMap;
use std::io::{self, Read, Write};

use bytemuck::{Pod, Zeroable};
use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};

use crate::core::utils::checked_len;
use crate::error::{Error, Result, SliceError};
use crate::SLICE_MAGIC;

pub use read::SliceReader;
pub use write::{dump_genome_wide, DumpSummary, SliceWriter};

/// Size of one record on disk
pub const SLICE_RECORD_SIZE: usize = 20;

/// One contact as laid out in the record stream
///
/// Mirrors a C struct with natural alignment: each `i16` key is followed by two
/// bytes of padding so the record is written and read as raw memory.
#[derive(Debug, Clone, Copy, Default, PartialEq, Zeroable, Pod)]
#[repr(C)]
pub struct SliceRecord {
    pub chr1_key: i16,
    padding1: [u8; 2],
    pub bin_x: i32,
    pub chr2_key: i16,
    padding2: [u8; 2],
    pub bin_y: i32,
    pub value: f32,
}
const _: () = assert!(std::mem::size_of::<SliceRecord>() == SLICE_RECORD_SIZE);

impl SliceRecord {
    #[must_use]
    pub fn new(chr1_key: i16, bin_x: i32, chr2_key: i16, bin_y: i32, value: f32) -> Self {
        Self {
            chr1_key,
            padding1: [0; 2],
            bin_x,
            chr2_key,
            padding2: [0; 2],
            bin_y,
            value,
        }
    }

    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::bytes_of(self)
    }

    /// Checks if the value survives the pair filter (finite and positive)
    #[must_use]
    pub fn has_signal(&self) -> bool {
        self.value.is_finite() && self.value > 0.0
    }
}

/// A slice record with its chromosome keys resolved to names
#[derive(Debug, Clone, PartialEq)]
pub struct SliceContact {
    pub chr1: String,
    pub bin_x: i32,
    pub chr2: String,
    pub bin_y: i32,
    pub value: f32,
}

/// Resolution and chromosome key table of a slice file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SliceHeader {
    pub resolution: i32,
    names: BTreeMap<i16, String>,
}
impl SliceHeader {
    /// Assigns keys `0, 1, ...` to `names` in the given order
    pub fn new<I, N>(resolution: i32, names: I) -> Result<Self>
    where
        I: IntoIterator<Item = N>,
        N: Into<String>,
    {
        let names: Vec<String> = names.into_iter().map(Into::into).collect();
        if names.len() > i16::MAX as usize + 1 {
            return Err(SliceError::TooManyChromosomes(names.len()).into());
        }
        let names = names
            .into_iter()
            .enumerate()
            .map(|(key, name)| (key as i16, name))
            .collect();
        Ok(Self { resolution, names })
    }

    /// Chromosome names in key order
    pub fn chromosomes(&self) -> impl Iterator<Item = &str> {
        self.names.values().map(String::as_str)
    }

    #[must_use]
    pub fn num_chromosomes(&self) -> usize {
        self.names.len()
    }

    pub fn name(&self, key: i16) -> Result<&str> {
        self.names
            .get(&key)
            .map(String::as_str)
            .ok_or_else(|| SliceError::UnknownChromosomeKey(key).into())
    }

    pub fn key(&self, name: &str) -> Result<i16> {
        self.names
            .iter()
            .find_map(|(key, n)| (n == name).then_some(*key))
            .ok_or_else(|| SliceError::ChromosomeNotFound(name.to_string()).into())
    }

    /// Resolves both keys of a record
    pub fn contact(&self, record: &SliceRecord) -> Result<SliceContact> {
        Ok(SliceContact {
            chr1: self.name(record.chr1_key)?.to_string(),
            bin_x: record.bin_x,
            chr2: self.name(record.chr2_key)?.to_string(),
            bin_y: record.bin_y,
            value: record.value,
        })
    }

    /// Writes the header; the chromosome table is ordered by name
    pub fn write_to<W: Write>(&self, writer: &mut W) -> Result<()> {
        writer.write_all(SLICE_MAGIC)?;
        writer.write_i32::<LittleEndian>(self.resolution)?;
        writer.write_i32::<LittleEndian>(self.names.len() as i32)?;

        let mut table: Vec<(&String, i16)> = self.names.iter().map(|(k, n)| (n, *k)).collect();
        table.sort();
        for (name, key) in table {
            writer.write_i32::<LittleEndian>(name.len() as i32)?;
            writer.write_all(name.as_bytes())?;
            writer.write_i16::<LittleEndian>(key)?;
        }
        Ok(())
    }

    pub fn read_from<R: Read>(reader: &mut R) -> Result<Self> {
        let mut magic = [0u8; 8];
        if let Err(e) = reader.read_exact(&mut magic) {
            return Err(match e.kind() {
                io::ErrorKind::UnexpectedEof
                | io::ErrorKind::InvalidInput
                | io::ErrorKind::InvalidData => SliceError::InvalidMagic.into(),
                _ => Error::from(e),
            });
        }
        if &magic != SLICE_MAGIC {
            return Err(SliceError::InvalidMagic.into());
        }

        let resolution = reader.read_i32::<LittleEndian>()?;
        let count = reader.read_i32::<LittleEndian>()?;
        let mut names = BTreeMap::new();
        for _ in 0..count.max(0) {
            let len = checked_len(reader.read_i32::<LittleEndian>()?)?;
            let mut buf = vec![0u8; len];
            reader.read_exact(&mut buf)?;
            let name = std::str::from_utf8(&buf)?.to_string();
            let key = reader.read_i16::<LittleEndian>()?;
            names.insert(key, name);
        }
        Ok(Self { resolution, names })
    }
}
