//! Contact block decoding
//!
//! A block is a zlib stream holding a record count followed by one of three layouts:
//!
//! * legacy (version < 7): plain `(i32 binX, i32 binY, f32 counts)` triples
//! * list of rows (type 1): rows keyed by `binY`, each holding `(binX, count)` pairs
//! * dense (type 2): a row-major rectangle of counts with missing cells marked
//!
//! From version 7 on, bins are stored as deltas against per-block offsets and counts
//! may be narrowed to `i16`.

use std::io::{self, Cursor, Read};

use byteorder::{LittleEndian, ReadBytesExt};
use flate2::read::ZlibDecoder;

use super::record::{ContactRecord, IndexEntry};
use super::utils::FormatProfile;
use crate::error::{BlockError, Result};
use crate::source::ByteSource;
use crate::INFLATE_HEADROOM;

/// Missing-cell marker of dense blocks with `i16` counts
pub const DENSE_MISSING_I16: i16 = i16::MIN;

const TYPE_LIST_OF_ROWS: u8 = 1;
const TYPE_DENSE: u8 = 2;

/// Upper bound on preallocation driven by a record count read from the block
const MAX_RECORD_PREALLOC: usize = 1 << 16;

/// Reads and decodes the block at `entry`
///
/// An entry with no payload yields no records and touches nothing.
pub fn read_block<S: ByteSource>(
    source: &mut S,
    entry: IndexEntry,
    profile: FormatProfile,
) -> Result<Vec<ContactRecord>> {
    if entry.is_empty() {
        return Ok(Vec::new());
    }
    let position = u64::try_from(entry.position).map_err(|_| {
        io::Error::new(
            io::ErrorKind::InvalidData,
            format!("negative block position {}", entry.position),
        )
    })?;
    let compressed = source.read_exact_at(position, entry.size as usize)?;
    let records = decode_block(&compressed, profile)?;
    log::trace!(
        "Decoded {} records from block at {position} ({} bytes)",
        records.len(),
        entry.size
    );
    Ok(records)
}

/// Inflates a compressed block
pub fn inflate(compressed: &[u8]) -> Result<Vec<u8>> {
    let mut decoder = ZlibDecoder::new(compressed);
    let mut buffer = Vec::with_capacity(compressed.len() * INFLATE_HEADROOM);
    decoder
        .read_to_end(&mut buffer)
        .map_err(|e| BlockError::Decompression(e.to_string()))?;
    Ok(buffer)
}

/// Inflates and decodes one block into raw-bin records
pub fn decode_block(compressed: &[u8], profile: FormatProfile) -> Result<Vec<ContactRecord>> {
    if compressed.is_empty() {
        return Ok(Vec::new());
    }
    let buffer = inflate(compressed)?;
    decode_records(&mut Cursor::new(buffer), profile)
}

/// Width flags of a version 7+ block
#[derive(Debug, Clone, Copy)]
struct Widths {
    short_counts: bool,
    short_bin_x: bool,
    short_bin_y: bool,
}
impl Widths {
    fn read_count<R: Read>(self, reader: &mut R) -> io::Result<f32> {
        if self.short_counts {
            Ok(f32::from(reader.read_i16::<LittleEndian>()?))
        } else {
            reader.read_f32::<LittleEndian>()
        }
    }
}

fn read_i16_or_i32<R: Read>(reader: &mut R, short: bool) -> io::Result<i32> {
    if short {
        Ok(i32::from(reader.read_i16::<LittleEndian>()?))
    } else {
        reader.read_i32::<LittleEndian>()
    }
}

/// Decodes an inflated block
pub fn decode_records<R: Read>(reader: &mut R, profile: FormatProfile) -> Result<Vec<ContactRecord>> {
    let num_records = reader.read_i32::<LittleEndian>()?;
    let mut records = Vec::with_capacity(usize::try_from(num_records).unwrap_or(0).min(MAX_RECORD_PREALLOC));

    if profile.legacy_block_layout {
        for _ in 0..num_records.max(0) {
            let bin_x = reader.read_i32::<LittleEndian>()?;
            let bin_y = reader.read_i32::<LittleEndian>()?;
            let counts = reader.read_f32::<LittleEndian>()?;
            records.push(ContactRecord::new(bin_x, bin_y, counts));
        }
        return Ok(records);
    }

    let bin_x_offset = reader.read_i32::<LittleEndian>()?;
    let bin_y_offset = reader.read_i32::<LittleEndian>()?;
    // a zero byte selects the narrow encoding
    let short_counts = reader.read_u8()? == 0;
    let (short_bin_x, short_bin_y) = if profile.compact_block_widths {
        (reader.read_u8()? == 0, reader.read_u8()? == 0)
    } else {
        (true, true)
    };
    let widths = Widths {
        short_counts,
        short_bin_x,
        short_bin_y,
    };

    match reader.read_u8()? {
        TYPE_LIST_OF_ROWS => {
            let row_count = read_i16_or_i32(reader, widths.short_bin_y)?;
            for _ in 0..row_count.max(0) {
                let bin_y = bin_y_offset + read_i16_or_i32(reader, widths.short_bin_y)?;
                let col_count = read_i16_or_i32(reader, widths.short_bin_x)?;
                for _ in 0..col_count.max(0) {
                    let bin_x = bin_x_offset + read_i16_or_i32(reader, widths.short_bin_x)?;
                    let counts = widths.read_count(reader)?;
                    records.push(ContactRecord::new(bin_x, bin_y, counts));
                }
            }
        }
        TYPE_DENSE => {
            let num_points = reader.read_i32::<LittleEndian>()?;
            let width = i32::from(reader.read_i16::<LittleEndian>()?);
            if num_points > 0 && width <= 0 {
                return Err(io::Error::new(
                    io::ErrorKind::InvalidData,
                    format!("dense block with row width {width}"),
                )
                .into());
            }
            for i in 0..num_points.max(0) {
                let bin_x = bin_x_offset + i % width;
                let bin_y = bin_y_offset + i / width;
                if widths.short_counts {
                    let count = reader.read_i16::<LittleEndian>()?;
                    if count != DENSE_MISSING_I16 {
                        records.push(ContactRecord::new(bin_x, bin_y, f32::from(count)));
                    }
                } else {
                    let count = reader.read_f32::<LittleEndian>()?;
                    if !count.is_nan() {
                        records.push(ContactRecord::new(bin_x, bin_y, count));
                    }
                }
            }
        }
        other => return Err(BlockError::UnknownBlockType(other).into()),
    }
    Ok(records)
}
