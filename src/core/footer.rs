//! Footer navigation
//!
//! The footer starts at the offset recorded in the header and holds, in order:
//! 1. the matrix index (pair key to matrix-record offset),
//! 2. expected-value vectors without normalization,
//! 3. expected-value vectors per normalization type,
//! 4. the normalization-vector index.
//!
//! Sections are walked sequentially, so everything before the one that is needed has
//! to be consumed (or skipped) first.

use std::io::{Cursor, Read, Seek, SeekFrom};

use byteorder::{LittleEndian, ReadBytesExt};

use super::norm::{MatrixType, Normalization, Unit};
use super::record::IndexEntry;
use super::utils::{checked_len, FormatProfile, HicReadExt, HicSeekExt};
use crate::error::{QueryError, Result};
use crate::source::ByteSource;

/// What a query needs from the footer
#[derive(Debug, Clone)]
pub struct FooterRequest<'a> {
    /// Lower chromosome index of the canonical pair
    pub c1: i32,
    /// Higher chromosome index of the canonical pair
    pub c2: i32,
    pub matrix_type: MatrixType,
    pub norm: &'a Normalization,
    pub unit: Unit,
    pub resolution: i32,
}
impl FooterRequest<'_> {
    #[must_use]
    pub fn is_intra(&self) -> bool {
        self.c1 == self.c2
    }

    /// Canonical matrix key `"{c1}_{c2}"`
    #[must_use]
    pub fn pair_key(&self) -> String {
        pair_key(self.c1, self.c2)
    }

    /// Observed raw counts, or inter-chromosomal expected values without normalization,
    /// need nothing beyond the matrix offset
    fn needs_only_matrix(&self) -> bool {
        (self.matrix_type == MatrixType::Observed && self.norm.is_none())
            || (self.matrix_type.uses_expected() && self.norm.is_none() && !self.is_intra())
    }

    fn stores_expected(&self, unit: &str, bin_size: i32) -> bool {
        self.is_intra()
            && self.matrix_type.uses_expected()
            && unit == self.unit.as_str()
            && bin_size == self.resolution
    }

    fn missing_expected(&self) -> QueryError {
        QueryError::MissingExpectedValues {
            unit: self.unit.to_string(),
            resolution: self.resolution,
        }
    }
}

/// Everything resolved from the footer for one chromosome pair
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FooterData {
    /// Offset of the pair's matrix record
    pub matrix_offset: i64,
    pub c1_norm: Option<IndexEntry>,
    pub c2_norm: Option<IndexEntry>,
    /// Expected values by diagonal distance (intra-chromosomal oe/expected only)
    pub expected: Vec<f64>,
}

/// Builds the canonical matrix key of a chromosome pair (indices in ascending order)
#[must_use]
pub fn pair_key(c1: i32, c2: i32) -> String {
    let (lo, hi) = if c1 <= c2 { (c1, c2) } else { (c2, c1) };
    format!("{lo}_{hi}")
}

/// Finds the matrix-record offset of a chromosome pair
///
/// Returns `None` if the pair has no entry.
pub fn locate<R: Read + Seek>(
    reader: &mut R,
    profile: FormatProfile,
    footer_offset: i64,
    c1: i32,
    c2: i32,
) -> Result<Option<i64>> {
    seek_to(reader, footer_offset)?;
    read_matrix_index(reader, profile, &pair_key(c1, c2))
}

/// Resolves the matrix offset, normalization-vector entries and expected values
///
/// Fails with [`QueryError::PairNotIndexed`] if the pair has no matrix entry and with
/// [`QueryError::MissingExpectedValues`] if an intra-chromosomal oe/expected request
/// finds no matching expected-value vector. Missing normalization vectors are only
/// logged; the corresponding fields stay `None`.
pub fn resolve<R: Read + Seek>(
    reader: &mut R,
    profile: FormatProfile,
    footer_offset: i64,
    request: &FooterRequest<'_>,
) -> Result<FooterData> {
    seek_to(reader, footer_offset)?;

    let key = request.pair_key();
    let Some(matrix_offset) = read_matrix_index(reader, profile, &key)? else {
        return Err(QueryError::PairNotIndexed(key).into());
    };
    log::debug!("Matrix {key} at offset {matrix_offset}");

    let mut data = FooterData {
        matrix_offset,
        ..FooterData::default()
    };
    if request.needs_only_matrix() {
        return Ok(data);
    }

    read_expected_section(reader, profile, request, false, &mut data.expected)?;
    if request.is_intra() && request.matrix_type.uses_expected() && request.norm.is_none() {
        if data.expected.is_empty() {
            return Err(request.missing_expected().into());
        }
        return Ok(data);
    }

    read_expected_section(reader, profile, request, true, &mut data.expected)?;
    if request.is_intra() && request.matrix_type.uses_expected() && data.expected.is_empty() {
        return Err(request.missing_expected().into());
    }

    let (c1_norm, c2_norm) = read_norm_vector_index(reader, profile, request)?;
    if c1_norm.is_none() || c2_norm.is_none() {
        log::warn!(
            "File did not contain {} normalization vectors for one or both chromosomes at {} {}",
            request.norm,
            request.resolution,
            request.unit
        );
    }
    data.c1_norm = c1_norm;
    data.c2_norm = c2_norm;
    Ok(data)
}

fn seek_to<R: Seek>(reader: &mut R, offset: i64) -> Result<()> {
    let offset = u64::try_from(offset).map_err(|_| {
        std::io::Error::new(
            std::io::ErrorKind::InvalidData,
            format!("negative file offset {offset}"),
        )
    })?;
    reader.seek(SeekFrom::Start(offset))?;
    Ok(())
}

/// Scans every matrix entry and returns the offset recorded for `key`
///
/// The whole list is always consumed so the stream ends up at the next section.
fn read_matrix_index<R: Read>(
    reader: &mut R,
    profile: FormatProfile,
    key: &str,
) -> Result<Option<i64>> {
    // byte count of the remaining footer, not needed
    reader.read_count(profile)?;

    let num_entries = checked_len(reader.read_i32::<LittleEndian>()?)?;
    let mut found = None;
    for _ in 0..num_entries {
        let entry_key = reader.read_cstring()?;
        let position = reader.read_i64::<LittleEndian>()?;
        let _size = reader.read_i32::<LittleEndian>()?;
        if entry_key == key {
            found = Some(position);
        }
    }
    Ok(found)
}

/// Reads one expected-value section, appending the vectors that match the request
///
/// `typed` sections prefix each entry with the normalization type name.
fn read_expected_section<R: Read + Seek>(
    reader: &mut R,
    profile: FormatProfile,
    request: &FooterRequest<'_>,
    typed: bool,
    expected: &mut Vec<f64>,
) -> Result<()> {
    let value_width: i64 = if profile.single_values { 4 } else { 8 };

    let num_vectors = checked_len(reader.read_i32::<LittleEndian>()?)?;
    for _ in 0..num_vectors {
        let matches_norm = if typed {
            reader.read_cstring()? == request.norm.as_str()
        } else {
            request.norm.is_none()
        };
        let unit = reader.read_cstring()?;
        let bin_size = reader.read_i32::<LittleEndian>()?;
        let num_values = reader.read_len(profile)?;

        let store = matches_norm && request.stores_expected(&unit, bin_size);
        if store {
            let values = reader.read_values(profile, num_values)?;
            expected.extend(values);
        } else {
            reader.skip(num_values as i64 * value_width)?;
        }

        let num_factors = checked_len(reader.read_i32::<LittleEndian>()?)?;
        if !store {
            reader.skip(num_factors as i64 * (4 + value_width))?;
            continue;
        }
        for _ in 0..num_factors {
            let chr_index = reader.read_i32::<LittleEndian>()?;
            let factor = reader.read_value(profile)?;
            if chr_index == request.c1 {
                for value in expected.iter_mut() {
                    *value /= factor;
                }
            }
        }
    }
    Ok(())
}

/// Reads the normalization-vector index, returning the entries for both chromosomes
fn read_norm_vector_index<R: Read>(
    reader: &mut R,
    profile: FormatProfile,
    request: &FooterRequest<'_>,
) -> Result<(Option<IndexEntry>, Option<IndexEntry>)> {
    let mut c1_entry = None;
    let mut c2_entry = None;

    let num_entries = checked_len(reader.read_i32::<LittleEndian>()?)?;
    for _ in 0..num_entries {
        let norm_type = reader.read_cstring()?;
        let chr_index = reader.read_i32::<LittleEndian>()?;
        let unit = reader.read_cstring()?;
        let resolution = reader.read_i32::<LittleEndian>()?;
        let position = reader.read_i64::<LittleEndian>()?;
        let size = reader.read_count(profile)?;

        if norm_type != request.norm.as_str()
            || unit != request.unit.as_str()
            || resolution != request.resolution
        {
            continue;
        }
        if chr_index == request.c1 {
            c1_entry = Some(IndexEntry::new(position, size));
        }
        if chr_index == request.c2 {
            c2_entry = Some(IndexEntry::new(position, size));
        }
    }
    Ok((c1_entry, c2_entry))
}

/// Reads one normalization vector: a count followed by that many values
pub fn read_normalization_vector<S: ByteSource>(
    source: &mut S,
    entry: IndexEntry,
    profile: FormatProfile,
) -> Result<Vec<f64>> {
    let position = u64::try_from(entry.position).unwrap_or(u64::MAX);
    let size = usize::try_from(entry.size).unwrap_or(0);
    let bytes = source.read_exact_at(position, size)?;

    let mut cursor = Cursor::new(bytes);
    let num_values = cursor.read_len(profile)?;
    let values = cursor.read_values(profile, num_values)?;
    log::trace!("Read normalization vector of {num_values} values at {position}");
    Ok(values)
}
