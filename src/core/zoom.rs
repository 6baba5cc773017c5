use std::collections::BTreeMap;
use std::io::{Read, Seek, SeekFrom};

use byteorder::{LittleEndian, ReadBytesExt};

use super::norm::Unit;
use super::record::IndexEntry;
use super::utils::{checked_len, HicReadExt, HicSeekExt};
use crate::error::{QueryError, Result};

/// Size of one block-index entry: `i32` number, `i64` position, `i32` size
pub const SIZE_BLOCK_ENTRY: i64 = 16;

/// One (unit, bin size) level of a matrix record, with its block index
#[derive(Debug, Clone, PartialEq)]
pub struct ZoomHeader {
    pub unit: String,
    pub bin_size: i32,
    /// Total of all counts at this level
    pub sum_counts: f32,
    /// Width of a block, in bins
    pub block_bin_count: i32,
    /// Number of block columns
    pub block_column_count: i32,
    /// Block number to byte range
    pub blocks: BTreeMap<i32, IndexEntry>,
}
impl ZoomHeader {
    #[must_use]
    pub fn block(&self, number: i32) -> Option<IndexEntry> {
        self.blocks.get(&number).copied()
    }
}

/// Scans the zoom levels of the matrix record at `matrix_offset`
///
/// Only the level matching `unit` and `resolution` is kept; the block index of every
/// other level is skipped over. Fails with [`QueryError::ZoomNotFound`] when no level
/// matches.
pub fn locate_zoom<R: Read + Seek>(
    reader: &mut R,
    matrix_offset: i64,
    unit: Unit,
    resolution: i32,
) -> Result<ZoomHeader> {
    let offset = u64::try_from(matrix_offset).map_err(|_| {
        std::io::Error::new(
            std::io::ErrorKind::InvalidData,
            format!("negative matrix offset {matrix_offset}"),
        )
    })?;
    reader.seek(SeekFrom::Start(offset))?;

    let c1 = reader.read_i32::<LittleEndian>()?;
    let c2 = reader.read_i32::<LittleEndian>()?;
    let num_levels = reader.read_i32::<LittleEndian>()?;
    log::debug!("Matrix record {c1}_{c2} has {num_levels} zoom levels");

    for _ in 0..num_levels.max(0) {
        let level_unit = reader.read_cstring()?;
        let _zoom_index = reader.read_i32::<LittleEndian>()?;
        let sum_counts = reader.read_f32::<LittleEndian>()?;
        let _occupied_cells = reader.read_f32::<LittleEndian>()?;
        let _std_dev = reader.read_f32::<LittleEndian>()?;
        let _percent_95 = reader.read_f32::<LittleEndian>()?;
        let bin_size = reader.read_i32::<LittleEndian>()?;
        let block_bin_count = reader.read_i32::<LittleEndian>()?;
        let block_column_count = reader.read_i32::<LittleEndian>()?;
        let num_blocks = checked_len(reader.read_i32::<LittleEndian>()?)?;

        if level_unit != unit.as_str() || bin_size != resolution {
            reader.skip(num_blocks as i64 * SIZE_BLOCK_ENTRY)?;
            continue;
        }

        let mut blocks = BTreeMap::new();
        for _ in 0..num_blocks {
            let number = reader.read_i32::<LittleEndian>()?;
            let position = reader.read_i64::<LittleEndian>()?;
            let size = reader.read_i32::<LittleEndian>()?;
            blocks.insert(number, IndexEntry::new(position, i64::from(size)));
        }
        log::debug!(
            "Found zoom level {resolution} {unit}: {} blocks, block bin count {block_bin_count}, block column count {block_column_count}",
            blocks.len()
        );
        return Ok(ZoomHeader {
            unit: level_unit,
            bin_size,
            sum_counts,
            block_bin_count,
            block_column_count,
            blocks,
        });
    }

    Err(QueryError::ZoomNotFound {
        unit: unit.to_string(),
        resolution,
    }
    .into())
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;
    use crate::core::footer::locate;
    use crate::core::FileHeader;
    use crate::error::Error;
    use crate::testing::{legacy_block, HicBuilder, TestChromosome, TestMatrix, TestZoom};

    fn build(zooms: Vec<TestZoom>) -> Result<(Cursor<Vec<u8>>, i64)> {
        let mut matrix = TestMatrix::new(1, 1);
        for zoom in zooms {
            matrix = matrix.zoom(zoom);
        }
        let bytes = HicBuilder::new(8)
            .chromosomes(vec![
                TestChromosome::new("All", 1),
                TestChromosome::new("chr1", 1000),
            ])
            .matrix(matrix)
            .build();
        let mut cursor = Cursor::new(bytes);
        let header = FileHeader::read_from(&mut cursor)?;
        let offset = locate(&mut cursor, header.profile(), header.footer_offset, 1, 1)?
            .unwrap_or_default();
        Ok((cursor, offset))
    }

    #[test]
    fn test_finds_later_level_after_skipping() -> Result<()> {
        let block = legacy_block(&[(0, 0, 1.0)]);
        let (mut cursor, offset) = build(vec![
            TestZoom::new("BP", 1000, 5.0, 10, 3)
                .block(0, block.clone())
                .block(1, block.clone()),
            TestZoom::new("FRAG", 100, 6.0, 10, 3).block(4, block.clone()),
            TestZoom::new("BP", 100, 7.0, 20, 5)
                .block(2, block.clone())
                .block(9, block),
        ])?;

        let zoom = locate_zoom(&mut cursor, offset, Unit::Bp, 100)?;
        assert_eq!(zoom.unit, "BP");
        assert_eq!(zoom.bin_size, 100);
        assert_eq!(zoom.sum_counts, 7.0);
        assert_eq!(zoom.block_bin_count, 20);
        assert_eq!(zoom.block_column_count, 5);
        assert_eq!(zoom.blocks.len(), 2);
        assert!(zoom.block(2).is_some());
        assert!(zoom.block(9).is_some());
        assert!(zoom.block(0).is_none());
        Ok(())
    }

    #[test]
    fn test_frag_unit() -> Result<()> {
        let (mut cursor, offset) = build(vec![
            TestZoom::new("BP", 100, 5.0, 10, 3),
            TestZoom::new("FRAG", 100, 6.0, 10, 3),
        ])?;
        let zoom = locate_zoom(&mut cursor, offset, Unit::Frag, 100)?;
        assert_eq!(zoom.sum_counts, 6.0);
        Ok(())
    }

    #[test]
    fn test_zoom_not_found() -> Result<()> {
        let (mut cursor, offset) = build(vec![TestZoom::new("BP", 100, 5.0, 10, 3)])?;
        let err = locate_zoom(&mut cursor, offset, Unit::Bp, 25).unwrap_err();
        assert!(matches!(
            err,
            Error::QueryError(QueryError::ZoomNotFound { resolution: 25, .. })
        ));
        assert!(err.is_missing_data());
        Ok(())
    }
}
