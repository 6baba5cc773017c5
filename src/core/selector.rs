use std::collections::BTreeSet;
use std::f64::consts::SQRT_2;

use super::utils::FormatProfile;

/// A query rectangle in bin coordinates (bounds inclusive)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BinRegion {
    pub x0: i64,
    pub x1: i64,
    pub y0: i64,
    pub y1: i64,
}
impl BinRegion {
    #[must_use]
    pub fn new(x0: i64, x1: i64, y0: i64, y1: i64) -> Self {
        Self { x0, x1, y0, y1 }
    }

    /// Converts a rectangle of genome coordinates into bins at `resolution`
    #[must_use]
    pub fn from_genome(region: [i64; 4], resolution: i32) -> Self {
        let res = i64::from(resolution.max(1));
        Self::new(
            region[0] / res,
            region[1] / res,
            region[2] / res,
            region[3] / res,
        )
    }
}

/// Geometry of a zoom level's block grid
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockGrid {
    pub block_bin_count: i32,
    pub block_column_count: i32,
}

/// Selects the block numbers that may hold records inside `region`
///
/// Intra-chromosomal matrices of files using the diagonal layout are numbered by
/// distance from the diagonal; everything else uses the row/column grid.
#[must_use]
pub fn select_blocks(
    region: BinRegion,
    grid: BlockGrid,
    intra: bool,
    profile: FormatProfile,
) -> BTreeSet<i32> {
    if grid.block_bin_count <= 0 {
        return BTreeSet::new();
    }
    if profile.diagonal_block_layout && intra {
        diagonal_blocks(region, grid)
    } else {
        grid_blocks(region, grid, intra)
    }
}

/// Row/column block numbering, including the mirrored lower triangle when intra-chromosomal
#[must_use]
pub fn grid_blocks(region: BinRegion, grid: BlockGrid, intra: bool) -> BTreeSet<i32> {
    let bbc = i64::from(grid.block_bin_count);
    let col1 = (region.x0 / bbc) as i32;
    let col2 = ((region.x1 + 1) / bbc) as i32;
    let row1 = (region.y0 / bbc) as i32;
    let row2 = ((region.y1 + 1) / bbc) as i32;

    let mut blocks = BTreeSet::new();
    for r in row1..=row2 {
        for c in col1..=col2 {
            blocks.insert(r * grid.block_column_count + c);
        }
    }
    if intra {
        for r in col1..=col2 {
            for c in row1..=row2 {
                blocks.insert(r * grid.block_column_count + c);
            }
        }
    }
    blocks
}

/// Diagonal-band block numbering (`depth * block_column_count + pad`)
#[must_use]
pub fn diagonal_blocks(region: BinRegion, grid: BlockGrid) -> BTreeSet<i32> {
    let BinRegion { x0, x1, y0, y1 } = region;
    let bbc = i64::from(grid.block_bin_count);

    let lower_pad = ((x0 + y0) / 2 / bbc) as i32;
    let higher_pad = ((x1 + y1) / 2 / bbc + 1) as i32;

    let depth = |a: i64, b: i64| -> i32 {
        (1.0 + (a - b).abs() as f64 / SQRT_2 / bbc as f64).log2() as i32
    };
    let depth_a = depth(x0, y1);
    let depth_b = depth(x1, y0);

    let crosses_diagonal = (x0 > y1 && x1 < y0) || (x1 > y0 && x0 < y1);
    let nearer = if crosses_diagonal {
        0
    } else {
        depth_a.min(depth_b)
    };
    let further = depth_a.max(depth_b) + 1;

    let mut blocks = BTreeSet::new();
    for d in nearer..=further {
        for pad in lower_pad..=higher_pad {
            blocks.insert(d * grid.block_column_count + pad);
        }
    }
    blocks
}
