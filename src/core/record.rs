/// One non-zero cell of a contact matrix
///
/// Records produced by a query carry genome coordinates (bin number multiplied by the
/// resolution) on the canonical axes: `bin_x` on the chromosome with the lower table
/// index, `bin_y` on the other one. Records decoded straight from a block carry raw
/// bin numbers instead.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ContactRecord {
    pub bin_x: i32,
    pub bin_y: i32,
    pub counts: f32,
}
impl ContactRecord {
    #[must_use]
    pub fn new(bin_x: i32, bin_y: i32, counts: f32) -> Self {
        Self {
            bin_x,
            bin_y,
            counts,
        }
    }
}

/// Byte range of a compressed block or a normalization vector within the file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct IndexEntry {
    pub position: i64,
    pub size: i64,
}
impl IndexEntry {
    #[must_use]
    pub fn new(position: i64, size: i64) -> Self {
        Self { position, size }
    }

    /// An entry with no payload, which decodes to nothing
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.size <= 0
    }
}
