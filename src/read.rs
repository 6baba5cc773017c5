//! Open `.hic` files and matrix sessions
//!
//! [`HicFile`] parses the header once and keeps the byte source open. Each query
//! resolves a fresh [`MatrixZoomData`] session: footer lookup, normalization and
//! expected vectors, and the zoom level's block index. Nothing resolved for one
//! session is shared with another.

use crate::core::block::read_block;
use crate::core::footer::{self, FooterRequest};
use crate::core::selector::select_blocks;
use crate::core::zoom::{locate_zoom, ZoomHeader};
use crate::core::{
    read_normalization_vector, BinRegion, BlockGrid, Chromosome, ContactRecord, FileHeader,
    MatrixType, NormalizationApplier, Normalization, Unit,
};
use crate::error::{QueryError, Result};
use crate::query::Query;
use crate::source::{open_source, ByteSource, SourceReader};

/// An open `.hic` file
pub struct HicFile<S: ByteSource> {
    reader: SourceReader<S>,
    header: FileHeader,
}

impl HicFile<Box<dyn ByteSource>> {
    /// Opens a local path or a remote URL
    pub fn open(path: &str) -> Result<Self> {
        Self::new(open_source(path)?)
    }
}

impl<S: ByteSource> HicFile<S> {
    /// Parses the header of `source`
    pub fn new(source: S) -> Result<Self> {
        Self::from_reader(SourceReader::new(source))
    }

    /// Parses the header through an already configured reader
    pub fn from_reader(mut reader: SourceReader<S>) -> Result<Self> {
        let header = FileHeader::read_from(&mut reader)?;
        Ok(Self { reader, header })
    }

    #[must_use]
    pub fn header(&self) -> &FileHeader {
        &self.header
    }

    #[must_use]
    pub fn version(&self) -> i32 {
        self.header.version
    }

    #[must_use]
    pub fn genome_id(&self) -> &str {
        &self.header.genome_id
    }

    /// Chromosomes in table order, including the whole-genome entry
    #[must_use]
    pub fn chromosomes(&self) -> &[Chromosome] {
        self.header.chromosomes()
    }

    /// Base-pair resolutions
    #[must_use]
    pub fn resolutions(&self) -> &[i32] {
        &self.header.bp_resolutions
    }

    #[must_use]
    pub fn chromosome(&self, name: &str) -> Option<&Chromosome> {
        self.header.chromosome(name)
    }

    fn lookup(&self, name: &str) -> Result<Chromosome> {
        self.chromosome(name)
            .cloned()
            .ok_or_else(|| QueryError::ChromosomeNotFound(name.to_string()).into())
    }

    /// Resolves a matrix session for a chromosome pair
    ///
    /// The pair is put in canonical order (lower table index first), and the returned
    /// session works in that order. Fails with the errors of footer and zoom-level
    /// resolution; see [`crate::Error::is_missing_data`] for the ones that mean
    /// "not stored in this file".
    pub fn matrix_zoom_data(
        &mut self,
        chr1: &str,
        chr2: &str,
        matrix_type: MatrixType,
        norm: &Normalization,
        unit: Unit,
        resolution: i32,
    ) -> Result<MatrixZoomData<'_, S>> {
        let mut chrom1 = self.lookup(chr1)?;
        let mut chrom2 = self.lookup(chr2)?;
        if chrom1.index > chrom2.index {
            std::mem::swap(&mut chrom1, &mut chrom2);
        }
        self.session(chrom1, chrom2, matrix_type, norm, unit, resolution)
    }

    fn session(
        &mut self,
        chrom1: Chromosome,
        chrom2: Chromosome,
        matrix_type: MatrixType,
        norm: &Normalization,
        unit: Unit,
        resolution: i32,
    ) -> Result<MatrixZoomData<'_, S>> {
        let profile = self.header.profile();
        let intra = chrom1.index == chrom2.index;
        let request = FooterRequest {
            c1: chrom1.index,
            c2: chrom2.index,
            matrix_type,
            norm,
            unit,
            resolution,
        };
        let data = footer::resolve(&mut self.reader, profile, self.header.footer_offset, &request)?;

        let mut applier = NormalizationApplier::new(matrix_type, resolution, intra)
            .with_expected(data.expected);
        if !norm.is_none() {
            let missing = |chromosome: i32| QueryError::MissingNormalizationVector {
                norm: norm.to_string(),
                chromosome,
                unit: unit.to_string(),
                resolution,
            };
            let source = self.reader.source_mut();
            let c1_norm = match data.c1_norm {
                Some(entry) => Some(read_normalization_vector(source, entry, profile)?),
                None => None,
            };
            let c2_norm = if intra {
                c1_norm.clone()
            } else {
                match data.c2_norm {
                    Some(entry) => Some(read_normalization_vector(source, entry, profile)?),
                    None => None,
                }
            };
            applier = match (c1_norm, c2_norm) {
                (Some(c1), Some(c2)) => applier.with_norm_vectors(c1, c2),
                (None, _) => applier.with_missing_norm(missing(chrom1.index)),
                (_, None) => applier.with_missing_norm(missing(chrom2.index)),
            };
        }

        let zoom = locate_zoom(&mut self.reader, data.matrix_offset, unit, resolution)?;
        if !intra {
            let bins1 = chrom1.num_bins(resolution) as f32;
            let bins2 = chrom2.num_bins(resolution) as f32;
            let avg_count = (zoom.sum_counts / bins1) / bins2;
            applier = applier.with_avg_count(f64::from(avg_count));
        }

        Ok(MatrixZoomData {
            file: self,
            chrom1,
            chrom2,
            matrix_type,
            norm: norm.clone(),
            unit,
            resolution,
            zoom,
            applier,
        })
    }

    /// Answers one query
    ///
    /// Records are returned with genome coordinates on the canonical axes. Pairs,
    /// zoom levels and expected values absent from the file are logged and yield an
    /// empty result.
    pub fn query(&mut self, query: &Query) -> Result<Vec<ContactRecord>> {
        let (chrom1, chrom2, region) = self.canonical(query)?;
        let session = self.session(
            chrom1,
            chrom2,
            query.matrix_type,
            &query.norm,
            query.unit,
            query.resolution,
        );
        match session {
            Ok(mut session) => session.records(region),
            Err(e) if e.is_missing_data() => {
                log::warn!("{e}");
                Ok(Vec::new())
            }
            Err(e) => Err(e),
        }
    }

    /// Answers one query as a dense matrix
    ///
    /// The matrix spans the bins of the queried ranges (canonical axes, rows along
    /// the first chromosome). Its memory cost grows with the product of both extents.
    pub fn dense_matrix(&mut self, query: &Query) -> Result<DenseMatrix> {
        let (chrom1, chrom2, region) = self.canonical(query)?;
        let intra = chrom1.index == chrom2.index;
        let records = self.query(query)?;

        let bins = BinRegion::from_genome(region, query.resolution);
        let mut matrix = DenseMatrix::new(bins, query.resolution);
        for record in records {
            matrix.set(i64::from(record.bin_x), i64::from(record.bin_y), record.counts);
            if intra {
                matrix.set(i64::from(record.bin_y), i64::from(record.bin_x), record.counts);
            }
        }
        Ok(matrix)
    }

    /// Looks up both chromosomes and puts the pair and its ranges in canonical order
    fn canonical(&self, query: &Query) -> Result<(Chromosome, Chromosome, [i64; 4])> {
        let chrom1 = self.lookup(&query.chr1.name)?;
        let chrom2 = self.lookup(&query.chr2.name)?;
        let (x0, x1) = query.chr1.resolve(chrom1.length);
        let (y0, y1) = query.chr2.resolve(chrom2.length);
        if chrom1.index > chrom2.index {
            Ok((chrom2, chrom1, [y0, y1, x0, x1]))
        } else {
            Ok((chrom1, chrom2, [x0, x1, y0, y1]))
        }
    }
}

/// A resolved matrix for one chromosome pair at one zoom level
///
/// Borrows the file mutably so the same session can be queried for several regions.
pub struct MatrixZoomData<'a, S: ByteSource> {
    file: &'a mut HicFile<S>,
    chrom1: Chromosome,
    chrom2: Chromosome,
    matrix_type: MatrixType,
    norm: Normalization,
    unit: Unit,
    resolution: i32,
    zoom: ZoomHeader,
    applier: NormalizationApplier,
}
impl<S: ByteSource> MatrixZoomData<'_, S> {
    /// Chromosome on the x axis (lower table index)
    #[must_use]
    pub fn chrom1(&self) -> &Chromosome {
        &self.chrom1
    }

    /// Chromosome on the y axis
    #[must_use]
    pub fn chrom2(&self) -> &Chromosome {
        &self.chrom2
    }

    #[must_use]
    pub fn is_intra(&self) -> bool {
        self.chrom1.index == self.chrom2.index
    }

    #[must_use]
    pub fn matrix_type(&self) -> MatrixType {
        self.matrix_type
    }

    #[must_use]
    pub fn norm(&self) -> &Normalization {
        &self.norm
    }

    #[must_use]
    pub fn unit(&self) -> Unit {
        self.unit
    }

    #[must_use]
    pub fn resolution(&self) -> i32 {
        self.resolution
    }

    #[must_use]
    pub fn zoom(&self) -> &ZoomHeader {
        &self.zoom
    }

    /// Expected values by diagonal distance (empty unless intra-chromosomal oe/expected)
    #[must_use]
    pub fn expected_values(&self) -> &[f64] {
        self.applier.expected()
    }

    /// Average count per cell (inter-chromosomal only)
    #[must_use]
    pub fn avg_count(&self) -> f64 {
        self.applier.avg_count()
    }

    /// Records of the whole matrix
    pub fn all_records(&mut self) -> Result<Vec<ContactRecord>> {
        let region = [0, self.chrom1.length, 0, self.chrom2.length];
        self.records(region)
    }

    /// Records inside `region` (`[x0, x1, y0, y1]`, inclusive genome coordinates)
    ///
    /// For intra-chromosomal matrices, records inside the transposed rectangle are
    /// returned too since only one triangle is stored.
    pub fn records(&mut self, region: [i64; 4]) -> Result<Vec<ContactRecord>> {
        let [x0, x1, y0, y1] = region;
        let intra = self.is_intra();
        let profile = self.file.header.profile();
        let resolution = i64::from(self.resolution);

        let grid = BlockGrid {
            block_bin_count: self.zoom.block_bin_count,
            block_column_count: self.zoom.block_column_count,
        };
        let blocks = select_blocks(
            BinRegion::from_genome(region, self.resolution),
            grid,
            intra,
            profile,
        );
        log::debug!("Selected {} blocks for region {region:?}", blocks.len());

        let source = self.file.reader.source_mut();
        let mut records = Vec::new();
        for number in blocks {
            let Some(entry) = self.zoom.block(number) else {
                continue;
            };
            for record in read_block(source, entry, profile)? {
                let x = i64::from(record.bin_x) * resolution;
                let y = i64::from(record.bin_y) * resolution;
                let inside = (x0..=x1).contains(&x) && (y0..=y1).contains(&y);
                let mirrored = intra && (x0..=x1).contains(&y) && (y0..=y1).contains(&x);
                if !inside && !mirrored {
                    continue;
                }
                let counts = self
                    .applier
                    .apply(record.bin_x, record.bin_y, record.counts)?;
                records.push(ContactRecord::new(x as i32, y as i32, counts));
            }
        }
        Ok(records)
    }
}

/// A dense, row-major rendering of a query
#[derive(Debug, Clone, PartialEq)]
pub struct DenseMatrix {
    pub rows: usize,
    pub cols: usize,
    /// Genome coordinate of row 0 (aligned to the resolution)
    pub origin_x: i64,
    /// Genome coordinate of column 0 (aligned to the resolution)
    pub origin_y: i64,
    pub resolution: i32,
    pub data: Vec<f32>,
}
impl DenseMatrix {
    fn new(bins: BinRegion, resolution: i32) -> Self {
        let rows = usize::try_from(bins.x1 - bins.x0 + 1).unwrap_or(0);
        let cols = usize::try_from(bins.y1 - bins.y0 + 1).unwrap_or(0);
        let res = i64::from(resolution.max(1));
        Self {
            rows,
            cols,
            origin_x: bins.x0 * res,
            origin_y: bins.y0 * res,
            resolution,
            data: vec![0.0; rows * cols],
        }
    }

    fn cell(&self, x: i64, y: i64) -> Option<usize> {
        let res = i64::from(self.resolution.max(1));
        let row = usize::try_from((x - self.origin_x).div_euclid(res)).ok()?;
        let col = usize::try_from((y - self.origin_y).div_euclid(res)).ok()?;
        (row < self.rows && col < self.cols).then_some(row * self.cols + col)
    }

    /// Stores a value at genome coordinates; non-finite values are stored as zero
    fn set(&mut self, x: i64, y: i64, value: f32) {
        if let Some(i) = self.cell(x, y) {
            self.data[i] = if value.is_finite() { value } else { 0.0 };
        }
    }

    /// Value at `(row, col)`
    #[must_use]
    pub fn get(&self, row: usize, col: usize) -> Option<f32> {
        (row < self.rows && col < self.cols).then(|| self.data[row * self.cols + col])
    }

    /// Value at genome coordinates
    #[must_use]
    pub fn at(&self, x: i64, y: i64) -> Option<f32> {
        self.cell(x, y).map(|i| self.data[i])
    }
}
