use std::io::Write;

use flate2::write::GzEncoder;
use flate2::Compression;

use super::{SliceHeader, SliceRecord};
use crate::core::{MatrixType, Normalization, Unit};
use crate::error::{Error, QueryError, Result, SliceError};
use crate::read::HicFile;
use crate::source::ByteSource;

/// Writes a slice file through a single gzip stream
///
/// The header is written on construction; records follow in the order they are
/// pushed. Call [`SliceWriter::finish`] to terminate the stream.
pub struct SliceWriter<W: Write> {
    encoder: GzEncoder<W>,
    header: SliceHeader,
    records_written: usize,
}
impl<W: Write> SliceWriter<W> {
    /// Writes the header for `chromosomes`, keyed `0, 1, ...` in the given order
    pub fn new<I, N>(inner: W, resolution: i32, chromosomes: I) -> Result<Self>
    where
        I: IntoIterator<Item = N>,
        N: Into<String>,
    {
        let header = SliceHeader::new(resolution, chromosomes)?;
        let mut encoder = GzEncoder::new(inner, Compression::default());
        header.write_to(&mut encoder)?;
        Ok(Self {
            encoder,
            header,
            records_written: 0,
        })
    }

    #[must_use]
    pub fn header(&self) -> &SliceHeader {
        &self.header
    }

    /// Key assigned to a chromosome name
    pub fn key(&self, name: &str) -> Result<i16> {
        self.header.key(name)
    }

    #[must_use]
    pub fn records_written(&self) -> usize {
        self.records_written
    }

    pub fn push(&mut self, record: SliceRecord) -> Result<()> {
        for key in [record.chr1_key, record.chr2_key] {
            self.header.name(key)?;
        }
        self.encoder.write_all(record.as_bytes())?;
        self.records_written += 1;
        Ok(())
    }

    /// Terminates the gzip stream and returns the inner writer
    pub fn finish(self) -> Result<W> {
        let mut inner = self.encoder.finish()?;
        inner.flush()?;
        Ok(inner)
    }
}

/// Counters reported by [`dump_genome_wide`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DumpSummary {
    /// Chromosome pairs whose records were written
    pub pairs_written: usize,
    /// Chromosome pairs absent from the file at this resolution
    pub pairs_skipped: usize,
    pub records_written: usize,
}

/// Dumps every chromosome pair of `file` at one resolution into a slice stream
///
/// Chromosomes with index 0 (the whole-genome entry) are left out. Keys follow the
/// chromosome table order and pairs are visited as `(i, j)` with `i <= j`. Pairs
/// that the file does not store, or that lack the requested normalization vectors,
/// are logged and skipped.
pub fn dump_genome_wide<S: ByteSource, W: Write>(
    file: &mut HicFile<S>,
    matrix_type: MatrixType,
    norm: &Normalization,
    unit: Unit,
    resolution: i32,
    inner: W,
) -> Result<DumpSummary> {
    let names: Vec<String> = file
        .chromosomes()
        .iter()
        .filter(|c| c.index > 0)
        .map(|c| c.name.clone())
        .collect();
    let mut writer = SliceWriter::new(inner, resolution, names.iter().cloned())?;
    let mut summary = DumpSummary::default();

    for (i, name1) in names.iter().enumerate() {
        for name2 in &names[i..] {
            let mut session =
                match file.matrix_zoom_data(name1, name2, matrix_type, norm, unit, resolution) {
                    Ok(session) => session,
                    Err(e) if e.is_missing_data() => {
                        log::warn!("Skipping {name1}-{name2}: {e}");
                        summary.pairs_skipped += 1;
                        continue;
                    }
                    Err(e) => return Err(e),
                };
            let records = match session.all_records() {
                Ok(records) => records,
                Err(Error::QueryError(e @ QueryError::MissingNormalizationVector { .. })) => {
                    log::warn!("Skipping {name1}-{name2}: {e}");
                    summary.pairs_skipped += 1;
                    continue;
                }
                Err(e) => return Err(e),
            };

            // the session reports its axes in storage order
            let key1 = writer.key(&session.chrom1().name)?;
            let key2 = writer.key(&session.chrom2().name)?;
            for record in &records {
                writer.push(SliceRecord::new(
                    key1,
                    record.bin_x,
                    key2,
                    record.bin_y,
                    record.counts,
                ))?;
            }
            log::debug!("Wrote {} records for {name1}-{name2}", records.len());
            summary.pairs_written += 1;
        }
    }

    summary.records_written = writer.records_written();
    writer.finish()?;
    Ok(summary)
}
