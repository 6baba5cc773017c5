use std::fs::File;
use std::io::{self, BufReader, Read, Seek, SeekFrom};
use std::path::Path;

use bytemuck::Zeroable;
use flate2::read::GzDecoder;

use super::{SliceContact, SliceHeader, SliceRecord, SLICE_RECORD_SIZE};
use crate::error::Result;

/// Reads slice files
///
/// Every read decodes the stream from the start, so the reader can be queried
/// repeatedly for different pairs.
pub struct SliceReader<R: Read + Seek> {
    inner: R,
    header: SliceHeader,
}

impl SliceReader<BufReader<File>> {
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(path)?;
        Self::new(BufReader::new(file))
    }
}

impl<R: Read + Seek> SliceReader<R> {
    /// Parses the header of the stream in `inner`
    pub fn new(mut inner: R) -> Result<Self> {
        inner.seek(SeekFrom::Start(0))?;
        let header = SliceHeader::read_from(&mut GzDecoder::new(&mut inner))?;
        Ok(Self { inner, header })
    }

    #[must_use]
    pub fn header(&self) -> &SliceHeader {
        &self.header
    }

    #[must_use]
    pub fn resolution(&self) -> i32 {
        self.header.resolution
    }

    /// Chromosome names in key order
    #[must_use]
    pub fn chromosomes(&self) -> Vec<&str> {
        self.header.chromosomes().collect()
    }

    pub fn chromosome_name(&self, key: i16) -> Result<&str> {
        self.header.name(key)
    }

    /// Every record in the file, unfiltered
    pub fn read_all(&mut self) -> Result<Vec<SliceContact>> {
        let mut contacts = Vec::new();
        let header = &self.header;
        scan(&mut self.inner, |record| {
            contacts.push(header.contact(&record)?);
            Ok(())
        })?;
        Ok(contacts)
    }

    /// Records stored for exactly `(chr1, chr2)` with a finite positive value
    ///
    /// The key order is not canonicalized: asking for `(chr2, chr1)` only returns
    /// records written in that orientation.
    pub fn read_pair(&mut self, chr1: &str, chr2: &str) -> Result<Vec<SliceContact>> {
        let key1 = self.header.key(chr1)?;
        let key2 = self.header.key(chr2)?;

        let mut contacts = Vec::new();
        let header = &self.header;
        scan(&mut self.inner, |record| {
            if record.chr1_key == key1 && record.chr2_key == key2 && record.has_signal() {
                contacts.push(header.contact(&record)?);
            }
            Ok(())
        })?;
        Ok(contacts)
    }

    pub fn into_inner(self) -> R {
        self.inner
    }
}

/// Decodes the record stream of `inner` from the start
fn scan<R, F>(inner: &mut R, mut f: F) -> Result<()>
where
    R: Read + Seek,
    F: FnMut(SliceRecord) -> Result<()>,
{
    inner.seek(SeekFrom::Start(0))?;
    let mut decoder = BufReader::new(GzDecoder::new(&mut *inner));
    SliceHeader::read_from(&mut decoder)?;

    let mut count = 0usize;
    while let Some(record) = next_record(&mut decoder)? {
        f(record)?;
        count += 1;
    }
    log::trace!("Scanned {count} slice records");
    Ok(())
}

fn next_record<R: Read>(reader: &mut R) -> Result<Option<SliceRecord>> {
    let mut record = SliceRecord::zeroed();
    let filled = fill(reader, bytemuck::bytes_of_mut(&mut record))?;
    match filled {
        0 => Ok(None),
        SLICE_RECORD_SIZE => Ok(Some(record)),
        partial => {
            log::warn!(
                "Ignoring truncated trailing slice record ({partial} of {SLICE_RECORD_SIZE} bytes)"
            );
            Ok(None)
        }
    }
}

/// Reads until `buf` is full or the stream ends
fn fill<R: Read>(reader: &mut R, buf: &mut [u8]) -> Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
            Err(e) => return Err(e.into()),
        }
    }
    Ok(filled)
}
