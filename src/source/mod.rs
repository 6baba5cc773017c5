//! Byte-range providers
//!
//! Every component of the reader addresses the file by absolute offset, so the only
//! thing a transport has to offer is "read these bytes at that offset". Local files
//! are memory mapped, remote files are fetched with HTTP range requests (feature
//! `http`), and in-memory buffers are supported for tests and embedding.

use std::fs::File;
use std::path::Path;

use auto_impl::auto_impl;
use memmap2::Mmap;

use crate::error::{Result, SourceError};

mod http;
mod reader;

#[cfg(feature = "http")]
pub use http::HttpSource;
pub use reader::SourceReader;

/// Random access to the bytes of one resource
#[auto_impl(&mut, Box)]
pub trait ByteSource {
    /// Reads up to `buf.len()` bytes starting at `offset`
    ///
    /// Returns the number of bytes read, which is only `0` when `offset` is at or
    /// past the end of the resource.
    fn read_at(&mut self, offset: u64, buf: &mut [u8]) -> Result<usize>;

    /// Total length of the resource if it is known
    fn total_len(&mut self) -> Result<Option<u64>>;

    /// Reads exactly `len` bytes starting at `offset`
    ///
    /// Fails with [`SourceError::ShortRead`] if the resource ends first.
    fn read_exact_at(&mut self, offset: u64, len: usize) -> Result<Vec<u8>> {
        let mut buf = vec![0; len];
        let mut filled = 0;
        while filled < len {
            let n = self.read_at(offset + filled as u64, &mut buf[filled..])?;
            if n == 0 {
                return Err(SourceError::ShortRead {
                    offset,
                    expected: len,
                    actual: filled,
                }
                .into());
            }
            filled += n;
        }
        Ok(buf)
    }
}

/// Copies the bytes of `data` starting at `offset` into `buf`
fn copy_from_slice_at(data: &[u8], offset: u64, buf: &mut [u8]) -> usize {
    let Ok(start) = usize::try_from(offset) else {
        return 0;
    };
    if start >= data.len() {
        return 0;
    }
    let n = buf.len().min(data.len() - start);
    buf[..n].copy_from_slice(&data[start..start + n]);
    n
}

/// A local file accessed through a read-only memory map
pub struct MmapSource {
    mmap: Mmap,
}
impl MmapSource {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(path)?;

        // Safety: the file is opened read-only and is not expected to change while mapped
        let mmap = unsafe { Mmap::map(&file)? };
        Ok(Self { mmap })
    }

    #[must_use]
    pub fn as_slice(&self) -> &[u8] {
        &self.mmap
    }
}
impl ByteSource for MmapSource {
    fn read_at(&mut self, offset: u64, buf: &mut [u8]) -> Result<usize> {
        Ok(copy_from_slice_at(&self.mmap, offset, buf))
    }

    fn total_len(&mut self) -> Result<Option<u64>> {
        Ok(Some(self.mmap.len() as u64))
    }
}

/// An owned in-memory buffer
#[derive(Debug, Clone, Default)]
pub struct MemorySource {
    data: Vec<u8>,
}
impl MemorySource {
    #[must_use]
    pub fn new(data: Vec<u8>) -> Self {
        Self { data }
    }

    #[must_use]
    pub fn into_inner(self) -> Vec<u8> {
        self.data
    }
}
impl From<Vec<u8>> for MemorySource {
    fn from(data: Vec<u8>) -> Self {
        Self::new(data)
    }
}
impl ByteSource for MemorySource {
    fn read_at(&mut self, offset: u64, buf: &mut [u8]) -> Result<usize> {
        Ok(copy_from_slice_at(&self.data, offset, buf))
    }

    fn total_len(&mut self) -> Result<Option<u64>> {
        Ok(Some(self.data.len() as u64))
    }
}

/// Checks whether a path names a remote resource
#[must_use]
pub fn is_remote(path: &str) -> bool {
    path.starts_with("http")
}

/// Opens a local path or a remote URL behind a boxed [`ByteSource`]
pub fn open_source(path: &str) -> Result<Box<dyn ByteSource>> {
    if is_remote(path) {
        open_remote(path)
    } else {
        log::debug!("Opening local file {path}");
        Ok(Box::new(MmapSource::open(path)?))
    }
}

#[cfg(feature = "http")]
fn open_remote(url: &str) -> Result<Box<dyn ByteSource>> {
    log::debug!("Opening remote file {url}");
    Ok(Box::new(HttpSource::new(url)?))
}

#[cfg(not(feature = "http"))]
fn open_remote(url: &str) -> Result<Box<dyn ByteSource>> {
    Err(SourceError::RemoteDisabled(url.to_string()).into())
}
