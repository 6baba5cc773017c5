use std::io::{self, Read, Seek, SeekFrom};

use super::ByteSource;
use crate::DEFAULT_CHUNK_SIZE;

/// Adapts a [`ByteSource`] into a buffered `Read + Seek` stream
///
/// Reads are served from a read-ahead window of `chunk_size` bytes, so the many small
/// typed reads of header and footer parsing do not each hit the transport. Seeking
/// inside the current window does not discard it.
pub struct SourceReader<S: ByteSource> {
    source: S,
    /// Current absolute stream position
    pos: u64,
    /// Absolute offset of `window[0]`
    window_start: u64,
    window: Vec<u8>,
    chunk_size: usize,
}
impl<S: ByteSource> SourceReader<S> {
    pub fn new(source: S) -> Self {
        Self::with_chunk_size(source, DEFAULT_CHUNK_SIZE)
    }

    /// Creates a reader with a custom read-ahead window size (at least one byte)
    pub fn with_chunk_size(source: S, chunk_size: usize) -> Self {
        Self {
            source,
            pos: 0,
            window_start: 0,
            window: Vec::new(),
            chunk_size: chunk_size.max(1),
        }
    }

    #[must_use]
    pub fn position(&self) -> u64 {
        self.pos
    }

    #[must_use]
    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    pub fn source_mut(&mut self) -> &mut S {
        &mut self.source
    }

    pub fn into_inner(self) -> S {
        self.source
    }

    /// Bytes of the window at or after the current position
    fn buffered(&self) -> &[u8] {
        let window_end = self.window_start + self.window.len() as u64;
        if self.pos >= self.window_start && self.pos < window_end {
            let start = (self.pos - self.window_start) as usize;
            &self.window[start..]
        } else {
            &[]
        }
    }

    fn fill_window(&mut self, min_len: usize) -> io::Result<()> {
        let len = self.chunk_size.max(min_len);
        self.window.resize(len, 0);
        let n = self
            .source
            .read_at(self.pos, &mut self.window)
            .map_err(io::Error::other)?;
        self.window.truncate(n);
        self.window_start = self.pos;
        log::trace!("Fetched {n} bytes at offset {}", self.pos);
        Ok(())
    }
}

impl<S: ByteSource> Read for SourceReader<S> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }

        // Large reads bypass the window entirely
        if self.buffered().is_empty() && buf.len() >= self.chunk_size {
            let n = self
                .source
                .read_at(self.pos, buf)
                .map_err(io::Error::other)?;
            self.pos += n as u64;
            return Ok(n);
        }

        if self.buffered().is_empty() {
            self.fill_window(buf.len())?;
        }
        let available = self.buffered();
        let n = available.len().min(buf.len());
        buf[..n].copy_from_slice(&available[..n]);
        self.pos += n as u64;
        Ok(n)
    }
}

impl<S: ByteSource> Seek for SourceReader<S> {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        let target = match pos {
            SeekFrom::Start(offset) => Some(offset),
            SeekFrom::Current(delta) => self.pos.checked_add_signed(delta),
            SeekFrom::End(delta) => {
                let len = self
                    .source
                    .total_len()
                    .map_err(io::Error::other)?
                    .ok_or_else(|| {
                        io::Error::new(
                            io::ErrorKind::Unsupported,
                            "source length is unknown, cannot seek from end",
                        )
                    })?;
                len.checked_add_signed(delta)
            }
        };
        let target = target.ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::InvalidInput,
                "invalid seek to a negative or overflowing position",
            )
        })?;
        self.pos = target;
        Ok(target)
    }
}
