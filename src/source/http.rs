//! HTTP range-request source
//!
//! The total size of a remote file is learnt from the `Content-Range` header of the
//! first range response and remembered per URL for the lifetime of the process, so
//! later handles on the same URL can clamp their final-chunk reads without an extra
//! round trip.

#[cfg(feature = "http")]
use std::collections::HashMap;
#[cfg(feature = "http")]
use std::sync::{Mutex, OnceLock};

#[cfg(feature = "http")]
use reqwest::blocking::Client;

#[cfg(feature = "http")]
use super::ByteSource;
#[cfg(feature = "http")]
use crate::error::{Result, SourceError};

/// Extracts the total resource length from a `Content-Range` value
///
/// `bytes 0-99/1234` yields `Some(1234)`; an unknown total (`bytes 0-99/*`) or a
/// malformed value yields `None`.
#[cfg_attr(not(feature = "http"), allow(dead_code))]
pub(crate) fn parse_content_range(value: &str) -> Option<u64> {
    let (unit, rest) = value.trim().split_once(' ')?;
    if !unit.eq_ignore_ascii_case("bytes") {
        return None;
    }
    let (_, total) = rest.split_once('/')?;
    total.trim().parse().ok()
}

#[cfg(feature = "http")]
fn size_cache() -> &'static Mutex<HashMap<String, u64>> {
    static SIZE_CACHE: OnceLock<Mutex<HashMap<String, u64>>> = OnceLock::new();
    SIZE_CACHE.get_or_init(|| Mutex::new(HashMap::new()))
}

#[cfg(feature = "http")]
fn cached_size(url: &str) -> Option<u64> {
    size_cache()
        .lock()
        .ok()
        .and_then(|cache| cache.get(url).copied())
}

#[cfg(feature = "http")]
fn remember_size(url: &str, size: u64) {
    if let Ok(mut cache) = size_cache().lock() {
        cache.insert(url.to_string(), size);
    }
}

/// A remote file read through HTTP `Range` requests
#[cfg(feature = "http")]
pub struct HttpSource {
    url: String,
    client: Client,
    len: Option<u64>,
}

#[cfg(feature = "http")]
impl HttpSource {
    pub fn new(url: &str) -> Result<Self> {
        let client = Client::builder()
            .build()
            .map_err(|e| SourceError::Network(e.to_string()))?;
        Ok(Self {
            url: url.to_string(),
            client,
            len: cached_size(url),
        })
    }

    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Fetches the inclusive byte range `[start, end]`
    fn fetch(&mut self, start: u64, end: u64) -> Result<Option<Vec<u8>>> {
        let response = self
            .client
            .get(&self.url)
            .header("Range", format!("bytes={start}-{end}"))
            .send()
            .map_err(|e| SourceError::Network(e.to_string()))?;

        let status = response.status().as_u16();
        match status {
            206 => {}
            // requested range starts past the end of the resource
            416 => return Ok(None),
            200 => return Err(SourceError::RangeNotSupported(self.url.clone()).into()),
            _ if !response.status().is_success() => {
                return Err(SourceError::Http {
                    status,
                    url: self.url.clone(),
                }
                .into())
            }
            _ => {}
        }

        if let Some(total) = response
            .headers()
            .get("content-range")
            .and_then(|v| v.to_str().ok())
            .and_then(parse_content_range)
        {
            if self.len != Some(total) {
                log::debug!("Remote size of {} is {total} bytes", self.url);
                remember_size(&self.url, total);
                self.len = Some(total);
            }
        }

        let bytes = response
            .bytes()
            .map_err(|e| SourceError::Network(e.to_string()))?;
        Ok(Some(bytes.to_vec()))
    }
}

#[cfg(feature = "http")]
impl ByteSource for HttpSource {
    fn read_at(&mut self, offset: u64, buf: &mut [u8]) -> Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }
        let mut end = offset + buf.len() as u64 - 1;
        if let Some(len) = self.len {
            if offset >= len {
                return Ok(0);
            }
            end = end.min(len - 1);
        }
        let Some(bytes) = self.fetch(offset, end)? else {
            return Ok(0);
        };
        let n = bytes.len().min(buf.len());
        buf[..n].copy_from_slice(&bytes[..n]);
        Ok(n)
    }

    fn total_len(&mut self) -> Result<Option<u64>> {
        if self.len.is_none() {
            self.fetch(0, 0)?;
        }
        Ok(self.len)
    }
}
