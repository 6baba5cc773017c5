//! # hicstraw
//!
//! Random-access reader for Hi-C contact-matrix (`.hic`) files.
//!
//! A `.hic` file stores, per chromosome pair and per resolution, a sparse contact
//! matrix split into zlib-compressed blocks, plus normalization vectors and
//! expected-value curves. This crate locates one pair's matrix through the footer
//! index without scanning the file, decodes only the blocks covering the queried
//! region, and applies the requested transform (observed, observed/expected, or
//! expected, with optional normalization).
//!
//! Files are read through the [`ByteSource`] abstraction, so local files (memory
//! mapped) and remote files (HTTP range requests, behind the `http` feature) are
//! interchangeable.
//!
//! The crate also implements the `HICSLICE` companion format: a gzip stream of
//! fixed-size records holding a whole genome-wide dump at one resolution.
//!
//! ## Example
//!
//! ```no_run
//! use hicstraw::{straw, MatrixType, Normalization, Unit};
//!
//! let records = straw(
//!     MatrixType::Observed,
//!     &Normalization::None,
//!     "sample.hic",
//!     "chr1:0:1000000",
//!     "chr1:0:1000000",
//!     Unit::Bp,
//!     5000,
//! )
//! .unwrap();
//! for record in records {
//!     println!("{}\t{}\t{}", record.bin_x, record.bin_y, record.counts);
//! }
//! ```

#![allow(clippy::module_inception)]

/// Binary layout primitives of the `.hic` format
pub mod core;

/// Error definitions
pub mod error;

/// Open `.hic` files and matrix sessions
mod read;

/// Query configuration and the `straw` entry point
mod query;

/// The `HICSLICE` companion format
pub mod slice;

/// Byte-range providers
pub mod source;

#[cfg(test)]
pub(crate) mod testing;

pub use core::{
    Chromosome, ContactRecord, FileHeader, FormatProfile, IndexEntry, MatrixType,
    Normalization, Unit,
};
pub use error::{Error, IntoHicError, Result};
pub use query::{straw, Locus, Query, QueryBuilder};
pub use read::{DenseMatrix, HicFile, MatrixZoomData};
pub use slice::{dump_genome_wide, DumpSummary, SliceContact, SliceReader, SliceWriter};
pub use source::{open_source, ByteSource, MemorySource, MmapSource, SourceReader};

#[cfg(feature = "http")]
pub use source::HttpSource;

/// Prefix of the NUL-terminated magic string opening every `.hic` file
pub const HIC_MAGIC: &[u8; 3] = b"HIC";

/// Magic string opening every slice file
pub const SLICE_MAGIC: &[u8; 8] = b"HICSLICE";

/// Oldest supported `.hic` format version
pub const MIN_VERSION: i32 = 6;

/// Read-ahead window (in bytes) of [`SourceReader`]
pub const DEFAULT_CHUNK_SIZE: usize = 100_000;

/// Initial decompression buffer size as a multiple of the compressed block size
pub const INFLATE_HEADROOM: usize = 10;
