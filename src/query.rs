//! Query configuration
//!
//! A [`Query`] names everything needed to pull one rectangle out of a `.hic` file:
//! the transform, the normalization, two loci, and the resolution.
//!
//! ```no_run
//! use hicstraw::{HicFile, MatrixType, Normalization, QueryBuilder};
//!
//! # fn main() -> hicstraw::Result<()> {
//! let query = QueryBuilder::new("chr1:0:1000000", "chr2", 25000)
//!     .matrix_type(MatrixType::Oe)
//!     .norm(Normalization::Kr)
//!     .build()?;
//!
//! let mut file = HicFile::open("sample.hic")?;
//! for record in file.query(&query)? {
//!     println!("{}\t{}\t{}", record.bin_x, record.bin_y, record.counts);
//! }
//! # Ok(())
//! # }
//! ```

use std::fmt;
use std::str::FromStr;

use crate::core::{ContactRecord, MatrixType, Normalization, Unit};
use crate::error::{QueryError, Result};
use crate::read::HicFile;

/// A chromosome name with an optional genome range, written `name[:start:end]`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Locus {
    pub name: String,
    /// Inclusive genome range; `None` means the whole chromosome
    pub range: Option<(i64, i64)>,
}
impl Locus {
    #[must_use]
    pub fn whole(name: &str) -> Self {
        Self {
            name: name.to_string(),
            range: None,
        }
    }

    #[must_use]
    pub fn with_range(name: &str, start: i64, end: i64) -> Self {
        Self {
            name: name.to_string(),
            range: Some((start, end)),
        }
    }

    /// The queried range, defaulting to `[0, length]`
    #[must_use]
    pub fn resolve(&self, length: i64) -> (i64, i64) {
        self.range.unwrap_or((0, length))
    }
}
impl FromStr for Locus {
    type Err = QueryError;
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let invalid = || QueryError::InvalidLocus(s.to_string());
        let parts: Vec<&str> = s.split(':').collect();
        match parts.as_slice() {
            [name] if !name.is_empty() => Ok(Self::whole(name)),
            [name, start, end] if !name.is_empty() => {
                let start = start.trim().parse().map_err(|_| invalid())?;
                let end = end.trim().parse().map_err(|_| invalid())?;
                Ok(Self::with_range(name, start, end))
            }
            _ => Err(invalid()),
        }
    }
}
impl fmt::Display for Locus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.range {
            Some((start, end)) => write!(f, "{}:{start}:{end}", self.name),
            None => f.write_str(&self.name),
        }
    }
}

/// One fully specified matrix query
#[derive(Debug, Clone, PartialEq)]
pub struct Query {
    pub matrix_type: MatrixType,
    pub norm: Normalization,
    pub chr1: Locus,
    pub chr2: Locus,
    pub unit: Unit,
    pub resolution: i32,
}

/// Builder for [`Query`] values
///
/// Defaults to observed counts without normalization, in base pairs.
#[derive(Debug, Clone)]
pub struct QueryBuilder {
    chr1: String,
    chr2: String,
    resolution: i32,
    matrix_type: MatrixType,
    norm: Normalization,
    unit: Unit,
}
impl QueryBuilder {
    /// Creates a builder for two locus strings (`name[:start:end]`) at `resolution`
    #[must_use]
    pub fn new(chr1: &str, chr2: &str, resolution: i32) -> Self {
        Self {
            chr1: chr1.to_string(),
            chr2: chr2.to_string(),
            resolution,
            matrix_type: MatrixType::default(),
            norm: Normalization::default(),
            unit: Unit::default(),
        }
    }

    #[must_use]
    pub fn matrix_type(mut self, matrix_type: MatrixType) -> Self {
        self.matrix_type = matrix_type;
        self
    }

    #[must_use]
    pub fn norm(mut self, norm: Normalization) -> Self {
        self.norm = norm;
        self
    }

    #[must_use]
    pub fn unit(mut self, unit: Unit) -> Self {
        self.unit = unit;
        self
    }

    /// Parses the loci and builds the query
    ///
    /// # Errors
    ///
    /// Returns [`QueryError::InvalidLocus`] if either locus is malformed.
    pub fn build(self) -> Result<Query> {
        Ok(Query {
            matrix_type: self.matrix_type,
            norm: self.norm,
            chr1: self.chr1.parse()?,
            chr2: self.chr2.parse()?,
            unit: self.unit,
            resolution: self.resolution,
        })
    }
}

/// Opens `path` (local or remote) and answers one query
///
/// Chromosome pairs, zoom levels or expected values absent from the file yield an
/// empty result rather than an error.
pub fn straw(
    matrix_type: MatrixType,
    norm: &Normalization,
    path: &str,
    chr1: &str,
    chr2: &str,
    unit: Unit,
    resolution: i32,
) -> Result<Vec<ContactRecord>> {
    let query = QueryBuilder::new(chr1, chr2, resolution)
        .matrix_type(matrix_type)
        .norm(norm.clone())
        .unit(unit)
        .build()?;
    let mut file = HicFile::open(path)?;
    file.query(&query)
}
