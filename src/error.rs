use std::error::Error as StdError;

/// Custom Result type for hicstraw operations, wrapping the custom [`Error`] type
pub type Result<T> = std::result::Result<T, Error>;

/// The main error type for the hicstraw library, encompassing all possible error cases
/// that can occur while reading `.hic` files or reading and writing slice files.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// Errors related to the file preamble (magic string and version)
    #[error("Error processing header: {0}")]
    HeaderError(#[from] HeaderError),

    /// Errors that occur while resolving a query against the footer and matrix records
    #[error("Error resolving query: {0}")]
    QueryError(#[from] QueryError),

    /// Errors that occur while decoding a compressed contact block
    #[error("Error decoding block: {0}")]
    BlockError(#[from] BlockError),

    /// Errors related to the HICSLICE format
    #[error("Error processing slice: {0}")]
    SliceError(#[from] SliceError),

    /// Errors raised by a byte source (local file or remote endpoint)
    #[error("Error reading source: {0}")]
    SourceError(#[from] SourceError),

    /// Standard I/O errors
    #[error("Error with IO: {0}")]
    IoError(#[from] std::io::Error),

    /// UTF-8 conversion errors
    #[error("Error with UTF8: {0}")]
    Utf8Error(#[from] std::str::Utf8Error),

    /// Generic errors for other unexpected situations
    #[error("Generic error: {0}")]
    GenericError(#[from] Box<dyn StdError + Send + Sync>),
}
impl Error {
    /// Checks if the error means "this data is legitimately absent from the file"
    ///
    /// Queries that hit one of these conditions degrade to an empty result instead
    /// of failing, which lets genome-wide dumps skip pairs the file does not store.
    ///
    /// # Returns
    ///
    /// * `true` for `PairNotIndexed`, `ZoomNotFound` and `MissingExpectedValues`
    /// * `false` for every other error
    #[must_use]
    pub fn is_missing_data(&self) -> bool {
        match self {
            Self::QueryError(err) => err.is_missing_data(),
            _ => false,
        }
    }

    /// Checks if the error comes from a truncated read (file shorter than its own offsets claim)
    #[must_use]
    pub fn is_truncation(&self) -> bool {
        match self {
            Self::IoError(err) => err.kind() == std::io::ErrorKind::UnexpectedEof,
            Self::SourceError(SourceError::ShortRead { .. }) => true,
            _ => false,
        }
    }
}

/// Errors specific to the fixed file preamble
#[derive(thiserror::Error, Debug)]
pub enum HeaderError {
    /// The NUL-terminated magic string does not begin with `HIC`
    ///
    /// # Arguments
    /// * `String` - The (lossily decoded) magic string that was found
    #[error("Hi-C magic string is missing, does not appear to be a hic file (found {0:?})")]
    InvalidMagic(String),

    /// The format version is older than the oldest supported revision
    ///
    /// # Arguments
    /// * `i32` - The unsupported version number that was found
    #[error("Version {0} no longer supported")]
    UnsupportedVersion(i32),
}

/// Errors that can occur while resolving a query against the footer and matrix records
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum QueryError {
    /// The requested chromosome name is absent from the chromosome table
    #[error("{0} not found in the file")]
    ChromosomeNotFound(String),

    /// A locus string could not be parsed as `name[:start:end]`
    #[error("Invalid locus: {0}")]
    InvalidLocus(String),

    /// Matrix type must be one of `observed`, `oe` or `expected`
    #[error("Unknown matrix type {0}, must be one of <observed/oe/expected>")]
    UnknownMatrixType(String),

    /// Unit must be `BP` or `FRAG`
    #[error("Unknown unit {0}, must be one of <BP/FRAG>")]
    UnknownUnit(String),

    /// The footer has no matrix entry for the requested chromosome pair
    ///
    /// # Arguments
    /// * `String` - The canonical pair key (`"{c1}_{c2}"`)
    #[error("File doesn't have the given chr_chr map {0}")]
    PairNotIndexed(String),

    /// No zoom level of the matrix record matches the requested unit and bin size
    #[error("No zoom level found at {resolution} {unit}")]
    ZoomNotFound { unit: String, resolution: i32 },

    /// Observed/expected or expected output was requested but no expected-value vector matched
    #[error("File did not contain expected values vectors at {resolution} {unit}")]
    MissingExpectedValues { unit: String, resolution: i32 },

    /// A normalization vector was needed but the footer does not index it
    #[error(
        "File did not contain {norm} normalization vector for chromosome {chromosome} at {resolution} {unit}"
    )]
    MissingNormalizationVector {
        norm: String,
        chromosome: i32,
        unit: String,
        resolution: i32,
    },

    /// A decoded bin falls outside the normalization vector of its chromosome
    #[error("Bin {bin} is outside the normalization vector (length {len})")]
    NormalizationIndexOutOfRange { bin: i32, len: usize },
}
impl QueryError {
    /// Checks if this error reports data that is legitimately absent from the file
    #[must_use]
    pub fn is_missing_data(&self) -> bool {
        matches!(
            self,
            Self::PairNotIndexed(_)
                | Self::ZoomNotFound { .. }
                | Self::MissingExpectedValues { .. }
        )
    }
}

/// Errors that can occur while decompressing and decoding one contact block
#[derive(thiserror::Error, Debug)]
pub enum BlockError {
    /// The compressed stream is corrupt or truncated
    #[error("Failed to inflate block: {0}")]
    Decompression(String),

    /// The block declares a record layout this reader does not know
    #[error("Unknown block layout type: {0}")]
    UnknownBlockType(u8),
}

/// Errors related to the HICSLICE format
#[derive(thiserror::Error, Debug)]
pub enum SliceError {
    /// The stream does not start with `HICSLICE`
    #[error("Invalid file format: missing magic string")]
    InvalidMagic,

    /// A record references a chromosome key absent from the header
    #[error("Invalid chromosome key: {0}")]
    UnknownChromosomeKey(i16),

    /// A chromosome name was requested that the slice header does not list
    #[error("Chromosome not found in file: {0}")]
    ChromosomeNotFound(String),

    /// More chromosomes than fit into the 16-bit key space
    #[error("Too many chromosomes for 16-bit keys: {0}")]
    TooManyChromosomes(usize),
}

/// Errors raised by byte-range providers
#[derive(thiserror::Error, Debug)]
pub enum SourceError {
    /// The source returned fewer bytes than a fixed-size range required
    #[error("Short read at offset {offset}: expected {expected} bytes, got {actual}")]
    ShortRead {
        offset: u64,
        expected: usize,
        actual: usize,
    },

    /// The remote endpoint answered with a non-success status
    #[error("HTTP status {status} for {url}")]
    Http { status: u16, url: String },

    /// Transport-level failure talking to the remote endpoint
    #[error("Network error: {0}")]
    Network(String),

    /// The remote endpoint ignores range requests
    #[error("Server does not support range requests: {0}")]
    RangeNotSupported(String),

    /// Remote paths were given but the crate was built without the `http` feature
    #[error("Remote sources require the `http` feature: {0}")]
    RemoteDisabled(String),
}

/// Trait for converting arbitrary errors into `Error`
pub trait IntoHicError {
    fn into_hic_error(self) -> Error;
}

impl<E> IntoHicError for E
where
    E: StdError + Send + Sync + 'static,
{
    fn into_hic_error(self) -> Error {
        Error::GenericError(Box::new(self))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(thiserror::Error, Debug)]
    enum MyError {
        #[error("Custom error: {0}")]
        CustomError(String),
    }

    #[test]
    fn test_into_hic_error() {
        let my_error = MyError::CustomError(String::from("some error"));
        let hic_error = my_error.into_hic_error();
        assert!(matches!(hic_error, Error::GenericError(_)));
    }

    // ==================== Error::is_missing_data Tests ====================

    #[test]
    fn test_missing_data_pair_not_indexed() {
        let error = Error::QueryError(QueryError::PairNotIndexed("1_2".to_string()));
        assert!(error.is_missing_data());
    }

    #[test]
    fn test_missing_data_zoom_not_found() {
        let error: Error = QueryError::ZoomNotFound {
            unit: "BP".to_string(),
            resolution: 5000,
        }
        .into();
        assert!(error.is_missing_data());
    }

    #[test]
    fn test_missing_data_expected_values() {
        let error: Error = QueryError::MissingExpectedValues {
            unit: "BP".to_string(),
            resolution: 5000,
        }
        .into();
        assert!(error.is_missing_data());
    }

    #[test]
    fn test_chromosome_not_found_is_not_missing_data() {
        let error: Error = QueryError::ChromosomeNotFound("chrZ".to_string()).into();
        assert!(!error.is_missing_data());
    }

    #[test]
    fn test_header_error_is_not_missing_data() {
        let error: Error = HeaderError::UnsupportedVersion(5).into();
        assert!(!error.is_missing_data());
    }

    // ==================== Error::is_truncation Tests ====================

    #[test]
    fn test_truncation_from_unexpected_eof() {
        let error: Error = std::io::Error::from(std::io::ErrorKind::UnexpectedEof).into();
        assert!(error.is_truncation());
    }

    #[test]
    fn test_truncation_from_short_read() {
        let error: Error = SourceError::ShortRead {
            offset: 10,
            expected: 8,
            actual: 3,
        }
        .into();
        assert!(error.is_truncation());
    }

    // ==================== Display Tests ====================

    #[test]
    fn test_header_error_display() {
        let error = HeaderError::UnsupportedVersion(5);
        assert!(format!("{error}").contains('5'));

        let error = HeaderError::InvalidMagic("BAM".to_string());
        assert!(format!("{error}").contains("BAM"));
    }

    #[test]
    fn test_missing_norm_vector_display() {
        let error = QueryError::MissingNormalizationVector {
            norm: "KR".to_string(),
            chromosome: 3,
            unit: "BP".to_string(),
            resolution: 25000,
        };
        let error_str = format!("{error}");
        assert!(error_str.contains("KR"));
        assert!(error_str.contains("25000"));
    }

    #[test]
    fn test_short_read_display() {
        let error = SourceError::ShortRead {
            offset: 1024,
            expected: 64,
            actual: 12,
        };
        let error_str = format!("{error}");
        assert!(error_str.contains("1024"));
        assert!(error_str.contains("64"));
        assert!(error_str.contains("12"));
    }

    #[test]
    fn test_block_error_display() {
        let error = BlockError::UnknownBlockType(7);
        assert!(format!("{error}").contains('7'));
    }

    // ==================== Error Conversion Tests ====================

    #[test]
    fn test_error_from_slice_error() {
        let error: Error = SliceError::InvalidMagic.into();
        assert!(matches!(error, Error::SliceError(_)));
    }

    #[test]
    fn test_error_from_block_error() {
        let error: Error = BlockError::Decompression("bad".to_string()).into();
        assert!(matches!(error, Error::BlockError(_)));
    }

    #[test]
    fn test_error_debug_output() {
        let error = Error::SliceError(SliceError::InvalidMagic);
        let debug_str = format!("{error:?}");
        assert!(debug_str.contains("SliceError"));
    }
}
