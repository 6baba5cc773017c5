use std::convert::Infallible;
use std::fmt;
use std::str::FromStr;

use crate::error::QueryError;

/// The numeric transform applied to raw counts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum MatrixType {
    /// Raw (optionally normalized) counts
    #[default]
    Observed,
    /// Counts divided by the expected value for their distance (or the inter-chromosomal average)
    Oe,
    /// The expected value itself, ignoring the observed count
    Expected,
}
impl MatrixType {
    /// Checks if the transform consults expected values
    #[must_use]
    pub fn uses_expected(&self) -> bool {
        matches!(self, Self::Oe | Self::Expected)
    }

    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Observed => "observed",
            Self::Oe => "oe",
            Self::Expected => "expected",
        }
    }
}
impl fmt::Display for MatrixType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
impl FromStr for MatrixType {
    type Err = QueryError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "observed" => Ok(Self::Observed),
            "oe" => Ok(Self::Oe),
            "expected" => Ok(Self::Expected),
            _ => Err(QueryError::UnknownMatrixType(s.to_string())),
        }
    }
}

/// A normalization scheme, named exactly as in the file's footer
///
/// Names other than the well-known ones are kept verbatim since newer files carry
/// additional schemes.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub enum Normalization {
    #[default]
    None,
    Vc,
    VcSqrt,
    Kr,
    Scale,
    Other(String),
}
impl Normalization {
    #[must_use]
    pub fn is_none(&self) -> bool {
        matches!(self, Self::None)
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::None => "NONE",
            Self::Vc => "VC",
            Self::VcSqrt => "VC_SQRT",
            Self::Kr => "KR",
            Self::Scale => "SCALE",
            Self::Other(name) => name,
        }
    }
}
impl fmt::Display for Normalization {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
impl FromStr for Normalization {
    type Err = Infallible;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "NONE" => Self::None,
            "VC" => Self::Vc,
            "VC_SQRT" => Self::VcSqrt,
            "KR" => Self::Kr,
            "SCALE" => Self::Scale,
            other => Self::Other(other.to_string()),
        })
    }
}

/// Bin unit of a resolution
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Unit {
    /// Base pairs
    #[default]
    Bp,
    /// Restriction fragments
    Frag,
}
impl Unit {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Bp => "BP",
            Self::Frag => "FRAG",
        }
    }
}
impl fmt::Display for Unit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
impl FromStr for Unit {
    type Err = QueryError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "BP" => Ok(Self::Bp),
            "FRAG" => Ok(Self::Frag),
            _ => Err(QueryError::UnknownUnit(s.to_string())),
        }
    }
}

/// Turns raw block counts into the requested output value
///
/// Holds everything a matrix session resolved from the footer: normalization vectors
/// for both axes, the expected-value curve (intra-chromosomal) or the average count
/// (inter-chromosomal).
#[derive(Debug, Clone)]
pub struct NormalizationApplier {
    matrix_type: MatrixType,
    resolution: i32,
    intra: bool,
    normalized: bool,
    c1_norm: Vec<f64>,
    c2_norm: Vec<f64>,
    /// Set when a normalization was requested but a vector is absent from the file
    missing: Option<QueryError>,
    expected: Vec<f64>,
    avg_count: f64,
}
impl NormalizationApplier {
    /// Creates an applier that passes counts through untouched until configured
    #[must_use]
    pub fn new(matrix_type: MatrixType, resolution: i32, intra: bool) -> Self {
        Self {
            matrix_type,
            resolution,
            intra,
            normalized: false,
            c1_norm: Vec::new(),
            c2_norm: Vec::new(),
            missing: None,
            expected: Vec::new(),
            avg_count: 0.0,
        }
    }

    /// Divides counts by `c1_norm[bin_x] * c2_norm[bin_y]`
    #[must_use]
    pub fn with_norm_vectors(mut self, c1_norm: Vec<f64>, c2_norm: Vec<f64>) -> Self {
        self.normalized = true;
        self.c1_norm = c1_norm;
        self.c2_norm = c2_norm;
        self
    }

    /// Marks the normalization as requested but unavailable
    ///
    /// Transforming any count afterwards fails with `error`.
    #[must_use]
    pub fn with_missing_norm(mut self, error: QueryError) -> Self {
        self.normalized = true;
        self.missing = Some(error);
        self
    }

    #[must_use]
    pub fn with_expected(mut self, expected: Vec<f64>) -> Self {
        self.expected = expected;
        self
    }

    #[must_use]
    pub fn with_avg_count(mut self, avg_count: f64) -> Self {
        self.avg_count = avg_count;
        self
    }

    #[must_use]
    pub fn matrix_type(&self) -> MatrixType {
        self.matrix_type
    }

    #[must_use]
    pub fn expected(&self) -> &[f64] {
        &self.expected
    }

    #[must_use]
    pub fn avg_count(&self) -> f64 {
        self.avg_count
    }

    /// Expected value for a diagonal distance in bins, clamped to the end of the curve
    fn expected_at(&self, distance: usize) -> f64 {
        match self.expected.len() {
            0 => f64::NAN,
            len => self.expected[distance.min(len - 1)],
        }
    }

    fn norm_at(vector: &[f64], bin: i32) -> Result<f64, QueryError> {
        usize::try_from(bin)
            .ok()
            .and_then(|i| vector.get(i).copied())
            .ok_or(QueryError::NormalizationIndexOutOfRange {
                bin,
                len: vector.len(),
            })
    }

    /// Transforms the raw count of the cell at `(bin_x, bin_y)`
    pub fn apply(&self, bin_x: i32, bin_y: i32, counts: f32) -> Result<f32, QueryError> {
        let mut value = f64::from(counts);
        if self.normalized {
            if let Some(err) = &self.missing {
                return Err(err.clone());
            }
            let scale = Self::norm_at(&self.c1_norm, bin_x)? * Self::norm_at(&self.c2_norm, bin_y)?;
            value = f64::from((value / scale) as f32);
        }

        let baseline = if self.intra {
            // bins differ by the same amount as genome coordinates divided by the resolution
            let x = i64::from(bin_x) * i64::from(self.resolution);
            let y = i64::from(bin_y) * i64::from(self.resolution);
            let distance = (y - x).unsigned_abs() / u64::from(self.resolution.unsigned_abs().max(1));
            self.expected_at(usize::try_from(distance).unwrap_or(usize::MAX))
        } else {
            self.avg_count
        };

        let out = match self.matrix_type {
            MatrixType::Observed => value,
            MatrixType::Oe => value / baseline,
            MatrixType::Expected => baseline,
        };
        Ok(out as f32)
    }
}
