pub mod block;
pub mod footer;
pub mod header;
pub mod norm;
pub mod record;
pub mod selector;
pub mod utils;
pub mod zoom;

pub use footer::{read_normalization_vector, FooterData, FooterRequest};
pub use header::{Chromosome, FileHeader};
pub use norm::{MatrixType, NormalizationApplier, Normalization, Unit};
pub use record::{ContactRecord, IndexEntry};
pub use selector::{BinRegion, BlockGrid};
pub use utils::{FormatProfile, HicReadExt, HicSeekExt};
pub use zoom::ZoomHeader;
