use std::collections::{BTreeMap, HashMap};
use std::io::{self, Read, Seek, SeekFrom};

use byteorder::{LittleEndian, ReadBytesExt};

use super::utils::{checked_len, FormatProfile, HicReadExt};
use crate::error::{HeaderError, Result};
use crate::{HIC_MAGIC, MIN_VERSION};

/// One entry of the file's chromosome table
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Chromosome {
    pub name: String,
    /// Position in the chromosome table (`0` is the whole-genome pseudo-chromosome)
    pub index: i32,
    pub length: i64,
}
impl Chromosome {
    /// Number of whole bins at `resolution`
    #[must_use]
    pub fn num_bins(&self, resolution: i32) -> i64 {
        if resolution <= 0 {
            return 0;
        }
        self.length / i64::from(resolution)
    }
}

/// The fixed preamble of a `.hic` file
///
/// Parsed once when a file is opened and immutable afterwards.
#[derive(Debug, Clone)]
pub struct FileHeader {
    /// Format version (at least [`MIN_VERSION`])
    pub version: i32,
    /// Absolute offset of the footer ("master index")
    pub footer_offset: i64,
    pub genome_id: String,
    /// Position of the normalization-vector index (version > 8 only)
    pub nvi_position: Option<i64>,
    /// Length of the normalization-vector index (version > 8 only)
    pub nvi_length: Option<i64>,
    pub attributes: BTreeMap<String, String>,
    pub bp_resolutions: Vec<i32>,
    pub frag_resolutions: Vec<i32>,
    chromosomes: Vec<Chromosome>,
    by_name: HashMap<String, usize>,
    profile: FormatProfile,
}
impl FileHeader {
    /// Parses the preamble from the start of the stream
    pub fn read_from<R: Read + Seek>(reader: &mut R) -> Result<Self> {
        reader.seek(SeekFrom::Start(0))?;

        let magic = read_magic(reader)?;
        if !magic.starts_with(HIC_MAGIC) {
            return Err(
                HeaderError::InvalidMagic(String::from_utf8_lossy(&magic).to_string()).into(),
            );
        }

        let version = reader.read_i32::<LittleEndian>()?;
        if version < MIN_VERSION {
            return Err(HeaderError::UnsupportedVersion(version).into());
        }
        let profile = FormatProfile::from_version(version);

        let footer_offset = reader.read_i64::<LittleEndian>()?;
        let genome_id = reader.read_cstring()?;

        let (nvi_position, nvi_length) = if profile.has_norm_vector_index {
            (
                Some(reader.read_i64::<LittleEndian>()?),
                Some(reader.read_i64::<LittleEndian>()?),
            )
        } else {
            (None, None)
        };

        let num_attributes = checked_len(reader.read_i32::<LittleEndian>()?)?;
        let mut attributes = BTreeMap::new();
        for _ in 0..num_attributes {
            let key = reader.read_cstring()?;
            let value = reader.read_cstring()?;
            attributes.insert(key, value);
        }

        let num_chromosomes = checked_len(reader.read_i32::<LittleEndian>()?)?;
        let mut chromosomes = Vec::with_capacity(num_chromosomes.min(1 << 16));
        let mut by_name = HashMap::with_capacity(num_chromosomes.min(1 << 16));
        for index in 0..num_chromosomes {
            let name = reader.read_cstring()?;
            let length = reader.read_count(profile)?;
            by_name.insert(name.clone(), chromosomes.len());
            chromosomes.push(Chromosome {
                name,
                index: index as i32,
                length,
            });
        }

        let bp_resolutions = read_resolutions(reader)?;

        // older writers may stop right after the base-pair resolutions
        let frag_resolutions = match reader.read_i32::<LittleEndian>() {
            Ok(count) => read_n_resolutions(reader, checked_len(count)?)?,
            Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => Vec::new(),
            Err(e) => return Err(e.into()),
        };

        log::debug!(
            "Parsed header: version {version}, footer at {footer_offset}, {} chromosomes, {} bp resolutions",
            chromosomes.len(),
            bp_resolutions.len()
        );

        Ok(Self {
            version,
            footer_offset,
            genome_id,
            nvi_position,
            nvi_length,
            attributes,
            bp_resolutions,
            frag_resolutions,
            chromosomes,
            by_name,
            profile,
        })
    }

    #[must_use]
    pub fn profile(&self) -> FormatProfile {
        self.profile
    }

    /// Chromosomes in table order
    #[must_use]
    pub fn chromosomes(&self) -> &[Chromosome] {
        &self.chromosomes
    }

    #[must_use]
    pub fn chromosome(&self, name: &str) -> Option<&Chromosome> {
        self.by_name.get(name).map(|&i| &self.chromosomes[i])
    }

    #[must_use]
    pub fn chromosome_by_index(&self, index: i32) -> Option<&Chromosome> {
        usize::try_from(index)
            .ok()
            .and_then(|i| self.chromosomes.get(i))
    }

    #[must_use]
    pub fn attribute(&self, key: &str) -> Option<&str> {
        self.attributes.get(key).map(String::as_str)
    }

    #[must_use]
    pub fn num_chromosomes(&self) -> usize {
        self.chromosomes.len()
    }
}

/// Reads the NUL-terminated magic string as raw bytes
fn read_magic<R: Read>(reader: &mut R) -> Result<Vec<u8>> {
    let mut magic = Vec::new();
    loop {
        let byte = reader.read_u8()?;
        if byte == 0 {
            break;
        }
        magic.push(byte);
        if magic.len() > 64 {
            break;
        }
    }
    Ok(magic)
}

fn read_resolutions<R: Read>(reader: &mut R) -> Result<Vec<i32>> {
    let count = checked_len(reader.read_i32::<LittleEndian>()?)?;
    read_n_resolutions(reader, count)
}

fn read_n_resolutions<R: Read>(reader: &mut R, count: usize) -> Result<Vec<i32>> {
    let mut resolutions = Vec::with_capacity(count.min(1 << 10));
    for _ in 0..count {
        resolutions.push(reader.read_i32::<LittleEndian>()?);
    }
    Ok(resolutions)
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;
    use crate::error::Error;
    use crate::testing::{HicBuilder, TestChromosome};

    fn two_chromosomes() -> Vec<TestChromosome> {
        vec![
            TestChromosome::new("All", 3),
            TestChromosome::new("chr1", 2000),
            TestChromosome::new("chr2", 1000),
        ]
    }

    #[test]
    fn test_parse_v9_header() -> Result<()> {
        let bytes = HicBuilder::new(9)
            .genome_id("hg38")
            .attribute("software", "test")
            .chromosomes(two_chromosomes())
            .bp_resolutions(vec![1000, 100])
            .frag_resolutions(vec![1])
            .build();
        let header = FileHeader::read_from(&mut Cursor::new(bytes))?;

        assert_eq!(header.version, 9);
        assert_eq!(header.genome_id, "hg38");
        assert_eq!(header.attribute("software"), Some("test"));
        assert!(header.nvi_position.is_some());
        assert_eq!(header.num_chromosomes(), 3);
        assert_eq!(header.bp_resolutions, vec![1000, 100]);
        assert_eq!(header.frag_resolutions, vec![1]);

        let chr2 = header.chromosome("chr2").unwrap();
        assert_eq!(chr2.index, 2);
        assert_eq!(chr2.length, 1000);
        assert_eq!(header.chromosome_by_index(1).unwrap().name, "chr1");
        assert!(header.chromosome("chrX").is_none());
        assert!(header.chromosome_by_index(-1).is_none());
        Ok(())
    }

    #[test]
    fn test_parse_v8_header() -> Result<()> {
        let bytes = HicBuilder::new(8)
            .chromosomes(two_chromosomes())
            .bp_resolutions(vec![500])
            .build();
        let header = FileHeader::read_from(&mut Cursor::new(bytes))?;
        assert_eq!(header.version, 8);
        assert!(header.nvi_position.is_none());
        assert!(header.nvi_length.is_none());
        assert_eq!(header.chromosome("chr1").unwrap().length, 2000);
        assert!(!header.profile().wide_counts);
        Ok(())
    }

    #[test]
    fn test_header_without_fragment_resolutions() -> Result<()> {
        let bytes = HicBuilder::new(8)
            .chromosomes(two_chromosomes())
            .bp_resolutions(vec![500])
            .header_only()
            .build();
        let header = FileHeader::read_from(&mut Cursor::new(bytes))?;
        assert!(header.frag_resolutions.is_empty());
        Ok(())
    }

    #[test]
    fn test_bad_magic() {
        let mut bytes = b"BAM\0".to_vec();
        bytes.extend_from_slice(&[0; 16]);
        let result = FileHeader::read_from(&mut Cursor::new(bytes));
        assert!(matches!(
            result,
            Err(Error::HeaderError(HeaderError::InvalidMagic(_)))
        ));
    }

    #[test]
    fn test_unsupported_version() {
        let bytes = HicBuilder::new(5).build();
        let result = FileHeader::read_from(&mut Cursor::new(bytes));
        assert!(matches!(
            result,
            Err(Error::HeaderError(HeaderError::UnsupportedVersion(5)))
        ));
    }

    #[test]
    fn test_truncated_header() {
        let bytes = HicBuilder::new(9).chromosomes(two_chromosomes()).build();
        let truncated = bytes[..20].to_vec();
        let err = FileHeader::read_from(&mut Cursor::new(truncated)).unwrap_err();
        assert!(err.is_truncation());
    }

    #[test]
    fn test_num_bins() {
        let chr = Chromosome {
            name: "chr1".to_string(),
            index: 1,
            length: 2050,
        };
        assert_eq!(chr.num_bins(1000), 2);
        assert_eq!(chr.num_bins(0), 0);
    }
}
