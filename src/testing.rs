//! Synthetic `.hic` files for unit tests
//!
//! [`HicBuilder`] lays out a complete file in memory: header, contact blocks, matrix
//! records, normalization vectors and the footer, using the field widths of the
//! requested version.

use std::io::Write;

use byteorder::{LittleEndian, WriteBytesExt};
use flate2::write::ZlibEncoder;
use flate2::Compression;

use crate::core::FormatProfile;

pub fn compress(raw: &[u8]) -> Vec<u8> {
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(raw).unwrap();
    encoder.finish().unwrap()
}

fn write_cstring(out: &mut Vec<u8>, value: &str) {
    out.extend_from_slice(value.as_bytes());
    out.push(0);
}

fn write_count(out: &mut Vec<u8>, profile: FormatProfile, value: i64) {
    if profile.wide_counts {
        out.write_i64::<LittleEndian>(value).unwrap();
    } else {
        out.write_i32::<LittleEndian>(value as i32).unwrap();
    }
}

fn write_value(out: &mut Vec<u8>, profile: FormatProfile, value: f64) {
    if profile.single_values {
        out.write_f32::<LittleEndian>(value as f32).unwrap();
    } else {
        out.write_f64::<LittleEndian>(value).unwrap();
    }
}

fn write_i16_or_i32(out: &mut Vec<u8>, short: bool, value: i32) {
    if short {
        out.write_i16::<LittleEndian>(value as i16).unwrap();
    } else {
        out.write_i32::<LittleEndian>(value).unwrap();
    }
}

/// Uncompressed legacy block (version < 7)
pub fn legacy_block(records: &[(i32, i32, f32)]) -> Vec<u8> {
    let mut out = Vec::new();
    out.write_i32::<LittleEndian>(records.len() as i32).unwrap();
    for &(bin_x, bin_y, counts) in records {
        out.write_i32::<LittleEndian>(bin_x).unwrap();
        out.write_i32::<LittleEndian>(bin_y).unwrap();
        out.write_f32::<LittleEndian>(counts).unwrap();
    }
    out
}

/// Description of a list-of-rows block (type 1)
#[derive(Debug, Clone, Default)]
pub struct RowsBlock {
    bin_x_offset: i32,
    bin_y_offset: i32,
    short_counts: bool,
    short_bin_x: bool,
    short_bin_y: bool,
    rows: Vec<(i32, Vec<(i32, f32)>)>,
}
impl RowsBlock {
    pub fn new(bin_x_offset: i32, bin_y_offset: i32) -> Self {
        Self {
            bin_x_offset,
            bin_y_offset,
            short_counts: true,
            short_bin_x: true,
            short_bin_y: true,
            rows: Vec::new(),
        }
    }
    pub fn short_counts(mut self, short: bool) -> Self {
        self.short_counts = short;
        self
    }
    pub fn short_bin_x(mut self, short: bool) -> Self {
        self.short_bin_x = short;
        self
    }
    pub fn short_bin_y(mut self, short: bool) -> Self {
        self.short_bin_y = short;
        self
    }
    /// Adds a row at `bin_y_offset + dy` holding `(dx, count)` cells
    pub fn row(mut self, dy: i32, cells: &[(i32, f32)]) -> Self {
        self.rows.push((dy, cells.to_vec()));
        self
    }
}

/// Uncompressed list-of-rows block for the layout of `profile`
pub fn rows_block(block: &RowsBlock, profile: FormatProfile) -> Vec<u8> {
    let short_bin_x = !profile.compact_block_widths || block.short_bin_x;
    let short_bin_y = !profile.compact_block_widths || block.short_bin_y;
    let num_records: usize = block.rows.iter().map(|(_, cells)| cells.len()).sum();

    let mut out = Vec::new();
    out.write_i32::<LittleEndian>(num_records as i32).unwrap();
    out.write_i32::<LittleEndian>(block.bin_x_offset).unwrap();
    out.write_i32::<LittleEndian>(block.bin_y_offset).unwrap();
    out.push(u8::from(!block.short_counts));
    if profile.compact_block_widths {
        out.push(u8::from(!short_bin_x));
        out.push(u8::from(!short_bin_y));
    }
    out.push(1);
    write_i16_or_i32(&mut out, short_bin_y, block.rows.len() as i32);
    for (dy, cells) in &block.rows {
        write_i16_or_i32(&mut out, short_bin_y, *dy);
        write_i16_or_i32(&mut out, short_bin_x, cells.len() as i32);
        for &(dx, count) in cells {
            write_i16_or_i32(&mut out, short_bin_x, dx);
            if block.short_counts {
                out.write_i16::<LittleEndian>(count as i16).unwrap();
            } else {
                out.write_f32::<LittleEndian>(count).unwrap();
            }
        }
    }
    out
}

fn dense_prefix(
    out: &mut Vec<u8>,
    bin_x_offset: i32,
    bin_y_offset: i32,
    short_counts: bool,
    num_points: usize,
    width: i16,
    profile: FormatProfile,
) {
    out.write_i32::<LittleEndian>(num_points as i32).unwrap();
    out.write_i32::<LittleEndian>(bin_x_offset).unwrap();
    out.write_i32::<LittleEndian>(bin_y_offset).unwrap();
    out.push(u8::from(!short_counts));
    if profile.compact_block_widths {
        out.push(0);
        out.push(0);
    }
    out.push(2);
    out.write_i32::<LittleEndian>(num_points as i32).unwrap();
    out.write_i16::<LittleEndian>(width).unwrap();
}

/// Uncompressed dense block (type 2) with `i16` counts
pub fn dense_block_i16(
    bin_x_offset: i32,
    bin_y_offset: i32,
    width: i16,
    counts: &[i16],
    profile: FormatProfile,
) -> Vec<u8> {
    let mut out = Vec::new();
    dense_prefix(&mut out, bin_x_offset, bin_y_offset, true, counts.len(), width, profile);
    for &count in counts {
        out.write_i16::<LittleEndian>(count).unwrap();
    }
    out
}

/// Uncompressed dense block (type 2) with `f32` counts
pub fn dense_block_f32(
    bin_x_offset: i32,
    bin_y_offset: i32,
    width: i16,
    counts: &[f32],
    profile: FormatProfile,
) -> Vec<u8> {
    let mut out = Vec::new();
    dense_prefix(&mut out, bin_x_offset, bin_y_offset, false, counts.len(), width, profile);
    for &count in counts {
        out.write_f32::<LittleEndian>(count).unwrap();
    }
    out
}

#[derive(Debug, Clone)]
pub struct TestChromosome {
    name: String,
    length: i64,
}
impl TestChromosome {
    pub fn new(name: &str, length: i64) -> Self {
        Self {
            name: name.to_string(),
            length,
        }
    }
}

#[derive(Debug, Clone)]
pub struct TestZoom {
    unit: String,
    bin_size: i32,
    sum_counts: f32,
    block_bin_count: i32,
    block_column_count: i32,
    /// Block number and compressed payload
    blocks: Vec<(i32, Vec<u8>)>,
}
impl TestZoom {
    pub fn new(
        unit: &str,
        bin_size: i32,
        sum_counts: f32,
        block_bin_count: i32,
        block_column_count: i32,
    ) -> Self {
        Self {
            unit: unit.to_string(),
            bin_size,
            sum_counts,
            block_bin_count,
            block_column_count,
            blocks: Vec::new(),
        }
    }

    /// Adds a block from its uncompressed payload
    pub fn block(self, number: i32, raw: Vec<u8>) -> Self {
        self.compressed_block(number, compress(&raw))
    }

    /// Adds a block payload verbatim (an empty payload gives a zero-size entry)
    pub fn compressed_block(mut self, number: i32, bytes: Vec<u8>) -> Self {
        self.blocks.push((number, bytes));
        self
    }
}

#[derive(Debug, Clone)]
pub struct TestMatrix {
    c1: i32,
    c2: i32,
    zooms: Vec<TestZoom>,
}
impl TestMatrix {
    pub fn new(c1: i32, c2: i32) -> Self {
        Self {
            c1,
            c2,
            zooms: Vec::new(),
        }
    }
    pub fn zoom(mut self, zoom: TestZoom) -> Self {
        self.zooms.push(zoom);
        self
    }
}

/// An expected-value vector; `norm == None` places it in the unnormalized section
#[derive(Debug, Clone)]
pub struct TestExpected {
    norm: Option<String>,
    unit: String,
    bin_size: i32,
    values: Vec<f64>,
    factors: Vec<(i32, f64)>,
}
impl TestExpected {
    pub fn new(norm: Option<&str>, unit: &str, bin_size: i32, values: Vec<f64>) -> Self {
        Self {
            norm: norm.map(str::to_string),
            unit: unit.to_string(),
            bin_size,
            values,
            factors: Vec::new(),
        }
    }
    pub fn factor(mut self, chr_index: i32, value: f64) -> Self {
        self.factors.push((chr_index, value));
        self
    }
}

#[derive(Debug, Clone)]
pub struct TestNormVector {
    norm: String,
    chr_index: i32,
    unit: String,
    resolution: i32,
    values: Vec<f64>,
}
impl TestNormVector {
    pub fn new(norm: &str, chr_index: i32, unit: &str, resolution: i32, values: Vec<f64>) -> Self {
        Self {
            norm: norm.to_string(),
            chr_index,
            unit: unit.to_string(),
            resolution,
            values,
        }
    }
}

/// Lays out a synthetic `.hic` file
#[derive(Debug, Clone)]
pub struct HicBuilder {
    version: i32,
    genome_id: String,
    attributes: Vec<(String, String)>,
    chromosomes: Vec<TestChromosome>,
    bp_resolutions: Vec<i32>,
    frag_resolutions: Vec<i32>,
    header_only: bool,
    matrices: Vec<TestMatrix>,
    decoys: Vec<(String, i64)>,
    reverse_entries: bool,
    truncate_after_index: bool,
    expected: Vec<TestExpected>,
    norm_vectors: Vec<TestNormVector>,
}
impl HicBuilder {
    pub fn new(version: i32) -> Self {
        Self {
            version,
            genome_id: "test".to_string(),
            attributes: Vec::new(),
            chromosomes: Vec::new(),
            bp_resolutions: Vec::new(),
            frag_resolutions: Vec::new(),
            header_only: false,
            matrices: Vec::new(),
            decoys: Vec::new(),
            reverse_entries: false,
            truncate_after_index: false,
            expected: Vec::new(),
            norm_vectors: Vec::new(),
        }
    }
    pub fn genome_id(mut self, genome_id: &str) -> Self {
        self.genome_id = genome_id.to_string();
        self
    }
    pub fn attribute(mut self, key: &str, value: &str) -> Self {
        self.attributes.push((key.to_string(), value.to_string()));
        self
    }
    pub fn chromosomes(mut self, chromosomes: Vec<TestChromosome>) -> Self {
        self.chromosomes = chromosomes;
        self
    }
    pub fn bp_resolutions(mut self, resolutions: Vec<i32>) -> Self {
        self.bp_resolutions = resolutions;
        self
    }
    pub fn frag_resolutions(mut self, resolutions: Vec<i32>) -> Self {
        self.frag_resolutions = resolutions;
        self
    }
    /// Stops right after the base-pair resolutions
    pub fn header_only(mut self) -> Self {
        self.header_only = true;
        self
    }
    pub fn matrix(mut self, matrix: TestMatrix) -> Self {
        self.matrices.push(matrix);
        self
    }
    /// Adds a matrix-index entry pointing nowhere useful
    pub fn decoy_entry(mut self, key: &str, position: i64) -> Self {
        self.decoys.push((key.to_string(), position));
        self
    }
    pub fn reverse_footer_entries(mut self) -> Self {
        self.reverse_entries = true;
        self
    }
    /// Ends the file right after the matrix index
    pub fn truncate_after_matrix_index(mut self) -> Self {
        self.truncate_after_index = true;
        self
    }
    pub fn expected(mut self, expected: TestExpected) -> Self {
        self.expected.push(expected);
        self
    }
    pub fn norm_vector(mut self, vector: TestNormVector) -> Self {
        self.norm_vectors.push(vector);
        self
    }

    pub fn build(&self) -> Vec<u8> {
        let profile = FormatProfile::from_version(self.version);
        let mut out = Vec::new();

        // header
        out.extend_from_slice(b"HIC\0");
        out.write_i32::<LittleEndian>(self.version).unwrap();
        let footer_slot = out.len();
        out.write_i64::<LittleEndian>(0).unwrap();
        write_cstring(&mut out, &self.genome_id);
        if profile.has_norm_vector_index {
            out.write_i64::<LittleEndian>(0).unwrap();
            out.write_i64::<LittleEndian>(0).unwrap();
        }
        out.write_i32::<LittleEndian>(self.attributes.len() as i32)
            .unwrap();
        for (key, value) in &self.attributes {
            write_cstring(&mut out, key);
            write_cstring(&mut out, value);
        }
        out.write_i32::<LittleEndian>(self.chromosomes.len() as i32)
            .unwrap();
        for chr in &self.chromosomes {
            write_cstring(&mut out, &chr.name);
            write_count(&mut out, profile, chr.length);
        }
        out.write_i32::<LittleEndian>(self.bp_resolutions.len() as i32)
            .unwrap();
        for &res in &self.bp_resolutions {
            out.write_i32::<LittleEndian>(res).unwrap();
        }
        if self.header_only {
            return out;
        }
        out.write_i32::<LittleEndian>(self.frag_resolutions.len() as i32)
            .unwrap();
        for &res in &self.frag_resolutions {
            out.write_i32::<LittleEndian>(res).unwrap();
        }

        // blocks and matrix records
        let mut entries = Vec::new();
        for matrix in &self.matrices {
            let mut indices = Vec::new();
            for zoom in &matrix.zooms {
                let mut index = Vec::new();
                for (number, bytes) in &zoom.blocks {
                    index.push((*number, out.len() as i64, bytes.len() as i32));
                    out.extend_from_slice(bytes);
                }
                indices.push(index);
            }

            let position = out.len() as i64;
            out.write_i32::<LittleEndian>(matrix.c1).unwrap();
            out.write_i32::<LittleEndian>(matrix.c2).unwrap();
            out.write_i32::<LittleEndian>(matrix.zooms.len() as i32)
                .unwrap();
            for (zoom, index) in matrix.zooms.iter().zip(&indices) {
                write_cstring(&mut out, &zoom.unit);
                out.write_i32::<LittleEndian>(0).unwrap();
                out.write_f32::<LittleEndian>(zoom.sum_counts).unwrap();
                out.write_f32::<LittleEndian>(0.0).unwrap();
                out.write_f32::<LittleEndian>(0.0).unwrap();
                out.write_f32::<LittleEndian>(0.0).unwrap();
                out.write_i32::<LittleEndian>(zoom.bin_size).unwrap();
                out.write_i32::<LittleEndian>(zoom.block_bin_count).unwrap();
                out.write_i32::<LittleEndian>(zoom.block_column_count)
                    .unwrap();
                out.write_i32::<LittleEndian>(index.len() as i32).unwrap();
                for &(number, block_position, size) in index {
                    out.write_i32::<LittleEndian>(number).unwrap();
                    out.write_i64::<LittleEndian>(block_position).unwrap();
                    out.write_i32::<LittleEndian>(size).unwrap();
                }
            }
            let size = out.len() as i64 - position;
            entries.push((format!("{}_{}", matrix.c1, matrix.c2), position, size));
        }

        // normalization vectors
        let mut norm_index = Vec::new();
        for vector in &self.norm_vectors {
            let position = out.len() as i64;
            write_count(&mut out, profile, vector.values.len() as i64);
            for &value in &vector.values {
                write_value(&mut out, profile, value);
            }
            norm_index.push((vector, position, out.len() as i64 - position));
        }

        // footer
        let footer_offset = out.len() as i64;
        out[footer_slot..footer_slot + 8].copy_from_slice(&footer_offset.to_le_bytes());
        write_count(&mut out, profile, 0);

        for (key, position) in &self.decoys {
            entries.push((key.clone(), *position, 0));
        }
        if self.reverse_entries {
            entries.reverse();
        }
        out.write_i32::<LittleEndian>(entries.len() as i32).unwrap();
        for (key, position, size) in &entries {
            write_cstring(&mut out, key);
            out.write_i64::<LittleEndian>(*position).unwrap();
            out.write_i32::<LittleEndian>(*size as i32).unwrap();
        }
        if self.truncate_after_index {
            return out;
        }

        for typed in [false, true] {
            let section: Vec<&TestExpected> = self
                .expected
                .iter()
                .filter(|e| e.norm.is_some() == typed)
                .collect();
            out.write_i32::<LittleEndian>(section.len() as i32).unwrap();
            for expected in section {
                if let Some(norm) = &expected.norm {
                    write_cstring(&mut out, norm);
                }
                write_cstring(&mut out, &expected.unit);
                out.write_i32::<LittleEndian>(expected.bin_size).unwrap();
                write_count(&mut out, profile, expected.values.len() as i64);
                for &value in &expected.values {
                    write_value(&mut out, profile, value);
                }
                out.write_i32::<LittleEndian>(expected.factors.len() as i32)
                    .unwrap();
                for &(chr_index, value) in &expected.factors {
                    out.write_i32::<LittleEndian>(chr_index).unwrap();
                    write_value(&mut out, profile, value);
                }
            }
        }

        out.write_i32::<LittleEndian>(norm_index.len() as i32).unwrap();
        for (vector, position, size) in norm_index {
            write_cstring(&mut out, &vector.norm);
            out.write_i32::<LittleEndian>(vector.chr_index).unwrap();
            write_cstring(&mut out, &vector.unit);
            out.write_i32::<LittleEndian>(vector.resolution).unwrap();
            out.write_i64::<LittleEndian>(position).unwrap();
            write_count(&mut out, profile, size);
        }
        out
    }
}
