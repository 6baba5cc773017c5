use std::fs::File;
use std::io::{self, BufWriter, Write};

use anyhow::{bail, Result};
use clap::{ArgAction, Parser, Subcommand};
use hicstraw::{
    dump_genome_wide, HicFile, MatrixType, Normalization, QueryBuilder, SliceReader, Unit,
};

#[derive(Parser)]
#[command(name = "hicstraw", version, about = "Extract contacts from .hic files")]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Command {
    /// Print the records of one chromosome pair as `binX\tbinY\tcounts`
    Dump {
        /// observed, oe or expected
        matrix_type: MatrixType,
        /// NONE, VC, VC_SQRT, KR, SCALE or any stored name
        norm: Normalization,
        /// Local path or http(s) URL
        file: String,
        /// Chromosome with optional range (chr1:start:end)
        chr1: String,
        chr2: String,
        /// BP or FRAG
        unit: Unit,
        binsize: i32,
        /// Output path [default: stdout]
        output: Option<String>,

        /// Print a dense matrix instead of sparse records
        #[arg(long)]
        dense: bool,
    },

    /// Write every chromosome pair at one resolution to a slice file
    Slice {
        matrix_type: MatrixType,
        norm: Normalization,
        file: String,
        unit: Unit,
        binsize: i32,
        output: String,
    },

    /// Print the header of a .hic file
    Header { file: String },

    /// Print the contents of a slice file
    ReadSlice {
        file: String,

        /// Only records stored for this pair, in this order
        #[arg(long, num_args = 2, value_names = ["CHR1", "CHR2"])]
        pair: Option<Vec<String>>,

        /// Stop after this many records
        #[arg(short, long)]
        limit: Option<usize>,
    },
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();
}

fn output_handle(path: Option<&str>) -> Result<Box<dyn Write>> {
    let handle: Box<dyn Write> = match path {
        Some(path) => Box::new(File::create(path)?),
        None => Box::new(io::stdout()),
    };
    Ok(Box::new(BufWriter::new(handle)))
}

#[allow(clippy::too_many_arguments)]
fn run_dump(
    matrix_type: MatrixType,
    norm: Normalization,
    path: &str,
    chr1: &str,
    chr2: &str,
    unit: Unit,
    binsize: i32,
    output: Option<&str>,
    dense: bool,
) -> Result<()> {
    let query = QueryBuilder::new(chr1, chr2, binsize)
        .matrix_type(matrix_type)
        .norm(norm)
        .unit(unit)
        .build()?;
    let mut file = HicFile::open(path)?;
    let mut writer = output_handle(output)?;

    if dense {
        let matrix = file.dense_matrix(&query)?;
        for row in matrix.data.chunks(matrix.cols.max(1)) {
            let line: Vec<String> = row.iter().map(ToString::to_string).collect();
            writeln!(writer, "{}", line.join("\t"))?;
        }
    } else {
        for record in file.query(&query)? {
            writeln!(writer, "{}\t{}\t{}", record.bin_x, record.bin_y, record.counts)?;
        }
    }
    writer.flush()?;
    Ok(())
}

fn run_slice(
    matrix_type: MatrixType,
    norm: &Normalization,
    path: &str,
    unit: Unit,
    binsize: i32,
    output: &str,
) -> Result<()> {
    let mut file = HicFile::open(path)?;
    let handle = BufWriter::new(File::create(output)?);
    let summary = dump_genome_wide(&mut file, matrix_type, norm, unit, binsize, handle)?;
    eprintln!(
        "Wrote {} records from {} chromosome pairs to {output} ({} pairs skipped)",
        summary.records_written, summary.pairs_written, summary.pairs_skipped
    );
    Ok(())
}

fn run_header(path: &str) -> Result<()> {
    let file = HicFile::open(path)?;
    let header = file.header();
    let mut writer = output_handle(None)?;

    writeln!(writer, "version\t{}", header.version)?;
    writeln!(writer, "genome\t{}", header.genome_id)?;
    writeln!(writer, "attributes\t{}", header.attributes.len())?;
    for chromosome in header.chromosomes() {
        writeln!(
            writer,
            "chromosome\t{}\t{}\t{}",
            chromosome.index, chromosome.name, chromosome.length
        )?;
    }
    let join = |values: &[i32]| {
        values
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(",")
    };
    writeln!(writer, "bp_resolutions\t{}", join(&header.bp_resolutions))?;
    writeln!(writer, "frag_resolutions\t{}", join(&header.frag_resolutions))?;
    writer.flush()?;
    Ok(())
}

fn run_read_slice(path: &str, pair: Option<&[String]>, limit: Option<usize>) -> Result<()> {
    let mut reader = SliceReader::from_path(path)?;
    let mut writer = output_handle(None)?;

    writeln!(writer, "# resolution\t{}", reader.resolution())?;
    writeln!(writer, "# chromosomes\t{}", reader.chromosomes().join(","))?;

    let contacts = match pair {
        Some([chr1, chr2]) => reader.read_pair(chr1, chr2)?,
        Some(other) => bail!("Expected two chromosomes for --pair, got {}", other.len()),
        None => reader.read_all()?,
    };
    for contact in contacts.iter().take(limit.unwrap_or(usize::MAX)) {
        writeln!(
            writer,
            "{}\t{}\t{}\t{}\t{}",
            contact.chr1, contact.bin_x, contact.chr2, contact.bin_y, contact.value
        )?;
    }
    writer.flush()?;
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Command::Dump {
            matrix_type,
            norm,
            file,
            chr1,
            chr2,
            unit,
            binsize,
            output,
            dense,
        } => run_dump(
            matrix_type,
            norm,
            &file,
            &chr1,
            &chr2,
            unit,
            binsize,
            output.as_deref(),
            dense,
        ),
        Command::Slice {
            matrix_type,
            norm,
            file,
            unit,
            binsize,
            output,
        } => run_slice(matrix_type, &norm, &file, unit, binsize, &output),
        Command::Header { file } => run_header(&file),
        Command::ReadSlice { file, pair, limit } => {
            run_read_slice(&file, pair.as_deref(), limit)
        }
    }
}
