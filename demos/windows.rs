use anyhow::Result;
use clap::Parser;
use hicstraw::{HicFile, MatrixType, Normalization, Unit};

/// Sums contacts over consecutive diagonal windows of one chromosome
#[derive(Parser)]
struct Args {
    /// Input .hic path or URL
    #[clap(required = true)]
    input: String,

    /// Chromosome to scan
    #[clap(required = true)]
    chromosome: String,

    /// Bin size in base pairs
    #[clap(short, long, default_value_t = 25_000)]
    resolution: i32,

    /// Window width in base pairs
    #[clap(short, long, default_value_t = 1_000_000)]
    window: i64,

    /// Normalization to apply
    #[clap(short, long, default_value = "NONE")]
    norm: Normalization,
}

fn main() -> Result<()> {
    let args = Args::parse();
    let mut file = HicFile::open(&args.input)?;
    let length = match file.chromosome(&args.chromosome) {
        Some(chromosome) => chromosome.length,
        None => anyhow::bail!("{} not found in {}", args.chromosome, args.input),
    };

    let mut session = file.matrix_zoom_data(
        &args.chromosome,
        &args.chromosome,
        MatrixType::Observed,
        &args.norm,
        Unit::Bp,
        args.resolution,
    )?;

    let mut start = 0;
    while start < length {
        let end = (start + args.window).min(length);
        let records = session.records([start, end, start, end])?;
        let total: f64 = records
            .iter()
            .filter(|r| r.counts.is_finite())
            .map(|r| f64::from(r.counts))
            .sum();
        println!("{}\t{start}\t{end}\t{}\t{total}", args.chromosome, records.len());
        start = end + 1;
    }
    Ok(())
}
