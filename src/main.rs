mod cli;
mod config;
mod error;
mod extract;
mod genotype;
mod kmers;
mod model;
mod output;
mod reader;
mod similarity;
mod store;

use crate::config::{
    DEFAULT_BCFTOOLS, DEFAULT_DATA_DIR, DEFAULT_GENOME_RELEASE, DEFAULT_KMER_LENGTH,
    DEFAULT_MIN_COV, DEFAULT_THRESHOLD,
};
use crate::error::Result;
use clap::{Parser, Subcommand};
use log::{LevelFilter, error};
use miette::IntoDiagnostic;
use std::path::PathBuf;

/// Genomic fingerprinting of sequencing samples and pairwise relatedness checks.
#[derive(Parser, Debug)]
#[command(version, about)]
pub struct Args {
    /// Enable debug logging.
    #[arg(long, global = true)]
    verbose: bool,

    /// Only log warnings and errors, hide progress bars.
    #[arg(long, global = true)]
    quiet: bool,

    /// FAI-indexed reference FASTA.
    #[arg(long, global = true, value_hint = clap::ValueHint::FilePath)]
    reference: Option<PathBuf>,

    /// Root directory of stored fingerprints and similarities.
    #[arg(long, global = true, value_hint = clap::ValueHint::DirPath)]
    storage_path: Option<PathBuf>,

    /// Directory holding the bundled per-release site and k-mer files.
    #[arg(
        long,
        global = true,
        env = "FINGERQC_DATA_DIR",
        default_value = DEFAULT_DATA_DIR,
        value_hint = clap::ValueHint::DirPath
    )]
    data_dir: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Generate the marker k-mer table from the reference and the marker sites.
    FastqKmers(FastqKmersArgs),
    /// Fingerprint a sample from FASTQ/FASTA reads by k-mer counting.
    FastqExtract(FastqExtractArgs),
    /// Fingerprint aligned reads by calling variants at the marker sites.
    BamExtract(BamExtractArgs),
    /// Compute all missing pairwise similarities between stored fingerprints.
    Compare(CompareArgs),
    /// Write the stored similarities with relatedness scores as CSV.
    Report(ReportArgs),
}

#[derive(clap::Args, Debug)]
pub struct FastqKmersArgs {
    /// Output table, gzip-compressed if the name ends in `.gz`.
    #[arg(long)]
    output_tsv: PathBuf,

    /// Odd k-mer length.
    #[arg(long, default_value_t = DEFAULT_KMER_LENGTH)]
    kmer_length: usize,

    /// Marker sites VCF; defaults to the bundled file of the genome release.
    #[arg(long)]
    sites_vcf: Option<PathBuf>,

    #[arg(long, default_value = DEFAULT_GENOME_RELEASE)]
    genome_release: String,

    /// Use at most this many sites (0 means all).
    #[arg(long)]
    max_sites: Option<usize>,
}

#[derive(clap::Args, Debug)]
pub struct FastqExtractArgs {
    #[arg(long)]
    sample_id: String,

    /// FASTQ/FASTA files of the sample, optionally compressed.
    #[arg(long, required = true, num_args = 1..)]
    input_files: Vec<PathBuf>,

    /// K-mer table; defaults to the bundled file of the genome release.
    #[arg(long)]
    kmer_infos: Option<PathBuf>,

    #[arg(long, default_value = DEFAULT_GENOME_RELEASE)]
    genome_release: String,

    /// Alternative allele fraction up to which a site is called REF.
    #[arg(long, default_value_t = DEFAULT_THRESHOLD)]
    threshold: f64,
}

#[derive(clap::Args, Debug)]
pub struct BamExtractArgs {
    /// BAM/CRAM files, one fingerprint each.
    #[arg(long, required = true, num_args = 1..)]
    input_files: Vec<PathBuf>,

    /// Sample name; guessed from the read groups if not given.
    #[arg(long)]
    sample_id: Option<String>,

    /// Marker sites VCF; defaults to the bundled file of the genome release.
    #[arg(long)]
    sites_vcf: Option<PathBuf>,

    #[arg(long, default_value = DEFAULT_GENOME_RELEASE)]
    genome_release: String,

    /// Use at most this many sites (0 means all).
    #[arg(long)]
    max_sites: Option<usize>,

    /// bcftools executable.
    #[arg(long, default_value = DEFAULT_BCFTOOLS)]
    bcftools: String,
}

#[derive(clap::Args, Debug)]
pub struct CompareArgs {
    /// Sites need strictly more coverage than this in both samples.
    #[arg(long, default_value_t = DEFAULT_MIN_COV)]
    min_cov: u64,

    /// Number of threads; uses the rayon default if not given.
    #[arg(short, long)]
    threads: Option<usize>,
}

#[derive(clap::Args, Debug)]
pub struct ReportArgs {
    #[arg(long)]
    output_csv: PathBuf,
}

fn init_logging(args: &Args) {
    let level = if args.verbose {
        LevelFilter::Debug
    } else if args.quiet {
        LevelFilter::Warn
    } else {
        LevelFilter::Info
    };
    env_logger::builder()
        .format_timestamp_millis()
        .filter_level(level)
        .init();
}

fn try_main() -> Result<()> {
    let args = Args::parse();
    init_logging(&args);

    let run_spec = cli::build_run_spec(&args)?;
    cli::run(&run_spec)?;
    Ok(())
}

fn main() -> miette::Result<()> {
    try_main()
        .inspect_err(|e| error!("Aborting on {} error", e.kind()))
        .into_diagnostic()
}
