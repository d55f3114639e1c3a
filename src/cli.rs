use crate::config::{
    BamExtractConfig, CommonConfig, CompareConfig, FastqExtractConfig, FastqKmersConfig,
    ReportConfig,
};
use crate::error::Result;
use crate::extract::bam::BamExtraction;
use crate::extract::fastq::extract_sample_stats;
use crate::extract::kmer_table::generate_kmer_infos;
use crate::output::write_relatedness_csv;
use crate::reader::SequenceSource;
use crate::reader::fasta::IndexedFasta;
use crate::reader::fastx::FastxFile;
use crate::reader::kmer_table::{read_kmer_infos, write_kmer_infos};
use crate::reader::vcf::read_sites;
use crate::similarity::{FeatureMatrix, compute_missing};
use crate::store::{
    load_sample_stats, load_similarity_pairs, write_sample_stats, write_similarity_pairs,
};
use crate::{Args, Command};
use log::{debug, info, warn};
use rayon::ThreadPoolBuilder;

/// Validated configuration of the selected command.
#[derive(Debug, Clone)]
pub enum RunSpec {
    FastqKmers(FastqKmersConfig),
    FastqExtract(FastqExtractConfig),
    BamExtract(BamExtractConfig),
    Compare(CompareConfig),
    Report(ReportConfig),
}

pub fn build_run_spec(args: &Args) -> Result<RunSpec> {
    let common = CommonConfig::new(
        args.storage_path.clone(),
        args.reference.clone(),
        args.data_dir.clone(),
        !args.quiet,
    );
    let spec = match &args.command {
        Command::FastqKmers(cmd) => RunSpec::FastqKmers(FastqKmersConfig::new(
            &common,
            &cmd.output_tsv,
            cmd.kmer_length,
            cmd.sites_vcf.as_deref(),
            &cmd.genome_release,
            cmd.max_sites,
        )?),
        Command::FastqExtract(cmd) => RunSpec::FastqExtract(FastqExtractConfig::new(
            &common,
            &cmd.sample_id,
            &cmd.input_files,
            cmd.kmer_infos.as_deref(),
            &cmd.genome_release,
            cmd.threshold,
        )?),
        Command::BamExtract(cmd) => RunSpec::BamExtract(BamExtractConfig::new(
            &common,
            &cmd.input_files,
            cmd.sample_id.as_deref(),
            cmd.sites_vcf.as_deref(),
            &cmd.genome_release,
            cmd.max_sites,
            &cmd.bcftools,
        )?),
        Command::Compare(cmd) => {
            RunSpec::Compare(CompareConfig::new(&common, cmd.min_cov, cmd.threads)?)
        }
        Command::Report(cmd) => RunSpec::Report(ReportConfig::new(&common, &cmd.output_csv)?),
    };
    debug!("{spec:?}");
    Ok(spec)
}

pub fn run(spec: &RunSpec) -> Result<()> {
    match spec {
        RunSpec::FastqKmers(config) => run_fastq_kmers(config)?,
        RunSpec::FastqExtract(config) => run_fastq_extract(config)?,
        RunSpec::BamExtract(config) => run_bam_extract(config)?,
        RunSpec::Compare(config) => run_compare(config)?,
        RunSpec::Report(config) => run_report(config)?,
    }
    info!("All done. Have a nice day!");
    Ok(())
}

fn run_fastq_kmers(config: &FastqKmersConfig) -> Result<()> {
    info!("Loading sites...");
    let sites = read_sites(&config.sites_vcf, &config.genome_release, config.max_sites)?;
    info!("Loaded {} sites from {}", sites.len(), config.sites_vcf.display());

    info!("Extracting {}-mers from {}...", config.kmer_length, config.reference.display());
    let reference = IndexedFasta::open(&config.reference)?;
    let kmer_infos =
        generate_kmer_infos(&sites, config.kmer_length, &reference, config.show_progress)?;

    write_kmer_infos(&kmer_infos, &config.output_tsv)?;
    info!("Wrote {} k-mers to {}", kmer_infos.len(), config.output_tsv.display());
    Ok(())
}

fn run_fastq_extract(config: &FastqExtractConfig) -> Result<()> {
    info!("Loading k-mer infos...");
    let kmer_infos = read_kmer_infos(&config.kmer_infos)?;
    info!("Loaded {} marker sites from {}", kmer_infos.len(), config.kmer_infos.display());
    if let Some(mismatch) = kmer_infos
        .iter()
        .find(|info| info.site.genome_release != config.genome_release)
    {
        warn!(
            "K-mer table is labelled {} but genome release is {}",
            mismatch.site.genome_release, config.genome_release
        );
    }

    let mut sources = config
        .input_files
        .iter()
        .map(|path| FastxFile::open(path).map(|f| Box::new(f) as Box<dyn SequenceSource>))
        .collect::<Result<Vec<_>>>()?;

    let stats = extract_sample_stats(
        &config.sample_id,
        &kmer_infos,
        config.threshold,
        &mut sources,
        config.show_progress,
    )?;
    let path = write_sample_stats(&config.storage_path, &stats)?;
    info!("Wrote fingerprint of {} to {}", config.sample_id, path.display());
    Ok(())
}

fn run_bam_extract(config: &BamExtractConfig) -> Result<()> {
    info!("Loading sites...");
    let sites = read_sites(&config.sites_vcf, &config.genome_release, config.max_sites)?;
    info!("Loaded {} sites from {}", sites.len(), config.sites_vcf.display());
    if config.sample_id.is_some() && config.input_files.len() > 1 {
        warn!("--sample-id applies to every input file, later fingerprints replace earlier ones");
    }

    let extraction = BamExtraction {
        sites: &sites,
        reference: &config.reference,
        bcftools: &config.bcftools,
        sample_id: config.sample_id.as_deref(),
    };
    // Nothing is written unless every input succeeds.
    let all_stats = config
        .input_files
        .iter()
        .map(|path| extraction.extract(path))
        .collect::<Result<Vec<_>>>()?;

    for stats in &all_stats {
        let path = write_sample_stats(&config.storage_path, stats)?;
        info!("Wrote fingerprint of {} to {}", stats.sample.name, path.display());
    }
    Ok(())
}

fn run_compare(config: &CompareConfig) -> Result<()> {
    let all_stats = load_sample_stats(&config.storage_path)?;
    let matrices: Vec<FeatureMatrix> = all_stats
        .values()
        .map(|stats| FeatureMatrix::from_sample_stats(stats, config.min_coverage))
        .collect();
    for matrix in &matrices {
        debug!(
            "{}: {} of {} sites covered",
            matrix.name,
            matrix.n_covered(),
            matrix.n_sites()
        );
    }
    let mut known = load_similarity_pairs(&config.storage_path)?;

    let n_new = match config.threads {
        Some(n) => {
            let pool = ThreadPoolBuilder::new().num_threads(n).build()?;
            pool.install(|| compute_missing(&matrices, &mut known, config.show_progress))?
        }
        None => compute_missing(&matrices, &mut known, config.show_progress)?,
    };
    info!("Computed {n_new} new pairs, {} in total", known.len());

    let n_files = write_similarity_pairs(&config.storage_path, &known)?;
    info!("Wrote {n_files} similarity files to {}", config.storage_path.display());
    Ok(())
}

fn run_report(config: &ReportConfig) -> Result<()> {
    let pairs = load_similarity_pairs(&config.storage_path)?;
    write_relatedness_csv(&pairs, &config.output_csv)?;
    info!("Wrote {} pairs to {}", pairs.len(), config.output_csv.display());
    Ok(())
}
