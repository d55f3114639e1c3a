use log::{debug, info};
use std::collections::HashMap;
use std::ffi::OsStr;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use crate::error::{CustomError, Result};
use crate::model::{ChromNaming, Sample, SampleStats, Site, SiteStats, VariantStats, short_notation};
use crate::reader::CallRecord;
use crate::reader::bam::AlignmentHeader;
use crate::reader::vcf::read_calls;

/// Pileup restricted to the marker sites, emitting allele depths.
pub const TPL_PILEUP: &str =
    "{bcftools} mpileup -a AD,DP --threads 2 -I -R {sites} -f {reference} {input_bam}";

/// Consensus caller writing a bgzipped VCF.
pub const TPL_CALL: &str = "{bcftools} call -c -Oz -o {calls}";

/// Inputs of one external caller run.
pub struct CallerPaths<'a> {
    pub bcftools: &'a OsStr,
    pub sites_bed: &'a Path,
    pub reference: &'a Path,
    pub input_bam: &'a Path,
    pub calls_vcf: &'a Path,
}

/// Splits a template on whitespace and substitutes whole-token `{name}` placeholders.
pub fn render_command(template: &str, vars: &[(&str, &OsStr)]) -> Command {
    let mut tokens = template.split_whitespace().map(|token| {
        vars.iter()
            .find(|(name, _)| {
                token.len() == name.len() + 2
                    && token.starts_with('{')
                    && token.ends_with('}')
                    && &token[1..token.len() - 1] == *name
            })
            .map(|&(_, value)| value.to_os_string())
            .unwrap_or_else(|| token.into())
    });
    let mut command = Command::new(tokens.next().unwrap_or_default());
    command.args(tokens);
    command
}

fn describe(command: &Command) -> String {
    std::iter::once(command.get_program())
        .chain(command.get_args())
        .map(|s| s.to_string_lossy().into_owned())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Runs `upstream | downstream` and waits for both processes.
pub fn run_pipeline(mut upstream: Command, mut downstream: Command) -> Result<()> {
    let upstream_desc = describe(&upstream);
    let downstream_desc = describe(&downstream);

    let mut producer = upstream
        .stdout(Stdio::piped())
        .spawn()
        .map_err(|e| CustomError::CallerSpawn {
            source: e,
            command: upstream_desc.clone(),
        })?;
    let stdout = producer.stdout.take().ok_or_else(|| CustomError::CallerSpawn {
        source: std::io::Error::other("no stdout handle"),
        command: upstream_desc.clone(),
    })?;

    let consumer = downstream.stdin(Stdio::from(stdout)).spawn();
    // Releases the parent's read end so the producer sees EPIPE once the consumer exits.
    drop(downstream);
    let mut consumer = match consumer {
        Ok(child) => child,
        Err(e) => {
            let _ = producer.kill();
            let _ = producer.wait();
            return Err(CustomError::CallerSpawn {
                source: e,
                command: downstream_desc,
            });
        }
    };
    let producer_status = producer.wait().map_err(|e| CustomError::CallerSpawn {
        source: e,
        command: upstream_desc.clone(),
    })?;
    let consumer_status = consumer.wait().map_err(|e| CustomError::CallerSpawn {
        source: e,
        command: downstream_desc.clone(),
    })?;

    if !producer_status.success() {
        return Err(CustomError::CallerFailed {
            command: upstream_desc,
            status: producer_status.to_string(),
        });
    }
    if !consumer_status.success() {
        return Err(CustomError::CallerFailed {
            command: downstream_desc,
            status: consumer_status.to_string(),
        });
    }
    Ok(())
}

/// Performs variant calling at the sites in `paths.sites_bed`.
pub fn call_sites(paths: &CallerPaths) -> Result<()> {
    let pileup = render_command(
        TPL_PILEUP,
        &[
            ("bcftools", paths.bcftools),
            ("sites", paths.sites_bed.as_os_str()),
            ("reference", paths.reference.as_os_str()),
            ("input_bam", paths.input_bam.as_os_str()),
        ],
    );
    let call = render_command(
        TPL_CALL,
        &[
            ("bcftools", paths.bcftools),
            ("calls", paths.calls_vcf.as_os_str()),
        ],
    );
    info!("Performing variant calling at sites");
    info!("  mpileup: {}", describe(&pileup));
    info!("  call:    {}", describe(&call));
    run_pipeline(pileup, call)
}

/// Writes the sites as 0-based half-open BED intervals in the alignment's naming.
pub fn write_sites_bed(sites: &[Site], naming: ChromNaming, path: &Path) -> Result<()> {
    let to_err = |e| CustomError::Write {
        source: e,
        path: path.to_path_buf(),
    };
    let mut bed = BufWriter::new(File::create(path).map_err(to_err)?);
    for site in sites {
        writeln!(
            bed,
            "{}\t{}\t{}",
            naming.apply(&site.chromosome),
            site.position - 1,
            site.position
        )
        .map_err(to_err)?;
    }
    bed.flush().map_err(to_err)?;
    info!("Wrote {} sites to {}", sites.len(), path.display());
    Ok(())
}

/// Joins caller output onto the site list. Sites the caller skipped keep empty stats.
pub fn calls_to_site_stats(
    sites: &[Site],
    naming: ChromNaming,
    calls: impl IntoIterator<Item = CallRecord>,
) -> Vec<SiteStats> {
    let Some(first) = sites.first() else {
        return Vec::new();
    };
    let genome_release = &first.genome_release;
    let back = naming.inverse();

    let mut variant_stats: HashMap<String, VariantStats> = sites
        .iter()
        .map(|site| (site.short_notation(), VariantStats::default()))
        .collect();
    for call in calls {
        let key = short_notation(genome_release, &back.apply(&call.chromosome), call.position);
        if let Some(stats) = variant_stats.get_mut(&key) {
            *stats = VariantStats {
                genotype: call.genotype,
                total_cov: call.total_cov,
                alt_cov: call.alt_cov,
            };
        }
    }

    sites
        .iter()
        .map(|site| SiteStats {
            site: site.clone(),
            stats: variant_stats
                .get(&site.short_notation())
                .copied()
                .unwrap_or_default(),
        })
        .collect()
}

/// Picks the single sample name declared by the read groups.
pub fn guess_sample_id(header: &AlignmentHeader) -> Result<String> {
    let mut distinct = header.read_group_samples();
    distinct.sort();
    distinct.dedup();
    match distinct.len() {
        0 => Err(CustomError::SampleNameMissing {
            path: header.path.clone(),
        }),
        1 => Ok(distinct.swap_remove(0)),
        _ => Err(CustomError::SampleNameAmbiguous {
            path: header.path.clone(),
            names: distinct,
        }),
    }
}

pub struct BamExtraction<'a> {
    pub sites: &'a [Site],
    pub reference: &'a Path,
    pub bcftools: &'a OsStr,
    pub sample_id: Option<&'a str>,
}

impl BamExtraction<'_> {
    /// Fingerprints one alignment file through the external caller.
    pub fn extract(&self, path_bam: &Path) -> Result<SampleStats> {
        info!("Extracting from BAM file: {}", path_bam.display());
        let header = AlignmentHeader::open(&path_bam, Some(self.reference))?;
        let sample_id = match self.sample_id {
            Some(id) => id.to_string(),
            None => guess_sample_id(&header)?,
        };
        let first_reference = header.reference_names.first().ok_or_else(|| {
            CustomError::NoReferenceSequences {
                path: path_bam.to_path_buf(),
            }
        })?;
        let naming = match self.sites.first() {
            Some(site) => ChromNaming::reconcile(&site.chromosome, first_reference),
            None => ChromNaming::Identity,
        };
        debug!("Sample {sample_id}, chromosome naming transform {naming:?}");

        let tmp_dir = tempfile::tempdir().map_err(|e| CustomError::CreateDir {
            source: e,
            path: std::env::temp_dir(),
        })?;
        let sites_bed: PathBuf = tmp_dir.path().join("sites.bed");
        let calls_vcf: PathBuf = tmp_dir.path().join("calls.vcf.gz");
        write_sites_bed(self.sites, naming, &sites_bed)?;
        call_sites(&CallerPaths {
            bcftools: self.bcftools,
            sites_bed: &sites_bed,
            reference: self.reference,
            input_bam: path_bam,
            calls_vcf: &calls_vcf,
        })?;
        let calls = read_calls(&calls_vcf)?;

        Ok(SampleStats {
            sample: Sample { name: sample_id },
            site_stats: calls_to_site_stats(self.sites, naming, calls),
        })
    }
}
