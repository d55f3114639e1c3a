use log::warn;
use std::ffi::OsString;
use std::path::{Path, PathBuf};

use crate::error::{CustomError, Result};
use crate::model::GenomeRelease;

pub const DEFAULT_KMER_LENGTH: usize = 21;
pub const DEFAULT_THRESHOLD: f64 = 0.1;
pub const DEFAULT_MIN_COV: u64 = 5;
pub const DEFAULT_GENOME_RELEASE: &str = "GRCh37";
pub const DEFAULT_DATA_DIR: &str = "data";
pub const DEFAULT_BCFTOOLS: &str = "bcftools";

fn existing_file(path: &Path) -> Result<PathBuf> {
    if !path.exists() {
        return Err(CustomError::InputNotFound {
            path: path.to_path_buf(),
        });
    }
    Ok(path.to_path_buf())
}

fn output_file(path: &Path) -> Result<PathBuf> {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() && !parent.is_dir() => {
            Err(CustomError::OutputParentNotFound {
                path: path.to_path_buf(),
            })
        }
        _ => Ok(path.to_path_buf()),
    }
}

/// Options shared by all commands.
#[derive(Debug, Clone)]
pub struct CommonConfig {
    storage_path: Option<PathBuf>,
    reference: Option<PathBuf>,
    data_dir: PathBuf,
    pub show_progress: bool,
}

impl CommonConfig {
    pub fn new(
        storage_path: Option<PathBuf>,
        reference: Option<PathBuf>,
        data_dir: PathBuf,
        show_progress: bool,
    ) -> Self {
        Self {
            storage_path,
            reference,
            data_dir,
            show_progress,
        }
    }

    /// The storage root, which must already exist.
    pub fn storage_path(&self) -> Result<PathBuf> {
        let path = self
            .storage_path
            .as_ref()
            .ok_or(CustomError::StoragePathMissing)?;
        if !path.is_dir() {
            return Err(CustomError::StoragePathNotFound { path: path.clone() });
        }
        Ok(path.clone())
    }

    pub fn reference(&self) -> Result<PathBuf> {
        let path = self.reference.as_ref().ok_or(CustomError::ReferenceMissing)?;
        if !path.exists() {
            return Err(CustomError::ReferenceNotFound { path: path.clone() });
        }
        Ok(path.clone())
    }

    /// Explicit path if given, otherwise the bundled file of the release.
    fn resolve_bundled(
        &self,
        explicit: Option<&Path>,
        genome_release: &str,
        file_name: fn(GenomeRelease) -> &'static str,
    ) -> Result<PathBuf> {
        match explicit {
            Some(path) => existing_file(path),
            None => {
                let release: GenomeRelease = genome_release.parse()?;
                existing_file(&self.data_dir.join(file_name(release)))
            }
        }
    }
}

fn validate_kmer_length(kmer_length: usize) -> Result<usize> {
    if kmer_length == 0 || kmer_length % 2 == 0 {
        return Err(CustomError::KmerLengthEven { kmer_length });
    }
    Ok(kmer_length)
}

fn warn_on_threshold(threshold: f64) {
    if threshold >= 0.5 {
        warn!("Threshold {threshold} leaves no room for heterozygous calls");
    }
}

#[derive(Debug, Clone)]
pub struct FastqKmersConfig {
    pub reference: PathBuf,
    pub sites_vcf: PathBuf,
    pub output_tsv: PathBuf,
    pub genome_release: String,
    pub kmer_length: usize,
    pub max_sites: Option<usize>,
    pub show_progress: bool,
}

impl FastqKmersConfig {
    pub fn new(
        common: &CommonConfig,
        output_tsv: &Path,
        kmer_length: usize,
        sites_vcf: Option<&Path>,
        genome_release: &str,
        max_sites: Option<usize>,
    ) -> Result<Self> {
        Ok(Self {
            reference: common.reference()?,
            sites_vcf: common.resolve_bundled(
                sites_vcf,
                genome_release,
                GenomeRelease::sites_file_name,
            )?,
            output_tsv: output_file(output_tsv)?,
            genome_release: genome_release.to_string(),
            kmer_length: validate_kmer_length(kmer_length)?,
            max_sites,
            show_progress: common.show_progress,
        })
    }
}

#[derive(Debug, Clone)]
pub struct FastqExtractConfig {
    pub storage_path: PathBuf,
    pub sample_id: String,
    pub input_files: Vec<PathBuf>,
    pub kmer_infos: PathBuf,
    pub genome_release: String,
    pub threshold: f64,
    pub show_progress: bool,
}

impl FastqExtractConfig {
    pub fn new(
        common: &CommonConfig,
        sample_id: &str,
        input_files: &[PathBuf],
        kmer_infos: Option<&Path>,
        genome_release: &str,
        threshold: f64,
    ) -> Result<Self> {
        warn_on_threshold(threshold);
        Ok(Self {
            storage_path: common.storage_path()?,
            sample_id: sample_id.to_string(),
            input_files: input_files
                .iter()
                .map(|p| existing_file(p))
                .collect::<Result<_>>()?,
            kmer_infos: common.resolve_bundled(
                kmer_infos,
                genome_release,
                GenomeRelease::kmers_file_name,
            )?,
            genome_release: genome_release.to_string(),
            threshold,
            show_progress: common.show_progress,
        })
    }
}

#[derive(Debug, Clone)]
pub struct BamExtractConfig {
    pub storage_path: PathBuf,
    pub reference: PathBuf,
    pub input_files: Vec<PathBuf>,
    pub sample_id: Option<String>,
    pub sites_vcf: PathBuf,
    pub genome_release: String,
    pub max_sites: Option<usize>,
    pub bcftools: OsString,
}

impl BamExtractConfig {
    pub fn new(
        common: &CommonConfig,
        input_files: &[PathBuf],
        sample_id: Option<&str>,
        sites_vcf: Option<&Path>,
        genome_release: &str,
        max_sites: Option<usize>,
        bcftools: &str,
    ) -> Result<Self> {
        Ok(Self {
            storage_path: common.storage_path()?,
            reference: common.reference()?,
            input_files: input_files
                .iter()
                .map(|p| existing_file(p))
                .collect::<Result<_>>()?,
            sample_id: sample_id.map(str::to_string),
            sites_vcf: common.resolve_bundled(
                sites_vcf,
                genome_release,
                GenomeRelease::sites_file_name,
            )?,
            genome_release: genome_release.to_string(),
            max_sites,
            bcftools: OsString::from(bcftools),
        })
    }
}

#[derive(Debug, Clone)]
pub struct CompareConfig {
    pub storage_path: PathBuf,
    pub min_coverage: u64,
    pub threads: Option<usize>,
    pub show_progress: bool,
}

impl CompareConfig {
    pub fn new(common: &CommonConfig, min_coverage: u64, threads: Option<usize>) -> Result<Self> {
        if let Some(0) = threads {
            return Err(CustomError::ThreadCount { threads: 0 });
        }
        Ok(Self {
            storage_path: common.storage_path()?,
            min_coverage,
            threads,
            show_progress: common.show_progress,
        })
    }
}

#[derive(Debug, Clone)]
pub struct ReportConfig {
    pub storage_path: PathBuf,
    pub output_csv: PathBuf,
}

impl ReportConfig {
    pub fn new(common: &CommonConfig, output_csv: &Path) -> Result<Self> {
        Ok(Self {
            storage_path: common.storage_path()?,
            output_csv: output_file(output_csv)?,
        })
    }
}
