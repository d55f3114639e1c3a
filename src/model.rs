use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{CustomError, Result};

/// Genome releases that ship with default site and k-mer files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GenomeRelease {
    Grch37,
    Grch38,
}

impl GenomeRelease {
    pub fn as_str(self) -> &'static str {
        match self {
            GenomeRelease::Grch37 => "GRCh37",
            GenomeRelease::Grch38 => "GRCh38",
        }
    }

    pub fn sites_file_name(self) -> &'static str {
        match self {
            GenomeRelease::Grch37 => "sites.GRCh37.vcf.gz",
            GenomeRelease::Grch38 => "sites.hg38.vcf.gz",
        }
    }

    pub fn kmers_file_name(self) -> &'static str {
        match self {
            GenomeRelease::Grch37 => "kmers.GRCh37.tsv.gz",
            GenomeRelease::Grch38 => "kmers.hg38.tsv.gz",
        }
    }
}

impl FromStr for GenomeRelease {
    type Err = CustomError;

    fn from_str(value: &str) -> Result<Self> {
        match value {
            "GRCh37" => Ok(GenomeRelease::Grch37),
            "GRCh38" | "hg38" => Ok(GenomeRelease::Grch38),
            _ => Err(CustomError::UnknownGenomeRelease {
                value: value.to_string(),
            }),
        }
    }
}

impl fmt::Display for GenomeRelease {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Diploid genotype at a bi-allelic site. A no-call is `None` at the use site.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Genotype {
    #[serde(rename = "0/0")]
    Ref,
    #[serde(rename = "0/1")]
    Het,
    #[serde(rename = "1/1")]
    Hom,
}

impl Genotype {
    pub fn as_str(self) -> &'static str {
        match self {
            Genotype::Ref => "0/0",
            Genotype::Het => "0/1",
            Genotype::Hom => "1/1",
        }
    }

    /// Parses a VCF `GT` value. Missing calls (`./.`, `.`) yield `Ok(None)`.
    pub fn from_vcf(value: &str) -> Result<Option<Self>> {
        let normalized = value.replace('|', "/");
        match normalized.as_str() {
            "0/0" => Ok(Some(Genotype::Ref)),
            "0/1" | "1/0" => Ok(Some(Genotype::Het)),
            "1/1" => Ok(Some(Genotype::Hom)),
            "." | "./." => Ok(None),
            _ => Err(CustomError::UnknownGenotype {
                value: value.to_string(),
            }),
        }
    }
}

impl fmt::Display for Genotype {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Site {
    pub genome_release: String,
    pub chromosome: String,
    /// 1-based.
    pub position: u64,
    pub reference: String,
    pub alternative: String,
}

impl Site {
    /// `genome_release-chromosome-position`, the join key across extraction paths.
    pub fn short_notation(&self) -> String {
        short_notation(&self.genome_release, &self.chromosome, self.position)
    }
}

pub fn short_notation(genome_release: &str, chromosome: &str, position: u64) -> String {
    format!("{genome_release}-{chromosome}-{position}")
}

/// Transform from the marker-site chromosome naming to the one of an alignment file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChromNaming {
    Identity,
    AddPrefix,
    StripPrefix,
}

impl ChromNaming {
    /// Compares the first site's chromosome with the first reference sequence name.
    pub fn reconcile(first_site_chromosome: &str, first_reference_name: &str) -> Self {
        let sites_have_prefix = first_site_chromosome.starts_with("chr");
        let reads_have_prefix = first_reference_name.starts_with("chr");
        match (sites_have_prefix, reads_have_prefix) {
            (true, false) => ChromNaming::StripPrefix,
            (false, true) => ChromNaming::AddPrefix,
            _ => ChromNaming::Identity,
        }
    }

    pub fn inverse(self) -> Self {
        match self {
            ChromNaming::Identity => ChromNaming::Identity,
            ChromNaming::AddPrefix => ChromNaming::StripPrefix,
            ChromNaming::StripPrefix => ChromNaming::AddPrefix,
        }
    }

    pub fn apply(self, chromosome: &str) -> String {
        match self {
            ChromNaming::Identity => chromosome.to_string(),
            ChromNaming::AddPrefix => format!("chr{chromosome}"),
            ChromNaming::StripPrefix => chromosome
                .strip_prefix("chr")
                .unwrap_or(chromosome)
                .to_string(),
        }
    }
}

/// Missing values mean "not determinable", never zero.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VariantStats {
    pub genotype: Option<Genotype>,
    pub total_cov: Option<u64>,
    pub alt_cov: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SiteStats {
    pub site: Site,
    pub stats: VariantStats,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sample {
    pub name: String,
}

/// A sample's fingerprint. `site_stats` follows the marker-site order used at extraction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SampleStats {
    pub sample: Sample,
    pub site_stats: Vec<SiteStats>,
}

pub type PairKey = (String, String);

/// Allele-sharing statistics of two samples; `sample_i < sample_j` always holds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SimilarityPair {
    pub sample_i: String,
    pub sample_j: String,
    pub n_ibs0: u64,
    pub n_ibs1: u64,
    pub n_ibs2: u64,
    pub het_i: u64,
    pub het_j: u64,
    pub het_i_j: u64,
}

impl SimilarityPair {
    pub fn key(&self) -> PairKey {
        (self.sample_i.clone(), self.sample_j.clone())
    }

    /// Relatedness as `(het_i_j - 2 * n_ibs0) / (0.5 * sqrt(het_i * het_j))`.
    ///
    /// `None` when either sample has no heterozygous site, i.e. the score is
    /// not estimable. Computed on read and never persisted.
    pub fn relatedness(&self) -> Option<f64> {
        if self.het_i == 0 || self.het_j == 0 {
            return None;
        }
        let numerator = self.het_i_j as f64 - 2.0 * self.n_ibs0 as f64;
        let denominator = 0.5 * ((self.het_i as f64) * (self.het_j as f64)).sqrt();
        Some(numerator / denominator)
    }
}

/// A marker site with the reference k-mer centred on it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KmerInfo {
    pub site: Site,
    pub ref_kmer: String,
}

impl KmerInfo {
    pub const HEADERS: [&'static str; 6] = [
        "genome_release",
        "chromosome",
        "position",
        "reference",
        "alternative",
        "ref_kmer",
    ];

    /// The reference k-mer with its middle base replaced by the alternative allele.
    pub fn alt_kmer(&self) -> String {
        let mid = self.ref_kmer.len() / 2;
        format!(
            "{}{}{}",
            &self.ref_kmer[..mid],
            self.site.alternative,
            &self.ref_kmer[mid + 1..]
        )
    }

    /// The centre base of the reference k-mer.
    pub fn reference_base(&self) -> &str {
        let mid = self.ref_kmer.len() / 2;
        &self.ref_kmer[mid..mid + 1]
    }
}
