pub mod bam;
pub mod fasta;
pub mod fastx;
pub mod kmer_table;
pub mod vcf;

use crate::error::Result;
use crate::model::Genotype;

/// A stream of read sequences, consumed in a single pass.
pub trait SequenceSource {
    fn label(&self) -> String;

    /// Calls `visit` once per read and returns the number of reads seen.
    fn for_each_sequence(&mut self, visit: &mut dyn FnMut(&[u8]) -> Result<()>) -> Result<u64>;
}

/// Random access to reference sequence by 0-based half-open interval.
pub trait ReferenceSource {
    fn fetch(&self, chromosome: &str, start: u64, end: u64) -> Result<Vec<u8>>;
}

/// What the external caller reports for one site, in the alignment's naming.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallRecord {
    pub chromosome: String,
    /// 1-based.
    pub position: u64,
    pub genotype: Option<Genotype>,
    pub total_cov: Option<u64>,
    pub alt_cov: Option<u64>,
}
