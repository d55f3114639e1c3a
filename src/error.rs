use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Coarse classification used to tell a bad environment from bad input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Config,
    Data,
    Io,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorKind::Config => write!(f, "configuration"),
            ErrorKind::Data => write!(f, "data"),
            ErrorKind::Io => write!(f, "I/O"),
        }
    }
}

#[derive(Debug, Error)]
pub enum CustomError {
    #[error("could not read {path}")]
    ReadWithPath {
        #[source]
        source: std::io::Error,
        path: PathBuf,
    },

    #[error("could not write to {path}")]
    Write {
        #[source]
        source: std::io::Error,
        path: PathBuf,
    },

    #[error("could not create directory {path}")]
    CreateDir {
        #[source]
        source: std::io::Error,
        path: PathBuf,
    },

    #[error("could not read or write k-mer table")]
    Csv(#[from] csv::Error),

    #[error("could not parse sequences in {path}")]
    Fastx {
        #[source]
        source: needletail::errors::ParseError,
        path: PathBuf,
    },

    #[error("htslib could not process {path}")]
    Htslib {
        #[source]
        source: rust_htslib::errors::Error,
        path: PathBuf,
    },

    #[error("could not start `{command}`")]
    CallerSpawn {
        #[source]
        source: std::io::Error,
        command: String,
    },

    #[error("`{command}` exited with {status}")]
    CallerFailed { command: String, status: String },

    #[error("could not build thread pool")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),

    #[error("invalid progress bar template")]
    ProgressTemplate(#[from] indicatif::style::TemplateError),

    #[error("--storage-path must be provided")]
    StoragePathMissing,

    #[error("storage path {path} does not exist")]
    StoragePathNotFound { path: PathBuf },

    #[error("--reference must be provided")]
    ReferenceMissing,

    #[error("reference {path} does not exist")]
    ReferenceNotFound { path: PathBuf },

    #[error("input file {path} does not exist")]
    InputNotFound { path: PathBuf },

    #[error("directory of output file {path} does not exist")]
    OutputParentNotFound { path: PathBuf },

    #[error("unknown genome release \"{value}\" (expected GRCh37 or GRCh38)")]
    UnknownGenomeRelease { value: String },

    #[error("k-mer length must be odd and positive (got {kmer_length})")]
    KmerLengthEven { kmer_length: usize },

    #[error("need at least 1 thread (got {threads})")]
    ThreadCount { threads: usize },

    #[error("k-mer of invalid length ({len}): {kmer}, should be {expected}")]
    KmerLength {
        kmer: String,
        len: usize,
        expected: usize,
    },

    #[error("marker k-mer {kmer} has length {len}, expected {expected}")]
    InconsistentKmerLengths {
        kmer: String,
        len: usize,
        expected: usize,
    },

    #[error("no marker k-mers to count")]
    EmptyKmerTable,

    #[error("no marker sites in {path}")]
    EmptySites { path: PathBuf },

    #[error("expected {chromosome}:{position} to be {expected} but is {found}")]
    ReferenceBaseMismatch {
        chromosome: String,
        position: u64,
        expected: String,
        found: String,
    },

    #[error("site {chromosome}:{position} is too close to the contig start for k = {kmer_length}")]
    SiteTooCloseToStart {
        chromosome: String,
        position: u64,
        kmer_length: usize,
    },

    #[error("found more than one sample name in read groups of {path}: {names:?}; use --sample-id")]
    SampleNameAmbiguous { path: PathBuf, names: Vec<String> },

    #[error("found no read group sample name in {path}; use --sample-id")]
    SampleNameMissing { path: PathBuf },

    #[error("{path} declares no reference sequences")]
    NoReferenceSequences { path: PathBuf },

    #[error("could not get genotype for value \"{value}\"")]
    UnknownGenotype { value: String },

    #[error("invalid header in k-mer table {path}: {found:?}, expected {expected:?}")]
    KmerTableHeader {
        path: PathBuf,
        found: Vec<String>,
        expected: Vec<String>,
    },

    #[error("expected {expected} fields (got {n_fields}) in line {line_num} of k-mer table")]
    KmerTableFields {
        line_num: u64,
        n_fields: usize,
        expected: usize,
    },

    #[error("could not parse position \"{value}\" in line {line_num} of k-mer table")]
    KmerTablePosition {
        #[source]
        source: std::num::ParseIntError,
        line_num: u64,
        value: String,
    },

    #[error("k-mer \"{kmer}\" in line {line_num} of k-mer table must be ASCII with odd length")]
    KmerTableKmer { line_num: u64, kmer: String },

    #[error("record {chromosome}:{position} in {path} has no alternative allele")]
    SiteWithoutAlt {
        path: PathBuf,
        chromosome: String,
        position: u64,
    },

    #[error("record at position {position} in {path} has no contig")]
    RecordWithoutContig { path: PathBuf, position: u64 },

    #[error("malformed JSON in {path}")]
    Json {
        #[source]
        source: serde_json::Error,
        path: PathBuf,
    },

    #[error("fingerprints of {sample_i} ({n_i} sites) and {sample_j} ({n_j} sites) do not share a site list")]
    SiteCountMismatch {
        sample_i: String,
        sample_j: String,
        n_i: usize,
        n_j: usize,
    },

    #[error("similarity pair ({sample_i}, {sample_j}) is not in canonical order")]
    PairOrder { sample_i: String, sample_j: String },
}

impl CustomError {
    pub fn kind(&self) -> ErrorKind {
        use CustomError::*;
        match self {
            StoragePathMissing
            | StoragePathNotFound { .. }
            | ReferenceMissing
            | ReferenceNotFound { .. }
            | InputNotFound { .. }
            | OutputParentNotFound { .. }
            | UnknownGenomeRelease { .. }
            | KmerLengthEven { .. }
            | ThreadCount { .. } => ErrorKind::Config,
            KmerLength { .. }
            | InconsistentKmerLengths { .. }
            | EmptyKmerTable
            | EmptySites { .. }
            | ReferenceBaseMismatch { .. }
            | SiteTooCloseToStart { .. }
            | SampleNameAmbiguous { .. }
            | SampleNameMissing { .. }
            | NoReferenceSequences { .. }
            | UnknownGenotype { .. }
            | KmerTableHeader { .. }
            | KmerTableFields { .. }
            | KmerTablePosition { .. }
            | KmerTableKmer { .. }
            | SiteWithoutAlt { .. }
            | RecordWithoutContig { .. }
            | Json { .. }
            | SiteCountMismatch { .. }
            | PairOrder { .. } => ErrorKind::Data,
            ReadWithPath { .. }
            | Write { .. }
            | CreateDir { .. }
            | Csv(_)
            | Fastx { .. }
            | Htslib { .. }
            | CallerSpawn { .. }
            | CallerFailed { .. }
            | ThreadPool(_)
            | ProgressTemplate(_) => ErrorKind::Io,
        }
    }
}

pub type Result<T> = std::result::Result<T, CustomError>;
