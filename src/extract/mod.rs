pub mod bam;
pub mod fastq;
pub mod kmer_table;
