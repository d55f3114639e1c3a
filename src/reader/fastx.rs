use needletail::{FastxReader, parse_fastx_file};
use std::path::{Path, PathBuf};

use crate::error::{CustomError, Result};
use crate::reader::SequenceSource;

/// FASTQ or FASTA file, optionally compressed; the format is sniffed from the content.
pub struct FastxFile {
    path: PathBuf,
    reader: Box<dyn FastxReader>,
}

impl FastxFile {
    pub fn open(path: &impl AsRef<Path>) -> Result<Self> {
        let reader = parse_fastx_file(path).map_err(|e| CustomError::Fastx {
            source: e,
            path: path.as_ref().to_path_buf(),
        })?;
        Ok(Self {
            path: path.as_ref().to_path_buf(),
            reader,
        })
    }
}

impl SequenceSource for FastxFile {
    fn label(&self) -> String {
        self.path.display().to_string()
    }

    fn for_each_sequence(&mut self, visit: &mut dyn FnMut(&[u8]) -> Result<()>) -> Result<u64> {
        let mut n_reads = 0;
        while let Some(record) = self.reader.next() {
            let record = record.map_err(|e| CustomError::Fastx {
                source: e,
                path: self.path.clone(),
            })?;
            visit(&record.seq())?;
            n_reads += 1;
        }
        Ok(n_reads)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn streams_every_read_of_a_fastq() {
        let mut file = tempfile::Builder::new().suffix(".fq").tempfile().unwrap();
        write!(
            file,
            "@r1\nACGTACGT\n+\nIIIIIIII\n@r2\nTTTT\n+\nIIII\n@r3\nGGGGCCCCAA\n+\nIIIIIIIIII\n"
        )
        .unwrap();
        file.flush().unwrap();

        let mut source = FastxFile::open(&file.path()).unwrap();
        let mut seen = Vec::new();
        let n = source
            .for_each_sequence(&mut |seq| {
                seen.push(seq.to_vec());
                Ok(())
            })
            .unwrap();
        assert_eq!(n, 3);
        assert_eq!(seen[1], b"TTTT".to_vec());
    }
}
