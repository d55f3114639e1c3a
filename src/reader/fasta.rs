use rust_htslib::faidx;
use std::path::{Path, PathBuf};

use crate::error::{CustomError, Result};
use crate::reader::ReferenceSource;

/// FAI-indexed FASTA (the index is built by htslib if missing).
pub struct IndexedFasta {
    path: PathBuf,
    reader: faidx::Reader,
}

impl IndexedFasta {
    pub fn open(path: &impl AsRef<Path>) -> Result<Self> {
        let reader = faidx::Reader::from_path(path).map_err(|e| CustomError::Htslib {
            source: e,
            path: path.as_ref().to_path_buf(),
        })?;
        Ok(Self {
            path: path.as_ref().to_path_buf(),
            reader,
        })
    }
}

impl ReferenceSource for IndexedFasta {
    fn fetch(&self, chromosome: &str, start: u64, end: u64) -> Result<Vec<u8>> {
        if end <= start {
            return Ok(Vec::new());
        }
        // htslib takes an inclusive end coordinate
        let seq = self
            .reader
            .fetch_seq_string(chromosome, start as usize, (end - 1) as usize)
            .map_err(|e| CustomError::Htslib {
                source: e,
                path: self.path.clone(),
            })?;
        Ok(seq.into_bytes())
    }
}
