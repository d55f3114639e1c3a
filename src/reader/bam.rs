use rust_htslib::bam::{self, Read};
use std::path::{Path, PathBuf};

use crate::error::{CustomError, Result};

/// The parts of a BAM/CRAM header needed to fingerprint it.
pub struct AlignmentHeader {
    pub path: PathBuf,
    pub reference_names: Vec<String>,
    pub text: String,
}

impl AlignmentHeader {
    pub fn open(path: &impl AsRef<Path>, reference: Option<&Path>) -> Result<Self> {
        let to_err = |e| CustomError::Htslib {
            source: e,
            path: path.as_ref().to_path_buf(),
        };
        let mut reader = bam::Reader::from_path(path).map_err(to_err)?;
        if let Some(reference) = reference {
            reader.set_reference(reference).map_err(to_err)?;
        }
        let header = reader.header();
        let reference_names = header
            .target_names()
            .into_iter()
            .map(|name| String::from_utf8_lossy(name).into_owned())
            .collect();
        let text = String::from_utf8_lossy(header.as_bytes()).into_owned();
        Ok(Self {
            path: path.as_ref().to_path_buf(),
            reference_names,
            text,
        })
    }

    /// Sample names from the `@RG` lines (`SM`, falling back to `ID`), in header order.
    pub fn read_group_samples(&self) -> Vec<String> {
        read_group_samples(&self.text)
    }
}

pub(crate) fn read_group_samples(header_text: &str) -> Vec<String> {
    let mut samples = Vec::new();
    for line in header_text.lines().filter(|l| l.starts_with("@RG")) {
        let mut sm = None;
        let mut id = None;
        for field in line.split('\t').skip(1) {
            if let Some(value) = field.strip_prefix("SM:") {
                sm = Some(value);
            } else if let Some(value) = field.strip_prefix("ID:") {
                id = Some(value);
            }
        }
        if let Some(name) = sm.or(id) {
            samples.push(name.to_string());
        }
    }
    samples
}
