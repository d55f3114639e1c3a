use rust_htslib::bcf::{self, Read};
use std::path::Path;

use crate::error::{CustomError, Result};
use crate::model::{Genotype, Site};
use crate::reader::CallRecord;

fn htslib_err(path: &Path) -> impl Fn(rust_htslib::errors::Error) -> CustomError + '_ {
    move |e| CustomError::Htslib {
        source: e,
        path: path.to_path_buf(),
    }
}

fn chromosome_of(record: &bcf::Record, path: &Path) -> Result<String> {
    let rid = record.rid().ok_or_else(|| CustomError::RecordWithoutContig {
        path: path.to_path_buf(),
        position: (record.pos() + 1) as u64,
    })?;
    let name = record.header().rid2name(rid).map_err(htslib_err(path))?;
    Ok(String::from_utf8_lossy(name).into_owned())
}

/// Loads marker sites (CHROM, POS, REF and first ALT) labelled with `genome_release`.
pub fn read_sites(
    path: &impl AsRef<Path>,
    genome_release: &str,
    max_sites: Option<usize>,
) -> Result<Vec<Site>> {
    let path = path.as_ref();
    let mut reader = bcf::Reader::from_path(path).map_err(htslib_err(path))?;
    let limit = max_sites.filter(|&n| n > 0).unwrap_or(usize::MAX);

    let mut sites = Vec::new();
    for record in reader.records() {
        if sites.len() >= limit {
            break;
        }
        let record = record.map_err(htslib_err(path))?;
        let chromosome = chromosome_of(&record, path)?;
        let position = (record.pos() + 1) as u64;
        let alleles = record.alleles();
        let alternative = match alleles.get(1) {
            Some(alt) if *alt != b"." => String::from_utf8_lossy(alt).into_owned(),
            _ => {
                return Err(CustomError::SiteWithoutAlt {
                    path: path.to_path_buf(),
                    chromosome,
                    position,
                });
            }
        };
        sites.push(Site {
            genome_release: genome_release.to_string(),
            chromosome,
            position,
            reference: String::from_utf8_lossy(alleles[0]).into_owned(),
            alternative,
        });
    }

    if sites.is_empty() {
        return Err(CustomError::EmptySites {
            path: path.to_path_buf(),
        });
    }
    Ok(sites)
}

/// Reads back the first sample's genotype, INFO/DP and the alternative FORMAT/AD entry.
pub fn read_calls(path: &impl AsRef<Path>) -> Result<Vec<CallRecord>> {
    let path = path.as_ref();
    let mut reader = bcf::Reader::from_path(path).map_err(htslib_err(path))?;

    let mut calls = Vec::new();
    for record in reader.records() {
        let record = record.map_err(htslib_err(path))?;
        let chromosome = chromosome_of(&record, path)?;
        let position = (record.pos() + 1) as u64;
        let has_alt = record
            .alleles()
            .get(1)
            .is_some_and(|alt| *alt != b"." && *alt != b"<*>");

        let total_cov = record
            .info(b"DP")
            .integer()
            .ok()
            .flatten()
            .and_then(|dp| dp.first().and_then(|&v| u64::try_from(v).ok()));
        let alt_cov = match record.format(b"AD").integer() {
            Ok(ad) => ad.first().and_then(|depths| {
                if has_alt {
                    depths.get(1).and_then(|&v| u64::try_from(v).ok())
                } else {
                    Some(0)
                }
            }),
            Err(_) => None,
        };
        let genotype = match record.genotypes() {
            Ok(genotypes) => Genotype::from_vcf(&genotypes.get(0).to_string())?,
            Err(_) => None,
        };

        calls.push(CallRecord {
            chromosome,
            position,
            genotype,
            total_cov,
            alt_cov,
        });
    }
    Ok(calls)
}
