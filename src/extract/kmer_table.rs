use indicatif::{ProgressBar, ProgressStyle};
use log::debug;

use crate::error::{CustomError, Result};
use crate::model::{KmerInfo, Site};
use crate::reader::ReferenceSource;

/// Cuts the reference k-mer centred on each site, checking the centre base against REF.
pub fn generate_kmer_infos(
    sites: &[Site],
    kmer_length: usize,
    reference: &dyn ReferenceSource,
    show_progress: bool,
) -> Result<Vec<KmerInfo>> {
    let delta = (kmer_length / 2) as u64;
    let pb = if show_progress {
        ProgressBar::new(sites.len() as u64)
    } else {
        ProgressBar::hidden()
    };
    pb.set_style(ProgressStyle::with_template(
        "[{elapsed_precise}] {bar:30} {pos}/{len} sites",
    )?);

    let mut kmer_infos = Vec::with_capacity(sites.len());
    for site in sites {
        let start = site
            .position
            .checked_sub(delta + 1)
            .ok_or_else(|| CustomError::SiteTooCloseToStart {
                chromosome: site.chromosome.clone(),
                position: site.position,
                kmer_length,
            })?;
        let end = site.position + delta;
        let window = reference.fetch(&site.chromosome, start, end)?;
        let ref_kmer = String::from_utf8_lossy(&window).to_ascii_uppercase();
        if ref_kmer.len() != kmer_length {
            return Err(CustomError::KmerLength {
                len: ref_kmer.len(),
                kmer: ref_kmer,
                expected: kmer_length,
            });
        }

        let info = KmerInfo {
            site: site.clone(),
            ref_kmer,
        };
        if !info.reference_base().eq_ignore_ascii_case(&site.reference) {
            return Err(CustomError::ReferenceBaseMismatch {
                chromosome: site.chromosome.clone(),
                position: site.position,
                expected: site.reference.clone(),
                found: info.reference_base().to_string(),
            });
        }
        debug!("{} -> {}", site.short_notation(), info.ref_kmer);
        kmer_infos.push(info);
        pb.inc(1);
    }
    pb.finish_and_clear();
    Ok(kmer_infos)
}
