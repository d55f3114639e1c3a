use indicatif::{ProgressBar, ProgressStyle};
use log::{debug, info};

use crate::error::Result;
use crate::genotype::call_genotype;
use crate::kmers::KmerCounter;
use crate::model::{KmerInfo, Sample, SampleStats, SiteStats, VariantStats};
use crate::reader::SequenceSource;

/// Counts marker k-mers across all `sources` of one sample and calls every site.
///
/// Coverage accumulates over the sources. The output keeps the order of `kmer_infos`.
pub fn extract_sample_stats(
    sample_id: &str,
    kmer_infos: &[KmerInfo],
    threshold: f64,
    sources: &mut [Box<dyn SequenceSource>],
    show_progress: bool,
) -> Result<SampleStats> {
    let alt_kmers: Vec<String> = kmer_infos.iter().map(KmerInfo::alt_kmer).collect();
    let mut counter = KmerCounter::new(
        kmer_infos
            .iter()
            .zip(&alt_kmers)
            .flat_map(|(info, alt)| [info.ref_kmer.as_bytes(), alt.as_bytes()]),
    )?;
    debug!(
        "Counting {} marker k-mers of length {}",
        2 * kmer_infos.len(),
        counter.kmer_length()
    );

    let pb = if show_progress {
        ProgressBar::new_spinner()
    } else {
        ProgressBar::hidden()
    };
    pb.set_style(ProgressStyle::with_template(
        "[{elapsed_precise}] {spinner} {human_pos} reads {msg}",
    )?);

    for source in sources.iter_mut() {
        info!("Processing reads from {}", source.label());
        pb.set_message(source.label());
        let n_reads = source.for_each_sequence(&mut |seq| {
            pb.inc(1);
            counter.tally_sequence(seq)
        })?;
        debug!("Tallied {n_reads} reads from {}", source.label());
    }
    pb.finish_and_clear();

    let site_stats = kmer_infos
        .iter()
        .zip(&alt_kmers)
        .map(|(info, alt_kmer)| {
            let ref_depth = counter.depth(info.ref_kmer.as_bytes());
            let alt_depth = counter.depth(alt_kmer.as_bytes());
            SiteStats {
                site: info.site.clone(),
                stats: VariantStats {
                    genotype: call_genotype(threshold, ref_depth, alt_depth),
                    total_cov: Some(ref_depth + alt_depth),
                    alt_cov: Some(alt_depth),
                },
            }
        })
        .collect();

    Ok(SampleStats {
        sample: Sample {
            name: sample_id.to_string(),
        },
        site_stats,
    })
}
