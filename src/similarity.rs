use indicatif::{ProgressBar, ProgressStyle};
use itertools::Itertools;
use log::{debug, info};
use ndarray::{Array2, ArrayView1, Axis};
use rayon::prelude::*;
use std::collections::BTreeMap;

use crate::error::{CustomError, Result};
use crate::model::{Genotype, PairKey, SampleStats, SimilarityPair};

const COVERED: usize = 0;
const IS_ALT: usize = 1;
const HOM_ALT: usize = 2;

/// Boolean features of one fingerprint: three rows, one column per site.
#[derive(Debug, Clone)]
pub struct FeatureMatrix {
    pub name: String,
    features: Array2<bool>,
}

impl FeatureMatrix {
    /// A site counts as covered when `total_cov > min_coverage`. A missing genotype is
    /// neither alt nor hom-alt, so a covered no-call looks like a reference call.
    pub fn from_sample_stats(stats: &SampleStats, min_coverage: u64) -> Self {
        let n_sites = stats.site_stats.len();
        let mut features = Array2::from_elem((3, n_sites), false);
        for (idx, site_stats) in stats.site_stats.iter().enumerate() {
            let v = &site_stats.stats;
            features[[COVERED, idx]] = v.total_cov.unwrap_or(0) > min_coverage;
            features[[IS_ALT, idx]] = matches!(v.genotype, Some(Genotype::Het | Genotype::Hom));
            features[[HOM_ALT, idx]] = v.genotype == Some(Genotype::Hom);
        }
        Self {
            name: stats.sample.name.clone(),
            features,
        }
    }

    pub fn n_sites(&self) -> usize {
        self.features.len_of(Axis(1))
    }

    pub fn n_covered(&self) -> u64 {
        self.features.row(COVERED).iter().filter(|&&c| c).count() as u64
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
struct SharingCounts {
    n_ibs0: u64,
    n_ibs1: u64,
    n_ibs2: u64,
    het_i: u64,
    het_j: u64,
    het_i_j: u64,
}

fn count_sharing(lhs: &FeatureMatrix, rhs: &FeatureMatrix) -> SharingCounts {
    let mut counts = SharingCounts::default();
    let mut n_masked = 0u64;
    for (col_i, col_j) in lhs
        .features
        .axis_iter(Axis(1))
        .zip(rhs.features.axis_iter(Axis(1)))
    {
        if !(col_i[COVERED] && col_j[COVERED]) {
            continue;
        }
        n_masked += 1;
        let (ref_i, het_i, hom_i) = classify(col_i);
        let (ref_j, het_j, hom_j) = classify(col_j);

        counts.n_ibs0 += ((ref_i && hom_j) || (ref_j && hom_i)) as u64;
        counts.n_ibs2 += ((hom_i && hom_j) || (ref_i && ref_j)) as u64;
        counts.het_i += het_i as u64;
        counts.het_j += het_j as u64;
        counts.het_i_j += (het_i && het_j) as u64;
    }
    counts.n_ibs1 = n_masked - counts.n_ibs0 - counts.n_ibs2;
    counts
}

// (ref, het, hom) of one masked column
fn classify(column: ArrayView1<bool>) -> (bool, bool, bool) {
    let is_alt = column[IS_ALT];
    let hom_alt = column[HOM_ALT];
    (!is_alt, is_alt && !hom_alt, hom_alt)
}

/// Allele-sharing statistics of two fingerprints extracted against the same site list.
///
/// Only the canonical order `lhs.name < rhs.name` is accepted.
pub fn compute_similarity(lhs: &FeatureMatrix, rhs: &FeatureMatrix) -> Result<SimilarityPair> {
    if lhs.name >= rhs.name {
        return Err(CustomError::PairOrder {
            sample_i: lhs.name.clone(),
            sample_j: rhs.name.clone(),
        });
    }
    if lhs.n_sites() != rhs.n_sites() {
        return Err(CustomError::SiteCountMismatch {
            sample_i: lhs.name.clone(),
            sample_j: rhs.name.clone(),
            n_i: lhs.n_sites(),
            n_j: rhs.n_sites(),
        });
    }
    let counts = count_sharing(lhs, rhs);
    Ok(SimilarityPair {
        sample_i: lhs.name.clone(),
        sample_j: rhs.name.clone(),
        n_ibs0: counts.n_ibs0,
        n_ibs1: counts.n_ibs1,
        n_ibs2: counts.n_ibs2,
        het_i: counts.het_i,
        het_j: counts.het_j,
        het_i_j: counts.het_i_j,
    })
}

/// Computes every pair of `matrices` missing from `known` and adds it there.
///
/// Pairs already in `known` are never recomputed. Returns the number of new pairs.
pub fn compute_missing(
    matrices: &[FeatureMatrix],
    known: &mut BTreeMap<PairKey, SimilarityPair>,
    show_progress: bool,
) -> Result<usize> {
    let mut sorted: Vec<&FeatureMatrix> = matrices.iter().collect();
    sorted.sort_by(|a, b| a.name.cmp(&b.name));

    let todo: Vec<(&FeatureMatrix, &FeatureMatrix)> = sorted
        .into_iter()
        .tuple_combinations()
        .filter(|(lhs, rhs)| lhs.name != rhs.name)
        .filter(|(lhs, rhs)| !known.contains_key(&(lhs.name.clone(), rhs.name.clone())))
        .collect();
    info!("Computing {} missing similarities...", todo.len());

    let pb = if show_progress {
        ProgressBar::new(todo.len() as u64)
    } else {
        ProgressBar::hidden()
    };
    pb.set_style(ProgressStyle::with_template(
        "[{elapsed_precise}] {bar:30} {pos}/{len} pairs",
    )?);

    let computed: Vec<SimilarityPair> = todo
        .par_iter()
        .map(|(lhs, rhs)| {
            let pair = compute_similarity(lhs, rhs);
            pb.inc(1);
            pair
        })
        .collect::<Result<_>>()?;
    pb.finish_and_clear();

    let n_new = computed.len();
    for pair in computed {
        debug!(
            "{} vs {}: ibs0={} ibs1={} ibs2={}",
            pair.sample_i, pair.sample_j, pair.n_ibs0, pair.n_ibs1, pair.n_ibs2
        );
        known.insert(pair.key(), pair);
    }
    Ok(n_new)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Sample, Site, SiteStats, VariantStats};

    fn fingerprint(name: &str, calls: &[(Option<Genotype>, u64)]) -> SampleStats {
        let site_stats = calls
            .iter()
            .enumerate()
            .map(|(idx, &(genotype, total_cov))| SiteStats {
                site: Site {
                    genome_release: "GRCh37".to_string(),
                    chromosome: "1".to_string(),
                    position: 100 * (idx as u64 + 1),
                    reference: "A".to_string(),
                    alternative: "G".to_string(),
                },
                stats: VariantStats {
                    genotype,
                    total_cov: Some(total_cov),
                    alt_cov: None,
                },
            })
            .collect();
        SampleStats {
            sample: Sample {
                name: name.to_string(),
            },
            site_stats,
        }
    }

    fn matrix(name: &str, calls: &[(Option<Genotype>, u64)]) -> FeatureMatrix {
        FeatureMatrix::from_sample_stats(&fingerprint(name, calls), 5)
    }

    const REF: Option<Genotype> = Some(Genotype::Ref);
    const HET: Option<Genotype> = Some(Genotype::Het);
    const HOM: Option<Genotype> = Some(Genotype::Hom);

    #[test]
    fn one_opposite_homozygous_site() {
        let a = matrix("A", &[(REF, 30), (REF, 30)]);
        let b = matrix("B", &[(HOM, 30), (REF, 30)]);
        let pair = compute_similarity(&a, &b).unwrap();
        assert_eq!((pair.n_ibs0, pair.n_ibs1, pair.n_ibs2), (1, 0, 1));
        assert_eq!((pair.het_i, pair.het_j, pair.het_i_j), (0, 0, 0));
        assert_eq!(pair.relatedness(), None);
    }

    #[test]
    fn swapped_heterozygous_sites() {
        let x = matrix("X", &[(HET, 30), (REF, 30)]);
        let y = matrix("Y", &[(REF, 30), (HET, 30)]);
        let pair = compute_similarity(&x, &y).unwrap();
        assert_eq!((pair.n_ibs0, pair.n_ibs1, pair.n_ibs2), (0, 2, 0));
        assert_eq!((pair.het_i, pair.het_j, pair.het_i_j), (1, 1, 0));
    }

    #[test]
    fn self_comparison_shares_everything_covered() {
        let a = matrix("A", &[(REF, 30), (HOM, 30), (REF, 2), (HOM, 6)]);
        let counts = count_sharing(&a, &a);
        assert_eq!(counts.n_ibs0, 0);
        assert_eq!(counts.n_ibs2, a.n_covered());
        assert_eq!(counts.n_ibs2, 3);
    }

    #[test]
    fn uncovered_sites_are_masked() {
        // min coverage is exclusive: 5 reads are not enough
        let a = matrix("A", &[(HOM, 5), (HET, 4)]);
        let b = matrix("B", &[(REF, 40), (HET, 40)]);
        let pair = compute_similarity(&a, &b).unwrap();
        assert_eq!(pair.n_ibs0 + pair.n_ibs1 + pair.n_ibs2, 0);
        assert_eq!((pair.het_i, pair.het_j), (0, 0));
    }

    #[test]
    fn covered_no_call_counts_as_reference() {
        let a = matrix("A", &[(None, 30)]);
        let b = matrix("B", &[(HOM, 30)]);
        let pair = compute_similarity(&a, &b).unwrap();
        assert_eq!(pair.n_ibs0, 1);
    }

    #[test]
    fn refuses_mirrored_and_misaligned_pairs() {
        let a = matrix("A", &[(REF, 30)]);
        let b = matrix("B", &[(REF, 30), (REF, 30)]);
        match compute_similarity(&b, &a).unwrap_err() {
            CustomError::PairOrder { sample_i, sample_j } => {
                assert_eq!((sample_i.as_str(), sample_j.as_str()), ("B", "A"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(compute_similarity(&a, &a).is_err());
        assert!(matches!(
            compute_similarity(&a, &b),
            Err(CustomError::SiteCountMismatch { .. })
        ));
    }

    #[test]
    fn known_pairs_are_kept() {
        let matrices = vec![
            matrix("c", &[(REF, 30)]),
            matrix("a", &[(HOM, 30)]),
            matrix("b", &[(REF, 30)]),
        ];
        let mut known = BTreeMap::new();
        let stale = SimilarityPair {
            sample_i: "a".to_string(),
            sample_j: "b".to_string(),
            n_ibs0: 99,
            n_ibs1: 0,
            n_ibs2: 0,
            het_i: 0,
            het_j: 0,
            het_i_j: 0,
        };
        known.insert(stale.key(), stale.clone());

        let n_new = compute_missing(&matrices, &mut known, false).unwrap();
        assert_eq!(n_new, 2);
        assert_eq!(known[&stale.key()], stale);
        let keys: Vec<PairKey> = known.keys().cloned().collect();
        assert_eq!(
            keys,
            vec![
                ("a".to_string(), "b".to_string()),
                ("a".to_string(), "c".to_string()),
                ("b".to_string(), "c".to_string()),
            ]
        );
        assert_eq!(compute_missing(&matrices, &mut known, false).unwrap(), 0);
    }
}
