use crate::model::Genotype;

/// Calls a genotype from strand-summed allele depths.
///
/// Returns `None` (no-call) when there is no coverage at all. Otherwise the
/// alternative allele fraction decides: up to and including `threshold` is
/// REF, from `1 - threshold` upwards is HOM, and everything strictly in
/// between is HET.
///
/// `threshold` is meant to lie in `(0, 0.5)`. Larger values are accepted but
/// leave no room for HET: every call becomes REF or HOM.
pub fn call_genotype(threshold: f64, ref_depth: u64, alt_depth: u64) -> Option<Genotype> {
    let total_depth = ref_depth + alt_depth;
    if total_depth == 0 {
        return None;
    }
    let frac = alt_depth as f64 / total_depth as f64;
    if frac <= threshold {
        Some(Genotype::Ref)
    } else if frac >= 1.0 - threshold {
        Some(Genotype::Hom)
    } else {
        Some(Genotype::Het)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_coverage_is_a_no_call() {
        assert_eq!(call_genotype(0.1, 0, 0), None);
        assert_ne!(call_genotype(0.1, 1, 0), None);
    }

    #[test]
    fn calls_by_alt_fraction() {
        assert_eq!(call_genotype(0.1, 30, 0), Some(Genotype::Ref));
        assert_eq!(call_genotype(0.1, 15, 15), Some(Genotype::Het));
        assert_eq!(call_genotype(0.1, 0, 29), Some(Genotype::Hom));
        assert_eq!(call_genotype(0.1, 3, 73), Some(Genotype::Hom));
    }

    #[test]
    fn boundaries() {
        // frac == threshold
        assert_eq!(call_genotype(0.25, 3, 1), Some(Genotype::Ref));
        // frac == 1 - threshold
        assert_eq!(call_genotype(0.25, 1, 3), Some(Genotype::Hom));
        // just inside
        assert_eq!(call_genotype(0.25, 2, 1), Some(Genotype::Het));
        assert_eq!(call_genotype(0.25, 1, 2), Some(Genotype::Het));
    }

    #[test]
    fn large_threshold_never_calls_het() {
        for alt in 0..=10 {
            let call = call_genotype(0.5, 10 - alt, alt);
            assert_ne!(call, Some(Genotype::Het), "alt = {alt}");
        }
    }
}
