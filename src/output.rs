use std::collections::BTreeMap;
use std::path::Path;

use crate::error::{CustomError, Result};
use crate::model::{PairKey, SimilarityPair};

pub const REPORT_HEADERS: [&str; 9] = [
    "sample_i",
    "sample_j",
    "n_ibs0",
    "n_ibs1",
    "n_ibs2",
    "het_i",
    "het_j",
    "het_i_j",
    "relatedness",
];

/// One row per pair, relatedness computed here and left empty when not estimable.
pub fn write_relatedness_csv(
    pairs: &BTreeMap<PairKey, SimilarityPair>,
    path: &Path,
) -> Result<()> {
    let mut wtr = csv::Writer::from_path(path)?;
    wtr.write_record(REPORT_HEADERS)?;

    for pair in pairs.values() {
        wtr.serialize((
            pair.sample_i.as_str(),
            pair.sample_j.as_str(),
            pair.n_ibs0,
            pair.n_ibs1,
            pair.n_ibs2,
            pair.het_i,
            pair.het_j,
            pair.het_i_j,
            pair.relatedness(),
        ))?;
    }
    wtr.flush().map_err(|e| CustomError::Write {
        source: e,
        path: path.into(),
    })?;
    Ok(())
}
