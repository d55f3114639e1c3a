use log::{debug, info};
use rayon::prelude::*;
use serde::Serialize;
use serde::de::DeserializeOwned;
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::error::{CustomError, Result};
use crate::model::{PairKey, SampleStats, SimilarityPair};

const STATS_SUFFIX: &str = "-stats.json";
const SIM_SUFFIX: &str = "-sim.json";

/// Hex SHA-256 of the sample name.
pub fn sample_hash(sample_name: &str) -> String {
    format!("{:x}", Sha256::digest(sample_name.as_bytes()))
}

fn shard_path(storage_root: &Path, sample_name: &str, suffix: &str) -> PathBuf {
    let hash = sample_hash(sample_name);
    storage_root
        .join(&hash[..2])
        .join(&hash[..4])
        .join(format!("{hash}{suffix}"))
}

/// `<root>/<hash[0:2]>/<hash[0:4]>/<hash>-stats.json`
pub fn stats_path(storage_root: &Path, sample_name: &str) -> PathBuf {
    shard_path(storage_root, sample_name, STATS_SUFFIX)
}

/// `<root>/<hash[0:2]>/<hash[0:4]>/<hash>-sim.json`
pub fn sim_path(storage_root: &Path, sample_name: &str) -> PathBuf {
    shard_path(storage_root, sample_name, SIM_SUFFIX)
}

fn write_json<T: Serialize + ?Sized>(value: &T, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| CustomError::CreateDir {
            source: e,
            path: parent.to_path_buf(),
        })?;
    }
    let to_err = |e| CustomError::Write {
        source: e,
        path: path.to_path_buf(),
    };
    let mut wtr = BufWriter::new(File::create(path).map_err(to_err)?);
    serde_json::to_writer(&mut wtr, value).map_err(|e| CustomError::Json {
        source: e,
        path: path.to_path_buf(),
    })?;
    wtr.flush().map_err(to_err)?;
    Ok(())
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let f = File::open(path).map_err(|e| CustomError::ReadWithPath {
        source: e,
        path: path.to_path_buf(),
    })?;
    serde_json::from_reader(BufReader::new(f)).map_err(|e| CustomError::Json {
        source: e,
        path: path.to_path_buf(),
    })
}

/// Writes (or replaces) the fingerprint of one sample and returns its path.
pub fn write_sample_stats(storage_root: &Path, stats: &SampleStats) -> Result<PathBuf> {
    let path = stats_path(storage_root, &stats.sample.name);
    write_json(stats, &path)?;
    Ok(path)
}

fn sorted_dir_entries(dir: &Path) -> Result<Vec<PathBuf>> {
    let to_err = |e| CustomError::ReadWithPath {
        source: e,
        path: dir.to_path_buf(),
    };
    let mut paths = Vec::new();
    for entry in fs::read_dir(dir).map_err(to_err)? {
        paths.push(entry.map_err(to_err)?.path());
    }
    paths.sort();
    Ok(paths)
}

/// Files in the two shard levels below `storage_root` whose name ends in `suffix`.
fn scan_shards(storage_root: &Path, suffix: &str) -> Result<Vec<PathBuf>> {
    let mut found = Vec::new();
    for outer in sorted_dir_entries(storage_root)? {
        if !outer.is_dir() || outer.file_name().is_none_or(|n| n.len() != 2) {
            continue;
        }
        for inner in sorted_dir_entries(&outer)? {
            if !inner.is_dir() || inner.file_name().is_none_or(|n| n.len() != 4) {
                continue;
            }
            found.extend(sorted_dir_entries(&inner)?.into_iter().filter(|path| {
                path.is_file()
                    && path
                        .file_name()
                        .and_then(|n| n.to_str())
                        .is_some_and(|n| n.ends_with(suffix))
            }));
        }
    }
    Ok(found)
}

/// Loads every stored fingerprint, keyed by sample name.
pub fn load_sample_stats(storage_root: &Path) -> Result<BTreeMap<String, SampleStats>> {
    info!("Loading sample stats...");
    let paths = scan_shards(storage_root, STATS_SUFFIX)?;
    let loaded: Vec<SampleStats> = paths
        .par_iter()
        .map(|path| read_json::<SampleStats>(path))
        .collect::<Result<_>>()?;
    info!("Loaded {} fingerprints", loaded.len());
    Ok(loaded
        .into_iter()
        .map(|stats| (stats.sample.name.clone(), stats))
        .collect())
}

/// Loads every stored similarity pair, keyed by `(sample_i, sample_j)`.
pub fn load_similarity_pairs(storage_root: &Path) -> Result<BTreeMap<PairKey, SimilarityPair>> {
    info!("Loading similarities...");
    let paths = scan_shards(storage_root, SIM_SUFFIX)?;
    let loaded: Vec<Vec<SimilarityPair>> = paths
        .par_iter()
        .map(|path| read_json::<Vec<SimilarityPair>>(path))
        .collect::<Result<_>>()?;
    let mut pairs: BTreeMap<PairKey, SimilarityPair> = BTreeMap::new();
    for pair in loaded.into_iter().flatten() {
        if pair.sample_i >= pair.sample_j {
            return Err(CustomError::PairOrder {
                sample_i: pair.sample_i,
                sample_j: pair.sample_j,
            });
        }
        pairs.insert(pair.key(), pair);
    }
    info!("Loaded {} known pairs", pairs.len());
    Ok(pairs)
}

/// Replaces the similarity file of every sample taking part in `pairs` with its full,
/// key-sorted neighbourhood. Returns the number of files written.
pub fn write_similarity_pairs(
    storage_root: &Path,
    pairs: &BTreeMap<PairKey, SimilarityPair>,
) -> Result<usize> {
    let mut by_sample: BTreeMap<&str, Vec<&SimilarityPair>> = BTreeMap::new();
    // BTreeMap iteration keeps each list sorted by key
    for pair in pairs.values() {
        by_sample.entry(pair.sample_i.as_str()).or_default().push(pair);
        by_sample.entry(pair.sample_j.as_str()).or_default().push(pair);
    }

    info!("Writing similarities for {} samples...", by_sample.len());
    by_sample
        .par_iter()
        .try_for_each(|(&sample, neighbourhood)| -> Result<()> {
            let path = sim_path(storage_root, sample);
            debug!("Writing {} pairs to {}", neighbourhood.len(), path.display());
            write_json(neighbourhood, &path)
        })?;
    Ok(by_sample.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Genotype, Sample, Site, SiteStats, VariantStats};

    fn pair(i: &str, j: &str, n_ibs2: u64) -> SimilarityPair {
        SimilarityPair {
            sample_i: i.to_string(),
            sample_j: j.to_string(),
            n_ibs0: 0,
            n_ibs1: 1,
            n_ibs2,
            het_i: 1,
            het_j: 1,
            het_i_j: 0,
        }
    }

    #[test]
    fn shard_layout_is_a_pure_function() {
        let root = Path::new("/store");
        let hash = sample_hash("NA12878");
        assert_eq!(hash.len(), 64);
        assert_eq!(
            stats_path(root, "NA12878"),
            root.join(&hash[..2])
                .join(&hash[..4])
                .join(format!("{hash}-stats.json"))
        );
        assert_eq!(
            sim_path(root, "NA12878").file_name().unwrap().to_str().unwrap(),
            format!("{hash}-sim.json")
        );
        assert_eq!(
            sample_hash("abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn stats_round_trip_through_shards() {
        let dir = tempfile::tempdir().unwrap();
        let stats = SampleStats {
            sample: Sample {
                name: "S1".to_string(),
            },
            site_stats: vec![SiteStats {
                site: Site {
                    genome_release: "GRCh37".to_string(),
                    chromosome: "1".to_string(),
                    position: 5,
                    reference: "A".to_string(),
                    alternative: "C".to_string(),
                },
                stats: VariantStats {
                    genotype: Some(Genotype::Het),
                    total_cov: Some(10),
                    alt_cov: Some(5),
                },
            }],
        };
        let path = write_sample_stats(dir.path(), &stats).unwrap();
        assert_eq!(path, stats_path(dir.path(), "S1"));
        let loaded = load_sample_stats(dir.path()).unwrap();
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded["S1"], stats);
    }

    #[test]
    fn every_side_gets_the_pair_and_rewrites_are_identical() {
        let dir = tempfile::tempdir().unwrap();
        let pairs: BTreeMap<PairKey, SimilarityPair> = [pair("a", "b", 3), pair("a", "c", 4)]
            .into_iter()
            .map(|p| (p.key(), p))
            .collect();
        assert_eq!(write_similarity_pairs(dir.path(), &pairs).unwrap(), 3);

        let a: Vec<SimilarityPair> = read_json(&sim_path(dir.path(), "a")).unwrap();
        let c: Vec<SimilarityPair> = read_json(&sim_path(dir.path(), "c")).unwrap();
        assert_eq!(a, vec![pair("a", "b", 3), pair("a", "c", 4)]);
        assert_eq!(c, vec![pair("a", "c", 4)]);

        let first = fs::read(sim_path(dir.path(), "a")).unwrap();
        let reloaded = load_similarity_pairs(dir.path()).unwrap();
        assert_eq!(reloaded, pairs);
        write_similarity_pairs(dir.path(), &reloaded).unwrap();
        assert_eq!(fs::read(sim_path(dir.path(), "a")).unwrap(), first);
        assert!(reloaded.values().all(|p| p.sample_i < p.sample_j));
    }

    #[test]
    fn malformed_files_abort_loading() {
        let dir = tempfile::tempdir().unwrap();
        let path = stats_path(dir.path(), "broken");
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, "[{\"not\": \"stats\"}]").unwrap();
        match load_sample_stats(dir.path()).unwrap_err() {
            CustomError::Json { path: bad, .. } => assert_eq!(bad, path),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn mirrored_pairs_on_disk_abort_loading() {
        let dir = tempfile::tempdir().unwrap();
        let path = sim_path(dir.path(), "a");
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        write_json(&vec![pair("b", "a", 3)], &path).unwrap();
        match load_similarity_pairs(dir.path()).unwrap_err() {
            CustomError::PairOrder { sample_i, sample_j } => {
                assert_eq!((sample_i.as_str(), sample_j.as_str()), ("b", "a"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
