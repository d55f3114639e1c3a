use serde_json::{Value, json};
use sha2::{Digest, Sha256};
use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};

static NEXT_ID: AtomicUsize = AtomicUsize::new(0);

pub const KMER_LENGTH: usize = 5;

pub struct Workspace {
    pub base_dir: PathBuf,
    pub storage: PathBuf,
}

pub fn create_workspace(label: &str) -> io::Result<Workspace> {
    let id = NEXT_ID.fetch_add(1, Ordering::Relaxed);
    let base_dir = std::env::temp_dir().join("fingerqc-tests").join(format!(
        "{}-{}-{}",
        std::process::id(),
        id,
        label
    ));
    if base_dir.exists() {
        fs::remove_dir_all(&base_dir)?;
    }
    let storage = base_dir.join("storage");
    fs::create_dir_all(&storage)?;
    Ok(Workspace { base_dir, storage })
}

fn shard_path(storage: &Path, sample: &str, suffix: &str) -> PathBuf {
    let hash = format!("{:x}", Sha256::digest(sample.as_bytes()));
    storage
        .join(&hash[..2])
        .join(&hash[..4])
        .join(format!("{hash}{suffix}"))
}

pub fn stats_path(storage: &Path, sample: &str) -> PathBuf {
    shard_path(storage, sample, "-stats.json")
}

pub fn sim_path(storage: &Path, sample: &str) -> PathBuf {
    shard_path(storage, sample, "-sim.json")
}

/// Stores a fingerprint over sites `1:100`, `1:200`, ... with one `(genotype, total_cov)`
/// per site.
pub fn write_stats(storage: &Path, sample: &str, calls: &[(Option<&str>, u64)]) -> io::Result<()> {
    let site_stats: Vec<Value> = calls
        .iter()
        .enumerate()
        .map(|(idx, &(genotype, total_cov))| {
            json!({
                "site": {
                    "genome_release": "GRCh37",
                    "chromosome": "1",
                    "position": 100 * (idx + 1),
                    "reference": "A",
                    "alternative": "G",
                },
                "stats": {
                    "genotype": genotype,
                    "total_cov": total_cov,
                    "alt_cov": null,
                },
            })
        })
        .collect();
    let stats = json!({"sample": {"name": sample}, "site_stats": site_stats});

    let path = stats_path(storage, sample);
    fs::create_dir_all(path.parent().unwrap())?;
    fs::write(path, serde_json::to_vec(&stats)?)
}

pub fn read_json(path: &Path) -> Value {
    let text = fs::read_to_string(path)
        .unwrap_or_else(|e| panic!("could not read {}: {e}", path.display()));
    serde_json::from_str(&text).unwrap()
}

/// Two markers of length 5: `1:100 C>T` and `1:200 G>A`.
pub fn write_kmer_table(path: &Path) -> io::Result<()> {
    let mut file = File::create(path)?;
    writeln!(
        file,
        "#genome_release\tchromosome\tposition\treference\talternative\tref_kmer"
    )?;
    writeln!(file, "GRCh37\t1\t100\tC\tT\tAACAA")?;
    writeln!(file, "GRCh37\t1\t200\tG\tA\tCCGCC")?;
    Ok(())
}

/// Three alt reads at the first marker; one ref read and one reverse-strand alt read at
/// the second.
pub fn write_fastq(path: &Path) -> io::Result<()> {
    let mut file = File::create(path)?;
    let reads = ["AATAA", "AATAA", "TTATT", "CCGCC", "GGTGG", "ACGTACGT"];
    for (idx, seq) in reads.iter().enumerate() {
        writeln!(file, "@read{idx}\n{seq}\n+\n{}", "I".repeat(seq.len()))?;
    }
    Ok(())
}
