use std::collections::HashMap;

use crate::error::{CustomError, Result};

/// Reverse-complements a nucleotide sequence. Bytes outside `ACGTacgt` are kept as-is.
pub fn revcomp(seq: &[u8]) -> Vec<u8> {
    seq.iter()
        .rev()
        .map(|&base| match base {
            b'A' => b'T',
            b'C' => b'G',
            b'G' => b'C',
            b'T' => b'A',
            b'a' => b't',
            b'c' => b'g',
            b'g' => b'c',
            b't' => b'a',
            other => other,
        })
        .collect()
}

/// Exact counter for a fixed set of marker k-mers and their reverse complements.
///
/// Only markers have entries, so memory stays at two entries per marker no
/// matter how many reads are tallied.
pub struct KmerCounter {
    kmer_length: usize,
    counts: HashMap<Vec<u8>, u64>,
}

impl KmerCounter {
    pub fn new<I, K>(kmers: I) -> Result<Self>
    where
        I: IntoIterator<Item = K>,
        K: AsRef<[u8]>,
    {
        let mut kmer_length = None;
        let mut counts = HashMap::new();
        for kmer in kmers {
            let kmer = kmer.as_ref();
            let expected = *kmer_length.get_or_insert(kmer.len());
            if kmer.len() != expected {
                return Err(CustomError::InconsistentKmerLengths {
                    kmer: String::from_utf8_lossy(kmer).into_owned(),
                    len: kmer.len(),
                    expected,
                });
            }
            counts.insert(revcomp(kmer), 0);
            counts.insert(kmer.to_vec(), 0);
        }
        match kmer_length {
            Some(kmer_length) if kmer_length > 0 => Ok(Self {
                kmer_length,
                counts,
            }),
            _ => Err(CustomError::EmptyKmerTable),
        }
    }

    pub fn kmer_length(&self) -> usize {
        self.kmer_length
    }

    pub fn tally(&mut self, kmer: &[u8]) -> Result<()> {
        if kmer.len() != self.kmer_length {
            return Err(CustomError::KmerLength {
                kmer: String::from_utf8_lossy(kmer).into_owned(),
                len: kmer.len(),
                expected: self.kmer_length,
            });
        }
        if let Some(count) = self.counts.get_mut(kmer) {
            *count += 1;
        }
        Ok(())
    }

    /// Tallies every overlapping window of a read. Reads shorter than k add nothing.
    pub fn tally_sequence(&mut self, seq: &[u8]) -> Result<()> {
        for kmer in seq.windows(self.kmer_length) {
            self.tally(kmer)?;
        }
        Ok(())
    }

    pub fn count(&self, kmer: &[u8]) -> u64 {
        self.counts.get(kmer).copied().unwrap_or(0)
    }

    /// Occurrences of `kmer` on both strands.
    pub fn depth(&self, kmer: &[u8]) -> u64 {
        self.count(kmer) + self.count(&revcomp(kmer))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MARKER: &[u8] = b"ACGTTGCAA";

    #[test]
    fn revcomp_reverses_and_complements() {
        assert_eq!(revcomp(b"AACGTN"), b"NACGTT".to_vec());
        assert_eq!(revcomp(b"acgT"), b"Acgt".to_vec());
        assert_eq!(revcomp(&revcomp(MARKER)), MARKER.to_vec());
    }

    #[test]
    fn counts_non_overlapping_occurrences() {
        let mut counter = KmerCounter::new([MARKER]).unwrap();
        let read = [MARKER, b"GGG".as_slice(), MARKER, b"T".as_slice(), MARKER].concat();
        counter.tally_sequence(&read).unwrap();
        assert!(counter.count(MARKER) >= 3);
        assert_eq!(counter.depth(MARKER), 3);
    }

    #[test]
    fn unrelated_reads_leave_counts_at_zero() {
        let mut counter = KmerCounter::new([MARKER, b"CCCCCCCCC".as_slice()]).unwrap();
        counter.tally_sequence(b"TTTTTTTTTTTTTTTTTTTT").unwrap();
        counter.tally_sequence(b"ATATATATATATATATATAT").unwrap();
        assert_eq!(counter.depth(MARKER), 0);
        assert_eq!(counter.depth(b"CCCCCCCCC"), 0);
    }

    #[test]
    fn short_reads_contribute_nothing() {
        let mut counter = KmerCounter::new([MARKER]).unwrap();
        counter.tally_sequence(&MARKER[..MARKER.len() - 1]).unwrap();
        counter.tally_sequence(b"").unwrap();
        assert_eq!(counter.depth(MARKER), 0);
    }

    #[test]
    fn depth_is_invariant_to_read_orientation() {
        let reads: Vec<Vec<u8>> = vec![
            [b"GG".as_slice(), MARKER, b"CATCAT".as_slice()].concat(),
            [MARKER, b"A".as_slice(), revcomp(MARKER).as_slice()].concat(),
            b"TTGCAACGTAAGT".to_vec(),
        ];
        let mut forward = KmerCounter::new([MARKER]).unwrap();
        let mut reverse = KmerCounter::new([MARKER]).unwrap();
        for read in &reads {
            forward.tally_sequence(read).unwrap();
            reverse.tally_sequence(&revcomp(read)).unwrap();
        }
        assert_eq!(forward.depth(MARKER), reverse.depth(MARKER));
        assert_eq!(forward.count(MARKER), reverse.count(&revcomp(MARKER)));
    }

    #[test]
    fn window_of_wrong_length_is_fatal() {
        let mut counter = KmerCounter::new([MARKER]).unwrap();
        let err = counter.tally(b"ACGT").unwrap_err();
        match err {
            CustomError::KmerLength { len, expected, .. } => {
                assert_eq!(len, 4);
                assert_eq!(expected, MARKER.len());
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn markers_must_share_a_length() {
        assert!(matches!(
            KmerCounter::new([MARKER, b"ACG".as_slice()]),
            Err(CustomError::InconsistentKmerLengths { .. })
        ));
        assert!(matches!(
            KmerCounter::new(Vec::<Vec<u8>>::new()),
            Err(CustomError::EmptyKmerTable)
        ));
    }
}
