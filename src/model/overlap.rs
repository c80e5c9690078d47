//! The interval induced by the reads overlapping a single query locus.

use std::collections::BTreeSet;

use super::aligned_read::AlignedRead;

/// Reads overlapping a query position on one side (acceptor or donor).
#[derive(Debug, Clone)]
pub struct OverlapInterval {
    pub context_id: String,
    pub sample_id: String,
    pub chrom: String,
    pub origin: i64,
    pub start: i64,
    pub end: i64,
    pub reads: Vec<AlignedRead>,
    pub unmapped_mate_ids: BTreeSet<String>,
}

impl OverlapInterval {
    /// Builds an interval from a non-empty read set and its origin position.
    ///
    /// Returns `None` when `reads` is empty; the caller is expected to treat
    /// that as "no coverage" rather than construct a degenerate interval.
    pub fn from_reads(
        context_id: impl Into<String>,
        sample_id: impl Into<String>,
        chrom: impl Into<String>,
        origin: i64,
        reads: Vec<AlignedRead>,
        unmapped_mate_ids: BTreeSet<String>,
    ) -> Option<Self> {
        if reads.is_empty() {
            return None;
        }
        let start = reads.iter().map(|r| r.ref_start).min().unwrap();
        let end = reads.iter().map(|r| r.ref_end).max().unwrap();
        Some(Self {
            context_id: context_id.into(),
            sample_id: sample_id.into(),
            chrom: chrom.into(),
            origin,
            start,
            end,
            reads,
            unmapped_mate_ids,
        })
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::model::aligned_read::PairNumber;

    fn read(id: &str, start: i64, end: i64) -> AlignedRead {
        AlignedRead {
            read_id: id.into(),
            pair_number: PairNumber::First,
            chrom: "1".into(),
            ref_start: start,
            ref_end: end,
            sequence: vec![b'A'; (end - start) as usize],
            quality: vec![60; (end - start) as usize],
            mapping_quality: 60,
        }
    }

    #[test]
    fn start_end_span_reads() {
        let reads = vec![read("a", 100, 150), read("b", 120, 200)];
        let ovl =
            OverlapInterval::from_reads("1_100", "s1", "1", 100, reads, BTreeSet::new()).unwrap();
        assert_eq!(ovl.start, 100);
        assert_eq!(ovl.end, 200);
    }

    #[test]
    fn empty_reads_yields_none() {
        assert!(OverlapInterval::from_reads("1_100", "s1", "1", 100, vec![], BTreeSet::new())
            .is_none());
    }
}
