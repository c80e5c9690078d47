//! The merged acceptor/donor interval for a single variant.

use std::collections::BTreeSet;

use super::aligned_read::{AlignedRead, PairNumber};
use super::overlap::OverlapInterval;

/// Whether a variant's longest allele makes it a SNP or an indel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VariantKind {
    Snp,
    Indel,
}

/// One donor variant's merged read context.
///
/// Contexts loaded back from a serialized registry (see
/// [`crate::registry::VariantContextRegistry::load`]) carry only the id
/// fields (`acceptor_read_ids`/`donor_read_ids`); `acceptor_reads` and
/// `donor_reads` stay empty until a mode that needs payloads (`FC`) re-fetches
/// them from the original alignments.
#[derive(Debug, Clone)]
pub struct VariantContext {
    pub context_id: String,
    pub sample_id: String,
    pub chrom: String,
    pub origin: i64,
    pub start: i64,
    pub end: i64,

    pub acceptor_reads: Vec<AlignedRead>,
    pub donor_reads: Vec<AlignedRead>,

    /// Read counts as of build time, round-tripped through `varcon.txt`
    /// (the `AcceptorReads`/`DonorReads` columns) independently of
    /// `acceptor_reads`/`donor_reads` themselves, so a payload-less reload
    /// (and a later re-serialization of it, e.g. in `FC`) still reports the
    /// original counts and `ad_ratio` rather than zero.
    pub acceptor_read_count: usize,
    pub donor_read_count: usize,

    /// Always populated, even after a payload-less reload.
    pub acceptor_read_ids: BTreeSet<String>,
    pub donor_read_ids: BTreeSet<String>,

    pub unmapped_acceptor_mate_ids: BTreeSet<String>,
    pub unmapped_donor_mate_ids: BTreeSet<String>,

    /// Each side's own interval width (`AcceptorContextLength`/
    /// `DonorContextLength`), computed once at build time and round-tripped
    /// through `varcon.txt` so it survives a payload-less reload, unlike
    /// `acceptor_overlap`/`donor_overlap` below.
    pub acceptor_context_length: i64,
    pub donor_context_length: i64,

    /// The narrow, single-side intervals this context was merged from.
    /// `None` after a payload-less reload, same as the read vectors above;
    /// only present for debug-level dumps of a freshly built registry.
    pub acceptor_overlap: Option<OverlapInterval>,
    pub donor_overlap: Option<OverlapInterval>,
}

impl VariantContext {
    /// Merges an acceptor-side and a donor-side overlap into one context.
    ///
    /// Returns `None` if either side has no reads — an invalid context is
    /// never constructed, per the "both sides non-empty" invariant.
    pub fn from_overlaps(
        context_id: impl Into<String>,
        sample_id: impl Into<String>,
        origin: i64,
        acceptor: OverlapInterval,
        donor: OverlapInterval,
    ) -> Option<Self> {
        if acceptor.reads.is_empty() || donor.reads.is_empty() {
            return None;
        }
        let chrom = acceptor.chrom.clone();
        let start = acceptor.start.min(donor.start);
        let end = acceptor.end.max(donor.end);
        let acceptor_context_length = acceptor.end - acceptor.start;
        let donor_context_length = donor.end - donor.start;
        let acceptor_read_ids = acceptor.reads.iter().map(|r| r.read_id.clone()).collect();
        let donor_read_ids = donor.reads.iter().map(|r| r.read_id.clone()).collect();
        let acceptor_read_count = acceptor.reads.len();
        let donor_read_count = donor.reads.len();
        Some(Self {
            context_id: context_id.into(),
            sample_id: sample_id.into(),
            chrom,
            origin,
            start,
            end,
            acceptor_reads: acceptor.reads.clone(),
            donor_reads: donor.reads.clone(),
            acceptor_read_count,
            donor_read_count,
            acceptor_read_ids,
            donor_read_ids,
            unmapped_acceptor_mate_ids: acceptor.unmapped_mate_ids.clone(),
            unmapped_donor_mate_ids: donor.unmapped_mate_ids.clone(),
            acceptor_context_length,
            donor_context_length,
            acceptor_overlap: Some(acceptor),
            donor_overlap: Some(donor),
        })
    }

    /// True iff `query` (a point, for SNPs) falls inside `[start, end]`.
    pub fn contains_point(&self, chrom: &str, pos: i64) -> bool {
        self.chrom == chrom && self.start <= pos && pos <= self.end
    }

    /// True iff `[qs, qe]` intersects `[start, end]` (closed intervals).
    pub fn overlaps_range(&self, chrom: &str, qs: i64, qe: i64) -> bool {
        self.chrom == chrom
            && ((self.start <= qs && qs <= self.end)
                || (self.start <= qe && qe <= self.end)
                || (qs >= self.start && qe <= self.end))
    }

    pub fn ad_ratio(&self) -> f64 {
        if self.donor_read_count == 0 {
            0.0
        } else {
            self.acceptor_read_count as f64 / self.donor_read_count as f64
        }
    }

    pub fn donor_reads_for_lane(&self, pair_number: PairNumber) -> Vec<&AlignedRead> {
        let mut reads: Vec<&AlignedRead> =
            self.donor_reads.iter().filter(|r| r.pair_number == pair_number).collect();
        reads.sort_by(|a, b| a.read_id.cmp(&b.read_id));
        reads
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::model::aligned_read::PairNumber;

    fn read(id: &str, pair: PairNumber, start: i64, end: i64) -> AlignedRead {
        AlignedRead {
            read_id: id.into(),
            pair_number: pair,
            chrom: "1".into(),
            ref_start: start,
            ref_end: end,
            sequence: vec![b'A'; (end - start) as usize],
            quality: vec![60; (end - start) as usize],
            mapping_quality: 60,
        }
    }

    fn overlap(reads: Vec<AlignedRead>) -> OverlapInterval {
        OverlapInterval::from_reads("1_1000", "s1", "1", 1000, reads, Default::default()).unwrap()
    }

    #[test]
    fn merges_start_end_from_both_sides() {
        let acc = overlap(vec![read("a1", PairNumber::First, 990, 1040)]);
        let don = overlap(vec![read("d1", PairNumber::First, 1010, 1080)]);
        let ctx = VariantContext::from_overlaps("1_1000", "s1", 1000, acc, don).unwrap();
        assert_eq!(ctx.start, 990);
        assert_eq!(ctx.end, 1080);
    }

    #[test]
    fn empty_side_yields_none() {
        let acc = OverlapInterval {
            context_id: "1_1000".into(),
            sample_id: "s1".into(),
            chrom: "1".into(),
            origin: 1000,
            start: 1000,
            end: 1000,
            reads: vec![],
            unmapped_mate_ids: Default::default(),
        };
        let don = overlap(vec![read("d1", PairNumber::First, 1010, 1080)]);
        assert!(VariantContext::from_overlaps("1_1000", "s1", 1000, acc, don).is_none());
    }

    #[test]
    fn ad_ratio_survives_clearing_the_read_vectors() {
        let acc = overlap(vec![
            read("a1", PairNumber::First, 990, 1040),
            read("a2", PairNumber::Second, 990, 1040),
        ]);
        let don = overlap(vec![read("d1", PairNumber::First, 1010, 1080)]);
        let mut ctx = VariantContext::from_overlaps("1_1000", "s1", 1000, acc, don).unwrap();
        assert_eq!(ctx.ad_ratio(), 2.0);

        ctx.acceptor_reads.clear();
        ctx.donor_reads.clear();
        assert_eq!(ctx.ad_ratio(), 2.0, "ad_ratio must not depend on the read vectors themselves");
    }

    #[test]
    fn indel_range_closed_interval_subcases() {
        let acc = overlap(vec![read("a1", PairNumber::First, 100, 200)]);
        let don = overlap(vec![read("d1", PairNumber::First, 100, 200)]);
        let ctx = VariantContext::from_overlaps("1_150", "s1", 150, acc, don).unwrap();
        assert!(ctx.overlaps_range("1", 90, 110));
        assert!(ctx.overlaps_range("1", 190, 250));
        assert!(ctx.overlaps_range("1", 120, 180));
        assert!(!ctx.overlaps_range("1", 300, 400));
    }
}
