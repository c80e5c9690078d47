//! The collection of variant contexts produced by a run, plus the set
//! operations and serialized read-back described for `varcon.txt`.

pub mod io;

pub use io::{load, serialize, LoadFilters};

use std::collections::BTreeSet;

use indexmap::IndexMap;

use crate::model::VariantContext;

/// Insertion-ordered registry of variant contexts, keyed by context id.
///
/// `indexmap::IndexMap` is used rather than a plain hash map because
/// serialized output order must match insertion order deterministically;
/// a standard hash map's iteration order is not guaranteed stable.
#[derive(Debug, Default)]
pub struct VariantContextRegistry {
    contexts: IndexMap<String, VariantContext>,
}

impl VariantContextRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, context: VariantContext) {
        self.contexts.insert(context.context_id.clone(), context);
    }

    pub fn get(&self, context_id: &str) -> Option<&VariantContext> {
        self.contexts.get(context_id)
    }

    pub fn len(&self) -> usize {
        self.contexts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.contexts.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &VariantContext> {
        self.contexts.values()
    }

    /// True iff an existing context on `chrom` already covers `pos`
    /// (SNP-style point query, closed interval).
    pub fn contains_point(&self, chrom: &str, pos: i64) -> bool {
        self.contexts.values().any(|c| c.contains_point(chrom, pos))
    }

    /// True iff an existing context on `chrom` overlaps `[qs, qe]`
    /// (indel-style range query, closed interval, three sub-cases).
    pub fn overlaps_range(&self, chrom: &str, qs: i64, qe: i64) -> bool {
        self.contexts.values().any(|c| c.overlaps_range(chrom, qs, qe))
    }

    /// The deduplicated union of every acceptor read id across all
    /// contexts — the set the FASTQ substitution writer omits.
    pub fn all_acceptor_read_ids(&self) -> BTreeSet<String> {
        self.contexts.values().flat_map(|c| c.acceptor_read_ids.iter().cloned()).collect()
    }

    /// Every donor read across every context, with its full payload —
    /// the candidates the FASTQ substitution writer appends to the last
    /// lane of each orientation.
    pub fn all_donor_reads(&self) -> Vec<&crate::model::AlignedRead> {
        self.contexts.values().flat_map(|c| c.donor_reads.iter()).collect()
    }

    fn context_ids(&self) -> BTreeSet<String> {
        self.contexts.keys().cloned().collect()
    }

    pub fn union(&self, other: &Self) -> Vec<String> {
        self.context_ids().union(&other.context_ids()).cloned().collect()
    }

    pub fn intersection(&self, other: &Self) -> Vec<String> {
        self.context_ids().intersection(&other.context_ids()).cloned().collect()
    }

    pub fn difference(&self, other: &Self) -> Vec<String> {
        self.context_ids().difference(&other.context_ids()).cloned().collect()
    }

    pub fn symmetric_difference(&self, other: &Self) -> Vec<String> {
        self.context_ids().symmetric_difference(&other.context_ids()).cloned().collect()
    }
}
