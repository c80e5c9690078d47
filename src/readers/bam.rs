//! Paired-read retrieval from an indexed BAM/CRAM alignment.
//!
//! Wraps `rust_htslib::bam::IndexedReader` with tid/seq-name header
//! mapping and a region-fetch API, plus mate-lookup-by-coordinate and an
//! exactly-twice filter over the accumulated candidates.

use std::collections::{BTreeSet, HashMap};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use rust_htslib::bam::{self, record::Record, HeaderView, IndexedReader, Read as _};

use crate::common::normalize_chrom;
use crate::model::{AlignedRead, PairNumber};

fn map_tid_to_seq_name(header: &HeaderView) -> HashMap<i32, String> {
    let mut map = HashMap::new();
    for name in header.target_names() {
        if let Some(tid) = header.tid(name) {
            map.insert(tid as i32, String::from_utf8_lossy(name).into_owned());
        }
    }
    map
}

/// Maps a normalized chromosome name (`"1"`, `"X"`, `"MT"`, ...) back to
/// whatever spelling this alignment's header actually uses (`"chr1"`,
/// `"X"`, `"chrM"`, ...), so a donor BAM and an acceptor BAM that name
/// contigs differently still resolve to the same region.
fn map_normalized_to_seq_name(header: &HeaderView) -> HashMap<String, String> {
    let mut map = HashMap::new();
    for name in header.target_names() {
        let name = String::from_utf8_lossy(name).into_owned();
        map.entry(normalize_chrom(&name)).or_insert(name);
    }
    map
}

pub struct BamReader {
    pub path: PathBuf,
    reader: IndexedReader,
    /// A second handle onto the same file, dedicated to mate lookups.
    /// `fetch_paired`'s scan and `fetch_mate`'s lookup each hold their own
    /// region cursor via `IndexedReader::fetch`; sharing one `IndexedReader`
    /// between them would have the mate lookup silently replace the
    /// enclosing scan's cursor mid-iteration.
    mate_reader: IndexedReader,
    tid_to_seq_name: HashMap<i32, String>,
    normalized_to_seq_name: HashMap<String, String>,
}

fn pair_number_of(record: &Record) -> Option<PairNumber> {
    if record.is_first_in_template() {
        Some(PairNumber::First)
    } else if record.is_last_in_template() {
        Some(PairNumber::Second)
    } else {
        None
    }
}

/// Builds an [`AlignedRead`] from a htslib record, always storing `chrom`
/// in its normalized form so reads from differently-spelled alignments
/// (`"chr1"` vs `"1"`) still compare equal on chromosome.
fn record_to_aligned_read(record: &Record, chrom: &str) -> Option<AlignedRead> {
    let chrom = normalize_chrom(chrom);
    let pair_number = pair_number_of(record)?;
    let read_id = String::from_utf8_lossy(record.qname()).into_owned();
    let ref_start = record.pos();
    let ref_end = record.cigar().end_pos();
    let sequence = record.seq().as_bytes();
    let quality = record.qual().iter().map(|&q| q + 33).collect();
    Some(AlignedRead {
        read_id,
        pair_number,
        chrom: chrom.to_owned(),
        ref_start,
        ref_end,
        sequence,
        quality,
        mapping_quality: record.mapq(),
    })
}

/// Outcome of fetching reads spanning a region: the qualifying reads plus
/// the ids of any whose mate could not be located.
pub struct RetrievedReads {
    pub reads: Vec<AlignedRead>,
    pub unmapped_mate_ids: BTreeSet<String>,
}

impl BamReader {
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::with_reference(path, None::<&Path>)
    }

    /// Opens an indexed BAM/CRAM alignment, wiring in `reference` (a FASTA
    /// path) when given. CRAM decoding needs the reference to reconstruct
    /// sequence and quality from the reference-compressed records; a plain
    /// BAM ignores it.
    pub fn with_reference<P: AsRef<Path>, R: AsRef<Path>>(
        path: P,
        reference: Option<R>,
    ) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let mut reader = IndexedReader::from_path(&path)
            .with_context(|| format!("opening indexed alignment {path:?}"))?;
        let mut mate_reader = IndexedReader::from_path(&path)
            .with_context(|| format!("opening indexed alignment {path:?} for mate lookups"))?;
        if let Some(reference) = &reference {
            reader
                .set_reference(reference)
                .with_context(|| format!("setting CRAM reference for {path:?}"))?;
            mate_reader
                .set_reference(reference)
                .with_context(|| format!("setting CRAM reference for {path:?}"))?;
        }
        let tid_to_seq_name = map_tid_to_seq_name(reader.header());
        let normalized_to_seq_name = map_normalized_to_seq_name(reader.header());
        Ok(Self { path, reader, mate_reader, tid_to_seq_name, normalized_to_seq_name })
    }

    fn seq_name(&self, tid: i32) -> Option<&str> {
        self.tid_to_seq_name.get(&tid).map(|s| s.as_str())
    }

    /// Resolves a logical chromosome name (as it appears in a donor VCF, or
    /// in another sample's BAM header) to this alignment's own spelling.
    fn resolve_chrom<'a>(&'a self, chrom: &'a str) -> Result<&'a str> {
        if self.normalized_to_seq_name.values().any(|v| v == chrom) {
            return Ok(chrom);
        }
        self.normalized_to_seq_name
            .get(&normalize_chrom(chrom))
            .map(|s| s.as_str())
            .with_context(|| format!("chromosome {chrom:?} not found in {:?}", self.path))
    }

    /// Fetches every read overlapping `[start, end)` on `chrom`, looks up
    /// each one's mate, and keeps only identifiers occurring exactly twice.
    ///
    /// Mate lookup: for each record, re-fetch a narrow window at its
    /// recorded mate coordinate (`mtid`/`mpos`) and scan for a record with
    /// the same query name and the complementary pair number. No mate means
    /// the read's id is recorded as unmapped and the read itself is dropped
    /// by the exactly-twice filter unless another retrieval re-adds it.
    pub fn fetch_paired(&mut self, chrom: &str, start: i64, end: i64) -> Result<RetrievedReads> {
        let resolved = self.resolve_chrom(chrom)?;
        self.reader.fetch((resolved, start, end)).with_context(|| {
            format!("fetching region {chrom}:{start}-{end} in {:?}", self.path)
        })?;

        let mut record = Record::new();
        let mut candidates: Vec<AlignedRead> = Vec::new();
        let mut unmapped_mate_ids = BTreeSet::new();

        loop {
            match self.reader.read(&mut record) {
                None => break,
                Some(result) => result?,
            }
            let Some(aligned) = record_to_aligned_read(&record, chrom) else {
                continue;
            };
            candidates.push(aligned);

            if record.is_mate_unmapped() || record.mtid() < 0 || record.mpos() < 0 {
                unmapped_mate_ids.insert(String::from_utf8_lossy(record.qname()).into_owned());
                continue;
            }

            if let Some(mate) = self.fetch_mate(&record)? {
                candidates.push(mate);
            } else {
                unmapped_mate_ids.insert(String::from_utf8_lossy(record.qname()).into_owned());
            }
        }

        let mut id_counts: HashMap<String, usize> = HashMap::new();
        for r in &candidates {
            *id_counts.entry(r.read_id.clone()).or_insert(0) += 1;
        }
        let mut seen = std::collections::HashSet::new();
        let reads = candidates
            .into_iter()
            .filter(|r| id_counts.get(&r.read_id).copied().unwrap_or(0) == 2)
            .filter(|r| seen.insert((r.read_id.clone(), r.pair_number)))
            .collect();

        Ok(RetrievedReads { reads, unmapped_mate_ids })
    }

    fn fetch_mate(&mut self, record: &Record) -> Result<Option<AlignedRead>> {
        let mate_tid = record.mtid();
        let mate_pos = record.mpos();
        let Some(mate_chrom) = self.seq_name(mate_tid).map(|s| s.to_owned()) else {
            return Ok(None);
        };
        let own_qname = record.qname().to_vec();
        let own_pair = pair_number_of(record);

        self.mate_reader.fetch((mate_chrom.as_str(), mate_pos, mate_pos + 1))?;
        let mut candidate = Record::new();
        loop {
            match self.mate_reader.read(&mut candidate) {
                None => return Ok(None),
                Some(result) => result?,
            }
            if candidate.qname() == own_qname.as_slice()
                && pair_number_of(&candidate) != own_pair
            {
                return Ok(record_to_aligned_read(&candidate, &mate_chrom));
            }
        }
    }
}
