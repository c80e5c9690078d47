//! Serialization of the registry to `varcon.txt` and re-loading it, with
//! optional sample/context/chrom allow-list filters applied on load.
//!
//! Tab-delimited, no automatic header row — the `#`-prefixed header is
//! written as a literal record, matching the convention used for this
//! crate's other TSV outputs.

use std::collections::BTreeSet;
use std::path::Path;

use anyhow::{Context, Result};
use csv::{ReaderBuilder, WriterBuilder};

use crate::model::VariantContext;

use super::VariantContextRegistry;

const HEADER: &[&str] = &[
    "#ContextId",
    "DonorSample",
    "Chrom",
    "Origin",
    "Start",
    "End",
    "AcceptorContextLength",
    "DonorContextLength",
    "AcceptorReads",
    "DonorReads",
    "ADratio",
    "AcceptorReadsIds",
    "DonorReadIds",
];

fn join_ids(ids: &BTreeSet<String>) -> String {
    ids.iter().cloned().collect::<Vec<_>>().join(";")
}

/// Optional allow-lists applied when re-loading a registry; an unset
/// filter passes everything through.
#[derive(Debug, Default, Clone)]
pub struct LoadFilters {
    pub sample_ids: Option<BTreeSet<String>>,
    pub context_ids: Option<BTreeSet<String>>,
    pub chroms: Option<BTreeSet<String>>,
}

fn passes_filter(value: &str, filter: &Option<BTreeSet<String>>) -> bool {
    match filter {
        None => true,
        Some(set) => set.contains(value),
    }
}

pub fn serialize(registry: &VariantContextRegistry, path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    let mut writer = WriterBuilder::new()
        .delimiter(b'\t')
        .has_headers(false)
        .from_path(path)
        .with_context(|| format!("creating {path:?}"))?;
    writer.write_record(HEADER)?;
    for ctx in registry.iter() {
        writer.write_record([
            ctx.context_id.clone(),
            ctx.sample_id.clone(),
            ctx.chrom.clone(),
            ctx.origin.to_string(),
            ctx.start.to_string(),
            ctx.end.to_string(),
            ctx.acceptor_context_length.to_string(),
            ctx.donor_context_length.to_string(),
            ctx.acceptor_read_count.to_string(),
            ctx.donor_read_count.to_string(),
            format!("{:.4}", ctx.ad_ratio()),
            join_ids(&ctx.acceptor_read_ids),
            join_ids(&ctx.donor_read_ids),
        ])?;
    }
    writer.flush()?;
    Ok(())
}

/// Loads a previously serialized registry. Identifiers, coordinates, and
/// the `AcceptorReads`/`DonorReads`/`ADratio` counts round-trip;
/// `acceptor_reads`/`donor_reads` themselves come back empty (see the note
/// on [`VariantContext`]).
pub fn load(path: impl AsRef<Path>, filters: &LoadFilters) -> Result<VariantContextRegistry> {
    let path = path.as_ref();
    let mut reader = ReaderBuilder::new()
        .delimiter(b'\t')
        .has_headers(false)
        .flexible(true)
        .from_path(path)
        .with_context(|| format!("opening {path:?}"))?;

    let mut registry = VariantContextRegistry::new();
    for record_result in reader.records() {
        let record = record_result?;
        if record.get(0).map(|v| v.starts_with('#')).unwrap_or(true) {
            continue;
        }
        let context_id = record.get(0).unwrap_or_default().to_owned();
        let sample_id = record.get(1).unwrap_or_default().to_owned();
        let chrom = record.get(2).unwrap_or_default().to_owned();

        if !passes_filter(&sample_id, &filters.sample_ids)
            || !passes_filter(&context_id, &filters.context_ids)
            || !passes_filter(&chrom, &filters.chroms)
        {
            continue;
        }

        let origin: i64 = record.get(3).unwrap_or("0").parse().unwrap_or(0);
        let start: i64 = record.get(4).unwrap_or("0").parse().unwrap_or(0);
        let end: i64 = record.get(5).unwrap_or("0").parse().unwrap_or(0);
        let acceptor_context_length: i64 = record.get(6).unwrap_or("0").parse().unwrap_or(0);
        let donor_context_length: i64 = record.get(7).unwrap_or("0").parse().unwrap_or(0);
        let acceptor_read_count: usize = record.get(8).unwrap_or("0").parse().unwrap_or(0);
        let donor_read_count: usize = record.get(9).unwrap_or("0").parse().unwrap_or(0);
        let acceptor_read_ids: BTreeSet<String> = record
            .get(11)
            .unwrap_or_default()
            .split(';')
            .filter(|s| !s.is_empty())
            .map(str::to_owned)
            .collect();
        let donor_read_ids: BTreeSet<String> = record
            .get(12)
            .unwrap_or_default()
            .split(';')
            .filter(|s| !s.is_empty())
            .map(str::to_owned)
            .collect();

        registry.insert(VariantContext {
            context_id,
            sample_id,
            chrom,
            origin,
            start,
            end,
            acceptor_reads: Vec::new(),
            donor_reads: Vec::new(),
            acceptor_read_count,
            donor_read_count,
            acceptor_read_ids,
            donor_read_ids,
            unmapped_acceptor_mate_ids: Default::default(),
            unmapped_donor_mate_ids: Default::default(),
            acceptor_context_length,
            donor_context_length,
            acceptor_overlap: None,
            donor_overlap: None,
        });
    }
    Ok(registry)
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::model::{AlignedRead, OverlapInterval, PairNumber};

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

    fn sample_registry() -> VariantContextRegistry {
        let mut reg = VariantContextRegistry::new();
        let acc = OverlapInterval::from_reads(
            "1_1000",
            "sampleA",
            "1",
            1000,
            vec![read("a1", 990, 1040), read("a2", 995, 1045)],
            Default::default(),
        )
        .unwrap();
        let don = OverlapInterval::from_reads(
            "1_1000",
            "sampleA",
            "1",
            1000,
            vec![read("d1", 1000, 1050)],
            Default::default(),
        )
        .unwrap();
        reg.insert(VariantContext::from_overlaps("1_1000", "sampleA", 1000, acc, don).unwrap());
        reg
    }

    #[test]
    fn round_trip_preserves_identity_fields() -> Result<()> {
        let reg = sample_registry();
        let tmp = temp_testdir::TempDir::default();
        let path = tmp.join("varcon.txt");
        serialize(&reg, &path)?;

        let loaded = load(&path, &LoadFilters::default())?;
        assert_eq!(loaded.len(), 1);
        let ctx = loaded.get("1_1000").unwrap();
        assert_eq!(ctx.chrom, "1");
        assert_eq!(ctx.origin, 1000);
        assert_eq!(ctx.acceptor_read_ids.len(), 2);
        assert_eq!(ctx.donor_read_ids.len(), 1);
        assert!(ctx.acceptor_reads.is_empty());
        assert_eq!(ctx.acceptor_read_count, 2);
        assert_eq!(ctx.donor_read_count, 1);
        assert_eq!(format!("{:.4}", ctx.ad_ratio()), "2.0000");
        Ok(())
    }

    #[test]
    fn reserialization_after_payload_less_reload_preserves_counts() -> Result<()> {
        let reg = sample_registry();
        let tmp = temp_testdir::TempDir::default();
        let path = tmp.join("varcon.txt");
        serialize(&reg, &path)?;

        let loaded = load(&path, &LoadFilters::default())?;
        let reserialized = tmp.join("varcon.reserialized.txt");
        serialize(&loaded, &reserialized)?;

        let original = std::fs::read_to_string(&path)?;
        let roundtripped = std::fs::read_to_string(&reserialized)?;
        assert_eq!(original, roundtripped);
        Ok(())
    }

    #[test]
    fn sample_filter_excludes_non_matching() -> Result<()> {
        let reg = sample_registry();
        let tmp = temp_testdir::TempDir::default();
        let path = tmp.join("varcon.txt");
        serialize(&reg, &path)?;

        let filters = LoadFilters {
            sample_ids: Some(BTreeSet::from(["other-sample".to_string()])),
            ..Default::default()
        };
        let loaded = load(&path, &filters)?;
        assert!(loaded.is_empty());
        Ok(())
    }
}
