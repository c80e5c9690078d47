//! The extra per-side context and position tables emitted when the run is
//! logging at DEBUG verbosity. These are ancillary to the core
//! context-builder/substitution pipeline and are best-effort: a failure to
//! write one is a warning, not a fatal error (see the orchestrator's
//! caller). [`overlap_table`] is also reused directly by the orchestrator
//! for `D`/`DC`'s unconditional donor-context table.

use std::path::Path;

use anyhow::{Context, Result};
use csv::WriterBuilder;

use crate::model::{AlignedRead, PairNumber, VariantContext};
use crate::registry::VariantContextRegistry;

pub(crate) fn overlap_table(
    path: &Path,
    registry: &VariantContextRegistry,
    side: impl Fn(&VariantContext) -> Option<&crate::model::OverlapInterval>,
) -> Result<()> {
    let mut writer = WriterBuilder::new()
        .delimiter(b'\t')
        .has_headers(false)
        .from_path(path)
        .with_context(|| format!("creating {path:?}"))?;
    writer.write_record(["#ContextId", "DonorSample", "Chrom", "Origin", "Start", "End", "NumOfReads", "ReadIds"])?;
    for ctx in registry.iter() {
        let Some(overlap) = side(ctx) else { continue };
        let mut ids: Vec<&str> = overlap.reads.iter().map(|r| r.read_id.as_str()).collect();
        ids.sort_unstable();
        writer.write_record([
            ctx.context_id.as_str(),
            ctx.sample_id.as_str(),
            overlap.chrom.as_str(),
            &overlap.origin.to_string(),
            &overlap.start.to_string(),
            &overlap.end.to_string(),
            &overlap.reads.len().to_string(),
            &ids.join(";"),
        ])?;
    }
    writer.flush()?;
    Ok(())
}

fn unmapped_mate_table(
    path: &Path,
    registry: &VariantContextRegistry,
    ids: impl Fn(&VariantContext) -> &std::collections::BTreeSet<String>,
) -> Result<()> {
    let mut writer = WriterBuilder::new()
        .delimiter(b'\t')
        .has_headers(false)
        .from_path(path)
        .with_context(|| format!("creating {path:?}"))?;
    writer.write_record(["#ContextId", "SampleId", "ReadIds"])?;
    for ctx in registry.iter() {
        let joined = ids(ctx).iter().cloned().collect::<Vec<_>>().join(";");
        writer.write_record([ctx.context_id.as_str(), ctx.sample_id.as_str(), joined.as_str()])?;
    }
    writer.flush()?;
    Ok(())
}

/// Left position of every R1 read and right position of every R2 read,
/// comma-joined per context — mirrors the source's "left pos for R1,
/// right pos for R2" convention.
fn left_right_positions(reads: &[AlignedRead]) -> (Vec<i64>, Vec<i64>) {
    let mut left: Vec<i64> =
        reads.iter().filter(|r| r.pair_number == PairNumber::First).map(|r| r.ref_start).collect();
    let mut right: Vec<i64> =
        reads.iter().filter(|r| r.pair_number == PairNumber::Second).map(|r| r.ref_end).collect();
    left.sort_unstable();
    right.sort_unstable();
    (left, right)
}

fn left_right_table(
    path: &Path,
    registry: &VariantContextRegistry,
    reads: impl Fn(&VariantContext) -> &[AlignedRead],
) -> Result<()> {
    let mut writer = WriterBuilder::new()
        .delimiter(b'\t')
        .has_headers(false)
        .from_path(path)
        .with_context(|| format!("creating {path:?}"))?;
    writer.write_record(["#ContextId", "LeftPos", "RightPos"])?;
    for ctx in registry.iter() {
        let (left, right) = left_right_positions(reads(ctx));
        let left = left.iter().map(i64::to_string).collect::<Vec<_>>().join(",");
        let right = right.iter().map(i64::to_string).collect::<Vec<_>>().join(",");
        writer.write_record([ctx.context_id.as_str(), left.as_str(), right.as_str()])?;
    }
    writer.flush()?;
    Ok(())
}

/// Writes every DEBUG-only auxiliary table under `out_dir`.
pub fn write_all(registry: &VariantContextRegistry, out_dir: &Path) -> Result<()> {
    overlap_table(&out_dir.join("varcon_acceptor_context.txt"), registry, |c| c.acceptor_overlap.as_ref())?;
    overlap_table(&out_dir.join("varcon_donor_context.txt"), registry, |c| c.donor_overlap.as_ref())?;

    unmapped_mate_table(&out_dir.join("varcon_unmapped_acceptor.txt"), registry, |c| {
        &c.unmapped_acceptor_mate_ids
    })?;
    unmapped_mate_table(&out_dir.join("varcon_unmapped_donor.txt"), registry, |c| {
        &c.unmapped_donor_mate_ids
    })?;

    left_right_table(&out_dir.join("varcon_acceptor_positions.txt"), registry, |c| &c.acceptor_reads)?;
    left_right_table(&out_dir.join("varcon_donor_positions.txt"), registry, |c| &c.donor_reads)?;

    Ok(())
}
