//! Per-context read-length, quality, and mapping-quality summary
//! statistics: `varconstats.txt` (both sides side-by-side), plus a
//! per-side variant used by run modes that report one side at a time.

use std::path::Path;

use anyhow::{Context, Result};
use csv::WriterBuilder;

use crate::model::{AlignedRead, VariantContext};
use crate::registry::VariantContextRegistry;

const HEADER: &[&str] = &[
    "#ContextId",
    "AvgALength",
    "AvgDLength",
    "MedianALength",
    "MedianDLength",
    "AvgAQual",
    "AvgDQual",
    "MedianAQual",
    "MedianDQual",
    "AvgAMapQ",
    "AvgDMapQ",
    "MedianAMapQ",
    "MedianDMapQ",
];

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        0.0
    } else {
        values.iter().sum::<f64>() / values.len() as f64
    }
}

fn median(values: &mut [f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.sort_by(|a, b| a.partial_cmp(b).unwrap());
    let mid = values.len() / 2;
    if values.len() % 2 == 0 {
        (values[mid - 1] + values[mid]) / 2.0
    } else {
        values[mid]
    }
}

struct SideStats {
    mean_len: f64,
    median_len: f64,
    mean_qual: f64,
    median_qual: f64,
    mean_mapq: f64,
    median_mapq: f64,
}

fn side_stats(reads: &[AlignedRead]) -> SideStats {
    let mut lengths: Vec<f64> = reads.iter().map(|r| r.length() as f64).collect();
    let mut quals: Vec<f64> = reads.iter().map(|r| r.mean_quality()).collect();
    let mut mapqs: Vec<f64> = reads.iter().map(|r| r.mapping_quality as f64).collect();
    SideStats {
        mean_len: mean(&lengths),
        median_len: median(&mut lengths),
        mean_qual: mean(&quals),
        median_qual: median(&mut quals),
        mean_mapq: mean(&mapqs),
        median_mapq: median(&mut mapqs),
    }
}

pub fn write_stats(registry: &VariantContextRegistry, path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    let mut writer = WriterBuilder::new()
        .delimiter(b'\t')
        .has_headers(false)
        .from_path(path)
        .with_context(|| format!("creating {path:?}"))?;
    writer.write_record(HEADER)?;
    for ctx in registry.iter() {
        write_context_row(&mut writer, ctx)?;
    }
    writer.flush()?;
    Ok(())
}

fn write_context_row(
    writer: &mut csv::Writer<std::fs::File>,
    ctx: &VariantContext,
) -> Result<()> {
    let acceptor = side_stats(&ctx.acceptor_reads);
    let donor = side_stats(&ctx.donor_reads);
    writer.write_record([
        ctx.context_id.clone(),
        format!("{:.2}", acceptor.mean_len),
        format!("{:.2}", donor.mean_len),
        format!("{:.2}", acceptor.median_len),
        format!("{:.2}", donor.median_len),
        format!("{:.2}", acceptor.mean_qual),
        format!("{:.2}", donor.mean_qual),
        format!("{:.2}", acceptor.median_qual),
        format!("{:.2}", donor.median_qual),
        format!("{:.2}", acceptor.mean_mapq),
        format!("{:.2}", donor.mean_mapq),
        format!("{:.2}", acceptor.median_mapq),
        format!("{:.2}", donor.median_mapq),
    ])?;
    Ok(())
}

/// Which side of a context a single-side stats table reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Acceptor,
    Donor,
}

const SIDE_HEADER: &[&str] =
    &["#ContextId", "AvgLength", "MedianLength", "AvgQual", "MedianQual", "AvgMapQ", "MedianMapQ"];

/// `acceptorcontextstats.txt`/`donorcontextstats.txt`: one side's summary
/// statistics only, for run modes that report sides separately rather than
/// the combined `varconstats.txt` table.
pub fn write_side_stats(registry: &VariantContextRegistry, path: impl AsRef<Path>, side: Side) -> Result<()> {
    let path = path.as_ref();
    let mut writer = WriterBuilder::new()
        .delimiter(b'\t')
        .has_headers(false)
        .from_path(path)
        .with_context(|| format!("creating {path:?}"))?;
    writer.write_record(SIDE_HEADER)?;
    for ctx in registry.iter() {
        let reads = match side {
            Side::Acceptor => &ctx.acceptor_reads,
            Side::Donor => &ctx.donor_reads,
        };
        let s = side_stats(reads);
        writer.write_record([
            ctx.context_id.clone(),
            format!("{:.2}", s.mean_len),
            format!("{:.2}", s.median_len),
            format!("{:.2}", s.mean_qual),
            format!("{:.2}", s.median_qual),
            format!("{:.2}", s.mean_mapq),
            format!("{:.2}", s.median_mapq),
        ])?;
    }
    writer.flush()?;
    Ok(())
}
