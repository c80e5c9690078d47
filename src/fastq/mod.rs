//! FASTQ Substitution Writer: streams acceptor paired-end lanes, omitting
//! reads the registry claims, and appends donor reads on the last lane.

use std::collections::BTreeSet;
use std::io::{BufRead, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::NaiveDate;

use crate::common::io::{open_read_maybe_gz, open_write_maybe_gz};
use crate::model::{AlignedRead, PairNumber};
use crate::registry::VariantContextRegistry;

fn read_id_of(header: &str) -> &str {
    header.strip_prefix('@').unwrap_or(header).trim_end()
}

fn write_record(out: &mut dyn Write, header: &str, sequence: &str, quality: &str) -> Result<()> {
    writeln!(out, "{header}")?;
    writeln!(out, "{sequence}")?;
    writeln!(out, "+")?;
    writeln!(out, "{quality}")?;
    Ok(())
}

fn write_aligned_read(out: &mut dyn Write, read: &AlignedRead) -> Result<()> {
    let sequence = String::from_utf8_lossy(&read.sequence);
    let quality = String::from_utf8_lossy(&read.quality);
    write_record(out, &format!("@{}", read.read_id), &sequence, &quality)
}

/// Streams one acceptor lane, omitting reads in `skip_ids`, and appends
/// `donor_reads` (already sorted ascending by id) when `is_last_lane`.
fn substitute_lane(
    input_path: &Path,
    output_path: &Path,
    skip_ids: &BTreeSet<String>,
    donor_reads: &[&AlignedRead],
    is_last_lane: bool,
) -> Result<()> {
    let reader = open_read_maybe_gz(input_path)
        .with_context(|| format!("opening acceptor FASTQ {input_path:?}"))?;
    let mut writer = open_write_maybe_gz(output_path)
        .with_context(|| format!("creating substituted FASTQ {output_path:?}"))?;

    let mut lines = reader.lines();
    loop {
        let Some(header) = lines.next() else { break };
        let header = header?;
        let sequence =
            lines.next().context("truncated FASTQ record (missing sequence line)")??;
        lines.next().context("truncated FASTQ record (missing separator line)")??;
        let quality = lines.next().context("truncated FASTQ record (missing quality line)")??;

        if skip_ids.contains(read_id_of(&header)) {
            continue;
        }
        write_record(&mut *writer, &header, &sequence, &quality)?;
    }

    if is_last_lane {
        for read in donor_reads {
            write_aligned_read(&mut *writer, read)?;
        }
    }

    writer.flush()?;
    Ok(())
}

/// Formats the output path for one lane/orientation, per the fixed
/// `{stem}_{date}_L{lane}_R{1|2}.fastq.gz` convention.
pub fn output_path(stem: &Path, date: NaiveDate, lane_index: usize, pair_number: PairNumber) -> PathBuf {
    let read_tag = match pair_number {
        PairNumber::First => "R1",
        PairNumber::Second => "R2",
    };
    let stem_str = stem.to_string_lossy();
    PathBuf::from(format!(
        "{stem_str}_{}_L{}_{read_tag}.fastq.gz",
        date.format("%Y-%m-%d"),
        lane_index + 1
    ))
}

/// Runs the full substitution pass for both orientations.
///
/// `extra_donor_reads` are appended alongside the registry's own donor
/// reads without being tied to any particular context — this is how `A`/
/// `AC` feed in reads read straight from a `--donor-fastqs` list, which
/// carries no per-context affiliation at all.
pub fn substitute(
    forward_lanes: &[PathBuf],
    reverse_lanes: &[PathBuf],
    out_stem: &Path,
    date: NaiveDate,
    registry: &VariantContextRegistry,
    extra_donor_reads: &[AlignedRead],
) -> Result<Vec<PathBuf>> {
    anyhow::ensure!(
        forward_lanes.len() == reverse_lanes.len(),
        "forward and reverse lane counts differ: {} vs {}",
        forward_lanes.len(),
        reverse_lanes.len()
    );

    let skip_ids = registry.all_acceptor_read_ids();
    let all_donor_reads = registry.all_donor_reads();
    let mut donor_forward: Vec<&AlignedRead> =
        all_donor_reads.iter().copied().filter(|r| r.pair_number == PairNumber::First).collect();
    let mut donor_reverse: Vec<&AlignedRead> =
        all_donor_reads.iter().copied().filter(|r| r.pair_number == PairNumber::Second).collect();
    donor_forward.extend(extra_donor_reads.iter().filter(|r| r.pair_number == PairNumber::First));
    donor_reverse.extend(extra_donor_reads.iter().filter(|r| r.pair_number == PairNumber::Second));
    donor_forward.sort_by(|a, b| a.read_id.cmp(&b.read_id));
    donor_reverse.sort_by(|a, b| a.read_id.cmp(&b.read_id));

    let mut written = Vec::new();
    let n = forward_lanes.len();
    for (i, (forward, reverse)) in itertools::izip!(forward_lanes, reverse_lanes).enumerate() {
        let is_last_lane = i == n - 1;

        let fwd_out = output_path(out_stem, date, i, PairNumber::First);
        substitute_lane(forward, &fwd_out, &skip_ids, &donor_forward, is_last_lane)?;
        written.push(fwd_out);

        let rev_out = output_path(out_stem, date, i, PairNumber::Second);
        substitute_lane(reverse, &rev_out, &skip_ids, &donor_reverse, is_last_lane)?;
        written.push(rev_out);
    }
    Ok(written)
}

#[cfg(test)]
mod test {
    use super::*;
    use std::io::Write as _;

    fn write_gz(path: &Path, records: &[(&str, &str, &str)]) {
        let mut w = open_write_maybe_gz(path).unwrap();
        for (id, seq, qual) in records {
            writeln!(w, "@{id}").unwrap();
            writeln!(w, "{seq}").unwrap();
            writeln!(w, "+").unwrap();
            writeln!(w, "{qual}").unwrap();
        }
    }

    fn read_gz(path: &Path) -> Vec<String> {
        let r = open_read_maybe_gz(path).unwrap();
        r.lines().map(|l| l.unwrap()).collect()
    }

    #[test]
    fn omits_skipped_ids_and_appends_donor_on_last_lane() {
        let tmp = temp_testdir::TempDir::default();
        let fwd_lane0 = tmp.join("fwd0.fastq.gz");
        let rev_lane0 = tmp.join("rev0.fastq.gz");
        write_gz(&fwd_lane0, &[("keep1", "ACGT", "IIII"), ("drop1", "TTTT", "IIII")]);
        write_gz(&rev_lane0, &[("keep1", "ACGT", "IIII"), ("drop1", "TTTT", "IIII")]);

        let mut registry = VariantContextRegistry::new();
        let acc = crate::model::OverlapInterval::from_reads(
            "1_100",
            "s1",
            "1",
            100,
            vec![AlignedRead {
                read_id: "drop1".into(),
                pair_number: PairNumber::First,
                chrom: "1".into(),
                ref_start: 90,
                ref_end: 140,
                sequence: vec![b'A'; 50],
                quality: vec![60; 50],
                mapping_quality: 60,
            }],
            Default::default(),
        )
        .unwrap();
        let don = crate::model::OverlapInterval::from_reads(
            "1_100",
            "s1",
            "1",
            100,
            vec![AlignedRead {
                read_id: "donor1".into(),
                pair_number: PairNumber::First,
                chrom: "1".into(),
                ref_start: 95,
                ref_end: 145,
                sequence: b"AAAA".to_vec(),
                quality: vec![b'I'; 4],
                mapping_quality: 60,
            }],
            Default::default(),
        )
        .unwrap();
        registry.insert(
            crate::model::VariantContext::from_overlaps("1_100", "s1", 100, acc, don).unwrap(),
        );

        let out_stem = tmp.join("out");
        let date = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let written = substitute(&[fwd_lane0.clone()], &[], &out_stem, date, &registry, &[]);
        assert!(written.is_err());

        let written =
            substitute(&[fwd_lane0], &[rev_lane0], &out_stem, date, &registry, &[]).unwrap();
        assert_eq!(written.len(), 2);

        let fwd_out = read_gz(&written[0]);
        assert!(fwd_out.iter().any(|l| l == "@keep1"));
        assert!(!fwd_out.iter().any(|l| l == "@drop1"));
        assert!(fwd_out.iter().any(|l| l == "@donor1"));
    }

    #[test]
    fn output_path_matches_naming_convention() {
        let date = NaiveDate::from_ymd_opt(2024, 3, 7).unwrap();
        let path = output_path(Path::new("/tmp/out"), date, 0, PairNumber::First);
        assert_eq!(path, PathBuf::from("/tmp/out_2024-03-07_L1_R1.fastq.gz"));
    }
}
