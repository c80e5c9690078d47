//! Parsing of the `{sample_id}\t{path}` donor VCF/BAM list files and their
//! join into [`DonorSample`] records.

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use csv::WriterBuilder;

use crate::builder::DonorSample;
use crate::common::io::read_lines;
use crate::registry::VariantContextRegistry;

fn parse_sample_path_list(path: &Path) -> Result<BTreeMap<String, PathBuf>> {
    let mut out = BTreeMap::new();
    for line in read_lines(path).with_context(|| format!("reading {path:?}"))? {
        let line = line?;
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let mut parts = line.splitn(2, '\t');
        let sample_id = parts.next().context("missing sample id column")?.to_owned();
        let sample_path = parts.next().context("missing path column")?.trim();
        out.insert(sample_id, PathBuf::from(shellexpand::tilde(sample_path).into_owned()));
    }
    Ok(out)
}

/// Joins a donor VCF list and a donor BAM list on sample id. Samples
/// present in only one list are dropped with a warning, since a context
/// cannot be built from one side alone.
pub fn load_donor_samples(vcf_list_path: &Path, bam_list_path: &Path) -> Result<Vec<DonorSample>> {
    let vcfs = parse_sample_path_list(vcf_list_path)?;
    let bams = parse_sample_path_list(bam_list_path)?;

    let mut samples = Vec::new();
    for (sample_id, vcf_path) in &vcfs {
        match bams.get(sample_id) {
            Some(bam_path) => samples.push(DonorSample {
                sample_id: sample_id.clone(),
                vcf_path: vcf_path.clone(),
                bam_path: bam_path.clone(),
            }),
            None => tracing::warn!(
                "sample {sample_id} has a donor VCF but no donor BAM entry, skipping"
            ),
        }
    }
    for sample_id in bams.keys() {
        if !vcfs.contains_key(sample_id) {
            tracing::warn!("sample {sample_id} has a donor BAM but no donor VCF entry, skipping");
        }
    }
    Ok(samples)
}

/// Writes `donorvcfs.txt`/`donorbams.txt`: two-column `{sample_id}\t{path}`
/// tables restricted to samples that actually contributed a context to
/// `registry`, in lexicographic sample-id order.
pub fn write_used_donor_files(
    samples: &[DonorSample],
    registry: &VariantContextRegistry,
    vcf_path: impl AsRef<Path>,
    bam_path: impl AsRef<Path>,
) -> Result<()> {
    let contributing: BTreeSet<&str> =
        registry.iter().map(|ctx| ctx.sample_id.as_str()).collect();

    let mut ordered: Vec<&DonorSample> = samples
        .iter()
        .filter(|s| contributing.contains(s.sample_id.as_str()))
        .collect();
    ordered.sort_by(|a, b| a.sample_id.cmp(&b.sample_id));

    write_two_column(vcf_path, ordered.iter().map(|s| (&s.sample_id, &s.vcf_path)))?;
    write_two_column(bam_path, ordered.iter().map(|s| (&s.sample_id, &s.bam_path)))?;
    Ok(())
}

fn write_two_column<'a>(
    path: impl AsRef<Path>,
    rows: impl Iterator<Item = (&'a String, &'a PathBuf)>,
) -> Result<()> {
    let path = path.as_ref();
    let mut writer = WriterBuilder::new()
        .delimiter(b'\t')
        .has_headers(false)
        .from_path(path)
        .with_context(|| format!("creating {path:?}"))?;
    for (sample_id, file_path) in rows {
        writer.write_record([sample_id.as_str(), &file_path.to_string_lossy()])?;
    }
    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod test {
    use super::*;
    use std::io::Write;

    #[test]
    fn joins_on_sample_id_and_skips_unmatched() -> Result<()> {
        let tmp = temp_testdir::TempDir::default();
        let vcf_list = tmp.join("donorvcfs.txt");
        let bam_list = tmp.join("donorbams.txt");
        {
            let mut f = std::fs::File::create(&vcf_list)?;
            writeln!(f, "sampleA\t/data/a.vcf.gz")?;
            writeln!(f, "sampleB\t/data/b.vcf.gz")?;
        }
        {
            let mut f = std::fs::File::create(&bam_list)?;
            writeln!(f, "sampleA\t/data/a.bam")?;
            writeln!(f, "sampleC\t/data/c.bam")?;
        }

        let samples = load_donor_samples(&vcf_list, &bam_list)?;
        assert_eq!(samples.len(), 1);
        assert_eq!(samples[0].sample_id, "sampleA");
        Ok(())
    }

    #[test]
    fn write_used_donor_files_excludes_non_contributing_samples() -> Result<()> {
        use crate::model::{OverlapInterval, PairNumber, VariantContext};

        let samples = vec![
            DonorSample {
                sample_id: "sampleA".into(),
                vcf_path: "/data/a.vcf.gz".into(),
                bam_path: "/data/a.bam".into(),
            },
            DonorSample {
                sample_id: "sampleB".into(),
                vcf_path: "/data/b.vcf.gz".into(),
                bam_path: "/data/b.bam".into(),
            },
        ];

        let read = crate::model::AlignedRead {
            read_id: "r1".into(),
            pair_number: PairNumber::First,
            chrom: "1".into(),
            ref_start: 100,
            ref_end: 150,
            sequence: vec![b'A'; 50],
            quality: vec![60; 50],
            mapping_quality: 60,
        };
        let acc = OverlapInterval::from_reads(
            "1_100", "sampleA", "1", 100, vec![read.clone()], Default::default(),
        )
        .unwrap();
        let don =
            OverlapInterval::from_reads("1_100", "sampleA", "1", 100, vec![read], Default::default())
                .unwrap();
        let mut registry = VariantContextRegistry::new();
        registry.insert(VariantContext::from_overlaps("1_100", "sampleA", 100, acc, don).unwrap());

        let tmp = temp_testdir::TempDir::default();
        let vcf_out = tmp.join("donorvcfs.txt");
        let bam_out = tmp.join("donorbams.txt");
        write_used_donor_files(&samples, &registry, &vcf_out, &bam_out)?;

        let vcf_contents = std::fs::read_to_string(&vcf_out)?;
        assert!(vcf_contents.contains("sampleA"));
        assert!(!vcf_contents.contains("sampleB"));
        Ok(())
    }
}
