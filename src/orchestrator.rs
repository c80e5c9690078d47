//! Run Orchestrator: dispatches among the ten run modes, composing the
//! Context Builder and the FASTQ Substitution Writer and choosing which
//! artifacts to emit.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::Local;
use thousands::Separable;

use crate::builder::{ContextBuilder, DonorSample};
use crate::cli::{Args, RunMode};
use crate::common::io::open_read_maybe_gz;
use crate::donors::{load_donor_samples, write_used_donor_files};
use crate::err::AppError;
use crate::fastq;
use crate::model::{AlignedRead, PairNumber};
use crate::readers::BamReader;
use crate::registry::{self, VariantContextRegistry};
use crate::stats;

/// Runs the mode selected by `args`. Parameter validation is assumed to
/// have already passed (see [`Args::validate`]).
pub fn run(args: &Args) -> Result<()> {
    let out_dir = args.out.as_deref().context("--out is required")?;
    fs::create_dir_all(out_dir).with_context(|| format!("creating output directory {out_dir:?}"))?;

    let mut fresh_samples: Option<Vec<DonorSample>> = None;
    let mut registry = if args.run_mode.reloads_registry() {
        let varcon_in = args.varcon_in.as_deref().context("--varcon-in is required to reload")?;
        tracing::info!("reloading variant context registry from {varcon_in:?}");
        registry::load(varcon_in, &registry::LoadFilters::default())?
    } else {
        let (registry, samples) = build_fresh_registry(args)?;
        fresh_samples = Some(samples);
        registry
    };

    if matches!(args.run_mode, RunMode::Fc) {
        rehydrate_donor_reads(args, &mut registry)?;
    }

    if !matches!(args.run_mode, RunMode::A | RunMode::Ac) {
        let varcon_path = out_dir.join("varcon.txt");
        registry::serialize(&registry, &varcon_path)?;
        tracing::info!("wrote {} contexts to {:?}", registry.len().separate_with_commas(), varcon_path);

        write_auxiliary_statistics(args.run_mode, &registry, out_dir);

        if let Some(samples) = &fresh_samples {
            let vcf_out = out_dir.join("donorvcfs.txt");
            let bam_out = out_dir.join("donorbams.txt");
            if let Err(err) = write_used_donor_files(samples, &registry, &vcf_out, &bam_out) {
                tracing::warn!("failed to write donor file tables: {err:#}");
            }
        }

        if log::log_enabled!(log::Level::Debug) {
            if let Err(err) = crate::debug_dumps::write_all(&registry, out_dir) {
                tracing::warn!("failed to write debug-verbosity auxiliary tables: {err:#}");
            }
        }
    }

    match args.run_mode {
        RunMode::F | RunMode::Fc => substitute_from_registry(args, &registry)?,
        RunMode::A | RunMode::Ac => substitute_from_donor_fastqs(args, &registry)?,
        RunMode::D | RunMode::Dc | RunMode::P | RunMode::Pc | RunMode::X | RunMode::Xc => {
            tracing::info!("run mode {} emits context/statistics artifacts only", args.run_mode);
        }
    }

    Ok(())
}

/// Writes the auxiliary statistics that differ by run mode, alongside the
/// `varcon.txt` every non-`A` mode shares:
/// - `D`/`DC` are donor-side only: a donor-context table and donor-only
///   read-length/quality/mapq stats, never the combined table below.
/// - `X`/`XC` split `P`/`PC`'s combined `varconstats.txt` into a separate
///   acceptor-side and donor-side stats table.
/// - Every other mode (`P`/`PC`, `F`/`FC`) gets the combined table.
fn write_auxiliary_statistics(run_mode: RunMode, registry: &VariantContextRegistry, out_dir: &Path) {
    match run_mode {
        RunMode::D | RunMode::Dc => {
            let context_path = out_dir.join("donorcontexts.txt");
            if let Err(err) =
                crate::debug_dumps::overlap_table(&context_path, registry, |c| c.donor_overlap.as_ref())
            {
                tracing::warn!("failed to write {context_path:?}: {err:#}");
            }
            let stats_path = out_dir.join("donorcontextstats.txt");
            if let Err(err) = stats::write_side_stats(registry, &stats_path, stats::Side::Donor) {
                tracing::warn!("failed to write {stats_path:?}: {err:#}");
            }
        }
        RunMode::X | RunMode::Xc => {
            let acceptor_path = out_dir.join("acceptorcontextstats.txt");
            if let Err(err) = stats::write_side_stats(registry, &acceptor_path, stats::Side::Acceptor) {
                tracing::warn!("failed to write {acceptor_path:?}: {err:#}");
            }
            let donor_path = out_dir.join("donorcontextstats.txt");
            if let Err(err) = stats::write_side_stats(registry, &donor_path, stats::Side::Donor) {
                tracing::warn!("failed to write {donor_path:?}: {err:#}");
            }
        }
        RunMode::P | RunMode::Pc | RunMode::F | RunMode::Fc => {
            let stats_path = out_dir.join("varconstats.txt");
            if let Err(err) = stats::write_stats(registry, &stats_path) {
                tracing::warn!("failed to write {stats_path:?}: {err:#}");
            }
        }
        RunMode::A | RunMode::Ac => unreachable!("A/AC never reach write_auxiliary_statistics"),
    }
}

fn build_fresh_registry(args: &Args) -> Result<(VariantContextRegistry, Vec<DonorSample>)> {
    let donor_vcf_list = args.donor_vcf.as_deref().context("--donor-vcf is required")?;
    let donor_bam_list = args.donor_bam.as_deref().context("--donor-bam is required")?;
    let acceptor_bam = args.acceptor_bam.as_deref().context("--acceptor-bam is required")?;

    let samples = load_donor_samples(donor_vcf_list, donor_bam_list)?;
    tracing::info!(
        "building variant contexts from {} donor sample(s)",
        samples.len().separate_with_commas()
    );

    let mut registry = VariantContextRegistry::new();
    let builder = ContextBuilder::new(acceptor_bam, args.reference.as_deref());
    builder.build(&samples, &mut registry)?;
    Ok((registry, samples))
}

/// `FC` mode re-loads a registry with no read payloads; this re-fetches
/// each context's donor reads from the original donor alignments before
/// the substitution pass can use them.
fn rehydrate_donor_reads(args: &Args, registry: &mut VariantContextRegistry) -> Result<()> {
    let donor_bam_list = args.donor_bam.as_deref().context("--donor-bam is required for FC")?;
    let donor_vcf_list = args.donor_vcf.as_deref().context("--donor-vcf is required for FC")?;
    let samples = load_donor_samples(donor_vcf_list, donor_bam_list)?;
    let bam_path_by_sample: std::collections::BTreeMap<_, _> =
        samples.into_iter().map(|s| (s.sample_id, s.bam_path)).collect();

    let context_ids: Vec<String> = registry.iter().map(|c| c.context_id.clone()).collect();
    let mut readers: std::collections::BTreeMap<PathBuf, BamReader> = Default::default();

    let mut rehydrated = VariantContextRegistry::new();
    for context_id in context_ids {
        let ctx = registry.get(&context_id).expect("id came from this registry").clone();
        let Some(bam_path) = bam_path_by_sample.get(&ctx.sample_id) else {
            tracing::warn!(
                "no donor BAM for sample {} while rehydrating context {}, keeping id-only context",
                ctx.sample_id,
                ctx.context_id
            );
            rehydrated.insert(ctx);
            continue;
        };
        let reader = match readers.get_mut(bam_path) {
            Some(r) => r,
            None => {
                let r = BamReader::with_reference(bam_path, args.reference.as_deref())?;
                readers.insert(bam_path.clone(), r);
                readers.get_mut(bam_path).unwrap()
            }
        };
        let fetched = reader.fetch_paired(&ctx.chrom, ctx.start, ctx.end)?;
        let donor_reads: Vec<AlignedRead> = fetched
            .reads
            .into_iter()
            .filter(|r| ctx.donor_read_ids.contains(&r.read_id))
            .collect();
        let mut ctx = ctx;
        ctx.donor_reads = donor_reads;
        rehydrated.insert(ctx);
    }
    *registry = rehydrated;
    Ok(())
}

fn substitute_from_registry(args: &Args, registry: &VariantContextRegistry) -> Result<()> {
    substitute(args, registry, &[])
}

/// `A`/`AC`: alongside the reloaded registry's own donor reads, read donor
/// reads straight from a pre-extracted donor FASTQ list (two columns,
/// `R1\tR2`) and append those too. The list carries no per-context
/// affiliation, so these reads are appended to the last lane the same way
/// [`fastq::substitute`] appends a context's own donor reads, rather than
/// being attached to an arbitrary context.
fn substitute_from_donor_fastqs(args: &Args, registry: &VariantContextRegistry) -> Result<()> {
    let donor_fastqs = args.donor_fastqs.as_deref().context("--donor-fastqs is required")?;
    let donor_reads = load_donor_fastq_reads(donor_fastqs)?;
    substitute(args, registry, &donor_reads)
}

fn substitute(args: &Args, registry: &VariantContextRegistry, extra_donor_reads: &[AlignedRead]) -> Result<()> {
    let out_dir = args.out.as_deref().context("--out is required")?;
    let stem = args.fastq_out_stem();
    let date = Local::now().date_naive();
    let written = fastq::substitute(
        &args.template_fq1,
        &args.template_fq2,
        &stem,
        date,
        registry,
        extra_donor_reads,
    )
    .map_err(|source| AppError::FastqWriteFailed { path: stem.clone(), source })?;
    for path in &written {
        tracing::info!("wrote {path:?}");
    }
    let _ = out_dir;
    Ok(())
}

/// Parses a `{r1_path}\t{r2_path}` list file and returns every record as
/// an [`AlignedRead`] with no coordinate information (ids only matter for
/// the substitution pass's append step).
fn load_donor_fastq_reads(list_path: &Path) -> Result<Vec<AlignedRead>> {
    let mut reads = Vec::new();
    for line in crate::common::io::read_lines(list_path)
        .with_context(|| format!("reading {list_path:?}"))?
    {
        let line = line?;
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let mut parts = line.splitn(2, '\t');
        let r1 = parts.next().context("missing R1 column")?;
        let r2 = parts.next().context("missing R2 column")?;
        reads.extend(read_fastq_as_aligned(Path::new(r1), PairNumber::First)?);
        reads.extend(read_fastq_as_aligned(Path::new(r2), PairNumber::Second)?);
    }
    Ok(reads)
}

fn read_fastq_as_aligned(path: &Path, pair_number: PairNumber) -> Result<Vec<AlignedRead>> {
    let reader = open_read_maybe_gz(path).with_context(|| format!("opening {path:?}"))?;
    let mut lines = std::io::BufRead::lines(reader);
    let mut out = Vec::new();
    loop {
        let Some(header) = lines.next() else { break };
        let header = header?;
        let sequence = lines.next().context("truncated FASTQ")??;
        lines.next().context("truncated FASTQ")??;
        let quality = lines.next().context("truncated FASTQ")??;
        let read_id = header.strip_prefix('@').unwrap_or(&header).to_owned();
        out.push(AlignedRead {
            read_id,
            pair_number,
            chrom: String::new(),
            ref_start: 0,
            ref_end: 0,
            sequence: sequence.into_bytes(),
            quality: quality.into_bytes(),
            mapping_quality: 0,
        });
    }
    Ok(out)
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn load_donor_fastq_reads_splits_by_pair() -> Result<()> {
        let tmp = temp_testdir::TempDir::default();
        let r1 = tmp.join("r1.fastq.gz");
        let r2 = tmp.join("r2.fastq.gz");
        {
            let mut w = crate::common::io::open_write_maybe_gz(&r1)?;
            use std::io::Write;
            writeln!(w, "@d1\nACGT\n+\nIIII")?;
        }
        {
            let mut w = crate::common::io::open_write_maybe_gz(&r2)?;
            use std::io::Write;
            writeln!(w, "@d1\nTTTT\n+\nIIII")?;
        }
        let list = tmp.join("donorfastqs.txt");
        std::fs::write(&list, format!("{}\t{}\n", r1.display(), r2.display()))?;

        let reads = load_donor_fastq_reads(&list)?;
        assert_eq!(reads.len(), 2);
        assert!(reads.iter().any(|r| r.pair_number == PairNumber::First));
        assert!(reads.iter().any(|r| r.pair_number == PairNumber::Second));
        Ok(())
    }

    fn sample_registry() -> VariantContextRegistry {
        use crate::model::{OverlapInterval, VariantContext};
        let read = |id: &str| AlignedRead {
            read_id: id.into(),
            pair_number: PairNumber::First,
            chrom: "1".into(),
            ref_start: 100,
            ref_end: 150,
            sequence: vec![b'A'; 50],
            quality: vec![60; 50],
            mapping_quality: 60,
        };
        let mut registry = VariantContextRegistry::new();
        let acc = OverlapInterval::from_reads("1_100", "s1", "1", 100, vec![read("a1")], Default::default())
            .unwrap();
        let don = OverlapInterval::from_reads("1_100", "s1", "1", 100, vec![read("d1")], Default::default())
            .unwrap();
        registry.insert(VariantContext::from_overlaps("1_100", "s1", 100, acc, don).unwrap());
        registry
    }

    #[test]
    fn d_mode_writes_donor_side_artifacts_only() {
        let registry = sample_registry();
        let tmp = temp_testdir::TempDir::default();
        write_auxiliary_statistics(RunMode::D, &registry, &tmp);

        assert!(tmp.join("donorcontexts.txt").exists());
        assert!(tmp.join("donorcontextstats.txt").exists());
        assert!(!tmp.join("varconstats.txt").exists());
        assert!(!tmp.join("acceptorcontextstats.txt").exists());
    }

    #[test]
    fn x_mode_splits_stats_by_side_instead_of_combined() {
        let registry = sample_registry();
        let tmp = temp_testdir::TempDir::default();
        write_auxiliary_statistics(RunMode::X, &registry, &tmp);

        assert!(tmp.join("acceptorcontextstats.txt").exists());
        assert!(tmp.join("donorcontextstats.txt").exists());
        assert!(!tmp.join("varconstats.txt").exists());
    }

    #[test]
    fn p_mode_writes_the_combined_stats_table() {
        let registry = sample_registry();
        let tmp = temp_testdir::TempDir::default();
        write_auxiliary_statistics(RunMode::P, &registry, &tmp);

        assert!(tmp.join("varconstats.txt").exists());
        assert!(!tmp.join("acceptorcontextstats.txt").exists());
        assert!(!tmp.join("donorcontextstats.txt").exists());
    }
}
