//! Variant Context Builder: turns a donor sample's variant stream into
//! variant contexts, enforcing first-seen-wins against what earlier
//! samples already claimed.

use std::path::Path;

use crate::err::AppError;
use crate::model::{OverlapInterval, VariantContext, VariantKind};
use crate::readers::{BamReader, VcfReader};
use crate::registry::VariantContextRegistry;

/// One donor sample's alignment and variant call set, joined by sample id.
pub struct DonorSample {
    pub sample_id: String,
    pub vcf_path: std::path::PathBuf,
    pub bam_path: std::path::PathBuf,
}

/// Builds variant contexts for every donor sample against a shared
/// acceptor alignment, in the fixed lexicographic sample order required
/// for deterministic first-seen-wins behavior.
pub struct ContextBuilder<'a> {
    acceptor_bam_path: &'a Path,
    reference: Option<&'a Path>,
}

impl<'a> ContextBuilder<'a> {
    pub fn new(acceptor_bam_path: &'a Path, reference: Option<&'a Path>) -> Self {
        Self { acceptor_bam_path, reference }
    }

    /// Processes every sample in `samples`, sorted by `sample_id`, and
    /// inserts every valid context into `registry`.
    ///
    /// A sample whose alignment or variant file cannot be opened is
    /// logged at `warn` and skipped; the run continues with the next
    /// sample (see the per-sample isolation rule). The acceptor alignment
    /// itself failing to open is fatal and is surfaced to the caller.
    pub fn build(
        &self,
        samples: &[DonorSample],
        registry: &mut VariantContextRegistry,
    ) -> Result<(), AppError> {
        let mut ordered: Vec<&DonorSample> = samples.iter().collect();
        ordered.sort_by(|a, b| a.sample_id.cmp(&b.sample_id));

        let mut acceptor_reader = BamReader::with_reference(self.acceptor_bam_path, self.reference)
            .map_err(|source| AppError::AcceptorAlignmentUnavailable {
                path: self.acceptor_bam_path.to_path_buf(),
                source,
            })?;

        for sample in ordered {
            if let Err(err) = self.build_for_sample(sample, &mut acceptor_reader, registry) {
                tracing::warn!("skipping donor sample {}: {err:#}", sample.sample_id);
            }
        }
        Ok(())
    }

    fn build_for_sample(
        &self,
        sample: &DonorSample,
        acceptor_reader: &mut BamReader,
        registry: &mut VariantContextRegistry,
    ) -> anyhow::Result<()> {
        let mut donor_reader = BamReader::with_reference(&sample.bam_path, self.reference)?;
        let mut vcf_reader = VcfReader::new(&sample.vcf_path)?;
        let variants = vcf_reader.variants()?;

        for variant in variants {
            if registry_already_covers(registry, &variant) {
                tracing::debug!(
                    "{}:{} already covered by an existing context, skipping",
                    variant.chrom,
                    variant.pos + 1
                );
                continue;
            }

            // Acceptor and donor fetches touch disjoint `BamReader`s, so running
            // them on rayon's pool is safe regardless of `--threads`; it only
            // matters for wall-clock, never for the registry's insertion order.
            let (search, donor_search) = rayon::join(
                || {
                    acceptor_reader.fetch_paired(
                        &variant.chrom,
                        variant.search_start,
                        variant.search_end,
                    )
                },
                || {
                    donor_reader.fetch_paired(
                        &variant.chrom,
                        variant.search_start,
                        variant.search_end,
                    )
                },
            );
            let (search, donor_search) = (search?, donor_search?);

            let context_id = format!("{}_{}", variant.chrom, variant.pos);
            let Some(acceptor_overlap) = OverlapInterval::from_reads(
                &context_id,
                &sample.sample_id,
                &variant.chrom,
                variant.pos,
                search.reads,
                search.unmapped_mate_ids,
            ) else {
                continue;
            };
            let Some(donor_overlap) = OverlapInterval::from_reads(
                &context_id,
                &sample.sample_id,
                &variant.chrom,
                variant.pos,
                donor_search.reads,
                donor_search.unmapped_mate_ids,
            ) else {
                continue;
            };

            let combined_start = acceptor_overlap.start.min(donor_overlap.start);
            let combined_end = acceptor_overlap.end.max(donor_overlap.end);

            let (widened_acceptor, widened_donor) = rayon::join(
                || acceptor_reader.fetch_paired(&variant.chrom, combined_start, combined_end),
                || donor_reader.fetch_paired(&variant.chrom, combined_start, combined_end),
            );
            let (widened_acceptor, widened_donor) = (widened_acceptor?, widened_donor?);

            let mut acceptor_unmapped = acceptor_overlap.unmapped_mate_ids.clone();
            acceptor_unmapped.extend(widened_acceptor.unmapped_mate_ids);
            let mut donor_unmapped = donor_overlap.unmapped_mate_ids.clone();
            donor_unmapped.extend(widened_donor.unmapped_mate_ids);

            let Some(final_acceptor) = OverlapInterval::from_reads(
                &context_id,
                &sample.sample_id,
                &variant.chrom,
                variant.pos,
                widened_acceptor.reads,
                acceptor_unmapped,
            ) else {
                continue;
            };
            let Some(final_donor) = OverlapInterval::from_reads(
                &context_id,
                &sample.sample_id,
                &variant.chrom,
                variant.pos,
                widened_donor.reads,
                donor_unmapped,
            ) else {
                continue;
            };

            if let Some(context) = VariantContext::from_overlaps(
                context_id,
                sample.sample_id.clone(),
                variant.pos,
                final_acceptor,
                final_donor,
            ) {
                registry.insert(context);
            }
        }
        Ok(())
    }
}

fn registry_already_covers(
    registry: &VariantContextRegistry,
    variant: &crate::readers::DonorVariant,
) -> bool {
    match variant.kind {
        VariantKind::Snp => registry.contains_point(&variant.chrom, variant.pos),
        VariantKind::Indel => registry.overlaps_range(
            &variant.chrom,
            variant.search_start,
            variant.search_end - 1,
        ),
    }
}
