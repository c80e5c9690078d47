//! Donor variant streaming from an indexed VCF/BCF file.
//!
//! Classifies each variant as a SNP or indel by allele length and derives
//! its read-search window: a one-base-padded window for a SNP, a window
//! as wide as the longest allele for an indel.

use anyhow::{Context, Result};
use rust_htslib::bcf::{IndexedReader, Read as _};

use crate::common::normalize_chrom;
use crate::model::VariantKind;

/// One donor variant, already classified and windowed.
#[derive(Debug, Clone)]
pub struct DonorVariant {
    pub chrom: String,
    /// 0-based position.
    pub pos: i64,
    pub kind: VariantKind,
    /// Half-open search window, `[start, end)`.
    pub search_start: i64,
    pub search_end: i64,
}

fn is_acgt(allele: &[u8]) -> bool {
    !allele.is_empty() && allele.iter().all(|b| matches!(b.to_ascii_uppercase(), b'A' | b'C' | b'G' | b'T'))
}

/// Classifies a variant's alleles, returning `None` (with the caller
/// expected to log a warning) for anything touching a non-ACGT allele.
fn classify(pos: i64, alleles: &[&[u8]]) -> Option<(VariantKind, i64, i64)> {
    if alleles.iter().any(|a| !is_acgt(a)) {
        return None;
    }
    let max_len = alleles.iter().map(|a| a.len()).max().unwrap_or(1) as i64;
    if max_len <= 1 {
        Some((VariantKind::Snp, pos - 1, pos + 1))
    } else {
        Some((VariantKind::Indel, pos, pos + max_len))
    }
}

pub struct VcfReader {
    reader: IndexedReader,
}

impl VcfReader {
    pub fn new<P: AsRef<std::path::Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let reader = IndexedReader::from_path(path)
            .with_context(|| format!("opening indexed variant file {path:?}"))?;
        Ok(Self { reader })
    }

    /// Streams every classifiable variant in the file, in on-disk record
    /// order. Variants with a non-ACGT allele are skipped with a warning.
    pub fn variants(&mut self) -> Result<Vec<DonorVariant>> {
        let header = self.reader.header().clone();
        let mut out = Vec::new();
        for record_result in self.reader.records() {
            let record = record_result.context("reading variant record")?;
            let Some(rid) = record.rid() else { continue };
            let chrom = normalize_chrom(&String::from_utf8_lossy(header.rid2name(rid)?));
            let pos = record.pos();
            let alleles = record.alleles();
            match classify(pos, &alleles) {
                Some((kind, search_start, search_end)) => {
                    out.push(DonorVariant { chrom, pos, kind, search_start, search_end });
                }
                None => {
                    tracing::warn!(
                        "skipping variant at {chrom}:{} with non-ACGT allele",
                        pos + 1
                    );
                }
            }
        }
        Ok(out)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn snp_window_is_one_base_padded() {
        let (kind, s, e) = classify(999, &[b"A", b"T"]).unwrap();
        assert_eq!(kind, VariantKind::Snp);
        assert_eq!((s, e), (998, 1000));
    }

    #[test]
    fn indel_window_uses_longest_allele() {
        let (kind, s, e) = classify(499, &[b"A", b"ATTTTT"]).unwrap();
        assert_eq!(kind, VariantKind::Indel);
        assert_eq!((s, e), (499, 505));
    }

    #[test]
    fn non_acgt_allele_is_skipped() {
        assert!(classify(10, &[b"A", b"<DEL>"]).is_none());
        assert!(classify(10, &[b"A", b"."]).is_none());
    }
}
