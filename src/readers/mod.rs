//! Thin wrappers around `rust-htslib` for indexed alignment and variant
//! file access.

pub mod bam;
pub mod vcf;

pub use bam::{BamReader, RetrievedReads};
pub use vcf::{DonorVariant, VcfReader};
