//! Core domain value types: a read, a one-sided overlap, and a merged
//! variant context.

pub mod aligned_read;
pub mod overlap;
pub mod variant_context;

pub use aligned_read::{AlignedRead, PairNumber};
pub use overlap::OverlapInterval;
pub use variant_context::{VariantContext, VariantKind};
