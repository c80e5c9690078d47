//! Common functionality shared across the builder, registry, and CLI layers.

pub mod io;

/// Strip a leading `chr` prefix, if any, so `"chr1"` and `"1"` compare equal.
pub fn normalize_chrom(raw: &str) -> String {
    let stripped = raw.strip_prefix("chr").unwrap_or(raw);
    if stripped.eq_ignore_ascii_case("m") {
        "MT".to_owned()
    } else {
        stripped.to_owned()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[rstest::rstest]
    #[case("chr1", "1")]
    #[case("1", "1")]
    #[case("chrX", "X")]
    #[case("chrM", "MT")]
    #[case("MT", "MT")]
    fn normalize_chrom_cases(#[case] input: &str, #[case] expected: &str) {
        assert_eq!(normalize_chrom(input), expected);
    }
}
