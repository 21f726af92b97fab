use strum_macros::{AsRefStr, Display, EnumIter, EnumString};

/// Cohort codes: year (FY/SY/TY) followed by the branch.
#[allow(clippy::upper_case_acronyms)]
#[derive(Debug, Copy, Clone, Eq, PartialEq, Display, EnumString, EnumIter, AsRefStr)]
pub enum Batch {
    TYECO,
    TYCSO,
    TYMEO,
    TYEEO,
    SYECO,
    SYCSO,
    SYMEO,
    SYEEO,
    FYECO,
    FYCSO,
    FYMEO,
    FYEEO,
}

pub fn is_known(code: &str) -> bool {
    code.parse::<Batch>().is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use strum::IntoEnumIterator;

    #[test]
    fn knows_every_cohort() {
        assert_eq!(Batch::iter().count(), 12);
        for batch in Batch::iter() {
            assert!(is_known(batch.as_ref()));
        }
    }

    #[test]
    fn rejects_unknown_or_lowercase_codes() {
        assert!(is_known("FYCSO"));
        assert!(!is_known("fycso"));
        assert!(!is_known("XYZ"));
        assert!(!is_known(""));
    }
}
