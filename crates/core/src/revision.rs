//! Optimistic concurrency on stored records.

use crate::error::{DomainError, DomainResult};

/// Revision a writer expects a record to be at before overwriting it.
///
/// Revision `0` means "record absent".
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ExpectedRevision {
    /// Skip the check (seeding, session pointer).
    Any,
    /// Require the record to be at an exact revision.
    Exact(u64),
}

impl ExpectedRevision {
    pub fn matches(self, actual: u64) -> bool {
        match self {
            ExpectedRevision::Any => true,
            ExpectedRevision::Exact(v) => v == actual,
        }
    }

    pub fn check(self, actual: u64) -> DomainResult<()> {
        if self.matches(actual) {
            Ok(())
        } else {
            Err(DomainError::conflict(format!(
                "revision check failed (expected: {self:?}, actual: {actual})"
            )))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exact_revision_must_match() {
        assert!(ExpectedRevision::Exact(3).check(3).is_ok());
        assert!(matches!(
            ExpectedRevision::Exact(3).check(4),
            Err(DomainError::Conflict(_))
        ));
        assert!(ExpectedRevision::Any.matches(42));
    }
}
