//! Post-run verification of a transfer.
//!
//! [`verify`] compares the source snapshot with the final destination using three independent
//! checks, so that a bug in one of them cannot hide a broken transfer on its own.

use std::fmt;

/// The individual checks performed by [`verify`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CheckKind {
    /// Source and destination hold the same number of items.
    LengthMatch,
    /// Source and destination are equal index by index.
    OrderPreserved,
    /// Source and destination are equal once both are sorted.
    AllElementsPresent,
}

impl CheckKind {
    pub fn name(&self) -> &'static str {
        match self {
            CheckKind::LengthMatch => "Length match",
            CheckKind::OrderPreserved => "Order preserved",
            CheckKind::AllElementsPresent => "All elements present",
        }
    }
}

/// Outcome of one check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CheckOutcome {
    pub kind: CheckKind,
    pub passed: bool,
}

/// Result of verifying a transfer, with the outcome of every check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerificationReport {
    checks: [CheckOutcome; 3],
    source_len: usize,
    destination_len: usize,
}

impl VerificationReport {
    /// Returns `true` if every check passed.
    pub fn passed(&self) -> bool {
        self.checks.iter().all(|check| check.passed)
    }

    pub fn checks(&self) -> &[CheckOutcome] {
        &self.checks
    }

    /// Returns whether the given check passed.
    pub fn check(&self, kind: CheckKind) -> bool {
        self.checks
            .iter()
            .any(|check| check.kind == kind && check.passed)
    }

    /// Returns the checks that failed.
    pub fn failed_checks(&self) -> impl Iterator<Item = CheckKind> + '_ {
        self.checks
            .iter()
            .filter(|check| !check.passed)
            .map(|check| check.kind)
    }

    pub fn source_len(&self) -> usize {
        self.source_len
    }

    pub fn destination_len(&self) -> usize {
        self.destination_len
    }
}

impl fmt::Display for VerificationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Verification Results")?;
        for check in &self.checks {
            let marker = if check.passed { "ok" } else { "FAILED" };
            writeln!(f, "  [{marker}] {}", check.kind.name())?;
        }

        let result = if self.passed() { "PASSED" } else { "FAILED" };
        writeln!(f, "Result: {result}")?;
        writeln!(f, "  Source: {} items", self.source_len)?;
        write!(f, "  Destination: {} items", self.destination_len)
    }
}

/// Verifies that `destination` is an exact, order-preserving copy of `source`.
///
/// Only reads both slices. The multiset check sorts references, so items are never cloned.
pub fn verify<T: Ord>(source: &[T], destination: &[T]) -> VerificationReport {
    let length_match = source.len() == destination.len();
    let order_preserved = source == destination;

    let mut sorted_source: Vec<&T> = source.iter().collect();
    let mut sorted_destination: Vec<&T> = destination.iter().collect();
    sorted_source.sort();
    sorted_destination.sort();
    let all_elements_present = sorted_source == sorted_destination;

    VerificationReport {
        checks: [
            CheckOutcome {
                kind: CheckKind::LengthMatch,
                passed: length_match,
            },
            CheckOutcome {
                kind: CheckKind::OrderPreserved,
                passed: order_preserved,
            },
            CheckOutcome {
                kind: CheckKind::AllElementsPresent,
                passed: all_elements_present,
            },
        ],
        source_len: source.len(),
        destination_len: destination.len(),
    }
}
