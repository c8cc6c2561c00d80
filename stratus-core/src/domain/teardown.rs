//! Teardown state machine states

use serde::{Deserialize, Serialize};
use std::fmt;

/// Literal answer accepted at both teardown confirmation gates
pub const AFFIRMATIVE: &str = "yes";

/// States of a teardown run
///
/// `AwaitConfirm1 → PlanDestroy → AwaitConfirm2 → EmptyingBlockers →
/// Destroying → Done`, with `Aborted` reachable from either gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TeardownState {
    AwaitConfirm1,
    PlanDestroy,
    AwaitConfirm2,
    EmptyingBlockers,
    Destroying,
    Done,
    Aborted,
}

impl fmt::Display for TeardownState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

/// Whether an operator answer passes a confirmation gate
///
/// Only the exact literal passes; the trailing line terminator from a
/// terminal read is dropped, nothing else is normalised.
pub fn is_affirmative(answer: &str) -> bool {
    answer.trim_end_matches(['\n', '\r']) == AFFIRMATIVE
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_affirmative_is_exact() {
        assert!(is_affirmative("yes"));
        assert!(is_affirmative("yes\n"));
        assert!(is_affirmative("yes\r\n"));
        assert!(!is_affirmative("y"));
        assert!(!is_affirmative("YES"));
        assert!(!is_affirmative(" yes"));
        assert!(!is_affirmative("yes please"));
        assert!(!is_affirmative(""));
    }
}
