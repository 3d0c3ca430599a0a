//! Per-kind status vocabularies.
//!
//! Builds report single-letter codes; services and components report a
//! `(is_final_status, is_succ)` pair that is trusted as-is.

use super::types::Phase;

/// Build finished successfully.
pub const BUILD_SUCCEEDED: &str = "S";
/// Build failed.
pub const BUILD_FAILED: &str = "F";
/// Build was deleted or cancelled.
pub const BUILD_DELETED: &str = "D";

/// Classify a build status code. Unknown codes keep the build running.
pub fn classify_build(code: &str) -> Phase {
    match code {
        BUILD_SUCCEEDED => Phase::TerminalSuccess,
        BUILD_FAILED | BUILD_DELETED => Phase::TerminalFailure,
        _ => Phase::NonTerminal,
    }
}

/// Classify a workload status flag pair as reported by the platform.
pub fn classify_flags(is_final_status: bool, is_succ: bool) -> Phase {
    match (is_final_status, is_succ) {
        (false, _) => Phase::NonTerminal,
        (true, true) => Phase::TerminalSuccess,
        (true, false) => Phase::TerminalFailure,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_build_codes() {
        assert_eq!(classify_build("S"), Phase::TerminalSuccess);
        assert_eq!(classify_build("F"), Phase::TerminalFailure);
        assert_eq!(classify_build("D"), Phase::TerminalFailure);
        assert_eq!(classify_build("B"), Phase::NonTerminal);
        assert_eq!(classify_build("W"), Phase::NonTerminal);
        assert_eq!(classify_build(""), Phase::NonTerminal);
    }

    #[test]
    fn test_build_codes_are_case_sensitive() {
        assert_eq!(classify_build("s"), Phase::NonTerminal);
    }

    #[test]
    fn test_flag_pair() {
        assert_eq!(classify_flags(false, false), Phase::NonTerminal);
        // A success flag on a non-final status is not trusted as terminal.
        assert_eq!(classify_flags(false, true), Phase::NonTerminal);
        assert_eq!(classify_flags(true, true), Phase::TerminalSuccess);
        assert_eq!(classify_flags(true, false), Phase::TerminalFailure);
    }

    proptest! {
        #[test]
        fn prop_unknown_build_code_is_non_terminal(code in "[A-Z]") {
            prop_assume!(code != "S" && code != "F" && code != "D");
            prop_assert_eq!(classify_build(&code), Phase::NonTerminal);
        }
    }
}
