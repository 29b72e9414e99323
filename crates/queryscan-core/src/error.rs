//! Error types for the analysis engine.
//!
//! # Error Handling Strategy
//!
//! The engine is deliberately hard to fail: malformed or dialect-foreign SQL
//! degrades to partial extraction (empty lists, `"unknown"` placeholders)
//! rather than an error, because static analysis has to work on best-effort,
//! possibly non-compiling snippets.
//!
//! Only two conditions propagate to the caller as [`EngineError`]:
//!
//! - [`EngineError::EmptyInput`]: the input contains no SQL at all.
//! - [`EngineError::RecursionLimitExceeded`]: parenthesis nesting went past
//!   the configured bound, which is only reachable with pathological or
//!   adversarial input.

use thiserror::Error;

/// Fatal errors returned by the analysis entry points.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EngineError {
    /// The input was empty, whitespace-only, or contained only comments.
    #[error("input contains no SQL statements")]
    EmptyInput,

    /// Parenthesis nesting exceeded the configured bound during extraction.
    #[error("nesting depth exceeded the configured limit of {limit}")]
    RecursionLimitExceeded {
        /// The bound that was in effect, from [`crate::AnalysisOptions`].
        limit: usize,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_empty_input() {
        assert_eq!(
            EngineError::EmptyInput.to_string(),
            "input contains no SQL statements"
        );
    }

    #[test]
    fn test_display_recursion_limit() {
        let err = EngineError::RecursionLimitExceeded { limit: 64 };
        assert_eq!(
            err.to_string(),
            "nesting depth exceeded the configured limit of 64"
        );
    }

    #[test]
    fn test_error_trait() {
        let err = EngineError::EmptyInput;
        let _: &dyn std::error::Error = &err;
    }
}
