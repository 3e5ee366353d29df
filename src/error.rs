//! Error types for threefry-engine

use crate::runtime::ContextId;
use thiserror::Error;

/// Result type alias using threefry-engine's Error
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while mixing, building or dispatching
#[derive(Error, Debug)]
pub enum Error {
    /// Round count outside `[0, 32]`
    #[error("Invalid round count {rounds}: must be in [0, 32]")]
    InvalidRoundCount {
        /// The rejected round count
        rounds: i64,
    },

    /// The device toolchain rejected the synthesized kernel source
    #[error("Kernel build failed:\n{diagnostic}")]
    BuildFailure {
        /// Compiler diagnostic, verbatim
        diagnostic: String,
    },

    /// Invalid argument binding at dispatch time
    #[error("Invalid argument '{arg}': {reason}")]
    ArgumentError {
        /// The argument name
        arg: &'static str,
        /// Reason for invalidity
        reason: String,
    },

    /// Queue or buffer belongs to a different context than the engine
    #[error("Context mismatch: engine is bound to {expected}, got {got}")]
    ContextMismatch {
        /// Context the engine was built against
        expected: ContextId,
        /// Context of the offending queue or buffer
        got: ContextId,
    },

    /// A reference vector did not reproduce
    #[error(
        "Threefry2x{width} self test failed at vector {index}: expected {expected:#018x}, got {got:#018x}"
    )]
    SelfTest {
        /// Word width in bits
        width: u32,
        /// Index of the failing vector
        index: usize,
        /// Expected packed output
        expected: u64,
        /// Actual packed output
        got: u64,
    },

    /// Backend-specific error
    #[error("Backend error: {0}")]
    Backend(String),

    /// Generic internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Create an argument error
    pub fn argument(arg: &'static str, reason: impl Into<String>) -> Self {
        Self::ArgumentError {
            arg,
            reason: reason.into(),
        }
    }

    /// Create a build failure carrying the compiler diagnostic
    pub fn build_failure(diagnostic: impl Into<String>) -> Self {
        Self::BuildFailure {
            diagnostic: diagnostic.into(),
        }
    }

    /// Create a context mismatch error
    pub fn context_mismatch(expected: ContextId, got: ContextId) -> Self {
        Self::ContextMismatch { expected, got }
    }

    /// Returns true if the error is a caller contract violation
    /// (rather than a device or build failure).
    pub fn is_contract_violation(&self) -> bool {
        matches!(
            self,
            Self::InvalidRoundCount { .. } | Self::ArgumentError { .. } | Self::ContextMismatch { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_contract_violations() {
        let a = ContextId::next();
        let b = ContextId::next();
        assert!(Error::InvalidRoundCount { rounds: 33 }.is_contract_violation());
        assert!(Error::argument("count", "too large").is_contract_violation());
        assert!(Error::context_mismatch(a, b).is_contract_violation());
        assert!(!Error::build_failure("boom").is_contract_violation());
        assert!(!Error::Backend("lost device".into()).is_contract_violation());
    }

    #[test]
    fn test_build_failure_keeps_diagnostic_verbatim() {
        let diag = "<source>:3:7: error: use of undeclared identifier 'x'";
        let msg = Error::build_failure(diag).to_string();
        assert!(msg.ends_with(diag));
    }
}
