//! Error taxonomy for the core engine.
//!
//! Every error is fatal to the block being processed; none are retried
//! inside the core (see spec §7). The driver discards partial output for
//! the failing block and surfaces the error to its caller.

use thiserror::Error;

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, GabacError>;

/// The five error kinds named by the core's error handling design.
#[derive(Debug, Error)]
pub enum GabacError {
    /// An enum value was out of range, a parameter count did not match
    /// the binarization, or `word_size` was not in `{1, 2, 4, 8}`.
    #[error("invalid configuration: {0}")]
    ConfigInvalid(String),

    /// A symbol value exceeded the representable range of its
    /// binarization and parameter.
    #[error("value {value} out of range for {binarization} (param={param:?}): {reason}")]
    OutOfRange {
        value: u64,
        binarization: &'static str,
        param: Option<u32>,
        reason: String,
    },

    /// The bit input stream was exhausted before the expected symbol
    /// count was reached.
    #[error("truncated input: expected {expected} more bits/symbols, stream exhausted")]
    Truncated { expected: usize },

    /// The underlying reader/writer collaborator failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// An invariant the core guarantees was violated. Should never fire;
    /// treat as an abort.
    #[error("internal invariant violated: {0}")]
    Internal(&'static str),
}
