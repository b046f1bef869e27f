//! Error taxonomy for the quantification engine and its table reader.

use std::io;
use thiserror::Error;

/// Errors raised while loading tables or computing promoter significance.
#[derive(Error, Debug)]
pub enum QuantError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("Parse error at line {line}: {message}")]
    Parse { line: usize, message: String },

    #[error("Invalid interval '{id}': start ({start}) > end ({end})")]
    InvalidInterval { id: String, start: u64, end: u64 },

    #[error("Invalid count for {name}: '{value}' (expected a non-negative integer)")]
    InvalidCount { name: String, value: String },

    #[error("Invalid pseudocount {0}: must be finite and greater than zero")]
    InvalidPseudocount(f64),

    #[error("Invalid query: {0}")]
    InvalidQuery(String),

    #[error("No matching experiments for query")]
    NoMatchingExperiments,

    #[error("No matching promoters for query")]
    NoMatchingPromoters,

    #[error("Query expands to {rows} result rows, above the limit of {limit}")]
    TooManyCombinations { rows: u128, limit: u64 },

    #[error("Distribution error: {0}")]
    Distribution(String),
}

impl QuantError {
    /// True for the "query selected nothing" conditions, as opposed to
    /// malformed input or failed computation.
    pub fn is_no_data(&self) -> bool {
        matches!(
            self,
            QuantError::NoMatchingExperiments | QuantError::NoMatchingPromoters
        )
    }
}

pub type Result<T> = std::result::Result<T, QuantError>;
