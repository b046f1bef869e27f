//! Runtime limits and query defaults for significance runs.

/// Pseudocount applied to enrichment and Poisson p-values when a query
/// does not set one.
pub const DEFAULT_QUERY_PSEUDOCOUNT: f64 = 0.2;

/// Upper bound on promoters × experiments × background sources.
pub const DEFAULT_MAX_ROWS: u64 = 50_000_000;

/// Minimum number of promoters before counting runs on the rayon pool.
/// Below this, thread dispatch costs more than the counting itself.
pub const PARALLEL_THRESHOLD: usize = 256;

/// Engine limits, independent of any single query.
///
/// ```
/// use ccsig::config::QuantConfig;
///
/// let config = QuantConfig::default().with_max_rows(1_000);
/// assert_eq!(config.max_rows, 1_000);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuantConfig {
    /// Reject queries whose cross product exceeds this many rows.
    pub max_rows: u64,
    /// Promoter count at which counting switches to parallel.
    pub parallel_threshold: usize,
}

impl Default for QuantConfig {
    fn default() -> Self {
        Self {
            max_rows: DEFAULT_MAX_ROWS,
            parallel_threshold: PARALLEL_THRESHOLD,
        }
    }
}

impl QuantConfig {
    pub fn with_max_rows(mut self, max_rows: u64) -> Self {
        self.max_rows = max_rows;
        self
    }

    pub fn with_parallel_threshold(mut self, threshold: usize) -> Self {
        self.parallel_threshold = threshold;
        self
    }

    /// Whether `promoters` promoters should be processed in parallel.
    #[inline]
    pub fn use_parallel(&self, promoters: usize) -> bool {
        promoters >= self.parallel_threshold
    }
}
