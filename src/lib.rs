//! ccsig: calling-cards promoter significance
//!
//! Counts transposon insertions ("hops") inside promoter regions and
//! scores each promoter for each experiment against each background
//! insertion set.
//!
//! # Features
//!
//! - **Batched counting**: one sorted-window pass per promoter counts all
//!   experiments (or backgrounds) at once
//! - **Parallel processing**: promoters are scored on the Rayon pool
//! - **Reproducible output**: rows sorted by promoter, experiment and
//!   background; floats written in shortest round-trip form
//!
//! # Example
//!
//! ```rust,no_run
//! use ccsig::chrom::ChromMap;
//! use ccsig::pipeline::{SignificancePipeline, SignificanceQuery};
//! use ccsig::table;
//!
//! let chroms = ChromMap::new();
//! let experiments = table::read_experiments("experiments.tsv").unwrap();
//! let hops = table::read_events("hops.tsv", &chroms, Some("cc_v1")).unwrap();
//! let background = table::read_events("background.tsv", &chroms, None).unwrap();
//! let promoters = table::read_promoters("promoters.tsv", &chroms).unwrap();
//!
//! let query = SignificanceQuery::new("cc_v1", vec!["adh1".to_string()]);
//! let rows = SignificancePipeline::default()
//!     .run(&query, &experiments, &hops, &background, &promoters)
//!     .unwrap();
//! ```

pub mod chrom;
pub mod config;
pub mod count;
pub mod error;
pub mod index;
pub mod interval;
pub mod output;
pub mod pipeline;
pub mod stats;
pub mod table;

// Re-export commonly used types
pub use count::{count_events, total_counts, CountRecord, CountTable};
pub use error::{QuantError, Result};
pub use index::EventIndex;
pub use interval::{Experiment, InsertionEvent, PromoterRegion, Strand};
pub use pipeline::{SignificancePipeline, SignificanceQuery, SignificanceRow};

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::chrom::ChromMap;
    pub use crate::config::QuantConfig;
    pub use crate::count::{count_events, total_counts, CountRecord, CountTable};
    pub use crate::error::{QuantError, Result};
    pub use crate::index::EventIndex;
    pub use crate::interval::{Experiment, InsertionEvent, PromoterRegion, Strand};
    pub use crate::output::TableWriter;
    pub use crate::pipeline::{SignificancePipeline, SignificanceQuery, SignificanceRow};
    pub use crate::stats::{enrichment, hypergeom_pval, poisson_pval};
}
