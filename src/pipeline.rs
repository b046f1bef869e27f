//! Promoter significance pipeline.
//!
//! Joins every selected promoter against every selected experiment and
//! every requested background source:
//!
//! 1. total hops per experiment id and per background source;
//! 2. one event index per table, restricted to the requested groups;
//! 3. per promoter, a single windowed pass per index yields hops for all
//!    groups at once, missing groups reading as zero;
//! 4. experiment × background cross product, scored with [`crate::stats`];
//! 5. rows sorted by promoter id, experiment id, background source.
//!
//! Promoters are processed on the rayon pool once there are at least
//! [`QuantConfig::parallel_threshold`] of them. Output order does not
//! depend on the thread count.

use crate::config::{QuantConfig, DEFAULT_QUERY_PSEUDOCOUNT};
use crate::count::CountTable;
use crate::error::{QuantError, Result};
use crate::index::EventIndex;
use crate::interval::{Experiment, InsertionEvent, PromoterRegion};
use crate::stats::{enrichment, hypergeom_pval, poisson_pval};
use log::{debug, info, warn};
use rayon::prelude::*;
use std::time::Instant;

/// Which experiments, backgrounds and promoters to score.
#[derive(Debug, Clone, PartialEq)]
pub struct SignificanceQuery {
    /// Select exactly one experiment. Excludes the set filters below.
    pub experiment_id: Option<String>,
    pub experiment_batch: Option<String>,
    pub tf_id: Option<String>,
    pub tf_locus_tag: Option<String>,
    pub tf_gene: Option<String>,
    /// Insertion pipeline the experiment hops came from; reported on
    /// every row.
    pub hops_source: String,
    /// Background sources to score against. At least one.
    pub background_sources: Vec<String>,
    /// Promoter sets to include. Empty means every promoter.
    pub promoter_sources: Vec<String>,
    pub consider_strand: bool,
    pub pseudocount: f64,
}

impl SignificanceQuery {
    pub fn new(hops_source: impl Into<String>, background_sources: Vec<String>) -> Self {
        Self {
            experiment_id: None,
            experiment_batch: None,
            tf_id: None,
            tf_locus_tag: None,
            tf_gene: None,
            hops_source: hops_source.into(),
            background_sources,
            promoter_sources: Vec::new(),
            consider_strand: false,
            pseudocount: DEFAULT_QUERY_PSEUDOCOUNT,
        }
    }

    fn has_set_filter(&self) -> bool {
        self.experiment_batch.is_some()
            || self.tf_id.is_some()
            || self.tf_locus_tag.is_some()
            || self.tf_gene.is_some()
    }

    /// Reject contradictory or incomplete queries.
    pub fn validate(&self) -> Result<()> {
        if self.experiment_id.is_some() && self.has_set_filter() {
            return Err(QuantError::InvalidQuery(
                "experiment_id cannot be combined with \
                 experiment_batch, tf_id, tf_locus_tag or tf_gene"
                    .to_string(),
            ));
        }
        if self.background_sources.is_empty() {
            return Err(QuantError::InvalidQuery(
                "at least one background source is required".to_string(),
            ));
        }
        if !(self.pseudocount.is_finite() && self.pseudocount > 0.0) {
            return Err(QuantError::InvalidPseudocount(self.pseudocount));
        }
        Ok(())
    }

    /// True when `experiment` passes the experiment filters.
    pub fn selects_experiment(&self, experiment: &Experiment) -> bool {
        fn matches(filter: &Option<String>, value: &str) -> bool {
            filter.as_deref().is_none_or(|wanted| wanted == value)
        }

        matches(&self.experiment_id, &experiment.id)
            && matches(&self.experiment_batch, &experiment.batch)
            && matches(&self.tf_id, &experiment.tf_id)
            && matches(&self.tf_locus_tag, &experiment.tf_locus_tag)
            && matches(&self.tf_gene, &experiment.tf_gene)
    }

    /// True when `promoter` belongs to a requested promoter set.
    pub fn selects_promoter(&self, promoter: &PromoterRegion) -> bool {
        self.promoter_sources.is_empty() || self.promoter_sources.contains(&promoter.source)
    }
}

/// One promoter scored for one experiment against one background source.
#[derive(Debug, Clone, PartialEq)]
pub struct SignificanceRow {
    pub promoter_id: String,
    pub target_gene_id: String,
    pub promoter_source: String,
    pub experiment_id: String,
    pub experiment_batch: String,
    pub experiment_replicate: u32,
    pub tf_id: String,
    pub hops_source: String,
    pub experiment_hops: u64,
    pub experiment_total_hops: u64,
    pub background_source: String,
    pub background_hops: u64,
    pub background_total_hops: u64,
    pub enrichment: f64,
    pub poisson_pval: f64,
    pub hypergeometric_pval: f64,
}

/// Borrowed state shared by every promoter in one run.
struct JoinContext<'a> {
    query: &'a SignificanceQuery,
    experiments: &'a [&'a Experiment],
    backgrounds: &'a [String],
    experiment_index: EventIndex,
    background_index: EventIndex,
    experiment_totals: CountTable,
    background_totals: CountTable,
}

impl JoinContext<'_> {
    fn promoter_rows(&self, promoter: &PromoterRegion) -> Result<Vec<SignificanceRow>> {
        let consider_strand = self.query.consider_strand;
        let pseudocount = self.query.pseudocount;

        let experiment_hops = self
            .experiment_index
            .count_by_group(promoter, consider_strand);
        let background_hops = self
            .background_index
            .count_by_group(promoter, consider_strand);

        let mut rows = Vec::with_capacity(self.experiments.len() * self.backgrounds.len());

        for (experiment, &expr_count) in self.experiments.iter().zip(&experiment_hops) {
            let expr_total = self.experiment_totals.total(&experiment.id);

            for (background, &bg_count) in self.backgrounds.iter().zip(&background_hops) {
                let bg_total = self.background_totals.total(background);

                let enrichment =
                    enrichment(bg_total, expr_total, bg_count, expr_count, pseudocount)?;
                let poisson_pval =
                    poisson_pval(bg_total, expr_total, bg_count, expr_count, pseudocount)?;
                let hypergeometric_pval =
                    hypergeom_pval(bg_total, expr_total, bg_count, expr_count)?;

                rows.push(SignificanceRow {
                    promoter_id: promoter.id.clone(),
                    target_gene_id: promoter.target_gene_id.clone(),
                    promoter_source: promoter.source.clone(),
                    experiment_id: experiment.id.clone(),
                    experiment_batch: experiment.batch.clone(),
                    experiment_replicate: experiment.replicate,
                    tf_id: experiment.tf_id.clone(),
                    hops_source: self.query.hops_source.clone(),
                    experiment_hops: expr_count,
                    experiment_total_hops: expr_total,
                    background_source: background.clone(),
                    background_hops: bg_count,
                    background_total_hops: bg_total,
                    enrichment,
                    poisson_pval,
                    hypergeometric_pval,
                });
            }
        }

        Ok(rows)
    }
}

/// Computes [`SignificanceRow`]s from in-memory tables.
#[derive(Debug, Clone, Default)]
pub struct SignificancePipeline {
    pub config: QuantConfig,
}

impl SignificancePipeline {
    pub fn new(config: QuantConfig) -> Self {
        Self { config }
    }

    /// Score every selected promoter for every selected experiment against
    /// every requested background source.
    ///
    /// `experiment_events` are grouped by experiment id and
    /// `background_events` by background source. Events of unselected
    /// groups are ignored for counting but still count towards totals.
    ///
    /// Fails with [`QuantError::NoMatchingExperiments`] or
    /// [`QuantError::NoMatchingPromoters`] when the query selects nothing,
    /// and aborts on the first metric error.
    pub fn run(
        &self,
        query: &SignificanceQuery,
        experiments: &[Experiment],
        experiment_events: &[InsertionEvent],
        background_events: &[InsertionEvent],
        promoters: &[PromoterRegion],
    ) -> Result<Vec<SignificanceRow>> {
        let started = Instant::now();
        query.validate()?;

        let mut selected: Vec<&Experiment> = experiments
            .iter()
            .filter(|e| query.selects_experiment(e))
            .collect();
        selected.sort_by(|a, b| a.id.cmp(&b.id));
        selected.dedup_by(|a, b| a.id == b.id);
        if selected.is_empty() {
            return Err(QuantError::NoMatchingExperiments);
        }

        let selected_promoters: Vec<&PromoterRegion> = promoters
            .iter()
            .filter(|p| query.selects_promoter(p))
            .collect();
        if selected_promoters.is_empty() {
            return Err(QuantError::NoMatchingPromoters);
        }
        for promoter in &selected_promoters {
            promoter.validate()?;
        }

        let mut backgrounds = query.background_sources.clone();
        backgrounds.sort_unstable();
        backgrounds.dedup();

        let row_count =
            selected_promoters.len() as u128 * selected.len() as u128 * backgrounds.len() as u128;
        if row_count > self.config.max_rows as u128 {
            return Err(QuantError::TooManyCombinations {
                rows: row_count,
                limit: self.config.max_rows,
            });
        }

        let experiment_totals = CountTable::from_events(experiment_events);
        let background_totals = CountTable::from_events(background_events);
        for background in &backgrounds {
            if !background_totals.contains(background) {
                warn!("Background source '{}' has no hops", background);
            }
        }
        for experiment in &selected {
            if !experiment_totals.contains(&experiment.id) {
                warn!(
                    "Experiment '{}' has no hops for source '{}'",
                    experiment.id, query.hops_source
                );
            }
        }

        let experiment_ids: Vec<String> = selected.iter().map(|e| e.id.clone()).collect();
        let context = JoinContext {
            query,
            experiments: &selected,
            backgrounds: &backgrounds,
            experiment_index: EventIndex::build(experiment_events, &experiment_ids),
            background_index: EventIndex::build(background_events, &backgrounds),
            experiment_totals,
            background_totals,
        };
        debug!(
            "Indexed {} experiment hops and {} background hops",
            context.experiment_index.len(),
            context.background_index.len()
        );

        let per_promoter: Vec<Vec<SignificanceRow>> =
            if self.config.use_parallel(selected_promoters.len()) {
                selected_promoters
                    .par_iter()
                    .map(|p| context.promoter_rows(p))
                    .collect::<Result<_>>()?
            } else {
                selected_promoters
                    .iter()
                    .map(|p| context.promoter_rows(p))
                    .collect::<Result<_>>()?
            };

        let mut rows: Vec<SignificanceRow> = per_promoter.into_iter().flatten().collect();
        rows.sort_by(|a, b| {
            a.promoter_id
                .cmp(&b.promoter_id)
                .then_with(|| a.experiment_id.cmp(&b.experiment_id))
                .then_with(|| a.background_source.cmp(&b.background_source))
        });

        info!(
            "Scored {} promoters x {} experiments x {} backgrounds = {} rows in {:.2}s",
            selected_promoters.len(),
            selected.len(),
            backgrounds.len(),
            rows.len(),
            started.elapsed().as_secs_f64()
        );

        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interval::Strand;

    fn experiment(id: &str, batch: &str, tf: &str) -> Experiment {
        Experiment {
            id: id.to_string(),
            batch: batch.to_string(),
            replicate: 1,
            tf_id: tf.to_string(),
            tf_locus_tag: format!("Y{}", tf),
            tf_gene: format!("TF{}", tf),
        }
    }

    fn promoter(id: &str, start: u64, end: u64, source: &str) -> PromoterRegion {
        PromoterRegion::new(id, "chrI", start, end, Strand::Plus, format!("gene_{}", id), source)
            .unwrap()
    }

    fn hop(position: u64, strand: Strand, group: &str) -> InsertionEvent {
        InsertionEvent::new("chrI", position, strand, group)
    }

    fn query() -> SignificanceQuery {
        SignificanceQuery::new("cc_v1", vec!["adh1".to_string()])
    }

    #[test]
    fn test_query_validation() {
        let mut q = query();
        q.experiment_id = Some("1".into());
        q.tf_id = Some("7".into());
        assert!(matches!(q.validate(), Err(QuantError::InvalidQuery(_))));

        let mut q = query();
        q.background_sources.clear();
        assert!(matches!(q.validate(), Err(QuantError::InvalidQuery(_))));

        let mut q = query();
        q.pseudocount = 0.0;
        assert!(matches!(q.validate(), Err(QuantError::InvalidPseudocount(_))));

        assert!(query().validate().is_ok());
    }

    #[test]
    fn test_experiment_selection() {
        let mut q = query();
        let e = experiment("1", "run_1", "7");
        assert!(q.selects_experiment(&e));

        q.experiment_batch = Some("run_1".into());
        q.tf_gene = Some("TF7".into());
        assert!(q.selects_experiment(&e));

        q.tf_gene = Some("TF8".into());
        assert!(!q.selects_experiment(&e));
    }

    #[test]
    fn test_three_hops_zero_background() {
        let experiments = vec![experiment("1", "run_1", "7")];
        let expr = vec![
            hop(110, Strand::Plus, "1"),
            hop(150, Strand::Minus, "1"),
            hop(200, Strand::Plus, "1"),
            hop(5_000, Strand::Plus, "1"),
        ];
        let bg = vec![hop(9_000, Strand::Plus, "adh1")];
        let promoters = vec![promoter("p1", 100, 200, "yiming")];

        let rows = SignificancePipeline::default()
            .run(&query(), &experiments, &expr, &bg, &promoters)
            .unwrap();

        assert_eq!(rows.len(), 1);
        let row = &rows[0];
        assert_eq!(row.experiment_hops, 3);
        assert_eq!(row.experiment_total_hops, 4);
        assert_eq!(row.background_hops, 0);
        assert_eq!(row.background_total_hops, 1);
        assert_eq!(row.hops_source, "cc_v1");
        assert_eq!(row.target_gene_id, "gene_p1");
        assert!(row.enrichment > 1.0);
    }

    #[test]
    fn test_left_join_fills_zero() {
        let experiments = vec![experiment("1", "b", "7"), experiment("2", "b", "7")];
        let expr = vec![hop(150, Strand::Plus, "1")];
        let bg = vec![hop(150, Strand::Plus, "adh1")];
        let promoters = vec![promoter("p1", 100, 200, "s"), promoter("p2", 300, 400, "s")];

        let mut q = query();
        q.background_sources.push("never_seen".into());

        let rows = SignificancePipeline::default()
            .run(&q, &experiments, &expr, &bg, &promoters)
            .unwrap();

        assert_eq!(rows.len(), 2 * 2 * 2);
        let zero = rows
            .iter()
            .find(|r| {
                r.promoter_id == "p1" && r.experiment_id == "2" && r.background_source == "adh1"
            })
            .unwrap();
        assert_eq!(zero.experiment_hops, 0);
        assert_eq!(zero.experiment_total_hops, 0);
        assert_eq!(zero.background_hops, 1);

        let missing_bg = rows
            .iter()
            .find(|r| {
                r.promoter_id == "p1"
                    && r.experiment_id == "1"
                    && r.background_source == "never_seen"
            })
            .unwrap();
        assert_eq!(missing_bg.background_total_hops, 0);
        assert_eq!(missing_bg.hypergeometric_pval, hypergeom_pval(0, 1, 0, 1).unwrap());
    }

    #[test]
    fn test_rows_sorted() {
        let experiments = vec![experiment("b", "x", "1"), experiment("a", "x", "1")];
        let promoters = vec![promoter("p2", 1, 10, "s"), promoter("p1", 1, 10, "s")];
        let q = SignificanceQuery::new("cc", vec!["z".into(), "y".into()]);

        let rows = SignificancePipeline::default()
            .run(&q, &experiments, &[], &[], &promoters)
            .unwrap();

        let keys: Vec<(&str, &str, &str)> = rows
            .iter()
            .map(|r| {
                (
                    r.promoter_id.as_str(),
                    r.experiment_id.as_str(),
                    r.background_source.as_str(),
                )
            })
            .collect();
        assert_eq!(
            keys,
            vec![
                ("p1", "a", "y"),
                ("p1", "a", "z"),
                ("p1", "b", "y"),
                ("p1", "b", "z"),
                ("p2", "a", "y"),
                ("p2", "a", "z"),
                ("p2", "b", "y"),
                ("p2", "b", "z"),
            ]
        );
    }

    #[test]
    fn test_strand_aware_counting() {
        let experiments = vec![experiment("1", "b", "7")];
        let expr = vec![
            hop(150, Strand::Plus, "1"),
            hop(150, Strand::Minus, "1"),
            hop(160, Strand::Unstranded, "1"),
        ];
        let promoters = vec![promoter("p1", 100, 200, "s")];

        let mut q = query();
        let rows = SignificancePipeline::default()
            .run(&q, &experiments, &expr, &[], &promoters)
            .unwrap();
        assert_eq!(rows[0].experiment_hops, 3);

        q.consider_strand = true;
        let rows = SignificancePipeline::default()
            .run(&q, &experiments, &expr, &[], &promoters)
            .unwrap();
        assert_eq!(rows[0].experiment_hops, 2);
    }

    #[test]
    fn test_no_matching_experiments() {
        let mut q = query();
        q.experiment_id = Some("missing".into());
        let err = SignificancePipeline::default()
            .run(&q, &[experiment("1", "b", "7")], &[], &[], &[promoter("p1", 1, 2, "s")])
            .unwrap_err();
        assert!(matches!(err, QuantError::NoMatchingExperiments));
        assert!(err.is_no_data());
    }

    #[test]
    fn test_no_matching_promoters() {
        let mut q = query();
        q.promoter_sources = vec!["other".into()];
        let err = SignificancePipeline::default()
            .run(&q, &[experiment("1", "b", "7")], &[], &[], &[promoter("p1", 1, 2, "s")])
            .unwrap_err();
        assert!(matches!(err, QuantError::NoMatchingPromoters));
    }

    #[test]
    fn test_combination_bound() {
        let pipeline = SignificancePipeline::new(QuantConfig::default().with_max_rows(3));
        let promoters = vec![promoter("p1", 1, 2, "s"), promoter("p2", 1, 2, "s")];
        let q = SignificanceQuery::new("cc", vec!["a".into(), "b".into()]);

        let err = pipeline
            .run(&q, &[experiment("1", "b", "7")], &[], &[], &promoters)
            .unwrap_err();
        assert!(matches!(
            err,
            QuantError::TooManyCombinations { rows: 4, limit: 3 }
        ));
    }

    #[test]
    fn test_parallel_matches_sequential() {
        let experiments = vec![experiment("1", "b", "7"), experiment("2", "b", "7")];
        let expr: Vec<InsertionEvent> = (0..500)
            .map(|i| hop(i * 7, Strand::Plus, if i % 3 == 0 { "1" } else { "2" }))
            .collect();
        let bg: Vec<InsertionEvent> = (0..800).map(|i| hop(i * 5, Strand::Minus, "adh1")).collect();
        let promoters: Vec<PromoterRegion> = (0..40)
            .map(|i| promoter(&format!("p{:02}", i), i * 90, i * 90 + 120, "s"))
            .collect();

        let sequential_config = QuantConfig::default().with_parallel_threshold(usize::MAX);
        let sequential = SignificancePipeline::new(sequential_config)
            .run(&query(), &experiments, &expr, &bg, &promoters)
            .unwrap();
        let parallel = SignificancePipeline::new(QuantConfig::default().with_parallel_threshold(0))
            .run(&query(), &experiments, &expr, &bg, &promoters)
            .unwrap();

        assert_eq!(sequential, parallel);
    }

    #[test]
    fn test_inverted_promoter_literal_rejected() {
        let experiments = vec![experiment("1", "b", "7")];
        let expr = vec![hop(150, Strand::Plus, "1")];
        let inverted = PromoterRegion {
            id: "bad".into(),
            chrom: "chrI".into(),
            start: 200,
            end: 100,
            strand: Strand::Plus,
            target_gene_id: "g".into(),
            source: "s".into(),
        };

        let err = SignificancePipeline::default()
            .run(&query(), &experiments, &expr, &[], &[promoter("p1", 1, 2, "s"), inverted])
            .unwrap_err();
        assert!(matches!(
            err,
            QuantError::InvalidInterval { ref id, start: 200, end: 100 } if id == "bad"
        ));
    }
}
