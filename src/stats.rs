//! Promoter significance metrics.
//!
//! Every function takes the same four counts, in the same order:
//! background total hops, experiment total hops, background hops in the
//! promoter and experiment hops in the promoter. Counts are `u64`, so
//! negative or fractional counts cannot reach these functions; use
//! [`checked_count`] to convert counts that arrive as floating values.
//!
//! The pseudocount keeps the ratios finite when a total or a count is
//! zero. It must be finite and strictly positive.

use crate::error::{QuantError, Result};
use log::trace;
use statrs::distribution::{DiscreteCDF, Hypergeometric, Poisson};

/// Pseudocount used when calling the metric functions directly.
///
/// Significance queries default to
/// [`crate::config::DEFAULT_QUERY_PSEUDOCOUNT`] instead.
pub const DEFAULT_PSEUDOCOUNT: f64 = 1e-10;

/// Convert a count held as a float, rejecting negative, fractional and
/// non-finite values. `name` identifies the field in the error.
pub fn checked_count(name: &str, value: f64) -> Result<u64> {
    if !value.is_finite() || value < 0.0 || value.fract() != 0.0 || value > u64::MAX as f64 {
        return Err(QuantError::InvalidCount {
            name: name.to_string(),
            value: value.to_string(),
        });
    }
    Ok(value as u64)
}

#[inline]
fn check_pseudocount(pseudocount: f64) -> Result<()> {
    if pseudocount.is_finite() && pseudocount > 0.0 {
        Ok(())
    } else {
        Err(QuantError::InvalidPseudocount(pseudocount))
    }
}

/// Ratio of the experiment hop rate to the background hop rate in a
/// promoter.
///
/// `(expr_count / (expr_total + pc)) / (bg_count / (bg_total + pc) + pc)`
pub fn enrichment(
    bg_total: u64,
    expr_total: u64,
    bg_count: u64,
    expr_count: u64,
    pseudocount: f64,
) -> Result<f64> {
    check_pseudocount(pseudocount)?;

    let numerator = expr_count as f64 / (expr_total as f64 + pseudocount);
    let denominator = bg_count as f64 / (bg_total as f64 + pseudocount);
    Ok(numerator / (denominator + pseudocount))
}

/// Upper-tail Poisson p-value of the experiment hops against the
/// background hops scaled by the ratio of totals.
///
/// The expected count is `bg_count * expr_total / (bg_total + pc) + pc`
/// and the observed count is `expr_count + pc`. The result is
/// `1 - CDF(floor(observed); expected)`.
pub fn poisson_pval(
    bg_total: u64,
    expr_total: u64,
    bg_count: u64,
    expr_count: u64,
    pseudocount: f64,
) -> Result<f64> {
    check_pseudocount(pseudocount)?;

    let hop_ratio = expr_total as f64 / (bg_total as f64 + pseudocount);
    let mu = bg_count as f64 * hop_ratio + pseudocount;
    let observed = (expr_count as f64 + pseudocount).floor() as u64;

    let poisson = Poisson::new(mu).map_err(|e| QuantError::Distribution(e.to_string()))?;
    let pvalue = poisson.sf(observed);
    trace!("poisson mu={} x={} p={}", mu, observed, pvalue);

    Ok(pvalue.clamp(0.0, 1.0))
}

/// Hypergeometric p-value of seeing at least `expr_count` experiment
/// hops among the `bg_count + expr_count` hops in the promoter.
///
/// Population is `bg_total + expr_total` with `expr_total` successes.
/// Returns 1 when the population or the draw is empty.
pub fn hypergeom_pval(
    bg_total: u64,
    expr_total: u64,
    bg_count: u64,
    expr_count: u64,
) -> Result<f64> {
    let population = bg_total + expr_total;
    let draws = bg_count + expr_count;

    if population < 1 || draws < 1 {
        return Ok(1.0);
    }
    if draws > population {
        return Err(QuantError::InvalidCount {
            name: "bg_count + expr_count".to_string(),
            value: format!("{} (exceeds total hops {})", draws, population),
        });
    }

    // P(X >= expr_count) is the survival function one below it
    let observed = expr_count.saturating_sub(1);

    let hypergeom = Hypergeometric::new(population, expr_total, draws)
        .map_err(|e| QuantError::Distribution(e.to_string()))?;
    let pvalue = hypergeom.sf(observed);
    trace!(
        "hypergeom M={} n={} N={} x={} p={}",
        population,
        expr_total,
        draws,
        observed,
        pvalue
    );

    Ok(pvalue.clamp(0.0, 1.0))
}
