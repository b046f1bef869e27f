//! Promoter hop counting and per-group hop totals.

use crate::interval::{InsertionEvent, PromoterRegion};
use rustc_hash::FxHashMap;

/// Count events that fall inside `promoter`.
///
/// Linear scan over `events`; [`crate::index::EventIndex`] gives the same
/// answer per group in one windowed pass.
pub fn count_events(
    promoter: &PromoterRegion,
    events: &[InsertionEvent],
    consider_strand: bool,
) -> u64 {
    events
        .iter()
        .filter(|event| promoter.contains(event, consider_strand))
        .count() as u64
}

/// Total hops for one experiment id or background source.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CountRecord {
    pub key: String,
    pub total: u64,
}

/// Count events per group, ordered by key.
pub fn total_counts(events: &[InsertionEvent]) -> Vec<CountRecord> {
    let mut totals: FxHashMap<&str, u64> = FxHashMap::default();
    for event in events {
        *totals.entry(event.group.as_str()).or_insert(0) += 1;
    }

    let mut records: Vec<CountRecord> = totals
        .into_iter()
        .map(|(key, total)| CountRecord {
            key: key.to_string(),
            total,
        })
        .collect();
    records.sort_unstable_by(|a, b| a.key.cmp(&b.key));
    records
}

/// Lookup over [`CountRecord`]s where absent keys total zero.
#[derive(Debug, Clone, Default)]
pub struct CountTable {
    totals: FxHashMap<String, u64>,
}

impl CountTable {
    pub fn from_events(events: &[InsertionEvent]) -> Self {
        Self {
            totals: total_counts(events)
                .into_iter()
                .map(|r| (r.key, r.total))
                .collect(),
        }
    }

    /// Total for `key`, or 0 when the key never occurred.
    #[inline]
    pub fn total(&self, key: &str) -> u64 {
        self.totals.get(key).copied().unwrap_or(0)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.totals.contains_key(key)
    }
}
