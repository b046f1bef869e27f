//! Event indexing for batched per-group promoter counts.

use crate::interval::{InsertionEvent, PromoterRegion, Strand};
use rustc_hash::FxHashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct IndexedEvent {
    position: u64,
    strand: Strand,
    group: u32,
}

/// Insertion events organized by chromosome, sorted by position, with
/// group names interned to dense indices.
///
/// A single window scan per promoter tallies every group at once, so a
/// promoter costs O(log n + k) regardless of how many groups are indexed.
pub struct EventIndex {
    groups: Vec<String>,
    events_by_chrom: FxHashMap<String, Vec<IndexedEvent>>,
    len: usize,
}

impl EventIndex {
    /// Index `events`, keeping only those whose group appears in `groups`.
    ///
    /// Count vectors returned by this index are laid out in `groups` order.
    /// Duplicate names in `groups` keep their first position.
    pub fn build(events: &[InsertionEvent], groups: &[String]) -> Self {
        let mut names: Vec<String> = Vec::with_capacity(groups.len());
        let mut lookup: FxHashMap<&str, u32> = FxHashMap::default();
        for name in groups {
            if !lookup.contains_key(name.as_str()) {
                lookup.insert(name.as_str(), names.len() as u32);
                names.push(name.clone());
            }
        }

        let mut by_chrom: FxHashMap<String, Vec<IndexedEvent>> = FxHashMap::default();
        let mut len = 0;

        for event in events {
            let Some(&group) = lookup.get(event.group.as_str()) else {
                continue;
            };
            // Avoid cloning the chromosome name for every event.
            match by_chrom.get_mut(event.chrom.as_str()) {
                Some(list) => list.push(IndexedEvent {
                    position: event.position,
                    strand: event.strand,
                    group,
                }),
                None => {
                    by_chrom.insert(
                        event.chrom.clone(),
                        vec![IndexedEvent {
                            position: event.position,
                            strand: event.strand,
                            group,
                        }],
                    );
                }
            }
            len += 1;
        }

        for chrom_events in by_chrom.values_mut() {
            chrom_events.sort_unstable_by(|a, b| {
                a.position
                    .cmp(&b.position)
                    .then(a.group.cmp(&b.group))
                    .then(a.strand.cmp(&b.strand))
            });
        }

        Self {
            groups: names,
            events_by_chrom: by_chrom,
            len,
        }
    }

    /// Group names, in count-vector order.
    pub fn groups(&self) -> &[String] {
        &self.groups
    }

    /// Count events inside `promoter`, one entry per indexed group.
    pub fn count_by_group(&self, promoter: &PromoterRegion, consider_strand: bool) -> Vec<u64> {
        let mut counts = vec![0u64; self.groups.len()];
        self.count_into(promoter, consider_strand, &mut counts);
        counts
    }

    // `counts` must have one slot per indexed group.
    fn count_into(&self, promoter: &PromoterRegion, consider_strand: bool, counts: &mut [u64]) {
        debug_assert_eq!(counts.len(), self.groups.len());

        let Some(chrom_events) = self.events_by_chrom.get(&promoter.chrom) else {
            return;
        };

        let filter_strand = consider_strand && promoter.strand != Strand::Unstranded;
        let first = chrom_events.partition_point(|e| e.position < promoter.start);

        for event in &chrom_events[first..] {
            if event.position > promoter.end {
                break;
            }
            if filter_strand && !promoter.strand.compatible_with(event.strand) {
                continue;
            }
            counts[event.group as usize] += 1;
        }
    }

    /// Number of indexed events.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}
