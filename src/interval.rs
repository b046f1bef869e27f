//! Core record types: insertion events, promoter regions and experiments.

use crate::error::{QuantError, Result};
use std::fmt;

/// Strand orientation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Strand {
    Plus,
    Minus,
    /// `*`: no strand information. Matches either strand.
    Unstranded,
}

impl Strand {
    /// Parse a strand symbol. `.` is accepted as a synonym of `*`.
    pub fn from_char(c: char) -> Option<Self> {
        match c {
            '+' => Some(Strand::Plus),
            '-' => Some(Strand::Minus),
            '*' | '.' => Some(Strand::Unstranded),
            _ => None,
        }
    }

    /// Parse a strand field, which must be exactly one symbol.
    pub fn parse(s: &str) -> Option<Self> {
        let mut chars = s.chars();
        match (chars.next(), chars.next()) {
            (Some(c), None) => Self::from_char(c),
            _ => None,
        }
    }

    /// True when an event on `other` may be counted for a region on `self`.
    #[inline]
    pub fn compatible_with(self, other: Strand) -> bool {
        self == Strand::Unstranded || other == Strand::Unstranded || self == other
    }
}

impl fmt::Display for Strand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Strand::Plus => write!(f, "+"),
            Strand::Minus => write!(f, "-"),
            Strand::Unstranded => write!(f, "*"),
        }
    }
}

/// A single transposon insertion.
///
/// `group` is the experiment id for experiment tables and the source name
/// for background tables.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct InsertionEvent {
    pub chrom: String,
    /// 0-based insertion coordinate.
    pub position: u64,
    pub strand: Strand,
    pub group: String,
}

impl InsertionEvent {
    #[inline]
    pub fn new(
        chrom: impl Into<String>,
        position: u64,
        strand: Strand,
        group: impl Into<String>,
    ) -> Self {
        Self {
            chrom: chrom.into(),
            position,
            strand,
            group: group.into(),
        }
    }
}

/// A promoter region attached to a target gene.
///
/// The span is closed: an event at `start` or at `end` is inside.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PromoterRegion {
    pub id: String,
    pub chrom: String,
    pub start: u64,
    pub end: u64,
    pub strand: Strand,
    pub target_gene_id: String,
    pub source: String,
}

impl PromoterRegion {
    /// Create a promoter region, rejecting `start > end`.
    pub fn new(
        id: impl Into<String>,
        chrom: impl Into<String>,
        start: u64,
        end: u64,
        strand: Strand,
        target_gene_id: impl Into<String>,
        source: impl Into<String>,
    ) -> Result<Self> {
        let region = Self {
            id: id.into(),
            chrom: chrom.into(),
            start,
            end,
            strand,
            target_gene_id: target_gene_id.into(),
            source: source.into(),
        };
        region.validate()?;
        Ok(region)
    }

    /// Reject `start > end`. Fields are public, so regions built as
    /// struct literals are checked again before counting.
    pub fn validate(&self) -> Result<()> {
        if self.start > self.end {
            return Err(QuantError::InvalidInterval {
                id: self.id.clone(),
                start: self.start,
                end: self.end,
            });
        }
        Ok(())
    }

    /// Position test only; strand is checked separately.
    #[inline]
    pub fn contains_position(&self, chrom: &str, position: u64) -> bool {
        self.chrom == chrom && self.start <= position && position <= self.end
    }

    /// True when `event` falls in this region under the given strand rule.
    #[inline]
    pub fn contains(&self, event: &InsertionEvent, consider_strand: bool) -> bool {
        self.contains_position(&event.chrom, event.position)
            && (!consider_strand || self.strand.compatible_with(event.strand))
    }
}

/// Metadata for one calling-cards experiment.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct Experiment {
    pub id: String,
    pub batch: String,
    pub replicate: u32,
    pub tf_id: String,
    pub tf_locus_tag: String,
    pub tf_gene: String,
}
