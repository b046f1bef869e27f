//! Interval store reader: tab-separated event, promoter and experiment tables.
//!
//! All tables skip blank lines and `#` comments. A header line is
//! recognised by its first field (`chrom` or `id`) and skipped.

use crate::chrom::ChromMap;
use crate::error::{QuantError, Result};
use crate::interval::{Experiment, InsertionEvent, PromoterRegion, Strand};
use memchr::memchr_iter;
use rustc_hash::FxHashSet;
use std::fs::File;
use std::io::{BufRead, BufReader, Read};
use std::path::Path;

/// Line-oriented reader for tab-separated tables.
pub struct TableReader<R: Read> {
    reader: BufReader<R>,
    line_number: usize,
    buffer: String,
}

impl TableReader<File> {
    /// Open a table from a path.
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(path)?;
        Ok(Self::new(file))
    }
}

impl<R: Read> TableReader<R> {
    /// Create a new table reader from any readable source.
    pub fn new(reader: R) -> Self {
        Self {
            reader: BufReader::new(reader),
            line_number: 0,
            buffer: String::with_capacity(1024),
        }
    }

    /// Feed every data row to `f` as `(line_number, fields)`.
    ///
    /// `header` is the first column name; a first data line starting with
    /// it is treated as a header and skipped.
    pub fn for_each_row<F>(mut self, header: &str, mut f: F) -> Result<()>
    where
        F: FnMut(usize, &[&str]) -> Result<()>,
    {
        let mut seen_data = false;

        loop {
            self.buffer.clear();
            let bytes_read = self.reader.read_line(&mut self.buffer)?;
            if bytes_read == 0 {
                return Ok(());
            }
            self.line_number += 1;

            let line = self.buffer.trim_end_matches(['\n', '\r']);
            if line.trim().is_empty() || line.starts_with('#') {
                continue;
            }

            let mut fields: Vec<&str> = Vec::with_capacity(8);
            split_tabs(line, &mut fields);

            if !seen_data {
                seen_data = true;
                if fields[0] == header {
                    continue;
                }
            }

            f(self.line_number, &fields)?;
        }
    }
}

/// Split on tabs without allocating per field.
#[inline]
fn split_tabs<'a>(line: &'a str, out: &mut Vec<&'a str>) {
    let mut last = 0;
    for pos in memchr_iter(b'\t', line.as_bytes()) {
        out.push(&line[last..pos]);
        last = pos + 1;
    }
    out.push(&line[last..]);
}

fn require_fields(line: usize, fields: &[&str], expected: usize) -> Result<()> {
    if fields.len() < expected {
        return Err(QuantError::Parse {
            line,
            message: format!("Expected at least {} fields, got {}", expected, fields.len()),
        });
    }
    Ok(())
}

fn parse_position(line: usize, s: &str, field_name: &str) -> Result<u64> {
    s.parse().map_err(|_| QuantError::Parse {
        line,
        message: format!("Invalid {} position: '{}'", field_name, s),
    })
}

fn parse_strand(line: usize, s: &str) -> Result<Strand> {
    Strand::parse(s).ok_or_else(|| QuantError::Parse {
        line,
        message: format!("Invalid strand: '{}' (expected '+', '-' or '*')", s),
    })
}

fn parse_span(line: usize, fields: &[&str]) -> Result<(u64, u64)> {
    let start = parse_position(line, fields[1], "start")?;
    let end = parse_position(line, fields[2], "end")?;
    if start > end {
        return Err(QuantError::Parse {
            line,
            message: format!("Start ({}) > end ({})", start, end),
        });
    }
    Ok((start, end))
}

/// Parse insertion events: `chrom start end strand group [hops_source]`.
///
/// When `hops_source` is given, rows carrying a different value in the
/// sixth column are dropped. Rows without that column are always kept.
pub fn read_events_from<R: Read>(
    reader: R,
    chroms: &ChromMap,
    hops_source: Option<&str>,
) -> Result<Vec<InsertionEvent>> {
    let mut events = Vec::new();

    TableReader::new(reader).for_each_row("chrom", |line, fields| {
        require_fields(line, fields, 5)?;
        if let (Some(wanted), Some(source)) = (hops_source, fields.get(5)) {
            if *source != wanted {
                return Ok(());
            }
        }
        let (start, _) = parse_span(line, fields)?;
        let strand = parse_strand(line, fields[3])?;
        events.push(InsertionEvent::new(
            chroms.canonical(fields[0]),
            start,
            strand,
            fields[4],
        ));
        Ok(())
    })?;

    Ok(events)
}

/// Read insertion events from a file.
pub fn read_events<P: AsRef<Path>>(
    path: P,
    chroms: &ChromMap,
    hops_source: Option<&str>,
) -> Result<Vec<InsertionEvent>> {
    read_events_from(File::open(path)?, chroms, hops_source)
}

/// Parse promoters: `chrom start end strand id target_gene_id source`.
pub fn read_promoters_from<R: Read>(reader: R, chroms: &ChromMap) -> Result<Vec<PromoterRegion>> {
    let mut promoters = Vec::new();
    let mut ids: FxHashSet<String> = FxHashSet::default();

    TableReader::new(reader).for_each_row("chrom", |line, fields| {
        require_fields(line, fields, 7)?;
        let (start, end) = parse_span(line, fields)?;
        let strand = parse_strand(line, fields[3])?;
        if !ids.insert(fields[4].to_string()) {
            return Err(QuantError::Parse {
                line,
                message: format!("Duplicate promoter id '{}'", fields[4]),
            });
        }
        promoters.push(PromoterRegion::new(
            fields[4],
            chroms.canonical(fields[0]),
            start,
            end,
            strand,
            fields[5],
            fields[6],
        )?);
        Ok(())
    })?;

    Ok(promoters)
}

/// Read promoters from a file.
pub fn read_promoters<P: AsRef<Path>>(path: P, chroms: &ChromMap) -> Result<Vec<PromoterRegion>> {
    read_promoters_from(File::open(path)?, chroms)
}

/// Parse experiments: `id batch replicate tf_id tf_locus_tag tf_gene`.
pub fn read_experiments_from<R: Read>(reader: R) -> Result<Vec<Experiment>> {
    let mut experiments = Vec::new();
    let mut ids: FxHashSet<String> = FxHashSet::default();

    TableReader::new(reader).for_each_row("id", |line, fields| {
        require_fields(line, fields, 6)?;
        let replicate = fields[2].parse().map_err(|_| QuantError::Parse {
            line,
            message: format!("Invalid replicate: '{}'", fields[2]),
        })?;
        if !ids.insert(fields[0].to_string()) {
            return Err(QuantError::Parse {
                line,
                message: format!("Duplicate experiment id '{}'", fields[0]),
            });
        }
        experiments.push(Experiment {
            id: fields[0].to_string(),
            batch: fields[1].to_string(),
            replicate,
            tf_id: fields[3].to_string(),
            tf_locus_tag: fields[4].to_string(),
            tf_gene: fields[5].to_string(),
        });
        Ok(())
    })?;

    Ok(experiments)
}

/// Read experiments from a file.
pub fn read_experiments<P: AsRef<Path>>(path: P) -> Result<Vec<Experiment>> {
    read_experiments_from(File::open(path)?)
}
