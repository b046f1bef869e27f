//! Tab-separated output for significance and total-count tables.
//!
//! Uses itoa for integer formatting and ryu for float formatting, so
//! identical rows always serialize to identical bytes.

use crate::count::CountRecord;
use crate::error::Result;
use crate::pipeline::SignificanceRow;
use std::io::{BufWriter, Write};

/// Buffer size for table writers (1MB default).
const DEFAULT_BUFFER_SIZE: usize = 1024 * 1024;

/// Column order of significance output.
pub const SIGNIFICANCE_COLUMNS: [&str; 16] = [
    "experiment_id",
    "tf_id",
    "experiment_batch",
    "experiment_replicate",
    "hops_source",
    "experiment_hops",
    "experiment_total_hops",
    "background_source",
    "background_hops",
    "background_total_hops",
    "callingcards_enrichment",
    "poisson_pval",
    "hypergeometric_pval",
    "promoter_id",
    "promoter_source",
    "target_gene_id",
];

/// Column order of total-count output.
pub const COUNT_COLUMNS: [&str; 2] = ["key", "total"];

/// Buffered TSV writer.
pub struct TableWriter<W: Write> {
    writer: BufWriter<W>,
    itoa_buf: itoa::Buffer,
    ryu_buf: ryu::Buffer,
}

impl<W: Write> TableWriter<W> {
    /// Create a new TableWriter with the default buffer.
    pub fn new(output: W) -> Self {
        Self::with_capacity(DEFAULT_BUFFER_SIZE, output)
    }

    /// Create a new TableWriter with specified buffer size.
    pub fn with_capacity(capacity: usize, output: W) -> Self {
        Self {
            writer: BufWriter::with_capacity(capacity, output),
            itoa_buf: itoa::Buffer::new(),
            ryu_buf: ryu::Buffer::new(),
        }
    }

    /// Write a header line.
    pub fn write_header(&mut self, columns: &[&str]) -> Result<()> {
        for (i, column) in columns.iter().enumerate() {
            if i > 0 {
                self.write_tab()?;
            }
            self.writer.write_all(column.as_bytes())?;
        }
        self.write_newline()
    }

    /// Write one significance row, columns in [`SIGNIFICANCE_COLUMNS`] order.
    pub fn write_significance_row(&mut self, row: &SignificanceRow) -> Result<()> {
        self.write_str(&row.experiment_id)?;
        self.write_tab()?;
        self.write_str(&row.tf_id)?;
        self.write_tab()?;
        self.write_str(&row.experiment_batch)?;
        self.write_tab()?;
        self.write_int(row.experiment_replicate)?;
        self.write_tab()?;
        self.write_str(&row.hops_source)?;
        self.write_tab()?;
        self.write_int(row.experiment_hops)?;
        self.write_tab()?;
        self.write_int(row.experiment_total_hops)?;
        self.write_tab()?;
        self.write_str(&row.background_source)?;
        self.write_tab()?;
        self.write_int(row.background_hops)?;
        self.write_tab()?;
        self.write_int(row.background_total_hops)?;
        self.write_tab()?;
        self.write_float(row.enrichment)?;
        self.write_tab()?;
        self.write_float(row.poisson_pval)?;
        self.write_tab()?;
        self.write_float(row.hypergeometric_pval)?;
        self.write_tab()?;
        self.write_str(&row.promoter_id)?;
        self.write_tab()?;
        self.write_str(&row.promoter_source)?;
        self.write_tab()?;
        self.write_str(&row.target_gene_id)?;
        self.write_newline()
    }

    /// Write a full significance table with header.
    pub fn write_significance(&mut self, rows: &[SignificanceRow]) -> Result<()> {
        self.write_header(&SIGNIFICANCE_COLUMNS)?;
        for row in rows {
            self.write_significance_row(row)?;
        }
        self.flush()
    }

    /// Write a total-count table with header.
    pub fn write_counts(&mut self, records: &[CountRecord]) -> Result<()> {
        self.write_header(&COUNT_COLUMNS)?;
        for record in records {
            self.write_str(&record.key)?;
            self.write_tab()?;
            self.write_int(record.total)?;
            self.write_newline()?;
        }
        self.flush()
    }

    #[inline]
    fn write_str(&mut self, s: &str) -> Result<()> {
        self.writer.write_all(s.as_bytes())?;
        Ok(())
    }

    #[inline]
    fn write_tab(&mut self) -> Result<()> {
        self.writer.write_all(b"\t")?;
        Ok(())
    }

    #[inline]
    fn write_newline(&mut self) -> Result<()> {
        self.writer.write_all(b"\n")?;
        Ok(())
    }

    #[inline]
    fn write_int<I: itoa::Integer>(&mut self, n: I) -> Result<()> {
        self.writer.write_all(self.itoa_buf.format(n).as_bytes())?;
        Ok(())
    }

    #[inline]
    fn write_float(&mut self, f: f64) -> Result<()> {
        self.writer.write_all(self.ryu_buf.format(f).as_bytes())?;
        Ok(())
    }

    /// Flush the output buffer.
    pub fn flush(&mut self) -> Result<()> {
        self.writer.flush()?;
        Ok(())
    }
}
