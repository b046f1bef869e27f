//! Chromosome alias map.
//!
//! Event and promoter tables may use different naming conventions
//! (`chr1`, `I`, `NC_001133.9`, ...). A map file translates each source
//! name to the canonical id the engine compares on.
//! Format: tab-delimited `alias\tcanonical` per line.

use rustc_hash::FxHashMap;
use std::fs::File;
use std::io::{BufRead, BufReader, Read};
use std::path::Path;

use crate::error::{QuantError, Result};

/// Alias → canonical chromosome id.
#[derive(Debug, Clone, Default)]
pub struct ChromMap {
    aliases: FxHashMap<String, String>,
}

impl ChromMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load aliases from a file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::from_reader(File::open(path)?)
    }

    /// Load aliases from any readable source.
    pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
        let reader = BufReader::new(reader);
        let mut map = Self::new();

        for (line_num, line_result) in reader.lines().enumerate() {
            let line = line_result?;
            let line = line.trim();

            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            let fields: Vec<&str> = line.split('\t').collect();
            if fields.len() < 2 {
                return Err(QuantError::Parse {
                    line: line_num + 1,
                    message: "Chromosome map requires two columns: alias and canonical id"
                        .to_string(),
                });
            }

            if let Some(previous) = map.aliases.get(fields[0]) {
                if previous != fields[1] {
                    return Err(QuantError::Parse {
                        line: line_num + 1,
                        message: format!(
                            "Alias '{}' maps to both '{}' and '{}'",
                            fields[0], previous, fields[1]
                        ),
                    });
                }
            }
            map.insert(fields[0], fields[1]);
        }

        Ok(map)
    }

    /// Register an alias.
    pub fn insert(&mut self, alias: impl Into<String>, canonical: impl Into<String>) {
        self.aliases.insert(alias.into(), canonical.into());
    }

    /// Canonical id for `name`; unknown names pass through unchanged.
    #[inline]
    pub fn canonical<'a>(&'a self, name: &'a str) -> &'a str {
        self.aliases.get(name).map(String::as_str).unwrap_or(name)
    }

    pub fn len(&self) -> usize {
        self.aliases.len()
    }

    pub fn is_empty(&self) -> bool {
        self.aliases.is_empty()
    }
}
