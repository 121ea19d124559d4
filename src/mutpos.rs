//! Mutpos file parsing functionality

use crate::utils::is_gzipped;
use crate::{Mutpos2VcfError, Mutpos2VcfResult};
use flate2::read::MultiGzDecoder;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

/// Number of required columns in a mutpos line.
pub const REQUIRED_COLUMNS: usize = 9;

/// One aggregated per-position record from a mutpos file.
///
/// The column schema is a versioned contract with the producing
/// duplex-sequencing pipeline:
///
/// ```text
/// contig  position  depth  count_A  count_C  count_G  count_T  count_ins  count_del
/// ```
///
/// Fields are whitespace- or tab-delimited; extra trailing columns are
/// ignored. `position` is 1-based. `depth` is the number of informative
/// read-families covering the position, and the six counts must not sum to
/// more than `depth`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MutposRecord {
    pub contig: String,
    pub position: u64,
    pub depth: u32,
    /// Read-families supporting each base at this position.
    pub a: u32,
    pub c: u32,
    pub g: u32,
    pub t: u32,
    /// Read-families supporting an insertion after this position.
    pub ins: u32,
    /// Read-families supporting a deletion of the following base.
    pub del: u32,
}

impl MutposRecord {
    /// Parse one mutpos line, validating the schema and numeric fields.
    pub fn from_line(line: &str, line_number: u64) -> Mutpos2VcfResult<Self> {
        let malformed = |reason: String| Mutpos2VcfError::MalformedRecord {
            line_number,
            line: line.to_string(),
            reason,
        };

        let fields: Vec<&str> = line.split_ascii_whitespace().collect();
        if fields.len() < REQUIRED_COLUMNS {
            return Err(malformed(format!(
                "expected at least {} columns, found {}",
                REQUIRED_COLUMNS,
                fields.len()
            )));
        }

        let contig = fields[0].to_string();

        let position = fields[1]
            .parse::<u64>()
            .map_err(|_| malformed(format!("invalid position: {}", fields[1])))?;
        if position == 0 {
            return Err(malformed("position must be 1-based (>= 1)".to_string()));
        }

        let parse_count = |value: &str, name: &str| -> Mutpos2VcfResult<u32> {
            value
                .parse::<u32>()
                .map_err(|_| malformed(format!("invalid {}: {}", name, value)))
        };

        let depth = parse_count(fields[2], "depth")?;
        let a = parse_count(fields[3], "A count")?;
        let c = parse_count(fields[4], "C count")?;
        let g = parse_count(fields[5], "G count")?;
        let t = parse_count(fields[6], "T count")?;
        let ins = parse_count(fields[7], "insertion count")?;
        let del = parse_count(fields[8], "deletion count")?;

        let total: u64 = [a, c, g, t, ins, del].iter().map(|&v| u64::from(v)).sum();
        if total > u64::from(depth) {
            return Err(malformed(format!(
                "allele counts sum to {} which exceeds depth {}",
                total, depth
            )));
        }

        Ok(MutposRecord {
            contig,
            position,
            depth,
            a,
            c,
            g,
            t,
            ins,
            del,
        })
    }

    /// True when this position has any insertion or deletion evidence.
    pub fn has_indel(&self) -> bool {
        self.ins > 0 || self.del > 0
    }
}

/// Mutpos file reader that handles both compressed and uncompressed files
pub struct MutposReader {
    reader: Box<dyn BufRead>,
    line_number: u64,
}

impl MutposReader {
    pub fn new<P: AsRef<Path>>(path: P) -> Mutpos2VcfResult<Self> {
        let file = File::open(&path)
            .map_err(|_| Mutpos2VcfError::FileNotFound(path.as_ref().to_string_lossy().to_string()))?;

        let reader: Box<dyn BufRead> = if is_gzipped(&path)? {
            let gz_decoder = MultiGzDecoder::new(file);
            Box::new(BufReader::new(gz_decoder))
        } else {
            Box::new(BufReader::new(file))
        };

        Ok(MutposReader { reader, line_number: 0 })
    }

    /// Wrap an arbitrary buffered stream (e.g. stdin or an in-memory buffer).
    pub fn from_reader(reader: Box<dyn BufRead>) -> Self {
        MutposReader { reader, line_number: 0 }
    }

    /// Lazy, forward-only, single-pass iterator over the records.
    pub fn records(&mut self) -> MutposRecordIterator {
        MutposRecordIterator { reader: self }
    }
}

/// Iterator over mutpos records
pub struct MutposRecordIterator<'a> {
    reader: &'a mut MutposReader,
}

impl<'a> Iterator for MutposRecordIterator<'a> {
    type Item = Mutpos2VcfResult<MutposRecord>;

    fn next(&mut self) -> Option<Self::Item> {
        let mut line = String::new();

        loop {
            line.clear();
            match self.reader.reader.read_line(&mut line) {
                Ok(0) => return None, // EOF
                Ok(_) => {
                    self.reader.line_number += 1;
                    let line = line.trim_end();
                    if line.is_empty() {
                        continue; // Skip blank lines
                    }
                    if line.starts_with('#') {
                        continue; // Skip comment lines
                    }

                    return Some(MutposRecord::from_line(line, self.reader.line_number));
                }
                Err(e) => return Some(Err(Mutpos2VcfError::Io(e))),
            }
        }
    }
}
