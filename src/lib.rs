//! # mutpos2vcf - Duplex Sequencing Mutpos to VCF Converter
//!
//! Converts "mutpos" files - per-genomic-position mutation count summaries
//! produced by duplex-sequencing error-correction pipelines - into standard
//! VCF 4.2 output, resolving reference context from an indexed FASTA and
//! applying configurable calling thresholds.

pub mod caller;
pub mod convert;
pub mod mutpos;
pub mod reference;
pub mod utils;
pub mod vcf;

use anyhow::Result;
use std::str::FromStr;

/// Policy applied when the parser reports a malformed mutpos line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MalformedPolicy {
    /// Abort the whole run on the first malformed line.
    Abort,
    /// Skip the line (logging it) and continue; skipped lines are counted.
    Skip,
}

impl FromStr for MalformedPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "abort" => Ok(MalformedPolicy::Abort),
            "skip" => Ok(MalformedPolicy::Skip),
            other => Err(format!(
                "invalid malformed-record policy '{}' (expected 'abort' or 'skip')",
                other
            )),
        }
    }
}

/// Configuration parameters for variant calling
#[derive(Debug, Clone)]
pub struct CallingConfig {
    pub min_depth: u32,            // Minimum total depth to consider a position
    pub min_allele_fraction: f64,  // Minimum fraction of depth supporting an allele
    pub min_supporting_count: u32, // Minimum read-family count supporting an allele
    pub sample_name: String,       // Sample column name in the VCF output
    pub on_malformed: MalformedPolicy,
}

impl Default for CallingConfig {
    fn default() -> Self {
        Self {
            min_depth: 1,
            min_allele_fraction: 0.0,
            min_supporting_count: 1,
            sample_name: "SAMPLE".to_string(),
            on_malformed: MalformedPolicy::Abort,
        }
    }
}

/// Error types for the mutpos2vcf library
#[derive(Debug, thiserror::Error)]
pub enum Mutpos2VcfError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("HTSlib error: {0}")]
    Htslib(#[from] rust_htslib::errors::Error),

    #[error("malformed mutpos record at line {line_number}: {reason}: {line:?}")]
    MalformedRecord {
        line_number: u64,
        line: String,
        reason: String,
    },

    #[error("contig '{0}' not found in the reference index")]
    UnknownContig(String),

    #[error("position {contig}:{position} with span {span} exceeds contig length {length}")]
    PositionOutOfRange {
        contig: String,
        position: u64,
        span: u64,
        length: u64,
    },

    #[error("input is not coordinate-sorted at {contig}:{position}: {reason}")]
    UnsortedInput {
        contig: String,
        position: u64,
        reason: String,
    },

    #[error("invalid call decision: {0}")]
    InvalidCall(String),

    #[error("File not found: {0}")]
    FileNotFound(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

pub type Mutpos2VcfResult<T> = Result<T, Mutpos2VcfError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_malformed_policy_from_str() {
        assert_eq!("abort".parse::<MalformedPolicy>().unwrap(), MalformedPolicy::Abort);
        assert_eq!("skip".parse::<MalformedPolicy>().unwrap(), MalformedPolicy::Skip);
        assert!("ignore".parse::<MalformedPolicy>().is_err());
    }

    #[test]
    fn test_default_config() {
        let config = CallingConfig::default();
        assert_eq!(config.min_depth, 1);
        assert_eq!(config.min_allele_fraction, 0.0);
        assert_eq!(config.min_supporting_count, 1);
        assert_eq!(config.sample_name, "SAMPLE");
        assert_eq!(config.on_malformed, MalformedPolicy::Abort);
    }

    #[test]
    fn test_error_context_in_messages() {
        let err = Mutpos2VcfError::MalformedRecord {
            line_number: 7,
            line: "chr1\tx\t50".to_string(),
            reason: "invalid position: x".to_string(),
        };
        let msg = format!("{}", err);
        assert!(msg.contains("line 7"));
        assert!(msg.contains("invalid position"));

        let err = Mutpos2VcfError::PositionOutOfRange {
            contig: "chr1".to_string(),
            position: 100,
            span: 2,
            length: 100,
        };
        let msg = format!("{}", err);
        assert!(msg.contains("chr1:100"));
        assert!(msg.contains("span 2"));
    }
}
