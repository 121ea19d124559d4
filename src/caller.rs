//! Position-wise variant calling from aggregated mutation counts

use crate::mutpos::MutposRecord;
use crate::reference::ReferenceLookup;
use crate::{CallingConfig, Mutpos2VcfError, Mutpos2VcfResult};
use serde::Serialize;

/// Observed allele classes summarized by a mutpos record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlleleSymbol {
    A,
    C,
    G,
    T,
    Insertion,
    Deletion,
}

impl AlleleSymbol {
    pub const ALL: [AlleleSymbol; 6] = [
        AlleleSymbol::A,
        AlleleSymbol::C,
        AlleleSymbol::G,
        AlleleSymbol::T,
        AlleleSymbol::Insertion,
        AlleleSymbol::Deletion,
    ];

    /// Stable label used for deterministic tie-breaking.
    pub fn label(self) -> &'static str {
        match self {
            AlleleSymbol::A => "A",
            AlleleSymbol::C => "C",
            AlleleSymbol::G => "G",
            AlleleSymbol::T => "T",
            AlleleSymbol::Insertion => "INS",
            AlleleSymbol::Deletion => "DEL",
        }
    }

    /// The nucleotide for base symbols; `None` for indel symbols.
    pub fn base(self) -> Option<char> {
        match self {
            AlleleSymbol::A => Some('A'),
            AlleleSymbol::C => Some('C'),
            AlleleSymbol::G => Some('G'),
            AlleleSymbol::T => Some('T'),
            AlleleSymbol::Insertion | AlleleSymbol::Deletion => None,
        }
    }

    /// The read-family count supporting this symbol in a record.
    pub fn count_in(self, record: &MutposRecord) -> u32 {
        match self {
            AlleleSymbol::A => record.a,
            AlleleSymbol::C => record.c,
            AlleleSymbol::G => record.g,
            AlleleSymbol::T => record.t,
            AlleleSymbol::Insertion => record.ins,
            AlleleSymbol::Deletion => record.del,
        }
    }
}

/// One qualifying alternate allele with its supporting evidence.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AlleleCall {
    /// The ALT string as it will appear in the VCF.
    pub allele: String,
    pub count: u32,
    pub fraction: f64,
}

/// The outcome of evaluating one mutpos record.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CallDecision {
    pub contig: String,
    pub position: u64,
    /// Reference allele taken verbatim (uppercased) from the resolver.
    pub ref_allele: String,
    /// Qualifying alternates, ordered by descending fraction with ties
    /// broken by the lexicographic order of the source symbol label.
    pub alt_alleles: Vec<AlleleCall>,
    pub depth: u32,
    pub is_call: bool,
}

/// Validate the calling configuration thresholds
pub fn validate_calling_config(config: &CallingConfig) -> Mutpos2VcfResult<()> {
    if !(0.0..=1.0).contains(&config.min_allele_fraction) {
        return Err(Mutpos2VcfError::InvalidConfig(
            "min_allele_fraction must be between 0 and 1".to_string(),
        ));
    }

    if config.sample_name.is_empty() {
        return Err(Mutpos2VcfError::InvalidConfig(
            "sample_name must not be empty".to_string(),
        ));
    }

    if config.sample_name.chars().any(|c| c.is_whitespace()) {
        return Err(Mutpos2VcfError::InvalidConfig(
            "sample_name must not contain whitespace".to_string(),
        ));
    }

    Ok(())
}

/// Evaluate one mutpos record against the calling thresholds.
///
/// The single-base reference context is always resolved first, so an unknown
/// contig or out-of-range position fails the run even when the position is
/// otherwise non-callable. A non-reference symbol with a non-zero count
/// qualifies when its fraction of depth, its absolute count, and the total
/// depth all meet the configured thresholds (fraction boundary inclusive).
///
/// Indels are anchored at the record's own position: a deletion removes the
/// base at `position + 1` (REF widens to anchor plus deleted base) and an
/// insertion adds one base of unknown identity, encoded `N`, after the
/// anchor. SNV alternates are right-padded with the widened context so all
/// allele classes coexist in a single multi-allelic record.
pub fn call<R: ReferenceLookup>(
    record: &MutposRecord,
    resolver: &R,
    config: &CallingConfig,
) -> Mutpos2VcfResult<CallDecision> {
    let context = resolver.resolve(&record.contig, record.position, 1)?;
    let ref_base = context
        .bases
        .chars()
        .next()
        .ok_or_else(|| Mutpos2VcfError::InvalidCall("empty reference context".to_string()))?;

    let mut candidates: Vec<(AlleleSymbol, u32, f64)> = Vec::new();
    if record.depth > 0 && record.depth >= config.min_depth {
        for symbol in AlleleSymbol::ALL {
            if symbol.base() == Some(ref_base) {
                continue; // The reference-matching base is never a candidate
            }
            let count = symbol.count_in(record);
            if count == 0 {
                continue;
            }
            let fraction = f64::from(count) / f64::from(record.depth);
            if fraction >= config.min_allele_fraction && count >= config.min_supporting_count {
                candidates.push((symbol, count, fraction));
            }
        }
    }

    // Deterministic output order: descending fraction, ties by symbol label
    candidates.sort_by(|a, b| b.2.total_cmp(&a.2).then_with(|| a.0.label().cmp(b.0.label())));

    if candidates.is_empty() {
        return Ok(CallDecision {
            contig: record.contig.clone(),
            position: record.position,
            ref_allele: context.bases,
            alt_alleles: Vec::new(),
            depth: record.depth,
            is_call: false,
        });
    }

    // A qualifying deletion widens REF to carry the deleted base at
    // position + 1; running past the contig end is a reference/input
    // mismatch and stays fatal.
    let has_deletion = candidates.iter().any(|(s, _, _)| *s == AlleleSymbol::Deletion);
    let ref_allele = if has_deletion {
        resolver.resolve(&record.contig, record.position, 2)?.bases
    } else {
        context.bases
    };
    let suffix = &ref_allele[1..];

    let alt_alleles = candidates
        .into_iter()
        .map(|(symbol, count, fraction)| {
            let allele = match symbol.base() {
                Some(base) => format!("{}{}", base, suffix),
                None if symbol == AlleleSymbol::Deletion => ref_base.to_string(),
                None => format!("{}N{}", ref_base, suffix),
            };
            AlleleCall { allele, count, fraction }
        })
        .collect();

    Ok(CallDecision {
        contig: record.contig.clone(),
        position: record.position,
        ref_allele,
        alt_alleles,
        depth: record.depth,
        is_call: true,
    })
}
