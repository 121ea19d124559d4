//! VCF record construction and stream writing

use crate::caller::CallDecision;
use crate::reference::Contig;
use crate::{Mutpos2VcfError, Mutpos2VcfResult};
use std::io::Write;

/// VCF version tag written to the header.
pub const VCF_VERSION: &str = "VCFv4.2";

/// The VCF missing-value marker.
const MISSING: &str = ".";

/// Characters allowed in REF alleles (IUPAC nucleotide codes).
const IUPAC_BASES: &str = "ACGTNRYSWKMBDHV";

/// Characters allowed in the ALT alleles this tool constructs.
const ALT_BASES: &str = "ACGTN";

/// A single VCF data line with its fixed and per-sample fields.
#[derive(Debug, Clone, PartialEq)]
pub struct VcfRecord {
    pub chrom: String,
    pub pos: u64,
    pub id: String,
    pub ref_allele: String,
    pub alt_alleles: Vec<String>,
    pub qual: Option<f64>,
    pub filter: String,
    /// INFO key=value pairs in output order.
    pub info: Vec<(String, String)>,
    /// FORMAT keys, aligned with `sample` values.
    pub format: Vec<String>,
    pub sample: Vec<String>,
}

impl VcfRecord {
    pub fn to_line(&self) -> String {
        let qual = match self.qual {
            Some(q) => format!("{}", q),
            None => MISSING.to_string(),
        };
        let info = self
            .info
            .iter()
            .map(|(key, value)| format!("{}={}", key, value))
            .collect::<Vec<_>>()
            .join(";");

        format!(
            "{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}",
            self.chrom,
            self.pos,
            self.id,
            self.ref_allele,
            self.alt_alleles.join(","),
            qual,
            self.filter,
            info,
            self.format.join(":"),
            self.sample.join(":"),
        )
    }
}

/// Render an allele fraction with up to four decimal places, trimming
/// trailing zeros so 45/50 prints as `0.9` rather than `0.9000`.
pub fn format_fraction(value: f64) -> String {
    let mut s = format!("{:.4}", value);
    if s.contains('.') {
        while s.ends_with('0') {
            s.pop();
        }
        if s.ends_with('.') {
            s.pop();
        }
    }
    s
}

/// Convert a call decision into a VCF record.
///
/// Pure transformation: CHROM/POS copied, REF/ALT from the decision, QUAL
/// left as the missing marker (no quality model is configured), FILTER set
/// to PASS, INFO carrying total depth and per-allele fractions, and a
/// single-sample `GT:AF` column with a missing genotype.
///
/// Fails with `InvalidCall` only when the decision violates the REF/ALT
/// invariants; this signals a defect upstream, never expected from
/// validated input.
pub fn build_record(decision: &CallDecision) -> Mutpos2VcfResult<VcfRecord> {
    if !decision.is_call {
        return Err(Mutpos2VcfError::InvalidCall(format!(
            "no qualifying allele at {}:{}",
            decision.contig, decision.position
        )));
    }
    if decision.alt_alleles.is_empty() {
        return Err(Mutpos2VcfError::InvalidCall(format!(
            "call at {}:{} has no alternate alleles",
            decision.contig, decision.position
        )));
    }
    if decision.ref_allele.is_empty()
        || !decision.ref_allele.chars().all(|c| IUPAC_BASES.contains(c))
    {
        return Err(Mutpos2VcfError::InvalidCall(format!(
            "invalid reference allele {:?} at {}:{}",
            decision.ref_allele, decision.contig, decision.position
        )));
    }
    for alt in &decision.alt_alleles {
        if alt.allele.is_empty() || !alt.allele.chars().all(|c| ALT_BASES.contains(c)) {
            return Err(Mutpos2VcfError::InvalidCall(format!(
                "invalid alternate allele {:?} at {}:{}",
                alt.allele, decision.contig, decision.position
            )));
        }
        if alt.allele == decision.ref_allele {
            return Err(Mutpos2VcfError::InvalidCall(format!(
                "alternate allele equals reference at {}:{}",
                decision.contig, decision.position
            )));
        }
    }

    let fractions = decision
        .alt_alleles
        .iter()
        .map(|alt| format_fraction(alt.fraction))
        .collect::<Vec<_>>()
        .join(",");

    Ok(VcfRecord {
        chrom: decision.contig.clone(),
        pos: decision.position,
        id: MISSING.to_string(),
        ref_allele: decision.ref_allele.clone(),
        alt_alleles: decision.alt_alleles.iter().map(|alt| alt.allele.clone()).collect(),
        qual: None,
        filter: "PASS".to_string(),
        info: vec![
            ("DP".to_string(), decision.depth.to_string()),
            ("AF".to_string(), fractions.clone()),
        ],
        format: vec!["GT".to_string(), "AF".to_string()],
        sample: vec!["./.".to_string(), fractions],
    })
}

/// Streaming VCF writer that emits the header once and then enforces
/// coordinate order on every record.
///
/// Records must arrive grouped by contig (a contig never reappears after
/// another contig has started) with strictly increasing POS within each
/// contig; the engine emits at most one record per input position, so an
/// equal POS can only come from a duplicated input line. Violations fail
/// with `UnsortedInput` instead of re-ordering, which would require
/// unbounded buffering.
pub struct VcfWriter<W: Write> {
    writer: W,
    header_written: bool,
    /// Contigs in the order first seen in the record stream.
    seen_contigs: Vec<String>,
    last_pos: u64,
}

impl<W: Write> VcfWriter<W> {
    pub fn new(writer: W) -> Self {
        VcfWriter {
            writer,
            header_written: false,
            seen_contigs: Vec::new(),
            last_pos: 0,
        }
    }

    /// Write the meta-information and column header lines.
    pub fn write_header(&mut self, contigs: &[Contig], sample_name: &str) -> Mutpos2VcfResult<()> {
        if self.header_written {
            return Err(Mutpos2VcfError::InvalidCall(
                "VCF header written twice".to_string(),
            ));
        }

        writeln!(self.writer, "##fileformat={}", VCF_VERSION)?;
        writeln!(
            self.writer,
            "##source=mutpos2vcf {}",
            env!("CARGO_PKG_VERSION")
        )?;
        for contig in contigs {
            writeln!(
                self.writer,
                "##contig=<ID={},length={}>",
                contig.name, contig.length
            )?;
        }
        writeln!(
            self.writer,
            "##INFO=<ID=DP,Number=1,Type=Integer,Description=\"Total informative read-family depth\">"
        )?;
        writeln!(
            self.writer,
            "##INFO=<ID=AF,Number=A,Type=Float,Description=\"Fraction of read families supporting each alternate allele\">"
        )?;
        writeln!(
            self.writer,
            "##FORMAT=<ID=GT,Number=1,Type=String,Description=\"Genotype\">"
        )?;
        writeln!(
            self.writer,
            "##FORMAT=<ID=AF,Number=A,Type=Float,Description=\"Fraction of read families supporting each alternate allele\">"
        )?;
        writeln!(
            self.writer,
            "#CHROM\tPOS\tID\tREF\tALT\tQUAL\tFILTER\tINFO\tFORMAT\t{}",
            sample_name
        )?;

        self.header_written = true;
        Ok(())
    }

    /// Write one data line, enforcing the ordering precondition.
    pub fn write_record(&mut self, record: &VcfRecord) -> Mutpos2VcfResult<()> {
        if !self.header_written {
            return Err(Mutpos2VcfError::InvalidCall(
                "VCF record written before header".to_string(),
            ));
        }

        match self.seen_contigs.iter().position(|c| *c == record.chrom) {
            Some(index) if index + 1 == self.seen_contigs.len() => {
                if record.pos <= self.last_pos {
                    return Err(Mutpos2VcfError::UnsortedInput {
                        contig: record.chrom.clone(),
                        position: record.pos,
                        reason: format!("position does not increase past {}", self.last_pos),
                    });
                }
            }
            Some(_) => {
                return Err(Mutpos2VcfError::UnsortedInput {
                    contig: record.chrom.clone(),
                    position: record.pos,
                    reason: "contig reappears after a later contig".to_string(),
                });
            }
            None => {
                self.seen_contigs.push(record.chrom.clone());
            }
        }
        self.last_pos = record.pos;

        writeln!(self.writer, "{}", record.to_line())?;
        Ok(())
    }

    pub fn flush(&mut self) -> Mutpos2VcfResult<()> {
        self.writer.flush()?;
        Ok(())
    }
}
