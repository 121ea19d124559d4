//! End-to-end conversion pipeline from mutpos input to VCF output

use crate::caller::{call, validate_calling_config};
use crate::mutpos::MutposReader;
use crate::reference::{IndexedFasta, ReferenceLookup};
use crate::utils::has_extension;
use crate::vcf::{build_record, VcfWriter};
use crate::{CallingConfig, MalformedPolicy, Mutpos2VcfError, Mutpos2VcfResult};
use flate2::write::GzEncoder;
use flate2::Compression;
use serde::Serialize;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};

/// End-of-run accounting for one conversion.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ConversionSummary {
    /// Successfully parsed mutpos records.
    pub records_read: u64,
    /// Malformed lines skipped under the skip policy.
    pub records_skipped: u64,
    /// Positions with at least one qualifying variant call.
    pub positions_called: u64,
    /// True when the run stopped at the cancellation flag.
    pub cancelled: bool,
}

/// Run the full pipeline over open streams.
///
/// Each record is fully processed (parsed, resolved, called, built, written)
/// before the next is read, so memory stays O(1) in the number of positions.
/// The cancellation flag, when provided, is checked between records; on
/// cancellation the output is flushed and left as a valid VCF prefix.
pub fn convert<R: ReferenceLookup, W: Write>(
    reader: &mut MutposReader,
    resolver: &R,
    writer: W,
    config: &CallingConfig,
    cancel: Option<&AtomicBool>,
) -> Mutpos2VcfResult<ConversionSummary> {
    validate_calling_config(config)?;

    let mut vcf = VcfWriter::new(writer);
    vcf.write_header(resolver.contigs(), &config.sample_name)?;

    let mut summary = ConversionSummary::default();

    for result in reader.records() {
        if cancel.is_some_and(|flag| flag.load(Ordering::Relaxed)) {
            summary.cancelled = true;
            break;
        }

        let record = match result {
            Ok(record) => record,
            Err(error @ Mutpos2VcfError::MalformedRecord { .. })
                if config.on_malformed == MalformedPolicy::Skip =>
            {
                log::warn!("Skipping malformed record: {}", error);
                summary.records_skipped += 1;
                continue;
            }
            Err(error) => return Err(error),
        };
        summary.records_read += 1;

        let decision = call(&record, resolver, config)?;
        if decision.is_call {
            let vcf_record = build_record(&decision)?;
            vcf.write_record(&vcf_record)?;
            summary.positions_called += 1;
        }
    }

    vcf.flush()?;

    if summary.records_skipped > 0 {
        log::warn!("{} malformed records were skipped", summary.records_skipped);
    }
    if summary.cancelled {
        log::warn!("Conversion cancelled; output is a valid prefix");
    }

    Ok(summary)
}

/// Run the pipeline between file paths.
///
/// The reference and input are opened, and the configuration validated,
/// before the output file is created, so a setup failure never leaves a
/// partial output file behind. A `.gz` output extension selects gzip
/// compression.
pub fn convert_path<P: AsRef<Path>>(
    mutpos_path: P,
    reference_path: P,
    output_path: P,
    config: &CallingConfig,
) -> Mutpos2VcfResult<ConversionSummary> {
    validate_calling_config(config)?;

    let resolver = IndexedFasta::open(&reference_path)?;
    let mut reader = MutposReader::new(&mutpos_path)?;

    // Header inputs are all resolved; only now open the output stream
    let output_path = output_path.as_ref();
    let file = File::create(output_path)?;
    let writer: Box<dyn Write> = if has_extension(output_path, "gz") {
        Box::new(GzEncoder::new(file, Compression::default()))
    } else {
        Box::new(BufWriter::new(file))
    };

    convert(&mut reader, &resolver, writer, config, None)
}
