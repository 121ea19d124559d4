//! CLI binary for mutpos2vcf - converts duplex-sequencing mutpos summaries to VCF

use clap::Parser;
use env_logger::Env;
use mutpos2vcf::{
    convert::convert_path,
    utils::{ensure_parent_dirs, validate_file_readable, Timer},
    CallingConfig, MalformedPolicy, Mutpos2VcfError, Mutpos2VcfResult,
};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "mutpos2vcf")]
#[command(about = "Convert duplex-sequencing mutpos summaries to VCF")]
#[command(long_about = "
mutpos2vcf converts a mutpos file - a per-genomic-position summary of
observed mutation counts produced by a duplex-sequencing error-correction
pipeline - into a standard VCF 4.2 file of called variants.

Each input line carries a contig, a 1-based position, the total
read-family depth and per-allele counts (A, C, G, T, insertions,
deletions). Positions where at least one non-reference allele meets the
configured depth, count and fraction thresholds are emitted as VCF
records; multiple qualifying alleles at one position become a single
multi-allelic record.

The reference FASTA must be indexed (a .fai file next to it, as written
by 'samtools faidx'). Input may be gzip-compressed; an output path ending
in .gz enables gzip compression of the VCF.

The input must be coordinate-sorted (contigs grouped, positions
increasing); unsorted input is a fatal error rather than being silently
re-ordered.
")]
struct Args {
    /// Path to the input mutpos file (may be gzip-compressed)
    #[arg(long, value_name = "FILE")]
    input: PathBuf,

    /// Path to the indexed reference FASTA file
    #[arg(long, value_name = "FILE")]
    reference: PathBuf,

    /// Path to the output VCF file (.gz extension enables compression)
    #[arg(long, value_name = "FILE")]
    output: PathBuf,

    /// Minimum total read-family depth to consider a position
    #[arg(long, default_value_t = 1)]
    min_depth: u32,

    /// Minimum fraction of depth supporting an allele
    #[arg(long, default_value = "0.0")]
    min_allele_fraction: f64,

    /// Minimum absolute read-family count supporting an allele
    #[arg(long, default_value_t = 1)]
    min_supporting_count: u32,

    /// Sample name written to the VCF header
    #[arg(long, default_value = "SAMPLE")]
    sample_name: String,

    /// What to do with malformed input lines: abort or skip
    #[arg(long, value_parser = ["abort", "skip"], default_value = "abort")]
    on_malformed: String,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,

    /// Force overwrite of output file if it exists
    #[arg(short, long)]
    force: bool,
}

fn run() -> Mutpos2VcfResult<()> {
    let args = Args::parse();

    // Initialize logging
    let log_level = if args.debug {
        "debug"
    } else if args.verbose {
        "info"
    } else {
        "warn"
    };

    env_logger::Builder::from_env(Env::default().default_filter_or(log_level))
        .format_timestamp_secs()
        .init();

    log::info!("Starting mutpos2vcf");
    log::info!("Input mutpos: {:?}", args.input);
    log::info!("Reference FASTA: {:?}", args.reference);
    log::info!("Output VCF: {:?}", args.output);

    // Validate input files
    validate_file_readable(&args.input)?;
    validate_file_readable(&args.reference)?;

    // Check if output file exists and handle accordingly
    if args.output.exists() && !args.force {
        return Err(Mutpos2VcfError::Io(std::io::Error::new(
            std::io::ErrorKind::AlreadyExists,
            format!("Output file {:?} already exists. Use --force to overwrite.", args.output),
        )));
    }

    // Create output directory if it doesn't exist
    ensure_parent_dirs(&args.output)?;

    let on_malformed: MalformedPolicy = args
        .on_malformed
        .parse()
        .map_err(Mutpos2VcfError::InvalidConfig)?;

    let config = CallingConfig {
        min_depth: args.min_depth,
        min_allele_fraction: args.min_allele_fraction,
        min_supporting_count: args.min_supporting_count,
        sample_name: args.sample_name.clone(),
        on_malformed,
    };
    log::info!(
        "Thresholds: min_depth={}, min_allele_fraction={}, min_supporting_count={}",
        config.min_depth,
        config.min_allele_fraction,
        config.min_supporting_count
    );

    let _timer = Timer::new("Converting mutpos to VCF");
    let summary = convert_path(&args.input, &args.reference, &args.output, &config)?;

    log::info!("Conversion completed successfully");
    log::info!("  Records read: {}", summary.records_read);
    log::info!("  Positions called: {}", summary.positions_called);
    if summary.records_skipped > 0 {
        log::warn!("  Malformed records skipped: {}", summary.records_skipped);
    }
    log::info!("VCF written to: {:?}", args.output);

    Ok(())
}

/// Handle application errors and provide user-friendly messages
fn handle_error(error: Mutpos2VcfError) -> ! {
    match error {
        Mutpos2VcfError::FileNotFound(path) => {
            eprintln!("Error: File not found: {}", path);
            eprintln!("Please check that the file exists and is readable.");
        }
        Mutpos2VcfError::MalformedRecord { ref line_number, .. } => {
            eprintln!("Error: {}", error);
            eprintln!(
                "Fix the input at line {} or rerun with --on-malformed skip to drop bad lines.",
                line_number
            );
        }
        Mutpos2VcfError::UnknownContig(ref contig) => {
            eprintln!("Error: {}", error);
            eprintln!(
                "The mutpos input names contig '{}' which the reference FASTA does not contain.",
                contig
            );
            eprintln!("Please check that the input and reference belong together.");
        }
        Mutpos2VcfError::PositionOutOfRange { .. } => {
            eprintln!("Error: {}", error);
            eprintln!("Please check that the input and reference belong together.");
        }
        Mutpos2VcfError::UnsortedInput { .. } => {
            eprintln!("Error: {}", error);
            eprintln!("Sort the mutpos input by contig and position, then rerun.");
        }
        Mutpos2VcfError::InvalidCall(ref msg) => {
            eprintln!("Error: internal consistency failure: {}", msg);
            eprintln!("This indicates a defect in mutpos2vcf. Please report this issue.");
        }
        Mutpos2VcfError::InvalidConfig(ref msg) => {
            eprintln!("Error: Invalid configuration: {}", msg);
            eprintln!("Please check the threshold options.");
        }
        Mutpos2VcfError::Htslib(ref e) => {
            eprintln!("Error: Reference processing error: {}", e);
            eprintln!("Please check that the reference FASTA is valid and indexed (.fai).");
        }
        Mutpos2VcfError::Io(ref e) => {
            eprintln!("Error: I/O error: {}", e);
            eprintln!("Please check file permissions and disk space.");
        }
    }
    std::process::exit(1);
}

fn main() {
    if let Err(e) = run() {
        handle_error(e);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_args_defaults() {
        let args = Args::try_parse_from([
            "mutpos2vcf",
            "--input",
            "in.mutpos",
            "--reference",
            "ref.fa",
            "--output",
            "out.vcf",
        ])
        .unwrap();

        assert_eq!(args.min_depth, 1);
        assert_eq!(args.min_allele_fraction, 0.0);
        assert_eq!(args.min_supporting_count, 1);
        assert_eq!(args.sample_name, "SAMPLE");
        assert_eq!(args.on_malformed, "abort");
        assert!(!args.force);
    }

    #[test]
    fn test_args_thresholds() {
        let args = Args::try_parse_from([
            "mutpos2vcf",
            "--input",
            "in.mutpos",
            "--reference",
            "ref.fa",
            "--output",
            "out.vcf.gz",
            "--min-depth",
            "10",
            "--min-allele-fraction",
            "0.8",
            "--min-supporting-count",
            "5",
            "--on-malformed",
            "skip",
        ])
        .unwrap();

        assert_eq!(args.min_depth, 10);
        assert_eq!(args.min_allele_fraction, 0.8);
        assert_eq!(args.min_supporting_count, 5);
        assert_eq!(args.on_malformed.parse::<MalformedPolicy>().unwrap(), MalformedPolicy::Skip);
    }

    #[test]
    fn test_args_rejects_unknown_policy() {
        let result = Args::try_parse_from([
            "mutpos2vcf",
            "--input",
            "in.mutpos",
            "--reference",
            "ref.fa",
            "--output",
            "out.vcf",
            "--on-malformed",
            "ignore",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_args_require_input_paths() {
        assert!(Args::try_parse_from(["mutpos2vcf"]).is_err());
    }
}
