//! Reference sequence access through an indexed FASTA

use crate::{Mutpos2VcfError, Mutpos2VcfResult};
use rust_htslib::faidx;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// A named reference sequence and its length, in reference-index order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contig {
    pub name: String,
    pub length: u64,
}

/// Reference base(s) covering the span needed to represent a call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReferenceContext {
    pub contig: String,
    /// 1-based position of the first base in `bases`.
    pub position: u64,
    /// Uppercased reference bases, `span` long.
    pub bases: String,
}

/// Read-only random access to an indexed reference sequence.
///
/// Coordinates are 1-based and inclusive throughout, matching the mutpos
/// input convention.
pub trait ReferenceLookup {
    /// Fetch the reference bases for `contig` from `start` to `end` inclusive.
    fn get_sequence(&self, contig: &str, start: u64, end: u64) -> Mutpos2VcfResult<String>;

    fn has_contig(&self, contig: &str) -> bool;

    fn contig_length(&self, contig: &str) -> Option<u64>;

    /// All contigs, in the order they appear in the reference index.
    fn contigs(&self) -> &[Contig];

    /// Resolve the reference context starting at `position` over `span` bases.
    ///
    /// Fails with `UnknownContig` when the contig is absent from the index
    /// and with `PositionOutOfRange` when `position + span - 1` exceeds the
    /// contig length. Bases are uppercased so soft-masked reference regions
    /// compare cleanly against observed alleles.
    fn resolve(&self, contig: &str, position: u64, span: u64) -> Mutpos2VcfResult<ReferenceContext> {
        let length = self
            .contig_length(contig)
            .ok_or_else(|| Mutpos2VcfError::UnknownContig(contig.to_string()))?;

        let end = position + span - 1;
        if position == 0 || span == 0 || end > length {
            return Err(Mutpos2VcfError::PositionOutOfRange {
                contig: contig.to_string(),
                position,
                span,
                length,
            });
        }

        let bases = self.get_sequence(contig, position, end)?.to_ascii_uppercase();
        Ok(ReferenceContext {
            contig: contig.to_string(),
            position,
            bases,
        })
    }
}

/// Indexed FASTA reader backed by htslib's faidx.
///
/// Contig names and lengths are cached from the index at open time; sequence
/// data is fetched on demand through the index.
pub struct IndexedFasta {
    reader: faidx::Reader,
    contigs: Vec<Contig>,
}

impl IndexedFasta {
    pub fn open<P: AsRef<Path>>(path: P) -> Mutpos2VcfResult<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(Mutpos2VcfError::FileNotFound(path.to_string_lossy().to_string()));
        }

        let reader = faidx::Reader::from_path(path)?;

        let mut contigs = Vec::new();
        for name in reader.seq_names()? {
            let length = reader.fetch_seq_len(&name);
            contigs.push(Contig { name, length });
        }

        log::debug!("Opened reference with {} contigs: {}", contigs.len(), path.display());
        Ok(IndexedFasta { reader, contigs })
    }
}

impl ReferenceLookup for IndexedFasta {
    fn get_sequence(&self, contig: &str, start: u64, end: u64) -> Mutpos2VcfResult<String> {
        // htslib takes 0-based inclusive coordinates
        let seq = self
            .reader
            .fetch_seq_string(contig, (start - 1) as usize, (end - 1) as usize)?;
        Ok(seq)
    }

    fn has_contig(&self, contig: &str) -> bool {
        self.contigs.iter().any(|c| c.name == contig)
    }

    fn contig_length(&self, contig: &str) -> Option<u64> {
        self.contigs.iter().find(|c| c.name == contig).map(|c| c.length)
    }

    fn contigs(&self) -> &[Contig] {
        &self.contigs
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use std::collections::HashMap;

    /// In-memory reference for tests that do not need a real FASTA file.
    pub struct InMemoryReference {
        contigs: Vec<Contig>,
        sequences: HashMap<String, String>,
    }

    impl InMemoryReference {
        pub fn new(sequences: &[(&str, &str)]) -> Self {
            let contigs = sequences
                .iter()
                .map(|(name, seq)| Contig {
                    name: name.to_string(),
                    length: seq.len() as u64,
                })
                .collect();
            let sequences = sequences
                .iter()
                .map(|(name, seq)| (name.to_string(), seq.to_string()))
                .collect();
            InMemoryReference { contigs, sequences }
        }
    }

    impl ReferenceLookup for InMemoryReference {
        fn get_sequence(&self, contig: &str, start: u64, end: u64) -> Mutpos2VcfResult<String> {
            let seq = self
                .sequences
                .get(contig)
                .ok_or_else(|| Mutpos2VcfError::UnknownContig(contig.to_string()))?;
            Ok(seq[(start - 1) as usize..end as usize].to_string())
        }

        fn has_contig(&self, contig: &str) -> bool {
            self.sequences.contains_key(contig)
        }

        fn contig_length(&self, contig: &str) -> Option<u64> {
            self.sequences.get(contig).map(|s| s.len() as u64)
        }

        fn contigs(&self) -> &[Contig] {
            &self.contigs
        }
    }
}

#[cfg(test)]
mod tests {
    use super::testing::InMemoryReference;
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn test_fasta(records: &[(&str, &str)]) -> NamedTempFile {
        let mut fasta = NamedTempFile::with_suffix(".fa").unwrap();
        for (name, seq) in records {
            writeln!(fasta, ">{}", name).unwrap();
            writeln!(fasta, "{}", seq).unwrap();
        }
        fasta.flush().unwrap();
        rust_htslib::faidx::build(fasta.path()).expect("Failed to index FASTA file");
        fasta
    }

    #[test]
    fn test_indexed_fasta_contigs_in_index_order() {
        let fasta = test_fasta(&[("chr1", "ACGTACGT"), ("chr2", "GGGG")]);
        let reference = IndexedFasta::open(fasta.path()).unwrap();

        let contigs = reference.contigs();
        assert_eq!(contigs.len(), 2);
        assert_eq!(contigs[0], Contig { name: "chr1".to_string(), length: 8 });
        assert_eq!(contigs[1], Contig { name: "chr2".to_string(), length: 4 });
        assert!(reference.has_contig("chr2"));
        assert!(!reference.has_contig("chrM"));
        assert_eq!(reference.contig_length("chr1"), Some(8));
        assert_eq!(reference.contig_length("chrM"), None);
    }

    #[test]
    fn test_indexed_fasta_get_sequence_is_one_based_inclusive() {
        let fasta = test_fasta(&[("chr1", "ACGTACGT")]);
        let reference = IndexedFasta::open(fasta.path()).unwrap();

        assert_eq!(reference.get_sequence("chr1", 1, 1).unwrap(), "A");
        assert_eq!(reference.get_sequence("chr1", 2, 4).unwrap(), "CGT");
        assert_eq!(reference.get_sequence("chr1", 8, 8).unwrap(), "T");
    }

    #[test]
    fn test_resolve_uppercases_soft_masked_bases() {
        let fasta = test_fasta(&[("chr1", "acgtacgt")]);
        let reference = IndexedFasta::open(fasta.path()).unwrap();

        let context = reference.resolve("chr1", 2, 3).unwrap();
        assert_eq!(context.bases, "CGT");
        assert_eq!(context.position, 2);
    }

    #[test]
    fn test_resolve_unknown_contig() {
        let fasta = test_fasta(&[("chr1", "ACGT")]);
        let reference = IndexedFasta::open(fasta.path()).unwrap();

        assert!(matches!(
            reference.resolve("chr9", 1, 1),
            Err(Mutpos2VcfError::UnknownContig(contig)) if contig == "chr9"
        ));
    }

    #[test]
    fn test_resolve_position_out_of_range() {
        let fasta = test_fasta(&[("chr1", "ACGT")]);
        let reference = IndexedFasta::open(fasta.path()).unwrap();

        // Span runs past the end of the contig
        assert!(matches!(
            reference.resolve("chr1", 4, 2),
            Err(Mutpos2VcfError::PositionOutOfRange { length: 4, .. })
        ));
        assert!(matches!(
            reference.resolve("chr1", 5, 1),
            Err(Mutpos2VcfError::PositionOutOfRange { .. })
        ));
        // Last base with span 1 is still in range
        assert_eq!(reference.resolve("chr1", 4, 1).unwrap().bases, "T");
    }

    #[test]
    fn test_open_missing_file() {
        assert!(matches!(
            IndexedFasta::open("/nonexistent/reference.fa"),
            Err(Mutpos2VcfError::FileNotFound(_))
        ));
    }

    #[test]
    fn test_in_memory_reference_matches_trait_contract() {
        let reference = InMemoryReference::new(&[("chr1", "ACGT")]);
        assert_eq!(reference.resolve("chr1", 1, 2).unwrap().bases, "AC");
        assert!(reference.resolve("chr1", 4, 2).is_err());
        assert!(reference.resolve("chrX", 1, 1).is_err());
    }
}
