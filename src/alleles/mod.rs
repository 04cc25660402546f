//! Index of the alleles already in the database.
//!
//! Alleles are indexed by accession ID, by symbol, and by colony ID.  The
//! colony ID index is case-insensitive and holds each allele symbol at most
//! once per colony ID.  The by-symbol index keeps all alleles sharing a symbol
//! so that duplicates in the database surface as QC findings.

use std::{collections::HashMap, path::Path, time::Instant};

use indexmap::IndexMap;
use multimap::MultiMap;
use thousands::Separable;

use crate::{common::io::tsv_reader, refdata::Key};

/// Status of alleles that are approved.
pub const STATUS_APPROVED: &str = "Approved";

/// Code for the records of `alleles.tsv`.
pub mod input {
    use serde::Deserialize;

    use crate::refdata::Key;

    /// One row of the allele dump; alleles with several colony notes have
    /// one row per note.
    #[derive(Debug, Deserialize, Clone, derive_new::new)]
    pub struct Record {
        /// preferred MGI accession ID of the allele
        pub allele_id: String,
        /// allele symbol
        pub symbol: String,
        /// allele status term
        pub status: String,
        /// allele type term
        pub allele_type: String,
        /// MGI ID of the allele's marker
        pub marker_id: String,
        /// symbol of the allele's marker
        pub marker_symbol: String,
        /// marker primary key
        pub marker_key: Key,
        /// IKMC colony note, `|`-separated colony IDs
        #[serde(default)]
        pub colony_note: String,
    }
}

/// An allele already in the database.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KnownAllele {
    pub accession_id: String,
    pub symbol: String,
    pub status: String,
    pub allele_type: String,
    pub marker_id: String,
    pub marker_symbol: String,
    pub marker_key: Key,
    /// Colony IDs from all colony notes, in order of first occurrence.
    pub colony_ids: Vec<String>,
}

impl KnownAllele {
    pub fn is_approved(&self) -> bool {
        self.status == STATUS_APPROVED
    }

    /// Case-insensitive check for `colony_id` among the allele's colony IDs.
    pub fn has_colony_id(&self, colony_id: &str) -> bool {
        let colony_id = fold_colony_id(colony_id);
        self.colony_ids
            .iter()
            .any(|cid| fold_colony_id(cid) == colony_id)
    }

    /// Colony IDs as written to the QC report.
    pub fn colony_note(&self) -> String {
        self.colony_ids.join("|")
    }
}

/// Case folding of colony IDs for comparison and indexing.
pub fn fold_colony_id(colony_id: &str) -> String {
    colony_id.to_lowercase()
}

/// Split a colony note into its colony IDs.
pub fn split_colony_note(note: &str) -> impl Iterator<Item = &str> {
    note.split('|').map(str::trim).filter(|cid| !cid.is_empty())
}

/// Index of the known alleles.
#[derive(Debug, Default)]
pub struct KnownAlleleIndex {
    alleles: Vec<KnownAllele>,
    by_id: HashMap<String, usize>,
    by_symbol: HashMap<String, Vec<usize>>,
    by_colony: MultiMap<String, usize>,
}

impl KnownAlleleIndex {
    /// Load the index from the allele dump at `path`.
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self, anyhow::Error> {
        let path = path.as_ref();
        tracing::debug!("loading known alleles from {:?}", path);
        let before_loading = Instant::now();

        let mut reader = tsv_reader(path)?;
        let mut records = Vec::new();
        for record in reader.deserialize() {
            let record: input::Record = record
                .map_err(|e| anyhow::anyhow!("problem parsing record in {:?}: {}", path, e))?;
            records.push(record);
        }
        let result = Self::build(records);

        tracing::info!(
            "loaded {} known alleles with {} colony IDs in {:?}",
            result.len().separate_with_commas(),
            result.by_colony.len().separate_with_commas(),
            before_loading.elapsed()
        );
        Ok(result)
    }

    /// Build index from allele dump records.
    pub fn build<I>(records: I) -> Self
    where
        I: IntoIterator<Item = input::Record>,
    {
        let mut merged: IndexMap<String, KnownAllele> = IndexMap::new();
        for record in records {
            let allele = merged
                .entry(record.allele_id.clone())
                .or_insert_with(|| KnownAllele {
                    accession_id: record.allele_id.clone(),
                    symbol: record.symbol.clone(),
                    status: record.status.clone(),
                    allele_type: record.allele_type.clone(),
                    marker_id: record.marker_id.clone(),
                    marker_symbol: record.marker_symbol.clone(),
                    marker_key: record.marker_key,
                    colony_ids: Vec::new(),
                });
            for cid in split_colony_note(&record.colony_note) {
                if !allele.has_colony_id(cid) {
                    allele.colony_ids.push(cid.to_string());
                }
            }
        }

        let mut result = Self::default();
        for (idx, allele) in merged.into_values().enumerate() {
            result.by_id.insert(allele.accession_id.clone(), idx);
            result
                .by_symbol
                .entry(allele.symbol.clone())
                .or_default()
                .push(idx);
            for cid in &allele.colony_ids {
                let cid = fold_colony_id(cid);
                let seen = result.by_colony.get_vec(&cid).map_or(false, |idxs| {
                    idxs.iter()
                        .any(|&other| result.alleles[other].symbol == allele.symbol)
                });
                if !seen {
                    result.by_colony.insert(cid, idx);
                }
            }
            result.alleles.push(allele);
        }
        result
    }

    /// Number of distinct alleles.
    pub fn len(&self) -> usize {
        self.alleles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.alleles.is_empty()
    }

    /// Allele with the preferred MGI accession ID.
    pub fn by_accession_id(&self, accession_id: &str) -> Option<&KnownAllele> {
        self.by_id.get(accession_id).map(|&idx| &self.alleles[idx])
    }

    /// All alleles with exactly the given symbol.
    pub fn by_symbol(&self, symbol: &str) -> Vec<&KnownAllele> {
        self.by_symbol
            .get(symbol)
            .map(|idxs| idxs.iter().map(|&idx| &self.alleles[idx]).collect())
            .unwrap_or_default()
    }

    /// All alleles whose colony note carries `colony_id`, one per symbol.
    pub fn by_colony_id(&self, colony_id: &str) -> Vec<&KnownAllele> {
        self.by_colony
            .get_vec(&fold_colony_id(colony_id))
            .map(|idxs| idxs.iter().map(|&idx| &self.alleles[idx]).collect())
            .unwrap_or_default()
    }
}

#[cfg(test)]
pub(crate) mod test {
    use pretty_assertions::assert_eq;

    use super::{input::Record, KnownAlleleIndex};

    pub const PATH_ALLELES: &str = "tests/refdata/alleles.tsv";

    fn record(id: &str, symbol: &str, colony_note: &str) -> Record {
        Record::new(
            id.to_string(),
            symbol.to_string(),
            String::from("Approved"),
            String::from("Endonuclease-mediated"),
            String::from("MGI:101"),
            String::from("Pax6"),
            1001,
            colony_note.to_string(),
        )
    }

    #[test]
    fn colony_index_is_case_insensitive() {
        let index = KnownAlleleIndex::build(vec![record("MGI:1", "Pax6<em1J>", "JR1001")]);

        let hits = index.by_colony_id("jr1001");
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].accession_id, "MGI:1");
        assert!(hits[0].has_colony_id("JR1001"));
    }

    #[test]
    fn colony_lookup_and_check_fold_alike() {
        let index = KnownAlleleIndex::build(vec![record("MGI:1", "Pax6<em1J>", "ÄR1001")]);

        let hits = index.by_colony_id("är1001");
        assert_eq!(hits.len(), 1);
        assert!(hits[0].has_colony_id("är1001"));
        assert!(hits[0].has_colony_id("ÄR1001"));
    }

    #[test]
    fn colony_notes_are_merged_and_split() {
        let index = KnownAlleleIndex::build(vec![
            record("MGI:1", "Pax6<em1J>", "JR1001|JR1002"),
            record("MGI:1", "Pax6<em1J>", "jr1002"),
            record("MGI:1", "Pax6<em1J>", "JR1003"),
        ]);

        assert_eq!(index.len(), 1);
        let allele = index.by_accession_id("MGI:1").expect("allele must be indexed");
        assert_eq!(allele.colony_note(), "JR1001|JR1002|JR1003");
        assert_eq!(index.by_colony_id("JR1003").len(), 1);
    }

    #[test]
    fn colony_index_holds_symbol_once() {
        // two accession IDs with the same symbol, e.g., a stale duplicate
        let index = KnownAlleleIndex::build(vec![
            record("MGI:1", "Pax6<em1J>", "JR1001"),
            record("MGI:2", "Pax6<em1J>", "JR1001"),
            record("MGI:3", "Pax6<em2J>", "JR1001"),
        ]);

        let symbols = index
            .by_colony_id("JR1001")
            .into_iter()
            .map(|a| a.symbol.as_str())
            .collect::<Vec<_>>();
        assert_eq!(symbols, vec!["Pax6<em1J>", "Pax6<em2J>"]);
        assert_eq!(index.by_symbol("Pax6<em1J>").len(), 2);
    }

    #[test]
    fn load_from_dump() -> Result<(), anyhow::Error> {
        let index = KnownAlleleIndex::from_path(PATH_ALLELES)?;

        assert!(!index.is_empty());
        let allele = index
            .by_accession_id("MGI:6100001")
            .expect("allele must be in dump");
        assert_eq!(allele.symbol, "Pax6<em1(IMPC)J>");
        assert!(allele.is_approved());
        assert!(index.by_symbol("Nope<em1J>").is_empty());

        Ok(())
    }
}
