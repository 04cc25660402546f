//! Writing of pipe-delimited bulk-load (bcp) files.

use std::{fmt::Display, io::Write, path::Path};

use itertools::Itertools;
use serde::{Deserialize, Serialize};

use crate::{common::io::open_write_maybe_gz, refdata::Key};

/// MGI type of alleles.
pub const MGI_TYPE_ALLELE: Key = 11;
/// Marker-allele association status "Curated".
pub const MARKER_STATUS_CURATED: Key = 4268545;
/// Reference association type "Original".
pub const REF_ASSOC_ORIGINAL: Key = 1011;
/// Reference association type "Molecular".
pub const REF_ASSOC_MOLECULAR: Key = 1012;
/// Note type "Molecular".
pub const NOTE_TYPE_MOLECULAR: Key = 1021;
/// Note type "IKMC Allele Colony Name".
pub const NOTE_TYPE_COLONY_ID: Key = 1041;
/// Annotation type "Allele/Subtype".
pub const ANNOT_TYPE_SUBTYPE: Key = 1014;
/// Annotation qualifier for subtype annotations.
pub const ANNOT_QUALIFIER: Key = 1614158;
/// Prefix of MGI accession IDs.
pub const MGI_PREFIX: &str = "MGI:";
/// Logical database "MGI".
pub const LOGICAL_DB_MGI: Key = 1;

/// Next primary keys to use, read from `next_keys.json`.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct NextKeys {
    pub allele: Key,
    pub mutation_assoc: Key,
    pub ref_assoc: Key,
    pub accession: Key,
    /// Numeric part of the next MGI accession ID.
    pub mgi_number: Key,
    pub note: Key,
    pub annot: Key,
}

impl NextKeys {
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self, anyhow::Error> {
        let path = path.as_ref();
        let file = std::fs::File::open(path)
            .map_err(|e| anyhow::anyhow!("could not open {:?} for reading: {}", path, e))?;
        serde_json::from_reader(std::io::BufReader::new(file))
            .map_err(|e| anyhow::anyhow!("could not parse {:?}: {}", path, e))
    }

    pub fn to_path<P: AsRef<Path>>(&self, path: P) -> Result<(), anyhow::Error> {
        let mut out = open_write_maybe_gz(path)?;
        serde_json::to_writer_pretty(&mut out, self)?;
        writeln!(out)?;
        out.flush()?;
        Ok(())
    }
}

/// Return current value of `key` and advance it.
fn take(key: &mut Key) -> Key {
    let result = *key;
    *key += 1;
    result
}

/// All values of one allele, resolved to keys.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedAllele {
    pub marker_key: Key,
    pub strain_key: Key,
    pub inheritance_key: Key,
    pub allele_type_key: Key,
    pub status_key: Key,
    pub transmission_key: Key,
    pub collection_key: Key,
    pub ref_key: Key,
    pub user_key: Key,
    pub mutation_keys: Vec<Key>,
    pub subtype_keys: Vec<Key>,
    pub symbol: String,
    pub name: String,
    pub description: String,
    pub colony_id: String,
}

/// Names of the bcp files, in the order of `BcpWriters` fields.
pub const BCP_FILES: &[&str] = &[
    "ALL_Allele.bcp",
    "ALL_Allele_Mutation.bcp",
    "MGI_Reference_Assoc.bcp",
    "ACC_Accession.bcp",
    "MGI_Note.bcp",
    "VOC_Annot.bcp",
];

/// Writers for the bcp files of one load.
pub struct BcpWriters {
    allele: Box<dyn Write>,
    mutation: Box<dyn Write>,
    ref_assoc: Box<dyn Write>,
    accession: Box<dyn Write>,
    note: Box<dyn Write>,
    annot: Box<dyn Write>,
    keys: NextKeys,
    load_date: String,
}

/// Write `fields` as one pipe-delimited row.
fn write_row<W: Write + ?Sized>(out: &mut W, fields: &[&dyn Display]) -> Result<(), anyhow::Error> {
    writeln!(out, "{}", fields.iter().join("|"))?;
    Ok(())
}

impl BcpWriters {
    /// Create the bcp files in `path_dir`.
    pub fn create<P: AsRef<Path>>(
        path_dir: P,
        keys: NextKeys,
        load_date: &str,
    ) -> Result<Self, anyhow::Error> {
        let path_dir = path_dir.as_ref();
        std::fs::create_dir_all(path_dir)
            .map_err(|e| anyhow::anyhow!("could not create {:?}: {}", path_dir, e))?;
        let mut writers = BCP_FILES
            .iter()
            .map(|name| open_write_maybe_gz(path_dir.join(name)))
            .collect::<Result<Vec<_>, _>>()?
            .into_iter();
        let mut next = || {
            writers
                .next()
                .ok_or_else(|| anyhow::anyhow!("missing bcp writer"))
        };
        Ok(Self {
            allele: next()?,
            mutation: next()?,
            ref_assoc: next()?,
            accession: next()?,
            note: next()?,
            annot: next()?,
            keys,
            load_date: load_date.to_string(),
        })
    }

    /// Write all rows for `allele`, returning its new MGI accession ID.
    pub fn write(&mut self, allele: &ResolvedAllele) -> Result<String, anyhow::Error> {
        let date = &self.load_date;
        let user = allele.user_key;
        let allele_key = take(&mut self.keys.allele);

        write_row(
            &mut self.allele,
            &[
                &allele_key,
                &allele.marker_key,
                &allele.strain_key,
                &allele.inheritance_key,
                &allele.allele_type_key,
                &allele.status_key,
                &allele.transmission_key,
                &allele.collection_key,
                &allele.symbol,
                &allele.name,
                &0,
                &0,
                &0,
                &allele.ref_key,
                &MARKER_STATUS_CURATED,
                &user,
                &user,
                &user,
                date,
                date,
                date,
            ],
        )?;

        for mutation_key in &allele.mutation_keys {
            let assoc_key = take(&mut self.keys.mutation_assoc);
            write_row(
                &mut self.mutation,
                &[&assoc_key, &allele_key, mutation_key, date, date],
            )?;
        }

        for ref_assoc_type in [REF_ASSOC_ORIGINAL, REF_ASSOC_MOLECULAR] {
            let assoc_key = take(&mut self.keys.ref_assoc);
            write_row(
                &mut self.ref_assoc,
                &[
                    &assoc_key,
                    &allele.ref_key,
                    &allele_key,
                    &MGI_TYPE_ALLELE,
                    &ref_assoc_type,
                    &user,
                    &user,
                    date,
                    date,
                ],
            )?;
        }

        for subtype_key in &allele.subtype_keys {
            let annot_key = take(&mut self.keys.annot);
            write_row(
                &mut self.annot,
                &[
                    &annot_key,
                    &ANNOT_TYPE_SUBTYPE,
                    &allele_key,
                    subtype_key,
                    &ANNOT_QUALIFIER,
                    date,
                    date,
                ],
            )?;
        }

        let accession_key = take(&mut self.keys.accession);
        let mgi_number = take(&mut self.keys.mgi_number);
        let allele_id = format!("{}{}", MGI_PREFIX, mgi_number);
        write_row(
            &mut self.accession,
            &[
                &accession_key,
                &allele_id,
                &MGI_PREFIX,
                &mgi_number,
                &LOGICAL_DB_MGI,
                &allele_key,
                &MGI_TYPE_ALLELE,
                &0,
                &1,
                &user,
                &user,
                date,
                date,
            ],
        )?;

        let notes = [
            (NOTE_TYPE_MOLECULAR, &allele.description),
            (NOTE_TYPE_COLONY_ID, &allele.colony_id),
        ];
        for (note_type, text) in notes.iter().filter(|(_, text)| !text.is_empty()) {
            let note_key = take(&mut self.keys.note);
            write_row(
                &mut self.note,
                &[
                    &note_key,
                    &allele_key,
                    &MGI_TYPE_ALLELE,
                    note_type,
                    text,
                    &user,
                    &user,
                    date,
                    date,
                ],
            )?;
        }

        Ok(allele_id)
    }

    /// Flush all files and return the keys to use by the next load.
    pub fn finish(mut self) -> Result<NextKeys, anyhow::Error> {
        for out in [
            &mut self.allele,
            &mut self.mutation,
            &mut self.ref_assoc,
            &mut self.accession,
            &mut self.note,
            &mut self.annot,
        ] {
            out.flush()?;
        }
        Ok(self.keys)
    }
}

#[cfg(test)]
mod test {
    use pretty_assertions::assert_eq;

    use super::{BcpWriters, NextKeys, ResolvedAllele};

    fn next_keys() -> NextKeys {
        NextKeys {
            allele: 100,
            mutation_assoc: 200,
            ref_assoc: 300,
            accession: 400,
            mgi_number: 7000000,
            note: 500,
            annot: 600,
        }
    }

    fn resolved(description: &str) -> ResolvedAllele {
        ResolvedAllele {
            marker_key: 1001,
            strain_key: 31,
            inheritance_key: 982,
            allele_type_key: 11127,
            status_key: 847114,
            transmission_key: 3982953,
            collection_key: 11025586,
            ref_key: 280002,
            user_key: 1571,
            mutation_keys: vec![847118, 847119],
            subtype_keys: vec![11025590],
            symbol: String::from("Pax6<em9(IMPC)J>"),
            name: String::from("endonuclease-mediated mutation 9, The Jackson Laboratory"),
            description: description.to_string(),
            colony_id: String::from("JR2001"),
        }
    }

    #[test]
    fn from_path() -> Result<(), anyhow::Error> {
        let keys = NextKeys::from_path("tests/refdata/next_keys.json")?;
        assert_eq!(keys.mgi_number, 7000000);
        Ok(())
    }

    #[test]
    fn write_allele() -> Result<(), anyhow::Error> {
        let tmp_dir = temp_testdir::TempDir::default();
        let mut writers = BcpWriters::create(&*tmp_dir, next_keys(), "10/16/2026")?;

        let first = writers.write(&resolved(""))?;
        let second = writers.write(&resolved("deletion of exon 3"))?;
        let keys = writers.finish()?;

        assert_eq!(first, "MGI:7000000");
        assert_eq!(second, "MGI:7000001");
        assert_eq!(keys.allele, 102);
        assert_eq!(keys.mutation_assoc, 204);
        assert_eq!(keys.ref_assoc, 304);
        assert_eq!(keys.note, 503);

        let allele = std::fs::read_to_string(tmp_dir.join("ALL_Allele.bcp"))?;
        let first_row = allele.lines().next().unwrap_or_default();
        assert_eq!(
            first_row,
            "100|1001|31|982|11127|847114|3982953|11025586|Pax6<em9(IMPC)J>|\
             endonuclease-mediated mutation 9, The Jackson Laboratory|0|0|0|280002|4268545|\
             1571|1571|1571|10/16/2026|10/16/2026|10/16/2026"
        );
        assert_eq!(first_row.split('|').count(), 21);

        let accession = std::fs::read_to_string(tmp_dir.join("ACC_Accession.bcp"))?;
        insta::assert_snapshot!(
            accession.lines().next().unwrap_or_default(),
            @"400|MGI:7000000|MGI:|7000000|1|100|11|0|1|1571|1571|10/16/2026|10/16/2026"
        );

        let notes = std::fs::read_to_string(tmp_dir.join("MGI_Note.bcp"))?;
        assert_eq!(
            notes,
            "500|100|11|1041|JR2001|1571|1571|10/16/2026|10/16/2026\n\
             501|101|11|1021|deletion of exon 3|1571|1571|10/16/2026|10/16/2026\n\
             502|101|11|1041|JR2001|1571|1571|10/16/2026|10/16/2026\n"
        );

        let annot = std::fs::read_to_string(tmp_dir.join("VOC_Annot.bcp"))?;
        assert_eq!(
            annot,
            "600|1014|100|11025590|1614158|10/16/2026|10/16/2026\n\
             601|1014|101|11025590|1614158|10/16/2026|10/16/2026\n"
        );

        Ok(())
    }
}
