//! Reference data lookups (markers, strains, vocabularies, users, citations).
//!
//! All lookups are answered from in-memory maps that are built once per run
//! from the bulk dumps in the reference data directory.  A lookup never
//! fails; `None` signals that a value is not resolvable in MGI and the caller
//! records a QC finding for it.

use std::{collections::HashMap, path::Path, time::Instant};

use enum_map::{Enum, EnumMap};
use itertools::Itertools;
use thousands::Separable;

use crate::{common::io::tsv_reader, err::LoadError};

/// Primary key of a database object.
pub type Key = i64;

/// Strain name used when the colony background strain is not known to MGI.
pub const NOT_SPECIFIED_STRAIN: &str = "Not Specified";

/// Object type name of markers in `accessions.tsv`.
pub const MARKER_OBJECT_TYPE: &str = "Marker";

/// Code for the records of the reference dump files.
pub mod input {
    use serde::Deserialize;

    use super::Key;

    /// Record from `markers.tsv`: official mouse markers.
    #[derive(Debug, Deserialize, Clone)]
    pub struct MarkerRecord {
        /// marker primary key
        pub marker_key: Key,
        /// preferred MGI accession ID
        pub marker_id: String,
        /// marker symbol
        pub symbol: String,
    }

    /// Record from `accessions.tsv`: all MGI accession IDs with object type.
    #[derive(Debug, Deserialize, Clone)]
    pub struct AccessionRecord {
        /// MGI accession ID, preferred or secondary
        pub accession_id: String,
        /// name of the object type, e.g., `Marker` or `Allele`
        pub object_type: String,
        /// primary key of the object
        pub object_key: Key,
    }

    /// Record from `strains.tsv`: public strains.
    #[derive(Debug, Deserialize, Clone)]
    pub struct StrainRecord {
        /// strain primary key
        pub strain_key: Key,
        /// strain name
        pub strain: String,
    }

    /// Record from `terms.tsv`: vocabulary terms.
    #[derive(Debug, Deserialize, Clone)]
    pub struct TermRecord {
        /// vocabulary primary key
        pub vocab_key: u32,
        /// term primary key
        pub term_key: Key,
        /// the term itself
        pub term: String,
        /// term abbreviation, used for lab codes
        #[serde(default)]
        pub abbreviation: String,
    }

    /// Record from `users.tsv`.
    #[derive(Debug, Deserialize, Clone)]
    pub struct UserRecord {
        /// user primary key
        pub user_key: Key,
        /// user login
        pub login: String,
    }

    /// Record from `references.tsv`.
    #[derive(Debug, Deserialize, Clone)]
    pub struct ReferenceRecord {
        /// reference primary key
        pub ref_key: Key,
        /// J number, e.g., `J:265051`
        pub jnum: String,
    }
}

/// Controlled vocabularies used by the allele load.
#[derive(Enum, PartialEq, Eq, Clone, Copy, Debug, strum::Display, strum::EnumIter)]
pub enum Vocabulary {
    #[strum(serialize = "Allele Inheritance Mode")]
    InheritanceMode,
    #[strum(serialize = "Allele Molecular Mutation")]
    MolecularMutation,
    #[strum(serialize = "Allele Status")]
    AlleleStatus,
    #[strum(serialize = "Allele Type")]
    AlleleType,
    #[strum(serialize = "Allele Transmission")]
    Transmission,
    #[strum(serialize = "Cell Line Lab Code")]
    LabCode,
    #[strum(serialize = "Allele Collection")]
    Collection,
    #[strum(serialize = "Allele Subtype")]
    Subtype,
}

impl Vocabulary {
    /// The `_Vocab_key` of the vocabulary in MGI.
    pub fn vocab_key(&self) -> u32 {
        match self {
            Vocabulary::InheritanceMode => 35,
            Vocabulary::MolecularMutation => 36,
            Vocabulary::AlleleStatus => 37,
            Vocabulary::AlleleType => 38,
            Vocabulary::Transmission => 61,
            Vocabulary::LabCode => 71,
            Vocabulary::Collection => 92,
            Vocabulary::Subtype => 93,
        }
    }

    /// Inverse of `vocab_key()`.
    pub fn from_vocab_key(vocab_key: u32) -> Option<Self> {
        use strum::IntoEnumIterator;
        Vocabulary::iter().find(|v| v.vocab_key() == vocab_key)
    }
}

/// Domain of a value to resolve to a primary key.
#[derive(PartialEq, Eq, Clone, Copy, Debug)]
pub enum Domain {
    /// Term from a controlled vocabulary.
    Term(Vocabulary),
    /// Marker MGI accession ID.
    Marker,
    /// Strain name.
    Strain,
    /// User login.
    User,
    /// Reference J number.
    Reference,
}

impl std::fmt::Display for Domain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Domain::Term(vocab) => write!(f, "{}", vocab),
            Domain::Marker => write!(f, "Marker"),
            Domain::Strain => write!(f, "Strain"),
            Domain::User => write!(f, "User"),
            Domain::Reference => write!(f, "Reference"),
        }
    }
}

/// A resolved official marker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Marker {
    /// marker primary key
    pub key: Key,
    /// preferred MGI accession ID
    pub id: String,
    /// marker symbol
    pub symbol: String,
}

/// Capability of resolving raw values from the input to MGI objects.
pub trait ReferenceLookup {
    /// Resolve `raw` in `domain` to a primary key, `None` if unresolved.
    fn resolve(&self, domain: Domain, raw: &str) -> Option<Key>;

    /// Obtain the official marker with the (preferred or secondary) MGI ID.
    fn marker(&self, marker_id: &str) -> Option<&Marker>;

    /// Whether `accession_id` is any MGI ID (preferred or secondary) of the
    /// marker with `marker_key`.
    fn is_marker_accession(&self, accession_id: &str, marker_key: Key) -> bool;

    /// Object type names of all MGI objects carrying `accession_id`.
    fn object_types(&self, accession_id: &str) -> Vec<String>;

    /// Lab name for the lab code abbreviation.
    fn lab_name(&self, lab_code: &str) -> Option<&str>;
}

/// In-memory reference index built from the reference dumps.
#[derive(Debug, Default)]
pub struct ReferenceIndex {
    /// Official markers by primary key.
    markers: HashMap<Key, Marker>,
    /// Mapping from preferred marker ID to marker key.
    marker_by_id: HashMap<String, Key>,
    /// Mapping from accession ID to `(object type, object key)`.
    accessions: HashMap<String, Vec<(String, Key)>>,
    /// Strain name to key.
    strains: HashMap<String, Key>,
    /// Lowercase term to key, by vocabulary.
    terms: EnumMap<Vocabulary, HashMap<String, Key>>,
    /// Lab code abbreviation to lab name.
    lab_codes: HashMap<String, String>,
    /// User login to key.
    users: HashMap<String, Key>,
    /// Uppercase J number to key.
    references: HashMap<String, Key>,
}

impl ReferenceIndex {
    /// Load all reference dumps from `path_dir`.
    pub fn from_dir<P: AsRef<Path>>(path_dir: P) -> Result<Self, anyhow::Error> {
        let path_dir = path_dir.as_ref();
        let before_loading = Instant::now();

        let markers = load_records::<input::MarkerRecord>(&path_dir.join("markers.tsv"))?;
        let accessions = load_records::<input::AccessionRecord>(&path_dir.join("accessions.tsv"))?;
        let strains = load_records::<input::StrainRecord>(&path_dir.join("strains.tsv"))?;
        let terms = load_records::<input::TermRecord>(&path_dir.join("terms.tsv"))?;
        let users = load_records::<input::UserRecord>(&path_dir.join("users.tsv"))?;
        let references = load_records::<input::ReferenceRecord>(&path_dir.join("references.tsv"))?;

        let result = Self::build(markers, accessions, strains, terms, users, references)?;
        tracing::info!(
            "loaded reference data for {} markers and {} accession IDs in {:?}",
            result.markers.len().separate_with_commas(),
            result.accessions.len().separate_with_commas(),
            before_loading.elapsed()
        );
        Ok(result)
    }

    /// Build from already parsed dump records.
    pub fn build(
        markers: Vec<input::MarkerRecord>,
        accessions: Vec<input::AccessionRecord>,
        strains: Vec<input::StrainRecord>,
        terms: Vec<input::TermRecord>,
        users: Vec<input::UserRecord>,
        references: Vec<input::ReferenceRecord>,
    ) -> Result<Self, LoadError> {
        let mut result = Self::default();

        for record in markers {
            result
                .marker_by_id
                .insert(record.marker_id.clone(), record.marker_key);
            result.markers.insert(
                record.marker_key,
                Marker {
                    key: record.marker_key,
                    id: record.marker_id,
                    symbol: record.symbol,
                },
            );
        }
        for record in accessions {
            result
                .accessions
                .entry(record.accession_id)
                .or_default()
                .push((record.object_type, record.object_key));
        }
        for record in strains {
            result.strains.insert(record.strain, record.strain_key);
        }
        for record in terms {
            let vocab = Vocabulary::from_vocab_key(record.vocab_key).ok_or_else(|| {
                LoadError::MalformedDump {
                    file: String::from("terms.tsv"),
                    message: format!("unexpected vocabulary key {}", record.vocab_key),
                }
            })?;
            if vocab == Vocabulary::LabCode {
                result
                    .lab_codes
                    .insert(record.abbreviation.clone(), record.term.trim().to_string());
            }
            result.terms[vocab].insert(record.term.to_lowercase(), record.term_key);
        }
        for record in users {
            result.users.insert(record.login, record.user_key);
        }
        for record in references {
            result
                .references
                .insert(record.jnum.to_uppercase(), record.ref_key);
        }

        Ok(result)
    }
}

/// Read all records of a dump file.
fn load_records<T>(path: &Path) -> Result<Vec<T>, anyhow::Error>
where
    T: serde::de::DeserializeOwned,
{
    tracing::debug!("loading {:?}", path);
    let mut reader = tsv_reader(path)?;
    let mut result = Vec::new();
    for record in reader.deserialize() {
        let record: T =
            record.map_err(|e| anyhow::anyhow!("problem parsing record in {:?}: {}", path, e))?;
        result.push(record);
    }
    Ok(result)
}

impl ReferenceLookup for ReferenceIndex {
    fn resolve(&self, domain: Domain, raw: &str) -> Option<Key> {
        match domain {
            Domain::Term(vocab) => self.terms[vocab].get(&raw.to_lowercase()).copied(),
            Domain::Marker => self.marker(raw).map(|marker| marker.key),
            Domain::Strain => self.strains.get(raw).copied(),
            Domain::User => self.users.get(raw).copied(),
            Domain::Reference => self.references.get(&raw.to_uppercase()).copied(),
        }
    }

    fn marker(&self, marker_id: &str) -> Option<&Marker> {
        let key = self.marker_by_id.get(marker_id).copied().or_else(|| {
            self.accessions.get(marker_id).and_then(|entries| {
                entries
                    .iter()
                    .find(|(object_type, key)| {
                        object_type == MARKER_OBJECT_TYPE && self.markers.contains_key(key)
                    })
                    .map(|(_, key)| *key)
            })
        })?;
        self.markers.get(&key)
    }

    fn is_marker_accession(&self, accession_id: &str, marker_key: Key) -> bool {
        self.marker_by_id.get(accession_id) == Some(&marker_key)
            || self.accessions.get(accession_id).map_or(false, |entries| {
                entries
                    .iter()
                    .any(|(object_type, key)| object_type == MARKER_OBJECT_TYPE && *key == marker_key)
            })
    }

    fn object_types(&self, accession_id: &str) -> Vec<String> {
        self.accessions
            .get(accession_id)
            .map(|entries| entries.iter().map(|(t, _)| t.clone()).unique().collect())
            .unwrap_or_default()
    }

    fn lab_name(&self, lab_code: &str) -> Option<&str> {
        self.lab_codes.get(lab_code).map(String::as_str)
    }
}

#[cfg(test)]
pub(crate) mod test {
    use pretty_assertions::assert_eq;

    use super::{Domain, ReferenceIndex, ReferenceLookup, Vocabulary};

    /// Path to the reference dumps used in the tests.
    pub const PATH_REFDATA: &str = "tests/refdata";

    pub fn load_refdata() -> ReferenceIndex {
        ReferenceIndex::from_dir(PATH_REFDATA).expect("could not load test reference data")
    }

    #[rstest::rstest]
    #[case(Domain::Marker, "MGI:101", Some(1001))]
    #[case(Domain::Marker, "MGI:9101", Some(1001))]
    #[case(Domain::Marker, "MGI:55", Some(1055))]
    #[case(Domain::Marker, "MGI:404", None)]
    #[case(Domain::Strain, "C57BL/6NTac", Some(31))]
    #[case(Domain::Strain, "c57bl/6ntac", None)]
    #[case(Domain::Term(Vocabulary::AlleleType), "endonuclease-mediated", Some(11127))]
    #[case(Domain::Term(Vocabulary::MolecularMutation), "Intragenic deletion", Some(847118))]
    #[case(Domain::Term(Vocabulary::Subtype), "Intragenic deletion", None)]
    #[case(Domain::User, "impc_allele_load", Some(1571))]
    #[case(Domain::Reference, "j:265051", Some(280002))]
    fn resolve(#[case] domain: Domain, #[case] raw: &str, #[case] expected: Option<i64>) {
        let refs = load_refdata();
        assert_eq!(refs.resolve(domain, raw), expected, "{} {}", domain, raw);
    }

    #[test]
    fn marker_by_secondary_id() {
        let refs = load_refdata();
        let marker = refs.marker("MGI:9101").expect("secondary ID must resolve");
        assert_eq!(marker.id, "MGI:101");
        assert_eq!(marker.symbol, "Pax6");
        assert!(refs.is_marker_accession("MGI:9101", marker.key));
        assert!(refs.is_marker_accession("MGI:101", marker.key));
        assert!(!refs.is_marker_accession("MGI:55", marker.key));
    }

    #[test]
    fn object_types() {
        let refs = load_refdata();
        assert_eq!(refs.object_types("MGI:55"), vec![String::from("Marker")]);
        assert!(refs.object_types("MGI:777777").is_empty());
    }

    #[test]
    fn lab_name() {
        let refs = load_refdata();
        assert_eq!(refs.lab_name("J"), Some("The Jackson Laboratory"));
        assert_eq!(refs.lab_name("Xyz"), None);
    }

    #[test]
    fn domain_display() {
        assert_eq!(
            Domain::Term(Vocabulary::MolecularMutation).to_string(),
            "Allele Molecular Mutation"
        );
        assert_eq!(Domain::Strain.to_string(), "Strain");
    }
}
