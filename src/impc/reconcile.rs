//! Reconciliation of IMPC feed records with the database content.
//!
//! `Reconciler::reconcile()` is a pure function of the record, the indices and
//! the configuration.  It returns the record's disposition together with the
//! non-rejecting flags raised on the way.  Only the `CreationBuffer` keeps
//! state across records.

use indexmap::IndexMap;

use crate::{
    alleles::{KnownAllele, KnownAlleleIndex},
    conf::{Conf, ImpcConf},
    qc::{QcCategory, QcFinding},
    refdata::{Domain, Marker, ReferenceLookup, NOT_SPECIFIED_STRAIN},
};

use super::{input::InputRecord, symbol};

/// Allele class of all CRISPR alleles, as stored in MGI.
pub const ALLELE_CLASS: &str = "Endonuclease-mediated";

/// Strain names of the feed that are aliases of an MGI strain.
const STRAIN_ALIASES: &[(&str, &str)] = &[
    ("C57BL/6NTac/Den", "C57BL/6NTac"),
    ("C57BL/6NTac/USA", "C57BL/6NTac"),
];

/// A colony ID to attach to an existing allele.
#[derive(Debug, Clone, PartialEq, Eq, derive_new::new)]
pub struct ColonyNote {
    pub allele_id: String,
    pub colony_id: String,
    /// The allele's colony note already carries the colony ID.
    pub already_on_file: bool,
}

/// A fully resolved allele to create.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewAllele {
    pub line_no: usize,
    pub raw_line: String,
    pub marker_id: String,
    pub marker_symbol: String,
    /// MGI mutation types.
    pub allele_types: Vec<String>,
    /// MGI subtypes, may be empty.
    pub subtypes: Vec<String>,
    pub description: String,
    pub colony_id: String,
    pub strain: String,
    pub symbol: String,
    pub name: String,
    pub inheritance_mode: String,
    pub allele_class: String,
    pub allele_status: String,
    pub transmission_state: String,
    pub collection: String,
    pub j_number: String,
    pub created_by: String,
}

/// What to do with an input record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Disposition {
    Create(Box<NewAllele>),
    AttachColonyNote(ColonyNote),
    Reject(Vec<QcFinding>),
}

/// Result of reconciling one input record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Verdict {
    pub disposition: Disposition,
    /// Findings that do not reject the record.
    pub flags: Vec<QcFinding>,
}

/// Outcome of the identity resolution.
enum Identity {
    Known(ColonyNote),
    Rejected(Vec<QcFinding>),
    Unknown,
}

/// Reconciles input records against the reference data and known alleles.
pub struct Reconciler<'a, R: ReferenceLookup> {
    refs: &'a R,
    alleles: &'a KnownAlleleIndex,
    conf: &'a Conf,
}

impl<'a, R: ReferenceLookup> Reconciler<'a, R> {
    pub fn new(refs: &'a R, alleles: &'a KnownAlleleIndex, conf: &'a Conf) -> Self {
        Self {
            refs,
            alleles,
            conf,
        }
    }

    /// Reconcile a single input record.
    pub fn reconcile(&self, record: &InputRecord) -> Verdict {
        let missing = record.missing_fields();
        if !missing.is_empty() {
            return Verdict {
                disposition: Disposition::Reject(vec![finding(
                    record,
                    QcCategory::MissingRequiredValue,
                    vec![missing.join(", ")],
                )]),
                flags: Vec::new(),
            };
        }

        let mut flags = Vec::new();
        let strain = self.resolve_strain(record, &mut flags);
        let marker = match self.check_vocabularies(record) {
            Ok(marker) => marker,
            Err(findings) => {
                return Verdict {
                    disposition: Disposition::Reject(findings),
                    flags,
                }
            }
        };

        let symbol = self
            .conf
            .impc
            .symbol_style
            .canonical_symbol(&marker.symbol, &record.allele_symbol);
        let disposition = match self.resolve_identity(record, &symbol) {
            Identity::Known(note) => Disposition::AttachColonyNote(note),
            Identity::Rejected(findings) => Disposition::Reject(findings),
            Identity::Unknown => match self.new_allele(record, marker, symbol, strain) {
                Ok(allele) => Disposition::Create(Box::new(allele)),
                Err(findings) => Disposition::Reject(findings),
            },
        };

        Verdict { disposition, flags }
    }

    /// Resolve the strain, falling back to "Not Specified" with a flag.
    fn resolve_strain(&self, record: &InputRecord, flags: &mut Vec<QcFinding>) -> String {
        let strain = STRAIN_ALIASES
            .iter()
            .find(|(alias, _)| *alias == record.strain)
            .map(|(_, strain)| *strain)
            .unwrap_or(record.strain.as_str());
        if self.refs.resolve(Domain::Strain, strain).is_some() {
            strain.to_string()
        } else {
            flags.push(finding(record, QcCategory::StrainNotInMgi, Vec::new()));
            String::from(NOT_SPECIFIED_STRAIN)
        }
    }

    /// Check marker, class, type, and subtype; collects all failures.
    fn check_vocabularies(&self, record: &InputRecord) -> Result<&'a Marker, Vec<QcFinding>> {
        let mut findings = Vec::new();

        let marker = self.refs.marker(&record.marker_id);
        if marker.is_none() {
            findings.push(finding(record, QcCategory::MarkerIdNotInMgi, Vec::new()));
        }
        if !record.allele_class.eq_ignore_ascii_case(ALLELE_CLASS) {
            findings.push(finding(record, QcCategory::UnknownAlleleClass, Vec::new()));
        }
        if !self.conf.impc.is_known_type(&record.allele_type) {
            findings.push(finding(record, QcCategory::UnknownAlleleType, Vec::new()));
        }
        if !record.allele_subtype.is_empty()
            && !self.conf.impc.is_known_subtype(&record.allele_subtype)
        {
            findings.push(finding(record, QcCategory::UnknownAlleleSubtype, Vec::new()));
        }

        match marker {
            Some(marker) if findings.is_empty() => Ok(marker),
            _ => Err(findings),
        }
    }

    /// Identify the record's allele by accession ID, colony ID, or symbol.
    fn resolve_identity(&self, record: &InputRecord, symbol: &str) -> Identity {
        if !record.allele_id.is_empty() {
            self.by_accession_id(record, symbol)
        } else {
            let by_colony = self.alleles.by_colony_id(&record.colony_id);
            if !by_colony.is_empty() {
                self.by_colony_id(record, &by_colony)
            } else {
                self.by_symbol(record, symbol)
            }
        }
    }

    fn by_accession_id(&self, record: &InputRecord, symbol: &str) -> Identity {
        let allele = match self.alleles.by_accession_id(&record.allele_id) {
            Some(allele) => allele,
            None => {
                let object_types = self.refs.object_types(&record.allele_id).join(", ");
                return Identity::Rejected(vec![finding(
                    record,
                    QcCategory::AlleleIdNotInMgi,
                    vec![object_types],
                )]);
            }
        };
        if !allele.is_approved() {
            return Identity::Rejected(vec![finding(
                record,
                QcCategory::AlleleIdStatusDiscrepancy,
                vec![allele.status.clone()],
            )]);
        }

        let mut findings = Vec::new();
        if record.marker_id != allele.marker_id
            && !self
                .refs
                .is_marker_accession(&record.marker_id, allele.marker_key)
        {
            findings.push(finding(
                record,
                QcCategory::AlleleIdMarkerMismatch,
                vec![
                    record.allele_id.clone(),
                    symbol.to_string(),
                    allele.marker_id.clone(),
                    allele.marker_symbol.clone(),
                ],
            ));
        }
        if !allele.symbol.contains(&record.allele_symbol) {
            findings.push(finding(
                record,
                QcCategory::AlleleIdSymbolMismatch,
                vec![allele.accession_id.clone(), allele.symbol.clone()],
            ));
        }
        let already_on_file = allele.has_colony_id(&record.colony_id);
        if !allele.colony_ids.is_empty() && !already_on_file {
            findings.push(finding(
                record,
                QcCategory::AlleleIdColonyMismatch,
                vec![
                    record.allele_id.clone(),
                    allele.symbol.clone(),
                    allele.colony_note(),
                ],
            ));
        }
        let by_colony = self.alleles.by_colony_id(&record.colony_id);
        let colony_match = |category, other: &KnownAllele| {
            finding(
                record,
                category,
                vec![
                    record.allele_id.clone(),
                    record.allele_symbol.clone(),
                    record.colony_id.clone(),
                    other.accession_id.clone(),
                    other.symbol.clone(),
                    other.allele_type.clone(),
                    other.colony_note(),
                ],
            )
        };
        match by_colony.as_slice() {
            [] => (),
            [other] => {
                if other.accession_id != allele.accession_id {
                    findings.push(colony_match(
                        QcCategory::AlleleIdColonyMatchesDifferentAllele,
                        *other,
                    ));
                }
            }
            others => findings.extend(
                others
                    .iter()
                    .map(|other| colony_match(QcCategory::AlleleIdColonyMatchesMultiple, *other)),
            ),
        }

        if findings.is_empty() {
            Identity::Known(ColonyNote::new(
                allele.accession_id.clone(),
                record.colony_id.clone(),
                already_on_file,
            ))
        } else {
            Identity::Rejected(findings)
        }
    }

    fn by_colony_id(&self, record: &InputRecord, by_colony: &[&KnownAllele]) -> Identity {
        let allele = match by_colony {
            [allele] => *allele,
            alleles => {
                return Identity::Rejected(
                    alleles
                        .iter()
                        .map(|allele| {
                            finding(
                                record,
                                QcCategory::ColonyIdMultipleAlleles,
                                vec![allele.accession_id.clone(), allele.symbol.clone()],
                            )
                        })
                        .collect(),
                )
            }
        };
        if !allele.is_approved() {
            return Identity::Rejected(vec![finding(
                record,
                QcCategory::ColonyIdStatusDiscrepancy,
                vec![
                    allele.accession_id.clone(),
                    allele.symbol.clone(),
                    allele.status.clone(),
                ],
            )]);
        }

        let mut findings = Vec::new();
        if record.marker_id != allele.marker_id {
            findings.push(finding(
                record,
                QcCategory::ColonyIdMarkerMismatch,
                vec![allele.accession_id.clone(), allele.symbol.clone()],
            ));
        }
        if !allele.symbol.contains(&record.allele_symbol) {
            findings.push(finding(
                record,
                QcCategory::ColonyIdSymbolMismatch,
                vec![allele.accession_id.clone(), allele.symbol.clone()],
            ));
        }

        if findings.is_empty() {
            Identity::Known(ColonyNote::new(
                allele.accession_id.clone(),
                record.colony_id.clone(),
                true,
            ))
        } else {
            Identity::Rejected(findings)
        }
    }

    fn by_symbol(&self, record: &InputRecord, symbol: &str) -> Identity {
        let allele = match self.alleles.by_symbol(symbol).as_slice() {
            [] => return Identity::Unknown,
            [allele] => *allele,
            alleles => {
                return Identity::Rejected(
                    alleles
                        .iter()
                        .map(|allele| {
                            finding(
                                record,
                                QcCategory::SymbolMatchesMultipleAlleles,
                                vec![allele.accession_id.clone(), allele.symbol.clone()],
                            )
                        })
                        .collect(),
                )
            }
        };

        let mut findings = Vec::new();
        if !allele.is_approved() {
            findings.push(finding(
                record,
                QcCategory::SymbolMatchStatusDiscrepancy,
                vec![
                    allele.accession_id.clone(),
                    allele.symbol.clone(),
                    allele.status.clone(),
                ],
            ));
        }
        let already_on_file = allele.has_colony_id(&record.colony_id);
        if !allele.colony_ids.is_empty() && !already_on_file {
            findings.push(finding(
                record,
                QcCategory::SymbolMatchColonyIdMismatch,
                vec![
                    allele.accession_id.clone(),
                    allele.symbol.clone(),
                    allele.colony_note(),
                ],
            ));
        }

        if findings.is_empty() {
            Identity::Known(ColonyNote::new(
                allele.accession_id.clone(),
                record.colony_id.clone(),
                false,
            ))
        } else {
            Identity::Rejected(findings)
        }
    }

    /// Check eligibility of a new allele and build it.
    fn new_allele(
        &self,
        record: &InputRecord,
        marker: &Marker,
        symbol: String,
        strain: String,
    ) -> Result<NewAllele, Vec<QcFinding>> {
        let mut findings = Vec::new();

        if symbol::has_bad_nomenclature(&symbol) {
            findings.push(finding(
                record,
                QcCategory::BadNomenclature,
                vec![symbol.clone()],
            ));
        }
        let lab_code = symbol::lab_code(&symbol);
        let lab_name = self.refs.lab_name(&lab_code);
        if lab_name.is_none() {
            findings.push(finding(record, QcCategory::LabCodeNotInMgi, vec![lab_code]));
        }
        let key = ImpcConf::translation_key(&record.allele_type, &record.allele_subtype);
        let translation = self.conf.impc.translate(&key);
        if translation.is_none() {
            findings.push(finding(
                record,
                QcCategory::TypeSubtypeNotTranslated,
                vec![key],
            ));
        }

        match (lab_name, translation) {
            (Some(lab_name), Some(translation)) if findings.is_empty() => {
                let allele = &self.conf.allele;
                Ok(NewAllele {
                    line_no: record.line_no,
                    raw_line: record.raw_line.clone(),
                    marker_id: marker.id.clone(),
                    marker_symbol: marker.symbol.clone(),
                    allele_types: translation.allele_types,
                    subtypes: translation.subtypes,
                    description: allele.description.clone(),
                    colony_id: record.colony_id.clone(),
                    strain,
                    name: symbol::allele_name(&symbol::sequence_num(&symbol), lab_name),
                    symbol,
                    inheritance_mode: allele.inheritance_mode.clone(),
                    allele_class: String::from(ALLELE_CLASS),
                    allele_status: allele.allele_status.clone(),
                    transmission_state: allele.transmission_state.clone(),
                    collection: allele.allele_collection.clone(),
                    j_number: allele.j_number.clone(),
                    created_by: allele.created_by.clone(),
                })
            }
            _ => Err(findings),
        }
    }
}

/// Construct finding for `record`.
fn finding(record: &InputRecord, category: QcCategory, details: Vec<String>) -> QcFinding {
    QcFinding::new(category, record.line_no, details, record.raw_line.clone())
}

/// Buffer of alleles to create, used to detect symbols created twice.
#[derive(Debug, Default)]
pub struct CreationBuffer {
    by_symbol: IndexMap<String, Vec<NewAllele>>,
}

impl CreationBuffer {
    pub fn push(&mut self, allele: NewAllele) {
        self.by_symbol
            .entry(allele.symbol.clone())
            .or_default()
            .push(allele);
    }

    /// Split into alleles to create and findings for duplicated symbols.
    pub fn finish(self) -> (Vec<NewAllele>, Vec<QcFinding>) {
        let mut creates = Vec::new();
        let mut duplicates = Vec::new();
        for (symbol, mut alleles) in self.by_symbol {
            if alleles.len() == 1 {
                creates.append(&mut alleles);
            } else {
                duplicates.extend(alleles.into_iter().map(|allele| {
                    QcFinding::new(
                        QcCategory::DuplicateAlleleInInput,
                        allele.line_no,
                        vec![symbol.clone()],
                        allele.raw_line,
                    )
                }));
            }
        }
        (creates, duplicates)
    }
}
