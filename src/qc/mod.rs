//! QC findings and the QC report.
//!
//! Findings are collected per category in a `QcLedger`.  The report renders
//! every category of the stage in a fixed order, including empty ones, so
//! that consecutive reports can be compared with `diff`.

use std::io::Write;

use enum_map::{Enum, EnumMap};
use itertools::Itertools;

/// Separator line below the column header of each report section.
const UNDERLINE: &str = "_____________________________________________________________";

/// Categories of QC findings.
#[derive(Enum, PartialEq, Eq, Clone, Copy, Debug, strum::EnumIter)]
pub enum QcCategory {
    MissingRequiredValue,
    MarkerIdNotInMgi,
    StrainNotInMgi,
    UnknownAlleleClass,
    UnknownAlleleType,
    UnknownAlleleSubtype,
    AlleleIdNotInMgi,
    AlleleIdStatusDiscrepancy,
    AlleleIdMarkerMismatch,
    AlleleIdSymbolMismatch,
    AlleleIdColonyMismatch,
    AlleleIdColonyMatchesMultiple,
    AlleleIdColonyMatchesDifferentAllele,
    ColonyIdMultipleAlleles,
    ColonyIdMarkerMismatch,
    ColonyIdSymbolMismatch,
    ColonyIdStatusDiscrepancy,
    SymbolMatchStatusDiscrepancy,
    SymbolMatchColonyIdMismatch,
    SymbolMatchesMultipleAlleles,
    BadNomenclature,
    LabCodeNotInMgi,
    TypeSubtypeNotTranslated,
    DuplicateAlleleInInput,
    TermNotResolved,
}

/// Columns shared by the sections on colony ID matches of other alleles.
const COLONY_MATCH_COLUMNS: &[&str] = &[
    "Input Allele ID",
    "Input Allele Symbol",
    "Input Colony ID",
    "DB Allele ID",
    "DB Allele Symbol",
    "DB Allele Type",
    "DB Colony ID",
];

impl QcCategory {
    /// Categories reported by the IMPC feed QC, in report order.
    pub const IMPC: &'static [QcCategory] = &[
        QcCategory::MissingRequiredValue,
        QcCategory::MarkerIdNotInMgi,
        QcCategory::StrainNotInMgi,
        QcCategory::UnknownAlleleClass,
        QcCategory::UnknownAlleleType,
        QcCategory::UnknownAlleleSubtype,
        QcCategory::AlleleIdNotInMgi,
        QcCategory::AlleleIdStatusDiscrepancy,
        QcCategory::AlleleIdMarkerMismatch,
        QcCategory::AlleleIdSymbolMismatch,
        QcCategory::AlleleIdColonyMismatch,
        QcCategory::AlleleIdColonyMatchesMultiple,
        QcCategory::AlleleIdColonyMatchesDifferentAllele,
        QcCategory::ColonyIdMultipleAlleles,
        QcCategory::ColonyIdMarkerMismatch,
        QcCategory::ColonyIdSymbolMismatch,
        QcCategory::ColonyIdStatusDiscrepancy,
        QcCategory::SymbolMatchStatusDiscrepancy,
        QcCategory::SymbolMatchColonyIdMismatch,
        QcCategory::SymbolMatchesMultipleAlleles,
        QcCategory::BadNomenclature,
        QcCategory::LabCodeNotInMgi,
        QcCategory::TypeSubtypeNotTranslated,
        QcCategory::DuplicateAlleleInInput,
    ];

    /// Categories reported by the allele bulk load.
    pub const LOAD: &'static [QcCategory] = &[QcCategory::TermNotResolved];

    /// Section title in the QC report.
    pub fn title(&self) -> &'static str {
        match self {
            QcCategory::MissingRequiredValue => "7.2.A.1 Required Value Missing or Invalid",
            QcCategory::MarkerIdNotInMgi => "7.2.A1 MGI Marker ID not in MGI",
            QcCategory::StrainNotInMgi => "7.2.A1 Colony Background Strain not in MGI",
            QcCategory::UnknownAlleleClass => "7.2.A1 Allele Class not Endonuclease-mediated",
            QcCategory::UnknownAlleleType => "7.2.A1 Allele (mutation) Type not in Translated Set",
            QcCategory::UnknownAlleleSubtype => "7.2.A1 Allele Subtype not in Translated Set",
            QcCategory::AlleleIdNotInMgi => "7.2.C1 MGI Allele ID present, No MGI Allele Match",
            QcCategory::AlleleIdStatusDiscrepancy => {
                "7.2.D3 Allele ID Match, Allele Status Discrepancy"
            }
            QcCategory::AlleleIdMarkerMismatch => "7.2.D1 Allele ID Match, Marker ID Mismatch",
            QcCategory::AlleleIdSymbolMismatch => "7.2.D2 Allele ID Match, Allele Symbol Mismatch",
            QcCategory::AlleleIdColonyMismatch => "7.2.D4a Allele ID Match, Colony ID Mismatch",
            QcCategory::AlleleIdColonyMatchesMultiple => {
                "7.2.D4b Allele ID match, Colony ID Match to Multi MGI Alleles"
            }
            QcCategory::AlleleIdColonyMatchesDifferentAllele => {
                "7.2.D4b Allele ID match, Colony ID Match to Different Allele"
            }
            QcCategory::ColonyIdMultipleAlleles => "7.2.F1 Colony ID Matches Multiple Alleles",
            QcCategory::ColonyIdMarkerMismatch => "7.2.F2a Colony ID Match, Marker ID Mismatch",
            QcCategory::ColonyIdSymbolMismatch => "7.2.F2b Colony ID Match, Allele Symbol Mismatch",
            QcCategory::ColonyIdStatusDiscrepancy => {
                "7.2.F3 Colony ID Match, Allele Status Discrepancy"
            }
            QcCategory::SymbolMatchStatusDiscrepancy => {
                "7.2.H1 Allele Symbol Match, Allele Status Discrepancy"
            }
            QcCategory::SymbolMatchColonyIdMismatch => {
                "7.2.H2 Allele Symbol Match, Colony ID Mismatch"
            }
            QcCategory::SymbolMatchesMultipleAlleles => {
                "7.2.H3 Allele Symbol Match to Multiple Alleles"
            }
            QcCategory::BadNomenclature => "Allele Symbol has incorrect nomenclature",
            QcCategory::LabCodeNotInMgi => "7.2.I No Allele Match, Lab Code not Present",
            QcCategory::TypeSubtypeNotTranslated => {
                "7.2.A1g Allele (mutation) Type/Allele Subtype combination not in Translated Set"
            }
            QcCategory::DuplicateAlleleInInput => "Duplicate Allele in Input",
            QcCategory::TermNotResolved => "Value not resolvable in MGI",
        }
    }

    /// Detail columns between `Line#` and `Input Line`.
    pub fn columns(&self) -> &'static [&'static str] {
        match self {
            QcCategory::MissingRequiredValue => &["Missing Value(s)"],
            QcCategory::MarkerIdNotInMgi
            | QcCategory::StrainNotInMgi
            | QcCategory::UnknownAlleleClass
            | QcCategory::UnknownAlleleType
            | QcCategory::UnknownAlleleSubtype => &[],
            QcCategory::AlleleIdNotInMgi => &["ObjectType"],
            QcCategory::AlleleIdStatusDiscrepancy => &["Allele Status"],
            QcCategory::AlleleIdMarkerMismatch => &[
                "Allele ID",
                "Allele Symbol",
                "DB Marker ID",
                "DB Marker Symbol",
            ],
            QcCategory::AlleleIdColonyMismatch => &["Allele ID", "DB Allele Symbol", "DB CID"],
            QcCategory::AlleleIdColonyMatchesMultiple
            | QcCategory::AlleleIdColonyMatchesDifferentAllele => COLONY_MATCH_COLUMNS,
            QcCategory::AlleleIdSymbolMismatch
            | QcCategory::ColonyIdMultipleAlleles
            | QcCategory::ColonyIdMarkerMismatch
            | QcCategory::ColonyIdSymbolMismatch
            | QcCategory::SymbolMatchesMultipleAlleles => &["DB Allele ID", "DB Allele Symbol"],
            QcCategory::ColonyIdStatusDiscrepancy | QcCategory::SymbolMatchStatusDiscrepancy => {
                &["DB Allele ID", "DB Allele Symbol", "DB Allele Status"]
            }
            QcCategory::SymbolMatchColonyIdMismatch => {
                &["DB Allele ID", "DB Allele Symbol", "DB Allele CID"]
            }
            QcCategory::BadNomenclature => &["Allele Symbol"],
            QcCategory::LabCodeNotInMgi => &["Lab Code"],
            QcCategory::TypeSubtypeNotTranslated => &["IMPC alleleType|subType"],
            QcCategory::DuplicateAlleleInInput => &["Allele Symbol"],
            QcCategory::TermNotResolved => &["Vocabulary", "Value"],
        }
    }
}

/// A single QC finding for one input line.
#[derive(Debug, Clone, PartialEq, Eq, derive_new::new)]
pub struct QcFinding {
    pub category: QcCategory,
    /// 1-based line number in the input file, the header is line 1.
    pub line_no: usize,
    /// Values for the category's detail columns.
    pub details: Vec<String>,
    /// The input line without line break.
    pub raw_line: String,
}

/// Counters for the report header.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    /// Name of the input file, prefixed with the host if configured.
    pub input_name: String,
    /// Lines read, including the header.
    pub lines_read: usize,
    /// Input lines that were found in the database already.
    pub alleles_found: Option<usize>,
    /// Input lines that were written to the output.
    pub lines_loaded: usize,
    /// Input lines that were rejected.
    pub lines_skipped: usize,
}

/// Findings of one run, grouped by category.
#[derive(Debug)]
pub struct QcLedger {
    sections: &'static [QcCategory],
    findings: EnumMap<QcCategory, Vec<QcFinding>>,
}

impl QcLedger {
    /// Construct ledger that reports `sections` in the given order.
    pub fn new(sections: &'static [QcCategory]) -> Self {
        Self {
            sections,
            findings: EnumMap::default(),
        }
    }

    pub fn add(&mut self, finding: QcFinding) {
        debug_assert!(
            self.sections.contains(&finding.category),
            "category {:?} not reported by this ledger",
            finding.category
        );
        debug_assert_eq!(finding.details.len(), finding.category.columns().len());
        self.findings[finding.category].push(finding);
    }

    pub fn count(&self, category: QcCategory) -> usize {
        self.findings[category].len()
    }

    pub fn findings(&self, category: QcCategory) -> &[QcFinding] {
        &self.findings[category]
    }

    /// Total number of findings over all categories.
    pub fn total(&self) -> usize {
        self.findings.values().map(Vec::len).sum()
    }

    /// Write the QC report with the header from `summary`.
    pub fn render<W: Write>(&self, summary: &RunSummary, out: &mut W) -> Result<(), anyhow::Error> {
        write!(
            out,
            "Total lines in the input file ({}) including header: {}\n\n",
            summary.input_name, summary.lines_read
        )?;
        if let Some(alleles_found) = summary.alleles_found {
            write!(out, "Total alleles found in the DB: {}\n\n", alleles_found)?;
        }
        write!(
            out,
            "Total lines from the input file loaded: {}\n\n",
            summary.lines_loaded
        )?;
        write!(
            out,
            "Total lines from the input file skipped: {}\n\n",
            summary.lines_skipped
        )?;

        for category in self.sections {
            write!(out, "\n\n{}\n\n", category.title())?;
            let header = std::iter::once("Line#")
                .chain(category.columns().iter().copied())
                .chain(std::iter::once("Input Line"))
                .join("\t");
            writeln!(out, "{}", header)?;
            writeln!(out, "{}", UNDERLINE)?;
            for finding in &self.findings[*category] {
                let row = std::iter::once(finding.line_no.to_string())
                    .chain(finding.details.iter().cloned())
                    .chain(std::iter::once(finding.raw_line.clone()))
                    .join("\t");
                writeln!(out, "{}", row)?;
            }
            write!(out, "Total: {}", self.findings[*category].len())?;
        }
        writeln!(out)?;

        Ok(())
    }
}

#[cfg(test)]
mod test {
    use pretty_assertions::assert_eq;

    use super::{QcCategory, QcFinding, QcLedger, RunSummary};

    #[test]
    fn titles_and_columns_are_distinct() {
        use strum::IntoEnumIterator;

        let titles = QcCategory::iter().map(|c| c.title()).collect::<Vec<_>>();
        let mut dedup = titles.clone();
        dedup.sort();
        dedup.dedup();
        assert_eq!(titles.len(), dedup.len());
        assert_eq!(QcCategory::IMPC.len() + QcCategory::LOAD.len(), titles.len());
    }

    #[test]
    fn empty_sections_are_rendered() -> Result<(), anyhow::Error> {
        let ledger = QcLedger::new(QcCategory::IMPC);
        let mut out = Vec::new();
        ledger.render(&RunSummary::default(), &mut out)?;
        let report = String::from_utf8(out)?;

        for category in QcCategory::IMPC {
            assert!(report.contains(category.title()), "{:?}", category);
        }
        assert_eq!(report.matches("Total: 0").count(), QcCategory::IMPC.len());
        assert!(!report.contains(QcCategory::TermNotResolved.title()));

        Ok(())
    }

    #[test]
    fn render_load_report() -> Result<(), anyhow::Error> {
        let mut ledger = QcLedger::new(QcCategory::LOAD);
        ledger.add(QcFinding::new(
            QcCategory::TermNotResolved,
            2,
            vec![String::from("Strain"), String::from("C57BL/6Nope")],
            String::from("MGI:101\tPax6"),
        ));
        let summary = RunSummary {
            input_name: String::from("alleles.txt"),
            lines_read: 3,
            alleles_found: None,
            lines_loaded: 1,
            lines_skipped: 1,
        };

        let mut out = Vec::new();
        ledger.render(&summary, &mut out)?;

        assert_eq!(ledger.total(), 1);
        assert_eq!(
            String::from_utf8(out)?,
            "Total lines in the input file (alleles.txt) including header: 3\n\n\
             Total lines from the input file loaded: 1\n\n\
             Total lines from the input file skipped: 1\n\n\
             \n\nValue not resolvable in MGI\n\n\
             Line#\tVocabulary\tValue\tInput Line\n\
             _____________________________________________________________\n\
             2\tStrain\tC57BL/6Nope\tMGI:101\tPax6\n\
             Total: 1\n"
        );

        Ok(())
    }
}
