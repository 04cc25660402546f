//! Records of the IMPC allele feed.

use crate::{common::split_tsv_line, err::LoadError};

/// Number of columns of the feed.
pub const NUM_COLUMNS: usize = 9;

/// One line of the IMPC allele feed.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct InputRecord {
    /// 1-based line number, the header is line 1.
    pub line_no: usize,
    /// The line without line break, for the QC report.
    pub raw_line: String,
    /// MGI ID of the marker.
    pub marker_id: String,
    /// Colony name.
    pub colony_id: String,
    /// Colony background strain.
    pub strain: String,
    /// Mutation class, must be endonuclease-mediated.
    pub allele_class: String,
    /// IMPC mutation type.
    pub allele_type: String,
    /// IMPC mutation subtype, optional.
    pub allele_subtype: String,
    /// Mutation symbol, full or superscript.
    pub allele_symbol: String,
    /// MGI ID of the mutation, optional.
    pub allele_id: String,
}

impl InputRecord {
    /// Parse from a feed line; fewer than `NUM_COLUMNS` columns is fatal.
    pub fn from_line(line_no: usize, line: &str) -> Result<Self, LoadError> {
        let fields = split_tsv_line(line);
        if fields.len() < NUM_COLUMNS {
            return Err(LoadError::MalformedLine {
                line_no,
                expected: NUM_COLUMNS,
                actual: fields.len(),
            });
        }
        // the leading gene symbol column is not used
        let mut fields = fields.into_iter().skip(1);
        let mut next = || fields.next().unwrap_or_default();
        Ok(Self {
            line_no,
            raw_line: line.trim_end_matches(&['\n', '\r'][..]).to_string(),
            marker_id: next(),
            colony_id: next(),
            strain: next(),
            allele_class: next(),
            allele_type: next(),
            allele_subtype: next(),
            allele_symbol: next(),
            allele_id: next(),
        })
    }

    /// Names of the required fields that are empty.
    pub fn missing_fields(&self) -> Vec<&'static str> {
        [
            ("Marker ID", &self.marker_id),
            ("Colony ID", &self.colony_id),
            ("Colony Background Strain", &self.strain),
            ("Allele Class (type)", &self.allele_class),
            ("Allele (mutation) Type", &self.allele_type),
            ("Allele Symbol", &self.allele_symbol),
        ]
        .into_iter()
        .filter(|(_, value)| value.is_empty())
        .map(|(name, _)| name)
        .collect()
    }
}

#[cfg(test)]
mod test {
    use pretty_assertions::assert_eq;

    use super::InputRecord;
    use crate::err::LoadError;

    #[test]
    fn from_line() -> Result<(), anyhow::Error> {
        let line = "Pax6\tMGI:101\t JR1001 \tC57BL/6NTac\tEndonuclease-mediated\tDeletion\t\
                    Exon Deletion\tPax6<em1(IMPC)J>\t\n";
        let record = InputRecord::from_line(2, line)?;

        assert_eq!(record.colony_id, "JR1001");
        assert_eq!(record.allele_symbol, "Pax6<em1(IMPC)J>");
        assert_eq!(record.allele_id, "");
        assert!(!record.raw_line.ends_with('\n'));
        assert!(record.missing_fields().is_empty());

        Ok(())
    }

    #[test]
    fn from_line_too_few_columns() {
        assert_eq!(
            InputRecord::from_line(7, "Pax6\tMGI:101\tJR1001"),
            Err(LoadError::MalformedLine {
                line_no: 7,
                expected: 9,
                actual: 3
            })
        );
    }

    #[test]
    fn missing_fields() -> Result<(), anyhow::Error> {
        let record = InputRecord::from_line(3, "Pax6\tMGI:101\t\t\tx\t\t\tPax6<em1J>\t")?;
        assert_eq!(
            record.missing_fields(),
            vec![
                "Colony ID",
                "Colony Background Strain",
                "Allele (mutation) Type"
            ]
        );
        Ok(())
    }
}
