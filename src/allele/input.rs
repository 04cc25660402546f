//! Records of the curator allele file.
//!
//! This is the output format of `impc qc` and the input format of
//! `allele make-bcp`.

use std::io::Write;

use serde::Serialize;

use crate::{common::split_tsv_line, err::LoadError};

/// Number of columns of the allele file.
pub const NUM_COLUMNS: usize = 16;

/// Separator of multi-valued mutation types and subtypes.
pub const VALUE_SEP: char = ';';

/// One line of the allele file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Default)]
pub struct Record {
    pub marker_id: String,
    pub marker_symbol: String,
    /// `;`-separated MGI mutation types.
    pub mutation_types: String,
    pub description: String,
    pub colony_id: String,
    pub strain: String,
    pub symbol: String,
    pub name: String,
    pub inheritance_mode: String,
    pub allele_class: String,
    /// `;`-separated MGI subtypes, may be empty.
    pub subtypes: String,
    pub allele_status: String,
    pub transmission_state: String,
    pub collection: String,
    pub j_number: String,
    pub created_by: String,
}

impl Record {
    /// Parse from a line; fewer than `NUM_COLUMNS` columns is fatal.
    pub fn from_line(line_no: usize, line: &str) -> Result<Self, LoadError> {
        let fields = split_tsv_line(line);
        if fields.len() < NUM_COLUMNS {
            return Err(LoadError::MalformedLine {
                line_no,
                expected: NUM_COLUMNS,
                actual: fields.len(),
            });
        }
        let mut fields = fields.into_iter();
        let mut next = || fields.next().unwrap_or_default();
        Ok(Self {
            marker_id: next(),
            marker_symbol: next(),
            mutation_types: next(),
            description: next(),
            colony_id: next(),
            strain: next(),
            symbol: next(),
            name: next(),
            inheritance_mode: next(),
            allele_class: next(),
            subtypes: next(),
            allele_status: next(),
            transmission_state: next(),
            collection: next(),
            j_number: next(),
            created_by: next(),
        })
    }

    pub fn mutation_types(&self) -> Vec<&str> {
        split_values(&self.mutation_types)
    }

    pub fn subtypes(&self) -> Vec<&str> {
        split_values(&self.subtypes)
    }
}

fn split_values(value: &str) -> Vec<&str> {
    value
        .split(VALUE_SEP)
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .collect()
}

/// Writer of allele files; tab-separated without header or quoting.
pub struct Writer<W: Write> {
    inner: csv::Writer<W>,
}

impl<W: Write> Writer<W> {
    pub fn new(out: W) -> Self {
        Self {
            inner: csv::WriterBuilder::new()
                .has_headers(false)
                .delimiter(b'\t')
                .quote_style(csv::QuoteStyle::Never)
                .from_writer(out),
        }
    }

    pub fn write(&mut self, record: &Record) -> Result<(), anyhow::Error> {
        self.inner
            .serialize(record)
            .map_err(|e| anyhow::anyhow!("could not write allele record: {}", e))
    }

    pub fn flush(&mut self) -> Result<(), anyhow::Error> {
        Ok(self.inner.flush()?)
    }
}
