//! Bulk load of curator allele files.
//!
//! Every value of the allele file is resolved to its database key.  Lines
//! with unresolvable values are reported in the QC report and skipped; all
//! other lines yield rows in the bcp files and the new-allele report.

pub mod bcp;
pub mod input;

use std::{
    io::{BufRead, Write},
    path::Path,
    time::Instant,
};

use clap::Parser;
use thousands::Separable;

use crate::{
    common::{self, expand_path, io::open_read_maybe_gz, io::open_write_maybe_gz, trace_rss_now},
    qc::{QcCategory, QcFinding, QcLedger, RunSummary},
    refdata::{Domain, Key, ReferenceIndex, ReferenceLookup, Vocabulary},
};

use self::bcp::{BcpWriters, NextKeys, ResolvedAllele};

/// Command line arguments for `allele make-bcp` sub command.
#[derive(Parser, Debug)]
#[command(author, version, about = "Create bcp files from allele file", long_about = None)]
pub struct Args {
    /// Path to the directory with the reference dumps.
    #[arg(long)]
    pub path_refdata: String,
    /// Path to the allele file.
    #[arg(long)]
    pub path_input: String,
    /// Path to the output directory for the bcp files.
    #[arg(long)]
    pub path_output_dir: String,
    /// Path to the new-allele report to write.
    #[arg(long)]
    pub path_output_report: String,
    /// Path to the QC report to write.
    #[arg(long)]
    pub path_output_qc: String,
    /// Load date in `MM/DD/YYYY` format, defaults to today.
    #[arg(long)]
    pub load_date: Option<String>,
    /// Whether the allele file has a header line.
    #[arg(long, default_value_t = false)]
    pub has_header: bool,
}

/// Resolves the values of allele file records, collecting failures.
struct Resolver<'a, R: ReferenceLookup> {
    refs: &'a R,
    line_no: usize,
    line: &'a str,
    findings: Vec<QcFinding>,
}

impl<'a, R: ReferenceLookup> Resolver<'a, R> {
    fn new(refs: &'a R, line_no: usize, line: &'a str) -> Self {
        Self {
            refs,
            line_no,
            line,
            findings: Vec::new(),
        }
    }

    /// Resolve `raw` in `domain`; failures yield key 0 and a finding.
    fn resolve(&mut self, domain: Domain, raw: &str) -> Key {
        match self.refs.resolve(domain, raw) {
            Some(key) => key,
            None => {
                self.findings.push(QcFinding::new(
                    QcCategory::TermNotResolved,
                    self.line_no,
                    vec![domain.to_string(), raw.to_string()],
                    self.line.to_string(),
                ));
                0
            }
        }
    }

    fn resolve_all(&mut self, domain: Domain, values: &[&str]) -> Vec<Key> {
        values.iter().map(|raw| self.resolve(domain, raw)).collect()
    }

    fn record(mut self, record: &input::Record) -> Result<ResolvedAllele, Vec<QcFinding>> {
        let mutation_types = record.mutation_types();
        let mutation_keys = if mutation_types.is_empty() {
            vec![self.resolve(Domain::Term(Vocabulary::MolecularMutation), "")]
        } else {
            self.resolve_all(Domain::Term(Vocabulary::MolecularMutation), &mutation_types)
        };
        let resolved = ResolvedAllele {
            marker_key: self.resolve(Domain::Marker, &record.marker_id),
            strain_key: self.resolve(Domain::Strain, &record.strain),
            inheritance_key: self.resolve(
                Domain::Term(Vocabulary::InheritanceMode),
                &record.inheritance_mode,
            ),
            allele_type_key: self.resolve(Domain::Term(Vocabulary::AlleleType), &record.allele_class),
            status_key: self.resolve(Domain::Term(Vocabulary::AlleleStatus), &record.allele_status),
            transmission_key: self.resolve(
                Domain::Term(Vocabulary::Transmission),
                &record.transmission_state,
            ),
            collection_key: self.resolve(Domain::Term(Vocabulary::Collection), &record.collection),
            ref_key: self.resolve(Domain::Reference, &record.j_number),
            user_key: self.resolve(Domain::User, &record.created_by),
            mutation_keys,
            subtype_keys: self.resolve_all(Domain::Term(Vocabulary::Subtype), &record.subtypes()),
            symbol: record.symbol.clone(),
            name: record.name.clone(),
            description: record.description.clone(),
            colony_id: record.colony_id.clone(),
        };
        if self.findings.is_empty() {
            Ok(resolved)
        } else {
            Err(self.findings)
        }
    }
}

/// Process the allele file from `reader`, writing bcp rows and the report.
pub fn process<R, L, W>(
    reader: R,
    refs: &L,
    has_header: bool,
    writers: &mut BcpWriters,
    report_out: &mut W,
) -> Result<(QcLedger, RunSummary), anyhow::Error>
where
    R: BufRead,
    L: ReferenceLookup,
    W: Write,
{
    let mut ledger = QcLedger::new(QcCategory::LOAD);
    let mut summary = RunSummary::default();

    let mut lines = reader.lines();
    let first_line_no = if has_header {
        match lines.next() {
            Some(header) => {
                header?;
                summary.lines_read += 1;
            }
            None => tracing::warn!("allele file is empty, not even a header line"),
        }
        2
    } else {
        1
    };

    for (line_no, line) in (first_line_no..).zip(lines) {
        let line = line?;
        summary.lines_read += 1;
        if line.trim().is_empty() {
            tracing::debug!("skipping empty line {}", line_no);
            continue;
        }
        let record = input::Record::from_line(line_no, &line)?;
        match Resolver::new(refs, line_no, &line).record(&record) {
            Ok(resolved) => {
                let allele_id = writers.write(&resolved)?;
                writeln!(
                    report_out,
                    "{}\t{}\t{}\t{}\t{}\t{}",
                    allele_id,
                    record.symbol,
                    record.name,
                    record.marker_id,
                    record.marker_symbol,
                    record.colony_id
                )?;
                summary.lines_loaded += 1;
            }
            Err(findings) => {
                summary.lines_skipped += 1;
                for finding in findings {
                    ledger.add(finding);
                }
            }
        }
    }

    Ok((ledger, summary))
}

/// Main entry point for `allele make-bcp` sub command.
pub fn run(common_args: &common::Args, args: &Args) -> Result<(), anyhow::Error> {
    let before_anything = Instant::now();
    tracing::info!("Starting 'allele make-bcp'");
    tracing::info!("  common_args = {:?}", &common_args);
    tracing::info!("  args = {:?}", &args);

    let path_refdata = expand_path(&args.path_refdata);
    let refs = ReferenceIndex::from_dir(&path_refdata)?;
    let keys = NextKeys::from_path(Path::new(&path_refdata).join("next_keys.json"))?;
    tracing::debug!("next keys = {:?}", &keys);
    trace_rss_now();

    let load_date = args
        .load_date
        .clone()
        .unwrap_or_else(|| chrono::Local::now().format("%m/%d/%Y").to_string());
    let path_output_dir = expand_path(&args.path_output_dir);
    let mut writers = BcpWriters::create(&path_output_dir, keys, &load_date)?;
    let mut report_out = open_write_maybe_gz(expand_path(&args.path_output_report))?;

    tracing::info!("Processing allele file...");
    let before_processing = Instant::now();
    let path_input = expand_path(&args.path_input);
    let (ledger, mut summary) = process(
        open_read_maybe_gz(&path_input)?,
        &refs,
        args.has_header,
        &mut writers,
        &mut report_out,
    )?;
    report_out.flush()?;
    let keys = writers.finish()?;
    keys.to_path(Path::new(&path_output_dir).join("next_keys.json"))?;
    tracing::info!(
        "... done processing {} lines in {:?}",
        summary.lines_read.separate_with_commas(),
        before_processing.elapsed()
    );

    summary.input_name = path_input;
    let mut qc_out = open_write_maybe_gz(expand_path(&args.path_output_qc))?;
    ledger.render(&summary, &mut qc_out)?;
    qc_out.flush()?;

    tracing::info!(
        "lines loaded: {}, lines skipped: {}",
        summary.lines_loaded.separate_with_commas(),
        summary.lines_skipped.separate_with_commas(),
    );
    trace_rss_now();
    tracing::info!(
        "All of `allele make-bcp` completed in {:?}",
        before_anything.elapsed()
    );
    Ok(())
}
