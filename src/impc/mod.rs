//! QC and reconciliation of the IMPC allele feed.

pub mod input;
pub mod reconcile;
pub mod symbol;

use std::{
    io::{BufRead, Write},
    path::Path,
    time::Instant,
};

use clap::Parser;
use thousands::Separable;

use crate::{
    allele,
    alleles::KnownAlleleIndex,
    common::{self, expand_path, io::open_read_maybe_gz, io::open_write_maybe_gz, trace_rss_now},
    conf::Conf,
    qc::{QcCategory, QcLedger, RunSummary},
    refdata::{ReferenceIndex, ReferenceLookup},
};

use self::{
    input::InputRecord,
    reconcile::{CreationBuffer, Disposition, NewAllele, Reconciler},
};

/// Command line arguments for `impc qc` sub command.
#[derive(Parser, Debug)]
#[command(author, version, about = "QC of the IMPC allele feed", long_about = None)]
pub struct Args {
    /// Path to the load configuration TOML file.
    #[arg(long)]
    pub path_conf: String,
    /// Path to the directory with the reference dumps.
    #[arg(long)]
    pub path_refdata: String,
    /// Path to the IMPC allele feed.
    #[arg(long)]
    pub path_input: String,
    /// Path to the allele file to write.
    #[arg(long)]
    pub path_output_alleles: String,
    /// Path to the colony note file to write.
    #[arg(long)]
    pub path_output_colony_notes: String,
    /// Path to the QC report to write.
    #[arg(long)]
    pub path_output_qc: String,
}

impl From<NewAllele> for allele::input::Record {
    fn from(allele: NewAllele) -> Self {
        Self {
            marker_id: allele.marker_id,
            marker_symbol: allele.marker_symbol,
            mutation_types: allele.allele_types.join(";"),
            description: allele.description,
            colony_id: allele.colony_id,
            strain: allele.strain,
            symbol: allele.symbol,
            name: allele.name,
            inheritance_mode: allele.inheritance_mode,
            allele_class: allele.allele_class,
            subtypes: allele.subtypes.join(";"),
            allele_status: allele.allele_status,
            transmission_state: allele.transmission_state,
            collection: allele.collection,
            j_number: allele.j_number,
            created_by: allele.created_by,
        }
    }
}

/// Process the feed from `reader` and write alleles and colony notes.
///
/// Returns the QC ledger and the run summary for the report.
pub fn process<R, L, A, N>(
    reader: R,
    reconciler: &Reconciler<L>,
    allele_out: A,
    colony_note_out: &mut N,
) -> Result<(QcLedger, RunSummary), anyhow::Error>
where
    R: BufRead,
    L: ReferenceLookup,
    A: Write,
    N: Write,
{
    let mut ledger = QcLedger::new(QcCategory::IMPC);
    let mut summary = RunSummary {
        alleles_found: Some(0),
        ..Default::default()
    };
    let mut buffer = CreationBuffer::default();

    // The header counts as read even if the feed is empty.
    let mut lines = reader.lines();
    summary.lines_read += 1;
    match lines.next() {
        Some(header) => {
            header?;
        }
        None => tracing::warn!("IMPC feed is empty, not even a header line"),
    }

    for (line_no, line) in (2..).zip(lines) {
        let line = line?;
        summary.lines_read += 1;
        if line.trim().is_empty() {
            tracing::debug!("skipping empty line {}", line_no);
            continue;
        }
        let record = InputRecord::from_line(line_no, &line)?;
        let verdict = reconciler.reconcile(&record);
        for flag in verdict.flags {
            ledger.add(flag);
        }
        match verdict.disposition {
            Disposition::Create(allele) => buffer.push(*allele),
            Disposition::AttachColonyNote(note) => {
                summary.alleles_found = summary.alleles_found.map(|n| n + 1);
                if !note.already_on_file {
                    writeln!(colony_note_out, "{}\t{}", note.allele_id, note.colony_id)?;
                }
            }
            Disposition::Reject(findings) => {
                summary.lines_skipped += 1;
                for finding in findings {
                    ledger.add(finding);
                }
            }
        }
    }

    let (creates, duplicates) = buffer.finish();
    summary.lines_skipped += duplicates.len();
    for finding in duplicates {
        ledger.add(finding);
    }

    let mut writer = allele::input::Writer::new(allele_out);
    for allele in creates {
        writer.write(&allele.into())?;
        summary.lines_loaded += 1;
    }
    writer.flush()?;

    Ok((ledger, summary))
}

/// Main entry point for `impc qc` sub command.
pub fn run(common_args: &common::Args, args: &Args) -> Result<(), anyhow::Error> {
    let before_anything = Instant::now();
    tracing::info!("Starting 'impc qc'");
    tracing::info!("  common_args = {:?}", &common_args);
    tracing::info!("  args = {:?}", &args);

    tracing::info!("Loading configuration and reference data...");
    let before_loading = Instant::now();
    let conf = Conf::from_path(expand_path(&args.path_conf))?;
    let path_refdata = expand_path(&args.path_refdata);
    let refs = ReferenceIndex::from_dir(&path_refdata)?;
    let alleles = KnownAlleleIndex::from_path(Path::new(&path_refdata).join("alleles.tsv"))?;
    tracing::info!("... done loading in {:?}", before_loading.elapsed());
    trace_rss_now();

    tracing::info!("Processing IMPC feed...");
    let before_processing = Instant::now();
    let path_input = expand_path(&args.path_input);
    let reconciler = Reconciler::new(&refs, &alleles, &conf);
    let mut colony_note_out = open_write_maybe_gz(expand_path(&args.path_output_colony_notes))?;
    let (ledger, mut summary) = process(
        open_read_maybe_gz(&path_input)?,
        &reconciler,
        open_write_maybe_gz(expand_path(&args.path_output_alleles))?,
        &mut colony_note_out,
    )?;
    colony_note_out.flush()?;
    tracing::info!(
        "... done processing {} lines in {:?}",
        summary.lines_read.separate_with_commas(),
        before_processing.elapsed()
    );

    summary.input_name = if conf.impc.host.is_empty() {
        path_input
    } else {
        format!("{}:{}", conf.impc.host, path_input)
    };
    let mut qc_out = open_write_maybe_gz(expand_path(&args.path_output_qc))?;
    ledger.render(&summary, &mut qc_out)?;
    qc_out.flush()?;

    tracing::info!(
        "alleles found: {}, lines loaded: {}, lines skipped: {}, QC findings: {}",
        common::prvalue(summary.alleles_found.map(|n| n.separate_with_commas())),
        summary.lines_loaded.separate_with_commas(),
        summary.lines_skipped.separate_with_commas(),
        ledger.total().separate_with_commas()
    );
    trace_rss_now();
    tracing::info!(
        "All of `impc qc` completed in {:?}",
        before_anything.elapsed()
    );
    Ok(())
}

#[cfg(test)]
mod test {
    use std::io::BufReader;

    use clap_verbosity_flag::Verbosity;
    use pretty_assertions::assert_eq;

    use super::{process, reconcile::Reconciler, Args};
    use crate::{
        alleles::KnownAlleleIndex, common, conf::Conf, qc::QcCategory, refdata::test::load_refdata,
    };

    const PATH_FEED: &str = "tests/impc/feed.tsv";

    #[test]
    fn process_feed() -> Result<(), anyhow::Error> {
        let refs = load_refdata();
        let alleles = KnownAlleleIndex::from_path("tests/refdata/alleles.tsv")?;
        let conf = Conf::from_path("tests/conf/impc.toml")?;
        let reconciler = Reconciler::new(&refs, &alleles, &conf);

        let mut allele_out = Vec::new();
        let mut note_out = Vec::new();
        let (ledger, summary) = process(
            BufReader::new(std::fs::File::open(PATH_FEED)?),
            &reconciler,
            &mut allele_out,
            &mut note_out,
        )?;

        assert_eq!(summary.lines_read, 10);
        assert_eq!(summary.alleles_found, Some(2));
        assert_eq!(summary.lines_loaded, 2);
        assert_eq!(summary.lines_skipped, 5);
        assert_eq!(ledger.count(QcCategory::StrainNotInMgi), 1);
        assert_eq!(ledger.count(QcCategory::DuplicateAlleleInInput), 2);
        assert_eq!(ledger.count(QcCategory::MissingRequiredValue), 1);
        assert_eq!(ledger.count(QcCategory::ColonyIdMultipleAlleles), 2);
        assert_eq!(ledger.count(QcCategory::AlleleIdNotInMgi), 1);
        assert_eq!(String::from_utf8(note_out)?, "MGI:6100005\tJR1005\n");

        let alleles = String::from_utf8(allele_out)?;
        let symbols = alleles
            .lines()
            .map(|line| line.split('\t').nth(6).unwrap_or_default())
            .collect::<Vec<_>>();
        assert_eq!(symbols, vec!["Pax6<em9(IMPC)J>", "Sox2<em3(IMPC)Wtsi>"]);
        assert!(alleles.contains("\tNot Specified\t"));

        Ok(())
    }

    #[test]
    fn process_is_idempotent() -> Result<(), anyhow::Error> {
        let refs = load_refdata();
        let alleles = KnownAlleleIndex::from_path("tests/refdata/alleles.tsv")?;
        let conf = Conf::from_path("tests/conf/impc.toml")?;
        let reconciler = Reconciler::new(&refs, &alleles, &conf);

        let run = || -> Result<(String, String, String), anyhow::Error> {
            let mut allele_out = Vec::new();
            let mut note_out = Vec::new();
            let mut qc_out = Vec::new();
            let (ledger, summary) = process(
                BufReader::new(std::fs::File::open(PATH_FEED)?),
                &reconciler,
                &mut allele_out,
                &mut note_out,
            )?;
            ledger.render(&summary, &mut qc_out)?;
            Ok((
                String::from_utf8(allele_out)?,
                String::from_utf8(note_out)?,
                String::from_utf8(qc_out)?,
            ))
        };

        assert_eq!(run()?, run()?);

        Ok(())
    }

    #[test]
    fn process_stale_colony_index() -> Result<(), anyhow::Error> {
        let refs = load_refdata();
        let alleles = KnownAlleleIndex::from_path("tests/refdata/alleles.tsv")?;
        let conf = Conf::from_path("tests/conf/impc.toml")?;
        let reconciler = Reconciler::new(&refs, &alleles, &conf);

        // the second line names the colony of the first, created allele
        let feed = "header\n\
            Pax6\tMGI:101\tJR2001\tC57BL/6NTac\tendonuclease-mediated\tDeletion\t\tPax6<em9(IMPC)J>\t\n\
            Pax6\tMGI:101\tJR2001\tC57BL/6NTac\tendonuclease-mediated\tDeletion\t\tPax6<em8(IMPC)J>\t\n";
        let mut allele_out = Vec::new();
        let mut note_out = Vec::new();
        let (ledger, summary) =
            process(feed.as_bytes(), &reconciler, &mut allele_out, &mut note_out)?;

        assert_eq!(summary.lines_loaded, 2);
        assert_eq!(ledger.total(), 0);

        Ok(())
    }

    #[test]
    fn process_empty_input_still_reports() -> Result<(), anyhow::Error> {
        let refs = load_refdata();
        let alleles = KnownAlleleIndex::default();
        let conf = Conf::from_path("tests/conf/impc.toml")?;
        let reconciler = Reconciler::new(&refs, &alleles, &conf);

        let mut allele_out = Vec::<u8>::new();
        let mut note_out = Vec::<u8>::new();
        let (ledger, summary) = process(&b""[..], &reconciler, &mut allele_out, &mut note_out)?;

        assert_eq!(summary.lines_read, 1);
        assert_eq!(summary.lines_loaded, 0);
        assert_eq!(summary.lines_skipped, 0);
        assert_eq!(ledger.total(), 0);
        assert!(allele_out.is_empty());
        assert!(note_out.is_empty());

        let mut qc_out = Vec::new();
        ledger.render(&summary, &mut qc_out)?;
        let report = String::from_utf8(qc_out)?;
        assert!(report.contains("including header: 1\n"));
        assert_eq!(report.matches("Total: 0\n").count(), QcCategory::IMPC.len());

        Ok(())
    }

    #[test]
    fn process_too_few_columns_is_fatal() -> Result<(), anyhow::Error> {
        let refs = load_refdata();
        let alleles = KnownAlleleIndex::default();
        let conf = Conf::from_path("tests/conf/impc.toml")?;
        let reconciler = Reconciler::new(&refs, &alleles, &conf);

        let res = process(
            &b"header\nPax6\tMGI:101\n"[..],
            &reconciler,
            Vec::<u8>::new(),
            &mut Vec::<u8>::new(),
        );
        assert!(res.is_err());

        Ok(())
    }

    #[tracing_test::traced_test]
    #[test]
    fn smoke_test_run() -> Result<(), anyhow::Error> {
        let tmp_dir = temp_testdir::TempDir::default();
        let common_args = common::Args {
            verbose: Verbosity::new(1, 0),
        };
        let args = Args {
            path_conf: String::from("tests/conf/impc.toml"),
            path_refdata: String::from("tests/refdata"),
            path_input: String::from(PATH_FEED),
            path_output_alleles: format!("{}", tmp_dir.join("alleles.txt").display()),
            path_output_colony_notes: format!("{}", tmp_dir.join("notes.txt").display()),
            path_output_qc: format!("{}", tmp_dir.join("qc.rpt").display()),
        };

        super::run(&common_args, &args)?;

        let report = std::fs::read_to_string(tmp_dir.join("qc.rpt"))?;
        assert!(report.starts_with(
            "Total lines in the input file (impc.example.org:tests/impc/feed.tsv) \
             including header: 10\n\n"
        ));
        assert!(report.contains("Total lines from the input file skipped: 5\n"));
        assert!(logs_contain("Starting 'impc qc'"));

        Ok(())
    }
}
