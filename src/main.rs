//! Allele load main executable

pub mod allele;
pub mod alleles;
pub mod common;
pub mod conf;
pub mod err;
pub mod impc;
pub mod qc;
pub mod refdata;

use clap::{Args, Parser, Subcommand};
use console::{Emoji, Term};

/// CLI parser based on clap.
#[derive(Debug, Parser)]
#[command(
    author,
    version,
    about = "MGI CRISPR allele load",
    long_about = "This tool performs the QC of the IMPC allele feed and creates the \
                  bulk load files for new alleles"
)]
struct Cli {
    /// Commonly used arguments
    #[command(flatten)]
    common: common::Args,

    /// The sub command to run
    #[command(subcommand)]
    command: Commands,
}

/// Enum supporting the parsing of top-level commands.
#[derive(Debug, Subcommand)]
enum Commands {
    /// IMPC feed related commands.
    Impc(Impc),
    /// Allele file related commands.
    Allele(Allele),
}

/// Parsing of "impc *" sub commands.
#[derive(Debug, Args)]
#[command(args_conflicts_with_subcommands = true)]
struct Impc {
    /// The sub command to run
    #[command(subcommand)]
    command: ImpcCommands,
}

/// Enum supporting the parsing of "impc *" sub commands.
#[derive(Debug, Subcommand)]
enum ImpcCommands {
    Qc(impc::Args),
}

/// Parsing of "allele *" sub commands.
#[derive(Debug, Args)]
#[command(args_conflicts_with_subcommands = true)]
struct Allele {
    /// The sub command to run
    #[command(subcommand)]
    command: AlleleCommands,
}

/// Enum supporting the parsing of "allele *" sub commands.
#[derive(Debug, Subcommand)]
enum AlleleCommands {
    MakeBcp(allele::Args),
}

fn main() -> Result<(), anyhow::Error> {
    let cli = Cli::parse();

    // Build a tracing subscriber according to the configuration in `cli.common`.
    let collector = tracing_subscriber::fmt()
        .with_target(false)
        .with_max_level(match cli.common.verbose.log_level() {
            Some(level) => match level {
                log::Level::Error => tracing::Level::ERROR,
                log::Level::Warn => tracing::Level::WARN,
                log::Level::Info => tracing::Level::INFO,
                log::Level::Debug => tracing::Level::DEBUG,
                log::Level::Trace => tracing::Level::TRACE,
            },
            None => tracing::Level::INFO,
        })
        .compact()
        .finish();

    // Install collector and go into sub commands.
    let term = Term::stderr();
    tracing::subscriber::with_default(collector, || {
        match &cli.command {
            Commands::Impc(impc) => match &impc.command {
                ImpcCommands::Qc(args) => impc::run(&cli.common, args)?,
            },
            Commands::Allele(allele) => match &allele.command {
                AlleleCommands::MakeBcp(args) => allele::run(&cli.common, args)?,
            },
        }

        Ok::<(), anyhow::Error>(())
    })?;
    term.write_line(&format!("All done. Have a nice day!{}", Emoji(" 😃", "")))?;

    Ok(())
}
