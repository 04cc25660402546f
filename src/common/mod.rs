//! Common functionality.

use clap::Parser;
use clap_verbosity_flag::{InfoLevel, Verbosity};

pub mod io;

/// Commonly used command line arguments.
#[derive(Parser, Debug)]
pub struct Args {
    /// Verbosity of the program
    #[clap(flatten)]
    pub verbose: Verbosity<InfoLevel>,
}

impl Default for Args {
    fn default() -> Self {
        Self {
            verbose: Verbosity::new(0, 0),
        }
    }
}

/// Helper to print the current memory resident set size via `tracing`.
pub fn trace_rss_now() {
    let rss = procfs::process::Process::myself()
        .and_then(|me| me.stat())
        .map(|stat| stat.rss * procfs::page_size());
    match rss {
        Ok(rss) => tracing::debug!(
            "RSS now: {:.2}",
            byte_unit::Byte::from_u64(rss).get_appropriate_unit(byte_unit::UnitType::Binary)
        ),
        Err(e) => tracing::trace!("could not determine RSS: {}", e),
    }
}

/// Expand a leading `~` in a path given on the command line.
pub fn expand_path(path: &str) -> String {
    shellexpand::tilde(path).into_owned()
}

/// Split a tab-separated input line into whitespace-trimmed fields.
///
/// A trailing line break is removed before splitting.
pub fn split_tsv_line(line: &str) -> Vec<String> {
    line.trim_end_matches(&['\n', '\r'][..])
        .split('\t')
        .map(|field| field.trim().to_string())
        .collect()
}

/// Render a value for a text report, using an empty string for `None`.
pub fn prvalue<T: std::fmt::Display>(value: Option<T>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

#[cfg(test)]
mod test {
    use pretty_assertions::assert_eq;

    #[test]
    fn trace_rss_now_smoke() {
        super::trace_rss_now();
    }

    #[rstest::rstest]
    #[case("a\tb\tc\n", vec!["a", "b", "c"])]
    #[case(" a \t b\r\n", vec!["a", "b"])]
    #[case("a\t\t", vec!["a", "", ""])]
    #[case("", vec![""])]
    fn split_tsv_line(#[case] line: &str, #[case] expected: Vec<&str>) {
        assert_eq!(super::split_tsv_line(line), expected);
    }

    #[test]
    fn prvalue() {
        assert_eq!(super::prvalue(Some(42)), "42");
        assert_eq!(super::prvalue::<&str>(None), "");
    }
}
