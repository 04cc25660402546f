//! Parsing of CRISPR allele symbols such as `Pax6<em1(IMPC)J>`.
//!
//! All functions return an empty string when there is no match.

use regex::Regex;

lazy_static::lazy_static! {
    /// Word characters directly following the first `)`.
    static ref LAB_CODE_RE: Regex =
        Regex::new(r"\)(\w+)").expect("invalid regex in source code");
    /// Text between `<em` and the last `(`.
    static ref SEQUENCE_NUM_RE: Regex =
        Regex::new(r"<em(.*)\(").expect("invalid regex in source code");
}

/// Extract the lab code, e.g., `J` from `Pax6<em1(IMPC)J>`.
pub fn lab_code(symbol: &str) -> String {
    LAB_CODE_RE
        .captures(symbol)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
        .unwrap_or_default()
}

/// Extract the sequence number, e.g., `1` from `Pax6<em1(IMPC)J>`.
pub fn sequence_num(symbol: &str) -> String {
    SEQUENCE_NUM_RE
        .captures(symbol)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
        .unwrap_or_default()
}

/// More than one `<` or more than one `>`.
pub fn has_bad_nomenclature(symbol: &str) -> bool {
    symbol.matches('<').count() > 1 || symbol.matches('>').count() > 1
}

/// Name of a new endonuclease-mediated allele.
pub fn allele_name(sequence_num: &str, lab_name: &str) -> String {
    format!(
        "endonuclease-mediated mutation {}, {}",
        sequence_num, lab_name
    )
}
