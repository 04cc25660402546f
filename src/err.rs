/// Fatal conditions that abort a load run.
///
/// Everything that concerns a single record is reported as a QC finding
/// instead; these errors are only raised for input that cannot be processed
/// at all.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum LoadError {
    #[error("Invalid line ({line_no}): expected at least {expected} columns, got {actual}")]
    MalformedLine {
        line_no: usize,
        expected: usize,
        actual: usize,
    },
    #[error("Invalid entry in {file}: {message}")]
    MalformedDump { file: String, message: String },
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}
