use thiserror::Error;

/// Errors surfaced by the arxdiff library. Everything here is
/// recoverable: callers report and continue, nothing should take the
/// surrounding application down.
#[derive(Error, Debug)]
pub enum ArxDiffError {
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("invalid paper identifier: {0}")]
    InvalidPaperId(String),

    #[error("failed to read archive: {0}")]
    Archive(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("diff requires at least two versions, found {0}")]
    NotEnoughVersions(usize),

    #[error("label `{0}` not found in any .tex file")]
    LabelNotFound(String),

    #[error("no file named `{0}` in either version")]
    NoSuchFile(String),
}
