pub mod archive;
pub mod arxiv;
pub mod diff;
pub mod error;
pub mod latex;
pub mod render;

pub use archive::{FileEntry, FileSet};
pub use arxiv::{DiffVersion, PaperId};
pub use diff::{build_diff_entries, select_diff_pair, DiffEntry, DiffStatus};
pub use error::ArxDiffError;
