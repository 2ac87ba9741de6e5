//! File-set comparison across two versions of a paper, and the
//! version/pair selection rules around it.

use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::sync::Arc;

use log::warn;
use rayon::prelude::*;

use crate::archive::{FileEntry, FileSet};
use crate::arxiv::DiffVersion;
use crate::error::ArxDiffError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiffStatus {
    Added,
    Removed,
    Modified,
    Unchanged,
    /// One side could not be read; the comparison for this path is
    /// unknown rather than guessed.
    Failed,
}

impl fmt::Display for DiffStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            DiffStatus::Added => "added",
            DiffStatus::Removed => "removed",
            DiffStatus::Modified => "modified",
            DiffStatus::Unchanged => "unchanged",
            DiffStatus::Failed => "failed",
        };
        write!(f, "{}", s)
    }
}

/// One path's comparison result across two archives.
///
/// `old_file` is `None` exactly when the status is `Added`, `new_file`
/// exactly when it is `Removed`.
#[derive(Debug)]
pub struct DiffEntry {
    pub path: String,
    pub status: DiffStatus,
    pub old_file: Option<Arc<FileEntry>>,
    pub new_file: Option<Arc<FileEntry>>,
}

/// Classify every path across two file sets. Pure over the two sets:
/// no network I/O, deterministic lexicographic path order. Pairwise
/// byte comparisons run in parallel across distinct paths.
pub fn build_diff_entries(old: &FileSet, new: &FileSet) -> Vec<DiffEntry> {
    let old_map: HashMap<&str, &Arc<FileEntry>> =
        old.iter().map(|e| (e.path.as_str(), e)).collect();
    let new_map: HashMap<&str, &Arc<FileEntry>> =
        new.iter().map(|e| (e.path.as_str(), e)).collect();

    let paths: BTreeSet<&str> = old_map.keys().chain(new_map.keys()).copied().collect();
    let pairs: Vec<(&str, Option<&Arc<FileEntry>>, Option<&Arc<FileEntry>>)> = paths
        .into_iter()
        .map(|p| (p, old_map.get(p).copied(), new_map.get(p).copied()))
        .collect();

    pairs
        .par_iter()
        .map(|&(path, old_file, new_file)| {
            let status = match (old_file, new_file) {
                (None, Some(_)) => DiffStatus::Added,
                (Some(_), None) => DiffStatus::Removed,
                (Some(o), Some(n)) => compare_pair(path, o, n),
                // The path set is the union of both maps' keys
                (None, None) => unreachable!(),
            };
            DiffEntry {
                path: path.to_string(),
                status,
                old_file: old_file.map(|e| Arc::clone(e)),
                new_file: new_file.map(|e| Arc::clone(e)),
            }
        })
        .collect()
}

fn compare_pair(path: &str, old: &FileEntry, new: &FileEntry) -> DiffStatus {
    let old_bytes = match old.bytes() {
        Ok(b) => b,
        Err(e) => {
            warn!("cannot read old side of {} for comparison: {}", path, e);
            return DiffStatus::Failed;
        }
    };
    let new_bytes = match new.bytes() {
        Ok(b) => b,
        Err(e) => {
            warn!("cannot read new side of {} for comparison: {}", path, e);
            return DiffStatus::Failed;
        }
    };

    // Length first, then bytes
    if old_bytes.len() != new_bytes.len() || old_bytes != new_bytes {
        DiffStatus::Modified
    } else {
        DiffStatus::Unchanged
    }
}

/// Pick the file to open once diff entries are built: the `.tex` file
/// containing `\begin{document}`, else the first changed path, else
/// the first path overall.
pub fn select_diff_file(entries: &[DiffEntry]) -> Option<&DiffEntry> {
    entries
        .iter()
        .find(|e| {
            let file = e.new_file.as_ref().or(e.old_file.as_ref());
            file.map_or(false, |f| {
                f.is_tex() && matches!(f.text(), Ok(t) if t.contains("\\begin{document}"))
            })
        })
        .or_else(|| entries.iter().find(|e| e.status != DiffStatus::Unchanged))
        .or_else(|| entries.first())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DiffPair {
    pub from: u32,
    pub to: u32,
}

/// Choose the version pair to compare. Defaults to the two most recent
/// versions; an explicitly preferred version is honored only if it
/// exists in the available set, and each side falls back to its
/// default independently. Fewer than two versions is an error: there
/// is nothing meaningful to diff.
pub fn select_diff_pair(
    versions: &[DiffVersion],
    preferred_from: Option<u32>,
    preferred_to: Option<u32>,
) -> Result<DiffPair, ArxDiffError> {
    let mut numbers: Vec<u32> = versions.iter().map(|v| v.version).collect();
    numbers.sort_unstable();
    numbers.dedup();

    if numbers.len() < 2 {
        return Err(ArxDiffError::NotEnoughVersions(numbers.len()));
    }

    let default_to = numbers[numbers.len() - 1];
    let default_from = numbers[numbers.len() - 2];

    let to = preferred_to
        .filter(|v| numbers.contains(v))
        .unwrap_or(default_to);
    let from = preferred_from
        .filter(|v| numbers.contains(v))
        .unwrap_or(default_from);

    Ok(DiffPair { from, to })
}
