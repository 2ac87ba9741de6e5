//! Conversion of an old/new file pair into a renderable structure:
//! hunks of tagged lines for text, side-by-side presentation for
//! images, a placeholder for everything else.

use std::path::Path;

use log::warn;
use similar::{ChangeTag, TextDiff};

use crate::diff::{DiffEntry, DiffStatus};

/// Hunk construction is skipped above this size; the pair degrades to
/// an unstructured side-by-side rendering instead.
const MAX_DIFF_BYTES: usize = 2 * 1024 * 1024;
const HUNK_CONTEXT: usize = 3;

/// Syntax tag handed to the rendering surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Language {
    Latex,
    Bibtex,
    Plaintext,
}

impl Language {
    pub fn from_path(path: &str) -> Language {
        let ext = Path::new(path)
            .extension()
            .map(|e| e.to_string_lossy().to_lowercase());
        match ext.as_deref() {
            Some("tex") | Some("sty") | Some("cls") | Some("ltx") | Some("bbl") => Language::Latex,
            Some("bib") => Language::Bibtex,
            _ => Language::Plaintext,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Language::Latex => "latex",
            Language::Bibtex => "bibtex",
            Language::Plaintext => "plaintext",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineKind {
    Context,
    Added,
    Removed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiffLine {
    pub kind: LineKind,
    /// 1-based line number in the old text, absent for additions.
    pub old_line: Option<usize>,
    /// 1-based line number in the new text, absent for removals.
    pub new_line: Option<usize>,
    pub content: String,
}

/// A contiguous run of tagged lines.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiffHunk {
    pub old_start: usize,
    pub old_lines: usize,
    pub new_start: usize,
    pub new_lines: usize,
    pub lines: Vec<DiffLine>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedDiff {
    pub language: Language,
    pub hunks: Vec<DiffHunk>,
    pub additions: usize,
    pub deletions: usize,
}

/// Layout for [`format_rendered`]; the line model carries both sides'
/// numbers so either works.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiffLayout {
    Unified,
    Split,
}

/// What the rendering surface should paint for a selected pair.
#[derive(Debug)]
pub enum DiffRendering {
    Hunks(RenderedDiff),
    /// Fallback when hunk construction is not possible: both full
    /// texts, unstructured.
    SideBySideText {
        old: String,
        new: String,
        language: Language,
    },
    /// Images and PDFs: shown old next to new, never diffed.
    SideBySideBinary,
    /// Unsupported binary content.
    NoPreview,
}

/// Build the hunk structure for a pair of texts.
pub fn build_hunks(old: &str, new: &str, language: Language) -> RenderedDiff {
    let diff = TextDiff::from_lines(old, new);
    let mut hunks = Vec::new();
    let mut additions = 0usize;
    let mut deletions = 0usize;

    for group in diff.grouped_ops(HUNK_CONTEXT) {
        let (Some(first), Some(last)) = (group.first(), group.last()) else {
            continue;
        };
        let old_range = first.old_range().start..last.old_range().end;
        let new_range = first.new_range().start..last.new_range().end;

        let mut lines = Vec::new();
        for op in &group {
            for change in diff.iter_changes(op) {
                let kind = match change.tag() {
                    ChangeTag::Equal => LineKind::Context,
                    ChangeTag::Delete => {
                        deletions += 1;
                        LineKind::Removed
                    }
                    ChangeTag::Insert => {
                        additions += 1;
                        LineKind::Added
                    }
                };
                lines.push(DiffLine {
                    kind,
                    old_line: change.old_index().map(|i| i + 1),
                    new_line: change.new_index().map(|i| i + 1),
                    content: change
                        .value()
                        .trim_end_matches('\n')
                        .trim_end_matches('\r')
                        .to_string(),
                });
            }
        }

        hunks.push(DiffHunk {
            old_start: old_range.start + 1,
            old_lines: old_range.len(),
            new_start: new_range.start + 1,
            new_lines: new_range.len(),
            lines,
        });
    }

    RenderedDiff {
        language,
        hunks,
        additions,
        deletions,
    }
}

const SPLIT_COLUMN_WIDTH: usize = 48;

/// Format a rendered diff as text in the requested layout.
pub fn format_rendered(rendered: &RenderedDiff, layout: DiffLayout) -> String {
    match layout {
        DiffLayout::Unified => format_unified(rendered),
        DiffLayout::Split => format_split(rendered),
    }
}

fn hunk_header(hunk: &DiffHunk) -> String {
    format!(
        "@@ -{},{} +{},{} @@\n",
        hunk.old_start, hunk.old_lines, hunk.new_start, hunk.new_lines
    )
}

fn format_unified(rendered: &RenderedDiff) -> String {
    let mut out = String::new();
    for hunk in &rendered.hunks {
        out.push_str(&hunk_header(hunk));
        for line in &hunk.lines {
            let prefix = match line.kind {
                LineKind::Context => ' ',
                LineKind::Added => '+',
                LineKind::Removed => '-',
            };
            out.push(prefix);
            out.push_str(&line.content);
            out.push('\n');
        }
    }
    out.push_str(&format!("+{} -{}\n", rendered.additions, rendered.deletions));
    out
}

fn format_split(rendered: &RenderedDiff) -> String {
    let mut out = String::new();
    for hunk in &rendered.hunks {
        out.push_str(&hunk_header(hunk));
        for line in &hunk.lines {
            let mut left = String::new();
            let mut right = String::new();
            match line.kind {
                LineKind::Context => {
                    left = line.content.clone();
                    right = line.content.clone();
                }
                LineKind::Removed => left = format!("-{}", line.content),
                LineKind::Added => right = format!("+{}", line.content),
            }
            // Truncate on char boundaries; LaTeX content is not ASCII.
            if left.chars().count() > SPLIT_COLUMN_WIDTH {
                left = left.chars().take(SPLIT_COLUMN_WIDTH).collect();
            }
            if right.chars().count() > SPLIT_COLUMN_WIDTH {
                right = right.chars().take(SPLIT_COLUMN_WIDTH).collect();
            }
            out.push_str(&format!(
                "{:<width$} | {}\n",
                left,
                right,
                width = SPLIT_COLUMN_WIDTH
            ));
        }
    }
    out.push_str(&format!("+{} -{}\n", rendered.additions, rendered.deletions));
    out
}

fn is_image_or_pdf(path: &str) -> bool {
    let ext = Path::new(path)
        .extension()
        .map(|e| e.to_string_lossy().to_lowercase());
    matches!(
        ext.as_deref(),
        Some("png" | "jpg" | "jpeg" | "gif" | "bmp" | "svg" | "eps" | "pdf")
    )
}

fn looks_binary(bytes: &[u8]) -> bool {
    bytes.contains(&0)
}

/// Produce the rendering for one diff entry. Never fails: anything
/// that cannot be hunk-diffed degrades to a side-by-side or
/// placeholder rendering with a logged warning.
pub fn render_file_diff(entry: &DiffEntry) -> DiffRendering {
    let language = Language::from_path(&entry.path);

    if is_image_or_pdf(&entry.path) {
        return DiffRendering::SideBySideBinary;
    }

    let side = |file: &Option<std::sync::Arc<crate::archive::FileEntry>>| -> Option<String> {
        match file {
            None => Some(String::new()),
            Some(f) => match f.bytes() {
                Ok(b) if looks_binary(b) => None,
                Ok(b) => Some(String::from_utf8_lossy(b).into_owned()),
                Err(e) => {
                    warn!("cannot read {} for rendering: {}", entry.path, e);
                    None
                }
            },
        }
    };

    let (Some(old_text), Some(new_text)) = (side(&entry.old_file), side(&entry.new_file)) else {
        return DiffRendering::NoPreview;
    };

    if entry.status == DiffStatus::Failed {
        return DiffRendering::NoPreview;
    }

    if old_text.len() > MAX_DIFF_BYTES || new_text.len() > MAX_DIFF_BYTES {
        warn!(
            "{} too large for hunk construction, falling back to side-by-side text",
            entry.path
        );
        return DiffRendering::SideBySideText {
            old: old_text,
            new: new_text,
            language,
        };
    }

    DiffRendering::Hunks(build_hunks(&old_text, &new_text, language))
}
