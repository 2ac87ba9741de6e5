//! Cross-reference and file-inclusion spans inside LaTeX text, for
//! interactive navigation.

use std::sync::Arc;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::archive::{FileEntry, FileSet};
use crate::error::ArxDiffError;
use crate::latex::comments::mask_comments;
use crate::render::Language;

static INPUT_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\\input\{([^}]*)\}").expect("Invalid input regex pattern"));
static GRAPHICS_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\\includegraphics(?:\[[^\]]*\])?\{([^}]*)\}")
        .expect("Invalid graphics regex pattern")
});
static REF_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\\(?:ref|Cref|cref|eqref|pageref|autoref)\{([^}]*)\}")
        .expect("Invalid ref regex pattern")
});

/// Extensions tried, in order, when resolving a graphics payload that
/// carries no extension of its own.
pub const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "pdf", "eps", "gif", "svg", "bmp"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkKind {
    /// `\input{...}` file inclusion.
    Input,
    /// `\includegraphics[...]{...}` image inclusion.
    Graphics,
    /// `\ref`-family cross-reference to a label.
    Ref,
}

/// A located, classified reference inside a single file's text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkSpan {
    /// Byte offset range `[from, to)` in the original text.
    pub from: usize,
    pub to: usize,
    pub kind: LinkKind,
    /// Trimmed argument string.
    pub payload: String,
}

/// Collect link spans from a file's text. A no-op for anything that is
/// not LaTeX content.
pub fn collect_link_spans(text: &str, language: Language) -> Vec<LinkSpan> {
    if language != Language::Latex {
        return Vec::new();
    }

    let masked = mask_comments(text);
    let mut spans = Vec::new();

    let passes: [(&Lazy<Regex>, LinkKind); 3] = [
        (&INPUT_REGEX, LinkKind::Input),
        (&GRAPHICS_REGEX, LinkKind::Graphics),
        (&REF_REGEX, LinkKind::Ref),
    ];
    for (regex, kind) in passes {
        for caps in regex.captures_iter(&masked) {
            let full_match = caps.get(0).unwrap();
            let payload = caps.get(1).map_or("", |m| m.as_str()).trim();
            if payload.is_empty() {
                continue;
            }
            spans.push(LinkSpan {
                from: full_match.start(),
                to: full_match.end(),
                kind,
                payload: payload.to_string(),
            });
        }
    }

    // Sort by start, longer span first on ties, then drop anything
    // that starts inside the previously accepted span.
    spans.sort_by(|a, b| a.from.cmp(&b.from).then(b.to.cmp(&a.to)));
    let mut accepted: Vec<LinkSpan> = Vec::new();
    for span in spans {
        if accepted.last().map_or(true, |last| span.from >= last.to) {
            accepted.push(span);
        }
    }
    accepted
}

/// Resolve an `input`/`graphics` payload to a file in the active set:
/// the payload as-is, then with the conventional extension appended,
/// then by base-filename match across the whole set. `ref` spans are
/// resolved with [`find_label`] instead.
pub fn resolve_file_target<'a>(
    files: &'a FileSet,
    kind: LinkKind,
    payload: &str,
) -> Option<&'a Arc<FileEntry>> {
    if kind == LinkKind::Ref {
        return None;
    }

    if let Some(entry) = files.get(payload) {
        return Some(entry);
    }

    match kind {
        LinkKind::Input => {
            if let Some(entry) = files.get(&format!("{}.tex", payload)) {
                return Some(entry);
            }
        }
        LinkKind::Graphics => {
            for ext in IMAGE_EXTENSIONS {
                if let Some(entry) = files.get(&format!("{}.{}", payload, ext)) {
                    return Some(entry);
                }
            }
        }
        LinkKind::Ref => {}
    }

    let base = payload.rsplit('/').next().unwrap_or(payload);
    files.iter().find(|e| {
        e.name == base
            || e.name
                .rsplit_once('.')
                .map_or(false, |(stem, _)| stem == base)
    })
}

/// Search every `.tex` file for `\label{label}` and report the first
/// match as (path, 1-based line in the original text). The search runs
/// over comment-masked lines, so commented-out labels never match.
pub fn find_label(files: &FileSet, label: &str) -> Result<(String, usize), ArxDiffError> {
    let needle = format!("\\label{{{}}}", label);
    for entry in files.tex_files() {
        let Ok(text) = entry.text() else {
            continue;
        };
        let masked = mask_comments(text);
        for (i, line) in masked.split('\n').enumerate() {
            if line.contains(&needle) {
                return Ok((entry.path.clone(), i + 1));
            }
        }
    }
    Err(ArxDiffError::LabelNotFound(label.to_string()))
}
