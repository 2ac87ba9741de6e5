//! Structural outline extraction from LaTeX source.
//!
//! The scan runs over a comment-masked copy of the text (offsets stay
//! valid in the original), finds sectioning commands with a single
//! regex, and reads their optional short-title and mandatory title
//! arguments with the depth-aware group reader.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::latex::comments::mask_comments;
use crate::latex::read_balanced_group;

static SECTION_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\\(part|chapter|section|subsection|subsubsection|paragraph|subparagraph)\*?")
        .expect("Invalid sectioning regex pattern")
});

/// The seven LaTeX sectioning commands, ordered from shallowest to
/// deepest.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SectionCommand {
    Part,
    Chapter,
    Section,
    Subsection,
    Subsubsection,
    Paragraph,
    Subparagraph,
}

impl SectionCommand {
    fn from_name(name: &str) -> Option<SectionCommand> {
        match name {
            "part" => Some(SectionCommand::Part),
            "chapter" => Some(SectionCommand::Chapter),
            "section" => Some(SectionCommand::Section),
            "subsection" => Some(SectionCommand::Subsection),
            "subsubsection" => Some(SectionCommand::Subsubsection),
            "paragraph" => Some(SectionCommand::Paragraph),
            "subparagraph" => Some(SectionCommand::Subparagraph),
            _ => None,
        }
    }

    /// Absolute rank in the LaTeX hierarchy (`part` = 0).
    pub fn rank(self) -> usize {
        match self {
            SectionCommand::Part => 0,
            SectionCommand::Chapter => 1,
            SectionCommand::Section => 2,
            SectionCommand::Subsection => 3,
            SectionCommand::Subsubsection => 4,
            SectionCommand::Paragraph => 5,
            SectionCommand::Subparagraph => 6,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            SectionCommand::Part => "part",
            SectionCommand::Chapter => "chapter",
            SectionCommand::Section => "section",
            SectionCommand::Subsection => "subsection",
            SectionCommand::Subsubsection => "subsubsection",
            SectionCommand::Paragraph => "paragraph",
            SectionCommand::Subparagraph => "subparagraph",
        }
    }
}

/// One heading in a document's outline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutlineEntry {
    /// Unique within one outline, derived from line number + ordinal.
    pub id: String,
    /// Heading text with whitespace collapsed.
    pub title: String,
    /// 1-based line in the original source text.
    pub line_number: usize,
    pub command: SectionCommand,
    /// Zero-based depth, normalized so the shallowest command present
    /// sits at depth 0.
    pub depth: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Outline {
    pub line_count: usize,
    pub entries: Vec<OutlineEntry>,
}

/// Start offset of every line, for O(log n) offset-to-line lookup.
fn line_starts(text: &str) -> Vec<usize> {
    let mut starts = vec![0];
    for (i, b) in text.bytes().enumerate() {
        if b == b'\n' {
            starts.push(i + 1);
        }
    }
    starts
}

/// 1-based line number of the byte offset: the last line start at or
/// before it.
fn line_number_at(starts: &[usize], offset: usize) -> usize {
    starts.partition_point(|&s| s <= offset)
}

fn skip_whitespace(bytes: &[u8], mut i: usize) -> usize {
    while i < bytes.len() && bytes[i].is_ascii_whitespace() {
        i += 1;
    }
    i
}

fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Parse the sectioning outline of a LaTeX document.
///
/// Headings with malformed (unterminated) arguments or empty titles
/// are skipped individually; a bad heading never aborts the scan.
pub fn parse_tex_outline(content: &str) -> Outline {
    let masked = mask_comments(content);
    let starts = line_starts(&masked);
    let bytes = masked.as_bytes();

    let mut found: Vec<(SectionCommand, String, usize)> = Vec::new();

    for caps in SECTION_REGEX.captures_iter(&masked) {
        let full_match = caps.get(0).unwrap();
        let Some(command) = caps.get(1).and_then(|m| SectionCommand::from_name(m.as_str()))
        else {
            continue;
        };

        let mut cursor = skip_whitespace(bytes, full_match.end());

        // Optional short title in brackets
        let mut short_title = None;
        if bytes.get(cursor) == Some(&b'[') {
            match read_balanced_group(&masked, cursor, b'[', b']') {
                Some((inner, next)) => {
                    short_title = Some(inner);
                    cursor = skip_whitespace(bytes, next);
                }
                None => continue,
            }
        }

        // Mandatory title in braces
        if bytes.get(cursor) != Some(&b'{') {
            continue;
        }
        let Some((main_title, _)) = read_balanced_group(&masked, cursor, b'{', b'}') else {
            continue;
        };

        let mut title = collapse_whitespace(main_title);
        if title.is_empty() {
            title = short_title.map(collapse_whitespace).unwrap_or_default();
        }
        if title.is_empty() {
            continue;
        }

        let line_number = line_number_at(&starts, full_match.start());
        found.push((command, title, line_number));
    }

    // Depth is relative to the shallowest command actually present, so
    // a document that starts at \subsection renders flush left.
    let min_rank = found.iter().map(|(c, _, _)| c.rank()).min().unwrap_or(0);

    let entries = found
        .into_iter()
        .enumerate()
        .map(|(ordinal, (command, title, line_number))| OutlineEntry {
            id: format!("{}-{}", line_number, ordinal),
            title,
            line_number,
            command,
            depth: command.rank() - min_rank,
        })
        .collect();

    Outline {
        line_count: content.split('\n').count(),
        entries,
    }
}
