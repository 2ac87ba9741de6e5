//! Comment-aware line transformation for LaTeX text.
//!
//! All three operations here share one escape rule: a `%` starts a
//! comment only when preceded by an even number (including zero) of
//! consecutive backslashes. Keeping the rule in a single scanner is
//! what guarantees that a position found by searching the original
//! text always maps to a valid coordinate in the stripped rendering.

/// Byte offset of the first real (unescaped) comment marker on a
/// single line, if any.
fn comment_start(line: &str) -> Option<usize> {
    let bytes = line.as_bytes();
    for i in 0..bytes.len() {
        if bytes[i] != b'%' {
            continue;
        }
        let mut backslashes = 0usize;
        let mut j = i as isize - 1;
        while j >= 0 && bytes[j as usize] == b'\\' {
            backslashes += 1;
            j -= 1;
        }
        // Odd count means the percent sign itself is escaped
        if backslashes % 2 == 0 {
            return Some(i);
        }
    }
    None
}

/// Result of transforming a single line.
#[derive(Debug, PartialEq, Eq)]
pub struct TransformedLine<'a> {
    /// The line was a pure comment and should be dropped entirely.
    pub remove_line: bool,
    /// The line with any trailing comment (and the whitespace before
    /// it) removed. Empty when `remove_line` is set.
    pub text: &'a str,
}

pub fn transform_line(line: &str) -> TransformedLine<'_> {
    match comment_start(line) {
        Some(0) => TransformedLine {
            remove_line: true,
            text: "",
        },
        Some(idx) => TransformedLine {
            remove_line: false,
            text: line[..idx].trim_end_matches(|c| c == ' ' || c == '\t'),
        },
        None => TransformedLine {
            remove_line: false,
            text: line,
        },
    }
}

/// Remove comments from a whole document: pure-comment lines are
/// dropped, trailing comments are cut off.
pub fn strip_latex_comments(text: &str) -> String {
    let mut kept = Vec::new();
    for line in text.split('\n') {
        let transformed = transform_line(line);
        if !transformed.remove_line {
            kept.push(transformed.text);
        }
    }
    kept.join("\n")
}

/// Map original 0-based line numbers to their 1-based position in the
/// comment-stripped text. Lines removed by the strip record 0.
pub fn build_visible_line_map(text: &str) -> Vec<usize> {
    let mut map = Vec::new();
    let mut kept = 0usize;
    for line in text.split('\n') {
        if transform_line(line).remove_line {
            map.push(0);
        } else {
            kept += 1;
            map.push(kept);
        }
    }
    map
}

/// Replace comment text with equal-length whitespace, preserving every
/// byte offset and line break of the original. Downstream scanners run
/// over the masked copy and resolve match offsets back into the
/// original text.
pub fn mask_comments(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for (i, line) in text.split('\n').enumerate() {
        if i > 0 {
            out.push('\n');
        }
        match comment_start(line) {
            Some(idx) => {
                out.push_str(&line[..idx]);
                // Space per byte, so multi-byte comment characters do
                // not shift later offsets.
                for _ in idx..line.len() {
                    out.push(' ');
                }
            }
            None => out.push_str(line),
        }
    }
    out
}
