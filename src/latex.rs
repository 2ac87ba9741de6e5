pub mod comments;
pub mod links;
pub mod outline;

/// Read a balanced delimiter group starting at byte offset `open`,
/// which must hold the opening delimiter. Returns the inner text and
/// the offset just past the closing delimiter, or `None` when the
/// group is unterminated. Nested groups of the same delimiter pair are
/// preserved in the returned slice.
///
/// Section titles routinely contain nested braces
/// (`\section{A \textbf{bold} word}`), so an "up to the first closing
/// brace" match would truncate; this reader tracks depth instead.
pub fn read_balanced_group(
    text: &str,
    open: usize,
    open_ch: u8,
    close_ch: u8,
) -> Option<(&str, usize)> {
    let bytes = text.as_bytes();
    if bytes.get(open) != Some(&open_ch) {
        return None;
    }

    let mut depth = 1usize;
    let mut i = open + 1;
    while i < bytes.len() {
        if bytes[i] == open_ch {
            depth += 1;
        } else if bytes[i] == close_ch {
            depth -= 1;
            if depth == 0 {
                return Some((&text[open + 1..i], i + 1));
            }
        }
        i += 1;
    }
    None
}
