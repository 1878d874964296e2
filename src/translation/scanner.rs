/// Lexical context of the byte being scanned.
#[derive(Clone, Copy)]
pub(super) enum State {
    Normal,
    SingleQuoted,
    DoubleQuoted,
    Bracketed,
    LineComment,
    BlockComment(u32),
}

/// Parse the explicit position after a `?`, if any.
///
/// Returns the index just past the digits and the parsed number (`None` on
/// overflow, in which case the caller falls back to implicit numbering).
pub(super) fn scan_position(bytes: &[u8], start: usize) -> Option<(usize, Option<usize>)> {
    let end = bytes[start.min(bytes.len())..]
        .iter()
        .position(|b| !b.is_ascii_digit())
        .map_or(bytes.len(), |offset| start + offset);
    if end == start {
        return None;
    }
    let position = std::str::from_utf8(&bytes[start..end])
        .ok()
        .and_then(|digits| digits.parse().ok());
    Some((end, position))
}

pub(super) fn is_line_comment_start(bytes: &[u8], idx: usize) -> bool {
    bytes.get(idx..idx + 2) == Some(&b"--"[..])
}

pub(super) fn is_block_comment_start(bytes: &[u8], idx: usize) -> bool {
    bytes.get(idx..idx + 2) == Some(&b"/*"[..])
}

pub(super) fn is_block_comment_end(bytes: &[u8], idx: usize) -> bool {
    bytes.get(idx..idx + 2) == Some(&b"*/"[..])
}
