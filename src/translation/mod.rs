use std::borrow::Cow;

mod scanner;

use scanner::{
    State, is_block_comment_end, is_block_comment_start, is_line_comment_start, scan_position,
};

/// Native placeholder form a backend expects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaceholderStyle {
    /// SQLite-style numbered placeholders like `?1`.
    Sqlite,
    /// SQL Server RPC placeholders like `@P1`, as required by tiberius.
    Mssql,
}

impl PlaceholderStyle {
    fn write(self, buf: &mut String, position: usize) {
        match self {
            PlaceholderStyle::Sqlite => buf.push('?'),
            PlaceholderStyle::Mssql => buf.push_str("@P"),
        }
        buf.push_str(&position.to_string());
    }
}

/// Rewrite caller placeholders (`?` and `?N`) into the backend's native form.
///
/// A bare `?` takes the number one greater than the largest position seen so
/// far, so `?, ?3, ?` becomes positions 1, 3, 4. Placeholders inside string
/// literals, quoted or bracketed identifiers and comments are left alone.
/// Returns a borrowed `Cow` when no changes are needed:
/// ```rust
/// use sql_driver::translation::{PlaceholderStyle, translate_placeholders};
///
/// let sql = translate_placeholders("SELECT * FROM t WHERE a = ? AND b = '?'", PlaceholderStyle::Mssql);
/// assert_eq!(sql, "SELECT * FROM t WHERE a = @P1 AND b = '?'");
/// ```
#[must_use]
pub fn translate_placeholders(sql: &str, target: PlaceholderStyle) -> Cow<'_, str> {
    let mut out: Option<String> = None;
    // start of the text not yet copied into `out`
    let mut pending_from = 0;
    let mut state = State::Normal;
    let mut highest = 0usize;
    let mut idx = 0;
    let bytes = sql.as_bytes();

    while idx < bytes.len() {
        let b = bytes[idx];
        match state {
            State::Normal => match b {
                b'\'' => state = State::SingleQuoted,
                b'"' => state = State::DoubleQuoted,
                b'[' => state = State::Bracketed,
                _ if is_line_comment_start(bytes, idx) => state = State::LineComment,
                _ if is_block_comment_start(bytes, idx) => {
                    state = State::BlockComment(1);
                    idx += 1;
                }
                b'?' => {
                    let (end, position) = scan_position(bytes, idx + 1).unwrap_or((idx + 1, None));
                    let position = position.unwrap_or(highest + 1);
                    highest = highest.max(position);

                    let numbered_already = end > idx + 1;
                    if !(numbered_already && target == PlaceholderStyle::Sqlite) {
                        let buf = out.get_or_insert_with(|| String::with_capacity(sql.len() + 8));
                        buf.push_str(&sql[pending_from..idx]);
                        target.write(buf, position);
                        pending_from = end;
                    }
                    idx = end - 1;
                }
                _ => {}
            },
            State::SingleQuoted => {
                if b == b'\'' {
                    if bytes.get(idx + 1) == Some(&b'\'') {
                        idx += 1;
                    } else {
                        state = State::Normal;
                    }
                }
            }
            State::DoubleQuoted => {
                if b == b'"' {
                    if bytes.get(idx + 1) == Some(&b'"') {
                        idx += 1;
                    } else {
                        state = State::Normal;
                    }
                }
            }
            State::Bracketed => {
                if b == b']' {
                    if bytes.get(idx + 1) == Some(&b']') {
                        idx += 1;
                    } else {
                        state = State::Normal;
                    }
                }
            }
            State::LineComment => {
                if b == b'\n' {
                    state = State::Normal;
                }
            }
            State::BlockComment(depth) => {
                if is_block_comment_start(bytes, idx) {
                    state = State::BlockComment(depth + 1);
                    idx += 1;
                } else if is_block_comment_end(bytes, idx) {
                    state = if depth == 1 {
                        State::Normal
                    } else {
                        State::BlockComment(depth - 1)
                    };
                    idx += 1;
                }
            }
        }

        idx += 1;
    }

    match out {
        Some(mut buf) => {
            buf.push_str(&sql[pending_from..]);
            Cow::Owned(buf)
        }
        None => Cow::Borrowed(sql),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numbers_bare_placeholders_for_mssql() {
        let sql = "select * from t where a = ? and b = ?";
        let res = translate_placeholders(sql, PlaceholderStyle::Mssql);
        assert_eq!(res, "select * from t where a = @P1 and b = @P2");
    }

    #[test]
    fn keeps_explicit_positions() {
        let sql = "insert into t values(?2, ?1, ?)";
        let res = translate_placeholders(sql, PlaceholderStyle::Mssql);
        assert_eq!(res, "insert into t values(@P2, @P1, @P3)");
    }

    #[test]
    fn sqlite_leaves_numbered_placeholders_borrowed() {
        let sql = "select ?1, ?2";
        let res = translate_placeholders(sql, PlaceholderStyle::Sqlite);
        assert!(matches!(res, Cow::Borrowed(_)));

        let res = translate_placeholders("select ?, ?5, ?", PlaceholderStyle::Sqlite);
        assert_eq!(res, "select ?1, ?5, ?6");
    }

    #[test]
    fn skips_inside_literals_and_comments() {
        let sql = "select '?', ? -- ?\n/* ? /* ? */ ? */ from [we?ird]]] where \"c?\" = ?";
        let res = translate_placeholders(sql, PlaceholderStyle::Mssql);
        assert_eq!(
            res,
            "select '?', @P1 -- ?\n/* ? /* ? */ ? */ from [we?ird]]] where \"c?\" = @P2"
        );
    }

    #[test]
    fn escaped_quotes_stay_inside_literal() {
        let sql = "select 'O''Brien?' where a = ?";
        let res = translate_placeholders(sql, PlaceholderStyle::Mssql);
        assert_eq!(res, "select 'O''Brien?' where a = @P1");
    }

    #[test]
    fn multibyte_text_survives_rewrite() {
        let sql = "select 'café' as n, ? as ünï";
        let res = translate_placeholders(sql, PlaceholderStyle::Mssql);
        assert_eq!(res, "select 'café' as n, @P1 as ünï");
    }

    #[test]
    fn no_placeholders_is_borrowed() {
        let sql = "select 1";
        assert!(matches!(
            translate_placeholders(sql, PlaceholderStyle::Mssql),
            Cow::Borrowed(_)
        ));
    }
}
