use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref LEADING_TRIVIA: Regex =
        Regex::new(r"^(?:\s+|--[^\n]*(?:\n|$)|/\*(?s:.*?)\*/|\()*").expect("static regex");
    static ref QUOTED: Regex =
        Regex::new(r#"'(?:[^']|'')*'|"(?:[^"]|"")*"|\[[^\]]*\]|--[^\n]*|/\*(?s:.*?)\*/"#)
            .expect("static regex");
    static ref ROW_KEYWORD: Regex =
        Regex::new(r"(?i)^(?:SELECT|VALUES|PRAGMA|EXPLAIN|SHOW|DESCRIBE|EXEC|EXECUTE|TABLE)\b")
            .expect("static regex");
    static ref WITH_KEYWORD: Regex = Regex::new(r"(?i)^WITH\b").expect("static regex");
    static ref INSERT_KEYWORD: Regex =
        Regex::new(r"(?i)^(?:INSERT|REPLACE|MERGE)\b").expect("static regex");
    static ref RETURNING_CLAUSE: Regex =
        Regex::new(r"(?i)\b(?:RETURNING|OUTPUT)\b").expect("static regex");
    static ref TOKEN: Regex = Regex::new(r"[()]|[A-Za-z_][A-Za-z0-9_]*").expect("static regex");
}

const MAIN_VERBS: &[&str] = &[
    "SELECT", "VALUES", "INSERT", "REPLACE", "MERGE", "UPDATE", "DELETE",
];

/// What a statement is expected to do, judged from its leading keyword.
///
/// Classification only picks the native call; backends that can tell from
/// the prepared statement whether columns come back override it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatementKind {
    pub returns_rows: bool,
    /// The statement may generate an identity value.
    pub inserts: bool,
}

impl StatementKind {
    #[must_use]
    pub fn classify(sql: &str) -> Self {
        let body = LEADING_TRIVIA
            .find(sql)
            .map_or(sql, |trivia| &sql[trivia.end()..]);
        let bare = QUOTED.replace_all(body, " ");

        let returning = RETURNING_CLAUSE.is_match(&bare);
        if WITH_KEYWORD.is_match(body) {
            let verb = main_verb(&bare);
            let inserts = verb.is_some_and(|v| INSERT_KEYWORD.is_match(v));
            let selects = verb.is_none_or(|v| {
                v.eq_ignore_ascii_case("SELECT") || v.eq_ignore_ascii_case("VALUES")
            });
            return Self {
                returns_rows: selects || returning,
                inserts,
            };
        }

        Self {
            returns_rows: ROW_KEYWORD.is_match(body) || returning,
            inserts: INSERT_KEYWORD.is_match(body),
        }
    }
}

/// First top-level verb after the common table expressions of a `WITH`.
fn main_verb(body: &str) -> Option<&str> {
    let mut depth = 0usize;
    for token in TOKEN.find_iter(body) {
        match token.as_str() {
            "(" => depth += 1,
            ")" => depth = depth.saturating_sub(1),
            word if depth == 0
                && MAIN_VERBS.iter().any(|verb| verb.eq_ignore_ascii_case(word)) =>
            {
                return Some(word);
            }
            _ => {}
        }
    }
    None
}
