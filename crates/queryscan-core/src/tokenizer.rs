//! SQL tokenizer and text normalization.
//!
//! Turns raw query text into a flat stream of categorized [`Token`]s after
//! stripping comments, and splits multi-statement input on semicolons that
//! sit outside string literals and parentheses. The tokenizer is
//! deliberately permissive: it never rejects input, it only categorizes it.

use serde::{Deserialize, Serialize};

/// Lexical category of a token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenKind {
    /// A reserved SQL word (`SELECT`, `FROM`, `JOIN`, ...).
    Keyword,
    /// A bare or quoted identifier.
    Identifier,
    /// A string or numeric literal.
    Literal,
    /// Punctuation or an operator.
    Punct,
    /// A run of whitespace.
    Whitespace,
}

/// One lexical unit of a statement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    /// Token text. Quoted identifiers keep their inner text without quotes.
    pub text: String,
    /// Byte offset of the token start within the statement.
    pub offset: usize,
}

impl Token {
    /// Uppercased token text, used for keyword comparisons.
    pub fn upper(&self) -> String {
        self.text.to_uppercase()
    }

    /// True if this token is the given keyword (case-insensitive).
    pub fn is_keyword(&self, word: &str) -> bool {
        self.kind == TokenKind::Keyword && self.text.eq_ignore_ascii_case(word)
    }
}

/// Reserved words the extractor state machine reacts to, plus common SQL
/// words that must never be mistaken for table or column identifiers.
const KEYWORDS: &[&str] = &[
    "ALL", "ALTER", "AND", "AS", "ASC", "BETWEEN", "BY", "CASE", "CAST", "CREATE", "CROSS",
    "DELETE", "DESC", "DISTINCT", "DROP", "ELSE", "END", "EXCEPT", "EXEC", "EXECUTE", "EXISTS",
    "FROM", "FULL", "GRANT", "GROUP", "HAVING", "IMMEDIATE", "IN", "INNER", "INSERT", "INTERSECT",
    "INTO", "IS", "JOIN", "LEFT", "LIKE", "LIMIT", "NATURAL", "NOT", "NULL", "OFFSET", "ON", "OR",
    "ORDER", "OUTER", "PREPARE", "RECURSIVE", "RIGHT", "SELECT", "SET", "TABLE", "THEN", "UNION",
    "UPDATE", "USING", "VALUES", "WHEN", "WHERE", "WITH",
];

fn is_reserved(word: &str) -> bool {
    let upper = word.to_uppercase();
    KEYWORDS.binary_search(&upper.as_str()).is_ok()
}

/// Two-character operators lexed as a single punct token.
const DOUBLE_OPERATORS: &[&str] = &["::", "<=", ">=", "<>", "!=", "||", "->"];

/// Removes line (`--`) and block (`/* */`) comments, quote-aware.
///
/// Newlines inside removed comments are preserved so that line numbers in
/// downstream impact locations stay stable.
pub fn strip_comments(sql: &str) -> String {
    let chars: Vec<char> = sql.chars().collect();
    let mut out = String::with_capacity(sql.len());
    let mut i = 0;
    let mut in_single = false;
    let mut in_double = false;

    while i < chars.len() {
        let c = chars[i];
        if in_single {
            out.push(c);
            if c == '\'' {
                // Doubled quote is an escaped quote, not a terminator.
                if chars.get(i + 1) == Some(&'\'') {
                    out.push('\'');
                    i += 2;
                    continue;
                }
                in_single = false;
            }
            i += 1;
        } else if in_double {
            out.push(c);
            if c == '"' {
                in_double = false;
            }
            i += 1;
        } else if c == '-' && chars.get(i + 1) == Some(&'-') {
            while i < chars.len() && chars[i] != '\n' {
                i += 1;
            }
        } else if c == '/' && chars.get(i + 1) == Some(&'*') {
            i += 2;
            while i < chars.len() {
                if chars[i] == '*' && chars.get(i + 1) == Some(&'/') {
                    i += 2;
                    break;
                }
                if chars[i] == '\n' {
                    out.push('\n');
                }
                i += 1;
            }
            out.push(' ');
        } else {
            if c == '\'' {
                in_single = true;
            } else if c == '"' {
                in_double = true;
            }
            out.push(c);
            i += 1;
        }
    }

    out
}

/// Splits input into statement texts on semicolons outside of string
/// literals and parentheses. Empty chunks are dropped.
pub fn split_statements(sql: &str) -> Vec<String> {
    let mut statements = Vec::new();
    let mut current = String::new();
    let mut in_single = false;
    let mut in_double = false;
    let mut depth: usize = 0;
    let mut chars = sql.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '\'' if !in_double => {
                current.push(c);
                if in_single && chars.peek() == Some(&'\'') {
                    current.push(chars.next().unwrap());
                } else {
                    in_single = !in_single;
                }
            }
            '"' if !in_single => {
                current.push(c);
                in_double = !in_double;
            }
            '(' if !in_single && !in_double => {
                depth += 1;
                current.push(c);
            }
            ')' if !in_single && !in_double => {
                depth = depth.saturating_sub(1);
                current.push(c);
            }
            ';' if !in_single && !in_double && depth == 0 => {
                let chunk = current.trim();
                if !chunk.is_empty() {
                    statements.push(chunk.to_string());
                }
                current.clear();
            }
            _ => current.push(c),
        }
    }

    let chunk = current.trim();
    if !chunk.is_empty() {
        statements.push(chunk.to_string());
    }

    statements
}

/// Lexes one statement into a flat token stream.
///
/// Never fails: anything unrecognized becomes a one-character punct token.
pub fn tokenize(statement: &str) -> Vec<Token> {
    let mut tokens = Vec::new();
    let bytes = statement.as_bytes();
    let mut i = 0;

    while i < bytes.len() {
        let start = i;
        let c = bytes[i] as char;

        if c.is_ascii_whitespace() {
            while i < bytes.len() && (bytes[i] as char).is_ascii_whitespace() {
                i += 1;
            }
            tokens.push(Token {
                kind: TokenKind::Whitespace,
                text: statement[start..i].to_string(),
                offset: start,
            });
        } else if c == '\'' {
            i += 1;
            while i < bytes.len() {
                if bytes[i] == b'\'' {
                    if bytes.get(i + 1) == Some(&b'\'') {
                        i += 2;
                        continue;
                    }
                    i += 1;
                    break;
                }
                i += 1;
            }
            tokens.push(Token {
                kind: TokenKind::Literal,
                text: statement[start..i].to_string(),
                offset: start,
            });
        } else if c == '"' || c == '`' {
            let quote = bytes[start];
            i += 1;
            let inner_start = i;
            while i < bytes.len() && bytes[i] != quote {
                i += 1;
            }
            let inner = statement[inner_start..i].to_string();
            if i < bytes.len() {
                i += 1;
            }
            tokens.push(Token {
                kind: TokenKind::Identifier,
                text: inner,
                offset: start,
            });
        } else if c.is_ascii_digit() {
            while i < bytes.len() && ((bytes[i] as char).is_ascii_digit() || bytes[i] == b'.') {
                i += 1;
            }
            tokens.push(Token {
                kind: TokenKind::Literal,
                text: statement[start..i].to_string(),
                offset: start,
            });
        } else if c.is_ascii_alphabetic() || c == '_' {
            while i < bytes.len() {
                let w = bytes[i] as char;
                if w.is_ascii_alphanumeric() || w == '_' || w == '$' {
                    i += 1;
                } else {
                    break;
                }
            }
            let word = &statement[start..i];
            let kind = if is_reserved(word) {
                TokenKind::Keyword
            } else {
                TokenKind::Identifier
            };
            tokens.push(Token {
                kind,
                text: word.to_string(),
                offset: start,
            });
        } else {
            // Width in bytes of the char at `i`; non-ASCII input must not be
            // split mid-character.
            let ch_len = statement[i..]
                .chars()
                .next()
                .map(char::len_utf8)
                .unwrap_or(1);
            let mut len = ch_len;
            if ch_len == 1 && i + 2 <= bytes.len() && statement.is_char_boundary(i + 2) {
                let pair = &statement[i..i + 2];
                if DOUBLE_OPERATORS.contains(&pair) {
                    len = 2;
                }
            }
            tokens.push(Token {
                kind: TokenKind::Punct,
                text: statement[start..start + len].to_string(),
                offset: start,
            });
            i += len;
        }
    }

    tokens
}

/// Tokenizes and drops whitespace, which the extractor never needs.
pub fn significant_tokens(statement: &str) -> Vec<Token> {
    tokenize(statement)
        .into_iter()
        .filter(|t| t.kind != TokenKind::Whitespace)
        .collect()
}
