//! # Schema Extractor
//!
//! Parses raw `CREATE TABLE` / `CREATE VIRTUAL TABLE` DDL text (as stored in
//! the catalog) into a normalized column list. This is the only place the
//! crate interprets SQL text itself rather than handing it to the engine, so
//! the parser is deliberately tolerant of dialect quirks:
//!
//! - Quoted identifiers in double-quote, backtick, bracket, and (in name
//!   positions) single-quote styles.
//! - Multi-word declared types (`unsigned big int`) with optional
//!   parenthesized arguments (`decimal(5, 2)`).
//! - Table-level constraints (PRIMARY KEY, UNIQUE, CHECK, FOREIGN KEY,
//!   CONSTRAINT) are skipped, not treated as columns.
//! - Virtual-table module arguments that are configuration rather than
//!   columns, in particular fts tokenizer clauses such as
//!   `tokenize=unicode61 "tokenchars=.+#"`, `"remove_diacritics=2"` and
//!   `"separators=-"`, are recognized and neutralized instead of breaking
//!   the parse. This is a known fragility boundary of DDL-text parsing.
//!
//! ## Output
//!
//! One `Column` per declared column, in declaration order. A typed column
//! carries the lowercased base type with arguments joined by `", "`
//! (`"decimal(5, 2)"`); an untyped column carries `"N/A"`.
//!
//! ## Failure mode
//!
//! DDL the parser cannot handle at all is a `DbError::Parse` for that
//! table's schema entry. The error propagates; the table is never silently
//! dropped from the descriptor.

use crate::error::DbError;

/// Placeholder type for columns declared without a type.
pub const UNTYPED: &str = "N/A";

/// Normalized column metadata extracted from DDL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Column {
    pub name: String,
    /// Normalized declared type, or `"N/A"` when undeclared.
    pub decl_type: String,
}

/// Schema entry for one user table or virtual table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableSchema {
    pub name: String,
    pub columns: Vec<Column>,
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    /// Identifier; `true` when it was quoted and therefore can never be a
    /// keyword.
    Ident(String, bool),
    Number(String),
    Str(String),
    LParen,
    RParen,
    Comma,
    Eq,
    Other(char),
}

fn parse_err(msg: impl Into<String>) -> DbError {
    DbError::Parse(msg.into())
}

fn tokenize(sql: &str) -> Result<Vec<Token>, DbError> {
    let bytes = sql.as_bytes();
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < bytes.len() {
        let c = bytes[i];
        match c {
            b' ' | b'\t' | b'\r' | b'\n' => i += 1,
            b'-' if bytes.get(i + 1) == Some(&b'-') => {
                while i < bytes.len() && bytes[i] != b'\n' {
                    i += 1;
                }
            }
            b'/' if bytes.get(i + 1) == Some(&b'*') => {
                i += 2;
                while i + 1 < bytes.len() && !(bytes[i] == b'*' && bytes[i + 1] == b'/') {
                    i += 1;
                }
                if i + 1 >= bytes.len() {
                    return Err(parse_err("unterminated block comment in DDL"));
                }
                i += 2;
            }
            b'"' | b'`' => {
                let (text, next) = scan_quoted(sql, i, c as char, c as char)?;
                tokens.push(Token::Ident(text, true));
                i = next;
            }
            b'[' => {
                let end = sql[i + 1..]
                    .find(']')
                    .ok_or_else(|| parse_err("unterminated bracket identifier in DDL"))?;
                tokens.push(Token::Ident(sql[i + 1..i + 1 + end].to_string(), true));
                i += end + 2;
            }
            b'\'' => {
                let (text, next) = scan_quoted(sql, i, '\'', '\'')?;
                tokens.push(Token::Str(text));
                i = next;
            }
            b'(' => {
                tokens.push(Token::LParen);
                i += 1;
            }
            b')' => {
                tokens.push(Token::RParen);
                i += 1;
            }
            b',' => {
                tokens.push(Token::Comma);
                i += 1;
            }
            b'=' => {
                tokens.push(Token::Eq);
                i += 1;
            }
            b'0'..=b'9' => {
                let start = i;
                while i < bytes.len() && (bytes[i].is_ascii_digit() || bytes[i] == b'.') {
                    i += 1;
                }
                tokens.push(Token::Number(sql[start..i].to_string()));
            }
            _ if c.is_ascii_alphabetic() || c == b'_' || c >= 0x80 => {
                let start = i;
                while i < bytes.len()
                    && (bytes[i].is_ascii_alphanumeric()
                        || bytes[i] == b'_'
                        || bytes[i] == b'$'
                        || bytes[i] >= 0x80)
                {
                    i += 1;
                }
                tokens.push(Token::Ident(sql[start..i].to_string(), false));
            }
            _ => {
                tokens.push(Token::Other(c as char));
                i += 1;
            }
        }
    }
    Ok(tokens)
}

/// Scans a quoted region starting at `start` (which holds the opening
/// quote). A doubled closing quote is an escape. Returns the unescaped text
/// and the index one past the closing quote.
fn scan_quoted(sql: &str, start: usize, open: char, close: char) -> Result<(String, usize), DbError> {
    let bytes = sql.as_bytes();
    let mut text = String::new();
    let mut i = start + open.len_utf8();

    while i < bytes.len() {
        if bytes[i] == close as u8 {
            if bytes.get(i + 1) == Some(&(close as u8)) {
                text.push(close);
                i += 2;
                continue;
            }
            return Ok((text, i + 1));
        }
        let ch = sql[i..].chars().next().unwrap_or('\0');
        text.push(ch);
        i += ch.len_utf8();
    }
    Err(parse_err(format!("unterminated {open} quote in DDL")))
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn next(&mut self) -> Option<Token> {
        let t = self.tokens.get(self.pos).cloned();
        if t.is_some() {
            self.pos += 1;
        }
        t
    }

    /// Consumes the next token when it is the unquoted keyword `kw`.
    fn eat_keyword(&mut self, kw: &str) -> bool {
        if let Some(Token::Ident(word, false)) = self.peek() {
            if word.eq_ignore_ascii_case(kw) {
                self.pos += 1;
                return true;
            }
        }
        false
    }

    fn expect_keyword(&mut self, kw: &str) -> Result<(), DbError> {
        if self.eat_keyword(kw) {
            Ok(())
        } else {
            Err(parse_err(format!("expected {kw} in CREATE statement")))
        }
    }

    /// Consumes a name token. Single-quoted strings count: SQLite accepts
    /// them as identifiers in DDL and writes fts shadow tables to the
    /// catalog that way (`CREATE TABLE 'ft_content'('c0title', ...)`).
    fn expect_ident(&mut self) -> Result<String, DbError> {
        match self.next() {
            Some(Token::Ident(name, _)) | Some(Token::Str(name)) => Ok(name),
            other => Err(parse_err(format!("expected identifier, found {other:?}"))),
        }
    }

    /// Skips tokens until a comma or closing paren at nesting depth zero.
    /// Leaves the terminator unconsumed.
    fn skip_to_entry_end(&mut self) {
        let mut depth = 0usize;
        while let Some(t) = self.peek() {
            match t {
                Token::LParen => depth += 1,
                Token::RParen => {
                    if depth == 0 {
                        return;
                    }
                    depth -= 1;
                }
                Token::Comma if depth == 0 => return,
                _ => {}
            }
            self.pos += 1;
        }
    }
}

/// Keywords that introduce a table-level constraint rather than a column.
const TABLE_CONSTRAINTS: &[&str] = &["PRIMARY", "UNIQUE", "CHECK", "FOREIGN", "CONSTRAINT"];

/// Keywords that terminate a declared type and start column constraints.
const COLUMN_CONSTRAINTS: &[&str] = &[
    "PRIMARY",
    "KEY",
    "NOT",
    "NULL",
    "UNIQUE",
    "CHECK",
    "DEFAULT",
    "COLLATE",
    "REFERENCES",
    "GENERATED",
    "AS",
    "CONSTRAINT",
    "AUTOINCREMENT",
    "ON",
];

fn is_keyword(word: &str, set: &[&str]) -> bool {
    set.iter().any(|k| word.eq_ignore_ascii_case(k))
}

/// Extracts the declared columns from one `CREATE TABLE` or
/// `CREATE VIRTUAL TABLE ... USING module(args)` statement.
pub fn extract_columns(ddl: &str) -> Result<Vec<Column>, DbError> {
    let mut p = Parser {
        tokens: tokenize(ddl)?,
        pos: 0,
    };

    p.expect_keyword("CREATE")?;
    let _ = p.eat_keyword("TEMP") || p.eat_keyword("TEMPORARY");
    let virtual_table = p.eat_keyword("VIRTUAL");
    p.expect_keyword("TABLE")?;

    if p.eat_keyword("IF") {
        p.expect_keyword("NOT")?;
        p.expect_keyword("EXISTS")?;
    }

    // table name, optionally schema-qualified
    p.expect_ident()?;
    while matches!(p.peek(), Some(Token::Other('.'))) {
        p.next();
        p.expect_ident()?;
    }

    if virtual_table {
        p.expect_keyword("USING")?;
        p.expect_ident()?; // module name
        return match p.next() {
            Some(Token::LParen) => parse_entries(&mut p, true),
            None => Ok(Vec::new()), // argument-less module
            other => Err(parse_err(format!(
                "unexpected token after USING clause: {other:?}"
            ))),
        };
    }

    match p.next() {
        Some(Token::LParen) => parse_entries(&mut p, false),
        other => Err(parse_err(format!(
            "expected column list in CREATE TABLE, found {other:?}"
        ))),
    }
}

/// Parses the comma-separated entries of a column/argument list up to the
/// closing paren.
fn parse_entries(p: &mut Parser, virtual_table: bool) -> Result<Vec<Column>, DbError> {
    let mut columns = Vec::new();

    loop {
        match p.peek() {
            Some(Token::RParen) => {
                p.next();
                return Ok(columns);
            }
            Some(Token::Comma) => {
                p.next();
                continue;
            }
            None => return Err(parse_err("unterminated column list in DDL")),
            _ => {}
        }

        if let Some(col) = parse_entry(p, virtual_table)? {
            columns.push(col);
        }
        p.skip_to_entry_end();
    }
}

/// Parses one list entry. Returns `None` for entries that are not columns:
/// table constraints in ordinary tables, module configuration arguments
/// (anything option-shaped, e.g. `tokenize=...` with its quoted pieces) in
/// virtual tables.
fn parse_entry(p: &mut Parser, virtual_table: bool) -> Result<Option<Column>, DbError> {
    let (name, quoted) = match p.peek() {
        Some(Token::Ident(name, quoted)) => (name.clone(), *quoted),
        // Bare string or numeric arguments are module configuration, not
        // columns.
        Some(Token::Str(_)) | Some(Token::Number(_)) if virtual_table => return Ok(None),
        // In an ordinary table a single-quoted string is a quoted column
        // name (the form fts shadow tables use in the catalog).
        Some(Token::Str(name)) => (name.clone(), true),
        other => {
            return Err(parse_err(format!(
                "expected column name, found {other:?}"
            )))
        }
    };

    if !virtual_table && !quoted && is_keyword(&name, TABLE_CONSTRAINTS) {
        return Ok(None);
    }
    p.next();

    if virtual_table && matches!(p.peek(), Some(Token::Eq)) {
        // option argument such as tokenize=... or content=...; the trailing
        // quoted pieces of a tokenizer clause are consumed by skip_to_entry_end
        return Ok(None);
    }

    let decl_type = parse_decl_type(p);
    Ok(Some(Column { name, decl_type }))
}

/// Parses an optional declared type: one or more type words followed by an
/// optional parenthesized argument list.
fn parse_decl_type(p: &mut Parser) -> String {
    let mut words: Vec<String> = Vec::new();

    loop {
        let word = match p.peek() {
            Some(Token::Ident(w, quoted)) if *quoted || !is_keyword(w, COLUMN_CONSTRAINTS) => {
                w.to_lowercase()
            }
            _ => break,
        };
        words.push(word);
        p.next();
    }

    if words.is_empty() {
        return UNTYPED.to_string();
    }

    let mut decl = words.join(" ");
    if matches!(p.peek(), Some(Token::LParen)) {
        p.next();
        let mut args: Vec<String> = Vec::new();
        while let Some(t) = p.peek().cloned() {
            p.next();
            match t {
                Token::RParen => break,
                Token::Comma => {}
                Token::Number(n) => args.push(n),
                Token::Ident(w, _) => args.push(w),
                Token::Str(s) => args.push(s),
                _ => {}
            }
        }
        decl = format!("{}({})", decl, args.join(", "));
    }
    decl
}
