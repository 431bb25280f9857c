//! Schema/seed script model and statement splitting.
//!
//! Scripts are split into statements by a small tokenizer that tracks quote
//! and comment state, so a `;` inside a string literal or comment never
//! terminates a statement. Fragments that are empty or contain only comments
//! are discarded; every retained statement keeps its 1-based source position
//! for error reporting.

/// A single executable statement extracted from a script.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Statement {
    /// 1-based position within the script, counting retained statements only
    pub position: usize,
    /// Statement text with the terminator stripped and whitespace trimmed
    pub sql: String,
}

/// An ordered sequence of SQL statements.
#[derive(Debug, Clone, Default)]
pub struct SqlScript {
    statements: Vec<Statement>,
}

/// Tokenizer state while scanning a script.
enum Lex {
    Normal,
    SingleQuote,
    DoubleQuote,
    Backtick,
    LineComment,
    BlockComment,
}

impl SqlScript {
    /// The built-in schema/seed script for the store rating database.
    ///
    /// Table and index DDL only; seed rows are inserted separately with
    /// hashed credentials (see [`crate::seed::SeedPlan`]).
    pub fn embedded() -> Self {
        Self::parse(include_str!("../sql/schema.sql"))
    }

    /// Splits `source` into executable statements.
    ///
    /// Statement terminators are recognized only outside single-quoted,
    /// double-quoted, and backtick-quoted runs, `--`/`#` line comments, and
    /// `/* ... */` block comments. Backslash escapes inside quoted runs are
    /// honored (MySQL semantics). A trailing fragment without a terminator
    /// is kept.
    pub fn parse(source: &str) -> Self {
        let mut statements = Vec::new();
        let mut buf = String::new();
        let mut has_content = false;
        let mut state = Lex::Normal;
        let mut chars = source.chars().peekable();
        let mut position = 1;

        let mut flush = |buf: &mut String, has_content: &mut bool, position: &mut usize| {
            let text = buf.trim();
            if *has_content && !text.is_empty() {
                statements.push(Statement {
                    position: *position,
                    sql: text.to_string(),
                });
                *position += 1;
            }
            buf.clear();
            *has_content = false;
        };

        while let Some(c) = chars.next() {
            match state {
                Lex::Normal => match c {
                    ';' => {
                        flush(&mut buf, &mut has_content, &mut position);
                        continue;
                    }
                    '\'' => {
                        state = Lex::SingleQuote;
                        has_content = true;
                    }
                    '"' => {
                        state = Lex::DoubleQuote;
                        has_content = true;
                    }
                    '`' => {
                        state = Lex::Backtick;
                        has_content = true;
                    }
                    '#' => state = Lex::LineComment,
                    '-' if chars.peek() == Some(&'-') => {
                        buf.push('-');
                        buf.push('-');
                        chars.next();
                        state = Lex::LineComment;
                        continue;
                    }
                    '/' if chars.peek() == Some(&'*') => {
                        buf.push('/');
                        buf.push('*');
                        chars.next();
                        state = Lex::BlockComment;
                        continue;
                    }
                    _ if !c.is_whitespace() => has_content = true,
                    _ => {}
                },
                Lex::SingleQuote => match c {
                    '\\' => {
                        buf.push(c);
                        if let Some(escaped) = chars.next() {
                            buf.push(escaped);
                        }
                        continue;
                    }
                    '\'' => state = Lex::Normal,
                    _ => {}
                },
                Lex::DoubleQuote => match c {
                    '\\' => {
                        buf.push(c);
                        if let Some(escaped) = chars.next() {
                            buf.push(escaped);
                        }
                        continue;
                    }
                    '"' => state = Lex::Normal,
                    _ => {}
                },
                Lex::Backtick => {
                    if c == '`' {
                        state = Lex::Normal;
                    }
                }
                Lex::LineComment => {
                    if c == '\n' {
                        state = Lex::Normal;
                    }
                }
                Lex::BlockComment => {
                    if c == '*' && chars.peek() == Some(&'/') {
                        buf.push('*');
                        buf.push('/');
                        chars.next();
                        state = Lex::Normal;
                        continue;
                    }
                }
            }
            buf.push(c);
        }

        flush(&mut buf, &mut has_content, &mut position);

        Self { statements }
    }

    /// The statements in source order.
    pub fn statements(&self) -> &[Statement] {
        &self.statements
    }

    /// Number of executable statements.
    pub fn len(&self) -> usize {
        self.statements.len()
    }

    /// True when the script contains no executable statements.
    pub fn is_empty(&self) -> bool {
        self.statements.is_empty()
    }
}

/// First line of a statement, truncated for log/error context.
pub(crate) fn summarize(sql: &str) -> String {
    let first_line = sql.lines().next().unwrap_or_default().trim();
    if first_line.len() > 72 {
        let cut = first_line
            .char_indices()
            .take_while(|(i, _)| *i <= 69)
            .map(|(i, c)| i + c.len_utf8())
            .last()
            .unwrap_or(0);
        format!("{}...", &first_line[..cut])
    } else {
        first_line.to_string()
    }
}
