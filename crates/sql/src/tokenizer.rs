//! Quote-aware SQL tokenizer
//!
//! Splits statement text into a flat token sequence. Quote characters toggle
//! a region in which separators and operators lose their meaning; the quote
//! marks themselves are stripped. Quoting only hides separators, it does not
//! escape anything, so an unterminated quote simply swallows the rest of the
//! input into the current token.

/// Kind of a lexed token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    /// Uppercased text is in the reserved-word set.
    Keyword,
    /// Identifier, parameter placeholder or literal text.
    Name,
    Comma,
    LBracket,
    RBracket,
    Operator,
}

/// A single lexed token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub text: String,
}

impl Token {
    fn new(kind: TokenKind, text: impl Into<String>) -> Self {
        Self {
            kind,
            text: text.into(),
        }
    }

    /// True if this is a keyword matching `word` case-insensitively.
    pub fn is_keyword(&self, word: &str) -> bool {
        self.kind == TokenKind::Keyword && self.text.eq_ignore_ascii_case(word)
    }
}

/// Reserved words lexed as [`TokenKind::Keyword`], extended with the write
/// methods the parser dispatches on.
const RESERVED_WORDS: &[&str] = &[
    "ALL", "ALTER", "AND", "AS", "ASC", "BETWEEN", "BY", "CASE", "COLUMN", "CREATE", "CROSS",
    "DATABASE", "DEFAULT", "DELETE", "DESC", "DISTINCT", "DROP", "ELSE", "END", "EXISTS", "FALSE",
    "FROM", "FULL", "GROUP", "HAVING", "IN", "INDEX", "INNER", "INSERT", "INTERVAL", "INTO", "IS",
    "JOIN", "KEY", "LEFT", "LIKE", "LIMIT", "NOT", "NULL", "OFFSET", "ON", "OR", "ORDER", "OUTER",
    "PRIMARY", "REPLACE", "RIGHT", "SELECT", "SET", "SHOW", "START", "TABLE", "THEN", "TRANSACTION",
    "TRUE", "UNION", "UNIQUE", "UPDATE", "VALUES", "WHEN", "WHERE",
];

/// Tokenize a statement into an ordered token sequence.
pub fn tokenize(sql: &str) -> Vec<Token> {
    let mut tokens = Vec::new();
    let mut buffer = String::new();
    let mut in_quotes = false;

    let mut chars = sql.chars().peekable();
    while let Some(c) = chars.next() {
        if matches!(c, '\'' | '"' | '`') {
            in_quotes = !in_quotes;
            continue;
        }
        if in_quotes {
            buffer.push(c);
            continue;
        }
        match c {
            c if c.is_whitespace() => flush(&mut buffer, &mut tokens),
            '(' => {
                flush(&mut buffer, &mut tokens);
                tokens.push(Token::new(TokenKind::LBracket, "("));
            }
            ')' => {
                flush(&mut buffer, &mut tokens);
                tokens.push(Token::new(TokenKind::RBracket, ")"));
            }
            ',' => {
                flush(&mut buffer, &mut tokens);
                tokens.push(Token::new(TokenKind::Comma, ","));
            }
            '<' | '>' => {
                flush(&mut buffer, &mut tokens);
                let mut text = c.to_string();
                if chars.peek() == Some(&'=') {
                    chars.next();
                    text.push('=');
                }
                tokens.push(Token::new(TokenKind::Operator, text));
            }
            '=' | '^' | '-' | '+' | '/' | '%' | '*' => {
                flush(&mut buffer, &mut tokens);
                tokens.push(Token::new(TokenKind::Operator, c));
            }
            _ => buffer.push(c),
        }
    }
    flush(&mut buffer, &mut tokens);

    tokens
}

fn flush(buffer: &mut String, tokens: &mut Vec<Token>) {
    if buffer.is_empty() {
        return;
    }
    let text = std::mem::take(buffer);
    let kind = if RESERVED_WORDS.contains(&text.to_uppercase().as_str()) {
        TokenKind::Keyword
    } else {
        TokenKind::Name
    };
    tokens.push(Token { kind, text });
}
