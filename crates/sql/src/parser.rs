//! Write-statement parser
//!
//! Consumes the token stream of an INSERT, UPDATE or DELETE statement and
//! emits a [`Mutation`] with its parameter values already coerced for the
//! wire. The dialect is deliberately small: literal column lists, placeholder
//! values, and for DELETE a single `=` or `IN` predicate.

use std::collections::HashMap;

use crate::error::{Error, Result};
use crate::mutation::Mutation;
use crate::tokenizer::{tokenize, Token, TokenKind};
use crate::value::Value;

/// Parse a write statement against its parameter map.
pub fn parse_write(sql: &str, params: &HashMap<String, Value>) -> Result<Mutation> {
    let tokens = tokenize(sql);
    Parser::new(&tokens, params).parse()
}

struct Parser<'a> {
    tokens: &'a [Token],
    pos: usize,
    params: &'a HashMap<String, Value>,
}

impl<'a> Parser<'a> {
    fn new(tokens: &'a [Token], params: &'a HashMap<String, Value>) -> Self {
        Self {
            tokens,
            pos: 0,
            params,
        }
    }

    fn parse(mut self) -> Result<Mutation> {
        let method = self
            .next()
            .ok_or_else(|| Error::ParseError("empty statement".into()))?
            .text
            .to_uppercase();

        match method.as_str() {
            "INSERT" => self.parse_insert(),
            "UPDATE" => self.parse_update(),
            "DELETE" => self.parse_delete(),
            other => Err(Error::NotImplemented(format!(
                "statement method {other} is not supported"
            ))),
        }
    }

    /// `INSERT INTO table (col, …) VALUES (val, …) [, (val, …) …]`
    fn parse_insert(&mut self) -> Result<Mutation> {
        self.expect_keyword("INTO")?;
        let table = self.next_name()?;

        self.expect_kind(TokenKind::LBracket, "expected column list after table name")?;
        let columns = self.bracketed_names()?;

        self.expect_keyword("VALUES")?;

        let mut values = Vec::new();
        loop {
            while self.next_if_kind(TokenKind::Comma) {}
            if !self.next_if_kind(TokenKind::LBracket) {
                break;
            }
            let row = self.bracketed_names()?;
            if row.len() != columns.len() {
                return Err(Error::ParseError(format!(
                    "row has {} values but {} columns were named",
                    row.len(),
                    columns.len()
                )));
            }
            values.push(self.resolve_row(&row)?);
        }

        Ok(Mutation::Insert {
            table,
            columns,
            values,
        })
    }

    /// `UPDATE table SET col = val, col = val, …`
    ///
    /// Assignments are collected pairwise from each SET/comma boundary: the
    /// next Name is the column, the Name after it the value placeholder. The
    /// scan stops at the first boundary yielding no complete pair, so any
    /// trailing clause without a comma before it is ignored.
    fn parse_update(&mut self) -> Result<Mutation> {
        let table = self.next_name()?;
        self.expect_keyword("SET")?;

        let mut columns = Vec::new();
        let mut row = Vec::new();
        loop {
            let Some(column) = self.scan_name() else { break };
            let Some(value) = self.scan_name() else { break };
            columns.push(column);
            row.push(value);
            if !self.scan_comma() {
                break;
            }
        }
        if columns.is_empty() {
            return Err(Error::ParseError("malformed SET clause".into()));
        }

        let row = self.resolve_row(&row)?;
        Ok(Mutation::Update {
            table,
            columns,
            values: vec![row],
        })
    }

    /// `DELETE FROM table WHERE col = val` or `… WHERE col IN (val, …)`
    fn parse_delete(&mut self) -> Result<Mutation> {
        self.expect_keyword("FROM")?;
        let table = self.next_name()?;
        self.expect_keyword("WHERE")?;
        self.next_name()?; // predicate column; the key set alone goes on the wire

        let key_names = match self.next() {
            Some(token) if token.kind == TokenKind::Operator && token.text == "=" => {
                vec![self.next_name()?]
            }
            Some(token) if token.is_keyword("IN") => {
                self.expect_kind(TokenKind::LBracket, "expected value list after IN")?;
                self.bracketed_names()?
            }
            Some(token) if token.kind == TokenKind::Operator => {
                return Err(Error::UnsupportedOperation(format!(
                    "DELETE predicate operator {} is not supported, use = or IN",
                    token.text
                )));
            }
            Some(token) => {
                return Err(Error::ParseError(format!(
                    "expected predicate operator, found {}",
                    token.text
                )));
            }
            None => {
                return Err(Error::ParseError(
                    "unexpected end of DELETE predicate".into(),
                ));
            }
        };

        if self.pos < self.tokens.len() {
            return Err(Error::ParseError(
                "DELETE supports exactly one predicate on one column".into(),
            ));
        }

        let key_set = key_names
            .iter()
            .map(|name| self.resolve_param(name))
            .collect::<Result<Vec<_>>>()?;

        Ok(Mutation::Delete { table, key_set })
    }

    /// Collects Name tokens up to the closing bracket; commas are skipped.
    /// The opening bracket must already be consumed.
    fn bracketed_names(&mut self) -> Result<Vec<String>> {
        let mut names = Vec::new();
        loop {
            match self.next() {
                Some(token) => match token.kind {
                    TokenKind::RBracket => return Ok(names),
                    TokenKind::Comma => continue,
                    TokenKind::Name => names.push(token.text.clone()),
                    _ => {
                        return Err(Error::ParseError(format!(
                            "unexpected token {} in bracketed list",
                            token.text
                        )));
                    }
                },
                None => return Err(Error::ParseError("unbalanced bracket".into())),
            }
        }
    }

    /// Resolves each placeholder in a row and coerces it for the wire.
    fn resolve_row(&self, names: &[String]) -> Result<Vec<serde_json::Value>> {
        names.iter().map(|name| self.resolve_param(name)).collect()
    }

    fn resolve_param(&self, name: &str) -> Result<serde_json::Value> {
        let key = name.trim_start_matches('@');
        self.params
            .get(key)
            .map(Value::to_wire)
            .ok_or_else(|| Error::ParseError(format!("unknown parameter: {name}")))
    }

    fn next(&mut self) -> Option<&'a Token> {
        let token = self.tokens.get(self.pos)?;
        self.pos += 1;
        Some(token)
    }

    fn next_if_kind(&mut self, kind: TokenKind) -> bool {
        if self.tokens.get(self.pos).is_some_and(|t| t.kind == kind) {
            self.pos += 1;
            return true;
        }
        false
    }

    fn next_name(&mut self) -> Result<String> {
        match self.next() {
            Some(token) if token.kind == TokenKind::Name => Ok(token.text.clone()),
            Some(token) => Err(Error::ParseError(format!(
                "expected name, found {}",
                token.text
            ))),
            None => Err(Error::ParseError("unexpected end of statement".into())),
        }
    }

    fn expect_keyword(&mut self, word: &str) -> Result<()> {
        match self.next() {
            Some(token) if token.is_keyword(word) => Ok(()),
            Some(token) => Err(Error::ParseError(format!(
                "expected {word}, found {}",
                token.text
            ))),
            None => Err(Error::ParseError(format!("expected {word}"))),
        }
    }

    fn expect_kind(&mut self, kind: TokenKind, message: &str) -> Result<()> {
        match self.next() {
            Some(token) if token.kind == kind => Ok(()),
            _ => Err(Error::ParseError(message.into())),
        }
    }

    /// Consumes tokens until the next Name, returning it, or None if the
    /// statement ends first.
    fn scan_name(&mut self) -> Option<String> {
        while let Some(token) = self.next() {
            if token.kind == TokenKind::Name {
                return Some(token.text.clone());
            }
        }
        None
    }

    /// Consumes tokens until the next comma boundary; false if none remains.
    fn scan_comma(&mut self) -> bool {
        while let Some(token) = self.next() {
            if token.kind == TokenKind::Comma {
                return true;
            }
        }
        false
    }
}
