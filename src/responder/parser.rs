// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! Tokenizer for the comma-separated `name[=value]` request body.

use thiserror::Error;

use crate::responder::registry::{Descriptor, VarFlags};

/// Upper bound on one value token.  Anything longer is hostile
/// (the historical "ntpdx" stack-smash pattern) and aborts the parse.
pub const MAX_VALUE_LEN: usize = 128;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ItemError {
    #[error("value token longer than {MAX_VALUE_LEN} octets")]
    ValueTooLong,
}

/// One tokenizer step against a given table.
#[derive(Debug)]
pub enum Token<'v, D> {
    /// A descriptor matched; the value is empty when the item carried
    /// no `=value` part.
    Var(&'v D, String),
    /// Input remains but no descriptor in this table matched.  The
    /// cursor did not move; the caller retries with another table or
    /// reports the name unknown.
    Unknown,
}

/// Cursor over the request data area.
///
/// The scanner is explicit: skip separators, match a descriptor name
/// up to a delimiter, then capture an optional value token.
#[derive(Debug)]
pub struct ItemParser<'a> {
    req: &'a [u8],
    pos: usize,
}

impl<'a> ItemParser<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { req: data, pos: 0 }
    }

    /// Unconsumed input.
    pub fn rest(&self) -> &'a [u8] {
        &self.req[self.pos..]
    }

    fn skip_separators(&mut self) {
        while self.pos < self.req.len() {
            let b = self.req[self.pos];
            if b == b',' || b.is_ascii_whitespace() {
                self.pos += 1;
            } else {
                break;
            }
        }
    }

    /// Fetch the next `name[=value]` item, resolving the name against
    /// `table`.  `Ok(None)` when the input is exhausted.
    pub fn next_item<'v, D: Descriptor>(
        &mut self,
        table: &'v [D],
    ) -> Result<Option<Token<'v, D>>, ItemError> {
        self.skip_separators();
        if self.pos >= self.req.len() {
            return Ok(None);
        }

        for var in table {
            if var.flags().intersects(VarFlags::EOV | VarFlags::PADDING) {
                continue;
            }
            if let Some(value) = self.try_match(var.name().as_bytes())? {
                return Ok(Some(Token::Var(var, value)));
            }
        }
        Ok(Some(Token::Unknown))
    }

    /// Attempt one descriptor name at the current cursor, returning
    /// its value token on success.  The cursor only advances on a
    /// successful match.
    fn try_match(&mut self, name: &[u8]) -> Result<Option<String>, ItemError> {
        if name.is_empty()
            || self.req.len() - self.pos < name.len()
            || &self.req[self.pos..self.pos + name.len()] != name
        {
            return Ok(None);
        }

        let mut cp = self.pos + name.len();
        while cp < self.req.len() && self.req[cp].is_ascii_whitespace() {
            cp += 1;
        }

        // Bare name: the item ends at a comma or the end of input.
        if cp >= self.req.len() || self.req[cp] == b',' {
            if cp < self.req.len() {
                cp += 1;
            }
            self.pos = cp;
            return Ok(Some(String::new()));
        }

        if self.req[cp] != b'=' {
            return Ok(None);
        }
        cp += 1;
        while cp < self.req.len() && self.req[cp].is_ascii_whitespace() {
            cp += 1;
        }

        let start = cp;
        while cp < self.req.len() && self.req[cp] != b',' {
            if cp - start >= MAX_VALUE_LEN {
                return Err(ItemError::ValueTooLong);
            }
            cp += 1;
        }
        let mut end = cp;
        while end > start && self.req[end - 1].is_ascii_whitespace() {
            end -= 1;
        }
        let value = String::from_utf8_lossy(&self.req[start..end]).into_owned();
        if cp < self.req.len() {
            cp += 1;
        }
        self.pos = cp;
        Ok(Some(value))
    }
}
