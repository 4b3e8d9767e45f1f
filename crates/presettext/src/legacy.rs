//! Scanner for the older header-based preset text still found in stores
//! written before the `$key=` format:
//!
//! ```text
//! "The Name","MAME HLSL":ccvalue=3.5795;chromaa_y=0.3401
//! ```
//!
//! The optional header is a quoted shader name, optionally preceded by a
//! quoted preset name and a comma, and is terminated by a colon. The parameter
//! list that follows uses the same rules as the canonical scanner except that
//! reserved `$` keys are not allowed.
use std::vec;

use crate::error::{SyntaxError, SyntaxErrorKind};
use crate::scanner::{Cursor, Scanner, Token, TokenKind};

pub fn tokenize_legacy(text: &str) -> Result<Vec<Token<'_>>, SyntaxError> {
    LegacyScanner::new(text).collect()
}

#[derive(Debug, Clone)]
pub struct LegacyScanner<'a> {
    pending: Option<Cursor<'a>>,
    header: vec::IntoIter<Token<'a>>,
    params: Option<Scanner<'a>>,
}

impl<'a> LegacyScanner<'a> {
    pub fn new(text: &'a str) -> Self {
        Self {
            pending: Some(Cursor::new(text)),
            header: Vec::new().into_iter(),
            params: None,
        }
    }
}

impl<'a> Iterator for LegacyScanner<'a> {
    type Item = Result<Token<'a>, SyntaxError>;

    fn next(&mut self) -> Option<Self::Item> {
        if let Some(cursor) = self.pending.take() {
            match scan_header(cursor) {
                Ok((header, cursor)) => {
                    self.header = header.into_iter();
                    self.params = Some(Scanner::parameters(cursor));
                }
                Err(err) => return Some(Err(err)),
            }
        }

        if let Some(token) = self.header.next() {
            return Some(Ok(token));
        }
        self.params.as_mut()?.next()
    }
}

fn scan_header(mut cursor: Cursor<'_>) -> Result<(Vec<Token<'_>>, Cursor<'_>), SyntaxError> {
    if cursor.peek() != Some('"') {
        return Ok((Vec::new(), cursor));
    }

    let (offset, first) = cursor.quoted()?;
    let tokens = match cursor.peek() {
        Some(',') => {
            cursor.bump();
            let (shader_offset, shader) = cursor.quoted()?;
            if !cursor.eat(':') {
                return Err(cursor.error(SyntaxErrorKind::ExpectedSeparator));
            }
            vec![
                Token::new(TokenKind::Name, first, offset),
                Token::new(TokenKind::Shader, shader, shader_offset),
            ]
        }
        Some(':') => {
            cursor.bump();
            vec![Token::new(TokenKind::Shader, first, offset)]
        }
        _ => return Err(cursor.error(SyntaxErrorKind::ExpectedSeparator)),
    };
    Ok((tokens, cursor))
}
