//! Splits canonical preset text into tokens so `reader` can build records
//! without re-validating separators. The canonical grammar is a flat list of
//! `key=value` pairs joined by `;`, where reserved keys start with `$` and take
//! a quoted string while parameter keys take a number:
//!
//! ```text
//! $name="Soft CRT";$shader="CRT";$createdAt="1700000000";gamma=2.2;mask=-0.5
//! ```
//!
//! Types:
//!
//! - `TokenKind` names the token classes shared with the legacy header scanner.
//! - `Token` borrows its lexeme straight from the input, so multi-byte UTF-8
//!   inside quoted strings reaches the reader byte-for-byte.
//! - `Scanner` is a fused iterator of `Result<Token, SyntaxError>`; the end of
//!   the iterator is end of input and the first `Err` ends the stream.
//!
//! Functions:
//!
//! - `tokenize` drains a `Scanner` into a vector or returns the first error.
//! - `Cursor` (crate-private) holds the character-level helpers both scanners
//!   use for identifiers, numbers, and quoted strings.
use crate::error::{SyntaxError, SyntaxErrorKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    /// Parameter name.
    Identifier,
    /// Reserved key such as `$name`; the lexeme keeps the `$`.
    SystemIdentifier,
    /// Contents of a quoted string without the quotes.
    String,
    Float,
    /// Quoted preset name in the legacy header.
    Name,
    /// Quoted shader name in the legacy header.
    Shader,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Token<'a> {
    pub kind: TokenKind,
    pub text: &'a str,
    pub offset: usize,
}

impl<'a> Token<'a> {
    pub(crate) fn new(kind: TokenKind, text: &'a str, offset: usize) -> Self {
        Self { kind, text, offset }
    }
}

pub fn tokenize(text: &str) -> Result<Vec<Token<'_>>, SyntaxError> {
    Scanner::new(text).collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Start,
    Key,
    Value(TokenKind),
    Separator,
    Done,
}

#[derive(Debug, Clone)]
pub struct Scanner<'a> {
    cursor: Cursor<'a>,
    state: State,
    system_keys: bool,
}

impl<'a> Scanner<'a> {
    pub fn new(text: &'a str) -> Self {
        Self {
            cursor: Cursor::new(text),
            state: State::Start,
            system_keys: true,
        }
    }

    /// Continues scanning `key=number` pairs from `cursor`, rejecting `$` keys.
    pub(crate) fn parameters(cursor: Cursor<'a>) -> Self {
        Self {
            cursor,
            state: State::Start,
            system_keys: false,
        }
    }

    fn scan(&mut self) -> Result<Option<Token<'a>>, SyntaxError> {
        match self.state {
            State::Done => Ok(None),
            State::Start => {
                if self.cursor.is_at_end() {
                    self.state = State::Done;
                    return Ok(None);
                }
                self.scan_key().map(Some)
            }
            State::Key => {
                if self.cursor.is_at_end() {
                    return Err(self.cursor.error(SyntaxErrorKind::TrailingSeparator));
                }
                self.scan_key().map(Some)
            }
            State::Value(kind) => self.scan_value(kind).map(Some),
            State::Separator => match self.cursor.peek() {
                None => {
                    self.state = State::Done;
                    Ok(None)
                }
                Some(';') => {
                    self.cursor.bump();
                    self.state = State::Key;
                    self.scan()
                }
                Some(_) => Err(self.cursor.error(SyntaxErrorKind::ExpectedSeparator)),
            },
        }
    }

    fn scan_key(&mut self) -> Result<Token<'a>, SyntaxError> {
        let start = self.cursor.offset();
        let (kind, value) = match self.cursor.peek() {
            Some('$') if self.system_keys => {
                self.cursor.bump();
                if self.cursor.identifier().is_none() {
                    return Err(self.cursor.error(SyntaxErrorKind::MissingKey));
                }
                (TokenKind::SystemIdentifier, TokenKind::String)
            }
            Some('=') => return Err(self.cursor.error(SyntaxErrorKind::MissingKey)),
            Some(ch) => {
                if self.cursor.identifier().is_none() {
                    return Err(self
                        .cursor
                        .error(SyntaxErrorKind::UnexpectedCharacter(ch)));
                }
                (TokenKind::Identifier, TokenKind::Float)
            }
            None => return Err(self.cursor.error(SyntaxErrorKind::UnexpectedEnd)),
        };
        let end = self.cursor.offset();

        if !self.cursor.eat('=') {
            return Err(self.cursor.error(SyntaxErrorKind::ExpectedAssign));
        }
        self.state = State::Value(value);
        Ok(Token::new(kind, self.cursor.slice(start, end), start))
    }

    fn scan_value(&mut self, kind: TokenKind) -> Result<Token<'a>, SyntaxError> {
        let (offset, text) = match kind {
            TokenKind::String => self.cursor.quoted()?,
            _ => self.cursor.float()?,
        };
        self.state = State::Separator;
        Ok(Token::new(kind, text, offset))
    }
}

impl<'a> Iterator for Scanner<'a> {
    type Item = Result<Token<'a>, SyntaxError>;

    fn next(&mut self) -> Option<Self::Item> {
        match self.scan() {
            Ok(token) => token.map(Ok),
            Err(err) => {
                self.state = State::Done;
                Some(Err(err))
            }
        }
    }
}

impl std::iter::FusedIterator for Scanner<'_> {}

#[derive(Debug, Clone)]
pub(crate) struct Cursor<'a> {
    text: &'a str,
    pos: usize,
}

impl<'a> Cursor<'a> {
    pub(crate) fn new(text: &'a str) -> Self {
        Self { text, pos: 0 }
    }

    pub(crate) fn offset(&self) -> usize {
        self.pos
    }

    pub(crate) fn is_at_end(&self) -> bool {
        self.pos >= self.text.len()
    }

    pub(crate) fn peek(&self) -> Option<char> {
        self.text[self.pos..].chars().next()
    }

    pub(crate) fn bump(&mut self) -> Option<char> {
        let ch = self.peek()?;
        self.pos += ch.len_utf8();
        Some(ch)
    }

    pub(crate) fn eat(&mut self, expected: char) -> bool {
        if self.peek() == Some(expected) {
            self.pos += expected.len_utf8();
            true
        } else {
            false
        }
    }

    pub(crate) fn slice(&self, start: usize, end: usize) -> &'a str {
        &self.text[start..end]
    }

    pub(crate) fn error(&self, kind: SyntaxErrorKind) -> SyntaxError {
        SyntaxError::new(self.pos, kind)
    }

    /// Scans `[A-Za-z_][A-Za-z0-9_]*`.
    pub(crate) fn identifier(&mut self) -> Option<&'a str> {
        let start = self.pos;
        match self.peek() {
            Some(ch) if ch == '_' || ch.is_ascii_alphabetic() => {
                self.bump();
            }
            _ => return None,
        }
        while let Some(ch) = self.peek() {
            if ch == '_' || ch.is_ascii_alphanumeric() {
                self.bump();
            } else {
                break;
            }
        }
        Some(&self.text[start..self.pos])
    }

    /// Scans `"..."` and returns the offset and text between the quotes.
    pub(crate) fn quoted(&mut self) -> Result<(usize, &'a str), SyntaxError> {
        let open = self.pos;
        if !self.eat('"') {
            return Err(self.error(SyntaxErrorKind::ExpectedString));
        }
        let start = self.pos;
        match self.text[start..].find('"') {
            Some(len) => {
                self.pos = start + len + 1;
                Ok((start, &self.text[start..start + len]))
            }
            None => Err(SyntaxError::new(open, SyntaxErrorKind::UnterminatedString)),
        }
    }

    /// Scans `[+-]?digit+(.digit+)?`.
    pub(crate) fn float(&mut self) -> Result<(usize, &'a str), SyntaxError> {
        let start = self.pos;
        if !self.eat('+') {
            self.eat('-');
        }
        if self.digits() == 0 {
            return Err(SyntaxError::new(start, SyntaxErrorKind::ExpectedFloat));
        }
        if self.eat('.') && self.digits() == 0 {
            return Err(SyntaxError::new(start, SyntaxErrorKind::ExpectedFloat));
        }
        Ok((start, &self.text[start..self.pos]))
    }

    fn digits(&mut self) -> usize {
        let start = self.pos;
        while matches!(self.peek(), Some(ch) if ch.is_ascii_digit()) {
            self.pos += 1;
        }
        self.pos - start
    }
}
