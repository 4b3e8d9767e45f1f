use thiserror::Error;

use crate::scanner::TokenKind;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{kind} at byte {offset}")]
pub struct SyntaxError {
    pub offset: usize,
    pub kind: SyntaxErrorKind,
}

impl SyntaxError {
    pub fn new(offset: usize, kind: SyntaxErrorKind) -> Self {
        Self { offset, kind }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum SyntaxErrorKind {
    #[error("unterminated quoted string")]
    UnterminatedString,

    #[error("missing key before '='")]
    MissingKey,

    #[error("expected '=' after key")]
    ExpectedAssign,

    #[error("expected quoted string")]
    ExpectedString,

    #[error("expected numeric value")]
    ExpectedFloat,

    #[error("expected separator")]
    ExpectedSeparator,

    #[error("separator is not followed by a key")]
    TrailingSeparator,

    #[error("unexpected character {0:?}")]
    UnexpectedCharacter(char),

    #[error("unexpected {0:?} token")]
    UnexpectedToken(TokenKind),

    #[error("unexpected end of input")]
    UnexpectedEnd,

    #[error("invalid timestamp")]
    InvalidTimestamp,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReadError {
    #[error("malformed preset text: {0}")]
    Malformed(#[from] SyntaxError),

    #[error("preset signature does not match its contents")]
    InvalidSignature,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WriteError {
    #[error("preset {field} '{value}' contains characters that cannot be written")]
    InvalidCharacters { field: &'static str, value: String },

    #[error("preset has no creation timestamp to write")]
    MissingCreatedAt,

    #[error("parameter '{key}' has a non-finite value")]
    InvalidValue { key: String },
}
