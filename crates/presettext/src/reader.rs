//! Turns stored preset text back into a `PresetRecord`. Both text formats the
//! store has ever written are accepted so old values keep loading after the
//! canonical format changed, while the writer only produces the canonical one.
//!
//! Types:
//!
//! - `TextFormat` names the two grammars and picks one from the first
//!   character of the text.
//!
//! Functions:
//!
//! - `read` verifies an optional `@xxx` signature suffix, tokenizes the body
//!   with the scanner for its format, and assembles the record. Any failure
//!   aborts the whole read; no partially filled record is returned.
//! - Internal helpers `parse_tokens`, `expect_value`, and `parse_timestamp`
//!   implement the grammar rules that sit above the scanners.
use std::collections::BTreeMap;

use tracing::debug;

use crate::error::{ReadError, SyntaxError, SyntaxErrorKind};
use crate::legacy::tokenize_legacy;
use crate::record::{generate_id, PresetRecord, DEFAULT_PRESET_NAME};
use crate::scanner::{tokenize, Token, TokenKind};
use crate::signature;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextFormat {
    /// `$name="..";$shader="..";key=value`
    Canonical,
    /// `"name","shader":key=value`
    LegacyHeader,
}

impl TextFormat {
    pub fn detect(text: &str) -> Self {
        if text.starts_with('"') {
            Self::LegacyHeader
        } else {
            Self::Canonical
        }
    }
}

/// Reads preset text, using `id` when the caller already knows the identity
/// of the record (for example from its storage key) and generating one
/// otherwise.
pub fn read(text: &str, id: Option<&str>) -> Result<PresetRecord, ReadError> {
    let body = match signature::split(text) {
        Some((body, declared)) => {
            if !signature::matches(body, declared) {
                return Err(ReadError::InvalidSignature);
            }
            body
        }
        None => text,
    };

    let tokens = match TextFormat::detect(body) {
        TextFormat::Canonical => tokenize(body)?,
        TextFormat::LegacyHeader => tokenize_legacy(body)?,
    };

    let mut record = parse_tokens(tokens)?;
    record.id = id.map_or_else(generate_id, str::to_string);
    Ok(record)
}

fn parse_tokens(tokens: Vec<Token<'_>>) -> Result<PresetRecord, SyntaxError> {
    let mut name = None;
    let mut shader = None;
    let mut created_at = None;
    let mut parameters = BTreeMap::new();
    let mut in_parameters = false;

    let mut iter = tokens.into_iter();
    while let Some(token) = iter.next() {
        match token.kind {
            TokenKind::SystemIdentifier if !in_parameters => {
                let value = expect_value(&mut iter, TokenKind::String, &token)?;
                match &token.text[1..] {
                    "name" => name = Some(value.text.to_string()),
                    "shader" => shader = Some(value.text.to_string()),
                    "createdAt" => created_at = Some(parse_timestamp(&value)?),
                    other => debug!(key = other, "ignoring unknown reserved preset key"),
                }
            }
            TokenKind::Name if name.is_none() && shader.is_none() && !in_parameters => {
                name = Some(token.text.to_string());
            }
            TokenKind::Shader if shader.is_none() && !in_parameters => {
                shader = Some(token.text.to_string());
            }
            TokenKind::Identifier => {
                in_parameters = true;
                let value = expect_value(&mut iter, TokenKind::Float, &token)?;
                let number: f64 = value.text.parse().map_err(|_| {
                    SyntaxError::new(value.offset, SyntaxErrorKind::ExpectedFloat)
                })?;
                parameters.insert(token.text.to_string(), number);
            }
            kind => {
                return Err(SyntaxError::new(
                    token.offset,
                    SyntaxErrorKind::UnexpectedToken(kind),
                ))
            }
        }
    }

    Ok(PresetRecord {
        id: String::new(),
        name: name.unwrap_or_else(|| DEFAULT_PRESET_NAME.to_string()),
        shader: shader.unwrap_or_default(),
        parameters,
        created_at,
    })
}

fn expect_value<'a>(
    iter: &mut impl Iterator<Item = Token<'a>>,
    kind: TokenKind,
    key: &Token<'a>,
) -> Result<Token<'a>, SyntaxError> {
    match iter.next() {
        Some(token) if token.kind == kind => Ok(token),
        Some(token) => Err(SyntaxError::new(
            token.offset,
            SyntaxErrorKind::UnexpectedToken(token.kind),
        )),
        None => Err(SyntaxError::new(
            key.offset + key.text.len(),
            SyntaxErrorKind::UnexpectedEnd,
        )),
    }
}

/// Accepts whole or fractional unix seconds; fractions are dropped.
fn parse_timestamp(token: &Token<'_>) -> Result<u64, SyntaxError> {
    let invalid = || SyntaxError::new(token.offset, SyntaxErrorKind::InvalidTimestamp);
    let (whole, fraction) = token.text.split_once('.').unwrap_or((token.text, "0"));
    let all_digits = |part: &str| !part.is_empty() && part.bytes().all(|b| b.is_ascii_digit());
    if !all_digits(whole) || !all_digits(fraction) {
        return Err(invalid());
    }
    whole.parse().map_err(|_| invalid())
}
