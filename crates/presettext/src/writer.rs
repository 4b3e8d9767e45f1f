//! Renders `PresetRecord`s into canonical `$key=` text. Output is
//! deterministic: parameters are written in key order and numbers use a fixed
//! format, so unchanged records always produce identical text and signatures.
use std::fmt::Write as _;
use std::ops::{BitOr, BitOrAssign};

use crate::error::WriteError;
use crate::record::PresetRecord;
use crate::signature;

/// Characters that may not appear in a written name or shader.
pub const INVALID_IDENTIFIER_CHARACTERS: &str = r#"'":@#|[]{}$%^&*()/\;<>!?`.,"#;

/// Maximum number of fractional digits written for parameter values.
pub const MAX_FRACTION_DIGITS: usize = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct WriteOptions(u8);

impl WriteOptions {
    pub const NONE: Self = Self(0);
    pub const NAME: Self = Self(1 << 0);
    pub const SHADER: Self = Self(1 << 1);
    pub const CREATED_AT: Self = Self(1 << 2);
    pub const SIGN: Self = Self(1 << 3);
    pub const ALL: Self = Self(Self::NAME.0 | Self::SHADER.0);

    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    pub const fn union(self, other: Self) -> Self {
        Self(self.0 | other.0)
    }

    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }
}

impl Default for WriteOptions {
    fn default() -> Self {
        Self::SHADER
    }
}

impl BitOr for WriteOptions {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        self.union(rhs)
    }
}

impl BitOrAssign for WriteOptions {
    fn bitor_assign(&mut self, rhs: Self) {
        *self = self.union(rhs);
    }
}

pub fn is_valid_identifier(value: &str) -> bool {
    !value
        .chars()
        .any(|ch| INVALID_IDENTIFIER_CHARACTERS.contains(ch))
}

/// Parameter names must scan as identifiers: `[A-Za-z_][A-Za-z0-9_]*`.
pub fn is_valid_parameter_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(ch) if ch == '_' || ch.is_ascii_alphabetic() => {}
        _ => return false,
    }
    chars.all(|ch| ch == '_' || ch.is_ascii_alphanumeric())
}

/// Formats a value with at most four fractional digits and no trailing zeros.
pub fn format_value(value: f64) -> String {
    let mut text = format!("{value:.prec$}", prec = MAX_FRACTION_DIGITS);
    if text.contains('.') {
        let trimmed = text.trim_end_matches('0').trim_end_matches('.').len();
        text.truncate(trimmed);
    }
    if text == "-0" {
        text.remove(0);
    }
    text
}

pub fn write(record: &PresetRecord, options: WriteOptions) -> Result<String, WriteError> {
    let mut out = String::new();

    if options.contains(WriteOptions::NAME) {
        check_identifier("name", &record.name)?;
        push_field(&mut out, format_args!("$name=\"{}\"", record.name));
    }

    if options.contains(WriteOptions::SHADER) {
        check_identifier("shader", &record.shader)?;
        push_field(&mut out, format_args!("$shader=\"{}\"", record.shader));
    }

    if options.contains(WriteOptions::CREATED_AT) {
        let created_at = record.created_at.ok_or(WriteError::MissingCreatedAt)?;
        push_field(&mut out, format_args!("$createdAt=\"{created_at}\""));
    }

    for (key, value) in &record.parameters {
        if !is_valid_parameter_name(key) {
            return Err(WriteError::InvalidCharacters {
                field: "parameter",
                value: key.clone(),
            });
        }
        if !value.is_finite() {
            return Err(WriteError::InvalidValue { key: key.clone() });
        }
        push_field(&mut out, format_args!("{key}={}", format_value(*value)));
    }

    if options.contains(WriteOptions::SIGN) {
        out = signature::append(&out);
    }

    Ok(out)
}

fn check_identifier(field: &'static str, value: &str) -> Result<(), WriteError> {
    if is_valid_identifier(value) {
        Ok(())
    } else {
        Err(WriteError::InvalidCharacters {
            field,
            value: value.to_string(),
        })
    }
}

fn push_field(out: &mut String, field: std::fmt::Arguments<'_>) {
    if !out.is_empty() {
        out.push(';');
    }
    // Writing into a String cannot fail.
    let _ = out.write_fmt(field);
}
