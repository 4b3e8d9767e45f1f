mod error;
mod legacy;
mod reader;
mod record;
mod scanner;
pub mod signature;
mod writer;

pub use error::{ReadError, SyntaxError, SyntaxErrorKind, WriteError};
pub use legacy::{tokenize_legacy, LegacyScanner};
pub use reader::{read, TextFormat};
pub use record::{generate_id, PresetRecord, DEFAULT_PRESET_NAME};
pub use scanner::{tokenize, Scanner, Token, TokenKind};
pub use writer::{
    format_value, is_valid_identifier, is_valid_parameter_name, write, WriteOptions,
    INVALID_IDENTIFIER_CHARACTERS, MAX_FRACTION_DIGITS,
};
