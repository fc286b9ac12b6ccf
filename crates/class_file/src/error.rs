use thiserror::Error;

use crate::mutf8::MalformedText;

#[derive(Error, Debug)]
pub enum ClassFileError {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error("Unexpected end of input at byte {offset}, needed {needed} more bytes")]
    TruncatedInput { offset: u64, needed: usize },
    #[error("Invalid magic identifier: 0x{0:X}")]
    InvalidMagic(u32),
    #[error("Unknown constant pool tag: {0}")]
    UnknownConstantTag(u8),
    #[error(transparent)]
    MalformedText(#[from] MalformedText),
    #[error("Attribute name at constant pool index {0} is not a Utf8 entry")]
    AttributeNameNotUtf8(u16),
    #[error("Attribute {name} does not match its declared length of {declared} bytes")]
    AttributeLengthMismatch { name: String, declared: u32 },
    #[error("Attribute {name} is nested more than {limit} levels deep")]
    AttributeNestingTooDeep { name: String, limit: usize },
    #[error("Expected {expected} at constant pool index {index}, found {found}")]
    MalformedReference {
        index: u16,
        expected: &'static str,
        found: &'static str,
    },
}
