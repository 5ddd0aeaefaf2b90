//! TLV codec errors.

use thiserror::Error;

/// Errors produced while encoding or decoding LwM2M payloads.
#[derive(Error, Debug)]
pub enum TlvError {
    /// A numeric field had a length other than 1/2/4/8 bytes.
    #[error("invalid numeric field length: {0} bytes")]
    InvalidLength(usize),

    /// An unsigned value cannot be represented as an LwM2M integer.
    #[error("value out of encodable range")]
    ValueOutOfRange,

    /// A boolean byte was neither 0x00 nor 0x01.
    #[error("invalid boolean byte: {0:#04x}")]
    InvalidBoolean(u8),

    /// A string value was not valid UTF-8.
    #[error("string value is not valid UTF-8")]
    InvalidUtf8(#[from] std::str::Utf8Error),

    /// A plain-text payload could not be parsed into the declared type.
    #[error("malformed plain-text value: {0}")]
    MalformedText(String),

    /// The declared resource type cannot be carried in a plain-text payload.
    #[error("resource type has no plain-text representation")]
    TextUnsupported,

    /// A TLV value exceeds the 24-bit length field.
    #[error("TLV value too long: {0} bytes")]
    ValueTooLong(usize),

    /// TLV structure error (truncated record, bad nesting).
    #[error("malformed TLV: {0}")]
    MalformedTlv(String),

    /// Underlying binrw failure.
    #[error("binary codec error: {0}")]
    Codec(#[from] binrw::Error),
}
