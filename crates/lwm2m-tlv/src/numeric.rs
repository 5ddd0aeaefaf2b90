//! Minimum-width big-endian numeric codec.
//!
//! LwM2M integers are transported as 1, 2, 4 or 8 byte big-endian
//! two's-complement values, using the shortest width that round-trips.
//! An unsigned value that would flip the sign bit of its width is widened
//! instead, so `128` travels as `0x0080`, never as `0x80`.
//!
//! Reference: OMA-TS-LightweightM2M-V1_0, section 6.3.3 (Data Types).

use crate::{Result, TlvError};

/// Encodes a signed integer into the shortest of the four legal widths.
pub fn encode_int(value: i64) -> Vec<u8> {
    if let Ok(v) = i8::try_from(value) {
        v.to_be_bytes().to_vec()
    } else if let Ok(v) = i16::try_from(value) {
        v.to_be_bytes().to_vec()
    } else if let Ok(v) = i32::try_from(value) {
        v.to_be_bytes().to_vec()
    } else {
        value.to_be_bytes().to_vec()
    }
}

/// Encodes an unsigned integer, rejecting values that do not fit a signed
/// 64-bit interpretation (`>= 2^63`).
pub fn encode_uint(value: u64) -> Result<Vec<u8>> {
    let signed = i64::try_from(value).map_err(|_| TlvError::ValueOutOfRange)?;
    Ok(encode_int(signed))
}

/// Decodes a 1/2/4/8-byte big-endian field as a sign-extended integer.
pub fn decode_int(data: &[u8]) -> Result<i64> {
    match data.len() {
        1 => Ok(i8::from_be_bytes([data[0]]) as i64),
        2 => Ok(i16::from_be_bytes([data[0], data[1]]) as i64),
        4 => {
            let mut buf = [0u8; 4];
            buf.copy_from_slice(data);
            Ok(i32::from_be_bytes(buf) as i64)
        }
        8 => {
            let mut buf = [0u8; 8];
            buf.copy_from_slice(data);
            Ok(i64::from_be_bytes(buf))
        }
        n => Err(TlvError::InvalidLength(n)),
    }
}

/// Encodes a boolean as a single `0x00`/`0x01` byte.
pub fn encode_bool(value: bool) -> Vec<u8> {
    vec![u8::from(value)]
}

/// Decodes a single-byte boolean, rejecting anything but `0x00`/`0x01`.
pub fn decode_bool(data: &[u8]) -> Result<bool> {
    if data.len() != 1 {
        return Err(TlvError::InvalidLength(data.len()));
    }
    match data[0] {
        0 => Ok(false),
        1 => Ok(true),
        b => Err(TlvError::InvalidBoolean(b)),
    }
}

/// Encodes a float, preferring single precision when it is lossless.
pub fn encode_float(value: f64) -> Vec<u8> {
    let single = value as f32;
    if f64::from(single) == value {
        single.to_be_bytes().to_vec()
    } else {
        value.to_be_bytes().to_vec()
    }
}

/// Decodes a 4- or 8-byte big-endian IEEE-754 field.
pub fn decode_float(data: &[u8]) -> Result<f64> {
    match data.len() {
        4 => {
            let mut buf = [0u8; 4];
            buf.copy_from_slice(data);
            Ok(f64::from(f32::from_be_bytes(buf)))
        }
        8 => {
            let mut buf = [0u8; 8];
            buf.copy_from_slice(data);
            Ok(f64::from_be_bytes(buf))
        }
        n => Err(TlvError::InvalidLength(n)),
    }
}

/// Encodes a time value (seconds since epoch, signed) as an integer.
pub fn encode_time(value: i64) -> Vec<u8> {
    encode_int(value)
}

/// Decodes a time value.
pub fn decode_time(data: &[u8]) -> Result<i64> {
    decode_int(data)
}
