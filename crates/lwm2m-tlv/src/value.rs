//! Typed resource values and their binary/plain-text representations.

use crate::{numeric, Result, TlvError};

/// Declared type of an LwM2M resource.
///
/// Reference: OMA-TS-LightweightM2M-V1_0, Appendix C (resource definitions).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceType {
    Int,
    Bool,
    String,
    Opaque,
    Float,
    Time,
    /// Executable resources and vendor resources with no declared type.
    Unknown,
}

/// A decoded resource value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Int(i64),
    Bool(bool),
    String(String),
    Opaque(Vec<u8>),
    Float(f64),
    /// Seconds since the Unix epoch.
    Time(i64),
}

impl Value {
    /// The declared type this value answers to.
    pub fn resource_type(&self) -> ResourceType {
        match self {
            Value::Int(_) => ResourceType::Int,
            Value::Bool(_) => ResourceType::Bool,
            Value::String(_) => ResourceType::String,
            Value::Opaque(_) => ResourceType::Opaque,
            Value::Float(_) => ResourceType::Float,
            Value::Time(_) => ResourceType::Time,
        }
    }

    /// Encodes the value into its TLV payload bytes (no record header).
    pub fn encode(&self) -> Result<Vec<u8>> {
        Ok(match self {
            Value::Int(v) => numeric::encode_int(*v),
            Value::Bool(v) => numeric::encode_bool(*v),
            Value::String(s) => s.as_bytes().to_vec(),
            Value::Opaque(b) => b.clone(),
            Value::Float(v) => numeric::encode_float(*v),
            Value::Time(v) => numeric::encode_time(*v),
        })
    }

    /// Decodes payload bytes according to a declared resource type.
    ///
    /// `Unknown` decodes as opaque so vendor resources pass through.
    pub fn decode(rtype: ResourceType, data: &[u8]) -> Result<Value> {
        Ok(match rtype {
            ResourceType::Int => Value::Int(numeric::decode_int(data)?),
            ResourceType::Bool => Value::Bool(numeric::decode_bool(data)?),
            ResourceType::String => Value::String(std::str::from_utf8(data)?.to_owned()),
            ResourceType::Opaque | ResourceType::Unknown => Value::Opaque(data.to_vec()),
            ResourceType::Float => Value::Float(numeric::decode_float(data)?),
            ResourceType::Time => Value::Time(numeric::decode_time(data)?),
        })
    }

    /// Renders the value as a plain-text payload.
    ///
    /// Opaque values have no text form here; callers fall back to TLV.
    pub fn to_text(&self) -> Result<String> {
        Ok(match self {
            Value::Int(v) => v.to_string(),
            Value::Bool(v) => if *v { "1" } else { "0" }.to_owned(),
            Value::String(s) => s.clone(),
            Value::Float(v) => v.to_string(),
            Value::Time(v) => v.to_string(),
            Value::Opaque(_) => return Err(TlvError::TextUnsupported),
        })
    }

    /// Parses a plain-text payload into a value of the declared type.
    pub fn from_text(rtype: ResourceType, data: &[u8]) -> Result<Value> {
        let text = std::str::from_utf8(data)?;
        let malformed = || TlvError::MalformedText(text.to_owned());
        Ok(match rtype {
            ResourceType::Int => Value::Int(text.trim().parse().map_err(|_| malformed())?),
            ResourceType::Bool => match text.trim() {
                "0" => Value::Bool(false),
                "1" => Value::Bool(true),
                _ => return Err(malformed()),
            },
            ResourceType::String => Value::String(text.to_owned()),
            ResourceType::Float => Value::Float(text.trim().parse().map_err(|_| malformed())?),
            ResourceType::Time => Value::Time(text.trim().parse().map_err(|_| malformed())?),
            ResourceType::Opaque | ResourceType::Unknown => {
                return Err(TlvError::TextUnsupported)
            }
        })
    }

    /// Returns the integer payload, or `None` for other kinds.
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(v) | Value::Time(v) => Some(*v),
            _ => None,
        }
    }

    /// Returns the string payload, or `None` for other kinds.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// Returns the boolean payload, or `None` for other kinds.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(v) => Some(*v),
            _ => None,
        }
    }

    /// Returns the opaque payload, or `None` for other kinds.
    pub fn as_opaque(&self) -> Option<&[u8]> {
        match self {
            Value::Opaque(b) => Some(b),
            _ => None,
        }
    }
}
