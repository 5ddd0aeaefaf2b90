//! CoAP response codes used on the LwM2M device-management interface.

use crate::MsgError;

macro_rules! make_response_code {
    (
        $($name:ident = $value:literal: $description:literal, )+
    ) => {

/// CoAP response codes, stored as `class << 5 | detail`.
///
/// Only the dispatcher produces these; handlers deal in semantic statuses.
///
/// Reference: RFC 7252 section 12.1.2; OMA-TS-LightweightM2M-V1_0 table 24.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ResponseCode {
    $(
        #[doc = concat!($description, " (", stringify!($value), ")")]
        $name = $value,
    )+
}

impl ResponseCode {
    /// Whether the code is a 2.xx success.
    pub fn is_success(&self) -> bool {
        (*self as u8) >> 5 == 2
    }
}

impl std::fmt::Display for ResponseCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let description = match self {
            $(
                ResponseCode::$name => $description,
            )+
        };
        let raw = *self as u8;
        write!(f, "{}.{:02} {}", raw >> 5, raw & 0x1F, description)
    }
}

impl TryFrom<u8> for ResponseCode {
    type Error = MsgError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            $(
                $value => Ok(ResponseCode::$name),
            )+
            other => Err(MsgError::UnknownResponseCode(other)),
        }
    }
}
    };
}

make_response_code! {
    Created = 0x41: "Created",
    Deleted = 0x42: "Deleted",
    Changed = 0x44: "Changed",
    Content = 0x45: "Content",
    BadRequest = 0x80: "Bad Request",
    Unauthorized = 0x81: "Unauthorized",
    NotFound = 0x84: "Not Found",
    MethodNotAllowed = 0x85: "Method Not Allowed",
    NotAcceptable = 0x86: "Not Acceptable",
    InternalServerError = 0xA0: "Internal Server Error",
    NotImplemented = 0xA1: "Not Implemented",
    ServiceUnavailable = 0xA3: "Service Unavailable",
}
