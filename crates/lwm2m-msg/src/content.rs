//! Payload content formats negotiated on the LwM2M interfaces.

use crate::MsgError;

/// CoAP content-format ids this client produces and accepts.
///
/// Reference: OMA-TS-LightweightM2M-V1_0, section 6.4 (media types).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u16)]
pub enum ContentFormat {
    /// `text/plain` for single simple values.
    Text = 0,
    /// `application/link-format` for Discover and registration.
    LinkFormat = 40,
    /// `application/octet-stream` for opaque resources.
    Opaque = 42,
    /// `application/vnd.oma.lwm2m+tlv`.
    Tlv = 11542,
    /// `application/vnd.oma.lwm2m+json` (accepted, never produced).
    Json = 11543,
}

impl TryFrom<u16> for ContentFormat {
    type Error = MsgError;

    fn try_from(value: u16) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(ContentFormat::Text),
            40 => Ok(ContentFormat::LinkFormat),
            42 => Ok(ContentFormat::Opaque),
            11542 => Ok(ContentFormat::Tlv),
            11543 => Ok(ContentFormat::Json),
            other => Err(MsgError::UnknownContentFormat(other)),
        }
    }
}

impl std::fmt::Display for ContentFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ContentFormat::Text => "text/plain",
            ContentFormat::LinkFormat => "application/link-format",
            ContentFormat::Opaque => "application/octet-stream",
            ContentFormat::Tlv => "application/vnd.oma.lwm2m+tlv",
            ContentFormat::Json => "application/vnd.oma.lwm2m+json",
        };
        write!(f, "{} ({})", name, *self as u16)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trip_ids() {
        for format in [
            ContentFormat::Text,
            ContentFormat::LinkFormat,
            ContentFormat::Opaque,
            ContentFormat::Tlv,
            ContentFormat::Json,
        ] {
            assert_eq!(ContentFormat::try_from(format as u16).unwrap(), format);
        }
        assert!(matches!(
            ContentFormat::try_from(50),
            Err(MsgError::UnknownContentFormat(50))
        ));
    }

    #[test]
    fn test_display() {
        assert_eq!(
            ContentFormat::Tlv.to_string(),
            "application/vnd.oma.lwm2m+tlv (11542)"
        );
    }
}
