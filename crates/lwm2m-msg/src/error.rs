//! Message-surface errors.

use thiserror::Error;

/// Errors raised while interpreting LwM2M message metadata.
#[derive(Error, Debug)]
pub enum MsgError {
    /// A URI path did not follow `/oid[/oiid[/rid[/riid]]]`.
    #[error("invalid LwM2M path: {0:?}")]
    InvalidPath(String),

    /// A numeric content-format id is not one this client speaks.
    #[error("unknown content format: {0}")]
    UnknownContentFormat(u16),

    /// A CoAP response-code byte outside the mapped set.
    #[error("unknown response code: {0:#04x}")]
    UnknownResponseCode(u8),
}
