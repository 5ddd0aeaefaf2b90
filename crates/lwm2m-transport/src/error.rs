//! Transport errors.

use thiserror::Error;

/// Errors raised by the datagram transport layer.
#[derive(Error, Debug)]
pub enum TransportError {
    /// Server endpoint string could not be parsed.
    #[error("invalid server endpoint {0:?}")]
    InvalidEndpoint(String),

    /// Endpoint scheme is not `coap` or `coaps`.
    #[error("unsupported endpoint scheme {0:?}")]
    UnsupportedScheme(String),

    /// Secure endpoint requested without a DTLS stack compiled in.
    #[error("DTLS-PSK transport requested but no DTLS stack is available")]
    DtlsUnavailable,

    /// Socket not connected yet.
    #[error("transport is not connected")]
    NotConnected,

    /// Underlying socket failure.
    #[error("socket error: {0}")]
    Io(#[from] std::io::Error),
}
