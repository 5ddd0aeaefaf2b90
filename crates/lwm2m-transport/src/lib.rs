#![forbid(unsafe_code)]

//! Datagram transport facade for the LwM2M client.
//!
//! The client core never touches sockets; it consumes this trait surface.
//! Plain UDP ships here. DTLS-PSK is a configuration seam: the
//! `dtls-psk` feature reserves the config shape for an external stack,
//! which sources its keys from the client's credential store.

pub mod config;
pub mod error;
pub mod traits;
pub mod udp;

pub use config::*;
pub use error::TransportError;
pub use traits::*;
pub use udp::UdpTransport;

/// Creates a [`Lwm2mTransport`] out of a [`TransportConfig`].
///
/// ## Arguments
/// * `config` - The transport configuration to make the transport by.
pub fn make_transport(
    config: &TransportConfig,
) -> Result<Box<dyn Lwm2mTransport>, TransportError> {
    match config {
        TransportConfig::Udp => Ok(Box::new(UdpTransport::new())),

        #[cfg(feature = "dtls-psk")]
        TransportConfig::DtlsPsk(_) => Err(TransportError::DtlsUnavailable),
    }
}
