//! Transport trait surface consumed by the client core.

use std::net::SocketAddr;

use crate::{ServerEndpoint, TransportError};

/// A connected datagram transport.
///
/// Implementations are single-peer: one `connect`ed remote at a time,
/// matching the one-session-at-a-time client core.
pub trait Lwm2mTransport {
    /// Opens the local socket and connects it to the server endpoint.
    fn connect(&mut self, endpoint: &ServerEndpoint) -> Result<(), TransportError>;

    /// Sends one datagram to the connected peer.
    fn send(&mut self, data: &[u8]) -> Result<usize, TransportError>;

    /// Non-blocking receive; `None` when nothing is pending.
    fn poll_recv(
        &mut self,
        buf: &mut [u8],
    ) -> Result<Option<(usize, SocketAddr)>, TransportError>;

    /// Closes the socket. Further sends fail with `NotConnected`.
    fn close(&mut self) -> Result<(), TransportError>;
}
