//! Plain-UDP transport.

use std::io::ErrorKind;
use std::net::{SocketAddr, UdpSocket};

use crate::{Lwm2mTransport, ServerEndpoint, TransportError};

/// UDP transport over a non-blocking `std` socket.
pub struct UdpTransport {
    socket: Option<UdpSocket>,
}

impl UdpTransport {
    pub fn new() -> UdpTransport {
        UdpTransport { socket: None }
    }

    fn socket(&self) -> Result<&UdpSocket, TransportError> {
        self.socket.as_ref().ok_or(TransportError::NotConnected)
    }
}

impl Default for UdpTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl Lwm2mTransport for UdpTransport {
    fn connect(&mut self, endpoint: &ServerEndpoint) -> Result<(), TransportError> {
        if endpoint.secure {
            return Err(TransportError::DtlsUnavailable);
        }
        let socket = UdpSocket::bind(("0.0.0.0", 0))?;
        socket.connect((endpoint.host.as_str(), endpoint.port))?;
        socket.set_nonblocking(true)?;
        log::debug!("udp transport connected to {endpoint}");
        self.socket = Some(socket);
        Ok(())
    }

    fn send(&mut self, data: &[u8]) -> Result<usize, TransportError> {
        let sent = self.socket()?.send(data)?;
        log::trace!("udp transport sent {sent} bytes");
        Ok(sent)
    }

    fn poll_recv(
        &mut self,
        buf: &mut [u8],
    ) -> Result<Option<(usize, SocketAddr)>, TransportError> {
        match self.socket()?.recv_from(buf) {
            Ok((len, src)) => Ok(Some((len, src))),
            Err(e) if e.kind() == ErrorKind::WouldBlock => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn close(&mut self) -> Result<(), TransportError> {
        if self.socket.take().is_some() {
            log::debug!("udp transport closed");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_loopback_round_trip() {
        let server = UdpSocket::bind(("127.0.0.1", 0)).unwrap();
        let server_addr = server.local_addr().unwrap();

        let mut transport = UdpTransport::new();
        transport
            .connect(&ServerEndpoint {
                host: server_addr.ip().to_string(),
                port: server_addr.port(),
                secure: false,
            })
            .unwrap();

        transport.send(b"ping").unwrap();
        let mut buf = [0u8; 16];
        let (len, client_addr) = server.recv_from(&mut buf).unwrap();
        assert_eq!(&buf[..len], b"ping");

        server.send_to(b"pong", client_addr).unwrap();
        // Non-blocking receive may need a beat for loopback delivery.
        let mut reply = [0u8; 16];
        let mut received = None;
        for _ in 0..100 {
            if let Some(got) = transport.poll_recv(&mut reply).unwrap() {
                received = Some(got);
                break;
            }
            std::thread::sleep(std::time::Duration::from_millis(5));
        }
        let (len, _) = received.expect("no reply received");
        assert_eq!(&reply[..len], b"pong");

        transport.close().unwrap();
        assert!(matches!(
            transport.send(b"x"),
            Err(TransportError::NotConnected)
        ));
    }

    #[test]
    fn test_secure_endpoint_needs_dtls() {
        let mut transport = UdpTransport::new();
        let err = transport
            .connect(&ServerEndpoint {
                host: "localhost".into(),
                port: 5684,
                secure: true,
            })
            .unwrap_err();
        assert!(matches!(err, TransportError::DtlsUnavailable));
    }
}
