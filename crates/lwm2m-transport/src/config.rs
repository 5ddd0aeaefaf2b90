//! Transport configuration and server-endpoint parsing.

use url::Url;

use crate::TransportError;

const COAP_DEFAULT_PORT: u16 = 5683;
const COAPS_DEFAULT_PORT: u16 = 5684;

/// Selects the datagram transport under the CoAP layer.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum TransportConfig {
    /// Plain UDP (`coap://`).
    #[default]
    Udp,

    /// DTLS-PSK (`coaps://`); the stack itself is provided externally.
    #[cfg(feature = "dtls-psk")]
    DtlsPsk(DtlsPskConfig),
}

/// DTLS-PSK parameters handed to an external DTLS stack.
///
/// The PSK identity and key are not carried here; the stack pulls them
/// from the client's credential store at handshake time.
#[cfg(feature = "dtls-psk")]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DtlsPskConfig {
    /// Handshake timeout, seconds.
    pub handshake_timeout: Option<u16>,
}

/// A parsed `coap://` / `coaps://` server endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerEndpoint {
    pub host: String,
    pub port: u16,
    pub secure: bool,
}

impl ServerEndpoint {
    /// Parses a server address as stored in the credential store.
    pub fn parse(address: &str) -> Result<ServerEndpoint, TransportError> {
        let url = Url::parse(address)
            .map_err(|_| TransportError::InvalidEndpoint(address.to_owned()))?;
        let secure = match url.scheme() {
            "coap" => false,
            "coaps" => true,
            other => return Err(TransportError::UnsupportedScheme(other.to_owned())),
        };
        let host = url
            .host_str()
            .ok_or_else(|| TransportError::InvalidEndpoint(address.to_owned()))?
            .to_owned();
        let port = url.port().unwrap_or(if secure {
            COAPS_DEFAULT_PORT
        } else {
            COAP_DEFAULT_PORT
        });
        Ok(ServerEndpoint { host, port, secure })
    }
}

impl std::fmt::Display for ServerEndpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let scheme = if self.secure { "coaps" } else { "coap" };
        write!(f, "{}://{}:{}", scheme, self.host, self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_endpoints() {
        let ep = ServerEndpoint::parse("coap://leshan.example").unwrap();
        assert_eq!(ep.host, "leshan.example");
        assert_eq!(ep.port, 5683);
        assert!(!ep.secure);

        let ep = ServerEndpoint::parse("coaps://dm.example:5784").unwrap();
        assert_eq!(ep.port, 5784);
        assert!(ep.secure);
        assert_eq!(ep.to_string(), "coaps://dm.example:5784");
    }

    #[test]
    fn test_parse_rejections() {
        assert!(matches!(
            ServerEndpoint::parse("http://dm.example"),
            Err(TransportError::UnsupportedScheme(_))
        ));
        assert!(matches!(
            ServerEndpoint::parse("not a url"),
            Err(TransportError::InvalidEndpoint(_))
        ));
    }
}
