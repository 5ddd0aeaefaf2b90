//! Typed request/response values crossing the transport seam.

use crate::{ContentFormat, Operation, ResponseCode, Uri};

/// Observe option accompanying a Read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObserveAction {
    /// Observe option 0: register an observation.
    Register,
    /// Observe option 1: cancel an observation.
    Deregister,
}

/// Notification attributes carried by a Write-Attributes request.
///
/// `None` fields were absent from the request; `cancel` clears an
/// observation relation.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct AttributeSet {
    pub pmin: Option<u32>,
    pub pmax: Option<u32>,
    pub gt: Option<f64>,
    pub lt: Option<f64>,
    pub st: Option<f64>,
    pub cancel: bool,
}

/// A decoded server request, as delivered by the CoAP integration.
#[derive(Debug, Clone, PartialEq)]
pub struct Request {
    pub op: Operation,
    pub uri: Uri,
    /// Content format of `payload`, when one was indicated.
    pub content_format: Option<ContentFormat>,
    /// Accept option of the request, when one was indicated.
    pub accept: Option<ContentFormat>,
    pub observe: Option<ObserveAction>,
    /// Write-Attributes query parameters, when the op carries them.
    pub attributes: Option<AttributeSet>,
    /// CoAP token, echoed into notifications for observed resources.
    pub token: u64,
    pub payload: Vec<u8>,
}

impl Request {
    /// A bare request with no payload or options.
    pub fn new(op: Operation, uri: Uri) -> Request {
        Request {
            op,
            uri,
            content_format: None,
            accept: None,
            observe: None,
            attributes: None,
            token: 0,
            payload: Vec::new(),
        }
    }

    pub fn with_payload(mut self, format: ContentFormat, payload: Vec<u8>) -> Request {
        self.content_format = Some(format);
        self.payload = payload;
        self
    }

    pub fn with_observe(mut self, action: ObserveAction, token: u64) -> Request {
        self.observe = Some(action);
        self.token = token;
        self
    }

    pub fn with_attributes(mut self, attributes: AttributeSet) -> Request {
        self.attributes = Some(attributes);
        self
    }
}

/// The response handed back to the CoAP integration.
#[derive(Debug, Clone, PartialEq)]
pub struct Response {
    pub code: ResponseCode,
    pub content_format: Option<ContentFormat>,
    pub payload: Vec<u8>,
}

impl Response {
    /// A response with no payload.
    pub fn code_only(code: ResponseCode) -> Response {
        Response {
            code,
            content_format: None,
            payload: Vec::new(),
        }
    }

    pub fn with_payload(code: ResponseCode, format: ContentFormat, payload: Vec<u8>) -> Response {
        Response {
            code,
            content_format: Some(format),
            payload,
        }
    }
}

/// An observation notification produced by the client.
#[derive(Debug, Clone, PartialEq)]
pub struct Notification {
    /// Token of the observation relation.
    pub token: u64,
    /// Monotonic per-relation sequence, preserving observation order.
    pub sequence: u32,
    pub content_format: ContentFormat,
    pub payload: Vec<u8>,
}

/// Client-originated traffic for the transport integration to send.
///
/// Each variant carries everything the CoAP layer needs; the session
/// manager stays codec-agnostic.
#[derive(Debug, Clone, PartialEq)]
pub enum OutboundRequest {
    /// `POST /bs?ep=<endpoint>` to the bootstrap server.
    BootstrapRequest { token: u64, endpoint: String },
    /// `POST /rd?<query>` with the link-format catalogue body.
    Register {
        token: u64,
        query: String,
        catalogue: String,
    },
    /// `POST <location>` refreshing the registration.
    RegistrationUpdate {
        token: u64,
        location: String,
        /// Refreshed lifetime, when it changed since registration.
        lifetime: Option<u32>,
    },
    /// `DELETE <location>`.
    Deregister { token: u64, location: String },
}

impl OutboundRequest {
    /// Token correlating the eventual reply.
    pub fn token(&self) -> u64 {
        match self {
            OutboundRequest::BootstrapRequest { token, .. }
            | OutboundRequest::Register { token, .. }
            | OutboundRequest::RegistrationUpdate { token, .. }
            | OutboundRequest::Deregister { token, .. } => *token,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_builders() {
        let req = Request::new(Operation::Write, Uri::resource(1, 0, 1))
            .with_payload(ContentFormat::Text, b"3600".to_vec());
        assert_eq!(req.content_format, Some(ContentFormat::Text));
        assert_eq!(req.payload, b"3600");

        let req = Request::new(Operation::Read, Uri::resource(3, 0, 13))
            .with_observe(ObserveAction::Register, 0xDEAD);
        assert_eq!(req.observe, Some(ObserveAction::Register));
        assert_eq!(req.token, 0xDEAD);
    }

    #[test]
    fn test_outbound_token() {
        let out = OutboundRequest::Deregister {
            token: 7,
            location: "/rd/abc".into(),
        };
        assert_eq!(out.token(), 7);
    }
}
