//! LwM2M message-surface types: URIs, operations, CoAP response codes,
//! content formats, the registration catalogue and the typed request and
//! response values exchanged with the transport layer.
//!
//! The CoAP bit layout itself is the transport integration's concern; this
//! crate models everything above it.

#![forbid(unsafe_code)]

pub mod content;
pub mod error;
pub mod op;
pub mod registration;
pub mod request;
pub mod response_code;
pub mod uri;

pub use content::ContentFormat;
pub use error::MsgError;
pub use op::{OpFlags, Operation};
pub use registration::{catalogue_link_format, RegistrationParams, LWM2M_VERSION};
pub use request::{AttributeSet, Notification, ObserveAction, OutboundRequest, Request, Response};
pub use response_code::ResponseCode;
pub use uri::{Uri, ID_NONE};

/// Message crate result type.
pub type Result<T> = std::result::Result<T, MsgError>;
