//! Client error type.

use thiserror::Error;

use crate::credentials::CredentialKind;
use crate::status::CoreStatus;

/// Errors surfaced by the client's public API.
#[derive(Error, Debug)]
pub enum Error {
    /// A credential lookup found nothing.
    #[error("credential {0:?} (server {1}) is not provisioned")]
    NotProvisioned(CredentialKind, u16),

    /// A credential write exceeded the size bound of its kind.
    #[error("credential {kind:?} is {len} bytes, bound is {max}")]
    CredentialOverflow {
        kind: CredentialKind,
        len: usize,
        max: usize,
    },

    /// Bootstrap commit attempted before all DM slots were staged.
    #[error("bootstrap staging incomplete: device-management credentials missing")]
    IncompleteBootstrap,

    /// No credentials at all; the session cannot start.
    #[error("no bootstrap or device-management credentials available")]
    NoCredentials,

    /// Object id not registered.
    #[error("object {0} not found")]
    ObjectNotFound(u16),

    /// Object id registered twice.
    #[error("object {0} already registered")]
    DuplicateObject(u16),

    /// Instance lookup failed.
    #[error("instance /{0}/{1} not found")]
    InstanceNotFound(u16, u16),

    /// Instance creation collided with an existing id.
    #[error("instance /{0}/{1} already exists")]
    InstanceExists(u16, u16),

    /// Instance id is outside the object's declared bound.
    #[error("instance id {1} out of bounds for object {0}")]
    InstanceOutOfBounds(u16, u16),

    /// An operation arrived in a state that cannot service it.
    #[error("invalid state: {0}")]
    InvalidState(String),

    /// A persisted blob could not be re-serialized or stored.
    #[error("storage backend error: {0}")]
    Storage(String),

    /// Payload-level failure.
    #[error(transparent)]
    Tlv(#[from] lwm2m_tlv::TlvError),

    /// Message-surface failure.
    #[error(transparent)]
    Msg(#[from] lwm2m_msg::MsgError),

    /// Transport-level failure.
    #[error(transparent)]
    Transport(#[from] lwm2m_transport::TransportError),
}

impl Error {
    /// Collapses the error into the semantic status a handler reports.
    pub fn status(&self) -> CoreStatus {
        match self {
            Error::NotProvisioned(..) | Error::NoCredentials => CoreStatus::General,
            Error::CredentialOverflow { .. } => CoreStatus::Overflow,
            Error::IncompleteBootstrap => CoreStatus::InvalidState,
            Error::InvalidState(_) => CoreStatus::InvalidState,
            Error::ObjectNotFound(_)
            | Error::InstanceNotFound(..)
            | Error::InstanceExists(..)
            | Error::InstanceOutOfBounds(..) => CoreStatus::InvalidArg,
            Error::DuplicateObject(_) => CoreStatus::InvalidArg,
            Error::Tlv(_) | Error::Msg(_) => CoreStatus::InvalidArg,
            Error::Storage(_) | Error::Transport(_) => CoreStatus::General,
        }
    }
}
