#![forbid(unsafe_code)]

//! A device-side OMA LwM2M client core.
//!
//! The crate models the supported-object tree, dispatches decoded server
//! requests into typed resource handlers, drives the bootstrap /
//! registration / update session lifecycle, and runs the firmware,
//! software and file-transfer workflows with reboot-safe persisted
//! workspaces.
//!
//! The CoAP codec and the datagram socket live behind the
//! [`lwm2m_transport`] seam; persistent storage and device identity are
//! injected through the [`storage::ConfigStore`] and
//! [`device::DeviceInfo`] traits.

pub mod client;
pub mod credentials;
pub mod device;
pub mod dispatch;
pub mod error;
pub mod event;
pub mod objects;
pub mod registry;
pub mod session;
pub mod status;
pub mod storage;
pub mod transfer;
pub mod update;

pub use client::{ClientConfig, ClientContext, Lwm2mClient};
pub use credentials::{BootstrapStaging, CredentialKind, CredentialStatus, CredentialStore};
pub use device::{DeviceInfo, PackageVerifier};
pub use dispatch::DispatchOutcome;
pub use error::Error;
pub use event::{Event, EventBus, SessionType};
pub use session::{SessionAction, SessionManager, SessionState};
pub use status::{CoreStatus, HandlerResult};
pub use storage::{ConfigStore, MemoryStore};
pub use transfer::{FileTransferEngine, TransferDirection, TransferResult, TransferState};
pub use update::{FwResult, FwState, SwResult, SwState, UpdateConfig, UpdateEngine, UpdateKind};

pub use lwm2m_msg as msg;
pub use lwm2m_tlv as tlv;
pub use lwm2m_transport as transport;

/// LwM2M client result type.
pub type Result<T> = std::result::Result<T, crate::Error>;
