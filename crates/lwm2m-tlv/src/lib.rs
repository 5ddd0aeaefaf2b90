//! LwM2M payload encoding: minimum-width numeric primitives, typed resource
//! values, the TLV record format, and the plain-text format.
//!
//! Reference: OMA-TS-LightweightM2M-V1_0, section 6.3 (Data Formats).

#![forbid(unsafe_code)]

pub mod error;
pub mod numeric;
pub mod record;
pub mod value;

pub use error::TlvError;
pub use record::{RecordKind, TlvRecord};
pub use value::{ResourceType, Value};

/// TLV crate result type.
pub type Result<T> = std::result::Result<T, TlvError>;
