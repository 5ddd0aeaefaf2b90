//! Standard-object descriptor tables.
//!
//! Each submodule builds one object's descriptor with its resource set
//! and hooks the typed handlers into the client components.

mod device;
mod file_transfer;
mod firmware;
mod security;
mod server;
mod software;
mod ssl_certs;

use crate::registry::Registry;
use crate::Result;

pub const SECURITY_OBJECT_ID: u16 = 0;
pub const SERVER_OBJECT_ID: u16 = 1;
pub const DEVICE_OBJECT_ID: u16 = 3;
pub const FIRMWARE_OBJECT_ID: u16 = 5;
pub const SOFTWARE_OBJECT_ID: u16 = 9;
pub const SSL_CERT_OBJECT_ID: u16 = 10243;
pub const FILE_TRANSFER_OBJECT_ID: u16 = 33406;

/// Registers every supported object and the instances that exist from
/// process start. File-transfer instances are server-created.
pub fn register_all(registry: &mut Registry) -> Result<()> {
    registry.register_object(security::object())?;
    registry.register_object(server::object())?;
    registry.register_object(device::object())?;
    registry.register_object(firmware::object())?;
    registry.register_object(software::object())?;
    registry.register_object(ssl_certs::object())?;
    registry.register_object(file_transfer::object())?;

    // Security instance 0 is the DM server slot, 1 the bootstrap slot.
    registry.create_instance(SECURITY_OBJECT_ID, 0)?;
    registry.create_instance(SECURITY_OBJECT_ID, 1)?;
    registry.create_instance(SERVER_OBJECT_ID, 0)?;
    registry.create_instance(DEVICE_OBJECT_ID, 0)?;
    registry.create_instance(FIRMWARE_OBJECT_ID, 0)?;
    registry.create_instance(SOFTWARE_OBJECT_ID, 0)?;
    registry.create_instance(SSL_CERT_OBJECT_ID, 0)?;
    Ok(())
}
