//! Device adapter for the example client.

use lwm2m::device::{DeviceInfo, PackageVerifier};
use lwm2m::status::HandlerResult;
use lwm2m::update::UpdateKind;

pub struct LinuxDevice {
    pub imei: Option<String>,
}

impl DeviceInfo for LinuxDevice {
    fn manufacturer(&mut self) -> HandlerResult<String> {
        Ok("lwm2m-rs".into())
    }

    fn model_number(&mut self) -> HandlerResult<String> {
        Ok("example-client".into())
    }

    fn serial_number(&mut self) -> HandlerResult<String> {
        Ok(std::fs::read_to_string("/etc/machine-id")
            .map(|id| id.trim().to_owned())
            .unwrap_or_else(|_| "unknown".into()))
    }

    fn firmware_version(&mut self) -> HandlerResult<String> {
        Ok(env!("CARGO_PKG_VERSION").into())
    }

    fn imei(&mut self) -> HandlerResult<String> {
        match &self.imei {
            Some(imei) => Ok(imei.clone()),
            None => Err(lwm2m::CoreStatus::NotImplemented),
        }
    }
}

/// Accepts every package; a production target hooks its signature
/// scheme in here.
pub struct TrustingVerifier;

impl PackageVerifier for TrustingVerifier {
    fn verify_package(&mut self, kind: UpdateKind, digest: &[u8; 20], _: &[u8]) -> HandlerResult<()> {
        log::info!(
            "accepting {kind:?} package, sha1 {}",
            digest.iter().map(|b| format!("{b:02x}")).collect::<String>()
        );
        Ok(())
    }
}
