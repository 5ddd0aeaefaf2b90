//! Platform adapter traits: device identity/state getters and the
//! package signature check.
//!
//! Every method reports a semantic [`CoreStatus`] on failure; the default
//! bodies return [`CoreStatus::NotImplemented`], which read paths treat
//! as "omit this resource", never as a hard error.

use crate::status::{CoreStatus, HandlerResult};
use crate::update::UpdateKind;

/// Read-only device information and the few platform actions the device
/// object triggers.
pub trait DeviceInfo {
    fn manufacturer(&mut self) -> HandlerResult<String>;
    fn model_number(&mut self) -> HandlerResult<String>;
    fn serial_number(&mut self) -> HandlerResult<String>;
    fn firmware_version(&mut self) -> HandlerResult<String>;

    fn imei(&mut self) -> HandlerResult<String> {
        Err(CoreStatus::NotImplemented)
    }

    fn iccid(&mut self) -> HandlerResult<String> {
        Err(CoreStatus::NotImplemented)
    }

    fn subscription_id(&mut self) -> HandlerResult<String> {
        Err(CoreStatus::NotImplemented)
    }

    fn msisdn(&mut self) -> HandlerResult<String> {
        Err(CoreStatus::NotImplemented)
    }

    /// Battery level, percent.
    fn battery_level(&mut self) -> HandlerResult<u8> {
        Err(CoreStatus::NotImplemented)
    }

    /// Board temperature, degrees Celsius.
    fn temperature(&mut self) -> HandlerResult<f64> {
        Err(CoreStatus::NotImplemented)
    }

    fn unexpected_reset_count(&mut self) -> HandlerResult<u32> {
        Err(CoreStatus::NotImplemented)
    }

    fn total_reset_count(&mut self) -> HandlerResult<u32> {
        Err(CoreStatus::NotImplemented)
    }

    /// Seconds since the Unix epoch.
    fn current_time(&mut self) -> HandlerResult<i64> {
        Ok(time::OffsetDateTime::now_utc().unix_timestamp())
    }

    fn set_current_time(&mut self, _epoch_seconds: i64) -> HandlerResult<()> {
        Err(CoreStatus::NotImplemented)
    }

    /// UTC offset, `+HH:MM` form.
    fn utc_offset(&mut self) -> HandlerResult<String> {
        Err(CoreStatus::NotImplemented)
    }

    /// IANA timezone name.
    fn timezone(&mut self) -> HandlerResult<String> {
        Err(CoreStatus::NotImplemented)
    }

    /// Asks the platform to reboot once the response has gone out.
    fn request_reboot(&mut self) -> HandlerResult<()> {
        Err(CoreStatus::NotImplemented)
    }

    /// Asks the platform to factory-reset.
    fn request_factory_reset(&mut self) -> HandlerResult<()> {
        Err(CoreStatus::NotImplemented)
    }
}

/// Signature check over a completed package download.
pub trait PackageVerifier {
    /// Checks the finalized SHA-1 digest of the streamed package against
    /// the stored public key for the update kind. `public_key` is empty
    /// when no key is provisioned; the implementation decides whether
    /// that passes.
    fn verify_package(
        &mut self,
        kind: UpdateKind,
        digest: &[u8; 20],
        public_key: &[u8],
    ) -> HandlerResult<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    struct BareDevice;

    impl DeviceInfo for BareDevice {
        fn manufacturer(&mut self) -> HandlerResult<String> {
            Ok("ACME".into())
        }
        fn model_number(&mut self) -> HandlerResult<String> {
            Ok("AC-1".into())
        }
        fn serial_number(&mut self) -> HandlerResult<String> {
            Ok("0001".into())
        }
        fn firmware_version(&mut self) -> HandlerResult<String> {
            Ok("1.0.0".into())
        }
    }

    #[test]
    fn test_defaults_report_not_implemented() {
        let mut device = BareDevice;
        assert_eq!(device.imei(), Err(CoreStatus::NotImplemented));
        assert_eq!(device.temperature(), Err(CoreStatus::NotImplemented));
        assert_eq!(device.timezone(), Err(CoreStatus::NotImplemented));
        assert_eq!(device.request_reboot(), Err(CoreStatus::NotImplemented));
        assert!(device.current_time().unwrap() > 0);
    }
}
