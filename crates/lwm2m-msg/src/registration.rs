//! Registration-interface payloads: the CoRE link-format object catalogue
//! and the `/rd` query parameters.
//!
//! Reference: OMA-TS-LightweightM2M-V1_0, section 5.3 (Registration
//! Interface); RFC 6690 (CoRE Link Format).

use std::fmt::Write as _;

/// Protocol version advertised at registration.
pub const LWM2M_VERSION: &str = "1.0";

/// Parameters of a `POST /rd` registration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistrationParams {
    pub endpoint: String,
    /// Registration lifetime, seconds.
    pub lifetime: u32,
    /// Transport binding; this client is UDP-only.
    pub binding: &'static str,
}

impl RegistrationParams {
    pub fn new(endpoint: &str, lifetime: u32) -> RegistrationParams {
        RegistrationParams {
            endpoint: endpoint.to_owned(),
            lifetime,
            binding: "U",
        }
    }

    /// Renders the `/rd` query string.
    pub fn query(&self) -> String {
        format!(
            "ep={}&lt={}&lwm2m={}&b={}",
            self.endpoint, self.lifetime, LWM2M_VERSION, self.binding
        )
    }
}

/// Renders the supported-object catalogue as a link-format body.
///
/// `objects` pairs an object id with its existing instance ids; an object
/// with no instances is advertised bare (`</oid>`). The security object is
/// the caller's to exclude: it is never reported to the DM server.
pub fn catalogue_link_format(objects: &[(u16, Vec<u16>)]) -> String {
    let mut body = String::from("</>;rt=\"oma.lwm2m\"");
    for (oid, instances) in objects {
        if instances.is_empty() {
            let _ = write!(body, ",</{oid}>");
        } else {
            for iid in instances {
                let _ = write!(body, ",</{oid}/{iid}>");
            }
        }
    }
    body
}
