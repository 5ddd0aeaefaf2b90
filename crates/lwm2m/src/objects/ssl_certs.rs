//! SSL-certificate object (10243).
//!
//! The read path serves the stored HTTPS certificate; the write path is
//! declared but not implemented, as certificate provisioning happens
//! out-of-band.

use lwm2m_msg::Uri;
use lwm2m_tlv::{ResourceType, Value};

use crate::client::ClientContext;
use crate::credentials::CredentialKind;
use crate::objects::SSL_CERT_OBJECT_ID;
use crate::registry::{InstanceLimit, ObjectDef, Registry, ResourceDef};
use crate::status::{CoreStatus, HandlerResult};

const RES_CERTIFICATE: u16 = 0;

pub(crate) fn object() -> ObjectDef {
    ObjectDef {
        id: SSL_CERT_OBJECT_ID,
        limit: InstanceLimit::Single,
        resources: vec![ResourceDef::read_write(
            RES_CERTIFICATE,
            ResourceType::Opaque,
            read_certificate,
            write_certificate,
        )],
    }
}

fn read_certificate(ctx: &mut ClientContext, _: &Registry, _: Uri) -> HandlerResult<Value> {
    match ctx.credentials.get(CredentialKind::HttpsCertificate, 0) {
        Ok(cert) => Ok(Value::Opaque(cert.to_vec())),
        Err(_) => Err(CoreStatus::NotImplemented),
    }
}

fn write_certificate(
    _: &mut ClientContext,
    _: &Registry,
    _: Uri,
    _: &Value,
) -> HandlerResult<()> {
    Err(CoreStatus::NotImplemented)
}
