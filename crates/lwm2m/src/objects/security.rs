//! LwM2M security object (0).
//!
//! Only a bootstrap session context may touch this object: writes stage
//! credentials for the end-of-bootstrap commit, and reads serve staged
//! values back to the bootstrap server. A device-management session is
//! answered as if the object did not exist.

use lwm2m_msg::Uri;
use lwm2m_tlv::{ResourceType, Value};

use crate::client::ClientContext;
use crate::objects::SECURITY_OBJECT_ID;
use crate::registry::{InstanceLimit, ObjectDef, Registry, ResourceDef};
use crate::status::{CoreStatus, HandlerResult};

const RES_SERVER_URI: u16 = 0;
const RES_IS_BOOTSTRAP: u16 = 1;
const RES_SECURITY_MODE: u16 = 2;
const RES_PSK_IDENTITY: u16 = 3;
const RES_SERVER_PUBLIC_KEY: u16 = 4;
const RES_PSK_SECRET: u16 = 5;
const RES_SHORT_SERVER_ID: u16 = 10;

/// DTLS-PSK, the one security mode this client implements.
const SECURITY_MODE_PSK: i64 = 0;

pub(crate) fn object() -> ObjectDef {
    ObjectDef {
        id: SECURITY_OBJECT_ID,
        limit: InstanceLimit::Bounded(4),
        resources: vec![
            ResourceDef::read_write(
                RES_SERVER_URI,
                ResourceType::String,
                read_server_uri,
                write_server_uri,
            ),
            ResourceDef::read_write(
                RES_IS_BOOTSTRAP,
                ResourceType::Bool,
                read_is_bootstrap,
                write_is_bootstrap,
            ),
            ResourceDef::read_write(
                RES_SECURITY_MODE,
                ResourceType::Int,
                read_security_mode,
                write_security_mode,
            ),
            ResourceDef::read_write(
                RES_PSK_IDENTITY,
                ResourceType::Opaque,
                read_psk_identity,
                write_psk_identity,
            ),
            ResourceDef::write_only(
                RES_SERVER_PUBLIC_KEY,
                ResourceType::Opaque,
                write_server_public_key,
            ),
            ResourceDef::write_only(RES_PSK_SECRET, ResourceType::Opaque, write_psk_secret),
            ResourceDef::read_write(
                RES_SHORT_SERVER_ID,
                ResourceType::Int,
                read_short_server_id,
                write_short_server_id,
            ),
        ],
    }
}

/// Everything here is bootstrap-session-only.
fn bootstrap_only(ctx: &ClientContext) -> HandlerResult<()> {
    if ctx.session.is_bootstrapping() {
        Ok(())
    } else {
        Err(CoreStatus::OpNotSupported)
    }
}

fn read_server_uri(ctx: &mut ClientContext, _: &Registry, uri: Uri) -> HandlerResult<Value> {
    bootstrap_only(ctx)?;
    let staged = ctx
        .staging
        .staged_uri(uri.oiid)
        .ok_or(CoreStatus::NotImplemented)?;
    Ok(Value::String(
        std::str::from_utf8(staged)
            .map_err(|_| CoreStatus::General)?
            .to_owned(),
    ))
}

fn write_server_uri(
    ctx: &mut ClientContext,
    _: &Registry,
    uri: Uri,
    value: &Value,
) -> HandlerResult<()> {
    bootstrap_only(ctx)?;
    let address = value.as_str().ok_or(CoreStatus::InvalidArg)?;
    ctx.staging
        .stage_server_uri(uri.oiid, address.as_bytes())
        .map_err(|e| e.status())
}

fn read_is_bootstrap(ctx: &mut ClientContext, _: &Registry, uri: Uri) -> HandlerResult<Value> {
    bootstrap_only(ctx)?;
    let flag = ctx
        .staging
        .staged_is_bootstrap(uri.oiid)
        .unwrap_or(uri.oiid == 1);
    Ok(Value::Bool(flag))
}

fn write_is_bootstrap(
    ctx: &mut ClientContext,
    _: &Registry,
    uri: Uri,
    value: &Value,
) -> HandlerResult<()> {
    bootstrap_only(ctx)?;
    let flag = value.as_bool().ok_or(CoreStatus::InvalidArg)?;
    ctx.staging.stage_bootstrap_flag(uri.oiid, flag);
    Ok(())
}

fn read_security_mode(ctx: &mut ClientContext, _: &Registry, _: Uri) -> HandlerResult<Value> {
    bootstrap_only(ctx)?;
    Ok(Value::Int(SECURITY_MODE_PSK))
}

fn write_security_mode(
    ctx: &mut ClientContext,
    _: &Registry,
    _: Uri,
    value: &Value,
) -> HandlerResult<()> {
    bootstrap_only(ctx)?;
    let mode = value.as_int().ok_or(CoreStatus::InvalidArg)?;
    if mode != SECURITY_MODE_PSK {
        log::warn!("security mode {mode} requested; only PSK is implemented");
    }
    Ok(())
}

fn read_psk_identity(ctx: &mut ClientContext, _: &Registry, uri: Uri) -> HandlerResult<Value> {
    bootstrap_only(ctx)?;
    let staged = ctx
        .staging
        .staged_psk_identity(uri.oiid)
        .ok_or(CoreStatus::NotImplemented)?;
    Ok(Value::Opaque(staged.to_vec()))
}

fn write_psk_identity(
    ctx: &mut ClientContext,
    _: &Registry,
    uri: Uri,
    value: &Value,
) -> HandlerResult<()> {
    bootstrap_only(ctx)?;
    let identity = value.as_opaque().ok_or(CoreStatus::InvalidArg)?;
    ctx.staging
        .stage_psk_identity(uri.oiid, identity)
        .map_err(|e| e.status())
}

fn write_server_public_key(
    ctx: &mut ClientContext,
    _: &Registry,
    uri: Uri,
    value: &Value,
) -> HandlerResult<()> {
    bootstrap_only(ctx)?;
    let key = value.as_opaque().ok_or(CoreStatus::InvalidArg)?;
    ctx.staging
        .stage_server_public_key(uri.oiid, key)
        .map_err(|e| e.status())
}

fn write_psk_secret(
    ctx: &mut ClientContext,
    _: &Registry,
    uri: Uri,
    value: &Value,
) -> HandlerResult<()> {
    bootstrap_only(ctx)?;
    let secret = value.as_opaque().ok_or(CoreStatus::InvalidArg)?;
    ctx.staging
        .stage_psk_secret(uri.oiid, secret)
        .map_err(|e| e.status())
}

fn read_short_server_id(ctx: &mut ClientContext, _: &Registry, uri: Uri) -> HandlerResult<Value> {
    bootstrap_only(ctx)?;
    let id = ctx
        .staging
        .staged_short_server_id(uri.oiid)
        .ok_or(CoreStatus::NotImplemented)?;
    Ok(Value::Int(i64::from(id)))
}

fn write_short_server_id(
    ctx: &mut ClientContext,
    _: &Registry,
    uri: Uri,
    value: &Value,
) -> HandlerResult<()> {
    bootstrap_only(ctx)?;
    let id = value.as_int().ok_or(CoreStatus::InvalidArg)?;
    let id = u16::try_from(id).map_err(|_| CoreStatus::IncorrectRange)?;
    ctx.staging.stage_short_server_id(uri.oiid, id);
    Ok(())
}
