//! LwM2M firmware update object (5).

use lwm2m_msg::Uri;
use lwm2m_tlv::{ResourceType, Value};

use crate::client::ClientContext;
use crate::objects::FIRMWARE_OBJECT_ID;
use crate::registry::{InstanceLimit, ObjectDef, Registry, ResourceDef};
use crate::status::{CoreStatus, HandlerResult};
use crate::update::UpdateKind;

const RES_PACKAGE: u16 = 0;
const RES_PACKAGE_URI: u16 = 1;
const RES_UPDATE: u16 = 2;
const RES_STATE: u16 = 3;
const RES_UPDATE_RESULT: u16 = 5;
const RES_PKG_NAME: u16 = 6;
const RES_PKG_VERSION: u16 = 7;
const RES_DELIVERY_METHOD: u16 = 9;

/// Both pull (URI) and push (package resource) delivery.
const DELIVERY_BOTH: i64 = 2;

pub(crate) fn object() -> ObjectDef {
    ObjectDef {
        id: FIRMWARE_OBJECT_ID,
        limit: InstanceLimit::Single,
        resources: vec![
            ResourceDef::write_only(RES_PACKAGE, ResourceType::Opaque, write_package),
            ResourceDef::read_write(
                RES_PACKAGE_URI,
                ResourceType::String,
                read_package_uri,
                write_package_uri,
            ),
            ResourceDef::executable(RES_UPDATE, exec_update),
            ResourceDef::read_only(RES_STATE, ResourceType::Int, read_state),
            ResourceDef::read_only(RES_UPDATE_RESULT, ResourceType::Int, read_result),
            ResourceDef::read_only(RES_PKG_NAME, ResourceType::String, read_pkg_name),
            ResourceDef::read_only(RES_PKG_VERSION, ResourceType::String, read_pkg_version),
            ResourceDef::read_only(RES_DELIVERY_METHOD, ResourceType::Int, read_delivery_method),
        ],
    }
}

fn write_package(
    ctx: &mut ClientContext,
    _: &Registry,
    uri: Uri,
    value: &Value,
) -> HandlerResult<()> {
    let chunk = value.as_opaque().ok_or(CoreStatus::InvalidArg)?;
    ctx.update.push_chunk(
        ctx.store.as_mut(),
        &mut ctx.events,
        UpdateKind::Firmware,
        uri.oiid,
        chunk,
    )
}

fn read_package_uri(ctx: &mut ClientContext, _: &Registry, _: Uri) -> HandlerResult<Value> {
    Ok(Value::String(
        String::from_utf8_lossy(ctx.update.package_uri()).into_owned(),
    ))
}

fn write_package_uri(
    ctx: &mut ClientContext,
    _: &Registry,
    uri: Uri,
    value: &Value,
) -> HandlerResult<()> {
    let package_uri = value.as_str().ok_or(CoreStatus::InvalidArg)?;
    ctx.update.set_package_uri(
        ctx.store.as_mut(),
        &mut ctx.events,
        UpdateKind::Firmware,
        uri.oiid,
        package_uri.as_bytes(),
    )
}

fn exec_update(ctx: &mut ClientContext, _: &Registry, uri: Uri, _: &[u8]) -> HandlerResult<()> {
    ctx.update.launch_update(
        ctx.store.as_mut(),
        &mut ctx.events,
        UpdateKind::Firmware,
        uri.oiid,
    )
}

fn read_state(ctx: &mut ClientContext, _: &Registry, _: Uri) -> HandlerResult<Value> {
    Ok(Value::Int(i64::from(ctx.update.fw_state().reported())))
}

fn read_result(ctx: &mut ClientContext, _: &Registry, _: Uri) -> HandlerResult<Value> {
    Ok(Value::Int(i64::from(ctx.update.fw_result() as u16)))
}

fn read_pkg_name(ctx: &mut ClientContext, _: &Registry, _: Uri) -> HandlerResult<Value> {
    Ok(Value::String(
        String::from_utf8_lossy(ctx.update.package_name()).into_owned(),
    ))
}

fn read_pkg_version(ctx: &mut ClientContext, _: &Registry, _: Uri) -> HandlerResult<Value> {
    Ok(Value::String(
        String::from_utf8_lossy(ctx.update.package_version()).into_owned(),
    ))
}

fn read_delivery_method(_: &mut ClientContext, _: &Registry, _: Uri) -> HandlerResult<Value> {
    Ok(Value::Int(DELIVERY_BOTH))
}
