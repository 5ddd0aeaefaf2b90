//! LwM2M software management object (9).

use lwm2m_msg::Uri;
use lwm2m_tlv::{ResourceType, Value};

use crate::client::ClientContext;
use crate::objects::SOFTWARE_OBJECT_ID;
use crate::registry::{InstanceLimit, ObjectDef, Registry, ResourceDef};
use crate::status::{CoreStatus, HandlerResult};
use crate::update::UpdateKind;

const RES_PKG_NAME: u16 = 0;
const RES_PKG_VERSION: u16 = 1;
const RES_PACKAGE: u16 = 2;
const RES_PACKAGE_URI: u16 = 3;
const RES_INSTALL: u16 = 4;
const RES_UNINSTALL: u16 = 6;
const RES_UPDATE_STATE: u16 = 7;
const RES_UPDATE_SUPPORTED_OBJECTS: u16 = 8;
const RES_UPDATE_RESULT: u16 = 9;
const RES_ACTIVATE: u16 = 10;
const RES_DEACTIVATE: u16 = 11;
const RES_ACTIVATION_STATE: u16 = 12;

pub(crate) fn object() -> ObjectDef {
    ObjectDef {
        id: SOFTWARE_OBJECT_ID,
        limit: InstanceLimit::Unbounded,
        resources: vec![
            ResourceDef::read_only(RES_PKG_NAME, ResourceType::String, read_pkg_name),
            ResourceDef::read_only(RES_PKG_VERSION, ResourceType::String, read_pkg_version),
            ResourceDef::write_only(RES_PACKAGE, ResourceType::Opaque, write_package),
            ResourceDef::read_write(
                RES_PACKAGE_URI,
                ResourceType::String,
                read_package_uri,
                write_package_uri,
            ),
            ResourceDef::executable(RES_INSTALL, exec_install),
            ResourceDef::executable(RES_UNINSTALL, exec_uninstall),
            ResourceDef::read_only(RES_UPDATE_STATE, ResourceType::Int, read_state),
            ResourceDef::read_write(
                RES_UPDATE_SUPPORTED_OBJECTS,
                ResourceType::Bool,
                read_update_supported_objects,
                write_update_supported_objects,
            ),
            ResourceDef::read_only(RES_UPDATE_RESULT, ResourceType::Int, read_result),
            ResourceDef::executable(RES_ACTIVATE, exec_activate),
            ResourceDef::executable(RES_DEACTIVATE, exec_deactivate),
            ResourceDef::read_only(RES_ACTIVATION_STATE, ResourceType::Bool, read_activation),
        ],
    }
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
        UpdateKind::Software,
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
        UpdateKind::Software,
        uri.oiid,
        package_uri.as_bytes(),
    )
}

fn exec_install(ctx: &mut ClientContext, _: &Registry, uri: Uri, _: &[u8]) -> HandlerResult<()> {
    ctx.update.launch_update(
        ctx.store.as_mut(),
        &mut ctx.events,
        UpdateKind::Software,
        uri.oiid,
    )
}

fn exec_uninstall(ctx: &mut ClientContext, _: &Registry, uri: Uri, _: &[u8]) -> HandlerResult<()> {
    ctx.update.launch_uninstall(ctx.store.as_mut(), uri.oiid)
}

fn read_state(ctx: &mut ClientContext, _: &Registry, _: Uri) -> HandlerResult<Value> {
    Ok(Value::Int(i64::from(ctx.update.sw_state().reported())))
}

fn read_update_supported_objects(
    ctx: &mut ClientContext,
    _: &Registry,
    _: Uri,
) -> HandlerResult<Value> {
    Ok(Value::Bool(ctx.update.update_supported_objects()))
}

fn write_update_supported_objects(
    ctx: &mut ClientContext,
    _: &Registry,
    _: Uri,
    value: &Value,
) -> HandlerResult<()> {
    let enabled = value.as_bool().ok_or(CoreStatus::InvalidArg)?;
    ctx.update
        .set_update_supported_objects(ctx.store.as_mut(), enabled)
}

fn read_result(ctx: &mut ClientContext, _: &Registry, _: Uri) -> HandlerResult<Value> {
    Ok(Value::Int(i64::from(ctx.update.sw_result() as u8)))
}

fn exec_activate(ctx: &mut ClientContext, _: &Registry, _: Uri, _: &[u8]) -> HandlerResult<()> {
    ctx.update.activate(ctx.store.as_mut())
}

fn exec_deactivate(ctx: &mut ClientContext, _: &Registry, _: Uri, _: &[u8]) -> HandlerResult<()> {
    ctx.update.deactivate(ctx.store.as_mut())
}

fn read_activation(ctx: &mut ClientContext, _: &Registry, _: Uri) -> HandlerResult<Value> {
    Ok(Value::Bool(ctx.update.activation_state()))
}
