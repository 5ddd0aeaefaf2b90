//! LwM2M server object (1).

use lwm2m_msg::Uri;
use lwm2m_tlv::{ResourceType, Value};

use crate::client::ClientContext;
use crate::objects::SERVER_OBJECT_ID;
use crate::registry::{InstanceLimit, ObjectDef, Registry, ResourceDef};
use crate::status::{CoreStatus, HandlerResult};

const RES_SHORT_SERVER_ID: u16 = 0;
const RES_LIFETIME: u16 = 1;
const RES_DEFAULT_PMIN: u16 = 2;
const RES_DEFAULT_PMAX: u16 = 3;
const RES_NOTIFICATION_STORING: u16 = 6;
const RES_BINDING: u16 = 7;
const RES_REGISTRATION_UPDATE: u16 = 8;

pub(crate) fn object() -> ObjectDef {
    ObjectDef {
        id: SERVER_OBJECT_ID,
        limit: InstanceLimit::Single,
        resources: vec![
            ResourceDef::read_only(RES_SHORT_SERVER_ID, ResourceType::Int, read_short_server_id),
            ResourceDef::read_write(RES_LIFETIME, ResourceType::Int, read_lifetime, write_lifetime),
            ResourceDef::read_write(RES_DEFAULT_PMIN, ResourceType::Int, read_pmin, write_pmin),
            ResourceDef::read_write(RES_DEFAULT_PMAX, ResourceType::Int, read_pmax, write_pmax),
            ResourceDef::read_write(
                RES_NOTIFICATION_STORING,
                ResourceType::Bool,
                read_notification_storing,
                write_notification_storing,
            ),
            ResourceDef::read_only(RES_BINDING, ResourceType::String, read_binding),
            ResourceDef::executable(RES_REGISTRATION_UPDATE, exec_registration_update),
        ],
    }
}

fn read_short_server_id(ctx: &mut ClientContext, _: &Registry, _: Uri) -> HandlerResult<Value> {
    Ok(Value::Int(i64::from(ctx.session.dm_short_server_id())))
}

fn read_lifetime(ctx: &mut ClientContext, _: &Registry, _: Uri) -> HandlerResult<Value> {
    Ok(Value::Int(i64::from(ctx.session.lifetime())))
}

fn write_lifetime(
    ctx: &mut ClientContext,
    _: &Registry,
    _: Uri,
    value: &Value,
) -> HandlerResult<()> {
    let lifetime = value.as_int().ok_or(CoreStatus::InvalidArg)?;
    let lifetime = u32::try_from(lifetime).map_err(|_| CoreStatus::IncorrectRange)?;
    if lifetime == 0 {
        return Err(CoreStatus::IncorrectRange);
    }
    let now = ctx.now;
    ctx.session.set_lifetime(lifetime, now);
    Ok(())
}

fn read_pmin(ctx: &mut ClientContext, _: &Registry, _: Uri) -> HandlerResult<Value> {
    Ok(Value::Int(i64::from(ctx.session.default_pmin)))
}

fn write_pmin(ctx: &mut ClientContext, _: &Registry, _: Uri, value: &Value) -> HandlerResult<()> {
    let pmin = value.as_int().ok_or(CoreStatus::InvalidArg)?;
    ctx.session.default_pmin = u32::try_from(pmin).map_err(|_| CoreStatus::IncorrectRange)?;
    Ok(())
}

fn read_pmax(ctx: &mut ClientContext, _: &Registry, _: Uri) -> HandlerResult<Value> {
    Ok(Value::Int(i64::from(ctx.session.default_pmax)))
}

fn write_pmax(ctx: &mut ClientContext, _: &Registry, _: Uri, value: &Value) -> HandlerResult<()> {
    let pmax = value.as_int().ok_or(CoreStatus::InvalidArg)?;
    ctx.session.default_pmax = u32::try_from(pmax).map_err(|_| CoreStatus::IncorrectRange)?;
    Ok(())
}

fn read_notification_storing(
    ctx: &mut ClientContext,
    _: &Registry,
    _: Uri,
) -> HandlerResult<Value> {
    Ok(Value::Bool(ctx.session.notification_storing))
}

fn write_notification_storing(
    ctx: &mut ClientContext,
    _: &Registry,
    _: Uri,
    value: &Value,
) -> HandlerResult<()> {
    ctx.session.notification_storing = value.as_bool().ok_or(CoreStatus::InvalidArg)?;
    Ok(())
}

fn read_binding(_: &mut ClientContext, _: &Registry, _: Uri) -> HandlerResult<Value> {
    Ok(Value::String("U".to_owned()))
}

fn exec_registration_update(
    ctx: &mut ClientContext,
    _: &Registry,
    _: Uri,
    _: &[u8],
) -> HandlerResult<()> {
    log::debug!("registration update trigger executed");
    ctx.session.request_update();
    Ok(())
}
