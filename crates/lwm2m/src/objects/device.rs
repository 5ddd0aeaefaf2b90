//! LwM2M device object (3).
//!
//! Almost every resource is a thin pass-through to the [`DeviceInfo`]
//! adapter; adapters answering `NotImplemented` simply drop out of
//! whole-instance reads.

use lwm2m_msg::Uri;
use lwm2m_tlv::{ResourceType, Value};

use crate::client::ClientContext;
use crate::device::DeviceInfo;
use crate::objects::DEVICE_OBJECT_ID;
use crate::registry::{InstanceLimit, ObjectDef, Registry, ResourceDef};
use crate::status::{CoreStatus, HandlerResult};

const RES_MANUFACTURER: u16 = 0;
const RES_MODEL_NUMBER: u16 = 1;
const RES_SERIAL_NUMBER: u16 = 2;
const RES_FIRMWARE_VERSION: u16 = 3;
const RES_REBOOT: u16 = 4;
const RES_FACTORY_RESET: u16 = 5;
const RES_BATTERY_LEVEL: u16 = 9;
const RES_ERROR_CODE: u16 = 11;
const RES_CURRENT_TIME: u16 = 13;
const RES_UTC_OFFSET: u16 = 14;
const RES_TIMEZONE: u16 = 15;
const RES_SUPPORTED_BINDINGS: u16 = 16;

pub(crate) fn object() -> ObjectDef {
    ObjectDef {
        id: DEVICE_OBJECT_ID,
        limit: InstanceLimit::Single,
        resources: vec![
            ResourceDef::read_only(RES_MANUFACTURER, ResourceType::String, read_manufacturer),
            ResourceDef::read_only(RES_MODEL_NUMBER, ResourceType::String, read_model_number),
            ResourceDef::read_only(RES_SERIAL_NUMBER, ResourceType::String, read_serial_number),
            ResourceDef::read_only(
                RES_FIRMWARE_VERSION,
                ResourceType::String,
                read_firmware_version,
            ),
            ResourceDef::executable(RES_REBOOT, exec_reboot),
            ResourceDef::executable(RES_FACTORY_RESET, exec_factory_reset),
            ResourceDef::read_only(RES_BATTERY_LEVEL, ResourceType::Int, read_battery_level),
            ResourceDef::read_only(RES_ERROR_CODE, ResourceType::Int, read_error_code),
            // Both directions supported: the descriptor wins over the
            // narrower op mask the original declared on its handler.
            ResourceDef::read_write(
                RES_CURRENT_TIME,
                ResourceType::Time,
                read_current_time,
                write_current_time,
            ),
            ResourceDef::read_only(RES_UTC_OFFSET, ResourceType::String, read_utc_offset),
            ResourceDef::read_only(RES_TIMEZONE, ResourceType::String, read_timezone),
            ResourceDef::read_only(
                RES_SUPPORTED_BINDINGS,
                ResourceType::String,
                read_supported_bindings,
            ),
        ],
    }
}

fn read_manufacturer(ctx: &mut ClientContext, _: &Registry, _: Uri) -> HandlerResult<Value> {
    ctx.device.manufacturer().map(Value::String)
}

fn read_model_number(ctx: &mut ClientContext, _: &Registry, _: Uri) -> HandlerResult<Value> {
    ctx.device.model_number().map(Value::String)
}

fn read_serial_number(ctx: &mut ClientContext, _: &Registry, _: Uri) -> HandlerResult<Value> {
    ctx.device.serial_number().map(Value::String)
}

fn read_firmware_version(ctx: &mut ClientContext, _: &Registry, _: Uri) -> HandlerResult<Value> {
    ctx.device.firmware_version().map(Value::String)
}

fn exec_reboot(ctx: &mut ClientContext, _: &Registry, _: Uri, _: &[u8]) -> HandlerResult<()> {
    log::info!("reboot requested by server");
    ctx.device.request_reboot()
}

fn exec_factory_reset(
    ctx: &mut ClientContext,
    _: &Registry,
    _: Uri,
    _: &[u8],
) -> HandlerResult<()> {
    log::info!("factory reset requested by server");
    ctx.device.request_factory_reset()
}

fn read_battery_level(ctx: &mut ClientContext, _: &Registry, _: Uri) -> HandlerResult<Value> {
    ctx.device
        .battery_level()
        .map(|level| Value::Int(i64::from(level)))
}

fn read_error_code(_: &mut ClientContext, _: &Registry, _: Uri) -> HandlerResult<Value> {
    // No error-reporting backend; report "no error".
    Ok(Value::Int(0))
}

fn read_current_time(ctx: &mut ClientContext, _: &Registry, _: Uri) -> HandlerResult<Value> {
    ctx.device.current_time().map(Value::Time)
}

fn write_current_time(
    ctx: &mut ClientContext,
    _: &Registry,
    _: Uri,
    value: &Value,
) -> HandlerResult<()> {
    let epoch = value.as_int().ok_or(CoreStatus::InvalidArg)?;
    ctx.device.set_current_time(epoch)
}

fn read_utc_offset(ctx: &mut ClientContext, _: &Registry, _: Uri) -> HandlerResult<Value> {
    ctx.device.utc_offset().map(Value::String)
}

fn read_timezone(ctx: &mut ClientContext, _: &Registry, _: Uri) -> HandlerResult<Value> {
    ctx.device.timezone().map(Value::String)
}

fn read_supported_bindings(_: &mut ClientContext, _: &Registry, _: Uri) -> HandlerResult<Value> {
    Ok(Value::String("U".to_owned()))
}
