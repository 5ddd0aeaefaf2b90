//! File-transfer object (33406).
//!
//! The server creates an instance per stored file, stages name/class/
//! hash, and the write to the direction resource kicks the transfer off
//! (subject to the stored-file cap).

use lwm2m_msg::Uri;
use lwm2m_tlv::{ResourceType, Value};

use crate::client::ClientContext;
use crate::objects::FILE_TRANSFER_OBJECT_ID;
use crate::registry::{InstanceLimit, ObjectDef, Registry, ResourceDef};
use crate::status::{CoreStatus, HandlerResult};
use crate::transfer::TransferDirection;

const RES_NAME: u16 = 0;
const RES_CLASS: u16 = 1;
const RES_HASH: u16 = 2;
const RES_DIRECTION: u16 = 3;
const RES_STATE: u16 = 4;
const RES_RESULT: u16 = 5;
const RES_PROGRESS: u16 = 6;
const RES_FAILURE_REASON: u16 = 7;

pub(crate) fn object() -> ObjectDef {
    ObjectDef {
        id: FILE_TRANSFER_OBJECT_ID,
        // Stored files are capped by the transfer engine, not the registry,
        // so the cap failure is observable through the result resources.
        limit: InstanceLimit::Unbounded,
        resources: vec![
            ResourceDef::read_write(RES_NAME, ResourceType::String, read_name, write_name),
            ResourceDef::read_write(RES_CLASS, ResourceType::String, read_class, write_class),
            ResourceDef::read_write(RES_HASH, ResourceType::Opaque, read_hash, write_hash),
            ResourceDef::read_write(
                RES_DIRECTION,
                ResourceType::Int,
                read_direction,
                write_direction,
            ),
            ResourceDef::read_only(RES_STATE, ResourceType::Int, read_state),
            ResourceDef::read_only(RES_RESULT, ResourceType::Int, read_result),
            ResourceDef::read_only(RES_PROGRESS, ResourceType::Int, read_progress),
            ResourceDef::read_only(
                RES_FAILURE_REASON,
                ResourceType::String,
                read_failure_reason,
            ),
        ],
    }
}

fn read_name(ctx: &mut ClientContext, _: &Registry, _: Uri) -> HandlerResult<Value> {
    Ok(Value::String(
        String::from_utf8_lossy(&ctx.transfer.workspace().name).into_owned(),
    ))
}

fn write_name(ctx: &mut ClientContext, _: &Registry, _: Uri, value: &Value) -> HandlerResult<()> {
    let name = value.as_str().ok_or(CoreStatus::InvalidArg)?;
    ctx.transfer.set_name(ctx.store.as_mut(), name.as_bytes())
}

fn read_class(ctx: &mut ClientContext, _: &Registry, _: Uri) -> HandlerResult<Value> {
    Ok(Value::String(
        String::from_utf8_lossy(&ctx.transfer.workspace().class).into_owned(),
    ))
}

fn write_class(ctx: &mut ClientContext, _: &Registry, _: Uri, value: &Value) -> HandlerResult<()> {
    let class = value.as_str().ok_or(CoreStatus::InvalidArg)?;
    ctx.transfer.set_class(ctx.store.as_mut(), class.as_bytes())
}

fn read_hash(ctx: &mut ClientContext, _: &Registry, _: Uri) -> HandlerResult<Value> {
    Ok(Value::Opaque(ctx.transfer.workspace().hash.clone()))
}

fn write_hash(ctx: &mut ClientContext, _: &Registry, _: Uri, value: &Value) -> HandlerResult<()> {
    let hash = value.as_opaque().ok_or(CoreStatus::InvalidArg)?;
    ctx.transfer.set_hash(ctx.store.as_mut(), hash)
}

fn read_direction(ctx: &mut ClientContext, _: &Registry, _: Uri) -> HandlerResult<Value> {
    Ok(Value::Int(i64::from(ctx.transfer.direction() as u8)))
}

/// Writing the direction starts the transfer over the staged fields.
fn write_direction(
    ctx: &mut ClientContext,
    registry: &Registry,
    _: Uri,
    value: &Value,
) -> HandlerResult<()> {
    let direction = match value.as_int().ok_or(CoreStatus::InvalidArg)? {
        0 => TransferDirection::Download,
        1 => TransferDirection::Upload,
        _ => return Err(CoreStatus::IncorrectRange),
    };
    let stored_files = registry.instance_count(FILE_TRANSFER_OBJECT_ID);
    ctx.transfer
        .begin(ctx.store.as_mut(), stored_files.saturating_sub(1), direction)
}

fn read_state(ctx: &mut ClientContext, _: &Registry, _: Uri) -> HandlerResult<Value> {
    Ok(Value::Int(i64::from(ctx.transfer.state() as u8)))
}

fn read_result(ctx: &mut ClientContext, _: &Registry, _: Uri) -> HandlerResult<Value> {
    Ok(Value::Int(i64::from(ctx.transfer.result() as u8)))
}

fn read_progress(ctx: &mut ClientContext, _: &Registry, _: Uri) -> HandlerResult<Value> {
    Ok(Value::Int(i64::from(ctx.transfer.workspace().progress)))
}

fn read_failure_reason(ctx: &mut ClientContext, _: &Registry, _: Uri) -> HandlerResult<Value> {
    Ok(Value::String(
        ctx.transfer.workspace().failure_reason_str().to_owned(),
    ))
}
