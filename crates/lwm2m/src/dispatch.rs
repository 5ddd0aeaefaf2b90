//! The request dispatcher.
//!
//! Takes a decoded server request, locates the target in the registry,
//! invokes the typed handler, encodes the result, and picks the CoAP
//! response code. This is the only place that knows the status → code
//! table; handlers deal purely in [`CoreStatus`].

use lwm2m_msg::{
    ContentFormat, ObserveAction, Operation, Request, Response, ResponseCode, Uri,
};
use lwm2m_tlv::{RecordKind, ResourceType, TlvRecord, Value};

use crate::client::ClientContext;
use crate::registry::{ReadHandler, Registry};
use crate::status::CoreStatus;
use crate::Error;

/// What the dispatcher hands back to the CoAP integration.
#[derive(Debug, PartialEq)]
pub enum DispatchOutcome {
    /// Respond now.
    Response(Response),
    /// The handler completes asynchronously; ACK the request and send the
    /// separated response when the completion event fires.
    Deferred,
}

impl DispatchOutcome {
    /// The immediate response, when there is one.
    pub fn response(&self) -> Option<&Response> {
        match self {
            DispatchOutcome::Response(r) => Some(r),
            DispatchOutcome::Deferred => None,
        }
    }
}

/// Dispatches one decoded request against the object tree.
pub fn dispatch(
    registry: &mut Registry,
    ctx: &mut ClientContext,
    req: &Request,
) -> DispatchOutcome {
    log::debug!("dispatch {} {}", req.op, req.uri);
    let outcome = match req.op {
        Operation::Read => read(registry, ctx, req),
        Operation::Discover => discover(registry, req),
        Operation::Write => write(registry, ctx, req),
        Operation::WriteAttributes => write_attributes(registry, req),
        Operation::Execute => execute(registry, ctx, req),
        Operation::Create => create(registry, ctx, req),
        Operation::Delete => delete(registry, req),
    };
    match &outcome {
        DispatchOutcome::Response(r) => log::debug!("{} {} -> {}", req.op, req.uri, r.code),
        DispatchOutcome::Deferred => log::debug!("{} {} -> deferred", req.op, req.uri),
    }
    outcome
}

/// The success code of each operation.
fn success_code(op: Operation) -> ResponseCode {
    match op {
        Operation::Read | Operation::Discover => ResponseCode::Content,
        Operation::Write | Operation::WriteAttributes | Operation::Execute => {
            ResponseCode::Changed
        }
        Operation::Create => ResponseCode::Created,
        Operation::Delete => ResponseCode::Deleted,
    }
}

/// The fixed semantic-status → CoAP-code table.
fn error_code(status: CoreStatus) -> ResponseCode {
    match status {
        CoreStatus::InvalidArg => ResponseCode::BadRequest,
        CoreStatus::OpNotSupported => ResponseCode::NotFound,
        CoreStatus::NotImplemented => ResponseCode::NotImplemented,
        CoreStatus::InvalidState => ResponseCode::ServiceUnavailable,
        CoreStatus::IncorrectRange | CoreStatus::Overflow | CoreStatus::General => {
            ResponseCode::InternalServerError
        }
        // Handled before the table applies.
        CoreStatus::AsyncInFlight | CoreStatus::AlreadyProcessed => {
            ResponseCode::InternalServerError
        }
    }
}

fn code_only(code: ResponseCode) -> DispatchOutcome {
    DispatchOutcome::Response(Response::code_only(code))
}

/// Routes a handler failure: deferral, idempotent success, or the table.
fn handler_failure(op: Operation, status: CoreStatus) -> DispatchOutcome {
    match status {
        CoreStatus::AsyncInFlight => DispatchOutcome::Deferred,
        CoreStatus::AlreadyProcessed => code_only(success_code(op)),
        other => code_only(error_code(other)),
    }
}

fn read(registry: &mut Registry, ctx: &mut ClientContext, req: &Request) -> DispatchOutcome {
    let uri = req.uri;
    let Some(handle) = registry.find_object(uri.oid) else {
        return code_only(ResponseCode::NotFound);
    };
    if uri.has_instance() && !registry.has_instance(uri.oid, uri.oiid) {
        return code_only(ResponseCode::NotFound);
    }

    if uri.has_resource() {
        let Some(resource) = registry.find_resource(handle, uri.rid) else {
            return code_only(ResponseCode::NotFound);
        };
        let Some(read_fn) = resource.read else {
            return code_only(ResponseCode::MethodNotAllowed);
        };

        return match read_fn(ctx, registry, uri) {
            Ok(value) => {
                if let Some(action) = req.observe {
                    if let Some(instance) = registry.instance_mut(uri.oid, uri.oiid) {
                        match action {
                            ObserveAction::Register => {
                                instance.observe(uri.rid, req.token, value.clone())
                            }
                            ObserveAction::Deregister => {
                                instance.cancel_observation(uri.rid);
                            }
                        }
                    }
                }
                encode_single(req, &value)
            }
            Err(status) => handler_failure(Operation::Read, status),
        };
    }

    if uri.has_instance() {
        return match instance_records(registry, ctx, uri.oid, uri.oiid) {
            Ok(records) => tlv_response(&records),
            Err(status) => handler_failure(Operation::Read, status),
        };
    }

    // Whole-object read: one object-instance record per live instance.
    let mut records = Vec::new();
    for iid in registry.instances_of(uri.oid) {
        match instance_records(registry, ctx, uri.oid, iid) {
            Ok(children) => match TlvRecord::object_instance(iid, &children) {
                Ok(record) => records.push(record),
                Err(_) => return code_only(ResponseCode::InternalServerError),
            },
            Err(status) => return handler_failure(Operation::Read, status),
        }
    }
    tlv_response(&records)
}

/// Reads every readable resource of one instance into TLV records.
///
/// Resources whose handler reports `NotImplemented` or `OpNotSupported`
/// are omitted; any other failure aborts the read.
fn instance_records(
    registry: &Registry,
    ctx: &mut ClientContext,
    oid: u16,
    oiid: u16,
) -> Result<Vec<TlvRecord>, CoreStatus> {
    let handle = registry.find_object(oid).ok_or(CoreStatus::InvalidArg)?;
    let readable: Vec<(u16, ReadHandler)> = registry
        .object(handle)
        .resources
        .iter()
        .filter_map(|r| r.read.map(|f| (r.id, f)))
        .collect();

    let mut records = Vec::new();
    for (rid, read_fn) in readable {
        match read_fn(ctx, registry, Uri::resource(oid, oiid, rid)) {
            Ok(value) => {
                let record =
                    TlvRecord::resource(rid, &value).map_err(|_| CoreStatus::General)?;
                records.push(record);
            }
            Err(CoreStatus::NotImplemented) | Err(CoreStatus::OpNotSupported) => continue,
            Err(status) => return Err(status),
        }
    }
    Ok(records)
}

fn tlv_response(records: &[TlvRecord]) -> DispatchOutcome {
    match TlvRecord::write_all(records) {
        Ok(payload) => DispatchOutcome::Response(Response::with_payload(
            ResponseCode::Content,
            ContentFormat::Tlv,
            payload,
        )),
        Err(_) => code_only(ResponseCode::InternalServerError),
    }
}

/// Encodes a single-resource read result honoring the Accept hint.
fn encode_single(req: &Request, value: &Value) -> DispatchOutcome {
    match req.accept {
        Some(ContentFormat::Text) => {
            if let Ok(text) = value.to_text() {
                return DispatchOutcome::Response(Response::with_payload(
                    ResponseCode::Content,
                    ContentFormat::Text,
                    text.into_bytes(),
                ));
            }
        }
        Some(ContentFormat::Opaque) => {
            if let Value::Opaque(bytes) = value {
                return DispatchOutcome::Response(Response::with_payload(
                    ResponseCode::Content,
                    ContentFormat::Opaque,
                    bytes.clone(),
                ));
            }
        }
        _ => {}
    }
    match TlvRecord::resource(req.uri.rid, value) {
        Ok(record) => tlv_response(std::slice::from_ref(&record)),
        Err(_) => code_only(ResponseCode::InternalServerError),
    }
}

fn write(registry: &mut Registry, ctx: &mut ClientContext, req: &Request) -> DispatchOutcome {
    let uri = req.uri;
    let Some(handle) = registry.find_object(uri.oid) else {
        return code_only(ResponseCode::NotFound);
    };
    if !uri.has_instance() {
        return code_only(ResponseCode::BadRequest);
    }
    if !registry.has_instance(uri.oid, uri.oiid) {
        return code_only(ResponseCode::NotFound);
    }

    if uri.has_resource() {
        let Some(resource) = registry.find_resource(handle, uri.rid) else {
            return code_only(ResponseCode::NotFound);
        };
        if resource.write.is_none() {
            return code_only(ResponseCode::MethodNotAllowed);
        }

        return match req.content_format {
            Some(ContentFormat::Tlv) => {
                let records = match TlvRecord::read_all(&req.payload) {
                    Ok(records) => records,
                    Err(_) => return code_only(ResponseCode::BadRequest),
                };
                match write_records(registry, ctx, uri.oid, uri.oiid, Some(uri.rid), &records) {
                    Ok(()) => code_only(ResponseCode::Changed),
                    Err(outcome) => outcome,
                }
            }
            _ => {
                // Plain text / opaque single value.
                let resource = registry
                    .find_resource(handle, uri.rid)
                    .expect("looked up above");
                let write_fn = resource.write.expect("capability checked");
                let value = match decode_simple(req, resource.rtype) {
                    Ok(value) => value,
                    Err(_) => return code_only(ResponseCode::BadRequest),
                };
                match write_fn(ctx, registry, uri, &value) {
                    Ok(()) => code_only(ResponseCode::Changed),
                    Err(status) => handler_failure(Operation::Write, status),
                }
            }
        };
    }

    // Whole-instance write: TLV only.
    if req.content_format != Some(ContentFormat::Tlv) {
        return code_only(ResponseCode::BadRequest);
    }
    let records = match TlvRecord::read_all(&req.payload) {
        Ok(records) => records,
        Err(_) => return code_only(ResponseCode::BadRequest),
    };
    // An object-instance wrapper matching the target is transparent.
    let wrapped = records.len() == 1
        && records[0].kind == RecordKind::ObjectInstance
        && records[0].id == uri.oiid;
    let records = if wrapped {
        match records[0].children() {
            Ok(children) => children,
            Err(_) => return code_only(ResponseCode::BadRequest),
        }
    } else {
        records
    };
    match write_records(registry, ctx, uri.oid, uri.oiid, None, &records) {
        Ok(()) => code_only(ResponseCode::Changed),
        Err(outcome) => outcome,
    }
}

/// Decodes a non-TLV write payload into a typed value.
fn decode_simple(req: &Request, rtype: ResourceType) -> Result<Value, Error> {
    match req.content_format {
        Some(ContentFormat::Opaque) => Ok(Value::Opaque(req.payload.clone())),
        Some(ContentFormat::Text) | None => {
            if matches!(rtype, ResourceType::Opaque | ResourceType::Unknown) {
                // Package blocks arrive with a missing format marker too.
                Ok(Value::Opaque(req.payload.clone()))
            } else {
                Ok(Value::from_text(rtype, &req.payload)?)
            }
        }
        Some(other) => Err(Error::Msg(lwm2m_msg::MsgError::UnknownContentFormat(
            other as u16,
        ))),
    }
}

/// Applies TLV records to an instance's write handlers.
///
/// `only_rid` restricts the payload to one resource (resource-level
/// write). A resource appearing twice is a bad request; an unknown
/// resource id is skipped; a known one without WRITE capability is a
/// method-not-allowed.
fn write_records(
    registry: &mut Registry,
    ctx: &mut ClientContext,
    oid: u16,
    oiid: u16,
    only_rid: Option<u16>,
    records: &[TlvRecord],
) -> Result<(), DispatchOutcome> {
    let handle = registry
        .find_object(oid)
        .ok_or_else(|| code_only(ResponseCode::NotFound))?;

    let mut seen = Vec::new();
    for record in records {
        if !matches!(
            record.kind,
            RecordKind::ResourceWithValue | RecordKind::MultipleResource
        ) {
            return Err(code_only(ResponseCode::BadRequest));
        }
        if seen.contains(&record.id) {
            log::warn!("resource {} repeated in payload", record.id);
            return Err(code_only(ResponseCode::BadRequest));
        }
        seen.push(record.id);
        if let Some(rid) = only_rid {
            if record.id != rid {
                return Err(code_only(ResponseCode::BadRequest));
            }
        }

        let Some(resource) = registry.find_resource(handle, record.id) else {
            log::warn!("ignoring unknown resource {} in write payload", record.id);
            continue;
        };
        let Some(write_fn) = resource.write else {
            return Err(code_only(ResponseCode::MethodNotAllowed));
        };
        let rtype = resource.rtype;

        match record.kind {
            RecordKind::ResourceWithValue => {
                let value = Value::decode(rtype, &record.value)
                    .map_err(|_| code_only(ResponseCode::BadRequest))?;
                let uri = Uri::resource(oid, oiid, record.id);
                write_fn(ctx, registry, uri, &value)
                    .map_err(|status| handler_failure(Operation::Write, status))?;
            }
            RecordKind::MultipleResource => {
                let children = record
                    .children()
                    .map_err(|_| code_only(ResponseCode::BadRequest))?;
                for child in children {
                    if child.kind != RecordKind::ResourceInstance {
                        return Err(code_only(ResponseCode::BadRequest));
                    }
                    let value = Value::decode(rtype, &child.value)
                        .map_err(|_| code_only(ResponseCode::BadRequest))?;
                    let uri = Uri::resource_instance(oid, oiid, record.id, child.id);
                    write_fn(ctx, registry, uri, &value)
                        .map_err(|status| handler_failure(Operation::Write, status))?;
                }
            }
            _ => unreachable!("filtered above"),
        }
    }
    Ok(())
}

fn execute(registry: &mut Registry, ctx: &mut ClientContext, req: &Request) -> DispatchOutcome {
    let uri = req.uri;
    let Some(handle) = registry.find_object(uri.oid) else {
        return code_only(ResponseCode::NotFound);
    };
    if !uri.has_instance() || !uri.has_resource() {
        return code_only(ResponseCode::BadRequest);
    }
    if !registry.has_instance(uri.oid, uri.oiid) {
        return code_only(ResponseCode::NotFound);
    }
    let Some(resource) = registry.find_resource(handle, uri.rid) else {
        return code_only(ResponseCode::NotFound);
    };
    let Some(execute_fn) = resource.execute else {
        return code_only(ResponseCode::MethodNotAllowed);
    };

    match execute_fn(ctx, registry, uri, &req.payload) {
        Ok(()) => code_only(ResponseCode::Changed),
        Err(status) => handler_failure(Operation::Execute, status),
    }
}

fn write_attributes(registry: &mut Registry, req: &Request) -> DispatchOutcome {
    let uri = req.uri;
    if registry.find_object(uri.oid).is_none() {
        return code_only(ResponseCode::NotFound);
    }
    if !uri.has_instance() {
        return code_only(ResponseCode::BadRequest);
    }
    let Some(attributes) = req.attributes else {
        return code_only(ResponseCode::BadRequest);
    };
    let Some(instance) = registry.instance_mut(uri.oid, uri.oiid) else {
        return code_only(ResponseCode::NotFound);
    };

    // Instance-level attributes live under the "no resource" id.
    let rid = uri.rid;
    if attributes.cancel {
        instance.cancel_observation(rid);
    } else {
        instance.attributes_mut(rid).apply(&attributes);
    }
    code_only(ResponseCode::Changed)
}

fn discover(registry: &mut Registry, req: &Request) -> DispatchOutcome {
    let uri = req.uri;
    let Some(handle) = registry.find_object(uri.oid) else {
        return code_only(ResponseCode::NotFound);
    };
    if uri.has_instance() && !registry.has_instance(uri.oid, uri.oiid) {
        return code_only(ResponseCode::NotFound);
    }

    let attr_suffix = |oiid: u16, rid: u16| -> String {
        registry
            .instance(uri.oid, oiid)
            .and_then(|i| i.attributes(rid))
            .map(|a| a.link_params())
            .unwrap_or_default()
    };

    let mut links = Vec::new();
    if uri.has_resource() {
        if registry.find_resource(handle, uri.rid).is_none() {
            return code_only(ResponseCode::NotFound);
        }
        links.push(format!(
            "</{}/{}/{}>{}",
            uri.oid,
            uri.oiid,
            uri.rid,
            attr_suffix(uri.oiid, uri.rid)
        ));
    } else if uri.has_instance() {
        links.push(format!("</{}/{}>", uri.oid, uri.oiid));
        for rid in registry.list_resources(uri.oid) {
            links.push(format!(
                "</{}/{}/{}>{}",
                uri.oid,
                uri.oiid,
                rid,
                attr_suffix(uri.oiid, rid)
            ));
        }
    } else {
        links.push(format!("</{}>", uri.oid));
        for oiid in registry.instances_of(uri.oid) {
            links.push(format!("</{}/{}>", uri.oid, oiid));
            for rid in registry.list_resources(uri.oid) {
                links.push(format!(
                    "</{}/{}/{}>{}",
                    uri.oid,
                    oiid,
                    rid,
                    attr_suffix(oiid, rid)
                ));
            }
        }
    }

    DispatchOutcome::Response(Response::with_payload(
        ResponseCode::Content,
        ContentFormat::LinkFormat,
        links.join(",").into_bytes(),
    ))
}

fn create(registry: &mut Registry, ctx: &mut ClientContext, req: &Request) -> DispatchOutcome {
    let uri = req.uri;
    if registry.find_object(uri.oid).is_none() {
        return code_only(ResponseCode::NotFound);
    }

    let records = if req.payload.is_empty() {
        Vec::new()
    } else {
        match TlvRecord::read_all(&req.payload) {
            Ok(records) => records,
            Err(_) => return code_only(ResponseCode::BadRequest),
        }
    };

    // Either one object-instance wrapper naming the new id, or bare
    // resource records targeting the URI (or the next free id).
    let wrapped = records.len() == 1 && records[0].kind == RecordKind::ObjectInstance;
    let (iid, resource_records) = if wrapped {
        match records[0].children() {
            Ok(children) => (records[0].id, children),
            Err(_) => return code_only(ResponseCode::BadRequest),
        }
    } else {
        let iid = if uri.has_instance() {
            uri.oiid
        } else {
            registry.next_instance_id(uri.oid)
        };
        (iid, records)
    };

    match registry.create_instance(uri.oid, iid) {
        Ok(()) => {}
        Err(Error::ObjectNotFound(_)) => return code_only(ResponseCode::NotFound),
        Err(_) => return code_only(ResponseCode::BadRequest),
    }

    if let Err(outcome) = write_records(registry, ctx, uri.oid, iid, None, &resource_records) {
        // Roll the allocation back; the instance never existed.
        let _ = registry.delete_instance(uri.oid, iid);
        return outcome;
    }

    log::info!("created instance /{}/{}", uri.oid, iid);
    code_only(ResponseCode::Created)
}

fn delete(registry: &mut Registry, req: &Request) -> DispatchOutcome {
    let uri = req.uri;
    if !uri.has_instance() || uri.has_resource() {
        return code_only(ResponseCode::BadRequest);
    }
    match registry.delete_instance(uri.oid, uri.oiid) {
        Ok(()) => code_only(ResponseCode::Deleted),
        Err(_) => code_only(ResponseCode::NotFound),
    }
}
