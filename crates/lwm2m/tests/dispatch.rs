//! Dispatcher behavior against a registered client: response codes,
//! whole-object reads, lifetime handling, observe bookkeeping.

mod common;

use std::time::{Duration, Instant};

use common::*;
use lwm2m::msg::{
    AttributeSet, ContentFormat, ObserveAction, Operation, Request, ResponseCode, Uri,
};
use lwm2m::tlv::{RecordKind, TlvRecord, Value};
use lwm2m::Lwm2mClient;

fn registered_client() -> (Lwm2mClient, Instant) {
    let mut client = make_client(dm_provisioned_store());
    let now = Instant::now();
    client.start(now).unwrap();
    client.reply_success(now, Some("/rd/1"));
    (client, now)
}

#[test_log::test]
fn test_lifetime_write_rearms_timer() {
    let (mut client, now) = registered_client();

    let request = Request::new(Operation::Write, Uri::resource(1, 0, 1))
        .with_payload(ContentFormat::Text, b"3600".to_vec());
    let outcome = client.handle_request(now, &request);
    assert_eq!(outcome.response().unwrap().code, ResponseCode::Changed);

    assert_eq!(client.ctx.session.lifetime(), 3600);
    assert_eq!(
        client.ctx.session.next_update_at().unwrap() - now,
        Duration::from_secs(3240)
    );
}

#[test_log::test]
fn test_whole_instance_read_of_device() {
    let (mut client, now) = registered_client();

    let outcome = client.handle_request(now, &Request::new(Operation::Read, Uri::instance(3, 0)));
    let response = outcome.response().unwrap();
    assert_eq!(response.code, ResponseCode::Content);
    assert_eq!(response.content_format, Some(ContentFormat::Tlv));

    let records = TlvRecord::read_all(&response.payload).unwrap();
    let find = |rid: u16| records.iter().find(|r| r.id == rid);

    assert_eq!(find(0).unwrap().value, b"ACME");
    assert_eq!(find(1).unwrap().value, b"AC-1000");
    assert_eq!(find(2).unwrap().value, b"SN-0001");
    assert_eq!(find(3).unwrap().value, b"1.2.3");
    assert_eq!(find(15).unwrap().value, b"Europe/Paris");
    let time = Value::decode(lwm2m::tlv::ResourceType::Time, &find(13).unwrap().value).unwrap();
    assert_eq!(time, Value::Time(1_700_000_000));

    // The adapter answers NotImplemented for the UTC offset: omitted.
    assert!(find(14).is_none());
}

#[test_log::test]
fn test_whole_object_read_wraps_instances() {
    let (mut client, now) = registered_client();
    let outcome = client.handle_request(now, &Request::new(Operation::Read, Uri::object(3)));
    let response = outcome.response().unwrap();
    assert_eq!(response.code, ResponseCode::Content);

    let records = TlvRecord::read_all(&response.payload).unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].kind, RecordKind::ObjectInstance);
    assert_eq!(records[0].id, 0);
    assert!(!records[0].children().unwrap().is_empty());
}

#[test_log::test]
fn test_capability_mask_miss_is_never_success() {
    let (mut client, now) = registered_client();

    // Write to a read-only resource.
    let request = Request::new(Operation::Write, Uri::resource(3, 0, 0))
        .with_payload(ContentFormat::Text, b"nope".to_vec());
    let code = client.handle_request(now, &request).response().unwrap().code;
    assert_eq!(code, ResponseCode::MethodNotAllowed);
    assert!(!code.is_success());

    // Read of an execute-only resource.
    let code = client
        .handle_request(now, &Request::new(Operation::Read, Uri::resource(3, 0, 4)))
        .response()
        .unwrap()
        .code;
    assert_eq!(code, ResponseCode::MethodNotAllowed);

    // Execute on a readable resource.
    let code = client
        .handle_request(
            now,
            &Request::new(Operation::Execute, Uri::resource(3, 0, 0)),
        )
        .response()
        .unwrap()
        .code;
    assert_eq!(code, ResponseCode::MethodNotAllowed);
}

#[test_log::test]
fn test_missing_targets_are_not_found() {
    let (mut client, now) = registered_client();

    for uri in [
        Uri::object(4242),
        Uri::instance(3, 7),
        Uri::resource(3, 0, 4242),
    ] {
        let code = client
            .handle_request(now, &Request::new(Operation::Read, uri))
            .response()
            .unwrap()
            .code;
        assert_eq!(code, ResponseCode::NotFound, "uri {uri}");
    }
}

#[test_log::test]
fn test_registration_update_trigger() {
    let (mut client, now) = registered_client();

    let outcome =
        client.handle_request(now, &Request::new(Operation::Execute, Uri::resource(1, 0, 8)));
    assert_eq!(outcome.response().unwrap().code, ResponseCode::Changed);

    // The trigger makes the very next tick send an update.
    let actions = client.tick(now).unwrap();
    assert!(!actions.is_empty());
    assert_eq!(
        client.ctx.session.state(),
        lwm2m::SessionState::Updating
    );
}

#[test_log::test]
fn test_duplicate_resource_in_payload_rejected() {
    let (mut client, now) = registered_client();

    let payload = TlvRecord::write_all(&[
        TlvRecord::resource(1, &Value::Int(120)).unwrap(),
        TlvRecord::resource(1, &Value::Int(240)).unwrap(),
    ])
    .unwrap();
    let request = Request::new(Operation::Write, Uri::instance(1, 0))
        .with_payload(ContentFormat::Tlv, payload);
    assert_eq!(
        client.handle_request(now, &request).response().unwrap().code,
        ResponseCode::BadRequest
    );
}

#[test_log::test]
fn test_observe_and_notify_ordering() {
    let (mut client, now) = registered_client();

    let request = Request::new(Operation::Read, Uri::resource(3, 0, 13))
        .with_observe(ObserveAction::Register, 0xBEEF);
    let outcome = client.handle_request(now, &request);
    assert_eq!(outcome.response().unwrap().code, ResponseCode::Content);

    let first = client.resource_changed(now, 3, 0, 13).unwrap();
    let second = client.resource_changed(now, 3, 0, 13).unwrap();
    assert_eq!(first.token, 0xBEEF);
    assert_eq!(second.token, 0xBEEF);
    assert_eq!(first.sequence + 1, second.sequence);

    // Deregistration stops notifications.
    let request = Request::new(Operation::Read, Uri::resource(3, 0, 13))
        .with_observe(ObserveAction::Deregister, 0xBEEF);
    client.handle_request(now, &request);
    assert!(client.resource_changed(now, 3, 0, 13).is_none());
}

#[test_log::test]
fn test_write_attributes_tracked_per_resource() {
    let (mut client, now) = registered_client();

    let request = Request::new(Operation::WriteAttributes, Uri::resource(3, 0, 13))
        .with_attributes(AttributeSet {
            pmin: Some(5),
            pmax: Some(300),
            ..Default::default()
        });
    assert_eq!(
        client.handle_request(now, &request).response().unwrap().code,
        ResponseCode::Changed
    );

    let attrs = client
        .registry
        .instance(3, 0)
        .unwrap()
        .attributes(13)
        .unwrap();
    assert!(attrs.flags.pmin());
    assert!(attrs.flags.pmax());
    assert!(!attrs.flags.gt());
    assert_eq!(attrs.pmin, 5);

    // Discover exposes the written attributes.
    let outcome = client.handle_request(
        now,
        &Request::new(Operation::Discover, Uri::resource(3, 0, 13)),
    );
    let response = outcome.response().unwrap();
    assert_eq!(response.content_format, Some(ContentFormat::LinkFormat));
    assert_eq!(
        String::from_utf8_lossy(&response.payload),
        "</3/0/13>;pmin=5;pmax=300"
    );
}

#[test_log::test]
fn test_create_and_delete_instance() {
    let (mut client, now) = registered_client();

    // CREATE a software instance with an explicit id wrapper.
    let children = [TlvRecord::resource(8, &Value::Bool(true)).unwrap()];
    let payload = TlvRecord::write_all(&[TlvRecord::object_instance(3, &children).unwrap()])
        .unwrap();
    let request =
        Request::new(Operation::Create, Uri::object(9)).with_payload(ContentFormat::Tlv, payload);
    assert_eq!(
        client.handle_request(now, &request).response().unwrap().code,
        ResponseCode::Created
    );
    assert!(client.registry.has_instance(9, 3));

    // DELETE it again.
    let request = Request::new(Operation::Delete, Uri::instance(9, 3));
    assert_eq!(
        client.handle_request(now, &request).response().unwrap().code,
        ResponseCode::Deleted
    );
    assert!(!client.registry.has_instance(9, 3));

    // Deleting twice is NotFound.
    let request = Request::new(Operation::Delete, Uri::instance(9, 3));
    assert_eq!(
        client.handle_request(now, &request).response().unwrap().code,
        ResponseCode::NotFound
    );
}

#[test_log::test]
fn test_create_rolls_back_on_write_failure() {
    let (mut client, now) = registered_client();

    // Resource 8 is a boolean; an integer TLV of width 3 cannot decode.
    let bad = TlvRecord {
        kind: RecordKind::ResourceWithValue,
        id: 8,
        value: vec![1, 2, 3],
    };
    let payload =
        TlvRecord::write_all(&[TlvRecord::object_instance(4, &[bad]).unwrap()]).unwrap();
    let request =
        Request::new(Operation::Create, Uri::object(9)).with_payload(ContentFormat::Tlv, payload);
    assert_eq!(
        client.handle_request(now, &request).response().unwrap().code,
        ResponseCode::BadRequest
    );
    // The allocation was rolled back.
    assert!(!client.registry.has_instance(9, 4));
}

#[test_log::test]
fn test_text_read_honors_accept() {
    let (mut client, now) = registered_client();

    let mut request = Request::new(Operation::Read, Uri::resource(1, 0, 1));
    request.accept = Some(ContentFormat::Text);
    let outcome = client.handle_request(now, &request);
    let response = outcome.response().unwrap();
    assert_eq!(response.content_format, Some(ContentFormat::Text));
    assert_eq!(response.payload, b"86400");
}
