//! Bootstrap-then-register lifecycle, driven through the dispatcher the
//! way a bootstrap server would.

mod common;

use std::time::Instant;

use common::*;
use lwm2m::msg::{ContentFormat, Operation, OutboundRequest, Request, ResponseCode, Uri};
use lwm2m::tlv::{TlvRecord, Value};
use lwm2m::{CredentialKind, SessionAction, SessionState};

fn tlv_write(uri: Uri, records: &[TlvRecord]) -> Request {
    Request::new(Operation::Write, uri)
        .with_payload(ContentFormat::Tlv, TlvRecord::write_all(records).unwrap())
}

#[test_log::test]
fn test_bootstrap_then_register() {
    let mut client = make_client(bootstrap_only_store());
    let events = record_events(&mut client);
    let now = Instant::now();

    let actions = client.start(now).unwrap();
    assert_eq!(client.ctx.session.state(), SessionState::Bootstrapping);
    assert!(matches!(
        actions[1],
        SessionAction::Send(OutboundRequest::BootstrapRequest { .. })
    ));

    // The bootstrap server re-writes its own security instance (1)...
    let response = client.handle_request(
        now,
        &tlv_write(
            Uri::instance(0, 1),
            &[
                TlvRecord::resource(0, &Value::String("coaps://bs.example:5684".into())).unwrap(),
                TlvRecord::resource(1, &Value::Bool(true)).unwrap(),
                TlvRecord::resource(2, &Value::Int(0)).unwrap(),
                TlvRecord::resource(3, &Value::Opaque(b"client42".to_vec())).unwrap(),
                TlvRecord::resource(5, &Value::Opaque((0x01..=0x10).collect())).unwrap(),
            ],
        ),
    );
    assert_eq!(response.response().unwrap().code, ResponseCode::Changed);

    // ... then provisions the DM server in instance 0.
    let response = client.handle_request(
        now,
        &tlv_write(
            Uri::instance(0, 0),
            &[
                TlvRecord::resource(0, &Value::String("coaps://dm.example:5684".into())).unwrap(),
                TlvRecord::resource(1, &Value::Bool(false)).unwrap(),
                TlvRecord::resource(2, &Value::Int(0)).unwrap(),
                TlvRecord::resource(3, &Value::Opaque(b"dm-client42".to_vec())).unwrap(),
                TlvRecord::resource(5, &Value::Opaque((0x20..0x30).collect())).unwrap(),
                TlvRecord::resource(10, &Value::Int(1)).unwrap(),
            ],
        ),
    );
    assert_eq!(response.response().unwrap().code, ResponseCode::Changed);

    // Writes went to the staging area, not the persistent store.
    assert!(client.ctx.staging.dm_complete());
    assert!(!client
        .ctx
        .credentials
        .check_present(CredentialKind::DmAddress, 1));

    // Bootstrap-Finish commits and wipes.
    client.bootstrap_finish(now).unwrap();
    assert_eq!(client.ctx.session.state(), SessionState::BootstrappedStaged);
    assert!(client.ctx.staging.is_empty());

    for (kind, server_id) in [
        (CredentialKind::BsAddress, 0),
        (CredentialKind::BsPskIdentity, 0),
        (CredentialKind::BsPskSecret, 0),
        (CredentialKind::DmAddress, 1),
        (CredentialKind::DmPskIdentity, 1),
        (CredentialKind::DmPskSecret, 1),
    ] {
        assert!(
            client.ctx.credentials.check_present(kind, server_id),
            "{kind:?} missing after commit"
        );
    }

    // The next tick registers against the freshly provisioned DM server.
    let actions = client.tick(now).unwrap();
    assert_eq!(client.ctx.session.state(), SessionState::Registering);
    let SessionAction::Connect(endpoint) = &actions[0] else {
        panic!("expected connect action");
    };
    assert_eq!(endpoint.to_string(), "coaps://dm.example:5684");
    let SessionAction::Send(OutboundRequest::Register { query, .. }) = &actions[1] else {
        panic!("expected register send");
    };
    assert!(query.contains("ep=client42"));

    client.reply_success(now, Some("/rd/5a3f"));
    assert_eq!(client.ctx.session.state(), SessionState::Registered);

    use lwm2m::Event;
    let events = events.borrow();
    assert!(events.contains(&Event::Initialized));
    assert!(events.contains(&Event::SessionTypeStart(lwm2m::SessionType::Bootstrap)));
    assert!(events.contains(&Event::SessionFinished));
    assert!(events.contains(&Event::SessionTypeStart(
        lwm2m::SessionType::DeviceManagement
    )));
    assert!(events.contains(&Event::SessionStarted));
}

#[test_log::test]
fn test_incomplete_bootstrap_stays_open() {
    let mut client = make_client(bootstrap_only_store());
    let now = Instant::now();
    client.start(now).unwrap();

    // Only the DM address arrives before the finish.
    client.handle_request(
        now,
        &tlv_write(
            Uri::instance(0, 0),
            &[
                TlvRecord::resource(0, &Value::String("coaps://dm.example:5684".into())).unwrap(),
                TlvRecord::resource(1, &Value::Bool(false)).unwrap(),
            ],
        ),
    );

    assert!(client.bootstrap_finish(now).is_err());
    assert_eq!(client.ctx.session.state(), SessionState::Bootstrapping);
    // Staged bytes survive so later writes can complete the set.
    assert!(!client.ctx.staging.is_empty());
}

#[test_log::test]
fn test_dm_session_cannot_touch_security_object() {
    let mut client = make_client(dm_provisioned_store());
    let now = Instant::now();
    client.start(now).unwrap();
    client.reply_success(now, Some("/rd/1"));
    assert_eq!(client.ctx.session.state(), SessionState::Registered);

    // Reads of key material are rejected outside a bootstrap session.
    let response = client.handle_request(now, &Request::new(Operation::Read, Uri::resource(0, 0, 3)));
    let response = response.response().unwrap();
    assert_eq!(response.code, ResponseCode::NotFound);

    // Writes are rejected the same way.
    let outcome = client.handle_request(
        now,
        &tlv_write(
            Uri::instance(0, 0),
            &[TlvRecord::resource(5, &Value::Opaque(vec![0xEE; 16])).unwrap()],
        ),
    );
    assert_eq!(outcome.response().unwrap().code, ResponseCode::NotFound);
}
