//! Shared fixtures for the integration tests.

#![allow(dead_code)]

use std::cell::RefCell;
use std::rc::Rc;

use lwm2m::device::{DeviceInfo, PackageVerifier};
use lwm2m::status::{CoreStatus, HandlerResult};
use lwm2m::storage::MemoryStore;
use lwm2m::update::UpdateKind;
use lwm2m::{ClientConfig, ConfigStore, CredentialKind, CredentialStore, Event, Lwm2mClient};

pub const ENDPOINT: &str = "client42";

/// Deterministic device adapter for the tests.
pub struct TestDevice;

impl DeviceInfo for TestDevice {
    fn manufacturer(&mut self) -> HandlerResult<String> {
        Ok("ACME".into())
    }
    fn model_number(&mut self) -> HandlerResult<String> {
        Ok("AC-1000".into())
    }
    fn serial_number(&mut self) -> HandlerResult<String> {
        Ok("SN-0001".into())
    }
    fn firmware_version(&mut self) -> HandlerResult<String> {
        Ok("1.2.3".into())
    }
    fn current_time(&mut self) -> HandlerResult<i64> {
        Ok(1_700_000_000)
    }
    fn set_current_time(&mut self, _epoch: i64) -> HandlerResult<()> {
        Ok(())
    }
    fn battery_level(&mut self) -> HandlerResult<u8> {
        Ok(80)
    }
    fn timezone(&mut self) -> HandlerResult<String> {
        Ok("Europe/Paris".into())
    }
    // utc_offset stays NotImplemented so reads must omit resource 14.
}

/// Verifier that accepts everything.
pub struct AcceptingVerifier;

impl PackageVerifier for AcceptingVerifier {
    fn verify_package(&mut self, _: UpdateKind, _: &[u8; 20], _: &[u8]) -> HandlerResult<()> {
        Ok(())
    }
}

/// Verifier that rejects everything.
pub struct RejectingVerifier;

impl PackageVerifier for RejectingVerifier {
    fn verify_package(&mut self, _: UpdateKind, _: &[u8; 20], _: &[u8]) -> HandlerResult<()> {
        Err(CoreStatus::General)
    }
}

/// A store pre-provisioned with only the bootstrap server address.
pub fn bootstrap_only_store() -> MemoryStore {
    let mut store = MemoryStore::new();
    let mut creds = CredentialStore::new();
    creds
        .set(
            CredentialKind::BsAddress,
            0,
            b"coaps://bs.example:5684".as_slice(),
        )
        .unwrap();
    creds.persist(&mut store).unwrap();
    store
}

/// A store pre-provisioned with full DM credentials.
pub fn dm_provisioned_store() -> MemoryStore {
    let mut store = MemoryStore::new();
    let mut creds = CredentialStore::new();
    creds
        .set(CredentialKind::DmAddress, 1, b"coap://dm.example:5683")
        .unwrap();
    creds
        .set(CredentialKind::DmPskIdentity, 1, b"dm-client42")
        .unwrap();
    creds
        .set(CredentialKind::DmPskSecret, 1, &[0x20; 16])
        .unwrap();
    creds.persist(&mut store).unwrap();
    store
}

/// Builds a client over the given store with the accepting verifier.
pub fn make_client(store: impl ConfigStore + 'static) -> Lwm2mClient {
    Lwm2mClient::new(
        ClientConfig::new(ENDPOINT),
        Box::new(TestDevice),
        Box::new(AcceptingVerifier),
        Box::new(store),
    )
    .unwrap()
}

/// Attaches an event recorder and returns its buffer.
pub fn record_events(client: &mut Lwm2mClient) -> Rc<RefCell<Vec<Event>>> {
    let events = Rc::new(RefCell::new(Vec::new()));
    let sink = events.clone();
    client.subscribe(move |e| sink.borrow_mut().push(*e));
    events
}
