//! Firmware download and install, including the reboot-mid-download
//! recovery path.

mod common;

use std::time::Instant;

use common::*;
use lwm2m::msg::{ContentFormat, Operation, Request, ResponseCode, Uri};
use lwm2m::storage::MemoryStore;
use lwm2m::update::{FwResult, FwState, UpdateKind};
use lwm2m::{ClientConfig, ConfigStore, Event, Lwm2mClient};

const PACKAGE: &[u8] = b"firmware-image-payload-0123456789";

fn write_uri(client: &mut Lwm2mClient, now: Instant, uri: &str) -> ResponseCode {
    let request = Request::new(Operation::Write, Uri::resource(5, 0, 1))
        .with_payload(ContentFormat::Text, uri.as_bytes().to_vec());
    client.handle_request(now, &request).response().unwrap().code
}

fn read_int(client: &mut Lwm2mClient, now: Instant, uri: Uri) -> i64 {
    let mut request = Request::new(Operation::Read, uri);
    request.accept = Some(ContentFormat::Text);
    let response = client.handle_request(now, &request);
    let response = response.response().unwrap();
    String::from_utf8_lossy(&response.payload).parse().unwrap()
}

#[test_log::test]
fn test_uri_pull_then_install() {
    let mut client = make_client(dm_provisioned_store());
    let events = record_events(&mut client);
    let now = Instant::now();
    client.start(now).unwrap();
    client.reply_success(now, Some("/rd/1"));

    // Server stages the package URI.
    assert_eq!(
        write_uri(&mut client, now, "https://pkg.example/fw.bin"),
        ResponseCode::Changed
    );
    assert_eq!(client.ctx.update.fw_state(), FwState::Downloading);
    assert_eq!(read_int(&mut client, now, Uri::resource(5, 0, 3)), 1);

    // The embedder fetches: size, chunks, end.
    client.begin_package_download(PACKAGE.len() as u64).unwrap();
    let (a, b) = PACKAGE.split_at(13);
    client.package_chunk(a).unwrap();
    client.package_chunk(b).unwrap();
    client.finish_package_download().unwrap();

    assert_eq!(client.ctx.update.fw_state(), FwState::Downloaded);
    assert_eq!(client.ctx.update.fw_result(), FwResult::Initial);
    assert_eq!(read_int(&mut client, now, Uri::resource(5, 0, 3)), 2);
    assert_eq!(read_int(&mut client, now, Uri::resource(5, 0, 5)), 0);

    // EXECUTE /5/0/2 launches the install.
    let request = Request::new(Operation::Execute, Uri::resource(5, 0, 2));
    assert_eq!(
        client.handle_request(now, &request).response().unwrap().code,
        ResponseCode::Changed
    );
    assert_eq!(client.ctx.update.fw_state(), FwState::Updating);
    assert_eq!(read_int(&mut client, now, Uri::resource(5, 0, 3)), 3);

    // Platform install succeeds.
    client.install_result(UpdateKind::Firmware, true).unwrap();
    assert_eq!(client.ctx.update.fw_state(), FwState::Idle);
    assert_eq!(client.ctx.update.fw_result(), FwResult::Success);
    assert_eq!(read_int(&mut client, now, Uri::resource(5, 0, 5)), 1);

    let events = events.borrow();
    assert!(events.contains(&Event::PackageCertificationOk));
    assert!(events.contains(&Event::PackageDownloadFinished));
    assert!(events.contains(&Event::UpdateStarted));
    assert!(events.contains(&Event::UpdateFinished));
    assert!(events.contains(&Event::DownloadProgress { percent: 100 }));
}

#[test_log::test]
fn test_reboot_mid_download_resumes() {
    // Keep one MemoryStore alive across "reboots" by moving blobs over.
    let mut client = make_client(dm_provisioned_store());
    let now = Instant::now();
    client.start(now).unwrap();
    client.reply_success(now, Some("/rd/1"));

    write_uri(&mut client, now, "https://pkg.example/fw.bin");
    client.begin_package_download(PACKAGE.len() as u64).unwrap();

    // 40% of the bytes arrive, then the device restarts.
    let cut = (PACKAGE.len() * 40) / 100;
    client.package_chunk(&PACKAGE[..cut]).unwrap();
    let crc_before = client.ctx.update.workspace().crc32;
    let sha_before = client.ctx.update.workspace().sha1_context.clone();
    assert_ne!(crc_before, 0);

    // "Reboot": rebuild a client over the surviving storage.
    let survived = rebuild_store(&mut client);
    let mut client = make_client(survived);
    assert_eq!(client.ctx.update.fw_state(), FwState::Downloading);
    assert_eq!(client.ctx.update.workspace().downloaded, cut as u64);
    assert_eq!(client.ctx.update.workspace().crc32, crc_before);
    assert_eq!(client.ctx.update.workspace().sha1_context, sha_before);

    // The remaining bytes complete normally and verification passes,
    // proving the digest context survived the power cycle.
    client.package_chunk(&PACKAGE[cut..]).unwrap();
    client.finish_package_download().unwrap();
    assert_eq!(client.ctx.update.fw_state(), FwState::Downloaded);
}

/// Copies every persisted blob out of a client into a fresh store,
/// simulating storage that outlives the process.
fn rebuild_store(client: &mut Lwm2mClient) -> MemoryStore {
    let mut fresh = MemoryStore::new();
    for key in [
        lwm2m::storage::BOOTSTRAP_PARAM_KEY,
        lwm2m::storage::PACKAGE_WORKSPACE_KEY,
        lwm2m::storage::FILE_TRANSFER_WORKSPACE_KEY,
    ] {
        if let Some(blob) = client.ctx.store.read(key).unwrap() {
            fresh.write(key, &blob).unwrap();
        }
    }
    fresh
}

#[test_log::test]
fn test_same_uri_twice_is_noop_different_uri_refused() {
    let mut client = make_client(dm_provisioned_store());
    let now = Instant::now();
    client.start(now).unwrap();
    client.reply_success(now, Some("/rd/1"));

    write_uri(&mut client, now, "https://pkg.example/fw.bin");
    assert_eq!(client.ctx.update.fw_state(), FwState::Downloading);

    // Same URI again: a no-op reported as success.
    assert_eq!(
        write_uri(&mut client, now, "https://pkg.example/fw.bin"),
        ResponseCode::Changed
    );
    assert_eq!(client.ctx.update.fw_state(), FwState::Downloading);

    // A different URI while downloading: invalid state, 5.03.
    assert_eq!(
        write_uri(&mut client, now, "https://other.example/fw2.bin"),
        ResponseCode::ServiceUnavailable
    );
    assert_eq!(
        client.ctx.update.workspace().uri_str(),
        "https://pkg.example/fw.bin"
    );
}

#[test_log::test]
fn test_verify_failure_reports_and_resets() {
    let mut client = lwm2m::Lwm2mClient::new(
        ClientConfig::new(ENDPOINT),
        Box::new(TestDevice),
        Box::new(RejectingVerifier),
        Box::new(dm_provisioned_store()),
    )
    .unwrap();
    let events = record_events(&mut client);
    let now = Instant::now();
    client.start(now).unwrap();
    client.reply_success(now, Some("/rd/1"));

    write_uri(&mut client, now, "https://pkg.example/fw.bin");
    client.package_chunk(PACKAGE).unwrap();
    client.finish_package_download().unwrap();

    assert_eq!(client.ctx.update.fw_state(), FwState::Idle);
    assert_eq!(client.ctx.update.fw_result(), FwResult::VerifyFailed);
    let events = events.borrow();
    assert!(events.contains(&Event::PackageCertificationNotOk));
    assert!(events.contains(&Event::PackageDownloadFailed));
}

#[test_log::test]
fn test_push_mode_via_package_resource() {
    let mut client = make_client(dm_provisioned_store());
    let now = Instant::now();
    client.start(now).unwrap();
    client.reply_success(now, Some("/rd/1"));

    // Blocks arrive as opaque writes on /5/0/0.
    for chunk in PACKAGE.chunks(8) {
        let request = Request::new(Operation::Write, Uri::resource(5, 0, 0))
            .with_payload(ContentFormat::Opaque, chunk.to_vec());
        assert_eq!(
            client.handle_request(now, &request).response().unwrap().code,
            ResponseCode::Changed
        );
    }
    assert_eq!(client.ctx.update.fw_state(), FwState::Downloading);
    assert_eq!(
        client.ctx.update.workspace().downloaded,
        PACKAGE.len() as u64
    );

    client.finish_package_download().unwrap();
    assert_eq!(client.ctx.update.fw_state(), FwState::Downloaded);
}
