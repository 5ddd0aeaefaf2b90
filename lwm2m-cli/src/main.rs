//! Example Linux client.
//!
//! Wires the client core to the UDP transport and a file-backed store,
//! then drives the session loop until the timeout. The CoAP codec is the
//! remaining integration point: outbound session requests are handed to
//! it where this example logs them.

mod cli;
mod device;
mod store;

use std::process::ExitCode;
use std::time::{Duration, Instant};

use clap::Parser;
use lwm2m::{CredentialKind, Lwm2mClient, SessionAction};
use lwm2m_transport::{make_transport, Lwm2mTransport, TransportConfig};

use cli::Cli;
use device::{LinuxDevice, TrustingVerifier};
use store::FileStore;

fn main() -> ExitCode {
    env_logger::init();
    let args = Cli::parse();

    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("client failed: {e}");
            ExitCode::FAILURE
        }
    }
}

fn run(args: &Cli) -> Result<(), Box<dyn std::error::Error>> {
    let config = args.make_client_config()?;
    let mut store = FileStore::open(args.state_dir.clone())?;

    // First run: seed the bootstrap server address if one was given.
    if let Some(bootstrap) = &args.bootstrap_server {
        let mut credentials = lwm2m::CredentialStore::load(&mut store)?;
        if !credentials.check_present(CredentialKind::BsAddress, 0) {
            credentials.set(CredentialKind::BsAddress, 0, bootstrap.as_bytes())?;
            credentials.persist(&mut store)?;
            log::info!("stored bootstrap server {bootstrap}");
        }
    }

    let mut client = Lwm2mClient::new(
        config,
        Box::new(LinuxDevice {
            imei: args.imei.clone(),
        }),
        Box::new(TrustingVerifier),
        Box::new(store),
    )?;

    client.subscribe(|event| log::info!("event: {event:?}"));

    let mut transport = make_transport(&TransportConfig::Udp)?;
    let started = Instant::now();
    let deadline = started + Duration::from_secs(u64::from(args.timeout));

    let actions = client.start(started)?;
    perform(&mut *transport, actions)?;

    // Single-task drive loop: poll the socket, tick the timers.
    let mut buf = [0u8; 1500];
    while Instant::now() < deadline {
        let now = Instant::now();
        if let Some((len, src)) = transport.poll_recv(&mut buf)? {
            // CoAP decoding plugs in here; see the transport seam docs.
            log::debug!("received {len} bytes from {src}");
        }
        perform(&mut *transport, client.tick(now)?)?;
        std::thread::sleep(Duration::from_millis(50));
    }

    if let Ok(actions) = client.deregister(Instant::now()) {
        perform(&mut *transport, actions)?;
    }
    transport.close()?;
    log::info!("shutting down");
    Ok(())
}

fn perform(
    transport: &mut dyn Lwm2mTransport,
    actions: Vec<SessionAction>,
) -> Result<(), Box<dyn std::error::Error>> {
    for action in actions {
        match action {
            SessionAction::Connect(endpoint) => {
                log::info!("connecting to {endpoint}");
                transport.connect(&endpoint)?;
            }
            SessionAction::Send(request) => {
                // Handed to the CoAP engine in a full integration.
                log::info!("outbound request: {request:?}");
            }
        }
    }
    Ok(())
}
