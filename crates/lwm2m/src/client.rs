//! The client facade: one value owning the registry and every component.
//!
//! The embedder drives this from a single task: decoded requests go into
//! [`Lwm2mClient::handle_request`], timers into [`Lwm2mClient::tick`], and
//! transport/download callbacks into their methods. There is no global
//! state; everything lives in this instance.

use std::time::Instant;

use lwm2m_msg::{Notification, Request};
use lwm2m_tlv::TlvRecord;

use crate::credentials::{BootstrapStaging, CredentialStore};
use crate::device::{DeviceInfo, PackageVerifier};
use crate::dispatch::{self, DispatchOutcome};
use crate::event::{Event, EventBus};
use crate::objects;
use crate::registry::Registry;
use crate::session::{SessionAction, SessionManager};
use crate::status::HandlerResult;
use crate::storage::ConfigStore;
use crate::transfer::{FileTransferEngine, TransferDirection};
use crate::update::{UpdateConfig, UpdateEngine, UpdateKind};
use crate::Result;

/// Static client configuration.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Endpoint name presented at registration.
    pub endpoint_name: String,
    pub update: UpdateConfig,
}

impl ClientConfig {
    pub fn new(endpoint_name: &str) -> ClientConfig {
        ClientConfig {
            endpoint_name: endpoint_name.to_owned(),
            update: UpdateConfig::default(),
        }
    }
}

/// Shared state reachable from every resource handler.
pub struct ClientContext {
    /// Driver-supplied time of the entry point currently executing.
    pub now: Instant,
    pub credentials: CredentialStore,
    pub staging: BootstrapStaging,
    pub session: SessionManager,
    pub update: UpdateEngine,
    pub transfer: FileTransferEngine,
    pub events: EventBus,
    pub device: Box<dyn DeviceInfo>,
    pub store: Box<dyn ConfigStore>,
    pub verifier: Box<dyn PackageVerifier>,
}

/// The LwM2M client.
pub struct Lwm2mClient {
    pub registry: Registry,
    pub ctx: ClientContext,
}

impl Lwm2mClient {
    /// Builds the client: loads persisted state, registers the standard
    /// objects, and restores any interrupted download.
    pub fn new(
        config: ClientConfig,
        device: Box<dyn DeviceInfo>,
        verifier: Box<dyn PackageVerifier>,
        mut store: Box<dyn ConfigStore>,
    ) -> Result<Lwm2mClient> {
        let mut events = EventBus::new();
        let credentials = CredentialStore::load(store.as_mut())?;
        let mut update = UpdateEngine::new(config.update);
        update.load(store.as_mut(), &mut events)?;
        let mut transfer = FileTransferEngine::new();
        transfer.load(store.as_mut())?;

        let mut registry = Registry::new();
        objects::register_all(&mut registry)?;

        log::info!(
            "client initialized, endpoint {:?}, credentials {:?}",
            config.endpoint_name,
            credentials.status()
        );

        Ok(Lwm2mClient {
            registry,
            ctx: ClientContext {
                now: Instant::now(),
                credentials,
                staging: BootstrapStaging::new(),
                session: SessionManager::new(&config.endpoint_name),
                update,
                transfer,
                events,
                device,
                store,
                verifier,
            },
        })
    }

    /// Registers an event consumer.
    pub fn subscribe<F: FnMut(&Event) + 'static>(&mut self, consumer: F) {
        self.ctx.events.subscribe(consumer);
    }

    /// Starts the session machinery; call once after subscribing.
    pub fn start(&mut self, now: Instant) -> Result<Vec<SessionAction>> {
        self.ctx.now = now;
        self.ctx.events.publish(Event::Initialized);
        let catalogue = self.registry.catalogue();
        self.ctx
            .session
            .start(&self.ctx.credentials, &mut self.ctx.events, &catalogue, now)
    }

    /// Periodic driver tick: timers, retries, deferred registrations.
    pub fn tick(&mut self, now: Instant) -> Result<Vec<SessionAction>> {
        self.ctx.now = now;
        let catalogue = self.registry.catalogue();
        self.ctx
            .session
            .tick(&self.ctx.credentials, &mut self.ctx.events, &catalogue, now)
    }

    /// Dispatches one decoded server request.
    pub fn handle_request(&mut self, now: Instant, request: &Request) -> DispatchOutcome {
        self.ctx.now = now;
        dispatch::dispatch(&mut self.registry, &mut self.ctx, request)
    }

    /// `Bootstrap-Finish` arrived from the bootstrap server.
    pub fn bootstrap_finish(&mut self, now: Instant) -> Result<()> {
        self.ctx.now = now;
        let ClientContext {
            session,
            staging,
            credentials,
            store,
            events,
            ..
        } = &mut self.ctx;
        session.on_bootstrap_finish(staging, credentials, store.as_mut(), events)
    }

    /// A success reply to the in-flight session request.
    pub fn reply_success(&mut self, now: Instant, location: Option<&str>) {
        self.ctx.now = now;
        self.ctx
            .session
            .on_reply_success(location, &mut self.ctx.events, now);
    }

    /// An error reply (or timeout) to the in-flight session request.
    pub fn reply_failure(&mut self, now: Instant) {
        self.ctx.now = now;
        self.ctx.session.on_reply_failure(&mut self.ctx.events, now);
    }

    /// Starts a clean deregistration.
    pub fn deregister(&mut self, now: Instant) -> Result<Vec<SessionAction>> {
        self.ctx.now = now;
        self.ctx.session.deregister()
    }

    /// Pull-mode download: the fetcher learned the package size.
    pub fn begin_package_download(&mut self, total_bytes: u64) -> HandlerResult<()> {
        let ClientContext {
            update,
            store,
            events,
            ..
        } = &mut self.ctx;
        update.begin_download(store.as_mut(), events, total_bytes)
    }

    /// Pull-mode download: one chunk arrived.
    pub fn package_chunk(&mut self, chunk: &[u8]) -> HandlerResult<()> {
        let ClientContext {
            update,
            store,
            events,
            ..
        } = &mut self.ctx;
        let kind = update.workspace().kind;
        let iid = update.workspace().instance_id;
        update.push_chunk(store.as_mut(), events, kind, iid, chunk)
    }

    /// Pull-mode download: the stream ended; verify the package.
    pub fn finish_package_download(&mut self) -> HandlerResult<()> {
        let ClientContext {
            update,
            store,
            events,
            verifier,
            credentials,
            ..
        } = &mut self.ctx;
        update.end_download(store.as_mut(), events, verifier.as_mut(), credentials)
    }

    /// The platform finished (or failed) installing the package.
    pub fn install_result(&mut self, kind: UpdateKind, success: bool) -> HandlerResult<()> {
        let ClientContext {
            update,
            store,
            events,
            ..
        } = &mut self.ctx;
        update.install_result(store.as_mut(), events, kind, success)
    }

    /// Embedder agreement for a gated download.
    pub fn accept_download(&mut self) -> HandlerResult<()> {
        let ClientContext {
            update,
            store,
            events,
            ..
        } = &mut self.ctx;
        update.accept_download(store.as_mut(), events)
    }

    /// Embedder agreement for a gated install.
    pub fn accept_install(&mut self) -> HandlerResult<()> {
        let ClientContext {
            update,
            store,
            events,
            ..
        } = &mut self.ctx;
        update.accept_install(store.as_mut(), events)
    }

    /// Explicit embedder cancel of the running update workflow; the
    /// equivalent of an empty package-URI write.
    pub fn cancel_download(&mut self) -> HandlerResult<()> {
        let ClientContext {
            update,
            store,
            events,
            ..
        } = &mut self.ctx;
        let kind = update.workspace().kind;
        update.cancel(store.as_mut(), events, kind)
    }

    /// The transport dropped mid-download.
    pub fn download_transport_error(&mut self) -> HandlerResult<()> {
        let ClientContext {
            update,
            store,
            events,
            ..
        } = &mut self.ctx;
        let kind = update.workspace().kind;
        update.transport_error(store.as_mut(), events, kind)
    }

    /// Embedder-initiated file transfer, subject to the stored-file cap.
    pub fn start_file_transfer(
        &mut self,
        name: &[u8],
        class: &[u8],
        direction: TransferDirection,
        hash: &[u8],
    ) -> HandlerResult<()> {
        let stored_files = self
            .registry
            .instance_count(objects::FILE_TRANSFER_OBJECT_ID);
        let ClientContext {
            transfer, store, ..
        } = &mut self.ctx;
        transfer.start_transfer(store.as_mut(), stored_files, name, class, direction, hash)
    }

    /// A resource value changed: re-read it and build the notification
    /// for its observer, if one is registered.
    ///
    /// Notifications carry a per-relation sequence so delivery preserves
    /// observation order.
    pub fn resource_changed(
        &mut self,
        now: Instant,
        oid: u16,
        oiid: u16,
        rid: u16,
    ) -> Option<Notification> {
        self.ctx.now = now;
        let handle = self.registry.find_object(oid)?;
        self.registry.instance(oid, oiid)?.observation(rid)?;
        let read_fn = self.registry.find_resource(handle, rid)?.read?;

        let uri = lwm2m_msg::Uri::resource(oid, oiid, rid);
        let value = read_fn(&mut self.ctx, &self.registry, uri).ok()?;
        let record = TlvRecord::resource(rid, &value).ok()?;
        let payload = TlvRecord::write_all(std::slice::from_ref(&record)).ok()?;

        let instance = self.registry.instance_mut(oid, oiid)?;
        let (token, sequence) = instance.record_value(rid, value)?;
        Some(Notification {
            token,
            sequence,
            content_format: lwm2m_msg::ContentFormat::Tlv,
            payload,
        })
    }
}
