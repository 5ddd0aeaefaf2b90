//! Session lifecycle: bootstrap, registration, lifetime updates and
//! deregistration.
//!
//! The manager is a pure state machine: server replies and timer ticks go
//! in, [`SessionAction`] values come out, and the embedder's transport
//! performs them. All timing is expressed through `Instant` values passed
//! by the driver, so the machine is deterministic under test.

use std::time::{Duration, Instant};

use lwm2m_msg::{catalogue_link_format, OutboundRequest, RegistrationParams};
use lwm2m_transport::ServerEndpoint;

use crate::credentials::{BootstrapStaging, CredentialStatus, CredentialStore};
use crate::event::{Event, EventBus, SessionType};
use crate::storage::ConfigStore;
use crate::{Error, Result};

/// Default registration lifetime, seconds.
pub const DEFAULT_LIFETIME: u32 = 86400;

/// Registration retry backoff base, seconds; doubled per attempt.
const RETRY_BASE_SECS: u64 = 2;
/// Bounded retry count before the session fails back to idle.
const RETRY_MAX: u32 = 5;

/// Session lifecycle states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Bootstrapping,
    /// Bootstrap finished and credentials committed; registration is next.
    BootstrappedStaged,
    Registering,
    Registered,
    /// A registration update is in flight.
    Updating,
    Deregistering,
}

/// What the embedder's transport must do next.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionAction {
    /// (Re)connect the datagram transport to this endpoint.
    Connect(ServerEndpoint),
    /// Send this request on the connected transport.
    Send(OutboundRequest),
}

#[derive(Debug, Default)]
struct Retry {
    attempt: u32,
    next_at: Option<Instant>,
}

/// Drives bootstrap → registration → update → deregistration.
pub struct SessionManager {
    state: SessionState,
    endpoint_name: String,
    lifetime: u32,
    location: Option<String>,
    next_update_at: Option<Instant>,
    update_requested: bool,
    retry: Retry,
    dm_short_server_id: u16,
    /// Server-controlled notification-storing flag (/1/x/6).
    pub notification_storing: bool,
    /// Default minimum notification period (/1/x/2), seconds.
    pub default_pmin: u32,
    /// Default maximum notification period (/1/x/3), seconds.
    pub default_pmax: u32,
}

impl SessionManager {
    pub fn new(endpoint_name: &str) -> SessionManager {
        SessionManager {
            state: SessionState::Idle,
            endpoint_name: endpoint_name.to_owned(),
            lifetime: DEFAULT_LIFETIME,
            location: None,
            next_update_at: None,
            update_requested: false,
            retry: Retry::default(),
            dm_short_server_id: 1,
            notification_storing: false,
            default_pmin: 0,
            default_pmax: 0,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn lifetime(&self) -> u32 {
        self.lifetime
    }

    pub fn endpoint_name(&self) -> &str {
        &self.endpoint_name
    }

    pub fn registration_location(&self) -> Option<&str> {
        self.location.as_deref()
    }

    pub fn dm_short_server_id(&self) -> u16 {
        self.dm_short_server_id
    }

    /// When the lifetime timer next fires, for test observation.
    pub fn next_update_at(&self) -> Option<Instant> {
        self.next_update_at
    }

    /// Whether bootstrap-context rules apply (credential writes staged,
    /// security-object reads admitted).
    pub fn is_bootstrapping(&self) -> bool {
        self.state == SessionState::Bootstrapping
    }

    /// Kicks the machine off from idle: registers when DM credentials
    /// exist, bootstraps when only the bootstrap server is known.
    pub fn start(
        &mut self,
        credentials: &CredentialStore,
        events: &mut EventBus,
        catalogue: &[(u16, Vec<u16>)],
        _now: Instant,
    ) -> Result<Vec<SessionAction>> {
        if self.state != SessionState::Idle {
            return Err(Error::InvalidState(format!(
                "session already active ({:?})",
                self.state
            )));
        }
        match credentials.status() {
            CredentialStatus::DmProvisioned => self.begin_register(credentials, events, catalogue),
            CredentialStatus::BootstrapOnly => self.begin_bootstrap(credentials, events),
            CredentialStatus::None => Err(Error::NoCredentials),
        }
    }

    fn begin_bootstrap(
        &mut self,
        credentials: &CredentialStore,
        events: &mut EventBus,
    ) -> Result<Vec<SessionAction>> {
        let address = credentials.get(
            crate::credentials::CredentialKind::BsAddress,
            crate::credentials::BOOTSTRAP_SERVER_ID,
        )?;
        let endpoint = ServerEndpoint::parse(std::str::from_utf8(address).map_err(|_| {
            Error::InvalidState("bootstrap address is not valid UTF-8".into())
        })?)?;

        log::info!("starting bootstrap session with {endpoint}");
        self.state = SessionState::Bootstrapping;
        events.publish(Event::AgreementConnection);
        events.publish(Event::SessionTypeStart(SessionType::Bootstrap));
        events.publish(Event::AuthenticationStarted);
        Ok(vec![
            SessionAction::Connect(endpoint),
            SessionAction::Send(OutboundRequest::BootstrapRequest {
                token: rand::random(),
                endpoint: self.endpoint_name.clone(),
            }),
        ])
    }

    fn begin_register(
        &mut self,
        credentials: &CredentialStore,
        events: &mut EventBus,
        catalogue: &[(u16, Vec<u16>)],
    ) -> Result<Vec<SessionAction>> {
        let (address, server_id) = credentials.dm_server()?;
        self.dm_short_server_id = server_id;
        let endpoint = ServerEndpoint::parse(std::str::from_utf8(address).map_err(|_| {
            Error::InvalidState("server address is not valid UTF-8".into())
        })?)?;

        log::info!("registering with {endpoint} as {:?}", self.endpoint_name);
        self.state = SessionState::Registering;
        events.publish(Event::AgreementConnection);
        events.publish(Event::SessionTypeStart(SessionType::DeviceManagement));
        events.publish(Event::AuthenticationStarted);
        let params = RegistrationParams::new(&self.endpoint_name, self.lifetime);
        Ok(vec![
            SessionAction::Connect(endpoint),
            SessionAction::Send(OutboundRequest::Register {
                token: rand::random(),
                query: params.query(),
                catalogue: catalogue_link_format(catalogue),
            }),
        ])
    }

    /// `Bootstrap-Finish` arrived: commit the staged credentials.
    ///
    /// An incomplete DM set keeps the session in `Bootstrapping` so later
    /// writes can complete it; the error propagates for logging.
    pub fn on_bootstrap_finish(
        &mut self,
        staging: &mut BootstrapStaging,
        credentials: &mut CredentialStore,
        store: &mut dyn ConfigStore,
        events: &mut EventBus,
    ) -> Result<()> {
        if self.state != SessionState::Bootstrapping {
            return Err(Error::InvalidState(
                "bootstrap finish outside a bootstrap session".into(),
            ));
        }
        match staging.commit(credentials, store) {
            Ok(()) => {
                self.state = SessionState::BootstrappedStaged;
                events.publish(Event::SessionFinished);
                Ok(())
            }
            Err(e) => {
                log::warn!("bootstrap finish without a complete DM set: {e}");
                Err(e)
            }
        }
    }

    /// Periodic driver tick; returns any traffic that is now due.
    pub fn tick(
        &mut self,
        credentials: &CredentialStore,
        events: &mut EventBus,
        catalogue: &[(u16, Vec<u16>)],
        now: Instant,
    ) -> Result<Vec<SessionAction>> {
        if let Some(retry_at) = self.retry.next_at {
            if now >= retry_at {
                self.retry.next_at = None;
                return self.retry_current(credentials, events, catalogue);
            }
        }

        match self.state {
            SessionState::BootstrappedStaged => self.begin_register(credentials, events, catalogue),
            SessionState::Registered => {
                let due = self.update_requested
                    || self.next_update_at.is_some_and(|at| now >= at);
                if !due {
                    return Ok(Vec::new());
                }
                self.update_requested = false;
                self.begin_update(now)
            }
            _ => Ok(Vec::new()),
        }
    }

    fn begin_update(&mut self, now: Instant) -> Result<Vec<SessionAction>> {
        let location = self
            .location
            .clone()
            .ok_or_else(|| Error::InvalidState("no cached registration location".into()))?;
        log::debug!("registration update to {location}");
        self.state = SessionState::Updating;
        self.arm_lifetime_timer(now);
        Ok(vec![SessionAction::Send(OutboundRequest::RegistrationUpdate {
            token: rand::random(),
            location,
            lifetime: Some(self.lifetime),
        })])
    }

    fn retry_current(
        &mut self,
        credentials: &CredentialStore,
        events: &mut EventBus,
        catalogue: &[(u16, Vec<u16>)],
    ) -> Result<Vec<SessionAction>> {
        log::info!(
            "retrying {:?} (attempt {})",
            self.state,
            self.retry.attempt
        );
        match self.state {
            SessionState::Registering => {
                self.state = SessionState::Idle;
                self.begin_register(credentials, events, catalogue)
            }
            SessionState::Bootstrapping => {
                self.state = SessionState::Idle;
                self.begin_bootstrap(credentials, events)
            }
            SessionState::Updating => {
                self.update_requested = true;
                self.state = SessionState::Registered;
                Ok(Vec::new())
            }
            _ => Ok(Vec::new()),
        }
    }

    /// A success reply for the in-flight request.
    pub fn on_reply_success(
        &mut self,
        location: Option<&str>,
        events: &mut EventBus,
        now: Instant,
    ) {
        self.retry = Retry::default();
        match self.state {
            SessionState::Registering => {
                self.location = location.map(str::to_owned);
                self.state = SessionState::Registered;
                self.arm_lifetime_timer(now);
                log::info!(
                    "registered, location {:?}, lifetime {}s",
                    self.location,
                    self.lifetime
                );
                events.publish(Event::SessionStarted);
            }
            SessionState::Updating => {
                self.state = SessionState::Registered;
                log::debug!("registration update acknowledged");
            }
            SessionState::Deregistering => {
                self.reset();
                log::info!("deregistered");
                events.publish(Event::SessionFinished);
                events.publish(Event::SessionInactive);
            }
            SessionState::Bootstrapping => {
                // Bootstrap-Request acknowledged; the server now writes.
                log::debug!("bootstrap request acknowledged");
            }
            _ => log::warn!("unexpected success reply in {:?}", self.state),
        }
    }

    /// An error reply or a transport failure for the in-flight request.
    /// Retries with bounded exponential backoff, then fails to idle.
    pub fn on_reply_failure(&mut self, events: &mut EventBus, now: Instant) {
        match self.state {
            SessionState::Registering
            | SessionState::Updating
            | SessionState::Bootstrapping => {
                if self.retry.attempt < RETRY_MAX {
                    let delay = RETRY_BASE_SECS << self.retry.attempt;
                    self.retry.attempt += 1;
                    self.retry.next_at = Some(now + Duration::from_secs(delay));
                    log::warn!(
                        "{:?} failed; retry {} in {delay}s",
                        self.state,
                        self.retry.attempt
                    );
                } else {
                    log::error!("{:?} failed after {RETRY_MAX} retries", self.state);
                    if self.state == SessionState::Bootstrapping {
                        events.publish(Event::AuthenticationFailed);
                    } else {
                        // Registration is lost; the embedder may restart the
                        // machine, which falls back to bootstrap when the DM
                        // credentials no longer authenticate.
                        events.publish(Event::FallbackStarted);
                    }
                    self.reset();
                    events.publish(Event::SessionFailed);
                    events.publish(Event::SessionInactive);
                }
            }
            SessionState::Deregistering => {
                // Best effort; drop to idle either way.
                self.reset();
                events.publish(Event::SessionFinished);
                events.publish(Event::SessionInactive);
            }
            _ => log::warn!("failure reply in {:?}", self.state),
        }
    }

    /// Server wrote /1/x/1: adopt the lifetime and re-arm the timer.
    pub fn set_lifetime(&mut self, lifetime: u32, now: Instant) {
        self.lifetime = lifetime;
        if matches!(self.state, SessionState::Registered | SessionState::Updating) {
            self.arm_lifetime_timer(now);
        }
        log::debug!("lifetime set to {lifetime}s");
    }

    /// EXECUTE on /1/x/8: fire a registration update on the next tick.
    pub fn request_update(&mut self) {
        self.update_requested = true;
    }

    /// Starts deregistration from a registered state.
    pub fn deregister(&mut self) -> Result<Vec<SessionAction>> {
        if !matches!(self.state, SessionState::Registered | SessionState::Updating) {
            return Err(Error::InvalidState("not registered".into()));
        }
        let location = self
            .location
            .clone()
            .ok_or_else(|| Error::InvalidState("no cached registration location".into()))?;
        self.state = SessionState::Deregistering;
        log::info!("deregistering from {location}");
        Ok(vec![SessionAction::Send(OutboundRequest::Deregister {
            token: rand::random(),
            location,
        })])
    }

    fn arm_lifetime_timer(&mut self, now: Instant) {
        // Fire at 90% of the lifetime, as the update must land before expiry.
        let delay = Duration::from_secs(u64::from(self.lifetime) * 9 / 10);
        self.next_update_at = Some(now + delay);
    }

    fn reset(&mut self) {
        self.state = SessionState::Idle;
        self.location = None;
        self.next_update_at = None;
        self.update_requested = false;
        self.retry = Retry::default();
    }
}
