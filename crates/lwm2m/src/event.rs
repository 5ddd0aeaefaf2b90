//! One-way notification channel from the client core to the embedder.
//!
//! Events are value-typed and self-contained; delivery is synchronous in
//! the single driving task, so consumers must not block.

/// Which kind of session a lifecycle event refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionType {
    Bootstrap,
    DeviceManagement,
}

/// Everything the embedder can learn about the client's progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    /// The client finished construction and loaded its persisted state.
    Initialized,

    /// The embedder should confirm connecting to the server.
    AgreementConnection,
    /// The embedder should confirm starting a package download.
    AgreementDownload,
    /// The embedder should confirm installing a downloaded package.
    AgreementUpdate,

    AuthenticationStarted,
    AuthenticationFailed,

    SessionStarted,
    SessionFailed,
    SessionFinished,
    /// A session of the given kind is beginning.
    SessionTypeStart(SessionType),
    /// No session is active any more.
    SessionInactive,

    /// Package metadata became known.
    PackageDownloadDetails { bytes: u64 },
    PackageDownloadFinished,
    PackageDownloadFailed,

    PackageCertificationOk,
    PackageCertificationNotOk,

    UpdateStarted,
    UpdateFailed,
    UpdateFinished,

    /// The client fell back to bootstrap after losing its registration.
    FallbackStarted,

    DownloadProgress { percent: u8 },
}

/// Single-producer, multi-consumer event fan-out.
pub struct EventBus {
    subscribers: Vec<Box<dyn FnMut(&Event)>>,
}

impl EventBus {
    pub fn new() -> EventBus {
        EventBus {
            subscribers: Vec::new(),
        }
    }

    /// Registers a consumer. Consumers run synchronously and may not block.
    pub fn subscribe<F: FnMut(&Event) + 'static>(&mut self, consumer: F) {
        self.subscribers.push(Box::new(consumer));
    }

    /// Delivers an event to every consumer, best-effort.
    pub fn publish(&mut self, event: Event) {
        log::trace!("event: {event:?}");
        for consumer in &mut self.subscribers {
            consumer(&event);
        }
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}
