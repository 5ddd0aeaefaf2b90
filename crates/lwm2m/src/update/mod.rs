//! Firmware and software update workflows.
//!
//! The engine owns the persisted workspace and the integrity pipeline.
//! Every mutation persists the workspace before returning, so the
//! single driving task never suspends with a half-written state on
//! disk. Packages arrive either pushed through object 5/9 resource
//! writes (CoAP blocks) or pulled by the embedder from a staged URI.

mod integrity;
mod workspace;

pub use integrity::IntegrityPipeline;
pub use workspace::{
    FwResult, FwState, SwResult, SwState, UpdateKind, UpdateWorkspace, PACKAGE_URI_MAX,
};

use url::Url;

use crate::credentials::{CredentialKind, CredentialStore};
use crate::device::PackageVerifier;
use crate::event::{Event, EventBus};
use crate::status::{CoreStatus, HandlerResult};
use crate::storage::{self, ConfigStore, PACKAGE_WORKSPACE_KEY};

/// Embedder gating of the download/install transitions.
#[derive(Debug, Clone, Copy, Default)]
pub struct UpdateConfig {
    /// Hold new downloads in `WaitDownload` until the embedder agrees.
    pub require_download_agreement: bool,
    /// Hold installs in `WaitInstall` until the embedder agrees.
    pub require_update_agreement: bool,
}

/// The firmware/software update state machines and their workspace.
pub struct UpdateEngine {
    config: UpdateConfig,
    workspace: UpdateWorkspace,
    pipeline: Option<IntegrityPipeline>,
}

impl UpdateEngine {
    pub fn new(config: UpdateConfig) -> UpdateEngine {
        UpdateEngine {
            config,
            workspace: UpdateWorkspace::default(),
            pipeline: None,
        }
    }

    /// Reloads the persisted workspace and, for a download interrupted by
    /// a restart, restores the integrity pipeline from its checkpoints.
    pub fn load(&mut self, store: &mut dyn ConfigStore, events: &mut EventBus) -> crate::Result<()> {
        self.workspace = storage::load_or_reset(store, PACKAGE_WORKSPACE_KEY)?.unwrap_or_default();

        let downloading = self.workspace.fw_state == FwState::Downloading
            || self.workspace.sw_state == SwState::Downloading;
        if downloading {
            match IntegrityPipeline::resume(self.workspace.crc32, &self.workspace.sha1_context) {
                Ok(pipeline) => {
                    log::info!(
                        "resuming download at {}/{} bytes",
                        self.workspace.downloaded,
                        self.workspace.package_size
                    );
                    self.pipeline = Some(pipeline);
                }
                Err(e) => {
                    log::warn!("download not resumable ({e}); reporting transport failure");
                    let kind = self.workspace.kind;
                    self.fail_download(store, events, kind)?;
                }
            }
        }
        Ok(())
    }

    fn persist(&self, store: &mut dyn ConfigStore) -> crate::Result<()> {
        storage::persist(store, PACKAGE_WORKSPACE_KEY, &self.workspace)
    }

    /// Read-only view of the workspace.
    pub fn workspace(&self) -> &UpdateWorkspace {
        &self.workspace
    }

    pub fn fw_state(&self) -> FwState {
        self.workspace.fw_state
    }

    pub fn fw_result(&self) -> FwResult {
        self.workspace.fw_result
    }

    pub fn sw_state(&self) -> SwState {
        self.workspace.sw_state
    }

    pub fn sw_result(&self) -> SwResult {
        self.workspace.sw_result
    }

    pub fn package_uri(&self) -> &[u8] {
        &self.workspace.uri
    }

    pub fn package_name(&self) -> &[u8] {
        &self.workspace.package_name
    }

    pub fn package_version(&self) -> &[u8] {
        &self.workspace.package_version
    }

    pub fn update_supported_objects(&self) -> bool {
        self.workspace.update_supported_objects
    }

    pub fn activation_state(&self) -> bool {
        self.workspace.activated
    }

    fn active(&self, kind: UpdateKind) -> bool {
        match kind {
            UpdateKind::Firmware => self.workspace.fw_state != FwState::Idle,
            UpdateKind::Software => self.workspace.sw_state != SwState::Initial,
            UpdateKind::None => false,
        }
    }

    fn scheme_supported(uri: &str) -> bool {
        Url::parse(uri)
            .map(|u| matches!(u.scheme(), "http" | "https" | "coap" | "coaps"))
            .unwrap_or(false)
    }

    /// Stages a package URI for pull-mode download (object 5/9 resource
    /// "Package URI").
    ///
    /// An empty URI cancels the workflow. Re-writing the current URI
    /// while a download runs is a no-op; a different URI is refused
    /// until the machine is back in its ground state.
    pub fn set_package_uri(
        &mut self,
        store: &mut dyn ConfigStore,
        events: &mut EventBus,
        kind: UpdateKind,
        iid: u16,
        uri: &[u8],
    ) -> HandlerResult<()> {
        if uri.is_empty() {
            return self.cancel(store, events, kind);
        }
        if uri.len() > PACKAGE_URI_MAX {
            return Err(CoreStatus::Overflow);
        }

        if self.active(kind) {
            if self.workspace.uri == uri {
                log::debug!("package URI unchanged; ignoring duplicate write");
                return Err(CoreStatus::AlreadyProcessed);
            }
            return Err(CoreStatus::InvalidState);
        }

        let parsed = std::str::from_utf8(uri).ok().filter(|u| Self::scheme_supported(u));
        if parsed.is_none() {
            log::warn!("rejecting package URI with unsupported syntax/scheme");
            match kind {
                UpdateKind::Firmware => self.workspace.fw_result = FwResult::InvalidUri,
                UpdateKind::Software => self.workspace.sw_result = SwResult::InvalidUri,
                UpdateKind::None => return Err(CoreStatus::InvalidArg),
            }
            self.persist(store).map_err(|e| e.status())?;
            return Ok(());
        }

        self.workspace.kind = kind;
        self.workspace.instance_id = iid;
        self.workspace.uri = uri.to_vec();
        self.workspace.package_size = 0;
        self.workspace.downloaded = 0;
        self.workspace.crc32 = 0;
        self.workspace.sha1_context.clear();
        self.pipeline = Some(IntegrityPipeline::new());

        match kind {
            UpdateKind::Firmware => {
                self.workspace.fw_result = FwResult::Initial;
                if self.config.require_download_agreement {
                    self.workspace.fw_state = FwState::WaitDownload;
                    events.publish(Event::AgreementDownload);
                } else {
                    self.workspace.fw_state = FwState::Downloading;
                }
            }
            UpdateKind::Software => {
                self.workspace.sw_result = SwResult::Downloading;
                self.workspace.sw_state = SwState::Downloading;
            }
            UpdateKind::None => return Err(CoreStatus::InvalidArg),
        }

        self.persist(store).map_err(|e| e.status())?;
        log::info!("package URI staged for {kind:?} download");
        events.publish(Event::PackageDownloadDetails { bytes: 0 });
        Ok(())
    }

    /// Embedder agreement for a gated download.
    pub fn accept_download(
        &mut self,
        store: &mut dyn ConfigStore,
        _events: &mut EventBus,
    ) -> HandlerResult<()> {
        if self.workspace.fw_state != FwState::WaitDownload {
            return Err(CoreStatus::InvalidState);
        }
        self.workspace.fw_state = FwState::Downloading;
        self.persist(store).map_err(|e| e.status())?;
        Ok(())
    }

    /// Announces the total package size once the fetcher learned it.
    pub fn begin_download(
        &mut self,
        store: &mut dyn ConfigStore,
        events: &mut EventBus,
        total_bytes: u64,
    ) -> HandlerResult<()> {
        let downloading = self.workspace.fw_state == FwState::Downloading
            || self.workspace.sw_state == SwState::Downloading;
        if !downloading {
            return Err(CoreStatus::InvalidState);
        }
        self.workspace.package_size = total_bytes;
        self.persist(store).map_err(|e| e.status())?;
        events.publish(Event::PackageDownloadDetails { bytes: total_bytes });
        Ok(())
    }

    /// Accepts one package chunk, pushed (resource write) or pulled.
    ///
    /// An empty chunk on an idle machine is ignored; an empty chunk on an
    /// active one cancels, matching the empty-write semantics of the
    /// package resources.
    pub fn push_chunk(
        &mut self,
        store: &mut dyn ConfigStore,
        events: &mut EventBus,
        kind: UpdateKind,
        iid: u16,
        chunk: &[u8],
    ) -> HandlerResult<()> {
        if chunk.is_empty() {
            if self.active(kind) {
                return self.cancel(store, events, kind);
            }
            return Ok(());
        }

        if !self.active(kind) {
            // Push mode: the first block opens the workflow.
            self.workspace.kind = kind;
            self.workspace.instance_id = iid;
            self.workspace.uri.clear();
            self.workspace.package_size = 0;
            self.workspace.downloaded = 0;
            self.pipeline = Some(IntegrityPipeline::new());
            match kind {
                UpdateKind::Firmware => {
                    self.workspace.fw_state = FwState::Downloading;
                    self.workspace.fw_result = FwResult::Initial;
                }
                UpdateKind::Software => {
                    self.workspace.sw_state = SwState::Downloading;
                    self.workspace.sw_result = SwResult::Downloading;
                }
                UpdateKind::None => return Err(CoreStatus::InvalidArg),
            }
        }

        let downloading = match kind {
            UpdateKind::Firmware => self.workspace.fw_state == FwState::Downloading,
            UpdateKind::Software => self.workspace.sw_state == SwState::Downloading,
            UpdateKind::None => false,
        };
        if !downloading {
            return Err(CoreStatus::InvalidState);
        }

        let pipeline = self.pipeline.as_mut().ok_or(CoreStatus::InvalidState)?;
        pipeline.update(chunk);
        self.workspace.downloaded += chunk.len() as u64;
        self.workspace.crc32 = pipeline.crc32();
        self.workspace.sha1_context = pipeline.sha1_context();
        // Checkpoint before the task may suspend again.
        self.persist(store).map_err(|e| e.status())?;

        if self.workspace.package_size > 0 {
            events.publish(Event::DownloadProgress {
                percent: self.workspace.progress_percent(),
            });
        }
        Ok(())
    }

    /// Completes the download: finalizes the digests and checks the
    /// package signature against the stored public key.
    pub fn end_download(
        &mut self,
        store: &mut dyn ConfigStore,
        events: &mut EventBus,
        verifier: &mut dyn PackageVerifier,
        credentials: &CredentialStore,
    ) -> HandlerResult<()> {
        let kind = self.workspace.kind;
        let downloading = match kind {
            UpdateKind::Firmware => self.workspace.fw_state == FwState::Downloading,
            UpdateKind::Software => self.workspace.sw_state == SwState::Downloading,
            UpdateKind::None => false,
        };
        if !downloading {
            return Err(CoreStatus::InvalidState);
        }

        if self.workspace.package_size > 0
            && self.workspace.downloaded != self.workspace.package_size
        {
            log::warn!(
                "download ended short: {}/{} bytes",
                self.workspace.downloaded,
                self.workspace.package_size
            );
            self.fail_download(store, events, kind)
                .map_err(|e| e.status())?;
            return Ok(());
        }

        let pipeline = self.pipeline.take().ok_or(CoreStatus::InvalidState)?;
        let digest = pipeline.finalize();
        let key_kind = match kind {
            UpdateKind::Firmware => CredentialKind::FwPublicKey,
            UpdateKind::Software => CredentialKind::SwPublicKey,
            UpdateKind::None => return Err(CoreStatus::InvalidState),
        };
        let key = credentials.get(key_kind, 0).unwrap_or(&[]);

        match verifier.verify_package(kind, &digest, key) {
            Ok(()) => {
                match kind {
                    UpdateKind::Firmware => self.workspace.fw_state = FwState::Downloaded,
                    UpdateKind::Software => {
                        self.workspace.sw_state = SwState::Delivered;
                        self.workspace.sw_result = SwResult::DownloadedVerified;
                    }
                    UpdateKind::None => unreachable!(),
                }
                self.workspace.sha1_context.clear();
                self.persist(store).map_err(|e| e.status())?;
                log::info!("package certification passed");
                events.publish(Event::PackageCertificationOk);
                events.publish(Event::PackageDownloadFinished);
                Ok(())
            }
            Err(_) => {
                log::warn!("package certification failed");
                match kind {
                    UpdateKind::Firmware => {
                        self.workspace.fw_state = FwState::Idle;
                        self.workspace.fw_result = FwResult::VerifyFailed;
                    }
                    UpdateKind::Software => {
                        self.workspace.sw_state = SwState::Initial;
                        self.workspace.sw_result = SwResult::CheckFailure;
                    }
                    UpdateKind::None => unreachable!(),
                }
                self.clear_transfer_state();
                self.persist(store).map_err(|e| e.status())?;
                events.publish(Event::PackageCertificationNotOk);
                events.publish(Event::PackageDownloadFailed);
                Ok(())
            }
        }
    }

    /// Server-initiated install (EXECUTE on /5/x/2 or /9/x/4).
    pub fn launch_update(
        &mut self,
        store: &mut dyn ConfigStore,
        events: &mut EventBus,
        kind: UpdateKind,
        _iid: u16,
    ) -> HandlerResult<()> {
        match kind {
            UpdateKind::Firmware => {
                if self.workspace.fw_state != FwState::Downloaded {
                    return Err(CoreStatus::InvalidState);
                }
                if self.config.require_update_agreement {
                    self.workspace.fw_state = FwState::WaitInstall;
                    self.persist(store).map_err(|e| e.status())?;
                    events.publish(Event::AgreementUpdate);
                } else {
                    self.workspace.fw_state = FwState::Updating;
                    self.persist(store).map_err(|e| e.status())?;
                    events.publish(Event::UpdateStarted);
                }
                Ok(())
            }
            UpdateKind::Software => {
                if self.workspace.sw_state != SwState::Delivered {
                    return Err(CoreStatus::InvalidState);
                }
                self.workspace.sw_state = SwState::WaitInstallResult;
                self.persist(store).map_err(|e| e.status())?;
                events.publish(Event::UpdateStarted);
                Ok(())
            }
            UpdateKind::None => Err(CoreStatus::InvalidArg),
        }
    }

    /// Embedder agreement for a gated install.
    pub fn accept_install(
        &mut self,
        store: &mut dyn ConfigStore,
        events: &mut EventBus,
    ) -> HandlerResult<()> {
        if self.workspace.fw_state != FwState::WaitInstall {
            return Err(CoreStatus::InvalidState);
        }
        self.workspace.fw_state = FwState::Updating;
        self.persist(store).map_err(|e| e.status())?;
        events.publish(Event::UpdateStarted);
        Ok(())
    }

    /// Platform verdict after the install ran.
    pub fn install_result(
        &mut self,
        store: &mut dyn ConfigStore,
        events: &mut EventBus,
        kind: UpdateKind,
        success: bool,
    ) -> HandlerResult<()> {
        match kind {
            UpdateKind::Firmware => {
                if !matches!(
                    self.workspace.fw_state,
                    FwState::Updating | FwState::WaitInstallResult
                ) {
                    return Err(CoreStatus::InvalidState);
                }
                self.workspace.fw_state = FwState::Idle;
                self.workspace.fw_result = if success {
                    FwResult::Success
                } else {
                    FwResult::InstallFailed
                };
                self.clear_transfer_state();
                self.persist(store).map_err(|e| e.status())?;
                events.publish(if success {
                    Event::UpdateFinished
                } else {
                    Event::UpdateFailed
                });
                Ok(())
            }
            UpdateKind::Software => {
                if self.workspace.sw_state != SwState::WaitInstallResult {
                    return Err(CoreStatus::InvalidState);
                }
                if success {
                    self.workspace.sw_state = SwState::Installed;
                    self.workspace.sw_result = SwResult::Installed;
                } else {
                    self.workspace.sw_state = SwState::Delivered;
                    self.workspace.sw_result = SwResult::InstallFailure;
                }
                self.persist(store).map_err(|e| e.status())?;
                events.publish(if success {
                    Event::UpdateFinished
                } else {
                    Event::UpdateFailed
                });
                Ok(())
            }
            UpdateKind::None => Err(CoreStatus::InvalidArg),
        }
    }

    /// Uninstalls an installed software package (EXECUTE on /9/x/6).
    pub fn launch_uninstall(
        &mut self,
        store: &mut dyn ConfigStore,
        _iid: u16,
    ) -> HandlerResult<()> {
        if self.workspace.sw_state != SwState::Installed {
            return Err(CoreStatus::InvalidState);
        }
        self.workspace.sw_state = SwState::Initial;
        self.workspace.sw_result = SwResult::Initial;
        self.workspace.activated = false;
        self.workspace.package_name.clear();
        self.workspace.package_version.clear();
        self.persist(store).map_err(|e| e.status())?;
        log::info!("software package uninstalled");
        Ok(())
    }

    /// Activates installed software (EXECUTE on /9/x/10).
    pub fn activate(&mut self, store: &mut dyn ConfigStore) -> HandlerResult<()> {
        if self.workspace.sw_state != SwState::Installed {
            return Err(CoreStatus::InvalidState);
        }
        self.workspace.activated = true;
        self.persist(store).map_err(|e| e.status())
    }

    /// Deactivates installed software (EXECUTE on /9/x/11).
    pub fn deactivate(&mut self, store: &mut dyn ConfigStore) -> HandlerResult<()> {
        if self.workspace.sw_state != SwState::Installed {
            return Err(CoreStatus::InvalidState);
        }
        self.workspace.activated = false;
        self.persist(store).map_err(|e| e.status())
    }

    pub fn set_update_supported_objects(
        &mut self,
        store: &mut dyn ConfigStore,
        enabled: bool,
    ) -> HandlerResult<()> {
        self.workspace.update_supported_objects = enabled;
        self.persist(store).map_err(|e| e.status())
    }

    /// Platform-supplied package identity, filled after metadata parsing.
    pub fn set_package_identity(
        &mut self,
        store: &mut dyn ConfigStore,
        name: &[u8],
        version: &[u8],
    ) -> HandlerResult<()> {
        if name.len() > u8::MAX as usize || version.len() > u8::MAX as usize {
            return Err(CoreStatus::Overflow);
        }
        self.workspace.package_name = name.to_vec();
        self.workspace.package_version = version.to_vec();
        self.persist(store).map_err(|e| e.status())
    }

    /// Aborts the workflow: empty-URI write or an explicit cancel signal.
    pub fn cancel(
        &mut self,
        store: &mut dyn ConfigStore,
        _events: &mut EventBus,
        kind: UpdateKind,
    ) -> HandlerResult<()> {
        match kind {
            UpdateKind::Firmware => {
                let in_flight = matches!(
                    self.workspace.fw_state,
                    FwState::Downloading | FwState::WaitDownload
                );
                self.workspace.fw_state = FwState::Idle;
                self.workspace.fw_result = if in_flight {
                    FwResult::ClientCancelled
                } else {
                    FwResult::Initial
                };
            }
            UpdateKind::Software => {
                self.workspace.sw_state = SwState::Initial;
                self.workspace.sw_result = SwResult::Initial;
            }
            UpdateKind::None => return Err(CoreStatus::InvalidArg),
        }
        self.clear_transfer_state();
        self.persist(store).map_err(|e| e.status())?;
        log::info!("{kind:?} update workflow cancelled");
        Ok(())
    }

    /// Transport failure during an active download.
    pub fn transport_error(
        &mut self,
        store: &mut dyn ConfigStore,
        events: &mut EventBus,
        kind: UpdateKind,
    ) -> HandlerResult<()> {
        if !self.active(kind) {
            return Err(CoreStatus::InvalidState);
        }
        self.fail_download(store, events, kind).map_err(|e| e.status())
    }

    fn fail_download(
        &mut self,
        store: &mut dyn ConfigStore,
        events: &mut EventBus,
        kind: UpdateKind,
    ) -> crate::Result<()> {
        match kind {
            UpdateKind::Firmware | UpdateKind::None => {
                self.workspace.fw_state = FwState::Idle;
                self.workspace.fw_result = FwResult::ConnectionLost;
            }
            UpdateKind::Software => {
                self.workspace.sw_state = SwState::Initial;
                self.workspace.sw_result = SwResult::ConnectionLost;
            }
        }
        self.clear_transfer_state();
        self.persist(store)?;
        events.publish(Event::PackageDownloadFailed);
        Ok(())
    }

    fn clear_transfer_state(&mut self) {
        self.pipeline = None;
        self.workspace.uri.clear();
        self.workspace.package_size = 0;
        self.workspace.downloaded = 0;
        self.workspace.crc32 = 0;
        self.workspace.sha1_context.clear();
    }
}
