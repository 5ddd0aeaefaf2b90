//! File-transfer workflow (object 33406).
//!
//! Same persisted-workspace discipline as the update engine, with its own
//! state/result/direction domains and a bounded failure-reason string.

use binrw::prelude::*;

use crate::status::{CoreStatus, HandlerResult};
use crate::storage::{self, ConfigStore, FILE_TRANSFER_WORKSPACE_KEY};

/// Fixed maximum number of stored files (object 33406 instances).
pub const FILE_INSTANCE_MAX: u16 = 10;
/// Failure-reason size bound, characters.
pub const FAILURE_REASON_MAX: usize = 128;

/// Failure reason reported when the stored-file cap is hit.
pub const MAX_FILES_REASON: &str = "Maximum number of stored files was reached";

const TRANSFER_WORKSPACE_VERSION: u16 = 1;

/// Transfer state, object 33406.
#[derive(BinRead, BinWrite, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[brw(repr(u8))]
#[repr(u8)]
pub enum TransferState {
    #[default]
    Idle = 0,
    Transferring = 1,
}

/// Transfer result, object 33406.
#[derive(BinRead, BinWrite, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[brw(repr(u8))]
#[repr(u8)]
pub enum TransferResult {
    #[default]
    Initial = 0,
    Success = 1,
    Failure = 2,
}

/// Transfer direction, object 33406.
#[derive(BinRead, BinWrite, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[brw(repr(u8))]
#[repr(u8)]
pub enum TransferDirection {
    #[default]
    Download = 0,
    Upload = 1,
}

/// Persisted state of the file-transfer workflow.
#[binrw]
#[brw(big, magic = b"FTWS")]
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TransferWorkspace {
    #[bw(calc = TRANSFER_WORKSPACE_VERSION)]
    #[br(temp)]
    #[br(assert(version == TRANSFER_WORKSPACE_VERSION))]
    version: u16,

    pub state: TransferState,
    pub result: TransferResult,
    pub direction: TransferDirection,
    /// Progress, percent.
    pub progress: u8,

    #[bw(try_calc = name.len().try_into())]
    #[br(temp)]
    name_len: u8,
    #[br(count = name_len)]
    pub name: Vec<u8>,

    #[bw(try_calc = class.len().try_into())]
    #[br(temp)]
    class_len: u8,
    #[br(count = class_len)]
    pub class: Vec<u8>,

    #[bw(try_calc = hash.len().try_into())]
    #[br(temp)]
    hash_len: u8,
    #[br(count = hash_len)]
    pub hash: Vec<u8>,

    #[bw(try_calc = failure_reason.len().try_into())]
    #[br(temp)]
    reason_len: u8,
    #[br(count = reason_len)]
    pub failure_reason: Vec<u8>,
}

impl TransferWorkspace {
    pub fn failure_reason_str(&self) -> &str {
        std::str::from_utf8(&self.failure_reason).unwrap_or("")
    }
}

/// The file-transfer state machine and its workspace.
pub struct FileTransferEngine {
    workspace: TransferWorkspace,
}

impl FileTransferEngine {
    pub fn new() -> FileTransferEngine {
        FileTransferEngine {
            workspace: TransferWorkspace::default(),
        }
    }

    /// Reloads the persisted workspace, defaulting on version mismatch.
    pub fn load(&mut self, store: &mut dyn ConfigStore) -> crate::Result<()> {
        self.workspace =
            storage::load_or_reset(store, FILE_TRANSFER_WORKSPACE_KEY)?.unwrap_or_default();
        Ok(())
    }

    fn persist(&self, store: &mut dyn ConfigStore) -> crate::Result<()> {
        storage::persist(store, FILE_TRANSFER_WORKSPACE_KEY, &self.workspace)
    }

    pub fn workspace(&self) -> &TransferWorkspace {
        &self.workspace
    }

    pub fn state(&self) -> TransferState {
        self.workspace.state
    }

    pub fn result(&self) -> TransferResult {
        self.workspace.result
    }

    pub fn direction(&self) -> TransferDirection {
        self.workspace.direction
    }

    /// Whether a new transfer may start, recording the cap failure when
    /// the stored-file maximum is already reached.
    pub fn check_transfer_possible(
        &mut self,
        store: &mut dyn ConfigStore,
        stored_files: usize,
    ) -> HandlerResult<bool> {
        if stored_files >= usize::from(FILE_INSTANCE_MAX) {
            log::warn!("file transfer refused: {stored_files} stored files");
            self.workspace.state = TransferState::Idle;
            self.workspace.result = TransferResult::Failure;
            self.workspace.failure_reason = MAX_FILES_REASON.as_bytes().to_vec();
            self.persist(store).map_err(|e| e.status())?;
            return Ok(false);
        }
        Ok(true)
    }

    fn set_field(
        &mut self,
        store: &mut dyn ConfigStore,
        field: fn(&mut TransferWorkspace) -> &mut Vec<u8>,
        data: &[u8],
    ) -> HandlerResult<()> {
        if self.workspace.state == TransferState::Transferring {
            return Err(CoreStatus::InvalidState);
        }
        if data.len() > u8::MAX as usize {
            return Err(CoreStatus::Overflow);
        }
        *field(&mut self.workspace) = data.to_vec();
        self.persist(store).map_err(|e| e.status())
    }

    /// Stages the file name of the next transfer.
    pub fn set_name(&mut self, store: &mut dyn ConfigStore, name: &[u8]) -> HandlerResult<()> {
        self.set_field(store, |w| &mut w.name, name)
    }

    /// Stages the file class of the next transfer.
    pub fn set_class(&mut self, store: &mut dyn ConfigStore, class: &[u8]) -> HandlerResult<()> {
        self.set_field(store, |w| &mut w.class, class)
    }

    /// Stages the expected file hash of the next transfer.
    pub fn set_hash(&mut self, store: &mut dyn ConfigStore, hash: &[u8]) -> HandlerResult<()> {
        self.set_field(store, |w| &mut w.hash, hash)
    }

    /// Begins a transfer using the staged fields, subject to the
    /// stored-file cap.
    pub fn begin(
        &mut self,
        store: &mut dyn ConfigStore,
        stored_files: usize,
        direction: TransferDirection,
    ) -> HandlerResult<()> {
        if self.workspace.state == TransferState::Transferring {
            return Err(CoreStatus::InvalidState);
        }
        if !self.check_transfer_possible(store, stored_files)? {
            return Ok(());
        }

        self.workspace.state = TransferState::Transferring;
        self.workspace.result = TransferResult::Initial;
        self.workspace.direction = direction;
        self.workspace.progress = 0;
        self.workspace.failure_reason.clear();
        self.persist(store).map_err(|e| e.status())?;
        log::info!("file transfer started ({direction:?})");
        Ok(())
    }

    /// Stages the metadata and begins a transfer in one call.
    pub fn start_transfer(
        &mut self,
        store: &mut dyn ConfigStore,
        stored_files: usize,
        name: &[u8],
        class: &[u8],
        direction: TransferDirection,
        hash: &[u8],
    ) -> HandlerResult<()> {
        self.set_name(store, name)?;
        self.set_class(store, class)?;
        self.set_hash(store, hash)?;
        self.begin(store, stored_files, direction)
    }

    /// Progress tick from the embedder's transfer loop.
    pub fn set_progress(&mut self, store: &mut dyn ConfigStore, percent: u8) -> HandlerResult<()> {
        if self.workspace.state != TransferState::Transferring {
            return Err(CoreStatus::InvalidState);
        }
        self.workspace.progress = percent.min(100);
        self.persist(store).map_err(|e| e.status())
    }

    /// Terminal success.
    pub fn complete(&mut self, store: &mut dyn ConfigStore) -> HandlerResult<()> {
        if self.workspace.state != TransferState::Transferring {
            return Err(CoreStatus::InvalidState);
        }
        self.workspace.state = TransferState::Idle;
        self.workspace.result = TransferResult::Success;
        self.workspace.progress = 100;
        self.workspace.failure_reason.clear();
        self.persist(store).map_err(|e| e.status())
    }

    /// Terminal failure with a bounded human-readable reason.
    pub fn fail(&mut self, store: &mut dyn ConfigStore, reason: &str) -> HandlerResult<()> {
        self.workspace.state = TransferState::Idle;
        self.workspace.result = TransferResult::Failure;
        let mut reason = reason.as_bytes().to_vec();
        reason.truncate(FAILURE_REASON_MAX);
        self.workspace.failure_reason = reason;
        self.persist(store).map_err(|e| e.status())
    }
}

impl Default for FileTransferEngine {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;

    #[test]
    fn test_transfer_lifecycle() {
        let mut engine = FileTransferEngine::new();
        let mut store = MemoryStore::new();

        engine
            .start_transfer(
                &mut store,
                2,
                b"log-2026-08.txt",
                b"diagnostics",
                TransferDirection::Upload,
                &[],
            )
            .unwrap();
        assert_eq!(engine.state(), TransferState::Transferring);
        assert_eq!(
            engine.start_transfer(
                &mut store,
                2,
                b"another",
                b"",
                TransferDirection::Upload,
                &[]
            ),
            Err(CoreStatus::InvalidState)
        );

        engine.set_progress(&mut store, 50).unwrap();
        engine.complete(&mut store).unwrap();
        assert_eq!(engine.state(), TransferState::Idle);
        assert_eq!(engine.result(), TransferResult::Success);

        // Survives a reload.
        let mut reloaded = FileTransferEngine::new();
        reloaded.load(&mut store).unwrap();
        assert_eq!(reloaded.result(), TransferResult::Success);
        assert_eq!(reloaded.workspace().name, b"log-2026-08.txt");
    }

    #[test]
    fn test_stored_file_cap() {
        let mut engine = FileTransferEngine::new();
        let mut store = MemoryStore::new();

        engine
            .start_transfer(
                &mut store,
                usize::from(FILE_INSTANCE_MAX),
                b"one-too-many",
                b"",
                TransferDirection::Download,
                &[],
            )
            .unwrap();
        assert_eq!(engine.state(), TransferState::Idle);
        assert_eq!(engine.result(), TransferResult::Failure);
        assert_eq!(
            engine.workspace().failure_reason_str(),
            "Maximum number of stored files was reached"
        );
    }

    #[test]
    fn test_failure_reason_is_bounded() {
        let mut engine = FileTransferEngine::new();
        let mut store = MemoryStore::new();
        engine.fail(&mut store, &"x".repeat(300)).unwrap();
        assert_eq!(engine.workspace().failure_reason.len(), FAILURE_REASON_MAX);
    }
}
