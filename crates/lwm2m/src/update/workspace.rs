//! The persisted package-download workspace.
//!
//! The workspace is re-written after every accepted chunk, carrying the
//! running CRC and the serialized SHA-1 context, so a power cycle during
//! a download loses at most the chunk in flight.

use binrw::prelude::*;

/// Which update domain a package belongs to.
#[derive(BinRead, BinWrite, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[brw(repr(u8))]
#[repr(u8)]
pub enum UpdateKind {
    #[default]
    None = 0,
    Firmware = 1,
    Software = 2,
}

/// Firmware update state machine states.
///
/// `WaitDownload`, `WaitInstall` and `WaitInstallResult` gate transitions
/// on embedder agreement and never reach the wire; see
/// [`FwState::reported`].
///
/// Reference: OMA LwM2M object 5, resource 3.
#[derive(BinRead, BinWrite, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[brw(repr(u8))]
#[repr(u8)]
pub enum FwState {
    #[default]
    Idle = 0,
    Downloading = 1,
    Downloaded = 2,
    Updating = 3,
    WaitInstall = 4,
    WaitInstallResult = 5,
    WaitDownload = 6,
}

impl FwState {
    /// The wire value of resource /5/x/3: hidden states map onto the
    /// nearest server-visible state.
    pub fn reported(&self) -> u8 {
        match self {
            FwState::Idle | FwState::WaitDownload => 0,
            FwState::Downloading => 1,
            FwState::Downloaded | FwState::WaitInstall => 2,
            FwState::Updating | FwState::WaitInstallResult => 3,
        }
    }
}

/// Firmware update results, object 5 resource 5.
///
/// `ClientCancelled` is a vendor extension outside the standard range.
#[derive(BinRead, BinWrite, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[brw(repr(u16))]
#[repr(u16)]
pub enum FwResult {
    #[default]
    Initial = 0,
    Success = 1,
    NoStorage = 2,
    OutOfMemory = 3,
    ConnectionLost = 4,
    VerifyFailed = 5,
    UnsupportedPackage = 6,
    InvalidUri = 7,
    InstallFailed = 8,
    UnsupportedProtocol = 9,
    ClientCancelled = 0xF000,
}

/// Software update state machine states, object 9 resource 7.
#[derive(BinRead, BinWrite, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[brw(repr(u8))]
#[repr(u8)]
pub enum SwState {
    #[default]
    Initial = 0,
    Downloading = 1,
    Downloaded = 2,
    Delivered = 3,
    Installed = 4,
    WaitInstallResult = 5,
}

impl SwState {
    /// The wire value of resource /9/x/7; the install-result wait reports
    /// as Delivered.
    pub fn reported(&self) -> u8 {
        match self {
            SwState::WaitInstallResult => 3,
            other => *other as u8,
        }
    }
}

/// Software update results, object 9 resource 9. The failure block lives
/// at 50+, disjoint from the progress values.
#[derive(BinRead, BinWrite, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[brw(repr(u8))]
#[repr(u8)]
pub enum SwResult {
    #[default]
    Initial = 0,
    Downloading = 1,
    Installed = 2,
    DownloadedVerified = 3,
    NotEnoughStorage = 50,
    OutOfMemory = 51,
    ConnectionLost = 52,
    CheckFailure = 53,
    UnsupportedType = 54,
    InvalidUri = 56,
    DeviceError = 57,
    InstallFailure = 58,
    UninstallFailure = 59,
}

pub(crate) const UPDATE_WORKSPACE_VERSION: u16 = 2;

/// Maximum stored package URI length, bytes.
pub const PACKAGE_URI_MAX: usize = 255;

/// Persisted state of the firmware/software update workflow.
#[binrw]
#[brw(big, magic = b"PKGW")]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateWorkspace {
    #[bw(calc = UPDATE_WORKSPACE_VERSION)]
    #[br(temp)]
    #[br(assert(version == UPDATE_WORKSPACE_VERSION))]
    version: u16,

    pub kind: UpdateKind,
    /// Object instance the workflow is bound to.
    pub instance_id: u16,

    pub fw_state: FwState,
    pub fw_result: FwResult,
    pub sw_state: SwState,
    pub sw_result: SwResult,

    pub package_size: u64,
    pub downloaded: u64,
    /// Running CRC32 over the received bytes.
    pub crc32: u32,

    /// Serialized SHA-1 context, restored on reload.
    #[bw(try_calc = sha1_context.len().try_into())]
    #[br(temp)]
    sha1_len: u16,
    #[br(count = sha1_len)]
    pub sha1_context: Vec<u8>,

    #[bw(try_calc = uri.len().try_into())]
    #[br(temp)]
    uri_len: u8,
    #[br(count = uri_len)]
    pub uri: Vec<u8>,

    #[bw(try_calc = package_name.len().try_into())]
    #[br(temp)]
    name_len: u8,
    #[br(count = name_len)]
    pub package_name: Vec<u8>,

    #[bw(try_calc = package_version.len().try_into())]
    #[br(temp)]
    version_len: u8,
    #[br(count = version_len)]
    pub package_version: Vec<u8>,

    #[br(map = |b: u8| b != 0)]
    #[bw(map = |b| u8::from(*b))]
    pub update_supported_objects: bool,

    #[br(map = |b: u8| b != 0)]
    #[bw(map = |b| u8::from(*b))]
    pub activated: bool,
}

impl UpdateWorkspace {
    /// Bytes still expected.
    pub fn remaining(&self) -> u64 {
        self.package_size.saturating_sub(self.downloaded)
    }

    /// Download progress in percent; 0 while the size is unknown.
    pub fn progress_percent(&self) -> u8 {
        if self.package_size == 0 {
            return 0;
        }
        ((self.downloaded * 100) / self.package_size).min(100) as u8
    }

    pub fn uri_str(&self) -> &str {
        std::str::from_utf8(&self.uri).unwrap_or("")
    }
}

impl Default for UpdateWorkspace {
    fn default() -> Self {
        UpdateWorkspace {
            kind: UpdateKind::None,
            instance_id: 0,
            fw_state: FwState::Idle,
            fw_result: FwResult::Initial,
            sw_state: SwState::Initial,
            sw_result: SwResult::Initial,
            package_size: 0,
            downloaded: 0,
            crc32: 0,
            sha1_context: Vec::new(),
            uri: Vec::new(),
            package_name: Vec::new(),
            package_version: Vec::new(),
            update_supported_objects: false,
            activated: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lwm2m_tests::*;

    #[test]
    fn test_reported_states_hide_internals() {
        assert_eq!(FwState::WaitDownload.reported(), 0);
        assert_eq!(FwState::WaitInstall.reported(), 2);
        assert_eq!(FwState::WaitInstallResult.reported(), 3);
        assert_eq!(FwState::Downloaded.reported(), 2);
        assert_eq!(SwState::WaitInstallResult.reported(), 3);
        assert_eq!(SwState::Installed.reported(), 4);
    }

    test_binrw! {
        UpdateWorkspace => default_workspace: UpdateWorkspace::default() =>
        "504b475700020000000000000000000000000000000000000000000000000000000000000000000000"
    }

    #[test]
    fn test_workspace_round_trip() {
        let ws = UpdateWorkspace {
            kind: UpdateKind::Firmware,
            instance_id: 0,
            fw_state: FwState::Downloading,
            fw_result: FwResult::Initial,
            package_size: 1000,
            downloaded: 400,
            crc32: 0xDEADBEEF,
            sha1_context: vec![1, 2, 3, 4],
            uri: b"https://pkg.example/fw.bin".to_vec(),
            package_name: b"fw".to_vec(),
            package_version: b"2.1".to_vec(),
            ..Default::default()
        };
        let mut cursor = std::io::Cursor::new(Vec::new());
        binrw::BinWrite::write_be(&ws, &mut cursor).unwrap();
        let bytes = cursor.into_inner();
        let back =
            <UpdateWorkspace as binrw::BinRead>::read_be(&mut std::io::Cursor::new(&bytes))
                .unwrap();
        assert_eq!(back, ws);
        assert_eq!(back.remaining(), 600);
        assert_eq!(back.progress_percent(), 40);
        assert_eq!(back.uri_str(), "https://pkg.example/fw.bin");
    }

    #[test]
    fn test_version_bump_rejects_old_blob() {
        // Version 1 blob with otherwise plausible bytes.
        let data = decode_hex("504b4757000100");
        assert!(
            <UpdateWorkspace as binrw::BinRead>::read_be(&mut std::io::Cursor::new(&data))
                .is_err()
        );
    }
}
