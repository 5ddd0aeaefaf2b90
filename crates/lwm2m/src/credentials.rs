//! Credential store and the volatile bootstrap staging area.
//!
//! Credentials are keyed by kind and owning server (`server_id` 0 is the
//! bootstrap server). The store serializes into the `bootstrap_param`
//! blob; the staging area mirrors writes made during a bootstrap session
//! and reaches persistent storage only through an all-or-nothing commit.

use binrw::prelude::*;

use crate::storage::{self, ConfigStore, BOOTSTRAP_PARAM_KEY};
use crate::{Error, Result};

/// Size bound of a PSK identity.
pub const PSK_IDENTITY_MAX: usize = 32;
/// Size bound of a PSK secret key.
pub const PSK_SECRET_MAX: usize = 16;
/// Size bound of a public key or certificate.
pub const PUBLIC_KEY_MAX: usize = 1024;
/// Size bound of a server address.
pub const SERVER_ADDR_MAX: usize = 256;

const CREDENTIAL_BLOB_VERSION: u16 = 1;

/// Server id owning bootstrap credentials.
pub const BOOTSTRAP_SERVER_ID: u16 = 0;

/// What a credential is for.
///
/// Reference: OMA-TS-LightweightM2M-V1_0, E.1 (security object keying).
#[derive(BinRead, BinWrite, Debug, Clone, Copy, PartialEq, Eq)]
#[brw(repr(u8))]
#[repr(u8)]
pub enum CredentialKind {
    FwPublicKey = 0,
    SwPublicKey = 1,
    HttpsCertificate = 2,
    BsPskIdentity = 3,
    BsServerPublicKey = 4,
    BsPskSecret = 5,
    BsAddress = 6,
    DmPskIdentity = 7,
    DmServerPublicKey = 8,
    DmPskSecret = 9,
    DmAddress = 10,
}

impl CredentialKind {
    /// Size bound of this kind, bytes.
    pub fn max_len(&self) -> usize {
        match self {
            CredentialKind::BsPskIdentity | CredentialKind::DmPskIdentity => PSK_IDENTITY_MAX,
            CredentialKind::BsPskSecret | CredentialKind::DmPskSecret => PSK_SECRET_MAX,
            CredentialKind::FwPublicKey
            | CredentialKind::SwPublicKey
            | CredentialKind::HttpsCertificate
            | CredentialKind::BsServerPublicKey
            | CredentialKind::DmServerPublicKey => PUBLIC_KEY_MAX,
            CredentialKind::BsAddress | CredentialKind::DmAddress => SERVER_ADDR_MAX,
        }
    }
}

/// Provisioning level derivable from the stored credentials.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CredentialStatus {
    /// Nothing usable stored.
    None,
    /// Only the bootstrap server is reachable.
    BootstrapOnly,
    /// Device-management credentials are in place.
    DmProvisioned,
}

#[binrw]
#[brw(big)]
#[derive(Debug, Clone, PartialEq, Eq)]
struct CredentialRecord {
    kind: CredentialKind,
    server_id: u16,
    #[bw(try_calc = data.len().try_into())]
    #[br(temp)]
    len: u16,
    #[br(count = len)]
    data: Vec<u8>,
}

#[binrw]
#[brw(big, magic = b"LWBP")]
#[derive(Debug, Default, PartialEq, Eq)]
struct CredentialBlob {
    #[bw(calc = CREDENTIAL_BLOB_VERSION)]
    #[br(temp)]
    #[br(assert(version == CREDENTIAL_BLOB_VERSION))]
    version: u16,
    #[bw(try_calc = records.len().try_into())]
    #[br(temp)]
    count: u16,
    #[br(count = count)]
    records: Vec<CredentialRecord>,
}

/// Persistent `(kind, server_id)` → bytes credential map.
#[derive(Debug, Default)]
pub struct CredentialStore {
    records: Vec<CredentialRecord>,
}

impl CredentialStore {
    pub fn new() -> CredentialStore {
        CredentialStore::default()
    }

    /// Loads the store from the `bootstrap_param` blob, starting empty
    /// when the blob is absent or unreadable.
    pub fn load(store: &mut dyn ConfigStore) -> Result<CredentialStore> {
        let blob: Option<CredentialBlob> = storage::load_or_reset(store, BOOTSTRAP_PARAM_KEY)?;
        Ok(CredentialStore {
            records: blob.map(|b| b.records).unwrap_or_default(),
        })
    }

    /// Serializes the store back into the `bootstrap_param` blob.
    pub fn persist(&self, store: &mut dyn ConfigStore) -> Result<()> {
        let blob = CredentialBlob {
            records: self.records.clone(),
        };
        storage::persist(store, BOOTSTRAP_PARAM_KEY, &blob)
    }

    fn position(&self, kind: CredentialKind, server_id: u16) -> Option<usize> {
        self.records
            .iter()
            .position(|r| r.kind == kind && r.server_id == server_id)
    }

    /// Fetches a credential, distinguishing "never provisioned" from
    /// other failures.
    pub fn get(&self, kind: CredentialKind, server_id: u16) -> Result<&[u8]> {
        self.position(kind, server_id)
            .map(|i| self.records[i].data.as_slice())
            .ok_or(Error::NotProvisioned(kind, server_id))
    }

    /// Stores a credential, enforcing the per-kind size bound.
    pub fn set(&mut self, kind: CredentialKind, server_id: u16, data: &[u8]) -> Result<()> {
        if data.len() > kind.max_len() {
            return Err(Error::CredentialOverflow {
                kind,
                len: data.len(),
                max: kind.max_len(),
            });
        }
        match self.position(kind, server_id) {
            Some(i) => self.records[i].data = data.to_vec(),
            None => self.records.push(CredentialRecord {
                kind,
                server_id,
                data: data.to_vec(),
            }),
        }
        Ok(())
    }

    pub fn check_present(&self, kind: CredentialKind, server_id: u16) -> bool {
        self.position(kind, server_id).is_some()
    }

    pub fn delete(&mut self, kind: CredentialKind, server_id: u16) {
        if let Some(i) = self.position(kind, server_id) {
            // Scrub before dropping.
            self.records[i].data.iter_mut().for_each(|b| *b = 0);
            self.records.remove(i);
        }
    }

    /// Compares a server-supplied candidate against the stored value.
    pub fn matches(&self, kind: CredentialKind, server_id: u16, candidate: &[u8]) -> bool {
        self.position(kind, server_id)
            .map(|i| self.records[i].data == candidate)
            .unwrap_or(false)
    }

    fn any_of_kind(&self, kind: CredentialKind) -> Option<&CredentialRecord> {
        self.records.iter().find(|r| r.kind == kind)
    }

    /// Provisioning status derived from the present credentials.
    pub fn status(&self) -> CredentialStatus {
        let dm_ready = self.any_of_kind(CredentialKind::DmAddress).is_some()
            && self.any_of_kind(CredentialKind::DmPskIdentity).is_some()
            && self.any_of_kind(CredentialKind::DmPskSecret).is_some();
        if dm_ready {
            return CredentialStatus::DmProvisioned;
        }
        if self
            .check_present(CredentialKind::BsAddress, BOOTSTRAP_SERVER_ID)
        {
            return CredentialStatus::BootstrapOnly;
        }
        CredentialStatus::None
    }

    /// The DM server address plus its owning server id, when provisioned.
    pub fn dm_server(&self) -> Result<(&[u8], u16)> {
        self.any_of_kind(CredentialKind::DmAddress)
            .map(|r| (r.data.as_slice(), r.server_id))
            .ok_or(Error::NotProvisioned(CredentialKind::DmAddress, 0))
    }
}

/// One security-object instance staged during bootstrap.
#[derive(Debug, Default)]
struct StagedServer {
    oiid: u16,
    /// Value of resource /0/x/1 once the server wrote it.
    bootstrap: bool,
    flag_known: bool,
    uri: Vec<u8>,
    psk_identity: Vec<u8>,
    psk_secret: Vec<u8>,
    server_public_key: Vec<u8>,
    short_server_id: u16,
}

impl StagedServer {
    fn wipe(&mut self) {
        for buf in [
            &mut self.uri,
            &mut self.psk_identity,
            &mut self.psk_secret,
            &mut self.server_public_key,
        ] {
            buf.iter_mut().for_each(|b| *b = 0);
            buf.clear();
        }
        self.short_server_id = 0;
        self.flag_known = false;
        self.bootstrap = false;
    }
}

/// Volatile mirror of bootstrap-written credentials.
///
/// Writes land here while a bootstrap session runs; `commit` flushes to
/// the persistent store only once the three DM slots (address, PSK
/// identity, PSK secret) are all non-empty, then zero-wipes every staged
/// byte. Abort wipes without flushing.
#[derive(Debug, Default)]
pub struct BootstrapStaging {
    servers: Vec<StagedServer>,
}

impl BootstrapStaging {
    pub fn new() -> BootstrapStaging {
        BootstrapStaging::default()
    }

    fn server_mut(&mut self, oiid: u16) -> &mut StagedServer {
        if let Some(i) = self.servers.iter().position(|s| s.oiid == oiid) {
            return &mut self.servers[i];
        }
        self.servers.push(StagedServer {
            oiid,
            ..Default::default()
        });
        self.servers.last_mut().expect("just pushed")
    }

    fn bounded(data: &[u8], kind: CredentialKind) -> Result<Vec<u8>> {
        if data.len() > kind.max_len() {
            return Err(Error::CredentialOverflow {
                kind,
                len: data.len(),
                max: kind.max_len(),
            });
        }
        Ok(data.to_vec())
    }

    pub fn stage_server_uri(&mut self, oiid: u16, uri: &[u8]) -> Result<()> {
        let uri = Self::bounded(uri, CredentialKind::DmAddress)?;
        self.server_mut(oiid).uri = uri;
        Ok(())
    }

    pub fn stage_bootstrap_flag(&mut self, oiid: u16, bootstrap: bool) {
        let server = self.server_mut(oiid);
        server.bootstrap = bootstrap;
        server.flag_known = true;
    }

    pub fn stage_psk_identity(&mut self, oiid: u16, identity: &[u8]) -> Result<()> {
        let identity = Self::bounded(identity, CredentialKind::DmPskIdentity)?;
        self.server_mut(oiid).psk_identity = identity;
        Ok(())
    }

    pub fn stage_psk_secret(&mut self, oiid: u16, secret: &[u8]) -> Result<()> {
        let secret = Self::bounded(secret, CredentialKind::DmPskSecret)?;
        self.server_mut(oiid).psk_secret = secret;
        Ok(())
    }

    pub fn stage_server_public_key(&mut self, oiid: u16, key: &[u8]) -> Result<()> {
        let key = Self::bounded(key, CredentialKind::DmServerPublicKey)?;
        self.server_mut(oiid).server_public_key = key;
        Ok(())
    }

    pub fn stage_short_server_id(&mut self, oiid: u16, id: u16) {
        self.server_mut(oiid).short_server_id = id;
    }

    /// Direct slot write, the credential-store `set` shape.
    ///
    /// Bootstrap kinds land on a staged bootstrap record, DM kinds on a
    /// staged DM record; non-bootstrap credential kinds are rejected.
    pub fn set(&mut self, kind: CredentialKind, data: &[u8]) -> Result<()> {
        use CredentialKind::*;
        let bootstrap = match kind {
            BsPskIdentity | BsPskSecret | BsAddress | BsServerPublicKey => true,
            DmPskIdentity | DmPskSecret | DmAddress | DmServerPublicKey => false,
            other => {
                return Err(Error::InvalidState(format!(
                    "credential kind {other:?} cannot be staged"
                )))
            }
        };
        // Instance ids 0/1 are only a staging convention here.
        let oiid = if bootstrap { 1 } else { 0 };
        self.stage_bootstrap_flag(oiid, bootstrap);
        match kind {
            BsPskIdentity | DmPskIdentity => self.stage_psk_identity(oiid, data),
            BsPskSecret | DmPskSecret => self.stage_psk_secret(oiid, data),
            BsAddress | DmAddress => self.stage_server_uri(oiid, data),
            _ => self.stage_server_public_key(oiid, data),
        }
    }

    fn server(&self, oiid: u16) -> Option<&StagedServer> {
        self.servers.iter().find(|s| s.oiid == oiid)
    }

    /// Staged server URI of a security-object instance.
    pub fn staged_uri(&self, oiid: u16) -> Option<&[u8]> {
        self.server(oiid)
            .map(|s| s.uri.as_slice())
            .filter(|d| !d.is_empty())
    }

    /// Staged PSK identity of a security-object instance.
    pub fn staged_psk_identity(&self, oiid: u16) -> Option<&[u8]> {
        self.server(oiid)
            .map(|s| s.psk_identity.as_slice())
            .filter(|d| !d.is_empty())
    }

    /// Staged PSK secret of a security-object instance.
    pub fn staged_psk_secret(&self, oiid: u16) -> Option<&[u8]> {
        self.server(oiid)
            .map(|s| s.psk_secret.as_slice())
            .filter(|d| !d.is_empty())
    }

    /// Staged bootstrap flag, when the server wrote it.
    pub fn staged_is_bootstrap(&self, oiid: u16) -> Option<bool> {
        self.server(oiid).filter(|s| s.flag_known).map(|s| s.bootstrap)
    }

    /// Staged short server id, when non-zero.
    pub fn staged_short_server_id(&self, oiid: u16) -> Option<u16> {
        self.server(oiid)
            .map(|s| s.short_server_id)
            .filter(|id| *id != 0)
    }

    fn staged(&self, bootstrap: bool) -> Option<&StagedServer> {
        // Prefer a record whose flag the server actually wrote.
        self.servers
            .iter()
            .find(|s| s.flag_known && s.bootstrap == bootstrap)
            .or_else(|| self.servers.iter().find(|s| s.bootstrap == bootstrap))
    }

    /// Reads a staged slot, for the bootstrap-context read path.
    pub fn slot(&self, kind: CredentialKind) -> Option<&[u8]> {
        use CredentialKind::*;
        let bootstrap = matches!(kind, BsPskIdentity | BsPskSecret | BsAddress | BsServerPublicKey);
        let server = self.staged(bootstrap)?;
        let data = match kind {
            BsPskIdentity | DmPskIdentity => &server.psk_identity,
            BsPskSecret | DmPskSecret => &server.psk_secret,
            BsAddress | DmAddress => &server.uri,
            BsServerPublicKey | DmServerPublicKey => &server.server_public_key,
            _ => return None,
        };
        (!data.is_empty()).then_some(data.as_slice())
    }

    /// Whether the three DM slots are all staged.
    pub fn dm_complete(&self) -> bool {
        self.staged(false).is_some_and(|s| {
            !s.uri.is_empty() && !s.psk_identity.is_empty() && !s.psk_secret.is_empty()
        })
    }

    /// Flushes the staged slots into the persistent store, then wipes.
    ///
    /// A partial DM set is an error and writes nothing; the staged bytes
    /// stay so later bootstrap writes can complete the set.
    pub fn commit(
        &mut self,
        credentials: &mut CredentialStore,
        store: &mut dyn ConfigStore,
    ) -> Result<()> {
        if !self.dm_complete() {
            return Err(Error::IncompleteBootstrap);
        }

        if let Some(bs) = self.staged(true) {
            if !bs.uri.is_empty() {
                credentials.set(CredentialKind::BsAddress, BOOTSTRAP_SERVER_ID, &bs.uri)?;
            }
            if !bs.psk_identity.is_empty() {
                credentials.set(
                    CredentialKind::BsPskIdentity,
                    BOOTSTRAP_SERVER_ID,
                    &bs.psk_identity,
                )?;
            }
            if !bs.psk_secret.is_empty() {
                credentials.set(
                    CredentialKind::BsPskSecret,
                    BOOTSTRAP_SERVER_ID,
                    &bs.psk_secret,
                )?;
            }
            if !bs.server_public_key.is_empty() {
                credentials.set(
                    CredentialKind::BsServerPublicKey,
                    BOOTSTRAP_SERVER_ID,
                    &bs.server_public_key,
                )?;
            }
        }

        let dm = self.staged(false).expect("dm_complete checked");
        let server_id = if dm.short_server_id != 0 {
            dm.short_server_id
        } else {
            1
        };
        credentials.set(CredentialKind::DmAddress, server_id, &dm.uri)?;
        credentials.set(CredentialKind::DmPskIdentity, server_id, &dm.psk_identity)?;
        credentials.set(CredentialKind::DmPskSecret, server_id, &dm.psk_secret)?;
        if !dm.server_public_key.is_empty() {
            credentials.set(
                CredentialKind::DmServerPublicKey,
                server_id,
                &dm.server_public_key,
            )?;
        }

        credentials.persist(store)?;
        log::info!("bootstrap credentials committed (dm server {server_id})");
        self.wipe();
        Ok(())
    }

    /// Zero-wipes every staged byte without flushing.
    pub fn wipe(&mut self) {
        for server in &mut self.servers {
            server.wipe();
        }
        self.servers.clear();
    }

    /// Whether anything is staged at all.
    pub fn is_empty(&self) -> bool {
        self.servers.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;

    fn filled_store() -> CredentialStore {
        let mut creds = CredentialStore::new();
        creds
            .set(CredentialKind::BsAddress, 0, b"coaps://bs.example:5684")
            .unwrap();
        creds
    }

    #[test]
    fn test_set_get_delete() {
        let mut creds = filled_store();
        assert_eq!(
            creds.get(CredentialKind::BsAddress, 0).unwrap(),
            b"coaps://bs.example:5684"
        );
        assert!(creds.check_present(CredentialKind::BsAddress, 0));
        creds.delete(CredentialKind::BsAddress, 0);
        assert!(!creds.check_present(CredentialKind::BsAddress, 0));
        assert!(matches!(
            creds.get(CredentialKind::BsAddress, 0),
            Err(Error::NotProvisioned(CredentialKind::BsAddress, 0))
        ));
    }

    #[test]
    fn test_size_bounds() {
        let mut creds = CredentialStore::new();
        assert!(matches!(
            creds.set(CredentialKind::DmPskSecret, 1, &[0u8; 17]),
            Err(Error::CredentialOverflow { .. })
        ));
        assert!(creds.set(CredentialKind::DmPskSecret, 1, &[0u8; 16]).is_ok());
        assert!(matches!(
            creds.set(CredentialKind::DmPskIdentity, 1, &[0u8; 33]),
            Err(Error::CredentialOverflow { .. })
        ));
    }

    #[test]
    fn test_matches() {
        let creds = filled_store();
        assert!(creds.matches(CredentialKind::BsAddress, 0, b"coaps://bs.example:5684"));
        assert!(!creds.matches(CredentialKind::BsAddress, 0, b"coaps://evil.example"));
        assert!(!creds.matches(CredentialKind::DmAddress, 1, b"anything"));
    }

    #[test]
    fn test_status_ladder() {
        let mut creds = CredentialStore::new();
        assert_eq!(creds.status(), CredentialStatus::None);
        creds.set(CredentialKind::BsAddress, 0, b"coap://bs").unwrap();
        assert_eq!(creds.status(), CredentialStatus::BootstrapOnly);
        creds.set(CredentialKind::DmAddress, 1, b"coap://dm").unwrap();
        creds.set(CredentialKind::DmPskIdentity, 1, b"id").unwrap();
        creds.set(CredentialKind::DmPskSecret, 1, &[1; 16]).unwrap();
        assert_eq!(creds.status(), CredentialStatus::DmProvisioned);
    }

    #[test]
    fn test_persist_round_trip() {
        let mut store = MemoryStore::new();
        let mut creds = filled_store();
        creds.set(CredentialKind::DmPskSecret, 1, &[7; 16]).unwrap();
        creds.persist(&mut store).unwrap();

        let reloaded = CredentialStore::load(&mut store).unwrap();
        assert_eq!(
            reloaded.get(CredentialKind::BsAddress, 0).unwrap(),
            b"coaps://bs.example:5684"
        );
        assert_eq!(reloaded.get(CredentialKind::DmPskSecret, 1).unwrap(), &[7; 16]);
    }

    #[test]
    fn test_staging_partial_commit_is_noop() {
        let mut staging = BootstrapStaging::new();
        let mut creds = CredentialStore::new();
        let mut store = MemoryStore::new();

        staging.set(CredentialKind::DmAddress, b"coaps://dm.example:5684").unwrap();
        staging.set(CredentialKind::DmPskIdentity, b"dm-client42").unwrap();
        // PSK secret still missing.
        assert!(matches!(
            staging.commit(&mut creds, &mut store),
            Err(Error::IncompleteBootstrap)
        ));
        assert!(!staging.is_empty());
        assert_eq!(creds.status(), CredentialStatus::None);
        assert_eq!(store.read(BOOTSTRAP_PARAM_KEY).unwrap(), None);
    }

    #[test]
    fn test_staging_full_commit_flushes_and_wipes() {
        let mut staging = BootstrapStaging::new();
        let mut creds = CredentialStore::new();
        let mut store = MemoryStore::new();

        staging.set(CredentialKind::BsAddress, b"coaps://bs.example:5684").unwrap();
        staging.set(CredentialKind::BsPskIdentity, b"client42").unwrap();
        staging
            .set(CredentialKind::BsPskSecret, &(1..=16).collect::<Vec<u8>>())
            .unwrap();
        staging.set(CredentialKind::DmAddress, b"coaps://dm.example:5684").unwrap();
        staging.set(CredentialKind::DmPskIdentity, b"dm-client42").unwrap();
        staging
            .set(CredentialKind::DmPskSecret, &(0x20..0x30).collect::<Vec<u8>>())
            .unwrap();
        assert!(staging.dm_complete());

        staging.commit(&mut creds, &mut store).unwrap();

        assert!(staging.is_empty());
        assert_eq!(creds.status(), CredentialStatus::DmProvisioned);
        for (kind, server_id) in [
            (CredentialKind::BsAddress, 0),
            (CredentialKind::BsPskIdentity, 0),
            (CredentialKind::BsPskSecret, 0),
            (CredentialKind::DmAddress, 1),
            (CredentialKind::DmPskIdentity, 1),
            (CredentialKind::DmPskSecret, 1),
        ] {
            assert!(creds.check_present(kind, server_id), "{kind:?}");
        }
        // Flushed to the persistent blob too.
        assert!(store.read(BOOTSTRAP_PARAM_KEY).unwrap().is_some());
    }

    #[test]
    fn test_staging_abort_wipes() {
        let mut staging = BootstrapStaging::new();
        staging.set(CredentialKind::DmPskIdentity, b"dm-client42").unwrap();
        staging.wipe();
        assert!(staging.is_empty());
        assert_eq!(staging.slot(CredentialKind::DmPskIdentity), None);
    }

    #[test]
    fn test_staged_instance_routing() {
        let mut staging = BootstrapStaging::new();
        // Server writes arrive per security-object instance.
        staging.stage_server_uri(0, b"coaps://dm.example:5684").unwrap();
        staging.stage_bootstrap_flag(0, false);
        staging.stage_psk_identity(0, b"dm-client42").unwrap();
        staging.stage_psk_secret(0, &[9; 16]).unwrap();
        staging.stage_short_server_id(0, 123);

        staging.stage_server_uri(1, b"coaps://bs.example:5684").unwrap();
        staging.stage_bootstrap_flag(1, true);

        assert!(staging.dm_complete());
        assert_eq!(
            staging.slot(CredentialKind::DmAddress).unwrap(),
            b"coaps://dm.example:5684"
        );
        assert_eq!(
            staging.slot(CredentialKind::BsAddress).unwrap(),
            b"coaps://bs.example:5684"
        );

        let mut creds = CredentialStore::new();
        let mut store = MemoryStore::new();
        staging.commit(&mut creds, &mut store).unwrap();
        // DM slots filed under the staged short server id.
        assert!(creds.check_present(CredentialKind::DmAddress, 123));
    }
}
