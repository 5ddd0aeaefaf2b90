//! Keyed-blob persistent storage seam and the versioned-workspace
//! load/store helpers.

use std::collections::BTreeMap;
use std::io::Cursor;

use binrw::{BinRead, BinWrite};

/// Key of the serialized credential store and server parameters.
pub const BOOTSTRAP_PARAM_KEY: &str = "bootstrap_param";
/// Key of the package-download workspace.
pub const PACKAGE_WORKSPACE_KEY: &str = "pkgdwl_workspace";
/// Key of the file-transfer workspace.
pub const FILE_TRANSFER_WORKSPACE_KEY: &str = "file_transfer_workspace";

/// Persistent keyed-blob storage provided by the platform.
pub trait ConfigStore {
    fn read(&mut self, key: &str) -> crate::Result<Option<Vec<u8>>>;
    fn write(&mut self, key: &str, data: &[u8]) -> crate::Result<()>;
    fn delete(&mut self, key: &str) -> crate::Result<()>;
}

/// Volatile store for tests and transient deployments.
#[derive(Debug, Default)]
pub struct MemoryStore {
    blobs: BTreeMap<String, Vec<u8>>,
}

impl MemoryStore {
    pub fn new() -> MemoryStore {
        MemoryStore::default()
    }
}

impl ConfigStore for MemoryStore {
    fn read(&mut self, key: &str) -> crate::Result<Option<Vec<u8>>> {
        Ok(self.blobs.get(key).cloned())
    }

    fn write(&mut self, key: &str, data: &[u8]) -> crate::Result<()> {
        self.blobs.insert(key.to_owned(), data.to_vec());
        Ok(())
    }

    fn delete(&mut self, key: &str) -> crate::Result<()> {
        self.blobs.remove(key);
        Ok(())
    }
}

/// Loads a versioned blob, deleting it on any parse or version mismatch
/// so the caller re-initializes from defaults.
pub(crate) fn load_or_reset<T>(
    store: &mut dyn ConfigStore,
    key: &str,
) -> crate::Result<Option<T>>
where
    T: for<'a> BinRead<Args<'a> = ()>,
{
    let Some(blob) = store.read(key)? else {
        return Ok(None);
    };
    match T::read_be(&mut Cursor::new(&blob)) {
        Ok(value) => Ok(Some(value)),
        Err(e) => {
            log::warn!("blob {key:?} unreadable ({e}); resetting to defaults");
            store.delete(key)?;
            Ok(None)
        }
    }
}

/// Serializes and stores a versioned blob.
pub(crate) fn persist<T>(store: &mut dyn ConfigStore, key: &str, value: &T) -> crate::Result<()>
where
    T: for<'a> BinWrite<Args<'a> = ()>,
{
    let mut cursor = Cursor::new(Vec::new());
    value
        .write_be(&mut cursor)
        .map_err(|e| crate::Error::Storage(format!("serializing {key:?}: {e}")))?;
    store.write(key, &cursor.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[binrw::binrw]
    #[brw(big, magic = b"TSTB")]
    #[derive(Debug, PartialEq, Eq)]
    struct TestBlob {
        #[bw(calc = 2)]
        #[br(temp)]
        #[br(assert(version == 2))]
        version: u16,
        value: u32,
    }

    #[test]
    fn test_round_trip() {
        let mut store = MemoryStore::new();
        persist(&mut store, "blob", &TestBlob { value: 7 }).unwrap();
        let loaded: Option<TestBlob> = load_or_reset(&mut store, "blob").unwrap();
        assert_eq!(loaded, Some(TestBlob { value: 7 }));
    }

    #[test]
    fn test_version_mismatch_resets() {
        let mut store = MemoryStore::new();
        // Same magic, version 1, truncation-compatible payload.
        store
            .write("blob", &[b'T', b'S', b'T', b'B', 0, 1, 0, 0, 0, 7])
            .unwrap();
        let loaded: Option<TestBlob> = load_or_reset(&mut store, "blob").unwrap();
        assert_eq!(loaded, None);
        // The corrupt blob is gone.
        assert_eq!(store.read("blob").unwrap(), None);
    }

    #[test]
    fn test_missing_blob() {
        let mut store = MemoryStore::new();
        let loaded: Option<TestBlob> = load_or_reset(&mut store, "nope").unwrap();
        assert!(loaded.is_none());
    }
}
