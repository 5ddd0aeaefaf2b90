//! File-backed blob store: one file per key under the state directory.

use std::fs;
use std::io::ErrorKind;
use std::path::PathBuf;

use lwm2m::{ConfigStore, Error};

pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    /// Opens (and creates) the state directory.
    pub fn open(dir: PathBuf) -> Result<FileStore, Error> {
        fs::create_dir_all(&dir)
            .map_err(|e| Error::Storage(format!("creating {}: {e}", dir.display())))?;
        Ok(FileStore { dir })
    }

    fn path(&self, key: &str) -> PathBuf {
        self.dir.join(key)
    }
}

impl ConfigStore for FileStore {
    fn read(&mut self, key: &str) -> lwm2m::Result<Option<Vec<u8>>> {
        match fs::read(self.path(key)) {
            Ok(data) => Ok(Some(data)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(Error::Storage(format!("reading {key}: {e}"))),
        }
    }

    fn write(&mut self, key: &str, data: &[u8]) -> lwm2m::Result<()> {
        // Write-then-rename keeps the blob consistent across a crash.
        let tmp = self.path(&format!("{key}.tmp"));
        fs::write(&tmp, data).map_err(|e| Error::Storage(format!("writing {key}: {e}")))?;
        fs::rename(&tmp, self.path(key))
            .map_err(|e| Error::Storage(format!("renaming {key}: {e}")))
    }

    fn delete(&mut self, key: &str) -> lwm2m::Result<()> {
        match fs::remove_file(self.path(key)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(Error::Storage(format!("deleting {key}: {e}"))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_store_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = FileStore::open(dir.path().to_path_buf()).unwrap();

        assert_eq!(store.read("bootstrap_param").unwrap(), None);
        store.write("bootstrap_param", &[1, 2, 3]).unwrap();
        assert_eq!(store.read("bootstrap_param").unwrap(), Some(vec![1, 2, 3]));

        store.delete("bootstrap_param").unwrap();
        assert_eq!(store.read("bootstrap_param").unwrap(), None);
        // Deleting a missing key is fine.
        store.delete("bootstrap_param").unwrap();
    }
}
