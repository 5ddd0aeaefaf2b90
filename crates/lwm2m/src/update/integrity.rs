//! Running CRC32 + SHA-1 over the streamed package.
//!
//! Both digests are checkpointed into the persisted workspace after
//! every chunk: the CRC as its running value, the SHA-1 as a serialized
//! context. A reboot mid-download resumes from the last checkpoint.

use crypto_common::hazmat::{SerializableState, SerializedState};
use sha1::{Digest, Sha1};

use crate::{Error, Result};

/// Incremental integrity state of one package download.
pub struct IntegrityPipeline {
    crc: crc32fast::Hasher,
    sha: Sha1,
}

impl IntegrityPipeline {
    /// Fresh pipeline for a new download.
    pub fn new() -> IntegrityPipeline {
        IntegrityPipeline {
            crc: crc32fast::Hasher::new(),
            sha: Sha1::new(),
        }
    }

    /// Rebuilds the pipeline from persisted checkpoints.
    pub fn resume(crc32: u32, sha1_context: &[u8]) -> Result<IntegrityPipeline> {
        let state = SerializedState::<Sha1>::try_from(sha1_context)
            .map_err(|_| Error::Storage("bad SHA-1 context length".into()))?;
        let sha = Sha1::deserialize(&state)
            .map_err(|e| Error::Storage(format!("bad SHA-1 context: {e}")))?;
        Ok(IntegrityPipeline {
            crc: crc32fast::Hasher::new_with_initial(crc32),
            sha,
        })
    }

    /// Feeds one received chunk through both digests.
    pub fn update(&mut self, chunk: &[u8]) {
        self.crc.update(chunk);
        self.sha.update(chunk);
    }

    /// Running CRC32 checkpoint value.
    pub fn crc32(&self) -> u32 {
        self.crc.clone().finalize()
    }

    /// Serialized SHA-1 context checkpoint.
    pub fn sha1_context(&self) -> Vec<u8> {
        self.sha.serialize().to_vec()
    }

    /// Finalizes the SHA-1 digest, consuming the pipeline.
    pub fn finalize(self) -> [u8; 20] {
        self.sha.finalize().into()
    }
}

impl Default for IntegrityPipeline {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAYLOAD: &[u8] = b"The quick brown fox jumps over the lazy dog";

    #[test]
    fn test_known_digests() {
        let mut pipeline = IntegrityPipeline::new();
        pipeline.update(PAYLOAD);
        assert_eq!(pipeline.crc32(), 0x414FA339);
        let digest = pipeline.finalize();
        assert_eq!(
            hex::encode(digest),
            "2fd4e1c67a2d28fced849ee1bb76e7391b93eb12"
        );
    }

    #[test]
    fn test_checkpoint_resume_equals_straight_run() {
        let (head, tail) = PAYLOAD.split_at(17);

        let mut first = IntegrityPipeline::new();
        first.update(head);
        let crc_checkpoint = first.crc32();
        let sha_checkpoint = first.sha1_context();
        drop(first);

        // "Reboot": rebuild from the checkpoints only.
        let mut resumed = IntegrityPipeline::resume(crc_checkpoint, &sha_checkpoint).unwrap();
        resumed.update(tail);
        assert_eq!(resumed.crc32(), 0x414FA339);
        assert_eq!(
            hex::encode(resumed.finalize()),
            "2fd4e1c67a2d28fced849ee1bb76e7391b93eb12"
        );
    }

    #[test]
    fn test_resume_rejects_garbage_context() {
        assert!(IntegrityPipeline::resume(0, &[1, 2, 3]).is_err());
    }
}
