use std::sync::{Arc, Mutex};

use sha2::{Digest, Sha256};
use tracing::{debug, info};

use crate::index::{CategorizedIndex, ExclusionConfig, classify};
use crate::snapshot::{SnapshotEntry, VaultSnapshot};

/// SHA-256 over every entry's path (and file mtime) plus the exclusion rules.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheFingerprint(String);

impl CacheFingerprint {
    pub fn compute(snapshot: &VaultSnapshot, exclusion: &ExclusionConfig) -> Self {
        let mut hasher = Sha256::new();
        for entry in snapshot.entries() {
            match entry {
                SnapshotEntry::File { path, stat } => {
                    hasher.update(b"F");
                    hash_field(&mut hasher, path.as_bytes());
                    // Missing mtime contributes the path only, behind its own marker.
                    match stat.modified_ms {
                        Some(ms) => {
                            hasher.update(b"M");
                            hasher.update(ms.to_le_bytes());
                        }
                        None => hasher.update(b"-"),
                    }
                }
                SnapshotEntry::Folder { path } => {
                    hasher.update(b"D");
                    hash_field(&mut hasher, path.as_bytes());
                }
            }
        }
        let exts = serde_json::to_string(exclusion.excluded_extensions()).unwrap_or_default();
        let folders = serde_json::to_string(exclusion.excluded_folders()).unwrap_or_default();
        hasher.update(b"X");
        hash_field(&mut hasher, exts.as_bytes());
        hash_field(&mut hasher, folders.as_bytes());
        Self(hex::encode(hasher.finalize()))
    }

    pub fn as_hex(&self) -> &str {
        &self.0
    }
}

/// Length-prefixed so adjacent fields cannot run into each other.
fn hash_field(hasher: &mut Sha256, bytes: &[u8]) {
    hasher.update((bytes.len() as u64).to_le_bytes());
    hasher.update(bytes);
}

#[derive(Debug, Default)]
struct CacheSlot {
    fingerprint: Option<CacheFingerprint>,
    index: Option<Arc<CategorizedIndex>>,
    rebuilds: u64,
}

/// Returns the same `Arc` until the snapshot or exclusion rules change.
#[derive(Debug, Default)]
pub struct IndexCache {
    slot: Mutex<CacheSlot>,
}

impl IndexCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_index(
        &self,
        snapshot: &VaultSnapshot,
        exclusion: &ExclusionConfig,
    ) -> Arc<CategorizedIndex> {
        self.get_index_tracked(snapshot, exclusion).0
    }

    /// Like [`IndexCache::get_index`], also reporting whether a rebuild happened.
    pub fn get_index_tracked(
        &self,
        snapshot: &VaultSnapshot,
        exclusion: &ExclusionConfig,
    ) -> (Arc<CategorizedIndex>, bool) {
        let fingerprint = CacheFingerprint::compute(snapshot, exclusion);
        let mut slot = self.slot.lock().unwrap_or_else(|e| e.into_inner());

        if slot.fingerprint.as_ref() == Some(&fingerprint) {
            if let Some(index) = &slot.index {
                debug!(fingerprint = %fingerprint.as_hex(), "index cache hit");
                return (Arc::clone(index), false);
            }
        }

        let index = Arc::new(classify(snapshot, exclusion));
        slot.rebuilds += 1;
        info!(
            fingerprint = %fingerprint.as_hex(),
            files = index.filtered_files().len(),
            rebuilds = slot.rebuilds,
            "index rebuilt"
        );
        slot.fingerprint = Some(fingerprint);
        slot.index = Some(Arc::clone(&index));
        (index, true)
    }

    /// Number of times the index has been built.
    pub fn rebuild_count(&self) -> u64 {
        self.slot.lock().unwrap_or_else(|e| e.into_inner()).rebuilds
    }

    pub fn invalidate(&self) {
        let mut slot = self.slot.lock().unwrap_or_else(|e| e.into_inner());
        slot.fingerprint = None;
        slot.index = None;
    }
}
