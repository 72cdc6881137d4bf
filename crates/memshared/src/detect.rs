//! Change detection over raw segment bytes
//!
//! Decoding a snapshot is the expensive part of a load, so each load first
//! hashes the raw segment bytes and compares against the hash observed at the
//! last successful load or store. An unchanged hash skips the decode
//! entirely. SeaHash is plenty here: the hash only ever answers "same bytes
//! or not", never ordering or integrity.

/// Content hash of a segment's raw bytes.
pub type VersionHash = u64;

/// Tracks the last-observed content hash of a segment.
#[derive(Debug, Default)]
pub struct ChangeDetector {
    last: Option<VersionHash>,
}

impl ChangeDetector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Hash raw segment bytes.
    pub fn hash(bytes: &[u8]) -> VersionHash {
        seahash::hash(bytes)
    }

    /// Whether `current` differs from the last recorded hash.
    ///
    /// A detector that has never observed the segment reports changed, so the
    /// first load always decodes.
    pub fn has_changed(&self, current: VersionHash) -> bool {
        self.last != Some(current)
    }

    /// Record the hash observed at a successful load or store.
    pub fn record(&mut self, hash: VersionHash) {
        self.last = Some(hash);
    }
}
