//! The synchronization engine shared by every container adapter
//!
//! The engine owns the local mirror (the live in-process value) and applies
//! one skeleton to every operation:
//!
//! - read: enter the lock, load (decode the segment only if its content hash
//!   moved), delegate to the operation on the mirror.
//! - write: enter the lock, load, apply the mutation to the mirror, store
//!   (re-encode, bounds-check, write the segment, refresh the hash).
//!
//! Container adapters call [`SyncEngine::read`] and [`SyncEngine::write`] and
//! nothing else; none of them re-implements any part of this sequence.
//!
//! The mirror is reconciled with the segment only at those load/store
//! boundaries and never partially. If a store fails (for example the encoded
//! snapshot outgrew the segment) the mirror keeps the mutation but the
//! segment is untouched; the error propagates to the caller.

use std::ops::{Deref, DerefMut};

use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::trace;

use crate::codec::Codec;
use crate::config::SyncOptions;
use crate::detect::ChangeDetector;
use crate::error::Result;
use crate::lock::{CrossProcessLock, LockMode};
use crate::segment::Segment;

/// Counters for loads, decodes, and stores on one engine instance.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncStats {
    /// Load passes executed (one per operation).
    pub loads: u64,
    /// Loads that actually decoded the segment; the rest were short-circuited
    /// by an unchanged content hash.
    pub decodes: u64,
    /// Snapshots written back to the segment.
    pub stores: u64,
    /// Stores that ran without the process-local lock.
    pub degraded_stores: u64,
}

/// Result of a mutating operation: the delegate's return value plus the lock
/// mode the store ran under.
///
/// Derefs to the inner value, so callers that do not care about degradation
/// can use the outcome like the plain result.
#[derive(Debug)]
pub struct WriteOutcome<R> {
    pub value: R,
    pub lock: LockMode,
}

impl<R> WriteOutcome<R> {
    pub fn into_value(self) -> R {
        self.value
    }

    /// Whether the whole load/mutate/store sequence held the lock.
    pub fn is_synchronized(&self) -> bool {
        self.lock == LockMode::Synchronized
    }
}

impl<R> Deref for WriteOutcome<R> {
    type Target = R;

    fn deref(&self) -> &R {
        &self.value
    }
}

impl<R> DerefMut for WriteOutcome<R> {
    fn deref_mut(&mut self) -> &mut R {
        &mut self.value
    }
}

/// Generic synchronization engine over a mirror value of type `T`.
pub struct SyncEngine<T> {
    mirror: T,
    segment: Segment,
    codec: Codec,
    detector: ChangeDetector,
    lock: CrossProcessLock,
    stats: SyncStats,
}

impl<T> SyncEngine<T>
where
    T: Serialize + DeserializeOwned,
{
    /// Acquire the segment for `options` and bring the mirror in sync.
    ///
    /// When this call creates the segment, `initial` becomes the first
    /// snapshot. When it attaches, the segment already holds authoritative
    /// state and `initial` is discarded in favor of a load.
    pub fn open(options: &SyncOptions, initial: T) -> Result<Self> {
        let codec = Codec::new(options.protocol, options.format);
        let name = options.effective_name();
        let first_snapshot = codec.encode(&initial)?;
        let segment = Segment::acquire(
            &name,
            options.capacity,
            options.dir.as_deref(),
            &first_snapshot,
        )?;
        let lock = options
            .lock
            .clone()
            .unwrap_or_else(|| CrossProcessLock::new(options.use_lock));

        let mut engine = Self {
            mirror: initial,
            segment,
            codec,
            detector: ChangeDetector::new(),
            lock,
            stats: SyncStats::default(),
        };

        if engine.segment.is_creator() {
            // The segment holds exactly what the mirror holds.
            engine
                .detector
                .record(ChangeDetector::hash(engine.segment.bytes()));
        } else {
            engine.load()?;
        }
        Ok(engine)
    }

    /// Execute a read-only operation against the freshest observable state.
    pub fn read<R>(&mut self, op: impl FnOnce(&T) -> R) -> Result<R> {
        let lock = self.lock.clone();
        let _section = lock.enter();
        self.load()?;
        Ok(op(&self.mirror))
    }

    /// Execute a mutating operation and flush the result to the segment.
    pub fn write<R>(&mut self, op: impl FnOnce(&mut T) -> R) -> Result<WriteOutcome<R>> {
        let lock = self.lock.clone();
        let section = lock.enter();
        let mode = section.mode();

        self.load()?;
        let value = op(&mut self.mirror);
        self.store()?;
        if mode == LockMode::Unsynchronized {
            self.stats.degraded_stores += 1;
        }
        Ok(WriteOutcome { value, lock: mode })
    }

    /// Release the segment handle; the creator also destroys the segment.
    ///
    /// Consuming the engine makes post-cleanup operations unrepresentable.
    pub fn cleanup(self) -> Result<()> {
        if self.segment.is_creator() {
            self.segment.destroy()
        } else {
            self.segment.close();
            Ok(())
        }
    }

    /// Refresh the mirror from the segment if its content hash moved.
    fn load(&mut self) -> Result<()> {
        self.stats.loads += 1;
        let hash = ChangeDetector::hash(self.segment.bytes());
        if !self.detector.has_changed(hash) {
            trace!("segment {:?} unchanged, skipping decode", self.segment.name());
            return Ok(());
        }
        self.mirror = self.codec.decode(self.segment.bytes())?;
        self.detector.record(hash);
        self.stats.decodes += 1;
        Ok(())
    }

    /// Encode the mirror into the segment and refresh the cached hash.
    fn store(&mut self) -> Result<()> {
        let snapshot = self.codec.encode(&self.mirror)?;
        self.segment.write(&snapshot)?;
        self.detector
            .record(ChangeDetector::hash(self.segment.bytes()));
        self.stats.stores += 1;
        Ok(())
    }

    pub fn name(&self) -> &str {
        self.segment.name()
    }

    pub fn capacity(&self) -> usize {
        self.segment.capacity()
    }

    pub fn is_creator(&self) -> bool {
        self.segment.is_creator()
    }

    pub fn stats(&self) -> SyncStats {
        self.stats
    }
}

impl<T: std::fmt::Debug> std::fmt::Debug for SyncEngine<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyncEngine")
            .field("segment", &self.segment)
            .field("mirror", &self.mirror)
            .field("stats", &self.stats)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ShareError;
    use std::collections::BTreeMap;
    use tempfile::TempDir;

    type Mirror = BTreeMap<String, u64>;

    fn options(dir: &TempDir, name: &str) -> SyncOptions {
        SyncOptions::new().dir(dir.path()).name(name)
    }

    fn open(dir: &TempDir, name: &str) -> SyncEngine<Mirror> {
        SyncEngine::open(&options(dir, name), Mirror::new()).unwrap()
    }

    #[test]
    fn creator_starts_from_initial_value() {
        let dir = TempDir::new().unwrap();
        let mut initial = Mirror::new();
        initial.insert("seed".into(), 9);

        let mut engine = SyncEngine::open(&options(&dir, "seeded"), initial).unwrap();
        assert!(engine.is_creator());
        let len = engine.read(|m| m.len()).unwrap();
        assert_eq!(len, 1);
        // The initial snapshot was recorded, so that read skipped the decode.
        assert_eq!(engine.stats().decodes, 0);
    }

    #[test]
    fn attacher_loads_creator_state_and_ignores_initial() {
        let dir = TempDir::new().unwrap();
        let mut creator = open(&dir, "attach");
        creator.write(|m| m.insert("x".into(), 1)).unwrap();

        let mut ignored = Mirror::new();
        ignored.insert("ignored".into(), 0);
        let mut attacher = SyncEngine::open(&options(&dir, "attach"), ignored).unwrap();

        assert!(!attacher.is_creator());
        let snapshot = attacher.read(Clone::clone).unwrap();
        assert_eq!(snapshot.get("x"), Some(&1));
        assert!(!snapshot.contains_key("ignored"));
    }

    #[test]
    fn repeated_reads_decode_at_most_once() {
        let dir = TempDir::new().unwrap();
        let mut writer = open(&dir, "skip");
        let mut reader = open(&dir, "skip");
        let after_open = reader.stats().decodes;

        for _ in 0..3 {
            reader.read(|m| m.len()).unwrap();
        }
        assert_eq!(reader.stats().decodes, after_open);
        assert_eq!(reader.stats().loads, after_open + 3);

        writer.write(|m| m.insert("k".into(), 1)).unwrap();
        reader.read(|m| m.len()).unwrap();
        reader.read(|m| m.len()).unwrap();
        assert_eq!(reader.stats().decodes, after_open + 1);
    }

    #[test]
    fn writes_flow_between_instances() {
        let dir = TempDir::new().unwrap();
        let mut a = open(&dir, "flow");
        let mut b = open(&dir, "flow");

        a.write(|m| m.insert("x".into(), 1)).unwrap();
        b.write(|m| m.insert("y".into(), 2)).unwrap();

        let merged = a.read(Clone::clone).unwrap();
        assert_eq!(merged.get("x"), Some(&1));
        assert_eq!(merged.get("y"), Some(&2));
    }

    #[test]
    fn write_reports_lock_mode() {
        let dir = TempDir::new().unwrap();
        let mut locked = open(&dir, "locked");
        let outcome = locked.write(|m| m.insert("k".into(), 1)).unwrap();
        assert!(outcome.is_synchronized());
        assert_eq!(outcome.value, None);

        let opts = options(&dir, "unlocked").use_lock(false);
        let mut degraded = SyncEngine::open(&opts, Mirror::new()).unwrap();
        let outcome = degraded.write(|m| m.insert("k".into(), 1)).unwrap();
        assert_eq!(outcome.lock, LockMode::Unsynchronized);
        assert_eq!(degraded.stats().degraded_stores, 1);
    }

    #[test]
    fn overfull_store_fails_without_corrupting_segment() {
        let dir = TempDir::new().unwrap();
        let opts = options(&dir, "cramped").capacity(16);
        let mut engine = SyncEngine::open(&opts, Mirror::new()).unwrap();

        let err = engine
            .write(|m| m.insert("much too long a key".into(), 1))
            .unwrap_err();
        assert!(matches!(err, ShareError::CapacityExceeded { .. }));

        // A sibling still decodes the previous (empty) snapshot.
        let mut other = SyncEngine::open(&options(&dir, "cramped"), Mirror::new()).unwrap();
        assert_eq!(other.read(|m| m.len()).unwrap(), 0);
    }

    #[test]
    fn creator_cleanup_destroys_segment() {
        let dir = TempDir::new().unwrap();
        let mut creator = open(&dir, "teardown");
        creator.write(|m| m.insert("x".into(), 1)).unwrap();
        creator.cleanup().unwrap();

        // The name is free again; the next open starts from scratch.
        let mut fresh = open(&dir, "teardown");
        assert!(fresh.is_creator());
        assert_eq!(fresh.read(|m| m.len()).unwrap(), 0);
    }

    #[test]
    fn attacher_cleanup_leaves_segment_intact() {
        let dir = TempDir::new().unwrap();
        let mut creator = open(&dir, "persist");
        creator.write(|m| m.insert("x".into(), 1)).unwrap();

        let attacher = open(&dir, "persist");
        attacher.cleanup().unwrap();

        let mut another = open(&dir, "persist");
        assert!(!another.is_creator());
        assert_eq!(another.read(|m| m.len()).unwrap(), 1);
    }

    #[test]
    fn shared_lock_is_reentrant_across_instances() {
        let dir = TempDir::new().unwrap();
        let lock = CrossProcessLock::new(true);
        let opts_a = options(&dir, "sharedlock").shared_lock(lock.clone());
        let opts_b = options(&dir, "sharedlock").shared_lock(lock);

        let mut a = SyncEngine::open(&opts_a, Mirror::new()).unwrap();
        let mut b = SyncEngine::open(&opts_b, Mirror::new()).unwrap();

        a.write(|m| m.insert("a".into(), 1)).unwrap();
        b.write(|m| m.insert("b".into(), 2)).unwrap();
        assert_eq!(a.read(|m| m.len()).unwrap(), 2);
    }
}
