//! Process-local locking for the load/mutate/store critical section
//!
//! The lock is reentrant and deliberately process-local. It serializes
//! callers inside one process (threads, or several instances sharing a lock
//! via [`crate::SyncOptions::shared_lock`]); it provides **no** mutual
//! exclusion between separate processes attached to the same segment. Two
//! processes storing concurrently race at the byte level and the last full
//! write wins. True cross-process exclusion would need a lock primitive that
//! itself lives in shared memory or an OS-level named lock, which this crate
//! does not attempt.
//!
//! A degraded acquisition (the lock is disabled) never fails the caller: the
//! critical section runs unlocked and the degradation is reported through
//! [`LockMode`] so callers can observe it instead of it being swallowed.

use std::sync::Arc;

use parking_lot::{ReentrantMutex, ReentrantMutexGuard};
use tracing::warn;

/// How a critical section was executed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockMode {
    /// The process-local lock was held for the whole section.
    Synchronized,
    /// The section ran without the lock; concurrent callers in this process
    /// may interleave.
    Unsynchronized,
}

/// Guard for a (possibly degraded) critical section.
///
/// Holds the underlying mutex guard when one was acquired; dropping it ends
/// the critical section.
pub struct LockSection<'a> {
    guard: Option<ReentrantMutexGuard<'a, ()>>,
    mode: LockMode,
}

impl LockSection<'_> {
    pub fn mode(&self) -> LockMode {
        self.mode
    }

    pub fn is_synchronized(&self) -> bool {
        self.guard.is_some()
    }
}

/// Reentrant lock guarding load/mutate/store sequences within one process.
#[derive(Clone)]
pub struct CrossProcessLock {
    inner: Option<Arc<ReentrantMutex<()>>>,
}

impl CrossProcessLock {
    /// Create a lock; `enabled = false` yields a no-op lock whose sections
    /// always report [`LockMode::Unsynchronized`].
    pub fn new(enabled: bool) -> Self {
        Self {
            inner: enabled.then(|| Arc::new(ReentrantMutex::new(()))),
        }
    }

    /// Enter the critical section, blocking until the lock is available.
    ///
    /// With the lock disabled this logs once per call and proceeds unlocked
    /// rather than failing the caller.
    pub fn enter(&self) -> LockSection<'_> {
        match &self.inner {
            Some(mutex) => LockSection {
                guard: Some(mutex.lock()),
                mode: LockMode::Synchronized,
            },
            None => {
                warn!("lock disabled, running critical section unsynchronized");
                LockSection {
                    guard: None,
                    mode: LockMode::Unsynchronized,
                }
            }
        }
    }
}

impl std::fmt::Debug for CrossProcessLock {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CrossProcessLock")
            .field("enabled", &self.inner.is_some())
            .finish()
    }
}
