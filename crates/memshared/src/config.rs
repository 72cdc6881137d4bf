//! Construction-time configuration for shared containers
//!
//! All knobs the engine honors live here and are fixed per instance. There is
//! no process-global configuration: the lock, the protocol version, and the
//! payload format are all supplied (or defaulted) at construction.

use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use crate::codec::{ProtocolVersion, SnapshotFormat};
use crate::lock::CrossProcessLock;

/// Default segment capacity in bytes (roughly 1 MB).
pub const DEFAULT_CAPACITY: usize = 1_024_000;

/// Options for opening or attaching to a shared segment.
#[derive(Debug, Clone)]
pub struct SyncOptions {
    /// Sync identity shared by every process attaching to the same data.
    ///
    /// When omitted, a time-based name is generated. That keeps the instance
    /// functional but effectively private: no other process will guess the
    /// generated name, so nothing is actually shared.
    pub name: Option<String>,

    /// Segment capacity in bytes, fixed for the lifetime of the segment.
    ///
    /// Only honored when this instance ends up creating the segment; an
    /// attacher adopts the capacity the creator established.
    pub capacity: usize,

    /// Whether the process-local reentrant lock guards each operation.
    pub use_lock: bool,

    /// Protocol version stamped into new snapshot encodes.
    pub protocol: ProtocolVersion,

    /// Payload format for new encodes.
    ///
    /// `Binary` is compact and fits plain data-carrying types. Mirror types
    /// whose deserialization needs a self-describing payload (anything that
    /// deserializes via `deserialize_any`, e.g. untagged enums) should declare
    /// `Text` here instead of relying on the encode-time fallback.
    pub format: SnapshotFormat,

    /// Directory holding the segment backing files.
    ///
    /// Defaults to `/dev/shm` where present, otherwise the system temp
    /// directory. Tests point this at a scratch directory.
    pub dir: Option<PathBuf>,

    /// Lock shared with other instances in this process, if any.
    ///
    /// When absent each instance gets its own lock, which serializes
    /// operations on that instance only.
    pub lock: Option<CrossProcessLock>,
}

impl Default for SyncOptions {
    fn default() -> Self {
        Self {
            name: None,
            capacity: DEFAULT_CAPACITY,
            use_lock: true,
            protocol: ProtocolVersion::CURRENT,
            format: SnapshotFormat::Binary,
            dir: None,
            lock: None,
        }
    }
}

impl SyncOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the shared sync identity.
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Set the segment capacity in bytes.
    pub fn capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }

    /// Enable or disable the process-local lock.
    pub fn use_lock(mut self, use_lock: bool) -> Self {
        self.use_lock = use_lock;
        self
    }

    /// Set the protocol version used for new encodes.
    pub fn protocol(mut self, protocol: ProtocolVersion) -> Self {
        self.protocol = protocol;
        self
    }

    /// Declare the payload format for this container's mirror type.
    pub fn format(mut self, format: SnapshotFormat) -> Self {
        self.format = format;
        self
    }

    /// Override the directory holding segment backing files.
    pub fn dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.dir = Some(dir.into());
        self
    }

    /// Share one lock across several instances in this process.
    pub fn shared_lock(mut self, lock: CrossProcessLock) -> Self {
        self.lock = Some(lock);
        self
    }

    /// Resolve the effective segment name, generating a time-based one when
    /// the caller did not supply an identity.
    pub(crate) fn effective_name(&self) -> String {
        match &self.name {
            Some(name) => name.clone(),
            None => {
                static SEQ: AtomicU64 = AtomicU64::new(0);
                let now = SystemTime::now()
                    .duration_since(UNIX_EPOCH)
                    .unwrap_or_default();
                format!("anon-{}-{}", now.as_nanos(), SEQ.fetch_add(1, Ordering::Relaxed))
            }
        }
    }
}
