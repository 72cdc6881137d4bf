//! Cross-process shared collections over named shared-memory segments
//!
//! This crate lets independent processes on one host share a mutable map,
//! sequence, or set. State lives in a fixed-capacity named segment as one
//! fully-encoded snapshot; every operation refreshes a process-local mirror
//! from the segment before running and flushes it back after mutating.
//! A content hash over the raw segment bytes skips the decode when nothing
//! changed.
//!
//! ```no_run
//! use memshared::{SharedMap, SyncOptions};
//!
//! # fn main() -> memshared::Result<()> {
//! let mut orders: SharedMap<String, u64> =
//!     SharedMap::new(SyncOptions::new().name("orders").capacity(4096))?;
//! orders.insert("sku-a".into(), 1)?;
//!
//! // Any process opening name "orders" sees the same entries.
//! let mut other: SharedMap<String, u64> =
//!     SharedMap::new(SyncOptions::new().name("orders").capacity(4096))?;
//! assert_eq!(other.get(&"sku-a".into())?, Some(1));
//! # Ok(())
//! # }
//! ```
//!
//! # Known limitations
//!
//! - The lock is **process-local**: it serializes callers within one process
//!   but provides no mutual exclusion between processes. Concurrent stores
//!   from different processes race at the byte level; the last full snapshot
//!   write wins and silently discards the other's update. Mutating
//!   operations report whether they ran locked via
//!   [`engine::WriteOutcome`].
//! - Whole-snapshot replacement only: there are no deltas and no merging.
//! - Segment capacity is fixed at creation. An encode that outgrows it fails
//!   with [`ShareError::CapacityExceeded`]; nothing is truncated.
//! - Teardown is cooperative: the creator's [`SharedMap::cleanup`] (and
//!   siblings) destroys the segment without checking for live attachers.

pub mod codec;
pub mod config;
pub mod containers;
pub mod detect;
pub mod engine;
pub mod error;
pub mod lock;
pub mod segment;

pub use codec::{ProtocolVersion, SnapshotFormat};
pub use config::{DEFAULT_CAPACITY, SyncOptions};
pub use containers::{SharedList, SharedMap, SharedSet};
pub use engine::{SyncEngine, SyncStats, WriteOutcome};
pub use error::{Result, ShareError};
pub use lock::{CrossProcessLock, LockMode};
pub use segment::Segment;
