//! Container adapters over the synchronization engine
//!
//! Each adapter pairs a plain standard-library collection (the mirror) with
//! the [`SyncEngine`](crate::engine::SyncEngine) and translates its surface
//! into engine reads and writes. The adapters own the container semantics
//! only; acquisition, change detection, locking, and snapshot transfer all
//! live in the engine.
//!
//! Reads take `&mut self` because even a lookup refreshes the mirror from the
//! segment first. Returned values are clones of mirror state: handing out
//! references would pin the mirror across later refreshes.

mod list;
mod map;
mod set;

pub use list::SharedList;
pub use map::SharedMap;
pub use set::SharedSet;
