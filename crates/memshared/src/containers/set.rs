//! Unordered unique collection shared across processes

use std::collections::BTreeSet;

use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::config::SyncOptions;
use crate::engine::{SyncEngine, SyncStats, WriteOutcome};
use crate::error::Result;

/// A set whose members live in a named shared-memory segment.
///
/// Algebraic operations (`union`, `intersection`, `difference`) take a plain
/// [`BTreeSet`] and return a detached result; they never mutate shared state.
/// Use [`SharedSet::extend`] for an in-place union.
pub struct SharedSet<T> {
    engine: SyncEngine<BTreeSet<T>>,
}

impl<T> SharedSet<T>
where
    T: Ord + Clone + Serialize + DeserializeOwned,
{
    /// Open an empty shared set (or attach to an existing one).
    pub fn new(options: SyncOptions) -> Result<Self> {
        Self::with_initial(options, [])
    }

    /// Open a shared set seeded with `initial` (creator only; attachers
    /// adopt the stored state).
    pub fn with_initial(
        options: SyncOptions,
        initial: impl IntoIterator<Item = T>,
    ) -> Result<Self> {
        let engine = SyncEngine::open(&options, initial.into_iter().collect())?;
        Ok(Self { engine })
    }

    /// Add a member; reports whether it was newly inserted.
    pub fn insert(&mut self, value: T) -> Result<WriteOutcome<bool>> {
        self.engine.write(|set| set.insert(value))
    }

    /// Remove a member; reports whether it was present.
    pub fn remove(&mut self, value: &T) -> Result<WriteOutcome<bool>> {
        self.engine.write(|set| set.remove(value))
    }

    pub fn contains(&mut self, value: &T) -> Result<bool> {
        self.engine.read(|set| set.contains(value))
    }

    pub fn len(&mut self) -> Result<usize> {
        self.engine.read(BTreeSet::len)
    }

    pub fn is_empty(&mut self) -> Result<bool> {
        self.engine.read(BTreeSet::is_empty)
    }

    /// A detached copy of the whole set.
    pub fn to_set(&mut self) -> Result<BTreeSet<T>> {
        self.engine.read(Clone::clone)
    }

    /// Members of this set or `other`.
    pub fn union(&mut self, other: &BTreeSet<T>) -> Result<BTreeSet<T>> {
        self.engine
            .read(|set| set.union(other).cloned().collect())
    }

    /// Members of both this set and `other`.
    pub fn intersection(&mut self, other: &BTreeSet<T>) -> Result<BTreeSet<T>> {
        self.engine
            .read(|set| set.intersection(other).cloned().collect())
    }

    /// Members of this set that are not in `other`.
    pub fn difference(&mut self, other: &BTreeSet<T>) -> Result<BTreeSet<T>> {
        self.engine
            .read(|set| set.difference(other).cloned().collect())
    }

    pub fn is_subset(&mut self, other: &BTreeSet<T>) -> Result<bool> {
        self.engine.read(|set| set.is_subset(other))
    }

    pub fn is_superset(&mut self, other: &BTreeSet<T>) -> Result<bool> {
        self.engine.read(|set| set.is_superset(other))
    }

    /// Remove every member.
    pub fn clear(&mut self) -> Result<WriteOutcome<()>> {
        self.engine.write(BTreeSet::clear)
    }

    /// Add every member from `values` (in-place union).
    pub fn extend(&mut self, values: impl IntoIterator<Item = T>) -> Result<WriteOutcome<()>> {
        let values: Vec<_> = values.into_iter().collect();
        self.engine.write(move |set| set.extend(values))
    }

    /// Release the segment; the creator also destroys it.
    pub fn cleanup(self) -> Result<()> {
        self.engine.cleanup()
    }

    pub fn name(&self) -> &str {
        self.engine.name()
    }

    pub fn capacity(&self) -> usize {
        self.engine.capacity()
    }

    pub fn is_creator(&self) -> bool {
        self.engine.is_creator()
    }

    pub fn stats(&self) -> SyncStats {
        self.engine.stats()
    }
}
