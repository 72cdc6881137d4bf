//! Ordered sequence shared across processes

use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::config::SyncOptions;
use crate::engine::{SyncEngine, SyncStats, WriteOutcome};
use crate::error::Result;

/// A sequence whose elements live in a named shared-memory segment.
///
/// Index-based operations never panic on out-of-range indices: lookups
/// return `None`, insertion positions are clamped to the current length.
pub struct SharedList<T> {
    engine: SyncEngine<Vec<T>>,
}

impl<T> SharedList<T>
where
    T: Clone + Serialize + DeserializeOwned,
{
    /// Open an empty shared list (or attach to an existing one).
    pub fn new(options: SyncOptions) -> Result<Self> {
        Self::with_initial(options, [])
    }

    /// Open a shared list seeded with `initial` (creator only; attachers
    /// adopt the stored state).
    pub fn with_initial(
        options: SyncOptions,
        initial: impl IntoIterator<Item = T>,
    ) -> Result<Self> {
        let engine = SyncEngine::open(&options, initial.into_iter().collect())?;
        Ok(Self { engine })
    }

    /// Append an element.
    pub fn push(&mut self, value: T) -> Result<WriteOutcome<()>> {
        self.engine.write(|list| list.push(value))
    }

    /// Remove and return the last element.
    pub fn pop(&mut self) -> Result<WriteOutcome<Option<T>>> {
        self.engine.write(Vec::pop)
    }

    /// Insert at `index`, clamped to the current length.
    pub fn insert(&mut self, index: usize, value: T) -> Result<WriteOutcome<()>> {
        self.engine.write(move |list| {
            let index = index.min(list.len());
            list.insert(index, value);
        })
    }

    /// Remove and return the element at `index`, if in range.
    pub fn remove(&mut self, index: usize) -> Result<WriteOutcome<Option<T>>> {
        self.engine.write(move |list| {
            if index < list.len() {
                Some(list.remove(index))
            } else {
                None
            }
        })
    }

    /// The element at `index`, if in range.
    pub fn get(&mut self, index: usize) -> Result<Option<T>> {
        self.engine.read(|list| list.get(index).cloned())
    }

    /// Replace the element at `index`; reports whether the index was valid.
    pub fn set(&mut self, index: usize, value: T) -> Result<WriteOutcome<bool>> {
        self.engine.write(move |list| match list.get_mut(index) {
            Some(slot) => {
                *slot = value;
                true
            }
            None => false,
        })
    }

    pub fn len(&mut self) -> Result<usize> {
        self.engine.read(Vec::len)
    }

    pub fn is_empty(&mut self) -> Result<bool> {
        self.engine.read(Vec::is_empty)
    }

    /// A detached copy of the whole sequence.
    pub fn to_vec(&mut self) -> Result<Vec<T>> {
        self.engine.read(Clone::clone)
    }

    /// A detached copy of `start..end`, clamped to the current length.
    pub fn slice(&mut self, start: usize, end: usize) -> Result<Vec<T>> {
        self.engine.read(|list| {
            let end = end.min(list.len());
            let start = start.min(end);
            list[start..end].to_vec()
        })
    }

    /// Remove every element.
    pub fn clear(&mut self) -> Result<WriteOutcome<()>> {
        self.engine.write(Vec::clear)
    }

    /// Append every element from `values`.
    pub fn extend(&mut self, values: impl IntoIterator<Item = T>) -> Result<WriteOutcome<()>> {
        let values: Vec<_> = values.into_iter().collect();
        self.engine.write(move |list| list.extend(values))
    }

    /// Reverse the sequence in place.
    pub fn reverse(&mut self) -> Result<WriteOutcome<()>> {
        self.engine.write(|list| list.reverse())
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

impl<T> SharedList<T>
where
    T: Clone + PartialEq + Serialize + DeserializeOwned,
{
    /// Whether `value` occurs in the sequence.
    pub fn contains(&mut self, value: &T) -> Result<bool> {
        self.engine.read(|list| list.contains(value))
    }

    /// Index of the first occurrence of `value`.
    pub fn position(&mut self, value: &T) -> Result<Option<usize>> {
        self.engine.read(|list| list.iter().position(|v| v == value))
    }

    /// Number of occurrences of `value`.
    pub fn count(&mut self, value: &T) -> Result<usize> {
        self.engine
            .read(|list| list.iter().filter(|v| *v == value).count())
    }
}

impl<T> SharedList<T>
where
    T: Clone + Ord + Serialize + DeserializeOwned,
{
    /// Sort the sequence in place.
    pub fn sort(&mut self) -> Result<WriteOutcome<()>> {
        self.engine.write(|list| list.sort())
    }
}
