//! Key/value map shared across processes

use std::collections::BTreeMap;

use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::config::SyncOptions;
use crate::engine::{SyncEngine, SyncStats, WriteOutcome};
use crate::error::Result;

/// A map whose entries live in a named shared-memory segment.
///
/// Every operation synchronizes with the segment first, so lookups observe
/// the newest stored snapshot and mutations are immediately visible to other
/// attached processes (last writer wins, see the crate docs).
pub struct SharedMap<K, V> {
    engine: SyncEngine<BTreeMap<K, V>>,
}

impl<K, V> SharedMap<K, V>
where
    K: Ord + Clone + Serialize + DeserializeOwned,
    V: Clone + Serialize + DeserializeOwned,
{
    /// Open an empty shared map (or attach to an existing one).
    pub fn new(options: SyncOptions) -> Result<Self> {
        Self::with_initial(options, [])
    }

    /// Open a shared map seeded with `initial`.
    ///
    /// The seed only matters when this instance creates the segment; an
    /// attacher adopts the stored state instead.
    pub fn with_initial(
        options: SyncOptions,
        initial: impl IntoIterator<Item = (K, V)>,
    ) -> Result<Self> {
        let engine = SyncEngine::open(&options, initial.into_iter().collect())?;
        Ok(Self { engine })
    }

    /// Insert a key/value pair, returning the previous value for the key.
    pub fn insert(&mut self, key: K, value: V) -> Result<WriteOutcome<Option<V>>> {
        self.engine.write(|map| map.insert(key, value))
    }

    /// Remove a key, returning its value when present.
    pub fn remove(&mut self, key: &K) -> Result<WriteOutcome<Option<V>>> {
        self.engine.write(|map| map.remove(key))
    }

    /// Look up a key.
    pub fn get(&mut self, key: &K) -> Result<Option<V>> {
        self.engine.read(|map| map.get(key).cloned())
    }

    /// Look up a key, falling back to `default` when absent.
    pub fn get_or(&mut self, key: &K, default: V) -> Result<V> {
        self.engine
            .read(|map| map.get(key).cloned().unwrap_or(default))
    }

    /// Insert `default` when the key is absent; return the effective value.
    pub fn set_default(&mut self, key: K, default: V) -> Result<WriteOutcome<V>> {
        self.engine
            .write(|map| map.entry(key).or_insert(default).clone())
    }

    pub fn contains_key(&mut self, key: &K) -> Result<bool> {
        self.engine.read(|map| map.contains_key(key))
    }

    pub fn len(&mut self) -> Result<usize> {
        self.engine.read(BTreeMap::len)
    }

    pub fn is_empty(&mut self) -> Result<bool> {
        self.engine.read(BTreeMap::is_empty)
    }

    /// All keys, in key order.
    pub fn keys(&mut self) -> Result<Vec<K>> {
        self.engine.read(|map| map.keys().cloned().collect())
    }

    /// All values, in key order.
    pub fn values(&mut self) -> Result<Vec<V>> {
        self.engine.read(|map| map.values().cloned().collect())
    }

    /// A detached copy of the whole map.
    pub fn to_map(&mut self) -> Result<BTreeMap<K, V>> {
        self.engine.read(Clone::clone)
    }

    /// Remove every entry.
    pub fn clear(&mut self) -> Result<WriteOutcome<()>> {
        self.engine.write(BTreeMap::clear)
    }

    /// Insert every entry from `entries`, overwriting existing keys.
    pub fn extend(
        &mut self,
        entries: impl IntoIterator<Item = (K, V)>,
    ) -> Result<WriteOutcome<()>> {
        let entries: Vec<_> = entries.into_iter().collect();
        self.engine.write(move |map| map.extend(entries))
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
