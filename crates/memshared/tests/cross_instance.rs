//! End-to-end scenarios with several instances sharing one segment
//!
//! Each instance here plays the role of an independent process: they share
//! nothing but the segment name and the backing directory.

use memshared::{LockMode, ShareError, SharedList, SharedMap, SyncOptions};
use tempfile::TempDir;

fn options(dir: &TempDir, name: &str) -> SyncOptions {
    SyncOptions::new().dir(dir.path()).name(name)
}

#[test]
fn orders_scenario() {
    let dir = TempDir::new().unwrap();

    // First process creates "orders" and stores one entry.
    let mut first: SharedMap<String, u64> =
        SharedMap::new(options(&dir, "orders").capacity(4096)).unwrap();
    first.insert("sku-a".into(), 1).unwrap();

    // Second process attaches by name and observes the entry.
    let mut second: SharedMap<String, u64> =
        SharedMap::new(options(&dir, "orders").capacity(4096)).unwrap();
    assert!(!second.is_creator());
    assert_eq!(second.get(&"sku-a".into()).unwrap(), Some(1));

    // Second process adds an entry; first reloads and sees both.
    second.insert("sku-b".into(), 2).unwrap();
    let merged = first.to_map().unwrap();
    assert_eq!(merged.get("sku-a"), Some(&1));
    assert_eq!(merged.get("sku-b"), Some(&2));
}

#[test]
fn interleaved_writers_converge() {
    let dir = TempDir::new().unwrap();
    let mut a: SharedMap<String, u64> = SharedMap::new(options(&dir, "lww")).unwrap();
    let mut b: SharedMap<String, u64> = SharedMap::new(options(&dir, "lww")).unwrap();

    // B's store happens strictly after A's and before A's reload, so A
    // observes both entries. (Nothing here is a merge: each store replaces
    // the full snapshot, which B had refreshed from A's store first.)
    a.insert("x".into(), 1).unwrap();
    b.insert("y".into(), 2).unwrap();

    let seen = a.to_map().unwrap();
    assert_eq!(seen.get("x"), Some(&1));
    assert_eq!(seen.get("y"), Some(&2));
}

#[test]
fn creator_cleanup_resets_state_for_the_name() {
    let dir = TempDir::new().unwrap();
    let mut creator: SharedMap<String, u64> = SharedMap::new(options(&dir, "reset")).unwrap();
    creator.insert("left-over".into(), 1).unwrap();
    assert!(creator.is_creator());
    creator.cleanup().unwrap();

    // The destroy actually removed prior state: a fresh acquire creates a
    // brand-new empty segment.
    let mut fresh: SharedMap<String, u64> = SharedMap::new(options(&dir, "reset")).unwrap();
    assert!(fresh.is_creator());
    assert!(fresh.is_empty().unwrap());
}

#[test]
fn attacher_cleanup_leaves_state_for_the_name() {
    let dir = TempDir::new().unwrap();
    let mut creator: SharedMap<String, u64> = SharedMap::new(options(&dir, "keep")).unwrap();
    creator.insert("kept".into(), 1).unwrap();

    let attacher: SharedMap<String, u64> = SharedMap::new(options(&dir, "keep")).unwrap();
    attacher.cleanup().unwrap();

    let mut third: SharedMap<String, u64> = SharedMap::new(options(&dir, "keep")).unwrap();
    assert!(!third.is_creator());
    assert_eq!(third.get(&"kept".into()).unwrap(), Some(1));
}

#[test]
fn sixteen_byte_segment_rejects_oversized_snapshot() {
    let dir = TempDir::new().unwrap();
    let mut tiny: SharedMap<String, u64> =
        SharedMap::new(options(&dir, "tiny").capacity(16)).unwrap();

    let err = tiny
        .insert("a key far larger than sixteen bytes".into(), 1)
        .unwrap_err();
    assert!(matches!(err, ShareError::CapacityExceeded { .. }));

    // The stored snapshot is still the valid empty map, not corrupted bytes.
    let mut observer: SharedMap<String, u64> = SharedMap::new(options(&dir, "tiny")).unwrap();
    assert!(observer.is_empty().unwrap());
}

#[test]
fn shrinking_snapshot_tolerates_stale_tail() {
    let dir = TempDir::new().unwrap();
    let mut list: SharedList<String> = SharedList::new(options(&dir, "shrink")).unwrap();

    // Large write, then a much smaller one: the segment keeps the tail of
    // the large snapshot past the new payload.
    list.extend((0..64).map(|i| format!("element number {i}"))).unwrap();
    list.clear().unwrap();
    list.push("solo".into()).unwrap();

    // A fresh attacher decodes from raw segment bytes, stale tail included.
    let mut attacher: SharedList<String> = SharedList::new(options(&dir, "shrink")).unwrap();
    assert_eq!(attacher.to_vec().unwrap(), vec!["solo".to_string()]);
}

#[test]
fn degraded_writes_are_observable() {
    let dir = TempDir::new().unwrap();
    let mut unlocked: SharedMap<String, u64> =
        SharedMap::new(options(&dir, "degraded").use_lock(false)).unwrap();

    let outcome = unlocked.insert("k".into(), 1).unwrap();
    assert_eq!(outcome.lock, LockMode::Unsynchronized);
    assert!(!outcome.is_synchronized());
    assert_eq!(unlocked.stats().degraded_stores, 1);

    let mut locked: SharedMap<String, u64> = SharedMap::new(options(&dir, "degraded")).unwrap();
    let outcome = locked.insert("j".into(), 2).unwrap();
    assert!(outcome.is_synchronized());
}

#[test]
fn unnamed_instances_do_not_collide() {
    let dir = TempDir::new().unwrap();
    let mut a: SharedMap<String, u64> =
        SharedMap::new(SyncOptions::new().dir(dir.path())).unwrap();
    let mut b: SharedMap<String, u64> =
        SharedMap::new(SyncOptions::new().dir(dir.path())).unwrap();

    a.insert("only-a".into(), 1).unwrap();
    assert!(b.is_empty().unwrap());
    assert!(a.is_creator());
    assert!(b.is_creator());
}
