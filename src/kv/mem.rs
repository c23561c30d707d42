//! In-memory multi-version KV engine.
//!
//! Every key maps to its committed versions, newest first. A transaction
//! reads the newest version at or below its read timestamp, overlays its
//! own pending writes and installs them at commit. Commit fails with
//! `Error::Conflict` if any written key gained a version after the
//! transaction's read timestamp.

use std::collections::BTreeMap;
use std::ops::Bound;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use tracing::debug;

use crate::common::{Error, Result};
use crate::kv::{
    IteratorOptions, KvItem, KvIterator, KvStore, KvTransaction, INTERNAL_KEY_PREFIX,
};

#[derive(Debug, Clone)]
struct Version {
    ts: u64,
    /// `None` is a tombstone.
    value: Option<Vec<u8>>,
}

#[derive(Debug, Default)]
struct MemKvInner {
    data: RwLock<BTreeMap<Vec<u8>, Vec<Version>>>,
    last_ts: AtomicU64,
}

/// Ordered in-memory store with snapshot isolation.
#[derive(Debug, Clone, Default)]
pub struct MemKv {
    inner: Arc<MemKvInner>,
}

impl MemKv {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store whose clock starts at `ts`.
    pub fn with_timestamp(ts: u64) -> Self {
        let kv = Self::default();
        kv.inner.last_ts.store(ts, Ordering::SeqCst);
        kv
    }

    /// Highest commit timestamp seen so far.
    pub fn latest_ts(&self) -> u64 {
        self.inner.last_ts.load(Ordering::SeqCst)
    }

    /// Number of keys with at least one version, tombstones included.
    pub fn key_count(&self) -> usize {
        self.inner.data.read().len()
    }
}

impl KvStore for MemKv {
    fn new_transaction_at(&self, read_ts: u64, update: bool) -> Arc<dyn KvTransaction> {
        Arc::new(MemTxn {
            store: Arc::clone(&self.inner),
            read_ts,
            update,
            state: Mutex::new(TxnState::default()),
        })
    }

    fn new_transaction(&self, update: bool) -> Arc<dyn KvTransaction> {
        self.new_transaction_at(self.latest_ts(), update)
    }
}

#[derive(Debug, Default)]
struct TxnState {
    pending: BTreeMap<Vec<u8>, Option<Vec<u8>>>,
    done: bool,
}

struct MemTxn {
    store: Arc<MemKvInner>,
    read_ts: u64,
    update: bool,
    state: Mutex<TxnState>,
}

impl MemTxn {
    fn check_writable(&self, state: &TxnState) -> Result<()> {
        if state.done {
            return Err(Error::TxnDiscarded);
        }
        if !self.update {
            return Err(Error::ReadOnlyTxn);
        }
        Ok(())
    }

    fn visible(&self, state: &TxnState, key: &[u8]) -> Option<Vec<u8>> {
        if let Some(pending) = state.pending.get(key) {
            return pending.clone();
        }
        let data = self.store.data.read();
        data.get(key)
            .and_then(|versions| versions.iter().find(|v| v.ts <= self.read_ts))
            .and_then(|v| v.value.clone())
    }

    fn snapshot(&self, range: (Bound<Vec<u8>>, Bound<Vec<u8>>), opts: &IteratorOptions) -> Vec<KvItem> {
        let state = self.state.lock();
        let data = self.store.data.read();

        let mut keys: Vec<&Vec<u8>> = data.range(range.clone()).map(|(k, _)| k).collect();
        keys.extend(
            state
                .pending
                .range(range)
                .map(|(k, _)| k)
                .filter(|k| !data.contains_key(*k)),
        );
        keys.sort();

        let mut items = Vec::new();
        for key in keys {
            if !opts.prefix.is_empty() && !key.starts_with(&opts.prefix) {
                continue;
            }
            if !opts.internal_access && key.starts_with(INTERNAL_KEY_PREFIX) {
                continue;
            }

            let mut versions: Vec<(u64, Option<&Vec<u8>>)> = Vec::new();
            if let Some(pending) = state.pending.get(key) {
                versions.push((self.read_ts, pending.as_ref()));
            }
            if let Some(committed) = data.get(key) {
                versions.extend(
                    committed
                        .iter()
                        .filter(|v| v.ts <= self.read_ts)
                        .map(|v| (v.ts, v.value.as_ref())),
                );
            }

            for (ts, value) in versions {
                if ts <= opts.since_ts {
                    break;
                }
                if opts.all_versions {
                    items.push(KvItem {
                        key: key.clone(),
                        value: value.cloned().unwrap_or_default(),
                        version: ts,
                        deleted: value.is_none(),
                    });
                    continue;
                }
                if let Some(value) = value {
                    items.push(KvItem {
                        key: key.clone(),
                        value: value.clone(),
                        version: ts,
                        deleted: false,
                    });
                }
                break;
            }
        }

        if opts.reverse {
            // Keep newest-first version order within a key.
            let mut grouped: Vec<Vec<KvItem>> = Vec::new();
            for item in items {
                match grouped.last_mut() {
                    Some(group) if group[0].key == item.key => group.push(item),
                    _ => grouped.push(vec![item]),
                }
            }
            items = grouped.into_iter().rev().flatten().collect();
        }
        items
    }
}

impl KvTransaction for MemTxn {
    fn read_ts(&self) -> u64 {
        self.read_ts
    }

    fn get(&self, key: &[u8]) -> Result<Vec<u8>> {
        let state = self.state.lock();
        if state.done {
            return Err(Error::TxnDiscarded);
        }
        self.visible(&state, key).ok_or(Error::KeyNotFound)
    }

    fn set(&self, key: &[u8], value: &[u8]) -> Result<()> {
        if key.is_empty() {
            return Err(Error::InvalidValue("empty key".into()));
        }
        let mut state = self.state.lock();
        self.check_writable(&state)?;
        state.pending.insert(key.to_vec(), Some(value.to_vec()));
        Ok(())
    }

    fn delete(&self, key: &[u8]) -> Result<()> {
        let mut state = self.state.lock();
        self.check_writable(&state)?;
        if self.visible(&state, key).is_none() {
            return Err(Error::KeyNotFound);
        }
        state.pending.insert(key.to_vec(), None);
        Ok(())
    }

    fn commit(&self) -> Result<()> {
        let ts = self.store.last_ts.load(Ordering::SeqCst).max(self.read_ts) + 1;
        self.commit_at(ts)
    }

    fn commit_at(&self, commit_ts: u64) -> Result<()> {
        let mut state = self.state.lock();
        if state.done {
            return Err(Error::TxnDiscarded);
        }
        state.done = true;
        let pending = std::mem::take(&mut state.pending);
        if pending.is_empty() {
            return Ok(());
        }
        if commit_ts == 0 {
            return Err(Error::InvalidValue("commit timestamp 0".into()));
        }

        let mut data = self.store.data.write();
        let conflict = pending.keys().any(|key| {
            data.get(key)
                .and_then(|versions| versions.first())
                .is_some_and(|newest| newest.ts > self.read_ts)
        });
        if conflict {
            debug!(read_ts = self.read_ts, commit_ts, "kv commit conflict");
            return Err(Error::Conflict);
        }

        let writes = pending.len();
        for (key, value) in pending {
            let versions = data.entry(key).or_default();
            let at = versions.partition_point(|v| v.ts > commit_ts);
            if versions.get(at).is_some_and(|v| v.ts == commit_ts) {
                versions[at].value = value;
            } else {
                versions.insert(at, Version { ts: commit_ts, value });
            }
        }
        self.store.last_ts.fetch_max(commit_ts, Ordering::SeqCst);
        debug!(read_ts = self.read_ts, commit_ts, writes, "kv commit");
        Ok(())
    }

    fn discard(&self) {
        let mut state = self.state.lock();
        state.pending.clear();
        state.done = true;
    }

    fn new_iterator(&self, opts: IteratorOptions) -> Result<Box<dyn KvIterator>> {
        if self.state.lock().done {
            return Err(Error::TxnDiscarded);
        }
        let items = self.snapshot(prefix_range(&opts.prefix), &opts);
        Ok(Box::new(MemIterator::new(items, opts.reverse)))
    }

    fn new_key_iterator(&self, key: &[u8], opts: IteratorOptions) -> Result<Box<dyn KvIterator>> {
        if self.state.lock().done {
            return Err(Error::TxnDiscarded);
        }
        let range = (Bound::Included(key.to_vec()), Bound::Included(key.to_vec()));
        let items = self.snapshot(range, &opts);
        Ok(Box::new(MemIterator::new(items, opts.reverse)))
    }
}

/// Key range covering exactly the keys that start with `prefix`.
///
/// The upper bound is the smallest key greater than every key with the
/// prefix: trailing `0xFF` bytes dropped, last byte incremented. A prefix
/// of only `0xFF` bytes has no such key and runs to the end.
fn prefix_range(prefix: &[u8]) -> (Bound<Vec<u8>>, Bound<Vec<u8>>) {
    if prefix.is_empty() {
        return (Bound::Unbounded, Bound::Unbounded);
    }
    let mut upper = prefix.to_vec();
    while let Some(last) = upper.pop() {
        if last != u8::MAX {
            upper.push(last + 1);
            return (Bound::Included(prefix.to_vec()), Bound::Excluded(upper));
        }
    }
    (Bound::Included(prefix.to_vec()), Bound::Unbounded)
}

/// Cursor over a materialized snapshot.
struct MemIterator {
    items: Vec<KvItem>,
    pos: usize,
    reverse: bool,
    closed: bool,
}

impl MemIterator {
    fn new(items: Vec<KvItem>, reverse: bool) -> Self {
        let pos = items.len();
        Self {
            items,
            pos,
            reverse,
            closed: false,
        }
    }
}

impl KvIterator for MemIterator {
    fn seek(&mut self, key: &[u8]) {
        self.pos = if self.reverse {
            self.items.partition_point(|item| item.key.as_slice() > key)
        } else {
            self.items.partition_point(|item| item.key.as_slice() < key)
        };
    }

    fn rewind(&mut self) {
        self.pos = 0;
    }

    fn next(&mut self) {
        if self.pos < self.items.len() {
            self.pos += 1;
        }
    }

    fn valid(&self) -> bool {
        !self.closed && self.pos < self.items.len()
    }

    fn valid_for_prefix(&self, prefix: &[u8]) -> bool {
        self.item().is_some_and(|item| item.key.starts_with(prefix))
    }

    fn item(&self) -> Option<&KvItem> {
        if self.closed {
            return None;
        }
        self.items.get(self.pos)
    }

    fn close(&mut self) {
        self.closed = true;
        self.items.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn collect(it: &mut dyn KvIterator) -> Vec<(Vec<u8>, Vec<u8>)> {
        let mut out = Vec::new();
        it.rewind();
        while let Some(item) = it.item() {
            out.push((item.key_copy(), item.value_copy()));
            it.next();
        }
        out
    }

    fn put(kv: &MemKv, read_ts: u64, commit_ts: u64, pairs: &[(&str, &str)]) {
        let txn = kv.new_transaction_at(read_ts, true);
        for (k, v) in pairs {
            txn.set(k.as_bytes(), v.as_bytes()).unwrap();
        }
        txn.commit_at(commit_ts).unwrap();
    }

    #[test]
    fn test_snapshot_reads() {
        let kv = MemKv::new();
        put(&kv, 1, 2, &[("a", "1")]);
        put(&kv, 3, 4, &[("a", "2")]);

        assert!(kv.new_transaction_at(1, false).get(b"a").unwrap_err().is_not_found());
        assert_eq!(kv.new_transaction_at(2, false).get(b"a").unwrap(), b"1");
        assert_eq!(kv.new_transaction_at(3, false).get(b"a").unwrap(), b"1");
        assert_eq!(kv.new_transaction_at(9, false).get(b"a").unwrap(), b"2");
        assert_eq!(kv.latest_ts(), 4);
    }

    #[test]
    fn test_read_your_own_writes() {
        let kv = MemKv::new();
        put(&kv, 1, 2, &[("a", "1")]);

        let txn = kv.new_transaction_at(3, true);
        txn.set(b"b", b"2").unwrap();
        txn.delete(b"a").unwrap();
        assert_eq!(txn.get(b"b").unwrap(), b"2");
        assert!(txn.get(b"a").is_err());

        let mut it = txn.new_iterator(IteratorOptions::default()).unwrap();
        assert_eq!(collect(it.as_mut()), vec![(b"b".to_vec(), b"2".to_vec())]);
    }

    #[test]
    fn test_delete_missing_key() {
        let kv = MemKv::new();
        let txn = kv.new_transaction_at(1, true);
        assert!(matches!(txn.delete(b"nope"), Err(Error::KeyNotFound)));
    }

    #[test]
    fn test_read_only_txn_rejects_writes() {
        let kv = MemKv::new();
        let txn = kv.new_transaction_at(1, false);
        assert!(matches!(txn.set(b"a", b"1"), Err(Error::ReadOnlyTxn)));
    }

    #[test]
    fn test_write_write_conflict() {
        let kv = MemKv::new();
        let t1 = kv.new_transaction_at(1, true);
        let t2 = kv.new_transaction_at(1, true);
        t1.set(b"k", b"1").unwrap();
        t2.set(b"k", b"2").unwrap();

        t1.commit_at(2).unwrap();
        assert!(matches!(t2.commit_at(3), Err(Error::Conflict)));
        assert_eq!(kv.new_transaction_at(5, false).get(b"k").unwrap(), b"1");
    }

    #[test]
    fn test_discard_drops_writes() {
        let kv = MemKv::new();
        let txn = kv.new_transaction_at(1, true);
        txn.set(b"k", b"v").unwrap();
        txn.discard();
        assert!(matches!(txn.commit_at(2), Err(Error::TxnDiscarded)));
        assert_eq!(kv.key_count(), 0);
    }

    #[test]
    fn test_commit_picks_next_timestamp() {
        let kv = MemKv::with_timestamp(1);
        let txn = kv.new_transaction(true);
        txn.set(b"k", b"v").unwrap();
        txn.commit().unwrap();
        assert_eq!(kv.latest_ts(), 2);
        assert_eq!(kv.new_transaction(false).get(b"k").unwrap(), b"v");
    }

    #[test]
    fn test_commit_with_passes_outcome() {
        let kv = MemKv::new();
        let txn = kv.new_transaction_at(1, true);
        txn.set(b"k", b"v").unwrap();

        let mut seen = false;
        txn.commit_with(2, &mut |res| {
            seen = res.is_ok();
            res
        })
        .unwrap();
        assert!(seen);
    }

    #[test]
    fn test_seek_and_prefix() {
        let kv = MemKv::new();
        put(&kv, 1, 2, &[("a1", ""), ("b1", "x"), ("b2", "y"), ("c1", "")]);

        let txn = kv.new_transaction_at(2, false);
        let mut it = txn.new_iterator(IteratorOptions::default()).unwrap();
        it.seek(b"b");
        let mut keys = Vec::new();
        while it.valid_for_prefix(b"b") {
            keys.push(it.item().unwrap().key_copy());
            it.next();
        }
        assert_eq!(keys, vec![b"b1".to_vec(), b"b2".to_vec()]);

        let mut it = txn.new_iterator(IteratorOptions::with_prefix(b"b".to_vec())).unwrap();
        assert_eq!(collect(it.as_mut()).len(), 2);
    }

    #[test]
    fn test_prefix_range_stops_at_successor() {
        assert_eq!(
            prefix_range(b"b"),
            (Bound::Included(b"b".to_vec()), Bound::Excluded(b"c".to_vec()))
        );
        assert_eq!(
            prefix_range(b"a\xff\xff"),
            (Bound::Included(b"a\xff\xff".to_vec()), Bound::Excluded(b"b".to_vec()))
        );
        assert_eq!(prefix_range(b"\xff"), (Bound::Included(b"\xff".to_vec()), Bound::Unbounded));
        assert_eq!(prefix_range(b""), (Bound::Unbounded, Bound::Unbounded));
    }

    #[test]
    fn test_prefix_iteration_excludes_neighbours() {
        let kv = MemKv::new();
        let txn = kv.new_transaction_at(1, true);
        for key in [&b"a\xff"[..], b"b", b"b\xff", b"b\xff\x01", b"c", b"c\x00"] {
            txn.set(key, b"").unwrap();
        }
        txn.commit_at(2).unwrap();

        let txn = kv.new_transaction_at(2, false);
        let mut it = txn.new_iterator(IteratorOptions::with_prefix(b"b".to_vec())).unwrap();
        let keys: Vec<_> = collect(it.as_mut()).into_iter().map(|(k, _)| k).collect();
        assert_eq!(keys, vec![b"b".to_vec(), b"b\xff".to_vec(), b"b\xff\x01".to_vec()]);

        let opts = IteratorOptions {
            reverse: true,
            ..IteratorOptions::with_prefix(b"b".to_vec())
        };
        let mut it = txn.new_iterator(opts).unwrap();
        it.rewind();
        assert_eq!(it.item().unwrap().key(), b"b\xff\x01");
    }

    #[test]
    fn test_reverse_iteration() {
        let kv = MemKv::new();
        put(&kv, 1, 2, &[("a", ""), ("b", ""), ("c", "")]);

        let opts = IteratorOptions {
            reverse: true,
            ..IteratorOptions::default()
        };
        let mut it = kv.new_transaction_at(2, false).new_iterator(opts).unwrap();
        it.seek(b"bb");
        assert_eq!(it.item().unwrap().key(), b"b");
        it.next();
        assert_eq!(it.item().unwrap().key(), b"a");
        it.next();
        assert!(!it.valid());
    }

    #[test]
    fn test_all_versions_and_since_ts() {
        let kv = MemKv::new();
        put(&kv, 1, 2, &[("k", "1")]);
        put(&kv, 2, 3, &[("k", "2")]);
        let txn = kv.new_transaction_at(3, true);
        txn.delete(b"k").unwrap();
        txn.commit_at(4).unwrap();

        let txn = kv.new_transaction_at(10, false);
        let opts = IteratorOptions {
            all_versions: true,
            ..IteratorOptions::default()
        };
        let mut it = txn.new_key_iterator(b"k", opts.clone()).unwrap();
        it.rewind();
        let mut versions = Vec::new();
        while let Some(item) = it.item() {
            versions.push((item.version(), item.is_deleted()));
            it.next();
        }
        assert_eq!(versions, vec![(4, true), (3, false), (2, false)]);

        let opts = IteratorOptions { since_ts: 2, ..opts };
        let mut it = txn.new_key_iterator(b"k", opts).unwrap();
        assert_eq!(collect(it.as_mut()).len(), 2);
    }

    #[test]
    fn test_internal_keys_hidden() {
        let kv = MemKv::new();
        let mut internal = INTERNAL_KEY_PREFIX.to_vec();
        internal.extend_from_slice(b"head");
        let txn = kv.new_transaction_at(1, true);
        txn.set(&internal, b"x").unwrap();
        txn.set(b"user", b"y").unwrap();
        txn.commit_at(2).unwrap();

        let txn = kv.new_transaction_at(2, false);
        let mut it = txn.new_iterator(IteratorOptions::default()).unwrap();
        assert_eq!(collect(it.as_mut()).len(), 1);

        let opts = IteratorOptions {
            internal_access: true,
            ..IteratorOptions::default()
        };
        let mut it = txn.new_iterator(opts).unwrap();
        assert_eq!(collect(it.as_mut()).len(), 2);
    }

    #[test]
    fn test_closed_iterator_is_invalid() {
        let kv = MemKv::new();
        put(&kv, 1, 2, &[("a", "")]);
        let mut it = kv
            .new_transaction_at(2, false)
            .new_iterator(IteratorOptions::default())
            .unwrap();
        it.rewind();
        assert!(it.valid());
        it.close();
        assert!(!it.valid());
        assert!(it.item().is_none());
    }
}
