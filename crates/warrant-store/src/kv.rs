//! Ordered key-value engines.

use std::collections::BTreeMap;
use std::ops::Bound;
use std::sync::RwLock;

use crate::error::KvError;

/// A single mutation inside a batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KvOp {
    Put { key: Vec<u8>, value: Vec<u8> },
    Delete { key: Vec<u8> },
}

/// Ordered byte-keyed storage.
///
/// Keys are compared bytewise. A batch is applied atomically: readers see
/// either none or all of its operations.
pub trait KvStore: Send + Sync {
    /// Look up a single key.
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, KvError>;

    /// Apply all operations atomically, in order.
    fn write_batch(&self, ops: Vec<KvOp>) -> Result<(), KvError>;

    /// Entries with `start <= key < end` in ascending key order, after
    /// skipping `skip` entries and returning at most `limit`.
    fn scan_range(
        &self,
        start: &[u8],
        end: &[u8],
        skip: usize,
        limit: usize,
    ) -> Result<Vec<(Vec<u8>, Vec<u8>)>, KvError>;

    fn put(&self, key: &[u8], value: &[u8]) -> Result<(), KvError> {
        self.write_batch(vec![KvOp::Put {
            key: key.to_vec(),
            value: value.to_vec(),
        }])
    }

    fn delete(&self, key: &[u8]) -> Result<(), KvError> {
        self.write_batch(vec![KvOp::Delete { key: key.to_vec() }])
    }
}

pub(crate) type Map = BTreeMap<Vec<u8>, Vec<u8>>;

pub(crate) fn apply(map: &mut Map, ops: Vec<KvOp>) {
    for op in ops {
        match op {
            KvOp::Put { key, value } => {
                map.insert(key, value);
            }
            KvOp::Delete { key } => {
                map.remove(&key);
            }
        }
    }
}

pub(crate) fn scan(
    map: &Map,
    start: &[u8],
    end: &[u8],
    skip: usize,
    limit: usize,
) -> Vec<(Vec<u8>, Vec<u8>)> {
    if start >= end {
        return Vec::new();
    }
    map.range::<[u8], _>((Bound::Included(start), Bound::Excluded(end)))
        .skip(skip)
        .take(limit)
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect()
}

/// In-memory engine. Contents are lost when the process exits.
#[derive(Debug, Default)]
pub struct MemoryKv {
    map: RwLock<Map>,
}

impl MemoryKv {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KvStore for MemoryKv {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, KvError> {
        let map = self.map.read().map_err(|_| KvError::LockError)?;
        Ok(map.get(key).cloned())
    }

    fn write_batch(&self, ops: Vec<KvOp>) -> Result<(), KvError> {
        let mut map = self.map.write().map_err(|_| KvError::LockError)?;
        apply(&mut map, ops);
        Ok(())
    }

    fn scan_range(
        &self,
        start: &[u8],
        end: &[u8],
        skip: usize,
        limit: usize,
    ) -> Result<Vec<(Vec<u8>, Vec<u8>)>, KvError> {
        let map = self.map.read().map_err(|_| KvError::LockError)?;
        Ok(scan(&map, start, end, skip, limit))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn keys(entries: &[(Vec<u8>, Vec<u8>)]) -> Vec<String> {
        entries
            .iter()
            .map(|(k, _)| String::from_utf8_lossy(k).into_owned())
            .collect()
    }

    #[test]
    fn test_put_get_delete() {
        let kv = MemoryKv::new();
        assert_eq!(kv.get(b"a").unwrap(), None);

        kv.put(b"a", b"1").unwrap();
        assert_eq!(kv.get(b"a").unwrap(), Some(b"1".to_vec()));

        kv.put(b"a", b"2").unwrap();
        assert_eq!(kv.get(b"a").unwrap(), Some(b"2".to_vec()));

        kv.delete(b"a").unwrap();
        assert_eq!(kv.get(b"a").unwrap(), None);
    }

    #[test]
    fn test_batch_applies_in_order() {
        let kv = MemoryKv::new();
        kv.write_batch(vec![
            KvOp::Put {
                key: b"k".to_vec(),
                value: b"first".to_vec(),
            },
            KvOp::Delete { key: b"k".to_vec() },
            KvOp::Put {
                key: b"k".to_vec(),
                value: b"last".to_vec(),
            },
        ])
        .unwrap();
        assert_eq!(kv.get(b"k").unwrap(), Some(b"last".to_vec()));
    }

    #[test]
    fn test_scan_range_is_half_open_and_ordered() {
        let kv = MemoryKv::new();
        for key in ["b:2", "a:1", "b:1", "b:3", "c:1"] {
            kv.put(key.as_bytes(), b"").unwrap();
        }

        let all = kv.scan_range(b"b:", b"b;", 0, usize::MAX).unwrap();
        assert_eq!(keys(&all), ["b:1", "b:2", "b:3"]);

        let page = kv.scan_range(b"b:", b"b;", 1, 1).unwrap();
        assert_eq!(keys(&page), ["b:2"]);

        let exclusive = kv.scan_range(b"b:1", b"b:3", 0, 10).unwrap();
        assert_eq!(keys(&exclusive), ["b:1", "b:2"]);

        assert!(kv.scan_range(b"b:", b"b;", 10, 10).unwrap().is_empty());
        assert!(kv.scan_range(b"z", b"a", 0, 10).unwrap().is_empty());
    }
}
