//! Credential store: token records plus an insertion-order index.

use serde::{Deserialize, Serialize};
use std::sync::{Arc, RwLock};
use warrant_core::TokenRecord;

use crate::error::{KvError, StoreError};
use crate::kv::{KvOp, KvStore};

const RECORD_PREFIX: &[u8] = b"t:";
const RECORD_END: &[u8] = b"t;";
const SEQ_PREFIX: &[u8] = b"s:";
const SEQ_END: &[u8] = b"s;";

fn record_key(token: &str) -> Vec<u8> {
    [RECORD_PREFIX, token.as_bytes()].concat()
}

/// Zero-padded so that bytewise order equals numeric order.
fn seq_key(seq: u64) -> Vec<u8> {
    format!("s:{seq:020}").into_bytes()
}

fn parse_seq_key(key: &[u8]) -> Option<u64> {
    let digits = key.strip_prefix(SEQ_PREFIX)?;
    std::str::from_utf8(digits).ok()?.parse().ok()
}

#[derive(Debug, Serialize, Deserialize)]
struct StoredRecord {
    seq: u64,
    record: TokenRecord,
}

/// Durable mapping from token string to [`TokenRecord`].
///
/// Every record is stored under `t:<token>` together with its sequence
/// number, and indexed under `s:<seq>`. Listing walks the `s:` range, so
/// records come back in the order they were inserted.
pub struct CredentialStore {
    kv: Arc<dyn KvStore>,
    /// Next sequence number to assign. Writers hold the write side for the
    /// whole check-and-commit; listings hold the read side.
    next_seq: RwLock<u64>,
}

impl CredentialStore {
    /// Open a store over `kv`, recovering the sequence counter.
    pub fn open(kv: Arc<dyn KvStore>) -> Result<Self, StoreError> {
        let index = kv.scan_range(SEQ_PREFIX, SEQ_END, 0, usize::MAX)?;
        let mut next_seq = 0;
        for (key, _) in &index {
            let seq = parse_seq_key(key).ok_or_else(|| {
                StoreError::Corrupt(format!(
                    "bad index key {:?}",
                    String::from_utf8_lossy(key)
                ))
            })?;
            next_seq = next_seq.max(seq + 1);
        }

        tracing::debug!(records = index.len(), next_seq, "Opened credential store");

        Ok(Self {
            kv,
            next_seq: RwLock::new(next_seq),
        })
    }

    /// Insert a new record. Fails with [`StoreError::DuplicateKey`] if the
    /// token already exists; an existing record is never overwritten.
    pub fn put(&self, record: TokenRecord) -> Result<(), StoreError> {
        let mut next_seq = self.next_seq.write().map_err(|_| KvError::LockError)?;

        let key = record_key(&record.token);
        if self.kv.get(&key)?.is_some() {
            return Err(StoreError::DuplicateKey(record.token));
        }

        let seq = *next_seq;
        let token = record.token.clone();
        let value = serde_json::to_vec(&StoredRecord { seq, record })?;

        self.kv.write_batch(vec![
            KvOp::Put { key, value },
            KvOp::Put {
                key: seq_key(seq),
                value: token.into_bytes(),
            },
        ])?;

        *next_seq = seq + 1;
        Ok(())
    }

    /// Look up a record by token.
    pub fn get(&self, token: &str) -> Result<TokenRecord, StoreError> {
        self.load(token)?
            .map(|stored| stored.record)
            .ok_or_else(|| StoreError::NotFound(token.to_string()))
    }

    /// Records in insertion order, after skipping `skip`, at most `limit`.
    ///
    /// No clamping is applied here.
    pub fn list(&self, skip: u64, limit: u64) -> Result<Vec<TokenRecord>, StoreError> {
        let _guard = self.next_seq.read().map_err(|_| KvError::LockError)?;

        let skip = usize::try_from(skip).unwrap_or(usize::MAX);
        let limit = usize::try_from(limit).unwrap_or(usize::MAX);
        let index = self.kv.scan_range(SEQ_PREFIX, SEQ_END, skip, limit)?;

        index
            .into_iter()
            .map(|(key, token)| {
                let token = String::from_utf8(token).map_err(|_| {
                    StoreError::Corrupt(format!(
                        "non-UTF-8 token under {}",
                        String::from_utf8_lossy(&key)
                    ))
                })?;
                self.load(&token)?.map(|stored| stored.record).ok_or_else(|| {
                    StoreError::Corrupt(format!(
                        "index entry {} points at a missing record",
                        String::from_utf8_lossy(&key)
                    ))
                })
            })
            .collect()
    }

    /// Remove a record and its index entry.
    pub fn delete(&self, token: &str) -> Result<(), StoreError> {
        let _guard = self.next_seq.write().map_err(|_| KvError::LockError)?;

        let stored = self
            .load(token)?
            .ok_or_else(|| StoreError::NotFound(token.to_string()))?;

        self.kv.write_batch(vec![
            KvOp::Delete {
                key: record_key(token),
            },
            KvOp::Delete {
                key: seq_key(stored.seq),
            },
        ])?;
        Ok(())
    }

    /// Number of live records.
    pub fn len(&self) -> Result<usize, StoreError> {
        let _guard = self.next_seq.read().map_err(|_| KvError::LockError)?;
        Ok(self
            .kv
            .scan_range(RECORD_PREFIX, RECORD_END, 0, usize::MAX)?
            .len())
    }

    pub fn is_empty(&self) -> Result<bool, StoreError> {
        Ok(self.len()? == 0)
    }

    fn load(&self, token: &str) -> Result<Option<StoredRecord>, StoreError> {
        let Some(bytes) = self.kv.get(&record_key(token))? else {
            return Ok(None);
        };
        serde_json::from_slice(&bytes)
            .map(Some)
            .map_err(|e| StoreError::Corrupt(format!("undecodable record: {e}")))
    }
}

impl std::fmt::Debug for CredentialStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialStore").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::file::FileKv;
    use crate::kv::MemoryKv;
    use chrono::{DateTime, Utc};
    use tempfile::TempDir;
    use warrant_core::Permission;

    fn record(token: &str, secs: i64) -> TokenRecord {
        TokenRecord {
            token: token.to_string(),
            name: format!("name-{token}"),
            perm: Permission::Write,
            extra: String::new(),
            create_time: DateTime::<Utc>::from_timestamp(secs, 0).unwrap(),
        }
    }

    fn memory_store() -> CredentialStore {
        CredentialStore::open(Arc::new(MemoryKv::new())).unwrap()
    }

    fn tokens(records: &[TokenRecord]) -> Vec<&str> {
        records.iter().map(|r| r.token.as_str()).collect()
    }

    #[test]
    fn test_put_get_delete() {
        let store = memory_store();
        store.put(record("tk1", 10)).unwrap();

        let got = store.get("tk1").unwrap();
        assert_eq!(got, record("tk1", 10));

        store.delete("tk1").unwrap();
        assert!(matches!(store.get("tk1"), Err(StoreError::NotFound(_))));
        assert!(matches!(store.delete("tk1"), Err(StoreError::NotFound(_))));
        assert!(store.is_empty().unwrap());
    }

    #[test]
    fn test_duplicate_put_does_not_overwrite() {
        let store = memory_store();
        store.put(record("tk1", 10)).unwrap();

        let mut clash = record("tk1", 99);
        clash.name = "intruder".into();
        assert!(matches!(
            store.put(clash),
            Err(StoreError::DuplicateKey(t)) if t == "tk1"
        ));

        assert_eq!(store.get("tk1").unwrap().name, "name-tk1");
        assert_eq!(store.len().unwrap(), 1);
    }

    #[test]
    fn test_list_follows_insertion_order_not_key_or_time() {
        let store = memory_store();
        // Token bytes and timestamps both disagree with insertion order.
        store.put(record("zzz", 30)).unwrap();
        store.put(record("aaa", 10)).unwrap();
        store.put(record("mmm", 20)).unwrap();

        let all = store.list(0, 100).unwrap();
        assert_eq!(tokens(&all), vec!["zzz", "aaa", "mmm"]);
        assert_eq!(store.list(0, 100).unwrap(), all);

        assert_eq!(tokens(&store.list(1, 1).unwrap()), vec!["aaa"]);
        assert!(store.list(3, 10).unwrap().is_empty());
        assert!(store.list(u64::MAX, u64::MAX).unwrap().is_empty());
    }

    #[test]
    fn test_delete_removes_from_listing() {
        let store = memory_store();
        for t in ["a", "b", "c"] {
            store.put(record(t, 1)).unwrap();
        }
        store.delete("b").unwrap();
        assert_eq!(tokens(&store.list(0, 10).unwrap()), vec!["a", "c"]);
    }

    #[test]
    fn test_reinserting_revoked_token_appends_at_end() {
        let store = memory_store();
        store.put(record("a", 1)).unwrap();
        store.put(record("b", 2)).unwrap();
        store.delete("a").unwrap();
        store.put(record("a", 3)).unwrap();

        assert_eq!(tokens(&store.list(0, 10).unwrap()), vec!["b", "a"]);
    }

    #[test]
    fn test_sequence_survives_reopen() {
        let dir = TempDir::new().unwrap();

        {
            let kv = Arc::new(FileKv::open(dir.path(), false).unwrap());
            let store = CredentialStore::open(kv).unwrap();
            store.put(record("first", 1)).unwrap();
            store.put(record("second", 2)).unwrap();
            store.put(record("third", 3)).unwrap();
            store.delete("third").unwrap();
        }

        let kv = Arc::new(FileKv::open(dir.path(), false).unwrap());
        let store = CredentialStore::open(kv).unwrap();
        store.put(record("fourth", 4)).unwrap();

        assert_eq!(
            tokens(&store.list(0, 10).unwrap()),
            vec!["first", "second", "fourth"]
        );
        assert_eq!(store.get("second").unwrap(), record("second", 2));
    }

    #[test]
    fn test_corrupt_record_is_reported() {
        let kv = Arc::new(MemoryKv::new());
        kv.put(b"t:bad", b"not json").unwrap();
        kv.put(&seq_key(0), b"bad").unwrap();

        let store = CredentialStore::open(kv).unwrap();
        assert!(matches!(store.get("bad"), Err(StoreError::Corrupt(_))));
        assert!(matches!(store.list(0, 10), Err(StoreError::Corrupt(_))));
    }

    #[test]
    fn test_dangling_index_entry_is_reported() {
        let kv = Arc::new(MemoryKv::new());
        kv.put(&seq_key(7), b"ghost").unwrap();

        let store = CredentialStore::open(kv).unwrap();
        assert!(matches!(store.list(0, 10), Err(StoreError::Corrupt(_))));

        // The counter still moves past the highest index entry.
        store.put(record("real", 1)).unwrap();
        assert_eq!(store.kv.get(&seq_key(8)).unwrap(), Some(b"real".to_vec()));
    }

    #[test]
    fn test_seq_key_orders_numerically() {
        assert!(seq_key(9) < seq_key(10));
        assert!(seq_key(99) < seq_key(100));
        assert_eq!(parse_seq_key(&seq_key(12345)), Some(12345));
        assert_eq!(parse_seq_key(b"t:12"), None);
    }
}
