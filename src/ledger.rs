//! The key-value ledger the records live in.
//!
//! The ledger offers no multi-key transactions: every `put`/`delete` lands on its
//! own, so a failure half way through an operation leaves the earlier writes in place.
use super::error::LedgerError;
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

pub type LedgerResult<T> = Result<T, LedgerError>;

pub trait Ledger: Send + Sync {
    /// Absence is `Ok(None)`, never an error.
    fn get(&self, key: &str) -> LedgerResult<Option<Vec<u8>>>;
    /// Overwrites silently. Empty values are rejected.
    fn put(&self, key: &str, value: &[u8]) -> LedgerResult<()>;
    /// Deleting a missing key is not an error.
    fn delete(&self, key: &str) -> LedgerResult<()>;
    /// Ordered `(key, value)` pairs in `[start, end)`.
    fn scan_range(&self, start: &str, end: &str) -> LedgerResult<Vec<(String, Vec<u8>)>>;

    fn scan_prefix(&self, prefix: &str) -> LedgerResult<Vec<(String, Vec<u8>)>> {
        let end = prefix_end(prefix);
        self.scan_range(prefix, &end)
    }
}

// smallest key greater than every key starting with `prefix`
fn prefix_end(prefix: &str) -> String {
    let mut end = prefix.to_string();
    end.push(char::MAX);
    end
}

/// Ledger backed by a sled tree.
pub struct SledLedger {
    instance: Arc<sled::Db>,
}

impl SledLedger {
    pub fn new(instance: Arc<sled::Db>) -> Self {
        Self { instance }
    }

    fn backend(key: &str) -> impl FnOnce(sled::Error) -> LedgerError + '_ {
        move |source| LedgerError::Backend {
            key: key.to_string(),
            source,
        }
    }
}

impl Ledger for SledLedger {
    fn get(&self, key: &str) -> LedgerResult<Option<Vec<u8>>> {
        let value = self.instance.get(key.as_bytes()).map_err(Self::backend(key))?;
        Ok(value.map(|ivec| ivec.to_vec()))
    }

    fn put(&self, key: &str, value: &[u8]) -> LedgerResult<()> {
        if value.is_empty() {
            return Err(LedgerError::EmptyValue(key.to_string()));
        }
        self.instance
            .insert(key.as_bytes(), value)
            .map_err(Self::backend(key))?;
        Ok(())
    }

    fn delete(&self, key: &str) -> LedgerResult<()> {
        self.instance
            .remove(key.as_bytes())
            .map_err(Self::backend(key))?;
        Ok(())
    }

    fn scan_range(&self, start: &str, end: &str) -> LedgerResult<Vec<(String, Vec<u8>)>> {
        let mut pairs = Vec::new();
        if start >= end {
            return Ok(pairs);
        }
        for item in self.instance.range(start.as_bytes()..end.as_bytes()) {
            let (key, value) = item.map_err(Self::backend(start))?;
            pairs.push((String::from_utf8_lossy(&key).into_owned(), value.to_vec()));
        }
        Ok(pairs)
    }
}

/// In-process ledger, used by tests and dry runs.
#[derive(Default)]
pub struct MemoryLedger {
    kvs: Mutex<BTreeMap<String, Vec<u8>>>,
}

impl MemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn entries(&self) -> std::sync::MutexGuard<'_, BTreeMap<String, Vec<u8>>> {
        // a poisoned map is still a consistent map: every write is a single insert
        self.kvs.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Ledger for MemoryLedger {
    fn get(&self, key: &str) -> LedgerResult<Option<Vec<u8>>> {
        Ok(self.entries().get(key).cloned())
    }

    fn put(&self, key: &str, value: &[u8]) -> LedgerResult<()> {
        if value.is_empty() {
            return Err(LedgerError::EmptyValue(key.to_string()));
        }
        self.entries().insert(key.to_string(), value.to_vec());
        Ok(())
    }

    fn delete(&self, key: &str) -> LedgerResult<()> {
        self.entries().remove(key);
        Ok(())
    }

    fn scan_range(&self, start: &str, end: &str) -> LedgerResult<Vec<(String, Vec<u8>)>> {
        if start >= end {
            return Ok(Vec::new());
        }
        Ok(self
            .entries()
            .range(start.to_string()..end.to_string())
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect())
    }
}

impl<L: Ledger + ?Sized> Ledger for Arc<L> {
    fn get(&self, key: &str) -> LedgerResult<Option<Vec<u8>>> {
        (**self).get(key)
    }
    fn put(&self, key: &str, value: &[u8]) -> LedgerResult<()> {
        (**self).put(key, value)
    }
    fn delete(&self, key: &str) -> LedgerResult<()> {
        (**self).delete(key)
    }
    fn scan_range(&self, start: &str, end: &str) -> LedgerResult<Vec<(String, Vec<u8>)>> {
        (**self).scan_range(start, end)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn put_and_get() {
        let ledger = MemoryLedger::new();

        ledger.put("Alice", b"Married").unwrap();
        ledger.put("Bob", b"Born").unwrap();

        assert_eq!(ledger.get("Alice").unwrap(), Some(b"Married".to_vec()));
        assert_eq!(ledger.get("Bob").unwrap(), Some(b"Born".to_vec()));
        assert_eq!(ledger.len(), 2);
    }

    #[test]
    fn missing_key_is_absent_not_error() {
        let ledger = MemoryLedger::new();
        assert_eq!(ledger.get("nobody").unwrap(), None);
    }

    #[test]
    fn empty_value_is_rejected() {
        let ledger = MemoryLedger::new();
        let err = ledger.put("key", b"").unwrap_err();

        assert!(matches!(err, LedgerError::EmptyValue(k) if k == "key"));
        assert!(ledger.is_empty());
    }

    #[test]
    fn delete_is_idempotent() {
        let ledger = MemoryLedger::new();
        ledger.put("Alice", b"Married").unwrap();

        ledger.delete("Alice").unwrap();
        ledger.delete("Alice").unwrap();

        assert_eq!(ledger.get("Alice").unwrap(), None);
    }

    #[test]
    fn scan_prefix_is_ordered_and_bounded() {
        let ledger = MemoryLedger::new();
        ledger.put("FDS_EID_2", b"b").unwrap();
        ledger.put("FDS_EID_1", b"a").unwrap();
        ledger.put("FDS_CID_x", b"c").unwrap();
        ledger.put("FDS_EIE", b"d").unwrap();

        let keys: Vec<String> = ledger
            .scan_prefix("FDS_EID_")
            .unwrap()
            .into_iter()
            .map(|(k, _)| k)
            .collect();

        assert_eq!(keys, vec!["FDS_EID_1", "FDS_EID_2"]);
    }

    #[test]
    fn sled_ledger_matches_contract() -> anyhow::Result<()> {
        let temp_dir = tempfile::tempdir()?;
        let db = sled::open(temp_dir.path().join("ledger.db"))?;
        let ledger = SledLedger::new(Arc::new(db));

        assert_eq!(ledger.get("k")?, None);
        assert!(ledger.put("k", b"").is_err());

        ledger.put("k", b"v")?;
        ledger.put("k", b"w")?;
        assert_eq!(ledger.get("k")?, Some(b"w".to_vec()));

        ledger.put("k2", b"x")?;
        assert_eq!(ledger.scan_prefix("k")?.len(), 2);

        ledger.delete("k")?;
        ledger.delete("k")?;
        assert_eq!(ledger.get("k")?, None);

        Ok(())
    }
}
