//! Records with hand-maintained reverse indexes.
//!
//! An index entry is the `|`-joined list of primary keys that carry one attribute
//! value, stored under `namespace + value`. Entries are only ever appended to.
//! Removing through one index does not touch the others: ids it deletes stay listed
//! in every other index that named them, and lookups through those skip them.
use super::ledger::{Ledger, LedgerResult};
use super::utils::{join_entry, split_entry};

/// A named family of index entries sharing one key prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Index {
    pub name: &'static str,
    pub namespace: &'static str,
}

impl Index {
    pub const fn new(name: &'static str, namespace: &'static str) -> Self {
        Self { name, namespace }
    }
    pub fn key_for(&self, value: &str) -> String {
        format!("{}{}", self.namespace, value)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexMode {
    /// Every registration appends, duplicates included.
    Append,
    /// Skip the append when the id is already listed.
    Idempotent,
}

/// A record read back through an index, keyed by its primary key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredRecord {
    pub key: String,
    pub value: Vec<u8>,
}

pub struct IndexedRecordStore<'a> {
    ledger: &'a dyn Ledger,
}

impl<'a> IndexedRecordStore<'a> {
    pub fn new(ledger: &'a dyn Ledger) -> Self {
        Self { ledger }
    }

    /// Writes the record, then appends its key to every index entry in `index_keys`.
    ///
    /// Writes are independent: a failure part way through leaves the record and the
    /// indexes already touched in place.
    pub fn register(
        &self,
        primary_key: &str,
        value: &[u8],
        index_keys: &[String],
        mode: IndexMode,
    ) -> LedgerResult<()> {
        self.ledger.put(primary_key, value)?;

        for index_key in index_keys {
            self.append_to_entry(index_key, primary_key, mode)?;
        }

        tracing::debug!(primary_key, indexes = index_keys.len(), "registered record");
        Ok(())
    }

    pub fn append_to_entry(
        &self,
        index_key: &str,
        primary_key: &str,
        mode: IndexMode,
    ) -> LedgerResult<()> {
        let mut ids = self.entry(index_key)?;

        if mode == IndexMode::Idempotent && ids.iter().any(|id| id == primary_key) {
            return Ok(());
        }

        ids.push(primary_key.to_string());
        self.ledger.put(index_key, &join_entry(&ids))
    }

    /// The ids listed under `index_key`; empty when the entry does not exist.
    pub fn entry(&self, index_key: &str) -> LedgerResult<Vec<String>> {
        let bytes = self.ledger.get(index_key)?;
        Ok(bytes.map(|b| split_entry(&b)).unwrap_or_default())
    }

    /// Overwrites the record under its primary key without touching any index.
    pub fn put_record(&self, primary_key: &str, value: &[u8]) -> LedgerResult<()> {
        self.ledger.put(primary_key, value)
    }

    pub fn get_record(&self, primary_key: &str) -> LedgerResult<Option<Vec<u8>>> {
        self.ledger.get(primary_key)
    }

    /// Deletes one record. Index entries that list it are left as they are.
    pub fn delete_record(&self, primary_key: &str) -> LedgerResult<()> {
        self.ledger.delete(primary_key)
    }

    /// Records listed under `index_key`, in index order. Ids whose record is
    /// gone are skipped.
    pub fn lookup(&self, index_key: &str) -> LedgerResult<Vec<StoredRecord>> {
        let ids = self.entry(index_key)?;
        self.read_all(index_key, ids)
    }

    /// Deletes every record listed under `index_key`, then the entry itself.
    /// Returns the ids that were listed.
    pub fn remove_by_index(&self, index_key: &str) -> LedgerResult<Vec<String>> {
        let ids = self.entry(index_key)?;

        for id in &ids {
            self.ledger.delete(id)?;
        }
        self.ledger.delete(index_key)?;

        tracing::info!(index_key, removed = ids.len(), "cascading delete");
        Ok(ids)
    }

    /// Records `prefix1 .. prefix(next - 1)`, skipping the missing ones.
    pub fn list_sequential(&self, prefix: &str, next: u64) -> LedgerResult<Vec<StoredRecord>> {
        let ids = (1..next).map(|n| format!("{prefix}{n}")).collect();
        self.read_all(prefix, ids)
    }

    /// Diagnostic listing of every key under `prefix`, in key order.
    pub fn scan_prefix(&self, prefix: &str) -> LedgerResult<Vec<StoredRecord>> {
        Ok(self
            .ledger
            .scan_prefix(prefix)?
            .into_iter()
            .map(|(key, value)| StoredRecord { key, value })
            .collect())
    }

    fn read_all(&self, source: &str, ids: Vec<String>) -> LedgerResult<Vec<StoredRecord>> {
        let mut records = Vec::with_capacity(ids.len());

        for key in ids {
            match self.ledger.get(&key)? {
                Some(value) => records.push(StoredRecord { key, value }),
                None => tracing::warn!(source, %key, "skipping reference to missing record"),
            }
        }

        Ok(records)
    }
}
