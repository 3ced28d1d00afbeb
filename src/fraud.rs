//! Fraud entries (FDS): eight-field records indexed by CID, MAC and UUID.
use super::clock::Clock;
use super::error::{ValidationError, WorkflowError};
use super::id::SequentialIdGenerator;
use super::index::{Index, IndexMode, IndexedRecordStore, StoredRecord};
use super::ledger::Ledger;
use serde::{Deserialize, Serialize};

pub const NUM_FIELDS: usize = 8;

pub const PREFIX_EID: &str = "FDS_EID_";
pub const CID_INDEX: Index = Index::new("cid", "FDS_CID_");
pub const MAC_INDEX: Index = Index::new("mac", "FDS_MAC_");
pub const UUID_INDEX: Index = Index::new("uuid", "FDS_UUID_");

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FraudKey {
    Cid,
    Mac,
    Uuid,
}

impl FraudKey {
    pub fn index(&self) -> Index {
        match self {
            FraudKey::Cid => CID_INDEX,
            FraudKey::Mac => MAC_INDEX,
            FraudKey::Uuid => UUID_INDEX,
        }
    }
}

/// Blacklisted entries are the default; whitelisting is an explicit update.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "u8", try_from = "u8")]
pub enum LedgerStatus {
    Whitelist,
    Blacklist,
}

impl From<LedgerStatus> for u8 {
    fn from(status: LedgerStatus) -> u8 {
        match status {
            LedgerStatus::Whitelist => 1,
            LedgerStatus::Blacklist => 9,
        }
    }
}

impl TryFrom<u8> for LedgerStatus {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(LedgerStatus::Whitelist),
            9 => Ok(LedgerStatus::Blacklist),
            other => Err(format!("unknown ledger status {other}")),
        }
    }
}

impl std::str::FromStr for LedgerStatus {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "WL" => Ok(LedgerStatus::Whitelist),
            "BL" => Ok(LedgerStatus::Blacklist),
            other => Err(ValidationError::InvalidLedgerStatus(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FraudEntry {
    pub eid: u64,
    pub cid: String,
    pub mac: String,
    pub uuid: String,
    pub final_date: String,
    pub final_time: String,
    pub produced_by: String,
    pub registered_by: String,
    pub reason: String,
    pub ledger_status: LedgerStatus,
    pub ledger_status_update_time: String,
    pub ledger_status_update_reason: String,
}

impl FraudEntry {
    /// Builds an entry from the positional register arguments.
    pub fn from_fields(eid: u64, fields: &[String]) -> Result<Self, ValidationError> {
        let [cid, mac, uuid, final_date, final_time, produced_by, registered_by, reason] =
            fields
        else {
            return Err(ValidationError::FieldCount {
                expected: NUM_FIELDS,
                given: fields.len(),
            });
        };

        Ok(Self {
            eid,
            cid: cid.clone(),
            mac: mac.clone(),
            uuid: uuid.clone(),
            final_date: final_date.clone(),
            final_time: final_time.clone(),
            produced_by: produced_by.clone(),
            registered_by: registered_by.clone(),
            reason: reason.clone(),
            ledger_status: LedgerStatus::Blacklist,
            ledger_status_update_time: String::new(),
            ledger_status_update_reason: String::new(),
        })
    }

    pub fn key(&self) -> String {
        eid_key(self.eid)
    }

    pub fn index_keys(&self) -> Vec<String> {
        vec![
            CID_INDEX.key_for(&self.cid),
            MAC_INDEX.key_for(&self.mac),
            UUID_INDEX.key_for(&self.uuid),
        ]
    }
}

pub fn eid_key(eid: u64) -> String {
    format!("{PREFIX_EID}{eid}")
}

pub struct FraudRegistry<'a> {
    ledger: &'a dyn Ledger,
    clock: &'a dyn Clock,
    ids: SequentialIdGenerator,
}

impl<'a> FraudRegistry<'a> {
    pub fn new(ledger: &'a dyn Ledger, clock: &'a dyn Clock) -> Self {
        Self {
            ledger,
            clock,
            ids: SequentialIdGenerator::fraud_entry(),
        }
    }

    fn store(&self) -> IndexedRecordStore<'a> {
        IndexedRecordStore::new(self.ledger)
    }

    /// Registers a new entry from exactly [`NUM_FIELDS`] fields and returns it.
    pub fn register(&self, fields: &[String]) -> anyhow::Result<FraudEntry> {
        if fields.len() != NUM_FIELDS {
            return Err(ValidationError::FieldCount {
                expected: NUM_FIELDS,
                given: fields.len(),
            }
            .into());
        }

        let eid = self.ids.peek(self.ledger)?;
        let entry = FraudEntry::from_fields(eid, fields)?;

        let value = serde_json::to_vec(&entry)?;
        self.store()
            .register(&entry.key(), &value, &entry.index_keys(), IndexMode::Append)?;
        // the counter only moves once the entry and its indexes are written
        self.ids.next(self.ledger, self.clock)?;

        tracing::info!(eid = entry.eid, cid = %entry.cid, "registered fraud entry");
        Ok(entry)
    }

    pub fn lookup_with(&self, key: FraudKey, value: &str) -> anyhow::Result<Vec<FraudEntry>> {
        let index = key.index();
        let records = self.store().lookup(&index.key_for(value))?;
        tracing::debug!(index = index.name, value, found = records.len(), "fraud lookup");
        decode_all(records)
    }

    /// Deletes every entry listed under the value, then the index entry.
    pub fn delete_with(&self, key: FraudKey, value: &str) -> anyhow::Result<Vec<String>> {
        let index = key.index();
        let removed = self.store().remove_by_index(&index.key_for(value))?;
        tracing::info!(index = index.name, value, removed = removed.len(), "deleted fraud entries");
        Ok(removed)
    }

    /// Deletes a single entry. Its CID/MAC/UUID index entries keep naming it.
    pub fn delete_with_eid(&self, eid: u64) -> anyhow::Result<()> {
        self.store().delete_record(&eid_key(eid))?;
        tracing::info!(eid, "deleted fraud entry");
        Ok(())
    }

    pub fn update_ledger_status_with_eid(
        &self,
        eid: u64,
        status: LedgerStatus,
        update_time: &str,
        update_reason: &str,
    ) -> anyhow::Result<FraudEntry> {
        let key = eid_key(eid);
        let bytes = self
            .store()
            .get_record(&key)?
            .ok_or_else(|| WorkflowError::NotFound(key.clone()))?;

        let mut entry: FraudEntry = serde_json::from_slice(&bytes)?;
        entry.ledger_status = status;
        entry.ledger_status_update_time = update_time.to_string();
        entry.ledger_status_update_reason = update_reason.to_string();

        self.store().put_record(&key, &serde_json::to_vec(&entry)?)?;
        Ok(entry)
    }

    pub fn get_all(&self) -> anyhow::Result<Vec<FraudEntry>> {
        let next = self.ids.peek(self.ledger)?;
        decode_all(self.store().list_sequential(PREFIX_EID, next)?)
    }

    pub fn next_eid(&self) -> anyhow::Result<u64> {
        Ok(self.ids.peek(self.ledger)?)
    }
}

fn decode_all(records: Vec<StoredRecord>) -> anyhow::Result<Vec<FraudEntry>> {
    records
        .iter()
        .map(|record| Ok(serde_json::from_slice(&record.value)?))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::SystemClock;
    use crate::ledger::MemoryLedger;

    fn fields(cid: &str, mac: &str, uuid: &str, n: u32) -> Vec<String> {
        vec![
            cid.to_string(),
            mac.to_string(),
            uuid.to_string(),
            format!("finaldate{n}"),
            format!("finaltime{n}"),
            format!("fdsproducedby{n}"),
            format!("fdsregisteredby{n}"),
            format!("fdsreason{n}"),
        ]
    }

    #[test]
    fn register_writes_record_and_indexes() {
        let ledger = MemoryLedger::new();
        let registry = FraudRegistry::new(&ledger, &SystemClock);

        registry.register(&fields("cid", "mac", "uuid", 1)).unwrap();
        registry.register(&fields("cid", "mac", "uuid", 2)).unwrap();

        for key in ["FDS_CID_cid", "FDS_MAC_mac", "FDS_UUID_uuid"] {
            assert_eq!(ledger.get(key).unwrap(), Some(b"FDS_EID_1|FDS_EID_2".to_vec()));
        }
        assert_eq!(ledger.get("FDS_NEXTEID").unwrap(), Some(b"3".to_vec()));

        let stored: FraudEntry =
            serde_json::from_slice(&ledger.get("FDS_EID_1").unwrap().unwrap()).unwrap();
        assert_eq!(stored.reason, "fdsreason1");
        assert_eq!(stored.ledger_status, LedgerStatus::Blacklist);
    }

    #[test]
    fn wrong_field_count_writes_nothing() {
        let ledger = MemoryLedger::new();
        let registry = FraudRegistry::new(&ledger, &SystemClock);

        let mut short = fields("cid", "mac", "uuid", 1);
        short.pop();
        let err = registry.register(&short).unwrap_err();

        assert_eq!(
            err.downcast_ref::<ValidationError>(),
            Some(&ValidationError::FieldCount {
                expected: 8,
                given: 7
            })
        );
        assert!(ledger.is_empty());
    }

    #[test]
    fn ledger_status_encodes_as_number() {
        let entry = FraudEntry::from_fields(1, &fields("c", "m", "u", 1)).unwrap();
        let json = serde_json::to_string(&entry).unwrap();

        assert!(json.contains("\"ledgerStatus\":9"));
        assert!(json.contains("\"finalDate\":\"finaldate1\""));
    }

    #[test]
    fn parses_status_codes() {
        assert_eq!("WL".parse::<LedgerStatus>(), Ok(LedgerStatus::Whitelist));
        assert_eq!("BL".parse::<LedgerStatus>(), Ok(LedgerStatus::Blacklist));
        assert!("XX".parse::<LedgerStatus>().is_err());
    }

    #[test]
    fn update_status_of_missing_entry_fails() {
        let ledger = MemoryLedger::new();
        let registry = FraudRegistry::new(&ledger, &SystemClock);

        let res = registry.update_ledger_status_with_eid(4, LedgerStatus::Whitelist, "t", "r");
        assert!(res.is_err());
    }
}
