//! Property-based tests for the indexed record store and the id generators
//!
//! Registrations are generated as random (record, attribute value) pairs over a
//! small value alphabet, so values collide often and index entries grow long.
//! The properties check what an index entry lists after any such history, and
//! what survives a cascading delete through one index.

use proptest::prelude::*;
use record_ledger::clock::{FixedClock, TimeStamp};
use record_ledger::id::SequentialIdGenerator;
use record_ledger::index::{Index, IndexMode, IndexedRecordStore};
use record_ledger::ledger::{Ledger, MemoryLedger};
use std::collections::BTreeSet;

const COLOR: Index = Index::new("color", "COLOR_");
const SHAPE: Index = Index::new("shape", "SHAPE_");

// PROPERTY TEST STRATEGIES

/// Strategy to generate a history of (color, shape) registrations, one record each
fn history_strategy() -> impl Strategy<Value = Vec<(u8, u8)>> {
    prop::collection::vec((0u8..4, 0u8..4), 1..40)
}

/// Strategy to generate primary ids with repeats, for idempotent registration
fn repeated_ids_strategy() -> impl Strategy<Value = Vec<u8>> {
    prop::collection::vec(0u8..8, 1..40)
}

fn record_key(n: usize) -> String {
    format!("REC_{n}")
}

fn register_history(store: &IndexedRecordStore, history: &[(u8, u8)]) {
    for (n, (color, shape)) in history.iter().enumerate() {
        let keys = vec![
            COLOR.key_for(&color.to_string()),
            SHAPE.key_for(&shape.to_string()),
        ];
        store
            .register(&record_key(n), n.to_string().as_bytes(), &keys, IndexMode::Append)
            .unwrap();
    }
}

proptest! {
    /// Property: an index entry lists exactly the records registered with its
    /// value, in registration order
    #[test]
    fn lookup_lists_registrations_in_order(history in history_strategy(), color in 0u8..4) {
        let ledger = MemoryLedger::new();
        let store = IndexedRecordStore::new(&ledger);
        register_history(&store, &history);

        let expected: Vec<String> = history
            .iter()
            .enumerate()
            .filter(|(_, (c, _))| *c == color)
            .map(|(n, _)| record_key(n))
            .collect();
        let found: Vec<String> = store
            .lookup(&COLOR.key_for(&color.to_string()))
            .unwrap()
            .into_iter()
            .map(|r| r.key)
            .collect();

        prop_assert_eq!(found, expected);
    }

    /// Property: after removing through one index, no lookup returns a removed
    /// record, the other index entries are untouched, and every other record stays
    #[test]
    fn cascading_delete_only_hides_removed_records(history in history_strategy(), color in 0u8..4) {
        let ledger = MemoryLedger::new();
        let store = IndexedRecordStore::new(&ledger);
        register_history(&store, &history);

        let shape_entries_before: Vec<Vec<String>> = (0u8..4)
            .map(|s| store.entry(&SHAPE.key_for(&s.to_string())).unwrap())
            .collect();

        let removed: BTreeSet<String> = store
            .remove_by_index(&COLOR.key_for(&color.to_string()))
            .unwrap()
            .into_iter()
            .collect();

        prop_assert!(store.lookup(&COLOR.key_for(&color.to_string())).unwrap().is_empty());

        for shape in 0u8..4 {
            let key = SHAPE.key_for(&shape.to_string());
            prop_assert_eq!(&store.entry(&key).unwrap(), &shape_entries_before[shape as usize]);
            for record in store.lookup(&key).unwrap() {
                prop_assert!(!removed.contains(&record.key));
            }
        }

        for n in 0..history.len() {
            let present = ledger.get(&record_key(n)).unwrap().is_some();
            prop_assert_eq!(present, !removed.contains(&record_key(n)));
        }
    }

    /// Property: idempotent registration lists each id once, in first-seen order
    #[test]
    fn idempotent_entries_have_no_duplicates(ids in repeated_ids_strategy()) {
        let ledger = MemoryLedger::new();
        let store = IndexedRecordStore::new(&ledger);
        let all = vec!["ALL".to_string()];

        let mut expected: Vec<String> = Vec::new();
        for id in &ids {
            let key = format!("ID_{id}");
            store.register(&key, b"x", &all, IndexMode::Idempotent).unwrap();
            if !expected.contains(&key) {
                expected.push(key);
            }
        }

        prop_assert_eq!(store.entry("ALL").unwrap(), expected);
    }

    /// Property: ids handed out within one year are distinct, increasing and
    /// padded to five digits
    #[test]
    fn contract_ids_increase_within_a_year(year in 2000i32..2100, count in 1usize..30) {
        let ledger = MemoryLedger::new();
        let clock = FixedClock(TimeStamp::new_with(year, 7, 1, 0, 0, 0).unwrap());
        let generator = SequentialIdGenerator::contract();

        let ids: Vec<String> = (0..count)
            .map(|_| generator.next(&ledger, &clock).unwrap())
            .collect();

        for (n, id) in ids.iter().enumerate() {
            prop_assert_eq!(id, &format!("SLA_CONT_{}_{:05}", year, n + 1));
        }
        prop_assert_eq!(generator.peek(&ledger).unwrap(), count as u64 + 1);
    }

    /// Property: a new year always restarts the sequence at 00001
    #[test]
    fn year_change_restarts_sequence(year in 2000i32..2099, before in 1usize..10) {
        let ledger = MemoryLedger::new();
        let generator = SequentialIdGenerator::contract_temp();
        let this_year = FixedClock(TimeStamp::new_with(year, 12, 31, 0, 0, 0).unwrap());
        let next_year = FixedClock(TimeStamp::new_with(year + 1, 1, 1, 0, 0, 0).unwrap());

        for _ in 0..before {
            generator.next(&ledger, &this_year).unwrap();
        }

        prop_assert_eq!(
            generator.next(&ledger, &next_year).unwrap(),
            format!("SLA_CONT_TEMP_{}_00001", year + 1)
        );
    }
}
