//! Integration tests for bieter_runtime.
//!
//! All tests use temporary directories for isolation.

use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread;

use bieter_engine::domain::{Phase, Rules};
use bieter_engine::error::ValidationError;
use bieter_runtime::drift::compare_states;
use bieter_runtime::event_log::{EventLog, EventLogError};
use bieter_runtime::id_gen::IdGenerator;
use bieter_runtime::proto_bridge::record_checksum;
use bieter_runtime::proto_types::ProtoLogRecord;
use bieter_runtime::replay;
use bieter_runtime::store::{Store, StoreError, INTERNAL_ERROR_MESSAGE};

/// Create a temp directory for a test.
fn temp_dir(name: &str) -> PathBuf {
    let dir = std::env::temp_dir()
        .join("bieter_runtime_tests")
        .join(name);
    if dir.exists() {
        fs::remove_dir_all(&dir).ok();
    }
    fs::create_dir_all(&dir).expect("Failed to create temp dir");
    dir
}

fn open_store(log_path: &Path) -> Store {
    Store::open(log_path, Rules::default(), IdGenerator::default()).expect("open store")
}

const P1: &[u8] = br#"{"name":"Erika Mustermann","iban":"DE02120300000000202051"}"#;
const P2: &[u8] = br#"{"name":"Max Mustermann"}"#;

// ─────────────────────────────────────────────────────────────
// Walkthrough from registration to deletion
// ─────────────────────────────────────────────────────────────

#[test]
fn registration_offer_and_admin_delete() {
    let dir = temp_dir("walkthrough");
    let store = open_store(&dir.join("events.log"));
    assert_eq!(store.phase(), Phase::Registration);

    let id = store.create(P1, false).expect("create");
    assert_eq!(id.len(), IdGenerator::DEFAULT_DIGITS as usize);
    assert_eq!(store.get(&id).expect("member").as_bytes(), P1);

    assert_eq!(store.set_phase(2, true).expect("set phase"), Phase::Offer);

    let err = store.set_offer(&id, 3000, false).unwrap_err();
    assert!(matches!(
        err,
        StoreError::Validation(ValidationError::OfferTooLow {
            amount: 3000,
            minimum: 4000
        })
    ));

    store.set_offer(&id, 5000, false).expect("set offer");
    assert_eq!(store.offer(&id), 5000);

    let err = store.delete(&id, false).unwrap_err();
    assert!(matches!(
        err,
        StoreError::Validation(ValidationError::WrongPhase { .. })
    ));

    store.delete(&id, true).expect("admin delete");
    assert!(store.get(&id).is_none());
    assert_eq!(store.offer(&id), 0);
}

// ─────────────────────────────────────────────────────────────
// Phase gating
// ─────────────────────────────────────────────────────────────

#[test]
fn member_mutations_outside_registration_need_admin() {
    let dir = temp_dir("phase_gating");
    let store = open_store(&dir.join("events.log"));
    let id = store.create(P1, false).unwrap();

    for phase in [2, 3] {
        store.set_phase(phase, false).unwrap();

        assert!(matches!(
            store.create(P2, false),
            Err(StoreError::Validation(ValidationError::WrongPhase { .. }))
        ));
        assert!(matches!(
            store.update(&id, P2, false),
            Err(StoreError::Validation(ValidationError::WrongPhase { .. }))
        ));
        assert!(matches!(
            store.delete(&id, false),
            Err(StoreError::Validation(ValidationError::WrongPhase { .. }))
        ));

        let other = store.create(P2, true).expect("admin create");
        store.update(&id, P2, true).expect("admin update");
        store.delete(&other, true).expect("admin delete");
    }
    assert_eq!(store.get(&id).unwrap().as_bytes(), P2);
}

#[test]
fn offers_need_offer_phase_unless_admin() {
    let dir = temp_dir("offer_gating");
    let store = open_store(&dir.join("events.log"));
    let id = store.create(P1, false).unwrap();

    assert!(matches!(
        store.set_offer(&id, 5000, false),
        Err(StoreError::Validation(ValidationError::WrongPhase { .. }))
    ));
    store.set_offer(&id, 5000, true).expect("admin offer");

    store.set_phase(3, true).unwrap();
    assert!(store.set_offer(&id, 6000, false).is_err());
    assert!(matches!(
        store.set_offer(&id, 10, true),
        Err(StoreError::Validation(ValidationError::OfferTooLow { .. }))
    ));
    assert_eq!(store.offer(&id), 5000);
}

#[test]
fn set_phase_rejects_unknown_values() {
    let dir = temp_dir("phase_values");
    let store = open_store(&dir.join("events.log"));
    for value in [0, 4, -1, 100] {
        let err = store.set_phase(value, true).unwrap_err();
        assert!(matches!(
            err,
            StoreError::Validation(ValidationError::InvalidPhase(v)) if v == value
        ));
    }
    assert_eq!(store.sequence(), 0);
    assert_eq!(store.phase_view().state_name, "Registration");
}

#[test]
fn clear_offers_works_in_every_phase_for_everyone() {
    let dir = temp_dir("clear_offers");
    let store = open_store(&dir.join("events.log"));
    let a = store.create(P1, false).unwrap();
    let b = store.create(P2, false).unwrap();

    for phase in [1, 2, 3] {
        store.set_phase(2, true).unwrap();
        store.set_offer(&a, 4100, false).unwrap();
        store.set_offer(&b, 4200, false).unwrap();
        store.set_phase(phase, true).unwrap();

        store.clear_offers(false).expect("clear");
        assert_eq!(store.offer(&a), 0);
        assert_eq!(store.offer(&b), 0);
    }
}

#[test]
fn caller_supplied_ids() {
    let dir = temp_dir("supplied_ids");
    let store = open_store(&dir.join("events.log"));

    assert_eq!(store.create_with_id("A-17", P1, false).unwrap(), "A-17");
    assert!(matches!(
        store.create_with_id("A-17", P2, true),
        Err(StoreError::Validation(ValidationError::MemberExists { .. }))
    ));
    assert!(matches!(
        store.create_with_id("no spaces", P2, false),
        Err(StoreError::Validation(ValidationError::InvalidMemberId(_)))
    ));
    assert!(matches!(
        store.create(b"", false),
        Err(StoreError::Validation(ValidationError::MissingPayload))
    ));
    assert!(matches!(
        store.update("A-17", b"{oops", false),
        Err(StoreError::Validation(ValidationError::MalformedPayload))
    ));
    assert!(matches!(
        store.delete("B-1", true),
        Err(StoreError::Validation(ValidationError::UnknownMember { .. }))
    ));
    assert_eq!(store.sequence(), 1, "rejected events must not reach the log");
}

#[test]
fn members_view_joins_offers() {
    let dir = temp_dir("members_view");
    let store = open_store(&dir.join("events.log"));
    store.create_with_id("1", P1, false).unwrap();
    store.create_with_id("2", P2, false).unwrap();
    store.set_phase(2, true).unwrap();
    store.set_offer("2", 4500, false).unwrap();

    let views = store.members();
    assert_eq!(views.len(), 2);
    assert_eq!((views[0].id.as_str(), views[0].offer), ("1", 0));
    assert_eq!((views[1].id.as_str(), views[1].offer), ("2", 4500));
    assert_eq!(store.list().len(), 2);
}

// ─────────────────────────────────────────────────────────────
// Crash recovery
// ─────────────────────────────────────────────────────────────

#[test]
fn restart_rebuilds_identical_state() {
    let dir = temp_dir("restart");
    let log_path = dir.join("events.log");

    let (before, hash_before) = {
        let store = open_store(&log_path);
        let a = store.create(P1, false).unwrap();
        let b = store.create(P2, false).unwrap();
        store.update(&b, P1, false).unwrap();
        store.set_phase(2, true).unwrap();
        store.set_offer(&a, 4700, false).unwrap();
        assert_eq!(store.sequence(), 5);
        (store.snapshot(), store.state_hash())
    };

    let store = open_store(&log_path);
    assert_eq!(store.sequence(), 5);
    assert_eq!(store.snapshot(), before);
    assert_eq!(store.state_hash(), hash_before);
    assert!(compare_states(&before, &store.snapshot()).is_empty());
}

#[test]
fn restarted_store_keeps_appending() {
    let dir = temp_dir("restart_append");
    let log_path = dir.join("events.log");
    {
        let store = open_store(&log_path);
        store.create_with_id("1", P1, false).unwrap();
    }
    {
        let store = open_store(&log_path);
        store.create_with_id("2", P2, false).unwrap();
        assert_eq!(store.sequence(), 2);
    }
    let store = open_store(&log_path);
    assert_eq!(store.list().len(), 2);
}

#[test]
fn torn_trailing_record_is_truncated() {
    let dir = temp_dir("torn_tail");
    let log_path = dir.join("events.log");

    let before = {
        let store = open_store(&log_path);
        store.create_with_id("1", P1, false).unwrap();
        store.create_with_id("2", P2, false).unwrap();
        store.snapshot()
    };
    let intact_len = fs::metadata(&log_path).unwrap().len();

    // A third record that only half made it to disk.
    {
        let store = open_store(&log_path);
        store.create_with_id("3", P1, false).unwrap();
    }
    let data = fs::read(&log_path).unwrap();
    let torn_len = intact_len as usize + (data.len() - intact_len as usize) / 2;
    fs::write(&log_path, &data[..torn_len]).unwrap();

    let store = open_store(&log_path);
    assert_eq!(store.snapshot(), before);
    assert_eq!(store.sequence(), 2);
    assert_eq!(fs::metadata(&log_path).unwrap().len(), intact_len);

    // The log is usable again after recovery.
    store.create_with_id("3", P2, false).unwrap();
    drop(store);
    assert_eq!(open_store(&log_path).sequence(), 3);
}

#[test]
fn torn_length_prefix_is_truncated() {
    let dir = temp_dir("torn_prefix");
    let log_path = dir.join("events.log");
    {
        let store = open_store(&log_path);
        store.create_with_id("1", P1, false).unwrap();
    }
    let mut data = fs::read(&log_path).unwrap();
    let intact_len = data.len();
    data.extend_from_slice(&[0x20, 0x00]);
    fs::write(&log_path, &data).unwrap();

    let store = open_store(&log_path);
    assert_eq!(store.sequence(), 1);
    assert_eq!(fs::metadata(&log_path).unwrap().len() as usize, intact_len);
}

#[test]
fn zero_filled_tail_is_truncated() {
    let dir = temp_dir("zero_tail");
    let log_path = dir.join("events.log");
    {
        let store = open_store(&log_path);
        store.create_with_id("1", P1, false).unwrap();
    }
    let mut data = fs::read(&log_path).unwrap();
    let intact_len = data.len();
    data.extend_from_slice(&[0u8; 37]);
    fs::write(&log_path, &data).unwrap();

    let store = open_store(&log_path);
    assert_eq!(store.sequence(), 1);
    assert!(store.get("1").is_some());
    assert_eq!(fs::metadata(&log_path).unwrap().len() as usize, intact_len);

    store.create_with_id("2", P2, false).unwrap();
    drop(store);
    let store = open_store(&log_path);
    assert_eq!(store.sequence(), 2);
}

#[test]
fn damaged_record_fails_startup() {
    let dir = temp_dir("damaged");
    let log_path = dir.join("events.log");
    {
        let store = open_store(&log_path);
        store.create_with_id("1", P1, false).unwrap();
        store.create_with_id("2", P2, false).unwrap();
    }

    // Flip a byte inside the first member's payload.
    let mut data = fs::read(&log_path).unwrap();
    let pos = data
        .windows(5)
        .position(|w| w == b"Erika")
        .expect("payload bytes in log");
    data[pos] ^= 0x01;
    fs::write(&log_path, &data).unwrap();

    let result = Store::open(&log_path, Rules::default(), IdGenerator::default());
    assert!(matches!(
        result,
        Err(StoreError::Log(EventLogError::ChecksumMismatch { sequence: 1 }))
    ));
}

#[test]
fn unknown_event_type_fails_startup() {
    let dir = temp_dir("unknown_tag");
    let log_path = dir.join("events.log");
    {
        let store = open_store(&log_path);
        store.create_with_id("1", P1, false).unwrap();
    }
    {
        let mut log = EventLog::open(&log_path).unwrap();
        let payload = br#"{"id":"1"}"#.to_vec();
        log.append(&ProtoLogRecord {
            sequence: 2,
            schema_version: 1,
            event_type: "archive".into(),
            checksum: record_checksum(2, "archive", &payload),
            payload,
        })
        .unwrap();
    }

    let result = Store::open(&log_path, Rules::default(), IdGenerator::default());
    match result {
        Err(StoreError::Log(EventLogError::Event { sequence, .. })) => assert_eq!(sequence, 2),
        Err(other) => panic!("unexpected error: {other}"),
        Ok(_) => panic!("store opened over an unknown event type"),
    }
}

// ─────────────────────────────────────────────────────────────
// Write-ahead discipline
// ─────────────────────────────────────────────────────────────

#[test]
fn failed_append_leaves_state_untouched() {
    let dir = temp_dir("append_failure");
    let log_path = dir.join("events.log");
    let store = open_store(&log_path);
    store.create_with_id("1", P1, false).unwrap();
    let before = store.snapshot();

    // Replace the log file with a directory so the next append cannot open it.
    fs::remove_file(&log_path).unwrap();
    fs::create_dir(&log_path).unwrap();

    let err = store.create_with_id("2", P2, false).unwrap_err();
    assert!(matches!(err, StoreError::Log(EventLogError::Io(_))));
    assert_eq!(err.for_client(), INTERNAL_ERROR_MESSAGE);
    assert_eq!(store.snapshot(), before);
    assert_eq!(store.sequence(), 1);
}

#[test]
fn vanished_log_rejects_further_writes() {
    let dir = temp_dir("vanished_log");
    let log_path = dir.join("events.log");
    let store = open_store(&log_path);
    store.create_with_id("1", P1, false).unwrap();
    let before = store.snapshot();

    fs::remove_file(&log_path).unwrap();

    let err = store.create_with_id("2", P2, false).unwrap_err();
    assert!(matches!(err, StoreError::Log(EventLogError::Io(_))));
    assert_eq!(store.snapshot(), before);
    assert_eq!(store.sequence(), 1);
    assert!(!log_path.exists());
}

// ─────────────────────────────────────────────────────────────
// IDs
// ─────────────────────────────────────────────────────────────

#[test]
fn exhausted_id_space_is_an_internal_error() {
    let dir = temp_dir("exhausted");
    let store = Store::open(&dir.join("events.log"), Rules::default(), IdGenerator::new(1, 50))
        .expect("open store");
    for n in 0..10 {
        store.create_with_id(&n.to_string(), P1, false).unwrap();
    }

    let err = store.create(P2, false).unwrap_err();
    assert!(matches!(err, StoreError::IdSpace(_)));
    assert!(!err.is_validation());
    assert_eq!(err.for_client(), INTERNAL_ERROR_MESSAGE);
    assert_eq!(store.sequence(), 10);
}

#[test]
fn concurrent_creates_get_unique_ids() {
    let dir = temp_dir("concurrent");
    let log_path = dir.join("events.log");
    let store = Arc::new(open_store(&log_path));

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let store = Arc::clone(&store);
            thread::spawn(move || {
                (0..10)
                    .map(|_| store.create(P1, false).expect("create"))
                    .collect::<Vec<_>>()
            })
        })
        .collect();

    let mut ids = BTreeSet::new();
    for handle in handles {
        for id in handle.join().expect("worker") {
            assert!(ids.insert(id), "duplicate id handed out");
        }
    }
    assert_eq!(ids.len(), 80);
    assert_eq!(store.sequence(), 80);

    let log = EventLog::open(&log_path).unwrap();
    let events = replay::load_events(&log).unwrap();
    let (state, hash) = replay::rebuild_state(&events);
    assert_eq!(state, store.snapshot());
    assert_eq!(hash, store.state_hash());
}
