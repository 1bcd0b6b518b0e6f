//! Replay orchestrator: rebuild state from the event log.
//!
//! Delegates all domain logic to the kernel. Replay executes events only;
//! validation already happened when they were first accepted.

use bieter_engine::engine::BieterEngine;
use bieter_engine::events::Event;
use bieter_engine::hashing::canonical_hash;
use bieter_engine::state::StoreState;

use crate::event_log::{EventLog, EventLogError};
use crate::proto_bridge::record_to_event;

/// Rebuild the store state from a sequence of events.
///
/// Returns `(final_state, canonical_hash)`. A pure function of the event
/// stream.
pub fn rebuild_state(events: &[Event]) -> (StoreState, String) {
    let mut engine = BieterEngine::new();
    let state = engine.replay(events).clone();
    let hash = canonical_hash(&state);
    (state, hash)
}

/// Rebuild state and return only the canonical hash.
pub fn rebuild_hash(events: &[Event]) -> String {
    let (_, hash) = rebuild_state(events);
    hash
}

/// Decode every record of `log`. The first undecodable record, unknown
/// tags included, fails the whole load.
pub fn load_events(log: &EventLog) -> Result<Vec<Event>, EventLogError> {
    log.load_all()?
        .iter()
        .map(|record| {
            record_to_event(record).map_err(|source| EventLogError::Event {
                sequence: record.sequence,
                source,
            })
        })
        .collect()
}

/// Read `log` front to back and rebuild the engine it describes.
pub fn rebuild_engine(log: &EventLog) -> Result<BieterEngine, EventLogError> {
    let events = load_events(log)?;
    let mut engine = BieterEngine::new();
    engine.apply_sequence(&events);
    Ok(engine)
}
