//! Event ↔ log record conversion bridge.
//!
//! The record carries the event's tag and JSON body; decoding goes
//! through the kernel's tag table so an unknown tag is always an error.

use bieter_engine::error::DecodeError;
use bieter_engine::events::Event;
use bieter_engine::SCHEMA_VERSION;
use sha2::{Digest, Sha256};

use crate::proto_types::ProtoLogRecord;

/// Checksum stored in every record.
pub fn record_checksum(sequence: u64, event_type: &str, payload: &[u8]) -> Vec<u8> {
    let mut hasher = Sha256::new();
    hasher.update(sequence.to_le_bytes());
    hasher.update(event_type.as_bytes());
    hasher.update([0u8]);
    hasher.update(payload);
    hasher.finalize().to_vec()
}

/// Build the record for `event` at `sequence`.
pub fn event_to_record(event: &Event, sequence: u64) -> Result<ProtoLogRecord, serde_json::Error> {
    let payload = event.encode_body()?;
    let event_type = event.tag().to_string();
    let checksum = record_checksum(sequence, &event_type, &payload);
    Ok(ProtoLogRecord {
        sequence,
        schema_version: SCHEMA_VERSION,
        event_type,
        payload,
        checksum,
    })
}

/// Decode a record's event. Integrity (checksum, schema) is checked by the
/// log when the record is read.
pub fn record_to_event(record: &ProtoLogRecord) -> Result<Event, DecodeError> {
    Event::decode(&record.event_type, &record.payload)
}
