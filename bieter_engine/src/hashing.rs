//! Canonical hashing.
//!
//! Deterministic canonical serialization + SHA-256 hashing of the store
//! state. Two states hash equal exactly when members, offers and phase are
//! equal.
//!
//! Rules:
//!   - Members sorted by id (UTF-8 byte order), payload kept verbatim
//!   - Offers sorted by id
//!   - UTF-8 JSON, no whitespace, fixed field order

use serde_json::{Map, Value};
use sha2::{Digest, Sha256};

use crate::state::StoreState;
use crate::SCHEMA_VERSION;

/// Canonical serialization of the state to UTF-8 JSON bytes.
pub fn canonical_serialize(state: &StoreState) -> Result<Vec<u8>, serde_json::Error> {
    serde_json::to_vec(&build_canonical_value(state))
}

/// SHA-256 of the canonical serialization, lowercase hex.
pub fn canonical_hash(state: &StoreState) -> String {
    let bytes = canonical_serialize(state).expect("canonical serialization must not fail");
    to_hex(&Sha256::digest(&bytes))
}

pub fn to_hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}

/// Field order: schema_version, phase, members, offers.
fn build_canonical_value(state: &StoreState) -> Value {
    // BTreeMap is already sorted by key
    let members: Vec<Value> = state
        .members
        .iter()
        .map(|(id, payload)| {
            let mut m = Map::new();
            m.insert("id".to_string(), Value::String(id.clone()));
            m.insert("payload".to_string(), Value::String(payload.as_str().to_string()));
            Value::Object(m)
        })
        .collect();

    let offers: Vec<Value> = state
        .offers
        .iter()
        .map(|(id, amount)| {
            let mut m = Map::new();
            m.insert("id".to_string(), Value::String(id.clone()));
            m.insert("amount".to_string(), Value::Number((*amount).into()));
            Value::Object(m)
        })
        .collect();

    let mut root = Map::new();
    root.insert(
        "schema_version".to_string(),
        Value::Number(SCHEMA_VERSION.into()),
    );
    root.insert("phase".to_string(), Value::Number(state.phase.number().into()));
    root.insert("members".to_string(), Value::Array(members));
    root.insert("offers".to_string(), Value::Array(offers));
    Value::Object(root)
}
