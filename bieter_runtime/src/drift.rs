//! Drift detection: determinism verification and state comparison.

use std::collections::BTreeSet;

use bieter_engine::domain::Phase;
use bieter_engine::events::Event;
use bieter_engine::state::StoreState;
use thiserror::Error;

use crate::replay;

/// Two replays of the same stream disagreed.
#[derive(Debug, Error)]
#[error("determinism failure: replay 1 hashed {first}, replay 2 hashed {second}")]
pub struct DeterminismError {
    pub first: String,
    pub second: String,
}

/// Replay the same events twice and compare canonical hashes.
pub fn verify_determinism(events: &[Event]) -> Result<String, DeterminismError> {
    let first = replay::rebuild_hash(events);
    let second = replay::rebuild_hash(events);
    if first != second {
        return Err(DeterminismError { first, second });
    }
    Ok(first)
}

/// Structured comparison of two states.
pub fn compare_states(state_a: &StoreState, state_b: &StoreState) -> DriftReport {
    let ids_a: BTreeSet<&str> = state_a.members.keys().map(String::as_str).collect();
    let ids_b: BTreeSet<&str> = state_b.members.keys().map(String::as_str).collect();

    let added_members = ids_b.difference(&ids_a).map(|s| s.to_string()).collect();
    let removed_members = ids_a.difference(&ids_b).map(|s| s.to_string()).collect();
    let changed_members = ids_a
        .intersection(&ids_b)
        .filter(|id| state_a.members[**id] != state_b.members[**id])
        .map(|s| s.to_string())
        .collect();

    let offer_ids: BTreeSet<&str> = state_a
        .offers
        .keys()
        .chain(state_b.offers.keys())
        .map(String::as_str)
        .collect();
    let changed_offers = offer_ids
        .into_iter()
        .filter(|id| state_a.offers.get(*id) != state_b.offers.get(*id))
        .map(|id| OfferDrift {
            id: id.to_string(),
            before: state_a.offers.get(id).copied(),
            after: state_b.offers.get(id).copied(),
        })
        .collect();

    DriftReport {
        phase_a: state_a.phase,
        phase_b: state_b.phase,
        member_count_a: state_a.members.len(),
        member_count_b: state_b.members.len(),
        added_members,
        removed_members,
        changed_members,
        changed_offers,
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OfferDrift {
    pub id: String,
    pub before: Option<i64>,
    pub after: Option<i64>,
}

/// Differences between two states. Empty when they are identical.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DriftReport {
    pub phase_a: Phase,
    pub phase_b: Phase,
    pub member_count_a: usize,
    pub member_count_b: usize,
    pub added_members: Vec<String>,
    pub removed_members: Vec<String>,
    pub changed_members: Vec<String>,
    pub changed_offers: Vec<OfferDrift>,
}

impl DriftReport {
    pub fn is_empty(&self) -> bool {
        self.phase_a == self.phase_b
            && self.added_members.is_empty()
            && self.removed_members.is_empty()
            && self.changed_members.is_empty()
            && self.changed_offers.is_empty()
    }
}
