//! Store state and its construction.

use std::collections::BTreeMap;

use crate::domain::{MemberView, Payload, Phase};

/// Everything the log rebuilds. Ordered maps keep iteration, and therefore
/// canonical hashing, deterministic.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StoreState {
    pub members: BTreeMap<String, Payload>,
    pub offers: BTreeMap<String, i64>,
    pub phase: Phase,
}

impl StoreState {
    pub fn contains_member(&self, id: &str) -> bool {
        self.members.contains_key(id)
    }

    /// Offer of `id`, 0 when none was placed.
    pub fn offer(&self, id: &str) -> i64 {
        self.offers.get(id).copied().unwrap_or(0)
    }

    /// Every member joined with its offer, ordered by ID.
    pub fn member_views(&self) -> Vec<MemberView> {
        self.members
            .iter()
            .map(|(id, payload)| MemberView {
                id: id.clone(),
                payload: payload.clone(),
                offer: self.offer(id),
            })
            .collect()
    }
}

/// Fresh state: no members, no offers, phase Registration.
pub fn create_initial_state() -> StoreState {
    StoreState {
        members: BTreeMap::new(),
        offers: BTreeMap::new(),
        phase: Phase::Registration,
    }
}
