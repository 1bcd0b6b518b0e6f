//! Centralized transition logic.
//!
//! ALL state mutation lives here. Execution is plain map mutation and
//! cannot fail; it trusts that the event was validated (live) or was
//! accepted in the past (replay).

use crate::events::Event;
use crate::state::StoreState;

/// Apply `event` to `state` in place.
pub fn apply_event(state: &mut StoreState, event: &Event) {
    match event {
        Event::CreateMember(w) | Event::UpdateMember(w) => {
            state.members.insert(w.id.clone(), w.payload.clone());
        }
        Event::DeleteMember(r) => {
            state.members.remove(&r.id);
            // An offer never outlives its member.
            state.offers.remove(&r.id);
        }
        Event::SetPhase(p) => {
            state.phase = p.phase;
        }
        Event::SetOffer(o) => {
            state.offers.insert(o.id.clone(), o.offer);
        }
        Event::ClearOffers(_) => {
            state.offers.clear();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Payload, Phase, Rules};
    use crate::state::create_initial_state;

    fn payload(raw: &str) -> Payload {
        Payload::parse(raw.as_bytes()).unwrap()
    }

    #[test]
    fn update_replaces_payload_wholesale() {
        let mut state = create_initial_state();
        apply_event(&mut state, &Event::create("a", payload(r#"{"x":1,"y":2}"#)).unwrap());
        apply_event(&mut state, &Event::update("a", payload(r#"{"z":3}"#)));
        assert_eq!(state.members["a"].as_str(), r#"{"z":3}"#);
    }

    #[test]
    fn delete_drops_the_offer_too() {
        let mut state = create_initial_state();
        apply_event(&mut state, &Event::create("a", payload("{}")).unwrap());
        apply_event(&mut state, &Event::set_offer("a", 4500, &Rules::default()).unwrap());
        apply_event(&mut state, &Event::delete("a"));
        assert!(state.members.is_empty());
        assert_eq!(state.offer("a"), 0);
    }

    #[test]
    fn offers_upsert_and_clear() {
        let mut state = create_initial_state();
        let rules = Rules::default();
        apply_event(&mut state, &Event::set_offer("a", 4000, &rules).unwrap());
        apply_event(&mut state, &Event::set_offer("a", 6000, &rules).unwrap());
        apply_event(&mut state, &Event::set_offer("b", 5000, &rules).unwrap());
        assert_eq!(state.offer("a"), 6000);
        apply_event(&mut state, &Event::clear_offers());
        assert!(state.offers.is_empty());
    }

    #[test]
    fn set_phase_is_visible() {
        let mut state = create_initial_state();
        apply_event(&mut state, &Event::set_phase(3).unwrap());
        assert_eq!(state.phase, Phase::Closed);
    }
}
