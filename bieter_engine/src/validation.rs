//! State checks run before an event is accepted.
//!
//! Only the phase gate depends on privilege. Existence checks apply to
//! admins as well. Replay never calls into this module.

use crate::domain::Phase;
use crate::error::ValidationError;
use crate::events::Event;
use crate::state::StoreState;

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Check `event` against `state`. Returns the first failure.
pub fn validate_event(
    state: &StoreState,
    event: &Event,
    as_admin: bool,
) -> Result<(), ValidationError> {
    match event {
        Event::CreateMember(w) => {
            require_phase(state, Phase::Registration, as_admin)?;
            if state.contains_member(&w.id) {
                return Err(ValidationError::MemberExists { id: w.id.clone() });
            }
            Ok(())
        }
        Event::UpdateMember(w) => {
            require_phase(state, Phase::Registration, as_admin)?;
            require_member(state, &w.id)
        }
        Event::DeleteMember(r) => {
            require_phase(state, Phase::Registration, as_admin)?;
            require_member(state, &r.id)
        }
        Event::SetOffer(o) => {
            require_phase(state, Phase::Offer, as_admin)?;
            require_member(state, &o.id)
        }
        Event::SetPhase(_) | Event::ClearOffers(_) => Ok(()),
    }
}

// ---------------------------------------------------------------------------
// Individual checks (private)
// ---------------------------------------------------------------------------

fn require_phase(state: &StoreState, required: Phase, as_admin: bool) -> Result<(), ValidationError> {
    if as_admin || state.phase == required {
        return Ok(());
    }
    Err(ValidationError::WrongPhase {
        required,
        current: state.phase,
    })
}

fn require_member(state: &StoreState, id: &str) -> Result<(), ValidationError> {
    if state.contains_member(id) {
        Ok(())
    } else {
        Err(ValidationError::UnknownMember { id: id.to_string() })
    }
}
