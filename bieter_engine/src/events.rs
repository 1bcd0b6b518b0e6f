//! Event definitions.
//!
//! Events are pure data: intent plus payload. Structural checks happen when
//! an event is constructed; checks against the current state live in
//! `validation`, mutation lives in `transitions`.
//!
//! Every variant has a stable tag. The tag and the JSON body are what the
//! log stores, and `Event::decode` maps them back through `DECODERS`.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::domain::{Payload, Phase, Rules};
use crate::error::{DecodeError, ValidationError};
use crate::ids::validate_member_id;

pub const TAG_CREATE: &str = "create";
pub const TAG_UPDATE: &str = "update";
pub const TAG_DELETE: &str = "delete";
pub const TAG_SET_PHASE: &str = "state";
pub const TAG_SET_OFFER: &str = "offer";
pub const TAG_CLEAR_OFFERS: &str = "offer-clear";

// ── Bodies ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemberWrite {
    pub id: String,
    pub payload: Payload,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemberRef {
    pub id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhaseChange {
    #[serde(rename = "state")]
    pub phase: Phase,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OfferBid {
    pub id: String,
    pub offer: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OfferClear {}

// ── Event ──────────────────────────────────────────────────────────

/// One accepted change of the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    CreateMember(MemberWrite),
    UpdateMember(MemberWrite),
    DeleteMember(MemberRef),
    SetPhase(PhaseChange),
    SetOffer(OfferBid),
    ClearOffers(OfferClear),
}

impl Event {
    /// Create a member under `id`. The caller generates the ID when the
    /// request did not carry one.
    pub fn create(id: &str, payload: Payload) -> Result<Self, ValidationError> {
        validate_member_id(id)?;
        Ok(Event::CreateMember(MemberWrite {
            id: id.to_string(),
            payload,
        }))
    }

    pub fn update(id: &str, payload: Payload) -> Self {
        Event::UpdateMember(MemberWrite {
            id: id.to_string(),
            payload,
        })
    }

    pub fn delete(id: &str) -> Self {
        Event::DeleteMember(MemberRef { id: id.to_string() })
    }

    /// Rejects any value outside the three known phases.
    pub fn set_phase(value: i64) -> Result<Self, ValidationError> {
        let phase = Phase::try_from(value)?;
        Ok(Event::SetPhase(PhaseChange { phase }))
    }

    pub fn set_offer(id: &str, amount: i64, rules: &Rules) -> Result<Self, ValidationError> {
        if amount < rules.minimum_offer {
            return Err(ValidationError::OfferTooLow {
                amount,
                minimum: rules.minimum_offer,
            });
        }
        Ok(Event::SetOffer(OfferBid {
            id: id.to_string(),
            offer: amount,
        }))
    }

    pub fn clear_offers() -> Self {
        Event::ClearOffers(OfferClear {})
    }

    /// Stable type tag used by the log codec.
    pub fn tag(&self) -> &'static str {
        match self {
            Event::CreateMember(_) => TAG_CREATE,
            Event::UpdateMember(_) => TAG_UPDATE,
            Event::DeleteMember(_) => TAG_DELETE,
            Event::SetPhase(_) => TAG_SET_PHASE,
            Event::SetOffer(_) => TAG_SET_OFFER,
            Event::ClearOffers(_) => TAG_CLEAR_OFFERS,
        }
    }

    /// Member this event targets, if any.
    pub fn member_id(&self) -> Option<&str> {
        match self {
            Event::CreateMember(w) | Event::UpdateMember(w) => Some(&w.id),
            Event::DeleteMember(r) => Some(&r.id),
            Event::SetOffer(o) => Some(&o.id),
            Event::SetPhase(_) | Event::ClearOffers(_) => None,
        }
    }

    /// JSON body stored next to the tag.
    pub fn encode_body(&self) -> Result<Vec<u8>, serde_json::Error> {
        match self {
            Event::CreateMember(body) | Event::UpdateMember(body) => serde_json::to_vec(body),
            Event::DeleteMember(body) => serde_json::to_vec(body),
            Event::SetPhase(body) => serde_json::to_vec(body),
            Event::SetOffer(body) => serde_json::to_vec(body),
            Event::ClearOffers(body) => serde_json::to_vec(body),
        }
    }

    /// Rebuild an event from its tag and body. Unknown tags are an error,
    /// never skipped.
    pub fn decode(tag: &str, body: &[u8]) -> Result<Self, DecodeError> {
        let (known, decoder) = DECODERS
            .iter()
            .find(|(t, _)| *t == tag)
            .ok_or_else(|| DecodeError::UnknownType(tag.to_string()))?;
        decoder(body).map_err(|source| DecodeError::Body { tag: *known, source })
    }
}

pub type Decoder = fn(&[u8]) -> Result<Event, serde_json::Error>;

/// Tag → decoder. Must list every variant of `Event`.
pub const DECODERS: [(&str, Decoder); 6] = [
    (TAG_CREATE, decode_create),
    (TAG_UPDATE, decode_update),
    (TAG_DELETE, decode_delete),
    (TAG_SET_PHASE, decode_set_phase),
    (TAG_SET_OFFER, decode_set_offer),
    (TAG_CLEAR_OFFERS, decode_clear_offers),
];

fn decode_create(body: &[u8]) -> Result<Event, serde_json::Error> {
    serde_json::from_slice(body).map(Event::CreateMember)
}

fn decode_update(body: &[u8]) -> Result<Event, serde_json::Error> {
    serde_json::from_slice(body).map(Event::UpdateMember)
}

fn decode_delete(body: &[u8]) -> Result<Event, serde_json::Error> {
    serde_json::from_slice(body).map(Event::DeleteMember)
}

fn decode_set_phase(body: &[u8]) -> Result<Event, serde_json::Error> {
    serde_json::from_slice(body).map(Event::SetPhase)
}

fn decode_set_offer(body: &[u8]) -> Result<Event, serde_json::Error> {
    serde_json::from_slice(body).map(Event::SetOffer)
}

fn decode_clear_offers(body: &[u8]) -> Result<Event, serde_json::Error> {
    serde_json::from_slice(body).map(Event::ClearOffers)
}

/// Audit description.
impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Event::CreateMember(w) => {
                write!(f, "Creating bieter {:?} with payload {:?}", w.id, w.payload.as_str())
            }
            Event::UpdateMember(w) => {
                write!(f, "Updating bieter {:?} to payload {:?}", w.id, w.payload.as_str())
            }
            Event::DeleteMember(r) => write!(f, "Deleting bieter {:?}", r.id),
            Event::SetPhase(p) => write!(f, "Set state to {:?}", p.phase.name()),
            Event::SetOffer(o) => write!(f, "Set offer of bieter {:?} to {}", o.id, o.offer),
            Event::ClearOffers(_) => f.write_str("Clear all offers"),
        }
    }
}
