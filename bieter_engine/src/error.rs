//! Kernel errors.
//!
//! `ValidationError` is the only error a caller is allowed to see verbatim.
//! `DecodeError` means a log record could not be turned back into an event.

use thiserror::Error;

use crate::domain::Phase;

/// Request content does not fit the current state. Deterministic and
/// side-effect free: nothing was written when this is returned.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Keine Daten übergeben")]
    MissingPayload,

    #[error("Ungültige Daten übergeben")]
    MalformedPayload,

    #[error("invalid state: {current} (requires {required})")]
    WrongPhase { required: Phase, current: Phase },

    #[error("Bieter ID existiert bereits")]
    MemberExists { id: String },

    #[error("Bieter {id:?} existiert nicht")]
    UnknownMember { id: String },

    #[error("Ungültige Bieter ID {0:?}")]
    InvalidMemberId(String),

    #[error("Das Gebot muss mindestens {minimum} sein, nicht {amount}")]
    OfferTooLow { amount: i64, minimum: i64 },

    #[error("Ungültiger State mit Nummer {0}")]
    InvalidPhase(i64),
}

impl ValidationError {
    /// Message for the end user.
    pub fn for_client(&self) -> String {
        format!("Ungültige Daten: {}", self)
    }
}

/// A stored record cannot be mapped to an event.
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("no such event type {0:?}")]
    UnknownType(String),

    #[error("malformed {tag:?} event body: {source}")]
    Body {
        tag: &'static str,
        #[source]
        source: serde_json::Error,
    },
}
