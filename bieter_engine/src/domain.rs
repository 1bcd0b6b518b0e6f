//! Core domain types: phase, payload and the rules injected at startup.
//!
//! Pure data. No transition logic lives here.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// Lowest accepted offer in minor currency units when nothing is configured.
pub const DEFAULT_MINIMUM_OFFER: i64 = 4000;

// ── Phase ──────────────────────────────────────────────────────────

/// Process-wide stage. Gates which events a non-admin caller may submit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "i64")]
pub enum Phase {
    #[default]
    Registration = 1,
    Offer = 2,
    Closed = 3,
}

impl Phase {
    pub const ALL: [Phase; 3] = [Phase::Registration, Phase::Offer, Phase::Closed];

    /// Numeric value used on the wire and in the log.
    pub fn number(self) -> i64 {
        self as i64
    }

    pub fn name(self) -> &'static str {
        match self {
            Phase::Registration => "Registration",
            Phase::Offer => "Offer",
            Phase::Closed => "Closed",
        }
    }
}

impl TryFrom<i64> for Phase {
    type Error = ValidationError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(Phase::Registration),
            2 => Ok(Phase::Offer),
            3 => Ok(Phase::Closed),
            other => Err(ValidationError::InvalidPhase(other)),
        }
    }
}

impl From<Phase> for i64 {
    fn from(phase: Phase) -> Self {
        phase.number()
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Phase as reported to clients: `{"state": 1, "state_name": "Registration"}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PhaseView {
    pub state: i64,
    pub state_name: &'static str,
}

impl From<Phase> for PhaseView {
    fn from(phase: Phase) -> Self {
        Self {
            state: phase.number(),
            state_name: phase.name(),
        }
    }
}

// ── Payload ────────────────────────────────────────────────────────

/// Opaque member document. Guaranteed to be well-formed JSON when built
/// through [`Payload::parse`]; the store never looks inside.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Payload(String);

impl Payload {
    /// Check that `raw` is a non-empty, well-formed JSON document.
    pub fn parse(raw: &[u8]) -> Result<Self, ValidationError> {
        if raw.iter().all(u8::is_ascii_whitespace) {
            return Err(ValidationError::MissingPayload);
        }
        serde_json::from_slice::<serde::de::IgnoredAny>(raw)
            .map_err(|_| ValidationError::MalformedPayload)?;
        let text = std::str::from_utf8(raw).map_err(|_| ValidationError::MalformedPayload)?;
        Ok(Self(text.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn as_bytes(&self) -> &[u8] {
        self.0.as_bytes()
    }
}

impl fmt::Display for Payload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ── Rules ──────────────────────────────────────────────────────────

/// Thresholds supplied from configuration at startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rules {
    pub minimum_offer: i64,
}

impl Default for Rules {
    fn default() -> Self {
        Self {
            minimum_offer: DEFAULT_MINIMUM_OFFER,
        }
    }
}

/// A member as returned to callers, offer included (0 when none).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MemberView {
    pub id: String,
    pub payload: Payload,
    pub offer: i64,
}
