//! Member ID generation.
//!
//! Candidates are drawn uniformly from the fixed-width numeric space and
//! rejected while taken. After `max_attempts` rejections the space is
//! treated as exhausted.

use bieter_engine::ids::{format_member_id, id_space, MAX_ID_DIGITS};
use rand::Rng;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("no free member ID after {attempts} attempts in a space of {space}")]
pub struct IdSpaceExhausted {
    pub attempts: u32,
    pub space: u64,
}

/// Rejection-sampling generator of fixed-width numeric IDs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IdGenerator {
    digits: u32,
    max_attempts: u32,
}

impl IdGenerator {
    pub const DEFAULT_DIGITS: u32 = 5;
    pub const DEFAULT_MAX_ATTEMPTS: u32 = 64;

    /// `digits` is clamped to `1..=MAX_ID_DIGITS`, `max_attempts` to at least 1.
    pub fn new(digits: u32, max_attempts: u32) -> Self {
        Self {
            digits: digits.clamp(1, MAX_ID_DIGITS),
            max_attempts: max_attempts.max(1),
        }
    }

    pub fn digits(&self) -> u32 {
        self.digits
    }

    /// Draw an ID for which `taken` is false.
    pub fn generate<R, F>(&self, rng: &mut R, taken: F) -> Result<String, IdSpaceExhausted>
    where
        R: Rng,
        F: Fn(&str) -> bool,
    {
        let space = id_space(self.digits);
        for _ in 0..self.max_attempts {
            let candidate = format_member_id(rng.gen_range(0..space), self.digits);
            if !taken(&candidate) {
                return Ok(candidate);
            }
        }
        Err(IdSpaceExhausted {
            attempts: self.max_attempts,
            space,
        })
    }
}

impl Default for IdGenerator {
    fn default() -> Self {
        Self::new(Self::DEFAULT_DIGITS, Self::DEFAULT_MAX_ATTEMPTS)
    }
}
