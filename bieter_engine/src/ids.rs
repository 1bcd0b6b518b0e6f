//! Member ID primitives: the fixed-width numeric ID space and the format
//! accepted for caller-supplied IDs.

use crate::error::ValidationError;

/// Upper bound for caller-supplied IDs.
pub const MAX_MEMBER_ID_LEN: usize = 64;

/// Widest ID space we allow; 10^9 still fits comfortably in u64.
pub const MAX_ID_DIGITS: u32 = 9;

/// Number of distinct IDs with `digits` decimal places.
pub fn id_space(digits: u32) -> u64 {
    10u64.pow(digits.clamp(1, MAX_ID_DIGITS))
}

/// Render `n` as a zero-padded ID, e.g. `format_member_id(42, 5) == "00042"`.
pub fn format_member_id(n: u64, digits: u32) -> String {
    format!("{:0width$}", n, width = digits as usize)
}

/// Validate that a member ID matches `[a-zA-Z0-9_-]{1,64}`.
pub fn validate_member_id(id: &str) -> Result<(), ValidationError> {
    let well_formed = !id.is_empty()
        && id.len() <= MAX_MEMBER_ID_LEN
        && id
            .chars()
            .all(|ch| ch.is_ascii_alphanumeric() || ch == '_' || ch == '-');
    if well_formed {
        Ok(())
    } else {
        Err(ValidationError::InvalidMemberId(id.to_string()))
    }
}
