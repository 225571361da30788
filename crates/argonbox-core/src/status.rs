//! Engine status codes.
//!
//! Version-aware engines report failures with the reference Argon2 status
//! numbering. The host surfaces the code verbatim in
//! [`ArgonError::EngineError`](crate::ArgonError::EngineError); this table only
//! exists to make logs readable.

/// Success.
pub const OK: i32 = 0;
/// Output buffer shorter than the minimum tag length.
pub const OUTPUT_TOO_SHORT: i32 = -2;
/// Salt shorter than the engine accepts.
pub const SALT_TOO_SHORT: i32 = -6;
/// Memory cost below `8 * lanes` blocks.
pub const MEMORY_TOO_LITTLE: i32 = -14;
/// The engine could not allocate its working memory.
pub const MEMORY_ALLOCATION_ERROR: i32 = -22;
/// A recomputed hash did not match.
pub const VERIFY_MISMATCH: i32 = -35;

const NAMES: &[(i32, &str)] = &[
    (0, "ARGON2_OK"),
    (-1, "ARGON2_OUTPUT_PTR_NULL"),
    (-2, "ARGON2_OUTPUT_TOO_SHORT"),
    (-3, "ARGON2_OUTPUT_TOO_LONG"),
    (-4, "ARGON2_PWD_TOO_SHORT"),
    (-5, "ARGON2_PWD_TOO_LONG"),
    (-6, "ARGON2_SALT_TOO_SHORT"),
    (-7, "ARGON2_SALT_TOO_LONG"),
    (-8, "ARGON2_AD_TOO_SHORT"),
    (-9, "ARGON2_AD_TOO_LONG"),
    (-10, "ARGON2_SECRET_TOO_SHORT"),
    (-11, "ARGON2_SECRET_TOO_LONG"),
    (-12, "ARGON2_TIME_TOO_SMALL"),
    (-13, "ARGON2_TIME_TOO_LARGE"),
    (-14, "ARGON2_MEMORY_TOO_LITTLE"),
    (-15, "ARGON2_MEMORY_TOO_MUCH"),
    (-16, "ARGON2_LANES_TOO_FEW"),
    (-17, "ARGON2_LANES_TOO_MANY"),
    (-22, "ARGON2_MEMORY_ALLOCATION_ERROR"),
    (-25, "ARGON2_INCORRECT_PARAMETER"),
    (-26, "ARGON2_INCORRECT_TYPE"),
    (-28, "ARGON2_THREADS_TOO_FEW"),
    (-29, "ARGON2_THREADS_TOO_MANY"),
    (-35, "ARGON2_VERIFY_MISMATCH"),
];

/// Symbolic name for an engine status code, or `"ARGON2_UNKNOWN_ERROR"`.
#[must_use]
pub fn name(code: i32) -> &'static str {
    NAMES
        .iter()
        .find(|(c, _)| *c == code)
        .map_or("ARGON2_UNKNOWN_ERROR", |(_, n)| n)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_codes() {
        assert_eq!(name(OK), "ARGON2_OK");
        assert_eq!(name(MEMORY_ALLOCATION_ERROR), "ARGON2_MEMORY_ALLOCATION_ERROR");
        assert_eq!(name(VERIFY_MISMATCH), "ARGON2_VERIFY_MISMATCH");
    }

    #[test]
    fn unknown_code() {
        assert_eq!(name(-1000), "ARGON2_UNKNOWN_ERROR");
        assert_eq!(name(7), "ARGON2_UNKNOWN_ERROR");
    }
}
