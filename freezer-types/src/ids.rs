//! Identifier helpers for Freezer documents.
//!
//! Session ids are assigned by the API on creation. Job ids are chosen by the
//! scheduler that attaches the job, so both are validated with the same rules
//! before they reach storage.

/// Maximum accepted length of a session or job identifier.
pub const MAX_ID_LEN: usize = 128;

/// Generate a new session identifier.
///
/// UUID v4 rendered as 32 lowercase hex characters (no dashes).
pub fn generate_session_id() -> String {
    uuid::Uuid::new_v4().simple().to_string()
}

/// Check whether a string is acceptable as a session or job identifier.
///
/// Identifiers are non-empty, at most [`MAX_ID_LEN`] bytes, and limited to
/// ASCII alphanumerics plus `-`, `_` and `.`.
pub fn is_valid_id(id: &str) -> bool {
    !id.is_empty()
        && id.len() <= MAX_ID_LEN
        && id
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || matches!(b, b'-' | b'_' | b'.'))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_ids_are_unique() {
        let a = generate_session_id();
        let b = generate_session_id();
        assert_ne!(a, b);
    }

    #[test]
    fn generated_ids_are_simple_hex() {
        let id = generate_session_id();
        assert_eq!(id.len(), 32);
        assert!(id.bytes().all(|b| b.is_ascii_hexdigit()));
        assert!(is_valid_id(&id));
    }

    #[test]
    fn valid_ids() {
        assert!(is_valid_id("job_id_2"));
        assert!(is_valid_id("nightly-db.backup"));
        assert!(is_valid_id("a"));
    }

    #[test]
    fn invalid_ids() {
        assert!(!is_valid_id(""));
        assert!(!is_valid_id("has space"));
        assert!(!is_valid_id("../etc"));
        assert!(!is_valid_id(&"x".repeat(MAX_ID_LEN + 1)));
    }
}
