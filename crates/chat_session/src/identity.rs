use time::OffsetDateTime;
use uuid::Uuid;

/// Prefix mixed into every session id seed.
pub const SESSION_ID_PREFIX: &str = "xgpt";

/// Name-based (MD5, X.500 namespace) identifier for `seed`.
#[must_use]
pub fn derive_id(seed: &str) -> String {
    Uuid::new_v3(&Uuid::NAMESPACE_X500, seed.as_bytes()).to_string()
}

/// Stable user identity for a username.
#[must_use]
pub fn user_id(username: &str) -> String {
    derive_id(username)
}

/// Session identity for a user at a point in time.
///
/// `generation` separates sessions created for the same user within the
/// same second.
#[must_use]
pub fn session_id(user_id: &str, unix_timestamp: i64, generation: u64) -> String {
    derive_id(&format!(
        "{SESSION_ID_PREFIX}{user_id}-{unix_timestamp}-{generation}"
    ))
}

/// Generated username for a user who did not configure one.
#[must_use]
pub fn guest_username(unix_timestamp: i64) -> String {
    derive_id(&format!("guest-{unix_timestamp}"))
}

#[must_use]
pub fn unix_now() -> i64 {
    OffsetDateTime::now_utc().unix_timestamp()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn derive_id_is_name_based_uuid_v3() {
        assert_eq!(derive_id("alice"), "7932c560-fa3d-3adb-bcb7-4355512cc74c");
        assert_eq!(derive_id("bob"), "4c82a21e-49dc-397f-8385-87d5fe8bffc0");
    }

    #[test]
    fn derive_id_is_deterministic_and_seed_sensitive() {
        assert_eq!(user_id("carol"), user_id("carol"));
        assert_ne!(user_id("carol"), user_id("Carol"));
    }

    #[test]
    fn session_ids_differ_by_time_and_generation() {
        let user = user_id("alice");
        assert_ne!(session_id(&user, 100, 1), session_id(&user, 101, 1));
        assert_ne!(session_id(&user, 100, 1), session_id(&user, 100, 2));
        assert_eq!(session_id(&user, 100, 1), session_id(&user, 100, 1));
    }

    #[test]
    fn guest_names_are_uuid_shaped() {
        let guest = guest_username(1_700_000_000);
        assert_eq!(guest.len(), 36);
        assert_eq!(guest, derive_id("guest-1700000000"));
    }
}
