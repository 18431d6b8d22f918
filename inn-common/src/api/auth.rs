//! Password hashing and session tokens
//!
//! Passwords are stored as `SHA-256(salt || password)` in lowercase hex,
//! alongside a random 16-byte salt (also hex). Session tokens are random
//! UUIDv4 strings.

use rand::RngCore;
use sha2::{Digest, Sha256};

/// Salt and digest pair as stored in the `teams` table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PasswordHash {
    pub hash: String,
    pub salt: String,
}

/// Generate a random 16-byte salt as 32 hex characters
pub fn generate_salt() -> String {
    let mut bytes = [0u8; 16];
    rand::thread_rng().fill_bytes(&mut bytes);
    to_hex(&bytes)
}

/// Hash `password` with a freshly generated salt
///
/// # Examples
///
/// ```
/// use inn_common::api::auth::{hash_password, verify_password};
///
/// let stored = hash_password("hunter22");
/// assert_eq!(stored.hash.len(), 64);
/// assert!(verify_password("hunter22", &stored.salt, &stored.hash));
/// assert!(!verify_password("hunter23", &stored.salt, &stored.hash));
/// ```
pub fn hash_password(password: &str) -> PasswordHash {
    let salt = generate_salt();
    let hash = hash_with_salt(password, &salt);
    PasswordHash { hash, salt }
}

/// SHA-256 of `salt || password` as 64 hex characters
pub fn hash_with_salt(password: &str, salt: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(salt.as_bytes());
    hasher.update(password.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Check `password` against a stored salt and hash
pub fn verify_password(password: &str, salt: &str, expected_hash: &str) -> bool {
    constant_time_eq(
        hash_with_salt(password, salt).as_bytes(),
        expected_hash.as_bytes(),
    )
}

/// Compare two byte strings without early exit on the first mismatch
pub fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

/// New opaque session token
pub fn generate_session_token() -> String {
    uuid::Uuid::new_v4().simple().to_string()
}

fn to_hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_salt_is_random_hex() {
        let a = generate_salt();
        let b = generate_salt();
        assert_eq!(a.len(), 32);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(a, b);
    }

    #[test]
    fn test_same_password_different_salt_gives_different_hash() {
        let first = hash_password("secret");
        let second = hash_password("secret");
        assert_ne!(first.hash, second.hash);
        assert!(verify_password("secret", &first.salt, &first.hash));
        assert!(verify_password("secret", &second.salt, &second.hash));
    }

    #[test]
    fn test_known_digest() {
        // sha256("abc")
        assert_eq!(
            hash_with_salt("c", "ab"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn test_constant_time_eq() {
        assert!(constant_time_eq(b"abc", b"abc"));
        assert!(!constant_time_eq(b"abc", b"abd"));
        assert!(!constant_time_eq(b"abc", b"abcd"));
    }

    #[test]
    fn test_session_tokens_are_unique() {
        let a = generate_session_token();
        let b = generate_session_token();
        assert_eq!(a.len(), 32);
        assert_ne!(a, b);
    }
}
