//! Share-link secrets.
//!
//! Passwords are stored as `pbkdf2-sha256$<rounds>$<salt hex>$<key hex>`:
//! PBKDF2-HMAC-SHA256 under a random 16-byte salt. Owner tokens are 32 random
//! bytes handed out once; only their SHA-256 digest is kept. Every check
//! compares with `subtle` so timing does not leak how many bytes matched.

use pbkdf2::pbkdf2_hmac;
use rand::rngs::OsRng;
use rand::RngCore;
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

pub const HASH_ROUNDS: u32 = if cfg!(test) { 1_000 } else { 210_000 };
const SALT_LEN: usize = 16;
const KEY_LEN: usize = 32;
const SECRET_BYTES: usize = 32;
const SCHEME: &str = "pbkdf2-sha256";

#[derive(Clone, PartialEq, Eq)]
pub struct PasswordHash(String);

impl PasswordHash {
    /// Hashes `password` under a fresh random salt.
    pub fn create(password: &str) -> Self {
        let mut salt = [0u8; SALT_LEN];
        OsRng.fill_bytes(&mut salt);
        Self::with_salt(password, &salt, HASH_ROUNDS)
    }

    fn with_salt(password: &str, salt: &[u8], rounds: u32) -> Self {
        let key = derive(password, salt, rounds);
        Self(format!(
            "{SCHEME}${rounds}${}${}",
            hex::encode(salt),
            hex::encode(key)
        ))
    }

    /// Wraps a stored encoding. Returns `None` if it is not in the expected format.
    pub fn from_encoded(encoded: String) -> Option<Self> {
        parse(&encoded)?;
        Some(Self(encoded))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Constant-time check of `candidate` against this hash.
    pub fn verify(&self, candidate: &str) -> bool {
        let Some((rounds, salt, expected)) = parse(&self.0) else {
            return false;
        };
        let computed = derive(candidate, &salt, rounds);
        computed.as_slice().ct_eq(expected.as_slice()).into()
    }
}

impl std::fmt::Debug for PasswordHash {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("PasswordHash(<redacted>)")
    }
}

fn derive(password: &str, salt: &[u8], rounds: u32) -> [u8; KEY_LEN] {
    let mut key = [0u8; KEY_LEN];
    pbkdf2_hmac::<Sha256>(password.as_bytes(), salt, rounds, &mut key);
    key
}

fn parse(encoded: &str) -> Option<(u32, Vec<u8>, Vec<u8>)> {
    let mut parts = encoded.split('$');
    if parts.next()? != SCHEME {
        return None;
    }
    let rounds: u32 = parts.next()?.parse().ok().filter(|r| *r > 0)?;
    let salt = hex::decode(parts.next()?).ok()?;
    let key = hex::decode(parts.next()?).ok()?;
    if parts.next().is_some() || key.len() != KEY_LEN {
        return None;
    }
    Some((rounds, salt, key))
}

fn random_hex() -> String {
    let mut bytes = [0u8; SECRET_BYTES];
    OsRng.fill_bytes(&mut bytes);
    hex::encode(bytes)
}

/// Unguessable link id: 32 random bytes, hex-encoded.
pub fn new_link_id() -> String {
    random_hex()
}

/// Fresh owner token and the digest to store in its place.
pub fn new_owner_token() -> (String, String) {
    let token = random_hex();
    let digest = owner_token_digest(&token);
    (token, digest)
}

pub fn owner_token_digest(token: &str) -> String {
    hex::encode(Sha256::digest(token.as_bytes()))
}

/// Constant-time check of a presented owner token against the stored digest.
pub fn verify_owner_token(stored_digest: &str, candidate: &str) -> bool {
    let computed = owner_token_digest(candidate);
    computed.as_bytes().ct_eq(stored_digest.as_bytes()).into()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_verify_accepts_only_the_right_password() {
        let hash = PasswordHash::create("open sesame");
        assert!(hash.verify("open sesame"));
        assert!(!hash.verify("open sesame "));
        assert!(!hash.verify(""));
    }

    #[test]
    fn test_salts_differ_per_hash() {
        let a = PasswordHash::create("same");
        let b = PasswordHash::create("same");
        assert_ne!(a, b);
        assert!(a.verify("same") && b.verify("same"));
    }

    #[test]
    fn test_encoding_format() {
        let hash = PasswordHash::with_salt("pw", &[0u8; SALT_LEN], 3);
        let parts: Vec<_> = hash.as_str().split('$').collect();
        assert_eq!(parts[0], "pbkdf2-sha256");
        assert_eq!(parts[1], "3");
        assert_eq!(parts[2], "00".repeat(SALT_LEN));
        assert_eq!(parts[3].len(), 64);
        assert!(!hash.as_str().contains("pw"));
    }

    #[test]
    fn test_from_encoded_rejects_garbage() {
        let hash = PasswordHash::create("pw");
        assert!(PasswordHash::from_encoded(hash.as_str().to_string()).is_some());
        assert!(PasswordHash::from_encoded("plaintext".to_string()).is_none());
        assert!(PasswordHash::from_encoded("pbkdf2-sha256$0$00$00".to_string()).is_none());
        assert!(PasswordHash::from_encoded(format!("sha256$10$00${}", "00".repeat(KEY_LEN))).is_none());
        assert!(PasswordHash::from_encoded("md5$1$00$00".to_string()).is_none());
    }

    #[test]
    fn test_debug_is_redacted() {
        let hash = PasswordHash::create("pw");
        assert_eq!(format!("{hash:?}"), "PasswordHash(<redacted>)");
    }

    #[test]
    fn test_link_ids_are_long_and_unique() {
        let a = new_link_id();
        let b = new_link_id();
        assert_eq!(a.len(), 64);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(a, b);
    }

    #[test]
    fn test_pbkdf2_known_answer() {
        // RFC 7914 section 11, PBKDF2-HMAC-SHA256 with c = 1.
        let key = derive("passwd", b"salt", 1);
        assert_eq!(
            hex::encode(key),
            "55ac046e56e3089fec1691c22544b605f94185216dde0465e68b9d57c20dacbc"
        );
    }

    #[test]
    fn test_owner_token_verifies_against_its_digest_only() {
        let (token, digest) = new_owner_token();
        assert_eq!(token.len(), 64);
        assert_ne!(token, digest);
        assert!(verify_owner_token(&digest, &token));
        assert!(!verify_owner_token(&digest, ""));
        assert!(!verify_owner_token(&digest, &digest));
        let (other, _) = new_owner_token();
        assert!(!verify_owner_token(&digest, &other));
    }
}
