//! Signed session cookies for till operators
//!
//! A cookie is `<user id>.<tag>` where the tag is the lowercase hex
//! HMAC-SHA256 of the decimal user id under the shop's session secret.

use bakehouse_core::{BakehouseError, Result};
use ring::hmac;
use ring::rand::{SecureRandom, SystemRandom};

/// Shortest secret accepted for signing
pub const MIN_SECRET_LEN: usize = 16;

const GENERATED_SECRET_LEN: usize = 32;

pub struct SessionSigner {
    key: hmac::Key,
}

impl SessionSigner {
    pub fn new(secret: &[u8]) -> Result<Self> {
        if secret.len() < MIN_SECRET_LEN {
            return Err(BakehouseError::Configuration(format!(
                "session secret must be at least {} bytes, got {}",
                MIN_SECRET_LEN,
                secret.len()
            )));
        }
        Ok(Self {
            key: hmac::Key::new(hmac::HMAC_SHA256, secret),
        })
    }

    /// Signer over a fresh random secret. Cookies it issues do not survive a
    /// restart.
    pub fn random() -> Result<Self> {
        let mut secret = [0u8; GENERATED_SECRET_LEN];
        SystemRandom::new()
            .fill(&mut secret)
            .map_err(|_| BakehouseError::Other("system random source unavailable".into()))?;
        Self::new(&secret)
    }

    pub fn sign(&self, user_id: i64) -> String {
        let id = user_id.to_string();
        let tag = hmac::sign(&self.key, id.as_bytes());
        format!("{}.{}", id, hex::encode(tag.as_ref()))
    }

    /// The user id carried by `cookie`, if its tag is genuine.
    ///
    /// Only the exact form produced by [`sign`](Self::sign) is accepted; the
    /// tag comparison runs in constant time.
    pub fn verify(&self, cookie: &str) -> Option<i64> {
        let (id, tag) = cookie.split_once('.')?;
        let user_id: i64 = id.parse().ok()?;
        if user_id <= 0 || user_id.to_string() != id {
            return None;
        }
        let tag = hex::decode(tag).ok()?;
        hmac::verify(&self.key, id.as_bytes(), &tag).ok()?;
        Some(user_id)
    }
}

impl std::fmt::Debug for SessionSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionSigner")
            .field("key", &"<redacted>")
            .finish()
    }
}
