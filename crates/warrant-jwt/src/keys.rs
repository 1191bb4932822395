//! HMAC signing secrets.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use jsonwebtoken::{DecodingKey, EncodingKey};
use rand::RngCore;
use sha2::{Digest, Sha256};
use std::fmt;

use crate::error::CodecError;

/// Minimum accepted secret length, in bytes.
pub const MIN_SECRET_LEN: usize = 16;

/// Length of a freshly generated secret, in bytes.
pub const GENERATED_SECRET_LEN: usize = 32;

/// A symmetric secret plus the key id advertised in token headers.
#[derive(Clone)]
pub struct SigningKey {
    secret: Vec<u8>,
    kid: String,
}

impl SigningKey {
    /// Generate a new random secret.
    pub fn generate() -> Self {
        let mut rng = rand::rng();
        let mut bytes = [0u8; GENERATED_SECRET_LEN];
        rng.fill_bytes(&mut bytes);
        Self::from_secret_unchecked(bytes.to_vec())
    }

    /// Wrap raw secret bytes.
    pub fn from_bytes(secret: &[u8]) -> Result<Self, CodecError> {
        if secret.len() < MIN_SECRET_LEN {
            return Err(CodecError::WeakSecret(format!(
                "secret is {} bytes, need at least {MIN_SECRET_LEN}",
                secret.len()
            )));
        }
        Ok(Self::from_secret_unchecked(secret.to_vec()))
    }

    /// Load a secret from its base64 (standard alphabet) form.
    pub fn from_base64(encoded: &str) -> Result<Self, CodecError> {
        let bytes = STANDARD
            .decode(encoded.trim())
            .map_err(|e| CodecError::WeakSecret(format!("secret is not valid base64: {e}")))?;
        Self::from_bytes(&bytes)
    }

    fn from_secret_unchecked(secret: Vec<u8>) -> Self {
        let digest = Sha256::digest(&secret);
        let kid = hex::encode(&digest[..8]);
        Self { secret, kid }
    }

    /// The secret in base64, as stored in `config.toml`.
    pub fn to_base64(&self) -> String {
        STANDARD.encode(&self.secret)
    }

    /// Key id: hex of the first 8 bytes of SHA-256(secret).
    pub fn kid(&self) -> &str {
        &self.kid
    }

    pub(crate) fn encoding_key(&self) -> EncodingKey {
        EncodingKey::from_secret(&self.secret)
    }

    pub(crate) fn decoding_key(&self) -> DecodingKey {
        DecodingKey::from_secret(&self.secret)
    }
}

impl fmt::Debug for SigningKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SigningKey")
            .field("kid", &self.kid)
            .finish_non_exhaustive()
    }
}
