//! Token encoding and verification.

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{Algorithm, Header, Validation, decode, decode_header, encode};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use warrant_core::Permission;

use crate::claims::TokenClaims;
use crate::error::CodecError;
use crate::keys::SigningKey;

type NonceSource = Arc<dyn Fn() -> String + Send + Sync>;

/// Encodes claims into HS256 tokens and verifies presented tokens.
///
/// Holds one current signing key and any number of retired keys that are
/// still accepted on decode. Read-only once built.
#[derive(Clone)]
pub struct TokenCodec {
    current: SigningKey,
    retired: HashMap<String, SigningKey>,
    lifetime: Option<Duration>,
    nonce: NonceSource,
}

impl TokenCodec {
    /// Create a codec that signs with `key`.
    pub fn new(key: SigningKey) -> Self {
        Self {
            current: key,
            retired: HashMap::new(),
            lifetime: None,
            nonce: Arc::new(|| uuid::Uuid::new_v4().simple().to_string()),
        }
    }

    /// Also accept tokens signed with `key`.
    pub fn with_retired_key(mut self, key: SigningKey) -> Self {
        self.retired.insert(key.kid().to_string(), key);
        self
    }

    /// Stamp new tokens with an `exp` claim `lifetime` after issuance.
    pub fn with_lifetime(mut self, lifetime: Duration) -> Self {
        self.lifetime = Some(lifetime);
        self
    }

    /// Replace the `jti` generator.
    pub fn with_nonce_source(
        mut self,
        source: impl Fn() -> String + Send + Sync + 'static,
    ) -> Self {
        self.nonce = Arc::new(source);
        self
    }

    /// Key id of the current signing key.
    pub fn current_kid(&self) -> &str {
        self.current.kid()
    }

    /// Encode and sign a new credential.
    pub fn encode(
        &self,
        name: &str,
        perm: Permission,
        extra: &str,
        issued_at: DateTime<Utc>,
    ) -> Result<String, CodecError> {
        let claims = TokenClaims {
            name: name.to_string(),
            perm,
            extra: extra.to_string(),
            iat: issued_at.timestamp(),
            jti: (self.nonce)(),
            exp: self.lifetime.map(|l| (issued_at + l).timestamp()),
        };

        let mut header = Header::new(Algorithm::HS256);
        header.kid = Some(self.current.kid().to_string());

        encode(&header, &claims, &self.current.encoding_key())
            .map_err(|e| CodecError::Encoding(e.to_string()))
    }

    /// Verify a presented token and return its claims.
    pub fn decode(&self, token: &str) -> Result<TokenClaims, CodecError> {
        let header = decode_header(token).map_err(|e| CodecError::Malformed(e.to_string()))?;

        if header.alg != Algorithm::HS256 {
            return Err(CodecError::Malformed(format!(
                "unsupported algorithm {:?}",
                header.alg
            )));
        }

        let key = match header.kid.as_deref() {
            None => &self.current,
            Some(kid) if kid == self.current.kid() => &self.current,
            Some(kid) => {
                let key = self.retired.get(kid).ok_or_else(|| {
                    CodecError::InvalidSignature(format!("unknown key id '{kid}'"))
                })?;
                tracing::debug!(kid, "Verifying token against retired key");
                key
            }
        };

        let mut validation = Validation::new(Algorithm::HS256);
        validation.required_spec_claims.clear();
        validation.validate_exp = true;
        validation.validate_aud = false;
        validation.leeway = 0;

        let data = decode::<TokenClaims>(token, &key.decoding_key(), &validation)?;
        Ok(data.claims)
    }
}

impl fmt::Debug for TokenCodec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenCodec")
            .field("current", &self.current)
            .field("retired", &self.retired.keys().collect::<Vec<_>>())
            .field("lifetime", &self.lifetime)
            .finish_non_exhaustive()
    }
}
