//! The token service: issuance, listing, revocation and verification.

use chrono::{DateTime, Utc};
use std::sync::{Arc, Mutex, PoisonError};
use warrant_core::{Page, Permission, Principal, TokenRecord};
use warrant_jwt::TokenCodec;
use warrant_store::{CredentialStore, StoreError};

use crate::error::ServiceError;

type Clock = Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>;

/// Attempts made to store a freshly encoded token before giving up.
const ISSUE_ATTEMPTS: usize = 2;

/// Shortened token for log lines. Full tokens are bearer secrets.
pub fn fingerprint(token: &str) -> &str {
    match token.char_indices().nth(12) {
        Some((end, _)) => &token[..end],
        None => token,
    }
}

/// Orchestrates the codec and the credential store.
///
/// Built once at startup and shared as `Arc<TokenService>`. Every trust
/// decision goes through the store, so removing a record revokes the token
/// even though its signature stays valid.
pub struct TokenService {
    codec: TokenCodec,
    store: CredentialStore,
    clock: Clock,
    last_issued: Mutex<DateTime<Utc>>,
}

impl TokenService {
    pub fn new(codec: TokenCodec, store: CredentialStore) -> Self {
        Self {
            codec,
            store,
            clock: Arc::new(Utc::now),
            last_issued: Mutex::new(DateTime::<Utc>::MIN_UTC),
        }
    }

    /// Replace the wall clock used for `createTime`.
    pub fn with_clock(mut self, clock: impl Fn() -> DateTime<Utc> + Send + Sync + 'static) -> Self {
        self.clock = Arc::new(clock);
        self
    }

    pub fn codec(&self) -> &TokenCodec {
        &self.codec
    }

    /// Issue a new credential for `name` at permission `perm`.
    pub fn generate_token(&self, name: &str, perm: &str, extra: &str) -> Result<String, ServiceError> {
        if name.trim().is_empty() {
            return Err(ServiceError::EmptyName);
        }
        let perm: Permission = perm.parse()?;

        for attempt in 1..=ISSUE_ATTEMPTS {
            let create_time = self.issue_time();
            let token = self.codec.encode(name, perm, extra, create_time)?;

            let record = TokenRecord {
                token: token.clone(),
                name: name.to_string(),
                perm,
                extra: extra.to_string(),
                create_time,
            };

            match self.store.put(record) {
                Ok(()) => {
                    tracing::info!(
                        name,
                        perm = %perm,
                        token = fingerprint(&token),
                        "Issued token"
                    );
                    return Ok(token);
                }
                Err(StoreError::DuplicateKey(_)) => {
                    tracing::warn!(
                        name,
                        attempt,
                        token = fingerprint(&token),
                        "Token collided with an existing record"
                    );
                }
                Err(e) => return Err(e.into()),
            }
        }

        tracing::error!(name, "Token collision persisted after retry");
        Err(ServiceError::Collision)
    }

    /// List live credentials in issuance order.
    ///
    /// A zero `limit` selects the default window; anything above the ceiling
    /// is cut down to it.
    pub fn tokens(&self, skip: u64, limit: u64) -> Result<Vec<TokenRecord>, ServiceError> {
        let page = Page::new(skip, limit);
        let records = self.store.list(page.skip, page.limit)?;
        tracing::debug!(
            skip = page.skip,
            limit = page.limit,
            returned = records.len(),
            "Listed tokens"
        );
        Ok(records)
    }

    /// Revoke a credential.
    pub fn remove_token(&self, token: &str) -> Result<(), ServiceError> {
        match self.store.delete(token) {
            Ok(()) => {
                tracing::info!(token = fingerprint(token), "Removed token");
                Ok(())
            }
            Err(StoreError::NotFound(_)) => {
                tracing::debug!(token = fingerprint(token), "Remove of unknown token");
                Err(ServiceError::NotFound)
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Check that `token` is live and carries at least `required`.
    ///
    /// The store is consulted first. A stored token whose signature does not
    /// verify, or whose signed claims disagree with the record, is treated as
    /// unknown.
    pub fn verify_token(&self, token: &str, required: Permission) -> Result<Principal, ServiceError> {
        let record = match self.store.get(token) {
            Ok(record) => record,
            Err(StoreError::NotFound(_)) => {
                tracing::debug!(token = fingerprint(token), "Verify of unknown token");
                return Err(ServiceError::UnknownToken);
            }
            Err(e) => return Err(e.into()),
        };

        let claims = self.codec.decode(token).map_err(|e| {
            tracing::warn!(
                token = fingerprint(token),
                error = %e,
                "Stored token failed signature check"
            );
            ServiceError::UnknownToken
        })?;

        if claims.name != record.name
            || claims.perm != record.perm
            || claims.extra != record.extra
        {
            tracing::warn!(
                token = fingerprint(token),
                "Signed claims disagree with stored record"
            );
            return Err(ServiceError::UnknownToken);
        }

        if !record.perm.covers(required) {
            tracing::debug!(
                token = fingerprint(token),
                have = %record.perm,
                want = %required,
                "Token permission too low"
            );
            return Err(ServiceError::Unauthorized {
                have: record.perm,
                want: required,
            });
        }

        Ok(record.principal())
    }

    /// Issuance timestamp, never earlier than the previous one.
    fn issue_time(&self) -> DateTime<Utc> {
        let mut last = self
            .last_issued
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        let now = (self.clock)().max(*last);
        *last = now;
        now
    }
}

impl std::fmt::Debug for TokenService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenService")
            .field("codec", &self.codec)
            .field("store", &self.store)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicI64, Ordering};
    use warrant_jwt::SigningKey;
    use warrant_store::MemoryKv;

    fn service() -> TokenService {
        let key = SigningKey::from_bytes(b"unit-test-secret-0123456789").unwrap();
        let store = CredentialStore::open(Arc::new(MemoryKv::new())).unwrap();
        TokenService::new(TokenCodec::new(key), store)
    }

    #[test]
    fn test_fingerprint_truncates() {
        assert_eq!(fingerprint("abcdefghijklmnop"), "abcdefghijkl");
        assert_eq!(fingerprint("short"), "short");
    }

    #[test]
    fn test_fingerprint_cuts_on_char_boundary() {
        assert_eq!(fingerprint("ééééééééééééééé"), "éééééééééééé");
        assert_eq!(fingerprint("abcdefghijk€xyz"), "abcdefghijk€");
        assert_eq!(fingerprint("ééé"), "ééé");
    }

    #[test]
    fn test_issue_time_never_goes_backwards() {
        let ticks = Arc::new(AtomicI64::new(1_000));
        let source = ticks.clone();
        let svc = service().with_clock(move || {
            DateTime::from_timestamp(source.load(Ordering::SeqCst), 0).unwrap_or_default()
        });

        let first = svc.issue_time();
        ticks.store(500, Ordering::SeqCst);
        let second = svc.issue_time();
        ticks.store(2_000, Ordering::SeqCst);
        let third = svc.issue_time();

        assert_eq!(first.timestamp(), 1_000);
        assert_eq!(second, first);
        assert_eq!(third.timestamp(), 2_000);
    }

    #[test]
    fn test_whitespace_name_is_empty() {
        assert!(matches!(
            service().generate_token("   ", "read", ""),
            Err(ServiceError::EmptyName)
        ));
    }

    #[test]
    fn test_create_time_comes_from_clock() {
        let svc = service()
            .with_clock(|| DateTime::from_timestamp(1_700_000_000, 0).unwrap_or_default());
        let token = svc.generate_token("alice", "read", "").unwrap();

        let records = svc.tokens(0, 0).unwrap();
        assert_eq!(records[0].token, token);
        assert_eq!(records[0].create_time.timestamp(), 1_700_000_000);
        assert_eq!(svc.codec().decode(&token).unwrap().iat, 1_700_000_000);
    }
}
