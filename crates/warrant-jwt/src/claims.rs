//! Claims carried inside a credential.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use warrant_core::Permission;

/// The signed claim set of a Warrant credential.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenClaims {
    /// Principal the credential was issued to.
    pub name: String,

    /// Permission level granted.
    pub perm: Permission,

    /// Opaque auxiliary payload.
    #[serde(rename = "ext", default)]
    pub extra: String,

    /// Issued-at, unix seconds.
    pub iat: i64,

    /// Random nonce; two encodes of the same claims never collide.
    pub jti: String,

    /// Expiry, unix seconds. Absent unless an expiry policy is registered.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exp: Option<i64>,
}

impl TokenClaims {
    /// Issuance time as a timestamp.
    pub fn issued_at(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp(self.iat, 0)
    }

    /// Expiry time, if the token has one.
    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.exp.and_then(|exp| DateTime::from_timestamp(exp, 0))
    }
}
