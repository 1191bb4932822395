//! Credential records and listing pages.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::permission::Permission;

/// Listing window used when the caller does not ask for one.
pub const DEFAULT_PAGE_LIMIT: u64 = 20;

/// Hard ceiling on a single listing, whatever the caller asks for.
pub const MAX_PAGE_LIMIT: u64 = 100;

/// The durable record kept for every live credential.
///
/// Records are created once at issuance and never mutated; revocation
/// removes them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenRecord {
    /// The credential itself. Unique.
    pub token: String,

    /// Principal label the credential was issued to.
    pub name: String,

    /// Permission level, fixed at issuance.
    pub perm: Permission,

    /// Opaque auxiliary payload carried in the signed claims.
    #[serde(default)]
    pub extra: String,

    /// Issuance time. Display only; listings are ordered by insertion.
    #[serde(rename = "createTime")]
    pub create_time: DateTime<Utc>,
}

impl TokenRecord {
    /// The principal this record authenticates.
    pub fn principal(&self) -> Principal {
        Principal {
            name: self.name.clone(),
            perm: self.perm,
            extra: self.extra.clone(),
        }
    }
}

/// The identity a verified credential resolves to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    pub name: String,
    pub perm: Permission,
    #[serde(default)]
    pub extra: String,
}

/// A clamped skip/limit window over a listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page {
    pub skip: u64,
    pub limit: u64,
}

impl Page {
    /// Build a page, applying the public listing policy.
    ///
    /// A zero limit selects the default window; anything above the ceiling is
    /// cut down to the ceiling rather than rejected.
    pub fn new(skip: u64, limit: u64) -> Self {
        let limit = match limit {
            0 => DEFAULT_PAGE_LIMIT,
            n => n.min(MAX_PAGE_LIMIT),
        };
        Self { skip, limit }
    }
}

impl Default for Page {
    fn default() -> Self {
        Self::new(0, DEFAULT_PAGE_LIMIT)
    }
}
