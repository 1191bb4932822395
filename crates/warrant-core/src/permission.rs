//! Permission levels.
//!
//! Permissions form a single linear scale rather than a set of independent
//! capabilities: a credential issued at `sign` may do everything a `write`
//! or `read` credential may do.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// A coarse-grained permission level, ordered lowest to highest privilege.
///
/// The derived `Ord` follows declaration order and is the total order used by
/// [`Permission::covers`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Permission {
    Read,
    Write,
    Sign,
    Admin,
}

/// A permission string outside the closed set of recognized levels.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("invalid permission '{0}' (expected one of: read, write, sign, admin)")]
pub struct InvalidPermission(pub String);

impl Permission {
    /// Every level, in ascending order.
    pub const ALL: [Permission; 4] = [
        Permission::Read,
        Permission::Write,
        Permission::Sign,
        Permission::Admin,
    ];

    /// The literal used on the wire and in claims.
    pub fn as_str(self) -> &'static str {
        match self {
            Permission::Read => "read",
            Permission::Write => "write",
            Permission::Sign => "sign",
            Permission::Admin => "admin",
        }
    }

    /// True iff `self` is at least as privileged as `want`.
    pub fn covers(self, want: Permission) -> bool {
        self >= want
    }
}

impl FromStr for Permission {
    type Err = InvalidPermission;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Permission::ALL
            .into_iter()
            .find(|p| p.as_str() == s)
            .ok_or_else(|| InvalidPermission(s.to_string()))
    }
}

impl TryFrom<String> for Permission {
    type Error = InvalidPermission;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Permission> for String {
    fn from(value: Permission) -> Self {
        value.as_str().to_string()
    }
}

impl fmt::Display for Permission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_known_levels() {
        assert_eq!("read".parse::<Permission>(), Ok(Permission::Read));
        assert_eq!("write".parse::<Permission>(), Ok(Permission::Write));
        assert_eq!("sign".parse::<Permission>(), Ok(Permission::Sign));
        assert_eq!("admin".parse::<Permission>(), Ok(Permission::Admin));
    }

    #[test]
    fn test_parse_rejects_unknown_and_miscased() {
        assert_eq!(
            "superadmin".parse::<Permission>(),
            Err(InvalidPermission("superadmin".to_string()))
        );
        assert!("Admin".parse::<Permission>().is_err());
        assert!("".parse::<Permission>().is_err());
        assert!(" read".parse::<Permission>().is_err());
    }

    #[test]
    fn test_covers_follows_total_order() {
        assert!(Permission::Admin.covers(Permission::Sign));
        assert!(Permission::Write.covers(Permission::Write));
        assert!(!Permission::Read.covers(Permission::Write));
        assert!(!Permission::Sign.covers(Permission::Admin));

        for have in Permission::ALL {
            for want in Permission::ALL {
                assert_eq!(have.covers(want), have as u8 >= want as u8);
            }
        }
    }

    #[test]
    fn test_serde_uses_lowercase_literals() {
        let json = serde_json::to_string(&Permission::Sign).unwrap();
        assert_eq!(json, "\"sign\"");

        let parsed: Permission = serde_json::from_str("\"admin\"").unwrap();
        assert_eq!(parsed, Permission::Admin);

        let err = serde_json::from_str::<Permission>("\"root\"").unwrap_err();
        assert!(err.to_string().contains("invalid permission 'root'"));
    }
}
