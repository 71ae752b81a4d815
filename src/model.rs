//! # Data Model
//!
//! Entities stored by the directory, plus the narrow [`Principal`] view used
//! for access-control decisions.
//!
//! Services receive complete snapshots of these records, mutate a copy, and
//! issue a save; nothing here aliases storage.

use rand::Rng;
use serde::{Deserialize, Serialize};

/// Role name granting administrator privileges.
pub const ADMIN_ROLE: &str = "ROLE_ADMIN";

/// Generate a new 63-bit positive entity identifier.
///
/// Uniqueness is enforced by the primary-key constraint on insert, not here.
pub fn next_tsid() -> i64 {
    rand::thread_rng().gen_range(1..i64::MAX)
}

/// A user account.
///
/// Created disabled; `enabled` flips on successful email verification and
/// `phone_verified` on successful phone verification.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    /// Stable numeric identifier.
    pub tsid: i64,
    /// First name.
    pub first_name: String,
    /// Last name.
    pub last_name: String,
    /// Email address, globally unique.
    pub email: String,
    /// One-way password hash (opaque to this crate).
    pub password_hash: String,
    /// Phone number in international format.
    pub phone_number: String,
    /// True once email verification succeeded.
    pub enabled: bool,
    /// True once phone verification succeeded.
    pub phone_verified: bool,
    /// Roles granted to this account (referenced, never owned).
    pub roles: Vec<Role>,
}

impl User {
    /// Narrow this account down to the capability view used by the
    /// ownership guard and the service facade.
    pub fn principal(&self) -> Principal {
        Principal {
            tsid: self.tsid,
            role_names: self.roles.iter().map(|r| r.name.clone()).collect(),
            enabled: self.enabled,
        }
    }
}

/// A role, immutable after creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Role {
    /// Stable numeric identifier.
    pub tsid: i64,
    /// Role name, e.g. `ROLE_ADMIN` or `ROLE_USER`.
    pub name: String,
}

/// The authenticated actor making a request.
///
/// Deliberately exposes only what access-control decisions need; the full
/// account record never doubles as the security principal.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Principal {
    /// Stable numeric identifier of the authenticated user.
    pub tsid: i64,
    /// Names of the roles granted to the user.
    pub role_names: Vec<String>,
    /// Whether the account has completed email verification.
    pub enabled: bool,
}

/// An address-book entry owned by exactly one user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Contact {
    /// Stable numeric identifier.
    pub tsid: i64,
    /// First name.
    pub first_name: String,
    /// Last name.
    pub last_name: String,
    /// Street address.
    pub address: String,
    /// Phone number in international format.
    pub phone_number: String,
    /// Owning user's tsid; never dangling once persisted.
    pub owner_tsid: i64,
    /// The contact's type.
    pub contact_type: ContactType,
}

/// A free-text contact category, e.g. "Friend" or "Work".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContactType {
    /// Stable numeric identifier.
    pub tsid: i64,
    /// Display label. Need not be unique; label lookups take the first match.
    pub label: String,
}

/// An outstanding email confirmation token.
///
/// Valid for 24 hours from issuance. Not deleted on success: re-verification
/// of a still-fresh token is an idempotent no-op because the account is
/// already enabled.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmailVerificationToken {
    /// Opaque random token string (UUID v4).
    pub token: String,
    /// Owning user's tsid.
    pub user_tsid: i64,
    /// Unix timestamp of issuance.
    pub issued_at: i64,
}

/// An outstanding phone confirmation code.
///
/// Valid for 1 hour from issuance. Multiple codes may coexist per user; any
/// unexpired match succeeds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PhoneVerificationToken {
    /// Six-digit zero-padded numeric code.
    pub code: String,
    /// Owning user's tsid.
    pub user_tsid: i64,
    /// Unix timestamp of issuance.
    pub issued_at: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_user(tsid: i64) -> User {
        User {
            tsid,
            first_name: "Ann".into(),
            last_name: "Lee".into(),
            email: format!("user{}@example.com", tsid),
            password_hash: "hash".into(),
            phone_number: "+381111111111".into(),
            enabled: false,
            phone_verified: false,
            roles: vec![Role {
                tsid: 1,
                name: "ROLE_USER".into(),
            }],
        }
    }

    #[test]
    fn test_next_tsid_positive() {
        for _ in 0..100 {
            assert!(next_tsid() > 0);
        }
    }

    #[test]
    fn test_principal_view_is_narrow() {
        let mut user = test_user(42);
        user.roles.push(Role {
            tsid: 2,
            name: ADMIN_ROLE.into(),
        });
        let principal = user.principal();
        assert_eq!(principal.tsid, 42);
        assert!(!principal.enabled);
        assert_eq!(principal.role_names, vec!["ROLE_USER", ADMIN_ROLE]);
    }
}
