//! # Ownership Guard
//!
//! Pure predicates deciding whether a principal may touch a record. These are
//! evaluated before any read or mutation of a contact (or another user's
//! account) is returned to a non-administrator.
//!
//! A failed ownership check must surface to the caller as "not found", never
//! "forbidden" — the facade owns that mapping.

use crate::model::{Contact, Principal, ADMIN_ROLE};

/// True iff the contact belongs to the principal.
pub fn owns_contact(principal: &Principal, contact: &Contact) -> bool {
    contact.owner_tsid == principal.tsid
}

/// True iff the principal's role set contains the administrator role.
pub fn is_administrator(principal: &Principal) -> bool {
    principal.role_names.iter().any(|name| name == ADMIN_ROLE)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ContactType;

    fn principal(tsid: i64, roles: &[&str]) -> Principal {
        Principal {
            tsid,
            role_names: roles.iter().map(|r| r.to_string()).collect(),
            enabled: true,
        }
    }

    fn contact(owner_tsid: i64) -> Contact {
        Contact {
            tsid: 99,
            first_name: "Ann".into(),
            last_name: "Lee".into(),
            address: "Addr1".into(),
            phone_number: "+381111111111".into(),
            owner_tsid,
            contact_type: ContactType {
                tsid: 1,
                label: "Friend".into(),
            },
        }
    }

    #[test]
    fn test_owner_matches() {
        let p = principal(1, &["ROLE_USER"]);
        assert!(owns_contact(&p, &contact(1)));
        assert!(!owns_contact(&p, &contact(2)));
    }

    #[test]
    fn test_admin_role_detection() {
        assert!(is_administrator(&principal(1, &["ROLE_USER", "ROLE_ADMIN"])));
        assert!(!is_administrator(&principal(1, &["ROLE_USER"])));
        assert!(!is_administrator(&principal(1, &[])));
    }

    #[test]
    fn test_admin_does_not_imply_ownership() {
        // Admin rights never change what owns_contact reports; the facade
        // decides what admins may bypass.
        let admin = principal(1, &["ROLE_ADMIN"]);
        assert!(!owns_contact(&admin, &contact(2)));
    }
}
