//! # Row Validation
//!
//! Pure field-level validation shared by interactive contact creation and
//! the CSV import pipeline. No shared validator state: callers pass a row in
//! and get a list of violations back.

use serde::{Deserialize, Serialize};

/// Maximum length of a first or last name.
pub const MAX_NAME_LEN: usize = 20;
/// Maximum length of an address.
pub const MAX_ADDRESS_LEN: usize = 30;

/// The five-field contact shape validated before persistence.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ContactRow {
    /// First name.
    pub first_name: String,
    /// Last name.
    pub last_name: String,
    /// Phone number.
    pub phone_number: String,
    /// Street address.
    pub address: String,
    /// Contact-type label.
    pub contact_type: String,
}

/// A single field-level constraint violation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Violation {
    /// Name of the offending field.
    pub field: &'static str,
    /// Human-readable message for that field.
    pub message: String,
}

/// Validate a contact row, returning one violation per offending field.
///
/// An empty result means the row may be persisted.
pub fn validate_contact_row(row: &ContactRow) -> Vec<Violation> {
    let mut violations = Vec::new();

    if let Some(message) = check_name(&row.first_name, "First name") {
        violations.push(Violation {
            field: "firstName",
            message,
        });
    }
    if let Some(message) = check_name(&row.last_name, "Last name") {
        violations.push(Violation {
            field: "lastName",
            message,
        });
    }
    if let Some(message) = check_phone(&row.phone_number) {
        violations.push(Violation {
            field: "phoneNumber",
            message,
        });
    }
    if let Some(message) = check_address(&row.address) {
        violations.push(Violation {
            field: "address",
            message,
        });
    }
    if row.contact_type.trim().is_empty() {
        violations.push(Violation {
            field: "contactType",
            message: "Contact type can not be blank".into(),
        });
    }

    violations
}

/// Non-blank, ASCII alphabetic only, at most [`MAX_NAME_LEN`] characters.
fn check_name(value: &str, label: &str) -> Option<String> {
    if value.trim().is_empty() {
        return Some(format!("{} can not be blank", label));
    }
    if value.len() > MAX_NAME_LEN {
        return Some("Max size is 20 characters".into());
    }
    if !value.chars().all(|c| c.is_ascii_alphabetic()) {
        return Some(format!(
            "{} can only contain letters of the alphabet without spaces",
            label
        ));
    }
    None
}

/// `+` followed by 9 to 14 digits.
fn check_phone(value: &str) -> Option<String> {
    let valid = value
        .strip_prefix('+')
        .map(|digits| {
            (9..=14).contains(&digits.len()) && digits.chars().all(|c| c.is_ascii_digit())
        })
        .unwrap_or(false);
    if valid {
        None
    } else {
        Some("Phone must have '+' followed by 9 to 14 digits, example: +314584814848".into())
    }
}

/// Non-blank, ASCII alphanumeric and spaces, at most [`MAX_ADDRESS_LEN`] characters.
fn check_address(value: &str) -> Option<String> {
    if value.trim().is_empty() {
        return Some("Address can not be blank".into());
    }
    if value.len() > MAX_ADDRESS_LEN {
        return Some("Max size is 30 characters".into());
    }
    if !value
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == ' ')
    {
        return Some("Address can only contain letters and numbers".into());
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_row() -> ContactRow {
        ContactRow {
            first_name: "Ann".into(),
            last_name: "Lee".into(),
            phone_number: "+381111111111".into(),
            address: "Addr1".into(),
            contact_type: "Friend".into(),
        }
    }

    #[test]
    fn test_valid_row_passes() {
        assert!(validate_contact_row(&valid_row()).is_empty());
    }

    #[test]
    fn test_digit_in_first_name_rejected() {
        let mut row = valid_row();
        row.first_name = "Ann3".into();
        let violations = validate_contact_row(&row);
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].field, "firstName");
    }

    #[test]
    fn test_name_length_limit() {
        let mut row = valid_row();
        row.last_name = "a".repeat(21);
        let violations = validate_contact_row(&row);
        assert_eq!(violations[0].message, "Max size is 20 characters");

        row.last_name = "a".repeat(20);
        assert!(validate_contact_row(&row).is_empty());
    }

    #[test]
    fn test_phone_shape() {
        let mut row = valid_row();
        for bad in ["381111111111", "+12345678", "+123456789012345", "+12a456789"] {
            row.phone_number = bad.into();
            assert_eq!(validate_contact_row(&row).len(), 1, "{} should fail", bad);
        }
        for good in ["+123456789", "+12345678901234"] {
            row.phone_number = good.into();
            assert!(validate_contact_row(&row).is_empty(), "{} should pass", good);
        }
    }

    #[test]
    fn test_address_charset() {
        let mut row = valid_row();
        row.address = "5 Main Street".into();
        assert!(validate_contact_row(&row).is_empty());

        row.address = "5 Main St.".into();
        assert_eq!(validate_contact_row(&row).len(), 1);

        row.address = "a".repeat(31);
        assert_eq!(
            validate_contact_row(&row)[0].message,
            "Max size is 30 characters"
        );
    }

    #[test]
    fn test_blank_fields_enumerate_per_field() {
        let row = ContactRow::default();
        let violations = validate_contact_row(&row);
        assert_eq!(violations.len(), 5);
        let fields: Vec<_> = violations.iter().map(|v| v.field).collect();
        assert_eq!(
            fields,
            vec!["firstName", "lastName", "phoneNumber", "address", "contactType"]
        );
    }
}
