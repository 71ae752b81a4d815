//! # Error Handling
//!
//! One error type for the whole crate, grouped by domain. Lookup misses and
//! ownership failures are surfaced as "not found" outcomes at the service
//! boundary; a non-owner is never told that somebody else's record exists.
//!
//! The [`Outcome`] payload is the user-visible representation: every outcome
//! carries a timestamp and one message per problem.

use serde::Serialize;
use thiserror::Error;

/// Result type alias for rolodex-core operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for rolodex-core.
#[derive(Error, Debug)]
pub enum Error {
    // ========================================================================
    // Account Errors (100-199)
    // ========================================================================
    /// User lookup missed; names the field and value that failed.
    #[error("User with {field} {value} not found.")]
    UserNotFound {
        /// Lookup field that missed (e.g. "tsid", "email").
        field: &'static str,
        /// The value that was searched for.
        value: String,
    },

    /// The email address is already registered to another account.
    #[error("Email {0} is already in use.")]
    EmailInUse(String),

    /// Role lookup by tsid missed.
    #[error("Role with tsid {0} not found.")]
    RoleNotFound(i64),

    // ========================================================================
    // Contact Errors (200-299)
    // ========================================================================
    /// Contact lookup missed, or the caller does not own the contact.
    #[error("Contact with tsid {0} not found.")]
    ContactNotFound(i64),

    /// Contact type lookup missed (by tsid or label).
    #[error("Contact type {0} not found.")]
    ContactTypeNotFound(String),

    /// Field-level constraint violations, one message per offending field.
    #[error("Validation failed: {}", .0.join(" "))]
    ValidationFailed(Vec<String>),

    // ========================================================================
    // Verification Errors (300-399)
    // ========================================================================
    /// The phone number is already verified; no new code may be issued.
    #[error("Phone number is already verified.")]
    AlreadyVerified,

    // ========================================================================
    // CSV Exchange Errors (400-499)
    // ========================================================================
    /// The uploaded file carries an extension other than `csv`.
    #[error("File type is not .csv")]
    BadExtension,

    /// The uploaded file is empty.
    #[error("File is empty")]
    EmptyFile,

    /// The file could not be parsed as delimited text.
    #[error("CSV parse error: {0}")]
    CsvParse(String),

    // ========================================================================
    // Delivery Errors (500-599)
    // ========================================================================
    /// Verification email could not be sent. Fails account creation: the
    /// caller cannot complete onboarding without the link.
    #[error("Failed to send verification email: {0}")]
    EmailDeliveryFailed(String),

    /// Verification SMS could not be sent. Reported, but the issued code
    /// stays valid.
    #[error("Failed to send verification SMS: {0}")]
    SmsDeliveryFailed(String),

    // ========================================================================
    // Storage & Internal Errors (900-999)
    // ========================================================================
    /// Database error.
    #[error("Database error: {0}")]
    DatabaseError(String),

    /// Serialization error.
    #[error("Serialization error: {0}")]
    SerializationError(String),

    /// I/O failure while reading or writing a stream.
    #[error("I/O error: {0}")]
    Io(String),
}

impl Error {
    /// Numeric error code, grouped by category.
    pub fn code(&self) -> i32 {
        match self {
            Error::UserNotFound { .. } => 100,
            Error::EmailInUse(_) => 101,
            Error::RoleNotFound(_) => 102,

            Error::ContactNotFound(_) => 200,
            Error::ContactTypeNotFound(_) => 201,
            Error::ValidationFailed(_) => 202,

            Error::AlreadyVerified => 300,

            Error::BadExtension => 400,
            Error::EmptyFile => 401,
            Error::CsvParse(_) => 402,

            Error::EmailDeliveryFailed(_) => 500,
            Error::SmsDeliveryFailed(_) => 501,

            Error::DatabaseError(_) => 900,
            Error::SerializationError(_) => 901,
            Error::Io(_) => 902,
        }
    }

    /// Whether this error should be reported to the caller as "not found".
    ///
    /// Ownership failures deliberately land here too, so a non-owner cannot
    /// distinguish "exists but not yours" from "does not exist".
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Error::UserNotFound { .. }
                | Error::ContactNotFound(_)
                | Error::ContactTypeNotFound(_)
                | Error::RoleNotFound(_)
        )
    }

    /// Whether the request itself was malformed (client error).
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Error::ValidationFailed(_)
                | Error::EmailInUse(_)
                | Error::AlreadyVerified
                | Error::BadExtension
                | Error::EmptyFile
                | Error::CsvParse(_)
        )
    }
}

// ============================================================================
// ERROR CONVERSIONS
// ============================================================================

impl From<rusqlite::Error> for Error {
    fn from(err: rusqlite::Error) -> Self {
        // Single translation point for storage-level constraint violations.
        if let rusqlite::Error::SqliteFailure(e, Some(ref msg)) = err {
            if e.code == rusqlite::ErrorCode::ConstraintViolation && msg.contains("users.email") {
                return Error::EmailInUse(String::new());
            }
        }
        Error::DatabaseError(err.to_string())
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::SerializationError(err.to_string())
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Io(err.to_string())
    }
}

impl From<csv::Error> for Error {
    fn from(err: csv::Error) -> Self {
        Error::CsvParse(err.to_string())
    }
}

// ============================================================================
// USER-VISIBLE OUTCOME
// ============================================================================

/// Structured outcome payload handed to the transport layer.
#[derive(Debug, Clone, Serialize)]
pub struct Outcome {
    /// Unix timestamp of when the outcome was produced.
    pub timestamp: i64,
    /// One message per problem; a single entry for most outcomes.
    pub messages: Vec<String>,
}

impl Outcome {
    /// Build an outcome with a single message.
    pub fn message(message: impl Into<String>) -> Self {
        Self {
            timestamp: crate::time::now_timestamp(),
            messages: vec![message.into()],
        }
    }
}

impl From<&Error> for Outcome {
    fn from(err: &Error) -> Self {
        let messages = match err {
            // Validation failures enumerate one message per offending field.
            Error::ValidationFailed(violations) => violations.clone(),
            other => vec![other.to_string()],
        };
        Self {
            timestamp: crate::time::now_timestamp(),
            messages,
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        assert_eq!(
            Error::UserNotFound {
                field: "tsid",
                value: "7".into()
            }
            .code(),
            100
        );
        assert_eq!(Error::ContactNotFound(1).code(), 200);
        assert_eq!(Error::AlreadyVerified.code(), 300);
        assert_eq!(Error::BadExtension.code(), 400);
        assert_eq!(Error::EmailDeliveryFailed("smtp down".into()).code(), 500);
        assert_eq!(Error::DatabaseError("x".into()).code(), 900);
    }

    #[test]
    fn test_not_found_classification() {
        assert!(Error::ContactNotFound(1).is_not_found());
        assert!(Error::RoleNotFound(2).is_not_found());
        assert!(!Error::AlreadyVerified.is_not_found());
        assert!(!Error::EmptyFile.is_not_found());
    }

    #[test]
    fn test_client_error_classification() {
        assert!(Error::BadExtension.is_client_error());
        assert!(Error::EmailInUse("a@b.com".into()).is_client_error());
        assert!(!Error::DatabaseError("x".into()).is_client_error());
        assert!(!Error::ContactNotFound(1).is_client_error());
    }

    #[test]
    fn test_single_message_outcome() {
        let outcome = Outcome::message("2 contact(s) added. 1 errored.");
        assert_eq!(outcome.messages, vec!["2 contact(s) added. 1 errored."]);
    }

    #[test]
    fn test_validation_outcome_enumerates_fields() {
        let err = Error::ValidationFailed(vec![
            "First name can only contain letters of the alphabet without spaces".into(),
            "Phone must have '+' followed by 9 to 14 digits, example: +314584814848".into(),
        ]);
        let outcome = Outcome::from(&err);
        assert_eq!(outcome.messages.len(), 2);
        assert!(outcome.timestamp > 0);
    }

    #[test]
    fn test_user_not_found_names_field_and_value() {
        let err = Error::UserNotFound {
            field: "email",
            value: "a@b.com".into(),
        };
        assert_eq!(err.to_string(), "User with email a@b.com not found.");
    }
}
