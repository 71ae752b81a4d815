//! # Verification Token Manager
//!
//! Issues, validates, and expires email-confirmation tokens and
//! phone-confirmation codes.
//!
//! Expiry is evaluated at verification time as a pure duration comparison
//! against the clock at the moment of the request; there are no scheduled
//! sweeps, and dead tokens are left in place for external housekeeping.

use std::sync::Arc;

use rand::Rng;
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::model::{EmailVerificationToken, PhoneVerificationToken, User};
use crate::storage::Database;
use crate::time::Clock;

/// Email tokens are valid for 24 hours from issuance.
pub const EMAIL_TOKEN_TTL_SECS: i64 = 24 * 60 * 60;

/// Phone codes are valid for 1 hour from issuance.
pub const PHONE_CODE_TTL_SECS: i64 = 60 * 60;

/// True iff a token issued at `issued_at` is past its validity window.
fn is_expired(issued_at: i64, ttl: i64, now: i64) -> bool {
    (now - issued_at) >= ttl
}

/// Service issuing and checking verification tokens.
pub struct VerificationService {
    database: Arc<Database>,
    clock: Clock,
}

impl VerificationService {
    /// Create a verification service reading the system clock.
    pub fn new(database: Arc<Database>) -> Self {
        Self::with_clock(database, crate::time::now_timestamp)
    }

    /// Create a verification service with an injected clock. Lets tests walk
    /// tokens across their TTL boundary without waiting.
    pub fn with_clock(database: Arc<Database>, clock: Clock) -> Self {
        Self { database, clock }
    }

    /// Issue an email confirmation token for a user.
    ///
    /// The token is persisted bound to the user and the current timestamp,
    /// and returned for inclusion in the outbound message.
    pub fn issue_email_token(&self, user: &User) -> Result<EmailVerificationToken> {
        let token = EmailVerificationToken {
            token: Uuid::new_v4().to_string(),
            user_tsid: user.tsid,
            issued_at: (self.clock)(),
        };
        self.database.save_email_token(&token)?;

        tracing::info!("Issued email verification token for user {}", user.tsid);
        Ok(token)
    }

    /// Verify an email confirmation token.
    ///
    /// Unknown or expired tokens return false without mutating state. A
    /// valid token enables the owning account and returns true; the token
    /// record stays in place, so re-submitting a still-fresh token is
    /// idempotent and returns true again.
    pub fn verify_email_token(&self, token: &str) -> Result<bool> {
        let record = match self.database.find_email_token_by_value(token)? {
            Some(record) => record,
            None => return Ok(false),
        };

        if is_expired(record.issued_at, EMAIL_TOKEN_TTL_SECS, (self.clock)()) {
            return Ok(false);
        }

        let mut user = match self.database.find_user_by_tsid(record.user_tsid)? {
            Some(user) => user,
            None => {
                tracing::warn!("Email token {} references a deleted user", token);
                return Ok(false);
            }
        };

        user.enabled = true;
        self.database.save_user(&user)?;

        tracing::info!("Email verified for user {}", user.tsid);
        Ok(true)
    }

    /// Issue a phone confirmation code for a user.
    ///
    /// Rejected once the phone number is already verified. The code is a
    /// uniformly random 6-digit zero-padded string; collisions across users
    /// are permitted and not checked.
    pub fn issue_phone_code(&self, user: &User) -> Result<PhoneVerificationToken> {
        if user.phone_verified {
            return Err(Error::AlreadyVerified);
        }

        let code = PhoneVerificationToken {
            code: format!("{:06}", rand::thread_rng().gen_range(0..=999_999)),
            user_tsid: user.tsid,
            issued_at: (self.clock)(),
        };
        self.database.save_phone_code(&code)?;

        tracing::info!("Issued phone verification code for user {}", user.tsid);
        Ok(code)
    }

    /// Verify a phone confirmation code.
    ///
    /// Multiple outstanding codes may share a value; any unexpired match
    /// succeeds. Unknown or fully expired values return false.
    pub fn verify_phone_code(&self, code: &str) -> Result<bool> {
        let now = (self.clock)();

        for record in self.database.find_phone_codes_by_value(code)? {
            if is_expired(record.issued_at, PHONE_CODE_TTL_SECS, now) {
                continue;
            }

            let mut user = match self.database.find_user_by_tsid(record.user_tsid)? {
                Some(user) => user,
                None => continue,
            };

            user.phone_verified = true;
            self.database.save_user(&user)?;

            tracing::info!("Phone verified for user {}", user.tsid);
            return Ok(true);
        }

        Ok(false)
    }
}

// ============================================================================
// TESTS
// ============================================================================
