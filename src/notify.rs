//! # Outbound Messaging
//!
//! Email and SMS delivery seams. Transports are external collaborators; the
//! crate only defines the traits plus logging no-op implementations for
//! tests and local embedding.
//!
//! Failure semantics differ by channel: a failed verification email fails
//! the account-creation request (the caller cannot onboard without the
//! link), while a failed verification SMS is reported but the issued code
//! stays valid. The account service owns that distinction.

use crate::error::Result;
use crate::model::User;

/// Sends account verification emails.
pub trait EmailSender: Send + Sync {
    /// Deliver the verification link for `token` to the user's address.
    fn send_verification_email(&self, user: &User, token: &str) -> Result<()>;
}

/// Sends verification SMS messages.
pub trait SmsSender: Send + Sync {
    /// Deliver `body` to the given phone number.
    fn send_sms(&self, phone_number: &str, body: &str) -> Result<()>;
}

/// Render the verification SMS body for a code.
pub fn verification_sms_body(code: &str) -> String {
    format!("Your verification code is: {}", code)
}

/// Email sender that only logs. Used in tests and headless embedding.
#[derive(Debug, Default)]
pub struct LoggingEmailSender;

impl EmailSender for LoggingEmailSender {
    fn send_verification_email(&self, user: &User, token: &str) -> Result<()> {
        tracing::info!("Verification email for {}: token {}", user.email, token);
        Ok(())
    }
}

/// SMS sender that only logs. Used in tests and headless embedding.
#[derive(Debug, Default)]
pub struct LoggingSmsSender;

impl SmsSender for LoggingSmsSender {
    fn send_sms(&self, phone_number: &str, body: &str) -> Result<()> {
        tracing::info!("SMS to {}: {}", phone_number, body);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sms_body() {
        assert_eq!(
            verification_sms_body("042137"),
            "Your verification code is: 042137"
        );
    }
}
