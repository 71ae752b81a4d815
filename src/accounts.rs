//! # Account Management
//!
//! User account lifecycle: creation (disabled until email verification),
//! self-service and administrator updates, deletion, and phone-code
//! requests.
//!
//! Account usability walks `Created(disabled)` → `EmailPending` →
//! `Active(phone unverified)` → `Active(phone verified)`. The only way back
//! to disabled is an administrator-initiated email change, which demands a
//! fresh verification cycle.

use std::sync::Arc;

use sha2::{Digest, Sha256};

use crate::error::{Error, Result};
use crate::guard;
use crate::model::{next_tsid, Principal, Role, User};
use crate::notify::{verification_sms_body, EmailSender, SmsSender};
use crate::search::AccountField;
use crate::storage::Database;
use crate::verify::VerificationService;

/// One-way password hash primitive. Opaque to the rest of the crate.
pub trait PasswordHasher: Send + Sync {
    /// Hash a raw password.
    fn hash(&self, raw: &str) -> String;
}

/// Default hasher: hex-encoded SHA-256 digest.
#[derive(Debug, Default)]
pub struct Sha256Hasher;

impl PasswordHasher for Sha256Hasher {
    fn hash(&self, raw: &str) -> String {
        hex::encode(Sha256::digest(raw.as_bytes()))
    }
}

/// Request to create a new account.
#[derive(Debug, Clone)]
pub struct NewAccount {
    /// First name.
    pub first_name: String,
    /// Last name.
    pub last_name: String,
    /// Email address; must be globally unique.
    pub email: String,
    /// Raw password, hashed before persistence.
    pub raw_password: String,
    /// Phone number in international format.
    pub phone_number: String,
    /// Tsids of roles to grant.
    pub role_tsids: Vec<i64>,
}

/// Partial account update. Blank or absent fields are left untouched.
#[derive(Debug, Clone, Default)]
pub struct AccountUpdate {
    /// Another user's tsid; honored only for administrators.
    pub target_tsid: Option<i64>,
    /// New first name.
    pub first_name: Option<String>,
    /// New last name.
    pub last_name: Option<String>,
    /// New email address; resets `enabled` (admin-targeted updates only).
    pub email: Option<String>,
    /// New phone number; resets `phone_verified`.
    pub phone_number: Option<String>,
    /// New raw password, re-hashed.
    pub password: Option<String>,
    /// Replacement role set (admin-targeted updates only).
    pub role_tsids: Option<Vec<i64>>,
}

/// Service managing user accounts.
pub struct AccountService {
    database: Arc<Database>,
    verification: VerificationService,
    email_sender: Arc<dyn EmailSender>,
    sms_sender: Arc<dyn SmsSender>,
    hasher: Box<dyn PasswordHasher>,
}

impl AccountService {
    /// Create an account service with the default password hasher.
    pub fn new(
        database: Arc<Database>,
        email_sender: Arc<dyn EmailSender>,
        sms_sender: Arc<dyn SmsSender>,
    ) -> Self {
        Self::with_hasher(database, email_sender, sms_sender, Box::new(Sha256Hasher))
    }

    /// Create an account service with a custom password hasher.
    pub fn with_hasher(
        database: Arc<Database>,
        email_sender: Arc<dyn EmailSender>,
        sms_sender: Arc<dyn SmsSender>,
        hasher: Box<dyn PasswordHasher>,
    ) -> Self {
        Self {
            verification: VerificationService::new(database.clone()),
            database,
            email_sender,
            sms_sender,
            hasher,
        }
    }

    /// Create a new, disabled account and issue its email verification token.
    ///
    /// The verification email is sent as part of the request; a delivery
    /// failure fails account creation and removes the new record, since the
    /// caller cannot complete onboarding without the link.
    pub fn create_account(&self, request: NewAccount) -> Result<User> {
        if self.database.find_user_by_email(&request.email)?.is_some() {
            return Err(Error::EmailInUse(request.email));
        }

        let roles = self.resolve_roles(&request.role_tsids)?;

        let user = User {
            tsid: next_tsid(),
            first_name: request.first_name,
            last_name: request.last_name,
            email: request.email,
            password_hash: self.hasher.hash(&request.raw_password),
            phone_number: request.phone_number,
            enabled: false,
            phone_verified: false,
            roles,
        };
        self.database.save_user(&user)?;

        let token = self.verification.issue_email_token(&user)?;

        if let Err(err) = self
            .email_sender
            .send_verification_email(&user, &token.token)
        {
            // No onboarding without the link: undo the creation.
            self.database.delete_user_by_tsid(user.tsid)?;
            return Err(Error::EmailDeliveryFailed(err.to_string()));
        }

        tracing::info!("Created account {} ({})", user.tsid, user.email);
        Ok(user)
    }

    /// Apply a partial update to an account.
    ///
    /// An administrator may target another user by tsid and replace its role
    /// set; a non-blank email change on that path disables the account until
    /// it re-verifies. Everyone else updates their own record. A non-blank
    /// phone change resets `phone_verified`; a non-blank password is
    /// re-hashed.
    pub fn update_account(&self, principal: &Principal, update: AccountUpdate) -> Result<User> {
        let mut user = match update.target_tsid {
            Some(target) if guard::is_administrator(principal) => {
                let mut target_user = self.find_user(target)?;

                if let Some(email) = non_blank(&update.email) {
                    target_user.email = email.to_string();
                    target_user.enabled = false;
                }
                if let Some(role_tsids) = &update.role_tsids {
                    target_user.roles = self.resolve_roles(role_tsids)?;
                }
                target_user
            }
            _ => self.find_user(principal.tsid)?,
        };

        if let Some(first_name) = non_blank(&update.first_name) {
            user.first_name = first_name.to_string();
        }
        if let Some(last_name) = non_blank(&update.last_name) {
            user.last_name = last_name.to_string();
        }
        if let Some(phone_number) = non_blank(&update.phone_number) {
            user.phone_number = phone_number.to_string();
            user.phone_verified = false;
        }
        if let Some(password) = non_blank(&update.password) {
            user.password_hash = self.hasher.hash(password);
        }

        self.database.save_user(&user)?;
        tracing::info!("Updated account {}", user.tsid);
        self.find_user(user.tsid)
    }

    /// Delete an account by tsid.
    pub fn delete_account(&self, tsid: i64) -> Result<()> {
        if self.database.find_user_by_tsid(tsid)?.is_none() {
            return Err(Error::UserNotFound {
                field: "tsid",
                value: tsid.to_string(),
            });
        }
        self.database.delete_user_by_tsid(tsid)?;
        tracing::info!("Deleted account {}", tsid);
        Ok(())
    }

    /// Look up an account by tsid.
    pub fn get_account(&self, tsid: i64) -> Result<User> {
        self.find_user(tsid)
    }

    /// One page of all accounts, sorted ascending.
    ///
    /// Administrator-facing; the transport layer gates access. `sort_by`
    /// falls back to first name when unrecognized.
    pub fn list_accounts(&self, page: usize, size: usize, sort_by: &str) -> Result<Vec<User>> {
        self.database
            .find_users_paged(AccountField::parse_sort(sort_by), page, size)
    }

    /// All grantable roles.
    pub fn list_roles(&self) -> Result<Vec<Role>> {
        self.database.find_all_roles()
    }

    /// Count all accounts.
    pub fn count_accounts(&self) -> Result<i64> {
        self.database.count_users()
    }

    /// Issue a phone verification code for the principal and send it by SMS.
    ///
    /// An SMS delivery failure is logged but does not roll back issuance;
    /// the code stays usable.
    pub fn request_phone_code(&self, principal: &Principal) -> Result<String> {
        let user = self.find_user(principal.tsid)?;
        let code = self.verification.issue_phone_code(&user)?;

        if let Err(err) = self
            .sms_sender
            .send_sms(&user.phone_number, &verification_sms_body(&code.code))
        {
            tracing::warn!(
                "SMS delivery to user {} failed, code remains valid: {}",
                user.tsid,
                err
            );
        }

        Ok(code.code)
    }

    fn find_user(&self, tsid: i64) -> Result<User> {
        self.database
            .find_user_by_tsid(tsid)?
            .ok_or(Error::UserNotFound {
                field: "tsid",
                value: tsid.to_string(),
            })
    }

    fn resolve_roles(&self, role_tsids: &[i64]) -> Result<Vec<Role>> {
        role_tsids
            .iter()
            .map(|&tsid| {
                self.database
                    .find_role_by_tsid(tsid)?
                    .ok_or(Error::RoleNotFound(tsid))
            })
            .collect()
    }
}

/// The value when present and not blank.
fn non_blank(value: &Option<String>) -> Option<&str> {
    match value.as_deref() {
        Some(v) if !v.trim().is_empty() => Some(v),
        _ => None,
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ADMIN_ROLE;
    use crate::notify::{LoggingEmailSender, LoggingSmsSender};

    /// Email sender that always fails, for delivery-failure paths.
    struct FailingEmailSender;

    impl EmailSender for FailingEmailSender {
        fn send_verification_email(&self, _user: &User, _token: &str) -> Result<()> {
            Err(Error::EmailDeliveryFailed("smtp unreachable".into()))
        }
    }

    struct FailingSmsSender;

    impl SmsSender for FailingSmsSender {
        fn send_sms(&self, _phone_number: &str, _body: &str) -> Result<()> {
            Err(Error::SmsDeliveryFailed("gateway unreachable".into()))
        }
    }

    fn setup() -> (Arc<Database>, AccountService) {
        let database = Arc::new(Database::open(None).unwrap());
        seed_roles(&database);
        let service = AccountService::new(
            database.clone(),
            Arc::new(LoggingEmailSender),
            Arc::new(LoggingSmsSender),
        );
        (database, service)
    }

    fn seed_roles(database: &Database) {
        for (tsid, name) in [(1, "ROLE_USER"), (2, ADMIN_ROLE)] {
            database
                .save_role(&Role {
                    tsid,
                    name: name.into(),
                })
                .unwrap();
        }
    }

    fn new_account(email: &str) -> NewAccount {
        NewAccount {
            first_name: "Ann".into(),
            last_name: "Lee".into(),
            email: email.into(),
            raw_password: "s3cret".into(),
            phone_number: "+381111111111".into(),
            role_tsids: vec![1],
        }
    }

    #[test]
    fn test_create_account_starts_disabled_with_hashed_password() {
        let (database, service) = setup();
        let user = service.create_account(new_account("ann@example.com")).unwrap();

        assert!(!user.enabled);
        assert!(!user.phone_verified);
        assert_ne!(user.password_hash, "s3cret");
        assert_eq!(user.password_hash, Sha256Hasher.hash("s3cret"));
        assert_eq!(user.roles.len(), 1);

        // A token was issued in the same operation.
        let loaded = database.find_user_by_tsid(user.tsid).unwrap();
        assert!(loaded.is_some());
    }

    #[test]
    fn test_duplicate_email_rejected() {
        let (_database, service) = setup();
        service.create_account(new_account("ann@example.com")).unwrap();
        let err = service
            .create_account(new_account("ann@example.com"))
            .unwrap_err();
        assert!(matches!(err, Error::EmailInUse(email) if email == "ann@example.com"));
    }

    #[test]
    fn test_unknown_role_rejected() {
        let (_database, service) = setup();
        let mut request = new_account("ann@example.com");
        request.role_tsids = vec![999];
        assert!(matches!(
            service.create_account(request),
            Err(Error::RoleNotFound(999))
        ));
    }

    #[test]
    fn test_email_delivery_failure_fails_creation() {
        let database = Arc::new(Database::open(None).unwrap());
        seed_roles(&database);
        let service = AccountService::new(
            database.clone(),
            Arc::new(FailingEmailSender),
            Arc::new(LoggingSmsSender),
        );

        let err = service
            .create_account(new_account("ann@example.com"))
            .unwrap_err();
        assert!(matches!(err, Error::EmailDeliveryFailed(_)));

        // The half-created account is gone.
        assert!(database
            .find_user_by_email("ann@example.com")
            .unwrap()
            .is_none());
    }

    #[test]
    fn test_self_update_ignores_blank_fields() {
        let (_database, service) = setup();
        let user = service.create_account(new_account("ann@example.com")).unwrap();

        let updated = service
            .update_account(
                &user.principal(),
                AccountUpdate {
                    first_name: Some("Anna".into()),
                    last_name: Some("   ".into()),
                    ..Default::default()
                },
            )
            .unwrap();

        assert_eq!(updated.first_name, "Anna");
        assert_eq!(updated.last_name, "Lee");
    }

    #[test]
    fn test_phone_change_resets_verification() {
        let (database, service) = setup();
        let mut user = service.create_account(new_account("ann@example.com")).unwrap();
        user.phone_verified = true;
        database.save_user(&user).unwrap();

        let updated = service
            .update_account(
                &user.principal(),
                AccountUpdate {
                    phone_number: Some("+381999999999".into()),
                    ..Default::default()
                },
            )
            .unwrap();

        assert_eq!(updated.phone_number, "+381999999999");
        assert!(!updated.phone_verified);
    }

    #[test]
    fn test_admin_email_change_disables_target() {
        let (database, service) = setup();
        let target = service.create_account(new_account("ann@example.com")).unwrap();
        let mut enabled = database.find_user_by_tsid(target.tsid).unwrap().unwrap();
        enabled.enabled = true;
        database.save_user(&enabled).unwrap();

        let mut admin_req = new_account("admin@example.com");
        admin_req.role_tsids = vec![1, 2];
        let admin = service.create_account(admin_req).unwrap();

        let updated = service
            .update_account(
                &admin.principal(),
                AccountUpdate {
                    target_tsid: Some(target.tsid),
                    email: Some("ann.new@example.com".into()),
                    ..Default::default()
                },
            )
            .unwrap();

        assert_eq!(updated.email, "ann.new@example.com");
        assert!(!updated.enabled);
    }

    #[test]
    fn test_non_admin_cannot_target_other_users() {
        let (_database, service) = setup();
        let target = service.create_account(new_account("ann@example.com")).unwrap();
        let other = service.create_account(new_account("bo@example.com")).unwrap();

        // The target tsid is ignored; the caller's own record is updated.
        let updated = service
            .update_account(
                &other.principal(),
                AccountUpdate {
                    target_tsid: Some(target.tsid),
                    first_name: Some("Mallory".into()),
                    ..Default::default()
                },
            )
            .unwrap();

        assert_eq!(updated.tsid, other.tsid);
        assert_eq!(
            service.get_account(target.tsid).unwrap().first_name,
            "Ann"
        );
    }

    #[test]
    fn test_list_accounts_sorted_and_paged() {
        let (_database, service) = setup();
        for email in ["cy@example.com", "ann@example.com", "bo@example.com"] {
            service.create_account(new_account(email)).unwrap();
        }

        let page = service.list_accounts(0, 2, "email").unwrap();
        let emails: Vec<_> = page.iter().map(|u| u.email.as_str()).collect();
        assert_eq!(emails, vec!["ann@example.com", "bo@example.com"]);

        let rest = service.list_accounts(1, 2, "email").unwrap();
        assert_eq!(rest.len(), 1);
        assert_eq!(rest[0].email, "cy@example.com");

        // Unrecognized sort falls back to first name without erroring.
        assert_eq!(service.list_accounts(0, 10, "bogus").unwrap().len(), 3);
    }

    #[test]
    fn test_list_roles() {
        let (_database, service) = setup();
        let roles = service.list_roles().unwrap();
        assert_eq!(roles.len(), 2);
        assert_eq!(roles[0].name, "ROLE_USER");
        assert_eq!(roles[1].name, ADMIN_ROLE);
    }

    #[test]
    fn test_delete_account() {
        let (_database, service) = setup();
        let user = service.create_account(new_account("ann@example.com")).unwrap();

        service.delete_account(user.tsid).unwrap();
        assert!(matches!(
            service.delete_account(user.tsid),
            Err(Error::UserNotFound { .. })
        ));
    }

    #[test]
    fn test_phone_code_survives_sms_failure() {
        let database = Arc::new(Database::open(None).unwrap());
        seed_roles(&database);
        let service = AccountService::new(
            database.clone(),
            Arc::new(LoggingEmailSender),
            Arc::new(FailingSmsSender),
        );

        let user = service.create_account(new_account("ann@example.com")).unwrap();
        let code = service.request_phone_code(&user.principal()).unwrap();

        // The issued code is still usable.
        let verifier = VerificationService::new(database);
        assert!(verifier.verify_phone_code(&code).unwrap());
    }

    #[test]
    fn test_phone_code_rejected_when_already_verified() {
        let (database, service) = setup();
        let mut user = service.create_account(new_account("ann@example.com")).unwrap();
        user.phone_verified = true;
        database.save_user(&user).unwrap();

        assert!(matches!(
            service.request_phone_code(&user.principal()),
            Err(Error::AlreadyVerified)
        ));
    }
}
