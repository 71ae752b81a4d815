//! # Rolodex Core
//!
//! A personal contact directory library: verified user accounts, per-user
//! contact books with search and pagination, and bulk CSV exchange.
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        ROLODEX CORE MODULES                             │
//! ├─────────────────────────────────────────────────────────────────────────┤
//! │                                                                         │
//! │  ┌─────────────┐  ┌─────────────┐  ┌─────────────┐  ┌──────────────┐   │
//! │  │  Accounts   │  │   Verify    │  │  Directory  │  │   Exchange   │   │
//! │  │             │  │             │  │             │  │              │   │
//! │  │ - Register  │  │ - Email 24h │  │ - CRUD      │  │ - CSV import │   │
//! │  │ - Update    │  │ - Phone 1h  │  │ - Search    │  │ - CSV export │   │
//! │  │ - Delete    │  │ - Expiry    │  │ - Paginate  │  │ - Row skips  │   │
//! │  └──────┬──────┘  └──────┬──────┘  └──────┬──────┘  └──────┬───────┘   │
//! │         │                │                │                │           │
//! │         └────────────────┴────────┬───────┴────────────────┘           │
//! │                                   │                                     │
//! │  ┌─────────────┐  ┌─────────────┐ │ ┌─────────────────────────────────┐│
//! │  │    Guard    │  │  Validate   │ │ │           Storage               ││
//! │  │             │  │             │ │ │                                 ││
//! │  │ - Ownership │  │ - Names     │◄┘ │ - SQLite (rusqlite)            ││
//! │  │ - Admin     │  │ - Phone     │   │ - Users, roles, contacts       ││
//! │  │   role      │  │ - Address   │   │ - Tokens and codes             ││
//! │  └─────────────┘  └─────────────┘   └─────────────────────────────────┘│
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Hierarchy
//!
//! - [`error`] - Error types for the entire library
//! - [`model`] - Domain records (users, roles, contacts, tokens)
//! - [`storage`] - SQLite persistence layer
//! - [`validate`] - Field-level contact validation rules
//! - [`guard`] - Ownership and administrator-role predicates
//! - [`search`] - Filter, sort, and paginate over contact fields
//! - [`types`] - Contact-type administration (list, add, rename)
//! - [`verify`] - Email-token and phone-code lifecycle
//! - [`notify`] - Outbound email and SMS delivery seams
//! - [`accounts`] - Account registration and administration
//! - [`exchange`] - Bulk CSV import/export pipeline
//! - [`directory`] - Per-request contact operations facade
//!
//! ## Access Model
//!
//! Every contact operation runs on behalf of a [`model::Principal`], a
//! narrow view of the authenticated user. Contacts are private to their
//! owner: a read or mutation of someone else's contact reports "not
//! found", never "forbidden". Administrators may manage accounts but gain
//! no access to other users' contacts.

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

// ============================================================================
// MODULE DECLARATIONS
// ============================================================================

pub mod accounts;
pub mod directory;
pub mod error;
pub mod exchange;
pub mod guard;
pub mod model;
pub mod notify;
pub mod search;
pub mod storage;
/// Unix-timestamp helpers and the injectable clock type.
pub mod time;
pub mod types;
pub mod validate;
pub mod verify;

// ============================================================================
// RE-EXPORTS
// ============================================================================

pub use accounts::{AccountService, AccountUpdate, NewAccount};
pub use directory::{ContactUpdate, DirectoryService, NewContact};
pub use error::{Error, Outcome, Result};
pub use exchange::{CsvExchange, ImportSummary};
pub use model::{Contact, ContactType, Principal, Role, User};
pub use search::{AccountField, ContactField};
pub use storage::Database;
pub use types::ContactTypeService;
pub use verify::VerificationService;

// ============================================================================
// CORE INSTANCE
// ============================================================================

use std::sync::Arc;

use notify::{EmailSender, LoggingEmailSender, LoggingSmsSender, SmsSender};

/// Configuration for opening a Rolodex instance.
#[derive(Debug, Clone, Default)]
pub struct RolodexConfig {
    /// Database path (in-memory if None).
    pub storage_path: Option<String>,
}

/// The main Rolodex instance wiring storage and services together.
///
/// Embedding applications construct one `Rolodex` per database and route
/// requests to its services; every service shares the same underlying
/// connection, so account and contact operations observe each other's
/// writes immediately.
pub struct Rolodex {
    database: Arc<Database>,
    accounts: AccountService,
    directory: DirectoryService,
    contact_types: ContactTypeService,
    verification: VerificationService,
}

impl Rolodex {
    /// Open a Rolodex with logging-only outbound messaging.
    pub fn open(config: RolodexConfig) -> Result<Self> {
        Self::open_with_senders(
            config,
            Arc::new(LoggingEmailSender),
            Arc::new(LoggingSmsSender),
        )
    }

    /// Open a Rolodex with the given delivery transports.
    pub fn open_with_senders(
        config: RolodexConfig,
        email_sender: Arc<dyn EmailSender>,
        sms_sender: Arc<dyn SmsSender>,
    ) -> Result<Self> {
        let database = Arc::new(Database::open(config.storage_path.as_deref())?);

        tracing::info!(
            "Rolodex opened ({} account(s), {} contact(s))",
            database.count_users()?,
            database.count_contacts()?
        );

        Ok(Self {
            accounts: AccountService::new(database.clone(), email_sender, sms_sender),
            directory: DirectoryService::new(database.clone()),
            contact_types: ContactTypeService::new(database.clone()),
            verification: VerificationService::new(database.clone()),
            database,
        })
    }

    /// Account registration and administration.
    pub fn accounts(&self) -> &AccountService {
        &self.accounts
    }

    /// Per-request contact operations.
    pub fn directory(&self) -> &DirectoryService {
        &self.directory
    }

    /// Contact-type administration.
    pub fn contact_types(&self) -> &ContactTypeService {
        &self.contact_types
    }

    /// Token and code verification.
    pub fn verification(&self) -> &VerificationService {
        &self.verification
    }

    /// Direct access to the underlying store.
    pub fn database(&self) -> &Arc<Database> {
        &self.database
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_in_memory_and_register() {
        let rolodex = Rolodex::open(RolodexConfig::default()).unwrap();
        rolodex
            .database()
            .save_role(&Role {
                tsid: 1,
                name: "ROLE_USER".into(),
            })
            .unwrap();

        let user = rolodex
            .accounts()
            .create_account(NewAccount {
                first_name: "Ann".into(),
                last_name: "Lee".into(),
                email: "ann@example.com".into(),
                raw_password: "secret".into(),
                phone_number: "+381111111111".into(),
                role_tsids: vec![1],
            })
            .unwrap();
        assert!(!user.enabled);

        // No contact types seeded yet.
        let err = rolodex
            .directory()
            .add_contact(
                &user.principal(),
                NewContact {
                    first_name: "Bo".into(),
                    last_name: "Ray".into(),
                    address: "Addr1".into(),
                    phone_number: "+381222222222".into(),
                    contact_type_tsid: 0,
                },
            )
            .unwrap_err();
        assert!(matches!(err, Error::ContactTypeNotFound(_)));

        // Seed one through the type service and retry.
        let kind = rolodex.contact_types().add_contact_type("Friend").unwrap();
        let contact = rolodex
            .directory()
            .add_contact(
                &user.principal(),
                NewContact {
                    first_name: "Bo".into(),
                    last_name: "Ray".into(),
                    address: "Addr1".into(),
                    phone_number: "+381222222222".into(),
                    contact_type_tsid: kind.tsid,
                },
            )
            .unwrap();
        assert_eq!(contact.contact_type.label, "Friend");
    }
}
