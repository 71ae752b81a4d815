//! # Directory Service Facade
//!
//! Composes the ownership guard, search engine, and CSV pipeline into the
//! per-request contact operations. Every read or mutation of a contact is
//! gated on ownership first, and an ownership failure is reported as
//! "not found" so a non-owner never learns the record exists.

use std::io::Write;
use std::sync::Arc;

use crate::error::{Error, Result};
use crate::exchange::{CsvExchange, ImportSummary};
use crate::guard;
use crate::model::{next_tsid, Contact, Principal};
use crate::search::{self, ContactField};
use crate::storage::Database;
use crate::validate::{validate_contact_row, ContactRow};

/// Request to create a contact.
#[derive(Debug, Clone)]
pub struct NewContact {
    /// First name.
    pub first_name: String,
    /// Last name.
    pub last_name: String,
    /// Street address.
    pub address: String,
    /// Phone number.
    pub phone_number: String,
    /// Tsid of an existing contact type.
    pub contact_type_tsid: i64,
}

/// Partial contact update. Blank or absent fields are left untouched.
#[derive(Debug, Clone, Default)]
pub struct ContactUpdate {
    /// New first name.
    pub first_name: Option<String>,
    /// New last name.
    pub last_name: Option<String>,
    /// New street address.
    pub address: Option<String>,
    /// New phone number.
    pub phone_number: Option<String>,
    /// Tsid of a replacement contact type.
    pub contact_type_tsid: Option<i64>,
}

/// The contact directory facade.
pub struct DirectoryService {
    database: Arc<Database>,
    exchange: CsvExchange,
}

impl DirectoryService {
    /// Create a directory service over the given store.
    pub fn new(database: Arc<Database>) -> Self {
        Self {
            exchange: CsvExchange::new(database.clone()),
            database,
        }
    }

    /// Create a contact owned by the principal.
    ///
    /// Fields are validated as a whole (one message per offending field);
    /// the owner and the contact type must resolve to existing records.
    pub fn add_contact(&self, principal: &Principal, request: NewContact) -> Result<Contact> {
        let row = ContactRow {
            first_name: request.first_name.clone(),
            last_name: request.last_name.clone(),
            phone_number: request.phone_number.clone(),
            address: request.address.clone(),
            // Type resolution is by tsid here; the label slot only needs to
            // pass the non-blank rule.
            contact_type: request.contact_type_tsid.to_string(),
        };
        let violations = validate_contact_row(&row);
        if !violations.is_empty() {
            return Err(Error::ValidationFailed(
                violations.into_iter().map(|v| v.message).collect(),
            ));
        }

        let owner = self
            .database
            .find_user_by_tsid(principal.tsid)?
            .ok_or(Error::UserNotFound {
                field: "tsid",
                value: principal.tsid.to_string(),
            })?;

        let contact_type = self
            .database
            .find_contact_type_by_tsid(request.contact_type_tsid)?
            .ok_or_else(|| Error::ContactTypeNotFound(request.contact_type_tsid.to_string()))?;

        let contact = Contact {
            tsid: next_tsid(),
            first_name: request.first_name,
            last_name: request.last_name,
            address: request.address,
            phone_number: request.phone_number,
            owner_tsid: owner.tsid,
            contact_type,
        };
        self.database.save_contact(&contact)?;

        tracing::info!("Added contact {} for user {}", contact.tsid, owner.tsid);
        Ok(contact)
    }

    /// Fetch one of the principal's contacts by tsid.
    pub fn get_contact(&self, principal: &Principal, tsid: i64) -> Result<Contact> {
        self.owned_contact(principal, tsid)
    }

    /// One page of the principal's contacts, sorted ascending.
    ///
    /// `sort_by` falls back to first name when unrecognized.
    pub fn list_contacts(
        &self,
        principal: &Principal,
        page: usize,
        size: usize,
        sort_by: &str,
    ) -> Result<Vec<Contact>> {
        self.database.find_contacts_by_owner_paged(
            principal.tsid,
            ContactField::parse_sort(sort_by),
            page,
            size,
        )
    }

    /// Search the principal's contacts.
    ///
    /// `field` selects the match predicate (unknown names yield an empty
    /// result); `keyword` matches as a case-insensitive substring; results
    /// are sorted by `sort_by` and then paged.
    pub fn search_contacts(
        &self,
        principal: &Principal,
        field: &str,
        keyword: &str,
        page: usize,
        size: usize,
        sort_by: &str,
    ) -> Result<Vec<Contact>> {
        let search_field = match ContactField::parse(field) {
            Some(search_field) => search_field,
            None => return Ok(Vec::new()),
        };

        let matched = self.database.find_contacts_by_owner_and_field_containing(
            principal.tsid,
            search_field,
            keyword,
        )?;

        Ok(search::search(
            matched,
            Some(search_field),
            keyword,
            ContactField::parse_sort(sort_by),
            page,
            size,
        ))
    }

    /// Apply a partial update to one of the principal's contacts.
    pub fn update_contact(
        &self,
        principal: &Principal,
        tsid: i64,
        update: ContactUpdate,
    ) -> Result<Contact> {
        let mut contact = self.owned_contact(principal, tsid)?;

        if let Some(first_name) = non_blank(&update.first_name) {
            contact.first_name = first_name.to_string();
        }
        if let Some(last_name) = non_blank(&update.last_name) {
            contact.last_name = last_name.to_string();
        }
        if let Some(address) = non_blank(&update.address) {
            contact.address = address.to_string();
        }
        if let Some(phone_number) = non_blank(&update.phone_number) {
            contact.phone_number = phone_number.to_string();
        }
        if let Some(type_tsid) = update.contact_type_tsid {
            contact.contact_type = self
                .database
                .find_contact_type_by_tsid(type_tsid)?
                .ok_or_else(|| Error::ContactTypeNotFound(type_tsid.to_string()))?;
        }

        let row = ContactRow {
            first_name: contact.first_name.clone(),
            last_name: contact.last_name.clone(),
            phone_number: contact.phone_number.clone(),
            address: contact.address.clone(),
            contact_type: contact.contact_type.label.clone(),
        };
        let violations = validate_contact_row(&row);
        if !violations.is_empty() {
            return Err(Error::ValidationFailed(
                violations.into_iter().map(|v| v.message).collect(),
            ));
        }

        self.database.save_contact(&contact)?;
        tracing::info!("Updated contact {}", contact.tsid);
        Ok(contact)
    }

    /// Delete one of the principal's contacts by tsid.
    pub fn delete_contact(&self, principal: &Principal, tsid: i64) -> Result<()> {
        let contact = self.owned_contact(principal, tsid)?;
        self.database.delete_contact_by_tsid(contact.tsid)?;
        tracing::info!("Deleted contact {}", contact.tsid);
        Ok(())
    }

    /// Stream the principal's contacts as CSV into `writer`.
    pub fn export_csv(&self, principal: &Principal, writer: impl Write) -> Result<()> {
        self.exchange.export(principal, writer)
    }

    /// Import contacts for the principal from an uploaded CSV file.
    pub fn import_csv(
        &self,
        principal: &Principal,
        bytes: &[u8],
        declared_filename: &str,
    ) -> Result<ImportSummary> {
        self.exchange.import(principal, bytes, declared_filename)
    }

    /// Total number of contacts across all owners.
    ///
    /// The transport layer maps a zero count to a not-found response.
    pub fn count_contacts(&self) -> Result<i64> {
        self.database.count_contacts()
    }

    /// Load a contact and enforce ownership; a miss and a foreign owner are
    /// indistinguishable to the caller.
    fn owned_contact(&self, principal: &Principal, tsid: i64) -> Result<Contact> {
        let contact = self
            .database
            .find_contact_by_tsid(tsid)?
            .ok_or(Error::ContactNotFound(tsid))?;

        if !guard::owns_contact(principal, &contact) {
            return Err(Error::ContactNotFound(tsid));
        }
        Ok(contact)
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
    use crate::model::{ContactType, Role, User};

    fn setup() -> (Arc<Database>, DirectoryService, Principal, Principal) {
        let database = Arc::new(Database::open(None).unwrap());
        database
            .save_role(&Role {
                tsid: 1,
                name: "ROLE_USER".into(),
            })
            .unwrap();

        let mut principals = Vec::new();
        for (tsid, email) in [(1, "ann@example.com"), (2, "bo@example.com")] {
            let user = User {
                tsid,
                first_name: "Ann".into(),
                last_name: "Lee".into(),
                email: email.into(),
                password_hash: "hash".into(),
                phone_number: "+381111111111".into(),
                enabled: true,
                phone_verified: false,
                roles: vec![Role {
                    tsid: 1,
                    name: "ROLE_USER".into(),
                }],
            };
            database.save_user(&user).unwrap();
            principals.push(user.principal());
        }

        for (tsid, label) in [(10, "Friend"), (20, "Work")] {
            database
                .save_contact_type(&ContactType {
                    tsid,
                    label: label.into(),
                })
                .unwrap();
        }

        let service = DirectoryService::new(database.clone());
        let other = principals.pop().unwrap();
        let owner = principals.pop().unwrap();
        (database, service, owner, other)
    }

    fn new_contact(first: &str, phone: &str) -> NewContact {
        NewContact {
            first_name: first.into(),
            last_name: "Lee".into(),
            address: "Addr1".into(),
            phone_number: phone.into(),
            contact_type_tsid: 10,
        }
    }

    #[test]
    fn test_add_and_get_contact() {
        let (_database, service, owner, _other) = setup();
        let contact = service
            .add_contact(&owner, new_contact("Ann", "+381111111111"))
            .unwrap();

        let fetched = service.get_contact(&owner, contact.tsid).unwrap();
        assert_eq!(fetched.first_name, "Ann");
        assert_eq!(fetched.contact_type.label, "Friend");
        assert_eq!(fetched.owner_tsid, owner.tsid);
    }

    #[test]
    fn test_add_contact_unknown_type() {
        let (_database, service, owner, _other) = setup();
        let mut request = new_contact("Ann", "+381111111111");
        request.contact_type_tsid = 999;
        assert!(matches!(
            service.add_contact(&owner, request),
            Err(Error::ContactTypeNotFound(_))
        ));
    }

    #[test]
    fn test_add_contact_validation_enumerates_fields() {
        let (_database, service, owner, _other) = setup();
        let mut request = new_contact("Ann3", "381111111111");
        request.address = "Addr!".into();
        let err = service.add_contact(&owner, request).unwrap_err();
        match err {
            Error::ValidationFailed(messages) => assert_eq!(messages.len(), 3),
            other => panic!("expected validation failure, got {:?}", other),
        }
    }

    #[test]
    fn test_foreign_contact_reads_as_not_found() {
        let (_database, service, owner, other) = setup();
        let contact = service
            .add_contact(&owner, new_contact("Ann", "+381111111111"))
            .unwrap();

        assert!(matches!(
            service.get_contact(&other, contact.tsid),
            Err(Error::ContactNotFound(_))
        ));
        assert!(matches!(
            service.update_contact(&other, contact.tsid, ContactUpdate::default()),
            Err(Error::ContactNotFound(_))
        ));
        assert!(matches!(
            service.delete_contact(&other, contact.tsid),
            Err(Error::ContactNotFound(_))
        ));

        // The owner still sees it.
        assert!(service.get_contact(&owner, contact.tsid).is_ok());
    }

    #[test]
    fn test_list_contacts_sorted_and_paged() {
        let (_database, service, owner, _other) = setup();
        for first in ["Cy", "Ann", "Bo"] {
            service
                .add_contact(&owner, new_contact(first, "+381111111111"))
                .unwrap();
        }

        let page = service.list_contacts(&owner, 0, 2, "firstName").unwrap();
        let names: Vec<_> = page.iter().map(|c| c.first_name.as_str()).collect();
        assert_eq!(names, vec!["Ann", "Bo"]);

        // Unrecognized sort falls back to first name.
        let fallback = service.list_contacts(&owner, 0, 2, "bogus").unwrap();
        assert_eq!(fallback[0].first_name, "Ann");
    }

    #[test]
    fn test_search_scoped_to_owner() {
        let (_database, service, owner, other) = setup();
        service
            .add_contact(&owner, new_contact("Ann", "+381111111111"))
            .unwrap();
        service
            .add_contact(&other, new_contact("Annika", "+381222222222"))
            .unwrap();

        let hits = service
            .search_contacts(&owner, "firstName", "an", 0, 10, "firstName")
            .unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].first_name, "Ann");

        let none = service
            .search_contacts(&owner, "middleName", "an", 0, 10, "firstName")
            .unwrap();
        assert!(none.is_empty());
    }

    #[test]
    fn test_update_contact_fields_and_type() {
        let (_database, service, owner, _other) = setup();
        let contact = service
            .add_contact(&owner, new_contact("Ann", "+381111111111"))
            .unwrap();

        let updated = service
            .update_contact(
                &owner,
                contact.tsid,
                ContactUpdate {
                    first_name: Some("Anna".into()),
                    contact_type_tsid: Some(20),
                    ..Default::default()
                },
            )
            .unwrap();

        assert_eq!(updated.first_name, "Anna");
        assert_eq!(updated.contact_type.label, "Work");
        assert_eq!(updated.phone_number, "+381111111111");
    }

    #[test]
    fn test_update_contact_rejects_invalid_result() {
        let (_database, service, owner, _other) = setup();
        let contact = service
            .add_contact(&owner, new_contact("Ann", "+381111111111"))
            .unwrap();

        assert!(matches!(
            service.update_contact(
                &owner,
                contact.tsid,
                ContactUpdate {
                    phone_number: Some("not a phone".into()),
                    ..Default::default()
                },
            ),
            Err(Error::ValidationFailed(_))
        ));
    }

    #[test]
    fn test_delete_contact() {
        let (_database, service, owner, _other) = setup();
        let contact = service
            .add_contact(&owner, new_contact("Ann", "+381111111111"))
            .unwrap();

        service.delete_contact(&owner, contact.tsid).unwrap();
        assert!(matches!(
            service.get_contact(&owner, contact.tsid),
            Err(Error::ContactNotFound(_))
        ));
        assert_eq!(service.count_contacts().unwrap(), 0);
    }

    #[test]
    fn test_csv_delegation() {
        let (_database, service, owner, _other) = setup();
        service
            .add_contact(&owner, new_contact("Ann", "+381111111111"))
            .unwrap();

        let mut buffer = Vec::new();
        service.export_csv(&owner, &mut buffer).unwrap();

        let summary = service.import_csv(&owner, &buffer, "contacts.csv").unwrap();
        assert_eq!(summary.added, 1);
        assert_eq!(summary.errored, 0);
        assert_eq!(service.count_contacts().unwrap(), 2);
    }
}
