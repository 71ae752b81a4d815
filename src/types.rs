//! # Contact Type Management
//!
//! Administration of the contact categories that interactive creation and
//! CSV import resolve against. Labels need not be unique; label lookups
//! elsewhere take the first match, so renaming a type never re-labels the
//! contacts already pointing at it.

use std::sync::Arc;

use crate::error::{Error, Result};
use crate::model::{next_tsid, ContactType};
use crate::storage::Database;

/// Service managing contact types.
pub struct ContactTypeService {
    database: Arc<Database>,
}

impl ContactTypeService {
    /// Create a contact-type service over the given store.
    pub fn new(database: Arc<Database>) -> Self {
        Self { database }
    }

    /// All contact types, sorted by label.
    pub fn list_contact_types(&self) -> Result<Vec<ContactType>> {
        self.database.find_all_contact_types()
    }

    /// Create a contact type with a generated tsid.
    pub fn add_contact_type(&self, label: &str) -> Result<ContactType> {
        check_label(label)?;

        let contact_type = ContactType {
            tsid: next_tsid(),
            label: label.to_string(),
        };
        self.database.save_contact_type(&contact_type)?;

        tracing::info!(
            "Added contact type {} ({})",
            contact_type.tsid,
            contact_type.label
        );
        Ok(contact_type)
    }

    /// Rename an existing contact type.
    pub fn update_contact_type(&self, tsid: i64, label: &str) -> Result<ContactType> {
        check_label(label)?;

        let mut contact_type = self
            .database
            .find_contact_type_by_tsid(tsid)?
            .ok_or_else(|| Error::ContactTypeNotFound(tsid.to_string()))?;

        contact_type.label = label.to_string();
        self.database.save_contact_type(&contact_type)?;

        tracing::info!("Renamed contact type {} to {}", tsid, contact_type.label);
        Ok(contact_type)
    }
}

fn check_label(label: &str) -> Result<()> {
    if label.trim().is_empty() {
        return Err(Error::ValidationFailed(vec![
            "Contact type must not be blank".into(),
        ]));
    }
    Ok(())
}

// ============================================================================
// TESTS
// ============================================================================
