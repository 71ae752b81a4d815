//! # CSV Exchange Pipeline
//!
//! Bulk import/export of a user's contacts as delimited text.
//!
//! ```text
//!   import:  bytes ──► extension/empty gate ──► positional parse (5 fields)
//!                 ──► per-row validation ──► type-label resolution
//!                 ──► persist row-by-row ──► ImportSummary { added, errored }
//!
//!   export:  owner's contacts (sorted by first name) ──► five unquoted
//!            columns, no header ──► caller's io::Write (HTTP body)
//! ```
//!
//! Rows failing validation or type resolution are skipped and counted, never
//! diagnosed individually; a structurally malformed file fails the whole
//! request. Rows persisted before such a failure are not rolled back.

use std::io::Write;
use std::sync::Arc;

use csv::{QuoteStyle, ReaderBuilder, Trim, WriterBuilder};
use serde::Serialize;

use crate::error::{Error, Result};
use crate::model::{next_tsid, Contact, Principal};
use crate::search::ContactField;
use crate::storage::Database;
use crate::validate::{validate_contact_row, ContactRow};

/// Suggested filename for the exported attachment.
pub const EXPORT_FILE_NAME: &str = "contacts.csv";

/// Media type of the exported stream.
pub const CSV_CONTENT_TYPE: &str = "text/csv";

/// Aggregate result of a bulk import.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ImportSummary {
    /// Rows successfully persisted.
    pub added: usize,
    /// Rows skipped by validation or type resolution.
    pub errored: usize,
}

impl ImportSummary {
    /// The user-visible summary line.
    pub fn message(&self) -> String {
        format!("{} contact(s) added. {} errored.", self.added, self.errored)
    }
}

/// Bulk CSV import/export over a user's contacts.
pub struct CsvExchange {
    database: Arc<Database>,
}

impl CsvExchange {
    /// Create an exchange pipeline over the given store.
    pub fn new(database: Arc<Database>) -> Self {
        Self { database }
    }

    /// Serialize the principal's contacts to `writer`.
    ///
    /// Rows are sorted ascending by first name and carry five unquoted
    /// columns: first name, last name, phone number, address, contact-type
    /// label. No header. The writer is typically the HTTP response body;
    /// nothing is buffered beyond one record.
    pub fn export(&self, principal: &Principal, writer: impl Write) -> Result<()> {
        let contacts = self
            .database
            .find_contacts_by_owner_sorted(principal.tsid, ContactField::FirstName)?;

        let mut csv_writer = WriterBuilder::new()
            .has_headers(false)
            .quote_style(QuoteStyle::Never)
            .from_writer(writer);

        for contact in &contacts {
            csv_writer.write_record([
                contact.first_name.as_str(),
                contact.last_name.as_str(),
                contact.phone_number.as_str(),
                contact.address.as_str(),
                contact.contact_type.label.as_str(),
            ])?;
        }
        csv_writer.flush()?;

        tracing::info!(
            "Exported {} contact(s) for user {}",
            contacts.len(),
            principal.tsid
        );
        Ok(())
    }

    /// Parse, validate, and persist an uploaded CSV file for the principal.
    ///
    /// Rejects a non-`csv` extension and empty payloads outright. Each row
    /// is validated with the interactive creation rules and its type label
    /// resolved to an existing contact type (first match); failing rows are
    /// skipped and counted as errored. Surviving rows are persisted one by
    /// one with the principal as owner.
    pub fn import(
        &self,
        principal: &Principal,
        bytes: &[u8],
        declared_filename: &str,
    ) -> Result<ImportSummary> {
        if let Some(extension) = file_extension(declared_filename) {
            if extension != "csv" {
                return Err(Error::BadExtension);
            }
        }

        if bytes.is_empty() {
            return Err(Error::EmptyFile);
        }

        let mut reader = ReaderBuilder::new()
            .has_headers(false)
            .trim(Trim::All)
            .from_reader(bytes);

        // A structurally malformed file fails the whole request; already
        // persisted rows stay.
        let rows: Vec<ContactRow> = reader
            .deserialize()
            .collect::<std::result::Result<_, _>>()?;

        let total = rows.len();
        let mut added = 0;

        for row in rows {
            if !validate_contact_row(&row).is_empty() {
                continue;
            }

            // An unresolvable label is a per-row skip, same as a validation
            // failure.
            let contact_type = match self.database.find_contact_type_by_label(&row.contact_type)? {
                Some(contact_type) => contact_type,
                None => {
                    tracing::debug!("Skipping row with unknown contact type {}", row.contact_type);
                    continue;
                }
            };

            let contact = Contact {
                tsid: next_tsid(),
                first_name: row.first_name,
                last_name: row.last_name,
                address: row.address,
                phone_number: row.phone_number,
                owner_tsid: principal.tsid,
                contact_type,
            };
            self.database.save_contact(&contact)?;
            added += 1;
        }

        let summary = ImportSummary {
            added,
            errored: total - added,
        };

        tracing::info!(
            "CSV import for user {}: {}",
            principal.tsid,
            summary.message()
        );
        Ok(summary)
    }
}

/// The filename's extension, if it has one.
fn file_extension(filename: &str) -> Option<&str> {
    filename.rsplit_once('.').map(|(_, ext)| ext)
}

// ============================================================================
// TESTS
// ============================================================================
