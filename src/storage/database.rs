//! # Database
//!
//! SQLite-backed entity store. This is the only shared mutable resource in
//! the crate: services hold an `Arc<Database>` and every request's reads and
//! writes go through the internal connection lock. There is no optimistic
//! concurrency check; concurrent saves of the same record are
//! last-write-wins.

use parking_lot::Mutex;
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::sync::Arc;

use super::schema;
use crate::error::{Error, Result};
use crate::model::{
    Contact, ContactType, EmailVerificationToken, PhoneVerificationToken, Role, User,
};
use crate::search::{AccountField, ContactField};

/// The main database handle.
pub struct Database {
    /// The underlying SQLite connection
    conn: Arc<Mutex<Connection>>,
}

impl Database {
    /// Open or create a database.
    ///
    /// If path is None, creates an in-memory database (useful for testing).
    pub fn open(path: Option<&str>) -> Result<Self> {
        let conn = match path {
            Some(p) => Connection::open(p)
                .map_err(|e| Error::DatabaseError(format!("Failed to open database: {}", e)))?,
            None => Connection::open_in_memory().map_err(|e| {
                Error::DatabaseError(format!("Failed to create in-memory database: {}", e))
            })?,
        };

        conn.execute_batch("PRAGMA foreign_keys = ON;")
            .map_err(|e| Error::DatabaseError(format!("Failed to enable foreign keys: {}", e)))?;

        let db = Self {
            conn: Arc::new(Mutex::new(conn)),
        };

        db.init_schema()?;

        Ok(db)
    }

    /// Initialize the database schema.
    fn init_schema(&self) -> Result<()> {
        let conn = self.conn.lock();

        let version: Option<i32> = conn
            .query_row("SELECT version FROM schema_version LIMIT 1", [], |row| {
                row.get(0)
            })
            .ok();

        match version {
            None => {
                conn.execute_batch(schema::CREATE_TABLES)
                    .map_err(|e| Error::DatabaseError(format!("Failed to create tables: {}", e)))?;

                conn.execute(
                    "INSERT INTO schema_version (version) VALUES (?)",
                    params![schema::SCHEMA_VERSION],
                )
                .map_err(|e| {
                    Error::DatabaseError(format!("Failed to set schema version: {}", e))
                })?;

                tracing::info!("Database schema created (version {})", schema::SCHEMA_VERSION);
            }
            Some(v) => {
                tracing::debug!("Database schema version: {}", v);
            }
        }

        Ok(())
    }

    // ========================================================================
    // USER OPERATIONS
    // ========================================================================

    /// Insert or replace a user record along with its role references.
    pub fn save_user(&self, user: &User) -> Result<()> {
        let conn = self.conn.lock();

        conn.execute(
            "INSERT INTO users (tsid, first_name, last_name, email, password_hash, phone_number, enabled, phone_verified)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?)
             ON CONFLICT(tsid) DO UPDATE SET
                 first_name = excluded.first_name,
                 last_name = excluded.last_name,
                 email = excluded.email,
                 password_hash = excluded.password_hash,
                 phone_number = excluded.phone_number,
                 enabled = excluded.enabled,
                 phone_verified = excluded.phone_verified",
            params![
                user.tsid,
                user.first_name,
                user.last_name,
                user.email,
                user.password_hash,
                user.phone_number,
                user.enabled as i64,
                user.phone_verified as i64,
            ],
        )
        .map_err(|err| match Error::from(err) {
            // The translation point detects the conflict; the offending
            // address is only known here.
            Error::EmailInUse(_) => Error::EmailInUse(user.email.clone()),
            other => other,
        })?;

        conn.execute(
            "DELETE FROM user_roles WHERE user_tsid = ?",
            params![user.tsid],
        )?;
        for role in &user.roles {
            conn.execute(
                "INSERT INTO user_roles (user_tsid, role_tsid) VALUES (?, ?)",
                params![user.tsid, role.tsid],
            )?;
        }

        Ok(())
    }

    /// Look up a user by tsid.
    pub fn find_user_by_tsid(&self, tsid: i64) -> Result<Option<User>> {
        let conn = self.conn.lock();

        let user = conn
            .query_row(
                "SELECT tsid, first_name, last_name, email, password_hash, phone_number, enabled, phone_verified
                 FROM users WHERE tsid = ?",
                params![tsid],
                row_to_user,
            )
            .optional()?;

        match user {
            Some(mut user) => {
                user.roles = load_roles(&conn, user.tsid)?;
                Ok(Some(user))
            }
            None => Ok(None),
        }
    }

    /// Look up a user by email.
    pub fn find_user_by_email(&self, email: &str) -> Result<Option<User>> {
        let conn = self.conn.lock();

        let user = conn
            .query_row(
                "SELECT tsid, first_name, last_name, email, password_hash, phone_number, enabled, phone_verified
                 FROM users WHERE email = ?",
                params![email],
                row_to_user,
            )
            .optional()?;

        match user {
            Some(mut user) => {
                user.roles = load_roles(&conn, user.tsid)?;
                Ok(Some(user))
            }
            None => Ok(None),
        }
    }

    /// Delete a user by tsid.
    pub fn delete_user_by_tsid(&self, tsid: i64) -> Result<()> {
        let conn = self.conn.lock();
        conn.execute("DELETE FROM users WHERE tsid = ?", params![tsid])?;
        Ok(())
    }

    /// One page of all user accounts, sorted ascending by the given field.
    pub fn find_users_paged(
        &self,
        sort_by: AccountField,
        page: usize,
        size: usize,
    ) -> Result<Vec<User>> {
        let conn = self.conn.lock();
        // sort_by.column() is a fixed table, never caller text.
        let sql = format!(
            "SELECT tsid, first_name, last_name, email, password_hash, phone_number, enabled, phone_verified
             FROM users ORDER BY {} ASC LIMIT ? OFFSET ?",
            sort_by.column()
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map(
            params![size as i64, (page.saturating_mul(size)) as i64],
            row_to_user,
        )?;

        let mut users = Vec::new();
        for row in rows {
            users.push(row?);
        }
        for user in &mut users {
            user.roles = load_roles(&conn, user.tsid)?;
        }
        Ok(users)
    }

    /// Count all user accounts.
    pub fn count_users(&self) -> Result<i64> {
        let conn = self.conn.lock();
        let count = conn.query_row("SELECT COUNT(*) FROM users", [], |row| row.get(0))?;
        Ok(count)
    }

    // ========================================================================
    // ROLE OPERATIONS
    // ========================================================================

    /// Insert a role.
    pub fn save_role(&self, role: &Role) -> Result<()> {
        let conn = self.conn.lock();
        conn.execute(
            "INSERT INTO roles (tsid, name) VALUES (?, ?)",
            params![role.tsid, role.name],
        )?;
        Ok(())
    }

    /// All roles, sorted by tsid.
    pub fn find_all_roles(&self) -> Result<Vec<Role>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare("SELECT tsid, name FROM roles ORDER BY tsid ASC")?;
        let rows = stmt.query_map([], |row| {
            Ok(Role {
                tsid: row.get(0)?,
                name: row.get(1)?,
            })
        })?;

        let mut roles = Vec::new();
        for row in rows {
            roles.push(row?);
        }
        Ok(roles)
    }

    /// Look up a role by tsid.
    pub fn find_role_by_tsid(&self, tsid: i64) -> Result<Option<Role>> {
        let conn = self.conn.lock();
        let role = conn
            .query_row(
                "SELECT tsid, name FROM roles WHERE tsid = ?",
                params![tsid],
                |row| {
                    Ok(Role {
                        tsid: row.get(0)?,
                        name: row.get(1)?,
                    })
                },
            )
            .optional()?;
        Ok(role)
    }

    // ========================================================================
    // CONTACT TYPE OPERATIONS
    // ========================================================================

    /// Insert or rename a contact type.
    pub fn save_contact_type(&self, contact_type: &ContactType) -> Result<()> {
        let conn = self.conn.lock();
        conn.execute(
            "INSERT INTO contact_types (tsid, label) VALUES (?, ?)
             ON CONFLICT(tsid) DO UPDATE SET label = excluded.label",
            params![contact_type.tsid, contact_type.label],
        )?;
        Ok(())
    }

    /// All contact types, sorted by label.
    pub fn find_all_contact_types(&self) -> Result<Vec<ContactType>> {
        let conn = self.conn.lock();
        let mut stmt =
            conn.prepare("SELECT tsid, label FROM contact_types ORDER BY label ASC, tsid ASC")?;
        let rows = stmt.query_map([], row_to_contact_type)?;

        let mut contact_types = Vec::new();
        for row in rows {
            contact_types.push(row?);
        }
        Ok(contact_types)
    }

    /// Look up a contact type by tsid.
    pub fn find_contact_type_by_tsid(&self, tsid: i64) -> Result<Option<ContactType>> {
        let conn = self.conn.lock();
        let contact_type = conn
            .query_row(
                "SELECT tsid, label FROM contact_types WHERE tsid = ?",
                params![tsid],
                row_to_contact_type,
            )
            .optional()?;
        Ok(contact_type)
    }

    /// Look up a contact type by label, taking the first match.
    pub fn find_contact_type_by_label(&self, label: &str) -> Result<Option<ContactType>> {
        let conn = self.conn.lock();
        let contact_type = conn
            .query_row(
                "SELECT tsid, label FROM contact_types WHERE label = ? ORDER BY rowid LIMIT 1",
                params![label],
                row_to_contact_type,
            )
            .optional()?;
        Ok(contact_type)
    }

    // ========================================================================
    // CONTACT OPERATIONS
    // ========================================================================

    /// Insert or replace a contact.
    pub fn save_contact(&self, contact: &Contact) -> Result<()> {
        let conn = self.conn.lock();
        conn.execute(
            "INSERT OR REPLACE INTO contacts (tsid, first_name, last_name, address, phone_number, owner_tsid, contact_type_tsid)
             VALUES (?, ?, ?, ?, ?, ?, ?)",
            params![
                contact.tsid,
                contact.first_name,
                contact.last_name,
                contact.address,
                contact.phone_number,
                contact.owner_tsid,
                contact.contact_type.tsid,
            ],
        )?;
        Ok(())
    }

    /// Look up a contact by tsid.
    pub fn find_contact_by_tsid(&self, tsid: i64) -> Result<Option<Contact>> {
        let conn = self.conn.lock();
        let contact = conn
            .query_row(
                &format!("{} WHERE c.tsid = ?", SELECT_CONTACT),
                params![tsid],
                row_to_contact,
            )
            .optional()?;
        Ok(contact)
    }

    /// All of an owner's contacts sorted ascending by the given field,
    /// sliced to one page.
    pub fn find_contacts_by_owner_paged(
        &self,
        owner_tsid: i64,
        sort_by: ContactField,
        page: usize,
        size: usize,
    ) -> Result<Vec<Contact>> {
        let conn = self.conn.lock();
        // sort_by.column() is a fixed table, never caller text.
        let sql = format!(
            "{} WHERE c.owner_tsid = ? ORDER BY c.{} ASC LIMIT ? OFFSET ?",
            SELECT_CONTACT,
            sort_by.column()
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map(
            params![
                owner_tsid,
                size as i64,
                (page.saturating_mul(size)) as i64
            ],
            row_to_contact,
        )?;
        collect_contacts(rows)
    }

    /// All of an owner's contacts sorted ascending by the given field.
    pub fn find_contacts_by_owner_sorted(
        &self,
        owner_tsid: i64,
        sort_by: ContactField,
    ) -> Result<Vec<Contact>> {
        let conn = self.conn.lock();
        let sql = format!(
            "{} WHERE c.owner_tsid = ? ORDER BY c.{} ASC",
            SELECT_CONTACT,
            sort_by.column()
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map(params![owner_tsid], row_to_contact)?;
        collect_contacts(rows)
    }

    /// An owner's contacts whose selected field contains the keyword as a
    /// case-insensitive substring.
    pub fn find_contacts_by_owner_and_field_containing(
        &self,
        owner_tsid: i64,
        field: ContactField,
        keyword: &str,
    ) -> Result<Vec<Contact>> {
        let conn = self.conn.lock();
        let sql = format!(
            "{} WHERE c.owner_tsid = ? AND lower(c.{}) LIKE '%' || lower(?) || '%'",
            SELECT_CONTACT,
            field.column()
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map(params![owner_tsid, keyword], row_to_contact)?;
        collect_contacts(rows)
    }

    /// Delete a contact by tsid.
    pub fn delete_contact_by_tsid(&self, tsid: i64) -> Result<()> {
        let conn = self.conn.lock();
        conn.execute("DELETE FROM contacts WHERE tsid = ?", params![tsid])?;
        Ok(())
    }

    /// Count all contacts across all owners.
    pub fn count_contacts(&self) -> Result<i64> {
        let conn = self.conn.lock();
        let count = conn.query_row("SELECT COUNT(*) FROM contacts", [], |row| row.get(0))?;
        Ok(count)
    }

    // ========================================================================
    // VERIFICATION TOKEN OPERATIONS
    // ========================================================================

    /// Persist an email verification token.
    pub fn save_email_token(&self, token: &EmailVerificationToken) -> Result<()> {
        let conn = self.conn.lock();
        conn.execute(
            "INSERT INTO email_tokens (token, user_tsid, issued_at) VALUES (?, ?, ?)",
            params![token.token, token.user_tsid, token.issued_at],
        )?;
        Ok(())
    }

    /// Look up an email verification token by its value.
    pub fn find_email_token_by_value(&self, token: &str) -> Result<Option<EmailVerificationToken>> {
        let conn = self.conn.lock();
        let record = conn
            .query_row(
                "SELECT token, user_tsid, issued_at FROM email_tokens WHERE token = ?",
                params![token],
                |row| {
                    Ok(EmailVerificationToken {
                        token: row.get(0)?,
                        user_tsid: row.get(1)?,
                        issued_at: row.get(2)?,
                    })
                },
            )
            .optional()?;
        Ok(record)
    }

    /// Persist a phone verification code.
    pub fn save_phone_code(&self, code: &PhoneVerificationToken) -> Result<()> {
        let conn = self.conn.lock();
        conn.execute(
            "INSERT INTO phone_codes (code, user_tsid, issued_at) VALUES (?, ?, ?)",
            params![code.code, code.user_tsid, code.issued_at],
        )?;
        Ok(())
    }

    /// All outstanding codes matching a value, oldest first.
    ///
    /// Codes collide across users by design, so this returns every match;
    /// the verification manager accepts any unexpired one.
    pub fn find_phone_codes_by_value(&self, code: &str) -> Result<Vec<PhoneVerificationToken>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(
            "SELECT code, user_tsid, issued_at FROM phone_codes WHERE code = ? ORDER BY id ASC",
        )?;
        let rows = stmt.query_map(params![code], |row| {
            Ok(PhoneVerificationToken {
                code: row.get(0)?,
                user_tsid: row.get(1)?,
                issued_at: row.get(2)?,
            })
        })?;

        let mut codes = Vec::new();
        for row in rows {
            codes.push(row?);
        }
        Ok(codes)
    }
}

// ============================================================================
// ROW MAPPERS
// ============================================================================

const SELECT_CONTACT: &str = "SELECT c.tsid, c.first_name, c.last_name, c.address, c.phone_number, c.owner_tsid, t.tsid, t.label
     FROM contacts c JOIN contact_types t ON t.tsid = c.contact_type_tsid";

fn row_to_user(row: &Row<'_>) -> rusqlite::Result<User> {
    Ok(User {
        tsid: row.get(0)?,
        first_name: row.get(1)?,
        last_name: row.get(2)?,
        email: row.get(3)?,
        password_hash: row.get(4)?,
        phone_number: row.get(5)?,
        enabled: row.get::<_, i64>(6)? != 0,
        phone_verified: row.get::<_, i64>(7)? != 0,
        roles: Vec::new(),
    })
}

fn row_to_contact_type(row: &Row<'_>) -> rusqlite::Result<ContactType> {
    Ok(ContactType {
        tsid: row.get(0)?,
        label: row.get(1)?,
    })
}

fn row_to_contact(row: &Row<'_>) -> rusqlite::Result<Contact> {
    Ok(Contact {
        tsid: row.get(0)?,
        first_name: row.get(1)?,
        last_name: row.get(2)?,
        address: row.get(3)?,
        phone_number: row.get(4)?,
        owner_tsid: row.get(5)?,
        contact_type: ContactType {
            tsid: row.get(6)?,
            label: row.get(7)?,
        },
    })
}

fn load_roles(conn: &Connection, user_tsid: i64) -> Result<Vec<Role>> {
    let mut stmt = conn.prepare(
        "SELECT r.tsid, r.name FROM roles r
         JOIN user_roles ur ON ur.role_tsid = r.tsid
         WHERE ur.user_tsid = ? ORDER BY r.tsid",
    )?;
    let rows = stmt.query_map(params![user_tsid], |row| {
        Ok(Role {
            tsid: row.get(0)?,
            name: row.get(1)?,
        })
    })?;

    let mut roles = Vec::new();
    for row in rows {
        roles.push(row?);
    }
    Ok(roles)
}

fn collect_contacts(
    rows: impl Iterator<Item = rusqlite::Result<Contact>>,
) -> Result<Vec<Contact>> {
    let mut contacts = Vec::new();
    for row in rows {
        contacts.push(row?);
    }
    Ok(contacts)
}

// ============================================================================
// TESTS
// ============================================================================
