//! # Database Schema
//!
//! SQL schema definitions for the directory database.
//!
//! ```text
//! ┌─────────────────┐    ┌─────────────────┐    ┌─────────────────┐
//! │     users       │    │    contacts     │    │  contact_types  │
//! ├─────────────────┤    ├─────────────────┤    ├─────────────────┤
//! │ tsid            │◄───│ owner_tsid      │    │ tsid            │◄─┐
//! │ first_name      │    │ first_name      │    │ label           │  │
//! │ last_name       │    │ last_name       │    └─────────────────┘  │
//! │ email (unique)  │    │ address         │                         │
//! │ password_hash   │    │ phone_number    │    ┌─────────────────┐  │
//! │ phone_number    │    │ contact_type ───┼────┤                 │──┘
//! │ enabled         │    └─────────────────┘    └─────────────────┘
//! │ phone_verified  │
//! └─────────────────┘    ┌─────────────────┐    ┌─────────────────┐
//!                        │  email_tokens   │    │   phone_codes   │
//! ┌─────────────────┐    ├─────────────────┤    ├─────────────────┤
//! │ roles           │    │ token           │    │ code            │
//! │ user_roles      │    │ user_tsid       │    │ user_tsid       │
//! └─────────────────┘    │ issued_at       │    │ issued_at       │
//!                        └─────────────────┘    └─────────────────┘
//! ```
//!
//! Verification tokens are never deleted here; they go semantically dead when
//! their validity window elapses. Purging is an external housekeeping concern.

/// Current schema version
pub const SCHEMA_VERSION: i32 = 1;

/// SQL to create all tables
pub const CREATE_TABLES: &str = r#"
-- Schema version tracking
CREATE TABLE IF NOT EXISTS schema_version (
    version INTEGER PRIMARY KEY
);

-- User accounts
-- Created disabled; enabled flips on email verification
CREATE TABLE IF NOT EXISTS users (
    tsid INTEGER PRIMARY KEY,
    first_name TEXT NOT NULL,
    last_name TEXT NOT NULL,
    -- Globally unique; a duplicate insert surfaces as a conflict outcome
    email TEXT NOT NULL UNIQUE,
    -- Opaque one-way hash
    password_hash TEXT NOT NULL,
    phone_number TEXT NOT NULL,
    enabled INTEGER NOT NULL DEFAULT 0,
    phone_verified INTEGER NOT NULL DEFAULT 0
);
CREATE INDEX IF NOT EXISTS idx_users_email ON users(email);

-- Roles, immutable after creation
CREATE TABLE IF NOT EXISTS roles (
    tsid INTEGER PRIMARY KEY,
    name TEXT NOT NULL
);

-- Role references per user (referenced, never owned)
CREATE TABLE IF NOT EXISTS user_roles (
    user_tsid INTEGER NOT NULL REFERENCES users(tsid) ON DELETE CASCADE,
    role_tsid INTEGER NOT NULL REFERENCES roles(tsid),
    PRIMARY KEY (user_tsid, role_tsid)
);

-- Contact categories; label lookups take the first match
CREATE TABLE IF NOT EXISTS contact_types (
    tsid INTEGER PRIMARY KEY,
    label TEXT NOT NULL
);

-- Address-book entries, each owned by exactly one user
CREATE TABLE IF NOT EXISTS contacts (
    tsid INTEGER PRIMARY KEY,
    first_name TEXT NOT NULL,
    last_name TEXT NOT NULL,
    address TEXT NOT NULL,
    phone_number TEXT NOT NULL,
    owner_tsid INTEGER NOT NULL REFERENCES users(tsid) ON DELETE CASCADE,
    contact_type_tsid INTEGER NOT NULL REFERENCES contact_types(tsid)
);
CREATE INDEX IF NOT EXISTS idx_contacts_owner ON contacts(owner_tsid);

-- Email confirmation tokens, valid 24h from issuance
CREATE TABLE IF NOT EXISTS email_tokens (
    token TEXT PRIMARY KEY,
    user_tsid INTEGER NOT NULL REFERENCES users(tsid) ON DELETE CASCADE,
    issued_at INTEGER NOT NULL
);

-- Phone confirmation codes, valid 1h from issuance
-- Multiple outstanding codes may coexist per user
CREATE TABLE IF NOT EXISTS phone_codes (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    code TEXT NOT NULL,
    user_tsid INTEGER NOT NULL REFERENCES users(tsid) ON DELETE CASCADE,
    issued_at INTEGER NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_phone_codes_code ON phone_codes(code);
"#;
