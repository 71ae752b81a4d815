//! # Storage Module
//!
//! The durable entity store: a SQLite database reachable by primary key and
//! by the secondary lookups the services need (unique email, owner-scoped
//! contact queries, token values).

mod database;
pub mod schema;

pub use database::Database;
