//! Time utilities.
//!
//! Token expiry is evaluated against the current Unix timestamp at the
//! moment of each request; there is no background sweep.

/// Returns the current Unix timestamp in seconds.
pub fn now_timestamp() -> i64 {
    chrono::Utc::now().timestamp()
}

/// A clock source, injectable for tests that exercise TTL boundaries.
pub type Clock = fn() -> i64;
