//! # HRMS Shared Library
//!
//! Types, persistence and business rules shared by the HRMS API server.
//!
//! ## Module Organization
//!
//! - `db`: connection pool, migrations and database introspection
//! - `models`: database models and their SQL operations
//! - `auth`: password hashing, tokens, authentication context and authorization
//! - `attendance`: shift timing, check-in/check-out and overtime rules
//! - `transfer`: CSV import/export codecs

pub mod attendance;
pub mod auth;
pub mod db;
pub mod models;
pub mod transfer;

/// Current version of the HRMS shared library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_is_set() {
        assert!(!VERSION.is_empty());
    }
}
