//! # TeamBoard Shared Library
//!
//! Shared types, queries, and business rules used by the TeamBoard API server.
//!
//! ## Module Organization
//!
//! - `models`: Database models and their parameterized queries
//! - `auth`: Session token validation, request auth context, role checks
//! - `db`: Connection pool and migrations
//! - `listing`: Task filters, search terms, and pagination
//! - `board`: Drag-and-drop planning for project boards

pub mod auth;
pub mod board;
pub mod db;
pub mod listing;
pub mod models;

/// Current version of the TeamBoard shared library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_is_set() {
        assert!(!VERSION.is_empty());
    }
}
