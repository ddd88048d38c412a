//! # Taskive Shared Library
//!
//! Domain logic for the Taskive project/task collaboration backend, used by
//! the API server and by anything else that needs to talk to the same data.
//!
//! ## Module Organization
//!
//! - `auth`: password hashing, JWT tokens, bearer-token resolution, project RBAC
//! - `models`: rows, enums and SQL for users, projects, memberships, tasks, comments
//! - `store`: the `Store` trait with PostgreSQL and in-memory implementations
//! - `services`: accounts, memberships, project lifecycle, tasks, comments
//! - `db`: connection pool and migrations

pub mod auth;
pub mod db;
pub mod models;
pub mod services;
pub mod store;

/// Current version of the Taskive shared library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_is_set() {
        assert!(!VERSION.is_empty());
    }
}
