/// Database models for Taskive
///
/// Each model carries its own SQL as associated functions generic over
/// [`sqlx::PgExecutor`], so the same query runs against a pool or inside a
/// transaction opened by [`PgStore`](crate::store::postgres::PgStore).
///
/// # Models
///
/// - `user`: accounts
/// - `project`: projects and their owner
/// - `membership`: project membership, roles and invitation status
/// - `task`: tasks within a project
/// - `comment`: comments on tasks

pub mod comment;
pub mod membership;
pub mod project;
pub mod task;
pub mod user;

/// A string that does not name any variant of a closed enum
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown {kind}: {value:?}")]
pub struct ParseEnumError {
    kind: &'static str,
    value: String,
}

impl ParseEnumError {
    pub(crate) fn new(kind: &'static str, value: &str) -> Self {
        Self {
            kind,
            value: value.to_string(),
        }
    }
}
