/// API route handlers
///
/// Organized by resource:
///
/// - `health`: health check
/// - `auth`: register, login, current user
/// - `users`: user lookup by email
/// - `projects`: project lifecycle and membership management
/// - `invitations`: the caller's pending invitations
/// - `tasks`: task CRUD
/// - `comments`: comments on tasks
///
/// Handlers stay thin: extract, validate the body, call one service method,
/// shape the response. Authorization happens inside the services.

pub mod auth;
pub mod comments;
pub mod health;
pub mod invitations;
pub mod projects;
pub mod tasks;
pub mod users;
