//! Request middleware

mod auth;

pub use auth::{auth_middleware, exiger_role, AuthUser, CurrentUser, UserRole};
