pub mod auth;
pub mod error;
pub mod middleware;
pub mod notes;
pub mod notifications;
