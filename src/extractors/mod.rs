//! Request extractors.

mod auth;
pub use auth::optional_user;
