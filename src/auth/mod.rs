//! Authentication module for PickVault
//!
//! Email/password authentication with signed bearer tokens.
//! - JWT access tokens (7 days) and refresh tokens (30 days)
//! - Extractors that re-load the user row per request so deactivated
//!   accounts are cut off immediately, not at token expiry

mod extract;
mod jwt;

pub use extract::{AdminUser, AuthUser, MaybeAuthUser};
pub use jwt::{generate_access_token, generate_refresh_token, verify_token, Claims};
