//! Authentication
//!
//! Turns bearer access tokens into an explicit [`Principal`]. Session
//! issuance and password handling belong to the identity provider.

mod error;
pub mod jwt;
mod middleware;
mod principal;

pub use error::{AuthError, AuthResult};
pub use middleware::require_auth;
pub use principal::{Membership, Principal};
