//! Admin authentication for flowgate relay.
//!
//! Dashboards authenticate with a signed JWT access token.

pub mod claims;
pub mod jwt;

pub use claims::Claims;
pub use jwt::JwtManager;
