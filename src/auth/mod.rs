//! Token verification for API and WebSocket access
//!
//! Tokens are issued by the external authentication service; this module
//! only verifies them.

pub mod token;

// Re-export commonly used types
pub use token::{
    issue_token, Authenticator, Identity, JwtAuthenticator, StaticTokenAuthenticator, TokenClaims,
};
