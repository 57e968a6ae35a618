//! Bearer token verification
//!
//! Tokens are issued by the external authentication service and verified
//! here with a shared secret. The subject claim carries the user id.

use crate::error::{ArenaError, Result};
use crate::types::UserId;
use async_trait::async_trait;
use jsonwebtoken::{decode, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Claims carried by an issued bearer token
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenClaims {
    /// Subject, the user id as issued by the authentication service
    pub sub: String,
    /// Display name, when the issuer includes one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    /// Expiry as a unix timestamp
    pub exp: usize,
    /// Issued-at as a unix timestamp
    pub iat: usize,
}

/// Verified caller identity extracted from a bearer token
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub user_id: UserId,
    pub username: Option<String>,
}

/// Trait for verifying bearer tokens
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Authenticator: Send + Sync {
    /// Verify a token and return the caller's identity
    ///
    /// # Arguments
    /// * `token` - The raw bearer token
    ///
    /// # Returns
    /// * `Result<Identity>` - The verified identity or an authentication error
    async fn authenticate(&self, token: &str) -> Result<Identity>;
}

/// Authenticator that verifies HS256-signed tokens with a shared secret
pub struct JwtAuthenticator {
    decoding_key: DecodingKey,
}

impl JwtAuthenticator {
    /// Create a new JWT authenticator
    pub fn new(secret: &str) -> Self {
        Self {
            decoding_key: DecodingKey::from_secret(secret.as_ref()),
        }
    }
}

#[async_trait]
impl Authenticator for JwtAuthenticator {
    async fn authenticate(&self, token: &str) -> Result<Identity> {
        // Validation::default() checks the signature and expiry
        let data =
            decode::<TokenClaims>(token, &self.decoding_key, &Validation::default()).map_err(
                |e| {
                    debug!("Token verification failed: {}", e);
                    ArenaError::AuthenticationFailed {
                        reason: "Invalid token".to_string(),
                    }
                },
            )?;

        let user_id: UserId =
            data.claims
                .sub
                .parse()
                .map_err(|_| ArenaError::AuthenticationFailed {
                    reason: format!("Token subject is not a user id: {}", data.claims.sub),
                })?;

        Ok(Identity {
            user_id,
            username: data.claims.username,
        })
    }
}

/// Mint a signed bearer token for a user
///
/// The service never calls this at runtime; tokens come from the external
/// authentication service. It exists so tests and tooling can produce
/// tokens the verifier accepts.
pub fn issue_token(
    secret: &str,
    user_id: UserId,
    username: Option<&str>,
    ttl_secs: i64,
) -> Result<String> {
    let now = chrono::Utc::now();
    let claims = TokenClaims {
        sub: user_id.to_string(),
        username: username.map(|name| name.to_string()),
        exp: (now + chrono::Duration::seconds(ttl_secs)).timestamp() as usize,
        iat: now.timestamp() as usize,
    };

    let token = jsonwebtoken::encode(
        &jsonwebtoken::Header::default(),
        &claims,
        &jsonwebtoken::EncodingKey::from_secret(secret.as_ref()),
    )
    .map_err(|e| ArenaError::AuthenticationFailed {
        reason: format!("Failed to sign token: {}", e),
    })?;

    Ok(token)
}

/// Static token authenticator for testing
pub struct StaticTokenAuthenticator {
    identities: std::collections::HashMap<String, Identity>,
}

impl StaticTokenAuthenticator {
    /// Create an authenticator that accepts no tokens
    pub fn deny_all() -> Self {
        Self {
            identities: std::collections::HashMap::new(),
        }
    }

    /// Create an authenticator with specific valid tokens
    pub fn with_tokens(identities: std::collections::HashMap<String, Identity>) -> Self {
        Self { identities }
    }

    /// Accept `token` as `user_id`
    pub fn add_token(&mut self, token: impl Into<String>, user_id: UserId) {
        self.identities.insert(
            token.into(),
            Identity {
                user_id,
                username: None,
            },
        );
    }
}

#[async_trait]
impl Authenticator for StaticTokenAuthenticator {
    async fn authenticate(&self, token: &str) -> Result<Identity> {
        self.identities.get(token).cloned().ok_or_else(|| {
            ArenaError::AuthenticationFailed {
                reason: "Invalid token".to_string(),
            }
            .into()
        })
    }
}
