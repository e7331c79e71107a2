use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, warn};

use crate::auth::{generate_jwt, JwtError, Principal};
use crate::config;
use crate::database::manager::DatabaseError;
use crate::database::repositories::UserRepository;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Invalid username or password")]
    InvalidCredentials,

    #[error(transparent)]
    Database(#[from] DatabaseError),

    #[error(transparent)]
    Jwt(#[from] JwtError),
}

#[derive(Debug, Serialize)]
pub struct TokenGrant {
    pub access_token: String,
    pub token_type: String,
    pub expires_in: u64,
}

#[derive(Clone)]
pub struct AuthService {
    users: Arc<dyn UserRepository>,
}

impl AuthService {
    pub fn new(users: Arc<dyn UserRepository>) -> Self {
        Self { users }
    }

    /// Verify credentials and issue a bearer token whose scope claim joins the
    /// user's role names (ROLE_ prefixed) with their authority code names.
    pub async fn login(&self, username: &str, password: &str) -> Result<TokenGrant, AuthError> {
        let user = self
            .users
            .find_by_username(username)
            .await?
            .ok_or(AuthError::InvalidCredentials)?;

        if !user.is_enabled() || user.is_locked() {
            return Err(AuthError::InvalidCredentials);
        }

        let matches = bcrypt::verify(password, user.credential_hash())
            .map_err(|_| AuthError::InvalidCredentials)?;
        if !matches {
            return Err(AuthError::InvalidCredentials);
        }

        let roles = self.users.role_names(user.id).await?;
        let authorities = self.users.authority_names(user.id).await?;
        let granted: Vec<String> = roles
            .iter()
            .map(|r| format!("ROLE_{}", r))
            .chain(authorities.into_iter())
            .collect();

        let token = generate_jwt(user.username(), &granted)?;
        debug!("Issued token for '{}' with {} authorities", user.username, granted.len());

        // Audit stamp; a failure here must not fail the login.
        if let Err(e) = self.users.touch_last_login(user.id, Utc::now()).await {
            warn!("Failed to stamp last_login for '{}': {}", user.username, e);
        }

        Ok(TokenGrant {
            access_token: token,
            token_type: "Bearer".to_string(),
            expires_in: config::config().security.jwt_expiry_seconds,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MemoryUsers;

    #[tokio::test]
    async fn unknown_user_is_invalid_credentials() {
        let svc = AuthService::new(Arc::new(MemoryUsers::empty()));
        let err = svc.login("ghost", "pw").await.unwrap_err();
        assert!(matches!(err, AuthError::InvalidCredentials));
    }

    #[tokio::test]
    async fn wrong_password_is_invalid_credentials() {
        let users = MemoryUsers::with_credentials(1, "john", "right-password");
        let svc = AuthService::new(Arc::new(users));
        let err = svc.login("john", "wrong-password").await.unwrap_err();
        assert!(matches!(err, AuthError::InvalidCredentials));
    }

    #[tokio::test]
    async fn malformed_stored_hash_is_invalid_credentials() {
        let users = MemoryUsers::with_raw_hash(1, "john", "not-a-bcrypt-hash");
        let svc = AuthService::new(Arc::new(users));
        let err = svc.login("john", "anything").await.unwrap_err();
        assert!(matches!(err, AuthError::InvalidCredentials));
    }
}
