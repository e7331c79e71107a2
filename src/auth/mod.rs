use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use crate::config;

/// Claims carried by a bearer token: subject plus a comma-joined authority list.
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub scope: String,
    pub iss: String,
    pub exp: i64,
    pub iat: i64,
}

impl Claims {
    pub fn new(subject: String, authorities: &[String], issuer: String, expiry_seconds: u64) -> Self {
        let now = Utc::now();
        let exp = (now + Duration::seconds(expiry_seconds as i64)).timestamp();

        Self {
            sub: subject,
            scope: authorities.join(","),
            iss: issuer,
            exp,
            iat: now.timestamp(),
        }
    }

    pub fn authorities(&self) -> Vec<String> {
        self.scope
            .split(',')
            .filter(|s| !s.is_empty())
            .map(|s| s.to_string())
            .collect()
    }
}

#[derive(Debug)]
pub enum JwtError {
    TokenGeneration(String),
    InvalidToken(String),
    InvalidSecret,
}

impl std::fmt::Display for JwtError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            JwtError::TokenGeneration(msg) => write!(f, "JWT generation error: {}", msg),
            JwtError::InvalidToken(msg) => write!(f, "Invalid JWT token: {}", msg),
            JwtError::InvalidSecret => write!(f, "Invalid JWT secret"),
        }
    }
}

impl std::error::Error for JwtError {}

/// Issue a signed token for the subject, claims built from the active config.
pub fn generate_jwt(subject: &str, authorities: &[String]) -> Result<String, JwtError> {
    let security = &config::config().security;
    let claims = Claims::new(
        subject.to_string(),
        authorities,
        security.jwt_issuer.clone(),
        security.jwt_expiry_seconds,
    );
    encode_claims(&claims, &security.jwt_secret)
}

/// Verify signature, expiry, and issuer against the active config.
pub fn validate_jwt(token: &str) -> Result<Claims, JwtError> {
    let security = &config::config().security;
    decode_claims(token, &security.jwt_secret, &security.jwt_issuer)
}

pub fn encode_claims(claims: &Claims, secret: &str) -> Result<String, JwtError> {
    if secret.is_empty() {
        return Err(JwtError::InvalidSecret);
    }

    let encoding_key = EncodingKey::from_secret(secret.as_bytes());
    let header = Header::default();

    encode(&header, claims, &encoding_key).map_err(|e| JwtError::TokenGeneration(e.to_string()))
}

pub fn decode_claims(token: &str, secret: &str, issuer: &str) -> Result<Claims, JwtError> {
    if secret.is_empty() {
        return Err(JwtError::InvalidSecret);
    }

    let decoding_key = DecodingKey::from_secret(secret.as_bytes());
    let mut validation = Validation::default();
    validation.set_issuer(&[issuer]);

    let token_data = decode::<Claims>(token, &decoding_key, &validation)
        .map_err(|e| JwtError::InvalidToken(e.to_string()))?;

    Ok(token_data.claims)
}

/// Capability view of an authenticatable account. The user row model implements
/// this directly, which is all the credential check needs to see.
pub trait Principal {
    fn username(&self) -> &str;
    fn credential_hash(&self) -> &str;
    fn is_enabled(&self) -> bool;
    fn is_locked(&self) -> bool;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn claims_round_trip() {
        let authorities = vec!["ROLE_CLERK".to_string(), "CREATE_DOCUMENT".to_string()];
        let claims = Claims::new("john".to_string(), &authorities, "docbank-api".to_string(), 3600);
        let token = encode_claims(&claims, "test-secret").unwrap();
        let decoded = decode_claims(&token, "test-secret", "docbank-api").unwrap();

        assert_eq!(decoded.sub, "john");
        assert_eq!(decoded.authorities(), authorities);
        assert!(decoded.exp > decoded.iat);
    }

    #[test]
    fn wrong_issuer_is_rejected() {
        let claims = Claims::new("john".to_string(), &[], "other-service".to_string(), 3600);
        let token = encode_claims(&claims, "test-secret").unwrap();
        assert!(decode_claims(&token, "test-secret", "docbank-api").is_err());
    }

    #[test]
    fn wrong_secret_is_rejected() {
        let claims = Claims::new("john".to_string(), &[], "docbank-api".to_string(), 3600);
        let token = encode_claims(&claims, "test-secret").unwrap();
        assert!(decode_claims(&token, "another-secret", "docbank-api").is_err());
    }

    #[test]
    fn empty_secret_is_rejected() {
        let claims = Claims::new("john".to_string(), &[], "docbank-api".to_string(), 3600);
        assert!(matches!(encode_claims(&claims, ""), Err(JwtError::InvalidSecret)));
    }

    #[test]
    fn empty_scope_yields_no_authorities() {
        let claims = Claims::new("john".to_string(), &[], "docbank-api".to_string(), 3600);
        assert!(claims.authorities().is_empty());
    }
}
