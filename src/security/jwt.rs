/// Session token issuance and validation
///
/// Tokens are stateless HS256 JWTs embedding the user id with a fixed
/// 15-day validity window. The signing key comes from configuration and
/// is loaded exactly once at startup; a missing or empty key fails
/// startup, never an individual request. There is no refresh or
/// revocation mechanism.
use crate::error::{AuthError, Result};
use anyhow::{anyhow, Context};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Session token validity window
pub const SESSION_EXPIRY_DAYS: i64 = 15;

const JWT_ALGORITHM: Algorithm = Algorithm::HS256;

/// JWT claims carried by a session token
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    /// Subject (user ID as UUID string)
    pub sub: String,
    /// Issued at (Unix timestamp)
    pub iat: i64,
    /// Expiration time (Unix timestamp)
    pub exp: i64,
}

/// Stateless session token issuer
///
/// Holds the derived signing/validation keys; constructed once at
/// startup and shared through application state.
pub struct TokenIssuer {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    expiry_days: i64,
}

impl TokenIssuer {
    /// Build an issuer from the configured secret
    ///
    /// Fails when the secret is empty - surfaced at startup as a fatal
    /// configuration error.
    pub fn new(secret: &str, expiry_days: i64) -> anyhow::Result<Self> {
        if secret.is_empty() {
            return Err(anyhow!("JWT secret must not be empty"));
        }
        if expiry_days <= 0 {
            return Err(anyhow!("JWT expiry must be positive"));
        }

        Ok(Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            expiry_days,
        })
    }

    /// Build an issuer from settings
    pub fn from_settings(settings: &crate::config::JwtSettings) -> anyhow::Result<Self> {
        Self::new(&settings.secret, settings.expiry_days)
            .context("Failed to initialize JWT signing key")
    }

    /// Issue a signed session token for a user
    pub fn issue(&self, user_id: Uuid) -> Result<String> {
        let now = Utc::now();
        let claims = Claims {
            sub: user_id.to_string(),
            iat: now.timestamp(),
            exp: (now + Duration::days(self.expiry_days)).timestamp(),
        };

        let token = encode(&Header::new(JWT_ALGORITHM), &claims, &self.encoding_key)
            .map_err(|e| AuthError::Internal(format!("Token signing failed: {}", e)))?;

        Ok(token)
    }

    /// Decode and validate a session token, returning its claims
    pub fn decode(&self, token: &str) -> Result<Claims> {
        let mut validation = Validation::new(JWT_ALGORITHM);
        validation.validate_exp = true;

        let data = decode::<Claims>(token, &self.decoding_key, &validation)?;

        Ok(data.claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn issuer() -> TokenIssuer {
        TokenIssuer::new("test-secret-key", SESSION_EXPIRY_DAYS).unwrap()
    }

    #[test]
    fn test_issue_and_decode_round_trip() {
        let issuer = issuer();
        let user_id = Uuid::new_v4();

        let token = issuer.issue(user_id).unwrap();
        let claims = issuer.decode(&token).unwrap();

        assert_eq!(claims.sub, user_id.to_string());
    }

    #[test]
    fn test_expiry_is_fifteen_days() {
        let issuer = issuer();
        let token = issuer.issue(Uuid::new_v4()).unwrap();
        let claims = issuer.decode(&token).unwrap();

        assert_eq!(claims.exp - claims.iat, SESSION_EXPIRY_DAYS * 24 * 60 * 60);
    }

    #[test]
    fn test_rejects_token_signed_with_other_key() {
        let other = TokenIssuer::new("different-secret", SESSION_EXPIRY_DAYS).unwrap();
        let token = other.issue(Uuid::new_v4()).unwrap();

        assert!(issuer().decode(&token).is_err());
    }

    #[test]
    fn test_rejects_tampered_token() {
        let issuer = issuer();
        let mut token = issuer.issue(Uuid::new_v4()).unwrap();
        token.push('x');

        assert!(issuer.decode(&token).is_err());
    }

    #[test]
    fn test_empty_secret_is_a_startup_error() {
        assert!(TokenIssuer::new("", SESSION_EXPIRY_DAYS).is_err());
    }
}
