//! Bearer-token validation.
//!
//! Authentication is an external collaborator: something else issues HS256
//! tokens whose `sub` is the acting user. This module only verifies the
//! signature and time window, and hands the identity to the middleware for
//! audit attribution.

use jsonwebtoken::{Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use lotledger_core::UserId;

/// Claims lotledger expects once a token is decoded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// Subject: the acting user.
    pub sub: UserId,
    /// Issued-at (seconds since epoch).
    pub iat: i64,
    /// Expiration (seconds since epoch).
    pub exp: i64,
}

#[derive(Debug, Error)]
pub enum TokenError {
    #[error("invalid token: {0}")]
    Invalid(#[from] jsonwebtoken::errors::Error),
}

/// HS256 validator over a shared secret.
pub struct Hs256TokenValidator {
    key: DecodingKey,
    validation: Validation,
}

impl Hs256TokenValidator {
    pub fn new(secret: &[u8]) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = true;
        Self {
            key: DecodingKey::from_secret(secret),
            validation,
        }
    }

    pub fn validate(&self, token: &str) -> Result<Claims, TokenError> {
        let data = jsonwebtoken::decode::<Claims>(token, &self.key, &self.validation)?;
        Ok(data.claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use jsonwebtoken::{EncodingKey, Header};

    fn mint(secret: &str, iat_offset: i64, exp_offset: i64) -> String {
        let now = Utc::now().timestamp();
        let claims = Claims {
            sub: UserId::new(),
            iat: now + iat_offset,
            exp: now + exp_offset,
        };
        jsonwebtoken::encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(secret.as_bytes()),
        )
        .unwrap()
    }

    #[test]
    fn valid_token_round_trips() {
        let validator = Hs256TokenValidator::new(b"secret");
        let claims = validator.validate(&mint("secret", 0, 600)).unwrap();
        assert!(claims.exp > claims.iat);
    }

    #[test]
    fn wrong_secret_is_rejected() {
        let validator = Hs256TokenValidator::new(b"secret");
        assert!(validator.validate(&mint("other", 0, 600)).is_err());
    }

    #[test]
    fn expired_token_is_rejected() {
        let validator = Hs256TokenValidator::new(b"secret");
        assert!(validator.validate(&mint("secret", -1200, -600)).is_err());
    }
}
