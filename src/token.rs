//! Signing and verification of bearer access tokens.

use std::time::Duration;

use chrono::Utc;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use secrecy::ExposeSecret;

use crate::config::Config;
use crate::error::{AppError, ForbiddenReason};
use crate::models::{Claims, Role};

/// The identity a token is issued for.
#[derive(Debug, Clone, PartialEq)]
pub struct Identity {
    pub id: String,
    pub email: String,
    pub role: Role,
}

pub struct TokenService {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
    access_ttl: Duration,
}

impl TokenService {
    pub fn new(config: &Config) -> Self {
        Self::from_secret(
            config.jwt_access_secret.expose_secret().as_bytes(),
            config.access_token_ttl,
        )
    }

    pub fn from_secret(secret: &[u8], access_ttl: Duration) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;

        TokenService {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            validation,
            access_ttl,
        }
    }

    /// Issue an access token with the configured lifetime.
    pub fn issue_access(&self, identity: &Identity) -> Result<String, AppError> {
        let ttl = chrono::Duration::from_std(self.access_ttl)
            .map_err(|e| AppError::Internal(format!("access token ttl out of range: {}", e)))?;
        self.issue(identity, ttl)
    }

    /// Sign a token for `identity` that expires `ttl` from now. A negative
    /// `ttl` yields an already expired token.
    pub fn issue(&self, identity: &Identity, ttl: chrono::Duration) -> Result<String, AppError> {
        let now = Utc::now();
        let expiration = now
            .checked_add_signed(ttl)
            .ok_or_else(|| AppError::Internal("token expiry overflow".into()))?;

        let claims = Claims {
            id: identity.id.clone(),
            email: identity.email.clone(),
            role: Some(identity.role),
            iat: now.timestamp().max(0) as usize,
            exp: expiration.timestamp().max(0) as usize,
        };

        Ok(encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)?)
    }

    /// Check signature and expiry. Any failure is reported as `INVALID_TOKEN`.
    pub fn verify(&self, token: &str) -> Result<Claims, AppError> {
        decode::<Claims>(token, &self.decoding, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| {
                log::debug!("token rejected: {}", e);
                AppError::Forbidden(ForbiddenReason::InvalidToken)
            })
    }
}
