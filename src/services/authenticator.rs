use crate::config::AppConfig;
use crate::models::DbUser;
use crate::utils::error::AppError;
use base64::Engine;
use bcrypt::{hash, verify, DEFAULT_COST};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use uuid::Uuid;

// JWT Claims
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    pub sub: String, // user id
    pub user_name: String,
    pub iat: usize,
    pub exp: usize,
    pub jti: String,
    pub aud: String,
    pub iss: String,
}

#[derive(Clone)]
pub struct Authenticator {
    secret: String,
    issuer: String,
    audience: String,
    ttl: Duration,
    cost: u32,
}

impl Authenticator {
    pub fn new(config: &AppConfig) -> Self {
        Authenticator {
            secret: config.jwt_secret.clone(),
            issuer: config.jwt_issuer.clone(),
            audience: config.jwt_audience.clone(),
            ttl: Duration::hours(config.jwt_ttl_hours),
            cost: DEFAULT_COST,
        }
    }

    /// Lower bcrypt cost keeps hashing fast under test.
    #[cfg(test)]
    pub fn for_tests(config: &AppConfig) -> Self {
        Authenticator { cost: 4, ..Self::new(config) }
    }

    pub fn hash_password(&self, password: &str) -> Result<String, AppError> {
        Ok(hash(password, self.cost)?)
    }

    pub fn verify_password(&self, password: &str, hashed: &str) -> bool {
        if hashed.is_empty() {
            return false;
        }
        match verify(password, hashed) {
            Ok(valid) => valid,
            Err(e) => {
                log::warn!("⚠️  Password verification error: {}", e);
                false
            }
        }
    }

    pub fn issue_token(&self, user: &DbUser) -> Result<String, AppError> {
        let now = Utc::now();
        let claims = Claims {
            sub: user.id.clone(),
            user_name: user.user_name.clone(),
            iat: now.timestamp() as usize,
            exp: (now + self.ttl).timestamp() as usize,
            jti: Uuid::new_v4().to_string(),
            aud: self.audience.clone(),
            iss: self.issuer.clone(),
        };

        encode(&Header::default(), &claims, &EncodingKey::from_secret(self.secret.as_ref()))
            .map_err(|e| AppError::Internal(format!("Failed to generate token: {}", e)))
    }

    pub fn verify_token(&self, token: &str) -> Result<Claims, AppError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_audience(&[self.audience.clone()]);

        let mut issuers = HashSet::new();
        issuers.insert(self.issuer.clone());
        validation.iss = Some(issuers);

        Ok(decode::<Claims>(token, &DecodingKey::from_secret(self.secret.as_ref()), &validation)?
            .claims)
    }
}

/// Issues opaque one-time tokens such as password reset codes.
#[derive(Debug, Clone, Default)]
pub struct TokenIssuer;

impl TokenIssuer {
    pub fn issue_reset_token(&self) -> String {
        let mut bytes = Vec::with_capacity(32);
        bytes.extend_from_slice(Uuid::new_v4().as_bytes());
        bytes.extend_from_slice(Uuid::new_v4().as_bytes());
        base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(bytes)
    }
}
