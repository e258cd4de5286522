//! JWT generation and validation

use anyhow::{Context, Result};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

const ACCESS_TOKEN_DAYS: i64 = 7;
const REFRESH_TOKEN_DAYS: i64 = 30;

/// Token claims. `token_type` distinguishes access tokens from refresh tokens;
/// a refresh token is never accepted for resource access.
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    pub token_type: String,
    pub iat: i64,
    pub exp: i64,
}

impl Claims {
    pub fn is_refresh(&self) -> bool {
        self.token_type == "refresh"
    }
}

pub fn generate_access_token(user_id: Uuid, secret: &str) -> Result<String> {
    sign(user_id, "access", ACCESS_TOKEN_DAYS, secret)
}

pub fn generate_refresh_token(user_id: Uuid, secret: &str) -> Result<String> {
    sign(user_id, "refresh", REFRESH_TOKEN_DAYS, secret)
}

fn sign(user_id: Uuid, token_type: &str, days: i64, secret: &str) -> Result<String> {
    let now = Utc::now();
    let claims = Claims {
        sub: user_id,
        token_type: token_type.to_string(),
        iat: now.timestamp(),
        exp: (now + Duration::days(days)).timestamp(),
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .context("failed to sign token")
}

pub fn verify_token(token: &str, secret: &str) -> Result<Claims> {
    let data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .context("invalid or expired token")?;

    Ok(data.claims)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "test-secret";

    #[test]
    fn access_token_round_trips() {
        let user_id = Uuid::new_v4();
        let token = generate_access_token(user_id, SECRET).unwrap();
        let claims = verify_token(&token, SECRET).unwrap();
        assert_eq!(claims.sub, user_id);
        assert!(!claims.is_refresh());
    }

    #[test]
    fn refresh_token_is_marked_as_such() {
        let token = generate_refresh_token(Uuid::new_v4(), SECRET).unwrap();
        let claims = verify_token(&token, SECRET).unwrap();
        assert!(claims.is_refresh());
    }

    #[test]
    fn wrong_secret_is_rejected() {
        let token = generate_access_token(Uuid::new_v4(), SECRET).unwrap();
        assert!(verify_token(&token, "other-secret").is_err());
    }

    #[test]
    fn garbage_token_is_rejected() {
        assert!(verify_token("not.a.token", SECRET).is_err());
    }
}
