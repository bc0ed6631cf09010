//! Session tokens.
//!
//! A token is an HS256 JWT whose payload is `{user: {id, name, email, role},
//! expiresAtEpochMs}`. Expiry is carried in milliseconds and checked here
//! rather than through the JWT `exp` claim, so the standard claim validation
//! is switched off and `verify_at` does the clock comparison.

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::user::{Role, User};

/// Tokens are never renewed; they live for this long from issuance.
pub const TOKEN_TTL_MINUTES: i64 = 60;

#[derive(Debug, Error)]
pub enum TokenError {
    #[error("token could not be decoded")]
    Decode(#[source] jsonwebtoken::errors::Error),

    #[error("token expired")]
    Expired,

    #[error("token could not be encoded")]
    Encode(#[source] jsonwebtoken::errors::Error),
}

/// The identity claim a token carries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Identity {
    pub id: String,
    pub name: String,
    pub email: String,
    pub role: Role,
}

impl From<&User> for Identity {
    fn from(user: &User) -> Self {
        Self {
            id: user.id.clone(),
            name: user.name.clone(),
            email: user.email.clone(),
            role: user.role,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenClaims {
    pub user: Identity,
    pub expires_at_epoch_ms: i64,
}

impl TokenClaims {
    pub fn is_live_at(&self, now: DateTime<Utc>) -> bool {
        now.timestamp_millis() < self.expires_at_epoch_ms
    }
}

pub struct TokenCodec {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
}

impl TokenCodec {
    pub fn new(secret: &[u8]) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = false;
        validation.required_spec_claims.clear();
        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            validation,
        }
    }

    pub fn issue(&self, user: &User) -> Result<String, TokenError> {
        self.issue_at(user, Utc::now())
    }

    pub fn issue_at(&self, user: &User, now: DateTime<Utc>) -> Result<String, TokenError> {
        let claims = TokenClaims {
            user: Identity::from(user),
            expires_at_epoch_ms: (now + Duration::minutes(TOKEN_TTL_MINUTES)).timestamp_millis(),
        };
        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding).map_err(TokenError::Encode)
    }

    /// Checks the signature and shape only. Callers that need a live session
    /// use [`TokenCodec::verify`].
    pub fn decode(&self, token: &str) -> Result<TokenClaims, TokenError> {
        decode::<TokenClaims>(token, &self.decoding, &self.validation)
            .map(|data| data.claims)
            .map_err(TokenError::Decode)
    }

    pub fn verify(&self, token: &str) -> Result<TokenClaims, TokenError> {
        self.verify_at(token, Utc::now())
    }

    pub fn verify_at(&self, token: &str, now: DateTime<Utc>) -> Result<TokenClaims, TokenError> {
        let claims = self.decode(token)?;
        if !claims.is_live_at(now) {
            return Err(TokenError::Expired);
        }
        Ok(claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user() -> User {
        User {
            id: "student01".to_string(),
            name: "Alex Johnson".to_string(),
            email: "alex@eduflux.ai".to_string(),
            password_hash: "$argon2id$irrelevant".to_string(),
            role: Role::Student,
            enrolled_course_ids: vec!["c1".to_string()],
            external_accounts: vec![],
            is_verified: true,
        }
    }

    #[test]
    fn test_issue_then_decode_round_trips_identity() {
        let codec = TokenCodec::new(b"test-secret");
        let token = codec.issue(&user()).unwrap();
        let claims = codec.decode(&token).unwrap();
        assert_eq!(claims.user, Identity::from(&user()));
        assert_eq!(claims.user.role, Role::Student);
    }

    #[test]
    fn test_expiry_is_one_hour_after_issue() {
        let codec = TokenCodec::new(b"test-secret");
        let now = Utc::now();
        let token = codec.issue_at(&user(), now).unwrap();
        let claims = codec.decode(&token).unwrap();
        assert_eq!(
            claims.expires_at_epoch_ms - now.timestamp_millis(),
            60 * 60 * 1000
        );
    }

    #[test]
    fn test_verify_rejects_expired_token() {
        let codec = TokenCodec::new(b"test-secret");
        let issued = Utc::now() - Duration::minutes(61);
        let token = codec.issue_at(&user(), issued).unwrap();
        assert!(codec.decode(&token).is_ok());
        assert!(matches!(codec.verify(&token), Err(TokenError::Expired)));
    }

    #[test]
    fn test_token_is_dead_at_exact_deadline() {
        let codec = TokenCodec::new(b"test-secret");
        let now = Utc::now();
        let token = codec.issue_at(&user(), now).unwrap();
        let deadline = now + Duration::minutes(TOKEN_TTL_MINUTES);
        assert!(codec.verify_at(&token, deadline - Duration::milliseconds(1)).is_ok());
        assert!(matches!(
            codec.verify_at(&token, deadline),
            Err(TokenError::Expired)
        ));
    }

    #[test]
    fn test_token_from_other_secret_fails_to_decode() {
        let issuer = TokenCodec::new(b"secret-a");
        let verifier = TokenCodec::new(b"secret-b");
        let token = issuer.issue(&user()).unwrap();
        assert!(matches!(verifier.decode(&token), Err(TokenError::Decode(_))));
    }

    #[test]
    fn test_garbage_fails_to_decode() {
        let codec = TokenCodec::new(b"test-secret");
        assert!(matches!(codec.verify("not.a.token"), Err(TokenError::Decode(_))));
        assert!(matches!(codec.verify(""), Err(TokenError::Decode(_))));
    }

    #[test]
    fn test_payload_carries_no_credential() {
        let codec = TokenCodec::new(b"test-secret");
        let token = codec.issue(&user()).unwrap();
        let payload = token.split('.').nth(1).unwrap();
        assert!(!payload.is_empty());
        let claims = serde_json::to_value(codec.decode(&token).unwrap()).unwrap();
        assert!(claims["user"].get("passwordHash").is_none());
        assert!(claims.get("expiresAtEpochMs").is_some());
    }
}
