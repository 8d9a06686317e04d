use chrono::{Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};

use crate::error::{ErrorMessage, HttpError};

#[derive(Debug, Serialize, Deserialize)]
pub struct TokenClaims {
    pub sub: String,
    pub iat: usize,
    pub exp: usize,
}

/// Issues and checks HS256 session tokens. The secret and lifetime are fixed
/// at construction.
#[derive(Clone)]
pub struct TokenService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    maxage_seconds: i64,
}

impl TokenService {
    pub fn new(secret: &str, maxage_seconds: i64) -> Self {
        TokenService {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            maxage_seconds,
        }
    }

    pub fn create_token(&self, user_id: i64) -> Result<String, jsonwebtoken::errors::Error> {
        let now = Utc::now();
        let claims = TokenClaims {
            sub: user_id.to_string(),
            iat: now.timestamp() as usize,
            exp: (now + Duration::seconds(self.maxage_seconds)).timestamp() as usize,
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
    }

    /// Returns the user id carried by a valid, unexpired token.
    pub fn decode_token(&self, token: &str) -> Result<i64, HttpError> {
        let invalid = || HttpError::unauthorized(ErrorMessage::InvalidToken.to_string());

        let data = decode::<TokenClaims>(
            token,
            &self.decoding_key,
            &Validation::new(Algorithm::HS256),
        )
        .map_err(|_| invalid())?;

        data.claims.sub.parse::<i64>().map_err(|_| invalid())
    }
}
