use chrono::Utc;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::app::error::AppError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenType {
    Access,
    Refresh,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub token_type: TokenType,
    pub exp: i64,
    pub iat: i64,
    pub jti: String,
    pub user_id: i32,
}

/// Signs and checks the HS256 access/refresh pair handed out by `/token/`.
pub struct JwtKeys {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    access_ttl_seconds: i64,
    refresh_ttl_seconds: i64,
}

impl JwtKeys {
    pub fn new(secret: &str, access_ttl_seconds: i64, refresh_ttl_seconds: i64) -> JwtKeys {
        JwtKeys {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            access_ttl_seconds,
            refresh_ttl_seconds,
        }
    }

    pub fn issue(&self, user_id: i32, token_type: TokenType) -> Result<String, AppError> {
        let now = Utc::now().timestamp();
        let ttl = match token_type {
            TokenType::Access => self.access_ttl_seconds,
            TokenType::Refresh => self.refresh_ttl_seconds,
        };
        let exp = now
            .checked_add(ttl)
            .ok_or_else(|| AppError::internal(format!("{:?} token lifetime out of range", token_type)))?;

        let claims = Claims {
            token_type,
            exp,
            iat: now,
            jti: Uuid::new_v4().simple().to_string(),
            user_id,
        };

        encode(&Header::default(), &claims, &self.encoding_key).map_err(AppError::internal)
    }

    /// Returns the claims of a well-signed, unexpired token of any type.
    pub fn decode(&self, token: &str) -> Result<Claims, AppError> {
        decode::<Claims>(token, &self.decoding_key, &Validation::default())
            .map(|data| data.claims)
            .map_err(|err| {
                log::debug!("rejected jwt: {}", err);
                AppError::TokenNotValid
            })
    }

    /// Like [`JwtKeys::decode`] but also requires the given token type.
    pub fn decode_as(&self, token: &str, expected: TokenType) -> Result<Claims, AppError> {
        let claims = self.decode(token)?;
        if claims.token_type != expected {
            return Err(AppError::TokenNotValid);
        }
        Ok(claims)
    }
}
