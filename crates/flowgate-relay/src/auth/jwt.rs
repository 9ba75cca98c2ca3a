//! JWT token issuance and validation.

use flowgate_core::db::unix_timestamp;
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation};

use super::claims::{ACCESS_TOKEN_TYPE, Claims};

#[derive(Debug, thiserror::Error)]
pub enum TokenError {
    #[error("Invalid token: {0}")]
    Invalid(#[from] jsonwebtoken::errors::Error),

    #[error("Token type {0:?} is not an access token")]
    WrongType(String),
}

/// Manages admin token creation and validation.
#[derive(Clone)]
pub struct JwtManager {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    access_ttl_secs: i64,
}

impl JwtManager {
    pub fn new(secret: &[u8], access_ttl_secs: i64) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            access_ttl_secs,
        }
    }

    /// Issue an access token. Returns the token and its TTL in seconds.
    pub fn issue_access_token(
        &self,
        user_id: &str,
        username: &str,
    ) -> Result<(String, i64), jsonwebtoken::errors::Error> {
        let now = unix_timestamp();
        let claims = Claims {
            jti: uuid::Uuid::new_v4().to_string(),
            sub: user_id.to_string(),
            username: username.to_string(),
            iat: now,
            exp: now + self.access_ttl_secs,
            token_type: ACCESS_TOKEN_TYPE.to_string(),
        };

        let token = jsonwebtoken::encode(&Header::default(), &claims, &self.encoding_key)?;
        Ok((token, self.access_ttl_secs))
    }

    /// Validate signature and expiry and return the claims.
    pub fn validate(&self, token: &str) -> Result<Claims, jsonwebtoken::errors::Error> {
        let data =
            jsonwebtoken::decode::<Claims>(token, &self.decoding_key, &Validation::default())?;
        Ok(data.claims)
    }

    /// Validate a token presented by an admin listener.
    pub fn validate_access(&self, token: &str) -> Result<Claims, TokenError> {
        let claims = self.validate(token)?;
        if !claims.is_access() {
            return Err(TokenError::WrongType(claims.token_type));
        }
        Ok(claims)
    }
}
