//! Signed access/refresh tokens (HS256 JWT).

use chrono::{DateTime, Duration, TimeZone, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::config::AppConfig;

/// Kind of token carried in the `token_type` claim.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenType {
    Access,
    Refresh,
}

impl TokenType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TokenType::Access => "access",
            TokenType::Refresh => "refresh",
        }
    }
}

/// JWT claims shared by access and refresh tokens.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// User id
    pub sub: Uuid,
    pub email: String,
    /// Unique token id, used for revocation
    pub jti: Uuid,
    pub token_type: TokenType,
    pub iat: i64,
    pub exp: i64,
}

impl Claims {
    pub fn expires_at(&self) -> DateTime<Utc> {
        Utc.timestamp_opt(self.exp, 0)
            .single()
            .unwrap_or_else(Utc::now)
    }
}

/// A freshly minted access/refresh pair.
#[derive(Debug, Clone)]
pub struct TokenPair {
    pub access: String,
    pub refresh: String,
    pub refresh_claims: Claims,
}

#[derive(Debug, Error)]
pub enum TokenError {
    #[error("JWT secret is not configured")]
    MissingSecret,
    #[error("failed to sign token: {0}")]
    Encode(#[source] jsonwebtoken::errors::Error),
    #[error("token has expired")]
    Expired,
    #[error("token is invalid")]
    Invalid,
    #[error("expected a {expected} token")]
    WrongType { expected: &'static str },
}

/// Issues and verifies tokens with a single symmetric secret.
pub struct TokenService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    access_ttl: Duration,
    refresh_ttl: Duration,
}

impl TokenService {
    pub fn new(secret: &[u8], access_ttl_seconds: u64, refresh_ttl_seconds: u64) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 5;
        validation.set_required_spec_claims(&["exp", "sub"]);

        Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            validation,
            access_ttl: Duration::seconds(clamp_ttl(access_ttl_seconds)),
            refresh_ttl: Duration::seconds(clamp_ttl(refresh_ttl_seconds)),
        }
    }

    pub fn from_config(config: &AppConfig) -> Result<Self, TokenError> {
        let secret = config
            .jwt_secret
            .as_deref()
            .ok_or(TokenError::MissingSecret)?;
        Ok(Self::new(
            secret.as_bytes(),
            config.access_token_ttl_seconds,
            config.refresh_token_ttl_seconds,
        ))
    }

    /// Issues a new access/refresh pair for the user.
    pub fn issue_pair(&self, user_id: Uuid, email: &str) -> Result<TokenPair, TokenError> {
        let (access, _) = self.issue(user_id, email, TokenType::Access)?;
        let (refresh, refresh_claims) = self.issue(user_id, email, TokenType::Refresh)?;
        Ok(TokenPair {
            access,
            refresh,
            refresh_claims,
        })
    }

    pub fn issue(
        &self,
        user_id: Uuid,
        email: &str,
        token_type: TokenType,
    ) -> Result<(String, Claims), TokenError> {
        let now = Utc::now();
        let ttl = match token_type {
            TokenType::Access => self.access_ttl,
            TokenType::Refresh => self.refresh_ttl,
        };
        let claims = Claims {
            sub: user_id,
            email: email.to_string(),
            jti: Uuid::new_v4(),
            token_type,
            iat: now.timestamp(),
            exp: (now + ttl).timestamp(),
        };
        self.sign(&claims).map(|token| (token, claims))
    }

    fn sign(&self, claims: &Claims) -> Result<String, TokenError> {
        encode(&Header::new(Algorithm::HS256), claims, &self.encoding_key)
            .map_err(TokenError::Encode)
    }

    /// Verifies signature, expiry and token kind.
    pub fn decode(&self, token: &str, expected: TokenType) -> Result<Claims, TokenError> {
        let claims = decode::<Claims>(token, &self.decoding_key, &self.validation)
            .map(|data| data.claims)
            .map_err(|err| match err.kind() {
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => TokenError::Expired,
                _ => TokenError::Invalid,
            })?;

        if claims.token_type != expected {
            return Err(TokenError::WrongType {
                expected: expected.as_str(),
            });
        }

        Ok(claims)
    }
}

fn clamp_ttl(seconds: u64) -> i64 {
    i64::try_from(seconds).unwrap_or(i64::MAX / 1000)
}
