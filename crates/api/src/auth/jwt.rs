//! Access and refresh token primitives.
//!
//! An access token is a short-lived HS256 JWT carrying [`Claims`]; a refresh
//! token is an opaque random string that the server only ever stores as a
//! SHA-256 digest, so a leaked sessions table cannot be replayed.

use elms_core::types::DbId;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use uuid::Uuid;

const DEFAULT_ACCESS_EXPIRY_MINS: i64 = 15;
const DEFAULT_REFRESH_EXPIRY_DAYS: i64 = 7;

/// Payload of every access token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// User id the token was issued to.
    pub sub: DbId,
    /// Wire name of the user's role, e.g. `"HR_ADMIN"`.
    pub role: String,
    /// Expiry as a Unix timestamp.
    pub exp: i64,
    /// Issue time as a Unix timestamp.
    pub iat: i64,
    /// Per-token UUID, usable for audit correlation.
    pub jti: String,
}

/// Signing secret and token lifetimes.
#[derive(Debug, Clone)]
pub struct JwtConfig {
    pub secret: String,
    pub access_token_expiry_mins: i64,
    pub refresh_token_expiry_days: i64,
}

impl JwtConfig {
    /// Read the JWT settings from the environment. `JWT_SECRET` is
    /// mandatory and must be non-empty; expiries fall back to 15 minutes
    /// (access) and 7 days (refresh).
    ///
    /// # Panics
    ///
    /// Panics when `JWT_SECRET` is missing or empty. Refusing to start
    /// beats signing tokens with a guessable default.
    pub fn from_env() -> Self {
        let secret = std::env::var("JWT_SECRET").expect("JWT_SECRET must be set");
        assert!(!secret.is_empty(), "JWT_SECRET must not be empty");

        JwtConfig {
            secret,
            access_token_expiry_mins: env_i64("JWT_ACCESS_EXPIRY_MINS", DEFAULT_ACCESS_EXPIRY_MINS),
            refresh_token_expiry_days: env_i64(
                "JWT_REFRESH_EXPIRY_DAYS",
                DEFAULT_REFRESH_EXPIRY_DAYS,
            ),
        }
    }

    /// Sign a fresh access token for `user_id` acting as `role`.
    pub fn issue_access_token(
        &self,
        user_id: DbId,
        role: &str,
    ) -> Result<String, jsonwebtoken::errors::Error> {
        let iat = chrono::Utc::now().timestamp();
        let claims = Claims {
            sub: user_id,
            role: role.to_owned(),
            exp: iat + self.access_token_expiry_mins * 60,
            iat,
            jti: Uuid::new_v4().to_string(),
        };
        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.secret.as_bytes()),
        )
    }

    /// Check signature and expiry of an access token and return its claims.
    pub fn decode_access_token(&self, token: &str) -> Result<Claims, jsonwebtoken::errors::Error> {
        decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.secret.as_bytes()),
            &Validation::default(),
        )
        .map(|data| data.claims)
    }
}

fn env_i64(key: &str, default: i64) -> i64 {
    match std::env::var(key) {
        Ok(value) => value
            .parse()
            .unwrap_or_else(|_| panic!("{key} must be a valid integer")),
        Err(_) => default,
    }
}

/// A freshly minted refresh token: the plaintext goes to the client, the
/// digest into the `sessions` table.
#[derive(Debug)]
pub struct RefreshToken {
    pub plaintext: String,
    pub digest: String,
}

impl RefreshToken {
    pub fn mint() -> Self {
        let plaintext = Uuid::new_v4().to_string();
        let digest = refresh_token_digest(&plaintext);
        RefreshToken { plaintext, digest }
    }
}

/// SHA-256 hex digest of a refresh token, for storage and lookup.
pub fn refresh_token_digest(token: &str) -> String {
    format!("{:x}", Sha256::digest(token.as_bytes()))
}
